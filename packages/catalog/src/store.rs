use async_trait::async_trait;
use thiserror::Error;

use crate::cursor::Cursor;
use crate::project::Project;

/// Errors from the persistent document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project not found: {0}")]
    NotFound(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    /// Backend failures (connectivity, permissions, quota) pass through
    /// unmodified for the HTTP boundary to classify.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// One page of a cursor-chained listing.
#[derive(Clone, Debug)]
pub struct ProjectPage {
    pub items: Vec<Project>,
    /// Token for the page after this one; `None` once the listing is
    /// exhausted.
    pub next_cursor: Option<Cursor>,
}

/// Field set written on first persist.
///
/// Images are intentionally absent: the record is created with empty
/// placeholders so an id exists before any blob key is chosen.
#[derive(Clone, Debug, Default)]
pub struct ProjectRecord {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: bool,
}

/// Partial document update; `None` leaves the stored field unchanged.
/// Implementations stamp `updated_at` on every patch.
#[derive(Clone, Debug, Default)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub github_url: Option<Option<String>>,
    pub live_url: Option<Option<String>>,
    pub featured: Option<bool>,
    pub images: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub primary_image_index: Option<usize>,
}

/// Adapter over the remote document store.
///
/// The only component that touches persistence I/O for project records.
/// Listing is ordered by `created_at` descending (id descending as the
/// tiebreak) and paginated by opaque cursor so pages stay stable under
/// concurrent insertions.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list(
        &self,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<ProjectPage, StoreError>;

    /// Featured projects only, newest first, at most `limit` items.
    async fn list_featured(&self, limit: usize) -> Result<Vec<Project>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Project>, StoreError>;

    /// Insert a new record with empty image placeholders and return its id.
    async fn create(&self, record: ProjectRecord) -> Result<String, StoreError>;

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
