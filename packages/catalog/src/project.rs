use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A portfolio project as surfaced to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    /// All image URLs in display order.
    pub images: Vec<String>,
    /// Index into `images` of the cover image.
    pub primary_image_index: usize,
    /// Legacy single-image field. Never authoritative: re-derived from
    /// `images[primary_image_index]` on every write. Pre-migration records
    /// may carry only this field with an empty `images` array.
    pub image_url: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scalar fields for a project that does not exist yet.
#[derive(Clone, Debug, Default)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: bool,
    /// Index into the yet-to-be-uploaded image files.
    pub primary_image_index: usize,
}

/// Partial update; `None` leaves a field unchanged. The double option on the
/// URL fields distinguishes "leave as is" from "clear".
///
/// `existing_images` is transport-only: the URLs the editor kept, in the
/// order the user saw them. It feeds image reconciliation and is never
/// persisted as a field of its own.
#[derive(Clone, Debug, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub github_url: Option<Option<String>>,
    pub live_url: Option<Option<String>>,
    pub featured: Option<bool>,
    pub primary_image_index: Option<usize>,
    pub existing_images: Vec<String>,
}

/// A local image file queued for upload.
#[derive(Clone, Debug)]
pub struct NewImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Resolve the cover image URL, falling back to the first image when the
/// index is out of range.
pub fn primary_image_url(images: &[String], primary_index: usize) -> Option<&str> {
    images
        .get(primary_index)
        .or_else(|| images.first())
        .map(String::as_str)
}
