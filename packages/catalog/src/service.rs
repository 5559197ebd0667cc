use std::sync::{Arc, Mutex};

use chrono::Utc;
use common::storage::{BlobStore, ProgressSink, StorageError};
use thiserror::Error;
use tracing::warn;

use crate::cursor::Cursor;
use crate::project::{NewImage, Project, ProjectDraft, ProjectPatch};
use crate::store::{ProjectPage, ProjectRecord, ProjectStore, RecordPatch, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("image upload failed: {0}")]
    Upload(#[from] StorageError),
}

/// Business logic over the project catalog.
///
/// Sequences the two-phase create/update so a project document and its
/// image blobs stay consistent, and reconciles the editor's kept/new image
/// split into the flat stored array. Within one mutation the document patch
/// is only issued after every upload for that mutation has resolved.
pub struct CatalogService {
    store: Arc<dyn ProjectStore>,
    blobs: Arc<dyn BlobStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ProjectStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Create a project: persist a placeholder record first so an id exists
    /// for blob keys, then upload the images concurrently and patch the
    /// record with the final image fields.
    ///
    /// Callers are expected to reject zero-image submissions at the input
    /// edge; with no files the record keeps its empty placeholders.
    pub async fn create(
        &self,
        draft: ProjectDraft,
        images: Vec<NewImage>,
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<String, CatalogError> {
        let requested_primary = draft.primary_image_index;
        let record = ProjectRecord {
            title: draft.title,
            description: draft.description,
            technologies: draft.technologies,
            github_url: draft.github_url,
            live_url: draft.live_url,
            featured: draft.featured,
        };
        let id = self.store.create(record).await?;

        if !images.is_empty() {
            let urls = self.upload_images(&id, images, progress).await?;
            let primary = if requested_primary < urls.len() {
                requested_primary
            } else {
                0
            };
            let image_url = urls[primary].clone();
            self.store
                .update(
                    &id,
                    RecordPatch {
                        images: Some(urls),
                        image_url: Some(image_url),
                        primary_image_index: Some(primary),
                        ..Default::default()
                    },
                )
                .await?;
        }

        Ok(id)
    }

    /// Update a project.
    ///
    /// The patch carries the full desired image set in two parts: URLs the
    /// editor kept (`existing_images`, already remote) and new local files.
    /// Kept images precede newly uploaded ones so the relative order the
    /// user saw survives. A primary index that lands out of range after the
    /// set changed falls back to 0, and `image_url` is re-derived against
    /// the final array. The transport-only `existing_images` list itself is
    /// never persisted.
    pub async fn update(
        &self,
        id: &str,
        mut patch: ProjectPatch,
        new_images: Vec<NewImage>,
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<(), CatalogError> {
        let current = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let uploaded = if new_images.is_empty() {
            Vec::new()
        } else {
            self.upload_images(id, new_images, progress).await?
        };

        let mut images = std::mem::take(&mut patch.existing_images);
        images.extend(uploaded);

        let requested = patch
            .primary_image_index
            .unwrap_or(current.primary_image_index);
        let primary = if requested < images.len() { requested } else { 0 };
        let image_url = images.get(primary).cloned().unwrap_or_default();

        self.store
            .update(
                id,
                RecordPatch {
                    title: patch.title,
                    description: patch.description,
                    technologies: patch.technologies,
                    github_url: patch.github_url,
                    live_url: patch.live_url,
                    featured: patch.featured,
                    images: Some(images),
                    image_url: Some(image_url),
                    primary_image_index: Some(primary),
                },
            )
            .await?;

        Ok(())
    }

    /// Delete a project and its image blobs.
    ///
    /// Blob deletion is best-effort cleanup: failures are logged and never
    /// abort the record delete. An orphaned blob is acceptable, an orphaned
    /// record is not. Records that predate the multi-image migration carry
    /// only `image_url`; that single blob is deleted instead.
    pub async fn remove(&self, id: &str) -> Result<(), CatalogError> {
        let project = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let urls: Vec<String> = if project.images.is_empty() {
            if project.image_url.is_empty() {
                Vec::new()
            } else {
                vec![project.image_url.clone()]
            }
        } else {
            project.images.clone()
        };

        let deletions = urls.iter().map(|url| {
            let blobs = self.blobs.clone();
            async move {
                match blobs.delete(url).await {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(url = %url, "image blob already absent during project delete");
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "failed to delete image blob, continuing");
                    }
                }
            }
        });
        futures::future::join_all(deletions).await;

        self.store.delete(id).await?;
        Ok(())
    }

    pub async fn list(
        &self,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<ProjectPage, CatalogError> {
        Ok(self.store.list(page_size, cursor).await?)
    }

    pub async fn list_featured(&self, limit: usize) -> Result<Vec<Project>, CatalogError> {
        Ok(self.store.list_featured(limit).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Project>, CatalogError> {
        Ok(self.store.get(id).await?)
    }

    /// Upload image files concurrently under the project's blob namespace,
    /// returning the public URLs in input order.
    ///
    /// Fan-out/fan-in: all files upload at once and failure of any one
    /// fails the whole batch. Aggregate progress weights every file
    /// equally regardless of size.
    async fn upload_images(
        &self,
        project_id: &str,
        images: Vec<NewImage>,
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<Vec<String>, CatalogError> {
        let aggregator = ProgressAggregator::new(images.len(), progress);
        let stamp = Utc::now().timestamp_millis();

        let uploads = images.iter().enumerate().map(|(index, image)| {
            let key = format!(
                "projects/{project_id}/{stamp}_{index}_{name}",
                name = flatten_filename(&image.filename)
            );
            let aggregator = &aggregator;
            async move {
                let sink = move |pct: u8| aggregator.record(index, pct);
                self.blobs
                    .put(&key, &image.bytes, Some(&sink as &ProgressSink<'_>))
                    .await
            }
        });

        let urls = futures::future::try_join_all(uploads).await?;
        Ok(urls)
    }
}

/// Folds per-file percentages into one equally-weighted aggregate and
/// forwards it, monotonically, to the caller's sink.
struct ProgressAggregator<'a> {
    sink: Option<&'a ProgressSink<'a>>,
    state: Mutex<AggregateState>,
}

struct AggregateState {
    per_file: Vec<u8>,
    last_emitted: u8,
}

impl<'a> ProgressAggregator<'a> {
    fn new(files: usize, sink: Option<&'a ProgressSink<'a>>) -> Self {
        if let Some(report) = sink {
            report(0);
        }
        Self {
            sink,
            state: Mutex::new(AggregateState {
                per_file: vec![0; files],
                last_emitted: 0,
            }),
        }
    }

    fn record(&self, index: usize, pct: u8) {
        let Some(report) = self.sink else { return };
        let mut state = self.state.lock().unwrap();
        state.per_file[index] = state.per_file[index].max(pct.min(100));
        let sum: u32 = state.per_file.iter().map(|&p| u32::from(p)).sum();
        let aggregate = (sum / state.per_file.len() as u32) as u8;
        if aggregate > state.last_emitted {
            state.last_emitted = aggregate;
            report(aggregate);
        }
    }
}

/// Blob key segments must not introduce path separators.
fn flatten_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
