use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use catalog::cursor::{self, CursorPos};
use catalog::{
    CatalogClient, CatalogService, Cursor, NewImage, Project, ProjectDraft, ProjectPage,
    ProjectRecord, ProjectStore, RecordPatch, StoreError,
};
use ::common::storage::{BlobStore, ProgressSink, StorageError};

/// Epoch base for deterministic, strictly increasing record timestamps.
const TIME_BASE_MICROS: i64 = 1_700_000_000_000_000;

/// In-memory [`ProjectStore`] double with call counters and fault/latency
/// injection points.
#[derive(Default)]
pub struct MemoryProjectStore {
    docs: Mutex<HashMap<String, Project>>,
    seq: AtomicU64,
    pub list_calls: AtomicU64,
    pub get_calls: AtomicU64,
    pub delete_calls: Mutex<Vec<String>>,
    fail_delete: AtomicBool,
    delete_started: AtomicBool,
    delete_gate: Mutex<Option<Arc<Notify>>>,
    list_gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let tick = self.seq.fetch_add(1, Ordering::SeqCst) as i64;
        DateTime::from_timestamp_micros(TIME_BASE_MICROS + tick * 1_000).unwrap()
    }

    /// Make the next `delete` block until the returned gate is notified,
    /// then fail.
    pub fn gate_delete_with_failure(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.delete_gate.lock().unwrap() = Some(gate.clone());
        self.fail_delete.store(true, Ordering::SeqCst);
        gate
    }

    pub fn delete_started(&self) -> bool {
        self.delete_started.load(Ordering::SeqCst)
    }

    /// Make subsequent `list` calls block until the gate is released.
    pub fn gate_lists(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Insert a fully-formed record, bypassing the create placeholder flow.
    /// Used to model pre-migration records.
    pub fn insert_raw(&self, project: Project) {
        self.docs
            .lock()
            .unwrap()
            .insert(project.id.clone(), project);
    }

    fn ordered_projects(&self) -> Vec<Project> {
        let docs = self.docs.lock().unwrap();
        let mut items: Vec<Project> = docs.values().cloned().collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        items
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn list(
        &self,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<ProjectPage, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut items = self.ordered_projects();
        if let Some(cursor) = cursor {
            let pos = cursor::decode(cursor)
                .map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
            items.retain(|p| {
                let micros = p.created_at.timestamp_micros();
                micros < pos.created_at_micros
                    || (micros == pos.created_at_micros && p.id < pos.id)
            });
        }

        let has_more = items.len() > page_size;
        items.truncate(page_size);
        let next_cursor = if has_more {
            items
                .last()
                .map(|p| cursor::encode(&CursorPos::new(p.created_at, p.id.clone())))
        } else {
            None
        };

        Ok(ProjectPage { items, next_cursor })
    }

    async fn list_featured(&self, limit: usize) -> Result<Vec<Project>, StoreError> {
        let mut items = self.ordered_projects();
        items.retain(|p| p.featured);
        items.truncate(limit);
        Ok(items)
    }

    async fn get(&self, id: &str) -> Result<Option<Project>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.docs.lock().unwrap().get(id).cloned())
    }

    async fn create(&self, record: ProjectRecord) -> Result<String, StoreError> {
        let tick = self.seq.fetch_add(1, Ordering::SeqCst) as i64;
        let now = DateTime::from_timestamp_micros(TIME_BASE_MICROS + tick * 1_000).unwrap();
        let id = format!("p{:04}", tick + 1);
        let project = Project {
            id: id.clone(),
            title: record.title,
            description: record.description,
            images: Vec::new(),
            primary_image_index: 0,
            image_url: String::new(),
            technologies: record.technologies,
            github_url: record.github_url,
            live_url: record.live_url,
            featured: record.featured,
            created_at: now,
            updated_at: now,
        };
        self.docs.lock().unwrap().insert(id.clone(), project);
        Ok(id)
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), StoreError> {
        let stamp = self.next_timestamp();
        let mut docs = self.docs.lock().unwrap();
        let project = docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(title) = patch.title {
            project.title = title;
        }
        if let Some(description) = patch.description {
            project.description = description;
        }
        if let Some(technologies) = patch.technologies {
            project.technologies = technologies;
        }
        if let Some(github_url) = patch.github_url {
            project.github_url = github_url;
        }
        if let Some(live_url) = patch.live_url {
            project.live_url = live_url;
        }
        if let Some(featured) = patch.featured {
            project.featured = featured;
        }
        if let Some(images) = patch.images {
            project.images = images;
        }
        if let Some(image_url) = patch.image_url {
            project.image_url = image_url;
        }
        if let Some(primary) = patch.primary_image_index {
            project.primary_image_index = primary;
        }
        project.updated_at = stamp;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.delete_calls.lock().unwrap().push(id.to_string());
        self.delete_started.store(true, Ordering::SeqCst);

        let gate = self.delete_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "injected delete failure"
            )));
        }

        self.docs.lock().unwrap().remove(id);
        Ok(())
    }
}

/// In-memory [`BlobStore`] double recording delete attempts, with optional
/// per-file latency and failure injection.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub deleted: Mutex<Vec<String>>,
    fail_delete_urls: Mutex<HashSet<String>>,
    fail_put_fragments: Mutex<Vec<String>>,
    put_delays: Mutex<Vec<(String, u64)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_delete_of(&self, url: &str) {
        self.fail_delete_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn fail_put_containing(&self, fragment: &str) {
        self.fail_put_fragments
            .lock()
            .unwrap()
            .push(fragment.to_string());
    }

    /// Delay any put whose key contains `fragment` by `millis`.
    pub fn delay_put_containing(&self, fragment: &str, millis: u64) {
        self.put_delays
            .lock()
            .unwrap()
            .push((fragment.to_string(), millis));
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<String, StorageError> {
        let delay = self
            .put_delays
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| key.contains(fragment))
            .map(|(_, millis)| *millis);
        if let Some(millis) = delay {
            tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
        }

        let should_fail = self
            .fail_put_fragments
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| key.contains(fragment));
        if should_fail {
            return Err(StorageError::Io(std::io::Error::other(
                "injected upload failure",
            )));
        }

        if let Some(report) = progress {
            report(0);
            report(50);
            report(100);
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(format!("mem://{key}"))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.lock().unwrap().contains_key(key))
    }

    async fn delete(&self, url: &str) -> Result<bool, StorageError> {
        self.deleted.lock().unwrap().push(url.to_string());
        if self.fail_delete_urls.lock().unwrap().contains(url) {
            return Err(StorageError::Io(std::io::Error::other(
                "injected delete failure",
            )));
        }
        let key = url
            .strip_prefix("mem://")
            .ok_or_else(|| StorageError::InvalidKey(url.to_string()))?;
        Ok(self.blobs.lock().unwrap().remove(key).is_some())
    }
}

pub struct TestCatalog {
    pub store: Arc<MemoryProjectStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub service: Arc<CatalogService>,
}

impl TestCatalog {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryProjectStore::new()))
    }

    pub fn with_store(store: Arc<MemoryProjectStore>) -> Self {
        let blobs = Arc::new(MemoryBlobStore::new());
        let service = Arc::new(CatalogService::new(store.clone(), blobs.clone()));
        Self {
            store,
            blobs,
            service,
        }
    }

    pub fn client(&self) -> Arc<CatalogClient> {
        Arc::new(CatalogClient::new(self.service.clone()))
    }

    /// Seed `count` bare projects straight through the store adapter.
    pub async fn seed(&self, count: usize) -> Vec<String> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let id = self
                .store
                .create(ProjectRecord {
                    title: format!("Project {i}"),
                    description: "seeded".into(),
                    ..Default::default()
                })
                .await
                .expect("seed project");
            ids.push(id);
        }
        ids
    }
}

pub fn draft(title: &str) -> ProjectDraft {
    ProjectDraft {
        title: title.to_string(),
        description: "a project".into(),
        technologies: vec!["rust".into()],
        ..Default::default()
    }
}

pub fn image(name: &str) -> NewImage {
    NewImage {
        filename: name.to_string(),
        bytes: vec![0xAB; 256],
    }
}
