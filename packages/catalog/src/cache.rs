use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common::storage::ProgressSink;
use tokio_util::sync::CancellationToken;

use crate::cursor::Cursor;
use crate::project::{NewImage, Project, ProjectDraft, ProjectPatch};
use crate::service::{CatalogError, CatalogService};
use crate::store::ProjectPage;

/// Cache key for a query result; equality is structural.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
    List { page_size: usize },
    Detail { id: String },
}

#[derive(Clone)]
struct ListEntry {
    /// Pages in fetch order; concatenated for display.
    pages: Vec<ProjectPage>,
    /// A stale entry keeps serving its pages to synchronous readers, but
    /// the next read-through refetches page 1 and discards later pages:
    /// cursors chained off an invalidated first page are no longer valid.
    stale: bool,
    fetching: bool,
}

#[derive(Clone)]
enum CacheSlot {
    List(ListEntry),
    Detail(Project),
}

struct CacheInner {
    entries: HashMap<QueryKey, CacheSlot>,
    /// Cancels every in-flight list fetch; replaced after each cancellation
    /// so later fetches get a fresh token.
    refetch_cancel: CancellationToken,
    /// Bumped whenever the list key space is rewritten. Fetches capture the
    /// epoch at start and discard their result if it moved.
    epoch: u64,
}

/// Saved list-key state for the optimistic-delete rollback.
struct ListSnapshot(Vec<(QueryKey, ListEntry)>);

/// Process-wide, key-addressed cache of query results coordinating
/// optimistic updates around [`CatalogService`] mutations.
///
/// The cache is the only component with memory beyond a single call and is
/// never the source of truth: it holds a read-through copy served until one
/// of the documented invalidation points rewrites it. One instance is
/// created at process start and handed to consumers; all cache writes go
/// through these entry points.
pub struct CatalogClient {
    service: Arc<CatalogService>,
    inner: Mutex<CacheInner>,
}

impl CatalogClient {
    pub fn new(service: Arc<CatalogService>) -> Self {
        Self {
            service,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                refetch_cancel: CancellationToken::new(),
                epoch: 0,
            }),
        }
    }

    // ---- reads ----

    /// All cached pages for `page_size` concatenated in fetch order,
    /// fetching page 1 first when nothing fresh is cached.
    pub async fn projects(&self, page_size: usize) -> Result<Vec<Project>, CatalogError> {
        if let Some(items) = self.fresh_items(page_size) {
            return Ok(items);
        }
        self.refetch_first_page(page_size).await
    }

    /// Fetch the page after the last cached one, chaining its cursor.
    ///
    /// Returns `false` without fetching when no fresh first page is cached
    /// or the listing is exhausted.
    pub async fn fetch_next_page(&self, page_size: usize) -> Result<bool, CatalogError> {
        let Some((cursor, token, epoch)) = self.begin_next_page_fetch(page_size) else {
            return Ok(false);
        };

        let outcome = tokio::select! {
            _ = token.cancelled() => None,
            result = self.service.list(page_size, Some(&cursor)) => Some(result),
        };

        match outcome {
            None => {
                self.end_list_fetch(page_size);
                Ok(false)
            }
            Some(Err(e)) => {
                self.end_list_fetch(page_size);
                Err(e)
            }
            Some(Ok(page)) => {
                self.commit_appended_page(page_size, epoch, page);
                Ok(true)
            }
        }
    }

    /// Whether another page can be requested for `page_size`.
    pub fn has_more(&self, page_size: usize) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.entries.get(&QueryKey::List { page_size }) {
            Some(CacheSlot::List(entry)) if !entry.stale => entry
                .pages
                .last()
                .is_some_and(|page| page.next_cursor.is_some()),
            _ => false,
        }
    }

    /// Synchronous peek at the cached listing, stale or not. Never fetches.
    pub fn cached_projects(&self, page_size: usize) -> Option<Vec<Project>> {
        let inner = self.inner.lock().unwrap();
        match inner.entries.get(&QueryKey::List { page_size }) {
            Some(CacheSlot::List(entry)) if !entry.pages.is_empty() => {
                Some(concat_pages(&entry.pages))
            }
            _ => None,
        }
    }

    /// Whether a fetch for the listing is currently in flight.
    pub fn is_fetching(&self, page_size: usize) -> bool {
        let inner = self.inner.lock().unwrap();
        matches!(
            inner.entries.get(&QueryKey::List { page_size }),
            Some(CacheSlot::List(entry)) if entry.fetching
        )
    }

    /// Single project, read-through against the detail key.
    pub async fn project(&self, id: &str) -> Result<Option<Project>, CatalogError> {
        {
            let inner = self.inner.lock().unwrap();
            if let Some(CacheSlot::Detail(project)) =
                inner.entries.get(&QueryKey::Detail { id: id.to_string() })
            {
                return Ok(Some(project.clone()));
            }
        }

        let fetched = self.service.get(id).await?;
        if let Some(project) = &fetched {
            let mut inner = self.inner.lock().unwrap();
            inner.entries.insert(
                QueryKey::Detail { id: id.to_string() },
                CacheSlot::Detail(project.clone()),
            );
        }
        Ok(fetched)
    }

    // ---- mutations ----

    /// Create a project, then invalidate the list key space so the next
    /// paint re-fetches page 1.
    pub async fn create(
        &self,
        draft: ProjectDraft,
        images: Vec<NewImage>,
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<String, CatalogError> {
        let id = self.service.create(draft, images, progress).await?;
        self.invalidate_lists();
        Ok(id)
    }

    /// Update a project, then invalidate its detail key and the list key
    /// space.
    pub async fn update(
        &self,
        id: &str,
        patch: ProjectPatch,
        new_images: Vec<NewImage>,
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<(), CatalogError> {
        self.service.update(id, patch, new_images, progress).await?;
        self.invalidate_detail(id);
        self.invalidate_lists();
        Ok(())
    }

    /// Optimistic delete.
    ///
    /// Cancels in-flight list fetches first so a stale read cannot
    /// re-insert the row, snapshots the cached list pages, filters the id
    /// out of every page for immediate effect, then issues the delete. On
    /// failure the exact snapshot is restored and the error surfaced. In
    /// all cases the list key space is invalidated afterwards to reconcile
    /// with server truth.
    pub async fn delete(&self, id: &str) -> Result<(), CatalogError> {
        let snapshot = self.begin_optimistic_delete(id);

        let result = self.service.remove(id).await;

        if result.is_err() {
            self.restore_lists(snapshot);
        }
        self.invalidate_detail(id);
        self.invalidate_lists();
        result
    }

    // ---- cache internals ----
    // Every helper takes the lock for a short synchronous section; no
    // awaits happen while it is held.

    fn fresh_items(&self, page_size: usize) -> Option<Vec<Project>> {
        let inner = self.inner.lock().unwrap();
        match inner.entries.get(&QueryKey::List { page_size }) {
            Some(CacheSlot::List(entry)) if !entry.stale && !entry.pages.is_empty() => {
                Some(concat_pages(&entry.pages))
            }
            _ => None,
        }
    }

    async fn refetch_first_page(&self, page_size: usize) -> Result<Vec<Project>, CatalogError> {
        let (token, epoch) = self.begin_list_fetch(page_size);

        let outcome = tokio::select! {
            _ = token.cancelled() => None,
            result = self.service.list(page_size, None) => Some(result),
        };

        match outcome {
            None => {
                // Cancelled mid-flight: serve whatever state the cancelling
                // mutation left behind instead of writing a stale result.
                self.end_list_fetch(page_size);
                Ok(self.cached_projects(page_size).unwrap_or_default())
            }
            Some(Err(e)) => {
                self.end_list_fetch(page_size);
                Err(e)
            }
            Some(Ok(page)) => {
                let items = page.items.clone();
                self.commit_first_page(page_size, epoch, page);
                Ok(items)
            }
        }
    }

    fn begin_list_fetch(&self, page_size: usize) -> (CancellationToken, u64) {
        let mut inner = self.inner.lock().unwrap();
        let token = inner.refetch_cancel.clone();
        let epoch = inner.epoch;
        let slot = inner
            .entries
            .entry(QueryKey::List { page_size })
            .or_insert_with(|| {
                CacheSlot::List(ListEntry {
                    pages: Vec::new(),
                    stale: true,
                    fetching: false,
                })
            });
        if let CacheSlot::List(entry) = slot {
            entry.fetching = true;
        }
        (token, epoch)
    }

    fn begin_next_page_fetch(&self, page_size: usize) -> Option<(Cursor, CancellationToken, u64)> {
        let mut inner = self.inner.lock().unwrap();
        let token = inner.refetch_cancel.clone();
        let epoch = inner.epoch;
        match inner.entries.get_mut(&QueryKey::List { page_size }) {
            Some(CacheSlot::List(entry)) if !entry.stale => {
                let cursor = entry.pages.last()?.next_cursor.clone()?;
                entry.fetching = true;
                Some((cursor, token, epoch))
            }
            _ => None,
        }
    }

    fn end_list_fetch(&self, page_size: usize) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(CacheSlot::List(entry)) = inner.entries.get_mut(&QueryKey::List { page_size })
        {
            entry.fetching = false;
        }
    }

    fn commit_first_page(&self, page_size: usize, epoch: u64, page: ProjectPage) {
        let mut inner = self.inner.lock().unwrap();
        if inner.epoch == epoch {
            inner.entries.insert(
                QueryKey::List { page_size },
                CacheSlot::List(ListEntry {
                    pages: vec![page],
                    stale: false,
                    fetching: false,
                }),
            );
        } else if let Some(CacheSlot::List(entry)) =
            inner.entries.get_mut(&QueryKey::List { page_size })
        {
            entry.fetching = false;
        }
    }

    fn commit_appended_page(&self, page_size: usize, epoch: u64, page: ProjectPage) {
        let mut inner = self.inner.lock().unwrap();
        let matches_epoch = inner.epoch == epoch;
        if let Some(CacheSlot::List(entry)) = inner.entries.get_mut(&QueryKey::List { page_size })
        {
            if matches_epoch && !entry.stale {
                entry.pages.push(page);
            }
            entry.fetching = false;
        }
    }

    /// Invalidation entry point for the list key space.
    fn invalidate_lists(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.epoch += 1;
        for slot in inner.entries.values_mut() {
            if let CacheSlot::List(entry) = slot {
                entry.stale = true;
            }
        }
    }

    /// Invalidation entry point for one detail key.
    fn invalidate_detail(&self, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.remove(&QueryKey::Detail { id: id.to_string() });
    }

    /// Steps one through three of the delete protocol: cancel in-flight
    /// list fetches, snapshot every list entry, and filter `id` out of
    /// every cached page. All under a single lock acquisition, so a
    /// cancelled fetch can never observe the cache between the
    /// cancellation and the speculative filter.
    fn begin_optimistic_delete(&self, id: &str) -> ListSnapshot {
        let mut inner = self.inner.lock().unwrap();
        inner.refetch_cancel.cancel();
        inner.refetch_cancel = CancellationToken::new();
        inner.epoch += 1;

        let mut snapshot = Vec::new();
        for (key, slot) in inner.entries.iter_mut() {
            if let CacheSlot::List(entry) = slot {
                let mut saved = entry.clone();
                // Cancelled fetches clear the live flag themselves; the
                // snapshot must not resurrect it on rollback.
                saved.fetching = false;
                snapshot.push((key.clone(), saved));

                for page in &mut entry.pages {
                    page.items.retain(|project| project.id != id);
                }
            }
        }
        ListSnapshot(snapshot)
    }

    /// Replace the entire list key space with a saved snapshot.
    fn restore_lists(&self, snapshot: ListSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.epoch += 1;
        inner
            .entries
            .retain(|key, _| !matches!(key, QueryKey::List { .. }));
        for (key, entry) in snapshot.0 {
            inner.entries.insert(key, CacheSlot::List(entry));
        }
    }
}

fn concat_pages(pages: &[ProjectPage]) -> Vec<Project> {
    pages.iter().flat_map(|page| page.items.clone()).collect()
}
