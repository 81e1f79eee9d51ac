/// Paginated photo index
///
/// Holds the listing the gallery shows: pages fetched from the album with
/// an opaque cursor, plus optimistic placeholders for captures that are
/// still being finished. Invariants kept here:
/// - no id appears twice in `photos()`
/// - the listing follows the chosen sort order
/// - at most one `load_more` fetch is in flight
/// - a page that arrives after a newer `refresh` started is discarded

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::data::{Cursor, Photo, PhotoPage, SortOrder};
use super::library::AssetStore;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct IndexState {
    /// Store-backed photos in `order`
    items: Vec<Photo>,
    /// Placeholders, newest first
    optimistic: Vec<Photo>,
    cursor: Option<Cursor>,
    has_more: bool,
    order: SortOrder,
    loading_more: bool,
    /// Bumped by every refresh; stale fetches compare against it
    generation: u64,
}

impl IndexState {
    fn contains(&self, id: &str) -> bool {
        self.items.iter().chain(&self.optimistic).any(|p| p.id == id)
    }
}

pub struct PhotoIndex {
    store: Arc<dyn AssetStore>,
    page_size: usize,
    state: Mutex<IndexState>,
}

impl PhotoIndex {
    pub fn new(store: Arc<dyn AssetStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            state: Mutex::new(IndexState::default()),
        }
    }

    /// Fetch the first page in `order`, replacing the listing and cursor.
    /// Placeholders are dropped: the store is authoritative after a refresh.
    /// On failure the previous listing, cursor and order stay in place.
    pub async fn refresh(&self, order: SortOrder) -> Result<PhotoPage, StoreError> {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.loading_more = false;
            state.generation
        };

        let page_size = self.page_size;
        let page = self
            .run_store(StoreError::QueryFailed, move |store| {
                store.list_album_page(None, page_size, order)
            })
            .await?;

        let mut state = self.lock();
        if state.generation != generation {
            log::debug!("Discarding refresh superseded by a newer one");
            return Ok(page);
        }

        let mut seen = HashSet::new();
        state.items = page
            .items
            .iter()
            .filter(|p| seen.insert(p.id.clone()))
            .cloned()
            .collect();
        state.optimistic.clear();
        state.order = order;
        state.cursor = page.cursor.clone();
        state.has_more = page.has_more;

        log::debug!(
            "🔄 Index refreshed: {} photos, has_more={}",
            state.items.len(),
            state.has_more
        );
        Ok(page)
    }

    /// Fetch and append the next page.
    ///
    /// Returns `Ok(None)` without touching the store when there is nothing
    /// more to load, a load is already in flight, or the page arrived after
    /// a newer refresh.
    pub async fn load_more(&self) -> Result<Option<PhotoPage>, StoreError> {
        let (cursor, order, generation) = {
            let mut state = self.lock();
            if !state.has_more || state.loading_more {
                return Ok(None);
            }
            state.loading_more = true;
            (state.cursor.clone(), state.order, state.generation)
        };

        let page_size = self.page_size;
        let fetched = self
            .run_store(StoreError::QueryFailed, move |store| {
                store.list_album_page(cursor.as_ref(), page_size, order)
            })
            .await;

        let mut state = self.lock();
        if state.generation != generation {
            return Ok(None);
        }
        state.loading_more = false;

        let page = fetched?;
        for photo in &page.items {
            if !state.contains(&photo.id) {
                state.items.push(photo.clone());
            }
        }
        state.cursor = page.cursor.clone();
        state.has_more = page.has_more;

        Ok(Some(page))
    }

    /// Show a placeholder at the newest end of the listing
    pub fn insert_optimistic(&self, photo: Photo) {
        let mut state = self.lock();
        if !state.contains(&photo.id) {
            state.optimistic.insert(0, photo);
        }
    }

    /// Re-fetch after a finish so placeholders give way to real entries
    pub async fn reconcile(&self) -> Result<PhotoPage, StoreError> {
        let order = self.lock().order;
        self.refresh(order).await
    }

    /// Delete from the store, then refresh.
    ///
    /// Nothing is removed locally first; after a partial store failure the
    /// refreshed listing shows exactly what survived, and the delete error
    /// is returned.
    pub async fn delete(&self, ids: &[String]) -> Result<PhotoPage, StoreError> {
        let ids = ids.to_vec();
        let deleted = self
            .run_store(StoreError::DeleteFailed, move |store| store.delete_assets(&ids))
            .await;

        let page = self.reconcile().await?;
        deleted.map(|_| page)
    }

    /// Current listing: placeholders and store pages merged in sort order
    pub fn photos(&self) -> Vec<Photo> {
        let state = self.lock();
        match state.order {
            SortOrder::Descending => state
                .optimistic
                .iter()
                .chain(&state.items)
                .cloned()
                .collect(),
            SortOrder::Ascending => state
                .items
                .iter()
                .chain(state.optimistic.iter().rev())
                .cloned()
                .collect(),
        }
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn order(&self) -> SortOrder {
        self.lock().order
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        // State stays consistent between statements, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a blocking store call on the blocking pool
    async fn run_store<T, F>(
        &self,
        on_abort: fn(String) -> StoreError,
        call: F,
    ) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn AssetStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || call(store.as_ref()))
            .await
            .map_err(|e| on_abort(format!("store task failed: {}", e)))?
    }
}

impl std::fmt::Debug for PhotoIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PhotoIndex")
            .field("items", &state.items.len())
            .field("optimistic", &state.optimistic.len())
            .field("has_more", &state.has_more)
            .field("order", &state.order)
            .finish()
    }
}
