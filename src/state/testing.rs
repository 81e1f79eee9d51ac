//! In-memory asset store for unit tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use super::data::{Cursor, Photo, PhotoPage, SortOrder};
use super::library::AssetStore;
use crate::error::StoreError;

/// Blocks store calls until opened
#[derive(Default)]
struct Gate {
    closed: Mutex<bool>,
    cv: Condvar,
    waiting: AtomicUsize,
}

impl Gate {
    fn pass(&self) {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let mut closed = self.closed.lock().unwrap();
        while *closed {
            closed = self.cv.wait(closed).unwrap();
        }
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }

    fn set(&self, closed: bool) {
        *self.closed.lock().unwrap() = closed;
        self.cv.notify_all();
    }

    async fn wait_for(&self, count: usize) {
        while self.waiting.load(Ordering::SeqCst) < count {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    /// Oldest first
    photos: Mutex<Vec<Photo>>,
    clock: AtomicI64,
    pub list_calls: AtomicUsize,
    pub saved_paths: Mutex<Vec<PathBuf>>,
    pub fail_lists: AtomicBool,
    pub fail_saves: AtomicBool,
    list_gate: Gate,
    save_gate: Gate,
}

impl FakeStore {
    pub fn with_photos(count: usize) -> Self {
        let store = Self::default();
        for i in 0..count {
            store.push(format!("file:///album/seed{}.jpg", i));
        }
        store
    }

    pub fn len(&self) -> usize {
        self.photos.lock().unwrap().len()
    }

    pub fn hold_lists(&self) {
        self.list_gate.set(true);
    }

    pub fn release_lists(&self) {
        self.list_gate.set(false);
    }

    pub async fn wait_for_held_list(&self) {
        self.list_gate.wait_for(1).await;
    }

    pub fn hold_saves(&self) {
        self.save_gate.set(true);
    }

    pub fn release_saves(&self) {
        self.save_gate.set(false);
    }

    pub async fn wait_for_held_saves(&self, count: usize) {
        self.save_gate.wait_for(count).await;
    }

    fn push(&self, uri: String) -> Photo {
        let time = self.clock.fetch_add(1000, Ordering::SeqCst) + 1000;
        let photo = Photo {
            id: format!("asset-{}", time),
            filename: uri.rsplit('/').next().unwrap_or_default().to_string(),
            uri,
            creation_time: time,
        };
        self.photos.lock().unwrap().push(photo.clone());
        photo
    }
}

impl AssetStore for FakeStore {
    fn save_to_album(&self, path: &Path) -> Result<Photo, StoreError> {
        self.save_gate.pass();
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::SaveFailed {
                path: path.to_path_buf(),
                reason: "gallery unavailable".into(),
            });
        }
        self.saved_paths.lock().unwrap().push(path.to_path_buf());
        Ok(self.push(format!("file://{}", path.display())))
    }

    fn list_album_page(
        &self,
        cursor: Option<&Cursor>,
        page_size: usize,
        order: SortOrder,
    ) -> Result<PhotoPage, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.list_gate.pass();
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StoreError::QueryFailed("gallery unavailable".into()));
        }

        let mut photos = self.photos.lock().unwrap().clone();
        if !order.is_ascending() {
            photos.reverse();
        }
        let start = match cursor {
            Some(c) => c
                .as_str()
                .parse::<usize>()
                .map_err(|_| StoreError::QueryFailed("bad cursor".into()))?,
            None => 0,
        };
        let end = (start + page_size).min(photos.len());
        let has_more = end < photos.len();

        Ok(PhotoPage {
            items: photos[start.min(end)..end].to_vec(),
            cursor: has_more.then(|| Cursor::new(end.to_string())),
            has_more,
        })
    }

    fn delete_assets(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut photos = self.photos.lock().unwrap();
        let mut missing = Vec::new();
        for id in ids {
            match photos.iter().position(|p| &p.id == id) {
                Some(i) => {
                    photos.remove(i);
                }
                None => missing.push(id.clone()),
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::DeleteFailed(missing.join(", ")))
        }
    }
}
