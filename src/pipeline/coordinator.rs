/// Capture finishing coordinator
///
/// Takes freshly captured files and finishes them in the background:
/// watermark (when enabled), save to the album, publish the new latest
/// photo, refresh the index. At most `max_concurrent` captures are in
/// flight; anything beyond that is dropped, not queued, so a burst of
/// shutter presses can never pile up decode buffers.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::FinisherConfig;
use crate::error::FinishError;
use crate::state::data::Photo;
use crate::state::index::PhotoIndex;
use crate::state::library::AssetStore;
use crate::state::settings::{LiveSettings, SettingsSnapshot};
use crate::watermark::compositor::{Compositor, WatermarkRequest};

/// Counters for submissions, readable at any time
#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicUsize,
    dropped: AtomicUsize,
    finished: AtomicUsize,
    failed: AtomicUsize,
    fallbacks: AtomicUsize,
}

/// Point-in-time copy of the coordinator counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    pub accepted: usize,
    pub dropped: usize,
    pub finished: usize,
    pub failed: usize,
    /// Finishes that saved the original because watermarking failed
    pub fallbacks: usize,
}

struct Inner {
    compositor: Arc<Compositor>,
    store: Arc<dyn AssetStore>,
    index: Arc<PhotoIndex>,
    settings: LiveSettings,
    latest: watch::Sender<Option<Photo>>,
    last_confirmed: Mutex<Option<Photo>>,
    in_flight: AtomicUsize,
    max_concurrent: usize,
    date_format: String,
    fallback_to_original: bool,
    counters: Counters,
}

/// Releases one in-flight slot when dropped, whatever happened to the task
struct InFlightSlot {
    inner: Arc<Inner>,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[derive(Clone)]
pub struct FinishingCoordinator {
    inner: Arc<Inner>,
}

impl FinishingCoordinator {
    pub fn new(
        compositor: Arc<Compositor>,
        store: Arc<dyn AssetStore>,
        index: Arc<PhotoIndex>,
        settings: LiveSettings,
        config: &FinisherConfig,
    ) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                compositor,
                store,
                index,
                settings,
                latest,
                last_confirmed: Mutex::new(None),
                in_flight: AtomicUsize::new(0),
                max_concurrent: config.max_concurrent.max(1),
                date_format: config.date_format.clone(),
                fallback_to_original: config.fallback_to_original,
                counters: Counters::default(),
            }),
        }
    }

    /// Finish a capture in the background.
    ///
    /// Returns immediately. `Err(FinishError::Dropped)` means the ceiling was
    /// reached and the file was left untouched. The handle resolves to the
    /// saved photo; callers that only fire and forget may drop it.
    /// Must be called from within a Tokio runtime.
    pub fn submit(
        &self,
        source_path: impl Into<PathBuf>,
    ) -> Result<JoinHandle<Result<Photo, FinishError>>, FinishError> {
        let source = source_path.into();
        let slot = self.admit(&source)?;
        Ok(self.dispatch(slot, source))
    }

    /// Show a placeholder for a capture, then finish it.
    ///
    /// The placeholder is only published once the capture is admitted, so
    /// a dropped capture never leaves a "capturing..." entry behind.
    pub fn capture_taken(
        &self,
        source_path: impl Into<PathBuf>,
    ) -> Result<JoinHandle<Result<Photo, FinishError>>, FinishError> {
        let source = source_path.into();
        let slot = self.admit(&source)?;

        let placeholder = Photo::optimistic(placeholder_uri(&source));
        self.inner.index.insert_optimistic(placeholder.clone());
        self.inner.latest.send_replace(Some(placeholder));

        Ok(self.dispatch(slot, source))
    }

    /// Observable latest photo, updated on every successful finish
    pub fn latest_photo(&self) -> watch::Receiver<Option<Photo>> {
        self.inner.latest.subscribe()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn index(&self) -> &Arc<PhotoIndex> {
        &self.inner.index
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let c = &self.inner.counters;
        Diagnostics {
            accepted: c.accepted.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            finished: c.finished.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            fallbacks: c.fallbacks.load(Ordering::Relaxed),
        }
    }

    fn admit(&self, source: &Path) -> Result<InFlightSlot, FinishError> {
        let inner = &self.inner;
        let mut current = inner.in_flight.load(Ordering::Acquire);
        loop {
            if current >= inner.max_concurrent {
                inner.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "⏭️  Finishing queue full ({} in flight), dropping {}",
                    current,
                    source.display()
                );
                return Err(FinishError::Dropped {
                    path: source.to_path_buf(),
                    limit: inner.max_concurrent,
                });
            }
            match inner.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        inner.counters.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(InFlightSlot {
            inner: Arc::clone(inner),
        })
    }

    fn dispatch(
        &self,
        slot: InFlightSlot,
        source: PathBuf,
    ) -> JoinHandle<Result<Photo, FinishError>> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // Held until the task ends, success or not
            let _slot = slot;
            let result = inner.finish(&source).await;
            inner.report(&source, &result).await;
            result
        })
    }
}

impl Inner {
    async fn finish(&self, source: &Path) -> Result<Photo, FinishError> {
        // Read settings now, not when the capture was requested
        let snapshot = self.settings.snapshot();

        let final_path = if snapshot.watermark.enabled {
            let request = self.build_request(source, snapshot);
            match Arc::clone(&self.compositor).composite_async(request).await {
                Ok(path) => path,
                Err(err) if self.fallback_to_original => {
                    self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
                    log::warn!("⚠️  Watermark failed, saving original {}: {}", source.display(), err);
                    source.to_path_buf()
                }
                Err(err) => return Err(err),
            }
        } else {
            source.to_path_buf()
        };

        let store = Arc::clone(&self.store);
        let saved_from = final_path.clone();
        let saved = tokio::task::spawn_blocking(move || store.save_to_album(&saved_from))
            .await
            .map_err(|e| FinishError::TaskAborted(e.to_string()))
            .and_then(|r| r.map_err(FinishError::from));

        // The album keeps its own copy; the composited file is scratch
        if final_path != source {
            if let Err(err) = tokio::fs::remove_file(&final_path).await {
                log::debug!("Could not remove {}: {}", final_path.display(), err);
            }
        }

        saved
    }

    fn build_request(&self, source: &Path, snapshot: SettingsSnapshot) -> WatermarkRequest {
        let (location, address) = match snapshot.location {
            Some(loc) => (Some(loc.formatted), loc.address),
            None => (None, None),
        };
        WatermarkRequest {
            source: source.to_path_buf(),
            date: Local::now().format(&self.date_format).to_string(),
            location,
            address,
            accent_color: snapshot.watermark.accent_color,
        }
    }

    async fn report(&self, source: &Path, result: &Result<Photo, FinishError>) {
        match result {
            Ok(photo) => {
                self.counters.finished.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut confirmed) = self.last_confirmed.lock() {
                    *confirmed = Some(photo.clone());
                }
                self.latest.send_replace(Some(photo.clone()));
                log::info!("✅ Finished {} as #{}", source.display(), photo.id);
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                log::error!("❌ Finishing {} failed: {}", source.display(), err);

                // Never leave a placeholder standing in for a photo that won't arrive
                // Only this capture's own placeholder; others are still in flight
                let own_placeholder = placeholder_uri(source);
                let confirmed = self.last_confirmed.lock().ok().and_then(|c| c.clone());
                self.latest.send_if_modified(|latest| {
                    if latest
                        .as_ref()
                        .is_some_and(|p| p.is_optimistic() && p.uri == own_placeholder)
                    {
                        *latest = confirmed;
                        true
                    } else {
                        false
                    }
                });
            }
        }

        if let Err(err) = self.index.reconcile().await {
            log::warn!("⚠️  Index refresh after finishing failed: {}", err);
        }
    }
}

fn placeholder_uri(source: &Path) -> String {
    format!("file://{}", source.display())
}

impl std::fmt::Debug for FinishingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinishingCoordinator")
            .field("in_flight", &self.in_flight())
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("diagnostics", &self.diagnostics())
            .finish()
    }
}
