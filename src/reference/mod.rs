//! Session-scoped store of reference images.
//!
//! A key is absent until its fetch finishes, so "missing" and "downloading" look the
//! same to readers. Entries are only added or replaced, never removed.

pub mod resolver;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::error::SketchError;

pub use resolver::DefaultResolver;

/// Hint shown for a reference whose fetch has not finished.
pub const DOWNLOADING_HINT: &str = "downloading…";
/// Status of a reference whose fetch failed.
pub const FAILED_HINT: &str = "failed to download";

// ── Images ──────────────────────────────────────────────────────

/// A decoded reference image.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    /// URL or path the image was loaded from.
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<image::DynamicImage>,
}

impl ReferenceImage {
    pub fn from_dynamic(source: impl Into<String>, pixels: image::DynamicImage) -> Self {
        Self {
            source: source.into(),
            width: pixels.width(),
            height: pixels.height(),
            pixels: Arc::new(pixels),
        }
    }

    /// A transparent image of the given size.
    pub fn blank(source: impl Into<String>, width: u32, height: u32) -> Self {
        Self::from_dynamic(source, image::DynamicImage::new_rgba8(width, height))
    }

    pub fn dimensions_label(&self) -> String {
        format!("{}×{}", self.width, self.height)
    }
}

/// Fetches and decodes the image behind a URL.
pub trait ReferenceResolver: Send + Sync {
    fn resolve(&self, url: &str) -> BoxFuture<'static, Result<ReferenceImage, SketchError>>;
}

// ── Entries ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum ReferenceState {
    /// `fresh` is true only while the arrival that stored the image is being handled.
    Downloaded { image: ReferenceImage, fresh: bool },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub key: String,
    pub state: ReferenceState,
}

impl ReferenceEntry {
    pub fn image(&self) -> Option<&ReferenceImage> {
        match &self.state {
            ReferenceState::Downloaded { image, .. } => Some(image),
            ReferenceState::Failed { .. } => None,
        }
    }

    /// Human-readable status used as the line hint.
    pub fn status(&self) -> String {
        match &self.state {
            ReferenceState::Downloaded { image, fresh: true } => {
                format!("downloaded, {}", image.dimensions_label())
            }
            ReferenceState::Downloaded { image, fresh: false } => {
                format!("cached, {}", image.dimensions_label())
            }
            ReferenceState::Failed { .. } => FAILED_HINT.to_string(),
        }
    }
}

// ── Arrival signal ──────────────────────────────────────────────

/// Sent when a fetch reaches a terminal state. The fetch task waits until the
/// arrival is acknowledged or dropped before relabelling a fresh image as cached.
#[derive(Debug)]
pub struct ReferenceArrival {
    pub key: String,
    ack: Option<oneshot::Sender<()>>,
}

impl ReferenceArrival {
    pub fn acknowledge(mut self) {
        if let Some(ack) = self.ack.take() {
            let _ = ack.send(());
        }
    }
}

/// Sending half of the arrival channel, handed to the cache with each request.
/// Dropping the receiver detaches the owner; later arrivals are discarded.
#[derive(Debug, Clone)]
pub struct ArrivalNotifier {
    tx: mpsc::UnboundedSender<ReferenceArrival>,
}

impl ArrivalNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReferenceArrival>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A notifier nobody listens to.
    pub fn detached() -> Self {
        Self::channel().0
    }

    fn notify(&self, key: &str) -> Option<oneshot::Receiver<()>> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let arrival = ReferenceArrival {
            key: key.to_string(),
            ack: Some(ack_tx),
        };
        self.tx.send(arrival).ok().map(|()| ack_rx)
    }
}

// ── Cache ───────────────────────────────────────────────────────

#[derive(Default)]
struct CacheTable {
    entries: HashMap<String, ReferenceEntry>,
    in_flight: HashSet<String>,
}

struct CacheInner {
    table: Mutex<CacheTable>,
    resolver: Arc<dyn ReferenceResolver>,
    runtime: Handle,
}

/// Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct ReferenceCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for ReferenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.inner.table.lock();
        f.debug_struct("ReferenceCache")
            .field("entries", &table.entries.len())
            .field("in_flight", &table.in_flight.len())
            .finish()
    }
}

impl ReferenceCache {
    pub fn new(resolver: Arc<dyn ReferenceResolver>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                table: Mutex::new(CacheTable::default()),
                resolver,
                runtime,
            }),
        }
    }

    /// Build a cache that spawns fetches on the runtime of the calling context.
    pub fn on_current_runtime(resolver: Arc<dyn ReferenceResolver>) -> Result<Self, SketchError> {
        let runtime = Handle::try_current().map_err(|_| SketchError::NoRuntime)?;
        Ok(Self::new(resolver, runtime))
    }

    /// Pure lookup; never starts a fetch.
    pub fn get(&self, key: &str) -> Option<ReferenceEntry> {
        self.inner.table.lock().entries.get(key).cloned()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.inner.table.lock().in_flight.contains(key)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.table.lock().in_flight.len()
    }

    pub fn len(&self) -> usize {
        self.inner.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start fetching `url` into `key` unless the key is already cached or in flight.
    /// Returns whether a fetch was started.
    pub fn request(&self, key: &str, url: &str, notifier: &ArrivalNotifier) -> bool {
        {
            let mut table = self.inner.table.lock();
            if table.entries.contains_key(key) || table.in_flight.contains(key) {
                return false;
            }
            table.in_flight.insert(key.to_string());
        }

        tracing::debug!(key, url, "requesting reference");
        let future = self.inner.resolver.resolve(url);
        let cache = self.clone();
        let key = key.to_string();
        let url = url.to_string();
        let notifier = notifier.clone();
        self.inner.runtime.spawn(async move {
            let result = future.await;
            cache.complete(&key, &url, result, &notifier).await;
        });
        true
    }

    /// Load a local image under an explicit name, e.g. a file picked by the user.
    pub fn import(&self, name: &str, path: &Path, notifier: &ArrivalNotifier) -> bool {
        self.request(name, &path.to_string_lossy(), notifier)
    }

    async fn complete(
        &self,
        key: &str,
        url: &str,
        result: Result<ReferenceImage, SketchError>,
        notifier: &ArrivalNotifier,
    ) {
        let downloaded = result.is_ok();
        let state = match result {
            Ok(image) => {
                tracing::info!(key, width = image.width, height = image.height, "reference downloaded");
                ReferenceState::Downloaded { image, fresh: true }
            }
            Err(e) => {
                tracing::warn!(key, url, error = %e, "reference download failed");
                ReferenceState::Failed {
                    reason: e.to_string(),
                }
            }
        };
        self.inner.table.lock().entries.insert(
            key.to_string(),
            ReferenceEntry {
                key: key.to_string(),
                state,
            },
        );

        // Queue the arrival before leaving the in-flight set so that an observer
        // seeing no pending fetches always finds the message already queued.
        let ack = notifier.notify(key);
        self.inner.table.lock().in_flight.remove(key);

        if let Some(ack) = ack {
            let _ = ack.await;
        }
        if downloaded {
            self.mark_cached(key);
        }
    }

    fn mark_cached(&self, key: &str) {
        let mut table = self.inner.table.lock();
        if let Some(ReferenceEntry {
            state: ReferenceState::Downloaded { fresh, .. },
            ..
        }) = table.entries.get_mut(key)
        {
            *fresh = false;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::FutureExt;

    use super::*;

    /// Resolves every URL to a blank image, or fails for URLs containing "missing".
    #[derive(Default)]
    pub(crate) struct FakeResolver {
        pub calls: AtomicUsize,
    }

    impl ReferenceResolver for FakeResolver {
        fn resolve(&self, url: &str) -> BoxFuture<'static, Result<ReferenceImage, SketchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let url = url.to_string();
            async move {
                if url.contains("missing") {
                    Err(SketchError::ReferenceDownloadFailed {
                        url,
                        message: "404 Not Found".into(),
                    })
                } else {
                    Ok(ReferenceImage::blank(url, 40, 30))
                }
            }
            .boxed()
        }
    }

    fn cache_with(resolver: &Arc<FakeResolver>) -> ReferenceCache {
        ReferenceCache::on_current_runtime(resolver.clone()).unwrap()
    }

    #[tokio::test]
    async fn get_never_fetches() {
        let resolver = Arc::new(FakeResolver::default());
        let cache = cache_with(&resolver);
        assert!(cache.get("pic.png").is_none());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn arrival_relabels_after_acknowledgement() {
        let resolver = Arc::new(FakeResolver::default());
        let cache = cache_with(&resolver);
        let (notifier, mut arrivals) = ArrivalNotifier::channel();

        assert!(cache.request("pic.png", "pic.png", &notifier));
        assert!(cache.is_pending("pic.png"));

        let arrival = arrivals.recv().await.expect("arrival");
        assert_eq!(arrival.key, "pic.png");
        let entry = cache.get("pic.png").expect("entry stored before arrival");
        assert_eq!(entry.status(), "downloaded, 40×30");

        arrival.acknowledge();
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while cache.get("pic.png").map(|e| e.status()) != Some("cached, 40×30".to_string()) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("entry relabelled as cached");
        assert_eq!(cache.pending_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_requests_fetch_once() {
        let resolver = Arc::new(FakeResolver::default());
        let cache = cache_with(&resolver);
        let (notifier, mut arrivals) = ArrivalNotifier::channel();

        assert!(cache.request("pic.png", "pic.png", &notifier));
        assert!(!cache.request("pic.png", "pic.png", &notifier));
        arrivals.recv().await.expect("arrival").acknowledge();
        assert!(!cache.request("pic.png", "pic.png", &notifier));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_recorded_and_signalled() {
        let resolver = Arc::new(FakeResolver::default());
        let cache = cache_with(&resolver);
        let (notifier, mut arrivals) = ArrivalNotifier::channel();

        cache.request("missing.png", "missing.png", &notifier);
        arrivals.recv().await.expect("arrival").acknowledge();
        let entry = cache.get("missing.png").expect("failed entry");
        assert_eq!(entry.status(), FAILED_HINT);
        assert!(entry.image().is_none());
    }

    #[tokio::test]
    async fn detached_owner_still_settles_entry() {
        let resolver = Arc::new(FakeResolver::default());
        let cache = cache_with(&resolver);
        let notifier = ArrivalNotifier::detached();

        cache.request("pic.png", "pic.png", &notifier);
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while cache.get("pic.png").map(|e| e.status()) != Some("cached, 40×30".to_string()) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("entry cached without a listener");
    }

    #[tokio::test]
    async fn import_uses_explicit_name_as_key() {
        let resolver = Arc::new(FakeResolver::default());
        let cache = cache_with(&resolver);
        let (notifier, mut arrivals) = ArrivalNotifier::channel();

        cache.import("sketch.png", Path::new("/tmp/photos/IMG_0001.png"), &notifier);
        let arrival = arrivals.recv().await.expect("arrival");
        assert_eq!(arrival.key, "sketch.png");
        let entry = cache.get("sketch.png").expect("entry");
        assert_eq!(entry.image().map(|i| i.source.as_str()), Some("/tmp/photos/IMG_0001.png"));
    }
}
