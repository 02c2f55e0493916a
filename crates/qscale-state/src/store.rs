//! PreviousSizeStore — last observed queue size per queue key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use qscale_core::CacheService;

/// Expiry of the cached copy of each queue size.
pub const CACHE_TTL: Duration = Duration::from_secs(900);

/// Pending cache writes beyond this are dropped.
const WRITE_QUEUE_CAPACITY: usize = 1024;

/// A single best-effort write handed to the background writer.
#[derive(Debug)]
struct CacheWrite {
    key: String,
    size: i64,
}

/// Thread-safe previous-size store.
///
/// Cheap to clone; all clones share the same map and writer queue.
#[derive(Clone)]
pub struct PreviousSizeStore {
    sizes: Arc<RwLock<HashMap<String, i64>>>,
    cache: Arc<dyn CacheService>,
    writes: mpsc::Sender<CacheWrite>,
}

/// Handle to the background cache writer.
///
/// The writer exits once every [`PreviousSizeStore`] clone is dropped and
/// the queued writes are drained.
pub struct CacheWriterHandle {
    handle: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Wait for the writer to drain and exit.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "cache writer task failed");
        }
    }
}

impl PreviousSizeStore {
    /// Create a store backed by `cache` and spawn its writer task.
    pub fn spawn(cache: Arc<dyn CacheService>) -> (Self, CacheWriterHandle) {
        Self::spawn_with_ttl(cache, CACHE_TTL)
    }

    /// Like [`spawn`](Self::spawn) with a custom cache TTL.
    pub fn spawn_with_ttl(
        cache: Arc<dyn CacheService>,
        ttl: Duration,
    ) -> (Self, CacheWriterHandle) {
        let (tx, rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let handle = tokio::spawn(run_cache_writer(cache.clone(), ttl, rx));
        let store = Self {
            sizes: Arc::new(RwLock::new(HashMap::new())),
            cache,
            writes: tx,
        };
        (store, CacheWriterHandle { handle })
    }

    /// Previous size for `key`, or `None` when there is no history.
    ///
    /// Checks the local map first, then the shared cache. Cache failures
    /// other than "not found" are logged and reported as no history.
    pub async fn get_queue_size(&self, key: &str) -> Option<i64> {
        if let Some(size) = self.sizes.read().await.get(key).copied() {
            return Some(size);
        }

        match self.cache.get(key).await {
            Ok(size) => {
                debug!(%key, size, "previous size loaded from cache");
                // A concurrent local write is newer than the cached copy.
                let mut sizes = self.sizes.write().await;
                Some(*sizes.entry(key.to_string()).or_insert(size))
            }
            Err(e) if e.is_not_found() => {
                debug!(%key, "no previous size");
                None
            }
            Err(e) => {
                warn!(%key, error = %e, "previous size lookup failed, assuming no history");
                None
            }
        }
    }

    /// Record `size` for `key` locally and queue a write to the cache.
    pub async fn set_queue_size(&self, key: &str, size: i64) {
        self.sizes.write().await.insert(key.to_string(), size);

        let write = CacheWrite {
            key: key.to_string(),
            size,
        };
        if let Err(e) = self.writes.try_send(write) {
            debug!(%key, error = %e, "cache write dropped");
        }
    }

    /// Locally known size, without consulting the cache.
    pub async fn cached_locally(&self, key: &str) -> Option<i64> {
        self.sizes.read().await.get(key).copied()
    }
}

/// Drain queued writes into the cache until all senders are gone.
async fn run_cache_writer(
    cache: Arc<dyn CacheService>,
    ttl: Duration,
    mut rx: mpsc::Receiver<CacheWrite>,
) {
    debug!(ttl_secs = ttl.as_secs(), "cache writer started");
    while let Some(write) = rx.recv().await {
        if let Err(e) = cache.set(&write.key, write.size, ttl).await {
            warn!(key = %write.key, size = write.size, error = %e, "cache write failed");
        }
    }
    debug!("cache writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCache;
    use async_trait::async_trait;
    use qscale_core::CacheError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A cache whose every call fails with a transport error.
    #[derive(Default)]
    struct BrokenCache {
        gets: AtomicUsize,
        sets: AtomicUsize,
    }

    #[async_trait]
    impl CacheService for BrokenCache {
        async fn get(&self, _key: &str) -> Result<i64, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Transport("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: i64, _ttl: Duration) -> Result<(), CacheError> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn missing_key_is_no_history() {
        let (store, _writer) = PreviousSizeStore::spawn(Arc::new(MemoryCache::new()));
        assert_eq!(store.get_queue_size("prod|jobs").await, None);
    }

    #[tokio::test]
    async fn zero_is_history() {
        let (store, _writer) = PreviousSizeStore::spawn(Arc::new(MemoryCache::new()));
        store.set_queue_size("prod|jobs", 0).await;
        assert_eq!(store.get_queue_size("prod|jobs").await, Some(0));
    }

    #[tokio::test]
    async fn falls_through_to_cache() {
        let cache = Arc::new(MemoryCache::new());
        cache.set("prod|jobs", 42, CACHE_TTL).await.unwrap();

        let (store, _writer) = PreviousSizeStore::spawn(cache);
        assert_eq!(store.cached_locally("prod|jobs").await, None);
        assert_eq!(store.get_queue_size("prod|jobs").await, Some(42));
        assert_eq!(store.cached_locally("prod|jobs").await, Some(42));
    }

    #[tokio::test]
    async fn writes_through_to_cache() {
        let cache = Arc::new(MemoryCache::new());
        let (store, writer) = PreviousSizeStore::spawn(cache.clone());

        store.set_queue_size("prod|jobs", 17).await;
        drop(store);
        writer.join().await;

        assert_eq!(cache.get("prod|jobs").await.unwrap(), 17);
    }

    /// Records every write, including the requested expiry.
    #[derive(Default)]
    struct RecordingCache {
        sets: std::sync::Mutex<Vec<(String, i64, Duration)>>,
    }

    #[async_trait]
    impl CacheService for RecordingCache {
        async fn get(&self, key: &str) -> Result<i64, CacheError> {
            Err(CacheError::NotFound(key.to_string()))
        }

        async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
            self.sets.lock().unwrap().push((key.to_string(), value, ttl));
            Ok(())
        }
    }

    #[tokio::test]
    async fn cache_writes_expire_after_fifteen_minutes() {
        let cache = Arc::new(RecordingCache::default());
        let (store, writer) = PreviousSizeStore::spawn(cache.clone());

        store.set_queue_size("prod|jobs", 17).await;
        drop(store);
        writer.join().await;

        let sets = cache.sets.lock().unwrap().clone();
        assert_eq!(
            sets,
            vec![("prod|jobs".to_string(), 17, Duration::from_secs(900))]
        );
        assert_eq!(CACHE_TTL, Duration::from_secs(900));
    }

    #[tokio::test]
    async fn custom_ttl_is_passed_through() {
        let cache = Arc::new(RecordingCache::default());
        let (store, writer) = PreviousSizeStore::spawn_with_ttl(cache.clone(), Duration::from_secs(60));

        store.set_queue_size("prod|jobs", 3).await;
        drop(store);
        writer.join().await;

        assert_eq!(cache.sets.lock().unwrap()[0].2, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn state_survives_a_new_store() {
        let cache = Arc::new(MemoryCache::new());

        let (first, writer) = PreviousSizeStore::spawn(cache.clone());
        first.set_queue_size("prod|jobs", 300).await;
        drop(first);
        writer.join().await;

        let (second, _writer) = PreviousSizeStore::spawn(cache);
        assert_eq!(second.get_queue_size("prod|jobs").await, Some(300));
    }

    #[tokio::test]
    async fn broken_cache_degrades_to_no_history() {
        let cache = Arc::new(BrokenCache::default());
        let (store, writer) = PreviousSizeStore::spawn(cache.clone());

        assert_eq!(store.get_queue_size("prod|jobs").await, None);

        // Failed write-through does not affect the local value.
        store.set_queue_size("prod|jobs", 5).await;
        assert_eq!(store.get_queue_size("prod|jobs").await, Some(5));

        drop(store);
        writer.join().await;
        assert_eq!(cache.gets.load(Ordering::SeqCst), 1);
        assert_eq!(cache.sets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keys_are_case_sensitive() {
        let (store, _writer) = PreviousSizeStore::spawn(Arc::new(MemoryCache::new()));
        store.set_queue_size("prod|Jobs", 1).await;
        assert_eq!(store.get_queue_size("prod|jobs").await, None);
    }
}
