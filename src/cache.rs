//! Process-scoped memo cache
//!
//! Key = (operation identifier, argument tuple), value = the operation's
//! result. Entries live until the process exits: there is no eviction and no
//! invalidation. Failed computations are not stored, so the next call retries.
//!
//! Each key owns a [`OnceCell`]. Concurrent callers for the same key wait on
//! that cell and share one computation, while hits on other keys and
//! [`MemoCache::stats`] never wait behind it. Computations themselves run one
//! at a time under a query gate, so the process has at most one warehouse
//! query in flight.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Cache key: which operation, called with which arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: &'static str,
    pub args: Vec<String>,
}

impl CacheKey {
    pub fn new(operation: &'static str, args: &[&str]) -> Self {
        Self {
            operation,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.operation, self.args.join(", "))
    }
}

/// Type-erased per-key cell
trait Slot: Send + Sync {
    fn is_filled(&self) -> bool;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Send + Sync + 'static> Slot for OnceCell<Arc<T>> {
    fn is_filled(&self) -> bool {
        self.initialized()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Memoization table shared by every dashboard pass in the process
#[derive(Default)]
pub struct MemoCache {
    slots: Mutex<HashMap<CacheKey, Arc<dyn Slot>>>,
    query_gate: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache counters for the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored value for `key`, or run `compute` and store its result.
    ///
    /// A slot holding a different value type under the same key is treated as
    /// absent and replaced; operation identifiers are expected to map to one type.
    pub async fn get_or_try_insert_with<T, E, F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cell = self.slot::<T>(&key).await;

        if let Some(hit) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %key, "Memo cache hit");
            return Ok(Arc::clone(hit));
        }

        let computed = AtomicBool::new(false);
        let value = cell
            .get_or_try_init(|| async {
                computed.store(true, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Memo cache miss, computing");

                let _gate = self.query_gate.lock().await;
                compute().await.map(Arc::new)
            })
            .await?;

        if !computed.load(Ordering::Relaxed) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %key, "Memo cache hit after waiting on another caller");
        }

        Ok(Arc::clone(value))
    }

    async fn slot<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Arc<OnceCell<Arc<T>>> {
        let mut slots = self.slots.lock().await;

        if let Some(cell) = slots
            .get(key)
            .and_then(|slot| Arc::clone(slot).into_any().downcast::<OnceCell<Arc<T>>>().ok())
        {
            return cell;
        }

        let cell = Arc::new(OnceCell::<Arc<T>>::new());
        slots.insert(key.clone(), Arc::clone(&cell) as Arc<dyn Slot>);
        cell
    }

    /// Whether a value is stored for `key`
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.slots
            .lock()
            .await
            .get(key)
            .is_some_and(|slot| slot.is_filled())
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self
            .slots
            .lock()
            .await
            .values()
            .filter(|slot| slot.is_filled())
            .count();

        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let cache = MemoCache::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..2 {
            let v: Arc<u32> = cache
                .get_or_try_insert_with(CacheKey::new("answer", &[]), || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(42)
                })
                .await
                .unwrap();
            assert_eq!(*v, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_keys_differ_by_arguments() {
        let cache = MemoCache::new();

        let a: Arc<String> = cache
            .get_or_try_insert_with(CacheKey::new("series", &["France"]), || async {
                Ok::<_, ()>("fr".to_string())
            })
            .await
            .unwrap();
        let b: Arc<String> = cache
            .get_or_try_insert_with(CacheKey::new("series", &["Chad"]), || async {
                Ok::<_, ()>("td".to_string())
            })
            .await
            .unwrap();

        assert_eq!(a.as_str(), "fr");
        assert_eq!(b.as_str(), "td");
        assert_eq!(cache.stats().await.entries, 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = MemoCache::new();
        let key = CacheKey::new("flaky", &[]);

        let first: Result<Arc<u8>, &str> = cache
            .get_or_try_insert_with(key.clone(), || async { Err("down") })
            .await;
        assert!(first.is_err());
        assert!(!cache.contains(&key).await);

        let second: Arc<u8> = cache
            .get_or_try_insert_with(key.clone(), || async { Ok::<_, &str>(1) })
            .await
            .unwrap();
        assert_eq!(*second, 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let cache = MemoCache::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let key = CacheKey::new("series", &["France"]);

        let load = || {
            cache.get_or_try_insert_with(key.clone(), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<_, ()>(7u32)
            })
        };
        let (a, b) = tokio::join!(load(), load());

        assert_eq!(*a.unwrap(), 7);
        assert_eq!(*b.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_hits_do_not_wait_on_a_pending_computation() {
        let cache = Arc::new(MemoCache::new());
        let countries = CacheKey::new("countries", &[]);
        cache
            .get_or_try_insert_with(countries.clone(), || async { Ok::<_, ()>(vec!["Chad"]) })
            .await
            .unwrap();

        let (release, gate) = tokio::sync::oneshot::channel::<()>();
        let pending = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_try_insert_with(CacheKey::new("series", &["France"]), || async move {
                        let _ = gate.await;
                        Ok::<_, ()>(1u32)
                    })
                    .await
            })
        };
        while cache.stats().await.misses < 2 {
            tokio::task::yield_now().await;
        }

        let wait = std::time::Duration::from_secs(1);
        let hit = tokio::time::timeout(
            wait,
            cache.get_or_try_insert_with(countries, || async { Ok::<_, ()>(Vec::<&str>::new()) }),
        )
        .await
        .expect("hit blocked behind pending computation")
        .unwrap();
        assert_eq!(*hit, vec!["Chad"]);

        let stats = tokio::time::timeout(wait, cache.stats()).await.unwrap();
        assert_eq!(stats.entries, 1);

        release.send(()).unwrap();
        assert_eq!(*pending.await.unwrap().unwrap(), 1);
        assert_eq!(cache.stats().await.entries, 2);
    }

    #[test]
    fn test_key_display() {
        let key = CacheKey::new("series", &["France"]);
        assert_eq!(key.to_string(), "series(France)");
    }
}
