//! Generic keyed store with per-key TTL and single-flight fill (§4.5).
//! Grounded on the teacher's `cache/lru_cache.rs` (`DashMap<K, CacheEntry<V>>`
//! with a TTL check-and-evict on read), generalized with a `DashMap<String,
//! Notify>` lock map so concurrent fetchers for the same key share one
//! fetch instead of racing the upstream call.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

use crate::utils::error::{EngineError, Result};

/// A key-shape validator: returns `true` if `key` is acceptable for this
/// store. Each store in [`super::stores::EngineCache`] installs the
/// validator matching its §4.5 key grammar.
pub type KeyValidator = fn(&str) -> bool;

struct Entry_<V> {
    value: V,
    inserted_at: Instant,
}

/// A single TTL'd keyed store with single-flight `get_or_fill`.
pub struct KeyedStore<V> {
    data: DashMap<String, Entry_<V>>,
    locks: DashMap<String, Arc<Notify>>,
    ttl: Duration,
    lock_wait: Duration,
    validator: KeyValidator,
}

impl<V: Clone> KeyedStore<V> {
    pub fn new(ttl: Duration, lock_wait: Duration, validator: KeyValidator) -> Self {
        Self {
            data: DashMap::new(),
            locks: DashMap::new(),
            ttl,
            lock_wait,
            validator,
        }
    }

    pub fn validate_key(&self, key: &str) -> Result<()> {
        if (self.validator)(key) {
            Ok(())
        } else {
            Err(EngineError::CacheError(format!("invalid cache key: {key}")))
        }
    }

    /// Plain read — never locks. Returns `None` for a missing or
    /// TTL-expired entry, evicting the expired entry on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.data.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }
        self.data.remove(key);
        None
    }

    /// Like [`get`](Self::get) but also returns the entry's age, for
    /// `meta.cacheAgeMs` on a cache hit.
    pub fn get_with_age(&self, key: &str) -> Option<(V, Duration)> {
        if let Some(entry) = self.data.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some((entry.value.clone(), entry.inserted_at.elapsed()));
            }
        } else {
            return None;
        }
        self.data.remove(key);
        None
    }

    pub fn set(&self, key: &str, value: V) {
        self.data.insert(key.to_string(), Entry_ { value, inserted_at: Instant::now() });
    }

    pub fn remove(&self, key: &str) {
        self.data.remove(key);
    }

    pub fn clear(&self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Every stored key, for boundary-matched invalidation
    /// (`ClearTokenAnalysis`, §4.5).
    pub fn keys(&self) -> Vec<String> {
        self.data.iter().map(|e| e.key().clone()).collect()
    }

    /// `GetOrFill(key, fetch)`: read; on miss, acquire a per-key single-
    /// flight lock (wait up to `lock_wait`; on timeout the lock is
    /// force-removed and the caller falls through to a fresh read); re-read
    /// under lock; fetch; write if the result is `Some`; release the lock.
    pub async fn get_or_fill<F, Fut>(&self, key: &str, fetch: F) -> Result<Option<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>>>,
    {
        self.validate_key(key)?;

        if let Some(v) = self.get(key) {
            return Ok(Some(v));
        }

        match self.locks.entry(key.to_string()) {
            Entry::Occupied(occupied) => {
                let notify = occupied.get().clone();
                drop(occupied);

                if tokio::time::timeout(self.lock_wait, notify.notified()).await.is_err() {
                    // Wedged fetcher: force-remove the lock and fall through.
                    self.locks.remove(key);
                }

                if let Some(v) = self.get(key) {
                    return Ok(Some(v));
                }
                self.fill_now(key, fetch).await
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Notify::new()));
                // Re-read under our own freshly-acquired lock in case a
                // concurrent filler raced us between the miss above and the
                // entry insertion.
                if let Some(v) = self.get(key) {
                    self.release_lock(key);
                    return Ok(Some(v));
                }
                self.fill_now(key, fetch).await
            }
        }
    }

    async fn fill_now<F, Fut>(&self, key: &str, fetch: F) -> Result<Option<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>>>,
    {
        let result = fetch().await;
        if let Ok(Some(ref v)) = result {
            self.set(key, v.clone());
        }
        self.release_lock(key);
        result
    }

    fn release_lock(&self, key: &str) {
        if let Some((_, notify)) = self.locks.remove(key) {
            notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn allow_all(_: &str) -> bool {
        true
    }

    #[tokio::test]
    async fn get_or_fill_caches_after_first_fetch() {
        let store: KeyedStore<u32> = KeyedStore::new(Duration::from_secs(60), Duration::from_secs(5), allow_all);
        let calls = Arc::new(AtomicU32::new(0));

        let calls2 = calls.clone();
        let v = store
            .get_or_fill("k", || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(Some(42u32))
            })
            .await
            .unwrap();
        assert_eq!(v, Some(42));

        let calls3 = calls.clone();
        let v2 = store
            .get_or_fill("k", || async move {
                calls3.fetch_add(1, Ordering::SeqCst);
                Ok(Some(99u32))
            })
            .await
            .unwrap();
        assert_eq!(v2, Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_or_fill_does_not_cache_none() {
        let store: KeyedStore<u32> = KeyedStore::new(Duration::from_secs(60), Duration::from_secs(5), allow_all);
        let v = store.get_or_fill("k", || async { Ok(None) }).await.unwrap();
        assert_eq!(v, None);
        assert!(store.get("k").is_none());
    }

    #[tokio::test]
    async fn rejects_invalid_keys() {
        fn only_a(key: &str) -> bool {
            key == "a"
        }
        let store: KeyedStore<u32> = KeyedStore::new(Duration::from_secs(60), Duration::from_secs(5), only_a);
        let result = store.get_or_fill("b", || async { Ok(Some(1u32)) }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn ttl_expiry_evicts_entry() {
        let store: KeyedStore<u32> = KeyedStore::new(Duration::from_millis(10), Duration::from_secs(5), allow_all);
        store.set("k", 1);
        assert_eq!(store.get("k"), Some(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("k"), None);
    }
}
