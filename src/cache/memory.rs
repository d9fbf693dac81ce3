//! In-process TTL store.
//!
//! A key -> (absolute expiry, value) map guarded by a single mutex. Expired
//! entries are purged lazily when the key is next read or deleted; there is
//! no background sweep.

use super::backend::{CacheBackend, ttl_millis};
use super::clock::{Clock, SystemClock};
use super::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Entry with an absolute expiry in Unix milliseconds.
#[derive(Clone)]
struct TtlEntry {
    expires_at_ms: i64,
    value: Vec<u8>,
}

impl TtlEntry {
    fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms > now_ms
    }
}

/// Thread-safe in-memory cache with per-key TTLs.
///
/// Every operation takes the same store-wide lock for its full (short)
/// duration. `TtlStore` is `Clone`; clones share the same map and clock.
///
/// # Example
///
/// ```ignore
/// use orion_cache::cache::TtlStore;
///
/// let store = TtlStore::new();
/// store.insert("k", b"v".to_vec(), Duration::from_millis(1000));
/// assert_eq!(store.lookup("k"), Some(b"v".to_vec()));
/// ```
#[derive(Clone)]
pub struct TtlStore {
    entries: Arc<Mutex<HashMap<String, TtlEntry>>>,
    clock: Arc<dyn Clock>,
}

impl Default for TtlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlStore {
    /// Creates an empty store on the system wall clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates an empty store reading time from `clock`.
    pub fn with_clock<C: Clock>(clock: C) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock: Arc::new(clock),
        }
    }

    /// Returns the live value for `key`, purging it if it has expired.
    pub fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            },
            None => None,
        }
    }

    /// Stores `value` until `ttl` from now, replacing any previous entry.
    pub fn insert(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let expires_at_ms = self.clock.now_ms().saturating_add(ttl_millis(ttl));
        self.entries.lock().insert(
            key.to_string(),
            TtlEntry {
                expires_at_ms,
                value,
            },
        );
    }

    /// Removes `key` if present.
    pub fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl CacheBackend for TtlStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lookup(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.insert(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use proptest::prelude::*;
    use std::thread;

    fn store_at(now_ms: i64) -> (TtlStore, ManualClock) {
        let clock = ManualClock::new(now_ms);
        (TtlStore::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_get_nonexistent() {
        let (store, _) = store_at(0);
        assert_eq!(store.lookup("key"), None);
    }

    #[test]
    fn test_get_within_ttl() {
        let (store, clock) = store_at(0);
        store.insert("k", b"v".to_vec(), Duration::from_millis(1000));

        clock.set(500);
        assert_eq!(store.lookup("k"), Some(b"v".to_vec()));

        clock.set(1500);
        assert_eq!(store.lookup("k"), None);
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let (store, clock) = store_at(1_000);
        store.insert("k", b"v".to_vec(), Duration::from_millis(1000));

        clock.set(1_999);
        assert!(store.lookup("k").is_some());

        clock.set(2_000);
        assert!(store.lookup("k").is_none());
    }

    #[test]
    fn test_expired_get_purges_entry() {
        let (store, clock) = store_at(1_000);
        store.insert("k", b"v".to_vec(), Duration::from_millis(1000));
        assert_eq!(store.len(), 1);

        clock.set(3_000);
        assert_eq!(store.lookup("k"), None);
        assert!(store.is_empty());

        // Lazy deletion is idempotent
        assert_eq!(store.lookup("k"), None);
    }

    #[test]
    fn test_delete_within_ttl() {
        let (store, _) = store_at(1_000);
        store.insert("k", b"v".to_vec(), Duration::from_millis(1000));
        assert_eq!(store.lookup("k"), Some(b"v".to_vec()));

        store.remove("k");
        assert_eq!(store.lookup("k"), None);
    }

    #[test]
    fn test_delete_past_ttl() {
        let (store, clock) = store_at(1_000);
        store.insert("k", b"v".to_vec(), Duration::from_millis(1000));

        clock.set(3_000);
        store.remove("k");
        assert_eq!(store.lookup("k"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_nonexistent_is_noop() {
        let (store, _) = store_at(0);
        store.remove("missing");
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_overwrites_value_and_expiry() {
        let (store, clock) = store_at(0);
        store.insert("k", b"old".to_vec(), Duration::from_millis(100));

        clock.set(50);
        store.insert("k", b"new".to_vec(), Duration::from_millis(1000));

        clock.set(500);
        assert_eq!(store.lookup("k"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let (store, _) = store_at(0);
        store.insert("k", b"v".to_vec(), Duration::ZERO);
        assert_eq!(store.lookup("k"), None);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let (store, clock) = store_at(1_000);
        store.insert("k", b"v".to_vec(), Duration::MAX);

        clock.set(i64::MAX - 1);
        assert_eq!(store.lookup("k"), Some(b"v".to_vec()));
    }

    #[test]
    fn test_clones_share_entries() {
        let (store, _) = store_at(0);
        let other = store.clone();
        store.insert("k", b"v".to_vec(), Duration::from_secs(1));
        assert_eq!(other.lookup("k"), Some(b"v".to_vec()));
    }

    #[test]
    fn test_concurrent_access() {
        let store = TtlStore::new();
        let mut handles = Vec::new();

        for t in 0..8u8 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("key-{}", i % 16);
                    store.insert(&key, vec![t], Duration::from_secs(60));
                    let _ = store.lookup(&key);
                    if i % 7 == 0 {
                        store.remove(&key);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(store.len() <= 16);
    }

    #[tokio::test]
    async fn test_backend_trait_roundtrip() {
        let (store, _) = store_at(0);
        let backend: &dyn CacheBackend = &store;

        backend
            .set("k", b"v".to_vec(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(b"v".to_vec()));

        backend.delete("k").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    proptest! {
        /// Invariant: a value is visible before its TTL elapses and gone after.
        #[test]
        fn visible_until_ttl_elapses(
            start in 0i64..1_000_000_000,
            ttl_ms in 1u64..86_400_000,
            value in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let (store, clock) = store_at(start);
            store.insert("k", value.clone(), Duration::from_millis(ttl_ms));
            prop_assert_eq!(store.lookup("k"), Some(value));

            clock.set(start + ttl_ms as i64 - 1);
            prop_assert!(store.lookup("k").is_some());

            clock.set(start + ttl_ms as i64 + 1);
            prop_assert!(store.lookup("k").is_none());
            prop_assert!(store.lookup("k").is_none());
        }
    }
}
