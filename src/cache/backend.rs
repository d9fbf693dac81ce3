//! Backend trait for the cache.
//!
//! Defines the raw-key interface shared by the in-process TTL store and the
//! failover backend, so the facade can hold either behind one pointer.

use async_trait::async_trait;
use std::time::Duration;

use super::error::Result;

/// Backend trait for raw-key cache storage.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// Keys arrive fully formatted; backends never interpret them.
///
/// # Example
///
/// ```ignore
/// use orion_cache::cache::{CacheBackend, TtlStore};
///
/// let backend = TtlStore::new();
/// backend.set("key", b"value".to_vec(), Duration::from_secs(1)).await?;
/// let value = backend.get("key").await?;
/// ```
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Retrieves a value by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend cannot answer for a reason
    /// other than an outage (see [`CacheError`](super::CacheError)).
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores a value that expires `ttl` from now.
    ///
    /// Overwrites any existing value for the key.
    ///
    /// # Errors
    ///
    /// Backends in this crate never fail a write; the `Result` exists for
    /// custom implementations.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Deletes a key. Idempotent.
    ///
    /// # Errors
    ///
    /// Backends in this crate never fail a delete; the `Result` exists for
    /// custom implementations.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Convert a TTL to whole milliseconds, saturating on overflow.
pub(crate) fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}
