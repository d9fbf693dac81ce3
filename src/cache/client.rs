//! Cache facade and per-key handles.
//!
//! [`CacheClient`] is the entry point for callers. It owns exactly one
//! backend, chosen at construction: a [`FailoverBackend`] over Redis when a
//! remote address is configured, otherwise a bare [`TtlStore`]. Callers speak
//! in `(namespace, key, tags)` triples; the client formats the physical key
//! and delegates.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::backend::CacheBackend;
use super::error::{CacheError, Result};
use super::failover::FailoverBackend;
use super::key::{CacheKey, Tags, format_key};
use super::memory::TtlStore;
use super::remote::{RedisOptions, RedisStore};
use crate::config::CacheConfig;

/// Which backend a [`CacheClient`] was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Redis with a local TTL shadow.
    Failover,
    /// In-process TTL store only.
    Memory,
    /// Caller-supplied backend.
    Custom,
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failover => write!(f, "failover"),
            Self::Memory => write!(f, "memory"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Namespace/key/tag oriented cache facade.
///
/// `CacheClient` is `Clone`; clones share the backend. The backend is fixed
/// for the lifetime of the client.
///
/// # Example
///
/// ```ignore
/// use orion_cache::cache::{CacheClient, Tags};
///
/// let cache = CacheClient::memory("orion");
/// let tags = Tags::new().with("lat", "37.77490").with("lon", "-122.41940");
/// cache.set("geocode", "address", &tags, b"San Francisco", ttl).await?;
/// ```
#[derive(Clone)]
pub struct CacheClient {
    backend: Arc<dyn CacheBackend>,
    prefix: Arc<str>,
    mode: BackendMode,
}

impl CacheClient {
    /// Creates a client, selecting the backend from `addr`.
    ///
    /// A non-empty address selects Redis with local failover; an absent or
    /// blank address selects the in-process store.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidAddress`] if `addr` is not `host:port`.
    pub fn new(
        addr: Option<&str>,
        prefix: impl Into<String>,
        options: &RedisOptions,
    ) -> Result<Self> {
        let prefix = prefix.into();
        match addr.map(str::trim).filter(|a| !a.is_empty()) {
            Some(addr) => {
                let remote = RedisStore::new(addr, options)?;
                info!(addr, prefix = %prefix, "cache using redis with local failover");
                Ok(Self::with_backend(
                    Arc::new(FailoverBackend::new(remote)),
                    prefix,
                    BackendMode::Failover,
                ))
            },
            None => {
                info!(prefix = %prefix, "cache using in-process store");
                Ok(Self::memory(prefix))
            },
        }
    }

    /// Creates a client from the `[cache]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidAddress`] if the configured address is
    /// malformed.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(
            config.redis_addr.as_deref(),
            config.prefix.clone(),
            &config.redis_options(),
        )
    }

    /// Creates a client backed only by an in-process TTL store.
    pub fn memory(prefix: impl Into<String>) -> Self {
        Self::with_backend(Arc::new(TtlStore::new()), prefix.into(), BackendMode::Memory)
    }

    /// Creates a client over a caller-supplied backend.
    pub fn custom<B: CacheBackend>(backend: B, prefix: impl Into<String>) -> Self {
        Self::with_backend(Arc::new(backend), prefix.into(), BackendMode::Custom)
    }

    fn with_backend(backend: Arc<dyn CacheBackend>, prefix: String, mode: BackendMode) -> Self {
        Self {
            backend,
            prefix: Arc::from(prefix),
            mode,
        }
    }

    /// Global key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Backend selected at construction.
    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    /// Formats the physical key for a triple without touching the backend.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTag`] if any tag contains `=` or `&`.
    pub fn format_key(&self, namespace: &str, key: &str, tags: &Tags) -> Result<String> {
        format_key(&self.prefix, namespace, key, tags)
    }

    /// Reads a cached value. A miss or expired entry is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTag`] before any backend call if the
    /// tags are malformed, or [`CacheError::Remote`] if the remote store
    /// rejected the read.
    pub async fn get(&self, namespace: &str, key: &str, tags: &Tags) -> Result<Option<Vec<u8>>> {
        let raw = self.format_key(namespace, key, tags)?;
        self.backend.get(&raw).await
    }

    /// Writes a value that expires after `ttl`. New entries and updates are
    /// treated the same.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTag`] before any backend call if the
    /// tags are malformed.
    pub async fn set(
        &self,
        namespace: &str,
        key: &str,
        tags: &Tags,
        value: &[u8],
        ttl: Duration,
    ) -> Result<()> {
        let raw = self.format_key(namespace, key, tags)?;
        self.backend.set(&raw, value.to_vec(), ttl).await
    }

    /// Invalidates a cached value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTag`] before any backend call if the
    /// tags are malformed.
    pub async fn delete(&self, namespace: &str, key: &str, tags: &Tags) -> Result<()> {
        let raw = self.format_key(namespace, key, tags)?;
        self.backend.delete(&raw).await
    }

    /// Binds a `(namespace, key, tags)` identity to a handle.
    pub fn handle(
        &self,
        namespace: impl Into<String>,
        key: impl Into<String>,
        tags: Tags,
    ) -> KeyHandle {
        KeyHandle {
            client: self.clone(),
            key: CacheKey::new(namespace, key, tags),
        }
    }
}

/// Read/write handle for a single logical key.
///
/// Behaves exactly like calling the owning [`CacheClient`] with the same
/// namespace, key, and tags. Create one per call site.
#[derive(Clone)]
pub struct KeyHandle {
    client: CacheClient,
    key: CacheKey,
}

impl KeyHandle {
    /// The bound logical key.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Reads the bound key.
    ///
    /// # Errors
    ///
    /// See [`CacheClient::get`].
    pub async fn get(&self) -> Result<Option<Vec<u8>>> {
        self.client
            .get(&self.key.namespace, &self.key.key, &self.key.tags)
            .await
    }

    /// Writes the bound key.
    ///
    /// # Errors
    ///
    /// See [`CacheClient::set`].
    pub async fn set(&self, value: &[u8], ttl: Duration) -> Result<()> {
        self.client
            .set(&self.key.namespace, &self.key.key, &self.key.tags, value, ttl)
            .await
    }

    /// Invalidates the bound key.
    ///
    /// # Errors
    ///
    /// See [`CacheClient::delete`].
    pub async fn delete(&self) -> Result<()> {
        self.client
            .delete(&self.key.namespace, &self.key.key, &self.key.tags)
            .await
    }

    /// Reads and JSON-decodes the bound key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialization`] if the stored bytes are not
    /// valid JSON for `T`.
    pub async fn get_json<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.get().await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// JSON-encodes and writes the bound key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialization`] if `value` cannot be encoded.
    pub async fn set_json<T: Serialize + ?Sized>(&self, value: &T, ttl: Duration) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set(&bytes, ttl).await
    }

    /// Returns the cached value, or computes, stores, and returns it on a miss.
    ///
    /// Errors from `compute` propagate and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns cache errors (converted into `E`) or the error from `compute`.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        ttl: Duration,
        compute: F,
    ) -> std::result::Result<Vec<u8>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Vec<u8>, E>>,
        E: From<CacheError>,
    {
        if let Some(hit) = self.get().await? {
            debug!(namespace = %self.key.namespace, key = %self.key.key, "cache hit");
            return Ok(hit);
        }

        debug!(namespace = %self.key.namespace, key = %self.key.key, "cache miss, computing");
        let value = compute().await?;
        self.set(&value, ttl).await?;
        Ok(value)
    }

    /// JSON flavour of [`get_or_compute`](Self::get_or_compute).
    ///
    /// # Errors
    ///
    /// Returns cache errors (converted into `E`) or the error from `compute`.
    pub async fn get_or_compute_json<T, F, Fut, E>(
        &self,
        ttl: Duration,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<CacheError>,
    {
        if let Some(hit) = self.get_json::<T>().await? {
            return Ok(hit);
        }

        let value = compute().await?;
        self.set_json(&value, ttl).await?;
        Ok(value)
    }
}
