//! Remote cache adapter.
//!
//! A thin client over a networked key-value store. Every call returns a
//! [`RemoteError`] that says whether the failure was an outage (connectivity,
//! timeout) or a genuine command error, so the failover backend can decide
//! what to do without inspecting transport details.

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ErrorKind};
use std::time::Duration;
use tracing::debug;

use super::backend::ttl_millis;
use super::error::CacheError;
use crate::constants;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The remote store could not be reached or dropped the connection.
    #[error("remote cache unavailable: {0}")]
    Unavailable(String),

    /// Connecting or waiting for a reply took too long.
    #[error("remote cache timed out")]
    Timeout,

    /// The remote store answered with an error.
    #[error("remote cache command failed: {0}")]
    Command(String),
}

impl RemoteError {
    /// True for outages (unreachable or timed out), false for command errors.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

impl From<redis::RedisError> for RemoteError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout
        } else if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || is_server_unready(err.kind())
        {
            RemoteError::Unavailable(err.to_string())
        } else {
            RemoteError::Command(err.to_string())
        }
    }
}

/// Replies meaning the server cannot serve any request right now, as opposed
/// to rejecting this particular one.
fn is_server_unready(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BusyLoadingError
            | ErrorKind::AuthenticationFailed
            | ErrorKind::TryAgain
            | ErrorKind::ClusterDown
            | ErrorKind::MasterDown
    )
}

/// Outcome of a remote call.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Raw-key operations against a remote key-value store.
///
/// A missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Reads a key.
    async fn get(&self, key: &str) -> RemoteResult<Option<Vec<u8>>>;

    /// Writes a key that expires after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> RemoteResult<()>;

    /// Deletes a key.
    async fn delete(&self, key: &str) -> RemoteResult<()>;
}

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone)]
pub struct RedisOptions {
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,
    /// Maximum time to wait for a command reply.
    pub response_timeout: Duration,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(constants::DEFAULT_CONNECT_TIMEOUT_MS),
            response_timeout: Duration::from_millis(constants::DEFAULT_RESPONSE_TIMEOUT_MS),
        }
    }
}

/// Turn a `host:port` address into a redis connection URL.
///
/// Addresses that already carry a `redis://` or `rediss://` scheme are
/// passed through unchanged.
///
/// # Errors
///
/// Returns [`CacheError::InvalidAddress`] if the address is empty, has no
/// host, or has a port that is not a valid `u16`.
pub fn connection_url(addr: &str) -> Result<String, CacheError> {
    let addr = addr.trim();
    if addr.starts_with("redis://") || addr.starts_with("rediss://") {
        return Ok(addr.to_string());
    }

    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| CacheError::invalid_address(addr, "expected host:port"))?;

    if host.is_empty() {
        return Err(CacheError::invalid_address(addr, "missing host"));
    }
    port.parse::<u16>()
        .map_err(|_| CacheError::invalid_address(addr, format!("invalid port '{port}'")))?;

    Ok(format!("redis://{addr}"))
}

/// Redis-backed remote store.
///
/// The connection is opened lazily on first use and discarded after any
/// connectivity failure, so construction never touches the network and a
/// Redis that comes back is picked up on the next call.
///
/// The slot lock is never held across an await. Callers that find no
/// connection each dial on their own, so one hung connect cannot stall the
/// callers queued behind it.
pub struct RedisStore {
    client: redis::Client,
    config: redis::AsyncConnectionConfig,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStore {
    /// Creates a store for `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidAddress`] if the address cannot be parsed.
    pub fn new(addr: &str, options: &RedisOptions) -> Result<Self, CacheError> {
        let url = connection_url(addr)?;
        let client = redis::Client::open(url.as_str())
            .map_err(|e| CacheError::invalid_address(addr, e.to_string()))?;

        let config = redis::AsyncConnectionConfig::new()
            .set_connection_timeout(options.connect_timeout)
            .set_response_timeout(options.response_timeout);

        Ok(Self {
            client,
            config,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> RemoteResult<MultiplexedConnection> {
        let cached = self.connection.lock().clone();
        if let Some(conn) = cached {
            return Ok(conn);
        }

        let conn = self
            .client
            .get_multiplexed_async_connection_with_config(&self.config)
            .await?;
        debug!("connected to remote cache");
        *self.connection.lock() = Some(conn.clone());
        Ok(conn)
    }

    /// Drop the cached connection after an outage so the next call reconnects.
    fn on_error(&self, err: redis::RedisError) -> RemoteError {
        let err = RemoteError::from(err);
        if err.is_connectivity() {
            debug!(error = %err, "resetting remote cache connection");
            self.connection.lock().take();
        }
        err
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> RemoteResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(value) => Ok(value),
            Err(e) => Err(self.on_error(e)),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> RemoteResult<()> {
        let mut conn = self.connection().await?;
        // PX rejects zero; a zero TTL means the entry is already gone.
        let millis = u64::try_from(ttl_millis(ttl)).unwrap_or(0).max(1);
        match conn.pset_ex::<_, _, ()>(key, value, millis).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.on_error(e)),
        }
    }

    async fn delete(&self, key: &str) -> RemoteResult<()> {
        let mut conn = self.connection().await?;
        match conn.del::<_, ()>(key).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.on_error(e)),
        }
    }
}
