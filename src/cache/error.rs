//! Error types for the cache layer.
//!
//! Only malformed input and genuine remote command failures reach callers.
//! Remote outages are absorbed by the failover backend and never show up here.

use super::remote::RemoteError;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Caller-visible cache errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CacheError {
    /// A tag key or value contains a reserved character (`=` or `&`).
    #[error("cache tag contains illegal characters: {key}={value}")]
    InvalidTag { key: String, value: String },

    /// The remote cache address could not be parsed.
    #[error("invalid cache address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    /// The remote cache rejected a command (not an outage).
    #[error("remote cache error: {0}")]
    Remote(#[from] RemoteError),

    /// A cached value could not be encoded or decoded.
    #[error("cache value serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Create an invalid tag error.
    pub fn invalid_tag(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidTag {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create an invalid address error.
    pub fn invalid_address(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            addr: addr.into(),
            reason: reason.into(),
        }
    }
}
