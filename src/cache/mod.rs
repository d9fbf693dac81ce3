//! Key-value cache with Redis failover.
//!
//! The cache is a best-effort performance layer, not a system of record:
//!
//! - **TtlStore**: in-process map with per-key absolute expiry
//! - **RedisStore**: remote adapter that separates outages from misses
//! - **FailoverBackend**: Redis first, local shadow on outage, dark writes always
//! - **CacheClient**: namespace/key/tag facade plus per-key [`KeyHandle`]s
//!
//! # Example
//!
//! ```ignore
//! use orion_cache::cache::{CacheClient, RedisOptions, Tags};
//!
//! let cache = CacheClient::new(Some("localhost:6379"), "orion", &RedisOptions::default())?;
//! let handle = cache.handle("geocode", "address", Tags::new().with("lat", "37.77490"));
//! let address = handle
//!     .get_or_compute(Duration::from_secs(3600), || async { lookup().await })
//!     .await?;
//! ```
//!
//! # Custom Backends
//!
//! Implement [`CacheBackend`] to put the facade over other storage, or
//! [`RemoteStore`] to reuse the failover behaviour with another remote.

mod backend;
mod client;
mod clock;
mod error;
mod failover;
mod key;
mod memory;
mod remote;


// Re-export the public API
pub use backend::CacheBackend;
pub use client::{BackendMode, CacheClient, KeyHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use failover::FailoverBackend;
pub use key::{CacheKey, Tags, format_key};
pub use memory::TtlStore;
pub use remote::{RedisOptions, RedisStore, RemoteError, RemoteResult, RemoteStore, connection_url};
