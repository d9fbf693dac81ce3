//! Failover backend: a remote store shadowed by a local TTL store.
//!
//! Reads go to the remote store and fall back to the local shadow only on
//! connectivity failures. Writes and deletes go to the remote store and are
//! always mirrored locally ("dark writes"), so the shadow stays warm for any
//! key this process has touched and a later outage serves recent data.
//!
//! The remote call and the local mirror are not atomic. A crash between the
//! two leaves that one key out of sync until its next write.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::backend::CacheBackend;
use super::error::Result;
use super::memory::TtlStore;
use super::remote::{RemoteError, RemoteResult, RemoteStore};

/// Remote-first backend with a local TTL shadow.
pub struct FailoverBackend<R: RemoteStore> {
    remote: R,
    local: TtlStore,
    degraded: AtomicBool,
}

impl<R: RemoteStore> FailoverBackend<R> {
    /// Wraps `remote` with a fresh local shadow.
    pub fn new(remote: R) -> Self {
        Self::with_local(remote, TtlStore::new())
    }

    /// Wraps `remote` with the given local shadow.
    pub fn with_local(remote: R, local: TtlStore) -> Self {
        Self {
            remote,
            local,
            degraded: AtomicBool::new(false),
        }
    }

    /// The remote store.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// The local shadow store.
    pub fn local(&self) -> &TtlStore {
        &self.local
    }

    /// True while the most recent remote call failed on connectivity.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Track outage transitions so logs show one line per outage, not per call.
    fn observe<T>(&self, op: &'static str, key: &str, outcome: &RemoteResult<T>) {
        match outcome {
            Ok(_) => {
                if self.degraded.swap(false, Ordering::Relaxed) {
                    info!("remote cache recovered");
                }
            },
            Err(err) if err.is_connectivity() => {
                if !self.degraded.swap(true, Ordering::Relaxed) {
                    warn!(op, error = %err, "remote cache unavailable, serving from local store");
                } else {
                    debug!(op, key, error = %err, "remote cache still unavailable");
                }
            },
            Err(err) => {
                warn!(op, key, error = %err, "remote cache command failed");
            },
        }
    }
}

#[async_trait]
impl<R: RemoteStore> CacheBackend for FailoverBackend<R> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let outcome = self.remote.get(key).await;
        self.observe("get", key, &outcome);

        match outcome {
            // A remote miss is authoritative; the shadow may hold a value the
            // remote has since expired or deleted.
            Ok(value) => Ok(value),
            Err(err) if err.is_connectivity() => Ok(self.local.lookup(key)),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let outcome = self.remote.set(key, &value, ttl).await;
        self.observe("set", key, &outcome);
        discard(outcome);

        trace!(key, "dark write to local store");
        self.local.insert(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let outcome = self.remote.delete(key).await;
        self.observe("delete", key, &outcome);
        discard(outcome);

        trace!(key, "dark delete from local store");
        self.local.remove(key);
        Ok(())
    }
}

/// Write failures never reach the caller; `observe` has already logged them.
fn discard(outcome: std::result::Result<(), RemoteError>) {
    if let Err(err) = outcome {
        trace!(error = %err, "remote write result discarded");
    }
}
