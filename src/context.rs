//! Application context.
//!
//! Built once at startup and handed to whatever needs cache access. There is
//! no global instance; handlers receive a `&Context` (or a clone of it).

use anyhow::{Context as _, Result};

use crate::cache::CacheClient;
use crate::config::Config;

/// Shared dependencies for request handlers.
#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub cache: CacheClient,
}

impl Context {
    /// Build the context from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be constructed from the
    /// configuration (e.g. a malformed Redis address).
    pub fn from_config(config: Config) -> Result<Self> {
        let cache =
            CacheClient::from_config(&config.cache).context("Failed to initialize cache client")?;
        Ok(Self { config, cache })
    }

    /// Build the context with a caller-supplied cache (tests, embedding).
    pub fn with_cache(config: Config, cache: CacheClient) -> Self {
        Self { config, cache }
    }
}
