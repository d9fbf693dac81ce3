//! Configuration for the cache layer.
//!
//! Settings come from a TOML file and can be overridden per key by
//! environment variables:
//!
//! 1. Environment variable (e.g. `ORION_REDIS_ADDR`)
//! 2. Value in the config file
//! 3. Built-in default
//!
//! ```toml
//! [cache]
//! redis_addr = "localhost:6379"
//! prefix = "orion"
//! connect_timeout_ms = 250
//! response_timeout_ms = 100
//!
//! [log]
//! format = "json"
//! filter = "orion_cache=debug,info"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{RedisOptions, connection_url};
use crate::constants;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub log: LogConfig,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis `host:port`. Absent or empty selects the in-process store.
    pub redis_addr: Option<String>,
    /// Global key prefix.
    pub prefix: String,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_addr: None,
            prefix: constants::DEFAULT_PREFIX.to_string(),
            connect_timeout_ms: constants::DEFAULT_CONNECT_TIMEOUT_MS,
            response_timeout_ms: constants::DEFAULT_RESPONSE_TIMEOUT_MS,
        }
    }
}

impl CacheConfig {
    /// Connection settings for the Redis adapter.
    pub fn redis_options(&self) -> RedisOptions {
        RedisOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
        }
    }

    /// The configured address, if present and non-blank.
    pub fn remote_addr(&self) -> Option<&str> {
        self.redis_addr
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("Unknown log format '{other}' (expected 'text' or 'json')"),
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: constants::DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the standard location with env overrides.
    ///
    /// Reads the file named by `ORION_CONFIG` (which must exist), falling back
    /// to `/etc/orion/config.toml` (which may be absent).
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be read or parsed, or an
    /// override has an invalid value.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os(constants::ENV_CONFIG_PATH).map(PathBuf::from);
        Self::load_with(explicit.as_deref())
    }

    /// Load configuration from `path` (or the default location) with env
    /// overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `path` does not exist, a config file
    /// cannot be parsed, or an override has an invalid value.
    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => {
                let default = Path::new(constants::DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load_from(default)?
                } else {
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from the specified path, without env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production). Unset variables leave the current value alone.
    ///
    /// # Errors
    ///
    /// Returns an error if `ORION_LOG_FORMAT` is not `text` or `json`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(constants::ENV_REDIS_ADDR) {
            self.cache.redis_addr = Some(addr);
        }
        if let Some(prefix) = lookup(constants::ENV_CACHE_PREFIX) {
            self.cache.prefix = prefix;
        }
        if let Some(format) = lookup(constants::ENV_LOG_FORMAT) {
            self.log.format = format
                .parse::<LogFormat>()
                .with_context(|| format!("Invalid {}", constants::ENV_LOG_FORMAT))?;
        }
        Ok(())
    }

    /// Validate configuration.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails with one or more errors:
    /// - Empty prefix
    /// - Redis address that is not `host:port`
    /// - Zero timeouts
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Key prefix
        if self.cache.prefix.is_empty() {
            errors.push("cache.prefix cannot be empty".to_string());
        } else if self.cache.prefix.contains(constants::KEY_DELIMITER) {
            warnings.push(format!(
                "cache.prefix '{}' contains the key delimiter '{}'\n  \
                 Keys stay unique but are harder to read in redis-cli",
                self.cache.prefix,
                constants::KEY_DELIMITER
            ));
        }

        // 2. Remote address
        match self.cache.remote_addr() {
            Some(addr) => {
                if let Err(e) = connection_url(addr) {
                    errors.push(format!("cache.redis_addr: {e}"));
                }
            },
            None => {
                warnings.push(
                    "cache.redis_addr is not set; using the in-process cache only\n  \
                     Entries are not shared between processes and are lost on restart"
                        .to_string(),
                );
            },
        }

        // 3. Timeouts
        if self.cache.connect_timeout_ms == 0 {
            errors.push("cache.connect_timeout_ms must be greater than 0".to_string());
        }
        if self.cache.response_timeout_ms == 0 {
            errors.push("cache.response_timeout_ms must be greater than 0".to_string());
        } else if self.cache.response_timeout_ms > 5_000 {
            warnings.push(format!(
                "cache.response_timeout_ms {} is very high (> 5000)\n  \
                 A slow Redis will stall callers this long before failing over",
                self.cache.response_timeout_ms
            ));
        }

        // Return errors if any
        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        // Return warnings (caller decides how to handle/display them)
        Ok(ValidationResult { warnings })
    }
}
