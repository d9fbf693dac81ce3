//! Shared defaults for the cache layer, configuration, and CLI.

/// Global key prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "orion";

/// Separator between the prefix, namespace, key, and tag segments.
pub const KEY_DELIMITER: char = ':';

/// Separator between a tag key and its value.
pub const TAG_ASSIGN: char = '=';

/// Separator between serialized tag pairs.
pub const TAG_SEPARATOR: char = '&';

/// Characters that may not appear in a tag key or value.
pub const RESERVED_TAG_CHARS: [char; 2] = [TAG_ASSIGN, TAG_SEPARATOR];

/// Timeout for establishing a connection to the remote cache, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 250;

/// Timeout for a single remote cache command, in milliseconds.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 100;

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/orion/config.toml";

/// Environment variable that overrides the config file location.
pub const ENV_CONFIG_PATH: &str = "ORION_CONFIG";

/// Environment variable that overrides `cache.redis_addr`.
pub const ENV_REDIS_ADDR: &str = "ORION_REDIS_ADDR";

/// Environment variable that overrides `cache.prefix`.
pub const ENV_CACHE_PREFIX: &str = "ORION_CACHE_PREFIX";

/// Environment variable that overrides `log.format`.
pub const ENV_LOG_FORMAT: &str = "ORION_LOG_FORMAT";

/// Default tracing filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";
