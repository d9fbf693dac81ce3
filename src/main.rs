//! orion-cache CLI.
//!
//! Thin wrapper over [`orion_cache::cache::CacheClient`] for poking at a
//! cache from a shell.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use orion_cache::cache::{BackendMode, CacheClient, Tags};
use orion_cache::config::Config;
use orion_cache::context::Context;

#[derive(Parser, Debug)]
#[command(name = "orion-cache")]
#[command(version, about = "Redis cache with an in-process fallback")]
struct Cli {
    /// Configuration file (defaults to $ORION_CONFIG, then /etc/orion/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the value stored under a key
    Get {
        #[command(flatten)]
        target: Target,
    },
    /// Store a value under a key
    Set {
        #[command(flatten)]
        target: Target,
        /// Value to store
        value: String,
        /// Time to live in milliseconds
        #[arg(long, default_value = "60000")]
        ttl_ms: u64,
    },
    /// Remove a key
    Delete {
        #[command(flatten)]
        target: Target,
    },
    /// Validate configuration and print the effective settings
    CheckConfig,
}

#[derive(clap::Args, Debug)]
struct Target {
    /// Key namespace
    namespace: String,
    /// Key name
    key: String,
    /// Tag as key=value (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,
}

impl Target {
    fn tags(&self) -> Tags {
        self.tags.iter().cloned().collect()
    }
}

fn parse_tag(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => bail!("expected key=value, got '{raw}'"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_with(Some(path))?,
        None => Config::load()?,
    };
    orion_cache::logging::init(&config.log);

    if let Command::CheckConfig = cli.command {
        return check_config(&config);
    }

    let ctx = Context::from_config(config)?;
    tracing::debug!(mode = %ctx.cache.mode(), prefix = ctx.cache.prefix(), "cache ready");
    if let Some(warning) = memory_mode_warning(ctx.cache.mode()) {
        tracing::warn!("{warning}");
    }

    match cli.command {
        Command::Get { target } => {
            let value = ctx
                .cache
                .get(&target.namespace, &target.key, &target.tags())
                .await?;
            match value {
                Some(bytes) => {
                    let mut out = std::io::stdout().lock();
                    out.write_all(&bytes).context("Failed to write value")?;
                    writeln!(out)?;
                },
                None => {
                    eprintln!("(miss)");
                    std::process::exit(1);
                },
            }
        },
        Command::Set {
            target,
            value,
            ttl_ms,
        } => {
            ctx.cache
                .set(
                    &target.namespace,
                    &target.key,
                    &target.tags(),
                    value.as_bytes(),
                    Duration::from_millis(ttl_ms),
                )
                .await?;
        },
        Command::Delete { target } => {
            ctx.cache
                .delete(&target.namespace, &target.key, &target.tags())
                .await?;
        },
        Command::CheckConfig => {},
    }

    Ok(())
}

/// Key commands against the in-process store only see this process's writes.
fn memory_mode_warning(mode: BackendMode) -> Option<&'static str> {
    (mode == BackendMode::Memory).then_some(
        "no redis address configured; using a per-process store that is discarded on exit",
    )
}

fn check_config(config: &Config) -> Result<()> {
    let result = config.validate()?;
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }

    let cache = CacheClient::from_config(&config.cache)?;

    println!("mode:             {}", cache.mode());
    println!("prefix:           {}", config.cache.prefix);
    println!(
        "redis:            {}",
        config.cache.remote_addr().unwrap_or("(none, memory only)")
    );
    println!("connect timeout:  {}ms", config.cache.connect_timeout_ms);
    println!("response timeout: {}ms", config.cache.response_timeout_ms);
    println!("log format:       {:?}", config.log.format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("lat=51.5").unwrap(),
            ("lat".to_string(), "51.5".to_string())
        );
        assert_eq!(parse_tag("k=").unwrap(), ("k".to_string(), String::new()));
        assert!(parse_tag("novalue").is_err());
        assert!(parse_tag("=v").is_err());
    }

    #[test]
    fn test_cli_parses_set() {
        let cli = Cli::try_parse_from([
            "orion-cache",
            "set",
            "routes",
            "eta",
            "42",
            "--tag",
            "b=2",
            "--tag",
            "a=1",
            "--ttl-ms",
            "500",
        ])
        .unwrap();

        match cli.command {
            Command::Set {
                target,
                value,
                ttl_ms,
            } => {
                assert_eq!(target.namespace, "routes");
                assert_eq!(value, "42");
                assert_eq!(ttl_ms, 500);
                assert_eq!(target.tags().serialize().unwrap(), "a=1&b=2");
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_memory_mode_warns() {
        assert!(memory_mode_warning(BackendMode::Memory).is_some());
        assert!(memory_mode_warning(BackendMode::Failover).is_none());

        let ctx = Context::from_config(Config::default()).unwrap();
        assert!(memory_mode_warning(ctx.cache.mode()).is_some());
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
