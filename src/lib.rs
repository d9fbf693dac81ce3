//! orion-cache: a two-tier cache that keeps answering when Redis does not.
//!
//! Reads and writes go to a remote Redis store first. Every write is mirrored
//! into an in-process TTL store, and when Redis is unreachable reads are
//! served from that mirror instead of failing.
//!
//! - [`cache`] - TTL store, remote adapter, failover backend and the client facade
//! - [`geo`] - Coordinate rounding for location-keyed entries
//! - [`config`] - TOML configuration with environment overrides
//! - [`context`] - Startup wiring of config and cache client
//! - [`logging`] - Tracing subscriber setup

#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod geo;
pub mod logging;
