//! Typed subsystem errors (spec.md §7). `main.rs` collapses these into
//! `anyhow::Result` at the process boundary and maps configuration/fatal
//! errors to the exit codes in spec.md §6.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FabricError {
    #[error("external broker disconnected")]
    Disconnected,
    #[error("publish queue full for topic `{0}`")]
    QueueFull(String),
    #[error("rate limit exceeded for topic `{0}`")]
    RateLimited(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("request to `{0}` timed out")]
    Timeout(String),
    #[error("json encode/decode failed: {0}")]
    Codec(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("malformed frame from sensor `{0}`")]
    MalformedFrame(String),
    #[error("value out of range: {0}")]
    OutOfRange(String),
    #[error("non-finite value in reading from `{0}`")]
    NonFinite(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("missing required safety threshold: {0}")]
    MissingThreshold(String),
}

/// Process exit codes, spec.md §6.
pub mod exit_code {
    pub const NORMAL: i32 = 0;
    pub const FATAL_INIT: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const SIGINT: i32 = 130;
}
