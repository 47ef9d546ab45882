//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::Parser;

pub use defaults::{
    DEFAULT_DIRECTIVE_RETRY_MS, DEFAULT_ENDPOINT_SILENCE_MS, DEFAULT_ENDPOINT_THRESHOLD,
    MAX_RMS_LEVEL,
};

/// CLI options for the mirror's voice session service. Validated values
/// keep the session controller's invariants intact from startup.
#[derive(Debug, Parser, Clone)]
#[command(about = "Smart-mirror push-to-talk session controller", author, version)]
pub struct AppConfig {
    /// RMS level below which audio counts as silence
    #[arg(long = "endpoint-threshold", default_value_t = DEFAULT_ENDPOINT_THRESHOLD)]
    pub endpoint_threshold: u32,

    /// Silence tail before a listening session auto-ends (milliseconds)
    #[arg(long = "endpoint-silence-ms", default_value_t = DEFAULT_ENDPOINT_SILENCE_MS)]
    pub endpoint_silence_ms: u64,

    /// Retry interval while an expect-speech directive waits for idle (milliseconds)
    #[arg(long = "directive-retry-ms", default_value_t = DEFAULT_DIRECTIVE_RETRY_MS)]
    pub directive_retry_ms: u64,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "MIRRORTALK_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "MIRRORTALK_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}
