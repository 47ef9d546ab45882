use super::defaults::{
    MAX_DIRECTIVE_RETRY_MS, MAX_ENDPOINT_SILENCE_MS, MAX_RMS_LEVEL, MIN_DIRECTIVE_RETRY_MS,
};
use super::AppConfig;
use crate::session::{EndpointConfig, SessionConfig};
use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Range-check CLI values so bad tuning fails at startup rather than
    /// mid-session.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint_threshold > MAX_RMS_LEVEL {
            bail!(
                "--endpoint-threshold must be between 0 and {MAX_RMS_LEVEL}, got {}",
                self.endpoint_threshold
            );
        }
        if self.endpoint_silence_ms == 0 || self.endpoint_silence_ms > MAX_ENDPOINT_SILENCE_MS {
            bail!(
                "--endpoint-silence-ms must be between 1 and {MAX_ENDPOINT_SILENCE_MS}, got {}",
                self.endpoint_silence_ms
            );
        }
        if !(MIN_DIRECTIVE_RETRY_MS..=MAX_DIRECTIVE_RETRY_MS).contains(&self.directive_retry_ms) {
            bail!(
                "--directive-retry-ms must be between {MIN_DIRECTIVE_RETRY_MS} and {MAX_DIRECTIVE_RETRY_MS}, got {}",
                self.directive_retry_ms
            );
        }
        Ok(())
    }

    /// Snapshot the CLI-controlled session settings for the controller.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let endpoint = EndpointConfig::new(
            self.endpoint_threshold,
            Duration::from_millis(self.endpoint_silence_ms),
        )?;
        Ok(SessionConfig::new(
            endpoint,
            Duration::from_millis(self.directive_retry_ms),
        ))
    }
}
