//! Desk configuration
//!
//! TOML-based settings for the backend location, the poll loop, the
//! post-completion delays and the per-module selection limits. Every field
//! has a default so an empty file is a valid configuration.

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::progress::{PollPolicy, ProgressMode};

pub const MB: u64 = 1024 * 1024;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Base URL of the processing backend
    pub base_url: String,
    pub poll: PollConfig,
    pub timing: TimingConfig,
    pub limits: LimitsConfig,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5009".to_string(),
            poll: PollConfig::default(),
            timing: TimingConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl DeskConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use pdfdesk_core::config::DeskConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = DeskConfig::from_str(r#"
    ///     base_url = "https://pdf.example.com"
    ///     [poll]
    ///     interval_ms = 500
    /// "#)?;
    /// assert_eq!(config.poll.interval_ms, 500);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the poll loop and HTTP client cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.poll.interval_ms > 0,
            "Invalid configuration: poll.interval_ms must be greater than 0"
        );
        ensure!(
            self.timing.request_timeout_secs > 0,
            "Invalid configuration: timing.request_timeout_secs must be greater than 0"
        );
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll.interval_ms),
            max_poll_errors: self.poll.max_poll_errors,
            max_duration: Duration::from_secs(self.poll.max_duration_secs),
            mode: if self.poll.smoothing {
                ProgressMode::Smooth
            } else {
                ProgressMode::Snap
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between two status requests
    pub interval_ms: u64,
    /// Consecutive network failures tolerated before giving up
    pub max_poll_errors: u32,
    /// Hard ceiling on the whole poll loop
    pub max_duration_secs: u64,
    /// Ease the displayed percentage toward the reported one
    pub smoothing: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_poll_errors: 3,
            max_duration_secs: 30 * 60,
            smoothing: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause between the completion message and the download
    pub download_delay_ms: u64,
    /// Pause between the download and the reset
    pub reset_delay_ms: u64,
    /// Ceiling on one HTTP request, upload included
    pub request_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            download_delay_ms: 1000,
            reset_delay_ms: 2000,
            request_timeout_secs: 300,
        }
    }
}

impl TimingConfig {
    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub compress_max_files: usize,
    pub compress_max_total_mb: u64,
    /// Request body cap for every other module
    pub request_max_total_mb: u64,
    /// Compressor warns above this many pages
    pub page_warning_threshold: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            compress_max_files: 10,
            compress_max_total_mb: 1024,
            request_max_total_mb: 500,
            page_warning_threshold: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DeskConfig::from_str("").unwrap();
        assert_eq!(config, DeskConfig::default());
        assert_eq!(config.limits.compress_max_files, 10);
        assert_eq!(config.poll.interval_ms, 1000);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = DeskConfig::from_str(
            r#"
            [limits]
            compress_max_files = 4

            [timing]
            reset_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.limits.compress_max_files, 4);
        assert_eq!(config.limits.compress_max_total_mb, 1024);
        assert_eq!(config.timing.reset_delay_ms, 0);
        assert_eq!(config.timing.download_delay_ms, 1000);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let err = DeskConfig::from_str("base_url = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_poll_policy_conversion() {
        let mut config = DeskConfig::default();
        config.poll.smoothing = false;
        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.max_poll_errors, 3);
        assert_eq!(policy.mode, ProgressMode::Snap);
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let err = DeskConfig::from_str("[poll]\ninterval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("poll.interval_ms"));

        let mut config = DeskConfig::default();
        config.timing.request_timeout_secs = 0;
        assert!(config.validate().is_err());
        assert!(DeskConfig::default().validate().is_ok());
    }
}
