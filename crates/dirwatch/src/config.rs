//! Configuration schema for the directory watcher.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default delay before a failed watch session is restarted.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 5_000;

/// Default time construction waits for the first session to come up.
pub const DEFAULT_STARTUP_GRACE_MS: u64 = 500;

/// Default number of attempts made to deliver an event to the handler.
pub const DEFAULT_CALLBACK_ATTEMPTS: u32 = 2;

/// Default delay between handler delivery attempts.
pub const DEFAULT_CALLBACK_RETRY_DELAY_MS: u64 = 100;

/// Directory watcher configuration.
///
/// Can be built in code with the `with_*` setters or loaded from TOML:
///
/// ```toml
/// exclude = ["/**/target", "/**/.git"]
/// restart_delay_ms = 5000
/// startup_grace_ms = 500
/// callback_attempts = 2
/// callback_retry_delay_ms = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Shell-glob patterns matched against resolved paths; first match excludes.
    pub exclude: Vec<String>,
    /// Delay between a failed session and the next one, in milliseconds.
    pub restart_delay_ms: u64,
    /// Bounded wait during construction, in milliseconds.
    pub startup_grace_ms: u64,
    /// Total handler attempts per event (first try included).
    pub callback_attempts: u32,
    /// Delay between handler attempts, in milliseconds.
    pub callback_retry_delay_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            startup_grace_ms: DEFAULT_STARTUP_GRACE_MS,
            callback_attempts: DEFAULT_CALLBACK_ATTEMPTS,
            callback_retry_delay_ms: DEFAULT_CALLBACK_RETRY_DELAY_MS,
        }
    }
}

impl WatcherConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exclusion patterns.
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the session restart delay.
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the startup grace period.
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace_ms = grace.as_millis() as u64;
        self
    }

    /// Set the number of handler attempts per event.
    pub fn with_callback_attempts(mut self, attempts: u32) -> Self {
        self.callback_attempts = attempts;
        self
    }

    /// Set the delay between handler attempts.
    pub fn with_callback_retry_delay(mut self, delay: Duration) -> Self {
        self.callback_retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn callback_retry_delay(&self) -> Duration {
        Duration::from_millis(self.callback_retry_delay_ms)
    }

    /// Parse a configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Check the configuration for values the watcher can not run with.
    ///
    /// Malformed exclusion patterns are not rejected here; they
    /// are reported and skipped when the filter is built.
    pub fn validate(&self) -> Result<()> {
        if self.callback_attempts == 0 {
            return Err(Error::Config(
                "callback_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
