use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use pageclone_utils::types::ConfigSource;

/// Default minimum spacing between fetches to the same host.
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 2_000;
/// Default factor applied to the delay on each blocking signal.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
/// Default ceiling on the backed-off delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
/// Default number of consecutive clean requests before the delay resets.
pub const DEFAULT_RESET_AFTER_CLEAN: u32 = 5;
/// Default verification attempt ceiling.
pub const DEFAULT_MAX_VERIFICATION_ATTEMPTS: u32 = 3;

/// Configuration for pageclone operations.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > config file > built-in defaults.
///
/// # Discovery
///
/// Use [`Config::discover()`] for CLI-like behavior that searches for
/// `.pageclone/config.toml` upward from the current directory.
///
/// # Programmatic Configuration
///
/// Use [`Config::builder()`] for deterministic configuration independent of
/// the user's environment.
///
/// # Example
///
/// ```rust
/// use pageclone_config::Config;
///
/// let config = Config::builder()
///     .min_interval_ms(10)
///     .max_verification_attempts(2)
///     .build()
///     .expect("valid config");
/// assert_eq!(config.verification.max_attempts, 2);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub rate_limit: RateLimitConfig,
    pub verification: VerificationConfig,
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[defaults]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub state_dir: Option<Utf8PathBuf>,
    pub verbose: Option<bool>,
}

/// `[rate_limit]` section after defaults are applied
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub min_interval_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub reset_after_clean: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            reset_after_clean: DEFAULT_RESET_AFTER_CLEAN,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// `[verification]` section after defaults are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    /// Ceiling on end-to-end verification attempts per clone.
    pub max_attempts: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_VERIFICATION_ATTEMPTS,
        }
    }
}

impl Config {
    /// State directory: `[defaults].state_dir`, else `PAGECLONE_HOME`, else `.pageclone`.
    #[must_use]
    pub fn state_dir(&self) -> Utf8PathBuf {
        self.defaults
            .state_dir
            .clone()
            .unwrap_or_else(pageclone_utils::paths::pageclone_home)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    /// Built-in defaults with every key attributed to `default`.
    #[must_use]
    pub fn defaults_only() -> Self {
        let source_attribution = super::ATTRIBUTED_KEYS
            .iter()
            .map(|k| ((*k).to_string(), ConfigSource::Default))
            .collect();
        Self {
            defaults: Defaults::default(),
            rate_limit: RateLimitConfig::default(),
            verification: VerificationConfig::default(),
            source_attribution,
        }
    }
}

/// `[rate_limit]` as it appears in the file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileRateLimit {
    pub min_interval_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub max_delay_ms: Option<u64>,
    pub reset_after_clean: Option<u32>,
}

/// `[verification]` as it appears in the file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileVerification {
    pub max_attempts: Option<u32>,
}
