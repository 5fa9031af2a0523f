use camino::Utf8PathBuf;

use pageclone_utils::error::ConfigError;

use super::{Config, ConfigSource};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this to configure pageclone without relying on environment
    /// variables or config files.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use pageclone_config::Config;
    ///
    /// let config = Config::builder()
    ///     .state_dir("/custom/state")
    ///     .min_interval_ms(500)
    ///     .backoff_multiplier(1.5)
    ///     .build()
    ///     .expect("Failed to build config");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration of pageclone.
///
/// # Source Attribution
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic` in the resulting `Config`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    state_dir: Option<Utf8PathBuf>,
    verbose: Option<bool>,
    min_interval_ms: Option<u64>,
    backoff_multiplier: Option<f64>,
    max_delay_ms: Option<u64>,
    reset_after_clean: Option<u32>,
    max_verification_attempts: Option<u32>,
}

impl ConfigBuilder {
    /// Create a new `ConfigBuilder` with no values set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state directory holding `progress/` and `archive/`.
    #[must_use]
    pub fn state_dir(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.state_dir = Some(path.into());
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Minimum spacing between fetches. Default: 2000 ms.
    #[must_use]
    pub fn min_interval_ms(mut self, ms: u64) -> Self {
        self.min_interval_ms = Some(ms);
        self
    }

    /// Factor applied to the delay per blocking signal. Default: 2.0.
    #[must_use]
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Ceiling on the backed-off delay. Default: 60000 ms.
    #[must_use]
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = Some(ms);
        self
    }

    /// Clean requests needed before the delay returns to baseline. Default: 5.
    #[must_use]
    pub fn reset_after_clean(mut self, count: u32) -> Self {
        self.reset_after_clean = Some(count);
        self
    }

    /// Verification attempt ceiling. Default: 3.
    #[must_use]
    pub fn max_verification_attempts(mut self, attempts: u32) -> Self {
        self.max_verification_attempts = Some(attempts);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the resulting values fail
    /// validation.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = Config::defaults_only();
        let mut set = |key: &str| {
            config
                .source_attribution
                .insert(key.to_string(), ConfigSource::Programmatic);
        };

        if self.state_dir.is_some() {
            set("state_dir");
        }
        if self.verbose.is_some() {
            set("verbose");
        }
        if self.min_interval_ms.is_some() {
            set("rate_limit.min_interval_ms");
        }
        if self.backoff_multiplier.is_some() {
            set("rate_limit.backoff_multiplier");
        }
        if self.max_delay_ms.is_some() {
            set("rate_limit.max_delay_ms");
        }
        if self.reset_after_clean.is_some() {
            set("rate_limit.reset_after_clean");
        }
        if self.max_verification_attempts.is_some() {
            set("verification.max_attempts");
        }

        config.defaults.state_dir = self.state_dir;
        config.defaults.verbose = self.verbose;
        if let Some(v) = self.min_interval_ms {
            config.rate_limit.min_interval_ms = v;
        }
        if let Some(v) = self.backoff_multiplier {
            config.rate_limit.backoff_multiplier = v;
        }
        if let Some(v) = self.max_delay_ms {
            config.rate_limit.max_delay_ms = v;
        }
        if let Some(v) = self.reset_after_clean {
            config.rate_limit.reset_after_clean = v;
        }
        if let Some(v) = self.max_verification_attempts {
            config.verification.max_attempts = v;
        }

        config.validate()?;
        Ok(config)
    }
}
