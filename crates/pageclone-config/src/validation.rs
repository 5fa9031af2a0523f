use pageclone_utils::error::ConfigError;

use super::Config;

/// Largest accepted verification ceiling.
pub const MAX_VERIFICATION_ATTEMPTS_LIMIT: u32 = 20;

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let rl = &self.rate_limit;

        if rl.min_interval_ms > rl.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                key: "rate_limit.min_interval_ms".to_string(),
                value: format!(
                    "{} exceeds rate_limit.max_delay_ms ({})",
                    rl.min_interval_ms, rl.max_delay_ms
                ),
            });
        }

        if !rl.backoff_multiplier.is_finite() || rl.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "rate_limit.backoff_multiplier".to_string(),
                value: format!("{} must be at least 1.0", rl.backoff_multiplier),
            });
        }

        if rl.reset_after_clean == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rate_limit.reset_after_clean".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }

        let attempts = self.verification.max_attempts;
        if attempts == 0 || attempts > MAX_VERIFICATION_ATTEMPTS_LIMIT {
            return Err(ConfigError::InvalidValue {
                key: "verification.max_attempts".to_string(),
                value: format!("{attempts} is outside 1..={MAX_VERIFICATION_ATTEMPTS_LIMIT}"),
            });
        }

        Ok(())
    }
}
