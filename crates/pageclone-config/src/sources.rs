use std::collections::BTreeMap;

use super::{ATTRIBUTED_KEYS, Config, ConfigSource};

impl Config {
    /// Get effective configuration as key -> (value, source) with source attribution.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        for key in ATTRIBUTED_KEYS {
            let value = match key {
                "state_dir" => self.state_dir().to_string(),
                "verbose" => self.verbose().to_string(),
                "rate_limit.min_interval_ms" => self.rate_limit.min_interval_ms.to_string(),
                "rate_limit.backoff_multiplier" => self.rate_limit.backoff_multiplier.to_string(),
                "rate_limit.max_delay_ms" => self.rate_limit.max_delay_ms.to_string(),
                "rate_limit.reset_after_clean" => self.rate_limit.reset_after_clean.to_string(),
                "verification.max_attempts" => self.verification.max_attempts.to_string(),
                _ => continue,
            };
            let source = self
                .source_attribution
                .get(key)
                .unwrap_or(&ConfigSource::Default)
                .as_str()
                .to_string();
            config.insert(key.to_string(), (value, source));
        }

        config
    }
}
