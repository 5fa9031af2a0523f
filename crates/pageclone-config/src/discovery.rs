use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use pageclone_utils::error::ConfigError;

use super::model::{FileRateLimit, FileVerification};
use super::{CliArgs, Config, ConfigSource, Defaults};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    rate_limit: Option<FileRateLimit>,
    verification: Option<FileVerification>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or when
    /// the merged values fail validation.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("cannot determine current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// This is the path-driven variant tests use to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::defaults_only();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "Loading configuration file");
            let file_config = Self::load_config_file(path)?;
            config.apply_file(file_config);
        }

        config.apply_cli(cli_args);
        config.validate()?;
        Ok(config)
    }

    /// Walk upward from `start_dir` looking for `.pageclone/config.toml`.
    ///
    /// Stops at the filesystem root or at a repository root marker.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".pageclone").join("config.toml");
            if config_path.is_file() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                return None;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))
    }

    fn apply_file(&mut self, file: TomlConfig) {
        let attribution = &mut self.source_attribution;
        let mut mark = |key: &str| {
            attribution.insert(key.to_string(), ConfigSource::Config);
        };

        if let Some(defaults) = file.defaults {
            if defaults.state_dir.is_some() {
                self.defaults.state_dir = defaults.state_dir;
                mark("state_dir");
            }
            if defaults.verbose.is_some() {
                self.defaults.verbose = defaults.verbose;
                mark("verbose");
            }
        }

        if let Some(rl) = file.rate_limit {
            if let Some(v) = rl.min_interval_ms {
                self.rate_limit.min_interval_ms = v;
                mark("rate_limit.min_interval_ms");
            }
            if let Some(v) = rl.backoff_multiplier {
                self.rate_limit.backoff_multiplier = v;
                mark("rate_limit.backoff_multiplier");
            }
            if let Some(v) = rl.max_delay_ms {
                self.rate_limit.max_delay_ms = v;
                mark("rate_limit.max_delay_ms");
            }
            if let Some(v) = rl.reset_after_clean {
                self.rate_limit.reset_after_clean = v;
                mark("rate_limit.reset_after_clean");
            }
        }

        if let Some(verification) = file.verification
            && let Some(v) = verification.max_attempts
        {
            self.verification.max_attempts = v;
            mark("verification.max_attempts");
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        let mut overrides: HashMap<&str, ConfigSource> = HashMap::new();

        if let Some(dir) = &cli.state_dir {
            self.defaults.state_dir = Some(dir.clone());
            overrides.insert("state_dir", ConfigSource::Cli);
        }
        if let Some(verbose) = cli.verbose {
            self.defaults.verbose = Some(verbose);
            overrides.insert("verbose", ConfigSource::Cli);
        }
        if let Some(ms) = cli.min_interval_ms {
            self.rate_limit.min_interval_ms = ms;
            overrides.insert("rate_limit.min_interval_ms", ConfigSource::Cli);
        }
        if let Some(n) = cli.max_verification_attempts {
            self.verification.max_attempts = n;
            overrides.insert("verification.max_attempts", ConfigSource::Cli);
        }

        for (key, source) in overrides {
            self.source_attribution.insert(key.to_string(), source);
        }
    }
}
