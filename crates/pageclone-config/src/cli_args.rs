use camino::Utf8PathBuf;
use std::path::PathBuf;

/// CLI-level overrides; `None` leaves the file or default value in place.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file; skips upward discovery.
    pub config_path: Option<PathBuf>,
    pub state_dir: Option<Utf8PathBuf>,
    pub verbose: Option<bool>,
    pub min_interval_ms: Option<u64>,
    pub max_verification_attempts: Option<u32>,
}
