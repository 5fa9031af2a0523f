//! Configuration management for pageclone
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. The TOML file may contain `[defaults]`,
//! `[rate_limit]` and `[verification]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;
pub use pageclone_utils::types::ConfigSource;

/// Every key that carries source attribution, in display order.
pub const ATTRIBUTED_KEYS: [&str; 7] = [
    "state_dir",
    "verbose",
    "rate_limit.min_interval_ms",
    "rate_limit.backoff_multiplier",
    "rate_limit.max_delay_ms",
    "rate_limit.reset_after_clean",
    "verification.max_attempts",
];
