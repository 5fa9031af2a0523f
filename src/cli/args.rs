//! CLI argument definitions (clap)

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pageclone - inspect and steer resumable page clones
#[derive(Parser, Debug)]
#[command(name = "pageclone")]
#[command(about = "Inspect and steer resumable page clone workflows")]
#[command(long_about = r#"
pageclone tracks page clones through five phases and persists their progress
so an interrupted clone can resume where it stopped.

EXAMPLES:
  # Show the progress of a clone
  pageclone status pricing

  # Same, as JSON
  pageclone status pricing --json

  # List active (or archived) clones
  pageclone list
  pageclone list --archived

  # See how a failure message would be classified
  pageclone classify "HTTP 429 Too Many Requests" --phase extract

  # Let a clone that is waiting on an operator continue
  pageclone ack pricing --resolution "solved captcha manually"

  # Move a completed clone out of the active set
  pageclone archive pricing

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .pageclone/config.toml
  Use --config to specify an explicit config file path

PHASES:
  Analyze → Extract → Plan → Implement → Verify
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding progress records (overrides config)
    #[arg(long, global = true)]
    pub state_dir: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the progress record of a clone
    ///
    /// Falls back to the archived record when no active one exists.
    Status {
        /// Page slug of the clone
        slug: String,

        /// Emit the full record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List clones in the active set
    List {
        /// List archived clones instead
        #[arg(long)]
        archived: bool,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Classify a failure message and show the recovery strategy
    ///
    /// EXAMPLES:
    ///   pageclone classify "net::ERR_TIMED_OUT" --phase analyze
    ///   pageclone classify "TypeError: x is undefined" --phase implement
    Classify {
        /// Failure text as a collaborator would report it
        message: String,

        /// Phase the failure happened in
        #[arg(long)]
        phase: Option<String>,

        /// Source URL to attach to acquisition errors
        #[arg(long)]
        url: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Archive a completed clone
    Archive {
        /// Page slug of the clone
        slug: String,
    },

    /// Acknowledge a clone that is waiting on an operator
    ///
    /// Moves an `awaiting_user_input` or `failed` clone back to `running`
    /// and records the resolution in its error log.
    Ack {
        /// Page slug of the clone
        slug: String,

        /// What the operator did
        #[arg(long)]
        resolution: Option<String>,
    },
}

impl Commands {
    /// Operation name used in error reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::List { .. } => "list",
            Self::Classify { .. } => "classify",
            Self::Archive { .. } => "archive",
            Self::Ack { .. } => "ack",
        }
    }
}

/// Build the clap command (for completions and doc tests).
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
