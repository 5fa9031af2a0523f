use std::fmt;
use std::io;
use thiserror::Error;

use crate::exit_codes::ExitCode;
use crate::slug::SlugError;
use crate::types::{OverallStatus, PhaseKind, PhaseStatus};

/// Library-level error type with rich context and user-friendly reporting.
///
/// `CloneError` is the error returned by the orchestrator, the progress store
/// and configuration loading. Failures raised by external collaborators are
/// not `CloneError`s: they are classified into the recovery taxonomy and
/// reported as phase results instead.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration and slug errors |
/// | 3 | No progress record for the slug |
/// | 4 | Phase ordering, archive and duplicate-record preconditions |
/// | 5 | Clone is waiting for operator input |
/// | 130 | Cancelled |
/// | 1 | Other errors |
///
/// # Example
///
/// ```rust
/// use pageclone_utils::error::{CloneError, ProgressError};
/// use pageclone_utils::exit_codes::ExitCode;
///
/// let err = CloneError::Progress(ProgressError::NotFound { slug: "pricing".into() });
/// assert_eq!(err.to_exit_code(), ExitCode::NOT_FOUND);
/// assert!(err.display_for_user().starts_with("Error: "));
/// ```
#[derive(Error, Debug)]
pub enum CloneError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Progress store error: {0}")]
    Progress(#[from] ProgressError),

    #[error("Phase error: {0}")]
    Phase(#[from] PhaseError),

    #[error("Page slug validation error: {0}")]
    Slug(#[from] SlugError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Clone {slug} was cancelled{}", cancelled_suffix(.phase))]
    Cancelled {
        slug: String,
        phase: Option<PhaseKind>,
    },
}

fn cancelled_suffix(phase: &Option<PhaseKind>) -> String {
    phase.map(|p| format!(" during {p}")).unwrap_or_default()
}

/// Trait for errors that can provide user-friendly messages and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Persistence,
    PhaseExecution,
    Acquisition,
    Generation,
    Verification,
    Validation,
    Concurrency,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Persistence => write!(f, "Persistence"),
            Self::PhaseExecution => write!(f, "Phase Execution"),
            Self::Acquisition => write!(f, "Acquisition"),
            Self::Generation => write!(f, "Generation"),
            Self::Verification => write!(f, "Verification"),
            Self::Validation => write!(f, "Validation"),
            Self::Concurrency => write!(f, "Concurrency"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files are TOML with optional [defaults], [rate_limit] and [verification] sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific range requirements."
            )),
            Self::NotFound { .. } => Some(
                "pageclone searches for .pageclone/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            Self::DiscoveryFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Remove unknown sections or keys".to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "rate_limit.min_interval_ms" | "rate_limit.max_delay_ms" => vec![
                    "Keep min_interval_ms less than or equal to max_delay_ms".to_string(),
                    "Example: min_interval_ms = 2000, max_delay_ms = 60000".to_string(),
                ],
                "rate_limit.backoff_multiplier" => {
                    vec!["Use a multiplier of at least 1.0 (e.g. 2.0)".to_string()]
                }
                "rate_limit.reset_after_clean" => {
                    vec!["Use a positive number of clean requests (e.g. 5)".to_string()]
                }
                "verification.max_attempts" => {
                    vec!["Use a value between 1 and 20 (default 3)".to_string()]
                }
                _ => vec![
                    "Check the documentation for valid values for this option".to_string(),
                    "Remove the option to use the default value".to_string(),
                ],
            },
            Self::NotFound { .. } => vec![
                "Create .pageclone/config.toml in your project root".to_string(),
                "Omit --config to fall back to discovery and built-in defaults".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check read permissions on the current directory and its parents".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Progress store errors
#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("A progress record for '{slug}' already exists")]
    AlreadyExists { slug: String },

    #[error("No progress record for '{slug}'")]
    NotFound { slug: String },

    #[error("Cannot archive '{slug}' while its status is {status}")]
    ArchivePrecondition { slug: String, status: OverallStatus },

    #[error("Progress record at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Failed to write progress record at {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

impl UserFriendlyError for ProgressError {
    fn user_message(&self) -> String {
        match self {
            Self::AlreadyExists { slug } => {
                format!("A clone for page '{slug}' is already in progress")
            }
            Self::NotFound { slug } => format!("No clone progress found for page '{slug}'"),
            Self::ArchivePrecondition { slug, status } => {
                format!("Clone '{slug}' cannot be archived until it completes (status: {status})")
            }
            Self::Corrupt { path, .. } => format!("Progress record {path} could not be read"),
            Self::WriteFailed { path, .. } => format!("Progress record {path} could not be saved"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::AlreadyExists { .. } => Some(
                "Each page slug has at most one active clone record.".to_string(),
            ),
            Self::NotFound { .. } => Some(
                "Active records live under <state_dir>/progress and completed ones under <state_dir>/archive."
                    .to_string(),
            ),
            Self::ArchivePrecondition { .. } => {
                Some("Only completed clones are moved to the archive.".to_string())
            }
            Self::Corrupt { reason, .. } | Self::WriteFailed { reason, .. } => {
                Some(reason.clone())
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::AlreadyExists { slug } => vec![
                "Re-run with resume enabled to continue the existing clone".to_string(),
                format!("Inspect it with 'pageclone status {slug}'"),
            ],
            Self::NotFound { .. } => vec![
                "Check the slug with 'pageclone list'".to_string(),
                "Check --state-dir or PAGECLONE_HOME points at the right directory".to_string(),
            ],
            Self::ArchivePrecondition { slug, .. } => vec![
                format!("Finish the remaining phases of '{slug}' first"),
                format!("Use 'pageclone ack {slug}' if the clone is waiting for input"),
            ],
            Self::Corrupt { .. } => vec![
                "Inspect or remove the file manually; it is plain JSON".to_string(),
            ],
            Self::WriteFailed { .. } => vec![
                "Check free disk space and write permissions on the state directory".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Persistence
    }
}

/// Phase sequencing errors raised by the orchestrator before any collaborator runs
#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("Phase {phase} requires {dependency} to be completed first")]
    DependencyNotSatisfied {
        phase: PhaseKind,
        dependency: PhaseKind,
    },

    #[error("Phase {phase} cannot start from state {from}")]
    InvalidTransition { phase: PhaseKind, from: PhaseStatus },

    #[error("Phase {phase} precondition failed: {reason}")]
    PreconditionFailed { phase: PhaseKind, reason: String },

    #[error("Clone '{slug}' is waiting for operator input (status: {status})")]
    AwaitingUserInput { slug: String, status: OverallStatus },

    #[error("Clone '{slug}' is paused")]
    Paused { slug: String },
}

impl UserFriendlyError for PhaseError {
    fn user_message(&self) -> String {
        match self {
            Self::DependencyNotSatisfied { phase, dependency } => {
                format!("Cannot run {phase}: {dependency} has not completed")
            }
            Self::InvalidTransition { phase, from } => {
                format!("Cannot run {phase} again: it is already {from}")
            }
            Self::PreconditionFailed { phase, reason } => {
                format!("Cannot run {phase}: {reason}")
            }
            Self::AwaitingUserInput { slug, status } => {
                format!("Clone '{slug}' needs operator attention ({status})")
            }
            Self::Paused { slug } => format!("Clone '{slug}' is paused"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::DependencyNotSatisfied { .. } | Self::InvalidTransition { .. } => Some(
                "Phases run strictly in order: analyze, extract, plan, implement, verify.".to_string(),
            ),
            Self::PreconditionFailed { .. } => None,
            Self::AwaitingUserInput { .. } => Some(
                "The orchestrator never continues a paused-for-input or failed clone on its own."
                    .to_string(),
            ),
            Self::Paused { .. } => {
                Some("Phases do not run while a clone is paused.".to_string())
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::DependencyNotSatisfied { dependency, .. } => {
                vec![format!("Run the {dependency} phase first")]
            }
            Self::InvalidTransition { .. } => {
                vec!["Check the clone with 'pageclone status <slug>'".to_string()]
            }
            Self::PreconditionFailed { .. } => {
                vec!["Re-run the earlier phases so their outputs are saved".to_string()]
            }
            Self::AwaitingUserInput { slug, .. } => vec![
                "Resolve the reported problem (e.g. solve the CAPTCHA or fix the build)".to_string(),
                format!("Then run 'pageclone ack {slug}' to continue"),
            ],
            Self::Paused { .. } => {
                vec!["Resume the clone to continue from the first pending phase".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::PhaseExecution
    }
}

impl UserFriendlyError for CloneError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Progress(e) => e.user_message(),
            Self::Phase(e) => e.user_message(),
            Self::Slug(e) => e.user_message(),
            Self::Io(e) => format!("File system operation failed: {e}"),
            Self::Cancelled { slug, phase } => match phase {
                Some(phase) => format!("Clone '{slug}' was cancelled during {phase}"),
                None => format!("Clone '{slug}' was cancelled"),
            },
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Progress(e) => e.context(),
            Self::Phase(e) => e.context(),
            Self::Slug(e) => e.context(),
            Self::Io(_) => None,
            Self::Cancelled { .. } => Some(
                "The interrupted phase was reset to pending and the clone was paused.".to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Progress(e) => e.suggestions(),
            Self::Phase(e) => e.suggestions(),
            Self::Slug(e) => e.suggestions(),
            Self::Io(_) => vec!["Check permissions on the state directory".to_string()],
            Self::Cancelled { .. } => {
                vec!["Re-run with resume enabled to pick up where it stopped".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::Progress(e) => e.category(),
            Self::Phase(e) => e.category(),
            Self::Slug(e) => e.category(),
            Self::Io(_) => ErrorCategory::Persistence,
            Self::Cancelled { .. } => ErrorCategory::Concurrency,
        }
    }
}

impl CloneError {
    /// Get a user-friendly error message with context and actionable suggestions
    #[must_use]
    pub fn display_for_user(&self) -> String {
        render_for_user(self)
    }

    /// Map this error to the CLI exit code.
    ///
    /// | Exit Code | Name | Description |
    /// |-----------|------|-------------|
    /// | 1 | INTERNAL | General failure |
    /// | 2 | CLI_ARGS | Bad configuration or slug |
    /// | 3 | NOT_FOUND | No record for the slug |
    /// | 4 | PRECONDITION | Ordering, archive or duplicate precondition |
    /// | 5 | AWAITING_USER_INPUT | Operator must intervene |
    /// | 130 | CANCELLED | Cancelled |
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) | Self::Slug(_) => ExitCode::CLI_ARGS,
            Self::Progress(ProgressError::NotFound { .. }) => ExitCode::NOT_FOUND,
            Self::Progress(ProgressError::AlreadyExists { .. })
            | Self::Progress(ProgressError::ArchivePrecondition { .. }) => ExitCode::PRECONDITION,
            Self::Progress(_) | Self::Io(_) => ExitCode::INTERNAL,
            Self::Phase(PhaseError::AwaitingUserInput { .. }) => ExitCode::AWAITING_USER_INPUT,
            Self::Phase(_) => ExitCode::PRECONDITION,
            Self::Cancelled { .. } => ExitCode::CANCELLED,
        }
    }
}

/// Render any [`UserFriendlyError`] in the `Error / Context / Suggestions` layout.
#[must_use]
pub fn render_for_user<E: UserFriendlyError + ?Sized>(err: &E) -> String {
    let mut output = String::new();

    output.push_str(&format!("Error: {}\n", err.user_message()));

    if let Some(ctx) = err.context() {
        output.push_str(&format!("\nContext: {ctx}\n"));
    }

    let suggestions = err.suggestions();
    if !suggestions.is_empty() {
        output.push_str("\nSuggestions:\n");
        for suggestion in suggestions {
            output.push_str(&format!("  • {suggestion}\n"));
        }
    }

    output
}
