//! pageclone: resumable page cloning with classified recovery
//!
//! pageclone drives a clone request through five phases
//!
//! ```text
//! Analyze → Extract → Plan → Implement → Verify
//! ```
//!
//! and persists every transition so an interrupted clone can be resumed
//! from the first phase that did not complete. Collaborator failures are
//! classified into a closed taxonomy and mapped to a recovery action;
//! source fetches are paced by a per-host rate limiter; verification is
//! retried a bounded number of times before the clone is handed to an
//! operator.
//!
//! # Stable Public API
//!
//! - [`CloneOrchestrator`]: the phase state machine
//! - [`CloneRequest`], [`Collaborators`], [`PhaseInputs`]: what a run needs
//! - [`ProgressStore`], [`ProgressRecord`]: durable per-slug state
//! - [`classify`], [`resolve`]: failure classification and recovery
//! - [`RateLimiter`], [`RateLimiterRegistry`]: request pacing
//! - [`Config`], [`ConfigBuilder`], [`CliArgs`]: configuration
//! - [`CloneError`], [`ExitCode`]: errors and exit codes
//!
//! Everything else is re-exported under `#[doc(hidden)]` for tests and the
//! binary and may change between minor releases.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pageclone::{CloneOrchestrator, CloneRequest, Config, RateLimiterRegistry, RunOutcome};
//!
//! let config = Config::builder().state_dir(".pageclone").build()?;
//! let limiters = RateLimiterRegistry::new((&config.rate_limit).into());
//! let request = CloneRequest::new("https://example.com/pricing", "Pricing", "pricing");
//! let mut orchestrator =
//!     CloneOrchestrator::from_config(request, collaborators, &config, &limiters);
//!
//! match orchestrator.run(&inputs).await? {
//!     RunOutcome::Completed(report) => println!("{report}"),
//!     RunOutcome::Stopped { result, status } => eprintln!("stopped ({status}): {:?}", result.errors),
//! }
//! ```

// ============================================================================
// Stable public API
// ============================================================================

/// Phase state machine for one clone request.
///
/// See [`CloneOrchestrator::run`] for the whole pipeline and the
/// `execute_*_phase` methods for driving phases one at a time.
pub use pageclone_engine::CloneOrchestrator;

/// Inputs that identify one clone.
pub use pageclone_engine::{CloneRequest, Collaborators, PhaseInputs, VerifyCapture};

/// How a pipeline run ended and the final report.
pub use pageclone_engine::{CompletionReport, MAX_ATTEMPTS_REACHED, RunOutcome, SUMMARY_FILE_LIMIT};

/// Operator actions that work on a record without an orchestrator.
pub use pageclone_engine::{acknowledge_intervention, pause_clone};

/// Cooperative cancellation for in-flight phases.
pub use pageclone_engine::CancellationToken;

/// Durable progress records.
pub use pageclone_progress::{ErrorLogEntry, PhaseState, ProgressRecord, ProgressStore};

/// Failure classification and recovery.
pub use pageclone_recovery::{
    ClassifiedError, ErrorContext, RecoveryAction, RecoveryStrategy, classify, classify_error,
    resolve,
};

/// Request pacing.
pub use pageclone_ratelimit::{RateLimitPolicy, RateLimiter, RateLimiterRegistry};

/// Collaborator ports and the per-phase result.
pub use pageclone_phase_api::{
    CloneVerifier, ContentExtractor, ImplementationPlanner, Implementer, PageAnalyzer, PhaseResult,
};

/// Configuration with discovery and precedence: CLI > file > defaults.
pub use pageclone_config::{CliArgs, Config, ConfigBuilder};

/// Library-level error type.
///
/// Library code returns `CloneError` and never calls `std::process::exit()`;
/// use [`to_exit_code()`](CloneError::to_exit_code) at the process edge.
pub use pageclone_utils::error::CloneError;

/// Exit codes matching the documented exit code table.
pub use pageclone_utils::exit_codes::ExitCode;

/// Error reporting helpers.
pub use pageclone_utils::error::{ErrorCategory, UserFriendlyError};

/// Shared vocabulary.
pub use pageclone_utils::types::{OverallStatus, PhaseKind, PhaseOutcome, PhaseStatus};

// ============================================================================
// Internal modules - accessible but not stable
// ============================================================================

#[doc(hidden)]
pub use pageclone_config as config;
#[doc(hidden)]
pub use pageclone_engine as engine;
#[doc(hidden)]
pub use pageclone_phase_api as phase_api;
#[doc(hidden)]
pub use pageclone_progress as progress;
#[doc(hidden)]
pub use pageclone_ratelimit as ratelimit;
#[doc(hidden)]
pub use pageclone_recovery as recovery;
#[doc(hidden)]
pub use pageclone_utils::{atomic_write, error, exit_codes, logging, paths, slug, types};

// Exported with #[doc(hidden)] to allow white-box testing of CLI flag parsing
#[doc(hidden)]
pub mod cli;
