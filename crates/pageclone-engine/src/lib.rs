//! Page clone orchestration engine
//!
//! Drives a clone request through the fixed phase sequence
//!
//! ```text
//! Analyze → Extract → Plan → Implement → Verify
//! ```
//!
//! persisting every transition to a [`ProgressStore`], classifying every
//! collaborator failure into a recovery strategy, pacing source fetches
//! through a shared rate limiter and bounding verification attempts.
//!
//! # Example
//!
//! ```rust,ignore
//! use pageclone_engine::{CloneOrchestrator, CloneRequest, PhaseInputs, RunOutcome};
//!
//! let request = CloneRequest::new("https://example.com/pricing", "Pricing", "pricing");
//! let mut orchestrator =
//!     CloneOrchestrator::from_config(request, collaborators, &config, &limiters);
//! match orchestrator.run(&inputs).await? {
//!     RunOutcome::Completed(report) => println!("{report}"),
//!     RunOutcome::Stopped { result, status } => eprintln!("{:?} ({status})", result.errors),
//! }
//! ```

mod control;
mod orchestrator;
mod request;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

#[cfg(test)]
mod scenario_tests;

pub use control::{acknowledge_intervention, pause_clone};
pub use orchestrator::{
    CloneOrchestrator, CompletionReport, MAX_ATTEMPTS_REACHED, RunOutcome, SUMMARY_FILE_LIMIT,
};
pub use pageclone_progress::ProgressStore;
pub use request::{CloneRequest, Collaborators, PhaseInputs, VerifyCapture};
pub use tokio_util::sync::CancellationToken;
