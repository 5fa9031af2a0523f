//! Failure classification and recovery for the page clone workflow
//!
//! Every failure raised by a collaborator goes through [`classify_error`]
//! (or [`classify`] for plain text) and comes out as exactly one
//! [`ClassifiedError`]. [`resolve`] then maps that error to the
//! [`RecoveryStrategy`] the orchestrator acts on. Both functions are pure.

mod classifier;
mod strategy;
mod taxonomy;

pub use classifier::{ErrorContext, classify, classify_error, screen_for_bot_detection};
pub use strategy::{RecoveryAction, RecoveryStrategy, resolve};
pub use taxonomy::{AcquisitionCode, ClassifiedError, ErrorDomain, GenerationCode, VerificationCode};
