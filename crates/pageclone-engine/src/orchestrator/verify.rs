//! Bounded verification loop.
//!
//! One call is one attempt. The orchestrator never retries on its own: a
//! `NeedsRetry` result hands the fix suggestions back to the caller, which
//! applies them and calls again. The attempt counter is persisted before the
//! verifier runs, so an attempt interrupted by a crash still counts.

use std::time::Instant;
use tracing::{Instrument, info, warn};

use pageclone_phase_api::{PhaseKind, PhaseResult, VerificationReport, VerifyInput};
use pageclone_recovery::classify_error;
use pageclone_utils::error::{CloneError, PhaseError};
use pageclone_utils::logging::phase_span;
use pageclone_utils::types::{OverallStatus, PhaseStatus};

use super::{CloneOrchestrator, phase_payload};
use crate::request::VerifyCapture;

/// First entry of the error list once the verification ceiling is reached.
pub const MAX_ATTEMPTS_REACHED: &str = "max attempts reached";

pub(super) fn exhausted_marker(attempt: u32, ceiling: u32) -> String {
    format!("{MAX_ATTEMPTS_REACHED} ({attempt}/{ceiling})")
}

impl CloneOrchestrator {
    /// Run one verification attempt.
    ///
    /// - pass: `Verify` is `Completed`
    /// - fail with attempts remaining: `NeedsRetry` carrying the fix suggestions
    /// - fail at the ceiling: `Failed`, overall `AwaitingUserInput`, errors
    ///   led by [`MAX_ATTEMPTS_REACHED`]
    ///
    /// The ceiling is the configured maximum, raised by one for every
    /// operator acknowledgement once verification has started. A call with
    /// no attempt left is refused with `AwaitingUserInput`.
    pub async fn execute_verify_phase(
        &mut self,
        capture: &VerifyCapture,
    ) -> Result<PhaseResult, CloneError> {
        let phase = PhaseKind::Verify;
        let span = phase_span(self.slug(), phase);
        async {
            let started = Instant::now();
            let ceiling = self.check_verification_ceiling().await?;
            self.begin_phase(phase).await?;

            let attempt = self
                .store
                .increment_verification_attempts(self.slug())
                .await?;
            info!(attempt, max_attempts = ceiling, "Verification attempt");

            let input = VerifyInput {
                source_snapshot: capture.source_snapshot.clone(),
                clone_snapshot: capture.clone_snapshot.clone(),
                attempt,
                extras: capture.extras.clone(),
            };
            let ctx = self.error_context(phase).with_fix_attempts(attempt);
            let verifier = self.collaborators.verifier.clone();

            match self
                .call_collaborator(phase, verifier.verify(&input))
                .await?
            {
                Ok(report) if report.passed => {
                    let payload = phase_payload(phase, &report);
                    self.succeed_phase(phase, payload, started).await
                }
                Ok(report) => self.verification_rejected(report, attempt, ceiling).await,
                Err(err) => {
                    let classified = classify_error(&err, &ctx);
                    let exhausted = (attempt >= ceiling).then_some((attempt, ceiling));
                    self.fail_phase(phase, classified, exhausted).await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Effective ceiling for the next attempt.
    ///
    /// A runnable clone whose counter already sits at the ceiling (an attempt
    /// interrupted at the limit, say) is handed to the operator without
    /// calling the verifier. Paused or intervention states are left for
    /// `begin_phase` to reject.
    async fn check_verification_ceiling(&self) -> Result<u32, CloneError> {
        let record = self.record().await?;
        let ceiling = record.verification_ceiling(self.max_verification_attempts);
        let runnable =
            !record.status.needs_intervention() && record.status != OverallStatus::Paused;
        if !runnable || record.verification_attempts < ceiling {
            return Ok(ceiling);
        }

        let slug = self.slug();
        let marker = exhausted_marker(record.verification_attempts, ceiling);
        warn!(
            attempts = record.verification_attempts,
            max_attempts = ceiling,
            "Verification ceiling reached before attempt, awaiting user input"
        );
        self.store
            .log_error(
                slug,
                PhaseKind::Verify,
                &marker,
                Some("operator review required".to_string()),
            )
            .await?;
        self.store
            .set_overall_status(slug, OverallStatus::AwaitingUserInput)
            .await?;
        Err(PhaseError::AwaitingUserInput {
            slug: slug.to_string(),
            status: OverallStatus::AwaitingUserInput,
        }
        .into())
    }

    async fn verification_rejected(
        &mut self,
        report: VerificationReport,
        attempt: u32,
        ceiling: u32,
    ) -> Result<PhaseResult, CloneError> {
        let phase = PhaseKind::Verify;
        let slug = self.request.page_slug.clone();
        let summary = if report.fix_suggestions.is_empty() {
            format!("verification attempt {attempt}/{ceiling} failed")
        } else {
            format!(
                "verification attempt {attempt}/{ceiling} failed: {}",
                report.fix_suggestions.join("; ")
            )
        };
        let payload = phase_payload(phase, &report);

        if report.can_retry && attempt < ceiling {
            self.store
                .log_error(
                    &slug,
                    phase,
                    &summary,
                    Some("apply the fix suggestions and verify again".to_string()),
                )
                .await?;
            self.store
                .update_phase(&slug, phase, PhaseStatus::Failed, Some(summary))
                .await?;
            info!(
                attempt,
                remaining = ceiling - attempt,
                suggestions = report.fix_suggestions.len(),
                "Verification failed, retry available"
            );
            let mut result = PhaseResult::needs_retry(phase, report.fix_suggestions);
            result.payload = payload;
            self.history.push(result.clone());
            return Ok(result);
        }

        let marker = if attempt >= ceiling {
            exhausted_marker(attempt, ceiling)
        } else {
            format!("verifier reported the clone cannot be retried ({attempt}/{ceiling})")
        };
        self.store
            .log_error(
                &slug,
                phase,
                &summary,
                Some("operator review required".to_string()),
            )
            .await?;
        self.store
            .update_phase(&slug, phase, PhaseStatus::Failed, Some(summary))
            .await?;
        self.store
            .set_overall_status(&slug, OverallStatus::AwaitingUserInput)
            .await?;
        warn!(attempt, max_attempts = ceiling, "Verification stopped, awaiting user input");

        let mut errors = Vec::with_capacity(report.fix_suggestions.len() + 1);
        errors.push(marker);
        errors.extend(report.fix_suggestions);
        let mut result = PhaseResult::failed(phase, errors);
        result.payload = payload;
        self.history.push(result.clone());
        Ok(result)
    }
}
