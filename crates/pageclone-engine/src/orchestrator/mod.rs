//! Clone orchestrator
//!
//! [`CloneOrchestrator`] drives one page slug through the five phases. The
//! progress record is the single source of truth: every decision is made
//! from a fresh read of the store, never from cached fields, so an
//! orchestrator built over an existing record behaves the same as the one
//! that wrote it.
//!
//! Every `execute_*_phase` method follows the same template:
//!
//! 1. mark the phase `InProgress` (phase order is enforced here)
//! 2. check the phase's inputs are available
//! 3. wait on the rate limiter if the phase fetches from the source site
//! 4. await the collaborator
//! 5. persist the payload and mark the phase `Completed`, or classify the
//!    failure, resolve a recovery strategy and record it
//!
//! Collaborator failures never escape as errors; they come back as a
//! [`PhaseResult`] with outcome `Failed` or `NeedsRetry`. `Err` is reserved
//! for store failures, ordering violations, missing inputs and cancellation.

mod completion;
mod phase_exec;
mod verify;
mod workflow;

pub use completion::{CompletionReport, SUMMARY_FILE_LIMIT};
pub use verify::MAX_ATTEMPTS_REACHED;
pub use workflow::RunOutcome;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pageclone_config::{Config, DEFAULT_MAX_VERIFICATION_ATTEMPTS};
use pageclone_phase_api::{PhaseKind, PhaseOutcome, PhaseResult};
use pageclone_progress::{ProgressRecord, ProgressStore};
use pageclone_ratelimit::{BlockingSignal, RateLimiter, RateLimiterRegistry};
use pageclone_recovery::{
    AcquisitionCode, ClassifiedError, ErrorContext, RecoveryAction, RecoveryStrategy, resolve,
};
use pageclone_utils::error::{CloneError, PhaseError, ProgressError};
use pageclone_utils::logging::{log_phase_complete, log_phase_error, log_phase_start};
use pageclone_utils::types::{OverallStatus, PhaseStatus};

use crate::request::{CloneRequest, Collaborators};

/// Drives a single clone through Analyze → Extract → Plan → Implement → Verify.
///
/// One orchestrator owns one page slug. The rate limiter is shared with
/// every other orchestrator targeting the same host.
pub struct CloneOrchestrator {
    request: CloneRequest,
    collaborators: Collaborators,
    store: ProgressStore,
    limiter: Arc<RateLimiter>,
    max_verification_attempts: u32,
    history: Vec<PhaseResult>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for CloneOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloneOrchestrator")
            .field("request", &self.request)
            .field("max_verification_attempts", &self.max_verification_attempts)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl CloneOrchestrator {
    #[must_use]
    pub fn new(
        request: CloneRequest,
        collaborators: Collaborators,
        store: ProgressStore,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            request,
            collaborators,
            store,
            limiter,
            max_verification_attempts: DEFAULT_MAX_VERIFICATION_ATTEMPTS,
            history: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Orchestrator over the file store in `config.state_dir()`, using the
    /// registry's limiter for the request's host.
    #[must_use]
    pub fn from_config(
        request: CloneRequest,
        collaborators: Collaborators,
        config: &Config,
        limiters: &RateLimiterRegistry,
    ) -> Self {
        let store = ProgressStore::filesystem(&config.state_dir());
        let limiter = limiters.for_url(&request.source_url);
        Self::new(request, collaborators, store, limiter)
            .with_max_verification_attempts(config.verification.max_attempts)
    }

    /// Ceiling on verification attempts for this clone (at least 1).
    #[must_use]
    pub fn with_max_verification_attempts(mut self, max_attempts: u32) -> Self {
        self.max_verification_attempts = max_attempts.max(1);
        self
    }

    /// Abort in-flight phases when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn request(&self) -> &CloneRequest {
        &self.request
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    #[must_use]
    pub fn max_verification_attempts(&self) -> u32 {
        self.max_verification_attempts
    }

    /// Results of every phase execution in this run, oldest first.
    #[must_use]
    pub fn history(&self) -> &[PhaseResult] {
        &self.history
    }

    /// Fresh copy of the progress record.
    pub async fn record(&self) -> Result<ProgressRecord, CloneError> {
        self.store.read(self.slug()).await?.ok_or_else(|| {
            ProgressError::NotFound {
                slug: self.slug().to_string(),
            }
            .into()
        })
    }

    /// Load or create the progress record and mark the clone `Running`.
    ///
    /// With `resume` set, an existing `Idle`, `Paused` or `Running` record is
    /// picked up where it stopped. Records that need an operator (`Failed`,
    /// `AwaitingUserInput`) are refused. When resume was requested but no
    /// record exists, a fresh clone is started.
    pub async fn initialize(&mut self) -> Result<ProgressRecord, CloneError> {
        let slug = self.request.page_slug.clone();

        if self.request.resume {
            match self.store.read(&slug).await? {
                Some(record) if record.status.needs_intervention() => {
                    return Err(PhaseError::AwaitingUserInput {
                        slug,
                        status: record.status,
                    }
                    .into());
                }
                Some(record) if record.status == OverallStatus::Completed => {
                    info!(slug = %slug, "Clone already completed");
                    return Ok(record);
                }
                Some(record) => {
                    let next = record.first_incomplete_phase();
                    let record = self
                        .store
                        .set_overall_status(&slug, OverallStatus::Running)
                        .await?;
                    info!(
                        slug = %slug,
                        next_phase = ?next,
                        verification_attempts = record.verification_attempts,
                        "Resuming clone"
                    );
                    return Ok(record);
                }
                None => {
                    warn!(
                        slug = %slug,
                        "Resume requested but no progress record exists, starting fresh"
                    );
                }
            }
        }

        self.store
            .create(&self.request.source_url, &slug, false)
            .await?;
        let record = self
            .store
            .set_overall_status(&slug, OverallStatus::Running)
            .await?;
        info!(slug = %slug, source_url = %self.request.source_url, "Started clone");
        Ok(record)
    }

    /// Move a running clone to `Paused`. See [`crate::pause_clone`].
    pub async fn pause(&self) -> Result<ProgressRecord, CloneError> {
        crate::control::pause_clone(&self.store, self.slug()).await
    }

    /// Operator hand-back after `AwaitingUserInput` or `Failed`.
    /// See [`crate::acknowledge_intervention`].
    pub async fn acknowledge_intervention(
        &self,
        resolution: &str,
    ) -> Result<ProgressRecord, CloneError> {
        crate::control::acknowledge_intervention(&self.store, self.slug(), resolution).await
    }

    // ------------------------------------------------------------------
    // Shared phase steps
    // ------------------------------------------------------------------

    fn slug(&self) -> &str {
        &self.request.page_slug
    }

    fn error_context(&self, phase: PhaseKind) -> ErrorContext {
        ErrorContext::for_phase(phase).with_source_url(self.request.source_url.clone())
    }

    /// Step 1: mark `phase` in progress and return its attempt number.
    async fn begin_phase(&self, phase: PhaseKind) -> Result<u32, CloneError> {
        let slug = self.slug();
        let record = self.record().await?;
        if record.status.needs_intervention() {
            return Err(PhaseError::AwaitingUserInput {
                slug: slug.to_string(),
                status: record.status,
            }
            .into());
        }
        if record.status == OverallStatus::Paused {
            return Err(PhaseError::Paused {
                slug: slug.to_string(),
            }
            .into());
        }
        if record.status != OverallStatus::Running {
            self.store
                .set_overall_status(slug, OverallStatus::Running)
                .await?;
        }
        let record = self
            .store
            .update_phase(slug, phase, PhaseStatus::InProgress, None)
            .await?;
        let attempt = record.phase(phase).attempts;
        log_phase_start(slug, phase, attempt);
        Ok(attempt)
    }

    /// Record a missing input as a failed phase and return the error.
    async fn precondition_failed(&self, phase: PhaseKind, reason: String) -> CloneError {
        let slug = self.slug();
        warn!(slug, phase = %phase, reason = %reason, "Phase precondition failed");
        if let Err(err) = self.store.log_error(slug, phase, &reason, None).await {
            return err;
        }
        if let Err(err) = self
            .store
            .update_phase(slug, phase, PhaseStatus::Failed, Some(reason.clone()))
            .await
        {
            return err;
        }
        PhaseError::PreconditionFailed { phase, reason }.into()
    }

    /// Steps 3 and 4: pace, then await the collaborator, both abortable.
    async fn call_collaborator<T, F>(
        &self,
        phase: PhaseKind,
        call: F,
    ) -> Result<anyhow::Result<T>, CloneError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        if phase.fetches_source() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(self.abandon_cancelled(phase).await),
                _ = self.limiter.wait_before_request() => {}
            }
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(self.abandon_cancelled(phase).await),
            result = call => Ok(result),
        }
    }

    /// A cancelled phase goes back to `Pending` and the clone to `Paused`.
    /// The attempt it consumed stays counted.
    async fn abandon_cancelled(&self, phase: PhaseKind) -> CloneError {
        let slug = self.slug();
        if let Err(err) = self
            .store
            .update_phase(slug, phase, PhaseStatus::Pending, None)
            .await
        {
            warn!(slug, phase = %phase, error = %err, "Could not reset cancelled phase");
        }
        if let Err(err) = self
            .store
            .set_overall_status(slug, OverallStatus::Paused)
            .await
        {
            warn!(slug, error = %err, "Could not mark cancelled clone as paused");
        }
        info!(slug, phase = %phase, "Phase cancelled, clone paused");
        CloneError::Cancelled {
            slug: slug.to_string(),
            phase: Some(phase),
        }
    }

    /// Step 5, success: mark `Completed` and append to history.
    async fn succeed_phase(
        &mut self,
        phase: PhaseKind,
        payload: serde_json::Value,
        started: Instant,
    ) -> Result<PhaseResult, CloneError> {
        self.store
            .update_phase(self.slug(), phase, PhaseStatus::Completed, None)
            .await?;
        log_phase_complete(self.slug(), phase, started.elapsed());
        let result = PhaseResult::success(phase, payload);
        self.history.push(result.clone());
        Ok(result)
    }

    /// Step 5, failure: resolve a strategy for `error`, log it, mark the
    /// phase `Failed` and set the overall status the strategy calls for.
    ///
    /// `verification_exhausted` carries `(attempt, ceiling)` when the
    /// verification ceiling has been reached, which turns any retry into a
    /// hand-off to the operator.
    async fn fail_phase(
        &mut self,
        phase: PhaseKind,
        error: ClassifiedError,
        verification_exhausted: Option<(u32, u32)>,
    ) -> Result<PhaseResult, CloneError> {
        let slug = self.request.page_slug.clone();
        let strategy = resolve(&error);
        let detail = error.to_string();
        log_phase_error(&slug, phase, strategy.action.as_str(), &detail);
        self.note_blocking_signal(&error).await;

        self.store
            .log_error(&slug, phase, &detail, Some(strategy.user_message.clone()))
            .await?;
        let record = self
            .store
            .update_phase(&slug, phase, PhaseStatus::Failed, Some(detail.clone()))
            .await?;

        let (mut outcome, mut status) = disposition(&strategy, record.phase(phase).attempts);
        let mut errors = vec![strategy.user_message.clone(), detail];
        if let Some((attempt, ceiling)) = verification_exhausted
            && outcome == PhaseOutcome::NeedsRetry
        {
            outcome = PhaseOutcome::Failed;
            status = OverallStatus::AwaitingUserInput;
            errors.insert(0, verify::exhausted_marker(attempt, ceiling));
        }

        if status != record.status {
            self.store.set_overall_status(&slug, status).await?;
        }

        let mut result = match outcome {
            PhaseOutcome::NeedsRetry => PhaseResult::needs_retry(phase, errors),
            _ => PhaseResult::failed(phase, errors),
        };
        result.payload = json!({ "error": error, "recovery": strategy });
        info!(
            slug = %slug,
            phase = %phase,
            action = %strategy.action,
            delay_ms = strategy.delay_ms,
            outcome = %outcome,
            status = %status,
            "Recovery decided"
        );
        self.history.push(result.clone());
        Ok(result)
    }

    /// Feed throttling and blocking classifications back to the limiter.
    async fn note_blocking_signal(&self, error: &ClassifiedError) {
        let signal = match error.blocking_signal() {
            Some(AcquisitionCode::RateLimited) => BlockingSignal::RateLimited,
            Some(AcquisitionCode::Captcha) => BlockingSignal::Captcha,
            Some(_) => BlockingSignal::Blocked,
            None => return,
        };
        self.limiter.record_blocking_signal(signal).await;
    }
}

/// JSON payload for a phase result. A value that cannot be serialized is
/// logged and recorded as `null`; the phase outcome stands either way.
pub(super) fn phase_payload<T: Serialize>(phase: PhaseKind, value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        warn!(phase = %phase, error = %err, "Phase payload could not be serialized");
        serde_json::Value::Null
    })
}

/// Outcome and overall status for a resolved strategy, given how many times
/// the phase has been entered.
pub(crate) fn disposition(
    strategy: &RecoveryStrategy,
    phase_attempts: u32,
) -> (PhaseOutcome, OverallStatus) {
    match strategy.action {
        RecoveryAction::Retry | RecoveryAction::Fix => match strategy.max_attempts {
            Some(max) if phase_attempts >= max => (PhaseOutcome::Failed, OverallStatus::Failed),
            _ => (PhaseOutcome::NeedsRetry, OverallStatus::Running),
        },
        RecoveryAction::Pause => (PhaseOutcome::Failed, OverallStatus::AwaitingUserInput),
        RecoveryAction::Skip | RecoveryAction::Abort => {
            (PhaseOutcome::Failed, OverallStatus::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageclone_recovery::{GenerationCode, VerificationCode};

    fn strategy_for(error: ClassifiedError) -> RecoveryStrategy {
        resolve(&error)
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not representable"))
        }
    }

    #[test]
    fn test_phase_payload_falls_back_to_null() {
        assert_eq!(
            phase_payload(PhaseKind::Plan, &Unserializable),
            serde_json::Value::Null
        );
        assert_eq!(
            phase_payload(PhaseKind::Plan, &vec!["a"]),
            serde_json::json!(["a"])
        );
    }

    #[test]
    fn test_disposition_table() {
        let timeout = strategy_for(ClassifiedError::acquisition(
            AcquisitionCode::Timeout,
            None,
            "x",
        ));
        assert_eq!(
            disposition(&timeout, 1),
            (PhaseOutcome::NeedsRetry, OverallStatus::Running)
        );
        assert_eq!(
            disposition(&timeout, 3),
            (PhaseOutcome::Failed, OverallStatus::Failed)
        );

        let captcha = strategy_for(ClassifiedError::acquisition(
            AcquisitionCode::Captcha,
            None,
            "x",
        ));
        assert_eq!(
            disposition(&captcha, 1),
            (PhaseOutcome::Failed, OverallStatus::AwaitingUserInput)
        );

        let not_found = strategy_for(ClassifiedError::acquisition(
            AcquisitionCode::NotFound,
            None,
            "x",
        ));
        assert_eq!(
            disposition(&not_found, 1),
            (PhaseOutcome::Failed, OverallStatus::Failed)
        );

        let build = strategy_for(ClassifiedError::generation(
            GenerationCode::BuildError,
            None,
            "x",
        ));
        assert_eq!(
            disposition(&build, 1),
            (PhaseOutcome::Failed, OverallStatus::Failed)
        );

        let mismatch = strategy_for(ClassifiedError::verification(
            VerificationCode::VisualMismatch,
            vec![],
            1,
        ));
        assert_eq!(
            disposition(&mismatch, 9),
            (PhaseOutcome::NeedsRetry, OverallStatus::Running)
        );
    }
}
