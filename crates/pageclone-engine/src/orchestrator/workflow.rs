//! Whole-pipeline driver.

use tracing::info;

use pageclone_phase_api::{PhaseKind, PhaseResult};
use pageclone_utils::error::CloneError;
use pageclone_utils::types::OverallStatus;

use super::{CloneOrchestrator, CompletionReport};
use crate::request::PhaseInputs;

/// How a [`CloneOrchestrator::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every phase completed and the record was archived.
    Completed(CompletionReport),
    /// A phase did not succeed; the record stays active with `status`.
    Stopped {
        result: PhaseResult,
        status: OverallStatus,
    },
}

impl RunOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl CloneOrchestrator {
    /// Initialize, then execute phases in order starting at the first one
    /// the record does not show as `Completed`.
    ///
    /// Stops at the first result that is not `Success`. When Verify
    /// succeeds, [`complete`](Self::complete) is called.
    pub async fn run(&mut self, inputs: &PhaseInputs) -> Result<RunOutcome, CloneError> {
        let record = self.initialize().await?;
        let Some(start) = record.first_incomplete_phase() else {
            return Ok(RunOutcome::Completed(self.complete().await?));
        };
        info!(slug = %record.page_slug, start = %start, "Running clone pipeline");

        for phase in &PhaseKind::ALL[start.index()..] {
            let result = match phase {
                PhaseKind::Analyze => self.execute_analyze_phase(&inputs.analyze).await?,
                PhaseKind::Extract => self.execute_extract_phase(&inputs.markup).await?,
                PhaseKind::Plan => self.execute_plan_phase().await?,
                PhaseKind::Implement => self.execute_implement_phase().await?,
                PhaseKind::Verify => self.execute_verify_phase(&inputs.verify).await?,
            };
            if !result.is_success() {
                let status = self.record().await?.status;
                return Ok(RunOutcome::Stopped { result, status });
            }
        }

        Ok(RunOutcome::Completed(self.complete().await?))
    }
}
