use serde::Serialize;
use std::fmt::Write as _;
use tracing::info;

use pageclone_phase_api::{PhaseKind, PhaseOutcome};
use pageclone_progress::ProgressRecord;
use pageclone_utils::error::CloneError;
use pageclone_utils::types::{OverallStatus, PhaseStatus};

use super::CloneOrchestrator;

/// File paths listed per category in a completion summary.
pub const SUMMARY_FILE_LIMIT: usize = 10;

/// Final report of a clone run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub source_url: String,
    pub page_slug: String,
    pub success: bool,
    pub status: OverallStatus,
    /// Final state of every phase, in execution order.
    pub phases: Vec<(PhaseKind, PhaseStatus)>,
    /// Outcomes recorded during this run, oldest first.
    pub history: Vec<(PhaseKind, PhaseOutcome)>,
    pub files_created: Vec<String>,
    pub files_modified: Vec<String>,
    pub verification_attempts: u32,
    pub archived: bool,
}

impl CompletionReport {
    fn from_record(record: &ProgressRecord, history: Vec<(PhaseKind, PhaseOutcome)>) -> Self {
        let success = record.all_phases_completed()
            && history
                .iter()
                .all(|(_, outcome)| *outcome == PhaseOutcome::Success);
        Self {
            source_url: record.source_url.clone(),
            page_slug: record.page_slug.clone(),
            success,
            status: if success {
                OverallStatus::Completed
            } else {
                OverallStatus::Failed
            },
            phases: PhaseKind::ALL
                .iter()
                .map(|p| (*p, record.phase_status(*p)))
                .collect(),
            history,
            files_created: record.files_created.clone(),
            files_modified: record.files_modified.clone(),
            verification_attempts: record.verification_attempts,
            archived: false,
        }
    }

    /// Human-readable summary: phase outcomes, file counts and the first
    /// [`SUMMARY_FILE_LIMIT`] paths of each list.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let verdict = if self.success { "completed" } else { "failed" };
        let _ = writeln!(
            out,
            "Clone of {} ({}) {verdict}",
            self.source_url, self.page_slug
        );

        let _ = writeln!(out, "Phases:");
        for (index, (phase, status)) in self.phases.iter().enumerate() {
            let _ = writeln!(out, "  {}. {phase}: {status}", index + 1);
        }

        if !self.history.is_empty() {
            let outcomes: Vec<String> = self
                .history
                .iter()
                .map(|(phase, outcome)| format!("{phase}={outcome}"))
                .collect();
            let _ = writeln!(out, "History: {}", outcomes.join(", "));
        }

        let _ = writeln!(
            out,
            "Verification attempts: {}",
            self.verification_attempts
        );
        write_file_list(&mut out, "Files created", &self.files_created);
        write_file_list(&mut out, "Files modified", &self.files_modified);
        if self.archived {
            let _ = writeln!(out, "Progress record archived.");
        }
        out
    }
}

fn write_file_list(out: &mut String, label: &str, files: &[String]) {
    let _ = writeln!(out, "{label}: {}", files.len());
    for path in files.iter().take(SUMMARY_FILE_LIMIT) {
        let _ = writeln!(out, "  - {path}");
    }
    if files.len() > SUMMARY_FILE_LIMIT {
        let _ = writeln!(out, "  ... and {} more", files.len() - SUMMARY_FILE_LIMIT);
    }
}

impl std::fmt::Display for CompletionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

impl CloneOrchestrator {
    /// Close out the clone.
    ///
    /// Success means every result recorded by this orchestrator is a
    /// `Success` and every phase in the record is `Completed`. On success
    /// the overall status becomes `Completed` and the record is archived;
    /// otherwise it becomes `Failed` and stays in the active set. Phase
    /// states are never changed here.
    pub async fn complete(&mut self) -> Result<CompletionReport, CloneError> {
        let record = self.record().await?;
        let history = self.history.iter().map(|r| (r.phase, r.outcome)).collect();
        let mut report = CompletionReport::from_record(&record, history);

        self.store
            .set_overall_status(self.slug(), report.status)
            .await?;
        if report.success {
            self.store.archive(self.slug()).await?;
            report.archived = true;
        }

        info!(
            slug = %report.page_slug,
            success = report.success,
            files_created = report.files_created.len(),
            files_modified = report.files_modified.len(),
            "Clone completed"
        );
        Ok(report)
    }
}
