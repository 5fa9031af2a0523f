use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pageclone_phase_api::{ExtractedData, ImplementationPlan, PageAnalysis};
use pageclone_utils::error::PhaseError;
use pageclone_utils::types::{OverallStatus, PhaseKind, PhaseStatus};

/// Current on-disk record format.
pub const SCHEMA_VERSION: &str = "1";

/// Lifecycle of one phase inside a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    pub status: PhaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Times this phase has been entered.
    #[serde(default)]
    pub attempts: u32,
}

/// One entry of the append-only error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub phase: PhaseKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Durable, resumable state of one clone operation.
///
/// Mutation methods here are pure; [`ProgressStore`](crate::ProgressStore)
/// loads a record, applies one of them and persists the result atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub schema_version: String,
    pub source_url: String,
    pub page_slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: OverallStatus,
    pub phases: BTreeMap<PhaseKind, PhaseState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<PageAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_plan: Option<ImplementationPlan>,
    #[serde(default)]
    pub files_created: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub errors: Vec<ErrorLogEntry>,
    #[serde(default)]
    pub verification_attempts: u32,
    /// Highest verification attempt an operator has allowed beyond the
    /// configured ceiling. Zero until the first acknowledgement.
    #[serde(default)]
    pub verification_grant: u32,
}

impl ProgressRecord {
    /// Fresh record: every phase `Pending`, status `Idle`.
    #[must_use]
    pub fn new(source_url: impl Into<String>, page_slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            source_url: source_url.into(),
            page_slug: page_slug.into(),
            created_at: now,
            updated_at: now,
            status: OverallStatus::Idle,
            phases: PhaseKind::ALL
                .iter()
                .map(|p| (*p, PhaseState::default()))
                .collect(),
            analysis: None,
            extracted: None,
            implementation_plan: None,
            files_created: Vec::new(),
            files_modified: Vec::new(),
            errors: Vec::new(),
            verification_attempts: 0,
            verification_grant: 0,
        }
    }

    /// Attempts verification may reach before an operator must step in.
    #[must_use]
    pub fn verification_ceiling(&self, configured: u32) -> u32 {
        configured.max(self.verification_grant)
    }

    /// State of `phase`; phases missing from an older record read as `Pending`.
    #[must_use]
    pub fn phase(&self, phase: PhaseKind) -> PhaseState {
        self.phases.get(&phase).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn phase_status(&self, phase: PhaseKind) -> PhaseStatus {
        self.phases
            .get(&phase)
            .map(|s| s.status)
            .unwrap_or_default()
    }

    /// First phase in execution order that is not `Completed`.
    #[must_use]
    pub fn first_incomplete_phase(&self) -> Option<PhaseKind> {
        PhaseKind::ALL
            .into_iter()
            .find(|p| self.phase_status(*p) != PhaseStatus::Completed)
    }

    #[must_use]
    pub fn all_phases_completed(&self) -> bool {
        self.first_incomplete_phase().is_none()
    }

    /// Check that `phase` may move to `InProgress`.
    ///
    /// Every earlier phase must be `Completed`, and a `Completed` phase is
    /// never re-entered. `Failed`, `InProgress` (interrupted) and `Pending`
    /// phases may start.
    pub fn check_can_start(&self, phase: PhaseKind) -> Result<(), PhaseError> {
        if let Some(dependency) = phase
            .predecessors()
            .iter()
            .copied()
            .find(|p| self.phase_status(*p) != PhaseStatus::Completed)
        {
            return Err(PhaseError::DependencyNotSatisfied { phase, dependency });
        }
        let from = self.phase_status(phase);
        if from == PhaseStatus::Completed {
            return Err(PhaseError::InvalidTransition { phase, from });
        }
        Ok(())
    }

    /// Apply a phase status change with its timestamp bookkeeping.
    ///
    /// Moving to `InProgress` validates ordering and counts an attempt.
    pub fn set_phase_status(
        &mut self,
        phase: PhaseKind,
        status: PhaseStatus,
        error: Option<String>,
    ) -> Result<(), PhaseError> {
        if status == PhaseStatus::InProgress {
            self.check_can_start(phase)?;
        }
        let now = Utc::now();
        let state = self.phases.entry(phase).or_default();
        match status {
            PhaseStatus::Pending => {
                state.started_at = None;
                state.completed_at = None;
            }
            PhaseStatus::InProgress => {
                state.started_at = Some(now);
                state.completed_at = None;
                state.attempts = state.attempts.saturating_add(1);
            }
            PhaseStatus::Completed | PhaseStatus::Failed => {
                state.completed_at = Some(now);
            }
        }
        state.status = status;
        state.error = error;
        Ok(())
    }

    /// Append `path` unless already present. Returns whether it was added.
    pub fn add_created_file(&mut self, path: &str) -> bool {
        push_unique(&mut self.files_created, path)
    }

    /// Append `path` unless already present. Returns whether it was added.
    pub fn add_modified_file(&mut self, path: &str) -> bool {
        push_unique(&mut self.files_modified, path)
    }

    pub fn push_error(&mut self, phase: PhaseKind, message: String, resolution: Option<String>) {
        self.errors.push(ErrorLogEntry {
            phase,
            message,
            timestamp: Utc::now(),
            resolution,
        });
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn push_unique(list: &mut Vec<String>, path: &str) -> bool {
    if list.iter().any(|p| p == path) {
        return false;
    }
    list.push(path.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_shape() {
        let record = ProgressRecord::new("https://example.com/pricing", "pricing");
        assert_eq!(record.schema_version, SCHEMA_VERSION);
        assert_eq!(record.status, OverallStatus::Idle);
        assert_eq!(record.phases.len(), 5);
        assert_eq!(record.first_incomplete_phase(), Some(PhaseKind::Analyze));
    }

    #[test]
    fn test_ordering_enforced_on_start() {
        let mut record = ProgressRecord::new("u", "s");
        let err = record
            .set_phase_status(PhaseKind::Plan, PhaseStatus::InProgress, None)
            .unwrap_err();
        assert!(matches!(
            err,
            PhaseError::DependencyNotSatisfied {
                phase: PhaseKind::Plan,
                dependency: PhaseKind::Analyze
            }
        ));

        record
            .set_phase_status(PhaseKind::Analyze, PhaseStatus::InProgress, None)
            .unwrap();
        record
            .set_phase_status(PhaseKind::Analyze, PhaseStatus::Completed, None)
            .unwrap();
        assert!(matches!(
            record.check_can_start(PhaseKind::Analyze),
            Err(PhaseError::InvalidTransition { .. })
        ));
        assert!(record.check_can_start(PhaseKind::Extract).is_ok());
    }

    #[test]
    fn test_failed_phase_can_be_reentered_and_counts_attempts() {
        let mut record = ProgressRecord::new("u", "s");
        for _ in 0..2 {
            record
                .set_phase_status(PhaseKind::Analyze, PhaseStatus::InProgress, None)
                .unwrap();
            record
                .set_phase_status(PhaseKind::Analyze, PhaseStatus::Failed, Some("x".into()))
                .unwrap();
        }
        let state = record.phase(PhaseKind::Analyze);
        assert_eq!(state.attempts, 2);
        assert_eq!(state.error.as_deref(), Some("x"));
        assert!(state.completed_at.is_some());
    }

    #[test]
    fn test_file_lists_are_sets() {
        let mut record = ProgressRecord::new("u", "s");
        assert!(record.add_created_file("a.tsx"));
        assert!(!record.add_created_file("a.tsx"));
        assert!(record.add_modified_file("a.tsx"));
        assert_eq!(record.files_created, vec!["a.tsx"]);
        assert_eq!(record.files_modified, vec!["a.tsx"]);
    }

    #[test]
    fn test_phase_keys_serialize_lowercase() {
        let record = ProgressRecord::new("u", "s");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["phases"]["analyze"]["status"], "pending");
        assert_eq!(json["status"], "idle");
        assert!(json.get("analysis").is_none());
    }
}
