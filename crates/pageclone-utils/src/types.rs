use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};

/// Phase identifiers for the page clone workflow.
///
/// `PhaseKind` represents the five fixed stages of a clone operation.
/// Ordering is fixed and total; the only loop in the workflow is the
/// bounded re-entry of `Verify`.
///
/// # Phase Order
///
/// ```text
/// Analyze → Extract → Plan → Implement → Verify
/// ```
///
/// # Example
///
/// ```rust
/// use pageclone_utils::types::PhaseKind;
///
/// assert_eq!(PhaseKind::Analyze.as_str(), "analyze");
/// assert_eq!(PhaseKind::Plan.predecessors(), &[PhaseKind::Analyze, PhaseKind::Extract]);
/// assert_eq!(PhaseKind::Verify.next(), None);
/// ```
///
/// # Serialization
///
/// `PhaseKind` serializes to its lowercase name (e.g. `"analyze"`), which is
/// also how it appears as a key in persisted progress records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Structural analysis of the captured source page.
    Analyze,
    /// Content extraction into text, image and link records.
    Extract,
    /// Implementation planning from analysis and extracted content.
    Plan,
    /// Materialization of components, data files and service stubs.
    Implement,
    /// Comparison of the clone against the source page.
    Verify,
}

impl PhaseKind {
    /// All phases in execution order.
    pub const ALL: [PhaseKind; 5] = [
        PhaseKind::Analyze,
        PhaseKind::Extract,
        PhaseKind::Plan,
        PhaseKind::Implement,
        PhaseKind::Verify,
    ];

    /// Returns the canonical lowercase name used in records, logs and the CLI.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Extract => "extract",
            Self::Plan => "plan",
            Self::Implement => "implement",
            Self::Verify => "verify",
        }
    }

    /// Zero-based position in the execution order.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Analyze => 0,
            Self::Extract => 1,
            Self::Plan => 2,
            Self::Implement => 3,
            Self::Verify => 4,
        }
    }

    /// Every phase that must be `Completed` before this one may start.
    #[must_use]
    pub fn predecessors(&self) -> &'static [PhaseKind] {
        &Self::ALL[..self.index()]
    }

    /// The phase that follows this one, if any.
    #[must_use]
    pub fn next(&self) -> Option<PhaseKind> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Whether this phase talks to the source site and must be paced
    /// by the rate limiter.
    #[must_use]
    pub const fn fetches_source(&self) -> bool {
        matches!(self, Self::Analyze | Self::Extract | Self::Verify)
    }

    /// Parse a phase from its canonical name (case-insensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::iter().find(|p| p.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a single phase within a progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl PhaseStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall status of one clone operation.
///
/// `AwaitingUserInput` is terminal from the orchestrator's point of view:
/// only an operator acknowledgement moves the record back to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
    AwaitingUserInput,
}

impl OverallStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::AwaitingUserInput => "awaiting_user_input",
        }
    }

    /// Statuses from which the orchestrator will not continue on its own.
    #[must_use]
    pub const fn needs_intervention(&self) -> bool {
        matches!(self, Self::Failed | Self::AwaitingUserInput)
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one phase execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOutcome {
    Success,
    Failed,
    NeedsRetry,
}

impl PhaseOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::NeedsRetry => "needs_retry",
        }
    }
}

impl fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an effective configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Cli,
    Config,
    Programmatic,
    Default,
}

impl ConfigSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        }
    }
}
