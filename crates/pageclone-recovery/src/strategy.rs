use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use pageclone_utils::error::UserFriendlyError;

use crate::taxonomy::{AcquisitionCode, ClassifiedError, GenerationCode, VerificationCode};

/// What the orchestrator should do about a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Try the same phase again after an optional delay.
    Retry,
    /// Abandon the clone without running further phases.
    Skip,
    /// Stop and wait for an operator.
    Pause,
    /// Apply a correction and re-run.
    Fix,
    /// Stop the clone as failed.
    Abort,
}

impl RecoveryAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::Skip => "skip",
            Self::Pause => "pause",
            Self::Fix => "fix",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived recovery decision for one classified error. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStrategy {
    pub action: RecoveryAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    pub user_message: String,
}

impl RecoveryStrategy {
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }
}

struct Rule {
    action: RecoveryAction,
    delay_ms: Option<u64>,
    max_attempts: Option<u32>,
    hint: &'static str,
}

const fn retry(delay_ms: u64, max_attempts: u32, hint: &'static str) -> Rule {
    Rule {
        action: RecoveryAction::Retry,
        delay_ms: Some(delay_ms),
        max_attempts: Some(max_attempts),
        hint,
    }
}

const fn act(action: RecoveryAction, hint: &'static str) -> Rule {
    Rule {
        action,
        delay_ms: None,
        max_attempts: None,
        hint,
    }
}

fn rule_for(error: &ClassifiedError) -> Rule {
    use RecoveryAction::{Abort, Fix, Pause, Skip};

    match error {
        ClassifiedError::Acquisition { code, .. } => match code {
            AcquisitionCode::Timeout => retry(5_000, 3, "Retrying in 5s."),
            AcquisitionCode::RateLimited => {
                retry(5_000, 5, "Backing off before retrying in at least 5s.")
            }
            AcquisitionCode::Captcha | AcquisitionCode::Blocked => {
                act(Pause, "Manual intervention is required before continuing.")
            }
            AcquisitionCode::NotFound => act(Skip, "Abandoning this clone."),
            AcquisitionCode::ParseError => retry(2_000, 2, "Retrying in 2s."),
        },
        ClassifiedError::Generation { code, .. } => match code {
            GenerationCode::TypeError | GenerationCode::LintError => {
                act(Fix, "Apply the reported corrections and re-run.")
            }
            GenerationCode::BuildError | GenerationCode::PatternMismatch => {
                act(Abort, "Stopping the clone.")
            }
            GenerationCode::FileWrite => retry(1_000, 2, "Retrying in 1s."),
        },
        ClassifiedError::Verification { code, .. } => match code {
            VerificationCode::VisualMismatch
            | VerificationCode::LinkBroken
            | VerificationCode::TestFailed
            | VerificationCode::ConsoleError => act(
                Fix,
                "Apply the fix suggestions and verify again while attempts remain.",
            ),
            VerificationCode::DataIncomplete => retry(2_000, 2, "Retrying in 2s."),
        },
    }
}

/// Resolve the recovery strategy for a classified error.
///
/// Pure and total: the match over domains and codes is exhaustive, so every
/// error yields exactly one strategy.
///
/// | Domain | Code | Action | Delay / attempts |
/// |---|---|---|---|
/// | Acquisition | Timeout | Retry | 5s, 3 |
/// | Acquisition | RateLimited | Retry | 5s baseline, 5 |
/// | Acquisition | Captcha, Blocked | Pause | |
/// | Acquisition | NotFound | Skip | |
/// | Acquisition | ParseError | Retry | 2s, 2 |
/// | Generation | TypeError, LintError | Fix | |
/// | Generation | BuildError, PatternMismatch | Abort | |
/// | Generation | FileWrite | Retry | 1s, 2 |
/// | Verification | VisualMismatch, LinkBroken, TestFailed, ConsoleError | Fix | verification ceiling |
/// | Verification | DataIncomplete | Retry | 2s, 2 |
#[must_use]
pub fn resolve(error: &ClassifiedError) -> RecoveryStrategy {
    let rule = rule_for(error);
    RecoveryStrategy {
        action: rule.action,
        delay_ms: rule.delay_ms,
        max_attempts: rule.max_attempts,
        user_message: format!("{}. {}", error.user_message(), rule.hint),
    }
}
