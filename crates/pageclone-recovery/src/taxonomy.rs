use serde::{Deserialize, Serialize};
use std::fmt;

use pageclone_utils::error::{ErrorCategory, UserFriendlyError};

/// Failure domain of a [`ClassifiedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDomain {
    /// Fetching source content.
    Acquisition,
    /// Producing output artifacts.
    Generation,
    /// Checking the result.
    Verification,
}

impl ErrorDomain {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Acquisition => "acquisition",
            Self::Generation => "generation",
            Self::Verification => "verification",
        }
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionCode {
    Timeout,
    Blocked,
    NotFound,
    ParseError,
    Captcha,
    RateLimited,
}

impl AcquisitionCode {
    pub const ALL: [AcquisitionCode; 6] = [
        Self::Timeout,
        Self::Blocked,
        Self::NotFound,
        Self::ParseError,
        Self::Captcha,
        Self::RateLimited,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Blocked => "blocked",
            Self::NotFound => "not_found",
            Self::ParseError => "parse_error",
            Self::Captcha => "captcha",
            Self::RateLimited => "rate_limited",
        }
    }

    /// Whether the same fetch may succeed if simply tried again.
    #[must_use]
    pub const fn default_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited)
    }

    /// Codes that mean the source site is pushing back on us.
    #[must_use]
    pub const fn is_blocking_signal(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Blocked | Self::Captcha)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationCode {
    FileWrite,
    TypeError,
    LintError,
    BuildError,
    PatternMismatch,
}

impl GenerationCode {
    pub const ALL: [GenerationCode; 5] = [
        Self::FileWrite,
        Self::TypeError,
        Self::LintError,
        Self::BuildError,
        Self::PatternMismatch,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FileWrite => "file_write",
            Self::TypeError => "type_error",
            Self::LintError => "lint_error",
            Self::BuildError => "build_error",
            Self::PatternMismatch => "pattern_mismatch",
        }
    }

    /// Type and lint failures can be corrected mechanically.
    #[must_use]
    pub const fn default_auto_fixable(&self) -> bool {
        matches!(self, Self::TypeError | Self::LintError)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationCode {
    VisualMismatch,
    DataIncomplete,
    LinkBroken,
    TestFailed,
    ConsoleError,
}

impl VerificationCode {
    pub const ALL: [VerificationCode; 5] = [
        Self::VisualMismatch,
        Self::DataIncomplete,
        Self::LinkBroken,
        Self::TestFailed,
        Self::ConsoleError,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VisualMismatch => "visual_mismatch",
            Self::DataIncomplete => "data_incomplete",
            Self::LinkBroken => "link_broken",
            Self::TestFailed => "test_failed",
            Self::ConsoleError => "console_error",
        }
    }
}

/// A failure normalized into one of three domains with a closed code set.
///
/// Collaborators may return a `ClassifiedError` directly (wrapped in
/// `anyhow::Error`); the classifier then passes it through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum ClassifiedError {
    #[error("acquisition error ({}): {detail}", .code.as_str())]
    Acquisition {
        code: AcquisitionCode,
        retryable: bool,
        source_url: Option<String>,
        detail: String,
    },

    #[error("generation error ({}): {detail}", .code.as_str())]
    Generation {
        code: GenerationCode,
        file_path: Option<String>,
        auto_fixable: bool,
        detail: String,
    },

    #[error("verification error ({}): {}", .code.as_str(), .details.join("; "))]
    Verification {
        code: VerificationCode,
        details: Vec<String>,
        fix_attempts: u32,
    },
}

impl ClassifiedError {
    /// Acquisition error with the code's default `retryable` flag.
    #[must_use]
    pub fn acquisition(
        code: AcquisitionCode,
        source_url: Option<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Acquisition {
            code,
            retryable: code.default_retryable(),
            source_url,
            detail: detail.into(),
        }
    }

    /// Generation error with the code's default `auto_fixable` flag.
    #[must_use]
    pub fn generation(
        code: GenerationCode,
        file_path: Option<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Generation {
            code,
            file_path,
            auto_fixable: code.default_auto_fixable(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn verification(code: VerificationCode, details: Vec<String>, fix_attempts: u32) -> Self {
        Self::Verification {
            code,
            details,
            fix_attempts,
        }
    }

    #[must_use]
    pub const fn domain(&self) -> ErrorDomain {
        match self {
            Self::Acquisition { .. } => ErrorDomain::Acquisition,
            Self::Generation { .. } => ErrorDomain::Generation,
            Self::Verification { .. } => ErrorDomain::Verification,
        }
    }

    /// Wire name of the code, e.g. `rate_limited`.
    #[must_use]
    pub const fn code_str(&self) -> &'static str {
        match self {
            Self::Acquisition { code, .. } => code.as_str(),
            Self::Generation { code, .. } => code.as_str(),
            Self::Verification { code, .. } => code.as_str(),
        }
    }

    /// Whether trying the same operation again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Acquisition { retryable, .. } => *retryable,
            Self::Generation { code, .. } => matches!(code, GenerationCode::FileWrite),
            Self::Verification { .. } => true,
        }
    }

    /// The acquisition code when this error reports push-back from the source site.
    #[must_use]
    pub const fn blocking_signal(&self) -> Option<AcquisitionCode> {
        match self {
            Self::Acquisition { code, .. } if code.is_blocking_signal() => Some(*code),
            _ => None,
        }
    }
}

impl UserFriendlyError for ClassifiedError {
    fn user_message(&self) -> String {
        match self {
            Self::Acquisition { code, .. } => match code {
                AcquisitionCode::Timeout => "The source page took too long to respond",
                AcquisitionCode::Blocked => "The source site blocked the request",
                AcquisitionCode::NotFound => "The source page does not exist",
                AcquisitionCode::ParseError => "The source content could not be understood",
                AcquisitionCode::Captcha => "The source site is showing a CAPTCHA or bot check",
                AcquisitionCode::RateLimited => "The source site is rate limiting requests",
            },
            Self::Generation { code, .. } => match code {
                GenerationCode::FileWrite => "A generated file could not be written",
                GenerationCode::TypeError => "Generated code has type errors",
                GenerationCode::LintError => "Generated code fails lint checks",
                GenerationCode::BuildError => "The project no longer builds",
                GenerationCode::PatternMismatch => {
                    "Generated code does not follow the project's patterns"
                }
            },
            Self::Verification { code, .. } => match code {
                VerificationCode::VisualMismatch => "The clone does not look like the source page",
                VerificationCode::DataIncomplete => "The clone is missing content from the source",
                VerificationCode::LinkBroken => "The clone contains broken links",
                VerificationCode::TestFailed => "Tests for the clone are failing",
                VerificationCode::ConsoleError => "The clone logs errors in the browser console",
            },
        }
        .to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Acquisition {
                source_url, detail, ..
            } => Some(match source_url {
                Some(url) => format!("{url}: {detail}"),
                None => detail.clone(),
            }),
            Self::Generation {
                file_path, detail, ..
            } => Some(match file_path {
                Some(path) => format!("{path}: {detail}"),
                None => detail.clone(),
            }),
            Self::Verification {
                details,
                fix_attempts,
                ..
            } => Some(format!(
                "{} (after {fix_attempts} fix attempt(s))",
                details.join("; ")
            )),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        let s = |items: &[&str]| -> Vec<String> { items.iter().map(|i| (*i).to_string()).collect() };
        match self {
            Self::Acquisition { code, .. } => match code {
                AcquisitionCode::Timeout => s(&["Retry later or check the source site's availability"]),
                AcquisitionCode::Blocked | AcquisitionCode::Captcha => s(&[
                    "Open the page in a browser and complete the challenge manually",
                    "Acknowledge the clone once the page is reachable again",
                ]),
                AcquisitionCode::NotFound => s(&["Check the source URL"]),
                AcquisitionCode::ParseError => {
                    s(&["Capture the page again; the snapshot may be truncated"])
                }
                AcquisitionCode::RateLimited => {
                    s(&["Increase rate_limit.min_interval_ms in .pageclone/config.toml"])
                }
            },
            Self::Generation { code, .. } => match code {
                GenerationCode::FileWrite => s(&["Check write permissions on the target directory"]),
                GenerationCode::TypeError | GenerationCode::LintError => {
                    s(&["Apply the compiler or linter fixes and re-run the phase"])
                }
                GenerationCode::BuildError | GenerationCode::PatternMismatch => s(&[
                    "Inspect the generated files by hand",
                    "Re-plan the feature if the plan itself is wrong",
                ]),
            },
            Self::Verification { .. } => s(&["Apply the fix suggestions and verify again"]),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self.domain() {
            ErrorDomain::Acquisition => ErrorCategory::Acquisition,
            ErrorDomain::Generation => ErrorCategory::Generation,
            ErrorDomain::Verification => ErrorCategory::Verification,
        }
    }
}
