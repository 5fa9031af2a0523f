use pageclone_utils::types::PhaseKind;

use crate::taxonomy::{AcquisitionCode, ClassifiedError, GenerationCode, VerificationCode};

const CAPTCHA_PHRASES: &[&str] = &[
    "captcha",
    "verify you are human",
    "verify that you are human",
    "are you a robot",
    "not a robot",
    "bot detection",
    "bot detected",
    "checking your browser",
    "cf-challenge",
    "challenge-platform",
    "unusual traffic",
    "press and hold",
];

const RATE_LIMIT_PHRASES: &[&str] = &["429", "too many requests", "rate limit", "ratelimit"];

const TIMEOUT_PHRASES: &[&str] = &[
    "timeout",
    "timed out",
    "time out",
    "etimedout",
    "deadline exceeded",
];

const NOT_FOUND_PHRASES: &[&str] = &["404", "not found"];

const TYPE_PHRASES: &[&str] = &[
    "typeerror",
    "type error",
    "is not assignable to",
    "does not exist on type",
    "cannot find name",
    "error ts",
    "mismatched types",
];

const BUILD_PHRASES: &[&str] = &[
    "build failed",
    "build error",
    "failed to compile",
    "compilation failed",
    "bundl",
    "webpack",
    "rollup",
    "esbuild",
];

const LINT_PHRASES: &[&str] = &["lint", "prettier"];

const TEST_PHRASES: &[&str] = &[
    "test failed",
    "tests failed",
    "test failure",
    "failing test",
    "assertion failed",
    "assertionerror",
];

const BROKEN_LINK_PHRASES: &[&str] = &["broken link", "link broken", "dead link", "links broken"];

const INCOMPLETE_PHRASES: &[&str] = &["incomplete", "missing"];

const CONSOLE_PHRASES: &[&str] = &["console error", "console.error", "uncaught"];

const MISMATCH_PHRASES: &[&str] = &["mismatch", "differ", "visual", "pixel"];

/// Optional context attached to a failure before classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub phase: Option<PhaseKind>,
    pub source_url: Option<String>,
    pub file_path: Option<String>,
    /// Verification attempts already consumed, copied into verification errors.
    pub fix_attempts: u32,
}

impl ErrorContext {
    #[must_use]
    pub fn for_phase(phase: PhaseKind) -> Self {
        Self {
            phase: Some(phase),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_fix_attempts(mut self, attempts: u32) -> Self {
        self.fix_attempts = attempts;
        self
    }
}

fn matches_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| haystack.contains(p))
}

/// Classify a failure message.
///
/// Rules are checked in order and the first match wins; matching is a
/// case-insensitive substring search. Anything unmatched becomes
/// `Acquisition { ParseError, retryable: false }`, so every input has exactly
/// one classification.
///
/// # Example
///
/// ```rust
/// use pageclone_recovery::{classify, ClassifiedError, AcquisitionCode, ErrorContext};
///
/// let err = classify("HTTP 429 Too Many Requests", &ErrorContext::default());
/// assert!(matches!(
///     err,
///     ClassifiedError::Acquisition { code: AcquisitionCode::RateLimited, retryable: true, .. }
/// ));
/// ```
#[must_use]
pub fn classify(message: &str, ctx: &ErrorContext) -> ClassifiedError {
    let text = message.to_lowercase();
    let acquisition = |code| ClassifiedError::acquisition(code, ctx.source_url.clone(), message);
    let generation = |code| ClassifiedError::generation(code, ctx.file_path.clone(), message);
    let verification =
        |code| ClassifiedError::verification(code, vec![message.to_string()], ctx.fix_attempts);

    if matches_any(&text, CAPTCHA_PHRASES) {
        return acquisition(AcquisitionCode::Captcha);
    }
    if matches_any(&text, RATE_LIMIT_PHRASES) {
        return acquisition(AcquisitionCode::RateLimited);
    }
    if matches_any(&text, TIMEOUT_PHRASES) {
        return acquisition(AcquisitionCode::Timeout);
    }
    if matches_any(&text, NOT_FOUND_PHRASES) {
        return acquisition(AcquisitionCode::NotFound);
    }
    if matches_any(&text, TYPE_PHRASES) {
        return generation(GenerationCode::TypeError);
    }
    if matches_any(&text, BUILD_PHRASES) {
        return generation(GenerationCode::BuildError);
    }
    if matches_any(&text, LINT_PHRASES) {
        return generation(GenerationCode::LintError);
    }
    if matches_any(&text, TEST_PHRASES) {
        return verification(VerificationCode::TestFailed);
    }
    if ctx.phase == Some(PhaseKind::Verify) {
        if matches_any(&text, BROKEN_LINK_PHRASES) {
            return verification(VerificationCode::LinkBroken);
        }
        if matches_any(&text, INCOMPLETE_PHRASES) {
            return verification(VerificationCode::DataIncomplete);
        }
        if matches_any(&text, CONSOLE_PHRASES) {
            return verification(VerificationCode::ConsoleError);
        }
        if matches_any(&text, MISMATCH_PHRASES) {
            return verification(VerificationCode::VisualMismatch);
        }
    }

    acquisition(AcquisitionCode::ParseError)
}

/// Classify an error returned by a collaborator.
///
/// A `ClassifiedError` inside the chain is returned unchanged; anything else
/// is classified from its full context chain (`{:#}`).
#[must_use]
pub fn classify_error(err: &anyhow::Error, ctx: &ErrorContext) -> ClassifiedError {
    if let Some(classified) = err.chain().find_map(|e| e.downcast_ref::<ClassifiedError>()) {
        return classified.clone();
    }
    classify(&format!("{err:#}"), ctx)
}

/// Screen a raw page capture for bot-detection signatures.
///
/// Returns a `Captcha` classification when the capture looks like a
/// challenge page rather than the requested content.
#[must_use]
pub fn screen_for_bot_detection(snapshot: &str, ctx: &ErrorContext) -> Option<ClassifiedError> {
    let text = snapshot.to_lowercase();
    CAPTCHA_PHRASES
        .iter()
        .find(|p| text.contains(**p))
        .map(|phrase| {
            ClassifiedError::acquisition(
                AcquisitionCode::Captcha,
                ctx.source_url.clone(),
                format!("page capture contains bot-detection signature \"{phrase}\""),
            )
        })
}
