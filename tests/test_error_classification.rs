//! Classification and recovery scenarios as an operator would see them.

use pageclone::recovery::{AcquisitionCode, ErrorDomain, GenerationCode, VerificationCode};
use pageclone::{
    ClassifiedError, ErrorCategory, ErrorContext, PhaseKind, RecoveryAction, UserFriendlyError,
    classify, classify_error, resolve,
};
use proptest::prelude::*;

fn ctx(phase: PhaseKind) -> ErrorContext {
    ErrorContext::for_phase(phase).with_source_url("https://example.com/pricing")
}

#[test]
fn test_rate_limit_retries_with_backoff() {
    let err = classify("HTTP 429 Too Many Requests", &ctx(PhaseKind::Extract));
    match &err {
        ClassifiedError::Acquisition {
            code,
            retryable,
            source_url,
            ..
        } => {
            assert_eq!(*code, AcquisitionCode::RateLimited);
            assert!(*retryable);
            assert_eq!(source_url.as_deref(), Some("https://example.com/pricing"));
        }
        other => panic!("unexpected classification: {other:?}"),
    }

    let strategy = resolve(&err);
    assert_eq!(strategy.action, RecoveryAction::Retry);
    assert_eq!(strategy.max_attempts, Some(5));
    assert!(strategy.delay_ms.is_some_and(|d| d >= 5_000));
}

#[test]
fn test_captcha_pauses_for_operator() {
    let err = classify(
        "Please verify you are human to continue",
        &ctx(PhaseKind::Analyze),
    );
    assert_eq!(err.code_str(), "captcha");
    assert_eq!(err.blocking_signal(), Some(AcquisitionCode::Captcha));

    let strategy = resolve(&err);
    assert_eq!(strategy.action, RecoveryAction::Pause);
    assert_eq!(strategy.delay_ms, None);
    assert!(!strategy.user_message.is_empty());
}

#[test]
fn test_generation_failures() {
    let type_err = classify(
        "TS2322: Type 'string' is not assignable to type 'number'",
        &ctx(PhaseKind::Implement).with_file_path("src/features/pricing/Page.tsx"),
    );
    assert!(matches!(
        type_err,
        ClassifiedError::Generation {
            code: GenerationCode::TypeError,
            auto_fixable: true,
            ..
        }
    ));
    assert_eq!(resolve(&type_err).action, RecoveryAction::Fix);

    let build = classify("webpack: Build failed", &ctx(PhaseKind::Implement));
    assert_eq!(build.domain(), ErrorDomain::Generation);
    assert_eq!(resolve(&build).action, RecoveryAction::Abort);
}

#[test]
fn test_verify_phase_specific_rules() {
    let visual = classify("pixel diff above threshold", &ctx(PhaseKind::Verify));
    assert!(matches!(
        visual,
        ClassifiedError::Verification {
            code: VerificationCode::VisualMismatch,
            ..
        }
    ));

    // Outside Verify the same text has no verification meaning.
    let elsewhere = classify("pixel diff above threshold", &ctx(PhaseKind::Plan));
    assert_eq!(elsewhere.code_str(), "parse_error");
}

#[test]
fn test_not_found_is_skipped() {
    let err = classify("GET /pricing returned 404", &ctx(PhaseKind::Analyze));
    assert_eq!(err.code_str(), "not_found");
    assert!(!err.is_retryable());
    assert_eq!(resolve(&err).action, RecoveryAction::Skip);
}

#[test]
fn test_classified_error_passes_through_context_chain() {
    let original = ClassifiedError::acquisition(
        AcquisitionCode::Blocked,
        Some("https://example.com".into()),
        "WAF rejected the request",
    );
    let err = anyhow::Error::new(original.clone()).context("extracting content");
    assert_eq!(classify_error(&err, &ctx(PhaseKind::Extract)), original);
    assert_eq!(resolve(&original).action, RecoveryAction::Pause);
}

#[test]
fn test_context_chain_is_classified() {
    let err = anyhow::anyhow!("ETIMEDOUT").context("loading https://example.com/pricing");
    let classified = classify_error(&err, &ctx(PhaseKind::Analyze));
    assert_eq!(classified.code_str(), "timeout");
}

#[test]
fn test_user_facing_report() {
    let err = classify("429 Too Many Requests", &ctx(PhaseKind::Extract));
    assert_eq!(err.category(), ErrorCategory::Acquisition);
    assert!(!err.suggestions().is_empty());
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["domain"], "acquisition");
    assert_eq!(json["code"], "rate_limited");
}

fn any_phase() -> impl Strategy<Value = Option<PhaseKind>> {
    prop_oneof![
        Just(None),
        Just(Some(PhaseKind::Analyze)),
        Just(Some(PhaseKind::Extract)),
        Just(Some(PhaseKind::Plan)),
        Just(Some(PhaseKind::Implement)),
        Just(Some(PhaseKind::Verify)),
    ]
}

proptest! {
    #[test]
    fn prop_classification_is_total_and_deterministic(message in ".{0,200}", phase in any_phase()) {
        let ctx = ErrorContext { phase, ..ErrorContext::default() };
        let first = classify(&message, &ctx);
        let second = classify(&message, &ctx);
        prop_assert_eq!(&first, &second);

        let strategy = resolve(&first);
        prop_assert_eq!(&strategy, &resolve(&second));
        if strategy.action == RecoveryAction::Retry {
            prop_assert!(strategy.max_attempts.is_some());
            prop_assert!(strategy.delay_ms.is_some());
        }
    }

    #[test]
    fn prop_verification_codes_only_in_verify(message in "[a-z ]{0,80}") {
        let ctx = ErrorContext::for_phase(PhaseKind::Extract);
        let err = classify(&message, &ctx);
        if let ClassifiedError::Verification { code, .. } = err {
            // Only the phase-independent test-failure rule applies outside Verify.
            prop_assert_eq!(code, VerificationCode::TestFailed);
        }
    }
}
