use std::sync::Arc;
use std::time::Duration;

use pageclone_phase_api::{PhaseKind, PhaseOutcome};
use pageclone_progress::ProgressStore;
use pageclone_ratelimit::RateLimiter;
use pageclone_recovery::{AcquisitionCode, ClassifiedError};
use pageclone_utils::error::{CloneError, PhaseError};
use pageclone_utils::types::{OverallStatus, PhaseStatus};
use tokio_util::sync::CancellationToken;

use crate::CloneOrchestrator;
use crate::test_support::{FakeCollaborators, fast_limiter, sample_inputs, sample_request};

struct Harness {
    fakes: FakeCollaborators,
    store: ProgressStore,
    limiter: Arc<RateLimiter>,
    orchestrator: CloneOrchestrator,
}

async fn harness(slug: &str) -> Harness {
    let fakes = FakeCollaborators::new();
    let store = ProgressStore::in_memory();
    let limiter = fast_limiter();
    let mut orchestrator = CloneOrchestrator::new(
        sample_request(slug),
        fakes.collaborators(),
        store.clone(),
        Arc::clone(&limiter),
    );
    orchestrator.initialize().await.unwrap();
    Harness {
        fakes,
        store,
        limiter,
        orchestrator,
    }
}

async fn status(store: &ProgressStore, slug: &str) -> OverallStatus {
    store.read(slug).await.unwrap().unwrap().status
}

#[tokio::test]
async fn test_bot_screen_pauses_without_calling_analyzer() {
    let mut h = harness("landing").await;
    let mut input = sample_inputs().analyze;
    input.snapshot = "<div class=\"cf-challenge\">Verify you are human</div>".into();

    let result = h.orchestrator.execute_analyze_phase(&input).await.unwrap();

    assert_eq!(result.outcome, PhaseOutcome::Failed);
    assert_eq!(h.fakes.analyzer.script.calls(), 0);
    assert_eq!(result.payload["error"]["code"], "captcha");
    assert_eq!(result.payload["recovery"]["action"], "pause");

    let record = h.store.read("landing").await.unwrap().unwrap();
    assert_eq!(record.status, OverallStatus::AwaitingUserInput);
    assert_eq!(record.phase_status(PhaseKind::Analyze), PhaseStatus::Failed);
    assert_eq!(record.errors.len(), 1);
    assert!(h.limiter.current_delay().await > Duration::from_millis(1));
}

#[tokio::test]
async fn test_rate_limited_extract_retries_then_succeeds() {
    let mut h = harness("landing").await;
    let inputs = sample_inputs();
    h.orchestrator
        .execute_analyze_phase(&inputs.analyze)
        .await
        .unwrap();
    h.fakes
        .extractor
        .script
        .push_err("GET https://example.com/landing: 429 Too Many Requests");

    let first = h
        .orchestrator
        .execute_extract_phase(&inputs.markup)
        .await
        .unwrap();
    assert_eq!(first.outcome, PhaseOutcome::NeedsRetry);
    assert_eq!(first.payload["recovery"]["max_attempts"], 5);
    assert_eq!(status(&h.store, "landing").await, OverallStatus::Running);
    assert_eq!(h.limiter.current_delay().await, Duration::from_millis(2));

    let second = h
        .orchestrator
        .execute_extract_phase(&inputs.markup)
        .await
        .unwrap();
    assert!(second.is_success());

    let record = h.store.read("landing").await.unwrap().unwrap();
    assert_eq!(record.phase(PhaseKind::Extract).attempts, 2);
    assert!(record.extracted.is_some());
    assert_eq!(h.orchestrator.history().len(), 3);
}

#[tokio::test]
async fn test_timeout_retries_are_bounded_per_phase() {
    let mut h = harness("landing").await;
    let input = sample_inputs().analyze;
    for _ in 0..3 {
        h.fakes
            .analyzer
            .script
            .push_err("navigation timed out after 30000ms");
    }

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(
            h.orchestrator
                .execute_analyze_phase(&input)
                .await
                .unwrap()
                .outcome,
        );
    }
    assert_eq!(
        outcomes,
        vec![
            PhaseOutcome::NeedsRetry,
            PhaseOutcome::NeedsRetry,
            PhaseOutcome::Failed
        ]
    );
    assert_eq!(status(&h.store, "landing").await, OverallStatus::Failed);
}

#[tokio::test]
async fn test_not_found_abandons_clone() {
    let mut h = harness("landing").await;
    h.fakes.analyzer.script.push_err("HTTP 404 Not Found");

    let result = h
        .orchestrator
        .execute_analyze_phase(&sample_inputs().analyze)
        .await
        .unwrap();
    assert_eq!(result.outcome, PhaseOutcome::Failed);
    assert_eq!(result.payload["recovery"]["action"], "skip");
    assert_eq!(status(&h.store, "landing").await, OverallStatus::Failed);

    // No further phase may run until an operator acknowledges.
    let err = h
        .orchestrator
        .execute_analyze_phase(&sample_inputs().analyze)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CloneError::Phase(PhaseError::AwaitingUserInput { .. })
    ));
}

#[tokio::test]
async fn test_blocked_error_from_collaborator_pauses() {
    let mut h = harness("landing").await;
    h.fakes.analyzer.script.push_error(
        anyhow::Error::new(ClassifiedError::acquisition(
            AcquisitionCode::Blocked,
            Some("https://example.com/landing".into()),
            "403 from edge proxy",
        ))
        .context("analyzer failed"),
    );

    let result = h
        .orchestrator
        .execute_analyze_phase(&sample_inputs().analyze)
        .await
        .unwrap();
    assert_eq!(result.payload["error"]["code"], "blocked");
    assert_eq!(
        status(&h.store, "landing").await,
        OverallStatus::AwaitingUserInput
    );

    h.orchestrator
        .acknowledge_intervention("allow-listed crawler IP")
        .await
        .unwrap();
    let retry = h
        .orchestrator
        .execute_analyze_phase(&sample_inputs().analyze)
        .await
        .unwrap();
    assert!(retry.is_success());
}

#[tokio::test]
async fn test_generation_failures_in_implement() {
    let mut h = harness("landing").await;
    let inputs = sample_inputs();
    h.orchestrator
        .execute_analyze_phase(&inputs.analyze)
        .await
        .unwrap();
    h.orchestrator
        .execute_extract_phase(&inputs.markup)
        .await
        .unwrap();
    h.orchestrator.execute_plan_phase().await.unwrap();

    h.fakes
        .implementer
        .script
        .push_err("Type 'string' is not assignable to type 'number'");
    let fix = h.orchestrator.execute_implement_phase().await.unwrap();
    assert_eq!(fix.outcome, PhaseOutcome::NeedsRetry);
    assert_eq!(fix.payload["recovery"]["action"], "fix");
    assert_eq!(
        fix.payload["error"]["file_path"],
        "src/features/landing/Page.tsx"
    );

    h.fakes
        .implementer
        .script
        .push_err("Build failed with 2 errors");
    let abort = h.orchestrator.execute_implement_phase().await.unwrap();
    assert_eq!(abort.outcome, PhaseOutcome::Failed);
    assert_eq!(status(&h.store, "landing").await, OverallStatus::Failed);
}

#[tokio::test]
async fn test_implement_records_files_once() {
    let mut h = harness("landing").await;
    let inputs = sample_inputs();
    h.orchestrator
        .execute_analyze_phase(&inputs.analyze)
        .await
        .unwrap();
    h.orchestrator
        .execute_extract_phase(&inputs.markup)
        .await
        .unwrap();
    h.orchestrator.execute_plan_phase().await.unwrap();
    h.orchestrator.execute_implement_phase().await.unwrap();

    let record = h.store.read("landing").await.unwrap().unwrap();
    assert_eq!(
        record.files_created,
        vec![
            "src/features/landing/Page.tsx".to_string(),
            "src/features/landing/data.ts".to_string()
        ]
    );
    assert_eq!(record.files_modified, vec!["src/routes.ts".to_string()]);
}

#[tokio::test]
async fn test_phase_order_is_enforced() {
    let mut h = harness("landing").await;
    let err = h.orchestrator.execute_plan_phase().await.unwrap_err();
    assert!(matches!(
        err,
        CloneError::Phase(PhaseError::DependencyNotSatisfied {
            phase: PhaseKind::Plan,
            dependency: PhaseKind::Analyze
        })
    ));
    assert_eq!(h.fakes.planner.script.calls(), 0);
}

#[tokio::test]
async fn test_plan_requires_saved_inputs() {
    let mut h = harness("landing").await;
    for phase in [PhaseKind::Analyze, PhaseKind::Extract] {
        h.store
            .update_phase("landing", phase, PhaseStatus::InProgress, None)
            .await
            .unwrap();
        h.store
            .update_phase("landing", phase, PhaseStatus::Completed, None)
            .await
            .unwrap();
    }

    let err = h.orchestrator.execute_plan_phase().await.unwrap_err();
    assert!(matches!(
        err,
        CloneError::Phase(PhaseError::PreconditionFailed {
            phase: PhaseKind::Plan,
            ..
        })
    ));
    let record = h.store.read("landing").await.unwrap().unwrap();
    assert_eq!(record.phase_status(PhaseKind::Plan), PhaseStatus::Failed);
    assert_eq!(h.fakes.planner.script.calls(), 0);
}

#[tokio::test]
async fn test_cancellation_pauses_and_resets_phase() {
    let fakes = FakeCollaborators::new();
    let store = ProgressStore::in_memory();
    let token = CancellationToken::new();
    let mut orchestrator = CloneOrchestrator::new(
        sample_request("landing"),
        fakes.collaborators(),
        store.clone(),
        fast_limiter(),
    )
    .with_cancellation(token.clone());
    orchestrator.initialize().await.unwrap();

    fakes.analyzer.script.push_hang();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let err = orchestrator
        .execute_analyze_phase(&sample_inputs().analyze)
        .await
        .unwrap_err();
    canceller.await.unwrap();
    assert!(matches!(
        err,
        CloneError::Cancelled {
            phase: Some(PhaseKind::Analyze),
            ..
        }
    ));

    let record = store.read("landing").await.unwrap().unwrap();
    assert_eq!(record.status, OverallStatus::Paused);
    assert_eq!(record.phase_status(PhaseKind::Analyze), PhaseStatus::Pending);
    assert_eq!(record.phase(PhaseKind::Analyze).attempts, 1);

    // A fresh orchestrator resumes the paused clone.
    let mut resumed = CloneOrchestrator::new(
        sample_request("landing").with_resume(true),
        fakes.collaborators(),
        store.clone(),
        fast_limiter(),
    );
    let record = resumed.initialize().await.unwrap();
    assert_eq!(record.status, OverallStatus::Running);
    let result = resumed
        .execute_analyze_phase(&sample_inputs().analyze)
        .await
        .unwrap();
    assert!(result.is_success());
    let record = store.read("landing").await.unwrap().unwrap();
    assert_eq!(record.phase(PhaseKind::Analyze).attempts, 2);
}

#[tokio::test]
async fn test_resume_refuses_records_awaiting_operator() {
    let store = ProgressStore::in_memory();
    store
        .create("https://example.com/landing", "landing", false)
        .await
        .unwrap();
    store
        .set_overall_status("landing", OverallStatus::AwaitingUserInput)
        .await
        .unwrap();

    let fakes = FakeCollaborators::new();
    let mut orchestrator = CloneOrchestrator::new(
        sample_request("landing").with_resume(true),
        fakes.collaborators(),
        store.clone(),
        fast_limiter(),
    );
    assert!(matches!(
        orchestrator.initialize().await,
        Err(CloneError::Phase(PhaseError::AwaitingUserInput { .. }))
    ));
}

#[tokio::test]
async fn test_resume_without_record_starts_fresh() {
    let fakes = FakeCollaborators::new();
    let store = ProgressStore::in_memory();
    let mut orchestrator = CloneOrchestrator::new(
        sample_request("landing").with_resume(true),
        fakes.collaborators(),
        store.clone(),
        fast_limiter(),
    );
    let record = orchestrator.initialize().await.unwrap();
    assert_eq!(record.status, OverallStatus::Running);
    assert_eq!(record.first_incomplete_phase(), Some(PhaseKind::Analyze));
}

#[tokio::test]
async fn test_fresh_start_rejects_existing_record() {
    let h = harness("landing").await;
    let mut second = CloneOrchestrator::new(
        sample_request("landing"),
        h.fakes.collaborators(),
        h.store.clone(),
        fast_limiter(),
    );
    assert!(matches!(
        second.initialize().await,
        Err(CloneError::Progress(_))
    ));
}
