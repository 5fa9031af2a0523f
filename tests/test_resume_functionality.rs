//! Resume tests over the file-backed progress store.
//!
//! A clone interrupted after some phases must pick up at the first phase the
//! persisted record does not show as completed, using only what was written
//! to disk.

mod test_support;

use anyhow::Result;
use pageclone::engine::test_support::{FakeCollaborators, sample_inputs};
use pageclone::error::PhaseError;
use pageclone::{
    CancellationToken, CloneError, OverallStatus, PhaseKind, PhaseOutcome, PhaseStatus,
    RunOutcome,
};
use test_support::{fs_store, load, orchestrator_for};

#[tokio::test]
async fn test_resume_continues_after_extract() -> Result<()> {
    let (store, _home) = fs_store();
    let inputs = sample_inputs();

    {
        let fakes = FakeCollaborators::new();
        let mut first = orchestrator_for("pricing", &fakes, &store, false);
        first.initialize().await?;
        assert!(first.execute_analyze_phase(&inputs.analyze).await?.is_success());
        assert!(first.execute_extract_phase(&inputs.markup).await?.is_success());
    }

    let record = load(&store, "pricing").await;
    assert_eq!(record.phase_status(PhaseKind::Analyze), PhaseStatus::Completed);
    assert_eq!(record.phase_status(PhaseKind::Extract), PhaseStatus::Completed);
    assert_eq!(record.phase_status(PhaseKind::Plan), PhaseStatus::Pending);
    assert_eq!(record.first_incomplete_phase(), Some(PhaseKind::Plan));
    assert!(record.analysis.is_some());
    assert!(record.extracted.is_some());

    let fakes = FakeCollaborators::new();
    let mut resumed = orchestrator_for("pricing", &fakes, &store, true);
    let outcome = resumed.run(&inputs).await?;

    assert!(outcome.is_completed());
    assert_eq!(fakes.analyzer.script.calls(), 0);
    assert_eq!(fakes.extractor.script.calls(), 0);
    assert_eq!(fakes.planner.script.calls(), 1);
    assert_eq!(fakes.verifier.script.calls(), 1);

    let phases: Vec<PhaseKind> = resumed.history().iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![PhaseKind::Plan, PhaseKind::Implement, PhaseKind::Verify]
    );
    Ok(())
}

#[tokio::test]
async fn test_resume_after_retryable_failure() -> Result<()> {
    let (store, _home) = fs_store();
    let inputs = sample_inputs();
    let fakes = FakeCollaborators::new();
    fakes
        .planner
        .script
        .push_err("unexpected token in planner response");

    let mut first = orchestrator_for("pricing", &fakes, &store, false);
    let RunOutcome::Stopped { result, status } = first.run(&inputs).await? else {
        panic!("first run should stop at Plan");
    };
    assert_eq!(result.phase, PhaseKind::Plan);
    assert_eq!(result.outcome, PhaseOutcome::NeedsRetry);
    assert_eq!(status, OverallStatus::Running);

    let mut second = orchestrator_for("pricing", &fakes, &store, true);
    let outcome = second.run(&inputs).await?;
    let RunOutcome::Completed(report) = outcome else {
        panic!("resumed run should complete");
    };
    assert!(report.archived);
    assert_eq!(fakes.analyzer.script.calls(), 1);
    assert_eq!(fakes.planner.script.calls(), 2);

    let archived = store.read_archived("pricing").await?.expect("archived record");
    assert_eq!(archived.phase(PhaseKind::Plan).attempts, 2);
    assert_eq!(archived.errors.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_paused_clone_runs_no_phase_until_resumed() -> Result<()> {
    let (store, _home) = fs_store();
    let inputs = sample_inputs();
    let fakes = FakeCollaborators::new();

    let mut first = orchestrator_for("pricing", &fakes, &store, false);
    first.initialize().await?;
    first.execute_analyze_phase(&inputs.analyze).await?;
    let record = first.pause().await?;
    assert_eq!(record.status, OverallStatus::Paused);

    let err = first.execute_extract_phase(&inputs.markup).await.unwrap_err();
    assert!(matches!(err, CloneError::Phase(PhaseError::Paused { .. })));
    assert_eq!(err.to_exit_code(), pageclone::ExitCode::PRECONDITION);
    assert_eq!(fakes.extractor.script.calls(), 0);
    let record = load(&store, "pricing").await;
    assert_eq!(record.status, OverallStatus::Paused);
    assert_eq!(record.phase_status(PhaseKind::Extract), PhaseStatus::Pending);

    let mut resumed = orchestrator_for("pricing", &fakes, &store, true);
    resumed.initialize().await?;
    assert!(resumed.execute_extract_phase(&inputs.markup).await?.is_success());
    assert_eq!(fakes.extractor.script.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_clone_resumes_from_interrupted_phase() -> Result<()> {
    let (store, _home) = fs_store();
    let inputs = sample_inputs();
    let fakes = FakeCollaborators::new();
    fakes.implementer.script.push_hang();

    let token = CancellationToken::new();
    let mut first =
        orchestrator_for("pricing", &fakes, &store, false).with_cancellation(token.clone());
    first.initialize().await?;
    first.execute_analyze_phase(&inputs.analyze).await?;
    first.execute_extract_phase(&inputs.markup).await?;
    first.execute_plan_phase().await?;

    // Cancel only once the implementer is actually in flight.
    let implementer = fakes.implementer.clone();
    let (result, ()) = tokio::join!(first.execute_implement_phase(), async {
        while implementer.script.calls() == 0 {
            tokio::task::yield_now().await;
        }
        token.cancel();
    });
    let err = result.unwrap_err();
    assert!(matches!(err, CloneError::Cancelled { .. }));

    let record = load(&store, "pricing").await;
    assert_eq!(record.status, OverallStatus::Paused);
    assert_eq!(
        record.phase_status(PhaseKind::Implement),
        PhaseStatus::Pending
    );

    let mut resumed = orchestrator_for("pricing", &fakes, &store, true);
    assert!(resumed.run(&inputs).await?.is_completed());
    assert_eq!(fakes.implementer.script.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_resume_of_completed_phases_survives_reload() -> Result<()> {
    let (store, home) = fs_store();
    let inputs = sample_inputs();
    let fakes = FakeCollaborators::new();

    let mut first = orchestrator_for("pricing", &fakes, &store, false);
    first.initialize().await?;
    first.execute_analyze_phase(&inputs.analyze).await?;
    drop(first);

    // A second store over the same directory sees the same record.
    let reopened = pageclone::ProgressStore::filesystem(&home.utf8_path());
    let record = load(&reopened, "pricing").await;
    assert_eq!(record.phase_status(PhaseKind::Analyze), PhaseStatus::Completed);
    assert_eq!(record.status, OverallStatus::Running);
    assert_eq!(record.schema_version, pageclone::progress::SCHEMA_VERSION);
    Ok(())
}
