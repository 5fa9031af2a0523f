//! The stable facade is enough to embed the orchestrator with custom
//! collaborators.

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use pageclone::phase_api::{
    AnalyzeInput, ExtractedData, ImplementationPlan, ImplementationReport, PageAnalysis,
    PlanOptions, PlannedFile, PlannedFileKind, VerificationReport, VerifyInput,
};
use pageclone::{
    CloneOrchestrator, CloneRequest, CloneVerifier, Collaborators, ContentExtractor, ExitCode,
    ImplementationPlanner, Implementer, OverallStatus, PageAnalyzer, PhaseInputs, ProgressStore,
    RateLimitPolicy, RateLimiter, RunOutcome, VerifyCapture,
};

struct TitleAnalyzer;

#[async_trait]
impl PageAnalyzer for TitleAnalyzer {
    async fn analyze(&self, input: &AnalyzeInput) -> Result<PageAnalysis> {
        Ok(PageAnalysis {
            title: input.title.to_uppercase(),
            sections: vec!["main".into()],
            breakpoints: input.breakpoints.clone(),
            details: serde_json::json!({ "snapshot_len": input.snapshot.len() }),
        })
    }
}

struct EmptyExtractor;

#[async_trait]
impl ContentExtractor for EmptyExtractor {
    async fn extract(&self, _markup: &str, source_url: &str) -> Result<ExtractedData> {
        Ok(ExtractedData {
            source_url: source_url.to_string(),
            ..ExtractedData::default()
        })
    }
}

struct SingleFilePlanner;

#[async_trait]
impl ImplementationPlanner for SingleFilePlanner {
    async fn plan(
        &self,
        _analysis: &PageAnalysis,
        _extracted: &ExtractedData,
        options: &PlanOptions,
    ) -> Result<ImplementationPlan> {
        Ok(ImplementationPlan {
            feature_name: options.feature_name.clone(),
            page_slug: options.page_slug.clone(),
            route: format!("/{}", options.page_slug),
            files: vec![PlannedFile {
                path: format!("src/pages/{}.tsx", options.page_slug),
                kind: PlannedFileKind::Component,
            }],
        })
    }
}

struct PlanImplementer;

#[async_trait]
impl Implementer for PlanImplementer {
    async fn implement(
        &self,
        plan: &ImplementationPlan,
        _extracted: &ExtractedData,
    ) -> Result<ImplementationReport> {
        Ok(ImplementationReport {
            files_created: plan.files.iter().map(|f| f.path.clone()).collect(),
            files_modified: Vec::new(),
        })
    }
}

/// Rejects clones whose snapshot differs from the source.
struct SnapshotVerifier;

#[async_trait]
impl CloneVerifier for SnapshotVerifier {
    async fn verify(&self, input: &VerifyInput) -> Result<VerificationReport> {
        if input.source_snapshot.is_empty() {
            bail!("source snapshot missing");
        }
        let passed = input.source_snapshot == input.clone_snapshot;
        Ok(VerificationReport {
            passed,
            can_retry: !passed,
            fix_suggestions: if passed {
                Vec::new()
            } else {
                vec!["clone markup differs from source".into()]
            },
        })
    }
}

fn collaborators() -> Collaborators {
    Collaborators {
        analyzer: Arc::new(TitleAnalyzer),
        extractor: Arc::new(EmptyExtractor),
        planner: Arc::new(SingleFilePlanner),
        implementer: Arc::new(PlanImplementer),
        verifier: Arc::new(SnapshotVerifier),
    }
}

fn inputs(clone_snapshot: &str) -> PhaseInputs {
    PhaseInputs {
        analyze: AnalyzeInput {
            snapshot: "<main>About us</main>".into(),
            title: "About".into(),
            breakpoints: vec![375, 1280],
        },
        markup: "<main>About us</main>".into(),
        verify: VerifyCapture {
            source_snapshot: "<main>About us</main>".into(),
            clone_snapshot: clone_snapshot.into(),
            extras: serde_json::Value::Null,
        },
    }
}

fn limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(RateLimitPolicy {
        min_interval: std::time::Duration::from_millis(1),
        ..RateLimitPolicy::default()
    }))
}

#[tokio::test]
async fn test_custom_collaborators_complete_a_clone() -> Result<()> {
    let store = ProgressStore::in_memory();
    let request = CloneRequest::new("https://example.com/about", "About", "about");
    let mut orchestrator =
        CloneOrchestrator::new(request, collaborators(), store.clone(), limiter());

    let outcome = orchestrator.run(&inputs("<main>About us</main>")).await?;
    let RunOutcome::Completed(report) = outcome else {
        panic!("matching snapshots should complete");
    };
    assert_eq!(report.files_created, vec!["src/pages/about.tsx".to_string()]);

    let archived = store.read_archived("about").await?.expect("archived");
    assert_eq!(
        archived.analysis.map(|a| a.title),
        Some("ABOUT".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_custom_verifier_failure_is_retryable() -> Result<()> {
    let store = ProgressStore::in_memory();
    let request = CloneRequest::new("https://example.com/about", "About", "about");
    let mut orchestrator =
        CloneOrchestrator::new(request, collaborators(), store.clone(), limiter());

    let RunOutcome::Stopped { result, status } =
        orchestrator.run(&inputs("<main>Abot us</main>")).await?
    else {
        panic!("differing snapshots should stop");
    };
    assert_eq!(status, OverallStatus::Running);
    assert_eq!(result.errors, vec!["clone markup differs from source".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_invalid_slug_maps_to_cli_args_exit_code() {
    let store = ProgressStore::in_memory();
    let request = CloneRequest::new("https://example.com/about", "About", "About Us");
    let mut orchestrator = CloneOrchestrator::new(request, collaborators(), store, limiter());

    let err = orchestrator.initialize().await.unwrap_err();
    assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
    assert!(err.display_for_user().starts_with("Error: "));
}
