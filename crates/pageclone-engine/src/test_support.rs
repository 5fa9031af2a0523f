//! Scripted collaborators for driving the orchestrator without a browser.
//!
//! Test helper: not part of public API stability guarantees.
//!
//! Each fake pops the next scripted step per call and falls back to a
//! plausible success once the script is empty.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pageclone_phase_api::{
    AnalyzeInput, CloneVerifier, ContentExtractor, ExtractedData, ImageRecord, Implementer,
    ImplementationPlan, ImplementationPlanner, ImplementationReport, LinkRecord, PageAnalysis,
    PageAnalyzer, PlanOptions, PlannedFile, PlannedFileKind, VerificationReport, VerifyInput,
};
use pageclone_progress::ProgressStore;
use pageclone_ratelimit::{RateLimitPolicy, RateLimiter};

use crate::orchestrator::CloneOrchestrator;
use crate::request::{CloneRequest, Collaborators, PhaseInputs, VerifyCapture};

/// One scripted response.
pub enum Step<T> {
    Ok(T),
    Err(anyhow::Error),
    /// Never resolve; for cancellation tests.
    Hang,
}

/// FIFO of scripted steps plus a call counter.
pub struct Script<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    calls: AtomicU32,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }
}

impl<T> Script<T> {
    pub fn push(&self, step: Step<T>) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
    }

    pub fn push_ok(&self, value: T) {
        self.push(Step::Ok(value));
    }

    /// Fail with a plain message that the classifier will see.
    pub fn push_err(&self, message: &str) {
        self.push(Step::Err(anyhow!(message.to_string())));
    }

    pub fn push_error(&self, error: anyhow::Error) {
        self.push(Step::Err(error));
    }

    pub fn push_hang(&self) {
        self.push(Step::Hang);
    }

    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self, fallback: impl FnOnce() -> T) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match step {
            Some(Step::Ok(value)) => Ok(value),
            Some(Step::Err(err)) => Err(err),
            Some(Step::Hang) => std::future::pending().await,
            None => Ok(fallback()),
        }
    }
}

#[derive(Default)]
pub struct FakeAnalyzer {
    pub script: Script<PageAnalysis>,
}

#[async_trait]
impl PageAnalyzer for FakeAnalyzer {
    async fn analyze(&self, input: &AnalyzeInput) -> Result<PageAnalysis> {
        self.script
            .next(|| PageAnalysis {
                title: input.title.clone(),
                sections: vec!["hero".into(), "features".into(), "footer".into()],
                breakpoints: input.breakpoints.clone(),
                details: serde_json::Value::Null,
            })
            .await
    }
}

#[derive(Default)]
pub struct FakeExtractor {
    pub script: Script<ExtractedData>,
}

#[async_trait]
impl ContentExtractor for FakeExtractor {
    async fn extract(&self, _markup: &str, source_url: &str) -> Result<ExtractedData> {
        self.script
            .next(|| ExtractedData {
                source_url: source_url.to_string(),
                text_blocks: vec!["Build faster".into(), "Start free".into()],
                images: vec![ImageRecord {
                    src: "/hero.png".into(),
                    alt: "Product screenshot".into(),
                }],
                links: vec![LinkRecord {
                    href: "/signup".into(),
                    text: "Sign up".into(),
                }],
            })
            .await
    }
}

#[derive(Default)]
pub struct FakePlanner {
    pub script: Script<ImplementationPlan>,
}

#[async_trait]
impl ImplementationPlanner for FakePlanner {
    async fn plan(
        &self,
        _analysis: &PageAnalysis,
        _extracted: &ExtractedData,
        options: &PlanOptions,
    ) -> Result<ImplementationPlan> {
        self.script
            .next(|| {
                let slug = &options.page_slug;
                let base = options.parent_route.as_deref().unwrap_or("");
                ImplementationPlan {
                    feature_name: options.feature_name.clone(),
                    page_slug: slug.clone(),
                    route: format!("{base}/{slug}"),
                    files: vec![
                        PlannedFile {
                            path: format!("src/features/{slug}/Page.tsx"),
                            kind: PlannedFileKind::Component,
                        },
                        PlannedFile {
                            path: format!("src/features/{slug}/data.ts"),
                            kind: PlannedFileKind::Data,
                        },
                    ],
                }
            })
            .await
    }
}

/// Reports every planned file as created.
#[derive(Default)]
pub struct FakeImplementer {
    pub script: Script<ImplementationReport>,
}

#[async_trait]
impl Implementer for FakeImplementer {
    async fn implement(
        &self,
        plan: &ImplementationPlan,
        _extracted: &ExtractedData,
    ) -> Result<ImplementationReport> {
        self.script
            .next(|| ImplementationReport {
                files_created: plan.files.iter().map(|f| f.path.clone()).collect(),
                files_modified: vec!["src/routes.ts".into()],
            })
            .await
    }
}

/// Passes by default and remembers the attempt numbers it was given.
#[derive(Default)]
pub struct FakeVerifier {
    pub script: Script<VerificationReport>,
    attempts_seen: Mutex<Vec<u32>>,
}

impl FakeVerifier {
    /// Script `count` failing reports with a retry allowed.
    pub fn fail_times(&self, count: usize, suggestion: &str) {
        for _ in 0..count {
            self.script.push_ok(VerificationReport {
                passed: false,
                can_retry: true,
                fix_suggestions: vec![suggestion.to_string()],
            });
        }
    }

    #[must_use]
    pub fn attempts_seen(&self) -> Vec<u32> {
        self.attempts_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CloneVerifier for FakeVerifier {
    async fn verify(&self, input: &VerifyInput) -> Result<VerificationReport> {
        self.attempts_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(input.attempt);
        self.script
            .next(|| VerificationReport {
                passed: true,
                can_retry: false,
                fix_suggestions: Vec::new(),
            })
            .await
    }
}

/// One fake per port, shareable with the orchestrator.
#[derive(Default, Clone)]
pub struct FakeCollaborators {
    pub analyzer: Arc<FakeAnalyzer>,
    pub extractor: Arc<FakeExtractor>,
    pub planner: Arc<FakePlanner>,
    pub implementer: Arc<FakeImplementer>,
    pub verifier: Arc<FakeVerifier>,
}

impl FakeCollaborators {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            analyzer: self.analyzer.clone(),
            extractor: self.extractor.clone(),
            planner: self.planner.clone(),
            implementer: self.implementer.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

/// Limiter with a 1ms spacing and a low ceiling.
#[must_use]
pub fn fast_limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(RateLimitPolicy {
        min_interval: Duration::from_millis(1),
        backoff_multiplier: 2.0,
        max_delay: Duration::from_millis(20),
        reset_after_clean: 2,
    }))
}

#[must_use]
pub fn sample_request(slug: &str) -> CloneRequest {
    CloneRequest::new(format!("https://example.com/{slug}"), "Landing", slug)
}

#[must_use]
pub fn sample_inputs() -> PhaseInputs {
    PhaseInputs {
        analyze: AnalyzeInput {
            snapshot: "<main><h1>Build faster</h1><a href=\"/signup\">Sign up</a></main>".into(),
            title: "Landing".into(),
            breakpoints: vec![375, 768, 1280],
        },
        markup: "<main><h1>Build faster</h1></main>".into(),
        verify: VerifyCapture {
            source_snapshot: "<main>source</main>".into(),
            clone_snapshot: "<main>clone</main>".into(),
            extras: serde_json::Value::Null,
        },
    }
}

/// Orchestrator over `store` with the fakes and a fast limiter.
#[must_use]
pub fn orchestrator(
    request: CloneRequest,
    fakes: &FakeCollaborators,
    store: ProgressStore,
) -> CloneOrchestrator {
    CloneOrchestrator::new(request, fakes.collaborators(), store, fast_limiter())
}
