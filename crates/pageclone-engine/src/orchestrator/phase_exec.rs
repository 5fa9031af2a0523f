//! Analyze, Extract, Plan and Implement executors.

use std::time::Instant;
use tracing::{Instrument, debug};

use pageclone_phase_api::{AnalyzeInput, PhaseKind, PhaseResult};
use pageclone_recovery::{classify_error, screen_for_bot_detection};
use pageclone_utils::error::CloneError;
use pageclone_utils::logging::phase_span;

use super::{CloneOrchestrator, phase_payload};

impl CloneOrchestrator {
    /// Analyze the captured source page.
    ///
    /// The capture is screened for bot-detection pages first; a hit is a
    /// `Captcha` failure without calling the analyzer.
    pub async fn execute_analyze_phase(
        &mut self,
        input: &AnalyzeInput,
    ) -> Result<PhaseResult, CloneError> {
        let phase = PhaseKind::Analyze;
        let span = phase_span(self.slug(), phase);
        async {
            let started = Instant::now();
            self.begin_phase(phase).await?;

            let ctx = self.error_context(phase);
            if let Some(captcha) = screen_for_bot_detection(&input.snapshot, &ctx) {
                return self.fail_phase(phase, captcha, None).await;
            }

            let analyzer = self.collaborators.analyzer.clone();
            match self
                .call_collaborator(phase, analyzer.analyze(input))
                .await?
            {
                Ok(analysis) => {
                    let payload = phase_payload(phase, &analysis);
                    self.store.save_analysis(self.slug(), analysis).await?;
                    self.succeed_phase(phase, payload, started).await
                }
                Err(err) => {
                    let classified = classify_error(&err, &ctx);
                    self.fail_phase(phase, classified, None).await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Extract structured content from the page markup.
    pub async fn execute_extract_phase(&mut self, markup: &str) -> Result<PhaseResult, CloneError> {
        let phase = PhaseKind::Extract;
        let span = phase_span(self.slug(), phase);
        async {
            let started = Instant::now();
            self.begin_phase(phase).await?;

            let ctx = self.error_context(phase);
            let extractor = self.collaborators.extractor.clone();
            let source_url = self.request.source_url.clone();
            match self
                .call_collaborator(phase, extractor.extract(markup, &source_url))
                .await?
            {
                Ok(extracted) => {
                    debug!(
                        text_blocks = extracted.text_blocks.len(),
                        images = extracted.images.len(),
                        links = extracted.links.len(),
                        "Content extracted"
                    );
                    let payload = phase_payload(phase, &extracted);
                    self.store.save_extracted(self.slug(), extracted).await?;
                    self.succeed_phase(phase, payload, started).await
                }
                Err(err) => {
                    let classified = classify_error(&err, &ctx);
                    self.fail_phase(phase, classified, None).await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Plan the implementation from the persisted analysis and extraction.
    pub async fn execute_plan_phase(&mut self) -> Result<PhaseResult, CloneError> {
        let phase = PhaseKind::Plan;
        let span = phase_span(self.slug(), phase);
        async {
            let started = Instant::now();
            self.begin_phase(phase).await?;

            let record = self.record().await?;
            let Some(analysis) = record.analysis else {
                return Err(self
                    .precondition_failed(phase, "no saved page analysis".to_string())
                    .await);
            };
            let Some(extracted) = record.extracted else {
                return Err(self
                    .precondition_failed(phase, "no saved extracted content".to_string())
                    .await);
            };

            let ctx = self.error_context(phase);
            let options = self.request.plan_options();
            let planner = self.collaborators.planner.clone();
            match self
                .call_collaborator(phase, planner.plan(&analysis, &extracted, &options))
                .await?
            {
                Ok(plan) => {
                    debug!(files = plan.files.len(), route = %plan.route, "Plan produced");
                    let payload = phase_payload(phase, &plan);
                    self.store
                        .save_implementation_plan(self.slug(), plan)
                        .await?;
                    self.succeed_phase(phase, payload, started).await
                }
                Err(err) => {
                    let classified = classify_error(&err, &ctx);
                    self.fail_phase(phase, classified, None).await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Hand the saved plan to the implementer and record the files it reports.
    pub async fn execute_implement_phase(&mut self) -> Result<PhaseResult, CloneError> {
        let phase = PhaseKind::Implement;
        let span = phase_span(self.slug(), phase);
        async {
            let started = Instant::now();
            self.begin_phase(phase).await?;

            let record = self.record().await?;
            let Some(plan) = record.implementation_plan else {
                return Err(self
                    .precondition_failed(phase, "no saved implementation plan".to_string())
                    .await);
            };
            let Some(extracted) = record.extracted else {
                return Err(self
                    .precondition_failed(phase, "no saved extracted content".to_string())
                    .await);
            };

            let mut ctx = self.error_context(phase);
            if let Some(first) = plan.files.first() {
                ctx = ctx.with_file_path(first.path.clone());
            }
            let implementer = self.collaborators.implementer.clone();
            match self
                .call_collaborator(phase, implementer.implement(&plan, &extracted))
                .await?
            {
                Ok(report) => {
                    for path in &report.files_created {
                        self.store.append_created_file(self.slug(), path).await?;
                    }
                    for path in &report.files_modified {
                        self.store.append_modified_file(self.slug(), path).await?;
                    }
                    let payload = phase_payload(phase, &report);
                    self.succeed_phase(phase, payload, started).await
                }
                Err(err) => {
                    let classified = classify_error(&err, &ctx);
                    self.fail_phase(phase, classified, None).await
                }
            }
        }
        .instrument(span)
        .await
    }
}
