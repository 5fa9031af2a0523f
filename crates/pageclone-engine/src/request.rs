use serde::{Deserialize, Serialize};
use std::sync::Arc;

use pageclone_phase_api::{
    AnalyzeInput, CloneVerifier, ContentExtractor, Implementer, ImplementationPlanner,
    PageAnalyzer, PlanOptions,
};

/// Immutable input of one clone invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRequest {
    pub source_url: String,
    pub feature_name: String,
    pub page_slug: String,
    #[serde(default)]
    pub dynamic_route: bool,
    #[serde(default)]
    pub parent_route: Option<String>,
    /// Continue from an existing progress record instead of starting over.
    #[serde(default)]
    pub resume: bool,
}

impl CloneRequest {
    #[must_use]
    pub fn new(
        source_url: impl Into<String>,
        feature_name: impl Into<String>,
        page_slug: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            feature_name: feature_name.into(),
            page_slug: page_slug.into(),
            dynamic_route: false,
            parent_route: None,
            resume: false,
        }
    }

    #[must_use]
    pub fn with_dynamic_route(mut self, dynamic: bool) -> Self {
        self.dynamic_route = dynamic;
        self
    }

    #[must_use]
    pub fn with_parent_route(mut self, parent: impl Into<String>) -> Self {
        self.parent_route = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Planner options derived from this request.
    #[must_use]
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            feature_name: self.feature_name.clone(),
            page_slug: self.page_slug.clone(),
            dynamic_route: self.dynamic_route,
            parent_route: self.parent_route.clone(),
        }
    }
}

/// The five collaborator ports an orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub analyzer: Arc<dyn PageAnalyzer>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub planner: Arc<dyn ImplementationPlanner>,
    pub implementer: Arc<dyn Implementer>,
    pub verifier: Arc<dyn CloneVerifier>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Verification captures for one attempt, minus the attempt number the
/// orchestrator assigns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyCapture {
    pub source_snapshot: String,
    pub clone_snapshot: String,
    #[serde(default)]
    pub extras: serde_json::Value,
}

/// Everything [`CloneOrchestrator::run`](crate::CloneOrchestrator::run)
/// needs to drive all five phases without further caller input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseInputs {
    pub analyze: AnalyzeInput,
    /// Raw markup handed to the extractor.
    pub markup: String,
    pub verify: VerifyCapture,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_options_follow_request() {
        let request = CloneRequest::new("https://example.com/pricing", "Pricing", "pricing")
            .with_dynamic_route(true)
            .with_parent_route("/marketing");
        let options = request.plan_options();
        assert_eq!(options.feature_name, "Pricing");
        assert_eq!(options.page_slug, "pricing");
        assert!(options.dynamic_route);
        assert_eq!(options.parent_route.as_deref(), Some("/marketing"));
        assert!(!request.resume);
    }
}
