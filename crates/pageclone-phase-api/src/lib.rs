//! Collaborator ports for the page clone workflow
//!
//! The orchestrator never parses pages, extracts content, generates code or
//! drives a browser itself. Each of those jobs sits behind one of the traits
//! in this crate, and the payloads they exchange are defined here so that
//! they can be persisted in progress records.
//!
//! # Purpose
//!
//! This crate is the shared contract between the orchestrator and the
//! implementations plugged into it. Every port returns `anyhow::Result`; the
//! orchestrator classifies whatever error comes back.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use pageclone_utils::types::{PhaseKind, PhaseOutcome};

// ============================================================================
// Payloads
// ============================================================================

/// Input to the analyze port: a raw page capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeInput {
    /// DOM or accessibility snapshot of the source page.
    pub snapshot: String,
    pub title: String,
    /// Viewport widths the page was captured at, if any.
    #[serde(default)]
    pub breakpoints: Vec<u32>,
}

/// Structural analysis of the source page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<String>,
    #[serde(default)]
    pub breakpoints: Vec<u32>,
    /// Analyzer-specific detail carried through untouched.
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub href: String,
    #[serde(default)]
    pub text: String,
}

/// Structured content extracted from the source page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub source_url: String,
    #[serde(default)]
    pub text_blocks: Vec<String>,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

/// Options the orchestrator passes to the planner, taken from the clone request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOptions {
    pub feature_name: String,
    pub page_slug: String,
    pub dynamic_route: bool,
    pub parent_route: Option<String>,
}

/// What kind of artifact a planned file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedFileKind {
    Component,
    Data,
    Service,
    Route,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFile {
    pub path: String,
    pub kind: PlannedFileKind,
}

/// Implementation plan produced by the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationPlan {
    pub feature_name: String,
    pub page_slug: String,
    pub route: String,
    #[serde(default)]
    pub files: Vec<PlannedFile>,
}

/// Files touched by the implementer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationReport {
    #[serde(default)]
    pub files_created: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
}

/// Input to one verification attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyInput {
    pub source_snapshot: String,
    pub clone_snapshot: String,
    /// 1-based attempt number, already persisted when the verifier runs.
    #[serde(default)]
    pub attempt: u32,
    #[serde(default)]
    pub extras: serde_json::Value,
}

/// Verdict of one verification attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub passed: bool,
    pub can_retry: bool,
    #[serde(default)]
    pub fix_suggestions: Vec<String>,
}

// ============================================================================
// Ports
// ============================================================================

#[async_trait]
pub trait PageAnalyzer: Send + Sync {
    async fn analyze(&self, input: &AnalyzeInput) -> Result<PageAnalysis>;
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, markup: &str, source_url: &str) -> Result<ExtractedData>;
}

#[async_trait]
pub trait ImplementationPlanner: Send + Sync {
    async fn plan(
        &self,
        analysis: &PageAnalysis,
        extracted: &ExtractedData,
        options: &PlanOptions,
    ) -> Result<ImplementationPlan>;
}

/// Materializes a plan into files.
///
/// The orchestrator awaits this call and records the files it reports; it
/// knows nothing about how they were produced.
#[async_trait]
pub trait Implementer: Send + Sync {
    async fn implement(
        &self,
        plan: &ImplementationPlan,
        extracted: &ExtractedData,
    ) -> Result<ImplementationReport>;
}

#[async_trait]
pub trait CloneVerifier: Send + Sync {
    async fn verify(&self, input: &VerifyInput) -> Result<VerificationReport>;
}

// ============================================================================
// Results
// ============================================================================

/// Result of executing a phase.
///
/// Appended to the orchestrator's history and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: PhaseKind,
    pub outcome: PhaseOutcome,
    /// Phase output (analysis, extracted data, plan, report) as JSON.
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl PhaseResult {
    #[must_use]
    pub fn success(phase: PhaseKind, payload: serde_json::Value) -> Self {
        Self {
            phase,
            outcome: PhaseOutcome::Success,
            payload,
            errors: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn failed(phase: PhaseKind, errors: Vec<String>) -> Self {
        Self::unsuccessful(phase, PhaseOutcome::Failed, errors)
    }

    #[must_use]
    pub fn needs_retry(phase: PhaseKind, errors: Vec<String>) -> Self {
        Self::unsuccessful(phase, PhaseOutcome::NeedsRetry, errors)
    }

    fn unsuccessful(phase: PhaseKind, outcome: PhaseOutcome, errors: Vec<String>) -> Self {
        Self {
            phase,
            outcome,
            payload: serde_json::Value::Null,
            errors,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == PhaseOutcome::Success
    }
}
