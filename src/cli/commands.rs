//! Command implementations
//!
//! Each `execute_*` function prints its own output. The `render_*` helpers
//! build that output so it can be tested without capturing stdout.

use anyhow::{Context, Result};
use serde_json::json;
use std::fmt::Write as _;

use crate::error::{ProgressError, render_for_user};
use crate::{
    ClassifiedError, CloneError, ErrorContext, PhaseKind, ProgressRecord, ProgressStore,
    RecoveryStrategy, acknowledge_intervention, classify, resolve,
};

/// Number of error log entries shown by `status`.
const STATUS_ERROR_TAIL: usize = 5;

/// Active record for `slug`, falling back to the archive.
async fn find_record(store: &ProgressStore, slug: &str) -> Result<(ProgressRecord, bool)> {
    if let Some(record) = store.read(slug).await? {
        return Ok((record, false));
    }
    if let Some(record) = store.read_archived(slug).await? {
        return Ok((record, true));
    }
    Err(CloneError::from(ProgressError::NotFound {
        slug: slug.to_string(),
    })
    .into())
}

pub async fn execute_status_command(store: &ProgressStore, slug: &str, json: bool) -> Result<()> {
    let (record, archived) = find_record(store, slug).await?;
    if json {
        let output = serde_json::to_string_pretty(&record)
            .with_context(|| format!("Failed to serialize progress record for {slug}"))?;
        println!("{output}");
    } else {
        print!("{}", render_status(&record, archived));
    }
    Ok(())
}

#[must_use]
pub fn render_status(record: &ProgressRecord, archived: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Clone: {}", record.page_slug);
    let _ = writeln!(out, "  Source: {}", record.source_url);
    let location = if archived { " (archived)" } else { "" };
    let _ = writeln!(out, "  Status: {}{location}", record.status);
    let _ = writeln!(out, "  Updated: {}", record.updated_at.to_rfc3339());
    let _ = writeln!(out, "  Phases:");
    for phase in PhaseKind::ALL {
        let state = record.phase(phase);
        let _ = write!(out, "    {phase}: {}", state.status);
        if state.attempts > 0 {
            let _ = write!(out, " (attempts: {})", state.attempts);
        }
        if let Some(error) = &state.error {
            let _ = write!(out, " - {error}");
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "  Verification attempts: {}",
        record.verification_attempts
    );
    let _ = writeln!(
        out,
        "  Files: {} created, {} modified",
        record.files_created.len(),
        record.files_modified.len()
    );

    if !record.errors.is_empty() {
        let skipped = record.errors.len().saturating_sub(STATUS_ERROR_TAIL);
        let _ = writeln!(out, "  Errors ({}):", record.errors.len());
        for entry in &record.errors[skipped..] {
            let _ = write!(out, "    [{}] {}", entry.phase, entry.message);
            if let Some(resolution) = &entry.resolution {
                let _ = write!(out, " (resolution: {resolution})");
            }
            out.push('\n');
        }
    }
    out
}

pub async fn execute_list_command(store: &ProgressStore, archived: bool, json: bool) -> Result<()> {
    let records = if archived {
        store.list_archived().await?
    } else {
        store.list_active().await?
    };

    if json {
        let rows: Vec<_> = records
            .iter()
            .map(|r| {
                json!({
                    "page_slug": r.page_slug,
                    "source_url": r.source_url,
                    "status": r.status,
                    "next_phase": r.first_incomplete_phase(),
                    "updated_at": r.updated_at,
                })
            })
            .collect();
        let output =
            serde_json::to_string_pretty(&rows).context("Failed to serialize clone list")?;
        println!("{output}");
    } else {
        print!("{}", render_list(&records, archived));
    }
    Ok(())
}

#[must_use]
pub fn render_list(records: &[ProgressRecord], archived: bool) -> String {
    let mut out = String::new();
    if records.is_empty() {
        let which = if archived { "archived" } else { "active" };
        let _ = writeln!(out, "No {which} clones");
        return out;
    }
    for record in records {
        let next = record
            .first_incomplete_phase()
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        let _ = writeln!(
            out,
            "{:<32} {:<20} next: {:<10} {}",
            record.page_slug, record.status, next, record.source_url
        );
    }
    out
}

fn classification_context(phase: Option<&str>, url: Option<&str>) -> Result<ErrorContext> {
    let mut ctx = ErrorContext::default();
    if let Some(name) = phase {
        let phase = PhaseKind::parse(name).with_context(|| {
            format!("Unknown phase '{name}' (expected analyze, extract, plan, implement or verify)")
        })?;
        ctx.phase = Some(phase);
    }
    if let Some(url) = url {
        ctx = ctx.with_source_url(url);
    }
    Ok(ctx)
}

/// Classify `message` and pair it with its recovery strategy.
pub fn classify_message(
    message: &str,
    phase: Option<&str>,
    url: Option<&str>,
) -> Result<(ClassifiedError, RecoveryStrategy)> {
    let ctx = classification_context(phase, url)?;
    let classification = classify(message, &ctx);
    let strategy = resolve(&classification);
    Ok((classification, strategy))
}

#[must_use]
pub fn render_classification(
    classification: &ClassifiedError,
    strategy: &RecoveryStrategy,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Classification: {} / {}",
        classification.domain(),
        classification.code_str()
    );
    let _ = writeln!(out, "Retryable: {}", classification.is_retryable());
    let _ = writeln!(out, "Action: {}", strategy.action);
    if let Some(delay) = strategy.delay_ms {
        let _ = writeln!(out, "Delay: {delay}ms");
    }
    if let Some(max) = strategy.max_attempts {
        let _ = writeln!(out, "Max attempts: {max}");
    }
    out.push('\n');
    out.push_str(&render_for_user(classification));
    out
}

pub fn execute_classify_command(
    message: &str,
    phase: Option<&str>,
    url: Option<&str>,
    json: bool,
) -> Result<()> {
    let (classification, strategy) = classify_message(message, phase, url)?;
    if json {
        let value = json!({
            "classification": classification,
            "recovery": strategy,
        });
        let output =
            serde_json::to_string_pretty(&value).context("Failed to serialize classification")?;
        println!("{output}");
    } else {
        print!("{}", render_classification(&classification, &strategy));
    }
    Ok(())
}

pub async fn execute_archive_command(store: &ProgressStore, slug: &str) -> Result<()> {
    let record = store.archive(slug).await?;
    println!(
        "Archived {} ({} files created, {} modified)",
        record.page_slug,
        record.files_created.len(),
        record.files_modified.len()
    );
    Ok(())
}

pub async fn execute_ack_command(
    store: &ProgressStore,
    slug: &str,
    resolution: Option<&str>,
) -> Result<()> {
    let before = store.read(slug).await?.map(|r| r.status);
    let resolution = resolution.unwrap_or("acknowledged by operator");
    let record = acknowledge_intervention(store, slug, resolution).await?;

    match before {
        Some(previous) if previous != record.status => {
            println!("{slug}: {previous} -> {}", record.status);
        }
        _ => println!("{slug} is {}; nothing to acknowledge", record.status),
    }
    Ok(())
}
