//! Operator controls that act on a progress record without running phases.

use tracing::{debug, info};

use pageclone_phase_api::PhaseKind;
use pageclone_progress::{ProgressRecord, ProgressStore};
use pageclone_utils::error::{CloneError, ProgressError};
use pageclone_utils::types::OverallStatus;

async fn load(store: &ProgressStore, slug: &str) -> Result<ProgressRecord, CloneError> {
    store.read(slug).await?.ok_or_else(|| {
        ProgressError::NotFound {
            slug: slug.to_string(),
        }
        .into()
    })
}

/// Move an `Idle` or `Running` clone to `Paused`.
///
/// Any other status is left alone and the record is returned unchanged.
pub async fn pause_clone(store: &ProgressStore, slug: &str) -> Result<ProgressRecord, CloneError> {
    let record = load(store, slug).await?;
    match record.status {
        OverallStatus::Idle | OverallStatus::Running => {
            let record = store.set_overall_status(slug, OverallStatus::Paused).await?;
            info!(slug, "Clone paused");
            Ok(record)
        }
        status => {
            debug!(slug, status = %status, "Pause ignored");
            Ok(record)
        }
    }
}

/// Hand a clone back to the orchestrator after an operator has dealt with
/// whatever put it in `AwaitingUserInput` or `Failed`.
///
/// Appends a resolution entry to the error log and sets the status to
/// `Running`. Phase states and the verification counter are untouched. Once
/// verification has started, each acknowledgement grants exactly one
/// further attempt beyond the attempts already made.
pub async fn acknowledge_intervention(
    store: &ProgressStore,
    slug: &str,
    resolution: &str,
) -> Result<ProgressRecord, CloneError> {
    let record = load(store, slug).await?;
    if !record.status.needs_intervention() {
        debug!(slug, status = %record.status, "Nothing to acknowledge");
        return Ok(record);
    }

    let phase = record
        .first_incomplete_phase()
        .unwrap_or(PhaseKind::Verify);
    store
        .log_error(
            slug,
            phase,
            &format!("operator acknowledged {} clone", record.status),
            Some(resolution.to_string()),
        )
        .await?;
    if record.verification_attempts > 0 {
        store.grant_verification_attempt(slug).await?;
    }
    let record = store
        .set_overall_status(slug, OverallStatus::Running)
        .await?;
    info!(slug, phase = %phase, "Intervention acknowledged, clone running");
    Ok(record)
}
