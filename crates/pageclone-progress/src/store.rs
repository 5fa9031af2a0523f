use camino::Utf8Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use pageclone_phase_api::{ExtractedData, ImplementationPlan, PageAnalysis};
use pageclone_utils::error::{CloneError, ProgressError};
use pageclone_utils::slug::validate_page_slug;
use pageclone_utils::types::{OverallStatus, PhaseKind, PhaseStatus};

use crate::backend::{FsBackend, MemoryBackend, RecordBackend};
use crate::model::ProgressRecord;

/// Keyed CRUD over [`ProgressRecord`]s.
///
/// Every mutating operation is a load, a pure change and one atomic save of
/// the whole record, so a record on disk is always either the old or the new
/// version. Clones of a store share one write lock, so read-modify-write
/// cycles through the same store never interleave. Separate stores over the
/// same directory are not coordinated; one orchestrator owns a slug at a time.
#[derive(Clone)]
pub struct ProgressStore {
    backend: Arc<dyn RecordBackend>,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore").finish_non_exhaustive()
    }
}

impl ProgressStore {
    #[must_use]
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// File-backed store rooted at `state_dir`.
    #[must_use]
    pub fn filesystem(state_dir: &Utf8Path) -> Self {
        Self::new(Arc::new(FsBackend::new(state_dir)))
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Create the record for `slug`.
    ///
    /// With `resume` set, an existing record is returned unchanged. Without
    /// it, an existing record is an error.
    pub async fn create(
        &self,
        source_url: &str,
        slug: &str,
        resume: bool,
    ) -> Result<ProgressRecord, CloneError> {
        validate_page_slug(slug)?;
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.backend.load(slug).await? {
            if resume {
                debug!(slug, "Reusing existing progress record");
                return Ok(existing);
            }
            return Err(ProgressError::AlreadyExists {
                slug: slug.to_string(),
            }
            .into());
        }

        let record = ProgressRecord::new(source_url, slug);
        self.backend.save(&record).await?;
        info!(slug, source_url, "Created progress record");
        Ok(record)
    }

    pub async fn read(&self, slug: &str) -> Result<Option<ProgressRecord>, CloneError> {
        validate_page_slug(slug)?;
        Ok(self.backend.load(slug).await?)
    }

    pub async fn read_archived(&self, slug: &str) -> Result<Option<ProgressRecord>, CloneError> {
        validate_page_slug(slug)?;
        Ok(self.backend.load_archived(slug).await?)
    }

    /// Change one phase's status. Moving to `InProgress` enforces phase order.
    pub async fn update_phase(
        &self,
        slug: &str,
        phase: PhaseKind,
        status: PhaseStatus,
        error: Option<String>,
    ) -> Result<ProgressRecord, CloneError> {
        let record = self
            .mutate(slug, |r| Ok(r.set_phase_status(phase, status, error)?))
            .await?;
        debug!(slug, phase = %phase, status = %status, "Phase status updated");
        Ok(record)
    }

    pub async fn save_analysis(
        &self,
        slug: &str,
        analysis: PageAnalysis,
    ) -> Result<ProgressRecord, CloneError> {
        self.mutate(slug, |r| {
            r.analysis = Some(analysis);
            Ok(())
        })
        .await
    }

    pub async fn save_extracted(
        &self,
        slug: &str,
        extracted: ExtractedData,
    ) -> Result<ProgressRecord, CloneError> {
        self.mutate(slug, |r| {
            r.extracted = Some(extracted);
            Ok(())
        })
        .await
    }

    pub async fn save_implementation_plan(
        &self,
        slug: &str,
        plan: ImplementationPlan,
    ) -> Result<ProgressRecord, CloneError> {
        self.mutate(slug, |r| {
            r.implementation_plan = Some(plan);
            Ok(())
        })
        .await
    }

    /// Record a created file. Appending a path already present is a no-op.
    pub async fn append_created_file(
        &self,
        slug: &str,
        path: &str,
    ) -> Result<ProgressRecord, CloneError> {
        self.mutate(slug, |r| {
            r.add_created_file(path);
            Ok(())
        })
        .await
    }

    /// Record a modified file. Appending a path already present is a no-op.
    pub async fn append_modified_file(
        &self,
        slug: &str,
        path: &str,
    ) -> Result<ProgressRecord, CloneError> {
        self.mutate(slug, |r| {
            r.add_modified_file(path);
            Ok(())
        })
        .await
    }

    pub async fn log_error(
        &self,
        slug: &str,
        phase: PhaseKind,
        message: &str,
        resolution: Option<String>,
    ) -> Result<ProgressRecord, CloneError> {
        self.mutate(slug, |r| {
            r.push_error(phase, message.to_string(), resolution);
            Ok(())
        })
        .await
    }

    /// Bump the verification attempt counter and return the new value.
    ///
    /// The counter only moves up; archival is the only way a slug starts
    /// over at zero.
    pub async fn increment_verification_attempts(&self, slug: &str) -> Result<u32, CloneError> {
        let record = self
            .mutate(slug, |r| {
                r.verification_attempts = r.verification_attempts.saturating_add(1);
                Ok(())
            })
            .await?;
        Ok(record.verification_attempts)
    }

    /// Allow one verification attempt beyond the current count, whatever the
    /// configured ceiling. Grants never shrink.
    pub async fn grant_verification_attempt(
        &self,
        slug: &str,
    ) -> Result<ProgressRecord, CloneError> {
        let record = self
            .mutate(slug, |r| {
                let next = r.verification_attempts.saturating_add(1);
                r.verification_grant = r.verification_grant.max(next);
                Ok(())
            })
            .await?;
        debug!(slug, grant = record.verification_grant, "Verification attempt granted");
        Ok(record)
    }

    pub async fn set_overall_status(
        &self,
        slug: &str,
        status: OverallStatus,
    ) -> Result<ProgressRecord, CloneError> {
        let record = self
            .mutate(slug, |r| {
                r.status = status;
                Ok(())
            })
            .await?;
        debug!(slug, status = %status, "Overall status updated");
        Ok(record)
    }

    /// Move a `Completed` record to the archive.
    ///
    /// Any other overall status is rejected and the record stays active.
    pub async fn archive(&self, slug: &str) -> Result<ProgressRecord, CloneError> {
        let _guard = self.write_lock.lock().await;
        let record = self.load_existing(slug).await?;
        if record.status != OverallStatus::Completed {
            return Err(ProgressError::ArchivePrecondition {
                slug: slug.to_string(),
                status: record.status,
            }
            .into());
        }
        self.backend.archive(&record).await?;
        info!(slug, "Archived progress record");
        Ok(record)
    }

    pub async fn list_active(&self) -> Result<Vec<ProgressRecord>, CloneError> {
        Ok(self.backend.list_active().await?)
    }

    pub async fn list_archived(&self) -> Result<Vec<ProgressRecord>, CloneError> {
        Ok(self.backend.list_archived().await?)
    }

    async fn load_existing(&self, slug: &str) -> Result<ProgressRecord, CloneError> {
        validate_page_slug(slug)?;
        self.backend.load(slug).await?.ok_or_else(|| {
            ProgressError::NotFound {
                slug: slug.to_string(),
            }
            .into()
        })
    }

    async fn mutate<F>(&self, slug: &str, change: F) -> Result<ProgressRecord, CloneError>
    where
        F: FnOnce(&mut ProgressRecord) -> Result<(), CloneError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_existing(slug).await?;
        change(&mut record)?;
        record.touch();
        self.backend.save(&record).await?;
        Ok(record)
    }
}
