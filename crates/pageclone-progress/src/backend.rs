use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;
use tokio::sync::Mutex;
use tracing::warn;

use pageclone_utils::atomic_write::write_json_atomic;
use pageclone_utils::error::ProgressError;
use pageclone_utils::paths::{archive_dir, ensure_dir_all, progress_dir};

use crate::model::{ProgressRecord, SCHEMA_VERSION};

/// Storage for progress records, keyed by page slug.
///
/// Implementations must replace a record atomically on `save` and must keep
/// archived records out of the active set.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn load(&self, slug: &str) -> Result<Option<ProgressRecord>, ProgressError>;

    async fn save(&self, record: &ProgressRecord) -> Result<(), ProgressError>;

    /// Move a record from the active set to the archive.
    async fn archive(&self, record: &ProgressRecord) -> Result<(), ProgressError>;

    async fn load_archived(&self, slug: &str) -> Result<Option<ProgressRecord>, ProgressError>;

    async fn list_active(&self) -> Result<Vec<ProgressRecord>, ProgressError>;

    async fn list_archived(&self) -> Result<Vec<ProgressRecord>, ProgressError>;
}

// ============================================================================
// Filesystem backend
// ============================================================================

/// One pretty-printed JSON file per slug:
/// `<state_dir>/progress/<slug>.json` and `<state_dir>/archive/<slug>.json`.
#[derive(Debug, Clone)]
pub struct FsBackend {
    active_dir: Utf8PathBuf,
    archive_dir: Utf8PathBuf,
}

impl FsBackend {
    #[must_use]
    pub fn new(state_dir: &Utf8Path) -> Self {
        Self {
            active_dir: progress_dir(state_dir),
            archive_dir: archive_dir(state_dir),
        }
    }

    #[must_use]
    pub fn active_path(&self, slug: &str) -> Utf8PathBuf {
        self.active_dir.join(format!("{slug}.json"))
    }

    #[must_use]
    pub fn archive_path(&self, slug: &str) -> Utf8PathBuf {
        self.archive_dir.join(format!("{slug}.json"))
    }
}

fn read_record(path: &Utf8Path) -> Result<Option<ProgressRecord>, ProgressError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ProgressError::Corrupt {
                path: path.to_string(),
                reason: format!("read failed: {e}"),
            });
        }
    };
    let record: ProgressRecord =
        serde_json::from_str(&content).map_err(|e| ProgressError::Corrupt {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    if record.schema_version != SCHEMA_VERSION {
        return Err(ProgressError::Corrupt {
            path: path.to_string(),
            reason: format!(
                "unsupported schema_version '{}' (expected '{SCHEMA_VERSION}')",
                record.schema_version
            ),
        });
    }
    Ok(Some(record))
}

fn write_record(path: &Utf8Path, record: &ProgressRecord) -> Result<(), ProgressError> {
    write_json_atomic(path, record).map_err(|e| ProgressError::WriteFailed {
        path: path.to_string(),
        reason: format!("{e:#}"),
    })
}

fn list_dir(dir: &Utf8Path) -> Result<Vec<ProgressRecord>, ProgressError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ProgressError::Corrupt {
                path: dir.to_string(),
                reason: format!("cannot list directory: {e}"),
            });
        }
    };

    let mut records = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if let Some(path) = Utf8Path::from_path(&path)
            && path.extension() == Some("json")
            && let Some(record) = read_record(path)?
        {
            records.push(record);
        }
    }
    records.sort_by(|a, b| a.page_slug.cmp(&b.page_slug));
    Ok(records)
}

async fn blocking<T, F>(op: F) -> Result<T, ProgressError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProgressError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ProgressError::WriteFailed {
            path: "<blocking task>".to_string(),
            reason: e.to_string(),
        })?
}

#[async_trait]
impl RecordBackend for FsBackend {
    async fn load(&self, slug: &str) -> Result<Option<ProgressRecord>, ProgressError> {
        let path = self.active_path(slug);
        blocking(move || read_record(&path)).await
    }

    async fn save(&self, record: &ProgressRecord) -> Result<(), ProgressError> {
        let path = self.active_path(&record.page_slug);
        let record = record.clone();
        blocking(move || write_record(&path, &record)).await
    }

    async fn archive(&self, record: &ProgressRecord) -> Result<(), ProgressError> {
        let active = self.active_path(&record.page_slug);
        let archived = self.archive_path(&record.page_slug);
        let archive_root = self.archive_dir.clone();
        let record = record.clone();
        blocking(move || {
            ensure_dir_all(&archive_root).map_err(|e| ProgressError::WriteFailed {
                path: archive_root.to_string(),
                reason: e.to_string(),
            })?;
            if archived.exists() {
                warn!(slug = %record.page_slug, path = %archived, "Replacing previously archived record");
            }
            write_record(&archived, &record)?;
            match fs::remove_file(&active) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ProgressError::WriteFailed {
                    path: active.to_string(),
                    reason: format!("archived but could not remove active record: {e}"),
                }),
            }
        })
        .await
    }

    async fn load_archived(&self, slug: &str) -> Result<Option<ProgressRecord>, ProgressError> {
        let path = self.archive_path(slug);
        blocking(move || read_record(&path)).await
    }

    async fn list_active(&self) -> Result<Vec<ProgressRecord>, ProgressError> {
        let dir = self.active_dir.clone();
        blocking(move || list_dir(&dir)).await
    }

    async fn list_archived(&self) -> Result<Vec<ProgressRecord>, ProgressError> {
        let dir = self.archive_dir.clone();
        blocking(move || list_dir(&dir)).await
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local backend for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    active: Mutex<HashMap<String, ProgressRecord>>,
    archived: Mutex<HashMap<String, ProgressRecord>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(map: &HashMap<String, ProgressRecord>) -> Vec<ProgressRecord> {
    let mut records: Vec<ProgressRecord> = map.values().cloned().collect();
    records.sort_by(|a, b| a.page_slug.cmp(&b.page_slug));
    records
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn load(&self, slug: &str) -> Result<Option<ProgressRecord>, ProgressError> {
        Ok(self.active.lock().await.get(slug).cloned())
    }

    async fn save(&self, record: &ProgressRecord) -> Result<(), ProgressError> {
        self.active
            .lock()
            .await
            .insert(record.page_slug.clone(), record.clone());
        Ok(())
    }

    async fn archive(&self, record: &ProgressRecord) -> Result<(), ProgressError> {
        let mut archived = self.archived.lock().await;
        if archived
            .insert(record.page_slug.clone(), record.clone())
            .is_some()
        {
            warn!(slug = %record.page_slug, "Replacing previously archived record");
        }
        self.active.lock().await.remove(&record.page_slug);
        Ok(())
    }

    async fn load_archived(&self, slug: &str) -> Result<Option<ProgressRecord>, ProgressError> {
        Ok(self.archived.lock().await.get(slug).cloned())
    }

    async fn list_active(&self) -> Result<Vec<ProgressRecord>, ProgressError> {
        Ok(sorted(&*self.active.lock().await))
    }

    async fn list_archived(&self) -> Result<Vec<ProgressRecord>, ProgressError> {
        Ok(sorted(&*self.archived.lock().await))
    }
}
