//! Durable progress records for page clone operations
//!
//! A [`ProgressRecord`] is the single source of truth for resuming a clone.
//! [`ProgressStore`] provides keyed CRUD over records on top of a pluggable
//! [`RecordBackend`]: [`FsBackend`] keeps one JSON file per page slug and
//! [`MemoryBackend`] keeps records in process.

mod backend;
mod model;
mod store;

pub use backend::{FsBackend, MemoryBackend, RecordBackend};
pub use model::{ErrorLogEntry, PhaseState, ProgressRecord, SCHEMA_VERSION};
pub use store::ProgressStore;
