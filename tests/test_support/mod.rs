//! Shared helpers for integration tests.
//!
//! Each test file pulls this in with `mod test_support;`, so not every
//! helper is used by every file.

#![allow(dead_code)]

use pageclone::ProgressStore;
use pageclone::paths::{HomeGuard, with_isolated_home};
use pageclone::engine::test_support::{FakeCollaborators, orchestrator, sample_request};
use pageclone::{CloneOrchestrator, ProgressRecord};

/// File-backed store rooted in a fresh temp directory.
///
/// Keep the guard alive for the duration of the test.
pub fn fs_store() -> (ProgressStore, HomeGuard) {
    let home = with_isolated_home();
    let store = ProgressStore::filesystem(&home.utf8_path());
    (store, home)
}

/// Orchestrator for `slug` over `store`, optionally resuming.
pub fn orchestrator_for(
    slug: &str,
    fakes: &FakeCollaborators,
    store: &ProgressStore,
    resume: bool,
) -> CloneOrchestrator {
    orchestrator(
        sample_request(slug).with_resume(resume),
        fakes,
        store.clone(),
    )
}

pub async fn load(store: &ProgressStore, slug: &str) -> ProgressRecord {
    store
        .read(slug)
        .await
        .expect("read progress record")
        .expect("progress record exists")
}
