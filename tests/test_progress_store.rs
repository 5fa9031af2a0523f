//! File-backed progress store behavior seen from outside the crate.

mod test_support;

use anyhow::Result;
use pageclone::error::ProgressError;
use pageclone::paths::{archive_dir, progress_dir};
use pageclone::{CloneError, OverallStatus, PhaseKind, PhaseStatus, ProgressStore};
use proptest::prelude::*;
use test_support::{fs_store, load};

const URL: &str = "https://example.com/pricing";

#[tokio::test]
async fn test_record_lives_in_progress_dir() -> Result<()> {
    let (store, home) = fs_store();
    store.create(URL, "pricing", false).await?;

    let path = progress_dir(&home.utf8_path()).join("pricing.json");
    assert!(path.is_file());
    let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(on_disk["page_slug"], "pricing");
    assert_eq!(on_disk["status"], "idle");
    assert_eq!(on_disk["phases"]["analyze"]["status"], "pending");
    Ok(())
}

#[tokio::test]
async fn test_file_lists_are_idempotent() -> Result<()> {
    let (store, _home) = fs_store();
    store.create(URL, "pricing", false).await?;

    for _ in 0..3 {
        store
            .append_created_file("pricing", "src/features/pricing/Page.tsx")
            .await?;
        store
            .append_modified_file("pricing", "src/routes.ts")
            .await?;
    }
    store
        .append_created_file("pricing", "src/features/pricing/data.ts")
        .await?;

    let record = load(&store, "pricing").await;
    assert_eq!(
        record.files_created,
        vec![
            "src/features/pricing/Page.tsx".to_string(),
            "src/features/pricing/data.ts".to_string()
        ]
    );
    assert_eq!(record.files_modified, vec!["src/routes.ts".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_archive_requires_completed_status() -> Result<()> {
    let (store, home) = fs_store();
    store.create(URL, "pricing", false).await?;
    store
        .set_overall_status("pricing", OverallStatus::Running)
        .await?;

    let err = store.archive("pricing").await.unwrap_err();
    assert!(matches!(
        err,
        CloneError::Progress(ProgressError::ArchivePrecondition {
            status: OverallStatus::Running,
            ..
        })
    ));
    assert!(store.read("pricing").await?.is_some());

    store
        .set_overall_status("pricing", OverallStatus::Completed)
        .await?;
    store.archive("pricing").await?;

    assert!(store.read("pricing").await?.is_none());
    assert!(
        archive_dir(&home.utf8_path())
            .join("pricing.json")
            .is_file()
    );
    let archived = store.list_archived().await?;
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].status, OverallStatus::Completed);

    // The slug is free for a new clone once archived.
    let fresh = store.create(URL, "pricing", false).await?;
    assert_eq!(fresh.verification_attempts, 0);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_record_is_reported() -> Result<()> {
    let (store, home) = fs_store();
    store.create(URL, "pricing", false).await?;
    let path = progress_dir(&home.utf8_path()).join("pricing.json");
    std::fs::write(&path, "{ not json")?;

    let err = store.read("pricing").await.unwrap_err();
    assert!(matches!(
        err,
        CloneError::Progress(ProgressError::Corrupt { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_error_log_is_append_only() -> Result<()> {
    let (store, _home) = fs_store();
    store.create(URL, "pricing", false).await?;
    store
        .log_error("pricing", PhaseKind::Analyze, "timed out", None)
        .await?;
    store
        .log_error(
            "pricing",
            PhaseKind::Analyze,
            "captcha",
            Some("solved by hand".into()),
        )
        .await?;

    let record = load(&store, "pricing").await;
    let messages: Vec<&str> = record.errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["timed out", "captcha"]);
    assert!(record.errors[0].timestamp <= record.errors[1].timestamp);
    Ok(())
}

#[tokio::test]
async fn test_phase_order_is_enforced_by_store() -> Result<()> {
    let (store, _home) = fs_store();
    store.create(URL, "pricing", false).await?;

    let err = store
        .update_phase("pricing", PhaseKind::Implement, PhaseStatus::InProgress, None)
        .await
        .unwrap_err();
    assert_eq!(err.to_exit_code(), pageclone::ExitCode::PRECONDITION);
    assert_eq!(
        load(&store, "pricing").await.phase_status(PhaseKind::Implement),
        PhaseStatus::Pending
    );
    Ok(())
}

#[tokio::test]
async fn test_list_active_is_sorted_by_slug() -> Result<()> {
    let (store, _home) = fs_store();
    for slug in ["pricing", "about", "home"] {
        store.create(URL, slug, false).await?;
    }
    let slugs: Vec<String> = store
        .list_active()
        .await?
        .into_iter()
        .map(|r| r.page_slug)
        .collect();
    assert_eq!(slugs, vec!["about", "home", "pricing"]);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_verification_attempts_never_decrease(ops in proptest::collection::vec(0u8..3, 1..20)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let store = ProgressStore::in_memory();
            store.create(URL, "pricing", false).await.unwrap();
            let mut last = 0;
            for op in ops {
                match op {
                    0 => {
                        let next = store.increment_verification_attempts("pricing").await.unwrap();
                        assert_eq!(next, last + 1);
                    }
                    1 => {
                        store.set_overall_status("pricing", OverallStatus::Paused).await.unwrap();
                    }
                    _ => {
                        store.log_error("pricing", PhaseKind::Verify, "mismatch", None).await.unwrap();
                    }
                }
                let now = store.read("pricing").await.unwrap().unwrap().verification_attempts;
                assert!(now >= last);
                last = now;
            }
        });
    }
}
