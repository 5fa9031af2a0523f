use camino::Utf8PathBuf;
use std::cell::RefCell;

// Thread-local override used only in tests to avoid process-global env races.
thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// Environment variable that relocates the state directory.
pub const HOME_ENV: &str = "PAGECLONE_HOME";

/// Resolve the pageclone state directory:
/// 1) thread-local override (tests use this)
/// 2) env `PAGECLONE_HOME`
/// 3) default ".pageclone"
#[must_use]
pub fn pageclone_home() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var(HOME_ENV) {
        return Utf8PathBuf::from(p);
    }
    Utf8PathBuf::from(".pageclone")
}

/// Returns `<state_dir>/progress`, the active record set
#[must_use]
pub fn progress_dir(state_dir: &camino::Utf8Path) -> Utf8PathBuf {
    state_dir.join("progress")
}

/// Returns `<state_dir>/archive`, where completed records are moved
#[must_use]
pub fn archive_dir(state_dir: &camino::Utf8Path) -> Utf8PathBuf {
    state_dir.join("archive")
}

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<std::path::Path>>(p: P) -> std::io::Result<()> {
    match std::fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// RAII guard for isolated home that clears thread-local state on drop
#[cfg(any(test, feature = "test-utils"))]
pub struct HomeGuard {
    inner: tempfile::TempDir,
}

#[cfg(any(test, feature = "test-utils"))]
impl Drop for HomeGuard {
    fn drop(&mut self) {
        THREAD_HOME.with(|tl| *tl.borrow_mut() = None);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl std::ops::Deref for HomeGuard {
    type Target = tempfile::TempDir;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl HomeGuard {
    /// The isolated home as a UTF-8 path.
    #[must_use]
    pub fn utf8_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.inner.path().to_path_buf())
            .unwrap_or_else(|p| Utf8PathBuf::from(p.to_string_lossy().into_owned()))
    }
}

/// Test helper: not part of public API stability guarantees.
///
/// Give this test a unique state directory under the system temp dir.
/// Hold the `HomeGuard` for the test's duration so the directory stays alive.
/// The override is per thread, so use it with current-thread runtimes only.
#[cfg(any(test, feature = "test-utils"))]
#[must_use]
pub fn with_isolated_home() -> HomeGuard {
    #[allow(clippy::expect_used)]
    let td = tempfile::TempDir::new().expect("create temp home");
    let guard = HomeGuard { inner: td };
    let p = guard.utf8_path();
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(p));
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_home_overrides_and_resets() {
        let expected = {
            let guard = with_isolated_home();
            let home = pageclone_home();
            assert_eq!(home, guard.utf8_path());
            assert_eq!(progress_dir(&home), home.join("progress"));
            assert_eq!(archive_dir(&home), home.join("archive"));
            home
        };
        assert_ne!(pageclone_home(), expected);
    }

    #[test]
    fn test_ensure_dir_all_is_idempotent() {
        let guard = with_isolated_home();
        let dir = guard.utf8_path().join("a/b/c");
        ensure_dir_all(&dir).unwrap();
        ensure_dir_all(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
