//! Atomic file replacement for progress records.
//!
//! Every write goes to a temporary file in the target directory, is fsynced,
//! then renamed over the target. A reader either sees the previous record or
//! the new one, never a partial write.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::Serialize;
use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

/// Atomically write content to a file using temp file + fsync + rename.
///
/// Line endings are normalized to LF. Missing parent directories are created.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    let normalized_content = normalize_line_endings(content);

    let parent = match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {parent}"))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {parent}"))?;

    temp_file
        .write_all(normalized_content.as_bytes())
        .with_context(|| "Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync temporary file")?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to atomically write file: {path}"))?;

    Ok(())
}

/// Serialize `value` as pretty JSON (trailing newline) and write it atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Utf8Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize JSON for {path}"))?;
    json.push('\n');
    write_file_atomic(path, &json)
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}
