// ABOUTME: Atomic save and listing of GPX documents in the documents directory.
// ABOUTME: Writes go to a .tmp file that is fsynced and renamed so a crash never leaves half a file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use thiserror::Error;

/// File extension used for every saved document.
pub const GPX_EXTENSION: &str = "gpx";

/// Errors that can occur while saving or listing documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid document name: {0:?}")]
    InvalidName(String),
}

/// Name (without extension) of a recovery file produced at `at`,
/// e.g. `recovery-18-Oct-2026-1405`.
pub fn recovery_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("recovery-{}", at.format("%d-%b-%Y-%H%M"))
}

/// Save GPX text as `<dir>/<name>.gpx` using an atomic write.
/// Creates the directory if needed and replaces any file of the same name.
pub fn save_gpx(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, DocumentError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(DocumentError::InvalidName(name.to_string()));
    }

    fs::create_dir_all(dir)?;

    let final_path = dir.join(format!("{}.{}", name, GPX_EXTENSION));
    let tmp_path = dir.join(format!("{}.{}.tmp", name, GPX_EXTENSION));

    let mut file = File::create(&tmp_path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, &final_path)?;

    // Best-effort: the rename already succeeded
    if let Ok(parent) = File::open(dir) {
        let _ = parent.sync_all();
    }

    Ok(final_path)
}

/// List the GPX files in `dir`, sorted by file name.
/// Returns an empty list if the directory does not exist.
pub fn list_gpx_files(dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == GPX_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}
