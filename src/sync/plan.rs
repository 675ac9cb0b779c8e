//! Decision cache: approved decisions saved as a replayable plan.
//!
//! A plan is a pretty-printed JSON array of [`Decision`]s written next to the
//! CSV it came from (`<stem>_approved.json`). Non-ASCII text is stored
//! literally so the file stays readable and diffable.

use crate::error::{Result, SyncError};
use crate::model::Decision;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to the CSV stem to name its plan file.
pub const PLAN_SUFFIX: &str = "_approved.json";

/// Plan file that belongs to a CSV file.
#[must_use]
pub fn cache_path_for(csv_path: &Path) -> PathBuf {
    let stem = csv_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    csv_path.with_file_name(format!("{stem}{PLAN_SUFFIX}"))
}

/// Write decisions to `path`, replacing any previous plan atomically.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_plan(decisions: &[Decision], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    let file = File::create(&temp_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, decisions)?;
    writeln!(writer)?;
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| SyncError::Io(e.into_error()))?
        .sync_all()?;

    fs::rename(&temp_path, path)?;

    info!(path = %path.display(), decisions = decisions.len(), "Saved decision plan");
    Ok(())
}

/// Read a plan written by [`save_plan`].
///
/// # Errors
///
/// Returns [`SyncError::MalformedCache`] if the file is not a decision list,
/// or an I/O error if it cannot be read.
pub fn load_plan(path: &Path) -> Result<Vec<Decision>> {
    let contents = fs::read_to_string(path)?;
    let decisions: Vec<Decision> =
        serde_json::from_str(&contents).map_err(|err| SyncError::MalformedCache {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    debug!(path = %path.display(), decisions = decisions.len(), "Loaded decision plan");
    Ok(decisions)
}

/// Remove a plan file; a missing file is not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn discard_plan(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
