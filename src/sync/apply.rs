//! Apply a decision plan to Anki.
//!
//! Decisions are applied strictly in order. A failing card is written to the
//! failure log and counted; it never stops the rest of the batch.

use crate::error::{Result, SyncError};
use crate::format::truncate_text;
use crate::model::Decision;
use crate::remote::{CardStore, NewItem};
use indicatif::ProgressBar;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Columns of front text kept in failure log lines.
pub const FAILURE_FRONT_WIDTH: usize = 50;

/// How a card failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// AnkiConnect answered with an error.
    Failed,
    /// The request never produced a usable answer.
    Crashed,
}

impl FailureKind {
    fn of(err: &SyncError) -> Self {
        match err {
            SyncError::Remote { .. } => Self::Failed,
            _ => Self::Crashed,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Crashed => "crashed",
        }
    }
}

/// Why one card did not import cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// 1-based position in the plan.
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

/// Append-only log of failed cards.
///
/// The file is opened and closed for every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if any failure has been logged since the last reset.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the log left by a previous run.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing log cannot be removed.
    pub fn reset(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Append one failure line.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be opened or written.
    pub fn record(&self, decision: &Decision, failure: &ItemFailure) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_failure_line(decision, failure))?;
        Ok(())
    }
}

/// One failure log line.
#[must_use]
pub fn format_failure_line(decision: &Decision, failure: &ItemFailure) -> String {
    format!(
        "Card {} {} - [{}] {}...: {}",
        failure.index,
        failure.kind.as_str(),
        decision.collection,
        truncate_text(&decision.front, FAILURE_FRONT_WIDTH),
        failure.message
    )
}

/// Totals for one apply run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Decisions that deleted an existing note first.
    pub replaced: usize,
    pub failures: Vec<ItemFailure>,
}

impl ApplyReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Apply decisions in order, isolating per-card failures.
///
/// Replacements delete the old note first; a failed delete is reported for
/// that card but the add is still attempted. Progress is reported on
/// `progress` after every card.
pub fn apply(
    store: &dyn CardStore,
    decisions: &[Decision],
    log: &FailureLog,
    progress: &ProgressBar,
) -> ApplyReport {
    let mut report = ApplyReport {
        total: decisions.len(),
        ..ApplyReport::default()
    };
    progress.set_length(decisions.len() as u64);

    info!(cards = decisions.len(), "Applying decisions");

    for (offset, decision) in decisions.iter().enumerate() {
        let index = offset + 1;
        if decision.is_replacement() {
            report.replaced += 1;
        }

        match apply_one(store, decision) {
            Ok(note_id) => {
                report.succeeded += 1;
                debug!(index, note_id, front = %truncate_text(&decision.front, 40), "Card imported");
            }
            Err((kind, message)) => {
                report.failed += 1;
                let failure = ItemFailure {
                    index,
                    kind,
                    message,
                };
                warn!(index, error = %failure.message, "Card failed");
                if let Err(log_err) = log.record(decision, &failure) {
                    warn!(path = %log.path().display(), error = %log_err, "Cannot write failure log");
                }
                report.failures.push(failure);
            }
        }

        progress.set_position(index as u64);
        progress.set_message(format!(
            "{} ok, {} failed",
            report.succeeded, report.failed
        ));
    }

    progress.finish();
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        replaced = report.replaced,
        "Apply finished"
    );
    report
}

fn apply_one(store: &dyn CardStore, decision: &Decision) -> Result<i64, (FailureKind, String)> {
    let delete_error = decision
        .replace_id
        .and_then(|id| store.delete_items(&[id]).err().map(|err| (id, err)));

    let note_id = store
        .add_item(&NewItem::from_decision(decision))
        .map_err(|err| (FailureKind::of(&err), err.to_string()))?;

    match delete_error {
        None => Ok(note_id),
        Some((id, err)) => Err((
            FailureKind::of(&err),
            format!("added as note {note_id}, but deleting note {id} failed: {err}"),
        )),
    }
}
