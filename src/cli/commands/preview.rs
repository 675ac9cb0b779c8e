//! Preview command: summarize a CSV file offline.

use crate::cli::PreviewArgs;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::format::{OutputContext, plural, render_summary};
use crate::source::{CsvSummary, load_rows, summarize};
use crate::sync::{NO_PREFIX, has_collection_prefix};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PreviewReport<'a> {
    file: String,
    #[serde(flatten)]
    summary: &'a CsvSummary,
    /// True when every deck already sits below the configured base deck.
    prefixed: bool,
    malformed_rows: usize,
}

/// Execute the preview command.
///
/// # Errors
///
/// Returns an error if the CSV cannot be read or lacks required columns.
pub fn execute(args: &PreviewArgs, config: &SyncConfig, ctx: &OutputContext) -> Result<()> {
    let loaded = load_rows(&args.csv)?;
    let rows = loaded.rows;
    let summary = summarize(&rows);
    let base = config.base_collection.as_str();
    let prefixed = !base.is_empty() && base != NO_PREFIX && has_collection_prefix(&rows, base);

    if ctx.is_json() {
        ctx.json_pretty(&PreviewReport {
            file: args.csv.display().to_string(),
            summary: &summary,
            prefixed,
            malformed_rows: loaded.malformed,
        });
        return Ok(());
    }

    if loaded.malformed > 0 {
        ctx.warn(format!(
            "Skipped {} malformed row{}.",
            loaded.malformed,
            plural(loaded.malformed)
        ));
    }
    if rows.is_empty() {
        ctx.warn(format!("No cards found in '{}'.", args.csv.display()));
        return Ok(());
    }
    for line in render_summary(&summary) {
        ctx.say(line);
    }
    if prefixed {
        ctx.say(String::new());
        ctx.say(format!("All decks already start with '{base}'."));
    }
    Ok(())
}
