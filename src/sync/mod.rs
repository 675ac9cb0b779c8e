//! CSV → Anki synchronization.
//!
//! This module handles:
//! - Building an index of notes already in Anki ([`index`])
//! - Deciding per row whether to insert, skip or replace ([`reconcile`])
//! - Persisting approved decisions as a replayable plan ([`plan`])
//! - Applying a plan with per-card failure isolation ([`apply`])
//! - Deck prefix handling shared by the steps above

pub mod apply;
pub mod index;
pub mod plan;
pub mod reconcile;

pub use apply::{ApplyReport, FailureKind, FailureLog, ItemFailure, apply};
pub use index::{ExistingIndex, build_index};
pub use plan::{cache_path_for, discard_plan, load_plan, save_plan};
pub use reconcile::{
    Choice, DecisionPrompter, DuplicateContext, ReconcileOptions, ReconcileOutcome,
    ReconcileReport, ReconciliationSession, ScriptedPrompter, reconcile, reconcile_with_index,
};

use crate::error::Result;
use crate::model::Row;

/// Separator between deck hierarchy levels.
pub const COLLECTION_SEPARATOR: &str = "::";

/// Value that means "no prefix" wherever a base deck is configured or typed.
pub const NO_PREFIX: &str = "-";

/// Deck name a row is imported into, after applying an optional prefix.
#[must_use]
pub fn effective_collection(collection: &str, prefix: Option<&str>) -> String {
    let collection = collection.trim();
    match prefix {
        Some(prefix) if !prefix.is_empty() => {
            format!("{prefix}{COLLECTION_SEPARATOR}{collection}")
        }
        _ => collection.to_string(),
    }
}

/// True if every row's deck already is `prefix` or lives below it.
#[must_use]
pub fn has_collection_prefix(rows: &[Row], prefix: &str) -> bool {
    let nested = format!("{prefix}{COLLECTION_SEPARATOR}");
    rows.iter()
        .all(|row| row.collection == prefix || row.collection.starts_with(&nested))
}

/// Pick the deck prefix for an import.
///
/// Headless runs use `default` (or nothing if it is `-`). Interactive runs
/// ask through `ask`, which receives the question and returns the trimmed
/// answer (empty for "accept the default").
///
/// # Errors
///
/// Propagates errors from `ask`.
pub fn resolve_base_collection<F>(
    rows: &[Row],
    default: &str,
    headless: bool,
    mut ask: F,
) -> Result<Option<String>>
where
    F: FnMut(&str) -> Result<String>,
{
    let default = default.trim();
    if headless {
        return Ok(non_empty_prefix(default));
    }

    if !default.is_empty() && default != NO_PREFIX && has_collection_prefix(rows, default) {
        let answer = ask(&format!(
            "All decks in this file already start with '{default}'. Skip adding a base deck prefix? (Y/n): "
        ))?;
        let answer = answer.trim();
        return Ok(match answer.to_lowercase().as_str() {
            "" | "y" | NO_PREFIX => None,
            _ => Some(answer.to_string()),
        });
    }

    let answer = ask(&format!(
        "Enter a base deck name (default = '{default}', or type '-' for none): "
    ))?;
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        non_empty_prefix(default)
    } else {
        non_empty_prefix(answer)
    })
}

fn non_empty_prefix(value: &str) -> Option<String> {
    if value.is_empty() || value == NO_PREFIX {
        None
    } else {
        Some(value.to_string())
    }
}
