//! Duplicate reconciliation.
//!
//! Every CSV row is compared with the notes already in Anki and turned into
//! zero or one [`Decision`]:
//!
//! | Remote state                   | Result                                   |
//! |--------------------------------|------------------------------------------|
//! | no note with this front        | insert                                   |
//! | same front, same back          | skipped (re-imports are no-ops)          |
//! | same front, different back     | ask, or follow a session-wide answer     |
//!
//! Session-wide answers (`Y`, `N`, `R`) live in a [`ReconciliationSession`]
//! owned by one [`reconcile`] call, so separate runs never share them.

use super::effective_collection;
use super::index::ExistingIndex;
use crate::error::{Result, SyncError};
use crate::model::{Decision, ExistingItem, ItemType, Row};
use crate::remote::CardStore;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, trace, warn};

/// Answer to a duplicate prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// `y`: add this card alongside the existing one.
    YesOnce,
    /// `n`: skip this card.
    NoOnce,
    /// `r`: replace the existing note with this card.
    ReplaceOnce,
    /// `Y`: add this and every later duplicate.
    YesAll,
    /// `N`: skip this and every later duplicate.
    NoAll,
    /// `R`: replace this and every later duplicate.
    ReplaceAll,
    /// Abort the whole run.
    Cancel,
}

impl Choice {
    /// Keys accepted by the duplicate prompt (case-sensitive).
    pub const KEYS: &'static str = "ynrYNR";

    /// Map a keystroke onto a choice; `None` for anything unrecognized.
    #[must_use]
    pub const fn from_key(key: char) -> Option<Self> {
        match key {
            'y' => Some(Self::YesOnce),
            'n' => Some(Self::NoOnce),
            'r' => Some(Self::ReplaceOnce),
            'Y' => Some(Self::YesAll),
            'N' => Some(Self::NoAll),
            'R' => Some(Self::ReplaceAll),
            'q' | 'Q' => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// What the prompter is shown for one duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateContext<'a> {
    /// 1-based row position.
    pub index: usize,
    pub total: usize,
    pub collection: &'a str,
    pub front: &'a str,
    pub existing_back: &'a str,
    pub proposed_back: &'a str,
}

/// Source of answers for duplicate prompts.
pub trait DecisionPrompter {
    /// Ask how to handle one duplicate.
    ///
    /// # Errors
    ///
    /// An error skips only the current row; return [`Choice::Cancel`] to stop
    /// the run.
    fn ask(&mut self, context: &DuplicateContext<'_>) -> Result<Choice>;
}

/// Prompter that replays a fixed list of answers, then cancels.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    choices: VecDeque<Choice>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    #[must_use]
    pub fn new(choices: impl IntoIterator<Item = Choice>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Fronts of every card the prompter was asked about, in order.
    #[must_use]
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl DecisionPrompter for ScriptedPrompter {
    fn ask(&mut self, context: &DuplicateContext<'_>) -> Result<Choice> {
        self.asked.push(context.front.to_string());
        Ok(self.choices.pop_front().unwrap_or(Choice::Cancel))
    }
}

/// Session-wide duplicate answers. Flags only ever go from unset to set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationSession {
    allow_all: bool,
    disallow_all: bool,
    replace_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowAction {
    Insert { replace_id: Option<i64> },
    Skip,
    Cancel,
}

impl ReconciliationSession {
    /// Session that replaces every duplicate without asking.
    #[must_use]
    pub fn replacing_all() -> Self {
        Self {
            replace_all: true,
            ..Self::default()
        }
    }

    /// Session that skips every duplicate without asking.
    #[must_use]
    pub fn skipping_all() -> Self {
        Self {
            disallow_all: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn allow_all(&self) -> bool {
        self.allow_all
    }

    #[must_use]
    pub const fn disallow_all(&self) -> bool {
        self.disallow_all
    }

    #[must_use]
    pub const fn replace_all(&self) -> bool {
        self.replace_all
    }

    /// True once any session-wide answer has been given.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.allow_all || self.disallow_all || self.replace_all
    }

    /// Record a prompt answer and turn it into a row action.
    fn record(&mut self, choice: Choice, existing: &ExistingItem) -> RowAction {
        match choice {
            Choice::YesOnce => RowAction::Insert { replace_id: None },
            Choice::NoOnce => RowAction::Skip,
            Choice::ReplaceOnce => RowAction::Insert {
                replace_id: Some(existing.remote_id),
            },
            Choice::YesAll => {
                self.allow_all = true;
                RowAction::Insert { replace_id: None }
            }
            Choice::NoAll => {
                self.disallow_all = true;
                RowAction::Skip
            }
            Choice::ReplaceAll => {
                self.replace_all = true;
                RowAction::Insert {
                    replace_id: Some(existing.remote_id),
                }
            }
            Choice::Cancel => RowAction::Cancel,
        }
    }

    /// Action for a duplicate when no prompt is shown.
    fn unattended(&self, existing: &ExistingItem) -> RowAction {
        if self.disallow_all {
            RowAction::Skip
        } else if self.replace_all {
            RowAction::Insert {
                replace_id: Some(existing.remote_id),
            }
        } else {
            RowAction::Insert { replace_id: None }
        }
    }
}

/// Inputs that shape one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Base deck prepended to every row's deck.
    pub prefix: Option<String>,
    /// Ask about differing duplicates (dry runs).
    pub interactive: bool,
    /// Session answers in effect before the first row.
    pub session: ReconciliationSession,
}

/// Result of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub decisions: Vec<Decision>,
    /// Rows identical to an existing note.
    pub exact_matches: usize,
    /// Duplicates skipped by a `n`/`N` answer.
    pub declined: usize,
    /// Rows skipped because processing them failed.
    pub row_errors: usize,
    pub session: ReconciliationSession,
}

/// Whether a run finished or was cancelled from the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Completed(ReconcileReport),
    /// Cancelled while asking about the given 1-based row. No decisions are
    /// returned.
    Cancelled { row: usize },
}

/// Fetch the current remote state and reconcile `rows` against it.
///
/// # Errors
///
/// Returns an error only if the existing-note index cannot be built; row
/// failures are counted in the report instead.
pub fn reconcile(
    store: &dyn CardStore,
    rows: &[Row],
    options: &ReconcileOptions,
    prompter: &mut dyn DecisionPrompter,
) -> Result<ReconcileOutcome> {
    let index = ExistingIndex::fetch(store)?;
    Ok(reconcile_with_index(store, &index, rows, options, prompter))
}

enum RowStep {
    Emit(Decision),
    ExactMatch,
    Declined,
    Cancel,
}

/// Reconcile `rows` against an already-built index.
///
/// Decks are created remotely as rows are visited, even in dry runs.
pub fn reconcile_with_index(
    store: &dyn CardStore,
    index: &ExistingIndex,
    rows: &[Row],
    options: &ReconcileOptions,
    prompter: &mut dyn DecisionPrompter,
) -> ReconcileOutcome {
    let mut session = options.session;
    let mut report = ReconcileReport::default();
    let mut created = HashSet::new();
    let total = rows.len();

    info!(rows = total, interactive = options.interactive, "Reconciling rows");

    for (offset, row) in rows.iter().enumerate() {
        let position = offset + 1;
        let step = reconcile_row(
            store,
            index,
            row,
            position,
            total,
            options,
            &mut session,
            &mut created,
            prompter,
        );

        match step {
            Ok(RowStep::Emit(decision)) => {
                debug!(
                    row = position,
                    deck = %decision.collection,
                    replace_id = ?decision.replace_id,
                    "Approved card"
                );
                report.decisions.push(decision);
            }
            Ok(RowStep::ExactMatch) => {
                trace!(row = position, "Exact match, skipping");
                report.exact_matches += 1;
            }
            Ok(RowStep::Declined) => {
                trace!(row = position, "Duplicate declined");
                report.declined += 1;
            }
            Ok(RowStep::Cancel) => {
                info!(row = position, "Reconciliation cancelled");
                return ReconcileOutcome::Cancelled { row: position };
            }
            Err(err) => {
                warn!(row = position, error = %err, "Skipping row");
                report.row_errors += 1;
            }
        }
    }

    report.session = session;
    info!(
        approved = report.decisions.len(),
        exact = report.exact_matches,
        declined = report.declined,
        errors = report.row_errors,
        "Reconciliation finished"
    );
    ReconcileOutcome::Completed(report)
}

#[allow(clippy::too_many_arguments)]
fn reconcile_row(
    store: &dyn CardStore,
    index: &ExistingIndex,
    row: &Row,
    position: usize,
    total: usize,
    options: &ReconcileOptions,
    session: &mut ReconciliationSession,
    created: &mut HashSet<String>,
    prompter: &mut dyn DecisionPrompter,
) -> Result<RowStep> {
    let collection = effective_collection(&row.collection, options.prefix.as_deref());
    let front = row.front.trim();
    let back = row.back.trim();

    if front.is_empty() {
        return Err(SyncError::validation("Front", "front text is empty"));
    }
    if collection.is_empty() {
        return Err(SyncError::validation("Deck", "deck name is empty"));
    }

    let item_type = ItemType::classify(front);

    if !created.contains(&collection) {
        store.create_collection(&collection)?;
        created.insert(collection.clone());
    }

    let existing = index.get(item_type, front);
    if existing.is_some_and(|existing| existing.back == back) {
        return Ok(RowStep::ExactMatch);
    }

    let action = match existing {
        None => RowAction::Insert { replace_id: None },
        Some(existing) if options.interactive && !session.is_settled() => {
            let context = DuplicateContext {
                index: position,
                total,
                collection: &collection,
                front,
                existing_back: &existing.back,
                proposed_back: back,
            };
            let choice = prompter.ask(&context)?;
            session.record(choice, existing)
        }
        Some(existing) => session.unattended(existing),
    };

    Ok(match action {
        RowAction::Insert { replace_id } => RowStep::Emit(Decision {
            collection,
            front: front.to_string(),
            back: back.to_string(),
            reference: row.reference.trim().to_string(),
            tags: row.tags.split_whitespace().map(str::to_string).collect(),
            item_type,
            replace_id,
        }),
        RowAction::Skip => RowStep::Declined,
        RowAction::Cancel => RowStep::Cancel,
    })
}
