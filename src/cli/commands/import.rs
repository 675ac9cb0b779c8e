//! Import command implementation.
//!
//! For each CSV file: reuse an approved plan if one exists, otherwise load
//! the rows, pick a base deck, reconcile against Anki (interactively in a dry
//! run) and apply the result.

use super::apply::apply_decisions;
use crate::cli::prompt::{TerminalPrompter, confirm, read_answer};
use crate::cli::{ImportArgs, RunStatus};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::format::{OutputContext, plural, render_summary};
use crate::model::Decision;
use crate::remote::{AnkiConnect, require_item_types};
use crate::source::{discover_csv_files, load_rows, summarize};
use crate::sync::{
    ApplyReport, ReconcileOptions, ReconcileOutcome, ReconcileReport, ReconciliationSession,
    cache_path_for, discard_plan, load_plan, reconcile, resolve_base_collection, save_plan,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to one CSV file.
#[derive(Debug, Default, Serialize)]
struct FileReport {
    file: String,
    cache_used: bool,
    dry_run: bool,
    /// CSV records skipped before reconciliation.
    malformed_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    approved: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact_matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_errors: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apply: Option<ApplyReport>,
}

impl FileReport {
    fn new(path: &Path) -> Self {
        Self {
            file: path.display().to_string(),
            ..Self::default()
        }
    }

    fn record_reconcile(&mut self, report: &ReconcileReport) {
        self.approved = Some(report.decisions.len());
        self.exact_matches = Some(report.exact_matches);
        self.row_errors = Some(report.row_errors);
    }
}

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if AnkiConnect is unreachable, a CSV is unusable, a
/// required note type is missing, or a prompt fails.
pub fn execute(args: &ImportArgs, config: &SyncConfig, ctx: &OutputContext) -> Result<RunStatus> {
    let client = AnkiConnect::new(config)?;
    client.ensure_reachable()?;

    let files = input_files(args)?;
    if files.is_empty() {
        ctx.warn("No CSV files found.");
        return Ok(RunStatus::Completed);
    }

    let mut reports = Vec::with_capacity(files.len());
    let mut status = RunStatus::Completed;
    for path in &files {
        ctx.say(format!("\n=== {} ===", path.display()));
        let mut report = FileReport::new(path);
        status = import_file(path, args, config, &client, ctx, &mut report)?;
        reports.push(report);
        if status == RunStatus::Cancelled {
            break;
        }
    }

    ctx.json_pretty(&reports);
    Ok(status)
}

fn input_files(args: &ImportArgs) -> Result<Vec<PathBuf>> {
    match (&args.file, &args.folder) {
        (Some(file), _) => Ok(vec![file.clone()]),
        (None, Some(folder)) => discover_csv_files(folder),
        (None, None) => Err(SyncError::Config(
            "either --file or --folder is required".to_string(),
        )),
    }
}

fn import_file(
    path: &Path,
    args: &ImportArgs,
    config: &SyncConfig,
    client: &AnkiConnect,
    ctx: &OutputContext,
    report: &mut FileReport,
) -> Result<RunStatus> {
    let cache_path = cache_path_for(path);

    if let Some(decisions) = cached_decisions(path, args, &cache_path, ctx)? {
        report.cache_used = true;
        report.apply = Some(apply_decisions(client, &decisions, config, ctx)?);
        return Ok(RunStatus::Completed);
    }

    let loaded = load_rows(path)?;
    report.malformed_rows = loaded.malformed;
    if loaded.malformed > 0 {
        ctx.warn(format!(
            "Skipped {} malformed row{} in '{}'; see the log for details.",
            loaded.malformed,
            plural(loaded.malformed),
            path.display()
        ));
    }
    if loaded.is_empty() {
        ctx.warn(format!("No cards found in '{}', skipping.", path.display()));
        return Ok(RunStatus::Completed);
    }
    let rows = loaded.rows;
    for line in render_summary(&summarize(&rows)) {
        ctx.say(line);
    }

    let prefix =
        resolve_base_collection(&rows, &config.base_collection, args.headless, read_answer)?;
    info!(file = %path.display(), prefix = ?prefix, "Resolved base deck");

    require_item_types(client)?;

    let dry_run = args.dry_run
        || (!args.headless && confirm("\nWould you like to do a dry run? (Y/n): ", true)?);
    report.dry_run = dry_run;

    let options = ReconcileOptions {
        prefix,
        interactive: dry_run && !args.headless,
        session: initial_session(args),
    };
    let mut prompter = TerminalPrompter::new();
    let outcome = reconcile(client, &rows, &options, &mut prompter)?;

    let reconciled = match outcome {
        ReconcileOutcome::Completed(reconciled) => reconciled,
        ReconcileOutcome::Cancelled { row } => {
            info!(row, "Dry run cancelled");
            return Ok(RunStatus::Cancelled);
        }
    };
    report.record_reconcile(&reconciled);
    print_reconcile_totals(&reconciled, ctx);

    if !dry_run {
        report.apply = Some(apply_decisions(client, &reconciled.decisions, config, ctx)?);
        return Ok(RunStatus::Completed);
    }

    save_plan(&reconciled.decisions, &cache_path)?;
    if args.headless {
        ctx.say(format!("Approved cards saved to '{}'.", cache_path.display()));
        return Ok(RunStatus::Completed);
    }

    if confirm("Save these approved cards for future imports? (Y/n): ", true)? {
        ctx.say(format!("Approved cards saved to '{}'.", cache_path.display()));
    } else {
        discard_plan(&cache_path)?;
    }

    if confirm("Dry run complete. Proceed with the actual import? (y/N): ", false)? {
        report.apply = Some(apply_decisions(client, &reconciled.decisions, config, ctx)?);
    } else {
        ctx.say("Import skipped.");
    }
    Ok(RunStatus::Completed)
}

/// Decisions from an approved plan, if the user wants to reuse one.
///
/// Dry runs never reuse a plan, since applying it would write to Anki. An
/// explicit `--use-cache` plan must load; a plan found next to the CSV that
/// cannot be read is reported and ignored.
fn cached_decisions(
    csv_path: &Path,
    args: &ImportArgs,
    default_cache: &Path,
    ctx: &OutputContext,
) -> Result<Option<Vec<Decision>>> {
    if args.dry_run {
        debug!(csv = %csv_path.display(), "Dry run, not reusing approved cards");
        return Ok(None);
    }

    if let Some(explicit) = &args.use_cache {
        let decisions = load_plan(explicit)?;
        ctx.say(format!(
            "Using {} approved card{} from '{}'.",
            decisions.len(),
            plural(decisions.len()),
            explicit.display()
        ));
        return Ok(Some(decisions));
    }

    if !default_cache.exists() {
        return Ok(None);
    }

    let wanted = args.headless
        || confirm(
            &format!(
                "Found previously approved cards for '{}'. Use them? (Y/n): ",
                csv_path.display()
            ),
            true,
        )?;
    if !wanted {
        return Ok(None);
    }

    match load_plan(default_cache) {
        Ok(decisions) => {
            ctx.say(format!(
                "Using {} approved card{} from '{}'.",
                decisions.len(),
                plural(decisions.len()),
                default_cache.display()
            ));
            Ok(Some(decisions))
        }
        Err(err @ (SyncError::MalformedCache { .. } | SyncError::Io(_))) => {
            warn!(path = %default_cache.display(), error = %err, "Ignoring unreadable plan");
            ctx.warn(format!("Cannot use cached plan: {err}. Re-reading the CSV."));
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn initial_session(args: &ImportArgs) -> ReconciliationSession {
    if args.overwrite_all {
        ReconciliationSession::replacing_all()
    } else if args.skip_duplicates {
        ReconciliationSession::skipping_all()
    } else {
        ReconciliationSession::default()
    }
}

fn print_reconcile_totals(report: &ReconcileReport, ctx: &OutputContext) {
    let approved = report.decisions.len();
    let replacing = report
        .decisions
        .iter()
        .filter(|decision| decision.is_replacement())
        .count();
    ctx.say(format!(
        "\n{approved} card{} approved ({replacing} replacing existing notes), {} already present, {} declined.",
        plural(approved),
        report.exact_matches,
        report.declined
    ));
    if report.row_errors > 0 {
        ctx.warn(format!(
            "{} row{} could not be processed; see the log for details.",
            report.row_errors,
            plural(report.row_errors)
        ));
    }
}
