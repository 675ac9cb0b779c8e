//! Apply command implementation.
//!
//! Replays a decision plan saved by an earlier dry run. The plan is applied
//! as-is; remote state is not re-checked.

use crate::cli::{ApplyArgs, RunStatus};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::format::{OutputContext, plural};
use crate::model::Decision;
use crate::remote::{AnkiConnect, CardStore};
use crate::sync::{ApplyReport, FailureLog, apply, load_plan};
use tracing::info;

/// Execute the apply command.
///
/// # Errors
///
/// Returns an error if AnkiConnect is unreachable or the plan cannot be read.
pub fn execute(args: &ApplyArgs, config: &SyncConfig, ctx: &OutputContext) -> Result<RunStatus> {
    let client = AnkiConnect::new(config)?;
    client.ensure_reachable()?;

    let decisions = load_plan(&args.plan)?;
    ctx.say(format!(
        "Loaded {} approved card{} from '{}'.",
        decisions.len(),
        plural(decisions.len()),
        args.plan.display()
    ));

    let report = apply_decisions(&client, &decisions, config, ctx)?;
    ctx.json_pretty(&report);
    Ok(RunStatus::Completed)
}

/// Reset the failure log, apply `decisions` and print the totals.
///
/// # Errors
///
/// Returns an error if a stale failure log cannot be removed.
pub fn apply_decisions(
    store: &dyn CardStore,
    decisions: &[Decision],
    config: &SyncConfig,
    ctx: &OutputContext,
) -> Result<ApplyReport> {
    let log = FailureLog::new(&config.failure_log);
    log.reset()?;

    info!(cards = decisions.len(), "Importing approved cards");
    let progress = ctx.progress_bar(decisions.len());
    let report = apply(store, decisions, &log, &progress);

    ctx.say(format!(
        "Import finished: {} imported, {} failed ({} replacement{}).",
        report.succeeded,
        report.failed,
        report.replaced,
        plural(report.replaced)
    ));
    if log.exists() {
        ctx.warn(format!(
            "Some cards failed to import. See '{}' for details.",
            log.path().display()
        ));
    }
    Ok(report)
}
