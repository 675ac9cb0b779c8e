use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use deck_sync::cli::{self, Cli, RunStatus};
use deck_sync::config;
use deck_sync::format::OutputContext;
use deck_sync::logging::init_logging;
use deck_sync::{ErrorCode, SyncError};
use serde_json::json;
use tracing::{debug, error};

/// Exit status after the user cancels from a prompt.
const EXIT_CANCELLED: u8 = 130;

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(err) = init_logging(args.verbose, args.quiet, args.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {err:#}");
    }

    let ctx = OutputContext::from_flags(args.json, args.quiet);
    let result = config::load_config(Path::new("."), &args.overrides())
        .and_then(|config| {
            debug!(?config, "Resolved configuration");
            cli::run(&args.command, &config, &ctx)
        });

    match result {
        Ok(RunStatus::Completed) => ExitCode::SUCCESS,
        Ok(status @ RunStatus::Cancelled) => {
            if let Some(notice) = status.notice() {
                ctx.warn(notice);
            }
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(err) => report_error(&err, &ctx),
    }
}

fn report_error(err: &SyncError, ctx: &OutputContext) -> ExitCode {
    let code = err.code();
    error!(code = %code, error = %err, "Command failed");

    if ctx.is_json() {
        let body = json!({ "error": { "code": code.as_str(), "message": err.to_string() } });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err}");
        if let Some(hint) = hint_for(err) {
            eprintln!("Hint: {hint}");
        }
    }

    ExitCode::from(u8::try_from(code.exit_code()).unwrap_or(1))
}

fn hint_for(err: &SyncError) -> Option<&'static str> {
    match err {
        SyncError::Unreachable { .. } => {
            Some("start Anki with the AnkiConnect add-on, or pass --endpoint")
        }
        SyncError::MissingColumns { .. } => Some("the CSV needs Deck, Front, Back, Ref and Tags columns"),
        SyncError::MissingItemType { .. } => Some("restore the default Basic and Cloze note types in Anki"),
        _ if err.code() == ErrorCode::MalformedCache => {
            Some("delete the plan file or run a new dry run")
        }
        _ => None,
    }
}
