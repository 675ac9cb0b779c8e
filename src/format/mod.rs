//! Output formatting for `deck_sync`.
//!
//! Human-readable text goes to stdout unless `--json` or `--quiet` is set;
//! JSON mode prints one pretty document per command. Diagnostics always go
//! to stderr through `tracing`.

mod context;
mod text;

pub use context::{OutputContext, OutputMode, terminal_width};
pub use text::{plural, render_summary, truncate_text};
