//! Terminal prompts.
//!
//! Duplicate prompts read a single keystroke in raw mode; yes/no and text
//! questions read one line from stdin. Prompts go to stderr so stdout
//! stays clean for `--json` reports.

use crate::error::Result;
use crate::format::truncate_text;
use crate::sync::{Choice, DecisionPrompter, DuplicateContext};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

const DUPLICATE_PROMPT: &str =
    "Add? [y]es, [n]o, [r]eplace, [Y]es to all, [N]o to all, [R]eplace to all (q to quit): ";

/// Columns of each back text shown in a duplicate prompt.
const PREVIEW_WIDTH: usize = 200;

/// Asks about duplicates on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DecisionPrompter for TerminalPrompter {
    fn ask(&mut self, context: &DuplicateContext<'_>) -> Result<Choice> {
        let mut stderr = io::stderr();
        writeln!(stderr)?;
        writeln!(
            stderr,
            "[{}/{}] Duplicate in '{}': {}",
            context.index,
            context.total,
            context.collection,
            truncate_text(context.front, PREVIEW_WIDTH)
        )?;
        writeln!(
            stderr,
            "  Existing back: {}",
            truncate_text(context.existing_back, PREVIEW_WIDTH)
        )?;
        writeln!(
            stderr,
            "  New back:      {}",
            truncate_text(context.proposed_back, PREVIEW_WIDTH)
        )?;
        write!(stderr, "{DUPLICATE_PROMPT}")?;
        stderr.flush()?;

        let key = read_key()?;
        let choice = key_choice(&key);
        match key.code {
            KeyCode::Char(c) => writeln!(stderr, "{c}")?,
            _ => writeln!(stderr)?,
        }
        debug!(row = context.index, ?choice, "Duplicate answered");
        Ok(choice)
    }
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            warn!(error = %err, "Cannot restore terminal mode");
        }
    }
}

fn read_key() -> Result<KeyEvent> {
    let _guard = RawModeGuard::enable()?;
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(key);
            }
        }
    }
}

/// Map a keystroke to a duplicate answer. Ctrl-C, Esc and unknown keys cancel.
fn key_choice(key: &KeyEvent) -> Choice {
    match key.code {
        KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => Choice::Cancel,
        KeyCode::Char(c) => Choice::from_key(c).unwrap_or(Choice::Cancel),
        _ => Choice::Cancel,
    }
}

/// Ask a question on stderr and read the trimmed answer from stdin.
///
/// End of input reads as an empty answer.
///
/// # Errors
///
/// Returns an error if stderr or stdin fail.
pub fn read_answer(prompt: &str) -> Result<String> {
    let stdin = io::stdin();
    read_answer_from(&mut stdin.lock(), &mut io::stderr(), prompt)
}

/// Ask a question and return the lowercased answer, or `default` when the
/// answer is empty.
///
/// # Errors
///
/// Returns an error if stderr or stdin fail.
pub fn prompt_line(prompt: &str, default: &str) -> Result<String> {
    let stdin = io::stdin();
    prompt_line_from(&mut stdin.lock(), &mut io::stderr(), prompt, default)
}

/// Yes/no question; anything starting with `y` is yes.
///
/// # Errors
///
/// Returns an error if stderr or stdin fail.
pub fn confirm(prompt: &str, default_yes: bool) -> Result<bool> {
    let default = if default_yes { "y" } else { "n" };
    Ok(prompt_line(prompt, default)?.starts_with('y'))
}

fn read_answer_from(input: &mut impl BufRead, output: &mut impl Write, prompt: &str) -> Result<String> {
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(output)?;
    }
    Ok(line.trim().to_string())
}

fn prompt_line_from(
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
    default: &str,
) -> Result<String> {
    let answer = read_answer_from(input, output, prompt)?.to_lowercase();
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn keys_map_to_choices() {
        assert_eq!(
            key_choice(&press(KeyCode::Char('y'), KeyModifiers::NONE)),
            Choice::YesOnce
        );
        assert_eq!(
            key_choice(&press(KeyCode::Char('R'), KeyModifiers::SHIFT)),
            Choice::ReplaceAll
        );
    }

    #[test]
    fn escape_ctrl_c_and_unknown_keys_cancel() {
        assert_eq!(
            key_choice(&press(KeyCode::Esc, KeyModifiers::NONE)),
            Choice::Cancel
        );
        assert_eq!(
            key_choice(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Choice::Cancel
        );
        assert_eq!(
            key_choice(&press(KeyCode::Char('x'), KeyModifiers::NONE)),
            Choice::Cancel
        );
        assert_eq!(
            key_choice(&press(KeyCode::Enter, KeyModifiers::NONE)),
            Choice::Cancel
        );
    }

    #[test]
    fn prompt_line_trims_and_lowercases() {
        let mut input = Cursor::new("  YES \n");
        let mut output = Vec::new();
        let answer = prompt_line_from(&mut input, &mut output, "Go? ", "n").unwrap();
        assert_eq!(answer, "yes");
        assert_eq!(String::from_utf8(output).unwrap(), "Go? ");
    }

    #[test]
    fn prompt_line_falls_back_to_default() {
        let mut output = Vec::new();
        let answer = prompt_line_from(&mut Cursor::new("\n"), &mut output, "Go? ", "y").unwrap();
        assert_eq!(answer, "y");

        let answer = prompt_line_from(&mut Cursor::new(""), &mut output, "Go? ", "n").unwrap();
        assert_eq!(answer, "n");
    }

    #[test]
    fn read_answer_keeps_case() {
        let mut output = Vec::new();
        let answer = read_answer_from(&mut Cursor::new(" ATPL::Exam \n"), &mut output, "> ").unwrap();
        assert_eq!(answer, "ATPL::Exam");
    }
}
