//! Plain-text helpers.

use crate::source::CsvSummary;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Cut `text` to at most `max_width` terminal columns.
///
/// Newlines are flattened to spaces so the result fits on one line.
#[must_use]
pub fn truncate_text(text: &str, max_width: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.width() <= max_width {
        return flat;
    }

    let mut out = String::new();
    let mut used = 0;
    for c in flat.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max_width {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}

/// `"s"` unless `count` is one.
#[must_use]
pub const fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// Render a CSV summary as text lines.
#[must_use]
pub fn render_summary(summary: &CsvSummary) -> Vec<String> {
    let mut lines = vec!["=== Deck Hierarchy ===".to_string()];
    for collection in &summary.collections {
        lines.push(format!("  - {collection}"));
    }
    lines.push(String::new());
    lines.push(format!("Total cards: {}", summary.total));
    lines.push(format!("Unique decks: {}", summary.collections.len()));
    lines.push(String::new());
    lines.push("=== Note Types ===".to_string());
    for (item_type, count) in &summary.item_types {
        lines.push(format!("  {item_type}: {count} card{}", plural(*count)));
    }
    if !summary.tags.is_empty() {
        lines.push(String::new());
        lines.push("=== Tags ===".to_string());
        for (tag, count) in &summary.tags {
            lines.push(format!("  #{tag}: {count} card{}", plural(*count)));
        }
    }
    lines
}
