//! Core data types: CSV rows, note types, remote lookups and decisions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker that identifies cloze text in a front field.
pub const CLOZE_MARKER: &str = "{{c";

/// One CSV row as read from disk (tags already comma-normalized).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    /// `::`-separated deck hierarchy.
    pub collection: String,
    pub front: String,
    pub back: String,
    pub reference: String,
    /// Space-separated tags.
    pub tags: String,
}

/// Note type a card is imported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "Basic")]
    Plain,
    #[serde(rename = "Cloze")]
    ClozeLike,
}

impl ItemType {
    pub const ALL: [Self; 2] = [Self::Plain, Self::ClozeLike];

    /// Classify a card by its front text.
    #[must_use]
    pub fn classify(front: &str) -> Self {
        if front.contains(CLOZE_MARKER) {
            Self::ClozeLike
        } else {
            Self::Plain
        }
    }

    /// Anki model name.
    #[must_use]
    pub const fn model_name(self) -> &'static str {
        match self {
            Self::Plain => "Basic",
            Self::ClozeLike => "Cloze",
        }
    }

    /// Field holding the card's question side.
    #[must_use]
    pub const fn front_field(self) -> &'static str {
        match self {
            Self::Plain => "Front",
            Self::ClozeLike => "Text",
        }
    }

    /// Field holding the card's answer side.
    #[must_use]
    pub const fn back_field(self) -> &'static str {
        match self {
            Self::Plain => "Back",
            Self::ClozeLike => "Back Extra",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

/// A note already present in Anki, keyed elsewhere by its trimmed front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingItem {
    pub back: String,
    pub remote_id: i64,
}

/// One approved insert, optionally replacing an existing note.
///
/// This is the unit stored in the decision cache; the serde names keep the
/// cache readable by older tooling that wrote `deck`/`ref`/`model` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "deck")]
    pub collection: String,
    pub front: String,
    pub back: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub tags: Vec<String>,
    #[serde(rename = "model")]
    pub item_type: ItemType,
    #[serde(default)]
    pub replace_id: Option<i64>,
}

impl Decision {
    #[must_use]
    pub const fn is_replacement(&self) -> bool {
        self.replace_id.is_some()
    }
}
