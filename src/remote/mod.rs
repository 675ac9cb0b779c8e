//! Access to the remote flashcard store.
//!
//! [`CardStore`] is the narrow contract the sync engines depend on; the
//! production implementation is [`AnkiConnect`], which speaks the
//! AnkiConnect JSON-RPC protocol over HTTP.

pub mod anki;

pub use anki::AnkiConnect;

use crate::error::{Result, SyncError};
use crate::model::{Decision, ItemType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Operations the sync pipeline needs from the remote store.
pub trait CardStore {
    /// Create a deck. Creating an existing deck is a no-op.
    fn create_collection(&self, name: &str) -> Result<()>;

    /// Names of all note types known to the store.
    fn item_type_names(&self) -> Result<Vec<String>>;

    /// Note ids matching a search query.
    fn find_items(&self, query: &str) -> Result<Vec<i64>>;

    /// Full details for the given note ids, in one batch.
    fn items_info(&self, ids: &[i64]) -> Result<Vec<ItemInfo>>;

    /// Add a note, returning its new id.
    fn add_item(&self, item: &NewItem) -> Result<i64>;

    /// Delete notes by id.
    fn delete_items(&self, ids: &[i64]) -> Result<()>;
}

/// A single field value as reported by `notesInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    #[serde(default)]
    pub order: u32,
}

/// Note details as reported by `notesInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInfo {
    pub note_id: i64,
    pub model_name: String,
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

impl ItemInfo {
    /// Value of a field, or `None` if the note has no such field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|field| field.value.as_str())
    }
}

/// Options block of an `addNote` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOptions {
    pub allow_duplicate: bool,
}

/// Payload of an `addNote` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub deck_name: String,
    pub model_name: String,
    pub fields: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub options: AddOptions,
}

impl NewItem {
    /// Build the note for a decision.
    ///
    /// Duplicates are allowed because duplicate handling already happened
    /// during reconciliation.
    #[must_use]
    pub fn from_decision(decision: &Decision) -> Self {
        let item_type = decision.item_type;
        let mut fields = BTreeMap::new();
        fields.insert(item_type.front_field().to_string(), decision.front.clone());
        fields.insert(item_type.back_field().to_string(), decision.back.clone());
        fields.insert("Ref".to_string(), decision.reference.clone());
        fields.insert("Tags".to_string(), decision.tags.join(" "));

        Self {
            deck_name: decision.collection.clone(),
            model_name: item_type.model_name().to_string(),
            fields,
            tags: decision.tags.clone(),
            options: AddOptions {
                allow_duplicate: true,
            },
        }
    }
}

/// Search query matching every note with a non-empty front field.
#[must_use]
pub fn front_query(item_type: ItemType) -> String {
    format!("{}:*", item_type.front_field())
}

/// Verify that every note type the importer writes exists remotely.
///
/// # Errors
///
/// Returns [`SyncError::MissingItemType`] naming the first absent type, or a
/// transport error if the store cannot be queried.
pub fn require_item_types(store: &dyn CardStore) -> Result<()> {
    let names = store.item_type_names()?;
    debug!(available = ?names, "Checked note types");
    for item_type in ItemType::ALL {
        if !names.iter().any(|name| name == item_type.model_name()) {
            return Err(SyncError::MissingItemType {
                name: item_type.model_name().to_string(),
            });
        }
    }
    Ok(())
}
