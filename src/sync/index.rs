//! Index of notes already present in Anki.
//!
//! The index is built once per reconciliation run and never refreshed while
//! the run is in progress.

use crate::error::Result;
use crate::model::{ExistingItem, ItemType};
use crate::remote::{CardStore, front_query};
use std::collections::HashMap;
use tracing::{debug, info};

/// Existing notes of one note type, keyed by trimmed front text.
pub type ItemIndex = HashMap<String, ExistingItem>;

/// Fetch every note of `item_type` and index it by front text.
///
/// When two remote notes share a front, the one listed last wins.
///
/// # Errors
///
/// Propagates transport and API errors from the store.
pub fn build_index(store: &dyn CardStore, item_type: ItemType) -> Result<ItemIndex> {
    let ids = store.find_items(&front_query(item_type))?;
    if ids.is_empty() {
        debug!(%item_type, "No existing notes");
        return Ok(ItemIndex::new());
    }

    let infos = store.items_info(&ids)?;
    let front_field = item_type.front_field();
    let back_field = item_type.back_field();

    let mut index = ItemIndex::with_capacity(infos.len());
    for info in infos {
        let Some(front) = info.field(front_field) else {
            debug!(note_id = info.note_id, model = %info.model_name, "Note lacks front field");
            continue;
        };
        let back = info.field(back_field).unwrap_or_default();
        index.insert(
            front.trim().to_string(),
            ExistingItem {
                back: back.trim().to_string(),
                remote_id: info.note_id,
            },
        );
    }

    info!(%item_type, notes = index.len(), "Indexed existing notes");
    Ok(index)
}

/// Indexes for every note type the importer writes.
#[derive(Debug, Clone, Default)]
pub struct ExistingIndex {
    by_type: HashMap<ItemType, ItemIndex>,
}

impl ExistingIndex {
    /// Build indexes for all note types.
    ///
    /// # Errors
    ///
    /// Propagates the first store failure.
    pub fn fetch(store: &dyn CardStore) -> Result<Self> {
        let mut by_type = HashMap::new();
        for item_type in ItemType::ALL {
            by_type.insert(item_type, build_index(store, item_type)?);
        }
        Ok(Self { by_type })
    }

    #[must_use]
    pub fn get(&self, item_type: ItemType, front: &str) -> Option<&ExistingItem> {
        self.by_type.get(&item_type).and_then(|index| index.get(front))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
