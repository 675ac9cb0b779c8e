//! In-memory card store for exercising the sync engines without Anki.

use deck_sync::error::{Result, SyncError};
use deck_sync::model::ItemType;
use deck_sync::remote::{CardStore, FieldValue, ItemInfo, NewItem};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;

/// One call made against the store, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateDeck(String),
    ModelNames,
    Find(String),
    Info(Vec<i64>),
    Add { deck: String, front: String },
    Delete(Vec<i64>),
}

#[derive(Debug, Clone)]
pub struct StoredNote {
    pub deck: String,
    pub item_type: ItemType,
    pub fields: BTreeMap<String, String>,
}

impl StoredNote {
    pub fn front(&self) -> &str {
        self.fields
            .get(self.item_type.front_field())
            .map_or("", String::as_str)
    }

    pub fn back(&self) -> &str {
        self.fields
            .get(self.item_type.back_field())
            .map_or("", String::as_str)
    }
}

pub struct MemoryStore {
    notes: RefCell<BTreeMap<i64, StoredNote>>,
    models: Vec<String>,
    next_id: Cell<i64>,
    calls: RefCell<Vec<Call>>,
    add_attempts: Cell<usize>,
    /// 1-based add attempts that fail with a transport error.
    crash_adds: RefCell<BTreeSet<usize>>,
    /// 1-based add attempts that fail with an API error.
    reject_adds: RefCell<BTreeSet<usize>>,
    failing_deletes: RefCell<BTreeSet<i64>>,
    /// Index lookups fail with a transport error.
    lookups_fail: Cell<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_models(&["Basic", "Cloze"])
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models(models: &[&str]) -> Self {
        Self {
            notes: RefCell::default(),
            models: models.iter().map(|m| (*m).to_string()).collect(),
            next_id: Cell::new(1000),
            calls: RefCell::default(),
            add_attempts: Cell::new(0),
            crash_adds: RefCell::default(),
            reject_adds: RefCell::default(),
            failing_deletes: RefCell::default(),
            lookups_fail: Cell::new(false),
        }
    }

    /// Put a note in the store without recording a call.
    pub fn seed(&self, item_type: ItemType, deck: &str, front: &str, back: &str) -> i64 {
        let id = self.allocate_id();
        let mut fields = BTreeMap::new();
        fields.insert(item_type.front_field().to_string(), front.to_string());
        fields.insert(item_type.back_field().to_string(), back.to_string());
        self.notes.borrow_mut().insert(
            id,
            StoredNote {
                deck: deck.to_string(),
                item_type,
                fields,
            },
        );
        id
    }

    pub fn crash_on_add(&self, attempt: usize) {
        self.crash_adds.borrow_mut().insert(attempt);
    }

    pub fn reject_on_add(&self, attempt: usize) {
        self.reject_adds.borrow_mut().insert(attempt);
    }

    pub fn fail_delete_of(&self, id: i64) {
        self.failing_deletes.borrow_mut().insert(id);
    }

    pub fn fail_lookups(&self) {
        self.lookups_fail.set(true);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn adds(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Add { .. }))
            .collect()
    }

    pub fn notes(&self) -> Vec<(i64, StoredNote)> {
        self.notes
            .borrow()
            .iter()
            .map(|(id, note)| (*id, note.clone()))
            .collect()
    }

    pub fn note_count(&self) -> usize {
        self.notes.borrow().len()
    }

    pub fn has_note(&self, id: i64) -> bool {
        self.notes.borrow().contains_key(&id)
    }

    fn allocate_id(&self) -> i64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn check_lookup(&self) -> Result<()> {
        if self.lookups_fail.get() {
            return Err(connection_reset());
        }
        Ok(())
    }
}

impl CardStore for MemoryStore {
    fn create_collection(&self, name: &str) -> Result<()> {
        self.record(Call::CreateDeck(name.to_string()));
        Ok(())
    }

    fn item_type_names(&self) -> Result<Vec<String>> {
        self.record(Call::ModelNames);
        Ok(self.models.clone())
    }

    fn find_items(&self, query: &str) -> Result<Vec<i64>> {
        self.record(Call::Find(query.to_string()));
        self.check_lookup()?;
        let field = query.trim_end_matches(":*");
        Ok(self
            .notes
            .borrow()
            .iter()
            .filter(|(_, note)| note.fields.get(field).is_some_and(|v| !v.is_empty()))
            .map(|(id, _)| *id)
            .collect())
    }

    fn items_info(&self, ids: &[i64]) -> Result<Vec<ItemInfo>> {
        self.record(Call::Info(ids.to_vec()));
        self.check_lookup()?;
        let notes = self.notes.borrow();
        Ok(ids
            .iter()
            .filter_map(|id| notes.get(id).map(|note| (*id, note)))
            .map(|(id, note)| ItemInfo {
                note_id: id,
                model_name: note.item_type.model_name().to_string(),
                fields: note
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(order, (name, value))| {
                        (
                            name.clone(),
                            FieldValue {
                                value: value.clone(),
                                order: u32::try_from(order).unwrap_or_default(),
                            },
                        )
                    })
                    .collect::<HashMap<_, _>>(),
            })
            .collect())
    }

    fn add_item(&self, item: &NewItem) -> Result<i64> {
        let item_type = if item.model_name == "Cloze" {
            ItemType::ClozeLike
        } else {
            ItemType::Plain
        };
        let front = item
            .fields
            .get(item_type.front_field())
            .cloned()
            .unwrap_or_default();
        self.record(Call::Add {
            deck: item.deck_name.clone(),
            front,
        });

        let attempt = self.add_attempts.get() + 1;
        self.add_attempts.set(attempt);
        if self.crash_adds.borrow().contains(&attempt) {
            return Err(connection_reset());
        }
        if self.reject_adds.borrow().contains(&attempt) {
            return Err(SyncError::remote("addNote", "cannot create note because it is empty"));
        }

        let id = self.allocate_id();
        self.notes.borrow_mut().insert(
            id,
            StoredNote {
                deck: item.deck_name.clone(),
                item_type,
                fields: item.fields.clone(),
            },
        );
        Ok(id)
    }

    fn delete_items(&self, ids: &[i64]) -> Result<()> {
        self.record(Call::Delete(ids.to_vec()));
        if ids.iter().any(|id| self.failing_deletes.borrow().contains(id)) {
            return Err(SyncError::remote("deleteNotes", "note was not found"));
        }
        let mut notes = self.notes.borrow_mut();
        for id in ids {
            notes.remove(id);
        }
        Ok(())
    }
}

fn connection_reset() -> SyncError {
    SyncError::Io(io::Error::new(
        io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    ))
}
