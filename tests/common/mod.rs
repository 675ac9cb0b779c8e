#![allow(dead_code)]

use deck_sync::model::Row;

pub mod cli;
pub mod http;
pub mod store;

pub fn init_test_logging() {
    deck_sync::logging::init_test_logging();
}

/// A CSV row with empty reference and tags.
pub fn row(collection: &str, front: &str, back: &str) -> Row {
    Row {
        collection: collection.to_string(),
        front: front.to_string(),
        back: back.to_string(),
        ..Row::default()
    }
}

/// A CSV row with tags.
pub fn tagged_row(collection: &str, front: &str, back: &str, tags: &str) -> Row {
    Row {
        tags: tags.to_string(),
        ..row(collection, front, back)
    }
}
