//! CSV card source.
//!
//! Reads rows with the `Deck, Front, Back, Ref, Tags` header set, summarizes
//! them for the operator, and finds CSV files below a folder.

use crate::error::{Result, SyncError};
use crate::model::{ItemType, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Columns every import CSV must provide.
pub const REQUIRED_HEADERS: [&str; 5] = ["Deck", "Front", "Back", "Ref", "Tags"];

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "Deck")]
    deck: String,
    #[serde(rename = "Front")]
    front: String,
    #[serde(rename = "Back")]
    back: String,
    #[serde(rename = "Ref")]
    reference: String,
    #[serde(rename = "Tags")]
    tags: String,
}

impl From<CsvRecord> for Row {
    fn from(record: CsvRecord) -> Self {
        Self {
            collection: record.deck,
            front: record.front,
            back: record.back,
            reference: record.reference,
            tags: normalize_tags(&record.tags),
        }
    }
}

/// Replace tag separators so that tags are space-separated only.
#[must_use]
pub fn normalize_tags(raw: &str) -> String {
    raw.replace(',', " ")
}

/// Rows read from one CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRows {
    pub rows: Vec<Row>,
    /// Records that could not be decoded and were skipped.
    pub malformed: usize,
}

impl CsvRows {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load all rows from a CSV file.
///
/// A record with the wrong number of fields or undecodable text is logged
/// and skipped; the rest of the file still loads.
///
/// # Errors
///
/// Returns [`SyncError::MissingColumns`] if any required header is absent,
/// or a CSV/I/O error if the file cannot be read.
pub fn load_rows(path: &Path) -> Result<CsvRows> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;

    let headers: BTreeSet<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();
    let missing: Vec<String> = REQUIRED_HEADERS
        .iter()
        .filter(|required| !headers.contains(**required))
        .map(|required| (*required).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !missing.is_empty() {
        return Err(SyncError::MissingColumns { missing });
    }

    let mut loaded = CsvRows::default();
    for record in reader.deserialize::<CsvRecord>() {
        match record {
            Ok(record) => loaded.rows.push(Row::from(record)),
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    line = err.position().map(csv::Position::line),
                    error = %err,
                    "Skipping malformed CSV record"
                );
                loaded.malformed += 1;
            }
        }
    }

    info!(
        path = %path.display(),
        rows = loaded.rows.len(),
        malformed = loaded.malformed,
        "Loaded CSV rows"
    );
    Ok(loaded)
}

/// Operator-facing overview of a CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CsvSummary {
    pub total: usize,
    pub collections: Vec<String>,
    pub item_types: BTreeMap<ItemType, usize>,
    /// Tag usage counts in first-seen order.
    pub tags: Vec<(String, usize)>,
}

/// Summarize rows by deck, note type and tag.
#[must_use]
pub fn summarize(rows: &[Row]) -> CsvSummary {
    let collections: BTreeSet<&str> = rows.iter().map(|row| row.collection.as_str()).collect();

    let mut item_types = BTreeMap::new();
    let mut tags: Vec<(String, usize)> = Vec::new();
    let mut tag_positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        *item_types.entry(ItemType::classify(&row.front)).or_insert(0) += 1;
        for tag in row.tags.split_whitespace() {
            if let Some(&pos) = tag_positions.get(tag) {
                tags[pos].1 += 1;
            } else {
                tag_positions.insert(tag.to_string(), tags.len());
                tags.push((tag.to_string(), 1));
            }
        }
    }

    CsvSummary {
        total: rows.len(),
        collections: collections.into_iter().map(str::to_string).collect(),
        item_types,
        tags,
    }
}

/// Find every `.csv` file below `folder`, sorted by path.
///
/// # Errors
///
/// Returns an error if the folder cannot be walked.
pub fn discover_csv_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).follow_links(true) {
        let entry = entry.map_err(|err| {
            SyncError::Io(err.into_io_error().unwrap_or_else(|| {
                std::io::Error::other(format!("cannot walk {}", folder.display()))
            }))
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    debug!(folder = %folder.display(), count = files.len(), "Discovered CSV files");
    Ok(files)
}
