//! `deck_sync` - CSV to Anki flashcard importer
//!
//! This crate provides the core functionality for the `decksync` CLI tool,
//! which reconciles CSV flashcards with the notes already in Anki and adds,
//! skips or replaces them through the AnkiConnect add-on.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Layered configuration
//! - [`error`] - Error types and exit codes
//! - [`format`] - Output modes and text helpers
//! - [`model`] - Rows, note types and decisions
//! - [`remote`] - The card store contract and its AnkiConnect client
//! - [`source`] - CSV loading and summaries
//! - [`sync`] - Reconciliation, decision plans and apply

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod model;
pub mod remote;
pub mod source;
pub mod sync;

pub use error::{ErrorCode, Result, SyncError};
