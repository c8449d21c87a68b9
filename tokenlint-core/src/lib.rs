//! # tokenlint-core
//!
//! Core library for tokenlint - a design-token linter and refactoring tool
//! for component source trees.
//!
//! This library provides:
//! - A utility-class classifier and class-to-token resolution
//! - A persisted, schema-versioned token index (SQLite)
//! - Cascade resolution over the token dependency graph
//! - A resumable, checkpointed migration engine
//!
//! ## Architecture
//!
//! The index is rebuilt in full on every `build` — the store is replaced,
//! never incrementally patched — and freshness is verified by a content hash
//! over the scanned tree. Queries degrade gracefully against older index
//! schema versions through an explicit feature-gating table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tokenlint_core::{cascade, Config, IndexStore};
//! use std::path::Path;
//!
//! let config = Config::load(Path::new(".")).expect("failed to load config");
//! let store = IndexStore::open(&config.index_path()).expect("no index");
//! let result = cascade::resolve(&store, "--color-accent", 20).expect("query failed");
//! println!("{} dependents", result.dependents.len());
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use extract::{RawUsage, UsageExtractor};
pub use index::{IndexBuilder, IndexStore};
pub use migrate::{MigrationEngine, MigrationPlan};
pub use types::*;

// Public modules
pub mod cascade;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod hash;
pub mod index;
pub mod logging;
pub mod migrate;
pub mod types;
