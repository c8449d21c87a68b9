//! Index layer for tokenlint
//!
//! This module provides the persisted token index:
//! - Schema migrations and feature gating
//! - Repository pattern for queries
//! - Full rebuild orchestration
//! - Freshness checking against the live source tree

pub mod builder;
pub mod css;
pub mod freshness;
pub mod schema;
pub mod store;

pub use builder::{BuildReport, BuildStats, IndexBuilder};
pub use freshness::{check_fresh, Freshness};
pub use schema::{feature_available, require_feature, Feature, SCHEMA_VERSION};
pub use store::{IndexContents, IndexStats, IndexStore};
