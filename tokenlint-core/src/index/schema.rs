//! Index schema, migrations, and feature gating
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! The authoritative schema version for an index file is the `schema_version`
//! key in its `meta` table: an index with no meta row reads as version 0 and
//! supports nothing.

use crate::error::{Error, Result};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: core relations
    r#"
    CREATE TABLE IF NOT EXISTS tokens (
        name             TEXT PRIMARY KEY,
        value            TEXT NOT NULL,
        file             TEXT NOT NULL,
        line             INTEGER NOT NULL,
        layer            INTEGER NOT NULL DEFAULT 0,
        computed_value   TEXT
    );

    CREATE TABLE IF NOT EXISTS usages (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        file             TEXT NOT NULL,
        line             INTEGER NOT NULL,
        col              INTEGER NOT NULL,
        class_name       TEXT NOT NULL,
        resolved_token   TEXT,
        context          TEXT NOT NULL,
        component        TEXT
    );

    CREATE TABLE IF NOT EXISTS patterns (
        hash             TEXT PRIMARY KEY,
        classes          JSON NOT NULL,
        count            INTEGER NOT NULL,
        locations        JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS token_graph (
        ancestor         TEXT NOT NULL,
        descendant       TEXT NOT NULL,
        depth            INTEGER NOT NULL,
        path             JSON NOT NULL,

        PRIMARY KEY (ancestor, descendant)
    );

    CREATE TABLE IF NOT EXISTS meta (
        key              TEXT PRIMARY KEY,
        value            TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_usages_class ON usages(class_name);
    CREATE INDEX IF NOT EXISTS idx_usages_token ON usages(resolved_token);
    CREATE INDEX IF NOT EXISTS idx_usages_file_line ON usages(file, line);
    CREATE INDEX IF NOT EXISTS idx_token_graph_descendant ON token_graph(descendant);
    "#,
    // Version 2: theme variants and component similarity
    r#"
    CREATE TABLE IF NOT EXISTS token_themes (
        token_name       TEXT NOT NULL,
        theme            TEXT NOT NULL,
        value            TEXT NOT NULL,
        source           TEXT NOT NULL,

        PRIMARY KEY (token_name, theme)
    );

    CREATE TABLE IF NOT EXISTS component_graph (
        source           TEXT NOT NULL,
        target           TEXT NOT NULL,
        shared_patterns  INTEGER NOT NULL,

        PRIMARY KEY (source, target)
    );
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::debug!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking index migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running index migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    Ok(())
}

// ============================================
// Feature gating
// ============================================

/// Version-gated index features.
///
/// Every consumer of a gated relation must check availability through this
/// table before querying; queries against an older index degrade to
/// "feature unavailable" rather than error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Tokens,
    Usages,
    Patterns,
    TokenGraph,
    TokenThemes,
    ComponentGraph,
}

impl Feature {
    /// Minimum schema version the feature's relation exists at.
    pub fn min_version(self) -> i32 {
        match self {
            Feature::Tokens | Feature::Usages | Feature::Patterns | Feature::TokenGraph => 1,
            Feature::TokenThemes | Feature::ComponentGraph => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Tokens => "tokens",
            Feature::Usages => "usages",
            Feature::Patterns => "patterns",
            Feature::TokenGraph => "token_graph",
            Feature::TokenThemes => "token_themes",
            Feature::ComponentGraph => "component_graph",
        }
    }
}

/// Whether `feature` can be queried against an index at `version`.
/// Version 0 (no metadata) supports nothing.
pub fn feature_available(version: i32, feature: Feature) -> bool {
    version >= feature.min_version()
}

/// Fail fast when a caller requires a feature the index does not have.
pub fn require_feature(version: i32, feature: Feature) -> Result<()> {
    if feature_available(version, feature) {
        Ok(())
    } else {
        Err(Error::SchemaVersion {
            feature: feature.as_str(),
            required: feature.min_version(),
            current: version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = [
            "tokens",
            "usages",
            "patterns",
            "token_graph",
            "meta",
            "token_themes",
            "component_graph",
        ];

        for table in tables {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_feature_gating_table() {
        assert!(feature_available(1, Feature::Tokens));
        assert!(feature_available(1, Feature::TokenGraph));
        assert!(!feature_available(1, Feature::TokenThemes));
        assert!(!feature_available(1, Feature::ComponentGraph));
        assert!(feature_available(2, Feature::TokenThemes));

        // Version 0 supports nothing
        for feature in [
            Feature::Tokens,
            Feature::Usages,
            Feature::Patterns,
            Feature::TokenGraph,
            Feature::TokenThemes,
            Feature::ComponentGraph,
        ] {
            assert!(!feature_available(0, feature));
        }
    }

    #[test]
    fn test_require_feature_error_names_versions() {
        let err = require_feature(1, Feature::TokenThemes).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("token_themes"));
        assert!(message.contains("v2"));
        assert!(message.contains("v1"));
    }
}
