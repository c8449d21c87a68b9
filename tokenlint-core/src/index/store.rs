//! Index repository layer
//!
//! Provides query and rebuild operations over the five index relations.
//! An [`IndexStore`] is opened once at command entry, passed by reference to
//! every component that needs it, and released when dropped — on every exit
//! path, including errors.

use crate::error::{Error, Result};
use crate::index::schema;
use crate::types::*;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// Everything a full rebuild writes, in one unit.
#[derive(Debug, Default)]
pub struct IndexContents {
    pub tokens: Vec<TokenDefinition>,
    pub themes: Vec<ThemeVariant>,
    pub usages: Vec<UsageRecord>,
    pub patterns: Vec<PatternRecord>,
    pub token_edges: Vec<TokenGraphEdge>,
    pub component_edges: Vec<ComponentGraphEdge>,
    pub source_tree_hash: String,
}

/// Row counts across the index relations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub tokens: i64,
    pub theme_variants: i64,
    pub usages: i64,
    pub patterns: i64,
    pub token_edges: i64,
    pub component_edges: i64,
}

/// Index database handle (single connection)
#[derive(Debug)]
pub struct IndexStore {
    conn: Mutex<Connection>,
}

impl IndexStore {
    /// Open an existing index for querying.
    ///
    /// Does NOT migrate: an index written by an older release keeps its
    /// schema version, and queries degrade through the feature guard.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::IndexMissing(path.display().to_string()));
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open (creating if needed) an index for building, migrated to the
    /// current schema version.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory index (for testing), migrated to current.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run schema migrations on this index
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Meta
    // ============================================

    /// Schema version recorded in the meta relation.
    ///
    /// Returns 0 when the meta relation or the version key is absent — an
    /// index that old (or that foreign) supports no features.
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self.conn.lock().unwrap();
        let has_meta: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='meta'",
            [],
            |r| r.get(0),
        )?;
        if has_meta == 0 {
            return Ok(0);
        }
        let version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |r| r.get(0),
            )
            .optional()?;
        Ok(version.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    /// Full metadata record, if the index has one.
    pub fn meta(&self) -> Result<Option<IndexMeta>> {
        let version = self.schema_version()?;
        if version == 0 {
            return Ok(None);
        }

        let conn = self.conn.lock().unwrap();
        let get = |key: &str| -> Result<Option<String>> {
            Ok(conn
                .query_row("SELECT value FROM meta WHERE key = ?", [key], |r| r.get(0))
                .optional()?)
        };

        let hash = match get("source_tree_hash")? {
            Some(h) => h,
            None => return Ok(None),
        };
        let created_at = get("created_at")?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Some(IndexMeta {
            schema_version: version,
            source_tree_hash: hash,
            created_at,
        }))
    }

    // ============================================
    // Rebuild
    // ============================================

    /// Replace the entire index with `contents` in a single transaction.
    ///
    /// There is no incremental path: a build that fails mid-way rolls back,
    /// leaving the previous index intact.
    pub fn rebuild(&self, contents: &IndexContents) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM tokens", [])?;
        tx.execute("DELETE FROM token_themes", [])?;
        tx.execute("DELETE FROM usages", [])?;
        tx.execute("DELETE FROM patterns", [])?;
        tx.execute("DELETE FROM token_graph", [])?;
        tx.execute("DELETE FROM component_graph", [])?;
        tx.execute("DELETE FROM meta", [])?;

        for token in &contents.tokens {
            tx.execute(
                r#"
                INSERT INTO tokens (name, value, file, line, layer, computed_value)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    token.name,
                    token.value,
                    token.file,
                    token.line,
                    token.layer,
                    token.computed_value,
                ],
            )?;
        }

        for variant in &contents.themes {
            tx.execute(
                r#"
                INSERT INTO token_themes (token_name, theme, value, source)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    variant.token_name,
                    variant.theme.as_str(),
                    variant.value,
                    variant.source,
                ],
            )?;
        }

        for usage in &contents.usages {
            tx.execute(
                r#"
                INSERT INTO usages (file, line, col, class_name, resolved_token, context, component)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    usage.file,
                    usage.line,
                    usage.column,
                    usage.class_name,
                    usage.resolved_token,
                    usage.context.as_str(),
                    usage.component,
                ],
            )?;
        }

        for pattern in &contents.patterns {
            tx.execute(
                r#"
                INSERT INTO patterns (hash, classes, count, locations)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    pattern.hash,
                    serde_json::to_string(&pattern.classes)?,
                    pattern.count,
                    serde_json::to_string(&pattern.locations)?,
                ],
            )?;
        }

        for edge in &contents.token_edges {
            tx.execute(
                r#"
                INSERT OR IGNORE INTO token_graph (ancestor, descendant, depth, path)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    edge.ancestor,
                    edge.descendant,
                    edge.depth,
                    serde_json::to_string(&edge.path)?,
                ],
            )?;
        }

        for edge in &contents.component_edges {
            tx.execute(
                r#"
                INSERT INTO component_graph (source, target, shared_patterns)
                VALUES (?1, ?2, ?3)
                "#,
                params![edge.source, edge.target, edge.shared_patterns],
            )?;
        }

        let meta = [
            ("schema_version", schema::SCHEMA_VERSION.to_string()),
            ("source_tree_hash", contents.source_tree_hash.clone()),
            ("created_at", Utc::now().to_rfc3339()),
        ];
        for (key, value) in meta {
            tx.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    // ============================================
    // Token queries
    // ============================================

    /// Get a token definition by name
    pub fn get_token(&self, name: &str) -> Result<Option<TokenDefinition>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM tokens WHERE name = ?", [name], |row| {
            Self::row_to_token(row)
        })
        .optional()
        .map_err(Error::from)
    }

    /// All token names in the index
    pub fn token_names(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT name FROM tokens ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn row_to_token(row: &Row) -> rusqlite::Result<TokenDefinition> {
        Ok(TokenDefinition {
            name: row.get("name")?,
            value: row.get("value")?,
            file: row.get("file")?,
            line: row.get("line")?,
            layer: row.get("layer")?,
            computed_value: row.get("computed_value")?,
        })
    }

    /// Theme variants for a token. Callers must gate on `Feature::TokenThemes`.
    pub fn theme_variants(&self, token_name: &str) -> Result<Vec<ThemeVariant>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT token_name, theme, value, source FROM token_themes WHERE token_name = ? ORDER BY theme",
        )?;
        let variants = stmt
            .query_map([token_name], |row| {
                let theme_str: String = row.get("theme")?;
                Ok(ThemeVariant {
                    token_name: row.get("token_name")?,
                    theme: theme_str.parse().unwrap_or(Theme::Light),
                    value: row.get("value")?,
                    source: row.get("source")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(variants)
    }

    // ============================================
    // Usage queries
    // ============================================

    /// Usages of a literal class name
    pub fn usages_by_class(&self, class_name: &str, limit: usize) -> Result<Vec<UsageRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM usages WHERE class_name = ? ORDER BY file, line LIMIT ?",
        )?;
        let usages = stmt
            .query_map(params![class_name, limit as i64], Self::row_to_usage)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(usages)
    }

    /// Usages keyed by the token a class resolved to
    pub fn usages_by_token(&self, token_name: &str, limit: usize) -> Result<Vec<UsageRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM usages WHERE resolved_token = ? ORDER BY file, line LIMIT ?",
        )?;
        let usages = stmt
            .query_map(params![token_name, limit as i64], Self::row_to_usage)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(usages)
    }

    fn row_to_usage(row: &Row) -> rusqlite::Result<UsageRecord> {
        let context_str: String = row.get("context")?;
        Ok(UsageRecord {
            file: row.get("file")?,
            line: row.get("line")?,
            column: row.get("col")?,
            class_name: row.get("class_name")?,
            resolved_token: row.get("resolved_token")?,
            context: context_str.parse().unwrap_or(UsageContext::Composed),
            component: row.get("component")?,
        })
    }

    // ============================================
    // Pattern queries
    // ============================================

    /// Get a pattern by its canonical hash
    pub fn get_pattern(&self, hash: &str) -> Result<Option<PatternRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM patterns WHERE hash = ?", [hash], |row| {
            Self::row_to_pattern(row)
        })
        .optional()
        .map_err(Error::from)
    }

    /// Patterns repeated at least `min_count` times, most repeated first
    pub fn top_patterns(&self, min_count: i64, limit: usize) -> Result<Vec<PatternRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM patterns WHERE count >= ? ORDER BY count DESC, hash LIMIT ?",
        )?;
        let patterns = stmt
            .query_map(params![min_count, limit as i64], Self::row_to_pattern)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(patterns)
    }

    fn row_to_pattern(row: &Row) -> rusqlite::Result<PatternRecord> {
        let classes_str: String = row.get("classes")?;
        let locations_str: String = row.get("locations")?;
        Ok(PatternRecord {
            hash: row.get("hash")?,
            classes: serde_json::from_str(&classes_str).unwrap_or_default(),
            count: row.get("count")?,
            locations: serde_json::from_str(&locations_str).unwrap_or_default(),
        })
    }

    // ============================================
    // Graph queries
    // ============================================

    /// Ancestor chain for a token: everything it transitively depends on,
    /// nearest first.
    pub fn ancestors(&self, token_name: &str) -> Result<Vec<TokenGraphEdge>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM token_graph WHERE descendant = ? ORDER BY depth ASC, ancestor",
        )?;
        let edges = stmt
            .query_map([token_name], Self::row_to_edge)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Downstream dependents of a token: what would change if its value
    /// changed. Distinct, alphabetically sorted.
    pub fn dependents(&self, token_name: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT descendant FROM token_graph WHERE ancestor = ? ORDER BY descendant",
        )?;
        let dependents = stmt
            .query_map([token_name], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(dependents)
    }

    fn row_to_edge(row: &Row) -> rusqlite::Result<TokenGraphEdge> {
        let path_str: String = row.get("path")?;
        Ok(TokenGraphEdge {
            ancestor: row.get("ancestor")?,
            descendant: row.get("descendant")?,
            depth: row.get("depth")?,
            path: serde_json::from_str(&path_str).unwrap_or_default(),
        })
    }

    /// Components most similar to `component` by shared repeated patterns.
    /// Callers must gate on `Feature::ComponentGraph`.
    pub fn similar_components(
        &self,
        component: &str,
        limit: usize,
    ) -> Result<Vec<ComponentGraphEdge>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT source, target, shared_patterns FROM component_graph
            WHERE source = ?1 OR target = ?1
            ORDER BY shared_patterns DESC, source, target
            LIMIT ?2
            "#,
        )?;
        let edges = stmt
            .query_map(params![component, limit as i64], |row| {
                Ok(ComponentGraphEdge {
                    source: row.get("source")?,
                    target: row.get("target")?,
                    shared_patterns: row.get("shared_patterns")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    // ============================================
    // Statistics
    // ============================================

    /// Row counts across all relations
    pub fn stats(&self) -> Result<IndexStats> {
        let conn = self.conn.lock().unwrap();
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
        };
        Ok(IndexStats {
            tokens: count("tokens")?,
            theme_variants: count("token_themes")?,
            usages: count("usages")?,
            patterns: count("patterns")?,
            token_edges: count("token_graph")?,
            component_edges: count("component_graph")?,
        })
    }
}
