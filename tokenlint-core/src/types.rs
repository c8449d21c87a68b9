//! Core domain types for tokenlint
//!
//! These types represent the persisted data model of the token index.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Token** | A named design value (CSS custom property) with one authoritative definition |
//! | **Cascade** | The dependency relationship between tokens (one value references another) |
//! | **Usage** | A single observed utility-class site in component source |
//! | **Pattern** | A deduplicated, content-hashed set of classes co-occurring at a usage site |
//! | **Theme variant** | A light/dark override for a token's value |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Tokens
// ============================================

/// A design-token definition extracted from CSS.
///
/// `value` is the raw expression and may reference other tokens via
/// `var(--other)`; `computed_value` is the fully-resolved literal when
/// resolution succeeded (no dangling references, no cycles).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDefinition {
    /// CSS custom-property identifier, unique within the index
    pub name: String,
    /// Raw value expression as written
    pub value: String,
    /// File the definition was found in (project-relative)
    pub file: String,
    /// 1-based line of the definition
    pub line: u32,
    /// Cascade-layer order (0 = outside any `@layer`)
    pub layer: i64,
    /// Resolved literal value, when derivable
    pub computed_value: Option<String>,
}

/// Theme axis for token overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(format!("unknown theme: {}", s)),
        }
    }
}

/// A per-theme override of a token's value. Schema v2 only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeVariant {
    /// Token this variant overrides
    pub token_name: String,
    /// Which theme the override applies to
    pub theme: Theme,
    /// Override value
    pub value: String,
    /// Where the override was declared, as `file:line`
    pub source: String,
}

// ============================================
// Usages
// ============================================

/// Where in the component tree a usage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageContext {
    /// Under `ui/` or `primitives/`
    Primitive,
    /// Under `layouts/` or `templates/`
    Layout,
    /// Everything else
    Composed,
}

impl UsageContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageContext::Primitive => "primitive",
            UsageContext::Layout => "layout",
            UsageContext::Composed => "composed",
        }
    }
}

impl std::str::FromStr for UsageContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primitive" => Ok(UsageContext::Primitive),
            "layout" => Ok(UsageContext::Layout),
            "composed" => Ok(UsageContext::Composed),
            _ => Err(format!("unknown usage context: {}", s)),
        }
    }
}

/// One observed class-site in component source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// File the class was seen in (project-relative)
    pub file: String,
    /// 1-based line
    pub line: u32,
    /// 1-based column of the class within the line
    pub column: u32,
    /// The utility class as written
    pub class_name: String,
    /// Token the class resolves to, when derivable from the indexed token set
    pub resolved_token: Option<String>,
    /// Path-derived (or directive-overridden) context
    pub context: UsageContext,
    /// Component name, when the extractor could attribute one
    pub component: Option<String>,
}

// ============================================
// Patterns
// ============================================

/// One site where a pattern was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternLocation {
    pub file: String,
    pub line: u32,
    pub component: Option<String>,
}

/// A deduplicated co-occurring class set.
///
/// Identity is `hash`, computed over the sorted, deduplicated class set;
/// `classes` keeps the first-seen original order for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecord {
    pub hash: String,
    pub classes: Vec<String>,
    pub count: i64,
    pub locations: Vec<PatternLocation>,
}

// ============================================
// Token graph
// ============================================

/// One edge of the transitive closure of token dependencies.
///
/// `descendant`'s value (transitively) references `ancestor`. `path` is the
/// ordered token chain ancestor→descendant inclusive, so `depth` is always
/// `path.len() - 1` and at least 1. No self-edges are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGraphEdge {
    pub ancestor: String,
    pub descendant: String,
    pub depth: i64,
    pub path: Vec<String>,
}

/// Component similarity edge: two components sharing repeated patterns.
/// Schema v2 only. Stored once per unordered pair with `source < target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentGraphEdge {
    pub source: String,
    pub target: String,
    /// Number of distinct pattern hashes observed in both components
    pub shared_patterns: i64,
}

// ============================================
// Index metadata
// ============================================

/// Single logical metadata record for the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub schema_version: i32,
    pub source_tree_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_theme_round_trip() {
        for theme in [Theme::Light, Theme::Dark] {
            assert_eq!(Theme::from_str(theme.as_str()).unwrap(), theme);
        }
        assert!(Theme::from_str("sepia").is_err());
    }

    #[test]
    fn test_usage_context_round_trip() {
        for ctx in [
            UsageContext::Primitive,
            UsageContext::Layout,
            UsageContext::Composed,
        ] {
            assert_eq!(UsageContext::from_str(ctx.as_str()).unwrap(), ctx);
        }
    }
}
