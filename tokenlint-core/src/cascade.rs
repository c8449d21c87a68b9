//! Cascade resolution
//!
//! Given a selector (token name or class name), walks the token dependency
//! graph upstream and downstream, attaches theme variants and usages, and
//! reports a confidence envelope. Every answer states explicitly what it
//! could not verify; partial data is never presented as complete.

use crate::classify;
use crate::error::Result;
use crate::index::{feature_available, Feature, IndexStore};
use crate::types::*;

/// How much of the cascade answer could be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Full,
    Partial,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Full => "full",
            Confidence::Partial => "partial",
        }
    }
}

/// Data the resolver looked for and did not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingData {
    TokenDefinition,
    ThemeVariants,
    TokenDependencies,
}

impl MissingData {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingData::TokenDefinition => "token_definition",
            MissingData::ThemeVariants => "theme_variants",
            MissingData::TokenDependencies => "token_dependencies",
        }
    }
}

/// The confidence envelope attached to every cascade answer.
#[derive(Debug, Clone)]
pub struct CascadeLimits {
    pub confidence: Confidence,
    /// Which of the expected data was absent
    pub missing: Vec<MissingData>,
    /// Schema-version limitations, human-readable
    pub limitations: Vec<String>,
}

/// Theme variants split by axis.
#[derive(Debug, Clone, Default)]
pub struct ThemeVariants {
    pub light: Option<ThemeVariant>,
    pub dark: Option<ThemeVariant>,
}

impl ThemeVariants {
    pub fn is_empty(&self) -> bool {
        self.light.is_none() && self.dark.is_none()
    }
}

/// Full cascade answer for one selector.
#[derive(Debug, Clone)]
pub struct CascadeResult {
    pub selector: String,
    /// Token the selector resolved to; cleared when no definition exists
    pub resolved_token: Option<String>,
    pub definition: Option<TokenDefinition>,
    /// What this token ultimately depends on, nearest first
    pub ancestors: Vec<TokenGraphEdge>,
    pub usages: Vec<UsageRecord>,
    pub themes: ThemeVariants,
    /// What would change if this token's value changed
    pub dependents: Vec<String>,
    pub limits: CascadeLimits,
}

/// Resolve a selector against an open index.
///
/// Class-name selectors go through the *unvalidated* class-to-token resolver:
/// this is a diagnostic view, not a mutation, so permissiveness is the point.
pub fn resolve(store: &IndexStore, selector: &str, limit: usize) -> Result<CascadeResult> {
    let version = store.schema_version()?;
    let mut missing = Vec::new();
    let mut limitations = Vec::new();

    // 1. Selector → candidate token
    let candidate = if selector.starts_with("--") {
        Some(selector.to_string())
    } else {
        classify::resolve_class_to_token(selector)
    };

    // 2. Definition lookup; absence clears resolved_token
    let definition = match &candidate {
        Some(token) => store.get_token(token)?,
        None => None,
    };
    if definition.is_none() {
        missing.push(MissingData::TokenDefinition);
    }
    let resolved_token = definition.as_ref().map(|d| d.name.clone());

    // 3. Ancestor chain, keyed by the candidate even when the definition row
    //    is missing (the graph may carry observed-but-dangling edges)
    let ancestors = match &candidate {
        Some(token) => store.ancestors(token)?,
        None => Vec::new(),
    };

    // 4. Usages: the literal class first, falling back to the resolved token
    let mut usages = if selector.starts_with("--") {
        Vec::new()
    } else {
        store.usages_by_class(selector, limit)?
    };
    if usages.is_empty() {
        if let Some(token) = &candidate {
            usages = store.usages_by_token(token, limit)?;
        }
    }

    // 5. Theme variants, version-gated
    let mut themes = ThemeVariants::default();
    let themes_supported = feature_available(version, Feature::TokenThemes);
    if themes_supported {
        if let Some(token) = &candidate {
            for variant in store.theme_variants(token)? {
                match variant.theme {
                    Theme::Light => themes.light = Some(variant),
                    Theme::Dark => themes.dark = Some(variant),
                }
            }
        }
        if themes.is_empty() {
            missing.push(MissingData::ThemeVariants);
        }
    } else {
        limitations.push(format!(
            "token_themes requires index rebuild (schema v{}, index is v{})",
            Feature::TokenThemes.min_version(),
            version
        ));
    }

    // 6. Downstream dependents
    let dependents = match &candidate {
        Some(token) => store.dependents(token)?,
        None => Vec::new(),
    };
    if dependents.is_empty() {
        missing.push(MissingData::TokenDependencies);
    }

    let confidence = if missing.is_empty() {
        Confidence::Full
    } else {
        Confidence::Partial
    };

    tracing::debug!(
        selector = %selector,
        token = resolved_token.as_deref().unwrap_or("<unresolved>"),
        confidence = confidence.as_str(),
        "Cascade resolved"
    );

    Ok(CascadeResult {
        selector: selector.to_string(),
        resolved_token,
        definition,
        ancestors,
        usages,
        themes,
        dependents,
        limits: CascadeLimits {
            confidence,
            missing,
            limitations,
        },
    })
}
