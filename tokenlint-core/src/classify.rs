//! Utility-class classification
//!
//! Pure, total functions mapping a utility class name to its category and,
//! where derivable, to a candidate design-token name. Consumed by the index
//! builder (validated resolution) and the cascade resolver (permissive
//! resolution for diagnostics).

use std::collections::HashSet;

/// Category of a single utility class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Color,
    Spacing,
    Typography,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Color => "color",
            Category::Spacing => "spacing",
            Category::Typography => "typography",
            Category::Other => "other",
        }
    }
}

/// Category of a whole pattern (class set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternCategory {
    Color,
    Spacing,
    Typography,
    Mixed,
}

impl PatternCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::Color => "color",
            PatternCategory::Spacing => "spacing",
            PatternCategory::Typography => "typography",
            PatternCategory::Mixed => "mixed",
        }
    }
}

/// Result of classifying one utility class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    /// `(prefix, value)` when the class splits on a known prefix
    pub parsed: Option<(String, String)>,
    /// Value is a bracketed arbitrary literal, e.g. `bg-[#ff0000]`
    pub is_arbitrary: bool,
    /// Value is a token shorthand, e.g. `bg-(--color-brand)`
    pub is_tokenized: bool,
}

/// Prefixes whose value is always a color.
const COLOR_PREFIXES: &[&str] = &["bg", "border", "ring", "fill", "stroke", "outline"];

/// Spacing prefixes, longest first so `space-x` wins over nothing shorter.
const SPACING_PREFIXES: &[&str] = &[
    "space-x", "space-y", "gap-x", "gap-y", "gap", "px", "py", "pt", "pr", "pb", "pl", "p", "mx",
    "my", "mt", "mr", "mb", "ml", "m", "w", "h",
];

/// Typography prefixes other than `text`, which is ambiguous.
const TYPOGRAPHY_PREFIXES: &[&str] = &["font", "leading", "tracking"];

/// Typography size-scale words: these are sizes, never semantic color names.
const SCALE_WORDS: &[&str] = &[
    "xs", "sm", "base", "lg", "xl", "2xl", "3xl", "4xl", "5xl", "6xl", "7xl", "8xl", "9xl",
];

/// Split a class into `(prefix, value)` on the longest known prefix.
fn parse_class(class: &str) -> Option<(String, String)> {
    let mut candidates: Vec<&str> = Vec::new();
    candidates.extend_from_slice(COLOR_PREFIXES);
    candidates.extend_from_slice(SPACING_PREFIXES);
    candidates.extend_from_slice(TYPOGRAPHY_PREFIXES);
    candidates.push("text");

    let mut best: Option<&str> = None;
    for prefix in candidates {
        if class.len() > prefix.len() + 1
            && class.starts_with(prefix)
            && class.as_bytes()[prefix.len()] == b'-'
        {
            if best.map(|b| prefix.len() > b.len()).unwrap_or(true) {
                best = Some(prefix);
            }
        }
    }

    best.map(|prefix| {
        (
            prefix.to_string(),
            class[prefix.len() + 1..].to_string(),
        )
    })
}

fn is_arbitrary_value(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('[') && value.ends_with(']')
}

fn is_tokenized_value(value: &str) -> bool {
    value.len() > 4 && value.starts_with("(--") && value.ends_with(')')
}

/// A literal that can only be a color: `#fff`, `rgb(...)`, `hsl(...)`, etc.
fn is_color_literal(payload: &str) -> bool {
    payload.starts_with('#')
        || payload.starts_with("rgb(")
        || payload.starts_with("rgba(")
        || payload.starts_with("hsl(")
        || payload.starts_with("hsla(")
        || payload.starts_with("oklch(")
}

/// Classify a single utility class.
///
/// Color is checked before Typography: a bracketed literal color under a
/// `text-` prefix is never misclassified as a typography size.
pub fn classify(class: &str) -> Classification {
    let parsed = parse_class(class);

    let (prefix, value) = match &parsed {
        Some((p, v)) => (p.as_str(), v.as_str()),
        None => {
            return Classification {
                category: Category::Other,
                parsed: None,
                is_arbitrary: false,
                is_tokenized: false,
            }
        }
    };

    let is_arbitrary = is_arbitrary_value(value);
    let is_tokenized = is_tokenized_value(value);

    let category = if COLOR_PREFIXES.contains(&prefix) {
        Category::Color
    } else if prefix == "text" {
        if is_arbitrary {
            let payload = &value[1..value.len() - 1];
            if is_color_literal(payload) {
                Category::Color
            } else {
                Category::Typography
            }
        } else if SCALE_WORDS.contains(&value) {
            Category::Typography
        } else {
            // Palette ("blue-500"), semantic word ("muted"), or token shorthand
            Category::Color
        }
    } else if SPACING_PREFIXES.contains(&prefix) {
        Category::Spacing
    } else if TYPOGRAPHY_PREFIXES.contains(&prefix) {
        Category::Typography
    } else {
        Category::Other
    };

    Classification {
        category,
        parsed,
        is_arbitrary,
        is_tokenized,
    }
}

/// Prefixes whose semantic value may name a color token.
const SEMANTIC_COLOR_PREFIXES: &[&str] = &["bg", "text", "border", "ring", "fill", "stroke"];

/// Extract the token name from an explicit shorthand, e.g.
/// `bg-(--color-brand)` → `--color-brand`.
///
/// The shorthand is an explicit author declaration and is never validated
/// against the indexed token set.
fn shorthand_token(class: &str) -> Option<String> {
    let open = class.find("-(--")?;
    if !class.ends_with(')') {
        return None;
    }
    let name = &class[open + 2..class.len() - 1];
    if name.len() > 2 {
        Some(name.to_string())
    } else {
        None
    }
}

/// A semantic word that may be inferred as `--color-<word>`: purely
/// alphabetic, not a palette value ("blue-500"), not a size-scale word.
fn semantic_candidate(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphabetic())
        && !SCALE_WORDS.contains(&value)
}

/// Resolve a class to a candidate token name without validation.
pub fn resolve_class_to_token(class: &str) -> Option<String> {
    if let Some(token) = shorthand_token(class) {
        return Some(token);
    }

    let (prefix, value) = parse_class(class)?;
    if !SEMANTIC_COLOR_PREFIXES.contains(&prefix.as_str()) {
        return None;
    }
    if semantic_candidate(&value) {
        Some(format!("--color-{}", value))
    } else {
        None
    }
}

/// Resolve a class to a token name, validating the semantic-inference branch
/// against the indexed token set. The shorthand branch is never validated.
pub fn resolve_class_to_token_validated(
    class: &str,
    known_tokens: &HashSet<String>,
) -> Option<String> {
    if let Some(token) = shorthand_token(class) {
        return Some(token);
    }

    let candidate = resolve_class_to_token(class)?;
    if known_tokens.contains(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

/// Categorize a whole pattern: a pure category only if every class
/// independently classifies the same; otherwise (and for empty input) Mixed.
pub fn categorize_pattern(classes: &[String]) -> PatternCategory {
    let mut uniform: Option<Category> = None;
    for class in classes {
        let category = classify(class).category;
        match uniform {
            None => uniform = Some(category),
            Some(seen) if seen == category => {}
            Some(_) => return PatternCategory::Mixed,
        }
    }
    match uniform {
        Some(Category::Color) => PatternCategory::Color,
        Some(Category::Spacing) => PatternCategory::Spacing,
        Some(Category::Typography) => PatternCategory::Typography,
        _ => PatternCategory::Mixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: &[&str]) -> HashSet<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_color_wins_over_typography_for_literals() {
        let c = classify("text-[#fff]");
        assert_eq!(c.category, Category::Color);
        assert!(c.is_arbitrary);
        assert!(!c.is_tokenized);
    }

    #[test]
    fn test_scale_word_is_typography() {
        let c = classify("text-lg");
        assert_eq!(c.category, Category::Typography);
        assert!(!c.is_arbitrary);
    }

    #[test]
    fn test_palette_is_color_not_arbitrary() {
        let c = classify("bg-blue-500");
        assert_eq!(c.category, Category::Color);
        assert!(!c.is_arbitrary);
        assert_eq!(
            c.parsed,
            Some(("bg".to_string(), "blue-500".to_string()))
        );
    }

    #[test]
    fn test_arbitrary_size_is_typography() {
        assert_eq!(classify("text-[14px]").category, Category::Typography);
    }

    #[test]
    fn test_spacing_prefixes() {
        assert_eq!(classify("px-4").category, Category::Spacing);
        assert_eq!(classify("space-x-2").category, Category::Spacing);
        assert_eq!(classify("gap-3").category, Category::Spacing);
    }

    #[test]
    fn test_unknown_class_is_other() {
        let c = classify("flex");
        assert_eq!(c.category, Category::Other);
        assert!(c.parsed.is_none());
    }

    #[test]
    fn test_tokenized_shorthand_detected() {
        let c = classify("bg-(--color-brand)");
        assert!(c.is_tokenized);
        assert_eq!(c.category, Category::Color);
    }

    #[test]
    fn test_shorthand_always_resolves() {
        assert_eq!(
            resolve_class_to_token("bg-(--color-brand)"),
            Some("--color-brand".to_string())
        );
        // Shorthand skips validation even against an empty token set
        assert_eq!(
            resolve_class_to_token_validated("text-(--weird-name)", &set(&[])),
            Some("--weird-name".to_string())
        );
    }

    #[test]
    fn test_semantic_inference() {
        assert_eq!(
            resolve_class_to_token("bg-accent"),
            Some("--color-accent".to_string())
        );
        // Palette values and scale words never infer
        assert_eq!(resolve_class_to_token("bg-blue-500"), None);
        assert_eq!(resolve_class_to_token("text-lg"), None);
        // Non-color prefixes never infer
        assert_eq!(resolve_class_to_token("p-4"), None);
    }

    #[test]
    fn test_validated_inference_requires_known_token() {
        let known = set(&["--color-accent"]);
        assert_eq!(
            resolve_class_to_token_validated("bg-accent", &known),
            Some("--color-accent".to_string())
        );
        assert_eq!(resolve_class_to_token_validated("bg-muted", &known), None);
    }

    #[test]
    fn test_categorize_pattern() {
        let color = vec!["bg-accent".to_string(), "text-[#fff]".to_string()];
        assert_eq!(categorize_pattern(&color), PatternCategory::Color);

        let spacing = vec!["p-4".to_string(), "gap-2".to_string()];
        assert_eq!(categorize_pattern(&spacing), PatternCategory::Spacing);

        let mixed = vec!["p-4".to_string(), "bg-accent".to_string()];
        assert_eq!(categorize_pattern(&mixed), PatternCategory::Mixed);

        assert_eq!(categorize_pattern(&[]), PatternCategory::Mixed);
    }
}
