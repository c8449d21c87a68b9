//! Token-definition extraction from CSS
//!
//! A line-oriented scanner for custom-property declarations. It understands
//! just enough CSS structure for token files: brace nesting, `@layer`
//! ordering, and light/dark theme blocks. It is not a CSS parser.

use crate::types::{Theme, ThemeVariant, TokenDefinition};

/// Everything extracted from one CSS file.
#[derive(Debug, Default)]
pub struct CssExtraction {
    pub tokens: Vec<TokenDefinition>,
    pub themes: Vec<ThemeVariant>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Block {
    Layer(i64),
    Theme(Theme),
    Plain,
}

/// Theme implied by a block selector, if any.
fn selector_theme(selector: &str) -> Option<Theme> {
    if selector.contains(".dark")
        || selector.contains("data-theme=\"dark\"")
        || selector.contains("prefers-color-scheme: dark")
    {
        Some(Theme::Dark)
    } else if selector.contains(".light")
        || selector.contains("data-theme=\"light\"")
        || selector.contains("prefers-color-scheme: light")
    {
        Some(Theme::Light)
    } else {
        None
    }
}

/// Extract token definitions and theme variants from one CSS file.
///
/// `file` is the project-relative path recorded on every extracted row.
pub fn extract_tokens(file: &str, content: &str) -> CssExtraction {
    let mut out = CssExtraction::default();
    let mut stack: Vec<Block> = Vec::new();
    let mut layer_orders: Vec<String> = Vec::new();
    let mut in_comment = false;

    fn layer_order(name: &str, orders: &mut Vec<String>) -> i64 {
        match orders.iter().position(|n| n == name) {
            Some(i) => (i + 1) as i64,
            None => {
                orders.push(name.to_string());
                orders.len() as i64
            }
        }
    }

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let mut line = raw_line.to_string();

        // Strip comments; a block comment may span lines
        if in_comment {
            match line.find("*/") {
                Some(end) => {
                    line = line[end + 2..].to_string();
                    in_comment = false;
                }
                None => continue,
            }
        }
        while let Some(start) = line.find("/*") {
            match line[start..].find("*/") {
                Some(rel_end) => {
                    line.replace_range(start..start + rel_end + 2, "");
                }
                None => {
                    line.truncate(start);
                    in_comment = true;
                }
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // `@layer base, components;` declares cascade order without a block
        if trimmed.starts_with("@layer") && trimmed.ends_with(';') {
            let names = trimmed
                .trim_start_matches("@layer")
                .trim_end_matches(';')
                .split(',');
            for name in names {
                let name = name.trim();
                if !name.is_empty() {
                    layer_order(name, &mut layer_orders);
                }
            }
            continue;
        }

        if let Some(brace) = trimmed.find('{') {
            let selector = trimmed[..brace].trim();
            let block = if let Some(name) = selector.strip_prefix("@layer") {
                Block::Layer(layer_order(name.trim(), &mut layer_orders))
            } else if let Some(theme) = selector_theme(selector) {
                Block::Theme(theme)
            } else {
                Block::Plain
            };
            stack.push(block);
            // Declarations on the same line as the brace are not scanned;
            // token files in practice put one declaration per line.
            continue;
        }

        if trimmed.contains('}') {
            for _ in 0..trimmed.matches('}').count() {
                stack.pop();
            }
            continue;
        }

        if trimmed.starts_with("--") {
            let Some(colon) = trimmed.find(':') else {
                out.warnings
                    .push(format!("{}:{}: malformed declaration", file, line_no));
                continue;
            };
            let name = trimmed[..colon].trim().to_string();
            let value = trimmed[colon + 1..].trim().trim_end_matches(';').trim();
            if value.is_empty() {
                out.warnings
                    .push(format!("{}:{}: empty value for {}", file, line_no, name));
                continue;
            }

            let theme = stack.iter().rev().find_map(|b| match b {
                Block::Theme(t) => Some(*t),
                _ => None,
            });
            match theme {
                Some(theme) => out.themes.push(ThemeVariant {
                    token_name: name,
                    theme,
                    value: value.to_string(),
                    source: format!("{}:{}", file, line_no),
                }),
                None => {
                    let layer = stack
                        .iter()
                        .rev()
                        .find_map(|b| match b {
                            Block::Layer(order) => Some(*order),
                            _ => None,
                        })
                        .unwrap_or(0);
                    out.tokens.push(TokenDefinition {
                        name,
                        value: value.to_string(),
                        file: file.to_string(),
                        line: line_no,
                        layer,
                        computed_value: None,
                    });
                }
            }
        }
    }

    out
}

/// Token names referenced by a value via `var(--name)` syntax, in order.
pub fn var_references(value: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find("var(") {
        let after = &rest[start + 4..];
        let end = after
            .find(|c: char| c == ')' || c == ',')
            .unwrap_or(after.len());
        let name = after[..end].trim();
        if name.starts_with("--") {
            refs.push(name.to_string());
        }
        rest = &after[end..];
    }
    refs
}
