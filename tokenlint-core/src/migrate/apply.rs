//! Text transformations for migration steps
//!
//! Pure functions over file text plus a `(line, column)` anchor. A locate
//! follows a deterministic fallback order — exact column, then a window
//! around the column on that line, then the whole line — and fails only when
//! all three miss. A failed locate never partially modifies the text.

use crate::migrate::plan::{MigrationAction, MigrationStep};
use thiserror::Error;

/// Window searched either side of the anchor column before falling back to
/// the whole line. Tunable; chosen conservatively.
pub const ANCHOR_WINDOW: usize = 20;

/// Why a single step could not be applied. Isolated to that step's result,
/// never propagated as a run error.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("`{needle}` not found at {file_hint}:{line} (tried column {column}, ±{window} window, full line)")]
    NotFound {
        needle: String,
        file_hint: String,
        line: u32,
        column: u32,
        window: usize,
    },

    #[error("line {0} is out of range")]
    LineOutOfRange(u32),

    #[error("malformed action: {0}")]
    BadAction(String),
}

/// Result of one successful transformation.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// The full rewritten file text
    pub text: String,
    /// Characters removed
    pub removed: usize,
    /// Characters added
    pub added: usize,
    /// Side artifact to collect (a CSS block or token definition line)
    pub artifact: Option<String>,
}

/// Byte span of a 1-based line within `text`, excluding the newline.
fn line_span(text: &str, line: u32) -> Option<(usize, usize)> {
    if line == 0 {
        return None;
    }
    let mut start = 0usize;
    let mut current = 1u32;
    for (i, c) in text.char_indices() {
        if current == line {
            // scan forward to line end
            let end = text[i..].find('\n').map(|n| i + n).unwrap_or(text.len());
            return Some((start, end));
        }
        if c == '\n' {
            current += 1;
            start = i + 1;
        }
    }
    if current == line {
        Some((start, text.len()))
    } else {
        None
    }
}

/// Locate `needle` on `line`, trying the exact column, a ±[`ANCHOR_WINDOW`]
/// search near the column, then the whole line. Returns a byte offset into
/// `text`.
fn locate(text: &str, line: u32, column: u32, needle: &str) -> Option<usize> {
    let (start, end) = line_span(text, line)?;
    let content = &text[start..end];
    let col0 = column.saturating_sub(1) as usize;

    // 1. Exact column
    if col0 <= content.len()
        && content.is_char_boundary(col0)
        && content[col0..].starts_with(needle)
    {
        return Some(start + col0);
    }

    // 2. Window around the column
    let lo = col0.saturating_sub(ANCHOR_WINDOW).min(content.len());
    let hi = (col0 + ANCHOR_WINDOW + needle.len()).min(content.len());
    if content.is_char_boundary(lo) && content.is_char_boundary(hi) {
        if let Some(rel) = content[lo..hi].find(needle) {
            return Some(start + lo + rel);
        }
    }

    // 3. Whole line
    content.find(needle).map(|rel| start + rel)
}

fn not_found(step: &MigrationStep, needle: &str) -> ApplyError {
    ApplyError::NotFound {
        needle: needle.to_string(),
        file_hint: step.file.clone(),
        line: step.line,
        column: step.column,
        window: ANCHOR_WINDOW,
    }
}

/// Splice `replacement` over `range` in `text`.
fn splice(text: &str, range: std::ops::Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..range.start]);
    out.push_str(replacement);
    out.push_str(&text[range.end..]);
    out
}

/// Apply one step's action to `text`. Pure: the caller decides whether the
/// result is written back.
pub fn apply_action(text: &str, step: &MigrationStep) -> Result<ApplyOutcome, ApplyError> {
    if line_span(text, step.line).is_none() {
        return Err(ApplyError::LineOutOfRange(step.line));
    }

    match &step.action {
        MigrationAction::Replace { from, to } => {
            let at = locate(text, step.line, step.column, from)
                .ok_or_else(|| not_found(step, from))?;
            Ok(ApplyOutcome {
                text: splice(text, at..at + from.len(), to),
                removed: from.len(),
                added: to.len(),
                artifact: None,
            })
        }

        MigrationAction::Extract {
            pattern,
            utility_name,
        } => {
            let at = locate(text, step.line, step.column, pattern)
                .ok_or_else(|| not_found(step, pattern))?;
            let artifact = format!("@utility {} {{\n  @apply {};\n}}\n", utility_name, pattern);
            Ok(ApplyOutcome {
                text: splice(text, at..at + pattern.len(), utility_name),
                removed: pattern.len(),
                added: utility_name.len(),
                artifact: Some(artifact),
            })
        }

        MigrationAction::Tokenize { value, token_name } => {
            // `value` is the full arbitrary-value class, e.g. `bg-[#ff0000]`
            let open = value.find("-[").ok_or_else(|| {
                ApplyError::BadAction(format!("`{}` is not an arbitrary-value class", value))
            })?;
            if !value.ends_with(']') {
                return Err(ApplyError::BadAction(format!(
                    "`{}` is not an arbitrary-value class",
                    value
                )));
            }
            let prefix = &value[..open];
            let literal = &value[open + 2..value.len() - 1];

            let at = locate(text, step.line, step.column, value)
                .ok_or_else(|| not_found(step, value))?;
            let shorthand = format!("{}-({})", prefix, token_name);
            let artifact = format!("{}: {};\n", token_name, literal);
            Ok(ApplyOutcome {
                text: splice(text, at..at + value.len(), &shorthand),
                removed: value.len(),
                added: shorthand.len(),
                artifact: Some(artifact),
            })
        }

        MigrationAction::Remove { class_name } => {
            let (start, end) = line_span(text, step.line).ok_or(ApplyError::LineOutOfRange(step.line))?;
            let content = &text[start..end];
            let col0 = step.column.saturating_sub(1) as usize;

            // Whole-token occurrences only: a class bounded by quotes,
            // whitespace, or the line edges. Nearest to the anchor wins.
            let mut best: Option<usize> = None;
            for (i, _) in content.match_indices(class_name.as_str()) {
                let before_ok = i == 0
                    || matches!(content.as_bytes()[i - 1], b' ' | b'\t' | b'"' | b'\'' | b'`');
                let after = i + class_name.len();
                let after_ok = after >= content.len()
                    || matches!(content.as_bytes()[after], b' ' | b'\t' | b'"' | b'\'' | b'`');
                if before_ok && after_ok {
                    let distance = i.abs_diff(col0);
                    if best.map(|b| distance < b.abs_diff(col0)).unwrap_or(true) {
                        best = Some(i);
                    }
                }
            }
            let i = best.ok_or_else(|| not_found(step, class_name))?;

            // Take exactly one separating space with the class, preferring
            // the trailing one, so the list keeps single spacing.
            let after = i + class_name.len();
            let (del_start, del_end) = if after < content.len() && content.as_bytes()[after] == b' '
            {
                (i, after + 1)
            } else if i > 0 && content.as_bytes()[i - 1] == b' ' {
                (i - 1, after)
            } else {
                (i, after)
            };

            Ok(ApplyOutcome {
                text: splice(text, start + del_start..start + del_end, ""),
                removed: del_end - del_start,
                added: 0,
                artifact: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::plan::Severity;

    fn step(line: u32, column: u32, action: MigrationAction) -> MigrationStep {
        MigrationStep {
            id: "step-1".to_string(),
            file: "src/Button.tsx".to_string(),
            line,
            column,
            rule_id: "rule".to_string(),
            severity: Severity::Warning,
            action,
            confidence: 1.0,
            preview: None,
            dependencies: Vec::new(),
        }
    }

    const TEXT: &str = "export function Button() {\n  return <button className=\"bg-[#ff0000] text-white\" />;\n}\n";

    #[test]
    fn test_replace_at_exact_column() {
        // `text-white` starts at column 42 on line 2
        let s = step(
            2,
            42,
            MigrationAction::Replace {
                from: "text-white".to_string(),
                to: "text-(--color-on-brand)".to_string(),
            },
        );
        let outcome = apply_action(TEXT, &s).unwrap();
        assert!(outcome.text.contains("text-(--color-on-brand)"));
        assert!(!outcome.text.contains("text-white"));
        assert_eq!(outcome.removed, 10);
        assert_eq!(outcome.added, 23);
    }

    #[test]
    fn test_replace_with_slightly_wrong_column() {
        // Anchor a few characters off: windowed search still finds it
        let s = step(
            2,
            35,
            MigrationAction::Replace {
                from: "text-white".to_string(),
                to: "text-fg".to_string(),
            },
        );
        let outcome = apply_action(TEXT, &s).unwrap();
        assert!(outcome.text.contains("text-fg"));
    }

    #[test]
    fn test_replace_falls_back_to_full_line() {
        // Column far beyond the window: full-line search is the last resort
        let s = step(
            2,
            1,
            MigrationAction::Replace {
                from: "text-white".to_string(),
                to: "text-fg".to_string(),
            },
        );
        let outcome = apply_action(TEXT, &s).unwrap();
        assert!(outcome.text.contains("text-fg"));
    }

    #[test]
    fn test_replace_not_found_is_error() {
        let s = step(
            2,
            1,
            MigrationAction::Replace {
                from: "text-black".to_string(),
                to: "x".to_string(),
            },
        );
        let err = apply_action(TEXT, &s).unwrap_err();
        assert!(matches!(err, ApplyError::NotFound { .. }));
        assert!(err.to_string().contains("text-black"));
    }

    #[test]
    fn test_tokenize_rewrites_and_emits_definition() {
        let s = step(
            2,
            29,
            MigrationAction::Tokenize {
                value: "bg-[#ff0000]".to_string(),
                token_name: "--color-brand".to_string(),
            },
        );
        let outcome = apply_action(TEXT, &s).unwrap();
        assert!(outcome.text.contains("bg-(--color-brand) text-white"));
        assert_eq!(
            outcome.artifact.as_deref(),
            Some("--color-brand: #ff0000;\n")
        );
    }

    #[test]
    fn test_tokenize_rejects_non_arbitrary_value() {
        let s = step(
            2,
            30,
            MigrationAction::Tokenize {
                value: "bg-red".to_string(),
                token_name: "--color-brand".to_string(),
            },
        );
        assert!(matches!(
            apply_action(TEXT, &s).unwrap_err(),
            ApplyError::BadAction(_)
        ));
    }

    #[test]
    fn test_extract_emits_utility_block() {
        let text = "<div className=\"flex items-center gap-2\" />\n";
        let s = step(
            1,
            17,
            MigrationAction::Extract {
                pattern: "flex items-center gap-2".to_string(),
                utility_name: "row".to_string(),
            },
        );
        let outcome = apply_action(text, &s).unwrap();
        assert_eq!(outcome.text, "<div className=\"row\" />\n");
        assert_eq!(
            outcome.artifact.as_deref(),
            Some("@utility row {\n  @apply flex items-center gap-2;\n}\n")
        );
    }

    #[test]
    fn test_remove_takes_trailing_space() {
        let text = "<div className=\"flex gap-2 p-4\" />\n";
        let s = step(
            1,
            22,
            MigrationAction::Remove {
                class_name: "gap-2".to_string(),
            },
        );
        let outcome = apply_action(text, &s).unwrap();
        assert_eq!(outcome.text, "<div className=\"flex p-4\" />\n");
    }

    #[test]
    fn test_remove_last_class_takes_leading_space() {
        let text = "<div className=\"flex p-4\" />\n";
        let s = step(
            1,
            22,
            MigrationAction::Remove {
                class_name: "p-4".to_string(),
            },
        );
        let outcome = apply_action(text, &s).unwrap();
        assert_eq!(outcome.text, "<div className=\"flex\" />\n");
    }

    #[test]
    fn test_remove_never_matches_inside_longer_class() {
        // `p-4` appears inside `p-40`; only the whole token may be removed
        let text = "<div className=\"p-40 grid\" />\n";
        let s = step(
            1,
            17,
            MigrationAction::Remove {
                class_name: "p-4".to_string(),
            },
        );
        assert!(matches!(
            apply_action(text, &s).unwrap_err(),
            ApplyError::NotFound { .. }
        ));
    }

    #[test]
    fn test_out_of_range_line() {
        let s = step(
            99,
            1,
            MigrationAction::Replace {
                from: "x".to_string(),
                to: "y".to_string(),
            },
        );
        assert!(matches!(
            apply_action(TEXT, &s).unwrap_err(),
            ApplyError::LineOutOfRange(99)
        ));
    }
}
