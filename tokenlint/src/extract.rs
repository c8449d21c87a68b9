//! Default class-attribute extractor
//!
//! A line-oriented scanner for `className="..."` / `class="..."` attributes.
//! The core treats any extractor as an untrusted external collaborator and
//! re-validates everything it reports; this one covers JSX and plain HTML
//! without an AST.

use std::path::Path;
use tokenlint_core::{RawUsage, UsageExtractor};

const ATTRS: &[&str] = &["className=\"", "class=\""];

pub struct ClassAttributeExtractor;

impl UsageExtractor for ClassAttributeExtractor {
    fn extract(&self, file: &Path, source: &str) -> Vec<RawUsage> {
        let component = component_name(file);
        let mut usages = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            let line_no = (idx + 1) as u32;
            for attr in ATTRS {
                let mut from = 0usize;
                while let Some(at) = line[from..].find(attr) {
                    let value_start = from + at + attr.len();
                    let Some(rel_end) = line[value_start..].find('"') else {
                        break;
                    };
                    let value = &line[value_start..value_start + rel_end];

                    let mut offset = 0usize;
                    for part in value.split(' ') {
                        if !part.is_empty() {
                            usages.push(RawUsage {
                                line: line_no,
                                column: (value_start + offset + 1) as u32,
                                class_name: part.to_string(),
                                component: component.clone(),
                            });
                        }
                        offset += part.len() + 1;
                    }
                    from = value_start + rel_end + 1;
                }
            }
        }

        usages
    }
}

/// Component attribution: capitalized file stems name a component.
fn component_name(file: &Path) -> Option<String> {
    let stem = file.file_stem()?.to_str()?;
    stem.chars()
        .next()
        .filter(|c| c.is_ascii_uppercase())
        .map(|_| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_classes_with_columns() {
        let source = "<div className=\"flex p-4\" />\n";
        let usages = ClassAttributeExtractor.extract(Path::new("src/ui/Button.tsx"), source);

        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].class_name, "flex");
        assert_eq!(usages[0].line, 1);
        assert_eq!(usages[0].column, 17);
        assert_eq!(usages[1].class_name, "p-4");
        assert_eq!(usages[1].column, 22);
        assert_eq!(usages[0].component.as_deref(), Some("Button"));
    }

    #[test]
    fn test_plain_class_attribute_and_lowercase_files() {
        let source = "<div class=\"grid\"></div>\n";
        let usages = ClassAttributeExtractor.extract(Path::new("src/pages/index.html"), source);
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].class_name, "grid");
        assert!(usages[0].component.is_none());
    }

    #[test]
    fn test_multiple_attributes_on_one_line() {
        let source = "<a className=\"x\"><b className=\"y z\" /></a>\n";
        let usages = ClassAttributeExtractor.extract(Path::new("A.tsx"), source);
        let names: Vec<&str> = usages.iter().map(|u| u.class_name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }
}
