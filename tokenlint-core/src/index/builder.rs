//! Full index rebuild
//!
//! Orchestrates one `build`: scan the source tree, extract token definitions
//! and usages, deduplicate usage sets into patterns, compute the token
//! dependency closure, and persist everything plus metadata in one atomic
//! replacement of the store contents.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Source tree  │ ──► │ IndexBuilder │ ──► │  IndexStore  │
//! │ (css + tsx)  │     │              │     │ (5 relations)│
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                            │
//!                            ▼
//!                   ┌──────────────────┐
//!                   │  UsageExtractor  │  (external collaborator)
//!                   └──────────────────┘
//! ```

use crate::classify;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::UsageExtractor;
use crate::hash;
use crate::index::css;
use crate::index::store::{IndexContents, IndexStore};
use crate::types::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

/// Runaway guard for dependency-closure walks.
pub const MAX_GRAPH_DEPTH: usize = 16;

/// Counters for one build.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub files_scanned: usize,
    pub tokens: usize,
    pub theme_variants: usize,
    pub usages: usize,
    pub patterns: usize,
    pub token_edges: usize,
    pub component_edges: usize,
}

/// Result of a full rebuild.
#[derive(Debug)]
pub struct BuildReport {
    pub index_path: PathBuf,
    pub source_hash: String,
    pub stats: BuildStats,
    /// Data-quality findings: dangling references, duplicates, cycles
    pub warnings: Vec<String>,
}

/// Orchestrates a full rebuild against an open store.
pub struct IndexBuilder<'a> {
    config: &'a Config,
    store: &'a IndexStore,
    extractor: &'a dyn UsageExtractor,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(
        config: &'a Config,
        store: &'a IndexStore,
        extractor: &'a dyn UsageExtractor,
    ) -> Self {
        Self {
            config,
            store,
            extractor,
        }
    }

    /// Run a full build.
    ///
    /// Any unreadable source file aborts the whole build before the store is
    /// touched; the previous index stays in place.
    pub fn build(&self) -> Result<BuildReport> {
        let mut warnings = Vec::new();

        // 1. Enumerate and read the exact file set the hash covers
        let css_files = self.config.token_files()?;
        let source_files = self.config.source_files()?;

        let mut all_files: Vec<PathBuf> = Vec::new();
        all_files.extend(css_files.iter().cloned());
        all_files.extend(source_files.iter().cloned());
        all_files.sort();
        all_files.dedup();

        let mut manifest: Vec<(String, Vec<u8>)> = Vec::with_capacity(all_files.len());
        let mut file_text: HashMap<PathBuf, String> = HashMap::with_capacity(all_files.len());
        for path in &all_files {
            let bytes =
                std::fs::read(self.config.project_root.join(path)).map_err(|e| {
                    Error::UnreadableSource {
                        path: hash::normalize_path(path),
                        message: e.to_string(),
                    }
                })?;
            file_text.insert(path.clone(), String::from_utf8_lossy(&bytes).into_owned());
            manifest.push((hash::normalize_path(path), bytes));
        }
        let source_hash = hash::hash_manifest(&manifest);

        // 2. Token definitions and theme variants from CSS
        let mut tokens: BTreeMap<String, TokenDefinition> = BTreeMap::new();
        let mut themes: BTreeMap<(String, Theme), ThemeVariant> = BTreeMap::new();
        for path in &css_files {
            let rel = hash::normalize_path(path);
            let extraction = css::extract_tokens(&rel, &file_text[path]);
            warnings.extend(extraction.warnings);

            for token in extraction.tokens {
                if let Some(previous) = tokens.insert(token.name.clone(), token.clone()) {
                    warnings.push(format!(
                        "duplicate definition of {}: {}:{} overrides {}:{}",
                        token.name, token.file, token.line, previous.file, previous.line
                    ));
                }
            }
            for variant in extraction.themes {
                themes.insert((variant.token_name.clone(), variant.theme), variant);
            }
        }

        let known_tokens: HashSet<String> = tokens.keys().cloned().collect();
        for variant in themes.values() {
            if !known_tokens.contains(&variant.token_name) {
                warnings.push(format!(
                    "theme variant for undefined token {} at {}",
                    variant.token_name, variant.source
                ));
            }
        }

        // 3. Usages from the external extractor, re-validated here
        let mut usages: Vec<UsageRecord> = Vec::new();
        for path in &source_files {
            let rel = hash::normalize_path(path);
            let source = &file_text[path];
            let directive = context_directive(source);
            for raw in self.extractor.extract(path, source) {
                usages.push(UsageRecord {
                    file: rel.clone(),
                    line: raw.line,
                    column: raw.column,
                    class_name: raw.class_name.clone(),
                    resolved_token: classify::resolve_class_to_token_validated(
                        &raw.class_name,
                        &known_tokens,
                    ),
                    context: directive.unwrap_or_else(|| context_for_path(&rel)),
                    component: raw.component,
                });
            }
        }

        // 4. Patterns: co-occurring class sets per (file, line)
        let patterns = group_patterns(&usages);

        // 5. Token dependency closure
        let refs: BTreeMap<String, Vec<String>> = tokens
            .iter()
            .map(|(name, def)| (name.clone(), css::var_references(&def.value)))
            .collect();
        for (name, targets) in &refs {
            for target in targets {
                if !known_tokens.contains(target) {
                    warnings.push(format!(
                        "{} references undefined token {}",
                        name, target
                    ));
                }
            }
        }
        warnings.extend(detect_cycles(&refs));
        let token_edges = dependency_closure(&refs);

        // Resolve computed values now that the reference graph is known
        let mut memo: HashMap<String, Option<String>> = HashMap::new();
        let computed: Vec<(String, Option<String>)> = tokens
            .keys()
            .map(|name| {
                let mut visiting = HashSet::new();
                (
                    name.clone(),
                    compute_value(name, &tokens, &mut memo, &mut visiting),
                )
            })
            .collect();
        for (name, value) in computed {
            if let Some(def) = tokens.get_mut(&name) {
                def.computed_value = value;
            }
        }

        // 6. Component similarity from shared patterns
        let component_edges = component_closure(&patterns);

        let contents = IndexContents {
            tokens: tokens.into_values().collect(),
            themes: themes.into_values().collect(),
            usages,
            patterns,
            token_edges,
            component_edges,
            source_tree_hash: source_hash.clone(),
        };

        let stats = BuildStats {
            files_scanned: all_files.len(),
            tokens: contents.tokens.len(),
            theme_variants: contents.themes.len(),
            usages: contents.usages.len(),
            patterns: contents.patterns.len(),
            token_edges: contents.token_edges.len(),
            component_edges: contents.component_edges.len(),
        };

        tracing::info!(
            files = stats.files_scanned,
            tokens = stats.tokens,
            usages = stats.usages,
            patterns = stats.patterns,
            edges = stats.token_edges,
            warnings = warnings.len(),
            "Index built"
        );

        self.store.rebuild(&contents)?;

        Ok(BuildReport {
            index_path: self.config.index_path(),
            source_hash,
            stats,
            warnings,
        })
    }
}

/// Path-based context classification, overridable per file by an in-source
/// `tokenlint-context: <value>` directive.
fn context_for_path(file: &str) -> UsageContext {
    if file.contains("ui/") || file.contains("primitives/") {
        UsageContext::Primitive
    } else if file.contains("layouts/") || file.contains("templates/") {
        UsageContext::Layout
    } else {
        UsageContext::Composed
    }
}

fn context_directive(source: &str) -> Option<UsageContext> {
    let at = source.find("tokenlint-context")?;
    let rest = source[at + "tokenlint-context".len()..]
        .trim_start_matches(&[':', ' ', '\t'][..]);
    let word: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    word.parse().ok()
}

/// Collapse usages into patterns keyed by the canonical hash of each
/// `(file, line)` group's class set.
fn group_patterns(usages: &[UsageRecord]) -> Vec<PatternRecord> {
    let mut groups: BTreeMap<(String, u32), Vec<&UsageRecord>> = BTreeMap::new();
    for usage in usages {
        groups
            .entry((usage.file.clone(), usage.line))
            .or_default()
            .push(usage);
    }

    let mut patterns: BTreeMap<String, PatternRecord> = BTreeMap::new();
    for ((file, line), mut group) in groups {
        group.sort_by_key(|u| u.column);
        let classes: Vec<String> = group.iter().map(|u| u.class_name.clone()).collect();
        let hash = hash::hash_class_set(&classes);
        let component = group.iter().find_map(|u| u.component.clone());

        let record = patterns.entry(hash.clone()).or_insert_with(|| PatternRecord {
            hash,
            classes,
            count: 0,
            locations: Vec::new(),
        });
        record.count += 1;
        record.locations.push(PatternLocation {
            file,
            line,
            component,
        });
    }

    patterns.into_values().collect()
}

/// Transitive closure of the direct reference relation, breadth-first so
/// every (ancestor, descendant) pair is emitted at its minimum depth. Walks
/// stop at already-visited tokens, which truncates cycles; `detect_cycles`
/// reports them separately.
fn dependency_closure(refs: &BTreeMap<String, Vec<String>>) -> Vec<TokenGraphEdge> {
    let mut edges = Vec::new();

    for descendant in refs.keys() {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(descendant.clone());

        let mut queue: VecDeque<(String, Vec<String>)> = VecDeque::new();
        for ancestor in &refs[descendant] {
            if ancestor != descendant {
                queue.push_back((
                    ancestor.clone(),
                    vec![ancestor.clone(), descendant.clone()],
                ));
            }
        }

        while let Some((ancestor, path)) = queue.pop_front() {
            if !visited.insert(ancestor.clone()) {
                continue;
            }
            let depth = (path.len() - 1) as i64;
            edges.push(TokenGraphEdge {
                ancestor: ancestor.clone(),
                descendant: descendant.clone(),
                depth,
                path: path.clone(),
            });

            if depth as usize >= MAX_GRAPH_DEPTH {
                continue;
            }
            if let Some(next_refs) = refs.get(&ancestor) {
                for next in next_refs {
                    if !visited.contains(next) {
                        let mut next_path = Vec::with_capacity(path.len() + 1);
                        next_path.push(next.clone());
                        next_path.extend(path.iter().cloned());
                        queue.push_back((next.clone(), next_path));
                    }
                }
            }
        }
    }

    edges
}

/// Report dependency cycles once, by walking the direct-reference graph.
fn detect_cycles(refs: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut done: HashSet<&str> = HashSet::new();

    for start in refs.keys() {
        if done.contains(start.as_str()) {
            continue;
        }
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];

        while let Some(top) = stack.last_mut() {
            let (node, next_idx) = (top.0, top.1);
            top.1 += 1;
            if next_idx == 0 {
                path.push(node);
                on_path.insert(node);
            }
            let targets = refs.get(node).map(|v| v.as_slice()).unwrap_or(&[]);
            if next_idx < targets.len() {
                let target = targets[next_idx].as_str();
                if on_path.contains(target) {
                    let from = path.iter().position(|&n| n == target).unwrap_or(0);
                    let mut cycle: Vec<&str> = path[from..].to_vec();
                    cycle.push(target);
                    warnings.push(format!(
                        "token dependency cycle: {}",
                        cycle.join(" -> ")
                    ));
                } else if !done.contains(target) && refs.contains_key(target) {
                    stack.push((target, 0));
                }
            } else {
                stack.pop();
                path.pop();
                on_path.remove(node);
                done.insert(node);
            }
        }
    }

    warnings
}

/// Fully resolve a token's value to a literal, following `var()` references.
/// Returns None on any dangling reference or cycle.
fn compute_value(
    name: &str,
    tokens: &BTreeMap<String, TokenDefinition>,
    memo: &mut HashMap<String, Option<String>>,
    visiting: &mut HashSet<String>,
) -> Option<String> {
    if let Some(cached) = memo.get(name) {
        return cached.clone();
    }
    let def = tokens.get(name)?;
    if !visiting.insert(name.to_string()) {
        return None;
    }

    let value = def.value.clone();
    let mut out = String::with_capacity(value.len());
    let mut rest = value.as_str();
    let mut resolved = Some(());

    while let Some(start) = rest.find("var(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 4..];

        // Find the matching close paren, tolerating nested parens in fallbacks
        let mut depth = 1usize;
        let mut end = after.len();
        for (i, c) in after.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = i;
                        break;
                    }
                }
                _ => {}
            }
        }
        let inner = &after[..end];
        let (ref_name, fallback) = match inner.find(',') {
            Some(comma) => (inner[..comma].trim(), Some(inner[comma + 1..].trim())),
            None => (inner.trim(), None),
        };

        match compute_value(ref_name, tokens, memo, visiting).or(fallback.map(str::to_string)) {
            Some(sub) => out.push_str(&sub),
            None => {
                resolved = None;
                break;
            }
        }
        rest = &after[end.min(after.len())..];
        rest = rest.strip_prefix(')').unwrap_or(rest);
    }

    visiting.remove(name);

    let result = resolved.map(|_| {
        out.push_str(rest);
        out
    });
    memo.insert(name.to_string(), result.clone());
    result
}

/// Build component-similarity edges: one edge per unordered component pair,
/// weighted by the number of distinct patterns both appear in.
fn component_closure(patterns: &[PatternRecord]) -> Vec<ComponentGraphEdge> {
    let mut weights: BTreeMap<(String, String), i64> = BTreeMap::new();
    for pattern in patterns {
        let components: BTreeSet<&String> = pattern
            .locations
            .iter()
            .filter_map(|l| l.component.as_ref())
            .collect();
        let components: Vec<&String> = components.into_iter().collect();
        for i in 0..components.len() {
            for j in i + 1..components.len() {
                *weights
                    .entry((components[i].clone(), components[j].clone()))
                    .or_default() += 1;
            }
        }
    }
    weights
        .into_iter()
        .map(|((source, target), shared_patterns)| ComponentGraphEdge {
            source,
            target,
            shared_patterns,
        })
        .collect()
}
