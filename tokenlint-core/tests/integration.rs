//! Integration tests for the index build and migration pipeline
//!
//! These tests build small fixture projects under a temp directory and
//! exercise the end-to-end flows: build → freshness → cascade, and
//! plan → run → checkpoint → resume.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokenlint_core::cascade::{self, Confidence, MissingData};
use tokenlint_core::index::{check_fresh, Feature, IndexBuilder, IndexStore};
use tokenlint_core::migrate::{
    CheckpointStore, MigrationEngine, MigrationPlan, MigrationStep, PromptAnswer, Prompter,
    RunOptions, StepStatus,
};
use tokenlint_core::{Config, RawUsage, UsageExtractor};

// ============================================
// Fixtures
// ============================================

/// Minimal className scanner standing in for the external syntax extractor.
struct StubExtractor;

impl UsageExtractor for StubExtractor {
    fn extract(&self, file: &Path, source: &str) -> Vec<RawUsage> {
        let component = file
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| s.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
            .map(|s| s.to_string());

        let mut usages = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            let Some(at) = line.find("className=\"") else {
                continue;
            };
            let value_start = at + "className=\"".len();
            let Some(rel_end) = line[value_start..].find('"') else {
                continue;
            };
            let value = &line[value_start..value_start + rel_end];
            let mut offset = 0usize;
            for part in value.split(' ') {
                if !part.is_empty() {
                    usages.push(RawUsage {
                        line: (idx + 1) as u32,
                        column: (value_start + offset + 1) as u32,
                        class_name: part.to_string(),
                        component: component.clone(),
                    });
                }
                offset += part.len() + 1;
            }
        }
        usages
    }
}

const THEME_CSS: &str = r#"@layer base {
  :root {
    --color-base: #3366ff;
    --color-accent: var(--color-base);
  }
}

.dark {
  --color-accent: #88aaff;
}
"#;

const BUTTON_TSX: &str = r#"export function Button() {
  return <button className="bg-accent text-white" />;
}
"#;

const CART_TSX: &str = r#"export function Cart() {
  return <div className="text-white bg-accent" />;
}
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn fixture_project() -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/theme.css", THEME_CSS);
    write(dir.path(), "src/ui/Button.tsx", BUTTON_TSX);
    write(dir.path(), "src/features/Cart.tsx", CART_TSX);
    let config = Config::load(dir.path()).unwrap();
    (dir, config)
}

fn build_index(config: &Config) -> IndexStore {
    let store = IndexStore::create(&config.index_path()).unwrap();
    let builder = IndexBuilder::new(config, &store, &StubExtractor);
    builder.build().unwrap();
    store
}

// ============================================
// Build + freshness
// ============================================

#[test]
fn test_build_populates_all_relations() {
    let (_dir, config) = fixture_project();
    let store = IndexStore::create(&config.index_path()).unwrap();
    let builder = IndexBuilder::new(&config, &store, &StubExtractor);
    let report = builder.build().unwrap();

    assert_eq!(report.stats.tokens, 2);
    assert_eq!(report.stats.theme_variants, 1);
    assert_eq!(report.stats.usages, 4);
    // Both sites share one class *set* regardless of order
    assert_eq!(report.stats.patterns, 1);
    assert_eq!(report.stats.token_edges, 1);
    assert!(report.warnings.is_empty());

    // Usage resolution is validated: bg-accent resolves, text-white does not
    let accents = store.usages_by_token("--color-accent", 10).unwrap();
    assert_eq!(accents.len(), 2);
    let whites = store.usages_by_class("text-white", 10).unwrap();
    assert!(whites.iter().all(|u| u.resolved_token.is_none()));

    // Context classification follows the path
    let button_usages = store.usages_by_class("bg-accent", 10).unwrap();
    let button = button_usages
        .iter()
        .find(|u| u.file.contains("Button"))
        .unwrap();
    assert_eq!(button.context.as_str(), "primitive");
    let cart = button_usages
        .iter()
        .find(|u| u.file.contains("Cart"))
        .unwrap();
    assert_eq!(cart.context.as_str(), "composed");
}

#[test]
fn test_pattern_collapses_order_insensitive_sets() {
    let (_dir, config) = fixture_project();
    let store = build_index(&config);

    let patterns = store.top_patterns(2, 10).unwrap();
    assert_eq!(patterns.len(), 1);
    let pattern = &patterns[0];
    assert_eq!(pattern.count, 2);
    assert_eq!(pattern.locations.len(), 2);
    let components: HashSet<_> = pattern
        .locations
        .iter()
        .filter_map(|l| l.component.as_deref())
        .collect();
    assert_eq!(components, HashSet::from(["Button", "Cart"]));
}

#[test]
fn test_freshness_round_trip() {
    let (dir, config) = fixture_project();
    let store = build_index(&config);

    let fresh = check_fresh(&store, &config).unwrap();
    assert!(fresh.fresh, "unmodified tree must be fresh");

    // Touching any scanned file's content flips it
    write(
        dir.path(),
        "src/ui/Button.tsx",
        "export function Button() { return null; }\n",
    );
    let stale = check_fresh(&store, &config).unwrap();
    assert!(!stale.fresh);
    assert_eq!(stale.expected.as_deref(), Some(fresh.actual.as_str()));
}

#[test]
fn test_build_replaces_previous_index() {
    let (dir, config) = fixture_project();
    let store = build_index(&config);
    assert_eq!(store.stats().unwrap().usages, 4);

    // Remove a component and rebuild: old rows must be gone
    std::fs::remove_file(dir.path().join("src/features/Cart.tsx")).unwrap();
    let builder = IndexBuilder::new(&config, &store, &StubExtractor);
    builder.build().unwrap();
    assert_eq!(store.stats().unwrap().usages, 2);
    assert!(check_fresh(&store, &config).unwrap().fresh);
}

#[test]
fn test_component_similarity_from_shared_patterns() {
    let (_dir, config) = fixture_project();
    let store = build_index(&config);

    let similar = store.similar_components("Button", 10).unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].shared_patterns, 1);
}

// ============================================
// Cascade
// ============================================

#[test]
fn test_cascade_confidence_monotonicity() {
    let (_dir, config) = fixture_project();
    let store = build_index(&config);

    // --color-base: definition, no theme variants, has a dependent
    let base = cascade::resolve(&store, "--color-base", 10).unwrap();
    assert_eq!(base.limits.confidence, Confidence::Partial);
    assert_eq!(base.limits.missing, vec![MissingData::ThemeVariants]);
    assert_eq!(base.dependents, vec!["--color-accent".to_string()]);

    // --color-accent: definition + dark variant, but no dependents
    let accent = cascade::resolve(&store, "--color-accent", 10).unwrap();
    assert_eq!(accent.limits.confidence, Confidence::Partial);
    assert_eq!(accent.limits.missing, vec![MissingData::TokenDependencies]);
    assert!(accent.themes.dark.is_some());
    assert!(accent.themes.light.is_none());
    assert_eq!(accent.ancestors.len(), 1);
    assert_eq!(accent.ancestors[0].ancestor, "--color-base");
}

#[test]
fn test_cascade_via_class_selector() {
    let (_dir, config) = fixture_project();
    let store = build_index(&config);

    let result = cascade::resolve(&store, "bg-accent", 10).unwrap();
    assert_eq!(result.resolved_token.as_deref(), Some("--color-accent"));
    assert_eq!(result.usages.len(), 2);
}

#[test]
fn test_cascade_degrades_against_v1_index() {
    let (_dir, config) = fixture_project();
    let store = build_index(&config);

    // Rewrite the meta version as an older release would have left it
    store
        .connection()
        .execute(
            "UPDATE meta SET value = '1' WHERE key = 'schema_version'",
            [],
        )
        .unwrap();
    assert_eq!(store.schema_version().unwrap(), 1);

    let result = cascade::resolve(&store, "--color-accent", 10).unwrap();
    // Theme data is omitted with a limitation, never an error
    assert!(result.themes.dark.is_none());
    assert!(result
        .limits
        .limitations
        .iter()
        .any(|l| l.contains("token_themes")));
    assert!(!result
        .limits
        .missing
        .contains(&MissingData::ThemeVariants));

    // But a caller that explicitly requires the feature fails fast
    let err = tokenlint_core::index::require_feature(1, Feature::TokenThemes).unwrap_err();
    assert!(err.to_string().contains("requires index schema v2"));
}

// ============================================
// Migration engine
// ============================================

const MIGRATE_BUTTON: &str = "export function Button() {\n  return <button className=\"bg-[#ff0000] text-white\" />;\n}\n";

fn two_step_plan(root: &Path) -> PathBuf {
    let plan_path = root.join("plan.json");
    std::fs::write(
        &plan_path,
        r#"{
  "steps": [
    {
      "id": "step-1",
      "file": "src/ui/Button.tsx",
      "line": 2,
      "column": 29,
      "ruleId": "tokenize-arbitrary-color",
      "severity": "warning",
      "action": {"type": "tokenize", "value": "bg-[#ff0000]", "tokenName": "--color-brand"},
      "confidence": 0.95
    },
    {
      "id": "step-2",
      "file": "src/ui/Button.tsx",
      "line": 2,
      "column": 42,
      "ruleId": "retarget-token",
      "severity": "warning",
      "action": {"type": "replace", "from": "text-white", "to": "text-(--color-on-brand)"},
      "confidence": 0.9,
      "dependencies": ["step-1"]
    }
  ]
}"#,
    )
    .unwrap();
    plan_path
}

fn engine_fixture(button_content: &str) -> (TempDir, Config, PathBuf) {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/ui/Button.tsx", button_content);
    let config = Config::load(dir.path()).unwrap();
    let plan_path = two_step_plan(dir.path());
    (dir, config, plan_path)
}

fn run_engine(config: &Config, plan_path: &Path, options: RunOptions) -> tokenlint_core::migrate::MigrationReport {
    let plan = MigrationPlan::load(plan_path).unwrap();
    let engine = MigrationEngine::new(
        &config.project_root,
        &plan,
        CheckpointStore::new(config.checkpoint_dir()),
        config.artifacts_path(),
        options,
    );
    engine.run(None).unwrap()
}

#[test]
fn test_two_step_plan_applies_in_order() {
    let (dir, config, plan_path) = engine_fixture(MIGRATE_BUTTON);

    let report = run_engine(
        &config,
        &plan_path,
        RunOptions {
            apply: true,
            ..Default::default()
        },
    );

    assert_eq!(report.summary.applied, 2);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.results[0].step_id, "step-1");
    assert_eq!(report.results[0].status, StepStatus::Applied);
    assert_eq!(report.results[1].status, StepStatus::Applied);

    let rewritten = std::fs::read_to_string(dir.path().join("src/ui/Button.tsx")).unwrap();
    assert!(rewritten.contains("className=\"bg-(--color-brand) text-(--color-on-brand)\""));

    // Side artifact: the new token definition
    let artifacts = std::fs::read_to_string(config.artifacts_path()).unwrap();
    assert!(artifacts.contains("--color-brand: #ff0000;"));

    // One backup per distinct file, holding the pre-run content
    let backup = std::fs::read_to_string(dir.path().join("src/ui/Button.tsx.bak")).unwrap();
    assert_eq!(backup, MIGRATE_BUTTON);
}

#[test]
fn test_failed_step_skips_dependents_and_leaves_file_untouched() {
    // step-1's value is absent: it must fail, step-2 must be skipped,
    // and the file must remain byte-identical
    let content = "export function Button() {\n  return <button className=\"bg-red-500 text-white\" />;\n}\n";
    let (dir, config, plan_path) = engine_fixture(content);

    let report = run_engine(
        &config,
        &plan_path,
        RunOptions {
            apply: true,
            ..Default::default()
        },
    );

    assert_eq!(report.results[0].status, StepStatus::Failed);
    assert!(report.results[0].error.as_deref().unwrap().contains("bg-[#ff0000]"));
    assert_eq!(report.results[1].status, StepStatus::Skipped);
    assert!(report.results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("step-1"));

    let after = std::fs::read_to_string(dir.path().join("src/ui/Button.tsx")).unwrap();
    assert_eq!(after, content);
    assert!(!dir.path().join("src/ui/Button.tsx.bak").exists());
}

#[test]
fn test_continue_after_success_applies_nothing() {
    let (_dir, config, plan_path) = engine_fixture(MIGRATE_BUTTON);

    let first = run_engine(
        &config,
        &plan_path,
        RunOptions {
            apply: true,
            ..Default::default()
        },
    );
    assert_eq!(first.summary.applied, 2);

    let second = run_engine(
        &config,
        &plan_path,
        RunOptions {
            apply: true,
            resume: true,
            ..Default::default()
        },
    );
    assert_eq!(second.summary.total, 0);
    assert_eq!(second.summary.applied, 0);
}

#[test]
fn test_continue_retries_failed_steps() {
    let content = "export function Button() {\n  return <button className=\"bg-red-500 text-white\" />;\n}\n";
    let (dir, config, plan_path) = engine_fixture(content);

    let first = run_engine(
        &config,
        &plan_path,
        RunOptions {
            apply: true,
            ..Default::default()
        },
    );
    assert_eq!(first.summary.failed, 1);

    // Fix the file so step-1's value now exists, then resume
    write(dir.path(), "src/ui/Button.tsx", MIGRATE_BUTTON);
    let second = run_engine(
        &config,
        &plan_path,
        RunOptions {
            apply: true,
            resume: true,
            ..Default::default()
        },
    );
    assert_eq!(second.summary.applied, 2);

    let rewritten = std::fs::read_to_string(dir.path().join("src/ui/Button.tsx")).unwrap();
    assert!(rewritten.contains("bg-(--color-brand)"));
}

#[test]
fn test_changed_plan_invalidates_continue() {
    let (_dir, config, plan_path) = engine_fixture(MIGRATE_BUTTON);

    run_engine(
        &config,
        &plan_path,
        RunOptions {
            apply: true,
            steps: Some(HashSet::from(["step-1".to_string()])),
            ..Default::default()
        },
    );

    // Any byte change to the plan is a new revision
    let mut text = std::fs::read_to_string(&plan_path).unwrap();
    text.push('\n');
    std::fs::write(&plan_path, text).unwrap();

    let plan = MigrationPlan::load(&plan_path).unwrap();
    let engine = MigrationEngine::new(
        &config.project_root,
        &plan,
        CheckpointStore::new(config.checkpoint_dir()),
        config.artifacts_path(),
        RunOptions {
            apply: true,
            resume: true,
            ..Default::default()
        },
    );
    let err = engine.run(None).unwrap_err();
    assert!(matches!(
        err,
        tokenlint_core::Error::CheckpointMismatch { .. }
    ));
}

#[test]
fn test_dry_run_writes_nothing() {
    let (dir, config, plan_path) = engine_fixture(MIGRATE_BUTTON);

    let report = run_engine(&config, &plan_path, RunOptions::default());
    assert_eq!(report.summary.applied, 2);
    assert!(report
        .summary
        .next_steps
        .iter()
        .any(|s| s.contains("--apply")));

    let untouched = std::fs::read_to_string(dir.path().join("src/ui/Button.tsx")).unwrap();
    assert_eq!(untouched, MIGRATE_BUTTON);
    assert!(!config.artifacts_path().exists());
    // Dry runs leave no checkpoint behind
    let checkpoints = CheckpointStore::new(config.checkpoint_dir());
    assert!(checkpoints.load(&plan_path).unwrap().is_none());
}

#[test]
fn test_interactive_quit_leaves_pending() {
    struct QuitFirst {
        asked: usize,
    }
    impl Prompter for QuitFirst {
        fn confirm(&mut self, _step: &MigrationStep) -> PromptAnswer {
            self.asked += 1;
            PromptAnswer::Quit
        }
    }

    let (dir, config, plan_path) = engine_fixture(MIGRATE_BUTTON);
    let plan = MigrationPlan::load(&plan_path).unwrap();
    let engine = MigrationEngine::new(
        &config.project_root,
        &plan,
        CheckpointStore::new(config.checkpoint_dir()),
        config.artifacts_path(),
        RunOptions {
            apply: true,
            interactive: true,
            ..Default::default()
        },
    );
    let mut prompter = QuitFirst { asked: 0 };
    let report = engine.run(Some(&mut prompter)).unwrap();

    assert_eq!(prompter.asked, 1);
    assert!(report
        .results
        .iter()
        .all(|r| r.status == StepStatus::Pending));
    let untouched = std::fs::read_to_string(dir.path().join("src/ui/Button.tsx")).unwrap();
    assert_eq!(untouched, MIGRATE_BUTTON);
}

#[test]
fn test_interactive_all_stops_prompting() {
    struct AllOnce {
        asked: usize,
    }
    impl Prompter for AllOnce {
        fn confirm(&mut self, _step: &MigrationStep) -> PromptAnswer {
            self.asked += 1;
            PromptAnswer::All
        }
    }

    let (_dir, config, plan_path) = engine_fixture(MIGRATE_BUTTON);
    let plan = MigrationPlan::load(&plan_path).unwrap();
    let engine = MigrationEngine::new(
        &config.project_root,
        &plan,
        CheckpointStore::new(config.checkpoint_dir()),
        config.artifacts_path(),
        RunOptions {
            apply: true,
            interactive: true,
            ..Default::default()
        },
    );
    let mut prompter = AllOnce { asked: 0 };
    let report = engine.run(Some(&mut prompter)).unwrap();

    assert_eq!(prompter.asked, 1);
    assert_eq!(report.summary.applied, 2);
}

#[test]
fn test_file_filter_restricts_run() {
    let (_dir, config, plan_path) = engine_fixture(MIGRATE_BUTTON);

    let report = run_engine(
        &config,
        &plan_path,
        RunOptions {
            apply: true,
            file: Some("src/other/Nope.tsx".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(report.summary.total, 0);
}
