//! tokenlint - design-token linter and refactoring tool
//!
//! Commands:
//! - `build`   - rebuild the token index from the source tree
//! - `check`   - verify the index is fresh against the live tree
//! - `trace`   - walk a token or class through the cascade
//! - `migrate` - apply a migration plan with checkpointed resumption
//!
//! All state lives under the project-local `.tokenlint/` directory.

mod extract;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use extract::ClassAttributeExtractor;
use std::io::Write;
use std::path::PathBuf;
use tokenlint_core::cascade;
use tokenlint_core::index::{check_fresh, IndexBuilder, IndexStore};
use tokenlint_core::migrate::{
    CheckpointStore, MigrationEngine, MigrationPlan, MigrationStep, PromptAnswer, Prompter,
    RunOptions,
};
use tokenlint_core::Config;

#[derive(Parser)]
#[command(name = "tokenlint")]
#[command(about = "Design-token linter and refactoring tool")]
#[command(version)]
struct Args {
    /// Project root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the token index from the source tree
    Build,
    /// Check whether the index matches the live source tree
    Check,
    /// Trace a token or class through the cascade
    Trace {
        /// A token name (`--color-accent`) or class name (`bg-accent`)
        selector: String,

        /// Maximum usages to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Run a migration plan
    Migrate {
        /// Path to the plan file (JSON)
        plan: PathBuf,

        /// Write changes (default is a dry run)
        #[arg(long)]
        apply: bool,

        /// Only run these step ids
        #[arg(long, value_delimiter = ',')]
        steps: Vec<String>,

        /// Exclude these step ids
        #[arg(long, value_delimiter = ',')]
        skip: Vec<String>,

        /// Restrict to one file
        #[arg(long)]
        file: Option<String>,

        /// Resume from the checkpoint, excluding completed steps
        #[arg(long = "continue")]
        resume: bool,

        /// Skip per-file backups
        #[arg(long)]
        no_backup: bool,

        /// Confirm each step before applying
        #[arg(short, long)]
        interactive: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("project root not found: {}", args.root.display()))?;
    let config = Config::load(&root).context("failed to load configuration")?;
    let _log_guard =
        tokenlint_core::logging::init(&config).context("failed to initialize logging")?;

    match args.command {
        Command::Build => build(&config),
        Command::Check => check(&config),
        Command::Trace { selector, limit } => trace(&config, &selector, limit),
        Command::Migrate {
            plan,
            apply,
            steps,
            skip,
            file,
            resume,
            no_backup,
            interactive,
        } => {
            let options = RunOptions {
                apply,
                steps: if steps.is_empty() {
                    None
                } else {
                    Some(steps.into_iter().collect())
                },
                skip: skip.into_iter().collect(),
                file,
                resume,
                backup: !no_backup,
                interactive,
            };
            migrate(&config, &plan, options)
        }
    }
}

fn build(config: &Config) -> Result<()> {
    let store = IndexStore::create(&config.index_path()).context("failed to open index")?;
    let builder = IndexBuilder::new(config, &store, &ClassAttributeExtractor);
    let report = builder.build().context("index build failed")?;

    println!("Index: {}", report.index_path.display());
    println!(
        "Scanned {} files: {} tokens ({} theme variants), {} usages, {} patterns, {} graph edges",
        report.stats.files_scanned,
        report.stats.tokens,
        report.stats.theme_variants,
        report.stats.usages,
        report.stats.patterns,
        report.stats.token_edges,
    );
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    Ok(())
}

fn check(config: &Config) -> Result<()> {
    let store = IndexStore::open(&config.index_path())?;
    let freshness = check_fresh(&store, config)?;
    if freshness.fresh {
        println!("Index is fresh ({})", &freshness.actual[..12]);
        Ok(())
    } else {
        println!(
            "Index is stale: expected {}, tree is {}",
            freshness
                .expected
                .as_deref()
                .map(|h| &h[..12])
                .unwrap_or("<no index>"),
            &freshness.actual[..12]
        );
        std::process::exit(1);
    }
}

fn trace(config: &Config, selector: &str, limit: usize) -> Result<()> {
    let store = IndexStore::open(&config.index_path())?;
    let result = cascade::resolve(&store, selector, limit)?;

    println!("selector: {}", result.selector);
    match &result.definition {
        Some(def) => {
            println!(
                "token:    {} = {} ({}:{})",
                def.name, def.value, def.file, def.line
            );
            if let Some(computed) = &def.computed_value {
                println!("computed: {}", computed);
            }
        }
        None => println!("token:    <no definition>"),
    }

    if !result.ancestors.is_empty() {
        println!("depends on:");
        for edge in &result.ancestors {
            println!("  {} (depth {}): {}", edge.ancestor, edge.depth, edge.path.join(" -> "));
        }
    }
    if let Some(light) = &result.themes.light {
        println!("light:    {} ({})", light.value, light.source);
    }
    if let Some(dark) = &result.themes.dark {
        println!("dark:     {} ({})", dark.value, dark.source);
    }
    if !result.dependents.is_empty() {
        println!("dependents: {}", result.dependents.join(", "));
    }
    if !result.usages.is_empty() {
        println!("usages:");
        for usage in &result.usages {
            println!(
                "  {}:{}:{} {} [{}]",
                usage.file,
                usage.line,
                usage.column,
                usage.class_name,
                usage.context.as_str()
            );
        }
    }

    println!("confidence: {}", result.limits.confidence.as_str());
    for missing in &result.limits.missing {
        println!("  missing: {}", missing.as_str());
    }
    for limitation in &result.limits.limitations {
        println!("  limitation: {}", limitation);
    }
    Ok(())
}

fn migrate(config: &Config, plan_path: &PathBuf, options: RunOptions) -> Result<()> {
    let plan = MigrationPlan::load(plan_path).context("failed to load migration plan")?;
    let checkpoints = CheckpointStore::new(config.checkpoint_dir());
    let engine = MigrationEngine::new(
        &config.project_root,
        &plan,
        checkpoints,
        config.artifacts_path(),
        options,
    );

    let mut prompter = StdinPrompter;
    let report = engine.run(Some(&mut prompter))?;

    for result in &report.results {
        let mark = match result.status.as_str() {
            "applied" => "+",
            "failed" => "!",
            "skipped" => "-",
            _ => "?",
        };
        print!(
            "{} {} [{}] {} {}",
            mark,
            result.step_id,
            result.status.as_str(),
            result.file,
            result.action_description
        );
        match &result.error {
            Some(error) => println!(": {}", error),
            None => println!(),
        }
    }

    let summary = &report.summary;
    println!(
        "\n{} steps: {} applied, {} skipped, {} failed, {} pending",
        summary.total, summary.applied, summary.skipped, summary.failed, summary.pending
    );
    println!(
        "{} files touched, -{} +{} chars",
        summary.files_touched, summary.chars_removed, summary.chars_added
    );
    for next in &summary.next_steps {
        println!("next: {}", next);
    }
    Ok(())
}

/// Interactive confirmation over stdin.
struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&mut self, step: &MigrationStep) -> PromptAnswer {
        loop {
            print!(
                "apply {} ({})? [yes/no/all/quit] ",
                step.id,
                step.action.describe()
            );
            std::io::stdout().flush().ok();

            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                // EOF or read error halts the run rather than looping forever
                Ok(0) | Err(_) => return PromptAnswer::Quit,
                Ok(_) => {}
            }
            match line.parse::<PromptAnswer>() {
                Ok(answer) => return answer,
                Err(_) => println!("please answer yes, no, all, or quit"),
            }
        }
    }
}
