//! Migration run state machine
//!
//! One run filters and orders the plan, applies each step to file text with
//! per-file backup, and persists the checkpoint after every step so a crash
//! between any two steps resumes cleanly. A step is terminal within a run
//! (`pending → applied | skipped | failed`); a fresh run with `--continue`
//! is the only retry mechanism, and it re-evaluates dependency skips.

use crate::error::{Error, Result};
use crate::migrate::apply::{self, ApplyOutcome};
use crate::migrate::checkpoint::{CheckpointStore, MigrationCheckpoint};
use crate::migrate::plan::{MigrationPlan, MigrationStep};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Terminal status of one step in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Applied,
    Skipped,
    Failed,
    Pending,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Applied => "applied",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed => "failed",
            StepStatus::Pending => "pending",
        }
    }
}

/// Character-count delta of one applied step.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffStats {
    pub removed: usize,
    pub added: usize,
}

/// Outcome of one step in one run.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step_id: String,
    pub status: StepStatus,
    pub file: String,
    pub action_description: String,
    pub error: Option<String>,
    pub diff: DiffStats,
}

/// Answer to an interactive confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    Yes,
    No,
    Quit,
    All,
}

impl std::str::FromStr for PromptAnswer {
    type Err = String;

    /// Case-insensitive; accepts the usual single-letter forms.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(PromptAnswer::Yes),
            "n" | "no" => Ok(PromptAnswer::No),
            "q" | "quit" => Ok(PromptAnswer::Quit),
            "a" | "all" => Ok(PromptAnswer::All),
            other => Err(format!("unrecognized answer: {}", other)),
        }
    }
}

/// Asks the operator before a step is applied. Injected so the core stays
/// terminal-free.
pub trait Prompter {
    fn confirm(&mut self, step: &MigrationStep) -> PromptAnswer;
}

/// Flags controlling one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Write changes to disk. When false the run is a dry run: steps are
    /// evaluated and reported, nothing is written and no checkpoint moves.
    pub apply: bool,
    /// Explicit include set (`--steps`); None means all
    pub steps: Option<HashSet<String>>,
    /// Exclude set (`--skip`)
    pub skip: HashSet<String>,
    /// Restrict to one file (`--file`)
    pub file: Option<String>,
    /// Resume from the checkpoint (`--continue`)
    pub resume: bool,
    /// Back up each touched file once per run (`--backup`, default on)
    pub backup: bool,
    /// Prompt before each step
    pub interactive: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            apply: false,
            steps: None,
            skip: HashSet::new(),
            file: None,
            resume: false,
            backup: true,
            interactive: false,
        }
    }
}

/// Aggregated counts for one run.
#[derive(Debug, Clone, Default)]
pub struct MigrationSummary {
    pub total: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pending: usize,
    pub files_touched: usize,
    pub chars_removed: usize,
    pub chars_added: usize,
    pub next_steps: Vec<String>,
}

/// Full report for one run: every step's result plus the summary. Produced
/// even when some steps fail, so partial success is always inspectable.
#[derive(Debug)]
pub struct MigrationReport {
    pub results: Vec<StepResult>,
    pub summary: MigrationSummary,
}

/// Executes migration plans against a project tree.
pub struct MigrationEngine<'a> {
    project_root: &'a Path,
    plan: &'a MigrationPlan,
    checkpoints: CheckpointStore,
    artifacts_path: PathBuf,
    options: RunOptions,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(
        project_root: &'a Path,
        plan: &'a MigrationPlan,
        checkpoints: CheckpointStore,
        artifacts_path: PathBuf,
        options: RunOptions,
    ) -> Self {
        Self {
            project_root,
            plan,
            checkpoints,
            artifacts_path,
            options,
        }
    }

    /// Run the plan. Integrity failures (checkpoint pinned to a different
    /// plan revision) abort before any file is touched.
    pub fn run(&self, mut prompter: Option<&mut dyn Prompter>) -> Result<MigrationReport> {
        let mut checkpoint = self.load_checkpoint()?;
        let completed: HashSet<String> = checkpoint.completed_steps.iter().cloned().collect();

        let selected = self.select_steps(&completed);
        let ordered = order_steps(&selected)?;

        tracing::info!(
            plan = %self.plan.path.display(),
            selected = ordered.len(),
            apply = self.options.apply,
            resume = self.options.resume,
            "Starting migration run"
        );

        let mut results: Vec<StepResult> = Vec::with_capacity(ordered.len());
        let mut failed_this_run: HashSet<String> = HashSet::new();
        let mut backed_up: HashSet<PathBuf> = HashSet::new();
        let mut artifacts: Vec<String> = Vec::new();
        let mut prompt_all = false;
        let mut quit = false;

        for step in &ordered {
            if quit {
                results.push(StepResult {
                    step_id: step.id.clone(),
                    status: StepStatus::Pending,
                    file: step.file.clone(),
                    action_description: step.action.describe(),
                    error: None,
                    diff: DiffStats::default(),
                });
                continue;
            }

            // Cascading-failure avoidance: a dependent of a step that failed
            // in this run is skipped, not attempted.
            if let Some(dep) = step
                .dependencies
                .iter()
                .find(|d| failed_this_run.contains(d.as_str()))
            {
                results.push(StepResult {
                    step_id: step.id.clone(),
                    status: StepStatus::Skipped,
                    file: step.file.clone(),
                    action_description: step.action.describe(),
                    error: Some(format!("dependency {} failed", dep)),
                    diff: DiffStats::default(),
                });
                checkpoint.record_skipped(&step.id);
                self.persist(&checkpoint)?;
                continue;
            }

            if self.options.interactive && !prompt_all {
                if let Some(p) = prompter.as_deref_mut() {
                    match p.confirm(step) {
                        PromptAnswer::Yes => {}
                        PromptAnswer::All => prompt_all = true,
                        PromptAnswer::No => {
                            results.push(StepResult {
                                step_id: step.id.clone(),
                                status: StepStatus::Skipped,
                                file: step.file.clone(),
                                action_description: step.action.describe(),
                                error: Some("declined".to_string()),
                                diff: DiffStats::default(),
                            });
                            checkpoint.record_skipped(&step.id);
                            self.persist(&checkpoint)?;
                            continue;
                        }
                        PromptAnswer::Quit => {
                            quit = true;
                            results.push(StepResult {
                                step_id: step.id.clone(),
                                status: StepStatus::Pending,
                                file: step.file.clone(),
                                action_description: step.action.describe(),
                                error: None,
                                diff: DiffStats::default(),
                            });
                            continue;
                        }
                    }
                }
            }

            match self.execute_step(step, &mut backed_up) {
                Ok(outcome) => {
                    if let Some(artifact) = &outcome.artifact {
                        artifacts.push(artifact.clone());
                    }
                    results.push(StepResult {
                        step_id: step.id.clone(),
                        status: StepStatus::Applied,
                        file: step.file.clone(),
                        action_description: step.action.describe(),
                        error: None,
                        diff: DiffStats {
                            removed: outcome.removed,
                            added: outcome.added,
                        },
                    });
                    checkpoint.record_completed(&step.id);
                    self.persist(&checkpoint)?;
                }
                Err(message) => {
                    tracing::warn!(step = %step.id, error = %message, "Step failed");
                    results.push(StepResult {
                        step_id: step.id.clone(),
                        status: StepStatus::Failed,
                        file: step.file.clone(),
                        action_description: step.action.describe(),
                        error: Some(message),
                        diff: DiffStats::default(),
                    });
                    failed_this_run.insert(step.id.clone());
                    checkpoint.record_failed(&step.id);
                    self.persist(&checkpoint)?;
                }
            }
        }

        if self.options.apply && !artifacts.is_empty() {
            self.append_artifacts(&artifacts)?;
        }

        let summary = summarize(&results, &self.options);
        Ok(MigrationReport { results, summary })
    }

    fn load_checkpoint(&self) -> Result<MigrationCheckpoint> {
        if self.options.resume {
            if let Some(existing) = self.checkpoints.load(&self.plan.path)? {
                if existing.plan_hash != self.plan.hash {
                    return Err(Error::CheckpointMismatch {
                        recorded: existing.plan_hash,
                        actual: self.plan.hash.clone(),
                    });
                }
                return Ok(existing);
            }
        }
        Ok(MigrationCheckpoint::new(&self.plan.path, &self.plan.hash))
    }

    fn select_steps(&self, completed: &HashSet<String>) -> Vec<&'a MigrationStep> {
        self.plan
            .steps
            .iter()
            .filter(|step| {
                self.options
                    .steps
                    .as_ref()
                    .map(|include| include.contains(&step.id))
                    .unwrap_or(true)
                    && !self.options.skip.contains(&step.id)
                    && self
                        .options
                        .file
                        .as_ref()
                        .map(|f| &step.file == f)
                        .unwrap_or(true)
                    && !(self.options.resume && completed.contains(&step.id))
            })
            .collect()
    }

    /// Read, transform, back up, and write one step's target file.
    /// Every failure is captured as a message; nothing escapes as a run error.
    fn execute_step(
        &self,
        step: &MigrationStep,
        backed_up: &mut HashSet<PathBuf>,
    ) -> std::result::Result<ApplyOutcome, String> {
        let path = self.project_root.join(&step.file);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {}", step.file, e))?;

        let outcome = apply::apply_action(&text, step).map_err(|e| e.to_string())?;

        if self.options.apply {
            if self.options.backup && !backed_up.contains(&path) {
                let backup = PathBuf::from(format!("{}.bak", path.display()));
                // One backup per distinct file per run, before the first write
                std::fs::copy(&path, &backup)
                    .map_err(|e| format!("cannot back up {}: {}", step.file, e))?;
                backed_up.insert(path.clone());
            }
            std::fs::write(&path, &outcome.text)
                .map_err(|e| format!("cannot write {}: {}", step.file, e))?;
        }

        Ok(outcome)
    }

    fn persist(&self, checkpoint: &MigrationCheckpoint) -> Result<()> {
        if self.options.apply {
            self.checkpoints.save(checkpoint)?;
        }
        Ok(())
    }

    fn append_artifacts(&self, artifacts: &[String]) -> Result<()> {
        use std::io::Write;
        if let Some(parent) = self.artifacts_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.artifacts_path)?;
        for artifact in artifacts {
            file.write_all(artifact.as_bytes())?;
        }
        Ok(())
    }
}

/// Stable topological order: steps with no dependency edges keep their
/// original relative order. Dependencies outside the current selection do
/// not gate ordering.
fn order_steps<'s>(selected: &[&'s MigrationStep]) -> Result<Vec<&'s MigrationStep>> {
    let in_run: HashSet<&str> = selected.iter().map(|s| s.id.as_str()).collect();
    let mut emitted: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<&MigrationStep> = selected.to_vec();
    let mut ordered = Vec::with_capacity(selected.len());

    while !remaining.is_empty() {
        let position = remaining.iter().position(|step| {
            step.dependencies
                .iter()
                .all(|d| !in_run.contains(d.as_str()) || emitted.contains(d.as_str()))
        });
        match position {
            Some(i) => {
                let step = remaining.remove(i);
                emitted.insert(step.id.as_str());
                ordered.push(step);
            }
            None => {
                return Err(Error::InvalidPlan(format!(
                    "dependency cycle involving step {}",
                    remaining[0].id
                )))
            }
        }
    }

    Ok(ordered)
}

/// Aggregate results and attach guidance for the next invocation.
fn summarize(results: &[StepResult], options: &RunOptions) -> MigrationSummary {
    let mut summary = MigrationSummary {
        total: results.len(),
        ..Default::default()
    };
    let mut files: HashSet<&str> = HashSet::new();

    for result in results {
        match result.status {
            StepStatus::Applied => {
                summary.applied += 1;
                summary.chars_removed += result.diff.removed;
                summary.chars_added += result.diff.added;
                files.insert(result.file.as_str());
            }
            StepStatus::Skipped => summary.skipped += 1,
            StepStatus::Failed => summary.failed += 1,
            StepStatus::Pending => summary.pending += 1,
        }
    }
    summary.files_touched = files.len();

    if !options.apply && summary.total > 0 {
        summary
            .next_steps
            .push("dry run only; re-run with --apply to write changes".to_string());
    }
    if summary.failed > 0 {
        summary.next_steps.push(
            "some steps failed; re-run with --continue --apply to retry them and their dependents"
                .to_string(),
        );
    }
    if summary.pending > 0 {
        summary
            .next_steps
            .push("run again with --continue to process pending steps".to_string());
    }
    if options.apply && summary.applied > 0 {
        summary
            .next_steps
            .push("rewrites applied; run `build` to refresh the index".to_string());
    }

    summary
}
