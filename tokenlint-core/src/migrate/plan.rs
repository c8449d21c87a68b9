//! Migration plan loading and validation
//!
//! Plans are produced by an external planning step and consumed read-only.
//! The plan hash pins checkpoints to an exact plan revision.

use crate::error::{Error, Result};
use crate::hash;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Step severity as assigned by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// The four supported rewrite kinds, as a closed sum so the apply dispatch
/// is exhaustively checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MigrationAction {
    /// Substitute literal `from` text with `to` at the step anchor
    Replace { from: String, to: String },
    /// Replace a literal class-list occurrence with a utility name and emit
    /// the `@utility` block as a side artifact
    Extract {
        pattern: String,
        #[serde(rename = "utilityName")]
        utility_name: String,
    },
    /// Rewrite an arbitrary-value class to its token shorthand and emit the
    /// token definition as a side artifact
    Tokenize {
        value: String,
        #[serde(rename = "tokenName")]
        token_name: String,
    },
    /// Delete a class from a class list along with one separating space
    Remove {
        #[serde(rename = "className")]
        class_name: String,
    },
}

impl MigrationAction {
    /// One-line human description, used in step results and prompts.
    pub fn describe(&self) -> String {
        match self {
            MigrationAction::Replace { from, to } => {
                format!("replace `{}` with `{}`", from, to)
            }
            MigrationAction::Extract {
                pattern,
                utility_name,
            } => format!("extract `{}` into utility `{}`", pattern, utility_name),
            MigrationAction::Tokenize { value, token_name } => {
                format!("tokenize `{}` as `{}`", value, token_name)
            }
            MigrationAction::Remove { class_name } => {
                format!("remove class `{}`", class_name)
            }
        }
    }
}

/// Before/after snippet attached by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    pub before: String,
    pub after: String,
}

/// One planned rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationStep {
    /// Unique within the plan
    pub id: String,
    /// Target file, project-relative
    pub file: String,
    /// 1-based anchor line
    pub line: u32,
    /// 1-based anchor column
    pub column: u32,
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub severity: Severity,
    pub action: MigrationAction,
    /// Planner confidence in [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub preview: Option<Preview>,
    /// Step ids that must apply before this one
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// On-disk plan shape.
#[derive(Debug, Deserialize)]
struct PlanFile {
    steps: Vec<MigrationStep>,
}

/// A loaded, validated plan plus its revision hash.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub path: PathBuf,
    /// SHA-256 of the plan file bytes; pins checkpoints to this revision
    pub hash: String,
    pub steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    /// Load and validate a plan file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let hash = hash::hash_bytes(&bytes);
        let file: PlanFile = serde_json::from_slice(&bytes)?;
        validate_steps(&file.steps)?;

        tracing::debug!(
            path = %path.display(),
            steps = file.steps.len(),
            hash = %hash,
            "Loaded migration plan"
        );

        Ok(Self {
            path: path.to_path_buf(),
            hash,
            steps: file.steps,
        })
    }

    pub fn step(&self, id: &str) -> Option<&MigrationStep> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Unique ids, dependencies that exist, no dependency cycles.
fn validate_steps(steps: &[MigrationStep]) -> Result<()> {
    let mut ids = HashSet::new();
    for step in steps {
        if !ids.insert(step.id.as_str()) {
            return Err(Error::InvalidPlan(format!("duplicate step id: {}", step.id)));
        }
    }

    for step in steps {
        for dep in &step.dependencies {
            if !ids.contains(dep.as_str()) {
                return Err(Error::InvalidPlan(format!(
                    "step {} depends on unknown step {}",
                    step.id, dep
                )));
            }
        }
    }

    // Cycle check: repeatedly remove steps with no unresolved dependencies
    let mut remaining: Vec<&MigrationStep> = steps.iter().collect();
    let mut resolved: HashSet<&str> = HashSet::new();
    while !remaining.is_empty() {
        let before = remaining.len();
        remaining.retain(|step| {
            if step
                .dependencies
                .iter()
                .all(|d| resolved.contains(d.as_str()))
            {
                resolved.insert(step.id.as_str());
                false
            } else {
                true
            }
        });
        if remaining.len() == before {
            return Err(Error::InvalidPlan(format!(
                "dependency cycle involving step {}",
                remaining[0].id
            )));
        }
    }

    Ok(())
}
