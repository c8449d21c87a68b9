//! Migration execution layer
//!
//! A resumable, dependency-ordered batch editor: loads a step plan, filters
//! and orders it, applies textual transformations with per-file backup, and
//! checkpoints progress after every step.
//!
//! ```text
//! ┌────────────┐     ┌─────────────────┐     ┌──────────────┐
//! │ Plan file  │ ──► │ MigrationEngine │ ──► │ Source files │
//! │  (JSON)    │     │                 │     │  + backups   │
//! └────────────┘     └────────┬────────┘     └──────────────┘
//!                             ▼
//!                    ┌─────────────────┐
//!                    │   Checkpoint    │  (sole source of truth for --continue)
//!                    └─────────────────┘
//! ```

pub mod apply;
pub mod checkpoint;
pub mod engine;
pub mod plan;

pub use apply::{apply_action, ApplyError, ApplyOutcome, ANCHOR_WINDOW};
pub use checkpoint::{CheckpointStore, MigrationCheckpoint};
pub use engine::{
    DiffStats, MigrationEngine, MigrationReport, MigrationSummary, PromptAnswer, Prompter,
    RunOptions, StepResult, StepStatus,
};
pub use plan::{MigrationAction, MigrationPlan, MigrationStep, Preview, Severity};
