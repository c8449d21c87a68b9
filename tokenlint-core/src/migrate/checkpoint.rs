//! Migration checkpoints
//!
//! A checkpoint records exactly which steps of a plan have completed, failed,
//! or been skipped, keyed by plan identity and pinned to the plan revision
//! hash. It is rewritten after every step so a run interrupted between any
//! two steps resumes cleanly with `--continue`. The checkpoint — not the
//! filesystem — is the authoritative record of what a run did.

use crate::error::Result;
use crate::hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted per-plan progress record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationCheckpoint {
    pub plan_path: String,
    pub plan_hash: String,
    pub completed_steps: Vec<String>,
    pub failed_steps: Vec<String>,
    pub skipped_steps: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl MigrationCheckpoint {
    pub fn new(plan_path: &Path, plan_hash: &str) -> Self {
        Self {
            plan_path: hash::normalize_path(plan_path),
            plan_hash: plan_hash.to_string(),
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            skipped_steps: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    fn remove_everywhere(&mut self, id: &str) {
        self.completed_steps.retain(|s| s != id);
        self.failed_steps.retain(|s| s != id);
        self.skipped_steps.retain(|s| s != id);
    }

    /// Record a completed step. A step retried after a prior failure moves
    /// out of the failed set.
    pub fn record_completed(&mut self, id: &str) {
        self.remove_everywhere(id);
        self.completed_steps.push(id.to_string());
        self.last_updated = Utc::now();
    }

    pub fn record_failed(&mut self, id: &str) {
        self.remove_everywhere(id);
        self.failed_steps.push(id.to_string());
        self.last_updated = Utc::now();
    }

    pub fn record_skipped(&mut self, id: &str) {
        self.remove_everywhere(id);
        self.skipped_steps.push(id.to_string());
        self.last_updated = Utc::now();
    }
}

/// Reads and writes checkpoints in a state directory, one file per plan.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Checkpoint file for a plan, keyed by the hash of its normalized path
    /// so unrelated plans never collide.
    fn file_for(&self, plan_path: &Path) -> PathBuf {
        let key = hash::hash_bytes(hash::normalize_path(plan_path).as_bytes());
        self.dir.join(format!("{}.json", &key[..16]))
    }

    pub fn load(&self, plan_path: &Path) -> Result<Option<MigrationCheckpoint>> {
        let path = self.file_for(plan_path);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, checkpoint: &MigrationCheckpoint) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.file_for(Path::new(&checkpoint.plan_path));
        std::fs::write(&path, serde_json::to_string_pretty(checkpoint)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().to_path_buf());
        let plan_path = Path::new("plans/migrate.json");

        assert!(store.load(plan_path).unwrap().is_none());

        let mut checkpoint = MigrationCheckpoint::new(plan_path, "abc123");
        checkpoint.record_completed("step-1");
        checkpoint.record_failed("step-2");
        store.save(&checkpoint).unwrap();

        let loaded = store.load(plan_path).unwrap().unwrap();
        assert_eq!(loaded.plan_hash, "abc123");
        assert_eq!(loaded.completed_steps, vec!["step-1".to_string()]);
        assert_eq!(loaded.failed_steps, vec!["step-2".to_string()]);
    }

    #[test]
    fn test_retried_step_moves_between_sets() {
        let mut checkpoint = MigrationCheckpoint::new(Path::new("p.json"), "h");
        checkpoint.record_failed("step-1");
        checkpoint.record_completed("step-1");
        assert!(checkpoint.failed_steps.is_empty());
        assert_eq!(checkpoint.completed_steps, vec!["step-1".to_string()]);
    }

    #[test]
    fn test_serialized_shape_is_camel_case() {
        let checkpoint = MigrationCheckpoint::new(Path::new("p.json"), "h");
        let json = serde_json::to_string(&checkpoint).unwrap();
        assert!(json.contains("\"planPath\""));
        assert!(json.contains("\"planHash\""));
        assert!(json.contains("\"completedSteps\""));
        assert!(json.contains("\"lastUpdated\""));
    }

    #[test]
    fn test_distinct_plans_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().to_path_buf());

        let a = MigrationCheckpoint::new(Path::new("a.json"), "ha");
        let b = MigrationCheckpoint::new(Path::new("b.json"), "hb");
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        assert_eq!(
            store.load(Path::new("a.json")).unwrap().unwrap().plan_hash,
            "ha"
        );
        assert_eq!(
            store.load(Path::new("b.json")).unwrap().unwrap().plan_hash,
            "hb"
        );
    }
}
