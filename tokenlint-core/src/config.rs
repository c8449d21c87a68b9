//! Configuration loading and path resolution
//!
//! Configuration is loaded from `tokenlint.toml` at the project root when
//! present; every field has a default so a project with no config file still
//! works. All derived state (index, checkpoints, logs, migration artifacts)
//! lives under a project-local state directory, `.tokenlint/`.
//!
//! The index and migration cores only ever consume the resolved paths; they
//! never parse TOML themselves.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the optional config file at the project root.
const CONFIG_FILE: &str = "tokenlint.toml";

/// Name of the project-local state directory.
const STATE_DIR: &str = ".tokenlint";

/// Resolved configuration for one project.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute project root
    pub project_root: PathBuf,
    /// Glob patterns (relative to root) for component source files
    pub source_globs: Vec<String>,
    /// Glob patterns (relative to root) for token-definition CSS files
    pub token_globs: Vec<String>,
    /// Path substrings to ignore during scans
    pub ignore: Vec<String>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// On-disk shape of `tokenlint.toml`.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default = "default_source_globs")]
    source: Vec<String>,
    #[serde(default = "default_token_globs")]
    tokens: Vec<String>,
    #[serde(default = "default_ignore")]
    ignore: Vec<String>,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_source_globs() -> Vec<String> {
    vec![
        "src/**/*.tsx".to_string(),
        "src/**/*.jsx".to_string(),
        "src/**/*.html".to_string(),
    ]
}

fn default_token_globs() -> Vec<String> {
    vec!["src/**/*.css".to_string(), "styles/**/*.css".to_string()]
}

fn default_ignore() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".tokenlint".to_string(),
        "dist".to_string(),
    ]
}

impl Config {
    /// Load configuration for a project, reading `tokenlint.toml` if present.
    pub fn load(project_root: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(project_root.join(CONFIG_FILE)) {
            Ok(text) => toml::from_str::<RawConfig>(&text)
                .map_err(|e| Error::Config(format!("{}: {}", CONFIG_FILE, e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RawConfig {
                source: default_source_globs(),
                tokens: default_token_globs(),
                ignore: default_ignore(),
                logging: LoggingConfig::default(),
            },
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            project_root: project_root.to_path_buf(),
            source_globs: raw.source,
            token_globs: raw.tokens,
            ignore: raw.ignore,
            logging: raw.logging,
        })
    }

    /// Project-local state directory
    pub fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    /// Path of the persisted index database
    pub fn index_path(&self) -> PathBuf {
        self.state_dir().join("index.db")
    }

    /// Directory holding migration checkpoints
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.state_dir().join("checkpoints")
    }

    /// Sidecar file migration side artifacts are appended to
    pub fn artifacts_path(&self) -> PathBuf {
        self.state_dir().join("migration-artifacts.css")
    }

    /// Directory log files are written to
    pub fn log_dir(&self) -> PathBuf {
        self.state_dir().join("logs")
    }

    /// Enumerate files matching `globs`, relative to the project root,
    /// skipping ignored paths. Results are sorted for determinism.
    pub fn enumerate(&self, globs: &[String]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for pattern in globs {
            let absolute = self.project_root.join(pattern);
            let pattern_str = absolute.to_string_lossy().to_string();
            for entry in glob::glob(&pattern_str)
                .map_err(|e| Error::Config(format!("bad glob {}: {}", pattern, e)))?
            {
                let path = entry.map_err(|e| Error::Config(e.to_string()))?;
                if !path.is_file() {
                    continue;
                }
                let rel = path
                    .strip_prefix(&self.project_root)
                    .unwrap_or(&path)
                    .to_path_buf();
                let rel_str = rel.to_string_lossy();
                if self.ignore.iter().any(|ig| rel_str.contains(ig.as_str())) {
                    continue;
                }
                files.push(rel);
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// All component source files
    pub fn source_files(&self) -> Result<Vec<PathBuf>> {
        self.enumerate(&self.source_globs)
    }

    /// All token-definition CSS files
    pub fn token_files(&self) -> Result<Vec<PathBuf>> {
        self.enumerate(&self.token_globs)
    }
}
