//! Content hashing for index freshness and plan pinning
//!
//! All hashes are SHA-256 hex digests. The manifest hash is deterministic
//! irrespective of input iteration order (entries are sorted by normalized
//! path) and stable across platforms (path separators are normalized).

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Normalize a path for hashing: forward slashes regardless of platform.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Hash a sorted manifest of (path, content) entries.
///
/// Entries are sorted by normalized path before hashing, so callers may pass
/// them in any order. Pure: no I/O, no side effects.
pub fn hash_manifest(files: &[(String, Vec<u8>)]) -> String {
    let mut entries: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_slice()))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    for (path, content) in entries {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(content);
    }
    hex::encode(hasher.finalize())
}

/// Hash a single blob (used to pin a migration plan revision).
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Canonical hash of a class set: sorted and deduplicated before hashing,
/// so two usage sites with the same classes in any order collapse together.
pub fn hash_class_set(classes: &[String]) -> String {
    let mut sorted: Vec<&str> = classes.iter().map(|c| c.as_str()).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut hasher = Sha256::new();
    for class in sorted {
        hasher.update(class.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Read every file in `paths` (relative to `root`) and hash the manifest.
///
/// Any unreadable file is an error: the caller must abort rather than
/// produce a hash over a partial tree.
pub fn hash_source_tree(root: &Path, paths: &[PathBuf]) -> Result<String> {
    let mut manifest = Vec::with_capacity(paths.len());
    for path in paths {
        let abs = root.join(path);
        let content = std::fs::read(&abs).map_err(|e| Error::UnreadableSource {
            path: normalize_path(path),
            message: e.to_string(),
        })?;
        manifest.push((normalize_path(path), content));
    }
    Ok(hash_manifest(&manifest))
}
