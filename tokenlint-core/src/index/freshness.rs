//! Index freshness checking
//!
//! An index is fresh when the content hash of the live source tree matches
//! the hash recorded at build time. The check enumerates the same file set
//! the builder hashes, so any content change to a scanned file flips it.

use crate::config::Config;
use crate::error::Result;
use crate::hash;
use crate::index::store::IndexStore;

/// Outcome of a freshness check.
#[derive(Debug, Clone)]
pub struct Freshness {
    pub fresh: bool,
    /// Hash recorded in the index meta, if any
    pub expected: Option<String>,
    /// Hash of the live tree
    pub actual: String,
}

/// Compare the live source hash against the one recorded in the index.
/// Missing metadata means not fresh.
pub fn check_fresh(store: &IndexStore, config: &Config) -> Result<Freshness> {
    let mut files = config.token_files()?;
    files.extend(config.source_files()?);
    files.sort();
    files.dedup();

    let actual = hash::hash_source_tree(&config.project_root, &files)?;
    let expected = store.meta()?.map(|m| m.source_tree_hash);
    let fresh = expected.as_deref() == Some(actual.as_str());

    if !fresh {
        tracing::debug!(
            expected = expected.as_deref().unwrap_or("<none>"),
            actual = %actual,
            "Index is stale"
        );
    }

    Ok(Freshness {
        fresh,
        expected,
        actual,
    })
}
