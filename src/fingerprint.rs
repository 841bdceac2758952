//! Source-tree fingerprint: the version token of a resolved model.
//!
//! The structure map is `relpath → content hash` for every recognized
//! content file under the data root. Documents are hashed directly (they
//! are small and their bytes are the model); media go through the fast hash
//! ledger so an unchanged tree costs one `stat` per file. The SHA-256 of the
//! map is the token: any added, removed, renamed or edited file changes it.
//!
//! Media hashes are recorded in the ledger here, before any asset is
//! processed. An entry is the hash of the bytes at that mtime, so it stays
//! correct even if the asset later fails to transcode.

use crate::digest;
use crate::fastcache::FastHashCache;
use crate::tree::{ContentKind, ContentTree};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Failed to walk data root: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Failed to hash {path}: {source}")]
    Hash { path: PathBuf, source: io::Error },
    #[error("Failed to serialize structure map: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// `relpath → content hash` for the whole tree.
pub fn structure_map(
    tree: &ContentTree,
    ledger: &FastHashCache,
) -> Result<BTreeMap<String, String>, FingerprintError> {
    let mut map = BTreeMap::new();
    for file in tree.files()? {
        let hash_error = |source: io::Error| FingerprintError::Hash {
            path: file.path.clone(),
            source,
        };
        let hash = match file.kind {
            ContentKind::Document => digest::hash_file(&file.path).map_err(hash_error)?,
            ContentKind::Media => {
                let seen = ledger.lookup(&file.path, &file.relpath).map_err(hash_error)?;
                match seen.hash {
                    Some(hash) => hash,
                    None => {
                        let hash = digest::hash_file(&file.path).map_err(hash_error)?;
                        ledger
                            .update(&file.path, &file.relpath, hash.clone(), Some(seen.mtime))
                            .map_err(hash_error)?;
                        hash
                    }
                }
            }
        };
        map.insert(file.relpath, hash);
    }
    Ok(map)
}

/// Version token of the tree.
pub fn fingerprint(tree: &ContentTree, ledger: &FastHashCache) -> Result<String, FingerprintError> {
    let map = structure_map(tree, ledger)?;
    tracing::debug!(files = map.len(), "Fingerprinted data root");
    Ok(digest::version_token(&map)?)
}
