//! Garbage collection of unreferenced output directories.
//!
//! After a resolution pass the media engine knows every hash it touched (the
//! live set). A directory under the public root is garbage when it is not
//! live and has no `.keep.mark`. Deletion is recursive, and every target is
//! checked to stay inside the public root before anything is removed.

use crate::media::KEEP_MARK;
use std::collections::BTreeSet;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GcReport {
    pub deleted: Vec<String>,
    /// Targets refused because they resolve outside the public root.
    pub skipped: Vec<String>,
    /// Targets whose removal failed, with the error.
    pub failed: Vec<(String, String)>,
}

/// Output directories not in `live` and lacking a keep mark, sorted.
///
/// A missing public root has no garbage.
pub fn unused_hashes(public: &Path, live: &BTreeSet<String>) -> io::Result<Vec<String>> {
    let entries = match std::fs::read_dir(public) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut unused = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if live.contains(&name) || entry.path().join(KEEP_MARK).exists() {
            continue;
        }
        unused.push(name);
    }
    unused.sort();
    Ok(unused)
}

/// Lexically resolve `name` under `root`; `None` if it would leave `root`.
fn contained(root: &Path, name: &str) -> Option<PathBuf> {
    let mut depth = 0usize;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => depth = depth.checked_sub(1)?,
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (depth > 0).then(|| root.join(name))
}

/// Remove each hash directory. Never fails as a whole; problems are logged
/// and reported per target.
pub fn delete_hashes(public: &Path, hashes: &[String]) -> GcReport {
    let mut report = GcReport::default();
    for hash in hashes {
        let Some(target) = contained(public, hash) else {
            tracing::warn!(hash = hash.as_str(), public = %public.display(), "Refusing to delete outside the public root");
            report.skipped.push(hash.clone());
            continue;
        };
        match std::fs::remove_dir_all(&target) {
            Ok(()) => {
                tracing::info!(hash = hash.as_str(), "Deleted unused output");
                report.deleted.push(hash.clone());
            }
            Err(e) => {
                tracing::warn!(hash = hash.as_str(), error = %e, "Failed to delete unused output");
                report.failed.push((hash.clone(), e.to_string()));
            }
        }
    }
    report
}
