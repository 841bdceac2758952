//! Fast hash cache: skip re-hashing unchanged source files across runs.
//!
//! Hashing every source image on every resolution pass means reading every
//! byte of every image. This ledger remembers, per data-root-relative path,
//! the file's modification time and content hash from the last time it was
//! hashed.
//!
//! # Trust rule
//!
//! An entry is trusted only while the file's current mtime equals the stored
//! mtime. Any drift (content edit, `touch`, checkout) forces a rehash. The
//! ledger is a memoization table only; it never decides what to process.
//!
//! ```text
//! lookup(full, rel) → (Some(hash), mtime)   entry present, mtime unchanged
//!                   → (None,       mtime)   no entry, or mtime drifted
//! update(full, rel, hash, Some(mtime))      reuse the mtime seen by lookup
//! ```
//!
//! # Storage
//!
//! Persisted through the [pack store](crate::store) at
//! `<data_root>/.fastcache.pack`. A missing, corrupt or version-mismatched
//! file loads as an empty ledger (full rehash), never an error.

use crate::store::{self, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the persisted ledger within the data root.
pub const LEDGER_FILENAME: &str = ".fastcache.pack";

/// Version of the persisted ledger format. Bump this to invalidate every
/// existing ledger when the format or hash computation changes.
const LEDGER_VERSION: u32 = 1;

/// File modification time in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mtime(pub i64);

impl Mtime {
    pub fn of(path: &Path) -> io::Result<Self> {
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(Self::from_system_time(modified))
    }

    fn from_system_time(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self(d.as_nanos() as i64),
            Err(e) => Self(-(e.duration().as_nanos() as i64)),
        }
    }
}

/// A single ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastEntry {
    pub mtime: Mtime,
    pub hash: String,
}

/// Result of a ledger lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Trusted hash, or `None` on a miss.
    pub hash: Option<String>,
    /// Mtime observed during the lookup, to pass back to [`FastHashCache::update`].
    pub mtime: Mtime,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedLedger {
    version: u32,
    entries: HashMap<String, FastEntry>,
}

/// In-memory ledger mapping relative source paths to `{mtime, hash}`.
///
/// The mutex only makes the ledger shareable across worker threads; every
/// operation is a single short critical section.
#[derive(Debug, Default)]
pub struct FastHashCache {
    entries: Mutex<HashMap<String, FastEntry>>,
    dirty: AtomicBool,
}

impl FastHashCache {
    /// Empty ledger (first run, or after a failed load).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the ledger from the data root, degrading to empty on any failure.
    pub fn load(data_root: &Path) -> Self {
        let path = ledger_path(data_root);
        let persisted: PersistedLedger = match store::read_pack(&path) {
            Ok(p) => p,
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No fast hash ledger yet; starting cold");
                return Self::empty();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable fast hash ledger; starting cold");
                return Self::empty();
            }
        };
        if persisted.version != LEDGER_VERSION {
            tracing::warn!(
                found = persisted.version,
                expected = LEDGER_VERSION,
                "Fast hash ledger version mismatch; starting cold"
            );
            return Self::empty();
        }
        Self {
            entries: Mutex::new(persisted.entries),
            dirty: AtomicBool::new(false),
        }
    }

    /// Persist the ledger if it changed since it was loaded or last flushed.
    pub fn flush(&self, data_root: &Path) -> Result<(), StoreError> {
        if !self.dirty.load(Ordering::Acquire) {
            return Ok(());
        }
        let persisted = PersistedLedger {
            version: LEDGER_VERSION,
            entries: self.lock().clone(),
        };
        store::write_pack(&ledger_path(data_root), &persisted)?;
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    /// Look up the trusted hash for `relpath`, statting `fullpath` once.
    pub fn lookup(&self, fullpath: &Path, relpath: &str) -> io::Result<Lookup> {
        let mtime = Mtime::of(fullpath)?;
        let hash = self
            .lock()
            .get(relpath)
            .filter(|entry| entry.mtime == mtime)
            .map(|entry| entry.hash.clone());
        Ok(Lookup { hash, mtime })
    }

    /// Record `hash` for `relpath`, reusing `mtime` when the caller has one.
    pub fn update(
        &self,
        fullpath: &Path,
        relpath: &str,
        hash: String,
        mtime: Option<Mtime>,
    ) -> io::Result<()> {
        let mtime = match mtime {
            Some(m) => m,
            None => Mtime::of(fullpath)?,
        };
        self.lock()
            .insert(relpath.to_string(), FastEntry { mtime, hash });
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    /// Drop every entry so the next pass rehashes every media file.
    pub fn clear(&self) {
        self.lock().clear();
        self.dirty.store(true, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FastEntry>> {
        self.entries.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Resolve the ledger path for a data root.
pub fn ledger_path(data_root: &Path) -> PathBuf {
    data_root.join(LEDGER_FILENAME)
}
