//! Media transform engine: content-addressed derivative generation.
//!
//! Every source file is identified by its [content hash](crate::digest). All
//! derivatives of a source live in `<public>/<hash>/`, so identical bytes
//! always map to the same directory regardless of file name or location.
//!
//! ```text
//! <public>/<hash>/
//! ├── 640x480.avif … 3840x2880.webp   full-size ladder
//! ├── 160x160.avif … 320x320.webp     square thumbnails
//! ├── details.json                    Picture manifest (completion marker)
//! └── .keep.mark                      optional GC protection
//! ```
//!
//! ## Processing an image
//!
//! 1. Hash the source (or reuse the fast-cache hash) and record it as live.
//! 2. If `details.json` parses, return it: no decode, no encode.
//! 3. Claim the hash (a concurrent caller for the same hash waits and then
//!    re-reads the manifest), then take a slot from the global [`Limiter`].
//! 4. Decode once, render the transformation matrix, write the manifest.
//!
//! A directory without a readable `details.json` is treated as unprocessed,
//! so an interrupted run is simply redone next time.

use crate::digest;
use crate::fastcache::{FastHashCache, Mtime};
use crate::imaging::{self, BackendError, ImageBackend, Position};
use crate::limiter::{ClaimTable, Limiter};
use crate::store;
use crate::types::Picture;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Manifest written last into every processed image directory.
pub const DETAILS_FILENAME: &str = "details.json";

/// Sentinel protecting a directory from garbage collection.
pub const KEEP_MARK: &str = ".keep.mark";

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Image processing failed for {path}: {source}")]
    Backend {
        path: PathBuf,
        source: BackendError,
    },
    #[error("Failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Per-call processing options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Crop anchor for square thumbnails.
    pub position: Option<Position>,
    /// Write `.keep.mark` so GC never removes the output.
    pub force_keep: bool,
}

/// Counters for one engine's lifetime.
#[derive(Debug, Default)]
pub struct TransformStats {
    cached: AtomicU32,
    encoded: AtomicU32,
    copied: AtomicU32,
}

/// Point-in-time copy of [`TransformStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cached: u32,
    pub encoded: u32,
    pub copied: u32,
}

impl StatsSnapshot {
    pub fn total(&self) -> u32 {
        self.cached + self.encoded + self.copied
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total() == 0 {
            return write!(f, "no media");
        }
        write!(
            f,
            "{} cached, {} encoded, {} copied ({} total)",
            self.cached,
            self.encoded,
            self.copied,
            self.total()
        )
    }
}

impl TransformStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cached: self.cached.load(Ordering::Relaxed),
            encoded: self.encoded.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.cached.store(0, Ordering::Relaxed);
        self.encoded.store(0, Ordering::Relaxed);
        self.copied.store(0, Ordering::Relaxed);
    }
}

/// Content-addressed media engine over an [`ImageBackend`].
pub struct MediaEngine<B: ImageBackend> {
    backend: B,
    public_dir: PathBuf,
    url_prefix: String,
    limiter: Limiter,
    claims: ClaimTable,
    live: Mutex<BTreeSet<String>>,
    stats: TransformStats,
}

impl<B: ImageBackend> MediaEngine<B> {
    /// `slots` caps concurrent transcodes (see [`Limiter`]).
    pub fn new(backend: B, public_dir: &Path, url_prefix: &str, slots: usize) -> Self {
        Self {
            backend,
            public_dir: public_dir.to_path_buf(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            limiter: Limiter::new(slots),
            claims: ClaimTable::new(),
            live: Mutex::new(BTreeSet::new()),
            stats: TransformStats::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Hashes touched since the last [`reset_live`](Self::reset_live).
    pub fn live_hashes(&self) -> BTreeSet<String> {
        self.lock_live().clone()
    }

    /// Start a new resolution pass: forget live hashes and counters.
    pub fn reset_live(&self) {
        self.lock_live().clear();
        self.stats.reset();
    }

    /// Process an image, hashing its bytes directly.
    pub fn process_image(
        &self,
        source: &Path,
        options: ProcessOptions,
    ) -> Result<Picture, MediaError> {
        let hash = hash_source(source)?;
        self.process_hashed_image(source, &hash, options)
    }

    /// Process an image, consulting and updating the fast hash cache.
    ///
    /// The ledger is updated only after the asset succeeded.
    pub fn process_image_cached(
        &self,
        ledger: &FastHashCache,
        source: &Path,
        relpath: &str,
        options: ProcessOptions,
    ) -> Result<Picture, MediaError> {
        let (hash, pending) = cached_hash(ledger, source, relpath)?;
        let picture = self.process_hashed_image(source, &hash, options)?;
        if let Some(mtime) = pending {
            ledger
                .update(source, relpath, hash, Some(mtime))
                .map_err(|e| read_error(source, e))?;
        }
        Ok(picture)
    }

    /// Copy a video into its content-addressed directory and return its URL.
    ///
    /// The stored name is `variant` plus the source extension.
    pub fn process_video(
        &self,
        source: &Path,
        variant: &str,
        options: ProcessOptions,
    ) -> Result<String, MediaError> {
        let hash = hash_source(source)?;
        self.process_hashed_video(source, &hash, variant, options)
    }

    pub fn process_video_cached(
        &self,
        ledger: &FastHashCache,
        source: &Path,
        relpath: &str,
        variant: &str,
        options: ProcessOptions,
    ) -> Result<String, MediaError> {
        let (hash, pending) = cached_hash(ledger, source, relpath)?;
        let url = self.process_hashed_video(source, &hash, variant, options)?;
        if let Some(mtime) = pending {
            ledger
                .update(source, relpath, hash, Some(mtime))
                .map_err(|e| read_error(source, e))?;
        }
        Ok(url)
    }

    fn process_hashed_image(
        &self,
        source: &Path,
        hash: &str,
        options: ProcessOptions,
    ) -> Result<Picture, MediaError> {
        self.mark_live(hash);
        let out_dir = self.public_dir.join(hash);

        if let Some(picture) = self.read_manifest(hash) {
            return self.reuse(picture, &out_dir, hash, options);
        }

        let _claim = self.claims.claim(hash);
        // Another worker may have finished this hash while we waited.
        if let Some(picture) = self.read_manifest(hash) {
            return self.reuse(picture, &out_dir, hash, options);
        }

        let _permit = self.limiter.acquire();
        tracing::debug!(hash, source = %source.display(), "Transcoding image");

        std::fs::create_dir_all(&out_dir).map_err(|e| write_error(&out_dir, e))?;
        let url_base = format!("{}/{hash}", self.url_prefix);
        let picture = imaging::create_picture(
            &self.backend,
            source,
            &out_dir,
            &url_base,
            hash,
            options.position.unwrap_or_default(),
        )
        .map_err(|e| MediaError::Backend {
            path: source.to_path_buf(),
            source: e,
        })?;

        let details = out_dir.join(DETAILS_FILENAME);
        store::write_atomic(&details, &manifest_json(&picture)?)
            .map_err(|e| write_error(&details, e))?;
        if options.force_keep {
            write_keep_mark(&out_dir)?;
        }

        self.stats.encoded.fetch_add(1, Ordering::Relaxed);
        tracing::info!(hash, source = %source.display(), "Processed image");
        Ok(picture)
    }

    fn reuse(
        &self,
        picture: Picture,
        out_dir: &Path,
        hash: &str,
        options: ProcessOptions,
    ) -> Result<Picture, MediaError> {
        if options.force_keep && !out_dir.join(KEEP_MARK).exists() {
            write_keep_mark(out_dir)?;
        }
        self.stats.cached.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(hash, "Reusing processed image");
        Ok(picture)
    }

    fn process_hashed_video(
        &self,
        source: &Path,
        hash: &str,
        variant: &str,
        options: ProcessOptions,
    ) -> Result<String, MediaError> {
        self.mark_live(hash);
        let file_name = match source.extension() {
            Some(ext) => format!("{variant}.{}", ext.to_string_lossy()),
            None => variant.to_string(),
        };
        let out_dir = self.public_dir.join(hash);
        let dest = out_dir.join(&file_name);

        {
            let _claim = self.claims.claim(hash);
            // Same hash means same bytes: an existing copy is already correct.
            if dest.exists() {
                self.stats.cached.fetch_add(1, Ordering::Relaxed);
            } else {
                std::fs::create_dir_all(&out_dir).map_err(|e| write_error(&out_dir, e))?;
                std::fs::copy(source, &dest).map_err(|e| write_error(&dest, e))?;
                self.stats.copied.fetch_add(1, Ordering::Relaxed);
                tracing::info!(hash, source = %source.display(), "Copied video");
            }
            if options.force_keep {
                write_keep_mark(&out_dir)?;
            }
        }

        Ok(format!("{}/{hash}/{file_name}", self.url_prefix))
    }

    /// Parse `<hash>/details.json`; any failure means "not processed".
    fn read_manifest(&self, hash: &str) -> Option<Picture> {
        let path = self.public_dir.join(hash).join(DETAILS_FILENAME);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(picture) => Some(picture),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable manifest; reprocessing");
                None
            }
        }
    }

    fn mark_live(&self, hash: &str) {
        self.lock_live().insert(hash.to_string());
    }

    fn lock_live(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.live.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

fn read_error(path: &Path, source: std::io::Error) -> MediaError {
    MediaError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn write_error(path: &Path, source: std::io::Error) -> MediaError {
    MediaError::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn hash_source(source: &Path) -> Result<String, MediaError> {
    digest::hash_file(source).map_err(|e| read_error(source, e))
}

/// Hash from the ledger, or freshly computed plus the mtime to record once
/// the asset succeeds.
fn cached_hash(
    ledger: &FastHashCache,
    source: &Path,
    relpath: &str,
) -> Result<(String, Option<Mtime>), MediaError> {
    let seen = ledger
        .lookup(source, relpath)
        .map_err(|e| read_error(source, e))?;
    match seen.hash {
        Some(hash) => Ok((hash, None)),
        None => Ok((hash_source(source)?, Some(seen.mtime))),
    }
}

fn write_keep_mark(out_dir: &Path) -> Result<(), MediaError> {
    std::fs::create_dir_all(out_dir).map_err(|e| write_error(out_dir, e))?;
    let mark = out_dir.join(KEEP_MARK);
    std::fs::write(&mark, b"").map_err(|e| write_error(&mark, e))
}

/// Pretty JSON with 4-space indentation.
fn manifest_json(picture: &Picture) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    picture.serialize(&mut ser)?;
    Ok(buf)
}
