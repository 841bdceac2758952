//! Persisted pack store: atomic, compressed, binary-serialized files.
//!
//! A pack is a value encoded as MessagePack (with field names, so the format
//! is self-describing and tolerant of added fields) and gzip-compressed. It is
//! used for the fast hash ledger and is generic enough for any other persisted
//! map.
//!
//! ## Atomicity
//!
//! Writes go to a temporary sibling file and are then renamed over the target:
//!
//! ```text
//! .fastcache.pack.tmp.<pid>.<seq>   ← written and flushed
//! .fastcache.pack                   ← rename(tmp, target)
//! ```
//!
//! The temporary name is unique per call (process id + a process-wide
//! sequence number), so overlapping writers never share a temp file, and a
//! reader only ever observes a complete old file or a complete new one.
//!
//! Reads propagate every failure. Callers decide what a failed read means;
//! for caches that is always "cold cache", never a fatal error.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Pack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("Pack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique temporary sibling path for an atomic write to `path`.
fn temp_path(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.tmp.{}.{seq}", std::process::id()))
}

/// Write `bytes` to `path` via temp file + rename.
///
/// The parent directory is created if missing. On failure the temp file is
/// removed on a best-effort basis and the target is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    write_atomic_with(path, |w| w.write_all(bytes))
}

fn write_atomic_with<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<std::fs::File>) -> io::Result<()>,
{
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    let result = (|| {
        let file = std::fs::File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        fill(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

/// Serialize, compress and atomically write `value` to `path`.
pub fn write_pack<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let encoded = rmp_serde::to_vec_named(value)?;
    write_atomic_with(path, |w| {
        let mut gz = GzEncoder::new(w, Compression::best());
        gz.write_all(&encoded)?;
        gz.finish()?;
        Ok(())
    })?;
    Ok(())
}

/// Read, decompress and deserialize a pack written by [`write_pack`].
pub fn read_pack<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let file = std::fs::File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    Ok(rmp_serde::from_read(decoder)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Sample {
        name: String,
        values: BTreeMap<String, u64>,
    }

    fn sample() -> Sample {
        let mut values = BTreeMap::new();
        values.insert("a/b.png".to_string(), 17);
        values.insert("c.jpg".to_string(), 42);
        Sample {
            name: "ledger".into(),
            values,
        }
    }

    #[test]
    fn pack_written_then_read_matches() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sample.pack");
        write_pack(&path, &sample()).unwrap();

        let loaded: Sample = read_pack(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn pack_is_gzip_compressed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sample.pack");
        write_pack(&path, &sample()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn write_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/sample.pack");
        write_pack(&path, &sample()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn write_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sample.pack");
        write_pack(&path, &sample()).unwrap();
        write_pack(&path, &sample()).unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["sample.pack".to_string()]);
    }

    #[test]
    fn temp_paths_are_unique_per_call() {
        let path = Path::new("/data/.fastcache.pack");
        assert_ne!(temp_path(path), temp_path(path));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result: Result<Sample, _> = read_pack(&tmp.path().join("absent.pack"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn read_corrupt_file_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("corrupt.pack");
        std::fs::write(&path, b"definitely not gzip").unwrap();
        let result: Result<Sample, _> = read_pack(&path);
        assert!(result.is_err());
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("details.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }
}
