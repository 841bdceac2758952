//! Content digests.
//!
//! Two kinds of identifiers are produced here:
//!
//! - **Content hash**: names a content-addressed output directory and is the
//!   fallback slug for pieces without an explicit id. It is the MD5 hex digest
//!   truncated to its suffix starting at [`CONTENT_HASH_OFFSET`], i.e. 8 hex
//!   characters. This is a short, collision-tolerant identifier kept for
//!   compatibility with existing output trees, not a cryptographic commitment.
//!   Do not change the offset without migrating every published asset URL.
//! - **Version token**: SHA-256 over the serialized structure map of the
//!   source tree (see [`crate::fingerprint`]).

use md5::Md5;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Offset into the 32-char MD5 hex digest where the content hash starts.
pub const CONTENT_HASH_OFFSET: usize = 24;

/// Truncated MD5 content hash of raw bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = format!("{:x}", Md5::digest(bytes));
    digest[CONTENT_HASH_OFFSET..].to_string()
}

/// Content hash of a file's bytes.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(content_hash(&bytes))
}

/// Content hash of a value's canonical JSON serialization.
///
/// Map order is whatever the value serializes in, so a `serde_yaml::Value`
/// hashes in authored key order: byte-identical documents always produce the
/// same hash.
pub fn hash_value<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(content_hash(json.as_bytes()))
}

/// SHA-256 hex digest of a serializable value, used for version tokens.
pub fn version_token<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    Ok(format!("{:x}", Sha256::digest(&json)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn content_hash_is_md5_suffix() {
        // md5("hello world") = 5eb63bbbe01eeed093cb22bb8f5acdc3
        assert_eq!(content_hash(b"hello world"), "8f5acdc3");
    }

    #[test]
    fn content_hash_has_fixed_length() {
        assert_eq!(content_hash(b"").len(), 8);
        assert_eq!(content_hash(&[7u8; 4096]).len(), 8);
    }

    #[test]
    fn hash_file_matches_content_hash() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.bin");
        std::fs::write(&path, b"hello world").unwrap();
        assert_eq!(hash_file(&path).unwrap(), content_hash(b"hello world"));
    }

    #[test]
    fn hash_file_ignores_file_name() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("elsewhere-b.png");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn hash_value_follows_authored_key_order() {
        let a: serde_yaml::Value = serde_yaml::from_str("name: x\nalt: y\n").unwrap();
        let b: serde_yaml::Value = serde_yaml::from_str("name: x\nalt: y\n").unwrap();
        let c: serde_yaml::Value = serde_yaml::from_str("name: x\nalt: z\n").unwrap();
        assert_eq!(hash_value(&a).unwrap(), hash_value(&b).unwrap());
        assert_ne!(hash_value(&a).unwrap(), hash_value(&c).unwrap());
    }

    #[test]
    fn version_token_changes_with_structure() {
        let mut map = BTreeMap::new();
        map.insert("a.gallery", "11111111");
        let t1 = version_token(&map).unwrap();
        map.insert("b.gallery", "22222222");
        let t2 = version_token(&map).unwrap();
        assert_ne!(t1, t2);
        assert_eq!(t1.len(), 64);
    }
}
