//! Asset descriptors shared by the media engine, the resolved model and the
//! `details.json` manifests.
//!
//! These types are the wire format consumed by UI collaborators and persisted
//! next to every content-addressed output directory, so field names are part
//! of the public contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Encoded output format of a derivative file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Avif,
    Gif,
    Webp,
}

impl OutputFormat {
    /// File extension, also the key used in [`Image::sources`].
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Avif => "avif",
            OutputFormat::Gif => "gif",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Avif => "image/avif",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Webp => "image/webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One rendered file (or inline data URL) and its pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub src: String,
    pub w: u32,
    pub h: u32,
}

/// A responsive image: every rendered source grouped by format.
///
/// Invariant: `fallback` is an element of `sources[fallback's format]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub sources: BTreeMap<OutputFormat, Vec<Source>>,
    pub fallback: Source,
    pub lqip: Source,
    /// Content hash of the source file (the output directory name). The
    /// field name is historical; the value is the truncated content digest.
    pub sha256: String,
}

/// Full-size and thumbnail renditions of one source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    pub full: Image,
    pub thumbnail: Image,
    /// 64-bit perceptual hash as a string of `0`/`1` characters.
    pub phash: String,
}
