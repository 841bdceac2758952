//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: open (decode once), describe, render one transformation, and
//! compute a perceptual hash. A decoded source is reused for every output of
//! the transformation matrix, so each source file is read exactly once per
//! processing run.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate plus the `webp` encoder.

use super::params::Transformation;
use crate::types::OutputFormat;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Metadata read once from a decoded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    /// Dimensions of one frame.
    pub dimensions: Dimensions,
    /// GIF sources get the animated transformation matrix.
    pub animated: bool,
}

/// One encoded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Trait for image processing backends.
pub trait ImageBackend: Sync {
    /// Decoded source, shared read-only between renders.
    type Source: Sync;

    /// Read and decode a source file.
    fn open(&self, path: &Path) -> Result<Self::Source, BackendError>;

    /// Dimensions and animation flag of a decoded source.
    fn describe(&self, source: &Self::Source) -> SourceInfo;

    /// Render one transformation to encoded bytes.
    fn render(
        &self,
        source: &Self::Source,
        transformation: &Transformation,
    ) -> Result<Encoded, BackendError>;

    /// 64-bit perceptual hash as `0`/`1` characters.
    fn phash(&self, source: &Self::Source) -> Result<String, BackendError>;
}
