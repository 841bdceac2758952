//! Shared test utilities for the artgraph test suite.
//!
//! Provides a throwaway data root with document and media writers, and
//! synthetic image encoders for backend tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let root = DataRoot::new();
//! root.gallery("art/b.gallery", &[("b1", false), ("b2", true)]);
//! root.write("art/all.gallery", "$extends: [b.gallery]\n");
//! ```

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =========================================================================
// Data root fixture
// =========================================================================

/// Temporary data root. Paths given to the writers are data-root-relative.
pub struct DataRoot {
    tmp: TempDir,
}

impl DataRoot {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.tmp.path()
    }

    /// Conventional output directory inside the root.
    pub fn public_dir(&self) -> PathBuf {
        self.path().join("static/_")
    }

    /// Write a text document, creating parent directories.
    pub fn write(&self, rel: &str, text: &str) -> PathBuf {
        self.write_image(rel, text.as_bytes())
    }

    /// Write raw bytes; the mock backend never decodes them.
    pub fn write_image(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    /// Write a pieces gallery. Each `(name, deindexed)` piece gets its own
    /// image next to the document, with the name as its bytes.
    pub fn gallery(&self, rel: &str, pieces: &[(&str, bool)]) -> PathBuf {
        let dir = Path::new(rel).parent().unwrap_or(Path::new(""));
        let mut text = String::from("pieces:\n");
        for (i, (name, deindexed)) in pieces.iter().enumerate() {
            self.write_image(&dir.join(format!("{name}.png")).to_string_lossy(), name.as_bytes());
            text.push_str(&format!(
                "  - name: {name}\n    date: 2024-01-{:02}\n    image: {name}.png\n    alt: {name} alt\n    tags: [Sketch]\n",
                i + 1
            ));
            if *deindexed {
                text.push_str("    deindexed: true\n");
            }
        }
        self.write(rel, &text)
    }
}

// =========================================================================
// Synthetic images
// =========================================================================

/// Gradient JPEG with enough structure for a meaningful perceptual hash.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgb([r, g, 128])
    });
    img.save(path).unwrap();
}

/// Animated GIF with `frames` solid frames of alternating colour.
pub fn create_test_gif(path: &Path, width: u32, height: u32, frames: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = fs::File::create(path).unwrap();
    let mut encoder = GifEncoder::new(file);
    encoder.set_repeat(Repeat::Infinite).unwrap();
    for i in 0..frames {
        let shade = if i % 2 == 0 { 32 } else { 224 };
        let buffer = RgbaImage::from_pixel(width, height, Rgba([shade, 96, 255 - shade, 255]));
        encoder
            .encode_frame(Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(100, 1)))
            .unwrap();
    }
}
