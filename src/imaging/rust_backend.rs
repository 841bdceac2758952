//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Decode (GIF, all frames) | `image::codecs::gif::GifDecoder` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Cover crop | fill-resize + `crop_imm` at the anchor offset |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → WebP (lossy) | `webp::Encoder` (libwebp) |
//! | Encode → GIF (animated) | `image::codecs::gif::GifEncoder` |
//! | Perceptual hash | 32×32 grayscale + [`dct_hash`] |
//!
//! AVIF sources are not decodable: the `image` crate's `"avif"` feature only
//! enables the encoder.

use super::backend::{BackendError, Dimensions, Encoded, ImageBackend, SourceInfo};
use super::calculations::{
    calculate_crop_offset, calculate_fill_dimensions, calculate_output_dimensions,
};
use super::params::{Quality, Transformation};
use super::phash::{SAMPLE_SIZE, dct_hash};
use crate::types::OutputFormat;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ExtendedColorType, Frame, ImageEncoder, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// GIF quantization speed (1 = best, 30 = fastest).
const GIF_SPEED: i32 = 10;

/// AVIF encoder speed (rav1e, 1 = slowest).
const AVIF_SPEED: u8 = 6;

/// A decoded source. Animated GIFs keep every composited frame; the first
/// frame doubles as the still image for non-GIF outputs.
pub struct DecodedSource {
    image: DynamicImage,
    frames: Option<Vec<Frame>>,
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn encode_error(format: OutputFormat, e: impl std::fmt::Display) -> BackendError {
    BackendError::ProcessingFailed(format!("{format} encode failed: {e}"))
}

/// Load and decode an image from disk.
fn load_source(path: &Path) -> Result<DecodedSource, BackendError> {
    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes).map_err(|e| decode_error(path, e))?;

    if format == ImageFormat::Gif {
        let decoder = GifDecoder::new(Cursor::new(&bytes)).map_err(|e| decode_error(path, e))?;
        let frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| decode_error(path, e))?;
        let first = frames
            .first()
            .ok_or_else(|| decode_error(path, "GIF has no frames"))?;
        return Ok(DecodedSource {
            image: DynamicImage::ImageRgba8(first.buffer().clone()),
            frames: Some(frames),
        });
    }

    let image =
        image::load_from_memory_with_format(&bytes, format).map_err(|e| decode_error(path, e))?;
    Ok(DecodedSource {
        image,
        frames: None,
    })
}

/// Resize (and cover-crop, for square outputs) one image.
fn apply(image: &DynamicImage, tf: &Transformation) -> DynamicImage {
    let source = (image.width(), image.height());
    let (w, h) = calculate_output_dimensions(source, tf);

    if tf.height.is_none() {
        return if (w, h) == source {
            image.clone()
        } else {
            image.resize_exact(w, h, FilterType::Lanczos3)
        };
    }

    let fill = calculate_fill_dimensions(source, (w, h));
    let filled = if fill == source {
        image.clone()
    } else {
        image.resize_exact(fill.0, fill.1, FilterType::Lanczos3)
    };
    let (x, y) = calculate_crop_offset(fill, (w, h), tf.position);
    filled.crop_imm(x, y, w, h)
}

fn encode_still(
    image: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut buf = Vec::new();
    match format {
        OutputFormat::Avif => {
            image::codecs::avif::AvifEncoder::new_with_speed_quality(
                &mut buf,
                AVIF_SPEED,
                quality.value() as u8,
            )
            .write_image(rgba.as_raw(), w, h, ExtendedColorType::Rgba8)
            .map_err(|e| encode_error(format, e))?;
        }
        OutputFormat::Webp => {
            let encoded = webp::Encoder::from_rgba(rgba.as_raw(), w, h).encode(quality.value() as f32);
            buf.extend_from_slice(&encoded);
        }
        OutputFormat::Gif => {
            let mut encoder = GifEncoder::new_with_speed(&mut buf, GIF_SPEED);
            encoder
                .encode_frame(Frame::new(rgba))
                .map_err(|e| encode_error(format, e))?;
        }
    }
    Ok(buf)
}

/// Re-encode every frame of an animation with the same geometry.
fn encode_animation(frames: &[Frame], tf: &Transformation) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut buf, GIF_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| encode_error(OutputFormat::Gif, e))?;
        for frame in frames {
            let still = DynamicImage::ImageRgba8(frame.buffer().clone());
            let out = apply(&still, tf).to_rgba8();
            encoder
                .encode_frame(Frame::from_parts(out, 0, 0, frame.delay()))
                .map_err(|e| encode_error(OutputFormat::Gif, e))?;
        }
    }
    Ok(buf)
}

impl ImageBackend for RustBackend {
    type Source = DecodedSource;

    fn open(&self, path: &Path) -> Result<DecodedSource, BackendError> {
        load_source(path)
    }

    fn describe(&self, source: &DecodedSource) -> SourceInfo {
        SourceInfo {
            dimensions: Dimensions {
                width: source.image.width(),
                height: source.image.height(),
            },
            animated: source.frames.is_some(),
        }
    }

    fn render(
        &self,
        source: &DecodedSource,
        tf: &Transformation,
    ) -> Result<Encoded, BackendError> {
        let (width, height) =
            calculate_output_dimensions((source.image.width(), source.image.height()), tf);
        // WebP renditions of an animation carry its first frame only.
        let bytes = match (tf.format, &source.frames) {
            (OutputFormat::Gif, Some(frames)) => encode_animation(frames, tf)?,
            (format, _) => encode_still(&apply(&source.image, tf), format, tf.quality)?,
        };
        Ok(Encoded {
            format: tf.format,
            width,
            height,
            bytes,
        })
    }

    fn phash(&self, source: &DecodedSource) -> Result<String, BackendError> {
        let side = SAMPLE_SIZE as u32;
        let gray = source
            .image
            .resize_exact(side, side, FilterType::Triangle)
            .to_luma8();
        let mut samples = [0f64; SAMPLE_SIZE * SAMPLE_SIZE];
        for (dst, pixel) in samples.iter_mut().zip(gray.pixels()) {
            *dst = pixel.0[0] as f64;
        }
        Ok(dct_hash(&samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Position;
    use crate::test_helpers::{create_test_gif, create_test_jpeg};

    #[test]
    fn open_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let backend = RustBackend::new();
        let source = backend.open(&path).unwrap();
        let info = backend.describe(&source);
        assert_eq!(info.dimensions.as_tuple(), (200, 150));
        assert!(!info.animated);
    }

    #[test]
    fn open_nonexistent_file_errors() {
        let backend = RustBackend::new();
        let result = backend.open(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn open_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        let result = RustBackend::new().open(&path);
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn render_resize_to_avif() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("source.jpg");
        create_test_jpeg(&path, 400, 300);

        let backend = RustBackend::new();
        let source = backend.open(&path).unwrap();
        let out = backend
            .render(&source, &Transformation::resize(OutputFormat::Avif, 200))
            .unwrap();
        assert_eq!((out.width, out.height), (200, 150));
        assert!(!out.bytes.is_empty());
    }

    #[test]
    fn render_never_enlarges() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("source.jpg");
        create_test_jpeg(&path, 120, 90);

        let backend = RustBackend::new();
        let source = backend.open(&path).unwrap();
        let out = backend
            .render(&source, &Transformation::resize(OutputFormat::Webp, 640))
            .unwrap();
        assert_eq!((out.width, out.height), (120, 90));
    }

    #[test]
    fn render_square_webp_thumbnail() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("source.jpg");
        create_test_jpeg(&path, 400, 300);

        let backend = RustBackend::new();
        let source = backend.open(&path).unwrap();
        let out = backend
            .render(
                &source,
                &Transformation::square(OutputFormat::Webp, 160, Position::North),
            )
            .unwrap();
        assert_eq!((out.width, out.height), (160, 160));
        assert_eq!(&out.bytes[..4], b"RIFF");
        assert_eq!(&out.bytes[8..12], b"WEBP");

        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (160, 160));
    }

    #[test]
    fn animated_gif_keeps_frames() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("anim.gif");
        create_test_gif(&path, 200, 100, 3);

        let backend = RustBackend::new();
        let source = backend.open(&path).unwrap();
        assert!(backend.describe(&source).animated);

        let out = backend
            .render(
                &source,
                &Transformation::square(OutputFormat::Gif, 160, Position::Center),
            )
            .unwrap();
        // Square limited by the 100px short edge.
        assert_eq!((out.width, out.height), (100, 100));

        let decoder = GifDecoder::new(Cursor::new(&out.bytes)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].buffer().dimensions(), (100, 100));
    }

    #[test]
    fn phash_is_stable_for_same_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("source.jpg");
        create_test_jpeg(&path, 64, 64);

        let backend = RustBackend::new();
        let source = backend.open(&path).unwrap();
        let a = backend.phash(&source).unwrap();
        let b = backend.phash(&source).unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }
}
