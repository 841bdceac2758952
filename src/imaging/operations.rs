//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they build
//! the transformation matrix for a source, render every planned output into
//! a content-addressed directory and assemble the [`Picture`] descriptor.

use super::backend::{BackendError, ImageBackend, SourceInfo};
use super::calculations::{group_by_format, plan_outputs, select_fallback};
use super::params::{
    ANIMATED_FORMATS, FULL_WIDTHS, LQIP_QUALITY, LQIP_WIDTH, Position, STILL_FORMATS,
    THUMB_WIDTHS, Transformation,
};
use crate::types::{Image, OutputFormat, Picture, Source};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Full-size transformation matrix.
///
/// Animated sources get their native format plus WebP at native width; still
/// sources get every still format across the width ladder (format-major).
pub fn plan_full(info: &SourceInfo) -> Vec<Transformation> {
    if info.animated {
        return ANIMATED_FORMATS
            .iter()
            .map(|&f| Transformation::resize(f, info.dimensions.width))
            .collect();
    }
    STILL_FORMATS
        .iter()
        .flat_map(|&f| FULL_WIDTHS.iter().map(move |&w| Transformation::resize(f, w)))
        .collect()
}

/// Square thumbnail matrix, cropped around `position`.
pub fn plan_thumbnails(info: &SourceInfo, position: Position) -> Vec<Transformation> {
    let formats = if info.animated {
        ANIMATED_FORMATS
    } else {
        STILL_FORMATS
    };
    formats
        .iter()
        .flat_map(|&f| {
            THUMB_WIDTHS
                .iter()
                .map(move |&w| Transformation::square(f, w, position))
        })
        .collect()
}

/// Placeholder transformation: aspect-preserving for full images, square for
/// thumbnails.
pub fn plan_lqip(thumbnail: bool, position: Position) -> Transformation {
    let tf = if thumbnail {
        Transformation::square(OutputFormat::Webp, LQIP_WIDTH, position)
    } else {
        Transformation::resize(OutputFormat::Webp, LQIP_WIDTH)
    };
    tf.with_quality(LQIP_QUALITY)
}

/// Render a placeholder as an inline `data:` URL.
pub fn render_lqip<B: ImageBackend>(
    backend: &B,
    source: &B::Source,
    tf: &Transformation,
) -> Result<Source> {
    let encoded = backend.render(source, tf)?;
    Ok(Source {
        src: format!(
            "data:{};base64,{}",
            encoded.format.mime_type(),
            STANDARD.encode(&encoded.bytes)
        ),
        w: encoded.width,
        h: encoded.height,
    })
}

/// Render every planned output of `plan` into `out_dir` and build the
/// responsive [`Image`].
pub fn create_image<B: ImageBackend>(
    backend: &B,
    source: &B::Source,
    plan: &[Transformation],
    lqip: &Transformation,
    out_dir: &Path,
    url_base: &str,
    hash: &str,
) -> Result<Image> {
    let info = backend.describe(source);
    let mut entries = Vec::new();
    for planned in plan_outputs(info.dimensions.as_tuple(), plan, url_base) {
        let encoded = backend.render(source, &planned.transformation)?;
        std::fs::write(out_dir.join(&planned.file_name), &encoded.bytes)?;
        entries.push((planned.transformation.format, planned.source));
    }

    let sources = group_by_format(entries);
    let fallback = select_fallback(&sources)
        .cloned()
        .ok_or_else(|| BackendError::ProcessingFailed(format!("No outputs rendered for {hash}")))?;

    Ok(Image {
        sources,
        fallback,
        lqip: render_lqip(backend, source, lqip)?,
        sha256: hash.to_string(),
    })
}

/// Decode `path` once and produce its full-size and thumbnail renditions.
pub fn create_picture<B: ImageBackend>(
    backend: &B,
    path: &Path,
    out_dir: &Path,
    url_base: &str,
    hash: &str,
    position: Position,
) -> Result<Picture> {
    let source = backend.open(path)?;
    let info = backend.describe(&source);

    let full = create_image(
        backend,
        &source,
        &plan_full(&info),
        &plan_lqip(false, position),
        out_dir,
        url_base,
        hash,
    )?;
    let thumbnail = create_image(
        backend,
        &source,
        &plan_thumbnails(&info, position),
        &plan_lqip(true, position),
        out_dir,
        url_base,
        hash,
    )?;
    let phash = backend.phash(&source)?;

    Ok(Picture {
        full,
        thumbnail,
        phash,
    })
}
