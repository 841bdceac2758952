//! Pure calculation functions for image dimensions and source sets.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{Position, Transformation};
use crate::types::{OutputFormat, Source};
use std::collections::{BTreeMap, HashSet};

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = ((h as f64 * src_aspect).round() as u32).max(tgt_w);
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = ((w as f64 / src_aspect).round() as u32).max(tgt_h);
        (w, h)
    }
}

/// Scale to `width` preserving aspect ratio, never enlarging.
///
/// ```text
/// (4000, 3000) @ 640  → (640, 480)
/// (500, 400)   @ 640  → (500, 400)
/// ```
pub fn calculate_fit_width(source: (u32, u32), width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if width >= src_w {
        return (src_w, src_h);
    }
    let h = (src_h as f64 * width as f64 / src_w as f64).round() as u32;
    (width, h.max(1))
}

/// Shrink a cover target so it fits inside the source, keeping the target's
/// aspect ratio. A square target on a small source becomes the largest square
/// the source can provide.
pub fn calculate_cover_target(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    let scale = (src_w as f64 / tgt_w as f64)
        .min(src_h as f64 / tgt_h as f64)
        .min(1.0);
    if scale >= 1.0 {
        return target;
    }
    let w = ((tgt_w as f64 * scale).round() as u32).clamp(1, src_w);
    let h = ((tgt_h as f64 * scale).round() as u32).clamp(1, src_h);
    (w, h)
}

/// Final output dimensions of a transformation applied to `source`.
pub fn calculate_output_dimensions(source: (u32, u32), tf: &Transformation) -> (u32, u32) {
    match tf.height {
        Some(height) => calculate_cover_target(source, (tf.width, height)),
        None => calculate_fit_width(source, tf.width),
    }
}

/// Top-left offset of a `target` crop inside a `fill`-sized image.
pub fn calculate_crop_offset(fill: (u32, u32), target: (u32, u32), position: Position) -> (u32, u32) {
    let (wx, wy) = position.weights();
    let slack_x = fill.0.saturating_sub(target.0) as f64;
    let slack_y = fill.1.saturating_sub(target.1) as f64;
    ((slack_x * wx).round() as u32, (slack_y * wy).round() as u32)
}

/// A transformation paired with the file and descriptor it will produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub transformation: Transformation,
    pub file_name: String,
    pub source: Source,
}

/// Resolve output names for a transformation matrix, dropping entries equal
/// on (format, w, h, src) and keeping the first occurrence. Collisions happen
/// when the source is narrower than several ladder steps.
pub fn plan_outputs(
    source: (u32, u32),
    plan: &[Transformation],
    url_base: &str,
) -> Vec<PlannedOutput> {
    let mut seen = HashSet::new();
    plan.iter()
        .filter_map(|tf| {
            let (w, h) = calculate_output_dimensions(source, tf);
            let file_name = format!("{w}x{h}.{}", tf.format.extension());
            let src = format!("{url_base}/{file_name}");
            seen.insert((tf.format, w, h, src.clone())).then(|| PlannedOutput {
                transformation: *tf,
                file_name,
                source: Source { src, w, h },
            })
        })
        .collect()
}

/// Group rendered entries by format, preserving render order within a format.
pub fn group_by_format(entries: Vec<(OutputFormat, Source)>) -> BTreeMap<OutputFormat, Vec<Source>> {
    let mut grouped: BTreeMap<OutputFormat, Vec<Source>> = BTreeMap::new();
    for (format, source) in entries {
        grouped.entry(format).or_default().push(source);
    }
    grouped
}

/// Fallback source: the widest `webp`, else the widest of the first format
/// present. `None` only for an empty source set.
pub fn select_fallback(sources: &BTreeMap<OutputFormat, Vec<Source>>) -> Option<&Source> {
    let set = match sources.get(&OutputFormat::Webp) {
        Some(webp) if !webp.is_empty() => webp,
        _ => sources.values().find(|set| !set.is_empty())?,
    };
    // First widest wins on ties.
    set.iter()
        .fold(None, |best: Option<&Source>, s| match best {
            Some(b) if b.w >= s.w => Some(b),
            _ => Some(s),
        })
}
