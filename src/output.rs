//! CLI output formatting for every command.
//!
//! Output is an inventory of the resolved content, not of files: galleries
//! by document id, pieces by name with their slug as context, then a one-line
//! summary.
//!
//! # Output Format
//!
//! ## Resolve
//!
//! ```text
//! Galleries
//! 001 art/all.gallery (3 pieces)
//!     001 Dawn
//!         Slug: 5f2c0a1e
//!         Artist: Mika
//!     002 Dusk
//!         Slug: dusk
//!
//! Characters
//! 001 Ivy (she/her)
//!
//! Artists
//! 001 Mika (@mika)
//!
//! Resolved 1 gallery, 3 pieces (1 deindexed), 1 character, 1 artist
//! Media: 2 cached, 1 encoded, 0 copied (3 total)
//! ```
//!
//! ## Gc
//!
//! ```text
//! Deleted
//!     9e107d9d
//! Deleted 1 directory, skipped 0, failed 0
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::gc::GcReport;
use crate::media::StatsSnapshot;
use crate::model::{ArtPiece, ContentModel};
use crate::resolve::CheckReport;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 piece`, `2 pieces`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else if let Some(stem) = noun.strip_suffix('y') {
        format!("{count} {stem}ies")
    } else {
        format!("{count} {noun}s")
    }
}

/// Format an entity header: positional index + title, with optional count.
///
/// ```text
/// 001 art/all.gallery (3 pieces)
/// 001 Ivy
/// ```
fn entity_header(index: usize, title: &str, count: Option<usize>) -> String {
    match count {
        Some(n) => format!("{} {} ({})", format_index(index), title, plural(n, "piece")),
        None => format!("{} {}", format_index(index), title),
    }
}

fn piece_lines(index: usize, piece: &ArtPiece) -> Vec<String> {
    let mut lines = vec![format!("{}{}", indent(1), entity_header(index, &piece.name, None))];
    lines.push(format!("{}Slug: {}", indent(2), piece.slug));
    let artists: Vec<&str> = piece.credits().iter().map(|c| c.name()).collect();
    if !artists.is_empty() {
        lines.push(format!("{}Artist: {}", indent(2), artists.join(", ")));
    }
    if !piece.alts.is_empty() {
        lines.push(format!("{}Alts: {}", indent(2), piece.alts.len()));
    }
    if piece.video.is_some() {
        lines.push(format!("{}Video: yes", indent(2)));
    }
    lines
}

// ============================================================================
// Resolve
// ============================================================================

pub fn format_resolve_output(model: &ContentModel, stats: &StatsSnapshot) -> Vec<String> {
    let mut lines = vec!["Galleries".to_string()];
    for (i, (doc, gallery)) in model.galleries.iter().enumerate() {
        lines.push(entity_header(i + 1, doc, Some(gallery.pieces.len())));
        for (j, piece) in gallery.pieces.iter().enumerate() {
            lines.extend(piece_lines(j + 1, piece));
        }
    }

    if !model.characters.is_empty() {
        lines.push(String::new());
        lines.push("Characters".to_string());
        let mut characters: Vec<_> = model.characters.values().collect();
        characters.sort_by_key(|c| c.index);
        for (i, c) in characters.iter().enumerate() {
            lines.push(format!("{} ({})", entity_header(i + 1, &c.name, None), c.pronouns));
        }
    }

    if !model.artists.is_empty() {
        lines.push(String::new());
        lines.push("Artists".to_string());
        for (i, a) in model.artists.values().enumerate() {
            let header = entity_header(i + 1, &a.name, None);
            match &a.handle {
                Some(handle) => lines.push(format!("{header} (@{handle})")),
                None => lines.push(header),
            }
        }
    }

    let deindexed = model.pieces_by_slug.values().filter(|p| p.deindexed).count();
    lines.push(String::new());
    lines.push(format!(
        "Resolved {}, {} ({} deindexed), {}, {}",
        plural(model.galleries.len(), "gallery"),
        plural(model.pieces_by_slug.len(), "piece"),
        deindexed,
        plural(model.characters.len(), "character"),
        plural(model.artists.len(), "artist"),
    ));
    lines.push(format!("Media: {stats}"));
    lines
}

pub fn print_resolve_output(model: &ContentModel, stats: &StatsSnapshot) {
    for line in format_resolve_output(model, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    vec![format!(
        "OK: {}, {} ({} listed), {}, {}",
        plural(report.galleries, "gallery"),
        plural(report.pieces, "piece"),
        report.listed,
        plural(report.characters, "character"),
        plural(report.artists, "artist"),
    )]
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Gc
// ============================================================================

/// Dry-run listing of what a sweep would delete.
pub fn format_gc_plan(unused: &[String]) -> Vec<String> {
    if unused.is_empty() {
        return vec!["Nothing to delete".to_string()];
    }
    let mut lines = vec!["Unused outputs".to_string()];
    lines.extend(unused.iter().map(|h| format!("{}{}", indent(1), h)));
    lines.push(format!("Would delete {}", plural(unused.len(), "directory")));
    lines
}

pub fn format_gc_output(report: &GcReport) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.deleted.is_empty() {
        lines.push("Deleted".to_string());
        lines.extend(report.deleted.iter().map(|h| format!("{}{}", indent(1), h)));
    }
    if !report.skipped.is_empty() {
        lines.push("Skipped (outside public root)".to_string());
        lines.extend(report.skipped.iter().map(|h| format!("{}{}", indent(1), h)));
    }
    if !report.failed.is_empty() {
        lines.push("Failed".to_string());
        lines.extend(
            report
                .failed
                .iter()
                .map(|(h, e)| format!("{}{}: {}", indent(1), h, e)),
        );
    }
    lines.push(format!(
        "Deleted {}, skipped {}, failed {}",
        plural(report.deleted.len(), "directory"),
        report.skipped.len(),
        report.failed.len()
    ));
    lines
}

pub fn print_gc_plan(unused: &[String]) {
    for line in format_gc_plan(unused) {
        println!("{}", line);
    }
}

pub fn print_gc_output(report: &GcReport) {
    for line in format_gc_output(report) {
        println!("{}", line);
    }
}
