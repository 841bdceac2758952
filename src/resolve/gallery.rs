//! Piece media resolution and gallery listings.

use super::inherit::PieceRef;
use super::{MediaContext, ResolveError};
use crate::imaging::ImageBackend;
use crate::model::{Alt, ArtPiece, DocId, Gallery, GalleryDoc, RawArtPiece, VideoRef};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Resolved pieces of every leaf document, in authored order.
pub type ResolvedLeaves = BTreeMap<DocId, Vec<ArtPiece>>;

/// Resolve the media of every authored piece exactly once.
///
/// Leaf documents and the pieces within them resolve in parallel; the
/// steps of one piece run in order.
pub fn resolve_leaves<B: ImageBackend>(
    media: &MediaContext<'_, B>,
    galleries: &BTreeMap<DocId, GalleryDoc>,
) -> Result<ResolvedLeaves, ResolveError> {
    galleries
        .par_iter()
        .filter_map(|(doc, gallery)| match gallery {
            GalleryDoc::Pieces(pieces) => Some((doc, pieces)),
            GalleryDoc::Extends(_) => None,
        })
        .map(|(doc, pieces)| {
            let resolved = pieces
                .par_iter()
                .map(|piece| resolve_piece(media, doc, piece))
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, ResolveError>((doc.clone(), resolved))
        })
        .collect()
}

fn resolve_piece<B: ImageBackend>(
    media: &MediaContext<'_, B>,
    doc: &str,
    piece: &RawArtPiece,
) -> Result<ArtPiece, ResolveError> {
    let what = |slot: &str| format!("piece '{}' {slot}", piece.slug);

    let image = media.image(doc, &piece.image, piece.position, &what("image"))?;
    let video = piece
        .video
        .as_ref()
        .map(|v| resolve_video(media, doc, v, &what("video")))
        .transpose()?;
    let alts = piece
        .alts
        .iter()
        .map(|alt| {
            let label = format!("alt '{}'", alt.name);
            Ok::<_, ResolveError>(Alt {
                name: alt.name.clone(),
                image: media.image(doc, &alt.image, piece.position, &what(&label))?,
                alt: alt.alt.clone(),
                description: alt.description.clone(),
                video: alt
                    .video
                    .as_ref()
                    .map(|v| resolve_video(media, doc, v, &what(&label)))
                    .transpose()?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(piece.clone().with_media(image, alts, video))
}

fn resolve_video<B: ImageBackend>(
    media: &MediaContext<'_, B>,
    doc: &str,
    video: &VideoRef,
    what: &str,
) -> Result<VideoRef, ResolveError> {
    Ok(VideoRef {
        full: media.video(doc, &video.full, "full", what)?,
        thumb: media.video(doc, &video.thumb, "thumb", what)?,
    })
}

/// Listing of every gallery from its flattened piece refs, deindexed
/// pieces removed.
pub fn build_listings(
    flattened: &BTreeMap<&str, Vec<PieceRef<'_>>>,
    leaves: &ResolvedLeaves,
) -> BTreeMap<DocId, Gallery> {
    flattened
        .iter()
        .map(|(&doc, refs)| {
            let pieces = refs
                .iter()
                .filter_map(|r| leaves.get(r.doc).and_then(|pieces| pieces.get(r.index)))
                .filter(|piece| !piece.deindexed)
                .cloned()
                .collect();
            (doc.to_string(), Gallery { pieces })
        })
        .collect()
}

/// Every resolved piece keyed by slug, deindexed ones included. Leaves are
/// visited in document order, so the last colliding slug wins.
pub fn index_by_slug(leaves: &ResolvedLeaves) -> BTreeMap<String, ArtPiece> {
    let mut by_slug = BTreeMap::new();
    for piece in leaves.values().flatten() {
        if by_slug.insert(piece.slug.clone(), piece.clone()).is_some() {
            tracing::debug!(slug = piece.slug.as_str(), "Slug collision; later piece wins");
        }
    }
    by_slug
}
