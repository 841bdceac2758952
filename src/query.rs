//! Read-side helpers over the resolved model.
//!
//! Everything here is a pure function of already-resolved data; nothing
//! touches the filesystem or the media engine.

use crate::imaging::select_fallback;
use crate::model::{ArtPiece, Artist, ArtistCredit, CharacterRef, ContentModel};
use crate::types::{Image, OutputFormat, Source};
use serde::Serialize;
use std::collections::BTreeMap;

/// Sources at or above this width are dropped by [`no_4k`].
pub const UHD_WIDTH: u32 = 3840;

/// An artist credit joined with the roster entry of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedArtist {
    pub name: String,
    pub anonymous: bool,
    pub info: Option<Artist>,
}

/// A character reference with the `from` work made explicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedCharacter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// What to filter pieces by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    Artist(String),
    Character { name: String, from: Option<String> },
    Piece(String),
    Tag(String),
}

pub fn normalize_artists(
    credits: &[ArtistCredit],
    roster: Option<&BTreeMap<String, Artist>>,
) -> Vec<NormalizedArtist> {
    credits
        .iter()
        .map(|credit| NormalizedArtist {
            name: credit.name().to_string(),
            anonymous: credit.anonymous(),
            info: roster.and_then(|r| r.get(credit.name())).cloned(),
        })
        .collect()
}

pub fn normalize_characters(refs: &[CharacterRef]) -> Vec<NormalizedCharacter> {
    refs.iter()
        .map(|r| NormalizedCharacter {
            name: r.name().to_string(),
            from: r.from().map(str::to_string),
        })
        .collect()
}

fn same_ci(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn matches(piece: &ArtPiece, by: &ResourceRef) -> bool {
    match by {
        ResourceRef::Artist(name) => piece.credits().iter().any(|c| same_ci(c.name(), name)),
        ResourceRef::Character { name, from } => piece.characters.iter().any(|c| {
            same_ci(c.name(), name)
                && match (c.from(), from.as_deref()) {
                    (Some(a), Some(b)) => same_ci(a, b),
                    (None, None) => true,
                    _ => false,
                }
        }),
        ResourceRef::Piece(slug) => piece.slug == *slug,
        ResourceRef::Tag(tag) => {
            let tag = tag.to_lowercase();
            piece.tags.iter().any(|t| t.to_lowercase() == tag)
        }
    }
}

/// Pieces matching `by` (or not matching, when `negated`). With `sorted`,
/// newest first; otherwise input order.
pub fn filter<'a>(
    pieces: impl IntoIterator<Item = &'a ArtPiece>,
    by: &ResourceRef,
    negated: bool,
    sorted: bool,
) -> Vec<&'a ArtPiece> {
    let mut out: Vec<_> = pieces
        .into_iter()
        .filter(|piece| matches(piece, by) != negated)
        .collect();
    if sorted {
        out.sort_by(|a, b| b.date.cmp(&a.date));
    }
    out
}

/// Artists credited on any listed piece plus the roster, one per name. A
/// roster entry wins over a bare credit of the same name.
pub fn all_artists(model: &ContentModel) -> Vec<NormalizedArtist> {
    let credited = model
        .listed_pieces()
        .flat_map(|p| normalize_artists(p.credits(), Some(&model.artists)));
    let roster = model.artists.values().map(|a| NormalizedArtist {
        name: a.name.clone(),
        anonymous: false,
        info: model.artists.get(&a.name).cloned(),
    });

    let mut by_name = BTreeMap::new();
    for artist in credited.chain(roster) {
        by_name.insert(artist.name.clone(), artist);
    }
    by_name.into_values().collect()
}

/// Drop UHD sources and recompute the fallback. An image with nothing
/// below UHD is returned unchanged.
pub fn no_4k(image: &Image) -> Image {
    let sources: BTreeMap<OutputFormat, Vec<Source>> = image
        .sources
        .iter()
        .map(|(format, list)| {
            let kept = list.iter().filter(|s| s.w < UHD_WIDTH).cloned().collect();
            (*format, kept)
        })
        .filter(|(_, list): &(OutputFormat, Vec<Source>)| !list.is_empty())
        .collect();
    match select_fallback(&sources).cloned() {
        Some(fallback) => Image {
            sources,
            fallback,
            ..image.clone()
        },
        None => image.clone(),
    }
}

/// Keep only the best source (widest WebP, else widest of the first
/// format) as both the single source and the fallback.
pub fn only_high_res(image: &Image) -> Image {
    let Some((format, best)) = best_source(&image.sources) else {
        return image.clone();
    };
    Image {
        sources: BTreeMap::from([(format, vec![best.clone()])]),
        fallback: best,
        ..image.clone()
    }
}

fn best_source(sources: &BTreeMap<OutputFormat, Vec<Source>>) -> Option<(OutputFormat, Source)> {
    let best = select_fallback(sources)?;
    sources
        .iter()
        .find(|(_, list)| list.iter().any(|s| std::ptr::eq(s, best)))
        .map(|(format, _)| (*format, best.clone()))
}
