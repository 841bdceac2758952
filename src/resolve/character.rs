//! Character picture resolution.

use super::{MediaContext, ResolveError};
use crate::imaging::ImageBackend;
use crate::model::{AltImage, AltPicture, Character, RawCharacter};
use crate::tree::CHARACTERS_DOC;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Resolve every character in parallel, keyed by name. A later character
/// with the same name replaces the earlier one.
pub fn resolve_characters<B: ImageBackend>(
    media: &MediaContext<'_, B>,
    raw: &[RawCharacter],
) -> Result<BTreeMap<String, Character>, ResolveError> {
    let resolved = raw
        .par_iter()
        .map(|character| resolve_character(media, character))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(resolved
        .into_iter()
        .map(|c| (c.name.clone(), c))
        .collect())
}

fn resolve_character<B: ImageBackend>(
    media: &MediaContext<'_, B>,
    character: &RawCharacter,
) -> Result<Character, ResolveError> {
    let what = |slot: &str| format!("character '{}' {slot}", character.name);
    let picture = alt_picture(media, &character.picture, &what("picture"))?;
    let thumbnail = character
        .thumbnail
        .as_ref()
        .map(|t| alt_picture(media, t, &what("thumbnail")))
        .transpose()?;
    Ok(character.clone().with_pictures(picture, thumbnail))
}

fn alt_picture<B: ImageBackend>(
    media: &MediaContext<'_, B>,
    image: &AltImage,
    what: &str,
) -> Result<AltPicture, ResolveError> {
    let picture = media.image(CHARACTERS_DOC, &image.image, None, what)?;
    Ok(AltPicture {
        picture,
        alt: image.alt.clone(),
    })
}
