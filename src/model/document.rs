//! Validating parse of raw documents.
//!
//! Each document is parsed to a YAML value first and then into typed
//! structures, so every violation is reported against the document (and,
//! for list documents, the item index) that caused it.

use super::artist::Artist;
use super::character::RawCharacter;
use super::piece::RawArtPiece;
use crate::digest;
use serde_yaml::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Document id: path relative to the data root, `/`-separated.
pub type DocId = String;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{doc}: invalid YAML: {source}")]
    Syntax {
        doc: DocId,
        source: serde_yaml::Error,
    },
    #[error("{doc}: {reason}")]
    Shape { doc: DocId, reason: String },
    #[error("{doc}: piece #{index}: {source}")]
    Piece {
        doc: DocId,
        index: usize,
        source: serde_yaml::Error,
    },
    #[error("{doc}: piece #{index}: cannot derive slug: {source}")]
    Slug {
        doc: DocId,
        index: usize,
        source: serde_json::Error,
    },
    #[error("{doc}: character #{index}: {source}")]
    Character {
        doc: DocId,
        index: usize,
        source: serde_yaml::Error,
    },
    #[error("{doc}: artist '{key}': {source}")]
    Artist {
        doc: DocId,
        key: String,
        source: serde_yaml::Error,
    },
}

/// A `.gallery` document: either a list of pieces or a list of galleries to
/// inherit from.
#[derive(Debug, Clone, PartialEq)]
pub enum GalleryDoc {
    Pieces(Vec<RawArtPiece>),
    Extends(Vec<String>),
}

/// Every raw document of a data root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawContent {
    pub galleries: BTreeMap<DocId, GalleryDoc>,
    pub characters: Vec<RawCharacter>,
    pub artists: BTreeMap<String, Artist>,
}

fn shape(doc: &str, reason: impl Into<String>) -> ModelError {
    ModelError::Shape {
        doc: doc.to_string(),
        reason: reason.into(),
    }
}

fn parse_value(doc: &str, text: &str) -> Result<Value, ModelError> {
    serde_yaml::from_str(text).map_err(|source| ModelError::Syntax {
        doc: doc.to_string(),
        source,
    })
}

/// Parse a gallery document. Exactly one of `pieces` or `$extends` (alias
/// `extends`) must be present.
pub fn parse_gallery(doc: &str, text: &str) -> Result<GalleryDoc, ModelError> {
    let Value::Mapping(map) = parse_value(doc, text)? else {
        return Err(shape(doc, "a gallery must be a mapping with `pieces` or `$extends`"));
    };

    let mut pieces = None;
    let mut extends = None;
    for (key, value) in map {
        match key.as_str() {
            Some("pieces") => pieces = Some(value),
            Some("$extends" | "extends") => {
                if extends.replace(value).is_some() {
                    return Err(shape(doc, "both `$extends` and `extends` given"));
                }
            }
            Some(other) => return Err(shape(doc, format!("unknown key `{other}`"))),
            None => return Err(shape(doc, "gallery keys must be strings")),
        }
    }

    match (pieces, extends) {
        (Some(_), Some(_)) => Err(shape(doc, "a gallery cannot have both `pieces` and `$extends`")),
        (None, None) => Err(shape(doc, "a gallery needs `pieces` or `$extends`")),
        (None, Some(targets)) => serde_yaml::from_value(targets)
            .map(GalleryDoc::Extends)
            .map_err(|e| shape(doc, format!("`$extends` must be a list of paths: {e}"))),
        (Some(Value::Sequence(items)), None) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| parse_piece(doc, index, item))
            .collect::<Result<Vec<_>, _>>()
            .map(GalleryDoc::Pieces),
        (Some(_), None) => Err(shape(doc, "`pieces` must be a list")),
    }
}

/// Typed piece plus its slug: `id`, else the digest of the authored value.
fn parse_piece(doc: &str, index: usize, value: Value) -> Result<RawArtPiece, ModelError> {
    let authored = value.clone();
    let mut piece: RawArtPiece =
        serde_yaml::from_value(value).map_err(|source| ModelError::Piece {
            doc: doc.to_string(),
            index,
            source,
        })?;
    piece.slug = match &piece.id {
        Some(id) => id.clone(),
        None => digest::hash_value(&authored).map_err(|source| ModelError::Slug {
            doc: doc.to_string(),
            index,
            source,
        })?,
    };
    Ok(piece)
}

/// Parse the character list. Each character records its list position.
pub fn parse_characters(doc: &str, text: &str) -> Result<Vec<RawCharacter>, ModelError> {
    let items = match parse_value(doc, text)? {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items,
        _ => return Err(shape(doc, "characters must be a list")),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut character: RawCharacter =
                serde_yaml::from_value(item).map_err(|source| ModelError::Character {
                    doc: doc.to_string(),
                    index,
                    source,
                })?;
            character.index = index;
            Ok(character)
        })
        .collect()
}

/// Parse the artist roster, keyed by the name pieces credit.
pub fn parse_artists(doc: &str, text: &str) -> Result<BTreeMap<String, Artist>, ModelError> {
    let map = match parse_value(doc, text)? {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Mapping(map) => map,
        _ => return Err(shape(doc, "artists must be a mapping")),
    };
    map.into_iter()
        .map(|(key, value)| {
            let key = key
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| shape(doc, "artist keys must be strings"))?;
            let artist = serde_yaml::from_value(value).map_err(|source| ModelError::Artist {
                doc: doc.to_string(),
                key: key.clone(),
                source,
            })?;
            Ok((key, artist))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIECE: &str = "name: Dawn\n    date: 2024-03-01\n    image: dawn.png\n    alt: a sunrise";

    fn gallery(body: &str) -> String {
        format!("pieces:\n  - {body}\n")
    }

    #[test]
    fn pieces_gallery_parses_with_digest_slug() {
        let doc = parse_gallery("a.gallery", &gallery(PIECE)).unwrap();
        let GalleryDoc::Pieces(pieces) = doc else {
            panic!("expected pieces");
        };
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].slug.len(), 8);
    }

    #[test]
    fn explicit_id_is_the_slug() {
        let text = gallery(&format!("id: dawn\n    {PIECE}"));
        let GalleryDoc::Pieces(pieces) = parse_gallery("a.gallery", &text).unwrap() else {
            panic!("expected pieces");
        };
        assert_eq!(pieces[0].slug, "dawn");
    }

    #[test]
    fn slug_is_stable_and_sensitive_to_changes() {
        let slug = |text: &str| match parse_gallery("a.gallery", text).unwrap() {
            GalleryDoc::Pieces(p) => p[0].slug.clone(),
            GalleryDoc::Extends(_) => unreachable!(),
        };
        let original = gallery(PIECE);
        let edited = gallery(&PIECE.replace("a sunrise", "a sunset"));
        assert_eq!(slug(&original), slug(&original));
        assert_ne!(slug(&original), slug(&edited));
    }

    #[test]
    fn extends_gallery_parses_with_either_key() {
        let doc = parse_gallery("all.gallery", "$extends:\n  - b.gallery\n  - c.gallery\n").unwrap();
        assert_eq!(
            doc,
            GalleryDoc::Extends(vec!["b.gallery".into(), "c.gallery".into()])
        );
        let alias = parse_gallery("all.gallery", "extends: [b.gallery]\n").unwrap();
        assert_eq!(alias, GalleryDoc::Extends(vec!["b.gallery".into()]));
    }

    #[test]
    fn both_pieces_and_extends_is_shape_error() {
        let text = format!("$extends: [b.gallery]\n{}", gallery(PIECE));
        let err = parse_gallery("x.gallery", &text).unwrap_err();
        assert!(matches!(err, ModelError::Shape { .. }));
        assert!(err.to_string().starts_with("x.gallery:"));
    }

    #[test]
    fn empty_document_is_shape_error() {
        assert!(matches!(
            parse_gallery("x.gallery", ""),
            Err(ModelError::Shape { .. })
        ));
        assert!(matches!(
            parse_gallery("x.gallery", "title: nope\n"),
            Err(ModelError::Shape { .. })
        ));
    }

    #[test]
    fn invalid_piece_names_its_index() {
        let text = format!("pieces:\n  - {PIECE}\n  - name: Broken\n    date: 2024-01-01\n    image: b.png\n");
        let err = parse_gallery("art/x.gallery", &text).unwrap_err();
        match err {
            ModelError::Piece { doc, index, .. } => {
                assert_eq!(doc, "art/x.gallery");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_yaml_is_syntax_error() {
        assert!(matches!(
            parse_gallery("x.gallery", "pieces: [unterminated"),
            Err(ModelError::Syntax { .. })
        ));
    }

    #[test]
    fn characters_record_their_index() {
        let text = "- name: Ivy\n  pronouns: she/her\n  description: d\n  picture: {image: ivy.png, alt: Ivy}\n\
                    - name: Hal\n  pronouns: he/him\n  description: d\n  picture: {image: hal.png, alt: Hal}\n";
        let characters = parse_characters("characters/characters.yaml", text).unwrap();
        assert_eq!(characters[0].index, 0);
        assert_eq!(characters[1].index, 1);
        assert_eq!(characters[1].name, "Hal");
    }

    #[test]
    fn character_thumbnail_is_optional() {
        let text = "- name: Ivy\n  pronouns: she/her\n  description: d\n  picture: {image: ivy.png, alt: Ivy}\n  thumbnail: {image: ivy-small.png, alt: small}\n\
                    - name: Hal\n  pronouns: he/him\n  description: d\n  picture: {image: hal.png, alt: Hal}\n";
        let characters = parse_characters("characters/characters.yaml", text).unwrap();
        let thumb = characters[0].thumbnail.as_ref().unwrap();
        assert_eq!(thumb.image, "ivy-small.png");
        assert_eq!(thumb.alt, "small");
        assert_eq!(characters[1].thumbnail, None);
    }

    #[test]
    fn invalid_character_names_its_index() {
        let text = "- name: Ivy\n  pronouns: she/her\n  description: d\n";
        assert!(matches!(
            parse_characters("characters/characters.yaml", text),
            Err(ModelError::Character { index: 0, .. })
        ));
    }

    #[test]
    fn artists_are_keyed_by_name() {
        let text = "Mika:\n  name: Mika\n  handle: mika\nRen:\n  name: Ren\n";
        let artists = parse_artists("artists.yaml", text).unwrap();
        assert_eq!(artists.len(), 2);
        assert_eq!(artists["Mika"].handle.as_deref(), Some("mika"));
    }

    #[test]
    fn invalid_artist_names_its_key() {
        let err = parse_artists("artists.yaml", "Mika:\n  handle: mika\n").unwrap_err();
        assert!(matches!(err, ModelError::Artist { ref key, .. } if key == "Mika"));
    }

    #[test]
    fn empty_roster_documents_are_empty() {
        assert!(parse_artists("artists.yaml", "").unwrap().is_empty());
        assert!(parse_characters("characters/characters.yaml", "").unwrap().is_empty());
    }
}
