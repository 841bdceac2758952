//! Content model: typed documents and the resolved graph.
//!
//! Raw documents parse into the `Raw*` aliases (media as paths) through the
//! validating functions in [`document`]. The resolver turns them into the
//! same structures parameterised over [`Picture`](crate::types::Picture).

pub mod artist;
pub mod character;
pub mod document;
pub mod piece;

pub use artist::{Artist, ArtistLink, Platform};
pub use character::{AltImage, AltPicture, Character, RawCharacter};
pub use document::{
    DocId, GalleryDoc, ModelError, RawContent, parse_artists, parse_characters, parse_gallery,
};
pub use piece::{
    Alt, ArtPiece, ArtistCredit, CharacterRef, Credits, Gallery, RawArtPiece, VideoRef, parse_date,
};

use serde::Serialize;
use std::collections::BTreeMap;

/// The fully resolved content graph handed to UI and search collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentModel {
    /// Gallery listings keyed by document id. Deindexed pieces are absent.
    pub galleries: BTreeMap<DocId, Gallery>,
    /// Characters keyed by name.
    pub characters: BTreeMap<String, Character>,
    pub artists: BTreeMap<String, Artist>,
    /// Every resolved piece keyed by slug, deindexed ones included. A later
    /// piece with a colliding slug replaces the earlier one.
    #[serde(rename = "pieces")]
    pub pieces_by_slug: BTreeMap<String, ArtPiece>,
}

impl ContentModel {
    pub fn piece(&self, slug: &str) -> Option<&ArtPiece> {
        self.pieces_by_slug.get(slug)
    }

    pub fn gallery(&self, doc: &str) -> Option<&Gallery> {
        self.galleries.get(doc)
    }

    /// Listed pieces across all galleries, in gallery then listing order.
    /// A piece inherited into several galleries appears once per gallery.
    pub fn listed_pieces(&self) -> impl Iterator<Item = &ArtPiece> {
        self.galleries.values().flat_map(|g| g.pieces.iter())
    }
}
