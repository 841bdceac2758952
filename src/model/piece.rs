//! Art pieces and galleries.
//!
//! [`ArtPiece`] is generic over its image type: `ArtPiece<String>` is the
//! authored form (image paths relative to the gallery document) and
//! `ArtPiece<Picture>` is the resolved form.

use crate::imaging::Position;
use crate::types::Picture;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Piece as authored in a `.gallery` document.
pub type RawArtPiece = ArtPiece<String>;

/// One artist credit: a bare name or `{name, anonymous}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtistCredit {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        anonymous: bool,
    },
}

impl ArtistCredit {
    pub fn name(&self) -> &str {
        match self {
            ArtistCredit::Name(name) | ArtistCredit::Detailed { name, .. } => name,
        }
    }

    pub fn anonymous(&self) -> bool {
        matches!(self, ArtistCredit::Detailed { anonymous: true, .. })
    }
}

/// `artist:` accepts a single credit or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credits {
    One(ArtistCredit),
    Many(Vec<ArtistCredit>),
}

impl Credits {
    pub fn as_slice(&self) -> &[ArtistCredit] {
        match self {
            Credits::One(credit) => std::slice::from_ref(credit),
            Credits::Many(credits) => credits,
        }
    }
}

/// Character appearing in a piece: a bare name or `{from, name}` for
/// characters from other works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacterRef {
    Name(String),
    From { from: String, name: String },
}

impl CharacterRef {
    pub fn name(&self) -> &str {
        match self {
            CharacterRef::Name(name) | CharacterRef::From { name, .. } => name,
        }
    }

    pub fn from(&self) -> Option<&str> {
        match self {
            CharacterRef::Name(_) => None,
            CharacterRef::From { from, .. } => Some(from),
        }
    }
}

/// Video pair: raw paths, or public URLs once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoRef {
    pub full: String,
    pub thumb: String,
}

/// Alternate version of a piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Alt<I> {
    pub name: String,
    pub image: I,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoRef>,
}

/// A single artwork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtPiece<I = Picture> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<Credits>,
    #[serde(with = "piece_date")]
    pub date: NaiveDateTime,
    pub image: I,
    #[serde(default)]
    pub characters: Vec<CharacterRef>,
    /// Crop anchor for the square thumbnail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub alts: Vec<Alt<I>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoRef>,
    /// Hidden from gallery listings, still reachable by slug.
    #[serde(default)]
    pub deindexed: bool,
    /// Computed on parse: `id`, or the digest of the authored piece.
    #[serde(default)]
    pub slug: String,
}

impl<I> ArtPiece<I> {
    /// Artist credits, empty when none are given.
    pub fn credits(&self) -> &[ArtistCredit] {
        self.artist.as_ref().map(Credits::as_slice).unwrap_or_default()
    }

    /// Same piece with its media replaced, keeping all other fields.
    pub fn with_media<J>(self, image: J, alts: Vec<Alt<J>>, video: Option<VideoRef>) -> ArtPiece<J> {
        ArtPiece {
            id: self.id,
            name: self.name,
            artist: self.artist,
            date: self.date,
            image,
            characters: self.characters,
            position: self.position,
            tags: self.tags,
            alt: self.alt,
            description: self.description,
            alts,
            video,
            deindexed: self.deindexed,
            slug: self.slug,
        }
    }
}

/// Resolved gallery listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Gallery {
    pub pieces: Vec<ArtPiece>,
}

/// Parse a piece date: `YYYY-MM-DD`, an RFC 3339 timestamp, or a naive
/// `YYYY-MM-DD[T ]HH:MM:SS` timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

mod piece_date {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format("%Y-%m-%dT%H:%M:%S"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_date(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid date '{raw}' (expected YYYY-MM-DD or an RFC 3339 timestamp)"
            ))
        })
    }
}
