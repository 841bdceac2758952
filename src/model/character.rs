//! Characters from `characters/characters.yaml`.

use crate::types::Picture;
use serde::{Deserialize, Serialize};

/// Character as authored.
pub type RawCharacter = Character<AltImage>;

/// Authored image reference with alt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AltImage {
    pub image: String,
    pub alt: String,
}

/// Resolved picture with alt text, serialized flat (`{full, thumbnail,
/// phash, alt}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltPicture {
    #[serde(flatten)]
    pub picture: Picture,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Character<P = AltPicture> {
    pub name: String,
    pub pronouns: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    pub picture: P,
    /// Absent means `None`; a `default` here would demand `P: Default`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<P>,
    /// Position in the character document.
    #[serde(default)]
    pub index: usize,
}

impl<P> Character<P> {
    pub fn with_pictures<Q>(self, picture: Q, thumbnail: Option<Q>) -> Character<Q> {
        Character {
            name: self.name,
            pronouns: self.pronouns,
            description: self.description,
            short_description: self.short_description,
            picture,
            thumbnail,
            index: self.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_character_parses() {
        let ch: RawCharacter = serde_yaml::from_str(
            "name: Ivy\npronouns: she/her\ndescription: A botanist.\npicture: {image: ivy.png, alt: Ivy smiling}\n",
        )
        .unwrap();
        assert_eq!(ch.picture.image, "ivy.png");
        assert_eq!(ch.thumbnail, None);
        assert_eq!(ch.short_description, None);
    }

    #[test]
    fn picture_requires_alt() {
        let result: Result<RawCharacter, _> = serde_yaml::from_str(
            "name: Ivy\npronouns: she/her\ndescription: d\npicture: {image: ivy.png}\n",
        );
        assert!(result.is_err());
    }
}
