//! Artists from `artists.yaml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known link platforms rendered with their own icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Facebook,
    Instagram,
    Tumblr,
    Toyhouse,
    Website,
    Linktree,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Tumblr => "tumblr",
            Platform::Toyhouse => "toyhouse",
            Platform::Website => "website",
            Platform::Linktree => "linktree",
        }
    }
}

/// Value of one artist link: a platform tag or a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtistLink {
    Platform(Platform),
    Url(String),
}

impl fmt::Display for ArtistLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtistLink::Platform(p) => f.write_str(p.as_str()),
            ArtistLink::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Artist {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub name: String,
    /// The site owner.
    #[serde(rename = "self", default)]
    pub is_self: bool,
    /// Label → link.
    #[serde(default)]
    pub links: BTreeMap<String, ArtistLink>,
}
