//! Artist link normalization.

use crate::model::{Artist, ArtistLink};
use std::collections::BTreeMap;
use url::Url;

/// Normalize every artist's URL links.
pub fn resolve_artists(raw: &BTreeMap<String, Artist>) -> BTreeMap<String, Artist> {
    raw.iter()
        .map(|(key, artist)| {
            let links = artist
                .links
                .iter()
                .map(|(label, link)| (label.clone(), normalize_link(key, label, link)))
                .collect();
            (key.clone(), Artist { links, ..artist.clone() })
        })
        .collect()
}

/// Platform tags pass through. A URL without a scheme gets `https://`, then
/// goes through the URL parser; an unparseable value is logged and kept.
pub fn normalize_link(artist: &str, label: &str, link: &ArtistLink) -> ArtistLink {
    let ArtistLink::Url(raw) = link else {
        return link.clone();
    };
    let prefixed = if raw.contains("://") {
        raw.clone()
    } else {
        format!("https://{raw}")
    };
    match Url::parse(&prefixed) {
        Ok(url) => ArtistLink::Url(url.to_string()),
        Err(e) => {
            tracing::error!(artist, label, link = prefixed.as_str(), error = %e, "Malformed artist link");
            ArtistLink::Url(prefixed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Platform;

    fn url(s: &str) -> ArtistLink {
        ArtistLink::Url(s.to_string())
    }

    #[test]
    fn bare_host_gets_https_scheme() {
        assert_eq!(
            normalize_link("Mika", "shop", &url("mika.example/shop")),
            url("https://mika.example/shop")
        );
    }

    #[test]
    fn existing_scheme_is_kept_and_normalized() {
        assert_eq!(
            normalize_link("Mika", "site", &url("HTTP://Mika.Example")),
            url("http://mika.example/")
        );
    }

    #[test]
    fn platform_tags_pass_through() {
        let tag = ArtistLink::Platform(Platform::Twitter);
        assert_eq!(normalize_link("Mika", "social", &tag), tag);
    }

    #[test]
    fn malformed_link_is_kept() {
        assert_eq!(
            normalize_link("Mika", "bad", &url("exa mple.com")),
            url("https://exa mple.com")
        );
    }

    #[test]
    fn resolve_artists_keeps_other_fields() {
        let mut raw = BTreeMap::new();
        raw.insert(
            "Mika".to_string(),
            Artist {
                handle: Some("mika".into()),
                name: "Mika".into(),
                is_self: true,
                links: BTreeMap::from([("shop".to_string(), url("mika.example"))]),
            },
        );
        let resolved = resolve_artists(&raw);
        let mika = &resolved["Mika"];
        assert!(mika.is_self);
        assert_eq!(mika.handle.as_deref(), Some("mika"));
        assert_eq!(mika.links["shop"], url("https://mika.example/"));
    }
}
