//! Content model resolution: raw documents to the resolved graph.
//!
//! ```text
//! load_raw        data root ─→ RawContent         (validating parse, slugs)
//! resolve         RawContent ─→ ContentModel      (inheritance, media, links)
//! ```
//!
//! Loading fails as a whole on the first invalid document; no partial model
//! is ever produced. Media paths are resolved relative to the document that
//! declares them and handed to the [`MediaEngine`], which hashes through the
//! fast hash ledger.

pub mod artist;
pub mod character;
pub mod gallery;
pub mod inherit;

use crate::fastcache::FastHashCache;
use crate::imaging::{ImageBackend, Position};
use crate::media::{MediaEngine, MediaError, ProcessOptions};
use crate::model::{self, ContentModel, DocId, GalleryDoc, ModelError, RawContent};
use crate::tree::{self, ContentTree};
use crate::types::Picture;
use inherit::InheritanceGraph;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("{doc}: {what}: {source}")]
    Media {
        doc: DocId,
        what: String,
        source: MediaError,
    },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Gallery inheritance cycle: {}", chain.join(" → "))]
    InheritanceCycle { chain: Vec<DocId> },
    #[error("Failed to walk data root: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Read and validate every document under the data root.
///
/// Character and artist documents are optional; a missing one is an empty
/// collection.
pub fn load_raw(tree: &ContentTree) -> Result<RawContent, ResolveError> {
    let galleries: BTreeMap<DocId, GalleryDoc> = tree
        .galleries()?
        .par_iter()
        .map(|file| {
            let text = read_doc(&file.path)?;
            let gallery = model::parse_gallery(&file.relpath, &text)?;
            Ok::<_, ResolveError>((file.relpath.clone(), gallery))
        })
        .collect::<Result<_, _>>()?;

    let characters = match read_optional(tree, tree::CHARACTERS_DOC)? {
        Some(text) => model::parse_characters(tree::CHARACTERS_DOC, &text)?,
        None => Vec::new(),
    };
    let artists = match read_optional(tree, tree::ARTISTS_DOC)? {
        Some(text) => model::parse_artists(tree::ARTISTS_DOC, &text)?,
        None => Default::default(),
    };

    tracing::debug!(
        root = %tree.root().display(),
        galleries = galleries.len(),
        characters = characters.len(),
        artists = artists.len(),
        "Loaded raw documents"
    );
    Ok(RawContent {
        galleries,
        characters,
        artists,
    })
}

fn read_doc(path: &Path) -> Result<String, ResolveError> {
    std::fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional(tree: &ContentTree, relpath: &str) -> Result<Option<String>, ResolveError> {
    let path = tree.full_path(relpath);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ResolveError::Io { path, source }),
    }
}

/// Media access for one resolution pass: engine, ledger and data root.
pub struct MediaContext<'a, B: ImageBackend> {
    pub engine: &'a MediaEngine<B>,
    pub ledger: &'a FastHashCache,
    pub tree: &'a ContentTree,
}

impl<B: ImageBackend> MediaContext<'_, B> {
    /// Process the image `path` as written in document `doc`.
    pub fn image(
        &self,
        doc: &str,
        path: &str,
        position: Option<Position>,
        what: &str,
    ) -> Result<Picture, ResolveError> {
        let relpath = tree::doc_relative(doc, path);
        let options = ProcessOptions {
            position,
            force_keep: false,
        };
        self.engine
            .process_image_cached(self.ledger, &self.tree.full_path(&relpath), &relpath, options)
            .map_err(|source| media_error(doc, what, source))
    }

    /// Copy the video `path` as written in document `doc`; returns its URL.
    pub fn video(
        &self,
        doc: &str,
        path: &str,
        variant: &str,
        what: &str,
    ) -> Result<String, ResolveError> {
        let relpath = tree::doc_relative(doc, path);
        self.engine
            .process_video_cached(
                self.ledger,
                &self.tree.full_path(&relpath),
                &relpath,
                variant,
                ProcessOptions::default(),
            )
            .map_err(|source| media_error(doc, what, source))
    }
}

fn media_error(doc: &str, what: &str, source: MediaError) -> ResolveError {
    ResolveError::Media {
        doc: doc.to_string(),
        what: what.to_string(),
        source,
    }
}

/// Resolve raw documents into the content model.
pub fn resolve<B: ImageBackend>(
    raw: &RawContent,
    media: &MediaContext<'_, B>,
) -> Result<ContentModel, ResolveError> {
    let flattened = InheritanceGraph::new(&raw.galleries).flatten()?;

    let (leaves, characters) = rayon::join(
        || gallery::resolve_leaves(media, &raw.galleries),
        || character::resolve_characters(media, &raw.characters),
    );
    let leaves = leaves?;
    let characters = characters?;

    Ok(ContentModel {
        galleries: gallery::build_listings(&flattened, &leaves),
        characters,
        artists: artist::resolve_artists(&raw.artists),
        pieces_by_slug: gallery::index_by_slug(&leaves),
    })
}

/// Document counts from a media-free validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub galleries: usize,
    pub pieces: usize,
    pub listed: usize,
    pub characters: usize,
    pub artists: usize,
}

/// Validate documents and inheritance without touching media.
pub fn check(raw: &RawContent) -> Result<CheckReport, ResolveError> {
    let flattened = InheritanceGraph::new(&raw.galleries).flatten()?;
    let pieces = raw
        .galleries
        .values()
        .map(|g| match g {
            GalleryDoc::Pieces(p) => p.len(),
            GalleryDoc::Extends(_) => 0,
        })
        .sum();
    Ok(CheckReport {
        galleries: raw.galleries.len(),
        pieces,
        listed: flattened.values().map(Vec::len).sum(),
        characters: raw.characters.len(),
        artists: raw.artists.len(),
    })
}
