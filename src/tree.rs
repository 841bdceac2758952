//! Data-root layout: walking content files and document-relative paths.
//!
//! Every document and media file is identified by its path relative to the
//! data root, `/`-separated on every platform. Hidden entries (leading `.`,
//! which includes the fast hash ledger) and the public output directory are
//! never part of the content tree.

use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Gallery document extension.
pub const GALLERY_EXT: &str = "gallery";

/// Character document, relative to the data root.
pub const CHARACTERS_DOC: &str = "characters/characters.yaml";

/// Artist roster, relative to the data root.
pub const ARTISTS_DOC: &str = "artists.yaml";

const DOCUMENT_EXTS: &[&str] = &["gallery", "yaml", "yml"];

const MEDIA_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "avif", "tif", "tiff", "mp4", "webm", "mov",
];

/// Kind of a recognized content file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Document,
    Media,
}

/// A content file found under the data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFile {
    pub path: PathBuf,
    pub relpath: String,
    pub kind: ContentKind,
}

/// The data root plus the output directory excluded from it.
#[derive(Debug, Clone)]
pub struct ContentTree {
    root: PathBuf,
    public_dir: PathBuf,
}

impl ContentTree {
    pub fn new(root: &Path, public_dir: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            public_dir: public_dir.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute (root-joined) path of a data-root-relative id.
    pub fn full_path(&self, relpath: &str) -> PathBuf {
        self.root.join(relpath)
    }

    /// Recognized content files in sorted walk order.
    ///
    /// The root and the public directory are compared in canonical form, so
    /// any spelling of the public directory excludes it. A public directory
    /// that does not exist yet has nothing to exclude.
    pub fn files(&self) -> Result<Vec<ContentFile>, walkdir::Error> {
        let root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        let public = fs::canonicalize(&self.public_dir).ok();
        let mut files = Vec::new();
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_excluded(e, public.as_deref()));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(kind) = classify(entry.path()) else {
                continue;
            };
            let Some(relpath) = relative_to(&root, entry.path()) else {
                continue;
            };
            files.push(ContentFile {
                path: entry.into_path(),
                relpath,
                kind,
            });
        }
        Ok(files)
    }

    /// Gallery documents only.
    pub fn galleries(&self) -> Result<Vec<ContentFile>, walkdir::Error> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|f| f.relpath.ends_with(&format!(".{GALLERY_EXT}")))
            .collect())
    }
}

/// `/`-separated path of `path` relative to `root`.
fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Walk entries are under the canonical root, so they compare directly
/// against the canonical public directory.
fn is_excluded(entry: &DirEntry, public: Option<&Path>) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let hidden = entry.file_name().to_string_lossy().starts_with('.');
    hidden || (entry.file_type().is_dir() && public == Some(entry.path()))
}

fn classify(path: &Path) -> Option<ContentKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if DOCUMENT_EXTS.contains(&ext.as_str()) {
        Some(ContentKind::Document)
    } else if MEDIA_EXTS.contains(&ext.as_str()) {
        Some(ContentKind::Media)
    } else {
        None
    }
}

/// Resolve `target` against the directory of document `doc`, lexically.
///
/// Both are data-root-relative. `..` that climbs above the root is kept, so
/// the result still names the file the author wrote.
pub fn doc_relative(doc: &str, target: &str) -> String {
    let base = Path::new(doc).parent().unwrap_or(Path::new(""));
    let mut parts: Vec<String> = Vec::new();
    for component in base.join(target).components() {
        match component {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}
