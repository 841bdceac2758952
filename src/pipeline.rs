//! The resolution pipeline: explicit owner of every cache.
//!
//! A [`Pipeline`] holds the media engine, the fast hash ledger, and the last
//! resolved model and raw documents, each tagged with the tree fingerprint
//! they were built from.
//!
//! ```text
//! resolve()
//!   ├─ fingerprint(tree)            ledger-backed, one stat per media file
//!   ├─ token unchanged → cached model
//!   └─ token changed   → reset live set, load raw, resolve, flush ledger
//! ```
//!
//! A failed pass clears the cached model and raw documents and is retried
//! once; the second failure propagates. `resolve` takes `&mut self`, so one
//! pipeline never runs two passes at once.

use crate::config::{self, ArtgraphConfig};
use crate::fastcache::FastHashCache;
use crate::fingerprint::{self, FingerprintError};
use crate::gc::{self, GcReport};
use crate::imaging::ImageBackend;
use crate::media::{MediaEngine, StatsSnapshot};
use crate::model::{ContentModel, RawContent};
use crate::resolve::{self, MediaContext, ResolveError};
use crate::tree::ContentTree;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Failed to scan output directory: {0}")]
    Gc(#[source] std::io::Error),
}

/// A value and the fingerprint it was computed from.
#[derive(Debug, Clone)]
struct Versioned<T> {
    token: String,
    value: T,
}

/// Where a [`Pipeline`] reads and writes.
#[derive(Debug, Clone)]
pub struct PipelineOptions<'a> {
    pub data_root: &'a Path,
    pub public_dir: &'a Path,
    pub url_prefix: &'a str,
    /// Concurrent transcode cap.
    pub slots: usize,
}

impl<'a> PipelineOptions<'a> {
    /// Options from a loaded config, with the public dir already resolved.
    pub fn from_config(data_root: &'a Path, public_dir: &'a Path, config: &'a ArtgraphConfig) -> Self {
        Self {
            data_root,
            public_dir,
            url_prefix: &config.url_prefix,
            slots: config::effective_threads(&config.processing),
        }
    }
}

pub struct Pipeline<B: ImageBackend> {
    tree: ContentTree,
    engine: MediaEngine<B>,
    ledger: FastHashCache,
    raw: Option<Versioned<Arc<RawContent>>>,
    model: Option<Versioned<Arc<ContentModel>>>,
}

impl<B: ImageBackend> Pipeline<B> {
    /// Create a pipeline, loading the persisted ledger from the data root.
    pub fn new(backend: B, options: &PipelineOptions<'_>) -> Self {
        Self {
            tree: ContentTree::new(options.data_root, options.public_dir),
            engine: MediaEngine::new(
                backend,
                options.public_dir,
                options.url_prefix,
                options.slots,
            ),
            ledger: FastHashCache::load(options.data_root),
            raw: None,
            model: None,
        }
    }

    pub fn engine(&self) -> &MediaEngine<B> {
        &self.engine
    }

    pub fn ledger(&self) -> &FastHashCache {
        &self.ledger
    }

    /// Stats of the most recent resolution pass.
    pub fn stats(&self) -> StatsSnapshot {
        self.engine.stats()
    }

    /// Hashes touched by the most recent resolution pass.
    pub fn live_hashes(&self) -> BTreeSet<String> {
        self.engine.live_hashes()
    }

    /// Current version token of the data root.
    pub fn fingerprint(&self) -> Result<String, PipelineError> {
        let token = fingerprint::fingerprint(&self.tree, &self.ledger)?;
        self.flush_ledger();
        Ok(token)
    }

    /// Drop the cached model and raw documents.
    pub fn clear(&mut self) {
        self.raw = None;
        self.model = None;
    }

    /// Forget every ledger hash and the cached model. The next pass rehashes
    /// all media; rendered outputs are still reused through their manifests.
    pub fn clear_ledger(&mut self) {
        self.ledger.clear();
        self.clear();
    }

    /// Resolved model for the current tree, retrying once after a clear.
    pub fn resolve(&mut self) -> Result<Arc<ContentModel>, PipelineError> {
        match self.try_resolve() {
            Ok(model) => Ok(model),
            Err(e) => {
                tracing::warn!(error = %e, "Resolution failed; clearing caches and retrying once");
                self.clear();
                self.try_resolve()
            }
        }
    }

    fn try_resolve(&mut self) -> Result<Arc<ContentModel>, PipelineError> {
        let token = fingerprint::fingerprint(&self.tree, &self.ledger)?;
        if let Some(cached) = &self.model
            && cached.token == token
        {
            tracing::debug!(token = token.as_str(), "Content model unchanged");
            self.flush_ledger();
            return Ok(Arc::clone(&cached.value));
        }

        let raw = self.raw_content(&token)?;
        self.engine.reset_live();
        let media = MediaContext {
            engine: &self.engine,
            ledger: &self.ledger,
            tree: &self.tree,
        };
        let model = Arc::new(resolve::resolve(&raw, &media)?);
        self.flush_ledger();

        tracing::info!(
            token = token.as_str(),
            galleries = model.galleries.len(),
            pieces = model.pieces_by_slug.len(),
            media = %self.engine.stats(),
            "Resolved content model"
        );
        self.model = Some(Versioned {
            token,
            value: Arc::clone(&model),
        });
        Ok(model)
    }

    /// Raw documents for `token`, reloaded only when the token moved.
    fn raw_content(&mut self, token: &str) -> Result<Arc<RawContent>, PipelineError> {
        if let Some(cached) = &self.raw
            && cached.token == token
        {
            return Ok(Arc::clone(&cached.value));
        }
        let raw = Arc::new(resolve::load_raw(&self.tree)?);
        self.raw = Some(Versioned {
            token: token.to_string(),
            value: Arc::clone(&raw),
        });
        Ok(raw)
    }

    fn flush_ledger(&self) {
        if let Err(e) = self.ledger.flush(self.tree.root()) {
            tracing::warn!(error = %e, "Failed to persist fast hash ledger");
        }
    }

    /// Output directories the current model does not reference.
    ///
    /// Resolves first, so the live set always describes the current tree.
    pub fn unused_hashes(&mut self) -> Result<Vec<String>, PipelineError> {
        self.resolve()?;
        gc::unused_hashes(self.engine.public_dir(), &self.engine.live_hashes())
            .map_err(PipelineError::Gc)
    }

    /// Delete every unreferenced output directory.
    pub fn collect_garbage(&mut self) -> Result<GcReport, PipelineError> {
        let unused = self.unused_hashes()?;
        Ok(gc::delete_hashes(self.engine.public_dir(), &unused))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fastcache::LEDGER_FILENAME;
    use crate::imaging::backend::tests::MockBackend;
    use crate::media::KEEP_MARK;
    use crate::test_helpers::DataRoot;
    use std::fs;

    fn pipeline(root: &DataRoot) -> Pipeline<MockBackend> {
        let public = root.public_dir();
        let options = PipelineOptions {
            data_root: root.path(),
            public_dir: &public,
            url_prefix: "/_",
            slots: 2,
        };
        Pipeline::new(MockBackend::new(), &options)
    }

    fn sample_root() -> DataRoot {
        let root = DataRoot::new();
        root.gallery("art/b.gallery", &[("b1", false), ("b2", false)]);
        root.gallery("art/c.gallery", &[("c1", false)]);
        root.write("art/all.gallery", "$extends: [b.gallery, c.gallery]\n");
        root
    }

    #[test]
    fn unchanged_tree_returns_cached_model() {
        let root = sample_root();
        let mut p = pipeline(&root);
        let first = p.resolve().unwrap();
        let opened = p.engine().backend().open_count();
        let second = p.resolve().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(p.engine().backend().open_count(), opened);
    }

    #[test]
    fn edited_document_invalidates_model() {
        let root = sample_root();
        let mut p = pipeline(&root);
        let first = p.resolve().unwrap();

        root.gallery("art/c.gallery", &[("c1", false), ("c2", false)]);
        let second = p.resolve().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.galleries["art/all.gallery"].pieces.len(), 4);
    }

    #[test]
    fn reprocessing_after_clear_reuses_manifests() {
        let root = sample_root();
        let mut p = pipeline(&root);
        p.resolve().unwrap();
        let encoded = p.stats().encoded;
        p.clear();
        p.resolve().unwrap();

        assert_eq!(encoded, 3);
        let stats = p.stats();
        assert_eq!((stats.encoded, stats.cached), (0, 3));
    }

    #[test]
    fn ledger_is_persisted_after_resolution() {
        let root = sample_root();
        let mut p = pipeline(&root);
        p.resolve().unwrap();
        assert!(root.path().join(LEDGER_FILENAME).exists());
        assert_eq!(FastHashCache::load(root.path()).len(), 3);
    }

    #[test]
    fn cleared_ledger_rehashes_but_reuses_outputs() {
        let root = sample_root();
        let mut p = pipeline(&root);
        let first = p.resolve().unwrap();
        p.clear_ledger();
        assert!(p.ledger().is_empty());

        let second = p.resolve().unwrap();
        assert_eq!(*first, *second);
        assert_eq!(p.ledger().len(), 3);
        let stats = p.stats();
        assert_eq!((stats.encoded, stats.cached), (0, 3));
    }

    #[test]
    fn failing_pass_is_retried_once_then_propagates() {
        let root = sample_root();
        root.write(
            "art/broken.gallery",
            "pieces:\n  - id: lost\n    name: Lost\n    date: 2024-01-01\n    image: lost.png\n    alt: x\n",
        );
        let mut p = pipeline(&root);
        let err = p.resolve().unwrap_err();
        assert!(matches!(err, PipelineError::Resolve(ResolveError::Media { .. })));

        // Fixing the tree makes the next call succeed from a clean state.
        root.write_image("art/lost.png", b"found");
        assert_eq!(p.resolve().unwrap().pieces_by_slug.len(), 4);
    }

    #[test]
    fn failed_pass_leaves_true_hashes_in_ledger() {
        let root = sample_root();
        let mut p = pipeline(&root);
        p.engine().backend().fail_next(usize::MAX);
        assert!(p.resolve().is_err());

        assert_eq!(p.ledger().len(), 3);
        let path = root.path().join("art/b1.png");
        let seen = p.ledger().lookup(&path, "art/b1.png").unwrap();
        assert_eq!(seen.hash, Some(crate::digest::content_hash(b"b1")));
    }

    #[test]
    fn transient_failure_recovers_on_retry() {
        let root = sample_root();
        let mut p = pipeline(&root);
        p.engine().backend().fail_next(1);
        let model = p.resolve().unwrap();
        assert_eq!(model.pieces_by_slug.len(), 3);
    }

    #[test]
    fn gc_removes_outputs_of_deleted_sources() {
        let root = sample_root();
        let mut p = pipeline(&root);
        p.resolve().unwrap();
        let before = p.live_hashes();
        assert_eq!(before.len(), 3);

        fs::remove_file(root.path().join("art/c.gallery")).unwrap();
        root.write("art/all.gallery", "$extends: [b.gallery]\n");
        let report = p.collect_garbage().unwrap();

        assert_eq!(report.deleted.len(), 1);
        let gone = &report.deleted[0];
        assert!(before.contains(gone));
        assert!(!root.public_dir().join(gone).exists());
        assert_eq!(fs::read_dir(root.public_dir()).unwrap().count(), 2);
    }

    #[test]
    fn gc_respects_keep_mark() {
        let root = sample_root();
        let mut p = pipeline(&root);
        p.resolve().unwrap();
        let kept = p.live_hashes().into_iter().next().unwrap();
        fs::write(root.public_dir().join(&kept).join(KEEP_MARK), "").unwrap();
        fs::create_dir_all(root.public_dir().join("deadbeef")).unwrap();

        assert_eq!(p.unused_hashes().unwrap(), vec!["deadbeef"]);
    }

    #[test]
    fn fingerprint_ignores_outputs() {
        let root = sample_root();
        let mut p = pipeline(&root);
        let before = p.fingerprint().unwrap();
        p.resolve().unwrap();
        assert_eq!(before, p.fingerprint().unwrap());
    }
}
