//! # artgraph
//!
//! Resolves declarative art-gallery content into a content graph. Gallery
//! documents list art pieces (or inherit other galleries), and every image they
//! reference is rendered once into a content-addressed output directory. The
//! resolved model points at those renditions by URL.
//!
//! # Architecture: Fingerprint, Resolve, Collect
//!
//! ```text
//! 1. Fingerprint  data root  →  version token    (structure map, ledger-backed)
//! 2. Resolve      documents  →  ContentModel     (inheritance + media derivation)
//! 3. Collect      live set   →  deleted outputs  (unreferenced hash directories)
//! ```
//!
//! The [`pipeline::Pipeline`] owns every cache and threads them through the
//! stages explicitly. An unchanged token returns the previous model without
//! reading a single document; a changed token re-resolves, and media whose
//! content hash already has a `details.json` manifest are reused as is.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Cache owner: fingerprint check, resolution with one retry, GC entry points |
//! | [`tree`] | Walks the data root into documents and media, excluding the public directory |
//! | [`fingerprint`] | Structure map (`relpath → hash`) and its version token |
//! | [`model`] | Typed gallery, character and artist documents and the resolved [`model::ContentModel`] |
//! | [`resolve`] | Inheritance flattening, parallel piece resolution, character and artist resolution |
//! | [`media`] | Media transform engine: per-hash output directories, manifests, transcode slots |
//! | [`imaging`] | Pure-Rust image operations: decode, resize, encode, LQIP, perceptual hash |
//! | [`store`] | Persisted compressed pack files for small keyed records |
//! | [`fastcache`] | `(path, mtime) → hash` ledger so unchanged media are never re-read |
//! | [`digest`] | Content hashes and version tokens |
//! | [`limiter`] | Counting semaphore bounding concurrent transcodes |
//! | [`gc`] | Unused output discovery and contained deletion |
//! | [`query`] | Artist/character normalization, piece filters, source selection helpers |
//! | [`config`] | `artgraph.toml` loading, validation and merging over stock defaults |
//! | [`types`] | Shared media types serialized into the model (`Image`, `Picture`, `Source`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Outputs
//!
//! Each source file renders into `<public_dir>/<hash>/`, where the hash is
//! derived from the file's bytes. Moving or renaming a source never
//! re-encodes it, two documents referencing the same bytes share one
//! directory, and the manifest inside the directory is the cache entry.
//!
//! ## Documents Are Strict
//!
//! Gallery, character and artist documents reject unknown keys. A typo in a
//! field name is an error naming the document and the piece, not a silently
//! missing caption.
//!
//! ## Explicit Caches
//!
//! There is no global state. The fast hash ledger, the media engine, the raw
//! documents and the resolved model are fields of a [`pipeline::Pipeline`],
//! each tagged with the version token it was computed from.

pub mod config;
pub mod digest;
pub mod fastcache;
pub mod fingerprint;
pub mod gc;
pub mod imaging;
pub mod limiter;
pub mod media;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod query;
pub mod resolve;
pub mod store;
pub mod tree;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
