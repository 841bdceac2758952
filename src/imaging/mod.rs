//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` (JPEG, PNG, TIFF, WebP, animated GIF) |
//! | **Resize / cover crop** | Lanczos3 + anchored `crop_imm` |
//! | **Encode** | AVIF (rav1e), lossy WebP (libwebp), GIF |
//! | **Perceptual hash** | 32×32 grayscale DCT |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math and source sets (unit testable)
//! - **Parameters**: Transformation policy (formats, width ladders, quality, anchors)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
pub mod calculations;
pub mod operations;
mod params;
mod phash;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, SourceInfo};
pub use calculations::select_fallback;
pub use operations::create_picture;
pub use params::{Position, Quality, Transformation, UnknownPosition};
pub use rust_backend::RustBackend;
