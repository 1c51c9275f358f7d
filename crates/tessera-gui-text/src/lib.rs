//! Backend-agnostic text support for `tessera`.
//!
//! # What lives here
//! - [`GlyphPath`]: vector glyph outlines made of line, quadratic and cubic segments.
//! - [`GlyphOutlines`]: the font collaborator that turns a [`GlyphFingerprint`] into a path
//!   and a tight EM-space bounding box.
//! - [`rasterize`]: converts a path into a signed distance field suitable for an `R8Snorm`
//!   atlas.
//! - [`cosmic`] (feature `cosmic`): shaping with `cosmic-text` and outlines through `swash`.
//!
//! Renderers are expected to:
//! 1. Shape text into a [`tessera_gui::ShapedText`].
//! 2. Ask their glyph cache for an atlas rectangle per visible glyph; on a miss the cache
//!    fetches the outline through [`GlyphOutlines`] and calls [`rasterize`].
//!
//! NOTE: This crate does not manage an atlas; that is backend-specific.

mod outline;
mod path;
mod sdf;

#[cfg(feature = "cosmic")]
pub mod cosmic;

pub use outline::*;
pub use path::*;
pub use sdf::*;

pub use tessera_gui::{FontId, GlyphFingerprint};
