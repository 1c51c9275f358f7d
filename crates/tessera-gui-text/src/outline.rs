use std::sync::{Arc, Mutex, PoisonError};

use tessera_gui::{GlyphFingerprint, Rect};

use crate::GlyphPath;

/// Vector outline of one glyph as supplied by a font.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphOutline {
    /// Outline in EM units, y-up, relative to the pen position.
    pub path: GlyphPath,
    /// Tight bounding box of `path` in EM units.
    pub bounding_box: Rect,
}

impl GlyphOutline {
    pub fn new(path: GlyphPath) -> Self {
        let bounding_box = path.bounding_box();
        Self { path, bounding_box }
    }

    /// Outline of a glyph without ink (space, missing glyph).
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Source of glyph outlines, implemented by the font layer.
///
/// Glyph caches call this on a miss. Unknown glyphs produce [`GlyphOutline::empty`] rather
/// than an error, so that a bad glyph never stops a frame.
pub trait GlyphOutlines {
    fn glyph_outline(&mut self, glyph: GlyphFingerprint) -> GlyphOutline;
}

impl<T: GlyphOutlines + ?Sized> GlyphOutlines for Box<T> {
    fn glyph_outline(&mut self, glyph: GlyphFingerprint) -> GlyphOutline {
        (**self).glyph_outline(glyph)
    }
}

/// A font engine shared between the shaper and a glyph cache.
impl<T: GlyphOutlines + ?Sized> GlyphOutlines for Arc<Mutex<T>> {
    fn glyph_outline(&mut self, glyph: GlyphFingerprint) -> GlyphOutline {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .glyph_outline(glyph)
    }
}
