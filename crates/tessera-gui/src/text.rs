use icu_properties::CodePointMapData;

use crate::{Color, Rect};

/// A stable identifier for a font face known to the text engine.
///
/// This is intentionally opaque to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u64);

/// Identity of a single rasterized glyph: a glyph index within a font face.
///
/// Glyph cache entries are keyed by this value, independent of display size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphFingerprint {
    pub font_id: FontId,
    pub glyph_id: u32,
}

impl GlyphFingerprint {
    pub const fn new(font_id: FontId, glyph_id: u32) -> Self {
        Self { font_id, glyph_id }
    }
}

/// Unicode general category, reduced to the groups drawing cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneralCategory {
    Letter,
    Mark,
    Number,
    Punctuation,
    Symbol,
    SpaceSeparator,
    LineSeparator,
    ParagraphSeparator,
    Control,
    Format,
    /// Icon fonts live here.
    PrivateUse,
    Unassigned,
}

impl GeneralCategory {
    /// Classify a character by its Unicode general category.
    pub fn of(c: char) -> Self {
        use icu_properties::props::{GeneralCategory as Gc, GeneralCategoryGroup as Group};

        let category = CodePointMapData::<Gc>::new().get(c);
        match category {
            Gc::SpaceSeparator => Self::SpaceSeparator,
            Gc::LineSeparator => Self::LineSeparator,
            Gc::ParagraphSeparator => Self::ParagraphSeparator,
            Gc::Control => Self::Control,
            Gc::Format => Self::Format,
            Gc::PrivateUse => Self::PrivateUse,
            gc if Group::Letter.contains(gc) => Self::Letter,
            gc if Group::Mark.contains(gc) => Self::Mark,
            gc if Group::Number.contains(gc) => Self::Number,
            gc if Group::Punctuation.contains(gc) => Self::Punctuation,
            gc if Group::Symbol.contains(gc) => Self::Symbol,
            _ => Self::Unassigned,
        }
    }

    /// Whether glyphs of this category leave ink on the screen.
    pub fn is_visible(self) -> bool {
        !matches!(
            self,
            Self::SpaceSeparator
                | Self::LineSeparator
                | Self::ParagraphSeparator
                | Self::Control
                | Self::Format
                | Self::Unassigned
        )
    }
}

/// A glyph positioned by the shaper.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapedGlyph {
    pub fingerprint: GlyphFingerprint,
    /// Pen position on the baseline, in text-local pixels (y-up).
    pub position: [f32; 2],
    /// Font size in pixels per EM.
    pub font_size: f32,
    /// Tight bounding box of the glyph outline in EM units, relative to the pen position.
    pub bounding_box: Rect,
    /// Style color, used unless the draw call overrides it.
    pub color: Color,
    pub category: GeneralCategory,
}

impl ShapedGlyph {
    /// Bounding box in text-local pixels.
    pub fn pixel_bounds(&self) -> Rect {
        let b = &self.bounding_box;
        let s = self.font_size;
        Rect::new(
            [
                self.position[0] + b.min[0] * s,
                self.position[1] + b.min[1] * s,
            ],
            [
                self.position[0] + b.max[0] * s,
                self.position[1] + b.max[1] * s,
            ],
        )
    }
}

/// A run of shaped glyphs in text-local coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapedText {
    pub glyphs: Vec<ShapedGlyph>,
    /// Advance width of the whole run in pixels.
    pub width: f32,
    /// Line height in pixels.
    pub height: f32,
}

impl ShapedText {
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(GeneralCategory::of('A'), GeneralCategory::Letter);
        assert_eq!(GeneralCategory::of('7'), GeneralCategory::Number);
        assert_eq!(GeneralCategory::of(','), GeneralCategory::Punctuation);
        assert_eq!(GeneralCategory::of('+'), GeneralCategory::Symbol);
        assert_eq!(GeneralCategory::of(' '), GeneralCategory::SpaceSeparator);
        assert_eq!(GeneralCategory::of('\n'), GeneralCategory::Control);
        assert_eq!(GeneralCategory::of('\u{200D}'), GeneralCategory::Format);
        assert_eq!(GeneralCategory::of('\u{0301}'), GeneralCategory::Mark);
        assert_eq!(GeneralCategory::of('\u{2028}'), GeneralCategory::LineSeparator);
        assert_eq!(GeneralCategory::of('\u{00A0}'), GeneralCategory::SpaceSeparator);
        assert_eq!(GeneralCategory::of('\u{0378}'), GeneralCategory::Unassigned);
    }

    #[test]
    fn test_private_use_glyphs_are_visible() {
        for c in ['\u{E000}', '\u{F8FF}', '\u{F0000}'] {
            let category = GeneralCategory::of(c);
            assert_eq!(category, GeneralCategory::PrivateUse);
            assert!(category.is_visible());
        }
        assert!(!GeneralCategory::Unassigned.is_visible());
    }

    #[test]
    fn test_visibility() {
        assert!(GeneralCategory::Letter.is_visible());
        assert!(GeneralCategory::Mark.is_visible());
        assert!(!GeneralCategory::SpaceSeparator.is_visible());
        assert!(!GeneralCategory::Format.is_visible());
        assert!(!GeneralCategory::Control.is_visible());
    }

    #[test]
    fn test_pixel_bounds() {
        let glyph = ShapedGlyph {
            fingerprint: GlyphFingerprint::new(FontId(0), 1),
            position: [10.0, 20.0],
            font_size: 10.0,
            bounding_box: Rect::new([0.0, -0.25], [0.5, 0.75]),
            color: Color::rgb(1.0, 1.0, 1.0),
            category: GeneralCategory::Letter,
        };
        assert_eq!(
            glyph.pixel_bounds(),
            Rect::new([10.0, 17.5], [15.0, 27.5])
        );
    }
}
