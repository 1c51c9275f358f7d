//! `cosmic-text` implementation of shaping, with glyph outlines read through `swash`.
//!
//! This is intentionally conservative:
//! - shaping a single line (no wrapping)
//! - outlines are returned unhinted, in EM units, for SDF rasterization at a fixed size
//!
//! Font identity: cosmic-text works with `fontdb::ID`s. The engine hands out its own
//! [`FontId`]s in the order faces are first seen, so fingerprints stay small and stable for
//! the lifetime of the engine.

use std::collections::HashMap;

use cosmic_text::{fontdb, Attrs, Buffer, FontSystem, Metrics, Shaping};
use glam::Vec2;
use swash::scale::ScaleContext;
use swash::zeno::{Command, PathData};
use tessera_gui::{Color, GeneralCategory, ShapedGlyph, ShapedText};

use crate::{FontId, GlyphFingerprint, GlyphOutline, GlyphOutlines, PathBuilder};

/// Concrete engine backed by `cosmic-text`.
pub struct CosmicEngine {
    font_system: FontSystem,
    scale_context: ScaleContext,
    faces: Vec<fontdb::ID>,
    face_lookup: HashMap<fontdb::ID, FontId>,
    // Outlines are needed once for the bounding box at shaping time and again by the glyph
    // cache on a miss.
    outlines: HashMap<GlyphFingerprint, GlyphOutline>,
}

impl CosmicEngine {
    /// Create an engine using the fonts installed on the system.
    pub fn new() -> Self {
        Self::with_font_system(FontSystem::new())
    }

    pub fn with_font_system(font_system: FontSystem) -> Self {
        log::debug!(
            "text engine created with {} font faces",
            font_system.db().len()
        );
        Self {
            font_system,
            scale_context: ScaleContext::new(),
            faces: Vec::new(),
            face_lookup: HashMap::new(),
            outlines: HashMap::new(),
        }
    }

    /// Register font bytes (TTF/OTF/collection) with the font system.
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.font_system.db_mut().load_font_data(data);
    }

    /// Access the underlying `FontSystem` if callers want to customize further.
    pub fn font_system_mut(&mut self) -> &mut FontSystem {
        &mut self.font_system
    }

    fn font_id(&mut self, face: fontdb::ID) -> FontId {
        if let Some(id) = self.face_lookup.get(&face) {
            return *id;
        }
        let id = FontId(self.faces.len() as u64);
        self.faces.push(face);
        self.face_lookup.insert(face, id);
        id
    }

    /// Shape a single line of `text` at `font_px` pixels per EM.
    ///
    /// Glyph positions are y-up and relative to the pen at the start of the baseline.
    pub fn shape_line(&mut self, text: &str, font_px: f32, color: Color) -> ShapedText {
        let metrics = Metrics::new(font_px, font_px * 1.2);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);

        // Prevent wrapping: set a huge width and line height from metrics.
        buffer.set_size(
            &mut self.font_system,
            Some(f32::MAX),
            Some(metrics.line_height),
        );
        buffer.set_text(
            &mut self.font_system,
            text,
            &Attrs::new(),
            Shaping::Advanced,
            None,
        );
        buffer.shape_until_scroll(&mut self.font_system, false);

        let mut out = ShapedText {
            glyphs: Vec::new(),
            width: 0.0,
            height: metrics.line_height,
        };

        // Collect first so that the buffer borrow ends before outlines are fetched.
        let mut placed = Vec::new();
        if let Some(run) = buffer.layout_runs().next() {
            out.width = run.line_w;
            out.height = run.line_height;
            for glyph in run.glyphs.iter() {
                let c = run.text[glyph.start..glyph.end]
                    .chars()
                    .next()
                    .unwrap_or(' ');
                // cosmic-text is y-down; offsets are in EM units.
                let x = glyph.x + glyph.font_size * glyph.x_offset;
                let y = glyph.y - glyph.font_size * glyph.y_offset;
                placed.push((glyph.font_id, glyph.glyph_id, [x, -y], glyph.font_size, c));
            }
        }

        for (face, glyph_id, position, font_size, c) in placed {
            let fingerprint = GlyphFingerprint::new(self.font_id(face), glyph_id as u32);
            let bounding_box = self.glyph_outline(fingerprint).bounding_box;
            out.glyphs.push(ShapedGlyph {
                fingerprint,
                position,
                font_size,
                bounding_box,
                color,
                category: GeneralCategory::of(c),
            });
        }

        out
    }

    fn load_outline(&mut self, glyph: GlyphFingerprint) -> Option<GlyphOutline> {
        let face = *self.faces.get(glyph.font_id.0 as usize)?;
        let glyph_id = u16::try_from(glyph.glyph_id).ok()?;
        let scale_context = &mut self.scale_context;

        self.font_system
            .db()
            .with_face_data(face, |data, index| {
                let font = swash::FontRef::from_index(data, index as usize)?;
                let units_per_em = font.metrics(&[]).units_per_em as f32;
                if units_per_em <= 0.0 {
                    return None;
                }

                // Size 0 keeps the outline in font units.
                let mut scaler = scale_context.builder(font).hint(false).build();
                let outline = scaler.scale_outline(glyph_id)?;

                let em = |p: swash::zeno::Vector| Vec2::new(p.x, p.y) / units_per_em;
                let mut builder = PathBuilder::new();
                for command in outline.path().commands() {
                    match command {
                        Command::MoveTo(p) => {
                            builder.move_to(em(p));
                        }
                        Command::LineTo(p) => {
                            builder.line_to(em(p));
                        }
                        Command::QuadTo(c, p) => {
                            builder.quad_to(em(c), em(p));
                        }
                        Command::CurveTo(c0, c1, p) => {
                            builder.cubic_to(em(c0), em(c1), em(p));
                        }
                        Command::Close => {
                            builder.close();
                        }
                    }
                }
                Some(GlyphOutline::new(builder.build()))
            })
            .flatten()
    }
}

impl Default for CosmicEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GlyphOutlines for CosmicEngine {
    fn glyph_outline(&mut self, glyph: GlyphFingerprint) -> GlyphOutline {
        if let Some(outline) = self.outlines.get(&glyph) {
            return outline.clone();
        }
        let outline = self.load_outline(glyph).unwrap_or_else(|| {
            log::debug!("no outline for glyph {glyph:?}; drawing it empty");
            GlyphOutline::empty()
        });
        self.outlines.insert(glyph, outline.clone());
        outline
    }
}
