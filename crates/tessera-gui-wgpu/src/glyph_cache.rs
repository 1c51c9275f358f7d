//! Signed distance field glyph cache.
//!
//! Every glyph is rasterized once, at [`SDF_FONT_SIZE`] pixels per EM with a
//! [`SDF_MAX_DISTANCE`] pixel border, and packed into the SDF atlas with a shelf allocator.
//! A single size serves every display size and zoom level; the fragment shader rescales the
//! distance.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use tessera_gui::{Color, GlyphFingerprint, Rect, ShapedGlyph, ShapedText, Transform};
use tessera_gui_text::{rasterize, GlyphOutlines};

use crate::atlas::AtlasTextures;
use crate::constants::{SDF_ATLAS_SIZE, SDF_FONT_SIZE, SDF_MAX_DISTANCE, SDF_STAGING_SIZE};
use crate::device::{CopyRegion, GpuDevice, TextureFormat, TextureHandle};
use crate::span::VertexSpan;
use crate::staging::Staging;
use crate::vertex::SdfVertex;

/// Location of one rasterized glyph in the SDF atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasRect {
    pub texture_index: u16,
    /// Bottom-left texel of the allocation.
    pub origin: [u16; 2],
    /// Allocated texels, the drawn extent rounded up.
    pub size: [u16; 2],
    /// Normalized `(u, v, texture_index)` of the drawn extent in quad order.
    pub tex_coords: [Vec3; 4],
    /// The area covered by `tex_coords`, in EM units relative to the pen position.
    pub em_bounds: Rect,
}

/// Cache from glyph to SDF atlas rectangle. Entries are never evicted individually.
pub struct GlyphCache<D: GpuDevice> {
    textures: AtlasTextures<D>,
    staging: Staging<i8>,
    entries: HashMap<GlyphFingerprint, AtlasRect>,
    cursor: [u32; 2],
    texture_index: usize,
    row_max_height: u32,
}

impl<D: GpuDevice> GlyphCache<D> {
    pub fn new(device: D) -> Self {
        let staging = new_staging(&device);
        Self {
            textures: AtlasTextures::new(
                device,
                "sdf atlas",
                SDF_ATLAS_SIZE,
                TextureFormat::R8Snorm,
                [-1.0; 4],
            ),
            staging,
            entries: HashMap::new(),
            cursor: [0, 0],
            texture_index: 0,
            row_max_height: 0,
        }
    }

    #[inline]
    pub fn textures(&self) -> &AtlasTextures<D> {
        &self.textures
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, fingerprint: &GlyphFingerprint) -> Option<&AtlasRect> {
        self.entries.get(fingerprint)
    }

    pub fn staging_handle(&self) -> TextureHandle {
        self.staging.handle()
    }

    /// Reserve `size` texels on the current shelf.
    ///
    /// # Panics
    ///
    /// Panics when the SDF atlas runs out of textures.
    fn allocate_rect(&mut self, size: [u32; 2]) -> (usize, [u32; 2]) {
        if self.cursor[0] + size[0] > SDF_ATLAS_SIZE {
            self.cursor[0] = 0;
            self.cursor[1] += self.row_max_height;
            self.row_max_height = 0;
        }
        if self.cursor[1] + size[1] > SDF_ATLAS_SIZE {
            self.cursor = [0, 0];
            self.texture_index += 1;
        }
        while self.textures.len() <= self.texture_index {
            self.textures.add();
        }

        let origin = self.cursor;
        self.cursor[0] += size[0];
        self.row_max_height = self.row_max_height.max(size[1]);
        (self.texture_index, origin)
    }

    /// Return the atlas rectangle of `fingerprint`, rasterizing it on a miss.
    ///
    /// The flag is true when the glyph was rasterized by this call.
    ///
    /// # Panics
    ///
    /// Panics when the glyph at the rasterization size does not fit the SDF staging
    /// texture, or when the SDF atlas runs out of textures.
    pub fn get_or_rasterize(
        &mut self,
        fingerprint: GlyphFingerprint,
        fonts: &mut dyn GlyphOutlines,
    ) -> (AtlasRect, bool) {
        if let Some(rect) = self.entries.get(&fingerprint) {
            return (*rect, false);
        }

        let outline = fonts.glyph_outline(fingerprint);
        let bounds = outline.bounding_box;
        let draw_extent = [
            bounds.width() * SDF_FONT_SIZE + 2.0 * SDF_MAX_DISTANCE,
            bounds.height() * SDF_FONT_SIZE + 2.0 * SDF_MAX_DISTANCE,
        ];
        let size = [draw_extent[0].ceil() as u32, draw_extent[1].ceil() as u32];
        if size[0] > SDF_STAGING_SIZE || size[1] > SDF_STAGING_SIZE {
            panic!(
                "glyph {fingerprint:?} of {}x{} px does not fit the {SDF_STAGING_SIZE}x{SDF_STAGING_SIZE} SDF staging texture",
                size[0], size[1]
            );
        }

        let (texture_index, origin) = self.allocate_rect(size);

        let offset = Vec2::splat(SDF_MAX_DISTANCE) - Vec2::from(bounds.min) * SDF_FONT_SIZE;
        let path = outline.path.transformed(SDF_FONT_SIZE, offset);
        let field = rasterize(&path, size[0] as usize, size[1] as usize, SDF_MAX_DISTANCE);

        let device = self.textures.device().clone();
        self.staging.prepare_write(&device).blit(&field, 0, 0);
        self.staging.flush(&device, size[1]);
        self.textures.copy_from(
            texture_index,
            self.staging.handle(),
            &[CopyRegion {
                src_origin: [0, 0],
                dst_origin: origin,
                extent: size,
            }],
        );
        device.wait_idle();

        let atlas_size = SDF_ATLAS_SIZE as f32;
        let left = origin[0] as f32;
        let bottom = origin[1] as f32;
        let right = left + draw_extent[0];
        let top = bottom + draw_extent[1];
        let z = texture_index as f32;
        let rect = AtlasRect {
            texture_index: texture_index as u16,
            origin: [origin[0] as u16, origin[1] as u16],
            size: [size[0] as u16, size[1] as u16],
            tex_coords: [
                Vec3::new(left / atlas_size, bottom / atlas_size, z),
                Vec3::new(right / atlas_size, bottom / atlas_size, z),
                Vec3::new(left / atlas_size, top / atlas_size, z),
                Vec3::new(right / atlas_size, top / atlas_size, z),
            ],
            em_bounds: bounds.expand(SDF_MAX_DISTANCE / SDF_FONT_SIZE),
        };

        log::debug!(
            "rasterized glyph {fingerprint:?} into sdf texture {texture_index} at {origin:?} ({}x{})",
            size[0],
            size[1]
        );
        self.entries.insert(fingerprint, rect);
        (rect, true)
    }

    /// Append one quad per visible glyph of `text` that overlaps `clip`.
    ///
    /// `transform` maps text-local pixels to the window. Returns the number of glyphs
    /// placed. If any glyph had to be rasterized, the SDF atlas is made ready for sampling.
    pub fn place_vertices(
        &mut self,
        span: &mut VertexSpan<SdfVertex>,
        clip: Rect,
        transform: &Transform,
        text: &ShapedText,
        color: Option<Color>,
        fonts: &mut dyn GlyphOutlines,
    ) -> usize {
        let mut added = false;
        let mut placed = 0;
        for glyph in &text.glyphs {
            if !glyph.category.is_visible() {
                continue;
            }

            let bounds = glyph_draw_bounds(glyph);
            if !transform.bounding_rect(&bounds).overlaps(&clip) {
                continue;
            }

            let (rect, new) = self.get_or_rasterize(glyph.fingerprint, fonts);
            added |= new;
            emit_glyph(
                span,
                &rect,
                glyph.position,
                glyph.font_size,
                transform,
                clip,
                color.unwrap_or(glyph.color),
            );
            placed += 1;
        }

        if added {
            self.prepare_for_rendering();
        }
        placed
    }

    /// Append the quad of a single glyph with its pen at `position`.
    ///
    /// Returns false when the glyph lies outside `clip`.
    #[allow(clippy::too_many_arguments)]
    pub fn place_glyph(
        &mut self,
        span: &mut VertexSpan<SdfVertex>,
        clip: Rect,
        transform: &Transform,
        position: [f32; 2],
        font_size: f32,
        fingerprint: GlyphFingerprint,
        color: Color,
        fonts: &mut dyn GlyphOutlines,
    ) -> bool {
        let (rect, added) = self.get_or_rasterize(fingerprint, fonts);
        if added {
            self.prepare_for_rendering();
        }

        let bounds = Rect::new(
            [
                position[0] + rect.em_bounds.min[0] * font_size,
                position[1] + rect.em_bounds.min[1] * font_size,
            ],
            [
                position[0] + rect.em_bounds.max[0] * font_size,
                position[1] + rect.em_bounds.max[1] * font_size,
            ],
        );
        if !transform.bounding_rect(&bounds).overlaps(&clip) {
            return false;
        }
        emit_glyph(span, &rect, position, font_size, transform, clip, color);
        true
    }

    /// Move the SDF atlas textures to the layout sampled by shaders.
    pub fn prepare_for_rendering(&mut self) {
        self.textures.prepare_for_rendering();
    }

    /// Forget every glyph and destroy the atlas textures.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.textures.clear();
        self.cursor = [0, 0];
        self.texture_index = 0;
        self.row_max_height = 0;
    }

    /// Forget every glyph and continue on a new device.
    pub fn reset_device(&mut self, device: D) {
        self.clear();
        self.staging.destroy(self.textures.device());
        self.textures.reset_device(device.clone());
        self.staging = new_staging(&device);
    }
}

impl<D: GpuDevice> Drop for GlyphCache<D> {
    fn drop(&mut self) {
        self.staging.destroy(self.textures.device());
    }
}

fn new_staging<D: GpuDevice>(device: &D) -> Staging<i8> {
    Staging::new(
        device,
        "sdf staging",
        TextureFormat::R8Snorm,
        SDF_STAGING_SIZE,
        SDF_STAGING_SIZE,
    )
}

/// Text-local area of a glyph including the distance field border at its display size.
fn glyph_draw_bounds(glyph: &ShapedGlyph) -> Rect {
    glyph
        .pixel_bounds()
        .expand(glyph.font_size * SDF_MAX_DISTANCE / SDF_FONT_SIZE)
}

fn emit_glyph(
    span: &mut VertexSpan<SdfVertex>,
    rect: &AtlasRect,
    position: [f32; 2],
    font_size: f32,
    transform: &Transform,
    clip: Rect,
    color: Color,
) {
    let local = Rect::new(
        [
            position[0] + rect.em_bounds.min[0] * font_size,
            position[1] + rect.em_bounds.min[1] * font_size,
        ],
        [
            position[0] + rect.em_bounds.max[0] * font_size,
            position[1] + rect.em_bounds.max[1] * font_size,
        ],
    );
    let quad = transform.transform_rect(&local);
    let clip = clip.to_array();
    let color = color.to_array();
    span.push_quad(std::array::from_fn(|i| {
        SdfVertex::new(
            quad.corners[i].to_array(),
            clip,
            rect.tex_coords[i].to_array(),
            color,
        )
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ImageLayout;
    use crate::testing::{init_logging, shape_monospace, DeviceCall, RecordingDevice, SquareOutlines};
    use tessera_gui::FontId;
    use tessera_gui_text::decode_snorm8;

    fn cache() -> (RecordingDevice, GlyphCache<RecordingDevice>) {
        let device = RecordingDevice::new();
        let cache = GlyphCache::new(device.clone());
        (device, cache)
    }

    fn glyph(id: u32) -> GlyphFingerprint {
        GlyphFingerprint::new(FontId(1), id)
    }

    #[test]
    fn test_get_or_rasterize_memoizes() {
        let (_, mut cache) = cache();
        let mut fonts = SquareOutlines::default();

        let (first, added) = cache.get_or_rasterize(glyph(65), &mut fonts);
        assert!(added);
        let (second, added) = cache.get_or_rasterize(glyph(65), &mut fonts);
        assert!(!added);
        assert_eq!(first, second);
        assert_eq!(fonts.request_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_rasterized_size_and_coordinates() {
        let (_, mut cache) = cache();
        let mut fonts = SquareOutlines::default();
        let (rect, _) = cache.get_or_rasterize(glyph(65), &mut fonts);

        // 0.5 x 0.7 EM at 28 px plus 3 px on each side.
        let draw_extent: [f32; 2] = [0.5 * 28.0 + 6.0, 0.7 * 28.0 + 6.0];
        assert_eq!(rect.size, [20, draw_extent[1].ceil() as u16]);
        assert_eq!(rect.origin, [0, 0]);
        assert_eq!(rect.texture_index, 0);
        assert_eq!(rect.tex_coords[0], Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(
            rect.tex_coords[3],
            Vec3::new(draw_extent[0] / 1024.0, draw_extent[1] / 1024.0, 0.0)
        );

        let expected = SquareOutlines::BOUNDS.expand(3.0 / 28.0);
        assert_eq!(rect.em_bounds, expected);
    }

    #[test]
    fn test_rasterized_field_lands_in_atlas() {
        let (device, mut cache) = cache();
        let mut fonts = SquareOutlines::default();
        cache.get_or_rasterize(glyph(1), &mut fonts);
        let (rect, _) = cache.get_or_rasterize(glyph(2), &mut fonts);
        assert_eq!(rect.origin, [20, 0]);

        let texture = cache.textures().handle(0);
        let sample = |x: u32, y: u32| decode_snorm8(device.pixel(texture, x, y)[0] as i8);

        // Center of the second glyph is inside, its corner texel is outside.
        assert!(sample(20 + 10, 10) < 0.0);
        assert!(sample(20, 0) > 0.0);
        // Texels nobody wrote keep the clear value.
        assert_eq!(sample(1000, 1000), -1.0);
    }

    #[test]
    fn test_shelf_wraps_rows_then_textures() {
        let (_, mut cache) = cache();
        assert_eq!(cache.allocate_rect([600, 100]), (0, [0, 0]));
        assert_eq!(cache.allocate_rect([400, 50]), (0, [600, 0]));
        // Does not fit next to the first two: new shelf above the tallest glyph of the row.
        assert_eq!(cache.allocate_rect([100, 30]), (0, [0, 100]));
        assert_eq!(cache.allocate_rect([100, 10]), (0, [100, 100]));
        assert_eq!(cache.allocate_rect([1000, 894]), (0, [0, 130]));
        assert_eq!(cache.textures().len(), 1);

        // No room above: next texture, created on demand.
        assert_eq!(cache.allocate_rect([100, 10]), (1, [0, 0]));
        assert_eq!(cache.textures().len(), 2);
    }

    #[test]
    fn test_repeated_glyph_shares_one_entry() {
        let (_, mut cache) = cache();
        let mut fonts = SquareOutlines::default();
        let text = shape_monospace("AA", 16.0, 10.0);
        let mut span = VertexSpan::new("sdf");

        let placed = cache.place_vertices(
            &mut span,
            Rect::everything(),
            &Transform::IDENTITY,
            &text,
            None,
            &mut fonts,
        );
        assert_eq!(placed, 2);
        assert_eq!(cache.len(), 1);

        let v = span.as_slice();
        assert_eq!(v.len(), 8);
        for i in 0..4 {
            assert_eq!(v[i].atlas_position, v[i + 4].atlas_position);
        }
        assert!((v[4].position[0] - v[0].position[0] - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_clipped_text_only_places_visible_glyphs() {
        let (_, mut cache) = cache();
        let mut fonts = SquareOutlines::default();
        let text = shape_monospace("ABCDEFGH", 20.0, 20.0);
        let clip = Rect::new([0.0, 0.0], [70.0, 100.0]);
        let mut span = VertexSpan::new("sdf");

        let placed =
            cache.place_vertices(&mut span, clip, &Transform::IDENTITY, &text, None, &mut fonts);
        assert_eq!(placed, 4);
        assert_eq!(span.len(), 16);
        // Glyphs outside the clip are not even rasterized.
        assert_eq!(fonts.request_count(), 4);
        assert!(span.as_slice().iter().all(|v| v.clip == clip.to_array()));
    }

    #[test]
    fn test_invisible_glyphs_are_skipped() {
        let (_, mut cache) = cache();
        let mut fonts = SquareOutlines::default();
        let text = shape_monospace("a b\t", 16.0, 10.0);
        let mut span = VertexSpan::new("sdf");

        let placed = cache.place_vertices(
            &mut span,
            Rect::everything(),
            &Transform::IDENTITY,
            &text,
            Some(Color::rgb(1.0, 0.0, 0.0)),
            &mut fonts,
        );
        assert_eq!(placed, 2);
        assert!(span
            .as_slice()
            .iter()
            .all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_new_glyph_transitions_atlas_for_sampling() {
        init_logging();
        let (device, mut cache) = cache();
        let mut fonts = SquareOutlines::default();
        let text = shape_monospace("A", 16.0, 10.0);
        let mut span = VertexSpan::new("sdf");
        cache.place_vertices(&mut span, Rect::everything(), &Transform::IDENTITY, &text, None, &mut fonts);

        let texture = cache.textures().handle(0);
        assert_eq!(
            device.transitions_of(texture),
            vec![
                (ImageLayout::Undefined, ImageLayout::TransferDst),
                (ImageLayout::TransferDst, ImageLayout::ShaderReadOnly),
            ]
        );
        assert_eq!(
            device.transitions_of(cache.staging_handle()),
            vec![
                (ImageLayout::Undefined, ImageLayout::General),
                (ImageLayout::General, ImageLayout::TransferSrc),
            ]
        );

        // A cache hit issues no transfer at all.
        device.clear_calls();
        cache.place_vertices(&mut span, Rect::everything(), &Transform::IDENTITY, &text, None, &mut fonts);
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_place_glyph_scales_em_bounds() {
        let (_, mut cache) = cache();
        let mut fonts = SquareOutlines::default();
        let mut span = VertexSpan::new("sdf");
        let white = Color::rgb(1.0, 1.0, 1.0);

        assert!(cache.place_glyph(
            &mut span,
            Rect::everything(),
            &Transform::IDENTITY,
            [100.0, 50.0],
            28.0,
            glyph(7),
            white,
            &mut fonts,
        ));
        let v = span.as_slice();
        let em = SquareOutlines::BOUNDS.expand(3.0 / 28.0);
        assert_eq!(v[0].position, [100.0 + em.min[0] * 28.0, 50.0 + em.min[1] * 28.0, 0.0]);

        let far = Rect::new([-100.0, -100.0], [-50.0, -50.0]);
        assert!(!cache.place_glyph(
            &mut span,
            far,
            &Transform::IDENTITY,
            [100.0, 50.0],
            28.0,
            glyph(7),
            white,
            &mut fonts,
        ));
        assert_eq!(span.len(), 4);
    }

    #[test]
    fn test_reset_device_forgets_glyphs() {
        let (device, mut cache) = cache();
        let mut fonts = SquareOutlines::default();
        cache.get_or_rasterize(glyph(1), &mut fonts);
        let live = device.live_textures();

        let next = RecordingDevice::new();
        cache.reset_device(next.clone());
        assert!(cache.is_empty());
        assert_eq!(device.live_textures(), live - 2);
        assert_eq!(next.live_textures(), 1);

        let (rect, added) = cache.get_or_rasterize(glyph(1), &mut fonts);
        assert!(added);
        assert_eq!(rect.origin, [0, 0]);
        assert!(next
            .calls()
            .iter()
            .any(|c| matches!(c, DeviceCall::Copy(..))));
    }
}
