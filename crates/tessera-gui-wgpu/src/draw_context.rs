//! The drawing surface handed to widgets.

use std::cell::RefCell;

use tessera_gui::{Color, CornerRadii, GlyphFingerprint, Quad, Rect, ShapedText, Transform};

use crate::boxes::{self, BoxShape};
use crate::device::GpuDevice;
use crate::flat;
use crate::gfx::Gfx;
use crate::image::Image;
use crate::span::VertexSpan;
use crate::vertex::{BoxVertex, FlatVertex, ImageVertex, SdfVertex};

/// The vertex spans of one frame, one per pipeline.
pub struct FrameSpans {
    pub flat: RefCell<VertexSpan<FlatVertex>>,
    pub boxes: RefCell<VertexSpan<BoxVertex>>,
    pub images: RefCell<VertexSpan<ImageVertex>>,
    pub sdf: RefCell<VertexSpan<SdfVertex>>,
}

impl FrameSpans {
    pub fn new() -> Self {
        Self {
            flat: RefCell::new(VertexSpan::new("flat")),
            boxes: RefCell::new(VertexSpan::new("box")),
            images: RefCell::new(VertexSpan::new("image")),
            sdf: RefCell::new(VertexSpan::new("sdf")),
        }
    }

    /// Empty every span for the next frame.
    pub fn clear(&mut self) {
        self.flat.get_mut().clear();
        self.boxes.get_mut().clear();
        self.images.get_mut().clear();
        self.sdf.get_mut().clear();
    }
}

impl Default for FrameSpans {
    fn default() -> Self {
        Self::new()
    }
}

/// Where and how a widget draws: a transform to the window, a clip rectangle, and the
/// spans of the frame being recorded.
///
/// A context is cheap to copy and is only valid for the frame it was made for. Every verb
/// takes `&self`.
pub struct DrawContext<'a, D: GpuDevice> {
    gfx: &'a Gfx<D>,
    spans: &'a FrameSpans,
    /// Local to window coordinates; z is depth.
    pub transform: Transform,
    /// Window pixels outside this rectangle are discarded.
    pub clipping_rectangle: Rect,
    /// The part of the window being redrawn, in local coordinates.
    pub scissor_rectangle: Rect,
}

impl<D: GpuDevice> Clone for DrawContext<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: GpuDevice> Copy for DrawContext<'_, D> {}

impl<'a, D: GpuDevice> DrawContext<'a, D> {
    /// Context for a whole window of `window_size` pixels; nothing is clipped.
    pub fn new(gfx: &'a Gfx<D>, spans: &'a FrameSpans, window_size: [f32; 2]) -> Self {
        let window = Rect::new([0.0, 0.0], window_size);
        Self {
            gfx,
            spans,
            transform: Transform::IDENTITY,
            clipping_rectangle: window,
            scissor_rectangle: window,
        }
    }

    #[inline]
    pub fn gfx(&self) -> &'a Gfx<D> {
        self.gfx
    }

    /// Context for a child drawn in its own coordinate system.
    ///
    /// `parent_to_local` maps this context's coordinates into the child's, `local_to_window`
    /// maps the child's coordinates to the window and `clip` is given in the child's
    /// coordinates. The child is clipped to both `clip` and this context's clip rectangle.
    pub fn make_child_context(
        &self,
        parent_to_local: Transform,
        local_to_window: Transform,
        clip: Rect,
    ) -> Self {
        Self {
            gfx: self.gfx,
            spans: self.spans,
            transform: local_to_window,
            clipping_rectangle: self
                .clipping_rectangle
                .intersect(&local_to_window.bounding_rect(&clip)),
            scissor_rectangle: parent_to_local.bounding_rect(&self.scissor_rectangle),
        }
    }

    /// Whether `rect`, in local coordinates, touches the part of the window being redrawn.
    pub fn overlaps(&self, rect: &Rect) -> bool {
        self.scissor_rectangle.overlaps(rect)
    }

    pub fn draw_filled_quad(&self, quad: &Quad, color: Color) {
        flat::place_vertices(
            &mut self.spans.flat.borrow_mut(),
            &self.transform,
            self.clipping_rectangle,
            quad,
            color,
        );
    }

    pub fn draw_filled_rect(&self, rect: &Rect, color: Color) {
        self.draw_filled_quad(&Quad::from_rect(rect, 0.0), color);
    }

    /// Draw a box whose border is centred on the edge of `rect`.
    ///
    /// Negative corner radii cut the corner instead of rounding it.
    pub fn draw_box(
        &self,
        rect: Rect,
        fill_color: Color,
        line_color: Color,
        line_width: f32,
        corner_radii: CornerRadii,
    ) {
        self.draw_box_shape(
            &BoxShape::new(rect, fill_color)
                .with_border(line_color, line_width)
                .with_corner_radii(corner_radii),
        );
    }

    /// Draw a box whose border lies entirely inside `rect`.
    pub fn draw_box_with_border_inside(
        &self,
        rect: Rect,
        fill_color: Color,
        line_color: Color,
        line_width: f32,
        corner_radii: CornerRadii,
    ) {
        self.draw_box_shape(
            &BoxShape::new(rect, fill_color)
                .with_border(line_color, line_width)
                .with_corner_radii(corner_radii)
                .with_border_inside(),
        );
    }

    /// Draw a box whose border lies entirely outside `rect`.
    pub fn draw_box_with_border_outside(
        &self,
        rect: Rect,
        fill_color: Color,
        line_color: Color,
        line_width: f32,
        corner_radii: CornerRadii,
    ) {
        self.draw_box_shape(
            &BoxShape::new(rect, fill_color)
                .with_border(line_color, line_width)
                .with_corner_radii(corner_radii)
                .with_border_outside(),
        );
    }

    pub fn draw_box_shape(&self, shape: &BoxShape) {
        boxes::place_vertices(
            &mut self.spans.boxes.borrow_mut(),
            &self.transform,
            self.clipping_rectangle,
            shape,
        );
    }

    /// Draw `image` with its bottom-left corner at the local origin, one pixel per unit.
    ///
    /// Images that are not uploaded, or were uploaded before a device reset, are skipped.
    pub fn draw_image(&self, image: &Image<D>) {
        let generation = self.gfx.generation();
        if !image.is_drawable(generation) {
            log::trace!("skipping image that is not uploaded: {image:?}");
            return;
        }
        image.place_vertices(
            &mut self.spans.images.borrow_mut(),
            &self.transform,
            self.clipping_rectangle,
        );
    }

    /// Draw shaped text positioned in local coordinates.
    ///
    /// `color` replaces the style color of every glyph when given.
    pub fn draw_text(&self, text: &ShapedText, color: Option<Color>) {
        let mut guard = self.gfx.lock();
        let shared = &mut *guard;
        shared.glyphs.place_vertices(
            &mut self.spans.sdf.borrow_mut(),
            self.clipping_rectangle,
            &self.transform,
            text,
            color,
            &mut *shared.fonts,
        );
    }

    /// Draw a single glyph with its pen position at `position`.
    pub fn draw_glyph(
        &self,
        position: [f32; 2],
        font_size: f32,
        fingerprint: GlyphFingerprint,
        color: Color,
    ) {
        let mut guard = self.gfx.lock();
        let shared = &mut *guard;
        shared.glyphs.place_glyph(
            &mut self.spans.sdf.borrow_mut(),
            self.clipping_rectangle,
            &self.transform,
            position,
            font_size,
            fingerprint,
            color,
            &mut *shared.fonts,
        );
    }
}
