//! Boxes with a border and rounded or cut corners.
//!
//! The outline is not tessellated. The producer emits one quad slightly larger than the box
//! and gives every vertex its distances to the four box edges; the fragment shader rebuilds
//! the rounded rectangle's distance field from the interpolated distances.

use tessera_gui::{Color, CornerRadii, Rect, Transform};

use crate::span::VertexSpan;
use crate::vertex::BoxVertex;

/// A box in local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxShape {
    pub rect: Rect,
    pub fill_color: Color,
    pub line_color: Color,
    /// Border width in local units, centred on the edge of `rect`.
    pub line_width: f32,
    pub corner_radii: CornerRadii,
}

impl BoxShape {
    pub fn new(rect: Rect, fill_color: Color) -> Self {
        Self {
            rect,
            fill_color,
            line_color: Color::transparent(),
            line_width: 0.0,
            corner_radii: CornerRadii::default(),
        }
    }

    pub fn with_border(mut self, line_color: Color, line_width: f32) -> Self {
        self.line_color = line_color;
        self.line_width = line_width;
        self
    }

    pub fn with_corner_radii(mut self, corner_radii: CornerRadii) -> Self {
        self.corner_radii = corner_radii;
        self
    }

    /// Move the border inside `rect`: shrink the box and its radii by half the line width.
    pub fn with_border_inside(mut self) -> Self {
        let half = self.line_width * 0.5;
        self.rect = self.rect.expand(-half);
        self.corner_radii = self.corner_radii.grow(-half);
        self
    }

    /// Move the border outside `rect`: grow the box and its radii by half the line width.
    pub fn with_border_outside(mut self) -> Self {
        let half = self.line_width * 0.5;
        self.rect = self.rect.expand(half);
        self.corner_radii = self.corner_radii.grow(half);
        self
    }
}

/// Append the quad of `shape`, drawn through `transform` and clipped to `clip`.
///
/// Box distances follow each axis' scale. Radii and the line width are circular, so under a
/// non-uniform scale they use the smaller of the two.
pub fn place_vertices(
    span: &mut VertexSpan<BoxVertex>,
    transform: &Transform,
    clip: Rect,
    shape: &BoxShape,
) {
    let [scale_x, scale_y] = transform.axis_scales();
    if scale_x <= 0.0 || scale_y <= 0.0 {
        return;
    }
    let scale = scale_x.min(scale_y);

    // Room for antialiasing and the outer half of the border, in window pixels.
    let line_width = shape.line_width * scale;
    let extra = (line_width * 0.5).max(1.0);

    let r = &shape.rect;
    let expanded = Rect::new(
        [r.min[0] - extra / scale_x, r.min[1] - extra / scale_y],
        [r.max[0] + extra / scale_x, r.max[1] + extra / scale_y],
    );
    let quad = transform.transform_rect(&expanded);
    if !quad.bounding_rect().overlaps(&clip) {
        return;
    }

    let width = r.width() * scale_x;
    let height = r.height() * scale_y;
    let coord_within_box = [
        [-extra, -extra, width + extra, height + extra],
        [width + extra, -extra, -extra, height + extra],
        [-extra, height + extra, width + extra, -extra],
        [width + extra, height + extra, -extra, -extra],
    ];

    let clip = clip.to_array();
    let fill_color = shape.fill_color.to_array();
    let line_color = shape.line_color.to_array();
    let corner_radii = shape.corner_radii.scale(scale).to_array();
    span.push_quad(std::array::from_fn(|i| BoxVertex {
        position: quad.corners[i].to_array(),
        clip,
        coord_within_box: coord_within_box[i],
        fill_color,
        line_color,
        corner_radii,
        line_width,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounded_box() -> BoxShape {
        BoxShape::new(Rect::new([0.0, 0.0], [100.0, 50.0]), Color::rgb(1.0, 0.0, 0.0))
            .with_border(Color::rgb(0.0, 0.0, 0.0), 2.0)
            .with_corner_radii(CornerRadii::uniform(5.0))
    }

    #[test]
    fn test_rounded_box_covers_expanded_rect() {
        let mut span = VertexSpan::new("box");
        place_vertices(&mut span, &Transform::IDENTITY, Rect::everything(), &rounded_box());
        let v = span.as_slice();
        assert_eq!(v.len(), 4);

        let positions: Vec<[f32; 3]> = v.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![
                [-1.0, -1.0, 0.0],
                [101.0, -1.0, 0.0],
                [-1.0, 51.0, 0.0],
                [101.0, 51.0, 0.0],
            ]
        );
        assert_eq!(v[0].coord_within_box, [-1.0, -1.0, 101.0, 51.0]);
        assert_eq!(v[3].coord_within_box, [101.0, 51.0, -1.0, -1.0]);
        // Opposite corners see the box edges at the same interpolated distances.
        for i in 0..4 {
            assert_eq!(
                v[0].coord_within_box[i] + v[3].coord_within_box[i],
                v[1].coord_within_box[i] + v[2].coord_within_box[i]
            );
        }
        assert!(v.iter().all(|v| v.corner_radii == [5.0; 4]
            && v.line_width == 2.0
            && v.fill_color == [1.0, 0.0, 0.0, 1.0]
            && v.line_color == [0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_thin_border_still_expands_one_pixel() {
        let mut span = VertexSpan::new("box");
        let shape = BoxShape::new(Rect::new([0.0, 0.0], [10.0, 10.0]), Color::rgb(1.0, 1.0, 1.0));
        place_vertices(&mut span, &Transform::IDENTITY, Rect::everything(), &shape);
        assert_eq!(span.as_slice()[0].position, [-1.0, -1.0, 0.0]);
    }

    #[test]
    fn test_scaled_box_uses_window_pixels() {
        let mut span = VertexSpan::new("box");
        place_vertices(&mut span, &Transform::scale(2.0, 2.0), Rect::everything(), &rounded_box());
        let v = span.as_slice();
        assert_eq!(v[0].position, [-2.0, -2.0, 0.0]);
        assert_eq!(v[3].position, [202.0, 102.0, 0.0]);
        assert_eq!(v[0].coord_within_box, [-2.0, -2.0, 202.0, 102.0]);
        assert_eq!(v[0].corner_radii, [10.0; 4]);
        assert_eq!(v[0].line_width, 4.0);
    }

    #[test]
    fn test_stretched_box_scales_each_axis() {
        let mut span = VertexSpan::new("box");
        place_vertices(&mut span, &Transform::scale(4.0, 2.0), Rect::everything(), &rounded_box());
        let v = span.as_slice();
        // Line width 2 at the smaller scale is 4 px, so the quad grows by 2 px per side.
        assert_eq!(v[0].position, [-2.0, -2.0, 0.0]);
        assert_eq!(v[3].position, [402.0, 102.0, 0.0]);
        assert_eq!(v[0].coord_within_box, [-2.0, -2.0, 402.0, 102.0]);
        assert_eq!(v[3].coord_within_box, [402.0, 102.0, -2.0, -2.0]);
        assert_eq!(v[0].corner_radii, [10.0; 4]);
        assert_eq!(v[0].line_width, 4.0);
    }

    #[test]
    fn test_border_inside_and_outside() {
        let inside = rounded_box().with_border_inside();
        assert_eq!(inside.rect, Rect::new([1.0, 1.0], [99.0, 49.0]));
        assert_eq!(inside.corner_radii, CornerRadii::uniform(4.0));

        let outside = rounded_box().with_border_outside();
        assert_eq!(outside.rect, Rect::new([-1.0, -1.0], [101.0, 51.0]));
        assert_eq!(outside.corner_radii, CornerRadii::uniform(6.0));

        let cut = rounded_box()
            .with_corner_radii(CornerRadii::new(-5.0, 5.0, 0.0, 0.5))
            .with_border_inside();
        assert_eq!(cut.corner_radii, CornerRadii::new(-4.0, 4.0, 0.0, 0.0));
    }

    #[test]
    fn test_box_outside_clip_is_dropped() {
        let mut span = VertexSpan::new("box");
        let clip = Rect::new([200.0, 200.0], [300.0, 300.0]);
        place_vertices(&mut span, &Transform::IDENTITY, clip, &rounded_box());
        assert!(span.is_empty());
    }
}
