use tessera_gui::{Color, Quad, Rect, Transform};

use crate::span::VertexSpan;
use crate::vertex::FlatVertex;

/// Append a solid quad. `quad` is in the local coordinates of `transform`.
///
/// Quads whose window bounds miss `clip` produce no vertices.
pub fn place_vertices(
    span: &mut VertexSpan<FlatVertex>,
    transform: &Transform,
    clip: Rect,
    quad: &Quad,
    color: Color,
) {
    let quad = transform.transform_quad(quad);
    if !quad.bounding_rect().overlaps(&clip) {
        return;
    }

    let clip = clip.to_array();
    let color = color.to_array();
    span.push_quad(quad.corners.map(|p| FlatVertex::new(p.to_array(), clip, color)));
}
