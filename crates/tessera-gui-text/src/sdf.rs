//! Signed distance field rasterization.
//!
//! The field is sampled at pixel centres. Each value is the distance to the nearest
//! outline edge divided by `max_distance`, clamped to `[-1, 1]`, negative inside the
//! glyph, and stored as an `R8Snorm` texel.

use glam::Vec2;
use tessera_gui::PixelMap;

use crate::GlyphPath;

/// Maximum deviation in pixels between a curve and its flattened polyline.
const FLATTEN_TOLERANCE: f32 = 0.125;

/// Encode a normalized distance in `[-1, 1]` as an `R8Snorm` texel.
#[inline]
pub fn encode_snorm8(value: f32) -> i8 {
    (value.clamp(-1.0, 1.0) * 127.0).round() as i8
}

/// Decode an `R8Snorm` texel the way the GPU samples it.
#[inline]
pub fn decode_snorm8(value: i8) -> f32 {
    (value as f32 / 127.0).max(-1.0)
}

/// Rasterize `path` (already in pixel coordinates of the output) into a `width`×`height`
/// signed distance field.
///
/// Inside/outside is decided with the non-zero winding rule, so overlapping contours of
/// the same direction merge and counter-wound contours cut holes.
pub fn rasterize(path: &GlyphPath, width: usize, height: usize, max_distance: f32) -> PixelMap<i8> {
    let polygons: Vec<Vec<Vec2>> = path
        .contours
        .iter()
        .map(|c| c.flatten(FLATTEN_TOLERANCE))
        .filter(|p| p.len() >= 2)
        .collect();

    let mut field = PixelMap::filled(width, height, encode_snorm8(1.0));
    if polygons.is_empty() {
        return field;
    }

    for y in 0..height {
        for x in 0..width {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let mut distance = f32::MAX;
            let mut winding = 0;
            for polygon in &polygons {
                for (i, &a) in polygon.iter().enumerate() {
                    let b = polygon[(i + 1) % polygon.len()];
                    distance = distance.min(distance_to_segment(p, a, b));
                    winding += winding_contribution(p, a, b);
                }
            }

            let signed = if winding != 0 { -distance } else { distance };
            field.set(x, y, encode_snorm8(signed / max_distance));
        }
    }
    field
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let length_squared = ab.length_squared();
    if length_squared == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / length_squared).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Crossing of the ray from `p` towards +x with edge `a → b`: +1 upward, -1 downward.
fn winding_contribution(p: Vec2, a: Vec2, b: Vec2) -> i32 {
    let side = (b - a).perp_dot(p - a);
    if a.y <= p.y {
        if b.y > p.y && side > 0.0 {
            return 1;
        }
    } else if b.y <= p.y && side < 0.0 {
        return -1;
    }
    0
}
