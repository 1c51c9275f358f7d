//! Vertex formats of the four pipelines.
//!
//! Every vertex starts with its window position (x, y, depth) and the clip rectangle
//! `[min_x, min_y, max_x, max_y]` in window pixels; the fragment shaders discard outside it.
//! All fields are `f32` so the `repr(C)` layout has no padding and matches the WGSL structs.

use bytemuck::{Pod, Zeroable};

const F32: wgpu::BufferAddress = std::mem::size_of::<f32>() as wgpu::BufferAddress;

/// Solid colored quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FlatVertex {
    pub position: [f32; 3],
    pub clip: [f32; 4],
    pub color: [f32; 4],
}

impl FlatVertex {
    pub const fn new(position: [f32; 3], clip: [f32; 4], color: [f32; 4]) -> Self {
        Self {
            position,
            clip,
            color,
        }
    }

    pub const fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // clip
            wgpu::VertexAttribute {
                offset: 3 * F32,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4,
            },
            // color
            wgpu::VertexAttribute {
                offset: 7 * F32,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<FlatVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRIBUTES,
        }
    }
}

/// Corner of a box whose rounded or cut outline is evaluated per fragment.
///
/// `coord_within_box` holds the distances from this vertex to the box's left, bottom, right
/// and top edges, in window pixels (negative outside). Interpolated, it tells the fragment
/// shader where it is relative to all four edges and therefore to every corner.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BoxVertex {
    pub position: [f32; 3],
    pub clip: [f32; 4],
    pub coord_within_box: [f32; 4],
    pub fill_color: [f32; 4],
    pub line_color: [f32; 4],
    /// Bottom-left, bottom-right, top-left, top-right; negative radii cut the corner.
    pub corner_radii: [f32; 4],
    pub line_width: f32,
}

impl BoxVertex {
    pub const fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // clip
            wgpu::VertexAttribute {
                offset: 3 * F32,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4,
            },
            // coord_within_box
            wgpu::VertexAttribute {
                offset: 7 * F32,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
            // fill_color
            wgpu::VertexAttribute {
                offset: 11 * F32,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4,
            },
            // line_color
            wgpu::VertexAttribute {
                offset: 15 * F32,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x4,
            },
            // corner_radii
            wgpu::VertexAttribute {
                offset: 19 * F32,
                shader_location: 5,
                format: wgpu::VertexFormat::Float32x4,
            },
            // line_width
            wgpu::VertexAttribute {
                offset: 23 * F32,
                shader_location: 6,
                format: wgpu::VertexFormat::Float32,
            },
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BoxVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRIBUTES,
        }
    }
}

/// Corner of an image page quad.
///
/// `atlas_position` is `(u, v, texture_index)` with u and v already divided by the atlas
/// size.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ImageVertex {
    pub position: [f32; 3],
    pub clip: [f32; 4],
    pub atlas_position: [f32; 3],
}

impl ImageVertex {
    pub const fn new(position: [f32; 3], clip: [f32; 4], atlas_position: [f32; 3]) -> Self {
        Self {
            position,
            clip,
            atlas_position,
        }
    }

    pub const fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 3 * F32,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 7 * F32,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3,
            },
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ImageVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRIBUTES,
        }
    }
}

/// Corner of a glyph quad sampling the SDF atlas.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SdfVertex {
    pub position: [f32; 3],
    pub clip: [f32; 4],
    pub atlas_position: [f32; 3],
    pub color: [f32; 4],
}

impl SdfVertex {
    pub const fn new(
        position: [f32; 3],
        clip: [f32; 4],
        atlas_position: [f32; 3],
        color: [f32; 4],
    ) -> Self {
        Self {
            position,
            clip,
            atlas_position,
            color,
        }
    }

    pub const fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 3 * F32,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 7 * F32,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 10 * F32,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4,
            },
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SdfVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRIBUTES,
        }
    }
}
