//! Fixed sizes shared with the shaders. Changing any of these changes the GPU ABI.

/// Logical page size in pixels, excluding the border.
pub const PAGE_SIZE: u32 = 64;
/// Border in pixels around every page.
pub const PAGE_BORDER: u32 = 1;
/// Physical page footprint in the atlas texture.
pub const PAGE_STRIDE: u32 = PAGE_SIZE + 2 * PAGE_BORDER;
/// Pages along each axis of one atlas texture.
pub const PAGES_PER_AXIS: u32 = 60;
pub const PAGES_PER_TEXTURE: u32 = PAGES_PER_AXIS * PAGES_PER_AXIS;
/// Width and height of an image atlas texture: 3,960 px.
pub const IMAGE_ATLAS_SIZE: u32 = PAGES_PER_AXIS * PAGE_STRIDE;

/// Atlas textures an atlas may create before running out.
pub const MAX_ATLAS_TEXTURES: usize = 16;

pub const IMAGE_STAGING_WIDTH: u32 = 2048;
pub const IMAGE_STAGING_HEIGHT: u32 = 1024;

pub const SDF_ATLAS_SIZE: u32 = 1024;
pub const SDF_STAGING_SIZE: u32 = 128;
/// EM size in pixels at which glyphs are rasterized into the SDF atlas.
pub const SDF_FONT_SIZE: f32 = 28.0;
/// Border in pixels around each rasterized glyph; also the distance that maps to ±1.
pub const SDF_MAX_DISTANCE: f32 = 3.0;

/// Vertices per pipeline per frame, the range of a 16-bit index.
pub const MAX_VERTICES: usize = 65_536;
pub const MAX_QUADS: usize = MAX_VERTICES / 4;
pub const QUAD_INDEX_COUNT: usize = MAX_VERTICES * 3 / 2;
