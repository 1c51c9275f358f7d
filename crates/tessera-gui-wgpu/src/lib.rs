//! # tessera-gui-wgpu
//!
//! WGPU rendering backend for tessera.
//!
//! Images live in a paged texture atlas and glyphs in a signed distance field cache, both
//! owned by [`Gfx`], the state shared by every window of a device. Widgets draw through a
//! [`DrawContext`], which appends vertices for four pipelines (flat quads, boxes, images and
//! SDF text). The [`Renderer`] uploads those vertices once per frame and draws them with a
//! single shared quad index buffer.

mod atlas;
mod boxes;
pub mod constants;
mod device;
mod draw_context;
mod error;
mod flat;
mod gfx;
mod glyph_cache;
mod image;
mod quad_index;
mod renderer;
mod span;
mod staging;
mod vertex;
mod wgpu_device;

#[cfg(test)]
mod testing;

pub use atlas::{page_extent, page_to_atlas_coord, Atlas, AtlasTextures, Page, PageCoord};
pub use boxes::BoxShape;
pub use device::{
    CopyRegion, GpuDevice, ImageLayout, TextureDesc, TextureFormat, TextureHandle, TextureRole,
    TrackedTexture,
};
pub use draw_context::{DrawContext, FrameSpans};
pub use error::{GpuError, Result};
pub use gfx::{Gfx, GfxShared};
pub use glyph_cache::{AtlasRect, GlyphCache};
pub use image::{Image, ImageState};
pub use quad_index::{create_quad_index_buffer, quad_indices};
pub use renderer::{acquire_frame, FrameStats, Renderer, RendererConfig};
pub use span::VertexSpan;
pub use staging::Staging;
pub use vertex::{BoxVertex, FlatVertex, ImageVertex, SdfVertex};
pub use wgpu_device::WgpuDevice;

pub use tessera_gui as gui;
pub use tessera_gui_text as gui_text;

#[cfg(feature = "text-cosmic")]
pub use tessera_gui_text::cosmic::CosmicEngine;
