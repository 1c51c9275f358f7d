//! # tessera-gui
//!
//! Graphics backend agnostic core types.
//!
//! This crate provides the geometry, color, pixel and shaped-text types shared by the
//! text engine (`tessera-gui-text`) and the rendering backend (`tessera-gui-wgpu`).
//! It has no dependency on any graphics API.
//!
//! Coordinate convention: window and image coordinates are y-up, with the origin at the
//! bottom-left corner.

mod color;
mod pixel_map;
mod primitives;
mod text;
mod transform;

pub use color::*;
pub use pixel_map::*;
pub use primitives::*;
pub use text::*;
pub use transform::*;
