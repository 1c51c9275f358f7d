//! Images stored as pages of the image atlas.

use std::sync::{Mutex, PoisonError, Weak};

use glam::Vec2;
use tessera_gui::{PixelMap, Rect, Rgba16f, Transform};

use crate::atlas::{page_extent, page_to_atlas_coord, Page};
use crate::constants::{IMAGE_ATLAS_SIZE, PAGE_SIZE};
use crate::device::GpuDevice;
use crate::gfx::GfxShared;
use crate::span::VertexSpan;
use crate::vertex::ImageVertex;

/// Where the pixels of an [`Image`] are.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageState {
    /// Pages are allocated but hold no pixels yet.
    #[default]
    Uninitialized,
    /// An upload is in progress.
    Drawing,
    /// The atlas holds the image and it can be drawn.
    Uploaded,
}

/// A rectangular raster stored as a grid of atlas pages.
///
/// The image owns its pages and returns them to the atlas when dropped. It refers back to
/// the shared graphics state through a weak handle; if that state is gone, or its atlas was
/// rebuilt after a device loss, the pages are simply forgotten.
pub struct Image<D: GpuDevice> {
    shared: Weak<Mutex<GfxShared<D>>>,
    generation: u64,
    extent: [u32; 2],
    page_extent: [u32; 2],
    pages: Vec<Page>,
    state: ImageState,
}

impl<D: GpuDevice> Image<D> {
    pub(crate) fn new(
        shared: Weak<Mutex<GfxShared<D>>>,
        generation: u64,
        extent: [u32; 2],
        pages: Vec<Page>,
    ) -> Self {
        let page_extent = page_extent(extent);
        debug_assert_eq!(pages.len(), (page_extent[0] * page_extent[1]) as usize);
        Self {
            shared,
            generation,
            extent,
            page_extent,
            pages,
            state: ImageState::Uninitialized,
        }
    }

    /// Size in pixels.
    #[inline]
    pub fn extent(&self) -> [u32; 2] {
        self.extent
    }

    /// Number of pages along each axis.
    #[inline]
    pub fn page_extent(&self) -> [u32; 2] {
        self.page_extent
    }

    #[inline]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[inline]
    pub fn state(&self) -> ImageState {
        self.state
    }

    /// Replace the contents of the image with `pixels`, which must match its extent.
    ///
    /// Blocks until the atlas holds the new pixels. After a device reset the image first
    /// re-allocates its pages in the new atlas.
    ///
    /// # Panics
    ///
    /// Panics when `pixels` has a different size than the image, or does not fit the
    /// staging texture.
    pub fn upload(&mut self, pixels: &PixelMap<Rgba16f>) {
        assert_eq!(
            [pixels.width() as u32, pixels.height() as u32],
            self.extent,
            "pixels do not match the image extent"
        );

        let Some(shared) = self.shared.upgrade() else {
            log::warn!("uploading an image whose graphics state is gone");
            return;
        };
        let mut shared = shared.lock().unwrap_or_else(PoisonError::into_inner);

        if self.generation != shared.generation() {
            log::debug!("re-allocating image pages after a device reset");
            self.pages = shared.atlas.allocate_pages(self.pages.len());
            self.generation = shared.generation();
        }

        self.state = ImageState::Drawing;
        shared.atlas.upload(&mut self.pages, pixels);
        self.state = ImageState::Uploaded;
    }

    /// Whether the image's pages are valid in the atlas of `generation` and hold pixels.
    pub(crate) fn is_drawable(&self, generation: u64) -> bool {
        self.generation == generation && self.state == ImageState::Uploaded
    }

    /// Append one textured quad per visible page.
    ///
    /// The image covers `(0, 0)..extent` in the coordinates `transform` maps to the window.
    /// Transparent pages and pages entirely outside `clip` produce no vertices.
    pub fn place_vertices(
        &self,
        span: &mut VertexSpan<ImageVertex>,
        transform: &Transform,
        clip: Rect,
    ) {
        if clip.is_empty() {
            return;
        }
        let [columns, rows] = self.page_extent;
        let stride = columns as usize + 1;

        // Window position of every page corner and whether it is inside the clip rectangle.
        let mut lattice = Vec::with_capacity(stride * (rows as usize + 1));
        for y in 0..=rows {
            for x in 0..=columns {
                let local = Vec2::new(
                    (x * PAGE_SIZE).min(self.extent[0]) as f32,
                    (y * PAGE_SIZE).min(self.extent[1]) as f32,
                );
                let position = transform.transform_point2(local);
                let inside = clip.contains([position.x, position.y]);
                lattice.push((position, inside));
            }
        }

        let clip_array = clip.to_array();
        for y in 0..rows {
            for x in 0..columns {
                let page = self.pages[(y * columns + x) as usize];
                if page.is_transparent() {
                    continue;
                }

                let v = y as usize * stride + x as usize;
                let corners = [lattice[v], lattice[v + 1], lattice[v + stride], lattice[v + stride + 1]];
                if corners.iter().all(|(_, inside)| !inside) {
                    let bounds = Rect::bounding(&corners.map(|(p, _)| p.truncate()));
                    if !bounds.overlaps(&clip) {
                        continue;
                    }
                }

                let width = (self.extent[0] - x * PAGE_SIZE).min(PAGE_SIZE) as f32;
                let height = (self.extent[1] - y * PAGE_SIZE).min(PAGE_SIZE) as f32;
                let coord = page_to_atlas_coord(page);
                let left = coord.origin[0] as f32;
                let bottom = coord.origin[1] as f32;
                let texture = coord.texture_index as f32;
                let offsets = [[0.0, 0.0], [width, 0.0], [0.0, height], [width, height]];

                span.push_quad(std::array::from_fn(|i| {
                    let atlas = [
                        (left + offsets[i][0]) / IMAGE_ATLAS_SIZE as f32,
                        (bottom + offsets[i][1]) / IMAGE_ATLAS_SIZE as f32,
                        texture,
                    ];
                    ImageVertex::new(corners[i].0.to_array(), clip_array, atlas)
                }));
            }
        }
    }
}

impl<D: GpuDevice> Drop for Image<D> {
    fn drop(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut shared = shared.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.generation() == self.generation {
            shared.atlas.free_pages(self.pages.drain(..));
        }
    }
}

impl<D: GpuDevice> std::fmt::Debug for Image<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("extent", &self.extent)
            .field("page_extent", &self.page_extent)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}
