//! Device-wide state shared by every window and image: the image atlas, the glyph cache and
//! the font collaborator, behind one mutex.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tessera_gui::{PixelMap, Rgba16f};
use tessera_gui_text::GlyphOutlines;

use crate::atlas::{page_extent, Atlas};
use crate::device::{GpuDevice, TextureHandle};
use crate::glyph_cache::GlyphCache;
use crate::image::Image;

/// State guarded by the gui mutex.
pub struct GfxShared<D: GpuDevice> {
    device: D,
    generation: u64,
    pub(crate) atlas: Atlas<D>,
    pub(crate) glyphs: GlyphCache<D>,
    pub(crate) fonts: Box<dyn GlyphOutlines + Send>,
}

impl<D: GpuDevice> GfxShared<D> {
    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Incremented every time the atlases are rebuilt on a new device.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn atlas(&self) -> &Atlas<D> {
        &self.atlas
    }

    #[inline]
    pub fn glyphs(&self) -> &GlyphCache<D> {
        &self.glyphs
    }

    /// Image atlas textures in atlas order.
    pub fn image_textures(&self) -> Vec<TextureHandle> {
        self.atlas.textures().handles().collect()
    }

    pub fn sdf_textures(&self) -> Vec<TextureHandle> {
        self.glyphs.textures().handles().collect()
    }

    /// Make every atlas texture ready for sampling. Called once per frame after drawing.
    pub fn prepare_for_rendering(&mut self) {
        self.atlas.prepare_for_rendering();
        self.glyphs.prepare_for_rendering();
    }
}

/// Handle to the shared graphics state of one device.
///
/// Cloning is cheap; all clones lock the same mutex.
pub struct Gfx<D: GpuDevice> {
    shared: Arc<Mutex<GfxShared<D>>>,
}

impl<D: GpuDevice> Clone for Gfx<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: GpuDevice> Gfx<D> {
    pub fn new(device: D, fonts: impl GlyphOutlines + Send + 'static) -> Self {
        log::info!("creating image atlas and glyph cache");
        let shared = GfxShared {
            atlas: Atlas::new(device.clone()),
            glyphs: GlyphCache::new(device.clone()),
            device,
            generation: 0,
            fonts: Box::new(fonts),
        };
        Self {
            shared: Arc::new(Mutex::new(shared)),
        }
    }

    /// Take the gui mutex.
    pub fn lock(&self) -> MutexGuard<'_, GfxShared<D>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn device(&self) -> D {
        self.lock().device.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn free_page_count(&self) -> usize {
        self.lock().atlas.free_page_count()
    }

    /// Allocate an image of `extent` pixels. Its pixels are undefined until uploaded.
    pub fn make_image(&self, extent: [u32; 2]) -> Image<D> {
        let [columns, rows] = page_extent(extent);
        let mut shared = self.lock();
        let pages = shared.atlas.allocate_pages((columns * rows) as usize);
        Image::new(Arc::downgrade(&self.shared), shared.generation, extent, pages)
    }

    /// Allocate an image and upload `pixels` into it.
    pub fn make_image_with_pixels(&self, pixels: &PixelMap<Rgba16f>) -> Image<D> {
        let mut image = self.make_image([pixels.width() as u32, pixels.height() as u32]);
        image.upload(pixels);
        image
    }

    /// Make every atlas texture ready for sampling.
    pub fn prepare_for_rendering(&self) {
        self.lock().prepare_for_rendering();
    }

    /// Drop all GPU resources of the lost device and continue on `device`.
    ///
    /// Live images keep their size but must be uploaded again before they are drawn;
    /// glyphs are rasterized again on demand.
    pub fn reset_device(&self, device: D) {
        let mut shared = self.lock();
        shared.generation += 1;
        log::info!(
            "rebuilding atlases on a new device (generation {})",
            shared.generation
        );
        shared.atlas.reset_device(device.clone());
        shared.glyphs.reset_device(device.clone());
        shared.device = device;
    }
}
