//! Paged texture atlas for images.
//!
//! An atlas owns up to [`MAX_ATLAS_TEXTURES`] large textures, each cut into a 60×60 grid of
//! pages. A page holds 64×64 pixels of an image and is surrounded by a 1-pixel border, so it
//! occupies 66×66 texels. Images are stored as a grid of pages; the pages of one image need
//! not be adjacent or even in the same texture.
//!
//! Page indices are global across the textures of an atlas:
//!
//! ```text
//! texture_index = page / 3600
//! cell_y        = (page % 3600) / 60
//! cell_x        = page % 60
//! origin        = (cell_x * 66 + 1, cell_y * 66 + 1)
//! ```
//!
//! Free pages are kept on a stack. Freed pages go on top and are the first to be reused;
//! pages of a newly created texture go to the bottom in ascending order.

use tessera_gui::{PixelMap, Rgba16f};

use crate::constants::{
    IMAGE_ATLAS_SIZE, IMAGE_STAGING_HEIGHT, IMAGE_STAGING_WIDTH, MAX_ATLAS_TEXTURES, PAGES_PER_AXIS,
    PAGES_PER_TEXTURE, PAGE_BORDER, PAGE_SIZE, PAGE_STRIDE,
};
use crate::device::{
    CopyRegion, GpuDevice, ImageLayout, TextureDesc, TextureFormat, TextureHandle, TextureRole,
    TrackedTexture,
};
use crate::staging::Staging;

/// Index of a page in an atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Page(pub u32);

impl Page {
    /// Marks a page region of an image that is fully transparent and has no storage.
    pub const TRANSPARENT: Page = Page(u32::MAX);

    #[inline]
    pub const fn is_transparent(self) -> bool {
        self.0 == u32::MAX
    }
}

/// Location of a page inside the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageCoord {
    pub texture_index: usize,
    /// Grid cell of the page, both components in `[0, 60)`.
    pub cell: [u32; 2],
    /// Texel of the first interior pixel of the page.
    pub origin: [u32; 2],
}

/// Where `page` lives. Pure; does not check that the texture exists.
pub const fn page_to_atlas_coord(page: Page) -> PageCoord {
    let texture_index = (page.0 / PAGES_PER_TEXTURE) as usize;
    let cell_y = (page.0 % PAGES_PER_TEXTURE) / PAGES_PER_AXIS;
    let cell_x = page.0 % PAGES_PER_AXIS;
    PageCoord {
        texture_index,
        cell: [cell_x, cell_y],
        origin: [
            cell_x * PAGE_STRIDE + PAGE_BORDER,
            cell_y * PAGE_STRIDE + PAGE_BORDER,
        ],
    }
}

/// Number of pages along each axis needed for an image of `extent` pixels.
pub const fn page_extent(extent: [u32; 2]) -> [u32; 2] {
    [extent[0].div_ceil(PAGE_SIZE), extent[1].div_ceil(PAGE_SIZE)]
}

/// The GPU textures of one atlas, with their tracked layouts.
pub struct AtlasTextures<D: GpuDevice> {
    device: D,
    label: &'static str,
    size: u32,
    format: TextureFormat,
    clear_value: [f32; 4],
    textures: Vec<TrackedTexture>,
}

impl<D: GpuDevice> AtlasTextures<D> {
    pub fn new(
        device: D,
        label: &'static str,
        size: u32,
        format: TextureFormat,
        clear_value: [f32; 4],
    ) -> Self {
        Self {
            device,
            label,
            size,
            format,
            clear_value,
            textures: Vec::new(),
        }
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Width and height of every texture in texels.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn handles(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.textures.iter().map(|t| t.handle)
    }

    pub fn handle(&self, index: usize) -> TextureHandle {
        self.textures[index].handle
    }

    pub fn layout(&self, index: usize) -> ImageLayout {
        self.textures[index].layout()
    }

    /// Create, clear and append a texture. Returns its index.
    ///
    /// # Panics
    ///
    /// Panics when the atlas already holds [`MAX_ATLAS_TEXTURES`] textures.
    pub fn add(&mut self) -> usize {
        if self.textures.len() >= MAX_ATLAS_TEXTURES {
            panic!(
                "{}: out of atlas textures, all {MAX_ATLAS_TEXTURES} are in use",
                self.label
            );
        }

        let mut texture = TrackedTexture::create(
            &self.device,
            TextureDesc {
                label: self.label,
                width: self.size,
                height: self.size,
                format: self.format,
                role: TextureRole::Atlas,
            },
        );
        texture.transition(&self.device, ImageLayout::TransferDst);
        self.device.clear_texture(texture.handle, self.clear_value);

        self.textures.push(texture);
        log::debug!("{}: now {} textures", self.label, self.textures.len());
        self.textures.len() - 1
    }

    /// Copy `regions` from a staging texture into texture `index`.
    pub fn copy_from(&mut self, index: usize, staging: TextureHandle, regions: &[CopyRegion]) {
        let texture = &mut self.textures[index];
        texture.transition(&self.device, ImageLayout::TransferDst);
        self.device.copy_regions(staging, texture.handle, regions);
    }

    /// Move every texture to the layout sampled by shaders.
    pub fn prepare_for_rendering(&mut self) {
        for texture in &mut self.textures {
            texture.transition(&self.device, ImageLayout::ShaderReadOnly);
        }
    }

    /// Destroy all textures.
    pub fn clear(&mut self) {
        for texture in self.textures.drain(..) {
            texture.destroy(&self.device);
        }
    }

    /// Destroy all textures and continue on a new device.
    pub fn reset_device(&mut self, device: D) {
        self.clear();
        self.device = device;
    }
}

impl<D: GpuDevice> Drop for AtlasTextures<D> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Paged image atlas: textures, free-page stack and the image staging texture.
pub struct Atlas<D: GpuDevice> {
    textures: AtlasTextures<D>,
    free_pages: Vec<Page>,
    staging: Staging<Rgba16f>,
}

impl<D: GpuDevice> Atlas<D> {
    pub fn new(device: D) -> Self {
        let staging = Staging::new(
            &device,
            "image staging",
            TextureFormat::Rgba16Float,
            IMAGE_STAGING_WIDTH,
            IMAGE_STAGING_HEIGHT,
        );
        Self {
            textures: AtlasTextures::new(
                device,
                "image atlas",
                IMAGE_ATLAS_SIZE,
                TextureFormat::Rgba16Float,
                [0.0; 4],
            ),
            free_pages: Vec::new(),
            staging,
        }
    }

    #[inline]
    pub fn textures(&self) -> &AtlasTextures<D> {
        &self.textures
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    pub fn free_page_count(&self) -> usize {
        self.free_pages.len()
    }

    pub fn staging_handle(&self) -> TextureHandle {
        self.staging.handle()
    }

    pub fn staging_layout(&self) -> ImageLayout {
        self.staging.layout()
    }

    fn add_texture(&mut self) {
        let index = self.textures.add() as u32;
        let first = index * PAGES_PER_TEXTURE;
        self.free_pages
            .splice(0..0, (first..first + PAGES_PER_TEXTURE).rev().map(Page));
    }

    /// Take `count` distinct pages, creating textures as needed.
    ///
    /// # Panics
    ///
    /// Panics when more than [`MAX_ATLAS_TEXTURES`] textures would be needed.
    pub fn allocate_pages(&mut self, count: usize) -> Vec<Page> {
        while self.free_pages.len() < count {
            self.add_texture();
        }
        let split = self.free_pages.len() - count;
        let mut pages = self.free_pages.split_off(split);
        pages.reverse();
        pages
    }

    pub fn allocate_page(&mut self) -> Page {
        self.allocate_pages(1)[0]
    }

    /// Return pages to the free stack. Transparent sentinels are ignored.
    pub fn free_pages(&mut self, pages: impl IntoIterator<Item = Page>) {
        for page in pages {
            if page.is_transparent() {
                continue;
            }
            debug_assert!(
                page_to_atlas_coord(page).texture_index < self.textures.len(),
                "freeing page {page:?} of a texture that does not exist"
            );
            debug_assert!(!self.free_pages.contains(&page), "double free of {page:?}");
            self.free_pages.push(page);
        }
    }

    /// Upload `pixels` into the pages of an image.
    ///
    /// Page regions whose pixels are all transparent give their page back and are replaced
    /// by [`Page::TRANSPARENT`]; transparent regions that gained content get a new page.
    ///
    /// # Panics
    ///
    /// Panics when the image plus its border does not fit the staging texture.
    pub fn upload(&mut self, pages: &mut [Page], pixels: &PixelMap<Rgba16f>) {
        let width = pixels.width() as u32;
        let height = pixels.height() as u32;
        let [pages_x, pages_y] = page_extent([width, height]);
        assert_eq!(pages.len(), (pages_x * pages_y) as usize);

        let staged_width = width + 2 * PAGE_BORDER;
        let staged_height = height + 2 * PAGE_BORDER;
        if staged_width > self.staging.width() || staged_height > self.staging.height() {
            panic!(
                "image of {width}x{height} px does not fit the {}x{} image staging texture",
                self.staging.width(),
                self.staging.height()
            );
        }

        let device = self.textures.device().clone();
        let staged = self.staging.prepare_write(&device);
        staged.blit(pixels, PAGE_BORDER as usize, PAGE_BORDER as usize);
        fill_transparent_border(staged, width as usize, height as usize, PAGE_BORDER as usize);

        for py in 0..pages_y {
            for px in 0..pages_x {
                let index = (py * pages_x + px) as usize;
                let empty = page_region_is_transparent(pixels, px, py);
                let page = pages[index];
                if empty && !page.is_transparent() {
                    self.free_pages([page]);
                    pages[index] = Page::TRANSPARENT;
                } else if !empty && page.is_transparent() {
                    pages[index] = self.allocate_page();
                }
            }
        }

        self.staging.flush(&device, staged_height);

        let mut regions: Vec<Vec<CopyRegion>> = vec![Vec::new(); self.textures.len()];
        for py in 0..pages_y {
            for px in 0..pages_x {
                let page = pages[(py * pages_x + px) as usize];
                if page.is_transparent() {
                    continue;
                }
                let coord = page_to_atlas_coord(page);
                let page_width = (width - px * PAGE_SIZE).min(PAGE_SIZE);
                let page_height = (height - py * PAGE_SIZE).min(PAGE_SIZE);
                regions[coord.texture_index].push(CopyRegion {
                    src_origin: [px * PAGE_SIZE, py * PAGE_SIZE],
                    dst_origin: [coord.origin[0] - PAGE_BORDER, coord.origin[1] - PAGE_BORDER],
                    extent: [page_width + 2 * PAGE_BORDER, page_height + 2 * PAGE_BORDER],
                });
            }
        }

        let staging = self.staging.handle();
        for (texture_index, regions) in regions.iter().enumerate() {
            if !regions.is_empty() {
                self.textures.copy_from(texture_index, staging, regions);
            }
        }
        device.wait_idle();

        log::debug!(
            "uploaded {width}x{height} image into {} pages",
            pages.iter().filter(|p| !p.is_transparent()).count()
        );
    }

    /// Move all atlas textures to the layout sampled by shaders.
    pub fn prepare_for_rendering(&mut self) {
        self.textures.prepare_for_rendering();
    }

    /// Destroy every texture and start over on `device`.
    ///
    /// All pages become invalid; images must be re-created or re-uploaded.
    pub fn reset_device(&mut self, device: D) {
        self.staging.destroy(self.textures.device());
        self.textures.reset_device(device.clone());
        self.free_pages.clear();
        self.staging = Staging::new(
            &device,
            "image staging",
            TextureFormat::Rgba16Float,
            IMAGE_STAGING_WIDTH,
            IMAGE_STAGING_HEIGHT,
        );
    }
}

impl<D: GpuDevice> Drop for Atlas<D> {
    fn drop(&mut self) {
        self.staging.destroy(self.textures.device());
    }
}

/// Whether every pixel of page `(px, py)` of `pixels` is transparent.
fn page_region_is_transparent(pixels: &PixelMap<Rgba16f>, px: u32, py: u32) -> bool {
    let x0 = (px * PAGE_SIZE) as usize;
    let y0 = (py * PAGE_SIZE) as usize;
    let x1 = (x0 + PAGE_SIZE as usize).min(pixels.width());
    let y1 = (y0 + PAGE_SIZE as usize).min(pixels.height());
    (y0..y1).all(|y| pixels.row(y)[x0..x1].iter().all(|p| p.is_transparent()))
}

/// Fill `border` rings around the `width`×`height` image staged at `(border, border)`.
///
/// Every ring pixel takes the color of the nearest image pixel with alpha zeroed, so that
/// linear filtering at a page edge fades to the image's own color instead of whatever
/// lies next to it in the atlas.
fn fill_transparent_border(staged: &mut PixelMap<Rgba16f>, width: usize, height: usize, border: usize) {
    if width == 0 || height == 0 {
        return;
    }
    let outer_width = width + 2 * border;
    let outer_height = height + 2 * border;
    for y in 0..outer_height {
        let inside_y = y >= border && y < border + height;
        for x in 0..outer_width {
            let inside_x = x >= border && x < border + width;
            if inside_x && inside_y {
                continue;
            }
            let nearest_x = x.clamp(border, border + width - 1);
            let nearest_y = y.clamp(border, border + height - 1);
            let color = staged.get(nearest_x, nearest_y).without_alpha();
            staged.set(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::testing::{init_logging, DeviceCall, RecordingDevice};
    use tessera_gui::Color;

    fn atlas() -> (RecordingDevice, Atlas<RecordingDevice>) {
        let device = RecordingDevice::new();
        let atlas = Atlas::new(device.clone());
        (device, atlas)
    }

    #[test]
    fn test_page_coordinates() {
        assert_eq!(
            page_to_atlas_coord(Page(0)),
            PageCoord {
                texture_index: 0,
                cell: [0, 0],
                origin: [1, 1]
            }
        );
        assert_eq!(
            page_to_atlas_coord(Page(61)),
            PageCoord {
                texture_index: 0,
                cell: [1, 1],
                origin: [67, 67]
            }
        );
        let last = page_to_atlas_coord(Page(3599));
        assert_eq!(last.cell, [59, 59]);
        assert_eq!(last.origin, [59 * 66 + 1, 59 * 66 + 1]);
        assert!(last.origin[0] + PAGE_SIZE + PAGE_BORDER <= IMAGE_ATLAS_SIZE);
    }

    #[test]
    fn test_page_coordinates_are_a_bijection() {
        let mut seen = HashSet::new();
        for page in 0..(2 * PAGES_PER_TEXTURE) {
            let coord = page_to_atlas_coord(Page(page));
            assert!(coord.cell[0] < 60 && coord.cell[1] < 60);
            assert!(seen.insert((coord.texture_index, coord.cell)));
            let back = coord.texture_index as u32 * PAGES_PER_TEXTURE
                + coord.cell[1] * PAGES_PER_AXIS
                + coord.cell[0];
            assert_eq!(back, page);
        }
    }

    #[test]
    fn test_page_extent_rounds_up() {
        assert_eq!(page_extent([10, 10]), [1, 1]);
        assert_eq!(page_extent([64, 64]), [1, 1]);
        assert_eq!(page_extent([130, 70]), [3, 2]);
        assert_eq!(page_extent([0, 5]), [0, 1]);
    }

    #[test]
    fn test_growth_to_second_texture() {
        init_logging();
        let (device, mut atlas) = atlas();
        let pages = atlas.allocate_pages(3601);
        assert_eq!(atlas.texture_count(), 2);
        assert_eq!(pages.len(), 3601);
        let coord = page_to_atlas_coord(pages[3600]);
        assert_eq!(coord.texture_index, 1);
        assert_eq!(coord.cell, [0, 0]);
        assert_eq!(atlas.free_page_count(), 2 * 3600 - 3601);

        let distinct: HashSet<_> = pages.iter().collect();
        assert_eq!(distinct.len(), pages.len());

        // New atlas textures are cleared right after creation.
        let clears = device
            .calls()
            .iter()
            .filter(|c| matches!(c, DeviceCall::Clear(_)))
            .count();
        assert_eq!(clears, 2);
    }

    #[test]
    fn test_freed_pages_are_reused_first() {
        let (_, mut atlas) = atlas();
        let first = atlas.allocate_pages(3);
        assert_eq!(first, vec![Page(0), Page(1), Page(2)]);
        atlas.free_pages([first[1]]);
        assert_eq!(atlas.allocate_page(), first[1]);
        assert_eq!(atlas.allocate_page(), Page(3));
    }

    #[test]
    fn test_interleaved_allocation_keeps_pages_disjoint() {
        let (_, mut atlas) = atlas();
        let mut live: Vec<Vec<Page>> = Vec::new();
        let mut allocated = 0usize;
        let mut freed = 0usize;

        for round in 0..40usize {
            let count = (round * 7919) % 300 + 1;
            live.push(atlas.allocate_pages(count));
            allocated += count;
            if round % 3 == 2 {
                let victim = live.remove(round % live.len());
                freed += victim.len();
                atlas.free_pages(victim);
            }

            let in_use: Vec<Page> = live.iter().flatten().copied().collect();
            assert_eq!(allocated - freed, in_use.len());
            let in_use_set: HashSet<Page> = in_use.iter().copied().collect();
            assert_eq!(in_use_set.len(), in_use.len(), "page handed out twice");
            assert!(atlas.free_pages.iter().all(|p| !in_use_set.contains(p)));
            assert_eq!(
                atlas.free_page_count() + in_use.len(),
                atlas.texture_count() * PAGES_PER_TEXTURE as usize
            );
        }
    }

    #[test]
    #[should_panic(expected = "out of atlas textures")]
    fn test_seventeenth_texture_is_fatal() {
        let (_, mut atlas) = atlas();
        atlas.allocate_pages(16 * PAGES_PER_TEXTURE as usize + 1);
    }

    #[test]
    fn test_upload_copies_page_with_border() {
        init_logging();
        let (device, mut atlas) = atlas();
        let mut pages = atlas.allocate_pages(1);
        let red = Rgba16f::from_color(Color::rgb(1.0, 0.0, 0.0));
        let pixels = PixelMap::filled(10, 10, red);
        device.clear_calls();

        atlas.upload(&mut pages, &pixels);

        let texture = atlas.textures().handle(0);
        let calls = device.calls();
        assert!(calls.contains(&DeviceCall::Copy(
            atlas.staging_handle(),
            texture,
            vec![CopyRegion {
                src_origin: [0, 0],
                dst_origin: [0, 0],
                extent: [12, 12],
            }]
        )));
        assert_eq!(calls.last(), Some(&DeviceCall::WaitIdle));
        assert_eq!(atlas.staging_layout(), ImageLayout::TransferSrc);
        assert_eq!(atlas.textures().layout(0), ImageLayout::TransferDst);

        // Interior texel is opaque red; the border copy is red with zero alpha.
        let interior = device.pixel(texture, 1, 1);
        assert_eq!(interior, bytemuck::bytes_of(&red).to_vec());
        let border = device.pixel(texture, 0, 5);
        assert_eq!(border, bytemuck::bytes_of(&red.without_alpha()).to_vec());

        atlas.prepare_for_rendering();
        assert_eq!(atlas.textures().layout(0), ImageLayout::ShaderReadOnly);
    }

    #[test]
    fn test_upload_drops_transparent_pages_and_restores_them() {
        let (_, mut atlas) = atlas();
        let mut pages = atlas.allocate_pages(2);
        let free_before = atlas.free_page_count();

        let mut pixels = PixelMap::new(100, 10);
        pixels.set(5, 5, Rgba16f::from_color(Color::rgb(1.0, 1.0, 1.0)));
        atlas.upload(&mut pages, &pixels);
        assert!(!pages[0].is_transparent());
        assert!(pages[1].is_transparent());
        assert_eq!(atlas.free_page_count(), free_before + 1);

        pixels.set(90, 5, Rgba16f::from_color(Color::rgb(1.0, 1.0, 1.0)));
        atlas.upload(&mut pages, &pixels);
        assert!(!pages[1].is_transparent());
        assert_eq!(atlas.free_page_count(), free_before);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_upload_larger_than_staging_is_fatal() {
        let (_, mut atlas) = atlas();
        let mut pages = atlas.allocate_pages(page_extent([2048, 10]).iter().product::<u32>() as usize);
        atlas.upload(&mut pages, &PixelMap::new(2048, 10));
    }

    #[test]
    fn test_border_fill_uses_nearest_pixel() {
        let mut staged = PixelMap::new(4, 4);
        let a = Rgba16f::from_color(Color::rgb(1.0, 0.0, 0.0));
        let b = Rgba16f::from_color(Color::rgb(0.0, 1.0, 0.0));
        staged.set(1, 1, a);
        staged.set(2, 1, b);
        staged.set(1, 2, a);
        staged.set(2, 2, b);
        fill_transparent_border(&mut staged, 2, 2, 1);

        assert_eq!(staged.get(0, 0), a.without_alpha());
        assert_eq!(staged.get(3, 0), b.without_alpha());
        assert_eq!(staged.get(3, 3), b.without_alpha());
        assert_eq!(staged.get(0, 2), a.without_alpha());
        assert_eq!(staged.get(1, 1), a);
    }
}
