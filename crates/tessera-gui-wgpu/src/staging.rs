use bytemuck::Pod;
use tessera_gui::PixelMap;

use crate::device::{GpuDevice, ImageLayout, TextureDesc, TextureFormat, TextureRole, TrackedTexture};

/// CPU-writable scratch texture used to prepare pixels before copying them into an atlas.
///
/// The CPU side is a [`PixelMap`] mirror of the texture. A transfer is:
/// 1. [`Staging::prepare_write`] moves the texture to `General` and hands out the mirror.
/// 2. [`Staging::flush`] writes the touched rows to the GPU and moves it to `TransferSrc`.
/// 3. The caller copies regions out of [`Staging::handle`].
pub struct Staging<T> {
    texture: TrackedTexture,
    pixels: PixelMap<T>,
}

impl<T: Pod + Default> Staging<T> {
    pub fn new<D: GpuDevice>(
        device: &D,
        label: &'static str,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        debug_assert_eq!(format.bytes_per_pixel() as usize, std::mem::size_of::<T>());
        let texture = TrackedTexture::create(
            device,
            TextureDesc {
                label,
                width,
                height,
                format,
                role: TextureRole::Staging,
            },
        );
        Self {
            texture,
            pixels: PixelMap::new(width as usize, height as usize),
        }
    }

    #[inline]
    pub fn handle(&self) -> crate::device::TextureHandle {
        self.texture.handle
    }

    #[inline]
    pub fn layout(&self) -> ImageLayout {
        self.texture.layout()
    }

    pub fn width(&self) -> u32 {
        self.texture.desc.width
    }

    pub fn height(&self) -> u32 {
        self.texture.desc.height
    }

    /// Make the staging texture CPU-writable and return its pixels.
    pub fn prepare_write<D: GpuDevice>(&mut self, device: &D) -> &mut PixelMap<T> {
        self.texture.transition(device, ImageLayout::General);
        &mut self.pixels
    }

    /// Upload the bottom `rows` rows and make the texture a copy source.
    pub fn flush<D: GpuDevice>(&mut self, device: &D, rows: u32) {
        let rows = rows.min(self.height());
        if rows > 0 {
            let width = self.width() as usize;
            let bytes = bytemuck::cast_slice(&self.pixels.as_slice()[..width * rows as usize]);
            device.write_texture(self.texture.handle, [0, 0], [self.width(), rows], bytes);
        }
        self.texture.transition(device, ImageLayout::TransferSrc);
    }

    pub fn destroy<D: GpuDevice>(&self, device: &D) {
        device.destroy_texture(self.texture.handle);
    }
}
