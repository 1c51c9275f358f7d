//! [`GpuDevice`] on top of `wgpu`.
//!
//! `wgpu` tracks resource states itself, so layout transitions are only logged. Staging
//! textures are ordinary copy-source textures filled with `Queue::write_texture`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::device::{
    CopyRegion, GpuDevice, ImageLayout, TextureDesc, TextureFormat, TextureHandle, TextureRole,
};
use crate::error::{GpuError, Result};

/// Rows written per `write_texture` call when clearing.
const CLEAR_CHUNK_ROWS: u32 = 256;

struct DeviceTexture {
    texture: wgpu::Texture,
    desc: TextureDesc,
    /// Whether anything but the implicit zero-initialisation has touched the texture.
    written: bool,
}

struct Inner {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: Mutex<HashMap<TextureHandle, DeviceTexture>>,
    next_handle: AtomicU32,
    lost: Arc<AtomicBool>,
}

/// A `wgpu` device and queue shared by the atlases and the renderer.
#[derive(Clone)]
pub struct WgpuDevice {
    inner: Arc<Inner>,
}

impl WgpuDevice {
    /// Features the pipelines need: atlases are bound as texture arrays indexed per vertex.
    pub fn required_features() -> wgpu::Features {
        wgpu::Features::TEXTURE_BINDING_ARRAY
            | wgpu::Features::SAMPLED_TEXTURE_AND_STORAGE_BUFFER_ARRAY_NON_UNIFORM_INDEXING
    }

    pub fn required_limits() -> wgpu::Limits {
        wgpu::Limits {
            max_binding_array_elements_per_shader_stage: 2
                * crate::constants::MAX_ATLAS_TEXTURES as u32,
            ..wgpu::Limits::default()
        }
    }

    /// Request a device with the required features from `adapter`.
    pub async fn request(adapter: &wgpu::Adapter) -> Result<Self> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Tessera Device"),
                required_features: Self::required_features(),
                required_limits: Self::required_limits(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        Ok(Self::new(device, queue))
    }

    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::warn!("device lost ({reason:?}): {message}");
            flag.store(true, Ordering::Release);
        });

        Self {
            inner: Arc::new(Inner {
                device,
                queue,
                textures: Mutex::new(HashMap::new()),
                next_handle: AtomicU32::new(0),
                lost,
            }),
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.inner.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.inner.queue
    }

    /// A view of a texture created through this device, for binding.
    pub fn create_view(&self, texture: TextureHandle) -> Option<wgpu::TextureView> {
        self.textures()
            .get(&texture)
            .map(|t| t.texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    /// Fails with [`GpuError::DeviceLost`] once `wgpu` reported the device lost.
    pub fn check_lost(&self) -> Result<()> {
        if self.is_lost() {
            return Err(GpuError::DeviceLost("device lost callback fired".into()));
        }
        Ok(())
    }

    fn textures(&self) -> std::sync::MutexGuard<'_, HashMap<TextureHandle, DeviceTexture>> {
        self.inner
            .textures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_rows(
        &self,
        texture: &wgpu::Texture,
        format: TextureFormat,
        origin: [u32; 2],
        extent: [u32; 2],
        bytes: &[u8],
    ) {
        self.inner.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: origin[0],
                    y: origin[1],
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(extent[0] * format.bytes_per_pixel()),
                rows_per_image: Some(extent[1]),
            },
            wgpu::Extent3d {
                width: extent[0],
                height: extent[1],
                depth_or_array_layers: 1,
            },
        );
    }
}

fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::R8Snorm => wgpu::TextureFormat::R8Snorm,
    }
}

fn wgpu_usage(role: TextureRole) -> wgpu::TextureUsages {
    match role {
        TextureRole::Atlas => wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        TextureRole::Staging => wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
    }
}

impl GpuDevice for WgpuDevice {
    fn create_texture(&self, desc: &TextureDesc) -> TextureHandle {
        let texture = self.inner.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu_format(desc.format),
            usage: wgpu_usage(desc.role),
            view_formats: &[],
        });

        let handle = TextureHandle(self.inner.next_handle.fetch_add(1, Ordering::Relaxed));
        self.textures().insert(
            handle,
            DeviceTexture {
                texture,
                desc: *desc,
                written: false,
            },
        );
        handle
    }

    fn destroy_texture(&self, texture: TextureHandle) {
        if let Some(entry) = self.textures().remove(&texture) {
            entry.texture.destroy();
        }
    }

    fn clear_texture(&self, texture: TextureHandle, value: [f32; 4]) {
        let mut textures = self.textures();
        let Some(entry) = textures.get_mut(&texture) else {
            log::warn!("clear of unknown texture {texture:?}");
            return;
        };

        let pixel = entry.desc.format.encode_pixel(value);
        // New textures are zero-initialised by wgpu.
        if !entry.written && pixel.iter().all(|b| *b == 0) {
            return;
        }

        let width = entry.desc.width;
        let height = entry.desc.height;
        let rows = CLEAR_CHUNK_ROWS.min(height);
        let chunk = pixel.repeat((width * rows) as usize);
        let mut y = 0;
        while y < height {
            let count = rows.min(height - y);
            let bytes = &chunk[..(width * count) as usize * pixel.len()];
            self.write_rows(&entry.texture, entry.desc.format, [0, y], [width, count], bytes);
            y += count;
        }
        entry.written = true;
    }

    fn transition(&self, texture: TextureHandle, from: ImageLayout, to: ImageLayout) {
        // wgpu inserts barriers itself.
        log::trace!("transition {texture:?}: {from:?} -> {to:?}");
    }

    fn write_texture(&self, texture: TextureHandle, origin: [u32; 2], extent: [u32; 2], bytes: &[u8]) {
        let mut textures = self.textures();
        let Some(entry) = textures.get_mut(&texture) else {
            log::warn!("write to unknown texture {texture:?}");
            return;
        };
        self.write_rows(&entry.texture, entry.desc.format, origin, extent, bytes);
        entry.written = true;
    }

    fn copy_regions(&self, src: TextureHandle, dst: TextureHandle, regions: &[CopyRegion]) {
        let mut textures = self.textures();
        let (Some(source), Some(target)) = (textures.get(&src), textures.get(&dst)) else {
            log::warn!("copy between unknown textures {src:?} -> {dst:?}");
            return;
        };

        let mut encoder = self
            .inner
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Tessera Atlas Copy Encoder"),
            });
        for region in regions {
            encoder.copy_texture_to_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &source.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: region.src_origin[0],
                        y: region.src_origin[1],
                        z: 0,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &target.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: region.dst_origin[0],
                        y: region.dst_origin[1],
                        z: 0,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::Extent3d {
                    width: region.extent[0],
                    height: region.extent[1],
                    depth_or_array_layers: 1,
                },
            );
        }
        self.inner.queue.submit(std::iter::once(encoder.finish()));

        if let Some(target) = textures.get_mut(&dst) {
            target.written = true;
        }
    }

    fn wait_idle(&self) {
        if let Err(error) = self.inner.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        }) {
            log::warn!("waiting for the GPU failed: {error}");
        }
    }

    fn is_lost(&self) -> bool {
        self.inner.lost.load(Ordering::Acquire)
    }
}
