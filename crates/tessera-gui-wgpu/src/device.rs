//! The graphics collaborator the atlases are written against.
//!
//! Atlas and staging code never touch `wgpu` directly; they talk to a [`GpuDevice`]. The
//! production implementation is [`crate::WgpuDevice`]; tests use a recording device.

/// Opaque handle of a texture created through a [`GpuDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Element formats used by atlases and their staging textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Linear half-float RGBA, pre-multiplied alpha (image atlas).
    Rgba16Float,
    /// Signed normalized single channel (SDF atlas).
    R8Snorm,
}

impl TextureFormat {
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba16Float => 8,
            Self::R8Snorm => 1,
        }
    }

    /// Bytes of a single pixel holding `value`; channels the format lacks are dropped.
    pub fn encode_pixel(self, value: [f32; 4]) -> Vec<u8> {
        match self {
            Self::Rgba16Float => value
                .iter()
                .flat_map(|c| half::f16::from_f32(*c).to_le_bytes())
                .collect(),
            Self::R8Snorm => vec![tessera_gui_text::encode_snorm8(value[0]) as u8],
        }
    }
}

/// What a texture is used for; selects usage flags and memory placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureRole {
    /// Device-local, sampled by shaders and written by copies.
    Atlas,
    /// CPU-writable, source of copies into atlases.
    Staging,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub role: TextureRole,
}

/// Host-side record of how a texture is currently laid out for the GPU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    #[default]
    Undefined,
    /// CPU writable.
    General,
    TransferSrc,
    TransferDst,
    ShaderReadOnly,
}

/// One rectangle of a multi-region texture copy, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyRegion {
    pub src_origin: [u32; 2],
    pub dst_origin: [u32; 2],
    pub extent: [u32; 2],
}

/// Low-level operations the atlases require from the graphics device.
///
/// All operations are synchronous from the caller's point of view once followed by
/// [`GpuDevice::wait_idle`]. Handles are cheap to clone and shared by every atlas of a
/// device.
pub trait GpuDevice: Clone + Send + 'static {
    fn create_texture(&self, desc: &TextureDesc) -> TextureHandle;

    fn destroy_texture(&self, texture: TextureHandle);

    /// Fill the whole texture with `value`; channels the format lacks are ignored.
    fn clear_texture(&self, texture: TextureHandle, value: [f32; 4]);

    /// Image barrier moving `texture` from layout `from` to layout `to`.
    fn transition(&self, texture: TextureHandle, from: ImageLayout, to: ImageLayout);

    /// Write tightly packed rows of pixels at `origin`.
    fn write_texture(&self, texture: TextureHandle, origin: [u32; 2], extent: [u32; 2], bytes: &[u8]);

    /// Copy every region from `src` to `dst` in one single-time command buffer and submit it.
    fn copy_regions(&self, src: TextureHandle, dst: TextureHandle, regions: &[CopyRegion]);

    /// Block until the graphics queue is idle.
    fn wait_idle(&self);

    /// Whether the device reported itself lost.
    fn is_lost(&self) -> bool {
        false
    }
}

/// A texture plus the layout it was last transitioned to.
#[derive(Debug)]
pub struct TrackedTexture {
    pub handle: TextureHandle,
    pub desc: TextureDesc,
    layout: ImageLayout,
}

impl TrackedTexture {
    pub fn create<D: GpuDevice>(device: &D, desc: TextureDesc) -> Self {
        let handle = device.create_texture(&desc);
        log::debug!(
            "created {} texture {:?} ({}x{} {:?})",
            desc.label,
            handle,
            desc.width,
            desc.height,
            desc.format
        );
        Self {
            handle,
            desc,
            layout: ImageLayout::Undefined,
        }
    }

    #[inline]
    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    /// Issue a barrier to `layout` unless the texture is already in it.
    pub fn transition<D: GpuDevice>(&mut self, device: &D, layout: ImageLayout) {
        if self.layout != layout {
            log::trace!(
                "{} {:?}: {:?} -> {:?}",
                self.desc.label,
                self.handle,
                self.layout,
                layout
            );
            device.transition(self.handle, self.layout, layout);
            self.layout = layout;
        }
    }

    pub fn destroy<D: GpuDevice>(self, device: &D) {
        device.destroy_texture(self.handle);
    }
}
