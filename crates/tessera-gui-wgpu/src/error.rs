use thiserror::Error;

/// Recoverable failures and startup errors of the rendering backend.
///
/// Resource exhaustion (atlas textures, vertices, staging space) is not represented here:
/// it indicates a caller bug and panics with a message naming the exhausted resource.
#[derive(Error, Debug)]
pub enum GpuError {
    /// The device was lost; rebuild with [`crate::Gfx::reset_device`] at the next frame.
    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    /// The presentation surface must be reconfigured; atlases survive.
    #[error("surface lost or outdated")]
    SurfaceLost,

    /// No frame became available in time. Skip this frame and try again.
    #[error("timed out acquiring the next frame")]
    FrameTimeout,

    #[error("failed to load shader `{label}`: {message}")]
    ShaderLoad { label: &'static str, message: String },

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

impl From<wgpu::SurfaceError> for GpuError {
    fn from(error: wgpu::SurfaceError) -> Self {
        match error {
            wgpu::SurfaceError::Timeout => GpuError::FrameTimeout,
            wgpu::SurfaceError::OutOfMemory => GpuError::DeviceLost(error.to_string()),
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Other => {
                GpuError::SurfaceLost
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, GpuError>;
