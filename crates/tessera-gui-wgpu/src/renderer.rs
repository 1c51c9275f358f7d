//! Per-frame flush of the vertex spans through the four pipelines.

use std::num::NonZeroU32;

use tessera_gui::Color;

use crate::constants::{MAX_ATLAS_TEXTURES, MAX_VERTICES};
use crate::device::TextureHandle;
use crate::draw_context::{DrawContext, FrameSpans};
use crate::error::{GpuError, Result};
use crate::gfx::Gfx;
use crate::quad_index::create_quad_index_buffer;
use crate::span::VertexSpan;
use crate::vertex::{BoxVertex, FlatVertex, ImageVertex, SdfVertex};
use crate::wgpu_device::WgpuDevice;

/// Runtime options of a [`Renderer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererConfig {
    pub surface_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    /// Color the target is cleared to; `None` draws over its current contents.
    pub clear_color: Option<Color>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            depth_format: wgpu::TextureFormat::Depth32Float,
            clear_color: Some(Color::BLACK),
        }
    }
}

/// Vertices drawn by each pipeline in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub flat_vertices: usize,
    pub box_vertices: usize,
    pub image_vertices: usize,
    pub sdf_vertices: usize,
}

impl FrameStats {
    pub fn total_vertices(&self) -> usize {
        self.flat_vertices + self.box_vertices + self.image_vertices + self.sdf_vertices
    }
}

/// The textures of one atlas bound as a texture array.
struct AtlasBinding {
    handles: Vec<TextureHandle>,
    bind_group: wgpu::BindGroup,
}

struct DepthTarget {
    size: [u32; 2],
    view: wgpu::TextureView,
}

/// Draws the frames of one window.
pub struct Renderer {
    gfx: Gfx<WgpuDevice>,
    device: WgpuDevice,
    config: RendererConfig,
    spans: FrameSpans,

    flat_pipeline: wgpu::RenderPipeline,
    box_pipeline: wgpu::RenderPipeline,
    image_pipeline: wgpu::RenderPipeline,
    sdf_pipeline: wgpu::RenderPipeline,

    flat_buffer: wgpu::Buffer,
    box_buffer: wgpu::Buffer,
    image_buffer: wgpu::Buffer,
    sdf_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,

    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    atlas_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    /// Bound in array slots no atlas texture occupies.
    placeholder: wgpu::TextureView,
    image_atlas: Option<AtlasBinding>,
    sdf_atlas: Option<AtlasBinding>,

    depth: Option<DepthTarget>,
}

impl Renderer {
    pub fn new(gfx: Gfx<WgpuDevice>, config: RendererConfig) -> Result<Self> {
        let device = gfx.device();
        device.check_lost()?;
        let wgpu_device = device.device();

        let flat_shader = load_shader(wgpu_device, "Tessera Flat Shader", include_str!("shaders/flat.wgsl"))?;
        let box_shader = load_shader(wgpu_device, "Tessera Box Shader", include_str!("shaders/box.wgsl"))?;
        let image_shader = load_shader(wgpu_device, "Tessera Image Shader", include_str!("shaders/image.wgsl"))?;
        let sdf_shader = load_shader(wgpu_device, "Tessera SDF Shader", include_str!("shaders/sdf.wgsl"))?;

        // Uniform buffer for screen size
        let uniform_buffer = wgpu_device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tessera Uniform Buffer"),
            size: std::mem::size_of::<[f32; 2]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            wgpu_device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Tessera Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = wgpu_device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tessera Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let atlas_bind_group_layout =
            wgpu_device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Tessera Atlas Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: NonZeroU32::new(MAX_ATLAS_TEXTURES as u32),
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let flat_layout = wgpu_device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Tessera Flat Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });
        let atlas_layout = wgpu_device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Tessera Atlas Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &atlas_bind_group_layout],
            push_constant_ranges: &[],
        });

        // Box and image fragments come out premultiplied; flat and SDF output straight alpha.
        let flat_pipeline = create_pipeline(
            wgpu_device,
            "Tessera Flat Pipeline",
            &flat_layout,
            &flat_shader,
            FlatVertex::desc(),
            wgpu::BlendState::ALPHA_BLENDING,
            &config,
        );
        let box_pipeline = create_pipeline(
            wgpu_device,
            "Tessera Box Pipeline",
            &flat_layout,
            &box_shader,
            BoxVertex::desc(),
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            &config,
        );
        let image_pipeline = create_pipeline(
            wgpu_device,
            "Tessera Image Pipeline",
            &atlas_layout,
            &image_shader,
            ImageVertex::desc(),
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            &config,
        );
        let sdf_pipeline = create_pipeline(
            wgpu_device,
            "Tessera SDF Pipeline",
            &atlas_layout,
            &sdf_shader,
            SdfVertex::desc(),
            wgpu::BlendState::ALPHA_BLENDING,
            &config,
        );

        let sampler = wgpu_device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Tessera Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder = wgpu_device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Tessera Placeholder Texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba16Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        log::info!("created renderer ({:?})", config.surface_format);

        Ok(Self {
            flat_buffer: create_vertex_buffer::<FlatVertex>(wgpu_device, "Tessera Flat Vertex Buffer"),
            box_buffer: create_vertex_buffer::<BoxVertex>(wgpu_device, "Tessera Box Vertex Buffer"),
            image_buffer: create_vertex_buffer::<ImageVertex>(wgpu_device, "Tessera Image Vertex Buffer"),
            sdf_buffer: create_vertex_buffer::<SdfVertex>(wgpu_device, "Tessera SDF Vertex Buffer"),
            index_buffer: create_quad_index_buffer(wgpu_device),
            flat_pipeline,
            box_pipeline,
            image_pipeline,
            sdf_pipeline,
            uniform_buffer,
            uniform_bind_group,
            atlas_bind_group_layout,
            sampler,
            placeholder,
            image_atlas: None,
            sdf_atlas: None,
            depth: None,
            spans: FrameSpans::new(),
            config,
            device: device.clone(),
            gfx,
        })
    }

    #[inline]
    pub fn gfx(&self) -> &Gfx<WgpuDevice> {
        &self.gfx
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Record a frame: run `draw` with a context covering `window_size` pixels, then draw
    /// everything it recorded into `target`.
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        window_size: [u32; 2],
        draw: impl FnOnce(&DrawContext<'_, WgpuDevice>),
    ) -> Result<FrameStats> {
        self.device.check_lost()?;
        if window_size[0] == 0 || window_size[1] == 0 {
            return Ok(FrameStats::default());
        }

        self.spans.clear();
        {
            let ctx = DrawContext::new(
                &self.gfx,
                &self.spans,
                [window_size[0] as f32, window_size[1] as f32],
            );
            draw(&ctx);
        }

        let (image_handles, sdf_handles) = {
            let mut shared = self.gfx.lock();
            shared.prepare_for_rendering();
            (shared.image_textures(), shared.sdf_textures())
        };
        self.device.check_lost()?;

        self.update_atlas_bindings(image_handles, sdf_handles);
        self.ensure_depth_target(window_size);

        let queue = self.device.queue();
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[window_size[0] as f32, window_size[1] as f32]),
        );
        write_span(queue, &self.flat_buffer, self.spans.flat.get_mut());
        write_span(queue, &self.box_buffer, self.spans.boxes.get_mut());
        write_span(queue, &self.image_buffer, self.spans.images.get_mut());
        write_span(queue, &self.sdf_buffer, self.spans.sdf.get_mut());

        let stats = FrameStats {
            flat_vertices: self.spans.flat.get_mut().len(),
            box_vertices: self.spans.boxes.get_mut().len(),
            image_vertices: self.spans.images.get_mut().len(),
            sdf_vertices: self.spans.sdf.get_mut().len(),
        };

        let load = match self.config.clear_color {
            Some(color) => wgpu::LoadOp::Clear(wgpu::Color {
                r: color.r as f64,
                g: color.g as f64,
                b: color.b as f64,
                a: color.a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };

        let Some(depth) = &self.depth else {
            return Ok(stats);
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Tessera Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

        draw_span(
            &mut render_pass,
            &self.flat_pipeline,
            &self.flat_buffer,
            None,
            self.spans.flat.get_mut(),
        );
        draw_span(
            &mut render_pass,
            &self.box_pipeline,
            &self.box_buffer,
            None,
            self.spans.boxes.get_mut(),
        );
        draw_span(
            &mut render_pass,
            &self.image_pipeline,
            &self.image_buffer,
            self.image_atlas.as_ref(),
            self.spans.images.get_mut(),
        );
        draw_span(
            &mut render_pass,
            &self.sdf_pipeline,
            &self.sdf_buffer,
            self.sdf_atlas.as_ref(),
            self.spans.sdf.get_mut(),
        );

        Ok(stats)
    }

    /// Continue on `device` after the previous one was lost.
    ///
    /// Rebuilds the atlases and every GPU resource of the renderer. Images must be uploaded
    /// again before they are drawn.
    pub fn recover(&mut self, device: WgpuDevice) -> Result<()> {
        log::info!("recovering renderer on a new device");
        self.gfx.reset_device(device);
        *self = Self::new(self.gfx.clone(), self.config)?;
        Ok(())
    }

    fn update_atlas_bindings(
        &mut self,
        image_handles: Vec<TextureHandle>,
        sdf_handles: Vec<TextureHandle>,
    ) {
        if self.image_atlas.as_ref().map(|b| &b.handles) != Some(&image_handles) {
            self.image_atlas = Some(self.create_atlas_binding("Tessera Image Atlas Bind Group", image_handles));
        }
        if self.sdf_atlas.as_ref().map(|b| &b.handles) != Some(&sdf_handles) {
            self.sdf_atlas = Some(self.create_atlas_binding("Tessera SDF Atlas Bind Group", sdf_handles));
        }
    }

    fn create_atlas_binding(&self, label: &'static str, handles: Vec<TextureHandle>) -> AtlasBinding {
        log::debug!("binding {} atlas textures to {label}", handles.len());

        let views: Vec<wgpu::TextureView> = handles
            .iter()
            .filter_map(|handle| self.device.create_view(*handle))
            .collect();
        // Unused slots repeat the first texture.
        let first = views.first().unwrap_or(&self.placeholder);
        let slots: Vec<&wgpu::TextureView> = (0..MAX_ATLAS_TEXTURES)
            .map(|i| views.get(i).unwrap_or(first))
            .collect();

        let bind_group = self
            .device
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.atlas_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureViewArray(&slots),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });

        AtlasBinding {
            handles,
            bind_group,
        }
    }

    fn ensure_depth_target(&mut self, size: [u32; 2]) {
        if self.depth.as_ref().is_some_and(|d| d.size == size) {
            return;
        }

        log::debug!("creating {}x{} depth target", size[0], size[1]);
        let texture = self.device.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("Tessera Depth Texture"),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.config.depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        self.depth = Some(DepthTarget {
            size,
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        });
    }
}

/// Acquire the next frame of `surface`.
///
/// A lost or outdated surface maps to [`GpuError::SurfaceLost`] and a timeout to
/// [`GpuError::FrameTimeout`]; neither touches the atlases.
pub fn acquire_frame(surface: &wgpu::Surface<'_>) -> Result<wgpu::SurfaceTexture> {
    Ok(surface.get_current_texture()?)
}

/// Compile WGSL inside a validation error scope.
fn load_shader(
    device: &wgpu::Device,
    label: &'static str,
    source: &'static str,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(GpuError::ShaderLoad {
            label,
            message: error.to_string(),
        });
    }
    Ok(module)
}

fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    buffer: wgpu::VertexBufferLayout<'static>,
    blend: wgpu::BlendState,
    config: &RendererConfig,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[buffer],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: config.surface_format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: config.depth_format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_vertex_buffer<T>(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: (MAX_VERTICES * std::mem::size_of::<T>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn write_span<T: bytemuck::Pod>(queue: &wgpu::Queue, buffer: &wgpu::Buffer, span: &VertexSpan<T>) {
    if !span.is_empty() {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(span.as_slice()));
    }
}

fn draw_span<T: Copy>(
    render_pass: &mut wgpu::RenderPass<'_>,
    pipeline: &wgpu::RenderPipeline,
    buffer: &wgpu::Buffer,
    atlas: Option<&AtlasBinding>,
    span: &VertexSpan<T>,
) {
    if span.is_empty() {
        return;
    }
    render_pass.set_pipeline(pipeline);
    if let Some(atlas) = atlas {
        render_pass.set_bind_group(1, &atlas.bind_group, &[]);
    }
    render_pass.set_vertex_buffer(0, buffer.slice(..));
    render_pass.draw_indexed(0..span.index_count(), 0, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RendererConfig::default();
        assert_eq!(config.depth_format, wgpu::TextureFormat::Depth32Float);
        assert_eq!(config.clear_color, Some(Color::BLACK));
    }

    #[test]
    fn test_frame_stats_total() {
        let stats = FrameStats {
            flat_vertices: 4,
            box_vertices: 8,
            image_vertices: 0,
            sdf_vertices: 12,
        };
        assert_eq!(stats.total_vertices(), 24);
        assert_eq!(FrameStats::default().total_vertices(), 0);
    }
}
