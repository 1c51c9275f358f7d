//! Headless tessera demo
//!
//! Renders one frame with boxes, an image and a line of text into an offscreen texture and
//! logs what was drawn.

use std::sync::{Arc, Mutex, PoisonError};

use tessera_gui::{Color, CornerRadii, PixelMap, Quad, Rect, Rgba16f, Transform};
use tessera_gui_wgpu::{
    CosmicEngine, FrameStats, Gfx, GpuDevice, GpuError, Renderer, RendererConfig, Result,
    WgpuDevice,
};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

/// A premultiplied color ramp with a transparent top-right page.
fn gradient(width: usize, height: usize) -> PixelMap<Rgba16f> {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let color = if x >= 64 && y >= 64 {
                Color::transparent()
            } else {
                Color::new(
                    x as f32 / width as f32,
                    y as f32 / height as f32,
                    0.5,
                    1.0,
                )
            };
            pixels.push(Rgba16f::from_color(color.premultiplied()));
        }
    }
    PixelMap::from_vec(width, height, pixels)
}

async fn run() -> Result<FrameStats> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

    // Request adapter
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|error| {
            log::warn!("no adapter: {error}");
            GpuError::NoAdapter
        })?;

    log::info!("✓ Using GPU: {}", adapter.get_info().name);

    let device = WgpuDevice::request(&adapter).await?;

    // The shaper and the glyph cache share one font engine.
    let fonts = Arc::new(Mutex::new(CosmicEngine::new()));
    let gfx = Gfx::new(device.clone(), Arc::clone(&fonts));

    let config = RendererConfig {
        surface_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        clear_color: Some(Color::from_srgba(30, 30, 46, 255)),
        ..Default::default()
    };
    let mut renderer = Renderer::new(gfx.clone(), config)?;

    let target = device.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("Demo Target"),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: config.surface_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let image = gfx.make_image_with_pixels(&gradient(150, 100));
    let title = fonts
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .shape_line("Hello, tessera", 32.0, Color::WHITE);

    let mut encoder = device
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Demo Encoder"),
        });

    let stats = renderer.render(&mut encoder, &view, [WIDTH, HEIGHT], |ctx| {
        ctx.draw_filled_quad(
            &Quad::from_rect(&Rect::new([0.0, 0.0], [WIDTH as f32, 80.0]), 0.0),
            Color::from_srgba(49, 50, 68, 255),
        );
        ctx.draw_box(
            Rect::new([40.0, 120.0], [340.0, 280.0]),
            Color::from_srgba(137, 180, 250, 255),
            Color::WHITE,
            2.0,
            CornerRadii::uniform(12.0),
        );
        ctx.draw_box_with_border_inside(
            Rect::new([380.0, 120.0], [680.0, 280.0]),
            Color::from_srgba(166, 227, 161, 255),
            Color::BLACK,
            4.0,
            CornerRadii::new(-16.0, 16.0, 16.0, -16.0),
        );

        let to_window = Transform::translate(60.0, 320.0, 1.0);
        let picture = ctx.make_child_context(
            to_window.inverse(),
            to_window,
            Rect::new([0.0, 0.0], [150.0, 100.0]),
        );
        picture.draw_image(&image);

        let to_window = Transform::translate(40.0, 480.0, 2.0);
        let caption = ctx.make_child_context(
            to_window.inverse(),
            to_window,
            Rect::new([0.0, -10.0], [title.width, title.height]),
        );
        caption.draw_text(&title, None);
    })?;

    device.queue().submit(std::iter::once(encoder.finish()));
    device.wait_idle();
    Ok(stats)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Rendering tessera demo frame...");

    match pollster::block_on(run()) {
        Ok(stats) => log::info!(
            "✓ Frame rendered: {} flat, {} box, {} image, {} sdf vertices ({} total)",
            stats.flat_vertices,
            stats.box_vertices,
            stats.image_vertices,
            stats.sdf_vertices,
            stats.total_vertices()
        ),
        Err(error) => {
            log::error!("{error}");
            std::process::exit(1);
        }
    }
}
