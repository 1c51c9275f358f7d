//! Test doubles: a device that records every call and a font with square glyphs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tessera_gui::{Color, FontId, GeneralCategory, GlyphFingerprint, Rect, ShapedGlyph, ShapedText};
use tessera_gui_text::{GlyphOutline, GlyphOutlines, GlyphPath};

use crate::device::{CopyRegion, GpuDevice, ImageLayout, TextureDesc, TextureHandle};

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceCall {
    CreateTexture(TextureHandle, TextureDesc),
    DestroyTexture(TextureHandle),
    Clear(TextureHandle),
    Transition(TextureHandle, ImageLayout, ImageLayout),
    Write(TextureHandle, [u32; 2], [u32; 2]),
    Copy(TextureHandle, TextureHandle, Vec<CopyRegion>),
    WaitIdle,
}

/// Sparse texture contents: pixels never written read back as the clear value.
struct StoredTexture {
    desc: TextureDesc,
    fill: Vec<u8>,
    pixels: HashMap<(u32, u32), Vec<u8>>,
}

impl StoredTexture {
    fn pixel(&self, x: u32, y: u32) -> Vec<u8> {
        self.pixels
            .get(&(x, y))
            .cloned()
            .unwrap_or_else(|| self.fill.clone())
    }
}

#[derive(Default)]
struct Recording {
    next_handle: u32,
    calls: Vec<DeviceCall>,
    textures: HashMap<TextureHandle, StoredTexture>,
}

#[derive(Clone, Default)]
pub struct RecordingDevice {
    state: Arc<Mutex<Recording>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn live_textures(&self) -> usize {
        self.state.lock().unwrap().textures.len()
    }

    pub fn transitions_of(&self, texture: TextureHandle) -> Vec<(ImageLayout, ImageLayout)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::Transition(t, from, to) if t == texture => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    /// Raw bytes of one pixel.
    pub fn pixel(&self, texture: TextureHandle, x: u32, y: u32) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        state.textures[&texture].pixel(x, y)
    }
}

impl GpuDevice for RecordingDevice {
    fn create_texture(&self, desc: &TextureDesc) -> TextureHandle {
        let mut state = self.state.lock().unwrap();
        let handle = TextureHandle(state.next_handle);
        state.next_handle += 1;
        state.calls.push(DeviceCall::CreateTexture(handle, *desc));
        state.textures.insert(
            handle,
            StoredTexture {
                desc: *desc,
                fill: vec![0; desc.format.bytes_per_pixel() as usize],
                pixels: HashMap::new(),
            },
        );
        handle
    }

    fn destroy_texture(&self, texture: TextureHandle) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DeviceCall::DestroyTexture(texture));
        state.textures.remove(&texture);
    }

    fn clear_texture(&self, texture: TextureHandle, value: [f32; 4]) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DeviceCall::Clear(texture));
        let stored = state.textures.get_mut(&texture).unwrap();
        stored.fill = stored.desc.format.encode_pixel(value);
        stored.pixels.clear();
    }

    fn transition(&self, texture: TextureHandle, from: ImageLayout, to: ImageLayout) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DeviceCall::Transition(texture, from, to));
    }

    fn write_texture(&self, texture: TextureHandle, origin: [u32; 2], extent: [u32; 2], bytes: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DeviceCall::Write(texture, origin, extent));
        let stored = state.textures.get_mut(&texture).unwrap();
        let bpp = stored.desc.format.bytes_per_pixel() as usize;
        assert_eq!(bytes.len(), (extent[0] * extent[1]) as usize * bpp);
        assert!(origin[0] + extent[0] <= stored.desc.width);
        assert!(origin[1] + extent[1] <= stored.desc.height);
        for y in 0..extent[1] {
            for x in 0..extent[0] {
                let i = ((y * extent[0] + x) as usize) * bpp;
                stored
                    .pixels
                    .insert((origin[0] + x, origin[1] + y), bytes[i..i + bpp].to_vec());
            }
        }
    }

    fn copy_regions(&self, src: TextureHandle, dst: TextureHandle, regions: &[CopyRegion]) {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(DeviceCall::Copy(src, dst, regions.to_vec()));
        let mut copied = Vec::new();
        {
            let source = &state.textures[&src];
            for region in regions {
                assert!(region.src_origin[0] + region.extent[0] <= source.desc.width);
                assert!(region.src_origin[1] + region.extent[1] <= source.desc.height);
                for y in 0..region.extent[1] {
                    for x in 0..region.extent[0] {
                        copied.push((
                            (region.dst_origin[0] + x, region.dst_origin[1] + y),
                            source.pixel(region.src_origin[0] + x, region.src_origin[1] + y),
                        ));
                    }
                }
            }
        }
        let target = state.textures.get_mut(&dst).unwrap();
        for ((x, y), pixel) in copied {
            assert!(x < target.desc.width && y < target.desc.height);
            target.pixels.insert((x, y), pixel);
        }
    }

    fn wait_idle(&self) {
        self.state.lock().unwrap().calls.push(DeviceCall::WaitIdle);
    }
}

/// Every glyph id except 0 is a square covering x ∈ [0.1, 0.6], y ∈ [0.0, 0.7] EM.
/// Glyph 0 has no outline.
#[derive(Clone, Default)]
pub struct SquareOutlines {
    pub requests: Arc<Mutex<Vec<GlyphFingerprint>>>,
}

impl SquareOutlines {
    pub const BOUNDS: Rect = Rect::new([0.1, 0.0], [0.6, 0.7]);

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl GlyphOutlines for SquareOutlines {
    fn glyph_outline(&mut self, glyph: GlyphFingerprint) -> GlyphOutline {
        self.requests.lock().unwrap().push(glyph);
        if glyph.glyph_id == 0 {
            return GlyphOutline::empty();
        }
        GlyphOutline::new(GlyphPath::rectangle(Self::BOUNDS))
    }
}

/// Shape `text` as one glyph per character, `advance` pixels apart, glyph id = code point.
pub fn shape_monospace(text: &str, font_size: f32, advance: f32) -> ShapedText {
    let glyphs: Vec<ShapedGlyph> = text
        .chars()
        .enumerate()
        .map(|(i, c)| ShapedGlyph {
            fingerprint: GlyphFingerprint::new(FontId(1), c as u32),
            position: [i as f32 * advance, 0.0],
            font_size,
            bounding_box: if c == ' ' {
                Rect::new([0.0, 0.0], [0.0, 0.0])
            } else {
                SquareOutlines::BOUNDS
            },
            color: Color::rgb(1.0, 1.0, 1.0),
            category: GeneralCategory::of(c),
        })
        .collect();
    ShapedText {
        width: glyphs.len() as f32 * advance,
        height: font_size * 1.2,
        glyphs,
    }
}

/// Route log output of the code under test through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
