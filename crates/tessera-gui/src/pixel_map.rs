use bytemuck::{Pod, Zeroable};
use half::f16;

use crate::Color;

/// A 2D grid of pixels stored row by row.
///
/// Row 0 is the bottom row, matching the y-up coordinate convention used for
/// drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelMap<T> {
    width: usize,
    height: usize,
    pixels: Vec<T>,
}

impl<T: Copy + Default> PixelMap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }
}

impl<T: Copy> PixelMap<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
        }
    }

    /// Wrap existing row-major pixel data.
    ///
    /// # Panics
    ///
    /// Panics when `pixels.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixel data does not match a {width}x{height} map"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.pixels[y * self.width + x] = value;
    }

    pub fn row(&self, y: usize) -> &[T] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn fill(&mut self, value: T) {
        self.pixels.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.pixels
    }

    /// Copy `source` into this map with its bottom-left corner at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics when `source` does not fit.
    pub fn blit(&mut self, source: &PixelMap<T>, x: usize, y: usize) {
        assert!(
            x + source.width <= self.width && y + source.height <= self.height,
            "blit of {}x{} at ({x}, {y}) exceeds {}x{} pixel map",
            source.width,
            source.height,
            self.width,
            self.height
        );
        for row in 0..source.height {
            let dst_start = (y + row) * self.width + x;
            self.pixels[dst_start..dst_start + source.width].copy_from_slice(source.row(row));
        }
    }
}

impl<T: Pod> PixelMap<T> {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

/// A pixel of the image atlas: RGBA half-float, linear, pre-multiplied alpha.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Rgba16f(pub [f16; 4]);

impl Rgba16f {
    pub const TRANSPARENT: Self = Self([f16::ZERO; 4]);

    /// Pre-multiply and convert a linear color.
    pub fn from_color(color: Color) -> Self {
        let c = color.premultiplied();
        Self([
            f16::from_f32(c.r),
            f16::from_f32(c.g),
            f16::from_f32(c.b),
            f16::from_f32(c.a),
        ])
    }

    pub fn to_color(self) -> Color {
        let [r, g, b, a] = self.0;
        Color::new(r.to_f32(), g.to_f32(), b.to_f32(), a.to_f32())
    }

    #[inline]
    pub fn alpha(self) -> f32 {
        self.0[3].to_f32()
    }

    #[inline]
    pub fn is_transparent(self) -> bool {
        self.alpha() <= 0.0
    }

    /// Same color with alpha forced to zero.
    #[inline]
    pub fn without_alpha(self) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, f16::ZERO])
    }
}

impl From<Color> for Rgba16f {
    fn from(color: Color) -> Self {
        Self::from_color(color)
    }
}
