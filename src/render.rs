//! Drawing surface abstraction and a software raster implementation.
//!
//! The simulation never talks to a windowing system. It issues four
//! primitive calls against a [`RenderTarget`]; hosts adapt those to whatever
//! they draw with. [`PixelBuffer`] is the built-in target: a plain RGBA8
//! canvas with source-over blending.

use serde::Deserialize;

use crate::error::SketchError;
use crate::vector::Vector2D;

/// Straight (non-premultiplied) RGBA with components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb8(0, 0, 0);
    pub const WHITE: Self = Self::rgb8(255, 255, 255);

    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Result<Self, SketchError> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || SketchError::InvalidColor(hex.to_string());

        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return Err(invalid());
        }

        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map(|c| c as f32 / 255.0)
                .map_err(|_| invalid())
        };

        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if digits.len() == 8 { channel(6)? } else { 1.0 },
        })
    }

    /// Same color with its alpha replaced.
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: alpha.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

impl TryFrom<String> for Color {
    type Error = SketchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// The four drawing primitives the simulation needs.
pub trait RenderTarget {
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);
    fn fill_circle(&mut self, center: Vector2D, radius: f32, color: Color);
    fn stroke_line(&mut self, from: Vector2D, to: Vector2D, color: Color, width: f32);
}

/// How a field paints itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderStyle {
    /// Clears and fills the field bounds first when set.
    pub background: Option<Color>,
    pub foreground: Color,
    /// Paints a background-colored disc under every body so edges do not show through.
    pub halo: bool,
    pub line_width: f32,
}

/// Software RGBA8 canvas, row-major, top-left origin.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resizes and clears to transparent.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width * height * 4, 0);
    }

    /// Raw RGBA8 bytes, unpremultiplied.
    pub fn as_rgba(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Clipped integer pixel span covering `[lo, hi)`.
    fn span(lo: f32, hi: f32, len: usize) -> std::ops::Range<usize> {
        let start = lo.floor().max(0.0) as usize;
        let end = (hi.ceil().max(0.0) as usize).min(len);
        start.min(end)..end
    }

    fn blend(&mut self, x: usize, y: usize, color: Color) {
        let i = (y * self.width + x) * 4;
        let src_a = color.a.clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }

        let dst = &mut self.data[i..i + 4];
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);

        let mix = |src: f32, dst: u8| {
            let dst = dst as f32 / 255.0;
            let c = (src * src_a + dst * dst_a * (1.0 - src_a)) / out_a;
            (c.clamp(0.0, 1.0) * 255.0).round() as u8
        };

        dst[0] = mix(color.r, dst[0]);
        dst[1] = mix(color.g, dst[1]);
        dst[2] = mix(color.b, dst[2]);
        dst[3] = (out_a.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

impl RenderTarget for PixelBuffer {
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        for py in Self::span(y, y + height, self.height) {
            for px in Self::span(x, x + width, self.width) {
                let i = (py * self.width + px) * 4;
                self.data[i..i + 4].fill(0);
            }
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        for py in Self::span(y, y + height, self.height) {
            for px in Self::span(x, x + width, self.width) {
                self.blend(px, py, color);
            }
        }
    }

    fn fill_circle(&mut self, center: Vector2D, radius: f32, color: Color) {
        if radius <= 0.0 {
            return;
        }
        let radius_sq = radius * radius;

        for py in Self::span(center.y - radius, center.y + radius, self.height) {
            for px in Self::span(center.x - radius, center.x + radius, self.width) {
                let sample = Vector2D::new(px as f32 + 0.5, py as f32 + 0.5);
                if sample.distance_squared(center) <= radius_sq {
                    self.blend(px, py, color);
                }
            }
        }
    }

    fn stroke_line(&mut self, from: Vector2D, to: Vector2D, color: Color, width: f32) {
        let half = (width * 0.5).max(0.5);
        let segment = from.offset_to(to);
        let length_sq = segment.magnitude_squared();

        let ys = Self::span(from.y.min(to.y) - half, from.y.max(to.y) + half, self.height);
        let xs = Self::span(from.x.min(to.x) - half, from.x.max(to.x) + half, self.width);

        for py in ys {
            for px in xs.clone() {
                let sample = Vector2D::new(px as f32 + 0.5, py as f32 + 0.5);
                let along = from.offset_to(sample);
                let t = if length_sq > 0.0 {
                    ((along.x * segment.x + along.y * segment.y) / length_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let closest = Vector2D::new(from.x + segment.x * t, from.y + segment.y * t);
                if sample.distance_squared(closest) <= half * half {
                    self.blend(px, py, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        let c = Color::from_hex("#408697").unwrap();
        assert_eq!(c.to_rgba8(), [0x40, 0x86, 0x97, 0xff]);

        let c = Color::from_hex("f6f6f680").unwrap();
        assert_eq!(c.to_rgba8(), [0xf6, 0xf6, 0xf6, 0x80]);
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["", "#12345", "#gggggg", "#1234567", "#ééé"] {
            assert!(matches!(Color::from_hex(bad), Err(SketchError::InvalidColor(_))), "{bad}");
        }
    }

    #[test]
    fn opaque_fill_overwrites() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.fill_rect(0.0, 0.0, 4.0, 4.0, Color::rgb8(10, 20, 30));
        buf.fill_rect(1.0, 1.0, 1.0, 1.0, Color::WHITE);

        assert_eq!(buf.pixel(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(buf.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(buf.pixel(4, 0), None);
    }

    #[test]
    fn translucent_fill_blends_over_opaque() {
        let mut buf = PixelBuffer::new(1, 1);
        buf.fill_rect(0.0, 0.0, 1.0, 1.0, Color::BLACK);
        buf.fill_rect(0.0, 0.0, 1.0, 1.0, Color::WHITE.with_alpha(0.5));

        let [r, g, b, a] = buf.pixel(0, 0).unwrap();
        assert_eq!(a, 255);
        assert!((127..=128).contains(&r) && r == g && g == b);
    }

    #[test]
    fn clear_resets_to_transparent() {
        let mut buf = PixelBuffer::new(2, 2);
        buf.fill_rect(0.0, 0.0, 2.0, 2.0, Color::WHITE);
        buf.clear_rect(0.0, 0.0, 1.0, 2.0);

        assert_eq!(buf.pixel(0, 1), Some([0, 0, 0, 0]));
        assert_eq!(buf.pixel(1, 1), Some([255, 255, 255, 255]));
    }

    #[test]
    fn circle_covers_center_not_corners() {
        let mut buf = PixelBuffer::new(10, 10);
        buf.fill_circle(Vector2D::new(5.0, 5.0), 3.0, Color::WHITE);

        assert_eq!(buf.pixel(5, 5), Some([255, 255, 255, 255]));
        assert_eq!(buf.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(buf.pixel(9, 9), Some([0, 0, 0, 0]));
    }

    #[test]
    fn line_touches_its_endpoints_only_along_path() {
        let mut buf = PixelBuffer::new(10, 3);
        buf.stroke_line(Vector2D::new(0.5, 1.5), Vector2D::new(9.5, 1.5), Color::WHITE, 1.0);

        for x in 0..10 {
            assert_eq!(buf.pixel(x, 1), Some([255, 255, 255, 255]));
            assert_eq!(buf.pixel(x, 0), Some([0, 0, 0, 0]));
        }
    }

    #[test]
    fn zero_sized_buffer_ignores_draws() {
        let mut buf = PixelBuffer::new(0, 0);
        buf.fill_rect(0.0, 0.0, 10.0, 10.0, Color::WHITE);
        buf.fill_circle(Vector2D::new(1.0, 1.0), 4.0, Color::WHITE);
        buf.stroke_line(Vector2D::ZERO, Vector2D::new(5.0, 5.0), Color::WHITE, 2.0);
        assert!(buf.as_rgba().is_empty());
    }
}
