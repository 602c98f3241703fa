use crate::color::Rgba;
use crate::error::RasterError;
use tiny_skia::{Color, PremultipliedColorU8};

/// Premultiplied RGBA8 image, row-major, top-left origin. Channel accessors
/// work in floats in \[0, 1\].
#[derive(Clone, Debug, PartialEq)]
pub struct Pixmap {
    inner: tiny_skia::Pixmap,
}

impl Pixmap {
    /// Both sides must be non-zero.
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        tiny_skia::Pixmap::new(width, height)
            .map(|inner| Self { inner })
            .ok_or(RasterError::Surface { width, height })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Reallocate at a new size, discarding contents. Same size is a no-op.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RasterError> {
        if (width, height) != (self.width(), self.height()) {
            *self = Self::new(width, height)?;
        }
        Ok(())
    }

    pub fn fill(&mut self, color: Rgba) {
        self.inner.fill(to_skia(color));
    }

    pub fn clear(&mut self) {
        self.inner.fill(Color::TRANSPARENT);
    }

    /// Premultiplied channels of one pixel; transparent outside the image.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.inner.pixel(x, y).map_or([0.0; 4], unit)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, premultiplied: [f32; 4]) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        let i = (y * self.width() + x) as usize;
        let [r, g, b, a] = premultiplied.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        self.inner.pixels_mut()[i] = PremultipliedColorU8::from_rgba(r.min(a), g.min(a), b.min(a), a)
            .unwrap_or(PremultipliedColorU8::TRANSPARENT);
    }

    pub fn pixels(&self) -> impl ExactSizeIterator<Item = [f32; 4]> + '_ {
        self.inner.pixels().iter().map(|&p| unit(p))
    }

    /// Straight-alpha color of one pixel.
    pub fn color(&self, x: u32, y: u32) -> Rgba {
        let [r, g, b, a] = self.pixel(x, y);
        if a > 0.0 {
            Rgba::new(r / a, g / a, b / a, a)
        } else {
            Rgba::TRANSPARENT
        }
    }

    /// Bilinear sample at continuous pixel coordinates (pixel centers at
    /// `i + 0.5`), clamped to the edge. This is the texture lookup of the
    /// mirror shader, not a drawing operation.
    pub fn sample(&self, x: f32, y: f32) -> [f32; 4] {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let cx = |v: f32| (v as i64).clamp(0, self.width() as i64 - 1) as u32;
        let cy = |v: f32| (v as i64).clamp(0, self.height() as i64 - 1) as u32;
        let (xa, xb) = (cx(x0), cx(x0 + 1.0));
        let (ya, yb) = (cy(y0), cy(y0 + 1.0));
        let p00 = self.pixel(xa, ya);
        let p10 = self.pixel(xb, ya);
        let p01 = self.pixel(xa, yb);
        let p11 = self.pixel(xb, yb);
        std::array::from_fn(|i| {
            let top = p00[i] + (p10[i] - p00[i]) * tx;
            let bottom = p01[i] + (p11[i] - p01[i]) * tx;
            top + (bottom - top) * ty
        })
    }

    /// Straight-alpha RGBA8, the layout textures and PNG encoders take.
    pub fn write_rgba8(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.inner.data().len());
        for p in self.inner.pixels() {
            let c = p.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_rgba8(&mut out);
        out
    }

    pub(super) fn as_skia(&self) -> tiny_skia::PixmapRef<'_> {
        self.inner.as_ref()
    }

    pub(super) fn skia_mut(&mut self) -> &mut tiny_skia::Pixmap {
        &mut self.inner
    }
}

#[inline]
fn unit(p: PremultipliedColorU8) -> [f32; 4] {
    [p.red(), p.green(), p.blue(), p.alpha()].map(|c| c as f32 / 255.0)
}

/// Straight-alpha color for tiny-skia paints. Channels are clamped; NaN
/// becomes transparent.
pub(super) fn to_skia(color: Rgba) -> Color {
    let c = |v: f32| v.clamp(0.0, 1.0);
    Color::from_rgba(c(color.r), c(color.g), c(color.b), c(color.a)).unwrap_or(Color::TRANSPARENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_surface_is_an_error() {
        assert_eq!(
            Pixmap::new(0, 4),
            Err(RasterError::Surface { width: 0, height: 4 })
        );
    }

    #[test]
    fn rgba8_export_is_straight_alpha() {
        let mut p = Pixmap::new(1, 1).unwrap();
        p.fill(Rgba::new(1.0, 0.0, 0.0, 0.5));
        let out = p.to_rgba8();
        assert_eq!(out[0], 255);
        assert!((out[3] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn set_pixel_keeps_color_within_alpha() {
        let mut p = Pixmap::new(2, 2).unwrap();
        p.set_pixel(1, 1, [0.9, 0.2, 0.0, 0.5]);
        let px = p.pixel(1, 1);
        assert!(px[0] <= px[3]);
        p.set_pixel(5, 5, [1.0; 4]);
        assert_eq!(p.pixel(5, 5), [0.0; 4]);
    }
}
