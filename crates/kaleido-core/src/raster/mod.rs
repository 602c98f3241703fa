//! 2D drawing surface abstraction.
//!
//! [`Canvas2d`] mirrors the subset of the HTML canvas 2D context the pattern
//! synthesizer and compositor use. The web front-end implements it over a
//! real `CanvasRenderingContext2d`; [`Raster`] implements it on tiny-skia for
//! tests and the native front-end.

mod pixmap;
mod soft;

pub use pixmap::Pixmap;
pub use soft::Raster;

use crate::color::Rgba;
use glam::Vec2;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Normal alpha compositing.
    #[default]
    SourceOver,
    /// Additive, saturating at white (`globalCompositeOperation = "lighter"`).
    Lighter,
}

/// Concentric radial gradient in user space.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialGradient {
    pub center: Vec2,
    pub r0: f32,
    pub r1: f32,
    stops: SmallVec<[(f32, Rgba); 4]>,
}

impl RadialGradient {
    pub fn new(center: Vec2, r0: f32, r1: f32) -> Self {
        Self {
            center,
            r0,
            r1,
            stops: SmallVec::new(),
        }
    }

    /// Add a color stop; offsets are clamped to \[0, 1\] and kept sorted.
    pub fn with_stop(mut self, offset: f32, color: Rgba) -> Self {
        let offset = offset.clamp(0.0, 1.0);
        let at = self.stops.iter().position(|(o, _)| *o > offset).unwrap_or(self.stops.len());
        self.stops.insert(at, (offset, color));
        self
    }

    /// Stops spread evenly from 0 to 1. A single color sits at offset 1.
    pub fn evenly(center: Vec2, r0: f32, r1: f32, colors: &[Rgba]) -> Self {
        let n = colors.len();
        colors.iter().enumerate().fold(Self::new(center, r0, r1), |g, (i, &c)| {
            let offset = if n == 1 { 1.0 } else { i as f32 / (n - 1) as f32 };
            g.with_stop(offset, c)
        })
    }

    pub fn stops(&self) -> &[(f32, Rgba)] {
        &self.stops
    }
}

/// The immediate-mode drawing operations patterns and the compositor need.
///
/// Path coordinates are transformed by the current transform when they are
/// added, as on a browser canvas. `fill` closes open subpaths implicitly and
/// uses the non-zero rule.
pub trait Canvas2d {
    /// What [`Canvas2d::draw_image`] can read from.
    type Image: ?Sized;

    fn size(&self) -> (f32, f32);

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f32, y: f32);
    fn rotate(&mut self, angle: f32);
    fn scale(&mut self, sx: f32, sy: f32);

    fn set_global_alpha(&mut self, alpha: f32);
    fn set_blend(&mut self, mode: BlendMode);
    fn set_fill_color(&mut self, color: Rgba);
    fn set_fill_radial(&mut self, gradient: &RadialGradient);
    /// Bloom hint. Backends without blur support ignore it.
    fn set_shadow(&mut self, blur: f32, color: Rgba);

    /// Clear the whole surface to transparent, ignoring the transform.
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32);
    fn bezier_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32);
    /// Clockwise arc from `start` to `end` radians.
    fn arc(&mut self, cx: f32, cy: f32, r: f32, start: f32, end: f32);
    fn close_path(&mut self);
    fn fill(&mut self);

    fn draw_image(&mut self, image: &Self::Image, x: f32, y: f32, w: f32, h: f32);
}
