//! N-fold mirrored wedge compositing of a pattern stamp.

use crate::color::Rgba;
use crate::constants::*;
use crate::error::RasterError;
use crate::params::{Palette, StyleMode};
use crate::pattern::synthesize;
use crate::raster::{BlendMode, Canvas2d, RadialGradient, Raster};
use crate::signal::AudioDrive;
use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Fan pre-rotation from the horizontal pointer position plus the audio kick.
#[inline]
pub fn rotation_offset(pointer_x: f32, kick: f32) -> f32 {
    (pointer_x - 0.5) * PI + kick
}

/// Uniform wedge scale from the vertical pointer position.
#[inline]
pub fn zoom_factor(pointer_y: f32) -> f32 {
    (1.0 + (0.5 - pointer_y) * ZOOM_SPAN).clamp(ZOOM_MIN, ZOOM_MAX)
}

#[inline]
pub fn dynamic_glow(glow: f32, boost: f32) -> f32 {
    (glow + boost).clamp(0.0, 1.0)
}

/// Half-extent of the stamp drawn into each wedge.
#[inline]
pub fn wedge_radius(width: f32, height: f32) -> f32 {
    WEDGE_RADIUS_FRACTION * width.min(height)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WedgeLayout {
    pub segments: u32,
    pub rotation: f32,
    pub zoom: f32,
}

impl WedgeLayout {
    pub fn new(segments: u32, position: Vec2, audio: &AudioDrive) -> Self {
        Self {
            segments: segments.clamp(SEGMENTS_MIN, SEGMENTS_MAX),
            rotation: rotation_offset(position.x, audio.kick()),
            zoom: zoom_factor(position.y),
        }
    }

    /// Rotation of wedge `i` relative to the fan.
    #[inline]
    pub fn wedge_angle(&self, i: u32) -> f32 {
        TAU * i as f32 / self.segments as f32
    }

    /// Odd wedges are the mirrored ones.
    #[inline]
    pub fn is_mirrored(i: u32) -> bool {
        i % 2 == 1
    }
}

/// Draw `stamp` once per segment around the center of `target`.
pub fn composite<C: Canvas2d + ?Sized>(target: &mut C, stamp: &C::Image, layout: &WedgeLayout) {
    let (w, h) = target.size();
    let r = wedge_radius(w, h);
    target.save();
    target.translate(w * 0.5, h * 0.5);
    target.rotate(layout.rotation);
    for i in 0..layout.segments {
        target.save();
        target.rotate(layout.wedge_angle(i));
        if WedgeLayout::is_mirrored(i) {
            target.scale(1.0, -1.0);
        }
        target.scale(layout.zoom, layout.zoom);
        target.draw_image(stamp, -r, -r, r * 2.0, r * 2.0);
        target.restore();
    }
    target.restore();
}

/// Opaque background plus a soft additive glow centered on the surface.
pub fn paint_backdrop<C: Canvas2d + ?Sized>(target: &mut C, background: Rgba, glow: f32) {
    let (w, h) = target.size();
    target.clear();
    target.save();
    target.set_fill_color(background.with_alpha(1.0));
    target.fill_rect(0.0, 0.0, w, h);
    let vignette = RadialGradient::new(
        Vec2::new(w * 0.5, h * 0.5),
        VIGNETTE_INNER_RADIUS,
        w.max(h) * VIGNETTE_OUTER_FRACTION,
    )
    .with_stop(0.0, Rgba::WHITE.with_alpha(VIGNETTE_PEAK_ALPHA * glow.clamp(0.0, 1.0)))
    .with_stop(1.0, Rgba::TRANSPARENT);
    target.set_blend(BlendMode::Lighter);
    target.set_fill_radial(&vignette);
    target.fill_rect(0.0, 0.0, w, h);
    target.restore();
}

/// Everything the 2D path needs for one frame.
#[derive(Clone, Debug)]
pub struct PatternFrame<'a> {
    pub style: StyleMode,
    pub time: f64,
    pub palette: &'a Palette,
    pub background: Rgba,
    pub glow: f32,
    pub layout: WedgeLayout,
}

/// One 2D-path frame: stamp synthesis, backdrop, then the wedge fan.
pub fn render_frame<C>(target: &mut C, stamp: &mut Raster, frame: &PatternFrame<'_>)
where
    C: Canvas2d<Image = crate::raster::Pixmap> + ?Sized,
{
    synthesize(stamp, frame.style, frame.time, frame.palette);
    paint_backdrop(target, frame.background, frame.glow);
    composite(target, stamp.pixmap(), &frame.layout);
}

/// Owns the stamp and frame rasters of the software 2D path.
#[derive(Debug)]
pub struct SoftwareRenderer {
    stamp: Raster,
    frame: Raster,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        Ok(Self {
            stamp: Raster::new(STAMP_SIZE, STAMP_SIZE)?,
            frame: Raster::new(width.max(1), height.max(1))?,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RasterError> {
        self.frame.resize(width.max(1), height.max(1))
    }

    pub fn render(&mut self, frame: &PatternFrame<'_>) -> &crate::raster::Pixmap {
        self.frame.reset_state();
        render_frame(&mut self.frame, &mut self.stamp, frame);
        self.frame.pixmap()
    }

    pub fn frame(&self) -> &crate::raster::Pixmap {
        self.frame.pixmap()
    }
}
