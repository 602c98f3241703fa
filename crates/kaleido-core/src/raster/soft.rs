//! Software backend for [`Canvas2d`] on tiny-skia.
//!
//! Path points go through the current transform as they are added and are
//! filled in device space; gradients carry the transform in their shader.
//! Shadows are not rendered.

use super::pixmap::to_skia;
use super::{BlendMode, Canvas2d, Pixmap, RadialGradient};
use crate::color::Rgba;
use crate::error::RasterError;
use smallvec::SmallVec;
use std::f32::consts::{FRAC_PI_2, TAU};
use tiny_skia::{
    FillRule, FilterQuality, GradientStop, Paint, Path, PathBuilder, PixmapPaint, Point, Rect,
    Shader, SpreadMode, Transform,
};

#[derive(Clone, Debug)]
enum Fill {
    Solid(Rgba),
    Radial(RadialGradient),
}

#[derive(Clone, Debug)]
struct DrawState {
    ts: Transform,
    alpha: f32,
    blend: BlendMode,
    fill: Fill,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            ts: Transform::identity(),
            alpha: 1.0,
            blend: BlendMode::SourceOver,
            fill: Fill::Solid(Rgba::BLACK),
        }
    }
}

/// A [`Pixmap`] with canvas-style drawing state.
#[derive(Debug)]
pub struct Raster {
    pixmap: Pixmap,
    state: DrawState,
    stack: SmallVec<[DrawState; 8]>,
    path: PathBuilder,
    subpath_start: Option<Point>,
    current: Option<Point>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        Ok(Self {
            pixmap: Pixmap::new(width, height)?,
            state: DrawState::default(),
            stack: SmallVec::new(),
            path: PathBuilder::new(),
            subpath_start: None,
            current: None,
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Resize the surface, discarding contents and drawing state.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RasterError> {
        self.pixmap.resize(width, height)?;
        self.reset_state();
        Ok(())
    }

    pub fn reset_state(&mut self) {
        self.state = DrawState::default();
        self.stack.clear();
        self.begin_path();
    }

    #[inline]
    fn device(&self, x: f32, y: f32) -> Point {
        let mut p = Point::from_xy(x, y);
        self.state.ts.map_point(&mut p);
        p
    }

    fn ensure_subpath(&mut self, at: Point) {
        if self.current.is_none() {
            self.push_move(at);
        }
    }

    fn push_move(&mut self, at: Point) {
        self.path.move_to(at.x, at.y);
        self.subpath_start = Some(at);
        self.current = Some(at);
    }

    fn push_line(&mut self, to: Point) {
        self.ensure_subpath(to);
        self.path.line_to(to.x, to.y);
        self.current = Some(to);
    }

    fn paint(&self) -> Option<Paint<'static>> {
        let alpha = self.state.alpha;
        if alpha <= 0.0 {
            return None;
        }
        let mut paint = Paint::default();
        paint.shader = match &self.state.fill {
            Fill::Solid(c) => Shader::SolidColor(to_skia(c.with_alpha(c.a * alpha))),
            Fill::Radial(g) => radial_shader(g, alpha, self.state.ts)?,
        };
        paint.blend_mode = skia_blend(self.state.blend);
        paint.anti_alias = true;
        Some(paint)
    }

    fn fill_device_path(&mut self, path: &Path) {
        if let Some(paint) = self.paint() {
            self.pixmap
                .skia_mut()
                .fill_path(path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

fn skia_blend(mode: BlendMode) -> tiny_skia::BlendMode {
    match mode {
        BlendMode::SourceOver => tiny_skia::BlendMode::SourceOver,
        BlendMode::Lighter => tiny_skia::BlendMode::Plus,
    }
}

/// tiny-skia radials always start at radius 0, so `r0..r1` stop offsets are
/// remapped onto `0..r1`; the first color pads the inner disc.
fn radial_shader(g: &RadialGradient, alpha: f32, ts: Transform) -> Option<Shader<'static>> {
    let faded = |c: Rgba| to_skia(c.with_alpha(c.a * alpha));
    let &(_, last) = g.stops().last()?;
    if g.r1 <= 0.0 || (g.r1 - g.r0).abs() <= f32::EPSILON {
        return Some(Shader::SolidColor(faded(last)));
    }
    let stops = g
        .stops()
        .iter()
        .map(|&(t, c)| GradientStop::new((g.r0 + t * (g.r1 - g.r0)) / g.r1, faded(c)))
        .collect();
    let center = Point::from_xy(g.center.x, g.center.y);
    tiny_skia::RadialGradient::new(center, center, g.r1, stops, SpreadMode::Pad, ts)
}

impl Canvas2d for Raster {
    type Image = Pixmap;

    fn size(&self) -> (f32, f32) {
        (self.pixmap.width() as f32, self.pixmap.height() as f32)
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.state.ts = self.state.ts.pre_translate(x, y);
    }

    fn rotate(&mut self, angle: f32) {
        self.state.ts = self.state.ts.pre_rotate(angle.to_degrees());
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.state.ts = self.state.ts.pre_scale(sx, sy);
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        if alpha.is_finite() {
            self.state.alpha = alpha.clamp(0.0, 1.0);
        }
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.state.blend = mode;
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.state.fill = Fill::Solid(color);
    }

    fn set_fill_radial(&mut self, gradient: &RadialGradient) {
        self.state.fill = Fill::Radial(gradient.clone());
    }

    fn set_shadow(&mut self, _blur: f32, _color: Rgba) {}

    fn clear(&mut self) {
        self.pixmap.clear();
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        if let Some(path) = PathBuilder::from_rect(rect).transform(self.state.ts) {
            self.fill_device_path(&path);
        }
    }

    fn begin_path(&mut self) {
        self.path = PathBuilder::new();
        self.subpath_start = None;
        self.current = None;
    }

    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.device(x, y);
        self.push_move(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.device(x, y);
        self.push_line(p);
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let c = self.device(cx, cy);
        let p = self.device(x, y);
        self.ensure_subpath(c);
        self.path.quad_to(c.x, c.y, p.x, p.y);
        self.current = Some(p);
    }

    fn bezier_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        let c1 = self.device(c1x, c1y);
        let c2 = self.device(c2x, c2y);
        let p = self.device(x, y);
        self.ensure_subpath(c1);
        self.path.cubic_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y);
        self.current = Some(p);
    }

    // Quarter-turn cubic pieces; affine transforms map their control points
    // exactly, so they are transformed like any other segment.
    fn arc(&mut self, cx: f32, cy: f32, r: f32, start: f32, end: f32) {
        let r = r.max(0.0);
        let sweep = if end - start >= TAU { TAU } else { (end - start).rem_euclid(TAU) };
        let first = self.device(cx + r * start.cos(), cy + r * start.sin());
        if self.current.is_some() {
            self.push_line(first);
        } else {
            self.push_move(first);
        }
        if !sweep.is_finite() || sweep <= 0.0 {
            return;
        }
        let pieces = (sweep / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = sweep / pieces as f32;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        for i in 0..pieces {
            let a0 = start + step * i as f32;
            let (s0, c0) = a0.sin_cos();
            let (s1, c1) = (a0 + step).sin_cos();
            let h1 = self.device(cx + r * (c0 - k * s0), cy + r * (s0 + k * c0));
            let h2 = self.device(cx + r * (c1 + k * s1), cy + r * (s1 - k * c1));
            let p = self.device(cx + r * c1, cy + r * s1);
            self.path.cubic_to(h1.x, h1.y, h2.x, h2.y, p.x, p.y);
            self.current = Some(p);
        }
    }

    fn close_path(&mut self) {
        if let Some(start) = self.subpath_start {
            self.path.close();
            // the next segment starts from the closed subpath's origin
            self.current = Some(start);
        }
    }

    fn fill(&mut self) {
        if let Some(path) = self.path.clone().finish() {
            self.fill_device_path(&path);
        }
    }

    fn draw_image(&mut self, image: &Pixmap, x: f32, y: f32, w: f32, h: f32) {
        let alpha = self.state.alpha;
        if w == 0.0 || h == 0.0 || alpha <= 0.0 {
            return;
        }
        // a negative size moves the destination rectangle, it does not flip
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        let ts = self
            .state
            .ts
            .pre_translate(x, y)
            .pre_scale(w / image.width() as f32, h / image.height() as f32);
        let mut paint = PixmapPaint::default();
        paint.opacity = alpha;
        paint.quality = FilterQuality::Bilinear;
        paint.blend_mode = skia_blend(self.state.blend);
        self.pixmap
            .skia_mut()
            .draw_pixmap(0, 0, image.as_skia(), &paint, ts, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    // one 8-bit step plus antialiasing slack
    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn fill_rect_covers_exact_pixels() {
        let mut r = Raster::new(8, 8).unwrap();
        r.set_fill_color(Rgba::WHITE);
        r.fill_rect(2.0, 2.0, 4.0, 4.0);
        assert!(approx(r.pixmap().pixel(2, 2)[3], 1.0));
        assert!(approx(r.pixmap().pixel(5, 5)[3], 1.0));
        assert_eq!(r.pixmap().pixel(1, 1), [0.0; 4]);
        assert_eq!(r.pixmap().pixel(6, 6), [0.0; 4]);
    }

    #[test]
    fn half_covered_pixel_gets_half_alpha() {
        let mut r = Raster::new(4, 4).unwrap();
        r.set_fill_color(Rgba::WHITE);
        r.fill_rect(0.0, 0.0, 1.5, 4.0);
        assert!(approx(r.pixmap().pixel(1, 1)[3], 0.5));
    }

    #[test]
    fn transforms_apply_to_paths() {
        let mut r = Raster::new(20, 20).unwrap();
        r.set_fill_color(Rgba::WHITE);
        r.translate(10.0, 10.0);
        r.scale(2.0, 2.0);
        r.begin_path();
        r.move_to(-2.0, -2.0);
        r.line_to(2.0, -2.0);
        r.line_to(2.0, 2.0);
        r.line_to(-2.0, 2.0);
        r.fill();
        assert!(approx(r.pixmap().pixel(6, 6)[3], 1.0));
        assert!(approx(r.pixmap().pixel(13, 13)[3], 1.0));
        assert_eq!(r.pixmap().pixel(5, 10)[3], 0.0);
        assert_eq!(r.pixmap().pixel(14, 10)[3], 0.0);
    }

    #[test]
    fn rotation_is_in_radians() {
        let mut r = Raster::new(20, 20).unwrap();
        r.set_fill_color(Rgba::WHITE);
        r.translate(10.0, 10.0);
        r.rotate(FRAC_PI_2);
        // +x maps to +y after a quarter turn
        r.fill_rect(2.0, -1.0, 6.0, 2.0);
        assert!(approx(r.pixmap().pixel(10, 15)[3], 1.0));
        assert_eq!(r.pixmap().pixel(15, 10)[3], 0.0);
    }

    #[test]
    fn full_arc_fills_a_disc() {
        let mut r = Raster::new(40, 40).unwrap();
        r.set_fill_color(Rgba::WHITE);
        r.begin_path();
        r.arc(20.0, 20.0, 10.0, 0.0, TAU);
        r.fill();
        assert!(approx(r.pixmap().pixel(20, 20)[3], 1.0));
        assert!(approx(r.pixmap().pixel(20, 11)[3], 1.0));
        assert_eq!(r.pixmap().pixel(20, 5)[3], 0.0);
        assert_eq!(r.pixmap().pixel(2, 2)[3], 0.0);
    }

    #[test]
    fn half_arc_fills_only_its_side() {
        let mut r = Raster::new(40, 40).unwrap();
        r.set_fill_color(Rgba::WHITE);
        r.begin_path();
        r.arc(20.0, 20.0, 10.0, 0.0, std::f32::consts::PI);
        r.close_path();
        r.fill();
        // clockwise from +x through +y: the lower half in screen space
        assert!(approx(r.pixmap().pixel(20, 26)[3], 1.0));
        assert_eq!(r.pixmap().pixel(20, 14)[3], 0.0);
    }

    #[test]
    fn lighter_saturates() {
        let mut r = Raster::new(2, 2).unwrap();
        r.set_blend(BlendMode::Lighter);
        r.set_fill_color(Rgba::rgb(0.75, 0.0, 0.0));
        r.fill_rect(0.0, 0.0, 2.0, 2.0);
        r.fill_rect(0.0, 0.0, 2.0, 2.0);
        assert!(approx(r.pixmap().pixel(0, 0)[0], 1.0));
    }

    #[test]
    fn radial_gradient_pads_inside_inner_radius() {
        let mut r = Raster::new(60, 60).unwrap();
        let g = RadialGradient::new(Vec2::splat(30.0), 10.0, 20.0)
            .with_stop(0.0, Rgba::rgb(1.0, 0.0, 0.0))
            .with_stop(1.0, Rgba::rgb(0.0, 0.0, 1.0));
        r.set_fill_radial(&g);
        r.fill_rect(0.0, 0.0, 60.0, 60.0);
        let p = r.pixmap();
        // inside r0 the first stop holds
        assert!(p.color(33, 30).r > 0.95);
        // halfway between r0 and r1
        let mid = p.color(45, 30);
        assert!(mid.r > 0.3 && mid.r < 0.7, "{mid:?}");
        // past r1 the last stop holds
        assert!(p.color(56, 30).b > 0.95);
    }

    #[test]
    fn global_alpha_fades_fills() {
        let mut r = Raster::new(2, 2).unwrap();
        r.set_global_alpha(0.5);
        r.set_fill_color(Rgba::WHITE);
        r.fill_rect(0.0, 0.0, 2.0, 2.0);
        assert!(approx(r.pixmap().pixel(0, 0)[3], 0.5));
    }

    #[test]
    fn restore_undoes_transform_and_alpha() {
        let mut r = Raster::new(4, 4).unwrap();
        r.save();
        r.translate(100.0, 100.0);
        r.set_global_alpha(0.0);
        r.restore();
        r.set_fill_color(Rgba::WHITE);
        r.fill_rect(0.0, 0.0, 4.0, 4.0);
        assert!(approx(r.pixmap().pixel(0, 0)[3], 1.0));
    }

    #[test]
    fn draw_image_mirrors_with_negative_scale() {
        let mut src = Raster::new(2, 1).unwrap();
        src.set_fill_color(Rgba::rgb(1.0, 0.0, 0.0));
        src.fill_rect(0.0, 0.0, 1.0, 1.0);
        src.set_fill_color(Rgba::rgb(0.0, 0.0, 1.0));
        src.fill_rect(1.0, 0.0, 1.0, 1.0);

        let mut dst = Raster::new(20, 10).unwrap();
        dst.translate(10.0, 0.0);
        dst.scale(-1.0, 1.0);
        dst.draw_image(src.pixmap(), 0.0, 0.0, 10.0, 10.0);
        // image x in [0, 10) lands on device x in (0, 10], mirrored
        assert!(dst.pixmap().color(1, 5).b > 0.9);
        assert!(dst.pixmap().color(8, 5).r > 0.9);
        assert_eq!(dst.pixmap().pixel(15, 5)[3], 0.0);
    }
}
