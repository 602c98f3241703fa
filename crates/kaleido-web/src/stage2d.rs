//! The 2D path on a browser canvas: [`Canvas2d`] over
//! `CanvasRenderingContext2d`, plus the offscreen stamp.

use crate::dom;
use kaleido_core::constants::STAMP_SIZE;
use kaleido_core::{
    composite, paint_backdrop, synthesize, BlendMode, Canvas2d, PatternFrame, RadialGradient, Rgba,
};
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

pub struct Context2d {
    canvas: web::HtmlCanvasElement,
    ctx: web::CanvasRenderingContext2d,
}

impl Context2d {
    pub fn new(canvas: web::HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<web::CanvasRenderingContext2d>()?;
        Ok(Self { canvas, ctx })
    }

    pub fn canvas(&self) -> &web::HtmlCanvasElement {
        &self.canvas
    }
}

impl Canvas2d for Context2d {
    type Image = web::HtmlCanvasElement;

    fn size(&self) -> (f32, f32) {
        (self.canvas.width() as f32, self.canvas.height() as f32)
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn translate(&mut self, x: f32, y: f32) {
        let _ = self.ctx.translate(x as f64, y as f64);
    }

    fn rotate(&mut self, angle: f32) {
        let _ = self.ctx.rotate(angle as f64);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        let _ = self.ctx.scale(sx as f64, sy as f64);
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.ctx.set_global_alpha(alpha as f64);
    }

    fn set_blend(&mut self, mode: BlendMode) {
        let op = match mode {
            BlendMode::SourceOver => "source-over",
            BlendMode::Lighter => "lighter",
        };
        let _ = self.ctx.set_global_composite_operation(op);
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.ctx.set_fill_style_str(&color.to_css());
    }

    fn set_fill_radial(&mut self, gradient: &RadialGradient) {
        let (x, y) = (gradient.center.x as f64, gradient.center.y as f64);
        let g = match self.ctx.create_radial_gradient(
            x,
            y,
            gradient.r0 as f64,
            x,
            y,
            gradient.r1 as f64,
        ) {
            Ok(g) => g,
            Err(e) => {
                log::warn!("[stage2d] radial gradient rejected: {:?}", e);
                return;
            }
        };
        for (offset, color) in gradient.stops() {
            let _ = g.add_color_stop(*offset, &color.to_css());
        }
        self.ctx.set_fill_style_canvas_gradient(&g);
    }

    fn set_shadow(&mut self, blur: f32, color: Rgba) {
        self.ctx.set_shadow_blur(blur as f64);
        self.ctx.set_shadow_color(&color.to_css());
    }

    fn clear(&mut self) {
        self.ctx.save();
        let _ = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        self.ctx.clear_rect(
            0.0,
            0.0,
            self.canvas.width() as f64,
            self.canvas.height() as f64,
        );
        self.ctx.restore();
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.ctx.fill_rect(x as f64, y as f64, w as f64, h as f64);
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.ctx.move_to(x as f64, y as f64);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.ctx.line_to(x as f64, y as f64);
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.ctx
            .quadratic_curve_to(cx as f64, cy as f64, x as f64, y as f64);
    }

    fn bezier_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        self.ctx.bezier_curve_to(
            c1x as f64, c1y as f64, c2x as f64, c2y as f64, x as f64, y as f64,
        );
    }

    fn arc(&mut self, cx: f32, cy: f32, r: f32, start: f32, end: f32) {
        let _ = self
            .ctx
            .arc(cx as f64, cy as f64, r.max(0.0) as f64, start as f64, end as f64);
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn fill(&mut self) {
        self.ctx.fill();
    }

    fn draw_image(&mut self, image: &web::HtmlCanvasElement, x: f32, y: f32, w: f32, h: f32) {
        let _ = self.ctx.draw_image_with_html_canvas_element_and_dw_and_dh(
            image, x as f64, y as f64, w as f64, h as f64,
        );
    }
}

/// Visible canvas plus the detached stamp canvas the patterns draw into.
pub struct Stage2d {
    target: Context2d,
    stamp: Context2d,
}

impl Stage2d {
    pub fn new(document: &web::Document, canvas: web::HtmlCanvasElement) -> Result<Self, JsValue> {
        let stamp = dom::create_offscreen_canvas(document, STAMP_SIZE, STAMP_SIZE)?;
        Ok(Self {
            target: Context2d::new(canvas)?,
            stamp: Context2d::new(stamp)?,
        })
    }

    pub fn canvas(&self) -> &web::HtmlCanvasElement {
        self.target.canvas()
    }

    pub fn render(&mut self, frame: &PatternFrame<'_>) {
        synthesize(&mut self.stamp, frame.style, frame.time, frame.palette);
        paint_backdrop(&mut self.target, frame.background, frame.glow);
        composite(&mut self.target, self.stamp.canvas(), &frame.layout);
    }
}
