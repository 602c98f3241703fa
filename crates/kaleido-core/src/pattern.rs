//! Procedural stamp styles.
//!
//! Each style draws around the origin of a translated canvas; [`synthesize`]
//! clears the stamp and centers it. Drawing is a pure function of
//! `(style, time, palette)`: no randomness, and every time-dependent angle
//! goes through `sin`/`cos` or is reduced modulo a full turn in `f64` first.

use crate::color::Rgba;
use crate::params::{Palette, StyleMode};
use crate::raster::{BlendMode, Canvas2d, RadialGradient};
use glam::Vec2;
use std::f32::consts::{PI, TAU};

// Bloom alpha suffixes used with shadow hints.
const SHADOW_ALPHA: u8 = 0xaa;
const HALO_SHADOW_ALPHA: u8 = 0x80;

#[inline]
fn sin(x: f64) -> f32 {
    x.sin() as f32
}

#[inline]
fn cos(x: f64) -> f32 {
    x.cos() as f32
}

/// Angle reduced to \[0, 2π) before dropping to `f32`.
#[inline]
fn turn(x: f64) -> f32 {
    x.rem_euclid(std::f64::consts::TAU) as f32
}

/// Draw one frame of `style` into `canvas`, centered.
pub fn synthesize<C: Canvas2d + ?Sized>(canvas: &mut C, style: StyleMode, time: f64, palette: &Palette) {
    let (w, h) = canvas.size();
    canvas.clear();
    canvas.save();
    canvas.translate(w * 0.5, h * 0.5);
    match style {
        StyleMode::Mandala | StyleMode::Photo => mandala(canvas, time, palette),
        StyleMode::Mosaic => mosaic(canvas, time, palette),
        StyleMode::Rosette => rosette(canvas, time, palette),
        StyleMode::Stained => stained(canvas, time, palette),
        StyleMode::Floral => floral(canvas, time, palette),
    }
    canvas.restore();
}

// ---------------- Primitives ----------------

pub fn petal<C: Canvas2d + ?Sized>(c: &mut C, h: f32, w: f32) {
    c.begin_path();
    c.move_to(0.0, -h);
    c.bezier_to(w, -h * 0.75, w, h * 0.75, 0.0, h);
    c.bezier_to(-w, h * 0.75, -w, -h * 0.75, 0.0, -h);
    c.close_path();
    c.fill();
}

pub fn leaf<C: Canvas2d + ?Sized>(c: &mut C, h: f32, w: f32) {
    c.begin_path();
    c.move_to(0.0, -h * 0.6);
    c.quad_to(w, -h * 0.1, 0.0, h);
    c.quad_to(-w, -h * 0.1, 0.0, -h * 0.6);
    c.close_path();
    c.fill();
}

pub fn diamond<C: Canvas2d + ?Sized>(c: &mut C, s: f32) {
    c.begin_path();
    c.move_to(0.0, -s);
    c.line_to(s * 0.75, 0.0);
    c.line_to(0.0, s);
    c.line_to(-s * 0.75, 0.0);
    c.close_path();
    c.fill();
}

/// Open-mouthed circle pulled to a point at the top.
pub fn teardrop<C: Canvas2d + ?Sized>(c: &mut C, h: f32, w: f32) {
    c.begin_path();
    c.arc(0.0, 0.0, w * 0.9, 0.15 * PI, 1.85 * PI);
    c.quad_to(0.0, -h, 0.0, -h);
    c.close_path();
    c.fill();
}

/// Arrow-head quadrilateral pointing along +x.
pub fn wedge<C: Canvas2d + ?Sized>(c: &mut C) {
    c.begin_path();
    c.move_to(0.0, 0.0);
    c.line_to(16.0, -6.0);
    c.line_to(24.0, 0.0);
    c.line_to(16.0, 6.0);
    c.close_path();
    c.fill();
}

pub fn dot<C: Canvas2d + ?Sized>(c: &mut C, r: f32) {
    c.begin_path();
    c.arc(0.0, 0.0, r, 0.0, TAU);
    c.fill();
}

#[derive(Clone, Copy)]
enum Shape {
    Petal,
    Leaf,
    Teardrop,
    Diamond,
}

impl Shape {
    fn draw<C: Canvas2d + ?Sized>(self, c: &mut C) {
        match self {
            Shape::Petal => petal(c, 120.0, 60.0),
            Shape::Leaf => leaf(c, 90.0, 46.0),
            Shape::Teardrop => teardrop(c, 80.0, 44.0),
            Shape::Diamond => diamond(c, 70.0),
        }
    }
}

// ---------------- Styles ----------------

// (count, radius, scale, shape) per ring, inner to outer.
const MANDALA_RINGS: [(usize, f32, f32, Shape); 5] = [
    (6, 40.0, 0.55, Shape::Petal),
    (12, 70.0, 0.5, Shape::Leaf),
    (18, 100.0, 0.5, Shape::Teardrop),
    (24, 130.0, 0.45, Shape::Diamond),
    (30, 160.0, 0.4, Shape::Leaf),
];

fn mandala<C: Canvas2d + ?Sized>(c: &mut C, t: f64, palette: &Palette) {
    c.save();
    c.set_blend(BlendMode::Lighter);

    // soft halo
    c.save();
    c.set_shadow(40.0, palette.get(0).with_alpha8(HALO_SHADOW_ALPHA));
    c.set_global_alpha(0.25);
    let halo = RadialGradient::evenly(
        Vec2::ZERO,
        0.0,
        180.0,
        &[
            palette.get(2).with_alpha8(0x10),
            palette.get(0).with_alpha8(0x06),
            Rgba::TRANSPARENT,
        ],
    );
    c.set_fill_radial(&halo);
    dot(c, 180.0);
    c.restore();

    for (ri, &(count, radius, s, shape)) in MANDALA_RINGS.iter().enumerate() {
        let rf = ri as f64;
        for i in 0..count {
            let fi = i as f64;
            c.save();
            let a = (i as f64 / count as f64) * std::f64::consts::TAU + t * (0.15 + rf * 0.03);
            let wobble = sin(t * 0.8 + fi * 0.7 + rf) * 4.0;
            c.rotate(turn(a));
            c.translate(radius + wobble, 0.0);
            let col = palette.get(i + ri * 2);
            c.set_global_alpha(0.9);
            c.set_shadow(18.0, col.with_alpha8(SHADOW_ALPHA));
            c.set_fill_color(col);
            let k = 1.0 + sin(t * 1.2 + fi * 0.6 + rf) * 0.05;
            c.scale(s * k, s * k);
            let flip = if ri % 2 == 1 { PI } else { 0.0 };
            c.rotate(sin(t * 0.9 + fi) * 0.3 + flip);
            shape.draw(c);
            c.restore();
        }
    }

    c.save();
    for i in 0..10 {
        c.save();
        c.rotate(turn((i as f64 / 10.0) * std::f64::consts::TAU + t * 0.3));
        c.set_fill_color(palette.get(i + 1));
        c.set_shadow(20.0, palette.get(i + 2).with_alpha8(SHADOW_ALPHA));
        c.scale(0.32, 0.32);
        petal(c, 140.0, 70.0);
        c.restore();
    }
    c.set_fill_color(palette.get(2));
    c.set_shadow(12.0, palette.get(2).with_alpha8(SHADOW_ALPHA));
    dot(c, 14.0);
    c.restore();

    c.restore();
}

fn mosaic<C: Canvas2d + ?Sized>(c: &mut C, t: f64, palette: &Palette) {
    const DOTS: usize = 220;
    c.save();
    c.set_blend(BlendMode::Lighter);
    for i in 0..DOTS {
        let fi = i as f64;
        let a = (fi / DOTS as f64) * std::f64::consts::TAU + t * 0.5;
        let radius = 30.0 + (i % 20) as f32 * 7.0 + sin(t * 0.8 + fi) * 3.0;
        c.save();
        c.rotate(turn(a));
        c.translate(radius, 0.0);
        c.set_fill_color(palette.get(i));
        c.set_global_alpha(0.75);
        dot(c, 4.0 + (i % 3) as f32);
        c.restore();
    }
    c.restore();
}

fn rosette<C: Canvas2d + ?Sized>(c: &mut C, t: f64, palette: &Palette) {
    const RINGS: usize = 8;
    c.save();
    for r in 0..RINGS {
        let radius = 30.0 + r as f32 * 18.0;
        let count = 12 + r * 4;
        let spin = if r % 2 == 1 { -t * 0.4 } else { t * 0.3 };
        for i in 0..count {
            c.save();
            c.rotate(turn((i as f64 / count as f64) * std::f64::consts::TAU + spin));
            c.translate(radius, 0.0);
            let col = palette.get(r + i);
            c.set_fill_color(col);
            c.set_global_alpha(0.85);
            c.set_shadow(14.0, col.with_alpha8(SHADOW_ALPHA));
            wedge(c);
            c.restore();
        }
    }
    c.restore();
}

fn stained<C: Canvas2d + ?Sized>(c: &mut C, t: f64, palette: &Palette) {
    const CELLS: i32 = 10;
    const PITCH: f32 = 36.0;
    c.save();
    c.set_blend(BlendMode::Lighter);
    for y in -CELLS..=CELLS {
        for x in -CELLS..=CELLS {
            let nx = x as f32 * PITCH + sin(t + y as f64 * 0.3) * 6.0;
            let ny = y as f32 * PITCH + cos(t * 0.8 + x as f64 * 0.3) * 6.0;
            let col = palette.get(((x - y) & 7) as usize);
            let sign = if (x ^ y) & 1 == 1 { 1.0 } else { -1.0 };
            c.save();
            c.translate(nx, ny);
            c.rotate(sign * turn(t * 0.3 + (x + y) as f64 * 0.02));
            c.set_fill_color(col);
            c.set_global_alpha(0.75);
            c.begin_path();
            c.move_to(0.0, -12.0);
            c.line_to(10.0, 0.0);
            c.line_to(0.0, 12.0);
            c.line_to(-10.0, 0.0);
            c.close_path();
            c.fill();
            c.restore();
        }
    }
    c.restore();
}

fn floral<C: Canvas2d + ?Sized>(c: &mut C, t: f64, palette: &Palette) {
    const LAYERS: usize = 4;
    c.save();
    for layer in 0..LAYERS {
        let petals = 8 + layer * 4;
        let radius = 40.0 + layer as f32 * 28.0;
        for i in 0..petals {
            c.save();
            let a = (i as f64 / petals as f64) * std::f64::consts::TAU + t * 0.2 * (layer + 1) as f64;
            c.rotate(turn(a));
            c.translate(radius, 0.0);
            let col = palette.get(i + layer);
            c.set_fill_color(col);
            c.set_global_alpha(0.9);
            c.set_shadow(16.0, col.with_alpha8(SHADOW_ALPHA));
            petal(c, 80.0, 40.0);
            c.restore();
        }
    }
    c.restore();
}
