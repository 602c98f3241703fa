// Wedge fan geometry and symmetry of composited frames.

use glam::{Affine2, Mat2, Vec2};
use kaleido_core::constants::STAMP_SIZE;
use kaleido_core::*;
use std::f32::consts::{PI, TAU};

/// Canvas that only tracks the transform and records each image draw.
#[derive(Default)]
struct Recorder {
    ctm: Affine2,
    stack: Vec<Affine2>,
    draws: Vec<(Affine2, [f32; 4])>,
}

impl Canvas2d for Recorder {
    type Image = ();

    fn size(&self) -> (f32, f32) {
        (300.0, 200.0)
    }
    fn save(&mut self) {
        self.stack.push(self.ctm);
    }
    fn restore(&mut self) {
        if let Some(m) = self.stack.pop() {
            self.ctm = m;
        }
    }
    fn translate(&mut self, x: f32, y: f32) {
        self.ctm = self.ctm * Affine2::from_translation(Vec2::new(x, y));
    }
    fn rotate(&mut self, angle: f32) {
        self.ctm = self.ctm * Affine2::from_angle(angle);
    }
    fn scale(&mut self, sx: f32, sy: f32) {
        self.ctm = self.ctm * Affine2::from_scale(Vec2::new(sx, sy));
    }
    fn set_global_alpha(&mut self, _: f32) {}
    fn set_blend(&mut self, _: BlendMode) {}
    fn set_fill_color(&mut self, _: Rgba) {}
    fn set_fill_radial(&mut self, _: &RadialGradient) {}
    fn set_shadow(&mut self, _: f32, _: Rgba) {}
    fn clear(&mut self) {}
    fn fill_rect(&mut self, _: f32, _: f32, _: f32, _: f32) {}
    fn begin_path(&mut self) {}
    fn move_to(&mut self, _: f32, _: f32) {}
    fn line_to(&mut self, _: f32, _: f32) {}
    fn quad_to(&mut self, _: f32, _: f32, _: f32, _: f32) {}
    fn bezier_to(&mut self, _: f32, _: f32, _: f32, _: f32, _: f32, _: f32) {}
    fn arc(&mut self, _: f32, _: f32, _: f32, _: f32, _: f32) {}
    fn close_path(&mut self) {}
    fn fill(&mut self) {}
    fn draw_image(&mut self, _: &(), x: f32, y: f32, w: f32, h: f32) {
        self.draws.push((self.ctm, [x, y, w, h]));
    }
}

fn close(a: Affine2, b: Affine2) -> bool {
    a.abs_diff_eq(b, 1e-4)
}

fn expected_wedge(i: u32, layout: &WedgeLayout, center: Vec2) -> Affine2 {
    let mirror = if i % 2 == 1 { Vec2::new(1.0, -1.0) } else { Vec2::ONE };
    Affine2::from_translation(center)
        * Affine2::from_angle(layout.rotation + TAU * i as f32 / layout.segments as f32)
        * Affine2::from_scale(mirror * layout.zoom)
}

#[test]
fn fan_repeats_segments_times_around_center() {
    for segments in 3..=16 {
        let layout = WedgeLayout {
            segments,
            rotation: 0.4,
            zoom: 1.1,
        };
        let mut rec = Recorder::default();
        composite(&mut rec, &(), &layout);
        assert_eq!(rec.draws.len(), segments as usize);
        let center = Vec2::new(150.0, 100.0);
        let r = 0.42 * 200.0;
        for (i, (m, rect)) in rec.draws.iter().enumerate() {
            assert!(close(*m, expected_wedge(i as u32, &layout, center)), "wedge {i} of {segments}");
            assert_eq!(*rect, [-r, -r, 2.0 * r, 2.0 * r]);
        }
        // the fan is restored afterwards
        assert!(close(rec.ctm, Affine2::IDENTITY));
    }
}

#[test]
fn odd_wedges_are_reflections() {
    let layout = WedgeLayout {
        segments: 7,
        rotation: 0.0,
        zoom: 1.0,
    };
    let mut rec = Recorder::default();
    composite(&mut rec, &(), &layout);
    for (i, (m, _)) in rec.draws.iter().enumerate() {
        let det = m.matrix2.determinant();
        if i % 2 == 1 {
            assert!(det < 0.0, "wedge {i} should be mirrored");
        } else {
            assert!(det > 0.0, "wedge {i} should not be mirrored");
        }
    }
}

#[test]
fn six_wedges_form_a_dihedral_set() {
    // with alternating reflection, rotating the whole fan by two wedges maps
    // every wedge onto another one
    let layout = WedgeLayout {
        segments: 6,
        rotation: 0.0,
        zoom: 1.0,
    };
    let mut rec = Recorder::default();
    composite(&mut rec, &(), &layout);
    let center = Affine2::from_translation(Vec2::new(150.0, 100.0));
    let turn = center * Affine2::from_angle(2.0 * TAU / 6.0) * center.inverse();
    for i in 0..6 {
        let moved = turn * rec.draws[i].0;
        assert!(close(moved, rec.draws[(i + 2) % 6].0));
    }
}

fn blob_stamp() -> Pixmap {
    let mut stamp = Raster::new(STAMP_SIZE, STAMP_SIZE).unwrap();
    stamp.set_fill_color(Rgba::WHITE);
    stamp.begin_path();
    stamp.arc(300.0, 120.0, 12.0, 0.0, TAU);
    stamp.fill();
    stamp.pixmap().clone()
}

#[test]
fn composited_blob_lands_in_every_wedge() {
    let stamp = blob_stamp();
    let mut frame = Raster::new(200, 200).unwrap();
    let layout = WedgeLayout {
        segments: 6,
        rotation: 0.0,
        zoom: 1.0,
    };
    composite(&mut frame, &stamp, &layout);

    let r = 0.42 * 200.0;
    let s = 2.0 * r / STAMP_SIZE as f32;
    // blob center in wedge-local coordinates
    let q = Vec2::new(300.0 * s - r, 120.0 * s - r);
    let center = Vec2::splat(100.0);
    let alpha_at = |p: Vec2| frame.pixmap().pixel(p.x as u32, p.y as u32)[3];

    for i in 0..6u32 {
        let a = TAU * i as f32 / 6.0;
        let local = if i % 2 == 1 { Vec2::new(q.x, -q.y) } else { q };
        let hit = center + Mat2::from_angle(a) * local;
        assert!(alpha_at(hit) > 0.9, "wedge {i} blob missing at {hit}");
        if i % 2 == 1 {
            let unmirrored = center + Mat2::from_angle(a) * q;
            assert!(alpha_at(unmirrored) < 0.05, "wedge {i} not mirrored");
        }
    }
}

#[test]
fn pointer_offsets_the_fan() {
    assert_eq!(rotation_offset(0.5, 0.0), 0.0);
    assert!((rotation_offset(0.0, 0.0) + PI / 2.0).abs() < 1e-6);
    assert!((rotation_offset(0.5, 0.25) - 0.25).abs() < 1e-6);
}

#[test]
fn backdrop_is_opaque_and_brightest_at_center() {
    let mut frame = Raster::new(64, 48).unwrap();
    let bg = Rgba::from_hex("#0a0b10").unwrap();
    paint_backdrop(&mut frame, bg, 1.0);
    let p = frame.pixmap();
    for px in p.pixels() {
        assert_eq!(px[3], 1.0);
    }
    let center = p.color(32, 24);
    let corner = p.color(0, 0);
    assert!(center.r > corner.r);
    assert!((corner.r - bg.r).abs() < 0.01);

    let mut dull = Raster::new(64, 48).unwrap();
    paint_backdrop(&mut dull, bg, 0.0);
    assert!((dull.pixmap().color(32, 24).r - bg.r).abs() < 0.004);
}

#[test]
fn mandala_frame_is_mirror_symmetric_about_vertical_axis() {
    // segments 6, time 0, centered pointer, no audio
    let params = KaleidoParams {
        segments: 6,
        ..KaleidoParams::default()
    };
    let plan = FrameDriver::new().plan(&params, 0.0, None, false);
    assert_eq!(plan.time, 0.0);
    assert_eq!(plan.layout.rotation, 0.0);
    assert_eq!(plan.layout.zoom, 1.0);

    let mut stamp = Raster::new(STAMP_SIZE, STAMP_SIZE).unwrap();
    synthesize(&mut stamp, plan.style, plan.time, &params.palette);
    let mut frame = Raster::new(240, 240).unwrap();
    composite(&mut frame, stamp.pixmap(), &plan.layout);

    // Reflection across the vertical axis maps wedge i onto wedge 3 - i, so
    // the composited coverage is symmetric whatever the stamp.
    let p = frame.pixmap();
    let mut mismatched = 0;
    for y in 0..240 {
        for x in 0..120 {
            let a = p.pixel(x, y)[3];
            let b = p.pixel(239 - x, y)[3];
            if (a - b).abs() > 0.02 {
                mismatched += 1;
            }
        }
    }
    assert!(mismatched < 240 * 120 / 200, "{mismatched} asymmetric pixels");
    let coverage: f32 = p.pixels().map(|px| px[3]).sum();
    assert!(coverage > 1000.0);
}

#[test]
fn software_renderer_draws_an_opaque_frame() {
    let params = KaleidoParams::default();
    let plan = FrameDriver::new().plan(&params, 0.0, None, false);
    let mut renderer = SoftwareRenderer::new(96, 64).unwrap();
    let frame = renderer.render(&plan.pattern_frame(&params));
    assert_eq!((frame.width(), frame.height()), (96, 64));
    assert!(frame.pixels().all(|px| px[3] == 1.0));

    renderer.resize(48, 32).unwrap();
    assert_eq!((renderer.frame().width(), renderer.frame().height()), (48, 32));
}
