// Triangular lattice fold and the CPU mirror reference.

use glam::Vec2;
use kaleido_core::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn near_cell_boundary(p: Vec2) -> bool {
    let l = lattice_coords(p);
    let f = |x: f32| x - x.floor();
    let (fu, fv) = (f(l.x), f(l.y));
    let edge = |x: f32| x < 1e-3 || x > 1.0 - 1e-3;
    // the reflection switches on the u + v = 0 diagonal
    edge(fu) || edge(fv) || (fu + fv - 1.0).abs() < 1e-3
}

fn sample_points(n: usize) -> Vec<Vec2> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..n)
        .map(|_| Vec2::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0)))
        .filter(|&p| !near_cell_boundary(p))
        .collect()
}

#[test]
fn fold_is_invariant_under_basis_translation() {
    let shifts = [B1, B2, -B1, -B2, B1 - B2, B1 * 3.0 + B2 * 2.0];
    for p in sample_points(2000) {
        let base = tri_fold(p);
        for s in shifts {
            let moved = tri_fold(p + s);
            assert!(
                (moved - base).length() < 1e-3,
                "fold({p}) = {base} but fold({p} + {s}) = {moved}"
            );
        }
    }
}

#[test]
fn fold_lands_in_fundamental_triangle() {
    for p in sample_points(2000) {
        let l = lattice_coords(tri_fold(p));
        assert!(l.x >= -0.5 - 1e-4 && l.x <= 0.5 + 1e-4, "u = {}", l.x);
        assert!(l.y >= -0.5 - 1e-4 && l.y <= 0.5 + 1e-4, "v = {}", l.y);
        assert!(l.x + l.y <= 1e-4);
    }
}

#[test]
fn fold_recenters_cell_coordinates() {
    // fractional parts are centered on zero: (0.2, 0.4) -> (-0.3, -0.1)
    let p = B1 * 0.2 + B2 * 0.4;
    let expected = B1 * -0.3 + B2 * -0.1;
    assert!((tri_fold(p) - expected).length() < 1e-5);

    // (0.9, 0.8) -> (0.4, 0.3) lies past the diagonal and reflects
    let q = B1 * 0.9 + B2 * 0.8;
    let reflected = B1 * -0.3 + B2 * -0.4;
    assert!((tri_fold(q) - reflected).length() < 1e-5);
}

#[test]
fn source_uv_stays_in_unit_square() {
    let view = MirrorView::default();
    let res = Vec2::new(1280.0, 720.0);
    for y in 0..=20 {
        for x in 0..=20 {
            let uv = Vec2::new(x as f32 / 20.0, y as f32 / 20.0);
            let m = view.source_uv(uv, res);
            assert!((0.0..=1.0).contains(&m.x) && (0.0..=1.0).contains(&m.y));
        }
    }
}

#[test]
fn vignette_fades_from_center_to_rim() {
    let view = MirrorView::default();
    let res = Vec2::new(800.0, 800.0);
    assert_eq!(view.vignette(Vec2::splat(0.5), res), 1.0);
    assert_eq!(view.vignette(Vec2::new(0.5 + 0.96, 0.5), res), 0.0);
    let mid = view.vignette(Vec2::new(0.5 + 0.75, 0.5), res);
    assert!(mid > 0.0 && mid < 1.0);
}

#[test]
fn cpu_mirror_of_flat_source_is_flat_at_center() {
    let mut source = Pixmap::new(16, 16).unwrap();
    source.fill(Rgba::rgb(0.2, 0.4, 0.6));
    let mut target = Pixmap::new(64, 48).unwrap();
    MirrorView::default().render(&source, &mut target);
    let c = target.color(32, 24);
    // 8-bit channels
    assert!((c.r - 0.2).abs() < 0.005 && (c.g - 0.4).abs() < 0.005 && (c.b - 0.6).abs() < 0.005);
    // rgb darkened toward the corners, alpha untouched
    let corner = target.pixel(0, 0);
    assert!(corner[0] < 0.2);
    assert_eq!(corner[3], 1.0);
}

#[test]
fn uniforms_carry_view_parameters() {
    let view = MirrorView {
        angle: 0.3,
        tile: 2.0,
        zoom: 1.5,
    };
    let u = view.uniforms([640.0, 480.0], 1.25);
    assert_eq!(u.resolution, [640.0, 480.0]);
    assert_eq!((u.time, u.angle, u.tile, u.zoom), (1.25, 0.3, 2.0, 1.5));
    assert_eq!(bytemuck::bytes_of(&u).len(), 32);
}
