// Host-side tests for canvas sizing and pointer/orientation mapping.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod constants {
    include!("../src/constants.rs");
}
mod input {
    include!("../src/input.rs");
}

use constants::*;
use input::*;

#[test]
fn backing_size_scales_by_device_pixel_ratio() {
    assert_eq!(backing_size(300.0, 200.0, 1.0), (300, 200));
    assert_eq!(backing_size(300.0, 200.0, 1.5), (450, 300));
}

#[test]
fn backing_size_caps_dense_displays() {
    assert_eq!(backing_size(100.0, 50.0, 3.0), (200, 100));
    assert_eq!(
        backing_size(100.0, 50.0, MAX_DEVICE_PIXEL_RATIO),
        backing_size(100.0, 50.0, 4.0)
    );
}

#[test]
fn backing_size_treats_low_or_bogus_ratio_as_one() {
    assert_eq!(backing_size(80.0, 60.0, 0.5), (80, 60));
    assert_eq!(backing_size(80.0, 60.0, f64::NAN), (80, 60));
}

#[test]
fn backing_size_never_collapses() {
    assert_eq!(backing_size(0.0, 0.0, 2.0), (MIN_BACKING_PX, MIN_BACKING_PX));
    assert_eq!(backing_size(-10.0, f64::INFINITY, 1.0), (MIN_BACKING_PX, MIN_BACKING_PX));
}

#[test]
fn backing_size_floors_fractional_pixels() {
    assert_eq!(backing_size(100.7, 33.3, 1.0), (100, 33));
}

#[test]
fn client_uv_maps_box_to_unit_square() {
    let uv = client_uv([60.0, 30.0], [10.0, 10.0], [100.0, 40.0]);
    assert!((uv[0] - 0.5).abs() < 1e-6);
    assert!((uv[1] - 0.5).abs() < 1e-6);
}

#[test]
fn client_uv_clamps_outside_points() {
    assert_eq!(client_uv([-50.0, 500.0], [0.0, 0.0], [100.0, 100.0]), [0.0, 1.0]);
}

#[test]
fn client_uv_collapsed_box_reports_center() {
    assert_eq!(client_uv([5.0, 5.0], [0.0, 0.0], [0.0, 100.0]), [0.5, 0.5]);
}

#[test]
fn orientation_missing_axes_read_level() {
    assert_eq!(orientation_angles(None, None), (0.0, 0.0));
    assert_eq!(orientation_angles(Some(30.0), None), (30.0, 0.0));
    assert_eq!(orientation_angles(Some(f64::NAN), Some(-45.0)), (0.0, -45.0));
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn canvas_classes_are_distinct() {
    assert_ne!(CANVAS_2D_CLASS, CANVAS_GPU_CLASS);
    assert!(PERMISSION_ERRORS.contains(&"NotAllowedError"));
    assert!(HAVE_CURRENT_DATA >= 2);
}
