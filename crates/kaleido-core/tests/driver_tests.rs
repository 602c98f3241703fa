// Frame planning, path selection and gestures.

use kaleido_core::*;

struct Loud;

impl Spectrum for Loud {
    fn byte_frequency_data(&mut self, out: &mut Vec<u8>) -> usize {
        out.clear();
        out.resize(512, 255);
        512
    }
}

#[test]
fn pattern_path_without_texture() {
    let p = KaleidoParams::default();
    assert_eq!(select_path(&p, true), RenderPath::Pattern);
    assert_eq!(select_path(&p, false), RenderPath::Pattern);
}

#[test]
fn mirror_path_needs_decodable_media() {
    let mut p = KaleidoParams::default();
    p.texture = TextureSource::Image { url: "blob:x".into() };
    assert_eq!(select_path(&p, false), RenderPath::Pattern);
    assert_eq!(select_path(&p, true), RenderPath::TextureMirror);
    p.texture = TextureSource::Camera;
    assert_eq!(select_path(&p, true), RenderPath::TextureMirror);
}

#[test]
fn no_audio_reduces_to_baseline() {
    let p = KaleidoParams::default();
    let mut driver = FrameDriver::new();
    let mut loud = Loud;
    let plan = driver.plan(&p, 0.016, Some(&mut loud), false);
    assert_eq!(plan.audio.energy, 0.0);
    assert_eq!(plan.layout.rotation, 0.0);
    assert_eq!(plan.glow, p.glow);
    assert!((plan.time - 0.016 * p.speed as f64).abs() < 1e-6);
}

#[test]
fn active_audio_speeds_clock_and_kicks_rotation() {
    let mut p = KaleidoParams::default();
    p.audio = AudioSource::Microphone;
    let mut driver = FrameDriver::new();
    let mut loud = Loud;
    let plan = driver.plan(&p, 0.016, Some(&mut loud), false);
    assert!((plan.audio.energy - 1.0).abs() < 1e-6);
    assert!(plan.time > 0.016 * p.speed as f64);
    assert!((plan.layout.rotation - 0.3).abs() < 1e-5);
    assert!((plan.glow - 0.8).abs() < 1e-5);
}

#[test]
fn active_audio_without_graph_is_neutral() {
    let mut p = KaleidoParams::default();
    p.audio = AudioSource::Microphone;
    let mut driver = FrameDriver::new();
    let plan = driver.plan(&p, 0.016, None, false);
    assert_eq!(plan.audio.energy, 0.0);
    assert_eq!(plan.layout.rotation, 0.0);
}

#[test]
fn pointer_drives_rotation_and_zoom() {
    let p = KaleidoParams::default();
    let mut driver = FrameDriver::new();
    driver.pointer([1.0, 0.0]);
    let plan = driver.plan(&p, 0.016, None, false);
    assert!((plan.layout.rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    assert!((plan.layout.zoom - 1.25).abs() < 1e-6);
}

#[test]
fn zoom_is_clamped() {
    assert_eq!(zoom_factor(0.5), 1.0);
    assert_eq!(zoom_factor(-10.0), 1.3);
    assert_eq!(zoom_factor(10.0), 0.7);
}

#[test]
fn zero_speed_freezes_time() {
    let mut p = KaleidoParams::default();
    p.speed = 0.0;
    let mut driver = FrameDriver::new();
    for _ in 0..10 {
        driver.plan(&p, 0.016, None, false);
    }
    assert_eq!(driver.elapsed(), 0.0);
}

#[test]
fn reset_clears_transient_state() {
    let p = KaleidoParams::default();
    let mut driver = FrameDriver::new();
    driver.pointer([0.9, 0.9]);
    driver.plan(&p, 0.05, None, false);
    assert!(driver.elapsed() > 0.0);
    driver.reset();
    assert_eq!(driver.elapsed(), 0.0);
    let plan = driver.plan(&p, 0.0, None, false);
    assert_eq!(plan.time, 0.0);
    assert_eq!(plan.position, glam::Vec2::splat(0.5));
}

#[test]
fn mirror_defaults() {
    let plan = FrameDriver::new().plan(&KaleidoParams::default(), 0.016, None, false);
    assert_eq!(plan.mirror.angle, 0.0);
    assert_eq!(plan.mirror.tile, 1.35);
    assert_eq!(plan.mirror.zoom, 1.0);
}

#[test]
fn double_tap_within_window() {
    let mut g = GestureTracker::new();
    assert_eq!(g.down(1000.0), None);
    g.up();
    assert_eq!(g.down(1250.0), Some(Gesture::DoubleTap));
    g.up();
    assert_eq!(g.down(1700.0), None);
}

#[test]
fn long_press_fires_once_unless_released() {
    let mut g = GestureTracker::new();
    g.down(0.0);
    assert_eq!(g.poll(500.0), None);
    assert_eq!(g.poll(800.0), Some(Gesture::LongPress));
    assert_eq!(g.poll(900.0), None);

    g.down(2000.0);
    g.up();
    assert_eq!(g.poll(3000.0), None);
}

#[test]
fn h_key_toggles() {
    let g = GestureTracker::new();
    assert_eq!(g.key("h"), Some(Gesture::ToggleKey));
    assert_eq!(g.key("H"), Some(Gesture::ToggleKey));
    assert_eq!(g.key("j"), None);
}
