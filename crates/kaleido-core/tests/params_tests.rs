// Parameter defaults, patch clamping and randomization ranges.

use kaleido_core::constants::*;
use kaleido_core::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn defaults_match_startup_configuration() {
    let p = KaleidoParams::default();
    let hex: Vec<String> = p.palette.colors().iter().map(|c| c.to_hex()).collect();
    assert_eq!(hex, ["#f72585", "#b5179e", "#7209b7", "#3a0ca3", "#4cc9f0"]);
    assert_eq!(p.segments, 10);
    assert_eq!(p.speed, 0.6);
    assert_eq!(p.glow, 0.4);
    assert_eq!(p.background.to_hex(), "#0a0b10");
    assert_eq!(p.style, StyleMode::Mandala);
    assert_eq!(p.texture, TextureSource::None);
    assert_eq!(p.audio, AudioSource::None);
    assert_eq!(p.audio_sensitivity, 1.0);
    assert!(!p.tilt_enabled);
}

#[test]
fn patch_clamps_out_of_range_numbers() {
    let mut p = KaleidoParams::default();
    p.apply(&ParamsPatch {
        segments: Some(1),
        speed: Some(9.0),
        glow: Some(-3.0),
        audio_sensitivity: Some(f32::INFINITY),
        ..ParamsPatch::default()
    });
    assert_eq!(p.segments, SEGMENTS_MIN);
    assert_eq!(p.speed, SPEED_MAX);
    assert_eq!(p.glow, 0.0);
    assert_eq!(p.audio_sensitivity, SENSITIVITY_MAX);

    p.apply(&ParamsPatch {
        segments: Some(99),
        ..ParamsPatch::default()
    });
    assert_eq!(p.segments, SEGMENTS_MAX);
}

#[test]
fn patch_ignores_nan() {
    let mut p = KaleidoParams::default();
    let changes = p.apply(&ParamsPatch {
        speed: Some(f32::NAN),
        glow: Some(f32::NAN),
        ..ParamsPatch::default()
    });
    assert_eq!(p.speed, 0.6);
    assert_eq!(p.glow, 0.4);
    assert!(!changes.any());
}

#[test]
fn style_change_requires_new_pipeline() {
    let mut p = KaleidoParams::default();
    let changes = p.apply(&ParamsPatch {
        style: Some(StyleMode::Rosette),
        ..ParamsPatch::default()
    });
    assert!(changes.pipeline);
    assert!(!changes.audio);

    let same = p.apply(&ParamsPatch {
        style: Some(StyleMode::Rosette),
        ..ParamsPatch::default()
    });
    assert!(!same.pipeline);
}

#[test]
fn background_is_forced_opaque() {
    let mut p = KaleidoParams::default();
    p.apply(&ParamsPatch {
        background: Some(Rgba::from_hex("#11223380").unwrap()),
        ..ParamsPatch::default()
    });
    assert_eq!(p.background.to_hex(), "#112233");
}

#[test]
fn randomize_stays_in_documented_ranges() {
    for seed in 0..300u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut p = KaleidoParams::default();
        p.randomize(&mut rng);
        assert!((6..16).contains(&p.segments), "segments {}", p.segments);
        assert!((0.2..=1.2).contains(&p.speed), "speed {}", p.speed);
        assert!((0.2..=0.8).contains(&p.glow), "glow {}", p.glow);
        assert_eq!(p.palette.len(), 5);
        let [r, g, b, a] = p.background.to_rgba8();
        assert!((5..20).contains(&r) && (5..20).contains(&g) && (8..26).contains(&b));
        assert_eq!(a, 255);
    }
}

#[test]
fn randomize_leaves_sources_alone() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut p = KaleidoParams::default();
    p.style = StyleMode::Floral;
    p.texture = TextureSource::Camera;
    p.randomize(&mut rng);
    assert_eq!(p.style, StyleMode::Floral);
    assert_eq!(p.texture, TextureSource::Camera);
}

#[test]
fn random_palette_hsv_branch_has_requested_size() {
    let mut rng = StdRng::seed_from_u64(3);
    // sizes other than 5 always take the HSV branch
    let p = random_palette(&mut rng, 7);
    assert_eq!(p.len(), 7);
    for c in p.colors() {
        assert_eq!(c.a, 1.0);
    }
}
