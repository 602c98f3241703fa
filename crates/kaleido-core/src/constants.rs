// Shared visual/audio tuning constants used by both web and native frontends.

// Parameter ranges
pub const SEGMENTS_MIN: u32 = 3;
pub const SEGMENTS_MAX: u32 = 16;
pub const SPEED_MAX: f32 = 2.0;
pub const GLOW_MAX: f32 = 1.0;
pub const SENSITIVITY_MIN: f32 = 0.2;
pub const SENSITIVITY_MAX: f32 = 2.0;
pub const PALETTE_LEN: usize = 5;

// Randomize ranges (segments upper bound exclusive)
pub const RANDOM_SEGMENTS: (u32, u32) = (6, 16);
pub const RANDOM_SPEED: (f32, f32) = (0.2, 1.2);
pub const RANDOM_GLOW: (f32, f32) = (0.2, 0.8);

// Frame timing
pub const NOMINAL_DT: f32 = 0.016; // seconds per frame when the host gives no timing
pub const MAX_DT: f32 = 0.1; // clamp after stalls (backgrounded tab, debugger)

// Audio coupling; tuned by eye, not derived
pub const ENERGY_BINS: usize = 64; // lowest spectrum bins averaged into energy
pub const BEAT_EXPONENT: f32 = 1.2;
pub const CLOCK_BOOST_GAIN: f32 = 0.9; // tempo speed-up per unit beat
pub const ROTATION_KICK_GAIN: f32 = 0.3; // radians of extra fan rotation per unit beat
pub const GLOW_BOOST_GAIN: f32 = 0.4;
pub const ANALYSER_FFT_SIZE: u32 = 1024;
pub const ANALYSER_SMOOTHING: f64 = 0.85;
pub const ANALYSER_MIN_DB: f32 = -100.0;
pub const ANALYSER_MAX_DB: f32 = -30.0;

// Device tilt
pub const TILT_MAX_DEG: f32 = 45.0;
pub const TILT_SMOOTHING: f32 = 0.08; // lerp factor per orientation sample
pub const TILT_SPAN: f32 = 0.35; // how far full tilt moves the virtual pointer from center

// Stamp and compositing
pub const STAMP_SIZE: u32 = 400;
pub const WEDGE_RADIUS_FRACTION: f32 = 0.42; // of min(width, height)
pub const ZOOM_SPAN: f32 = 0.5;
pub const ZOOM_MIN: f32 = 0.7;
pub const ZOOM_MAX: f32 = 1.3;
pub const VIGNETTE_INNER_RADIUS: f32 = 10.0;
pub const VIGNETTE_OUTER_FRACTION: f32 = 0.6; // of max(width, height)
pub const VIGNETTE_PEAK_ALPHA: f32 = 0.06;

// Triangular-lattice mirror
pub const MIRROR_PRESCALE: f32 = 1.5;
pub const MIRROR_DEFAULT_TILE: f32 = 1.35;
pub const MIRROR_DEFAULT_ZOOM: f32 = 1.0;
pub const MIRROR_DEFAULT_ANGLE: f32 = 0.0;
pub const MIRROR_SOURCE_ANGLE_RATIO: f32 = 0.35; // source counter-rotation relative to view angle
pub const MIRROR_VIGNETTE_INNER: f32 = 0.55;
pub const MIRROR_VIGNETTE_OUTER: f32 = 0.95;

// Gestures
pub const DOUBLE_TAP_MS: f64 = 300.0;
pub const LONG_PRESS_MS: f64 = 800.0;
