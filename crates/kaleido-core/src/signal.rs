//! Time, audio and position signals feeding the frame driver.
//!
//! Everything here is sampled once per frame and degrades to a neutral value
//! (zero energy, centered position) when its source is absent.

use crate::constants::*;
use glam::Vec2;

/// Audio energy shaped by the user sensitivity: `energy^1.2 * sensitivity`.
#[inline]
pub fn beat(energy: f32, sensitivity: f32) -> f32 {
    energy.clamp(0.0, 1.0).powf(BEAT_EXPONENT) * sensitivity
}

/// Mean of the lowest [`ENERGY_BINS`] byte-frequency bins, normalized to
/// \[0, 1\]. An empty buffer reads as silence.
pub fn low_band_energy(bins: &[u8]) -> f32 {
    let n = bins.len().min(ENERGY_BINS);
    if n == 0 {
        return 0.0;
    }
    let sum: u32 = bins[..n].iter().map(|&b| b as u32).sum();
    (sum as f32 / n as f32) / 255.0
}

/// Per-frame audio coupling. When inactive every modulation is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AudioDrive {
    pub active: bool,
    pub energy: f32,
    pub sensitivity: f32,
}

impl AudioDrive {
    pub fn silent() -> Self {
        Self::default()
    }

    fn beat(&self) -> f32 {
        if self.active {
            beat(self.energy, self.sensitivity)
        } else {
            0.0
        }
    }

    /// Tempo multiplier offset fed to [`Clock::advance`].
    pub fn boost(&self) -> f32 {
        self.beat() * CLOCK_BOOST_GAIN
    }

    /// Extra fan rotation in radians.
    pub fn kick(&self) -> f32 {
        self.beat() * ROTATION_KICK_GAIN
    }

    /// Glow added on top of the user setting.
    pub fn glow_boost(&self) -> f32 {
        self.beat() * GLOW_BOOST_GAIN
    }
}

/// Accumulated animation time. Audio only ever speeds it up.
#[derive(Clone, Copy, Debug, Default)]
pub struct Clock {
    elapsed: f64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: f32, boost: f32) -> f64 {
        let step = dt.max(0.0) as f64 * (1.0 + boost.max(0.0) as f64);
        self.elapsed += step;
        self.elapsed
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

/// Anything that can fill a byte-frequency buffer (a WebAudio analyser, a
/// native FFT over microphone samples).
pub trait Spectrum {
    /// Write the current spectrum into `out`, returning the bins written.
    fn byte_frequency_data(&mut self, out: &mut Vec<u8>) -> usize;
}

/// Reads a [`Spectrum`] into a reusable buffer and reduces it to energy.
#[derive(Debug, Default)]
pub struct EnergyMeter {
    buffer: Vec<u8>,
}

impl EnergyMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, source: Option<&mut dyn Spectrum>) -> f32 {
        match source {
            Some(s) => {
                let n = s.byte_frequency_data(&mut self.buffer);
                low_band_energy(&self.buffer[..n.min(self.buffer.len())])
            }
            None => 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Exponentially smoothed device tilt in \[-1, 1\]².
#[derive(Clone, Copy, Debug, Default)]
pub struct TiltTracker {
    tilt: Vec2,
}

impl TiltTracker {
    /// Feed one orientation sample (degrees). `beta` tilts front/back and maps
    /// to y; `gamma` tilts left/right and maps to x.
    pub fn sample(&mut self, beta: f32, gamma: f32) {
        let norm = |deg: f32| {
            if deg.is_finite() {
                (deg / TILT_MAX_DEG).clamp(-1.0, 1.0)
            } else {
                0.0
            }
        };
        let target = Vec2::new(norm(gamma), norm(beta));
        self.tilt = self.tilt.lerp(target, TILT_SMOOTHING);
    }

    pub fn tilt(&self) -> Vec2 {
        self.tilt
    }

    /// Tilt mapped to a virtual pointer in \[0, 1\]².
    pub fn position(&self) -> Vec2 {
        (Vec2::splat(0.5) + self.tilt * TILT_SPAN).clamp(Vec2::ZERO, Vec2::ONE)
    }

    pub fn reset(&mut self) {
        self.tilt = Vec2::ZERO;
    }
}

/// Fuses pointer and tilt into the one position the compositor reads.
#[derive(Clone, Copy, Debug)]
pub struct PositionSampler {
    pointer: Vec2,
    tilt: TiltTracker,
}

impl Default for PositionSampler {
    fn default() -> Self {
        Self {
            pointer: Vec2::splat(0.5),
            tilt: TiltTracker::default(),
        }
    }
}

impl PositionSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer position in normalized surface coordinates.
    pub fn pointer(&mut self, uv: [f32; 2]) {
        if uv[0].is_finite() && uv[1].is_finite() {
            self.pointer = Vec2::from(uv).clamp(Vec2::ZERO, Vec2::ONE);
        }
    }

    /// Orientation samples are dropped while tilt is disabled.
    pub fn orientation(&mut self, beta: f32, gamma: f32, tilt_enabled: bool) {
        if tilt_enabled {
            self.tilt.sample(beta, gamma);
        }
    }

    pub fn sample(&self, tilt_enabled: bool) -> Vec2 {
        if tilt_enabled {
            self.tilt.position()
        } else {
            self.pointer
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Measures wall-clock frame deltas, clamped after stalls.
#[derive(Debug)]
pub struct FrameTimer {
    last: Option<instant::Instant>,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Seconds since the previous tick; [`NOMINAL_DT`] on the first one.
    pub fn tick(&mut self) -> f32 {
        let now = instant::Instant::now();
        let dt = match self.last {
            Some(prev) => clamp_dt(now.duration_since(prev).as_secs_f32()),
            None => NOMINAL_DT,
        };
        self.last = Some(now);
        dt
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Nominal step for non-finite or negative input, capped at [`MAX_DT`]. A
/// zero step stays zero so a frame can be planned without advancing time.
#[inline]
pub fn clamp_dt(dt: f32) -> f32 {
    if dt == 0.0 {
        0.0
    } else if dt.is_finite() && dt > 0.0 {
        dt.min(MAX_DT)
    } else {
        NOMINAL_DT
    }
}
