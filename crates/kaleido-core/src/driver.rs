//! Per-frame orchestration shared by both front-ends.
//!
//! The front-end owns the callback scheduling and the actual renderers; the
//! [`FrameDriver`] owns the transient state (clock, smoothed position, audio
//! buffer) and turns a params snapshot into a [`FramePlan`].

use crate::color::Rgba;
use crate::compositor::{dynamic_glow, PatternFrame, WedgeLayout};
use crate::lattice::MirrorView;
use crate::params::{KaleidoParams, StyleMode, TextureSource};
use crate::signal::{clamp_dt, AudioDrive, Clock, EnergyMeter, FrameTimer, PositionSampler, Spectrum};
use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPath {
    /// Pattern synthesis plus wedge compositing.
    Pattern,
    /// GPU lattice mirror over the attached texture.
    TextureMirror,
}

/// The mirror runs only when a texture source is attached and its media can
/// be decoded; everything else falls back to the pattern path.
pub fn select_path(params: &KaleidoParams, media_ready: bool) -> RenderPath {
    match params.texture {
        TextureSource::None => RenderPath::Pattern,
        _ if media_ready => RenderPath::TextureMirror,
        _ => RenderPath::Pattern,
    }
}

/// What one frame should draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePlan {
    pub path: RenderPath,
    pub time: f64,
    pub position: Vec2,
    pub audio: AudioDrive,
    pub layout: WedgeLayout,
    pub glow: f32,
    pub style: StyleMode,
    pub background: Rgba,
    pub mirror: MirrorView,
}

impl FramePlan {
    pub fn pattern_frame<'a>(&self, params: &'a KaleidoParams) -> PatternFrame<'a> {
        PatternFrame {
            style: self.style,
            time: self.time,
            palette: &params.palette,
            background: self.background,
            glow: self.glow,
            layout: self.layout,
        }
    }
}

#[derive(Debug, Default)]
pub struct FrameDriver {
    clock: Clock,
    position: PositionSampler,
    meter: EnergyMeter,
    timer: FrameTimer,
    mirror: MirrorView,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer(&mut self, uv: [f32; 2]) {
        self.position.pointer(uv);
    }

    pub fn orientation(&mut self, beta: f32, gamma: f32, tilt_enabled: bool) {
        self.position.orientation(beta, gamma, tilt_enabled);
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Plan a frame from a measured delta.
    pub fn tick(
        &mut self,
        params: &KaleidoParams,
        spectrum: Option<&mut dyn Spectrum>,
        media_ready: bool,
    ) -> FramePlan {
        let dt = self.timer.tick();
        self.plan(params, dt, spectrum, media_ready)
    }

    /// Plan a frame advancing the clock by `dt` seconds at the params speed.
    pub fn plan(
        &mut self,
        params: &KaleidoParams,
        dt: f32,
        spectrum: Option<&mut dyn Spectrum>,
        media_ready: bool,
    ) -> FramePlan {
        let active = params.audio.is_active();
        let energy = if active { self.meter.sample(spectrum) } else { 0.0 };
        let audio = AudioDrive {
            active,
            energy,
            sensitivity: params.audio_sensitivity,
        };
        let time = self.clock.advance(clamp_dt(dt) * params.speed, audio.boost());
        let position = self.position.sample(params.tilt_enabled);
        FramePlan {
            path: select_path(params, media_ready),
            time,
            position,
            audio,
            layout: WedgeLayout::new(params.segments, position, &audio),
            glow: dynamic_glow(params.glow, audio.glow_boost()),
            style: params.style,
            background: params.background,
            mirror: self.mirror,
        }
    }

    /// Drop transient state when the pipeline restarts.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.position.reset();
        self.meter.reset();
        self.timer.reset();
    }
}
