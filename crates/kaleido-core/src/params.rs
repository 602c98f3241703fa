//! Kaleidoscope parameter state.
//!
//! [`KaleidoParams`] is plain data: every frame reads one snapshot of it. All
//! mutation goes through [`crate::ParamStore`], which also owns the resource
//! handles behind url-backed texture and audio sources.

use crate::color::Rgba;
use crate::constants::*;
use crate::error::ParamError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which procedural style the 2D path draws.
///
/// `Photo` routes to the texture mirror when a texture is attached; without
/// one the 2D path falls back to the mandala.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleMode {
    #[default]
    Mandala,
    Mosaic,
    Rosette,
    Stained,
    Photo,
    Floral,
}

impl StyleMode {
    pub const ALL: [StyleMode; 6] = [
        StyleMode::Mandala,
        StyleMode::Mosaic,
        StyleMode::Rosette,
        StyleMode::Stained,
        StyleMode::Photo,
        StyleMode::Floral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StyleMode::Mandala => "mandala",
            StyleMode::Mosaic => "mosaic",
            StyleMode::Rosette => "rosette",
            StyleMode::Stained => "stained",
            StyleMode::Photo => "photo",
            StyleMode::Floral => "floral",
        }
    }
}

impl FromStr for StyleMode {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StyleMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParamError::UnknownStyle(s.to_string()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TextureSource {
    #[default]
    None,
    Image {
        url: String,
    },
    Video {
        url: String,
    },
    Camera,
}

impl TextureSource {
    pub fn is_none(&self) -> bool {
        matches!(self, TextureSource::None)
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            TextureSource::Image { url } | TextureSource::Video { url } => Some(url),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AudioSource {
    #[default]
    None,
    Microphone,
    File {
        url: String,
    },
}

impl AudioSource {
    pub fn is_active(&self) -> bool {
        !matches!(self, AudioSource::None)
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            AudioSource::File { url } => Some(url),
            _ => None,
        }
    }
}

/// Ordered, never-empty list of colors, indexed cyclically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Rgba>", into = "Vec<Rgba>")]
pub struct Palette(Vec<Rgba>);

impl Palette {
    pub fn new(colors: Vec<Rgba>) -> Result<Self, ParamError> {
        if colors.is_empty() {
            return Err(ParamError::EmptyPalette);
        }
        Ok(Self(colors))
    }

    pub fn from_hex<S: AsRef<str>>(colors: &[S]) -> Result<Self, ParamError> {
        let parsed = colors
            .iter()
            .map(|c| Rgba::from_hex(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    /// Color at `index` modulo the palette length.
    #[inline]
    pub fn get(&self, index: usize) -> Rgba {
        self.0[index % self.0.len()]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.0
    }

    pub fn set(&mut self, index: usize, color: Rgba) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = color;
        }
    }
}

impl TryFrom<Vec<Rgba>> for Palette {
    type Error = ParamError;

    fn try_from(value: Vec<Rgba>) -> Result<Self, Self::Error> {
        Palette::new(value)
    }
}

impl From<Palette> for Vec<Rgba> {
    fn from(value: Palette) -> Self {
        value.0
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self(DEFAULT_PALETTE.iter().map(|&c| rgb_hex(c)).collect())
    }
}

pub const DEFAULT_PALETTE: [u32; PALETTE_LEN] = [0xf72585, 0xb5179e, 0x7209b7, 0x3a0ca3, 0x4cc9f0];
pub const DEFAULT_BACKGROUND: u32 = 0x0a0b10;

/// Hand-picked palettes `random_palette` draws from half of the time. The
/// warm set appears twice, so it comes up twice as often as the others.
pub const CURATED_PALETTES: [[u32; PALETTE_LEN]; 4] = [
    [0xff4d6d, 0xff9e00, 0x70e000, 0x38a3a5, 0x4361ee],
    [0xff6b6b, 0xffd93d, 0x6bcb77, 0x4d96ff, 0x845ec2],
    [0xff4d6d, 0xff9e00, 0x70e000, 0x38a3a5, 0x4361ee],
    [0x12c2e9, 0xc471ed, 0xf64f59, 0xffd166, 0x06d6a0],
];

#[inline]
pub fn rgb_hex(rgb: u32) -> Rgba {
    Rgba::from_rgb8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// The full configuration read by the renderers each frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KaleidoParams {
    pub palette: Palette,
    pub segments: u32,
    pub speed: f32,
    pub glow: f32,
    pub background: Rgba,
    pub style: StyleMode,
    pub texture: TextureSource,
    pub audio: AudioSource,
    pub audio_sensitivity: f32,
    pub tilt_enabled: bool,
}

impl Default for KaleidoParams {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            segments: 10,
            speed: 0.6,
            glow: 0.4,
            background: rgb_hex(DEFAULT_BACKGROUND),
            style: StyleMode::Mandala,
            texture: TextureSource::None,
            audio: AudioSource::None,
            audio_sensitivity: 1.0,
            tilt_enabled: false,
        }
    }
}

/// Partial update from the settings surface. Absent fields are left alone.
///
/// Texture and audio sources are not part of the patch: they carry resource
/// handles and go through the store's attach/detach calls instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamsPatch {
    pub palette: Option<Palette>,
    pub segments: Option<u32>,
    pub speed: Option<f32>,
    pub glow: Option<f32>,
    pub background: Option<Rgba>,
    pub style: Option<StyleMode>,
    pub audio_sensitivity: Option<f32>,
    pub tilt_enabled: Option<bool>,
}

/// Which consumers must react to an applied patch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    /// Style or texture changed: the active render pipeline is replaced.
    pub pipeline: bool,
    /// Audio source changed: the analysis graph is rebuilt.
    pub audio: bool,
    /// Anything else (palette, sliders, background, tilt flag).
    pub visuals: bool,
}

impl Changes {
    pub fn any(self) -> bool {
        self.pipeline || self.audio || self.visuals
    }
}

// NaN never reaches the params; infinities clamp to the range ends.
fn clamp_finite(value: f32, lo: f32, hi: f32) -> Option<f32> {
    (!value.is_nan()).then(|| value.clamp(lo, hi))
}

impl KaleidoParams {
    /// Apply a patch, clamping numbers into range. Returns what changed.
    pub fn apply(&mut self, patch: &ParamsPatch) -> Changes {
        let mut changes = Changes::default();
        if let Some(p) = &patch.palette {
            if *p != self.palette {
                self.palette = p.clone();
                changes.visuals = true;
            }
        }
        if let Some(s) = patch.segments {
            let s = s.clamp(SEGMENTS_MIN, SEGMENTS_MAX);
            if s != self.segments {
                self.segments = s;
                changes.visuals = true;
            }
        }
        if let Some(v) = patch.speed.and_then(|v| clamp_finite(v, 0.0, SPEED_MAX)) {
            changes.visuals |= v != self.speed;
            self.speed = v;
        }
        if let Some(v) = patch.glow.and_then(|v| clamp_finite(v, 0.0, GLOW_MAX)) {
            changes.visuals |= v != self.glow;
            self.glow = v;
        }
        if let Some(bg) = patch.background {
            let bg = bg.with_alpha(1.0);
            changes.visuals |= bg != self.background;
            self.background = bg;
        }
        if let Some(style) = patch.style {
            if style != self.style {
                self.style = style;
                changes.pipeline = true;
            }
        }
        if let Some(v) = patch
            .audio_sensitivity
            .and_then(|v| clamp_finite(v, SENSITIVITY_MIN, SENSITIVITY_MAX))
        {
            changes.visuals |= v != self.audio_sensitivity;
            self.audio_sensitivity = v;
        }
        if let Some(t) = patch.tilt_enabled {
            changes.visuals |= t != self.tilt_enabled;
            self.tilt_enabled = t;
        }
        changes
    }

    /// Re-roll palette, segments, speed, glow and background.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.segments = rng.gen_range(RANDOM_SEGMENTS.0..RANDOM_SEGMENTS.1);
        self.speed = round2(rng.gen_range(RANDOM_SPEED.0..RANDOM_SPEED.1));
        self.glow = round2(rng.gen_range(RANDOM_GLOW.0..RANDOM_GLOW.1));
        self.palette = random_palette(rng, PALETTE_LEN);
        self.background = Rgba::from_rgb8(
            rng.gen_range(5..20),
            rng.gen_range(5..20),
            rng.gen_range(8..26),
        );
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

/// Half the time a curated palette, otherwise `size` HSV colors with evenly
/// spaced hues starting at a random angle.
pub fn random_palette<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Palette {
    let size = size.max(1);
    if size == PALETTE_LEN && rng.gen_bool(0.5) {
        let pick = CURATED_PALETTES[rng.gen_range(0..CURATED_PALETTES.len())];
        return Palette(pick.iter().map(|&c| rgb_hex(c)).collect());
    }
    let base = rng.gen_range(0..360) as f32;
    let step = 360.0 / size as f32;
    let colors = (0..size)
        .map(|i| {
            let s = rng.gen_range(0.65..0.95);
            let v = rng.gen_range(0.75..1.0);
            Rgba::from_hsv(base + i as f32 * step, s, v)
        })
        .collect();
    Palette(colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_parses_case_insensitively() {
        assert_eq!("Rosette".parse::<StyleMode>().unwrap(), StyleMode::Rosette);
        assert!("spiral".parse::<StyleMode>().is_err());
    }

    #[test]
    fn palette_indexes_cyclically() {
        let p = Palette::from_hex(&["#ff0000", "#00ff00"]).unwrap();
        assert_eq!(p.get(0), p.get(2));
        assert_eq!(p.get(1), p.get(7));
    }

    #[test]
    fn warm_curated_palette_has_double_weight() {
        let warm = CURATED_PALETTES[0];
        let hits = CURATED_PALETTES.iter().filter(|p| **p == warm).count();
        assert_eq!(hits, 2);
        assert_eq!(CURATED_PALETTES[2], warm);
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert_eq!(Palette::new(vec![]), Err(ParamError::EmptyPalette));
    }
}
