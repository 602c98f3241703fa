use crate::error::ParamError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Straight-alpha color with channels in \[0, 1\], in sRGB encoding (the same
/// space a 2D canvas fills in).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..self }
    }

    /// Alpha given as a byte, like the `"80"` suffix appended to a hex color.
    pub fn with_alpha8(self, a: u8) -> Self {
        self.with_alpha(a as f32 / 255.0)
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(s: &str) -> Result<Self, ParamError> {
        let bad = || ParamError::InvalidColor(s.to_string());
        let digits = s.trim().strip_prefix('#').ok_or_else(bad)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let nibble = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16);
        let (r, g, b, a) = match digits.len() {
            3 => (nibble(0), nibble(1), nibble(2), Ok(255)),
            4 => (nibble(0), nibble(1), nibble(2), nibble(3)),
            6 => (byte(0), byte(2), byte(4), Ok(255)),
            8 => (byte(0), byte(2), byte(4), byte(6)),
            _ => return Err(bad()),
        };
        match (r, g, b, a) {
            (Ok(r), Ok(g), Ok(b), Ok(a)) => Ok(Self::from_rgb8(r, g, b).with_alpha8(a)),
            _ => Err(bad()),
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    /// CSS `rgba()` string for canvas fill and shadow styles.
    pub fn to_css(self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("rgba({r},{g},{b},{:.4})", self.a.clamp(0.0, 1.0))
    }

    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Rgba {
        let hue = hue.rem_euclid(360.0);
        let c = value * saturation;
        let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
        let m = value - c;
        let (r, g, b) = match (hue / 60.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Rgba::rgb(r + m, g + m, b + m)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgba {
    type Error = ParamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgba::from_hex(&value)
    }
}

impl From<Rgba> for String {
    fn from(value: Rgba) -> Self {
        value.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_hex_forms() {
        assert_eq!(Rgba::from_hex("#fff").unwrap(), Rgba::WHITE);
        assert_eq!(Rgba::from_hex("#000000").unwrap(), Rgba::BLACK);
        let c = Rgba::from_hex("#ff000080").unwrap();
        assert_eq!(c.to_rgba8(), [255, 0, 0, 128]);
        assert_eq!(Rgba::from_hex("#0000").unwrap().a, 0.0);
    }

    #[test]
    fn rejects_malformed_hex() {
        for s in ["", "fff", "#ff", "#gggggg", "#1234567"] {
            assert!(Rgba::from_hex(s).is_err(), "{s} should be rejected");
        }
    }

    #[test]
    fn hex_round_trips_through_string() {
        let c = Rgba::from_hex("#f72585").unwrap();
        assert_eq!(c.to_hex(), "#f72585");
        assert_eq!(String::from(c.with_alpha8(0xaa)), "#f72585aa");
    }

    #[test]
    fn hsv_primary_hues() {
        assert_eq!(Rgba::from_hsv(0.0, 1.0, 1.0).to_rgba8(), [255, 0, 0, 255]);
        assert_eq!(Rgba::from_hsv(120.0, 1.0, 1.0).to_rgba8(), [0, 255, 0, 255]);
        assert_eq!(Rgba::from_hsv(240.0, 1.0, 1.0).to_rgba8(), [0, 0, 255, 255]);
        assert_eq!(Rgba::from_hsv(360.0, 1.0, 1.0).to_rgba8(), [255, 0, 0, 255]);
    }
}
