//! Triangular-lattice mirror mapping.
//!
//! CPU reference of `shaders/hex_mirror.wgsl`. Both fold the plane into one
//! fundamental triangle of the equilateral lattice spanned by [`B1`] and
//! [`B2`], then map the folded point back into mirrored texture space.

use crate::constants::*;
use crate::raster::Pixmap;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;

pub const SQRT3: f32 = 1.732_050_8;
pub const B1: Vec2 = Vec2::new(1.0, 0.0);
pub const B2: Vec2 = Vec2::new(0.5, SQRT3 * 0.5);

/// Coordinates of `p` in the (B1, B2) basis, via the reciprocal basis
/// `(1, -1/√3)` and `(0, 2/√3)`.
#[inline]
pub fn lattice_coords(p: Vec2) -> Vec2 {
    Vec2::new(p.x - p.y / SQRT3, 2.0 * p.y / SQRT3)
}

/// Fold `p` into the fundamental triangle. Invariant under translation by
/// any lattice vector.
pub fn tri_fold(p: Vec2) -> Vec2 {
    let l = lattice_coords(p);
    let mut u = l.x - l.x.floor() - 0.5;
    let mut v = l.y - l.y.floor() - 0.5;
    if u + v > 0.0 {
        (u, v) = (-v, -u);
    }
    B1 * u + B2 * v
}

/// Same convention as the shader's `rot`.
#[inline]
pub fn rotate(p: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(c * p.x + s * p.y, -s * p.x + c * p.y)
}

/// Mirror-repeat into \[0, 1\]: `abs(mod(c, 2) - 1)`.
#[inline]
pub fn mirror_repeat(c: f32) -> f32 {
    (c.rem_euclid(2.0) - 1.0).abs()
}

#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// View parameters of the texture mirror.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MirrorView {
    pub angle: f32,
    pub tile: f32,
    pub zoom: f32,
}

impl Default for MirrorView {
    fn default() -> Self {
        Self {
            angle: MIRROR_DEFAULT_ANGLE,
            tile: MIRROR_DEFAULT_TILE,
            zoom: MIRROR_DEFAULT_ZOOM,
        }
    }
}

impl MirrorView {
    /// Texture coordinate in \[0, 1\]² for screen `uv` (y up) on a surface of
    /// `resolution` pixels.
    pub fn source_uv(&self, uv: Vec2, resolution: Vec2) -> Vec2 {
        let ar = resolution.x / resolution.y.max(1.0);
        let mut p = uv - Vec2::splat(0.5);
        p.x *= ar;
        p *= MIRROR_PRESCALE * self.tile;
        p = rotate(p, self.angle);

        let mut src = tri_fold(p);
        src.x /= ar;
        src = rotate(src, -self.angle * MIRROR_SOURCE_ANGLE_RATIO);
        src /= self.zoom.max(0.001);
        src += Vec2::splat(0.5);
        Vec2::new(mirror_repeat(src.x), mirror_repeat(src.y))
    }

    /// Brightness multiplier, 1 near the center fading to 0 at the rim.
    pub fn vignette(&self, uv: Vec2, resolution: Vec2) -> f32 {
        let ar = resolution.x / resolution.y.max(1.0);
        let r = ((uv - Vec2::splat(0.5)) * Vec2::new(ar, 1.0)).length();
        smoothstep(MIRROR_VIGNETTE_OUTER, MIRROR_VIGNETTE_INNER, r)
    }

    pub fn uniforms(&self, resolution: [f32; 2], time: f32) -> HexMirrorUniforms {
        HexMirrorUniforms {
            resolution,
            time,
            angle: self.angle,
            tile: self.tile,
            zoom: self.zoom,
            _pad: [0.0; 2],
        }
    }

    /// Software rendition of the mirror shader.
    pub fn render(&self, source: &Pixmap, target: &mut Pixmap) {
        let (w, h) = (target.width(), target.height());
        let res = Vec2::new(w as f32, h as f32);
        let (sw, sh) = (source.width() as f32, source.height() as f32);
        for y in 0..h {
            for x in 0..w {
                let uv = Vec2::new((x as f32 + 0.5) / res.x, 1.0 - (y as f32 + 0.5) / res.y);
                let m = self.source_uv(uv, res);
                // texture rows run top-down, uv runs bottom-up
                let mut px = source.sample(m.x * sw, (1.0 - m.y) * sh);
                let vig = self.vignette(uv, res);
                px[0] *= vig;
                px[1] *= vig;
                px[2] *= vig;
                target.set_pixel(x, y, px);
            }
        }
    }
}

/// Uniform block of `hex_mirror.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct HexMirrorUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub angle: f32,
    pub tile: f32,
    pub zoom: f32,
    pub _pad: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_coords_reconstruct_point() {
        let p = Vec2::new(0.37, -1.21);
        let l = lattice_coords(p);
        assert!((B1 * l.x + B2 * l.y - p).length() < 1e-5);
    }

    #[test]
    fn mirror_repeat_folds_into_unit_range() {
        assert_eq!(mirror_repeat(1.0), 0.0);
        assert_eq!(mirror_repeat(0.0), 1.0);
        assert!((mirror_repeat(-0.25) - 0.75).abs() < 1e-6);
        assert!((mirror_repeat(2.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn uniforms_are_32_bytes() {
        assert_eq!(std::mem::size_of::<HexMirrorUniforms>(), 32);
    }
}
