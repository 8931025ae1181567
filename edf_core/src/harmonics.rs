//! Real spherical harmonics in the Cartesian basis of [`crate::basis`].
//!
//! Normalisation is "component": each degree has squared norm `2l + 1` on the
//! unit sphere. Inputs are normalised first, so the zero vector maps to
//! `Y_0 = 1` with every higher degree zero.

use crate::types::Point3;

/// Guard against division by zero when normalising edge vectors.
pub const NORMALIZE_EPS: f32 = 1e-12;

const SQRT_3: f32 = 1.732_050_8;
const SQRT_15: f32 = 3.872_983_3;
const SQRT_5: f32 = 2.236_068;

/// Number of components of `Y_0 .. Y_lmax`.
#[inline]
pub const fn sh_dim(lmax: u32) -> usize {
    ((lmax + 1) * (lmax + 1)) as usize
}

/// Stacked `Y_0 .. Y_lmax` of `v`, with `lmax <= 2`.
pub fn spherical_harmonics(lmax: u32, v: Point3) -> Vec<f32> {
    let len = v.length().max(NORMALIZE_EPS);
    let u = v / len;
    let (x, y, z) = (u.x, u.y, u.z);

    let mut out = Vec::with_capacity(sh_dim(lmax));
    out.push(1.0);
    if lmax >= 1 {
        out.extend_from_slice(&[SQRT_3 * x, SQRT_3 * y, SQRT_3 * z]);
    }
    if lmax >= 2 {
        out.extend_from_slice(&[
            SQRT_15 * x * y,
            SQRT_15 * y * z,
            0.5 * SQRT_5 * (2.0 * z * z - x * x - y * y),
            SQRT_15 * x * z,
            0.5 * SQRT_15 * (x * x - y * y),
        ]);
    }
    out
}
