//! Cartesian bases for degrees 0 to 2 and the equivariant bilinear maps between them.
//!
//! Degree 1 components are `(x, y, z)`. Degree 2 components are coordinates
//! in a Frobenius-orthonormal basis of symmetric traceless 3x3 matrices:
//!
//! ```text
//! B0 ~ xy      B1 ~ yz      B2 ~ 2zz - xx - yy      B3 ~ xz      B4 ~ xx - yy
//! ```
//!
//! Because the basis is orthonormal, rotating a degree 2 feature is
//! `M -> R M R^T` followed by projection back onto the basis, which is what
//! [`wigner_d`] computes.

use crate::types::Rotation3;

type Mat3 = [[f64; 3]; 3];

const S: f64 = core::f64::consts::FRAC_1_SQRT_2;
// 1 / sqrt(6)
const T: f64 = 0.408_248_290_463_863_f64;

/// Orthonormal symmetric traceless basis, indexed by degree 2 component.
pub const L2_BASIS: [Mat3; 5] = [
    [[0.0, S, 0.0], [S, 0.0, 0.0], [0.0, 0.0, 0.0]],
    [[0.0, 0.0, 0.0], [0.0, 0.0, S], [0.0, S, 0.0]],
    [[-T, 0.0, 0.0], [0.0, -T, 0.0], [0.0, 0.0, 2.0 * T]],
    [[0.0, 0.0, S], [0.0, 0.0, 0.0], [S, 0.0, 0.0]],
    [[S, 0.0, 0.0], [0.0, -S, 0.0], [0.0, 0.0, 0.0]],
];

/// Symmetric traceless matrix with the given degree 2 coordinates.
pub fn l2_to_matrix(v: &[f64]) -> Mat3 {
    let mut m = [[0.0; 3]; 3];
    for (c, b) in v.iter().zip(L2_BASIS.iter()) {
        for i in 0..3 {
            for j in 0..3 {
                m[i][j] += c * b[i][j];
            }
        }
    }
    m
}

/// Degree 2 coordinates of the symmetric traceless part of `m`.
pub fn matrix_to_l2(m: &Mat3) -> [f64; 5] {
    let mut out = [0.0; 5];
    for (o, b) in out.iter_mut().zip(L2_BASIS.iter()) {
        *o = frobenius(m, b);
    }
    out
}

fn frobenius(a: &Mat3, b: &Mat3) -> f64 {
    let mut acc = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            acc += a[i][j] * b[i][j];
        }
    }
    acc
}

fn matmul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut m = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            m[i][j] = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    m
}

fn transpose(a: &Mat3) -> Mat3 {
    let mut m = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            m[i][j] = a[j][i];
        }
    }
    m
}

fn sub(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut m = *a;
    for i in 0..3 {
        for j in 0..3 {
            m[i][j] -= b[i][j];
        }
    }
    m
}

fn add(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut m = *a;
    for i in 0..3 {
        for j in 0..3 {
            m[i][j] += b[i][j];
        }
    }
    m
}

/// Skew matrix `[u]x` with `[u]x v = u x v`.
fn skew(u: &[f64]) -> Mat3 {
    [[0.0, -u[2], u[1]], [u[2], 0.0, -u[0]], [-u[1], u[0], 0.0]]
}

fn rotation_f64(r: &Rotation3) -> Mat3 {
    let m = r.matrix();
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = m[i][j] as f64;
        }
    }
    out
}

/// Representation matrix of `rotation` on degree `l`, row-major `[2l+1, 2l+1]`.
///
/// Degrees above 2 are not representable and yield an empty vector.
pub fn wigner_d(l: u32, rotation: &Rotation3) -> Vec<f32> {
    match l {
        0 => vec![1.0],
        1 => rotation.matrix().iter().flatten().copied().collect(),
        2 => {
            let r = rotation_f64(rotation);
            let rt = transpose(&r);
            let mut out = vec![0.0f32; 25];
            for (m, b) in L2_BASIS.iter().enumerate() {
                let rotated = matmul(&matmul(&r, b), &rt);
                let coords = matrix_to_l2(&rotated);
                for (k, c) in coords.iter().enumerate() {
                    out[k * 5 + m] = *c as f32;
                }
            }
            out
        }
        _ => Vec::new(),
    }
}

/// Equivariant bilinear map from degrees `(l1, l2)` to degree `l3`.
///
/// Returns `None` when the triple is not a valid coupling or exceeds degree 2.
/// The maps are unnormalised; [`crate::coupling`] rescales them.
pub fn bilinear(l1: u32, l2: u32, l3: u32, a: &[f64], b: &[f64]) -> Option<Vec<f64>> {
    let out = match (l1, l2, l3) {
        (0, _, _) if l2 == l3 && l2 <= 2 => b.iter().map(|x| a[0] * x).collect(),
        (_, 0, _) if l1 == l3 && l1 <= 2 => a.iter().map(|x| x * b[0]).collect(),
        (1, 1, 0) => vec![a[0] * b[0] + a[1] * b[1] + a[2] * b[2]],
        (1, 1, 1) => vec![
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ],
        (1, 1, 2) => {
            let mut outer = [[0.0; 3]; 3];
            for i in 0..3 {
                for j in 0..3 {
                    outer[i][j] = a[i] * b[j];
                }
            }
            matrix_to_l2(&outer).to_vec()
        }
        (1, 2, 1) => mat_vec(&l2_to_matrix(b), a),
        (2, 1, 1) => mat_vec(&l2_to_matrix(a), b),
        (1, 2, 2) => commutator_with_skew(a, &l2_to_matrix(b)),
        (2, 1, 2) => commutator_with_skew(b, &l2_to_matrix(a)),
        (2, 2, 0) => {
            let (ma, mb) = (l2_to_matrix(a), l2_to_matrix(b));
            vec![frobenius(&ma, &transpose(&mb))]
        }
        (2, 2, 1) => {
            let (ma, mb) = (l2_to_matrix(a), l2_to_matrix(b));
            let k = sub(&matmul(&ma, &mb), &matmul(&mb, &ma));
            vec![k[2][1], k[0][2], k[1][0]]
        }
        (2, 2, 2) => {
            let (ma, mb) = (l2_to_matrix(a), l2_to_matrix(b));
            matrix_to_l2(&add(&matmul(&ma, &mb), &matmul(&mb, &ma))).to_vec()
        }
        _ => return None,
    };
    Some(out)
}

fn mat_vec(m: &Mat3, v: &[f64]) -> Vec<f64> {
    (0..3).map(|i| (0..3).map(|j| m[i][j] * v[j]).sum()).collect()
}

fn commutator_with_skew(u: &[f64], m: &Mat3) -> Vec<f64> {
    let k = skew(u);
    matrix_to_l2(&sub(&matmul(&k, m), &matmul(m, &k))).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3;

    fn rotate(l: u32, r: &Rotation3, v: &[f64]) -> Vec<f64> {
        let d = wigner_d(l, r);
        let n = v.len();
        (0..n)
            .map(|i| (0..n).map(|j| d[i * n + j] as f64 * v[j]).sum())
            .collect()
    }

    fn sample(l: u32, seed: f64) -> Vec<f64> {
        (0..(2 * l + 1))
            .map(|i| ((i as f64 + 1.0) * seed).sin())
            .collect()
    }

    #[test]
    fn test_basis_is_orthonormal() {
        for (i, a) in L2_BASIS.iter().enumerate() {
            for (j, b) in L2_BASIS.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((frobenius(a, b) - expected).abs() < 1e-12);
            }
            let trace = a[0][0] + a[1][1] + a[2][2];
            assert!(trace.abs() < 1e-12);
        }
    }

    #[test]
    fn test_l2_roundtrip() {
        let v = [0.3, -1.2, 0.5, 2.0, -0.7];
        let back = matrix_to_l2(&l2_to_matrix(&v));
        for (a, b) in v.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_wigner_d_is_a_homomorphism() {
        let r1 = Rotation3::from_euler_zyz(0.3, 0.9, -1.4);
        let r2 = Rotation3::from_axis_angle(Point3::new(1.0, 2.0, -0.5), 0.8);
        let r12 = r1.compose(&r2);
        let v = sample(2, 0.7);
        let lhs = rotate(2, &r12, &v);
        let rhs = rotate(2, &r1, &rotate(2, &r2, &v));
        for (a, b) in lhs.iter().zip(rhs.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_bilinear_maps_are_equivariant() {
        let r = Rotation3::from_euler_zyz(1.1, -0.4, 2.3);
        for l1 in 0..=2u32 {
            for l2 in 0..=2u32 {
                for l3 in l1.abs_diff(l2)..=(l1 + l2).min(2) {
                    let a = sample(l1, 0.9);
                    let b = sample(l2, 1.7);
                    let out = bilinear(l1, l2, l3, &a, &b).unwrap();
                    let out_rot = bilinear(l1, l2, l3, &rotate(l1, &r, &a), &rotate(l2, &r, &b))
                        .unwrap();
                    let expected = rotate(l3, &r, &out);
                    for (x, y) in out_rot.iter().zip(expected.iter()) {
                        assert!((x - y).abs() < 1e-5, "({}, {}, {}): {} vs {}", l1, l2, l3, x, y);
                    }
                }
            }
        }
    }

    #[test]
    fn test_bilinear_rejects_invalid_triples() {
        assert!(bilinear(1, 1, 3, &[0.0; 3], &[0.0; 3]).is_none());
        assert!(bilinear(0, 1, 2, &[1.0], &[0.0; 3]).is_none());
        assert!(bilinear(2, 2, 3, &[0.0; 5], &[0.0; 5]).is_none());
    }
}
