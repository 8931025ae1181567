//! Process-wide table of coupling coefficients.
//!
//! For every valid triple `(l1, l2, l3)` with all degrees at most
//! [`MAX_DEGREE`] the table holds a dense tensor `C[i][j][k]` such that
//!
//! ```text
//! out_k = sum_ij C[i][j][k] * a_i * b_j
//! ```
//!
//! is equivariant. Each tensor has unit Frobenius norm. The table is built on
//! first access and is read-only afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::basis::bilinear;
use crate::irreps::MAX_DEGREE;

/// Coefficients of one coupling path, row-major `[d1, d2, d3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Coupling {
    /// Degrees `(l1, l2, l3)`.
    pub degrees: (u32, u32, u32),
    /// Dense coefficients.
    pub values: Vec<f32>,
}

impl Coupling {
    /// Dimensions `[2 l1 + 1, 2 l2 + 1, 2 l3 + 1]`.
    pub fn dims(&self) -> [usize; 3] {
        let (l1, l2, l3) = self.degrees;
        [2 * l1 as usize + 1, 2 * l2 as usize + 1, 2 * l3 as usize + 1]
    }

    /// Contract the coefficients with two input vectors.
    pub fn apply(&self, a: &[f32], b: &[f32]) -> Vec<f32> {
        let [d1, d2, d3] = self.dims();
        let mut out = vec![0.0f32; d3];
        for i in 0..d1 {
            for j in 0..d2 {
                let ab = a[i] * b[j];
                let base = (i * d2 + j) * d3;
                for (k, o) in out.iter_mut().enumerate() {
                    *o += self.values[base + k] * ab;
                }
            }
        }
        out
    }
}

/// All coupling paths keyed by `(l1, l2)`, each list ordered by `l3`.
#[derive(Debug)]
pub struct CouplingTable {
    paths: HashMap<(u32, u32), Vec<Coupling>>,
}

impl CouplingTable {
    fn build() -> Self {
        let mut paths = HashMap::new();
        for l1 in 0..=MAX_DEGREE {
            for l2 in 0..=MAX_DEGREE {
                let lo = l1.abs_diff(l2);
                let hi = (l1 + l2).min(MAX_DEGREE);
                let list = (lo..=hi).filter_map(|l3| build_path(l1, l2, l3)).collect();
                paths.insert((l1, l2), list);
            }
        }
        Self { paths }
    }

    /// Paths out of `(l1, l2)`, ordered by output degree.
    pub fn paths(&self, l1: u32, l2: u32) -> &[Coupling] {
        self.paths.get(&(l1, l2)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The path `(l1, l2) -> l3`, if it exists.
    pub fn get(&self, l1: u32, l2: u32, l3: u32) -> Option<&Coupling> {
        self.paths(l1, l2).iter().find(|c| c.degrees.2 == l3)
    }
}

fn build_path(l1: u32, l2: u32, l3: u32) -> Option<Coupling> {
    let (d1, d2, d3) = (2 * l1 as usize + 1, 2 * l2 as usize + 1, 2 * l3 as usize + 1);
    let mut values = vec![0.0f64; d1 * d2 * d3];
    for i in 0..d1 {
        for j in 0..d2 {
            let mut a = vec![0.0; d1];
            let mut b = vec![0.0; d2];
            a[i] = 1.0;
            b[j] = 1.0;
            let out = bilinear(l1, l2, l3, &a, &b)?;
            let base = (i * d2 + j) * d3;
            values[base..base + d3].copy_from_slice(&out);
        }
    }
    let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        return None;
    }
    Some(Coupling {
        degrees: (l1, l2, l3),
        values: values.iter().map(|v| (v / norm) as f32).collect(),
    })
}

static TABLE: OnceLock<CouplingTable> = OnceLock::new();

/// The shared coupling table, built on first use.
pub fn coupling_table() -> &'static CouplingTable {
    TABLE.get_or_init(CouplingTable::build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_all_valid_triples() {
        let table = coupling_table();
        let mut count = 0;
        for l1 in 0..=MAX_DEGREE {
            for l2 in 0..=MAX_DEGREE {
                for c in table.paths(l1, l2) {
                    assert!(c.degrees.2 >= l1.abs_diff(l2));
                    assert!(c.degrees.2 <= l1 + l2);
                    count += 1;
                }
            }
        }
        // (0, l): 3, (l > 0, 0): 2, (1, 1): 3, (1, 2): 2, (2, 1): 2, (2, 2): 3
        assert_eq!(count, 3 + 2 + 3 + 2 + 2 + 3);
    }

    #[test]
    fn test_unit_norm() {
        let table = coupling_table();
        let c = table.get(1, 1, 2).unwrap();
        let norm: f32 = c.values.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scalar_path_is_scaled_identity() {
        let c = coupling_table().get(0, 1, 1).unwrap();
        let out = c.apply(&[2.0], &[1.0, -1.0, 0.5]);
        let s = 1.0 / 3.0f32.sqrt();
        assert!((out[0] - 2.0 * s).abs() < 1e-6);
        assert!((out[1] + 2.0 * s).abs() < 1e-6);
        assert!((out[2] - s).abs() < 1e-6);
    }

    #[test]
    fn test_missing_path() {
        assert!(coupling_table().get(2, 2, 3).is_none());
        assert!(coupling_table().get(0, 2, 1).is_none());
    }
}
