//! Irreducible-representation bookkeeping for O(3) feature vectors.
//!
//! A feature vector is a concatenation of blocks. Each block holds `mul`
//! copies of one irrep of degree `l` and parity `p`, stored multiplicity-major
//! as `[mul, 2l + 1]`. The textual form follows the usual convention:
//!
//! ```text
//! "8x0e+4x1o+2x2e"   // 8 scalars, 4 vectors, 2 rank-2 symmetric traceless tensors
//! ```
//!
//! Only degrees up to [`MAX_DEGREE`] are representable.

use core::fmt;
use core::ops::Range;
use core::str::FromStr;

use crate::basis::wigner_d;
use crate::error::{EdfCoreError, Result};
use crate::types::Rotation3;

/// Largest supported degree.
pub const MAX_DEGREE: u32 = 2;

/// Behaviour under inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parity {
    /// Unchanged by inversion (`e`).
    Even,
    /// Sign flip under inversion (`o`).
    Odd,
}

impl Parity {
    /// Parity of a product of two features.
    #[inline]
    pub fn compose(self, other: Parity) -> Parity {
        if self == other {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    /// Parity of the degree-`l` spherical harmonic, `(-1)^l`.
    #[inline]
    pub fn of_harmonic(l: u32) -> Parity {
        if l % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }
}

/// A single irrep: degree and parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Irrep {
    /// Degree (angular momentum).
    pub l: u32,
    /// Parity.
    pub p: Parity,
}

impl Irrep {
    /// Create an irrep, rejecting degrees above [`MAX_DEGREE`].
    pub fn new(l: u32, p: Parity) -> Result<Self> {
        if l > MAX_DEGREE {
            return Err(EdfCoreError::UnsupportedDegree {
                degree: l,
                max: MAX_DEGREE,
            });
        }
        Ok(Self { l, p })
    }

    /// The even scalar `0e`.
    pub const SCALAR: Irrep = Irrep {
        l: 0,
        p: Parity::Even,
    };

    /// Number of components, `2l + 1`.
    #[inline]
    pub const fn dim(&self) -> usize {
        2 * self.l as usize + 1
    }

    /// Whether this is a degree-0 irrep (of either parity).
    #[inline]
    pub const fn is_scalar(&self) -> bool {
        self.l == 0
    }

    /// Irreps `l3` reachable by coupling `self` with `other`.
    pub fn couplings(&self, other: &Irrep) -> Vec<Irrep> {
        let lo = self.l.abs_diff(other.l);
        let hi = (self.l + other.l).min(MAX_DEGREE);
        let p = self.p.compose(other.p);
        (lo..=hi).map(|l| Irrep { l, p }).collect()
    }

    /// Sort key placing lower degrees first and even before odd.
    #[inline]
    fn sort_key(&self) -> (u32, Parity) {
        (self.l, self.p)
    }
}

impl fmt::Display for Irrep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = match self.p {
            Parity::Even => 'e',
            Parity::Odd => 'o',
        };
        write!(f, "{}{}", self.l, p)
    }
}

impl FromStr for Irrep {
    type Err = EdfCoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |reason| EdfCoreError::InvalidIrreps {
            input: s.to_string(),
            reason,
        };
        let tag_at = s
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .ok_or_else(|| invalid("empty irrep"))?;
        let (digits, tag) = s.split_at(tag_at);
        let l: u32 = digits.parse().map_err(|_| invalid("degree is not an integer"))?;
        let p = match tag {
            "e" => Parity::Even,
            "o" => Parity::Odd,
            "y" => Parity::of_harmonic(l),
            _ => return Err(invalid("parity must be 'e', 'o' or 'y'")),
        };
        Irrep::new(l, p)
    }
}

/// `mul` copies of one irrep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MulIrrep {
    /// Multiplicity.
    pub mul: usize,
    /// The repeated irrep.
    pub ir: Irrep,
}

impl MulIrrep {
    /// Number of components in this block, `mul * (2l + 1)`.
    #[inline]
    pub const fn dim(&self) -> usize {
        self.mul * self.ir.dim()
    }
}

impl fmt::Display for MulIrrep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.mul, self.ir)
    }
}

/// An ordered irrep signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Irreps {
    blocks: Vec<MulIrrep>,
}

impl Irreps {
    /// Build from explicit blocks.
    pub fn new(blocks: Vec<MulIrrep>) -> Self {
        Self { blocks }
    }

    /// Signature with no blocks (dimension 0).
    pub fn empty() -> Self {
        Self::default()
    }

    /// `mul` copies of a single irrep.
    pub fn single(mul: usize, ir: Irrep) -> Self {
        Self {
            blocks: vec![MulIrrep { mul, ir }],
        }
    }

    /// `mul` even scalars.
    pub fn scalars(mul: usize) -> Self {
        Self::single(mul, Irrep::SCALAR)
    }

    /// Signature of the stacked spherical harmonics `Y_0 .. Y_lmax`.
    pub fn spherical_harmonics(lmax: u32) -> Result<Self> {
        (0..=lmax)
            .map(|l| Irrep::new(l, Parity::of_harmonic(l)).map(|ir| MulIrrep { mul: 1, ir }))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// Blocks in order.
    #[inline]
    pub fn blocks(&self) -> &[MulIrrep] {
        &self.blocks
    }

    /// Iterate over blocks.
    pub fn iter(&self) -> impl Iterator<Item = &MulIrrep> {
        self.blocks.iter()
    }

    /// Number of blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the signature has no blocks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of components.
    pub fn dim(&self) -> usize {
        self.blocks.iter().map(MulIrrep::dim).sum()
    }

    /// Total number of irrep copies (sum of multiplicities).
    pub fn num_irreps(&self) -> usize {
        self.blocks.iter().map(|b| b.mul).sum()
    }

    /// Largest degree present, or 0 when empty.
    pub fn lmax(&self) -> u32 {
        self.blocks.iter().map(|b| b.ir.l).max().unwrap_or(0)
    }

    /// Component range of each block inside the flat feature vector.
    pub fn slices(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.blocks
            .iter()
            .map(|b| {
                let r = start..start + b.dim();
                start = r.end;
                r
            })
            .collect()
    }

    /// Total multiplicity of `ir` across all blocks.
    pub fn count(&self, ir: Irrep) -> usize {
        self.blocks.iter().filter(|b| b.ir == ir).map(|b| b.mul).sum()
    }

    /// Merge adjacent blocks carrying the same irrep and drop empty blocks.
    pub fn simplify(&self) -> Self {
        let mut out: Vec<MulIrrep> = Vec::with_capacity(self.blocks.len());
        for b in self.blocks.iter().filter(|b| b.mul > 0) {
            match out.last_mut() {
                Some(last) if last.ir == b.ir => last.mul += b.mul,
                _ => out.push(*b),
            }
        }
        Self { blocks: out }
    }

    /// Stable sort by degree, even parity first.
    pub fn sort(&self) -> Self {
        let mut blocks = self.blocks.clone();
        blocks.sort_by_key(|b| b.ir.sort_key());
        Self { blocks }
    }

    /// Multiply every multiplicity by `factor`.
    pub fn scale_mul(&self, factor: usize) -> Self {
        Self {
            blocks: self
                .blocks
                .iter()
                .map(|b| MulIrrep {
                    mul: b.mul * factor,
                    ir: b.ir,
                })
                .collect(),
        }
    }

    /// Only the degree-0 blocks, in order.
    pub fn filter_scalars(&self) -> Self {
        Self {
            blocks: self.blocks.iter().filter(|b| b.ir.is_scalar()).copied().collect(),
        }
    }

    /// Only the blocks with degree above 0, in order.
    pub fn filter_non_scalars(&self) -> Self {
        Self {
            blocks: self.blocks.iter().filter(|b| !b.ir.is_scalar()).copied().collect(),
        }
    }

    /// Concatenate two signatures.
    pub fn concat(&self, other: &Irreps) -> Self {
        let mut blocks = self.blocks.clone();
        blocks.extend_from_slice(&other.blocks);
        Self { blocks }
    }

    /// Block-diagonal representation matrix of `rotation`, row-major `[dim, dim]`.
    ///
    /// Rotating a feature vector `f` gives `D f`.
    pub fn rotation_matrix(&self, rotation: &Rotation3) -> Vec<f32> {
        let dim = self.dim();
        let mut out = vec![0.0f32; dim * dim];
        let mut offset = 0;
        for b in &self.blocks {
            let d = b.ir.dim();
            let block = wigner_d(b.ir.l, rotation);
            for _ in 0..b.mul {
                for i in 0..d {
                    for j in 0..d {
                        out[(offset + i) * dim + offset + j] = block[i * d + j];
                    }
                }
                offset += d;
            }
        }
        out
    }

    /// Apply the rotation representation to a batch of row-major feature rows.
    pub fn rotate_features(&self, rotation: &Rotation3, features: &[f32]) -> Vec<f32> {
        let dim = self.dim();
        let d = self.rotation_matrix(rotation);
        let mut out = vec![0.0f32; features.len()];
        for (row_in, row_out) in features.chunks_exact(dim).zip(out.chunks_exact_mut(dim)) {
            for i in 0..dim {
                row_out[i] = (0..dim).map(|j| d[i * dim + j] * row_in[j]).sum();
            }
        }
        out
    }
}

impl fmt::Display for Irreps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.blocks.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{}", b)?;
        }
        Ok(())
    }
}

impl FromStr for Irreps {
    type Err = EdfCoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }
        let blocks = trimmed
            .split('+')
            .map(|term| {
                let term = term.trim();
                let (mul, ir) = match term.split_once('x') {
                    Some((mul, ir)) => {
                        let mul = mul.trim().parse::<usize>().map_err(|_| {
                            EdfCoreError::InvalidIrreps {
                                input: s.to_string(),
                                reason: "multiplicity is not an integer",
                            }
                        })?;
                        (mul, ir)
                    }
                    None => (1, term),
                };
                let ir = ir.parse::<Irrep>().map_err(|e| match e {
                    EdfCoreError::InvalidIrreps { reason, .. } => EdfCoreError::InvalidIrreps {
                        input: s.to_string(),
                        reason,
                    },
                    other => other,
                })?;
                Ok(MulIrrep { mul, ir })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { blocks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let irreps: Irreps = "8x0e + 4x1o+2x2e".parse().unwrap();
        assert_eq!(irreps.len(), 3);
        assert_eq!(irreps.dim(), 8 + 12 + 10);
        assert_eq!(irreps.num_irreps(), 14);
        assert_eq!(irreps.to_string(), "8x0e+4x1o+2x2e");
    }

    #[test]
    fn test_parse_implicit_multiplicity() {
        let irreps: Irreps = "0e+1y+2y".parse().unwrap();
        assert_eq!(irreps, Irreps::spherical_harmonics(2).unwrap());
        assert_eq!(irreps.to_string(), "1x0e+1x1o+1x2e");
    }

    #[test]
    fn test_parse_rejects_high_degree() {
        let err = "4x3e".parse::<Irreps>().unwrap_err();
        assert_eq!(err, EdfCoreError::UnsupportedDegree { degree: 3, max: 2 });
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("ax0e".parse::<Irreps>().is_err());
        assert!("4x1q".parse::<Irreps>().is_err());
        assert!("".parse::<Irreps>().unwrap().is_empty());
    }

    #[test]
    fn test_slices() {
        let irreps: Irreps = "2x0e+1x1o+1x2e".parse().unwrap();
        assert_eq!(irreps.slices(), vec![0..2, 2..5, 5..10]);
    }

    #[test]
    fn test_simplify_and_sort() {
        let irreps: Irreps = "2x1o+3x0e+0x2e+1x0e+4x0o".parse().unwrap();
        let sorted = irreps.sort().simplify();
        assert_eq!(sorted.to_string(), "4x0e+4x0o+2x1o");
    }

    #[test]
    fn test_scale_and_filter() {
        let irreps: Irreps = "4x0e+2x1o".parse().unwrap();
        assert_eq!(irreps.scale_mul(3).to_string(), "12x0e+6x1o");
        assert_eq!(irreps.filter_scalars().to_string(), "4x0e");
        assert_eq!(irreps.filter_non_scalars().to_string(), "2x1o");
        assert_eq!(irreps.count(Irrep::SCALAR), 4);
    }

    #[test]
    fn test_couplings_are_capped() {
        let two = Irrep::new(2, Parity::Even).unwrap();
        let one = Irrep::new(1, Parity::Odd).unwrap();
        let ls: Vec<u32> = two.couplings(&one).iter().map(|ir| ir.l).collect();
        assert_eq!(ls, vec![1, 2]);
        assert!(two.couplings(&one).iter().all(|ir| ir.p == Parity::Odd));
    }

    #[test]
    fn test_rotation_matrix_is_orthogonal() {
        let irreps: Irreps = "1x0e+2x1o+1x2e".parse().unwrap();
        let r = Rotation3::from_euler_zyz(0.4, -1.2, 2.5);
        let d = irreps.rotation_matrix(&r);
        let n = irreps.dim();
        for i in 0..n {
            for j in 0..n {
                let dot: f32 = (0..n).map(|k| d[i * n + k] * d[j * n + k]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-5, "({}, {}) = {}", i, j, dot);
            }
        }
    }
}
