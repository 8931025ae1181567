//! Uniform cell hashing for neighbour lookups.
//!
//! Points are bucketed into cubic cells whose edge equals the search radius,
//! so every neighbour of a point lies in the 27 cells around its own cell.
//! Cell keys are hashed with FNV-1a, which is fast for small integer keys.

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

use crate::types::Point3;

const FNV_OFFSET_64: u64 = 0xcbf29ce484222325;
const FNV_PRIME_64: u64 = 0x00000100000001b3;

/// Integer coordinate of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    /// X index.
    pub x: i32,
    /// Y index.
    pub y: i32,
    /// Z index.
    pub z: i32,
}

impl CellKey {
    /// Create a new cell key.
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Cell containing `p` for cells of edge `cell_size`.
    #[inline]
    pub fn containing(p: Point3, cell_size: f32) -> Self {
        Self {
            x: (p.x / cell_size).floor() as i32,
            y: (p.y / cell_size).floor() as i32,
            z: (p.z / cell_size).floor() as i32,
        }
    }

    /// This cell and its 26 face/edge/corner neighbours.
    pub fn neighborhood(self) -> [CellKey; 27] {
        let mut neighbors = [CellKey::new(0, 0, 0); 27];
        let mut i = 0;
        for dz in -1i32..=1 {
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    neighbors[i] = CellKey::new(
                        self.x.saturating_add(dx),
                        self.y.saturating_add(dy),
                        self.z.saturating_add(dz),
                    );
                    i += 1;
                }
            }
        }
        neighbors
    }
}

/// FNV-1a 64-bit hash of a cell key.
#[inline]
pub fn fnv1a_64(key: CellKey) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write_i32(key.x);
    hasher.write_i32(key.y);
    hasher.write_i32(key.z);
    hasher.finish()
}

/// Streaming FNV-1a hasher.
#[derive(Debug, Clone, Copy)]
pub struct FnvHasher(u64);

impl Default for FnvHasher {
    fn default() -> Self {
        Self(FNV_OFFSET_64)
    }
}

impl Hasher for FnvHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= *byte as u64;
            self.0 = self.0.wrapping_mul(FNV_PRIME_64);
        }
    }

    #[inline]
    fn write_i32(&mut self, i: i32) {
        self.write(&i.to_le_bytes());
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

/// Map from cell to the point indices it contains.
pub type CellMap = HashMap<CellKey, Vec<usize>, BuildHasherDefault<FnvHasher>>;

/// Bucket the points at `indices` into cells of edge `cell_size`.
pub fn build_cell_map(points: &[Point3], indices: impl Iterator<Item = usize>, cell_size: f32) -> CellMap {
    let mut map = CellMap::default();
    for i in indices {
        map.entry(CellKey::containing(points[i], cell_size))
            .or_default()
            .push(i);
    }
    map
}
