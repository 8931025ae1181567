//! Batch-aware fixed-radius neighbour search.

use crate::error::{EdfCoreError, Result};
use crate::spatial::hash::{build_cell_map, CellKey, CellMap};
use crate::spatial::segments::BatchSegments;
use crate::types::Point3;

/// Default per-destination neighbour cap.
pub const DEFAULT_MAX_NEIGHBORS: usize = 1000;

/// Parameters of a radius search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusQuery {
    /// Connect pairs at distance `<= radius`.
    pub radius: f32,
    /// Keep at most this many sources per destination.
    pub max_neighbors: usize,
    /// Drop pairs closer than this distance.
    pub min_distance: Option<f32>,
    /// Drop pairs whose source and destination index coincide.
    pub exclude_self: bool,
}

impl RadiusQuery {
    /// Query with the default neighbour cap and no exclusions.
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
            min_distance: None,
            exclude_self: false,
        }
    }

    /// Set the neighbour cap.
    pub fn with_max_neighbors(mut self, max_neighbors: usize) -> Self {
        self.max_neighbors = max_neighbors;
        self
    }

    /// Set the inner exclusion distance.
    pub fn with_min_distance(mut self, min_distance: Option<f32>) -> Self {
        self.min_distance = min_distance;
        self
    }

    /// Exclude self loops (for searches of a set against itself).
    pub fn with_exclude_self(mut self, exclude_self: bool) -> Self {
        self.exclude_self = exclude_self;
        self
    }

    /// Check the parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(EdfCoreError::InvalidRadius {
                radius: self.radius,
            });
        }
        if self.max_neighbors == 0 {
            return Err(EdfCoreError::ZeroNeighborCap);
        }
        Ok(())
    }
}

/// Directed edges `src[e] -> dst[e]`.
///
/// Edges are grouped by destination in increasing order; within a
/// destination, sources increase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NeighborList {
    /// Source indices.
    pub src: Vec<usize>,
    /// Destination indices.
    pub dst: Vec<usize>,
}

impl NeighborList {
    /// Number of edges.
    #[inline]
    pub fn len(&self) -> usize {
        self.src.len()
    }

    /// Whether there are no edges.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// Incoming edge count per destination node.
    pub fn degree(&self, num_dst: usize) -> Vec<usize> {
        let mut deg = vec![0; num_dst];
        for &d in &self.dst {
            deg[d] += 1;
        }
        deg
    }

    /// Append the edges `sources -> d`.
    fn push(&mut self, d: usize, sources: &[usize]) {
        self.src.extend_from_slice(sources);
        self.dst.extend(std::iter::repeat(d).take(sources.len()));
    }
}

/// Connect every destination to the sources of its own batch within `query.radius`.
///
/// Neighbours beyond `query.max_neighbors` (in source index order) are
/// silently dropped.
pub fn radius_search(
    src: &[Point3],
    src_batch: &[i64],
    dst: &[Point3],
    dst_batch: &[i64],
    query: &RadiusQuery,
) -> Result<NeighborList> {
    query.validate()?;
    if src.len() != src_batch.len() {
        return Err(EdfCoreError::LengthMismatch {
            what: "source batch",
            expected: src.len(),
            got: src_batch.len(),
        });
    }
    if dst.len() != dst_batch.len() {
        return Err(EdfCoreError::LengthMismatch {
            what: "destination batch",
            expected: dst.len(),
            got: dst_batch.len(),
        });
    }

    let src_groups = BatchSegments::from_batch(src_batch)?;
    let dst_groups = BatchSegments::from_batch(dst_batch)?;

    let mut out = NeighborList::default();
    for (id, dst_range) in dst_groups.groups() {
        let Some(src_range) = src_groups.find(*id) else {
            continue;
        };
        let cells = build_cell_map(src, src_range, query.radius);
        let search = GroupSearch { src, cells: &cells, query };

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            let lists: Vec<Vec<usize>> = dst_range
                .clone()
                .into_par_iter()
                .map(|d| {
                    let mut candidates = Vec::new();
                    search.collect(d, dst[d], &mut candidates);
                    candidates
                })
                .collect();
            for (d, candidates) in dst_range.clone().zip(lists) {
                out.push(d, &candidates);
            }
        }

        #[cfg(not(feature = "rayon"))]
        {
            let mut candidates = Vec::new();
            for d in dst_range.clone() {
                search.collect(d, dst[d], &mut candidates);
                out.push(d, &candidates);
            }
        }
    }

    Ok(out)
}

/// Candidate lookup against the cell map of one source group.
struct GroupSearch<'a> {
    src: &'a [Point3],
    cells: &'a CellMap,
    query: &'a RadiusQuery,
}

impl GroupSearch<'_> {
    /// Sorted, de-duplicated and truncated neighbours of destination `d` at `p`.
    fn collect(&self, d: usize, p: Point3, candidates: &mut Vec<usize>) {
        let r2 = self.query.radius * self.query.radius;
        let min2 = self.query.min_distance.map(|m| m * m);

        candidates.clear();
        for cell in CellKey::containing(p, self.query.radius).neighborhood() {
            let Some(bucket) = self.cells.get(&cell) else {
                continue;
            };
            candidates.extend(bucket.iter().copied().filter(|&s| {
                if self.query.exclude_self && s == d {
                    return false;
                }
                let d2 = self.src[s].distance_squared(p);
                d2 <= r2 && min2.map_or(true, |m| d2 >= m)
            }));
        }
        candidates.sort_unstable();
        candidates.dedup();
        candidates.truncate(self.query.max_neighbors);
    }
}

/// Self-connect a point set: all ordered pairs within `radius`, without self loops.
pub fn radius_graph(
    points: &[Point3],
    batch: &[i64],
    radius: f32,
    max_neighbors: usize,
) -> Result<NeighborList> {
    let query = RadiusQuery::new(radius)
        .with_max_neighbors(max_neighbors)
        .with_exclude_self(true);
    radius_search(points, batch, points, batch, &query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize, spacing: f32) -> Vec<Point3> {
        (0..n).map(|i| Point3::new(i as f32 * spacing, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_radius_graph_on_a_line() {
        let points = line(5, 1.0);
        let batch = vec![0; 5];
        let edges = radius_graph(&points, &batch, 1.01, 100).unwrap();
        // interior nodes have two neighbours, endpoints one
        assert_eq!(edges.len(), 8);
        assert_eq!(edges.degree(5), vec![1, 2, 2, 2, 1]);
        assert!(edges.src.iter().zip(&edges.dst).all(|(s, d)| s != d));
    }

    #[test]
    fn test_edges_grouped_by_destination() {
        let points = line(6, 0.5);
        let edges = radius_graph(&points, &[0; 6], 1.2, 100).unwrap();
        assert!(edges.dst.windows(2).all(|w| w[0] <= w[1]));
        for w in edges.src.windows(2).zip(edges.dst.windows(2)) {
            if w.1[0] == w.1[1] {
                assert!(w.0[0] < w.0[1]);
            }
        }
    }

    #[test]
    fn test_never_crosses_batches() {
        let points = vec![Point3::splat(0.0), Point3::splat(0.0), Point3::splat(0.0)];
        let edges = radius_graph(&points, &[0, 0, 1], 1.0, 100).unwrap();
        assert_eq!(edges.src, vec![1, 0]);
        assert_eq!(edges.dst, vec![0, 1]);
    }

    #[test]
    fn test_neighbor_cap_keeps_lowest_sources() {
        let points = vec![Point3::splat(0.0); 6];
        let edges = radius_graph(&points, &[0; 6], 0.1, 2).unwrap();
        assert_eq!(edges.degree(6), vec![2; 6]);
        assert_eq!(&edges.src[0..2], &[1, 2]);
    }

    #[test]
    fn test_min_distance_excludes_close_pairs() {
        let src = line(4, 1.0);
        let dst = vec![Point3::splat(0.0)];
        let query = RadiusQuery::new(2.5).with_min_distance(Some(0.5));
        let edges = radius_search(&src, &[0; 4], &dst, &[0], &query).unwrap();
        assert_eq!(edges.src, vec![1, 2]);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let src = vec![Point3::new(0.5, 0.0, 0.0)];
        let dst = vec![Point3::splat(0.0)];
        let edges = radius_search(&src, &[0], &dst, &[0], &RadiusQuery::new(0.5)).unwrap();
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_missing_source_batch() {
        let src = vec![Point3::splat(0.0)];
        let dst = vec![Point3::splat(0.0)];
        let edges = radius_search(&src, &[0], &dst, &[1], &RadiusQuery::new(1.0)).unwrap();
        assert!(edges.is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        let p = vec![Point3::splat(0.0)];
        assert!(radius_graph(&p, &[0], 0.0, 10).is_err());
        assert!(radius_graph(&p, &[0], f32::NAN, 10).is_err());
        assert!(radius_graph(&p, &[0], 1.0, 0).is_err());
        assert!(radius_graph(&p, &[0, 0], 1.0, 10).is_err());
    }
}
