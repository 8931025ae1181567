//! Directed edges between two point sets and their geometry.

use burn::prelude::*;
use edf_core::spatial::NeighborList;

use crate::o3::{edge_length, SphericalHarmonics};
use crate::ops::index_tensor;

/// Edges `src -> dst`, grouped by destination.
#[derive(Debug, Clone)]
pub struct EdgeSet<B: Backend> {
    /// Source node per edge (host).
    pub src: Vec<usize>,
    /// Destination node per edge (host).
    pub dst: Vec<usize>,
    /// `src` as an index tensor: [e]
    pub src_index: Tensor<B, 1, Int>,
    /// `dst` as an index tensor: [e]
    pub dst_index: Tensor<B, 1, Int>,
    /// Number of destination nodes.
    pub num_dst: usize,
}

impl<B: Backend> EdgeSet<B> {
    /// Wrap a neighbour list produced by a radius query.
    pub fn from_neighbors(neighbors: NeighborList, num_dst: usize, device: &B::Device) -> Self {
        Self {
            src_index: index_tensor(&neighbors.src, device),
            dst_index: index_tensor(&neighbors.dst, device),
            src: neighbors.src,
            dst: neighbors.dst,
            num_dst,
        }
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.src.len()
    }

    /// Whether there are no edges.
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// Incoming edge count per destination.
    pub fn degree(&self) -> Vec<usize> {
        let mut out = vec![0; self.num_dst];
        for &d in &self.dst {
            out[d] += 1;
        }
        out
    }

    /// Displacements, lengths and harmonics of every edge.
    ///
    /// Displacement is `coord_src - coord_dst`, which makes the geometry
    /// invariant to a common translation of both sets.
    pub fn geometry(&self, src_coords: &Tensor<B, 2>, dst_coords: &Tensor<B, 2>, sh: &SphericalHarmonics) -> EdgeGeometry<B> {
        let device = src_coords.device();
        if self.is_empty() {
            return EdgeGeometry {
                vectors: Tensor::zeros([0, 3], &device),
                length: Tensor::zeros([0, 1], &device),
                attr: Tensor::zeros([0, sh.dim()], &device),
            };
        }
        let vectors = src_coords.clone().select(0, self.src_index.clone())
            - dst_coords.clone().select(0, self.dst_index.clone());
        EdgeGeometry {
            length: edge_length(vectors.clone()),
            attr: sh.forward(vectors.clone()),
            vectors,
        }
    }
}

/// Per-edge geometric features.
#[derive(Debug, Clone)]
pub struct EdgeGeometry<B: Backend> {
    /// Displacement `src - dst`: [e, 3]
    pub vectors: Tensor<B, 2>,
    /// Edge length: [e, 1]
    pub length: Tensor<B, 2>,
    /// Spherical harmonics of the displacement: [e, sh.dim()]
    pub attr: Tensor<B, 2>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{points_tensor, to_f32_vec};
    use burn::backend::NdArray;
    use edf_core::Point3;

    type TestBackend = NdArray;

    #[test]
    fn test_degree_and_geometry() {
        let device = Default::default();
        let neighbors = NeighborList {
            src: vec![0, 1, 1],
            dst: vec![0, 0, 1],
        };
        let edges = EdgeSet::<TestBackend>::from_neighbors(neighbors, 3, &device);
        assert_eq!(edges.degree(), vec![2, 1, 0]);

        let src = points_tensor::<TestBackend>(&[Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 2.0, 0.0)], &device);
        let dst = points_tensor::<TestBackend>(&[Point3::splat(0.0), Point3::new(0.0, 0.0, 2.0), Point3::splat(5.0)], &device);
        let geo = edges.geometry(&src, &dst, &SphericalHarmonics::new(2).unwrap());
        assert_eq!(geo.attr.dims(), [3, 9]);
        let length = to_f32_vec(geo.length).unwrap();
        assert!((length[0] - 1.0).abs() < 1e-6);
        assert!((length[1] - 2.0).abs() < 1e-6);
        assert!((length[2] - 8.0f32.sqrt()).abs() < 1e-6);
    }
}
