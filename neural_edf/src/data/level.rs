//! Snapshot of one stage of the multi-scale hierarchy.

use burn::prelude::*;

use super::{EdgeGeometry, EdgeSet, PointSet};

/// Output of one pooling or refinement stage.
///
/// `edges` are the incoming edges of `nodes` used by the stage that produced
/// them, so `degree[i]` is the number of neighbours node `i` attended to.
#[derive(Debug, Clone)]
pub struct ScaleLevel<B: Backend> {
    /// Nodes after the stage.
    pub nodes: PointSet<B>,
    /// Edges consumed by the stage.
    pub edges: EdgeSet<B>,
    /// Geometry of `edges`.
    pub geometry: EdgeGeometry<B>,
    /// Incoming edge count per node.
    pub degree: Vec<usize>,
    /// Connection radius of the stage.
    pub radius: f32,
    /// Index of the scale inside its down block.
    pub scale: usize,
}

impl<B: Backend> ScaleLevel<B> {
    /// Snapshot `nodes` together with the graph that produced them.
    pub fn new(nodes: PointSet<B>, edges: EdgeSet<B>, geometry: EdgeGeometry<B>, radius: f32, scale: usize) -> Self {
        Self {
            degree: edges.degree(),
            nodes,
            edges,
            geometry,
            radius,
            scale,
        }
    }

    /// Number of nodes at this level.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the level has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
