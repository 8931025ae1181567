//! Graph construction between batched point sets.

use burn::prelude::*;
use edf_core::spatial::{farthest_point_sampling, radius_search, RadiusQuery, SamplingStart};
use edf_core::Point3;

use crate::context::ForwardContext;
use crate::data::{EdgeSet, PointSet};
use crate::error::Result;

/// Self-connection of a point set within a radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusGraph {
    query: RadiusQuery,
}

impl RadiusGraph {
    /// Connect every ordered pair closer than `radius`, without self loops.
    pub fn new(radius: f32, max_neighbors: usize) -> Result<Self> {
        let query = RadiusQuery::new(radius)
            .with_max_neighbors(max_neighbors)
            .with_exclude_self(true);
        query.validate()?;
        Ok(Self { query })
    }

    /// Connection radius.
    pub fn radius(&self) -> f32 {
        self.query.radius
    }

    /// Build the edges of `nodes`.
    pub fn forward<B: Backend>(&self, nodes: &PointSet<B>) -> Result<EdgeSet<B>> {
        let neighbors = radius_search(&nodes.points, &nodes.batch_ids, &nodes.points, &nodes.batch_ids, &self.query)?;
        log::debug!(
            "radius graph: {} nodes, {} edges (r = {})",
            nodes.len(),
            neighbors.len(),
            self.query.radius
        );
        Ok(EdgeSet::from_neighbors(neighbors, nodes.len(), &nodes.device()))
    }
}

/// Connection from a source set to a distinct destination set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusConnect {
    query: RadiusQuery,
}

impl RadiusConnect {
    /// Connect sources within `radius` of each destination; with `offset`,
    /// sources closer than the offset are skipped.
    pub fn new(radius: f32, offset: Option<f32>, max_neighbors: usize) -> Result<Self> {
        let query = RadiusQuery::new(radius)
            .with_max_neighbors(max_neighbors)
            .with_min_distance(offset.filter(|o| *o > 0.0));
        query.validate()?;
        Ok(Self { query })
    }

    /// Connection radius.
    pub fn radius(&self) -> f32 {
        self.query.radius
    }

    /// Build the edges `src -> dst`.
    pub fn forward<B: Backend>(
        &self,
        src: &PointSet<B>,
        dst_points: &[Point3],
        dst_batch: &[i64],
    ) -> Result<EdgeSet<B>> {
        let neighbors = radius_search(&src.points, &src.batch_ids, dst_points, dst_batch, &self.query)?;
        log::debug!(
            "radius connect: {} -> {} nodes, {} edges (r = {})",
            src.len(),
            dst_points.len(),
            neighbors.len(),
            self.query.radius
        );
        Ok(EdgeSet::from_neighbors(neighbors, dst_points.len(), &src.device()))
    }
}

/// Pooled nodes and the edges connecting the original nodes to them.
#[derive(Debug, Clone)]
pub struct PooledGraph<B: Backend> {
    /// Index of every pooled node in the original set.
    pub indices: Vec<usize>,
    /// Pooled nodes, features gathered from the original set.
    pub nodes: PointSet<B>,
    /// Edges original -> pooled.
    pub edges: EdgeSet<B>,
}

/// Farthest-point sampling followed by a radius connection to the samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsPool {
    ratio: f32,
    deterministic: bool,
    connect: RadiusConnect,
}

impl FpsPool {
    /// Keep `ratio` of every batch group and connect within `radius`.
    pub fn new(ratio: f32, radius: f32, max_neighbors: usize, deterministic: bool) -> Result<Self> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(edf_core::EdfCoreError::InvalidRatio { ratio }.into());
        }
        Ok(Self {
            ratio,
            deterministic,
            connect: RadiusConnect::new(radius, None, max_neighbors)?,
        })
    }

    /// Pooling ratio.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Sample `nodes` and connect the originals to the samples.
    ///
    /// The first sample of each group is index 0 of the group when the pool
    /// is deterministic, otherwise it is drawn from `ctx`.
    pub fn forward<B: Backend>(&self, nodes: &PointSet<B>, ctx: &mut ForwardContext) -> Result<PooledGraph<B>> {
        let start = if self.deterministic {
            SamplingStart::First
        } else {
            SamplingStart::Random(ctx.rng())
        };
        let indices = farthest_point_sampling(&nodes.points, &nodes.batch_ids, self.ratio, start)?;
        let pooled = nodes.select(&indices)?;
        let edges = self.connect.forward(nodes, &pooled.points, &pooled.batch_ids)?;

        log::debug!("fps pool: {} -> {} nodes (ratio {})", nodes.len(), pooled.len(), self.ratio);
        Ok(PooledGraph {
            indices,
            nodes: pooled,
            edges,
        })
    }
}
