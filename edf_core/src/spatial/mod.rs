//! Batch-aware spatial queries over point sets.
//!
//! - [`radius`]: fixed-radius neighbour search with a per-destination cap
//! - [`fps`]: farthest-point sampling per batch group
//! - [`segments`]: contiguous batch groups
//! - [`hash`]: uniform cell hashing backing the radius search

pub mod fps;
pub mod hash;
pub mod radius;
pub mod segments;

pub use fps::{farthest_point_sampling, sample_count, SamplingStart};
pub use hash::{CellKey, FnvHasher};
pub use radius::{radius_graph, radius_search, NeighborList, RadiusQuery, DEFAULT_MAX_NEIGHBORS};
pub use segments::BatchSegments;
