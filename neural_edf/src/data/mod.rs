//! Batched point sets, edge sets and hierarchy snapshots.

mod edges;
mod level;
mod point_set;

pub use edges::{EdgeGeometry, EdgeSet};
pub use level::ScaleLevel;
pub use point_set::PointSet;
