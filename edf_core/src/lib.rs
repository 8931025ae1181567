//! # edf_core
//!
//! Pure math for equivariant point-cloud networks.
//!
//! This crate holds everything the neural layers need that is not a tensor
//! operation: irrep signatures, the Cartesian bases for degrees 0 to 2, the
//! coupling coefficients between them, and the batch-aware spatial queries
//! used to build graphs over point clouds.
//!
//! ## Modules
//!
//! - [`types`]: `Point3` and `Rotation3`
//! - [`irreps`]: irrep signatures (`"8x0e+4x1o"`), slicing, sorting, rotation matrices
//! - [`basis`]: degree 2 Cartesian basis, Wigner D matrices, equivariant bilinear maps
//! - [`coupling`]: process-wide table of normalised coupling coefficients
//! - [`harmonics`]: real spherical harmonics up to degree 2
//! - [`cutoff`]: smooth polynomial windows
//! - [`spatial`]: radius search, farthest-point sampling, batch segments
//! - [`error`]: error types
//!
//! ## Usage
//!
//! ```
//! use edf_core::prelude::*;
//!
//! let irreps: Irreps = "4x0e+2x1o".parse().unwrap();
//! assert_eq!(irreps.dim(), 10);
//!
//! let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.5, 0.0, 0.0)];
//! let edges = radius_graph(&points, &[0, 0], 1.0, DEFAULT_MAX_NEIGHBORS).unwrap();
//! assert_eq!(edges.len(), 2);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! edf_core (pure math)
//!     │
//!     ▼
//! neural_edf (burn modules) ──► edf_demos
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon`: search destinations of a batch group in parallel

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod basis;
pub mod coupling;
pub mod cutoff;
pub mod error;
pub mod harmonics;
pub mod irreps;
pub mod spatial;
pub mod types;

pub use error::{EdfCoreError, Result};
pub use irreps::{Irrep, Irreps, MulIrrep, Parity, MAX_DEGREE};
pub use types::{Point3, Rotation3};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::basis::wigner_d;
    pub use crate::coupling::{coupling_table, Coupling, CouplingTable};
    pub use crate::cutoff::{soft_cutoff, soft_square_cutoff, soft_step};
    pub use crate::error::{EdfCoreError, Result};
    pub use crate::harmonics::{sh_dim, spherical_harmonics};
    pub use crate::irreps::{Irrep, Irreps, MulIrrep, Parity, MAX_DEGREE};
    pub use crate::spatial::{
        farthest_point_sampling, radius_graph, radius_search, sample_count, BatchSegments,
        NeighborList, RadiusQuery, SamplingStart, DEFAULT_MAX_NEIGHBORS,
    };
    pub use crate::types::{Point3, Rotation3};
}
