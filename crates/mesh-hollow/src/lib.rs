//! Voxel shell hollowing for printable parts.
//!
//! Turns a closed solid into a hollow shell of roughly uniform wall
//! thickness: voxelize, fill enclosed voids, erode by the wall radius, keep
//! the difference, and reconstruct a surface with Surface Nets.
//!
//! # Quick Start
//!
//! ```
//! use mesh_core::primitives::block;
//! use mesh_hollow::{HollowingConfig, hollow};
//!
//! let mesh = block(80.0, 40.0, 40.0);
//! let config = HollowingConfig {
//!     wall_thickness: 5.0,
//!     resolution: Some(32),
//!     ..Default::default()
//! };
//! let result = hollow(&mesh, &config).unwrap();
//! println!("{}", result.stats);
//! ```
//!
//! # Numeric Policy
//!
//! - Resolution is voxels along the longest bounding-box side; an explicit
//!   resolution wins over an explicit voxel size.
//! - The wall is converted to whole voxels by rounding **down**, so a shell
//!   is never thicker than requested.
//! - A wall of at least half the smallest dimension is rejected with
//!   [`HollowError::Infeasible`] rather than returning a solid or empty mesh.
//! - Grids above [`HollowingConfig::max_voxels`] are rejected before any
//!   allocation.

mod builder;
mod config;
mod error;
mod hollow;
pub mod voxel;

pub use builder::HollowBuilder;
pub use config::{DEFAULT_MAX_VOXELS, DEFAULT_RESOLUTION, HollowingConfig, MIN_RESOLUTION};
pub use error::{
    HollowError, HollowErrorCode, HollowRecoverySuggestion, HollowResult, InfeasibleReason,
};
pub use hollow::{HollowStats, HollowedMesh, hollow, hollow_with_progress, trim_to_bounds};
