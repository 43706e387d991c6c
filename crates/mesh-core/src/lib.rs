//! Mesh container and geometry kernel for build-volume decomposition.
//!
//! This crate is the only place that manipulates individual triangles. The
//! hollowing and segmentation crates work through the operations exposed
//! here: bounding boxes and volumes, unit normalization, solid validation,
//! planar sections and an axis-aligned boolean kernel.
//!
//! # Units and Scale
//!
//! **All geometry is in millimeters after normalization.** Input files do
//! not record their units, so [`normalize_units`] applies an explicit,
//! overridable policy ([`UnitPolicy`]): a model whose bounding-box diagonal
//! is below [`UnitPolicy::meter_threshold`] is taken to be in meters and
//! scaled by 1000. Pass an explicit [`Units`] to skip detection.
//!
//! # Coordinate System
//!
//! Right-handed. Face winding is **counter-clockwise when viewed from
//! outside**, so normals point outward and closed solids have positive
//! signed volume.
//!
//! # Quick Start
//!
//! ```
//! use mesh_core::boolean::Solid;
//! use mesh_core::{Axis, Side, UnitPolicy, Units, normalize_units, validate_solid};
//!
//! let mut mesh = mesh_core::primitives::block(400.0, 100.0, 100.0);
//! normalize_units(&mut mesh, &UnitPolicy::explicit(Units::Millimeters)).unwrap();
//! let report = validate_solid(&mut mesh).unwrap();
//! assert!(report.is_closed_solid());
//!
//! // Cut at x = 200 by removing everything above the plane.
//! let left = mesh.difference(&Solid::half_space(Axis::X, 200.0, Side::Above)).unwrap();
//! assert_eq!(left.bounds().unwrap().max.x, 200.0);
//! ```
//!
//! # Modules
//!
//! - [`bounds`]: axes, sides and [`BoundingBox`]
//! - [`units`]: unit detection and normalization
//! - [`validate`]: index/coordinate checks and closed-manifold checks
//! - [`section`]: planar cross-sections of cut faces
//! - [`boolean`]: half-space clipping and cylinder bore/boss
//! - [`query`]: ray casting and overlap tests
//! - [`io`]: STL/OBJ input, STL/3MF output
//! - [`progress`]: progress callbacks and cancellation
//! - [`tracing_ext`]: timing and mesh-state logging helpers

mod error;
mod types;

pub mod boolean;
pub mod bounds;
pub mod io;
pub mod primitives;
pub mod progress;
pub mod query;
pub mod section;
pub mod tracing_ext;
pub mod units;
pub mod validate;

pub use boolean::{DEFAULT_CYLINDER_SEGMENTS, SNAP_TOLERANCE, Solid};
pub use bounds::{Axis, BoundingBox, Side, rect_intersection};
pub use error::{ErrorCode, MeshError, MeshLocation, MeshResult, RecoverySuggestion};
pub use io::{MeshFormat, load_mesh, save_3mf, save_mesh, save_stl};
pub use progress::{Progress, ProgressCallback, ProgressTracker};
pub use section::{PLANE_TOLERANCE, PlanarSection};
pub use types::{Mesh, Triangle, Vertex};
pub use units::{UnitNormalization, UnitPolicy, Units, detect_units, normalize_units};
pub use validate::{SolidReport, ValidationOptions, inspect_solid, validate_mesh_data, validate_solid};
