//! Build-volume segmentation with mating joints.
//!
//! Splits a solid that is too large for a printer into parts that each fit
//! the build volume, using axis-aligned planar cuts, then fuses pins and
//! holes (or dowel holes) into every seam so the parts can be re-aligned.
//!
//! # Quick Start
//!
//! ```
//! use mesh_core::primitives::block;
//! use mesh_segment::{SegmentationConfig, segment_mesh};
//!
//! let mesh = block(400.0, 100.0, 100.0);
//! let config = SegmentationConfig::default();
//!
//! let result = segment_mesh(&mesh, &config).unwrap();
//! println!("{}", result.summary());
//! for part in result.parts() {
//!     println!("part {}: {:?}", part.id, part.extents());
//! }
//! ```
//!
//! # Pipeline
//!
//! 1. Normalize units to millimeters and check the input is a closed solid.
//! 2. Optionally hollow the whole mesh ([`HollowingStrategy::HollowThenSegment`]).
//! 3. Cut the largest oversized part on its worst axis until everything fits
//!    ([`SegmentationEngine`]).
//! 4. Optionally hollow each part ([`HollowingStrategy::SegmentThenHollow`]).
//! 5. Place joints on every seam ([`place_joints`]). Seams that get fewer
//!    joints than requested are reported as [`JointWarning`]s.
//! 6. Assemble the [`SegmentationResult`] and re-check every part fits.
//!
//! Any failure aborts the run with a [`SegmentError`]; no partial result is
//! returned.

mod assembly;
mod config;
mod engine;
mod error;
pub mod joint;
mod part;
mod pipeline;

pub use assembly::{SegmentationResult, SegmentationSummary, check_fit};
pub use config::{HollowingStrategy, JointType, SegmentationConfig};
#[cfg(feature = "config")]
pub use config::ConfigError;
pub use engine::{EngineOutput, FIT_TOLERANCE, PartBudget, SegmentationEngine};
pub use error::{ErrorKind, SegmentError, SegmentErrorCode, SegmentRecoverySuggestion, SegmentResult};
pub use joint::{
    DowelSpec, Joint, JointKind, JointOutcome, JointRole, JointStrategy, JointWarning,
    JointWarningReason, PinSpec, place_joints,
};
pub use part::{CutRecord, Part, Seam, SeamRef};
pub use pipeline::{
    BatchJob, BatchOutcome, segment_batch, segment_mesh, segment_mesh_with, segment_mesh_with_progress,
};

// Re-exported so callers need only this crate for common inputs.
pub use mesh_core::{Axis, Mesh, Side, UnitPolicy, Units};
pub use mesh_hollow::HollowingConfig;
