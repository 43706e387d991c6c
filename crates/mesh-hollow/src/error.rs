// Allow unused_assignments lint for error struct fields that are used in thiserror Display macros
// but appear as "never read" to the compiler.
#![allow(unused_assignments)]

//! Error types for hollowing with rich diagnostics.
//!
//! Codes follow the pattern `HOLLOW-XXXX` where:
//! - 1xxx = Input validation errors
//! - 2xxx = Voxel computation errors
//! - 3xxx = Control flow and wrapped errors

use miette::Diagnostic;
use thiserror::Error;

use mesh_core::MeshError;

/// Result type alias for hollowing operations.
pub type HollowResult<T> = Result<T, HollowError>;

/// Machine-readable error codes for hollowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HollowErrorCode {
    /// HOLLOW-1001: Input mesh is empty
    EmptyMesh = 1001,
    /// HOLLOW-1002: Invalid parameters
    InvalidParams = 1002,

    /// HOLLOW-2001: Voxel grid too large
    GridTooLarge = 2001,
    /// HOLLOW-2002: Requested wall cannot be produced
    Infeasible = 2002,
    /// HOLLOW-2003: Isosurface extraction produced nothing
    EmptyIsosurface = 2003,

    /// HOLLOW-3001: Cancelled by the caller
    Cancelled = 3001,
    /// HOLLOW-3002: Underlying mesh operation failed
    Mesh = 3002,
}

impl HollowErrorCode {
    /// Returns the error code as a string in the format `HOLLOW-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            HollowErrorCode::EmptyMesh => "HOLLOW-1001",
            HollowErrorCode::InvalidParams => "HOLLOW-1002",
            HollowErrorCode::GridTooLarge => "HOLLOW-2001",
            HollowErrorCode::Infeasible => "HOLLOW-2002",
            HollowErrorCode::EmptyIsosurface => "HOLLOW-2003",
            HollowErrorCode::Cancelled => "HOLLOW-3001",
            HollowErrorCode::Mesh => "HOLLOW-3002",
        }
    }
}

impl std::fmt::Display for HollowErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a requested wall cannot be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfeasibleReason {
    /// The erosion would consume the whole solid.
    WallTooThick,
    /// The wall rounds down to zero voxels.
    WallBelowVoxel,
    /// The wall rounds down below the configured minimum.
    WallBelowMinimum,
}

impl std::fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfeasibleReason::WallTooThick => {
                write!(f, "wall is at least half the smallest dimension")
            }
            InfeasibleReason::WallBelowVoxel => write!(f, "wall is thinner than one voxel"),
            InfeasibleReason::WallBelowMinimum => {
                write!(f, "wall rounds down below the minimum wall thickness")
            }
        }
    }
}

/// Recovery suggestions for hollowing errors.
#[derive(Debug, Clone, PartialEq)]
pub enum HollowRecoverySuggestion {
    /// Lower the grid resolution.
    ReduceResolution { current: usize, suggested: usize },
    /// Use smaller voxels so the wall spans more of them.
    ReduceVoxelSize { current: f64, suggested: f64 },
    /// Use a thinner wall.
    ReduceWallThickness { current: f64, max: f64 },
    /// Check the input mesh.
    CheckInputMesh,
    /// No specific suggestion.
    None,
}

impl std::fmt::Display for HollowRecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HollowRecoverySuggestion::ReduceResolution { current, suggested } => {
                write!(
                    f,
                    "Reduce resolution from {} to {} voxels per longest side",
                    current, suggested
                )
            }
            HollowRecoverySuggestion::ReduceVoxelSize { current, suggested } => {
                write!(
                    f,
                    "Reduce voxel size from {:.3}mm to {:.3}mm or less (raise the resolution)",
                    current, suggested
                )
            }
            HollowRecoverySuggestion::ReduceWallThickness { current, max } => {
                write!(
                    f,
                    "Reduce wall thickness from {:.2}mm to below {:.2}mm",
                    current, max
                )
            }
            HollowRecoverySuggestion::CheckInputMesh => {
                write!(f, "Check that the input is a closed, non-empty solid")
            }
            HollowRecoverySuggestion::None => write!(f, "No specific suggestion available"),
        }
    }
}

/// Errors that can occur while hollowing.
#[derive(Debug, Error, Diagnostic)]
pub enum HollowError {
    /// Input mesh is empty.
    #[error("input mesh is empty")]
    #[diagnostic(
        code(hollow::input::empty),
        help("The input mesh must have at least one vertex and one face.")
    )]
    EmptyMesh,

    /// Invalid parameters.
    #[error("invalid hollowing parameters: {details}")]
    #[diagnostic(
        code(hollow::params::invalid),
        help("Check parameter values: wall_thickness > 0, resolution >= 8, voxel_size > 0.")
    )]
    InvalidParams {
        details: String,
        param_name: Option<String>,
    },

    /// Voxel grid would be too large.
    #[error("voxel grid too large: {dims:?} = {total} voxels exceeds limit of {max}")]
    #[diagnostic(
        code(hollow::grid::too_large),
        help("Reduce the resolution or raise max_voxels if memory allows.")
    )]
    GridTooLarge {
        dims: [usize; 3],
        total: usize,
        max: usize,
    },

    /// The requested wall cannot be produced at this resolution.
    #[error(
        "hollowing infeasible: {reason} (wall {wall_thickness:.3}mm, voxel {voxel_size:.3}mm, radius {radius_voxels} voxels, smallest extent {min_extent:.3}mm)"
    )]
    #[diagnostic(
        code(hollow::wall::infeasible),
        help("Use a thinner wall for small parts, or a finer grid for thin walls.")
    )]
    Infeasible {
        wall_thickness: f64,
        voxel_size: f64,
        radius_voxels: usize,
        min_extent: f64,
        reason: InfeasibleReason,
    },

    /// Isosurface extraction produced no triangles.
    #[error("isosurface extraction produced an empty mesh")]
    #[diagnostic(
        code(hollow::isosurface::empty),
        help("The shell may be thinner than the grid can represent. Increase resolution.")
    )]
    EmptyIsosurface,

    /// The caller cancelled the operation.
    #[error("hollowing cancelled during {stage}")]
    #[diagnostic(code(hollow::cancelled))]
    Cancelled { stage: &'static str },

    /// Underlying mesh error.
    #[error("mesh operation failed: {0}")]
    #[diagnostic(code(hollow::mesh::error))]
    Mesh(#[from] MeshError),
}

impl HollowError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> HollowErrorCode {
        match self {
            HollowError::EmptyMesh => HollowErrorCode::EmptyMesh,
            HollowError::InvalidParams { .. } => HollowErrorCode::InvalidParams,
            HollowError::GridTooLarge { .. } => HollowErrorCode::GridTooLarge,
            HollowError::Infeasible { .. } => HollowErrorCode::Infeasible,
            HollowError::EmptyIsosurface => HollowErrorCode::EmptyIsosurface,
            HollowError::Cancelled { .. } => HollowErrorCode::Cancelled,
            HollowError::Mesh(_) => HollowErrorCode::Mesh,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> HollowRecoverySuggestion {
        match self {
            HollowError::EmptyMesh | HollowError::Mesh(_) => {
                HollowRecoverySuggestion::CheckInputMesh
            }
            HollowError::GridTooLarge { dims, max, .. } => {
                let longest = dims.iter().copied().max().unwrap_or(1);
                let scale = (*max as f64 / (dims[0] * dims[1] * dims[2]) as f64).cbrt();
                HollowRecoverySuggestion::ReduceResolution {
                    current: longest,
                    suggested: ((longest as f64 * scale) as usize).max(1),
                }
            }
            HollowError::Infeasible {
                wall_thickness,
                voxel_size,
                min_extent,
                reason,
                ..
            } => match reason {
                InfeasibleReason::WallTooThick => HollowRecoverySuggestion::ReduceWallThickness {
                    current: *wall_thickness,
                    max: min_extent / 2.0,
                },
                // Two voxels per wall leaves headroom for rounding down.
                InfeasibleReason::WallBelowVoxel | InfeasibleReason::WallBelowMinimum => {
                    HollowRecoverySuggestion::ReduceVoxelSize {
                        current: *voxel_size,
                        suggested: wall_thickness / 2.0,
                    }
                }
            },
            HollowError::EmptyIsosurface => HollowRecoverySuggestion::CheckInputMesh,
            HollowError::InvalidParams { .. } | HollowError::Cancelled { .. } => {
                HollowRecoverySuggestion::None
            }
        }
    }

    /// Whether this error means the requested wall cannot be produced.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, HollowError::Infeasible { .. })
    }

    // Constructor helpers

    /// Create an invalid params error.
    pub fn invalid_params(details: impl Into<String>) -> Self {
        HollowError::InvalidParams {
            details: details.into(),
            param_name: None,
        }
    }

    /// Create an invalid params error naming the parameter.
    pub fn invalid_param(param_name: impl Into<String>, details: impl Into<String>) -> Self {
        HollowError::InvalidParams {
            details: details.into(),
            param_name: Some(param_name.into()),
        }
    }

    /// Create a grid too large error.
    pub fn grid_too_large(dims: [usize; 3], max: usize) -> Self {
        HollowError::GridTooLarge {
            dims,
            total: dims[0] * dims[1] * dims[2],
            max,
        }
    }

    /// Create an infeasible wall error.
    pub fn infeasible(
        reason: InfeasibleReason,
        wall_thickness: f64,
        voxel_size: f64,
        radius_voxels: usize,
        min_extent: f64,
    ) -> Self {
        HollowError::Infeasible {
            wall_thickness,
            voxel_size,
            radius_voxels,
            min_extent,
            reason,
        }
    }
}
