// Allow unused_assignments lint for error struct fields that are used in thiserror Display macros
// but appear as "never read" to the compiler.
#![allow(unused_assignments)]

//! Error types for segmentation with rich diagnostics.
//!
//! Codes follow the pattern `SEG-XXXX` where:
//! - 1xxx = Input and configuration errors
//! - 2xxx = Planning errors (hollowing, cutting, part budget)
//! - 3xxx = Assembly errors
//! - 4xxx = Control flow and wrapped errors
//!
//! Every fatal variant names the part and/or seam it concerns. Joint
//! placement problems are not errors: they are collected as
//! [`JointWarning`](crate::JointWarning)s in the result.

use miette::Diagnostic;
use thiserror::Error;

use mesh_core::{Axis, ErrorCode, MeshError, RecoverySuggestion};
use mesh_hollow::{HollowError, HollowErrorCode, HollowRecoverySuggestion};

/// Result type alias for segmentation operations.
pub type SegmentResult<T> = Result<T, SegmentError>;

/// Machine-readable error codes for segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentErrorCode {
    /// SEG-1001: Input is not a usable solid
    InvalidMesh = 1001,
    /// SEG-1002: Source units cannot be resolved
    UnsupportedUnits = 1002,
    /// SEG-1003: Configuration rejected
    InvalidConfig = 1003,

    /// SEG-2001: Requested wall cannot be produced
    HollowingInfeasible = 2001,
    /// SEG-2002: A part cannot be split
    NoValidCut = 2002,
    /// SEG-2003: Boolean kernel failed on a cut
    BooleanOperation = 2003,
    /// SEG-2004: Hard part budget exceeded
    PartBudgetExceeded = 2004,

    /// SEG-3001: A finished part does not fit the build volume
    PartExceedsBuildVolume = 3001,

    /// SEG-4001: Cancelled by the caller
    Cancelled = 4001,
    /// SEG-4002: Underlying mesh error
    Mesh = 4002,
    /// SEG-4003: Underlying hollowing error
    Hollow = 4003,
}

impl SegmentErrorCode {
    /// Returns the error code as a string in the format `SEG-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentErrorCode::InvalidMesh => "SEG-1001",
            SegmentErrorCode::UnsupportedUnits => "SEG-1002",
            SegmentErrorCode::InvalidConfig => "SEG-1003",
            SegmentErrorCode::HollowingInfeasible => "SEG-2001",
            SegmentErrorCode::NoValidCut => "SEG-2002",
            SegmentErrorCode::BooleanOperation => "SEG-2003",
            SegmentErrorCode::PartBudgetExceeded => "SEG-2004",
            SegmentErrorCode::PartExceedsBuildVolume => "SEG-3001",
            SegmentErrorCode::Cancelled => "SEG-4001",
            SegmentErrorCode::Mesh => "SEG-4002",
            SegmentErrorCode::Hollow => "SEG-4003",
        }
    }
}

impl std::fmt::Display for SegmentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse failure classes callers can match without inspecting payloads.
///
/// Wrapped mesh and hollowing errors are folded into the class they
/// belong to, so the set stays closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Non-manifold, empty or unparseable geometry.
    InvalidMesh,
    /// Scale that the unit policy cannot resolve.
    UnsupportedUnits,
    /// Wall thickness not achievable at the given resolution.
    HollowingInfeasible,
    /// A part cannot be split without violating the thickness policy.
    NoValidCut,
    /// The geometric kernel failed on a cut after its retry.
    BooleanOperation,
    /// A finished part fails the build-volume fit check.
    PartExceedsBuildVolume,
    /// A hard maximum part count would be exceeded.
    PartBudgetExceeded,
    /// Configuration values were rejected before any geometry work.
    InvalidConfig,
    /// The caller abandoned the job.
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidMesh => "invalid mesh",
            ErrorKind::UnsupportedUnits => "unsupported units",
            ErrorKind::HollowingInfeasible => "hollowing infeasible",
            ErrorKind::NoValidCut => "no valid cut",
            ErrorKind::BooleanOperation => "boolean operation",
            ErrorKind::PartExceedsBuildVolume => "part exceeds build volume",
            ErrorKind::PartBudgetExceeded => "part budget exceeded",
            ErrorKind::InvalidConfig => "invalid configuration",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Recovery suggestions for segmentation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentRecoverySuggestion {
    /// Repair or re-export the input.
    CheckInputMesh,
    /// State the source units explicitly.
    SpecifyUnits,
    /// Fix the named configuration value.
    FixConfig { param: Option<String> },
    /// Lower the minimum viable thickness.
    RelaxMinThickness { current: f64 },
    /// Allow more parts.
    RaisePartBudget { current: usize },
    /// Use smaller pins or disable joints.
    ShrinkJoints,
    /// Nudge the build volume so cuts avoid coincident geometry.
    AdjustBuildVolume,
    /// Suggestion from the mesh layer.
    Mesh(RecoverySuggestion),
    /// Suggestion from the hollowing layer.
    Hollow(HollowRecoverySuggestion),
    /// No specific suggestion.
    None,
}

impl std::fmt::Display for SegmentRecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentRecoverySuggestion::CheckInputMesh => {
                write!(f, "Check that the input is a closed, consistently oriented solid")
            }
            SegmentRecoverySuggestion::SpecifyUnits => {
                write!(f, "Pass the source units explicitly (mm, cm, m or in)")
            }
            SegmentRecoverySuggestion::FixConfig { param } => match param {
                Some(p) => write!(f, "Fix the configuration value '{}'", p),
                None => write!(f, "Fix the configuration values"),
            },
            SegmentRecoverySuggestion::RelaxMinThickness { current } => {
                write!(
                    f,
                    "Lower min_viable_thickness below {:.2}mm or enlarge the build volume",
                    current
                )
            }
            SegmentRecoverySuggestion::RaisePartBudget { current } => {
                write!(f, "Raise max_parts above {} or set it to 0 for automatic", current)
            }
            SegmentRecoverySuggestion::ShrinkJoints => {
                write!(f, "Use smaller pins or disable joints")
            }
            SegmentRecoverySuggestion::AdjustBuildVolume => {
                write!(f, "Change the build volume slightly so cuts land elsewhere")
            }
            SegmentRecoverySuggestion::Mesh(s) => write!(f, "{}", s),
            SegmentRecoverySuggestion::Hollow(s) => write!(f, "{}", s),
            SegmentRecoverySuggestion::None => write!(f, "No specific suggestion available"),
        }
    }
}

/// Errors that abort a segmentation run.
#[derive(Debug, Error, Diagnostic)]
pub enum SegmentError {
    /// Input is not a closed solid.
    #[error("invalid input mesh: {details}")]
    #[diagnostic(
        code(segment::input::invalid),
        help("Segmentation needs a closed, consistently oriented two-manifold solid.")
    )]
    InvalidMesh {
        details: String,
        #[source]
        source: Option<MeshError>,
    },

    /// Source units could not be resolved.
    #[error("cannot resolve source units: {details}")]
    #[diagnostic(
        code(segment::input::units),
        help("Pass the source units explicitly instead of relying on detection.")
    )]
    UnsupportedUnits { diagonal: f64, details: String },

    /// Hollowing cannot produce the requested wall.
    #[error("hollowing infeasible{}: {source}", part_label(.part))]
    #[diagnostic(
        code(segment::hollow::infeasible),
        help("Use a thinner wall, a finer voxel grid, or disable hollowing.")
    )]
    HollowingInfeasible {
        part: Option<usize>,
        #[source]
        source: HollowError,
    },

    /// A part cannot be split without producing a sliver.
    #[error(
        "no valid cut for part {part} on {axis} axis: extent {extent:.3}mm cannot be split into pieces of at least {min_thickness:.3}mm"
    )]
    #[diagnostic(
        code(segment::cut::none),
        help("Relax min_viable_thickness, enlarge the build volume, or try the other hollowing strategy.")
    )]
    NoValidCut {
        part: usize,
        axis: Axis,
        extent: f64,
        min_thickness: f64,
    },

    /// The boolean kernel failed on a cut, including its one retry.
    #[error("boolean {operation} failed on part {part} at {axis} = {coordinate:.4}")]
    #[diagnostic(
        code(segment::cut::boolean),
        help("The cut plane may graze coincident geometry. Nudging the build volume moves it.")
    )]
    BooleanOperation {
        part: usize,
        axis: Axis,
        coordinate: f64,
        operation: String,
        #[source]
        source: MeshError,
    },

    /// A finished part does not fit the build volume.
    #[error(
        "part {part} measures {:.2} x {:.2} x {:.2}mm, exceeding the build volume {:.2} x {:.2} x {:.2}mm",
        .extents[0], .extents[1], .extents[2], .build_volume[0], .build_volume[1], .build_volume[2]
    )]
    #[diagnostic(
        code(segment::assembly::exceeds),
        help("Joint geometry may have grown the part. Use shorter pins or dowel joints.")
    )]
    PartExceedsBuildVolume {
        part: usize,
        extents: [f64; 3],
        build_volume: [f64; 3],
    },

    /// The hard part budget would be exceeded.
    #[error("splitting part {part} would make {needed} parts, above the limit of {max_parts}")]
    #[diagnostic(
        code(segment::budget::exceeded),
        help("Raise max_parts, or set it to 0 to use the automatic soft budget.")
    )]
    PartBudgetExceeded {
        part: usize,
        needed: usize,
        max_parts: usize,
    },

    /// Configuration rejected before any geometry work.
    #[error("invalid segmentation configuration: {details}")]
    #[diagnostic(code(segment::config::invalid))]
    InvalidConfig {
        details: String,
        param_name: Option<String>,
    },

    /// The caller cancelled the job.
    #[error("segmentation cancelled during {stage}")]
    #[diagnostic(code(segment::cancelled))]
    Cancelled { stage: &'static str },

    /// Underlying mesh error.
    #[error(transparent)]
    #[diagnostic(code(segment::mesh::error))]
    Mesh(#[from] MeshError),

    /// Underlying hollowing error.
    #[error(transparent)]
    #[diagnostic(code(segment::hollow::error))]
    Hollow(HollowError),
}

fn part_label(part: &Option<usize>) -> String {
    part.map(|p| format!(" for part {}", p)).unwrap_or_default()
}

fn mesh_kind(err: &MeshError) -> ErrorKind {
    match err.code() {
        ErrorCode::UnsupportedUnits => ErrorKind::UnsupportedUnits,
        ErrorCode::BooleanFailed => ErrorKind::BooleanOperation,
        _ => ErrorKind::InvalidMesh,
    }
}

impl From<HollowError> for SegmentError {
    fn from(err: HollowError) -> Self {
        SegmentError::from_hollow(err, None)
    }
}

impl SegmentError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> SegmentErrorCode {
        match self {
            SegmentError::InvalidMesh { .. } => SegmentErrorCode::InvalidMesh,
            SegmentError::UnsupportedUnits { .. } => SegmentErrorCode::UnsupportedUnits,
            SegmentError::HollowingInfeasible { .. } => SegmentErrorCode::HollowingInfeasible,
            SegmentError::NoValidCut { .. } => SegmentErrorCode::NoValidCut,
            SegmentError::BooleanOperation { .. } => SegmentErrorCode::BooleanOperation,
            SegmentError::PartExceedsBuildVolume { .. } => {
                SegmentErrorCode::PartExceedsBuildVolume
            }
            SegmentError::PartBudgetExceeded { .. } => SegmentErrorCode::PartBudgetExceeded,
            SegmentError::InvalidConfig { .. } => SegmentErrorCode::InvalidConfig,
            SegmentError::Cancelled { .. } => SegmentErrorCode::Cancelled,
            SegmentError::Mesh(_) => SegmentErrorCode::Mesh,
            SegmentError::Hollow(_) => SegmentErrorCode::Hollow,
        }
    }

    /// Returns the failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SegmentError::InvalidMesh { .. } => ErrorKind::InvalidMesh,
            SegmentError::UnsupportedUnits { .. } => ErrorKind::UnsupportedUnits,
            SegmentError::HollowingInfeasible { .. } => ErrorKind::HollowingInfeasible,
            SegmentError::NoValidCut { .. } => ErrorKind::NoValidCut,
            SegmentError::BooleanOperation { .. } => ErrorKind::BooleanOperation,
            SegmentError::PartExceedsBuildVolume { .. } => ErrorKind::PartExceedsBuildVolume,
            SegmentError::PartBudgetExceeded { .. } => ErrorKind::PartBudgetExceeded,
            SegmentError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            SegmentError::Cancelled { .. } => ErrorKind::Cancelled,
            SegmentError::Mesh(e) => mesh_kind(e),
            SegmentError::Hollow(e) => match e {
                HollowError::Mesh(inner) => mesh_kind(inner),
                HollowError::EmptyMesh => ErrorKind::InvalidMesh,
                HollowError::Cancelled { .. } => ErrorKind::Cancelled,
                HollowError::Infeasible { .. } | HollowError::EmptyIsosurface => {
                    ErrorKind::HollowingInfeasible
                }
                HollowError::InvalidParams { .. } | HollowError::GridTooLarge { .. } => {
                    ErrorKind::InvalidConfig
                }
            },
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> SegmentRecoverySuggestion {
        match self {
            SegmentError::InvalidMesh { .. } => SegmentRecoverySuggestion::CheckInputMesh,
            SegmentError::UnsupportedUnits { .. } => SegmentRecoverySuggestion::SpecifyUnits,
            SegmentError::HollowingInfeasible { source, .. } => {
                SegmentRecoverySuggestion::Hollow(source.recovery_suggestion())
            }
            SegmentError::NoValidCut { min_thickness, .. } => {
                SegmentRecoverySuggestion::RelaxMinThickness {
                    current: *min_thickness,
                }
            }
            SegmentError::BooleanOperation { .. } => SegmentRecoverySuggestion::AdjustBuildVolume,
            SegmentError::PartExceedsBuildVolume { .. } => SegmentRecoverySuggestion::ShrinkJoints,
            SegmentError::PartBudgetExceeded { max_parts, .. } => {
                SegmentRecoverySuggestion::RaisePartBudget {
                    current: *max_parts,
                }
            }
            SegmentError::InvalidConfig { param_name, .. } => SegmentRecoverySuggestion::FixConfig {
                param: param_name.clone(),
            },
            SegmentError::Cancelled { .. } => SegmentRecoverySuggestion::None,
            SegmentError::Mesh(e) => SegmentRecoverySuggestion::Mesh(e.recovery_suggestion()),
            SegmentError::Hollow(e) => SegmentRecoverySuggestion::Hollow(e.recovery_suggestion()),
        }
    }

    /// Part the error concerns, if any.
    pub fn part(&self) -> Option<usize> {
        match self {
            SegmentError::HollowingInfeasible { part, .. } => *part,
            SegmentError::NoValidCut { part, .. }
            | SegmentError::BooleanOperation { part, .. }
            | SegmentError::PartExceedsBuildVolume { part, .. }
            | SegmentError::PartBudgetExceeded { part, .. } => Some(*part),
            _ => None,
        }
    }

    // Convenience constructors

    /// Create an invalid config error.
    pub fn invalid_config(details: impl Into<String>) -> Self {
        SegmentError::InvalidConfig {
            details: details.into(),
            param_name: None,
        }
    }

    /// Create an invalid config error for a specific parameter.
    pub fn invalid_param(param: &str, details: impl Into<String>) -> Self {
        SegmentError::InvalidConfig {
            details: details.into(),
            param_name: Some(param.to_string()),
        }
    }

    /// Classify an error raised while loading or validating the input.
    pub fn from_input(err: MeshError) -> Self {
        match err {
            MeshError::UnsupportedUnits { diagonal, details } => {
                SegmentError::UnsupportedUnits { diagonal, details }
            }
            MeshError::EmptyMesh { .. }
            | MeshError::InvalidTopology { .. }
            | MeshError::InvalidVertexIndex { .. }
            | MeshError::InvalidCoordinate { .. }
            | MeshError::ParseError { .. } => SegmentError::InvalidMesh {
                details: err.to_string(),
                source: Some(err),
            },
            other => SegmentError::Mesh(other),
        }
    }

    /// Classify a hollowing error, attributing it to a part when known.
    pub fn from_hollow(err: HollowError, part: Option<usize>) -> Self {
        match err.code() {
            HollowErrorCode::Infeasible | HollowErrorCode::EmptyIsosurface => {
                SegmentError::HollowingInfeasible { part, source: err }
            }
            HollowErrorCode::Cancelled => SegmentError::Cancelled { stage: "hollow" },
            _ => SegmentError::Hollow(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_hollow::InfeasibleReason;

    #[test]
    fn test_error_codes() {
        assert_eq!(SegmentErrorCode::InvalidMesh.as_str(), "SEG-1001");
        assert_eq!(SegmentErrorCode::NoValidCut.as_str(), "SEG-2002");
        assert_eq!(SegmentErrorCode::PartExceedsBuildVolume.as_str(), "SEG-3001");
        assert_eq!(SegmentErrorCode::Cancelled.as_str(), "SEG-4001");
    }

    #[test]
    fn test_no_valid_cut_names_part() {
        let err = SegmentError::NoValidCut {
            part: 3,
            axis: Axis::Y,
            extent: 8.0,
            min_thickness: 5.0,
        };
        assert_eq!(err.kind(), ErrorKind::NoValidCut);
        assert_eq!(err.part(), Some(3));
        let msg = err.to_string();
        assert!(msg.contains("part 3"));
        assert!(msg.contains("y axis"));
        assert!(matches!(
            err.recovery_suggestion(),
            SegmentRecoverySuggestion::RelaxMinThickness { .. }
        ));
    }

    #[test]
    fn test_input_classification() {
        let err = SegmentError::from_input(MeshError::invalid_topology("open edge"));
        assert_eq!(err.kind(), ErrorKind::InvalidMesh);

        let err = SegmentError::from_input(MeshError::unsupported_units(0.001, "too small"));
        assert_eq!(err.kind(), ErrorKind::UnsupportedUnits);
        assert_eq!(err.code(), SegmentErrorCode::UnsupportedUnits);
    }

    #[test]
    fn test_hollow_classification() {
        let infeasible = HollowError::infeasible(InfeasibleReason::WallTooThick, 60.0, 1.0, 60, 100.0);
        let err = SegmentError::from_hollow(infeasible, Some(2));
        assert_eq!(err.kind(), ErrorKind::HollowingInfeasible);
        assert_eq!(err.part(), Some(2));
        assert!(err.to_string().contains("for part 2"));

        let err: SegmentError = HollowError::Cancelled { stage: "erode" }.into();
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        let err: SegmentError = HollowError::grid_too_large([2000, 2000, 2000], 50_000_000).into();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert_eq!(err.code(), SegmentErrorCode::Hollow);
    }

    #[test]
    fn test_wrapped_boolean_kind() {
        let err = SegmentError::from(MeshError::boolean_failed("bore", "grazing"));
        assert_eq!(err.kind(), ErrorKind::BooleanOperation);
    }

    #[test]
    fn test_wrapped_diagnostic_codes() {
        let err = SegmentError::from(MeshError::invalid_topology("open edge"));
        let code = Diagnostic::code(&err).map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("segment::mesh::error"));

        let err = SegmentError::Hollow(HollowError::grid_too_large([2000, 2000, 2000], 50_000_000));
        let code = Diagnostic::code(&err).map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("segment::hollow::error"));
    }

    #[test]
    fn test_exceeds_message() {
        let err = SegmentError::PartExceedsBuildVolume {
            part: 1,
            extents: [310.0, 100.0, 100.0],
            build_volume: [300.0, 320.0, 325.0],
        };
        assert!(err.to_string().contains("310.00 x 100.00 x 100.00"));
        assert_eq!(err.kind(), ErrorKind::PartExceedsBuildVolume);
    }
}
