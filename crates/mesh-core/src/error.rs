//! Errors raised while loading, checking and cutting meshes.
//!
//! Every [`MeshError`] carries a stable [`ErrorCode`] (`MESH-NNNN`) for
//! scripts, a [`RecoverySuggestion`] for people, and where it makes sense
//! a [`MeshLocation`] pointing at the offending vertex, face, edge or file.
//!
//! Code ranges:
//!
//! | Range       | Area                                   |
//! |-------------|----------------------------------------|
//! | `MESH-1xxx` | reading and writing files              |
//! | `MESH-2xxx` | solid checks and unit resolution       |
//! | `MESH-3xxx` | planar cuts and capping                |
//! | `MESH-4xxx` | file formats                           |
//!
//! ```rust,ignore
//! use mesh_core::MeshError;
//!
//! let err = MeshError::unsupported_units(0.0004, "below 0.5 mm in every unit");
//! assert_eq!(err.code().as_str(), "MESH-2005");
//! eprintln!("{}", err.recovery_suggestion());
//! ```

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result alias used throughout the kernel.
pub type MeshResult<T> = Result<T, MeshError>;

/// Stable numeric identifier of a [`MeshError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    IoRead = 1001,
    IoWrite = 1002,
    ParseError = 1003,
    InvalidVertexIndex = 2001,
    InvalidCoordinate = 2002,
    EmptyMesh = 2003,
    InvalidTopology = 2004,
    UnsupportedUnits = 2005,
    BooleanFailed = 3001,
    UnsupportedFormat = 4001,
}

impl ErrorCode {
    /// `MESH-NNNN` form of the code.
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            IoRead => "MESH-1001",
            IoWrite => "MESH-1002",
            ParseError => "MESH-1003",
            InvalidVertexIndex => "MESH-2001",
            InvalidCoordinate => "MESH-2002",
            EmptyMesh => "MESH-2003",
            InvalidTopology => "MESH-2004",
            UnsupportedUnits => "MESH-2005",
            BooleanFailed => "MESH-3001",
            UnsupportedFormat => "MESH-4001",
        }
    }

    /// Numeric part of the code.
    pub fn number(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a user can try after a [`MeshError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Export the model again, optionally in a named format.
    ReexportFile { format: Option<String> },
    /// Convert to one of the listed formats.
    UseDifferentFormat { suggested: Vec<String> },
    /// Inspect the input for the listed problems.
    CheckSourceMesh { checks: Vec<String> },
    /// Change the listed parameters.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// Give the source units instead of relying on size detection.
    SpecifyUnits,
    None,
}

impl fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReexportFile { format: Some(format) } => {
                write!(f, "export the model again as {format}")
            }
            Self::ReexportFile { format: None } => f.write_str("export the model again"),
            Self::UseDifferentFormat { suggested } => {
                write!(f, "convert the file to {}", suggested.join(" or "))
            }
            Self::CheckSourceMesh { checks } => {
                write!(f, "inspect the input for {}", checks.join("; "))
            }
            Self::AdjustParameters { parameters } => {
                f.write_str("change ")?;
                for (i, (name, hint)) in parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{name} ({hint})")?;
                }
                Ok(())
            }
            Self::SpecifyUnits => f.write_str("give the source units explicitly (mm, cm, m or in)"),
            Self::None => f.write_str("nothing to suggest"),
        }
    }
}

/// Where in the input a [`MeshError`] was found.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshLocation {
    Vertex { index: usize },
    Face { index: usize },
    Edge { vertex_a: u32, vertex_b: u32 },
    File { path: PathBuf },
}

impl fmt::Display for MeshLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex { index } => write!(f, "vertex #{index}"),
            Self::Face { index } => write!(f, "face #{index}"),
            Self::Edge { vertex_a, vertex_b } => write!(f, "edge {vertex_a}-{vertex_b}"),
            Self::File { path } => write!(f, "file {}", path.display()),
        }
    }
}

/// Failure in the mesh kernel.
#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    #[error("cannot read {path}")]
    #[diagnostic(code(mesh::io::read), help("is the path correct and readable?"))]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}")]
    #[diagnostic(code(mesh::io::write), help("is the target directory present and writable?"))]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed mesh file {path}: {details}")]
    #[diagnostic(code(mesh::io::parse), help("export the model again, preferably as binary STL"))]
    ParseError { path: PathBuf, details: String },

    #[error("no mesh codec for extension {extension:?}")]
    #[diagnostic(
        code(mesh::io::format),
        help("inputs may be .stl or .obj; outputs may be .stl or .3mf")
    )]
    UnsupportedFormat { extension: Option<String> },

    #[error("mesh has no usable geometry: {details}")]
    #[diagnostic(code(mesh::solid::empty))]
    EmptyMesh { details: String },

    #[error("mesh is not a closed solid: {details}")]
    #[diagnostic(
        code(mesh::solid::topology),
        help("close holes, remove duplicate faces and fix flipped normals before splitting")
    )]
    InvalidTopology {
        details: String,
        edge: Option<(u32, u32)>,
    },

    #[error("face {face_index} uses vertex {vertex_index} of {vertex_count} vertices")]
    #[diagnostic(code(mesh::solid::index))]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    #[error("vertex {vertex_index} has non-finite {coordinate} = {value}")]
    #[diagnostic(code(mesh::solid::coordinate))]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    #[error("source units unresolved for diagonal {diagonal}: {details}")]
    #[diagnostic(code(mesh::units), help("pass --units mm|cm|m|in"))]
    UnsupportedUnits { diagonal: f64, details: String },

    #[error("{operation} cut failed: {details}")]
    #[diagnostic(code(mesh::cut), help("move the cut plane slightly off coincident geometry"))]
    BooleanFailed { details: String, operation: String },
}

impl MeshError {
    /// Stable code for scripts and logs.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::IoRead { .. } => ErrorCode::IoRead,
            Self::IoWrite { .. } => ErrorCode::IoWrite,
            Self::ParseError { .. } => ErrorCode::ParseError,
            Self::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            Self::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            Self::InvalidTopology { .. } => ErrorCode::InvalidTopology,
            Self::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            Self::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            Self::UnsupportedUnits { .. } => ErrorCode::UnsupportedUnits,
            Self::BooleanFailed { .. } => ErrorCode::BooleanFailed,
        }
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        fn checks(items: &[&str]) -> RecoverySuggestion {
            RecoverySuggestion::CheckSourceMesh {
                checks: items.iter().map(|s| s.to_string()).collect(),
            }
        }

        match self {
            Self::IoRead { .. } => checks(&["a missing file", "read permission"]),
            Self::IoWrite { .. } => checks(&["a missing output directory", "write permission"]),
            Self::ParseError { .. } => RecoverySuggestion::ReexportFile {
                format: Some("binary STL".into()),
            },
            Self::UnsupportedFormat { .. } => RecoverySuggestion::UseDifferentFormat {
                suggested: vec!["STL".into(), "OBJ".into()],
            },
            Self::EmptyMesh { .. } => checks(&["an empty export", "hidden or unselected objects"]),
            Self::InvalidTopology { .. } => {
                checks(&["open boundaries", "edges shared by three or more faces", "flipped faces"])
            }
            Self::InvalidVertexIndex { .. } => RecoverySuggestion::ReexportFile { format: None },
            Self::InvalidCoordinate { .. } => checks(&["NaN or infinite coordinates"]),
            Self::UnsupportedUnits { .. } => RecoverySuggestion::SpecifyUnits,
            Self::BooleanFailed { .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![("cut offset".into(), "nudge by a fraction of a millimeter".into())],
            },
        }
    }

    pub fn location(&self) -> Option<MeshLocation> {
        match self {
            Self::InvalidVertexIndex { face_index, .. } => {
                Some(MeshLocation::Face { index: *face_index })
            }
            Self::InvalidCoordinate { vertex_index, .. } => {
                Some(MeshLocation::Vertex { index: *vertex_index })
            }
            Self::InvalidTopology { edge: Some((a, b)), .. } => Some(MeshLocation::Edge {
                vertex_a: *a,
                vertex_b: *b,
            }),
            Self::IoRead { path, .. } | Self::IoWrite { path, .. } | Self::ParseError { path, .. } => {
                Some(MeshLocation::File { path: path.clone() })
            }
            _ => None,
        }
    }

    /// Cut failures may succeed with a nudged plane; nothing else is worth retrying.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BooleanFailed { .. })
    }

    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoRead { path: path.into(), source }
    }

    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoWrite { path: path.into(), source }
    }

    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::ParseError { path: path.into(), details: details.into() }
    }

    pub fn invalid_vertex_index(face_index: usize, vertex_index: u32, vertex_count: usize) -> Self {
        Self::InvalidVertexIndex { face_index, vertex_index, vertex_count }
    }

    pub fn invalid_coordinate(vertex_index: usize, coordinate: &'static str, value: f64) -> Self {
        Self::InvalidCoordinate { vertex_index, coordinate, value }
    }

    pub fn empty_mesh(details: impl Into<String>) -> Self {
        Self::EmptyMesh { details: details.into() }
    }

    pub fn invalid_topology(details: impl Into<String>) -> Self {
        Self::InvalidTopology { details: details.into(), edge: None }
    }

    /// Topology failure at the edge `a`-`b`.
    pub fn invalid_topology_at(details: impl Into<String>, a: u32, b: u32) -> Self {
        Self::InvalidTopology { details: details.into(), edge: Some((a, b)) }
    }

    pub fn unsupported_units(diagonal: f64, details: impl Into<String>) -> Self {
        Self::UnsupportedUnits { diagonal, details: details.into() }
    }

    /// Cut or cap failure; `operation` names the step ("split", "cap", ...).
    pub fn boolean_failed(operation: impl Into<String>, details: impl Into<String>) -> Self {
        Self::BooleanFailed { details: details.into(), operation: operation.into() }
    }

    pub fn unsupported_format(extension: Option<String>) -> Self {
        Self::UnsupportedFormat { extension }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let err = MeshError::invalid_vertex_index(5, 100, 50);
        assert_eq!(err.code(), ErrorCode::InvalidVertexIndex);
        assert_eq!(err.code().to_string(), "MESH-2001");
        assert_eq!(err.code().number(), 2001);

        let err = MeshError::boolean_failed("split", "open contour");
        assert_eq!(err.code().as_str(), "MESH-3001");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_units_error_asks_for_units() {
        let err = MeshError::unsupported_units(1e-6, "too small in any unit");
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::SpecifyUnits);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_topology_location() {
        let err = MeshError::invalid_topology_at("edge used by 3 faces", 4, 9);
        assert_eq!(
            err.location(),
            Some(MeshLocation::Edge { vertex_a: 4, vertex_b: 9 })
        );
        assert_eq!(err.location().map(|l| l.to_string()).as_deref(), Some("edge 4-9"));
        assert!(MeshError::invalid_topology("open").location().is_none());
    }

    #[test]
    fn test_messages() {
        let err = MeshError::invalid_vertex_index(5, 100, 50);
        assert_eq!(err.to_string(), "face 5 uses vertex 100 of 50 vertices");

        let err = MeshError::boolean_failed("cap", "loop does not close");
        assert_eq!(err.to_string(), "cap cut failed: loop does not close");

        let hint = MeshError::boolean_failed("cap", "x").recovery_suggestion().to_string();
        assert!(hint.starts_with("change cut offset"));
    }
}
