//! Mesh validation and reporting.
//!
//! Two layers of checks:
//! - **Data validation**: every face index is in range and every coordinate is finite.
//! - **Solid validation**: the surface is closed and two-manifold, with each
//!   undirected edge shared by exactly two faces traversing it in opposite
//!   directions. Boolean and volume operations assume this.

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::bounds::BoundingBox;
use crate::error::{MeshError, MeshResult};
use crate::types::Mesh;

/// Options for data validation.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Fail on the first invalid index or coordinate instead of counting.
    pub reject_on_invalid: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            reject_on_invalid: true,
        }
    }
}

impl ValidationOptions {
    /// Count every issue rather than stopping at the first.
    pub fn collect_all() -> Self {
        Self {
            reject_on_invalid: false,
        }
    }
}

/// Result of data validation.
#[derive(Debug, Clone, Default)]
pub struct DataValidationResult {
    /// Faces referencing a vertex that does not exist.
    pub invalid_index_count: usize,

    /// Coordinates that are NaN.
    pub nan_count: usize,

    /// Coordinates that are infinite.
    pub infinity_count: usize,
}

impl DataValidationResult {
    /// True when no issue was found.
    pub fn is_valid(&self) -> bool {
        self.issue_count() == 0
    }

    /// Total issues found.
    pub fn issue_count(&self) -> usize {
        self.invalid_index_count + self.nan_count + self.infinity_count
    }
}

/// Check face indices and vertex coordinates.
pub fn validate_mesh_data(
    mesh: &Mesh,
    options: &ValidationOptions,
) -> MeshResult<DataValidationResult> {
    let mut result = DataValidationResult::default();
    let vertex_count = mesh.vertices.len();

    for (vertex_idx, vertex) in mesh.vertices.iter().enumerate() {
        let coords = [
            ("x", vertex.position.x),
            ("y", vertex.position.y),
            ("z", vertex.position.z),
        ];

        for (coord_name, value) in coords {
            if value.is_finite() {
                continue;
            }
            if value.is_nan() {
                result.nan_count += 1;
            } else {
                result.infinity_count += 1;
            }
            if options.reject_on_invalid {
                return Err(MeshError::invalid_coordinate(vertex_idx, coord_name, value));
            }
        }
    }

    for (face_idx, face) in mesh.faces.iter().enumerate() {
        for &vertex_idx in face {
            if vertex_idx as usize >= vertex_count {
                result.invalid_index_count += 1;
                if options.reject_on_invalid {
                    return Err(MeshError::invalid_vertex_index(
                        face_idx,
                        vertex_idx,
                        vertex_count,
                    ));
                }
            }
        }
    }

    if result.is_valid() {
        debug!("Mesh data validation passed");
    } else {
        warn!(
            invalid_indices = result.invalid_index_count,
            nan = result.nan_count,
            inf = result.infinity_count,
            "Mesh data validation found issues"
        );
    }

    Ok(result)
}

/// Topology report for a closed-solid check.
#[derive(Debug, Clone)]
pub struct SolidReport {
    /// Total vertex count.
    pub vertex_count: usize,

    /// Total face count.
    pub face_count: usize,

    /// Edges used by exactly one face.
    pub boundary_edge_count: usize,

    /// Edges used by more than two faces.
    pub non_manifold_edge_count: usize,

    /// Edges used twice in the same direction (inconsistent winding).
    pub misoriented_edge_count: usize,

    /// Faces with a repeated vertex index.
    pub degenerate_face_count: usize,

    /// First offending edge, if any.
    pub first_bad_edge: Option<(u32, u32)>,

    /// Bounding box of the vertices.
    pub bounds: Option<BoundingBox>,

    /// Signed volume (positive for outward-facing normals).
    pub signed_volume: f64,

    /// Total surface area.
    pub surface_area: f64,
}

impl SolidReport {
    /// No boundary edges.
    pub fn is_watertight(&self) -> bool {
        self.boundary_edge_count == 0
    }

    /// No edge shared by more than two faces.
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    /// Closed, manifold, consistently wound and non-degenerate.
    pub fn is_closed_solid(&self) -> bool {
        self.face_count > 0
            && self.is_watertight()
            && self.is_manifold()
            && self.misoriented_edge_count == 0
            && self.degenerate_face_count == 0
    }

    /// Negative signed volume on an otherwise valid solid.
    pub fn is_inside_out(&self) -> bool {
        self.signed_volume < 0.0
    }

    /// Absolute volume.
    pub fn volume(&self) -> f64 {
        self.signed_volume.abs()
    }
}

impl std::fmt::Display for SolidReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh Report:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Faces: {}", self.face_count)?;

        if let Some(bb) = &self.bounds {
            writeln!(
                f,
                "  Bounds: [{:.1}, {:.1}, {:.1}] to [{:.1}, {:.1}, {:.1}]",
                bb.min.x, bb.min.y, bb.min.z, bb.max.x, bb.max.y, bb.max.z
            )?;
            writeln!(f, "  Dimensions: {}", bb)?;
        }

        writeln!(f, "  Surface Area: {:.2}", self.surface_area)?;
        writeln!(
            f,
            "  Volume: {:.2} (signed: {:.2})",
            self.volume(),
            self.signed_volume
        )?;
        writeln!(
            f,
            "  Watertight: {} (boundary edges: {})",
            if self.is_watertight() { "yes" } else { "NO" },
            self.boundary_edge_count
        )?;
        writeln!(
            f,
            "  Manifold: {} (non-manifold edges: {})",
            if self.is_manifold() { "yes" } else { "NO" },
            self.non_manifold_edge_count
        )?;
        writeln!(
            f,
            "  Orientation: {}",
            if self.misoriented_edge_count > 0 {
                "INCONSISTENT"
            } else if self.is_inside_out() {
                "INSIDE-OUT"
            } else {
                "correct"
            }
        )?;

        Ok(())
    }
}

#[derive(Default)]
struct EdgeUse {
    forward: u32,
    backward: u32,
}

/// Build a topology report without failing.
pub fn inspect_solid(mesh: &Mesh) -> SolidReport {
    let mut edges: HashMap<(u32, u32), EdgeUse> = HashMap::with_capacity(mesh.faces.len() * 3 / 2);
    let mut degenerate_face_count = 0;

    for face in &mesh.faces {
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            degenerate_face_count += 1;
            continue;
        }
        for k in 0..3 {
            let a = face[k];
            let b = face[(k + 1) % 3];
            let entry = edges.entry((a.min(b), a.max(b))).or_default();
            if a < b {
                entry.forward += 1;
            } else {
                entry.backward += 1;
            }
        }
    }

    let mut boundary_edge_count = 0;
    let mut non_manifold_edge_count = 0;
    let mut misoriented_edge_count = 0;
    let mut first_bad_edge = None;

    // Sorted so the reported edge is stable across runs.
    let mut keys: Vec<_> = edges.keys().copied().collect();
    keys.sort_unstable();

    for key in keys {
        let uses = &edges[&key];
        let total = uses.forward + uses.backward;
        let bad = match total {
            1 => {
                boundary_edge_count += 1;
                true
            }
            2 if uses.forward == 1 => false,
            2 => {
                misoriented_edge_count += 1;
                true
            }
            _ => {
                non_manifold_edge_count += 1;
                true
            }
        };
        if bad && first_bad_edge.is_none() {
            first_bad_edge = Some(key);
        }
    }

    SolidReport {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
        boundary_edge_count,
        non_manifold_edge_count,
        misoriented_edge_count,
        degenerate_face_count,
        first_bad_edge,
        bounds: mesh.bounds(),
        signed_volume: mesh.signed_volume(),
        surface_area: mesh.surface_area(),
    }
}

/// Validate that a mesh is a usable closed solid.
///
/// Runs data validation, then the topology check. An otherwise valid
/// solid with negative signed volume is re-oriented in place with a
/// warning. Open, non-manifold, inconsistently wound or degenerate
/// surfaces are rejected and never silently corrected.
pub fn validate_solid(mesh: &mut Mesh) -> MeshResult<SolidReport> {
    if mesh.is_empty() {
        return Err(MeshError::empty_mesh(format!(
            "{} vertices, {} faces",
            mesh.vertex_count(),
            mesh.face_count()
        )));
    }

    validate_mesh_data(mesh, &ValidationOptions::default())?;

    let mut report = inspect_solid(mesh);

    if report.degenerate_face_count > 0 {
        return Err(MeshError::invalid_topology(format!(
            "{} faces repeat a vertex index",
            report.degenerate_face_count
        )));
    }

    if !report.is_closed_solid() {
        let details = format!(
            "surface is not a closed two-manifold: {} boundary, {} non-manifold, {} misoriented edges",
            report.boundary_edge_count,
            report.non_manifold_edge_count,
            report.misoriented_edge_count
        );
        return Err(match report.first_bad_edge {
            Some((a, b)) => MeshError::invalid_topology_at(details, a, b),
            None => MeshError::invalid_topology(details),
        });
    }

    if report.signed_volume.abs() <= f64::EPSILON {
        return Err(MeshError::invalid_topology("closed surface encloses no volume"));
    }

    if report.is_inside_out() {
        warn!(
            signed_volume = report.signed_volume,
            "Mesh is inside-out; reversing face winding"
        );
        mesh.flip_faces();
        report.signed_volume = -report.signed_volume;
    }

    info!(
        vertices = report.vertex_count,
        faces = report.face_count,
        volume = format!("{:.2}", report.volume()),
        "Mesh validated as closed solid"
    );

    Ok(report)
}
