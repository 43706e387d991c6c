//! Planar cross-sections of a mesh.
//!
//! A [`PlanarSection`] collects the faces of a mesh that lie flat on an
//! axis-aligned plane and face a given side. After a planar cut these are
//! exactly the cap faces, so the section describes the contour of the part
//! at the seam: its triangles give the covered area and its boundary edges
//! the outline used for edge-margin checks.

use hashbrown::HashMap;

use crate::bounds::{Axis, Side};
use crate::types::Mesh;

/// Tolerance used to decide whether a vertex lies on the section plane.
pub const PLANE_TOLERANCE: f64 = 1e-6;

/// Flat region of a mesh on an axis-aligned plane.
#[derive(Debug, Clone)]
pub struct PlanarSection {
    /// Plane normal axis.
    pub axis: Axis,

    /// Plane offset along `axis`.
    pub coordinate: f64,

    /// Side the collected faces point towards.
    pub facing: Side,

    /// Indices of the collected faces in the source mesh.
    pub face_indices: Vec<usize>,

    /// Triangles projected onto the plane.
    pub triangles: Vec<[[f64; 2]; 3]>,

    /// Outline segments projected onto the plane.
    pub boundary: Vec<[[f64; 2]; 2]>,
}

impl PlanarSection {
    /// Gather the faces lying on `axis = coordinate` whose normal points to `facing`.
    pub fn extract(mesh: &Mesh, axis: Axis, coordinate: f64, facing: Side) -> Self {
        let ai = axis.index();
        let mut face_indices = Vec::new();
        let mut triangles = Vec::new();
        let mut edge_count: HashMap<(u32, u32), u32> = HashMap::new();

        for (fi, face) in mesh.faces.iter().enumerate() {
            let on_plane = face
                .iter()
                .all(|&v| (mesh.position(v)[ai] - coordinate).abs() <= PLANE_TOLERANCE);
            if !on_plane {
                continue;
            }
            let Some(tri) = mesh.triangle(fi) else {
                continue;
            };
            if tri.normal_unnormalized()[ai] * facing.sign() <= 0.0 {
                continue;
            }

            face_indices.push(fi);
            triangles.push([
                axis.project(&tri.v0),
                axis.project(&tri.v1),
                axis.project(&tri.v2),
            ]);
            for k in 0..3 {
                let a = face[k];
                let b = face[(k + 1) % 3];
                *edge_count.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }

        let mut boundary_keys: Vec<_> = edge_count
            .into_iter()
            .filter(|&(_, n)| n == 1)
            .map(|(k, _)| k)
            .collect();
        boundary_keys.sort_unstable();

        let boundary = boundary_keys
            .into_iter()
            .map(|(a, b)| [axis.project(&mesh.position(a)), axis.project(&mesh.position(b))])
            .collect();

        Self {
            axis,
            coordinate,
            facing,
            face_indices,
            triangles,
            boundary,
        }
    }

    /// No faces on the plane.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Total covered area.
    pub fn area(&self) -> f64 {
        self.triangles.iter().map(|t| triangle_area(t).abs()).sum()
    }

    /// Area-weighted centroid, or `None` for an empty section.
    pub fn centroid(&self) -> Option<[f64; 2]> {
        let mut total = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for t in &self.triangles {
            let a = triangle_area(t).abs();
            cx += a * (t[0][0] + t[1][0] + t[2][0]) / 3.0;
            cy += a * (t[0][1] + t[1][1] + t[2][1]) / 3.0;
            total += a;
        }
        (total > 0.0).then(|| [cx / total, cy / total])
    }

    /// 2D bounds as `(min, max)`.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let mut pts = self.triangles.iter().flat_map(|t| t.iter());
        let first = *pts.next()?;
        let (mut min, mut max) = (first, first);
        for p in pts {
            min = [min[0].min(p[0]), min[1].min(p[1])];
            max = [max[0].max(p[0]), max[1].max(p[1])];
        }
        Some((min, max))
    }

    /// Whether a plane point lies inside the section.
    pub fn contains(&self, p: [f64; 2]) -> bool {
        self.triangles.iter().any(|t| point_in_triangle(p, t))
    }

    /// Distance from a plane point to the nearest outline segment.
    pub fn distance_to_boundary(&self, p: [f64; 2]) -> f64 {
        self.boundary
            .iter()
            .map(|s| point_segment_distance(p, s[0], s[1]))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Signed area of a 2D triangle (positive when counter-clockwise).
pub fn triangle_area(t: &[[f64; 2]; 3]) -> f64 {
    0.5 * ((t[1][0] - t[0][0]) * (t[2][1] - t[0][1]) - (t[2][0] - t[0][0]) * (t[1][1] - t[0][1]))
}

/// Signed area of a closed polygon by the shoelace formula.
pub fn polygon_area(points: &[[f64; 2]]) -> f64 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a[0] * b[1] - b[0] * a[1];
    }
    sum * 0.5
}

fn point_in_triangle(p: [f64; 2], t: &[[f64; 2]; 3]) -> bool {
    let cross = |a: [f64; 2], b: [f64; 2]| (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0]);
    let d0 = cross(t[0], t[1]);
    let d1 = cross(t[1], t[2]);
    let d2 = cross(t[2], t[0]);
    let eps = 1e-12;
    let has_neg = d0 < -eps || d1 < -eps || d2 < -eps;
    let has_pos = d0 > eps || d1 > eps || d2 > eps;
    !(has_neg && has_pos)
}

/// Distance from a point to a segment in 2D.
pub fn point_segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    let t = if len_sq > 0.0 {
        ((ap[0] * ab[0] + ap[1] * ab[1]) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let dx = ap[0] - t * ab[0];
    let dy = ap[1] - t * ab[1];
    (dx * dx + dy * dy).sqrt()
}
