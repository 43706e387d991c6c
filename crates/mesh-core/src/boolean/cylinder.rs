//! Cylinder bores and bosses on planar faces.

use std::f64::consts::TAU;

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};
use tracing::trace;

use super::cap::triangulate_outline;
use crate::bounds::{Axis, BoundingBox, Side};
use crate::error::{MeshError, MeshResult};
use crate::query::triangle_intersects_box;
use crate::section::{PlanarSection, point_segment_distance};
use crate::types::{Mesh, Triangle, Vertex};

/// Clearance required between the footprint and the face outline.
const FOOTPRINT_CLEARANCE: f64 = 1e-6;

/// Slack along the axis when testing for interference with other faces.
const AXIAL_SLACK: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Subtract: blind hole into the face.
    Bore,
    /// Unite: boss grown out of the face.
    Boss,
}

impl Mode {
    fn operation(self) -> &'static str {
        match self {
            Mode::Bore => "bore",
            Mode::Boss => "boss",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CylinderTool {
    pub axis: Axis,
    pub base: f64,
    pub center: [f64; 2],
    pub radius: f64,
    pub length: f64,
    pub direction: Side,
    pub segments: usize,
}

impl CylinderTool {
    fn end(&self) -> f64 {
        self.base + self.direction.sign() * self.length
    }

    fn ring(&self) -> Vec<[f64; 2]> {
        (0..self.segments)
            .map(|k| {
                let theta = TAU * k as f64 / self.segments as f64;
                [
                    self.center[0] + self.radius * theta.cos(),
                    self.center[1] + self.radius * theta.sin(),
                ]
            })
            .collect()
    }

    fn polygon_area(&self) -> f64 {
        let n = self.segments as f64;
        0.5 * n * self.radius * self.radius * (TAU / n).sin()
    }

    /// Axial interval swept by the tool, shifted past the base plane.
    fn slab(&self) -> (f64, f64) {
        let s = self.direction.sign();
        let a = self.base + s * AXIAL_SLACK;
        let b = self.end() + s * AXIAL_SLACK;
        (a.min(b), a.max(b))
    }

    fn bounds(&self) -> BoundingBox {
        let (lo, hi) = self.slab();
        let r = self.radius;
        let min = self.axis.lift([self.center[0] - r, self.center[1] - r], lo);
        let max = self.axis.lift([self.center[0] + r, self.center[1] + r], hi);
        BoundingBox::new(min, max)
    }
}

/// Bore into or grow out of the planar face under the tool footprint.
pub(crate) fn apply(mesh: &Mesh, tool: &CylinderTool, mode: Mode) -> MeshResult<Mesh> {
    let op = mode.operation();
    let axis = tool.axis;
    let ai = axis.index();

    let params_ok = tool.radius.is_finite()
        && tool.length.is_finite()
        && tool.base.is_finite()
        && tool.radius > 0.0
        && tool.length > 0.0
        && tool.segments >= 3;
    if !params_ok {
        return Err(MeshError::boolean_failed(
            op,
            format!(
                "invalid cylinder: radius {}, length {}, {} segments",
                tool.radius, tool.length, tool.segments
            ),
        ));
    }

    let outward = match mode {
        Mode::Bore => tool.direction.opposite(),
        Mode::Boss => tool.direction,
    };

    let section = PlanarSection::extract(mesh, axis, tool.base, outward);
    if section.is_empty() {
        return Err(MeshError::boolean_failed(
            op,
            format!("no face on {axis} = {:.4} facing {outward}", tool.base),
        ));
    }
    if !section.contains(tool.center) {
        return Err(MeshError::boolean_failed(op, "footprint center is outside the face"));
    }
    let clearance = section.distance_to_boundary(tool.center);
    if clearance <= tool.radius + FOOTPRINT_CLEARANCE {
        return Err(MeshError::boolean_failed(
            op,
            format!(
                "footprint radius {:.3} reaches the face outline ({:.3} away)",
                tool.radius, clearance
            ),
        ));
    }

    let cap_faces: HashSet<usize> = section.face_indices.iter().copied().collect();

    // Outline of the cap region as mesh edges.
    let mut edge_count: HashMap<(u32, u32), u32> = HashMap::new();
    for &fi in &section.face_indices {
        let f = mesh.faces[fi];
        for k in 0..3 {
            let (a, b) = (f[k], f[(k + 1) % 3]);
            *edge_count.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    let mut outline: Vec<(u32, u32)> = edge_count
        .iter()
        .filter(|&(_, &n)| n == 1)
        .map(|(&k, _)| k)
        .collect();
    outline.sort_unstable();
    let outline_vertices: HashSet<u32> = outline.iter().flat_map(|&(a, b)| [a, b]).collect();

    // Interior cap vertices disappear with the old cap, so nothing else may use them.
    let interior: HashSet<u32> = section
        .face_indices
        .iter()
        .flat_map(|&fi| mesh.faces[fi])
        .filter(|v| !outline_vertices.contains(v))
        .collect();

    let tool_bounds = tool.bounds();
    let (slab_lo, slab_hi) = tool.slab();
    for (fi, face) in mesh.faces.iter().enumerate() {
        if cap_faces.contains(&fi) {
            continue;
        }
        if face.iter().any(|v| interior.contains(v)) {
            return Err(MeshError::boolean_failed(
                op,
                format!("face {fi} shares an interior vertex of the planar face"),
            ));
        }
        let tri = Triangle::new(
            mesh.position(face[0]),
            mesh.position(face[1]),
            mesh.position(face[2]),
        );
        if !triangle_intersects_box(&tri, &tool_bounds, 0.0) {
            continue;
        }
        if triangle_hits_cylinder(&tri, axis, tool.center, tool.radius, slab_lo, slab_hi) {
            return Err(MeshError::boolean_failed(
                op,
                format!("cylinder interferes with face {fi}"),
            ));
        }
    }

    let mut out = Mesh::with_capacity(
        mesh.vertex_count() + 2 * tool.segments,
        mesh.face_count() + 4 * tool.segments,
    );
    out.vertices.extend_from_slice(&mesh.vertices);
    out.faces.extend(
        mesh.faces
            .iter()
            .enumerate()
            .filter(|(fi, _)| !cap_faces.contains(fi))
            .map(|(_, f)| *f),
    );

    let ring = tool.ring();
    let n = ring.len() as u32;
    let base_start = out.vertices.len() as u32;
    for uv in &ring {
        out.vertices.push(Vertex::new(axis.lift(*uv, tool.base)));
    }
    let end_start = out.vertices.len() as u32;
    for uv in &ring {
        out.vertices.push(Vertex::new(axis.lift(*uv, tool.end())));
    }

    // New cap: old outline with the ring as an inner loop.
    let mut cap_vertices: Vec<(u32, [f64; 2])> = outline_vertices
        .iter()
        .map(|&v| (v, axis.project(&mesh.position(v))))
        .collect();
    cap_vertices.sort_unstable_by_key(|&(v, _)| v);
    cap_vertices.extend(ring.iter().enumerate().map(|(k, uv)| (base_start + k as u32, *uv)));
    let mut cap_edges = outline.clone();
    cap_edges.extend((0..n).map(|k| (base_start + k, base_start + (k + 1) % n)));

    let cap = triangulate_outline(&cap_vertices, &cap_edges, op)?;
    let expected_area = section.area() - tool.polygon_area();
    if (cap.area - expected_area).abs() > 1e-6 * expected_area.max(1.0) {
        return Err(MeshError::boolean_failed(
            op,
            format!(
                "rebuilt face area {:.6} does not match expected {:.6}",
                cap.area, expected_area
            ),
        ));
    }
    let cap_count = cap.triangles.len();
    for mut tri in cap.triangles {
        // Counter-clockwise in the plane faces +axis.
        if outward == Side::Below {
            tri.swap(1, 2);
        }
        out.faces.push(tri);
    }

    let outward_normal = axis.unit() * outward.sign();
    let radial_sign = match mode {
        Mode::Boss => 1.0,
        Mode::Bore => -1.0,
    };
    let center3 = axis.lift(tool.center, tool.base);

    for k in 0..n {
        let b0 = base_start + k;
        let b1 = base_start + (k + 1) % n;
        let e0 = end_start + k;
        let e1 = end_start + (k + 1) % n;
        let mid = nalgebra::center(&out.position(b0), &out.position(b1));
        let mut radial = mid - center3;
        radial[ai] = 0.0;
        let expected = radial * radial_sign;
        push_oriented(&mut out, [b0, b1, e1], &expected);
        push_oriented(&mut out, [b0, e1, e0], &expected);
    }

    for k in 1..n - 1 {
        push_oriented(&mut out, [end_start, end_start + k, end_start + k + 1], &outward_normal);
    }

    out.compact();

    let before = mesh.signed_volume();
    let after = out.signed_volume();
    let prism = tool.polygon_area() * tool.length;
    let expected_delta = match mode {
        Mode::Boss => prism,
        Mode::Bore => -prism,
    };
    if ((after - before) - expected_delta).abs() > 1e-6 * before.abs().max(1.0) {
        return Err(MeshError::boolean_failed(
            op,
            format!(
                "volume changed by {:.6}, expected {:.6}",
                after - before,
                expected_delta
            ),
        ));
    }

    trace!(
        op,
        axis = %axis,
        base = tool.base,
        radius = tool.radius,
        length = tool.length,
        cap_faces = cap_count,
        "Cylinder applied"
    );

    Ok(out)
}

fn push_oriented(mesh: &mut Mesh, mut face: [u32; 3], expected: &Vector3<f64>) {
    let a = mesh.position(face[0]);
    let b = mesh.position(face[1]);
    let c = mesh.position(face[2]);
    if (b - a).cross(&(c - a)).dot(expected) < 0.0 {
        face.swap(1, 2);
    }
    mesh.faces.push(face);
}

/// Whether a triangle enters an axis-aligned cylinder between two planes.
///
/// The triangle is clipped to the slab `lo <= p[axis] <= hi`, and the
/// remaining polygon is tested against the circle in the plane.
fn triangle_hits_cylinder(
    tri: &Triangle,
    axis: Axis,
    center: [f64; 2],
    radius: f64,
    lo: f64,
    hi: f64,
) -> bool {
    let ai = axis.index();
    let mut poly: Vec<Point3<f64>> = tri.points().to_vec();
    poly = clip_polygon(&poly, |p| lo - p[ai]);
    poly = clip_polygon(&poly, |p| p[ai] - hi);
    if poly.is_empty() {
        return false;
    }

    let pts: Vec<[f64; 2]> = poly.iter().map(|p| axis.project(p)).collect();
    if pts.len() >= 3 && point_in_convex(center, &pts) {
        return true;
    }
    let n = pts.len();
    (0..n).any(|i| point_segment_distance(center, pts[i], pts[(i + 1) % n]) < radius)
}

/// Keep the part of a convex polygon where `f(p) <= 0`.
fn clip_polygon(poly: &[Point3<f64>], f: impl Fn(&Point3<f64>) -> f64) -> Vec<Point3<f64>> {
    let mut out = Vec::with_capacity(poly.len() + 1);
    let n = poly.len();
    for i in 0..n {
        let cur = poly[i];
        let next = poly[(i + 1) % n];
        let (dc, dn) = (f(&cur), f(&next));
        if dc <= 0.0 {
            out.push(cur);
        }
        if (dc < 0.0 && dn > 0.0) || (dc > 0.0 && dn < 0.0) {
            let t = dc / (dc - dn);
            out.push(cur + (next - cur) * t);
        }
    }
    out
}

fn point_in_convex(p: [f64; 2], poly: &[[f64; 2]]) -> bool {
    let n = poly.len();
    let mut sign = 0.0f64;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let cross = (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0]);
        if cross.abs() <= 1e-12 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}
