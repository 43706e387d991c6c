//! Geometric queries: axis-aligned ray casting and triangle/box overlap.

use nalgebra::{Point3, Vector3};

use crate::bounds::{Axis, BoundingBox, Side};
use crate::types::{Mesh, Triangle};

/// Möller–Trumbore ray-triangle intersection.
/// Returns the distance t along the ray if intersection occurs past `min_t`.
pub fn ray_triangle_intersect(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &Triangle,
    min_t: f64,
) -> Option<f64> {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Parallel
    if a.abs() < 1e-12 {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - tri.v0;
    let u = f * s.dot(&h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);

    if t > min_t { Some(t) } else { None }
}

impl Mesh {
    /// Distance from `origin` to the nearest surface along an axis direction.
    ///
    /// The ray travels along `axis` towards `side`. Hits closer than `min_t`
    /// are ignored so a ray starting on a face does not report that face.
    /// Returns `None` when the ray leaves the mesh without a hit.
    pub fn depth_along(
        &self,
        origin: &Point3<f64>,
        axis: Axis,
        side: Side,
        min_t: f64,
    ) -> Option<f64> {
        let direction = axis.unit() * side.sign();
        let (u, v) = axis.plane_axes();
        let (ui, vi) = (u.index(), v.index());

        self.triangles()
            .filter(|tri| {
                // Cheap reject on the footprint before the exact test.
                let pts = tri.points();
                let min_u = pts.iter().map(|p| p[ui]).fold(f64::INFINITY, f64::min);
                let max_u = pts.iter().map(|p| p[ui]).fold(f64::NEG_INFINITY, f64::max);
                let min_v = pts.iter().map(|p| p[vi]).fold(f64::INFINITY, f64::min);
                let max_v = pts.iter().map(|p| p[vi]).fold(f64::NEG_INFINITY, f64::max);
                origin[ui] >= min_u && origin[ui] <= max_u && origin[vi] >= min_v && origin[vi] <= max_v
            })
            .filter_map(|tri| ray_triangle_intersect(origin, &direction, &tri, min_t))
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// Separating-axis test between a triangle and an axis-aligned box.
///
/// Touching counts as overlapping when `epsilon` is positive; a negative
/// `epsilon` shrinks the box so that mere contact is not reported.
pub fn triangle_intersects_box(tri: &Triangle, bb: &BoundingBox, epsilon: f64) -> bool {
    let center = bb.center();
    let half = bb.extents() * 0.5 + Vector3::repeat(epsilon);
    if half.iter().any(|h| *h <= 0.0) {
        return false;
    }

    let v0 = tri.v0 - center;
    let v1 = tri.v1 - center;
    let v2 = tri.v2 - center;
    let edges = [v1 - v0, v2 - v1, v0 - v2];

    let separated = |axis: &Vector3<f64>| -> bool {
        let p0 = axis.dot(&v0);
        let p1 = axis.dot(&v1);
        let p2 = axis.dot(&v2);
        let r = half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs();
        p0.min(p1).min(p2) > r || p0.max(p1).max(p2) < -r
    };

    // Box face normals
    for i in 0..3 {
        let mut axis = Vector3::zeros();
        axis[i] = 1.0;
        if separated(&axis) {
            return false;
        }
    }

    // Triangle normal
    let normal = edges[0].cross(&edges[1]);
    if normal.norm_squared() > 0.0 && separated(&normal) {
        return false;
    }

    // Edge cross products
    for edge in &edges {
        for i in 0..3 {
            let mut box_axis = Vector3::zeros();
            box_axis[i] = 1.0;
            let axis = edge.cross(&box_axis);
            if axis.norm_squared() > 1e-24 && separated(&axis) {
                return false;
            }
        }
    }

    true
}
