//! Indexed triangle meshes.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};

use crate::bounds::BoundingBox;

/// One mesh corner. Millimeters after unit normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f64>,
}

impl Vertex {
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }

    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self { position: Point3::new(x, y, z) }
    }
}

/// Shared-vertex triangle soup.
///
/// Faces are counter-clockwise seen from outside, so a closed solid has a
/// positive [`signed_volume`](Mesh::signed_volume). Nothing is cached:
/// bounds and measures are recomputed from the current vertices on every
/// call, which keeps them honest after cuts and edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Mesh from coordinate triples and index triples, as loaders produce them.
    pub fn from_raw(positions: &[[f64; 3]], faces: &[[u32; 3]]) -> Self {
        let vertices = positions
            .iter()
            .map(|&[x, y, z]| Vertex::from_coords(x, y, z))
            .collect();
        Self { vertices, faces: faces.to_vec() }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when there is nothing to measure: no vertices or no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() || self.vertices.is_empty()
    }

    #[inline]
    pub fn position(&self, index: u32) -> Point3<f64> {
        self.vertices[index as usize].position
    }

    /// Axis-aligned box around all vertices, `None` when there are none.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(|v| v.position))
    }

    fn corners(&self, face: [u32; 3]) -> Triangle {
        Triangle::new(self.position(face[0]), self.position(face[1]), self.position(face[2]))
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|&face| self.corners(face))
    }

    pub fn triangle(&self, face_idx: usize) -> Option<Triangle> {
        self.faces.get(face_idx).map(|&face| self.corners(face))
    }

    pub fn translate(&mut self, offset: Vector3<f64>) {
        self.vertices.iter_mut().for_each(|v| v.position += offset);
    }

    /// Uniform scale about the origin; unit normalization uses this.
    pub fn scale(&mut self, factor: f64) {
        self.vertices.iter_mut().for_each(|v| v.position.coords *= factor);
    }

    /// Reverse every face's winding, turning the solid inside out.
    pub fn flip_faces(&mut self) {
        self.faces.iter_mut().for_each(|f| f.swap(1, 2));
    }

    /// Add `other`'s geometry to this mesh. The pieces are not welded.
    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces
            .extend(other.faces.iter().map(|f| f.map(|i| i + base)));
    }

    /// Remove vertices no face uses, renumbering faces in first-use order.
    ///
    /// Returns how many vertices were dropped.
    pub fn compact(&mut self) -> usize {
        let before = self.vertices.len();
        let mut new_index: HashMap<u32, u32> = HashMap::with_capacity(before);
        let mut kept = Vec::with_capacity(before);

        for idx in self.faces.iter_mut().flatten() {
            let old = *idx;
            *idx = *new_index.entry(old).or_insert_with(|| {
                kept.push(self.vertices[old as usize]);
                (kept.len() - 1) as u32
            });
        }

        self.vertices = kept;
        before - self.vertices.len()
    }

    /// Enclosed volume, positive for an outward-wound closed solid.
    ///
    /// Sums signed tetrahedra against the first vertex instead of the world
    /// origin so parts far from the origin do not lose precision.
    pub fn signed_volume(&self) -> f64 {
        let Some(apex) = self.vertices.first().map(|v| v.position) else {
            return 0.0;
        };

        let six_times: f64 = self
            .triangles()
            .map(|t| {
                let (a, b, c) = (t.v0 - apex, t.v1 - apex, t.v2 - apex);
                a.dot(&b.cross(&c))
            })
            .sum();
        six_times / 6.0
    }

    /// Magnitude of [`signed_volume`](Mesh::signed_volume).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    #[inline]
    pub fn is_inside_out(&self) -> bool {
        self.signed_volume() < 0.0
    }

    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|t| t.area()).sum()
    }
}

/// Three resolved corner positions of a face.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Edge cross product; its length is twice the area.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, or `None` for a zero-area sliver.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        self.normal_unnormalized().try_normalize(f64::EPSILON)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        0.5 * self.normal_unnormalized().norm()
    }

    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    #[inline]
    pub fn points(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn block(size: f64) -> Mesh {
        let s = size;
        Mesh::from_raw(
            &[
                [0.0, 0.0, 0.0],
                [s, 0.0, 0.0],
                [s, s, 0.0],
                [0.0, s, 0.0],
                [0.0, 0.0, s],
                [s, 0.0, s],
                [s, s, s],
                [0.0, s, s],
            ],
            &[
                [0, 2, 1],
                [0, 3, 2],
                [4, 5, 6],
                [4, 6, 7],
                [0, 1, 5],
                [0, 5, 4],
                [3, 7, 6],
                [3, 6, 2],
                [0, 4, 7],
                [0, 7, 3],
                [1, 2, 6],
                [1, 6, 5],
            ],
        )
    }

    #[test]
    fn test_right_hand_normal() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let n = tri.normal().unwrap();
        assert_relative_eq!(n.z, 1.0);
        assert_relative_eq!(tri.area(), 0.5);
    }

    #[test]
    fn test_collinear_has_no_normal() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert!(tri.normal().is_none());
        assert_eq!(tri.area(), 0.0);
    }

    #[test]
    fn test_block_measures() {
        let cube = block(10.0);
        assert_relative_eq!(cube.signed_volume(), 1000.0, epsilon = 1e-9);
        assert_relative_eq!(cube.surface_area(), 600.0, epsilon = 1e-9);
        assert!(!cube.is_inside_out());
    }

    #[test]
    fn test_far_from_origin_volume() {
        let mut cube = block(10.0);
        cube.translate(Vector3::new(5000.0, -3000.0, 1e4));
        assert_relative_eq!(cube.volume(), 1000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_flip_turns_inside_out() {
        let mut cube = block(2.0);
        cube.flip_faces();
        assert!(cube.is_inside_out());
        assert_relative_eq!(cube.volume(), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounds_follow_scaling() {
        let mut cube = block(1.0);
        assert_relative_eq!(cube.bounds().unwrap().max.x, 1.0);
        cube.scale(3.0);
        assert_relative_eq!(cube.bounds().unwrap().max.x, 3.0);
    }

    #[test]
    fn test_empty() {
        let mesh = Mesh::new();
        assert!(mesh.bounds().is_none());
        assert!(mesh.is_empty());
        assert_eq!(mesh.signed_volume(), 0.0);
        assert!(mesh.triangle(0).is_none());
    }

    #[test]
    fn test_compact_drops_stray_vertex() {
        let mut cube = block(1.0);
        cube.vertices.insert(0, Vertex::from_coords(9.0, 9.0, 9.0));
        for f in cube.faces.iter_mut().flatten() {
            *f += 1;
        }
        assert_eq!(cube.compact(), 1);
        assert_eq!(cube.vertex_count(), 8);
        assert_relative_eq!(cube.volume(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_append_keeps_both_solids() {
        let mut a = block(1.0);
        let mut b = block(1.0);
        b.translate(Vector3::new(5.0, 0.0, 0.0));
        a.append(&b);
        assert_eq!((a.vertex_count(), a.face_count()), (16, 24));
        assert_relative_eq!(a.volume(), 2.0, epsilon = 1e-9);
    }
}
