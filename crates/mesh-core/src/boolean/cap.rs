//! Planar cap triangulation.
//!
//! Caps are built with a constrained Delaunay triangulation of the outline
//! vertices. Every outline edge becomes a constraint, and the interior is
//! found by flood-filling from the hull and toggling parity at each
//! constraint crossing. Nested outlines (a shell cut open, a ring inside a
//! face) therefore come out as regions with holes.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};

use crate::error::{MeshError, MeshResult};
use crate::section::triangle_area;

type Cdt = ConstrainedDelaunayTriangulation<Point2<f64>>;

/// Odd-parity triangles of a constrained outline.
#[derive(Debug, Clone, Default)]
pub(crate) struct CapTriangulation {
    /// Triangles as mesh vertex indices, counter-clockwise in the plane.
    pub triangles: Vec<[u32; 3]>,

    /// Total area covered by `triangles`.
    pub area: f64,
}

/// Triangulate the region enclosed by a set of outline edges.
///
/// `vertices` pairs mesh vertex indices with their plane coordinates. Each
/// edge in `edges` refers to mesh indices that appear in `vertices`.
pub(crate) fn triangulate_outline(
    vertices: &[(u32, [f64; 2])],
    edges: &[(u32, u32)],
    operation: &str,
) -> MeshResult<CapTriangulation> {
    let mut cdt = Cdt::new();
    let mut to_handle: HashMap<u32, FixedVertexHandle> = HashMap::with_capacity(vertices.len());
    let mut to_mesh: HashMap<usize, u32> = HashMap::with_capacity(vertices.len());

    for &(index, uv) in vertices {
        if to_handle.contains_key(&index) {
            continue;
        }
        let handle = cdt.insert(Point2::new(uv[0], uv[1])).map_err(|e| {
            MeshError::boolean_failed(operation, format!("cap vertex rejected: {e}"))
        })?;
        if let Some(&other) = to_mesh.get(&handle.index()) {
            return Err(MeshError::boolean_failed(
                operation,
                format!("cap vertices {other} and {index} coincide"),
            ));
        }
        to_handle.insert(index, handle);
        to_mesh.insert(handle.index(), index);
    }

    let mut seen: HashSet<(u32, u32)> = HashSet::with_capacity(edges.len());
    for &(a, b) in edges {
        if a == b || !seen.insert((a.min(b), a.max(b))) {
            continue;
        }
        let (Some(&ha), Some(&hb)) = (to_handle.get(&a), to_handle.get(&b)) else {
            return Err(MeshError::boolean_failed(
                operation,
                format!("outline edge ({a}, {b}) references an unknown vertex"),
            ));
        };
        if cdt.exists_constraint(ha, hb) {
            continue;
        }
        if !cdt.can_add_constraint(ha, hb) {
            return Err(MeshError::boolean_failed(
                operation,
                format!("outline edge ({a}, {b}) crosses another outline edge"),
            ));
        }
        cdt.add_constraint(ha, hb);
    }

    let interior = odd_parity_faces(&cdt);

    let mut result = CapTriangulation::default();
    for face in cdt.inner_faces() {
        if !interior.contains(&face.fix().index()) {
            continue;
        }
        let vs = face.vertices();
        let mut tri = [0u32; 3];
        let mut uv = [[0.0; 2]; 3];
        for (k, vh) in vs.iter().enumerate() {
            let Some(&index) = to_mesh.get(&vh.fix().index()) else {
                return Err(MeshError::boolean_failed(
                    operation,
                    "triangulation introduced a vertex that is not on the outline",
                ));
            };
            let p = vh.position();
            tri[k] = index;
            uv[k] = [p.x, p.y];
        }

        let area = triangle_area(&uv);
        if area.abs() <= f64::EPSILON {
            continue;
        }
        if area < 0.0 {
            tri.swap(1, 2);
        }
        result.area += area.abs();
        result.triangles.push(tri);
    }

    Ok(result)
}

/// Inner faces reached from the hull after an odd number of constraint crossings.
fn odd_parity_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer {
            continue;
        }
        let Some(inner) = edge.rev().face().as_inner() else {
            continue;
        };
        let fix = inner.fix();
        if depth.contains_key(&fix.index()) {
            continue;
        }
        let d = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
        depth.insert(fix.index(), d);
        if d % 2 == 1 {
            interior.insert(fix.index());
        }
        queue.push_back((fix, d));
    }

    while let Some((fix, d)) = queue.pop_front() {
        for edge in cdt.face(fix).adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let n = neighbor.fix();
            if depth.contains_key(&n.index()) {
                continue;
            }
            let nd = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                d + 1
            } else {
                d
            };
            depth.insert(n.index(), nd);
            if nd % 2 == 1 {
                interior.insert(n.index());
            }
            queue.push_back((n, nd));
        }
    }

    interior
}

/// Signed area enclosed by a set of directed edges.
///
/// The edges need not be ordered; each closed loop contributes its shoelace
/// area, so the sum is the net enclosed area of all loops.
pub(crate) fn directed_edge_area(edges: &[([f64; 2], [f64; 2])]) -> f64 {
    0.5 * edges
        .iter()
        .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(offset: u32, min: f64, max: f64) -> (Vec<(u32, [f64; 2])>, Vec<(u32, u32)>) {
        let verts = vec![
            (offset, [min, min]),
            (offset + 1, [max, min]),
            (offset + 2, [max, max]),
            (offset + 3, [min, max]),
        ];
        let edges = (0..4).map(|i| (offset + i, offset + (i + 1) % 4)).collect();
        (verts, edges)
    }

    #[test]
    fn test_square_cap() {
        let (verts, edges) = square(0, 0.0, 10.0);
        let cap = triangulate_outline(&verts, &edges, "clip").unwrap();
        assert_eq!(cap.triangles.len(), 2);
        assert!((cap.area - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_cap_with_hole() {
        let (mut verts, mut edges) = square(0, 0.0, 10.0);
        let (inner_v, inner_e) = square(4, 3.0, 7.0);
        verts.extend(inner_v);
        edges.extend(inner_e);
        let cap = triangulate_outline(&verts, &edges, "clip").unwrap();
        assert!((cap.area - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_coincident_vertices_rejected() {
        let verts = vec![(0, [0.0, 0.0]), (1, [0.0, 0.0]), (2, [1.0, 0.0])];
        let err = triangulate_outline(&verts, &[(0, 2), (2, 1)], "clip").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_directed_edge_area() {
        let loop_edges = [
            ([0.0, 0.0], [2.0, 0.0]),
            ([2.0, 2.0], [0.0, 2.0]),
            ([2.0, 0.0], [2.0, 2.0]),
            ([0.0, 2.0], [0.0, 0.0]),
        ];
        assert!((directed_edge_area(&loop_edges) - 4.0).abs() < 1e-12);
    }
}
