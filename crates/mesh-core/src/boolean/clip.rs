//! Exact half-space clipping with cap closure.
//!
//! Equivalent to subtracting an oversized box that covers one side of an
//! axis-aligned plane. Faces are clipped against the plane, intersection
//! vertices are shared per edge so neighbouring faces stay welded, and the
//! opening left on the plane is closed with a triangulated cap.

use hashbrown::HashMap;
use tracing::{debug, trace};

use super::cap::{directed_edge_area, triangulate_outline};
use crate::bounds::{Axis, Side};
use crate::error::{MeshError, MeshResult};
use crate::types::{Mesh, Vertex};

/// Distance below which a vertex is treated as lying on the plane.
pub const SNAP_TOLERANCE: f64 = 1e-7;

const OPERATION: &str = "clip";

/// Keep the part of `mesh` on the `keep` side of the plane `axis = offset`.
pub(crate) fn clip_half_space(
    mesh: &Mesh,
    axis: Axis,
    offset: f64,
    keep: Side,
) -> MeshResult<Mesh> {
    let ai = axis.index();
    let discard = keep.opposite();

    // Signed distance towards the discarded side; kept vertices are <= 0.
    let dist: Vec<f64> = mesh
        .vertices
        .iter()
        .map(|v| {
            let d = discard.sign() * (v.position[ai] - offset);
            if d.abs() <= SNAP_TOLERANCE { 0.0 } else { d }
        })
        .collect();

    let mut out = Mesh::with_capacity(mesh.vertex_count(), mesh.face_count());
    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut edge_points: HashMap<(u32, u32), u32> = HashMap::new();

    let mut keep_vertex = |out: &mut Mesh, index: u32| -> u32 {
        *remap.entry(index).or_insert_with(|| {
            let mut p = mesh.vertices[index as usize].position;
            if dist[index as usize] == 0.0 {
                p[ai] = offset;
            }
            out.vertices.push(Vertex::new(p));
            (out.vertices.len() - 1) as u32
        })
    };

    let mut split_edge = |out: &mut Mesh, a: u32, b: u32| -> u32 {
        let key = (a.min(b), a.max(b));
        *edge_points.entry(key).or_insert_with(|| {
            let (lo, hi) = key;
            let pa = mesh.vertices[lo as usize].position;
            let pb = mesh.vertices[hi as usize].position;
            let da = dist[lo as usize];
            let db = dist[hi as usize];
            let t = da / (da - db);
            let mut p = pa + (pb - pa) * t;
            p[ai] = offset;
            out.vertices.push(Vertex::new(p));
            (out.vertices.len() - 1) as u32
        })
    };

    let mut clipped = 0usize;
    let mut dropped = 0usize;

    for face in &mesh.faces {
        let d = face.map(|v| dist[v as usize]);

        if d.iter().all(|&x| x == 0.0) {
            // Coplanar: keep only faces that already bound the kept side.
            let [a, b, c] = face.map(|v| mesh.position(v));
            let normal = (b - a).cross(&(c - a));
            if normal[ai] * discard.sign() > 0.0 {
                let f = face.map(|v| keep_vertex(&mut out, v));
                out.faces.push(f);
            } else {
                dropped += 1;
            }
            continue;
        }

        if d.iter().all(|&x| x <= 0.0) {
            let f = face.map(|v| keep_vertex(&mut out, v));
            out.faces.push(f);
            continue;
        }

        if d.iter().all(|&x| x >= 0.0) {
            dropped += 1;
            continue;
        }

        clipped += 1;
        let mut polygon: Vec<u32> = Vec::with_capacity(4);
        for k in 0..3 {
            let cur = face[k];
            let next = face[(k + 1) % 3];
            let (dc, dn) = (d[k], d[(k + 1) % 3]);
            if dc <= 0.0 {
                polygon.push(keep_vertex(&mut out, cur));
            }
            if (dc < 0.0 && dn > 0.0) || (dc > 0.0 && dn < 0.0) {
                polygon.push(split_edge(&mut out, cur, next));
            }
        }

        for k in 1..polygon.len().saturating_sub(1) {
            let tri = [polygon[0], polygon[k], polygon[k + 1]];
            if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] {
                out.faces.push(tri);
            }
        }
    }

    if out.faces.is_empty() {
        return Err(MeshError::boolean_failed(
            OPERATION,
            format!("plane {axis} = {offset:.4} removes the entire mesh"),
        ));
    }

    let cap_faces = close_opening(&mut out, axis, offset, discard)?;

    trace!(
        axis = %axis,
        offset,
        clipped,
        dropped,
        cap_faces,
        "Half-space clip"
    );

    out.compact();

    let volume = out.signed_volume();
    if volume.is_nan() || volume <= 0.0 {
        return Err(MeshError::boolean_failed(
            OPERATION,
            format!("result has non-positive volume {volume:.6}"),
        ));
    }

    debug!(
        axis = %axis,
        offset,
        keep = %keep,
        faces = out.face_count(),
        volume = format!("{:.2}", volume),
        "Clipped mesh"
    );

    Ok(out)
}

/// Close the open boundary left on the plane with a cap facing `discard`.
///
/// Returns the number of cap faces added.
fn close_opening(mesh: &mut Mesh, axis: Axis, offset: f64, discard: Side) -> MeshResult<usize> {
    let ai = axis.index();

    let mut directed: HashMap<(u32, u32), u32> = HashMap::with_capacity(mesh.faces.len() * 3);
    for face in &mesh.faces {
        for k in 0..3 {
            *directed.entry((face[k], face[(k + 1) % 3])).or_insert(0) += 1;
        }
    }

    let mut open: Vec<(u32, u32)> = directed
        .keys()
        .filter(|&&(a, b)| !directed.contains_key(&(b, a)))
        .copied()
        .collect();
    if open.is_empty() {
        return Ok(0);
    }
    open.sort_unstable();

    let mut balance: HashMap<u32, i32> = HashMap::new();
    for &(a, b) in &open {
        for v in [a, b] {
            let z = mesh.position(v)[ai];
            if (z - offset).abs() > SNAP_TOLERANCE {
                return Err(MeshError::boolean_failed(
                    OPERATION,
                    format!("open edge ({a}, {b}) is off the cutting plane; input is not closed"),
                ));
            }
        }
        *balance.entry(a).or_insert(0) += 1;
        *balance.entry(b).or_insert(0) -= 1;
    }
    if balance.values().any(|&n| n != 0) {
        return Err(MeshError::boolean_failed(
            OPERATION,
            "cut outline does not form closed loops",
        ));
    }

    let mut vertices: Vec<(u32, [f64; 2])> = Vec::with_capacity(open.len());
    let mut projected: Vec<([f64; 2], [f64; 2])> = Vec::with_capacity(open.len());
    for &(a, b) in &open {
        let pa = axis.project(&mesh.position(a));
        let pb = axis.project(&mesh.position(b));
        vertices.push((a, pa));
        projected.push((pa, pb));
    }

    let expected = directed_edge_area(&projected).abs();
    let cap = triangulate_outline(&vertices, &open, OPERATION)?;

    let tolerance = 1e-6 * expected.max(1.0);
    if (cap.area - expected).abs() > tolerance {
        return Err(MeshError::boolean_failed(
            OPERATION,
            format!(
                "cap area {:.6} does not match outline area {:.6}",
                cap.area, expected
            ),
        ));
    }

    // Counter-clockwise in the plane faces +axis.
    let flip = discard == Side::Below;
    let added = cap.triangles.len();
    for mut tri in cap.triangles {
        if flip {
            tri.swap(1, 2);
        }
        mesh.faces.push(tri);
    }

    Ok(added)
}
