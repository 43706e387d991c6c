//! Simple closed solids for tests, benchmarks and tool geometry.

use crate::types::Mesh;

/// Axis-aligned box between two corners with outward-facing triangles.
pub fn cuboid(min: [f64; 3], max: [f64; 3]) -> Mesh {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    Mesh::from_raw(
        &[
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ],
        &[
            // bottom
            [0, 2, 1],
            [0, 3, 2],
            // top
            [4, 5, 6],
            [4, 6, 7],
            // front
            [0, 1, 5],
            [0, 5, 4],
            // back
            [3, 7, 6],
            [3, 6, 2],
            // left
            [0, 4, 7],
            [0, 7, 3],
            // right
            [1, 2, 6],
            [1, 6, 5],
        ],
    )
}

/// Box of the given extents with its minimum corner at the origin.
pub fn block(x: f64, y: f64, z: f64) -> Mesh {
    cuboid([0.0, 0.0, 0.0], [x, y, z])
}
