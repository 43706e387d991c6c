//! Surface extraction from a voxel mask using Surface Nets.

use tracing::{debug, info};

use mesh_core::{Mesh, Vertex};

use crate::error::{HollowError, HollowResult};

use super::grid::VoxelGrid;

/// Extract the boundary of `mask` as a closed triangle mesh.
///
/// The mask is turned into a two-valued field (-1 inside, +1 outside) so
/// every crossing sits halfway between voxel centers, on the voxel faces.
/// Faces are oriented outward.
pub fn extract_surface(grid: &VoxelGrid, mask: &[bool]) -> HollowResult<Mesh> {
    use fast_surface_nets::{SurfaceNetsBuffer, ndshape::RuntimeShape, surface_nets};

    info!(dims = ?grid.dims, "Extracting isosurface");

    // One extra layer on each side keeps the surface off the array border.
    let d = grid.dims;
    let padded = [d[0] + 2, d[1] + 2, d[2] + 2];
    let mut field = vec![1.0f32; padded[0] * padded[1] * padded[2]];
    for z in 0..d[2] {
        for y in 0..d[1] {
            for x in 0..d[0] {
                if mask[grid.linearize(x, y, z)] {
                    let dst = (x + 1) + (y + 1) * padded[0] + (z + 1) * padded[0] * padded[1];
                    field[dst] = -1.0;
                }
            }
        }
    }

    let shape = RuntimeShape::<u32, 3>::new([padded[0] as u32, padded[1] as u32, padded[2] as u32]);
    let mut buffer = SurfaceNetsBuffer::default();
    surface_nets(
        &field,
        &shape,
        [0, 0, 0],
        [
            padded[0] as u32 - 1,
            padded[1] as u32 - 1,
            padded[2] as u32 - 1,
        ],
        &mut buffer,
    );
    drop(field);

    if buffer.indices.is_empty() {
        return Err(HollowError::EmptyIsosurface);
    }

    debug!(
        positions = buffer.positions.len(),
        indices = buffer.indices.len(),
        "Surface nets complete"
    );

    let mut mesh = Mesh::with_capacity(buffer.positions.len(), buffer.indices.len() / 3);
    for pos in &buffer.positions {
        // Sample i of the padded field is the center of grid voxel i - 1.
        let world = [0, 1, 2].map(|a| {
            grid.origin[a] + (pos[a] as f64 - 0.5) * grid.cell_size[a]
        });
        mesh.vertices
            .push(Vertex::from_coords(world[0], world[1], world[2]));
    }
    mesh.faces.extend(
        buffer
            .indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]]),
    );

    if mesh.signed_volume() < 0.0 {
        mesh.flip_faces();
    }

    info!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Isosurface mesh created"
    );

    Ok(mesh)
}
