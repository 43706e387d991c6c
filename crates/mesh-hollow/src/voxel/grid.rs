//! Voxel grid sized to a mesh bounding box.

use nalgebra::Point3;
use tracing::{debug, info};

use mesh_core::{BoundingBox, Mesh};

use crate::error::{HollowError, HollowResult};

/// Dense boolean occupancy grid.
///
/// Cells tile the source bounding box exactly: each axis gets
/// `ceil(extent / voxel_size)` cells, so cell edges may be slightly shorter
/// than the nominal voxel size but never longer. `padding` empty layers
/// surround the box on every side. Linear index is x-fastest.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    /// Grid dimensions including padding.
    pub dims: [usize; 3],
    /// Minimum corner of cell (0, 0, 0).
    pub origin: Point3<f64>,
    /// Cell edge length per axis in mm.
    pub cell_size: [f64; 3],
    /// Nominal voxel size in mm.
    pub voxel_size: f64,
    /// Empty layers on each side.
    pub padding: usize,
    /// Occupancy, true inside the solid.
    pub occupied: Vec<bool>,
}

impl VoxelGrid {
    /// Allocate an empty grid covering `bounds`.
    pub fn for_bounds(
        bounds: &BoundingBox,
        voxel_size: f64,
        padding: usize,
        max_voxels: usize,
    ) -> HollowResult<Self> {
        let extents = bounds.extents();
        let mut dims = [0usize; 3];
        let mut cell_size = [0.0; 3];
        for i in 0..3 {
            // Tolerate extents that are an exact multiple up to rounding.
            let cells = ((extents[i] / voxel_size) - 1e-9).ceil().max(1.0) as usize;
            cell_size[i] = extents[i] / cells as f64;
            dims[i] = cells + 2 * padding;
        }

        let total = dims[0]
            .checked_mul(dims[1])
            .and_then(|n| n.checked_mul(dims[2]))
            .unwrap_or(usize::MAX);
        if total > max_voxels {
            return Err(HollowError::grid_too_large(dims, max_voxels));
        }

        let origin = Point3::new(
            bounds.min.x - padding as f64 * cell_size[0],
            bounds.min.y - padding as f64 * cell_size[1],
            bounds.min.z - padding as f64 * cell_size[2],
        );

        info!(
            dims = ?dims,
            total = total,
            voxel_size_mm = voxel_size,
            "Creating voxel grid"
        );

        Ok(Self {
            dims,
            origin,
            cell_size,
            voxel_size,
            padding,
            occupied: vec![false; total],
        })
    }

    /// Total number of voxels in the grid.
    #[inline]
    pub fn total_voxels(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Convert 3D grid coordinates to linear index.
    #[inline]
    pub fn linearize(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.dims[0] + z * self.dims[0] * self.dims[1]
    }

    /// Convert linear index to 3D grid coordinates.
    #[inline]
    pub fn delinearize(&self, idx: usize) -> [usize; 3] {
        let plane = self.dims[0] * self.dims[1];
        let z = idx / plane;
        let rem = idx % plane;
        [rem % self.dims[0], rem / self.dims[0], z]
    }

    /// World position of a voxel center.
    #[inline]
    pub fn voxel_center(&self, x: usize, y: usize, z: usize) -> Point3<f64> {
        Point3::new(
            self.origin.x + (x as f64 + 0.5) * self.cell_size[0],
            self.origin.y + (y as f64 + 0.5) * self.cell_size[1],
            self.origin.z + (z as f64 + 0.5) * self.cell_size[2],
        )
    }

    /// Number of occupied voxels.
    pub fn occupied_count(&self) -> usize {
        self.occupied.iter().filter(|&&o| o).count()
    }

    /// Mark voxels whose centers lie inside the mesh.
    ///
    /// Signs come from `mesh_to_sdf` ray casting over the unpadded cells;
    /// padding layers stay empty.
    pub fn voxelize(&mut self, mesh: &Mesh) {
        use mesh_to_sdf::{Grid, SignMethod, Topology, generate_grid_sdf};

        let p = self.padding;
        let inner = [self.dims[0] - 2 * p, self.dims[1] - 2 * p, self.dims[2] - 2 * p];

        let vertices: Vec<[f32; 3]> = mesh
            .vertices
            .iter()
            .map(|v| {
                [
                    v.position.x as f32,
                    v.position.y as f32,
                    v.position.z as f32,
                ]
            })
            .collect();
        let indices: Vec<u32> = mesh.faces.iter().flat_map(|f| f.iter().copied()).collect();

        let min = self.voxel_center(p, p, p);
        let lo = [
            min.x - 0.5 * self.cell_size[0],
            min.y - 0.5 * self.cell_size[1],
            min.z - 0.5 * self.cell_size[2],
        ];
        let hi = [
            lo[0] + inner[0] as f64 * self.cell_size[0],
            lo[1] + inner[1] as f64 * self.cell_size[1],
            lo[2] + inner[2] as f64 * self.cell_size[2],
        ];
        let grid = Grid::from_bounding_box(
            &[lo[0] as f32, lo[1] as f32, lo[2] as f32],
            &[hi[0] as f32, hi[1] as f32, hi[2] as f32],
            inner,
        );

        debug!(cells = ?inner, faces = mesh.face_count(), "Computing occupancy");

        let sdf = generate_grid_sdf(
            &vertices,
            Topology::TriangleList(Some(&indices)),
            &grid,
            SignMethod::Raycast,
        );

        // mesh_to_sdf orders cells with z varying fastest.
        for x in 0..inner[0] {
            for y in 0..inner[1] {
                for z in 0..inner[2] {
                    let value = sdf[(x * inner[1] + y) * inner[2] + z];
                    let idx = self.linearize(x + p, y + p, z + p);
                    self.occupied[idx] = value < 0.0;
                }
            }
        }

        debug!(occupied = self.occupied_count(), "Occupancy computed");
    }
}
