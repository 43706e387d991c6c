//! Voxel shell hollowing.
//!
//! The pipeline is a fixed sequence of dense-array passes:
//!
//! 1. Voxelize the solid into an occupancy grid sized to its bounding box.
//! 2. Flood-fill from the border so enclosed voids count as solid.
//! 3. Erode by a ball of the wall radius (rounded down to whole voxels).
//! 4. Keep `filled AND NOT eroded` as the shell.
//! 5. Extract the shell boundary with Surface Nets.
//!
//! Each buffer is dropped as soon as the next one exists, so peak memory
//! is roughly two grids.

use std::time::Instant;

use tracing::{debug, info, warn};

use mesh_core::progress::{ProgressCallback, ProgressTracker};
use mesh_core::tracing_ext::OperationTimer;
use mesh_core::{BoundingBox, Mesh, inspect_solid};

use crate::config::HollowingConfig;
use crate::error::{HollowError, HollowResult, InfeasibleReason};
use crate::voxel::{
    VoxelGrid, extract_surface, fill_exterior, occupied_extent, shell_mask,
    squared_distance_to_exterior,
};

/// Slack when rounding the wall to whole voxels.
const ROUNDING_SLACK: f64 = 1e-9;

/// Statistics from a hollowing run.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HollowStats {
    /// Grid dimensions including padding.
    pub grid_dims: [usize; 3],
    /// Nominal voxel size in mm.
    pub voxel_size: f64,
    /// Erosion radius in whole voxels.
    pub erosion_radius: usize,
    /// Wall thickness actually produced, in mm.
    pub effective_wall_thickness: f64,
    /// Voxels inside the solid after void filling.
    pub filled_voxels: usize,
    /// Enclosed empty voxels that were filled.
    pub voids_filled: usize,
    /// Voxels removed by erosion.
    pub eroded_voxels: usize,
    /// Voxels in the shell.
    pub shell_voxels: usize,
    /// Vertices moved back inside the source bounds.
    pub trimmed_vertices: usize,
    /// Faces in the extracted surface.
    pub output_faces: usize,
    /// Whether the output is a closed two-manifold.
    pub closed: bool,
    /// Volume of the input in mm³.
    pub original_volume: f64,
    /// Volume of the shell in mm³.
    pub hollow_volume: f64,
    /// Time spent voxelizing, in ms.
    pub voxelize_ms: f64,
    /// Time spent in fill, distance transform and erosion, in ms.
    pub morphology_ms: f64,
    /// Time spent extracting the surface, in ms.
    pub extract_ms: f64,
}

impl std::fmt::Display for HollowStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Grid: {}x{}x{} at {:.3}mm",
            self.grid_dims[0], self.grid_dims[1], self.grid_dims[2], self.voxel_size
        )?;
        writeln!(
            f,
            "Wall: {} voxels ({:.3}mm)",
            self.erosion_radius, self.effective_wall_thickness
        )?;
        writeln!(
            f,
            "Voxels: {} filled, {} eroded, {} shell",
            self.filled_voxels, self.eroded_voxels, self.shell_voxels
        )?;
        write!(
            f,
            "Volume: {:.1} -> {:.1} mm³ ({} faces)",
            self.original_volume, self.hollow_volume, self.output_faces
        )
    }
}

/// A hollowed mesh and the statistics of the run.
#[derive(Debug, Clone)]
pub struct HollowedMesh {
    /// The shell surface.
    pub mesh: Mesh,
    /// Run statistics.
    pub stats: HollowStats,
}

/// Hollow a closed solid into a shell of the configured wall thickness.
pub fn hollow(mesh: &Mesh, config: &HollowingConfig) -> HollowResult<HollowedMesh> {
    hollow_with_progress(mesh, config, None)
}

/// Hollow with a progress callback; returning `false` from it cancels.
pub fn hollow_with_progress(
    mesh: &Mesh,
    config: &HollowingConfig,
    progress: Option<&ProgressCallback>,
) -> HollowResult<HollowedMesh> {
    let _timer = OperationTimer::with_context("hollow", mesh.face_count(), mesh.vertex_count());
    config.validate()?;

    let bounds = mesh
        .bounds()
        .filter(|_| mesh.face_count() > 0)
        .ok_or(HollowError::EmptyMesh)?;

    let voxel_size = config.resolve_voxel_size(bounds.max_extent());
    let radius = ((config.wall_thickness / voxel_size) + ROUNDING_SLACK).floor() as usize;
    let effective_wall = radius as f64 * voxel_size;
    let min_extent = bounds.min_extent();

    let infeasible = |reason, min_extent| {
        HollowError::infeasible(reason, config.wall_thickness, voxel_size, radius, min_extent)
    };

    // Cheap checks before allocating anything.
    if 2.0 * config.wall_thickness >= min_extent {
        return Err(infeasible(InfeasibleReason::WallTooThick, min_extent));
    }
    if radius == 0 {
        return Err(infeasible(InfeasibleReason::WallBelowVoxel, min_extent));
    }
    if effective_wall + ROUNDING_SLACK < config.min_wall_thickness {
        return Err(infeasible(InfeasibleReason::WallBelowMinimum, min_extent));
    }

    let mut stats = HollowStats {
        voxel_size,
        erosion_radius: radius,
        effective_wall_thickness: effective_wall,
        original_volume: mesh.volume(),
        ..Default::default()
    };

    let tracker = ProgressTracker::new(4);
    let checkpoint = |stage: &'static str| -> HollowResult<()> {
        if tracker.report(progress, stage) {
            tracker.increment();
            Ok(())
        } else {
            Err(HollowError::Cancelled { stage })
        }
    };

    info!(
        wall_mm = config.wall_thickness,
        voxel_mm = format!("{:.4}", voxel_size),
        radius_voxels = radius,
        "Hollowing mesh"
    );

    // 1. Voxelize.
    checkpoint("voxelize")?;
    let start = Instant::now();
    let mut grid =
        VoxelGrid::for_bounds(&bounds, voxel_size, config.padding_voxels, config.max_voxels)?;
    grid.voxelize(mesh);
    stats.grid_dims = grid.dims;
    stats.voxelize_ms = start.elapsed().as_secs_f64() * 1000.0;

    // 2-4. Fill, erode, shell.
    checkpoint("erode")?;
    let start = Instant::now();
    let occupied = std::mem::take(&mut grid.occupied);
    let fill = fill_exterior(&occupied, grid.dims);
    drop(occupied);
    stats.filled_voxels = fill.filled.iter().filter(|&&f| f).count();
    stats.voids_filled = fill.voids_filled;

    let Some(extent) = occupied_extent(&fill.filled, grid.dims) else {
        return Err(infeasible(InfeasibleReason::WallTooThick, 0.0));
    };
    let occupied_mm = (0..3)
        .map(|a| extent[a] as f64 * grid.cell_size[a])
        .fold(f64::INFINITY, f64::min);
    if 2.0 * effective_wall >= occupied_mm {
        return Err(infeasible(InfeasibleReason::WallTooThick, occupied_mm));
    }

    let distance = squared_distance_to_exterior(&fill.filled, grid.dims, grid.cell_size);
    let (shell, eroded) = shell_mask(&fill.filled, &distance, effective_wall);
    drop(distance);
    drop(fill);
    stats.eroded_voxels = eroded;
    stats.shell_voxels = shell.iter().filter(|&&s| s).count();
    stats.morphology_ms = start.elapsed().as_secs_f64() * 1000.0;

    debug!(
        filled = stats.filled_voxels,
        eroded = stats.eroded_voxels,
        shell = stats.shell_voxels,
        "Morphology complete"
    );

    if eroded == 0 {
        return Err(infeasible(InfeasibleReason::WallTooThick, occupied_mm));
    }

    // 5. Extract.
    checkpoint("extract")?;
    let start = Instant::now();
    let mut surface = extract_surface(&grid, &shell)?;
    drop(shell);
    drop(grid);
    stats.extract_ms = start.elapsed().as_secs_f64() * 1000.0;

    if config.trim_to_source {
        stats.trimmed_vertices = trim_to_bounds(&mut surface, &bounds);
    }
    surface.compact();

    checkpoint("finish")?;

    stats.output_faces = surface.face_count();
    stats.hollow_volume = surface.volume();
    stats.closed = inspect_solid(&surface).is_closed_solid();

    if !stats.closed {
        warn!("Hollowed surface is not a closed two-manifold");
    }
    if stats.hollow_volume >= stats.original_volume {
        warn!(
            original = stats.original_volume,
            hollow = stats.hollow_volume,
            "Hollowing did not reduce volume"
        );
    }

    info!(
        original_volume = format!("{:.1}", stats.original_volume),
        hollow_volume = format!("{:.1}", stats.hollow_volume),
        faces = stats.output_faces,
        "Hollowing complete"
    );

    Ok(HollowedMesh {
        mesh: surface,
        stats,
    })
}

/// Clamp every vertex into `bounds`; returns the number of vertices moved.
///
/// Surface Nets places vertices on voxel faces, which can sit up to half a
/// cell outside the source. Clamping keeps the topology and never grows
/// the part past its original extent.
pub fn trim_to_bounds(mesh: &mut Mesh, bounds: &BoundingBox) -> usize {
    let mut moved = 0;
    for v in &mut mesh.vertices {
        let mut changed = false;
        for a in 0..3 {
            let c = v.position[a].clamp(bounds.min[a], bounds.max[a]);
            if c != v.position[a] {
                v.position[a] = c;
                changed = true;
            }
        }
        if changed {
            moved += 1;
        }
    }
    if moved > 0 {
        debug!(moved, "Trimmed surface to source bounds");
    }
    moved
}
