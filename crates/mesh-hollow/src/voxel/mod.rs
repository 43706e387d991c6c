//! Dense voxel occupancy grids and the passes run over them.

pub mod extract;
pub mod grid;
pub mod morph;

pub use extract::extract_surface;
pub use grid::VoxelGrid;
pub use morph::{ExteriorFill, fill_exterior, occupied_extent, shell_mask, squared_distance_to_exterior};
