//! Fluent builder for hollowing.
//!
//! ```
//! use mesh_core::primitives::block;
//! use mesh_hollow::HollowBuilder;
//!
//! let mesh = block(80.0, 40.0, 40.0);
//! let result = HollowBuilder::new(&mesh)
//!     .wall_thickness(5.0)
//!     .resolution(32)
//!     .build()
//!     .unwrap();
//! assert!(result.mesh.volume() < mesh.volume());
//! ```

use mesh_core::Mesh;
use mesh_core::progress::ProgressCallback;

use crate::config::HollowingConfig;
use crate::error::HollowResult;
use crate::hollow::{HollowedMesh, hollow_with_progress};

/// Chainable hollowing configuration bound to one input mesh.
pub struct HollowBuilder<'a> {
    mesh: &'a Mesh,
    config: HollowingConfig,
    progress_callback: Option<ProgressCallback>,
}

impl<'a> HollowBuilder<'a> {
    /// Start from the default configuration.
    pub fn new(mesh: &'a Mesh) -> Self {
        Self {
            mesh,
            config: HollowingConfig::default(),
            progress_callback: None,
        }
    }

    /// Start from an existing configuration.
    pub fn with_config(mesh: &'a Mesh, config: HollowingConfig) -> Self {
        Self {
            mesh,
            config,
            progress_callback: None,
        }
    }

    /// Target wall thickness in mm.
    pub fn wall_thickness(mut self, mm: f64) -> Self {
        self.config.wall_thickness = mm;
        self
    }

    /// Reject walls that round down below this, in mm.
    pub fn min_wall_thickness(mut self, mm: f64) -> Self {
        self.config.min_wall_thickness = mm;
        self
    }

    /// Voxels along the longest side. Overrides [`voxel_size`](Self::voxel_size).
    pub fn resolution(mut self, voxels: usize) -> Self {
        self.config.resolution = Some(voxels);
        self
    }

    /// Voxel edge length in mm, used when no resolution is set.
    pub fn voxel_size(mut self, mm: f64) -> Self {
        self.config.voxel_size = Some(mm);
        self
    }

    /// Maximum grid size in voxels.
    pub fn max_voxels(mut self, max: usize) -> Self {
        self.config.max_voxels = max;
        self
    }

    /// Keep vertices that fall outside the source bounds.
    pub fn no_trim(mut self) -> Self {
        self.config.trim_to_source = false;
        self
    }

    /// Quick, coarse grid.
    pub fn draft(mut self) -> Self {
        self.config.resolution = HollowingConfig::draft().resolution;
        self
    }

    /// Fine grid for final output.
    pub fn fine(mut self) -> Self {
        let fine = HollowingConfig::fine();
        self.config.resolution = fine.resolution;
        self.config.max_voxels = fine.max_voxels;
        self
    }

    /// Report progress; the callback returns `false` to cancel.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &HollowingConfig {
        &self.config
    }

    /// Run hollowing.
    pub fn build(self) -> HollowResult<HollowedMesh> {
        hollow_with_progress(self.mesh, &self.config, self.progress_callback.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_core::primitives::block;

    #[test]
    fn test_builder_sets_config() {
        let mesh = block(10.0, 10.0, 10.0);
        let builder = HollowBuilder::new(&mesh)
            .wall_thickness(1.5)
            .voxel_size(0.25)
            .resolution(40)
            .no_trim();
        let config = builder.config();
        assert_eq!(config.wall_thickness, 1.5);
        assert_eq!(config.resolution, Some(40));
        assert_eq!(config.voxel_size, Some(0.25));
        assert!(!config.trim_to_source);
    }

    #[test]
    fn test_builder_presets() {
        let mesh = block(10.0, 10.0, 10.0);
        assert_eq!(HollowBuilder::new(&mesh).draft().config().resolution, Some(64));
        assert_eq!(HollowBuilder::new(&mesh).fine().config().resolution, Some(256));
    }
}
