//! Hollowing parameters.

use crate::error::{HollowError, HollowResult};

/// Voxels along the longest side when neither resolution nor voxel size is set.
pub const DEFAULT_RESOLUTION: usize = 128;

/// Default cap on the number of voxels in a grid.
pub const DEFAULT_MAX_VOXELS: usize = 50_000_000;

/// Smallest grid resolution accepted.
pub const MIN_RESOLUTION: usize = 8;

/// Parameters for voxel hollowing.
///
/// Grid spacing is resolved in this order: an explicit `resolution`
/// (voxels along the longest side), then an explicit `voxel_size`, then
/// [`DEFAULT_RESOLUTION`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HollowingConfig {
    /// Target wall thickness in mm.
    pub wall_thickness: f64,

    /// Walls that round down below this are rejected, in mm.
    pub min_wall_thickness: f64,

    /// Voxels along the longest side of the bounding box.
    pub resolution: Option<usize>,

    /// Voxel edge length in mm, used when `resolution` is unset.
    pub voxel_size: Option<f64>,

    /// Upper bound on grid size; larger grids fail with `GridTooLarge`.
    pub max_voxels: usize,

    /// Empty voxel layers around the bounding box.
    pub padding_voxels: usize,

    /// Clamp the extracted surface to the source bounding box.
    pub trim_to_source: bool,
}

impl Default for HollowingConfig {
    fn default() -> Self {
        Self {
            wall_thickness: 2.0,
            min_wall_thickness: 0.8,
            resolution: None,
            voxel_size: None,
            max_voxels: DEFAULT_MAX_VOXELS,
            padding_voxels: 2,
            trim_to_source: true,
        }
    }
}

impl HollowingConfig {
    /// Config with the given wall thickness and default grid.
    pub fn with_wall_thickness(wall_thickness: f64) -> Self {
        Self {
            wall_thickness,
            ..Default::default()
        }
    }

    /// Walls suited to FDM printing: 2.4mm on a 192 grid.
    pub fn for_fdm() -> Self {
        Self {
            wall_thickness: 2.4,
            min_wall_thickness: 1.2,
            resolution: Some(192),
            ..Default::default()
        }
    }

    /// Coarse grid for quick previews.
    pub fn draft() -> Self {
        Self {
            resolution: Some(64),
            ..Default::default()
        }
    }

    /// Fine grid for final output.
    pub fn fine() -> Self {
        Self {
            resolution: Some(256),
            max_voxels: 80_000_000,
            ..Default::default()
        }
    }

    /// Voxel edge length for a bounding box whose longest side is `longest`.
    pub fn resolve_voxel_size(&self, longest: f64) -> f64 {
        match (self.resolution, self.voxel_size) {
            (Some(n), _) => longest / n as f64,
            (None, Some(size)) => size,
            (None, None) => longest / DEFAULT_RESOLUTION as f64,
        }
    }

    /// Check that every parameter is finite and in range.
    pub fn validate(&self) -> HollowResult<()> {
        if !self.wall_thickness.is_finite() || self.wall_thickness <= 0.0 {
            return Err(HollowError::invalid_param(
                "wall_thickness",
                format!("must be positive, got {}", self.wall_thickness),
            ));
        }
        if !self.min_wall_thickness.is_finite() || self.min_wall_thickness < 0.0 {
            return Err(HollowError::invalid_param(
                "min_wall_thickness",
                format!("must be non-negative, got {}", self.min_wall_thickness),
            ));
        }
        if let Some(n) = self.resolution.filter(|&n| n < MIN_RESOLUTION) {
            return Err(HollowError::invalid_param(
                "resolution",
                format!("must be at least {MIN_RESOLUTION}, got {n}"),
            ));
        }
        if let Some(size) = self
            .voxel_size
            .filter(|s| !s.is_finite() || *s <= 0.0)
        {
            return Err(HollowError::invalid_param(
                "voxel_size",
                format!("must be positive, got {size}"),
            ));
        }
        if self.padding_voxels == 0 {
            return Err(HollowError::invalid_param(
                "padding_voxels",
                "at least one empty layer is needed to close the surface",
            ));
        }
        if self.max_voxels == 0 {
            return Err(HollowError::invalid_param("max_voxels", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_takes_precedence() {
        let config = HollowingConfig {
            resolution: Some(100),
            voxel_size: Some(0.5),
            ..Default::default()
        };
        assert_eq!(config.resolve_voxel_size(400.0), 4.0);

        let config = HollowingConfig {
            voxel_size: Some(0.5),
            ..Default::default()
        };
        assert_eq!(config.resolve_voxel_size(400.0), 0.5);
        assert_eq!(
            HollowingConfig::default().resolve_voxel_size(256.0),
            2.0
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(HollowingConfig::default().validate().is_ok());
        assert!(HollowingConfig::with_wall_thickness(0.0).validate().is_err());
        assert!(HollowingConfig::with_wall_thickness(f64::NAN).validate().is_err());

        let config = HollowingConfig {
            resolution: Some(4),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HollowingConfig {
            padding_voxels: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(HollowingConfig::draft().resolution, Some(64));
        assert!(HollowingConfig::for_fdm().validate().is_ok());
        assert!(HollowingConfig::fine().max_voxels > DEFAULT_MAX_VOXELS);
    }
}
