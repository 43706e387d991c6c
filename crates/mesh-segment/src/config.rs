//! Segmentation parameters.
//!
//! A [`SegmentationConfig`] is fixed for the duration of one run. With the
//! `config` feature it can be saved and loaded as TOML or JSON, so the same
//! settings can be reused across jobs.
//!
//! # Example TOML
//!
//! ```toml
//! build_volume = [300.0, 320.0, 325.0]
//! hollowing = true
//! wall_thickness = 3.0
//! hollowing_strategy = "hollow_then_segment"
//! joint_type = "integrated"
//! pin_diameter = 6.0
//!
//! [units]
//! units = "millimeters"
//! ```

use nalgebra::Vector3;

use mesh_core::{DEFAULT_CYLINDER_SEGMENTS, UnitPolicy, Units};
use mesh_hollow::{DEFAULT_MAX_VOXELS, DEFAULT_RESOLUTION, HollowingConfig};

use crate::error::{SegmentError, SegmentResult};

/// When hollowing runs relative to cutting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum HollowingStrategy {
    /// Hollow the whole model once, then cut the shell.
    #[default]
    HollowThenSegment,
    /// Cut the solid, then hollow each finished part.
    SegmentThenHollow,
}

impl std::fmt::Display for HollowingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HollowingStrategy::HollowThenSegment => f.write_str("hollow-then-segment"),
            HollowingStrategy::SegmentThenHollow => f.write_str("segment-then-hollow"),
        }
    }
}

/// Connector generated at each seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum JointType {
    /// No connectors.
    None,
    /// A pin grown on one part, a matching hole bored in the other.
    #[default]
    Integrated,
    /// Matching holes on both parts for a separate dowel.
    Dowel,
}

impl std::fmt::Display for JointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JointType::None => f.write_str("none"),
            JointType::Integrated => f.write_str("integrated"),
            JointType::Dowel => f.write_str("dowel"),
        }
    }
}

/// Parameters for one segmentation run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SegmentationConfig {
    /// Printer build volume (X, Y, Z) in mm.
    pub build_volume: [f64; 3],

    /// Hollow the model before or after cutting.
    pub hollowing: bool,

    /// Order of hollowing and cutting.
    pub hollowing_strategy: HollowingStrategy,

    /// Target shell wall thickness in mm.
    pub wall_thickness: f64,

    /// Walls that round down below this are rejected, in mm.
    pub min_wall_thickness: f64,

    /// Voxels along the longest side of the hollowed mesh.
    pub voxel_resolution: usize,

    /// Hollowing grid ceiling.
    pub max_voxels: usize,

    /// Connector type.
    pub joint_type: JointType,

    /// Clearance added to hole diameter and depth, in mm.
    pub joint_tolerance: f64,

    /// Pin (or dowel) diameter in mm.
    pub pin_diameter: f64,

    /// Pin (or dowel) length in mm.
    pub pin_height: f64,

    /// Connectors to place per seam.
    pub joints_per_seam: usize,

    /// Minimum clearance between a hole and the section outline, in mm.
    pub joint_edge_margin: f64,

    /// Sides of the polygon approximating pins and holes.
    pub cylinder_segments: usize,

    /// Hard part limit; 0 derives a soft budget from the volume ratio.
    pub max_parts: usize,

    /// Smallest piece a cut may leave on the cut axis, in mm.
    pub min_viable_thickness: f64,

    /// Overshoot ratios closer than this count as a tie.
    pub axis_tie_tolerance: f64,

    /// Distance a cut is nudged along its axis before the one retry, in mm.
    pub cut_perturbation: f64,

    /// Safety multiplier on the automatic part budget.
    pub auto_budget_multiplier: f64,

    /// Source unit handling.
    pub units: UnitPolicy,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            build_volume: [300.0, 320.0, 325.0],
            hollowing: false,
            hollowing_strategy: HollowingStrategy::HollowThenSegment,
            wall_thickness: 2.0,
            min_wall_thickness: 0.8,
            voxel_resolution: DEFAULT_RESOLUTION,
            max_voxels: DEFAULT_MAX_VOXELS,
            joint_type: JointType::Integrated,
            joint_tolerance: 0.2,
            pin_diameter: 5.0,
            pin_height: 8.0,
            joints_per_seam: 2,
            joint_edge_margin: 2.0,
            cylinder_segments: DEFAULT_CYLINDER_SEGMENTS,
            max_parts: 0,
            min_viable_thickness: 5.0,
            axis_tie_tolerance: 1e-6,
            cut_perturbation: 0.25,
            auto_budget_multiplier: 2.0,
            units: UnitPolicy::default(),
        }
    }
}

impl SegmentationConfig {
    /// Config for the given build volume with default everything else.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::default().with_build_volume(x, y, z)
    }

    /// Hollow FDM prints: 2.4mm walls on a 192 grid, snug pins.
    pub fn for_fdm() -> Self {
        Self {
            hollowing: true,
            wall_thickness: 2.4,
            min_wall_thickness: 1.2,
            voxel_resolution: 192,
            joint_tolerance: 0.15,
            ..Default::default()
        }
    }

    /// Quick preview: coarse grid, coarse cylinders, one joint per seam.
    pub fn draft() -> Self {
        Self {
            voxel_resolution: 64,
            cylinder_segments: 12,
            joints_per_seam: 1,
            ..Default::default()
        }
    }

    /// Set the build volume.
    pub fn with_build_volume(mut self, x: f64, y: f64, z: f64) -> Self {
        self.build_volume = [x, y, z];
        self
    }

    /// Enable hollowing with the given wall thickness.
    pub fn with_hollowing(mut self, wall_thickness: f64) -> Self {
        self.hollowing = true;
        self.wall_thickness = wall_thickness;
        self
    }

    /// Disable hollowing.
    pub fn without_hollowing(mut self) -> Self {
        self.hollowing = false;
        self
    }

    /// Set the hollowing strategy.
    pub fn with_strategy(mut self, strategy: HollowingStrategy) -> Self {
        self.hollowing_strategy = strategy;
        self
    }

    /// Set the hollowing grid resolution.
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.voxel_resolution = resolution;
        self
    }

    /// Set the joint type.
    pub fn with_joints(mut self, joint_type: JointType) -> Self {
        self.joint_type = joint_type;
        self
    }

    /// Disable joints.
    pub fn without_joints(self) -> Self {
        self.with_joints(JointType::None)
    }

    /// Set the pin (or dowel) size.
    pub fn with_pin(mut self, diameter: f64, height: f64) -> Self {
        self.pin_diameter = diameter;
        self.pin_height = height;
        self
    }

    /// Set the joint clearance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.joint_tolerance = tolerance;
        self
    }

    /// Set the hard part limit (0 for automatic).
    pub fn with_max_parts(mut self, max_parts: usize) -> Self {
        self.max_parts = max_parts;
        self
    }

    /// Set the minimum piece thickness a cut may leave.
    pub fn with_min_viable_thickness(mut self, thickness: f64) -> Self {
        self.min_viable_thickness = thickness;
        self
    }

    /// Declare the source units instead of detecting them.
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = UnitPolicy::explicit(units);
        self
    }

    /// Build volume as a vector.
    pub fn build_volume(&self) -> Vector3<f64> {
        Vector3::from(self.build_volume)
    }

    /// Diameter of the hole matching a pin or dowel.
    pub fn hole_diameter(&self) -> f64 {
        self.pin_diameter + self.joint_tolerance
    }

    /// Hollowing parameters derived from this config.
    pub fn hollowing_config(&self) -> HollowingConfig {
        HollowingConfig {
            wall_thickness: self.wall_thickness,
            min_wall_thickness: self.min_wall_thickness,
            resolution: Some(self.voxel_resolution),
            voxel_size: None,
            max_voxels: self.max_voxels,
            ..Default::default()
        }
    }

    /// Reject non-positive or non-finite values.
    pub fn validate(&self) -> SegmentResult<()> {
        for (axis, &extent) in ["x", "y", "z"].iter().zip(&self.build_volume) {
            if !extent.is_finite() || extent <= 0.0 {
                return Err(SegmentError::invalid_param(
                    "build_volume",
                    format!("{} extent must be positive, got {}", axis, extent),
                ));
            }
        }

        positive("min_viable_thickness", self.min_viable_thickness)?;
        positive("cut_perturbation", self.cut_perturbation)?;
        non_negative("axis_tie_tolerance", self.axis_tie_tolerance)?;
        if !self.auto_budget_multiplier.is_finite() || self.auto_budget_multiplier < 1.0 {
            return Err(SegmentError::invalid_param(
                "auto_budget_multiplier",
                format!("must be at least 1, got {}", self.auto_budget_multiplier),
            ));
        }

        if self.joint_type != JointType::None {
            positive("pin_diameter", self.pin_diameter)?;
            positive("pin_height", self.pin_height)?;
            non_negative("joint_tolerance", self.joint_tolerance)?;
            non_negative("joint_edge_margin", self.joint_edge_margin)?;
            if self.cylinder_segments < 3 {
                return Err(SegmentError::invalid_param(
                    "cylinder_segments",
                    format!("must be at least 3, got {}", self.cylinder_segments),
                ));
            }
        }

        if self.hollowing {
            self.hollowing_config().validate().map_err(|e| match e {
                mesh_hollow::HollowError::InvalidParams {
                    details,
                    param_name,
                } => SegmentError::InvalidConfig {
                    details,
                    param_name,
                },
                other => SegmentError::from_hollow(other, None),
            })?;
        }

        Ok(())
    }
}

fn positive(name: &str, value: f64) -> SegmentResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SegmentError::invalid_param(
            name,
            format!("{} must be positive, got {}", name, value),
        ))
    }
}

fn non_negative(name: &str, value: f64) -> SegmentResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SegmentError::invalid_param(
            name,
            format!("{} must be non-negative, got {}", name, value),
        ))
    }
}

#[cfg(feature = "config")]
impl SegmentationConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or doesn't match the schema.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or the TOML is invalid.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&contents)?)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let toml_str = self.to_toml()?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Errors that can occur when loading or saving configurations.
#[cfg(feature = "config")]
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading or writing file.
    Io(std::io::Error),
    /// TOML parsing error.
    TomlParse(toml::de::Error),
    /// TOML serialization error.
    TomlSerialize(toml::ser::Error),
}

#[cfg(feature = "config")]
impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::TomlParse(e) => write!(f, "TOML parse error: {}", e),
            Self::TomlSerialize(e) => write!(f, "TOML serialize error: {}", e),
        }
    }
}

#[cfg(feature = "config")]
impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::TomlParse(e) => Some(e),
            Self::TomlSerialize(e) => Some(e),
        }
    }
}

#[cfg(feature = "config")]
impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "config")]
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::TomlParse(e)
    }
}

#[cfg(feature = "config")]
impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        Self::TomlSerialize(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults_are_valid() {
        SegmentationConfig::default().validate().unwrap();
        SegmentationConfig::for_fdm().validate().unwrap();
        SegmentationConfig::draft().validate().unwrap();
    }

    #[test]
    fn test_builder_chain() {
        let config = SegmentationConfig::new(200.0, 200.0, 250.0)
            .with_hollowing(3.0)
            .with_strategy(HollowingStrategy::SegmentThenHollow)
            .with_joints(JointType::Dowel)
            .with_pin(6.0, 10.0)
            .with_max_parts(8);

        assert_eq!(config.build_volume, [200.0, 200.0, 250.0]);
        assert!(config.hollowing);
        assert_eq!(config.wall_thickness, 3.0);
        assert_eq!(config.joint_type, JointType::Dowel);
        assert!((config.hole_diameter() - 6.2).abs() < 1e-12);
        assert_eq!(config.max_parts, 8);
    }

    #[test]
    fn test_hollowing_config_derived() {
        let config = SegmentationConfig::default().with_hollowing(4.0).with_resolution(96);
        let hollow = config.hollowing_config();
        assert_eq!(hollow.wall_thickness, 4.0);
        assert_eq!(hollow.resolution, Some(96));
        assert_eq!(hollow.min_wall_thickness, config.min_wall_thickness);
    }

    #[test]
    fn test_rejects_bad_build_volume() {
        let config = SegmentationConfig::new(300.0, 0.0, 300.0);
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);

        let config = SegmentationConfig::new(f64::NAN, 300.0, 300.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_joint_params_only_when_enabled() {
        let mut config = SegmentationConfig {
            pin_diameter: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.joint_type = JointType::None;
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_hollowing_params() {
        let config = SegmentationConfig::default().with_hollowing(0.0);
        match config.validate().unwrap_err() {
            SegmentError::InvalidConfig { param_name, .. } => {
                assert_eq!(param_name.as_deref(), Some("wall_thickness"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_toml_roundtrip() {
        let config = SegmentationConfig::for_fdm().with_joints(JointType::Dowel);
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("joint_type = \"dowel\""));

        let parsed = SegmentationConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SegmentationConfig::from_toml(
            r#"
            build_volume = [220.0, 220.0, 250.0]
            hollowing_strategy = "segment_then_hollow"

            [units]
            units = "centimeters"
            "#,
        )
        .unwrap();
        assert_eq!(config.build_volume, [220.0, 220.0, 250.0]);
        assert_eq!(config.hollowing_strategy, HollowingStrategy::SegmentThenHollow);
        assert_eq!(config.units.units, Some(Units::Centimeters));
        assert_eq!(config.pin_diameter, 5.0);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_json_roundtrip() {
        let config = SegmentationConfig::draft().without_joints();
        let json = config.to_json().unwrap();
        let parsed = SegmentationConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
