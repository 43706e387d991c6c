//! Source unit detection and normalization to millimeters.
//!
//! Mesh files carry no reliable unit information. Unless the caller states
//! the source units explicitly, a mesh whose bounding-box diagonal is below
//! [`UnitPolicy::meter_threshold`] is assumed to be authored in meters and
//! scaled by 1000. After scaling, the diagonal must fall inside the plausible
//! range or the input is rejected as [`MeshError::UnsupportedUnits`].

use std::fmt;

use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::types::Mesh;

/// Length units a source mesh may be authored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Units {
    Millimeters,
    Centimeters,
    Meters,
    Inches,
}

impl Units {
    /// Multiplier converting this unit to millimeters.
    pub fn to_mm(self) -> f64 {
        match self {
            Units::Millimeters => 1.0,
            Units::Centimeters => 10.0,
            Units::Meters => 1000.0,
            Units::Inches => 25.4,
        }
    }

    /// Parse a unit name or abbreviation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" => Some(Units::Millimeters),
            "cm" | "centimeter" | "centimeters" => Some(Units::Centimeters),
            "m" | "meter" | "meters" => Some(Units::Meters),
            "in" | "inch" | "inches" => Some(Units::Inches),
            _ => None,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Units::Millimeters => "mm",
            Units::Centimeters => "cm",
            Units::Meters => "m",
            Units::Inches => "in",
        };
        f.write_str(s)
    }
}

/// Policy controlling unit detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UnitPolicy {
    /// Explicit source units. Skips detection when set.
    pub units: Option<Units>,

    /// Diagonal (in source units) below which the mesh is assumed to be meters.
    pub meter_threshold: f64,

    /// Smallest acceptable diagonal after normalization, in mm.
    pub min_diagonal_mm: f64,

    /// Largest acceptable diagonal after normalization, in mm.
    pub max_diagonal_mm: f64,
}

impl Default for UnitPolicy {
    fn default() -> Self {
        Self {
            units: None,
            meter_threshold: 10.0,
            min_diagonal_mm: 0.5,
            max_diagonal_mm: 100_000.0,
        }
    }
}

impl UnitPolicy {
    /// Policy with explicit source units.
    pub fn explicit(units: Units) -> Self {
        Self {
            units: Some(units),
            ..Default::default()
        }
    }

    /// Policy for input already in millimeters.
    pub fn millimeters() -> Self {
        Self::explicit(Units::Millimeters)
    }
}

/// Outcome of unit normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UnitNormalization {
    /// Units the source was interpreted in.
    pub source_units: Units,

    /// Scale factor applied to every coordinate.
    pub scale: f64,

    /// True when the units were inferred rather than given.
    pub detected: bool,

    /// Bounding-box diagonal after normalization, in mm.
    pub diagonal_mm: f64,
}

/// Decide source units for a mesh without modifying it.
pub fn detect_units(mesh: &Mesh, policy: &UnitPolicy) -> MeshResult<UnitNormalization> {
    let bounds = mesh
        .bounds()
        .ok_or_else(|| MeshError::empty_mesh("cannot determine units of an empty mesh"))?;
    let diagonal = bounds.diagonal();

    if !diagonal.is_finite() || diagonal <= 0.0 {
        return Err(MeshError::unsupported_units(
            diagonal,
            "mesh has zero or non-finite extent",
        ));
    }

    let (source_units, detected) = match policy.units {
        Some(units) => (units, false),
        None if diagonal < policy.meter_threshold => (Units::Meters, true),
        None => (Units::Millimeters, true),
    };

    let scale = source_units.to_mm();
    let diagonal_mm = diagonal * scale;

    if diagonal_mm < policy.min_diagonal_mm || diagonal_mm > policy.max_diagonal_mm {
        return Err(MeshError::unsupported_units(
            diagonal,
            format!(
                "normalized diagonal {:.3} mm (as {}) is outside the plausible range {}..{} mm",
                diagonal_mm, source_units, policy.min_diagonal_mm, policy.max_diagonal_mm
            ),
        ));
    }

    Ok(UnitNormalization {
        source_units,
        scale,
        detected,
        diagonal_mm,
    })
}

/// Normalize a mesh to millimeters in place.
pub fn normalize_units(mesh: &mut Mesh, policy: &UnitPolicy) -> MeshResult<UnitNormalization> {
    let result = detect_units(mesh, policy)?;

    if result.scale != 1.0 {
        if result.detected {
            warn!(
                units = %result.source_units,
                scale = result.scale,
                diagonal_mm = result.diagonal_mm,
                "Small mesh assumed to be in meters; rescaling to millimeters"
            );
        } else {
            debug!(
                units = %result.source_units,
                scale = result.scale,
                "Rescaling mesh to millimeters"
            );
        }
        mesh.scale(result.scale);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment_mesh(length: f64) -> Mesh {
        Mesh::from_raw(
            &[[0.0, 0.0, 0.0], [length, 0.0, 0.0], [0.0, length, 0.0]],
            &[[0, 1, 2]],
        )
    }

    #[test]
    fn test_meters_detected() {
        let mut mesh = segment_mesh(0.4);
        let norm = normalize_units(&mut mesh, &UnitPolicy::default()).unwrap();
        assert_eq!(norm.source_units, Units::Meters);
        assert!(norm.detected);
        let bb = mesh.bounds().unwrap();
        assert!((bb.max.x - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_millimeters_untouched() {
        let mut mesh = segment_mesh(400.0);
        let norm = normalize_units(&mut mesh, &UnitPolicy::default()).unwrap();
        assert_eq!(norm.source_units, Units::Millimeters);
        assert_eq!(norm.scale, 1.0);
        assert_eq!(mesh.bounds().unwrap().max.x, 400.0);
    }

    #[test]
    fn test_explicit_override() {
        let mut mesh = segment_mesh(4.0);
        let norm = normalize_units(&mut mesh, &UnitPolicy::millimeters()).unwrap();
        assert!(!norm.detected);
        assert_eq!(mesh.bounds().unwrap().max.x, 4.0);
    }

    #[test]
    fn test_implausible_rejected() {
        let mut mesh = segment_mesh(1e7);
        let err = normalize_units(&mut mesh, &UnitPolicy::default()).unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedUnits { .. }));
    }

    #[test]
    fn test_degenerate_rejected() {
        let mesh = Mesh::from_raw(&[[1.0, 1.0, 1.0]; 3], &[[0, 1, 2]]);
        assert!(matches!(
            detect_units(&mesh, &UnitPolicy::default()),
            Err(MeshError::UnsupportedUnits { .. })
        ));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(Units::parse("MM"), Some(Units::Millimeters));
        assert_eq!(Units::parse("inches"), Some(Units::Inches));
        assert_eq!(Units::parse("furlong"), None);
    }
}
