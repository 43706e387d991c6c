//! Integration tests for the geometry kernel: clipping, cylinders, sections
//! and validation working together the way the segmentation crate uses them.
//!
//! Run with: cargo test -p mesh-core --test kernel_tests

use approx::assert_relative_eq;
use mesh_core::boolean::Solid;
use mesh_core::primitives::{block, cuboid};
use mesh_core::{
    Axis, MeshError, PlanarSection, Side, UnitPolicy, Units, inspect_solid, normalize_units,
    validate_solid,
};

// =============================================================================
// Half-space cuts
// =============================================================================

#[test]
fn test_split_long_block_at_midpoint() {
    let mesh = block(400.0, 100.0, 100.0);
    let low = mesh
        .difference(&Solid::half_space(Axis::X, 200.0, Side::Above))
        .unwrap();
    let high = mesh
        .difference(&Solid::half_space(Axis::X, 200.0, Side::Below))
        .unwrap();

    for part in [&low, &high] {
        let report = inspect_solid(part);
        assert!(report.is_closed_solid(), "{report}");
        assert_relative_eq!(part.volume(), 2_000_000.0, epsilon = 1e-3);
        assert!((part.bounds().unwrap().extent(Axis::X) - 200.0).abs() < 1e-9);
    }
}

#[test]
fn test_repeated_cuts_on_alternating_axes() {
    let mesh = block(300.0, 300.0, 300.0);
    let mut parts = vec![mesh.clone()];
    for (axis, offset) in [(Axis::X, 150.0), (Axis::Y, 100.0), (Axis::Z, 75.0)] {
        let mut next = Vec::new();
        for part in &parts {
            let bb = part.bounds().unwrap();
            if offset <= bb.min[axis.index()] || offset >= bb.max[axis.index()] {
                next.push(part.clone());
                continue;
            }
            next.push(part.clip(axis, offset, Side::Below).unwrap());
            next.push(part.clip(axis, offset, Side::Above).unwrap());
        }
        parts = next;
    }

    assert_eq!(parts.len(), 8);
    let total: f64 = parts.iter().map(|p| p.volume()).sum();
    assert!((total - mesh.volume()).abs() < 1e-3);
    for part in &parts {
        assert!(inspect_solid(part).is_closed_solid());
    }
}

#[test]
fn test_clip_hollow_box_keeps_inner_wall() {
    // Outer box with an inward-facing inner box: a closed shell.
    let mut shell = cuboid([0.0, 0.0, 0.0], [100.0, 60.0, 60.0]);
    let mut cavity = cuboid([10.0, 10.0, 10.0], [90.0, 50.0, 50.0]);
    cavity.flip_faces();
    shell.append(&cavity);
    let expected = 100.0 * 60.0 * 60.0 - 80.0 * 40.0 * 40.0;
    assert!((shell.volume() - expected).abs() < 1e-6);

    let half = shell.clip(Axis::X, 50.0, Side::Below).unwrap();
    assert!(inspect_solid(&half).is_closed_solid());
    assert_relative_eq!(half.volume(), expected / 2.0, epsilon = 1e-6);

    // The cut face is a ring: outer rectangle minus the cavity.
    let section = PlanarSection::extract(&half, Axis::X, 50.0, Side::Above);
    assert!((section.area() - (60.0 * 60.0 - 40.0 * 40.0)).abs() < 1e-6);
    assert!(!section.contains([30.0, 30.0]));
    assert!(section.contains([5.0, 5.0]));
}

#[test]
fn test_cut_removing_everything_is_boolean_failure() {
    let mesh = block(10.0, 10.0, 10.0);
    let err = mesh
        .difference(&Solid::half_space(Axis::Z, -5.0, Side::Above))
        .unwrap_err();
    assert!(matches!(err, MeshError::BooleanFailed { .. }));
}

// =============================================================================
// Cylinders on cut faces
// =============================================================================

#[test]
fn test_pin_and_hole_on_matching_seam() {
    let mesh = block(200.0, 80.0, 80.0);
    let low = mesh.clip(Axis::X, 100.0, Side::Below).unwrap();
    let high = mesh.clip(Axis::X, 100.0, Side::Above).unwrap();

    let pin = Solid::cylinder(Axis::X, 100.0, [40.0, 40.0], 2.5, 8.0, Side::Above);
    let hole = Solid::cylinder(Axis::X, 100.0, [40.0, 40.0], 2.6, 8.2, Side::Above);

    let low = low.union(&pin).unwrap();
    let high = high.difference(&hole).unwrap();

    assert!(inspect_solid(&low).is_closed_solid());
    assert!(inspect_solid(&high).is_closed_solid());
    assert!((low.bounds().unwrap().max.x - 108.0).abs() < 1e-9);
    assert_eq!(high.bounds().unwrap().min.x, 100.0);

    // The seam face of the bored part now has a hole where the pin enters.
    let section = PlanarSection::extract(&high, Axis::X, 100.0, Side::Below);
    assert!(!section.contains([40.0, 40.0]));
    assert!(section.contains([10.0, 10.0]));
}

#[test]
fn test_cylinder_off_the_face_fails() {
    let mesh = block(50.0, 50.0, 50.0);
    let tool = Solid::cylinder(Axis::Z, 50.0, [80.0, 25.0], 2.5, 8.0, Side::Below);
    assert!(mesh.difference(&tool).is_err());
}

// =============================================================================
// Units and validation
// =============================================================================

#[test]
fn test_meter_model_is_rescaled_and_validated() {
    let mut mesh = block(0.4, 0.1, 0.1);
    let norm = normalize_units(&mut mesh, &UnitPolicy::default()).unwrap();
    assert_eq!(norm.source_units, Units::Meters);
    assert!(norm.detected);

    let report = validate_solid(&mut mesh).unwrap();
    assert!((report.volume() - 4_000_000.0).abs() < 1e-3);
}

#[test]
fn test_explicit_units_skip_detection() {
    let mut mesh = block(4.0, 1.0, 1.0);
    let norm = normalize_units(&mut mesh, &UnitPolicy::explicit(Units::Centimeters)).unwrap();
    assert!(!norm.detected);
    assert!((mesh.bounds().unwrap().max.x - 40.0).abs() < 1e-9);
}

#[test]
fn test_inside_out_solid_is_reoriented() {
    let mut mesh = block(10.0, 20.0, 30.0);
    mesh.flip_faces();
    assert!(mesh.is_inside_out());
    let report = validate_solid(&mut mesh).unwrap();
    assert!(report.volume() > 0.0);
    assert!(!mesh.is_inside_out());
}

#[test]
fn test_open_mesh_rejected() {
    let mut mesh = block(10.0, 10.0, 10.0);
    mesh.faces.truncate(10);
    let err = validate_solid(&mut mesh).unwrap_err();
    assert!(matches!(err, MeshError::InvalidTopology { .. }));
}
