//! Integration tests for shell hollowing.
//!
//! Run with: cargo test -p mesh-hollow --test hollow_tests

use approx::assert_relative_eq;
use mesh_core::primitives::{block, cuboid};
use mesh_core::{Axis, Side, inspect_solid};
use mesh_hollow::{HollowBuilder, HollowError, HollowingConfig, InfeasibleReason, hollow};

#[test]
fn test_long_block_ten_mm_wall() {
    let mesh = block(400.0, 100.0, 100.0);
    let config = HollowingConfig::with_wall_thickness(10.0);
    let result = hollow(&mesh, &config).unwrap();

    // 128 voxels along 400mm: 3.125mm cells, 3 whole voxels of wall.
    assert_eq!(result.stats.erosion_radius, 3);
    assert_relative_eq!(result.stats.effective_wall_thickness, 9.375);

    let outer = 400.0 * 100.0 * 100.0;
    let inner = 380.0 * 80.0 * 80.0;
    let expected = outer - inner;
    let volume = result.mesh.volume();
    assert!(volume < outer && volume > 0.0);
    // Rounding the wall down and chamfered voxel edges stay within a few
    // cells' worth of error at this resolution.
    assert!(
        ((volume - expected) / expected).abs() < 0.1,
        "shell volume {volume} vs expected {expected}"
    );
    assert!(result.stats.closed);
}

#[test]
fn test_shell_is_cuttable() {
    let mesh = block(200.0, 60.0, 60.0);
    let config = HollowingConfig {
        wall_thickness: 6.0,
        resolution: Some(100),
        ..Default::default()
    };
    let shell = hollow(&mesh, &config).unwrap().mesh;
    let left = shell.clip(Axis::X, 100.0, Side::Below).unwrap();
    let right = shell.clip(Axis::X, 100.0, Side::Above).unwrap();
    assert!(inspect_solid(&left).is_closed_solid());
    assert_relative_eq!(
        left.volume() + right.volume(),
        shell.volume(),
        max_relative = 1e-9
    );
}

#[test]
fn test_wall_thicker_than_half_min_dimension() {
    let mesh = block(400.0, 100.0, 100.0);
    let err = hollow(&mesh, &HollowingConfig::with_wall_thickness(60.0)).unwrap_err();
    match err {
        HollowError::Infeasible {
            reason, min_extent, ..
        } => {
            assert_eq!(reason, InfeasibleReason::WallTooThick);
            assert_eq!(min_extent, 100.0);
        }
        other => panic!("expected infeasible, got {other}"),
    }
}

#[test]
fn test_enclosed_void_is_filled() {
    // A solid with a sealed internal cavity: the cavity is treated as solid
    // before erosion, so the result is a single shell at the outer wall.
    let mut mesh = cuboid([0.0, 0.0, 0.0], [60.0, 60.0, 60.0]);
    let mut cavity = cuboid([25.0, 25.0, 25.0], [35.0, 35.0, 35.0]);
    cavity.flip_faces();
    mesh.append(&cavity);

    let result = HollowBuilder::new(&mesh)
        .wall_thickness(6.0)
        .resolution(60)
        .build()
        .unwrap();
    assert!(result.stats.voids_filled > 0);

    let outer = 60.0f64.powi(3);
    let expected = outer - 48.0f64.powi(3);
    assert!(((result.mesh.volume() - expected) / expected).abs() < 0.05);
}

#[test]
fn test_grid_ceiling_enforced() {
    let mesh = block(100.0, 100.0, 100.0);
    let err = HollowBuilder::new(&mesh)
        .wall_thickness(2.0)
        .resolution(512)
        .max_voxels(1_000_000)
        .build()
        .unwrap_err();
    assert!(matches!(err, HollowError::GridTooLarge { .. }));
}

#[test]
fn test_deterministic() {
    let mesh = block(120.0, 50.0, 40.0);
    let config = HollowingConfig {
        wall_thickness: 4.0,
        resolution: Some(48),
        ..Default::default()
    };
    let a = hollow(&mesh, &config).unwrap();
    let b = hollow(&mesh, &config).unwrap();
    assert_eq!(a.mesh, b.mesh);
}
