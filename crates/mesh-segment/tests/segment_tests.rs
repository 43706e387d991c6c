//! Integration tests for build-volume segmentation.
//!
//! Run with: cargo test -p mesh-segment --test segment_tests

use approx::assert_relative_eq;
use mesh_core::primitives::{block, cuboid};
use mesh_core::{Axis, inspect_solid};
use mesh_segment::{
    ErrorKind, HollowingStrategy, JointKind, JointRole, JointType, JointWarningReason, SegmentError,
    SegmentationConfig, Units, segment_mesh,
};

fn assert_all_fit(result: &mesh_segment::SegmentationResult) {
    let build = result.build_volume();
    for part in result.parts() {
        let e = part.extents();
        for a in 0..3 {
            assert!(
                e[a] <= build[a] + 1e-6,
                "part {} extent {:?} exceeds {:?}",
                part.id,
                e,
                build
            );
        }
    }
}

#[test]
fn test_long_block_without_joints() {
    let mesh = block(400.0, 100.0, 100.0);
    let config = SegmentationConfig::default().without_joints();
    let result = segment_mesh(&mesh, &config).unwrap();

    assert_eq!(result.parts().len(), 2);
    assert_eq!(result.seams().len(), 1);
    assert!(result.joints().is_empty());
    assert!(result.warnings().is_empty());
    assert_all_fit(&result);

    let seam = &result.seams()[0];
    assert_eq!(seam.axis, Axis::X);
    assert_relative_eq!(seam.coordinate, 200.0, epsilon = 1e-6);

    let summary = result.summary();
    assert_relative_eq!(summary.original_volume, 4_000_000.0, max_relative = 1e-9);
    assert_relative_eq!(summary.final_volume, 4_000_000.0, max_relative = 1e-9);
    assert_eq!(summary.hollowed_volume, None);
    for part in result.parts() {
        assert!(inspect_solid(&part.mesh).is_closed_solid());
    }
}

#[test]
fn test_fitting_mesh_returns_single_part() {
    let mesh = block(100.0, 100.0, 100.0);
    let config = SegmentationConfig::default().without_joints();
    let result = segment_mesh(&mesh, &config).unwrap();

    assert_eq!(result.parts().len(), 1);
    assert!(result.seams().is_empty());
    assert!(result.cuts().is_empty());
    assert!(result.parts()[0].seams.is_empty());
}

#[test]
fn test_default_joints_on_long_block() {
    let mesh = block(400.0, 100.0, 100.0);
    let config = SegmentationConfig::default();
    let result = segment_mesh(&mesh, &config).unwrap();

    assert_eq!(result.parts().len(), 2);
    assert_eq!(result.joints().len(), config.joints_per_seam);
    assert!(result.warnings().is_empty());
    assert_all_fit(&result);

    for joint in result.joints() {
        let seam = &result.seams()[joint.seam];
        // Joint centers lie on the seam plane.
        assert_relative_eq!(joint.position[seam.axis.index()], seam.coordinate, epsilon = 1e-9);
        match &joint.kind {
            JointKind::Integrated {
                pin_part,
                hole_part,
                pin_diameter,
                hole_diameter,
                ..
            } => {
                assert_relative_eq!(*hole_diameter, pin_diameter + config.joint_tolerance, epsilon = 1e-12);
                assert_ne!(pin_part, hole_part);
                assert!(seam.involves(*pin_part) && seam.involves(*hole_part));
            }
            other => panic!("expected integrated joint, got {other:?}"),
        }
    }

    // Each part knows its joints and its role in them.
    let roles: Vec<JointRole> = result.joints_for(0).map(|(_, role)| role).collect();
    assert_eq!(roles.len(), 2);
    for part in result.parts() {
        assert!(inspect_solid(&part.mesh).is_closed_solid());
    }
}

#[test]
fn test_dowel_joints_bore_both_parts() {
    let mesh = block(400.0, 100.0, 100.0);
    let config = SegmentationConfig::default().with_joints(JointType::Dowel);
    let result = segment_mesh(&mesh, &config).unwrap();

    assert_eq!(result.joints().len(), 2);
    for joint in result.joints() {
        assert_eq!(joint.role_for(0), Some(JointRole::DowelHole));
        assert_eq!(joint.role_for(1), Some(JointRole::DowelHole));
    }
    // Holes only remove material.
    assert!(result.summary().final_volume < result.summary().original_volume);
    assert_relative_eq!(result.parts()[0].extents()[0], 200.0, epsilon = 1e-9);
}

#[test]
fn test_pins_never_push_part_past_build_volume() {
    let mesh = block(400.0, 100.0, 100.0);
    let config = SegmentationConfig::new(205.0, 320.0, 325.0);
    let result = segment_mesh(&mesh, &config).unwrap();

    assert_eq!(result.parts().len(), 2);
    assert!(result.joints().is_empty());
    assert_eq!(result.warnings().len(), 1);
    let warning = &result.warnings()[0];
    assert!(warning.is_unjoined());
    assert!(matches!(warning.reason, JointWarningReason::ExceedsBuildVolume { .. }));
    assert_all_fit(&result);
    result.revalidate().unwrap();
}

#[test]
fn test_segmentation_is_deterministic() {
    let mesh = cuboid([0.0, 0.0, 0.0], [450.0, 380.0, 120.0]);
    let config = SegmentationConfig::new(200.0, 200.0, 200.0);

    let a = segment_mesh(&mesh, &config).unwrap();
    let b = segment_mesh(&mesh, &config).unwrap();

    assert_eq!(a.parts().len(), b.parts().len());
    assert_eq!(a.cuts(), b.cuts());
    assert_eq!(a.seams(), b.seams());
    assert_eq!(a.joints(), b.joints());
    assert_eq!(a.summary(), b.summary());
}

#[test]
fn test_part_count_monotone_in_build_volume() {
    let mesh = cuboid([0.0, 0.0, 0.0], [400.0, 260.0, 90.0]);
    let mut last = 0;
    for size in [400.0, 300.0, 220.0, 150.0, 120.0, 100.0] {
        let config = SegmentationConfig::new(size, size, size).without_joints();
        let result = segment_mesh(&mesh, &config).unwrap();
        assert_all_fit(&result);
        assert!(
            result.parts().len() >= last,
            "build volume {size} produced {} parts after {last}",
            result.parts().len()
        );
        last = result.parts().len();
    }
}

#[test]
fn test_revalidate_changes_nothing() {
    let mesh = cuboid([0.0, 0.0, 0.0], [500.0, 200.0, 200.0]);
    let result = segment_mesh(&mesh, &SegmentationConfig::default()).unwrap();
    let summary = result.summary().clone();
    let parts: Vec<[f64; 3]> = result.parts().iter().map(|p| p.extents()).collect();

    result.revalidate().unwrap();
    result.revalidate().unwrap();

    assert_eq!(result.summary(), &summary);
    let again: Vec<[f64; 3]> = result.parts().iter().map(|p| p.extents()).collect();
    assert_eq!(parts, again);
}

#[test]
fn test_hollow_then_segment() {
    let mesh = block(400.0, 100.0, 100.0);
    let config = SegmentationConfig::default().with_hollowing(10.0);
    let result = segment_mesh(&mesh, &config).unwrap();

    assert_eq!(result.parts().len(), 2);
    assert_eq!(result.hollow_stats().len(), 1);
    assert_all_fit(&result);

    let summary = result.summary();
    let hollowed = summary.hollowed_volume.unwrap();
    assert!(hollowed > 0.0 && hollowed < summary.original_volume);

    // Every seam either got its joints or is reported.
    for seam in result.seams() {
        let placed = result.joints().iter().filter(|j| j.seam == seam.id).count();
        let reported = result.warnings().iter().any(|w| w.seam == seam.id);
        assert!(placed == config.joints_per_seam || reported);
    }
}

#[test]
fn test_segment_then_hollow() {
    let mesh = block(400.0, 100.0, 100.0);
    let config = SegmentationConfig::default()
        .with_hollowing(10.0)
        .with_strategy(HollowingStrategy::SegmentThenHollow)
        .without_joints();
    let result = segment_mesh(&mesh, &config).unwrap();

    assert_eq!(result.parts().len(), 2);
    assert_eq!(result.hollow_stats().len(), 2);
    assert_all_fit(&result);
    for part in result.parts() {
        // Trimmed back inside the pre-hollow part bounds.
        assert!(part.extents()[0] <= 200.0 + 1e-9);
        assert!(part.volume() < 200.0 * 100.0 * 100.0);
    }
}

#[test]
fn test_wall_too_thick_is_infeasible() {
    let mesh = block(400.0, 100.0, 100.0);
    let config = SegmentationConfig::default().with_hollowing(60.0);
    let err = segment_mesh(&mesh, &config).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::HollowingInfeasible);
    assert_eq!(err.code().as_str(), "SEG-2001");
    assert!(matches!(err, SegmentError::HollowingInfeasible { part: None, .. }));
}

#[test]
fn test_open_mesh_rejected() {
    let mut mesh = block(100.0, 100.0, 100.0);
    mesh.faces.pop();
    let err = segment_mesh(&mesh, &SegmentationConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMesh);
}

#[test]
fn test_meter_input_is_rescaled() {
    // 0.4 m long: detected as meters and split like the 400 mm block.
    let mesh = block(0.4, 0.1, 0.1);
    let config = SegmentationConfig::default().without_joints();
    let result = segment_mesh(&mesh, &config).unwrap();

    let units = result.units().unwrap();
    assert_eq!(units.source_units, Units::Meters);
    assert!(units.detected);
    assert_eq!(result.parts().len(), 2);
}

#[test]
fn test_explicit_units_override_detection() {
    let mesh = block(0.4, 0.1, 0.1);
    let config = SegmentationConfig::default()
        .without_joints()
        .with_units(Units::Millimeters);
    let err = segment_mesh(&mesh, &config).unwrap_err();
    // Far below the plausible size range once taken literally.
    assert_eq!(err.kind(), ErrorKind::UnsupportedUnits);
}

#[test]
fn test_hard_part_limit() {
    let mesh = block(1000.0, 100.0, 100.0);
    let config = SegmentationConfig::default().without_joints().with_max_parts(2);
    let err = segment_mesh(&mesh, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PartBudgetExceeded);
    assert!(matches!(err, SegmentError::PartBudgetExceeded { max_parts: 2, .. }));
}

#[test]
fn test_input_is_not_modified() {
    let mesh = block(400.0, 100.0, 100.0);
    let before = mesh.clone();
    let _ = segment_mesh(&mesh, &SegmentationConfig::default()).unwrap();
    assert_eq!(mesh.vertices.len(), before.vertices.len());
    assert_eq!(mesh.faces, before.faces);
}
