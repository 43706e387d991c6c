//! Property-based tests for segmentation.
//!
//! Run with: cargo test -p mesh-segment --test proptest_segment

use mesh_core::primitives::cuboid;
use mesh_segment::{SegmentationConfig, segment_mesh};
use proptest::prelude::*;

fn arb_extents() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(20.0..600.0f64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn proptest_every_part_fits(
        extents in arb_extents(),
        build in prop::array::uniform3(120.0..400.0f64),
    ) {
        let mesh = cuboid([0.0; 3], extents);
        let config = SegmentationConfig::new(build[0], build[1], build[2]).without_joints();
        let result = segment_mesh(&mesh, &config).unwrap();

        for part in result.parts() {
            let e = part.extents();
            for a in 0..3 {
                prop_assert!(e[a] <= build[a] + 1e-6);
            }
        }
        let total: f64 = result.parts().iter().map(|p| p.volume()).sum();
        prop_assert!((total - mesh.volume()).abs() <= 1e-6 * mesh.volume());
        prop_assert!(result.revalidate().is_ok());
    }

    #[test]
    fn proptest_part_count_monotone(
        extents in prop::array::uniform3(20.0..400.0f64),
        size in 120.0..400.0f64,
        shrink in 0.6..1.0f64,
    ) {
        let mesh = cuboid([0.0; 3], extents);
        let large = SegmentationConfig::new(size, size, size).without_joints();
        let small = SegmentationConfig::new(size * shrink, size * shrink, size * shrink).without_joints();

        let n_large = segment_mesh(&mesh, &large).unwrap().parts().len();
        let n_small = segment_mesh(&mesh, &small).unwrap().parts().len();
        prop_assert!(n_small >= n_large);
    }

    #[test]
    fn proptest_joints_lie_on_seams(
        length in 320.0..600.0f64,
        width in 40.0..150.0f64,
    ) {
        let mesh = cuboid([0.0; 3], [length, width, width]);
        let config = SegmentationConfig::default();
        let result = segment_mesh(&mesh, &config).unwrap();

        for joint in result.joints() {
            let seam = &result.seams()[joint.seam];
            prop_assert!((joint.position[seam.axis.index()] - seam.coordinate).abs() < 1e-9);
            prop_assert!((joint.hole_diameter() - config.hole_diameter()).abs() < 1e-12);
        }
    }
}
