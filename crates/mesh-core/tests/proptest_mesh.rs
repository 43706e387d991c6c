//! Property-based tests for the geometry kernel.
//!
//! Run with: cargo test -p mesh-core --test proptest_mesh

use mesh_core::primitives::cuboid;
use mesh_core::{Axis, Side, UnitPolicy, Units, inspect_solid, normalize_units};
use proptest::prelude::*;

fn arb_axis() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::X), Just(Axis::Y), Just(Axis::Z)]
}

fn arb_extents() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(5.0..500.0f64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_clip_partitions_volume(
        origin in prop::array::uniform3(-100.0..100.0f64),
        extents in arb_extents(),
        axis in arb_axis(),
        fraction in 0.05..0.95f64,
    ) {
        let max = [origin[0] + extents[0], origin[1] + extents[1], origin[2] + extents[2]];
        let mesh = cuboid(origin, max);
        let i = axis.index();
        let offset = origin[i] + extents[i] * fraction;

        let below = mesh.clip(axis, offset, Side::Below).unwrap();
        let above = mesh.clip(axis, offset, Side::Above).unwrap();

        let total = below.volume() + above.volume();
        prop_assert!((total - mesh.volume()).abs() <= 1e-6 * mesh.volume());
        prop_assert!(inspect_solid(&below).is_closed_solid());
        prop_assert!(inspect_solid(&above).is_closed_solid());
        prop_assert!((below.bounds().unwrap().max[i] - offset).abs() < 1e-9);
        prop_assert!((above.bounds().unwrap().min[i] - offset).abs() < 1e-9);
    }

    #[test]
    fn proptest_clip_never_grows_bounds(
        extents in arb_extents(),
        axis in arb_axis(),
        fraction in 0.05..0.95f64,
    ) {
        let mesh = cuboid([0.0; 3], extents);
        let bb = mesh.bounds().unwrap();
        let offset = extents[axis.index()] * fraction;
        for side in [Side::Below, Side::Above] {
            let part = mesh.clip(axis, offset, side).unwrap();
            let pb = part.bounds().unwrap();
            prop_assert!(bb.contains(&pb.min, 1e-9) && bb.contains(&pb.max, 1e-9));
        }
    }

    #[test]
    fn proptest_meter_detection_scales_by_1000(extents in prop::array::uniform3(0.05..3.0f64)) {
        let mut mesh = cuboid([0.0; 3], extents);
        let before = mesh.volume();
        let norm = normalize_units(&mut mesh, &UnitPolicy::default()).unwrap();
        prop_assert_eq!(norm.source_units, Units::Meters);
        prop_assert!((mesh.volume() - before * 1e9).abs() <= 1e-6 * mesh.volume());
    }

    #[test]
    fn proptest_millimeter_models_untouched(extents in prop::array::uniform3(10.0..2000.0f64)) {
        let mut mesh = cuboid([0.0; 3], extents);
        let original = mesh.clone();
        let norm = normalize_units(&mut mesh, &UnitPolicy::default()).unwrap();
        prop_assert_eq!(norm.source_units, Units::Millimeters);
        prop_assert_eq!(mesh, original);
    }
}
