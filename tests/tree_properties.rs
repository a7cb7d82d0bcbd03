//! Property tests for the tree and burst generators.

use glowtree::burst::{generate_burst, BURST_RADIUS};
use glowtree::prelude::*;
use glowtree::tree::{CONE_MAX_RADIUS_RATIO, SPIRAL_MAX_RADIUS_RATIO};
use proptest::prelude::*;

fn horizontal_radius(p: Vec3) -> f32 {
    (p.x * p.x + p.z * p.z).sqrt()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn tree_counts_and_bounds_hold(
        count in 1000u32..=10_000,
        height in 2.0f32..=10.0,
        radius in 1.0f32..=5.0,
        seed in any::<u64>(),
    ) {
        let shape = TreeShape { particle_count: count, height, radius };
        let tree = generate_tree(&shape, &mut SeededRandom::new(seed));

        prop_assert_eq!(tree.len(), count as usize);
        prop_assert_eq!(tree.spiral_count, (count as usize * 7) / 10);
        prop_assert!(tree.buffer.is_consistent());

        let eps = 1e-4;
        for p in tree.buffer.positions() {
            prop_assert!(p.y >= 0.0 && p.y <= height + eps);
        }
        for p in tree.spiral_positions() {
            prop_assert!(horizontal_radius(*p) <= SPIRAL_MAX_RADIUS_RATIO * radius + eps);
        }
        for p in tree.cone_positions() {
            prop_assert!(horizontal_radius(*p) <= CONE_MAX_RADIUS_RATIO * radius + eps);
        }
    }

    #[test]
    fn tree_generation_is_repeatable(seed in any::<u64>()) {
        let shape = TreeShape::default();
        let a = generate_tree(&shape, &mut SeededRandom::new(seed));
        let b = generate_tree(&shape, &mut SeededRandom::new(seed));
        prop_assert_eq!(a.buffer.positions(), b.buffer.positions());
        prop_assert_eq!(a.buffer.colors(), b.buffer.colors());
    }

    #[test]
    fn burst_stays_inside_its_sphere(seed in any::<u64>()) {
        let burst = generate_burst(200, Vec3::ONE, &mut SeededRandom::new(seed));
        prop_assert_eq!(burst.len(), 200);
        for p in burst.positions() {
            prop_assert!(p.length() <= BURST_RADIUS + 1e-5);
        }
    }

    #[test]
    fn out_of_range_counts_are_rejected(count in prop_oneof![0u32..1000, 10_001u32..50_000]) {
        let params = SceneParams { particle_count: count, ..SceneParams::default() };
        prop_assert!(params.validate().is_err());
    }
}
