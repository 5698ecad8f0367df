//! Property-based tests for the collapse engine.
//!
//! Random sheets with jittered spheres plus random extra patches (which make
//! the skeleton non-manifold) must never break the graph's invariants.
//!
//! Run with: cargo test -p slabcrate-simplification -- proptest

use proptest::prelude::*;
use slabcrate_core::{RawSkeleton, SkeletalGraph, Sphere};
use slabcrate_simplification::{
    clean_isolated_vertices, CollapseEngine, EngineState, SimplifyConfig, StepOutcome,
};

// =============================================================================
// Strategies
// =============================================================================

/// Center jitter and radius of one sphere.
fn arb_sphere_offset() -> impl Strategy<Value = ([f64; 3], f64)> {
    (prop::array::uniform3(-0.3..0.3f64), 0.05..0.6f64)
}

/// A jittered `size`×`size` sheet with up to `max_extra` random patches.
fn arb_skeleton(max_extra: usize) -> impl Strategy<Value = RawSkeleton> {
    (3usize..=6).prop_flat_map(move |size| {
        let count = size * size;
        (
            prop::collection::vec(arb_sphere_offset(), count),
            prop::collection::vec(prop::array::uniform3(0..count), 0..=max_extra),
        )
            .prop_map(move |(offsets, extra)| {
                let spheres = offsets
                    .iter()
                    .enumerate()
                    .map(|(i, ([dx, dy, dz], r))| {
                        let (x, y) = ((i % size) as f64, (i / size) as f64);
                        Sphere::from_coords(x + dx, y + dy, *dz, *r)
                    })
                    .collect();
                let mut faces = Vec::new();
                for y in 0..(size - 1) {
                    for x in 0..(size - 1) {
                        let tl = y * size + x;
                        let bl = tl + size;
                        faces.push([tl, bl, tl + 1]);
                        faces.push([tl + 1, bl, bl + 1]);
                    }
                }
                faces.extend(extra);
                RawSkeleton {
                    spheres,
                    faces,
                    ..Default::default()
                }
            })
    })
}

fn arb_config() -> impl Strategy<Value = SimplifyConfig> {
    (0u8..4, 0u8..3, any::<bool>()).prop_map(|(weighting, mode, inversion)| {
        SimplifyConfig::default()
            .with_weighting(weighting.try_into().unwrap())
            .with_boundary_mode(mode.try_into().unwrap())
            .with_prevent_inversion(inversion)
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every step leaves a consistent graph with non-increasing counts.
    #[test]
    fn proptest_steps_keep_invariants(
        raw in arb_skeleton(6),
        config in arb_config(),
        fraction in 0.0..1.0f64,
    ) {
        let graph = SkeletalGraph::from_raw(&raw).unwrap();
        let start = graph.vertex_count();
        let target = ((start as f64) * fraction) as usize;
        let mut engine = CollapseEngine::new(graph, config, target).unwrap();

        let mut last = (start, engine.graph().edge_count(), engine.graph().face_count());
        loop {
            let outcome = engine.step().unwrap();
            let graph = engine.graph();
            prop_assert!(graph.check_consistency().is_ok());
            let now = (graph.vertex_count(), graph.edge_count(), graph.face_count());
            prop_assert!(now.0 <= last.0 && now.1 <= last.1 && now.2 <= last.2);
            last = now;
            if let StepOutcome::Finished(_) = outcome {
                break;
            }
        }

        // Never below the target; exactly on it when converged.
        let end = engine.graph().vertex_count();
        prop_assert!(end >= target.min(start));
        if engine.state() == EngineState::Converged && start > target {
            prop_assert_eq!(end, target);
        }
        for v in engine.graph().vertex_ids() {
            let sphere = engine.graph().sphere(v);
            prop_assert!(sphere.is_finite());
            prop_assert!(sphere.radius >= 0.0);
        }
    }

    /// Two runs over the same input end in identical graphs.
    #[test]
    fn proptest_runs_are_deterministic(raw in arb_skeleton(4), config in arb_config()) {
        let graph = SkeletalGraph::from_raw(&raw).unwrap();
        let target = graph.vertex_count() / 2;

        let mut first = CollapseEngine::new(graph.clone(), config.clone(), target).unwrap();
        let mut second = CollapseEngine::new(graph, config, target).unwrap();
        prop_assert_eq!(first.run().unwrap(), second.run().unwrap());
        prop_assert_eq!(first.stats(), second.stats());
        prop_assert_eq!(first.into_graph(), second.into_graph());
    }

    /// Cleaning twice removes nothing the second time.
    #[test]
    fn proptest_cleanup_is_idempotent(raw in arb_skeleton(0), lone in 0usize..5) {
        let mut graph = SkeletalGraph::from_raw(&raw).unwrap();
        for i in 0..lone {
            graph.add_vertex(Sphere::from_coords(100.0 + i as f64, 0.0, 0.0, 0.1), false);
        }
        let before = graph.vertex_count();
        prop_assert_eq!(clean_isolated_vertices(&mut graph), lone);
        prop_assert_eq!(graph.vertex_count(), before - lone);
        prop_assert_eq!(clean_isolated_vertices(&mut graph), 0);
        prop_assert!(graph.check_consistency().is_ok());
    }
}
