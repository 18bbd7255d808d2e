//! End-to-end properties over simulated streams.
//!
//! ## Invariants
//!
//! 1. No two items in a lane ever overlap on screen.
//! 2. Every delivered item is admitted, deserted or discarded exactly once.
//! 3. Every admitted item eventually exits.

use barrage_core::{AllocationStrategy, BarrageConfig, Bounds, Speed};
use barrage_sim::{Scenario, SimOptions, StreamSpec, run};
use proptest::prelude::*;

fn arb_config() -> impl Strategy<Value = BarrageConfig> {
    (
        prop_oneof![Just(AllocationStrategy::Compact), Just(AllocationStrategy::Sparse)],
        prop_oneof![
            Just(Speed::Slower),
            Just(Speed::Normal),
            Just(Speed::Faster),
            (6_000i64..30_000).prop_map(Speed::Custom),
        ],
        0.0f64..120.0,
        any::<u64>(),
    )
        .prop_map(|(strategy, speed, min_gap, seed)| BarrageConfig {
            strategy,
            speed,
            min_gap,
            area: 100.0,
            seed: Some(seed),
            ..BarrageConfig::default()
        })
}

fn arb_options() -> impl Strategy<Value = SimOptions> {
    (300.0f64..1_600.0, 1usize..6, 8.0f64..24.0, 8i64..40).prop_map(
        |(width, lanes, char_width, frame_ms)| SimOptions {
            container: Bounds::from_size(width, 24.0 * lanes as f64),
            char_width,
            frame_ms,
            ..SimOptions::default()
        },
    )
}

// ── 1-3. Random streams ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn simulated_streams_never_overlap(
        config in arb_config(),
        options in arb_options(),
        rate in 1.0f64..40.0,
        latency in 0i64..2_000,
        seed in any::<u64>(),
    ) {
        let scenario = Scenario::generate(&StreamSpec {
            rate,
            duration_ms: 4_000,
            max_latency_ms: latency,
            seed,
        }).unwrap();
        let report = run(config, &scenario, &options);

        prop_assert!(!report.truncated);
        prop_assert_eq!(report.overlap_count, 0, "{:?}", report.overlaps);
        let s = report.stats;
        prop_assert_eq!(s.admitted + s.deserted + s.discarded, scenario.len() as u64);
        prop_assert_eq!(s.exited, s.admitted);
    }
}
