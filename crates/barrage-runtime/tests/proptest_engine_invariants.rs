//! Property-based tests for engine bookkeeping under random operation
//! sequences.
//!
//! ## Invariants
//!
//! 1. An id is admitted at most once over the engine's lifetime.
//! 2. No id is both pending and allocated.
//! 3. A tick admits at most `capacity` items, each into a lane below it.
//! 4. Allocated items never change after admission.

use std::collections::{HashMap, HashSet};

use barrage_core::{
    AllocatedItem, AllocationStrategy, BarrageConfig, Bounds, Geometry, GeometryProvider, Item,
    ItemId,
};
use barrage_runtime::Engine;
use proptest::prelude::*;

/// Every item counts as fully entered; nothing has geometry.
struct Settled;

impl GeometryProvider for Settled {
    fn has_fully_entered(&self, _id: &ItemId, _container_right: f64) -> bool {
        true
    }

    fn geometry(&self, _id: &ItemId) -> Option<Geometry> {
        None
    }

    fn measure(&self, item: &Item) -> f64 {
        item.content.len() as f64 * 12.0
    }
}

#[derive(Debug, Clone)]
enum Op {
    Offer(Vec<(u8, i64)>),
    Exit(u8),
    Withdraw(u8),
    Capacity(usize),
    Tick(i64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec((0u8..48, -15_000i64..10_000), 0..6).prop_map(Op::Offer),
        2 => (0u8..48).prop_map(Op::Exit),
        1 => (0u8..48).prop_map(Op::Withdraw),
        1 => (0usize..5).prop_map(Op::Capacity),
        3 => (0i64..2_000).prop_map(Op::Tick),
    ]
}

fn arb_strategy() -> impl Strategy<Value = AllocationStrategy> {
    prop_oneof![
        Just(AllocationStrategy::Compact),
        Just(AllocationStrategy::Sparse),
    ]
}

// ── 1-4. Random operation sequences ───────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn engine_bookkeeping_holds(
        ops in prop::collection::vec(arb_op(), 1..60),
        strategy in arb_strategy(),
        seed in any::<u64>(),
    ) {
        let config = BarrageConfig {
            strategy,
            area: 100.0,
            seed: Some(seed),
            ..BarrageConfig::default()
        };
        let mut engine = Engine::new(config, Bounds::from_size(800.0, 72.0));
        let mut now = 0i64;
        let mut ever_admitted: HashSet<ItemId> = HashSet::new();
        let mut snapshots: HashMap<ItemId, AllocatedItem> = HashMap::new();

        for op in ops {
            match op {
                Op::Offer(batch) => {
                    engine.offer(batch.into_iter().map(|(id, offset)| {
                        Item::new(format!("m{id}"), "hello", now + offset)
                    }));
                }
                Op::Exit(id) => {
                    let id = ItemId::from(format!("m{id}"));
                    if engine.on_exit(&id) {
                        snapshots.remove(&id);
                    }
                }
                Op::Withdraw(id) => {
                    engine.withdraw(&format!("m{id}").into());
                }
                Op::Capacity(lanes) => engine.set_capacity(lanes),
                Op::Tick(step) => {
                    now += step;
                    let capacity = engine.capacity();
                    let outcome = engine.tick(now, &Settled);
                    prop_assert!(outcome.admitted.len() <= capacity);
                    for a in outcome.admitted {
                        prop_assert!(a.lane < capacity, "lane {} >= {capacity}", a.lane);
                        prop_assert!(
                            ever_admitted.insert(a.item.id.clone()),
                            "{} admitted twice",
                            a.item.id
                        );
                        snapshots.insert(a.item.id.clone(), a);
                    }
                }
            }

            let pending: HashSet<&ItemId> = engine.pending().iter().map(|i| &i.id).collect();
            for a in engine.allocated() {
                prop_assert!(!pending.contains(&a.item.id));
                prop_assert_eq!(snapshots.get(&a.item.id), Some(a));
            }
            prop_assert_eq!(engine.allocated().len(), snapshots.len());
        }
    }
}
