#![forbid(unsafe_code)]

//! Lane allocation.
//!
//! [`allocate`] takes what is already on screen and the authoritative item
//! set, and decides which new items enter a lane this tick, which wait, and
//! which are dropped.
//!
//! # Policy
//!
//! 1. Candidates are items of the full set not yet allocated, in arrival
//!    order (a repeated id counts once).
//! 2. Lanes `0..lane_count` are classified Free / Idle / Busy; only Free and
//!    Idle lanes take new items, in the order given by the strategy (see
//!    [`eligible_lanes`]).
//! 3. With enough lanes, candidates are placed in arrival order. Otherwise
//!    they are ranked by distance from `now` (stable), the closest ones get
//!    the lanes, and of the rest every candidate already past
//!    `transit - late_grace` is deserted; the others are deferred.
//! 4. A placed item records the lane's previous incumbent as its
//!    predecessor for the delay calculator, and becomes the new incumbent.
//!
//! # Failure Modes
//!
//! None. No lanes, no eligible lanes and empty input all degrade to
//! deferral or desertion.

use ahash::AHashSet;
use rand::Rng;

use crate::config::BarrageConfig;
use crate::geometry::GeometryProvider;
use crate::item::{AllocatedItem, Item, ItemId, Millis};
use crate::lane::{LaneTable, eligible_lanes};

/// Per-tick inputs besides the items themselves.
#[derive(Debug, Clone, Copy)]
pub struct AllocationRequest<'a> {
    /// Lanes available for new items.
    pub lane_count: usize,
    pub now: Millis,
    /// The area's entry edge, for "fully entered" queries.
    pub container_right: f64,
    pub config: &'a BarrageConfig,
}

/// A candidate given a lane this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub item: Item,
    pub lane: usize,
    /// Incumbent of the lane before this placement.
    pub predecessor: Option<ItemId>,
}

/// Result of one allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// New items with their lanes, in placement order.
    pub placements: Vec<Placement>,
    /// Candidates dropped for being too late to show.
    pub deserted: Vec<Item>,
    /// Candidates left for a later tick.
    pub deferred: Vec<ItemId>,
}

impl Allocation {
    /// Whether the allocated set is unchanged by this pass.
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Run one allocation pass.
///
/// `current` must be in allocation order. `full` may contain items already
/// in `current`; those are skipped. The RNG is only used by the sparse
/// strategy.
pub fn allocate<G, R>(
    current: &[AllocatedItem],
    full: &[Item],
    request: &AllocationRequest<'_>,
    geometry: &G,
    rng: &mut R,
) -> Allocation
where
    G: GeometryProvider + ?Sized,
    R: Rng + ?Sized,
{
    let allocated: AHashSet<&str> = current.iter().map(|a| a.item.id.as_str()).collect();
    let mut seen = AHashSet::with_capacity(full.len());
    let mut candidates: Vec<&Item> = full
        .iter()
        .filter(|item| {
            let id = item.id.as_str();
            !allocated.contains(id) && seen.insert(id)
        })
        .collect();

    if candidates.is_empty() {
        return Allocation::default();
    }

    let mut table = LaneTable::from_allocated(current, request.lane_count);
    let states = table.states(request.lane_count, geometry, request.container_right);
    let lanes = eligible_lanes(&states, request.config.strategy, rng);

    let now = request.now;
    if lanes.len() < candidates.len() {
        candidates.sort_by_key(|item| item.recency(now));
    }

    let admitted = lanes.len().min(candidates.len());
    let (admit, overflow) = candidates.split_at(admitted);

    let mut allocation = Allocation::default();
    for (item, &lane) in admit.iter().zip(&lanes) {
        let predecessor = table.occupy(lane, item.id.clone());
        tracing::debug!(
            target: "barrage.alloc",
            id = %item.id,
            lane,
            predecessor = ?predecessor.as_ref().map(ItemId::as_str),
            "item placed"
        );
        allocation.placements.push(Placement {
            item: (*item).clone(),
            lane,
            predecessor,
        });
    }

    let transit = request.config.transit();
    let grace = request.config.late_grace_ms;
    for item in overflow {
        if item.is_stale(now, transit, grace) {
            allocation.deserted.push((*item).clone());
        } else {
            allocation.deferred.push(item.id.clone());
        }
    }

    if !allocation.deserted.is_empty() {
        tracing::warn!(
            target: "barrage.alloc",
            deserted = allocation.deserted.len(),
            lane_count = request.lane_count,
            "lanes exhausted, dropping late items"
        );
    }
    if !allocation.deferred.is_empty() {
        tracing::debug!(
            target: "barrage.alloc",
            deferred = allocation.deferred.len(),
            eligible = lanes.len(),
            "not enough lanes, deferring"
        );
    }

    allocation
}
