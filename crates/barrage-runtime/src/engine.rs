#![forbid(unsafe_code)]

//! The barrage engine.
//!
//! [`Engine`] owns the mutable side of the system: items offered but not yet
//! placed, items on screen, removed ids, lane capacity and the pending-tick
//! flag. Each tick rebuilds lane occupancy from the on-screen list, runs
//! [`allocate`], and fixes the entry delay of every new placement with
//! [`compute_entry_delay`].
//!
//! # Lifecycle of an item
//!
//! ```text
//! offer ──▶ pending ──tick──▶ allocated ──on_exit──▶ removed
//!              │                  (delay fixed once)
//!              ├──tick (too late, no lane)──▶ deserted
//!              ├──tick (placed, too late)───▶ discarded
//!              └──withdraw──────────────────▶ removed
//! ```
//!
//! Removed ids are remembered (bounded) so re-delivery is a no-op.
//!
//! # Invariants
//!
//! 1. An id is pending, allocated, or neither; never both.
//! 2. An id is allocated at most once over the engine's lifetime (within the
//!    tombstone horizon).
//! 3. `entry_delay` and `lane` of an allocated item never change.
//! 4. Capacity changes only affect later ticks.

use ahash::AHashSet;
use barrage_core::{
    AllocatedItem, AllocationRequest, BarrageConfig, Bounds, DelayInput, EntryDelay,
    GeometryProvider, Item, ItemId, LaneState, LaneTable, Millis, Predecessor, Timebase, allocate,
    compute_entry_delay,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;

use crate::clock::Clock;
use crate::tick::TickSlot;
use crate::tombstone::Tombstones;

/// What one tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Newly placed items, with their final delays, in placement order.
    pub admitted: Vec<AllocatedItem>,
    /// Items dropped because no lane opened before they went stale.
    pub deserted: Vec<Item>,
    /// Items that got a lane but were already too late to animate.
    pub discarded: Vec<Item>,
    /// Items still waiting for a lane.
    pub deferred: Vec<ItemId>,
}

impl TickOutcome {
    /// Whether the tick changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
            && self.deserted.is_empty()
            && self.discarded.is_empty()
            && self.deferred.is_empty()
    }
}

/// Cumulative counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub offered: u64,
    pub duplicates: u64,
    pub admitted: u64,
    pub deserted: u64,
    pub discarded: u64,
    pub exited: u64,
    pub withdrawn: u64,
    pub ticks: u64,
}

/// Lane allocation engine.
#[derive(Debug)]
pub struct Engine {
    config: BarrageConfig,
    container: Bounds,
    capacity: usize,
    playback_origin: Millis,
    pending: Vec<Item>,
    allocated: Vec<AllocatedItem>,
    /// Ids currently pending or allocated.
    live: AHashSet<ItemId>,
    tombstones: Tombstones,
    slot: TickSlot,
    rng: SmallRng,
    stats: EngineStats,
}

impl Engine {
    /// Create an engine for a container, sizing lanes from `config`.
    #[must_use]
    pub fn new(config: BarrageConfig, container: Bounds) -> Self {
        let rng = config
            .seed
            .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
        let capacity = lanes_for(&config, container);
        let tombstones = Tombstones::new(config.tombstone_capacity);
        Self {
            config,
            container,
            capacity,
            playback_origin: 0,
            pending: Vec::new(),
            allocated: Vec::new(),
            live: AHashSet::new(),
            tombstones,
            slot: TickSlot::new(),
            rng,
            stats: EngineStats::default(),
        }
    }

    // -- Accessors ----------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &BarrageConfig {
        &self.config
    }

    #[must_use]
    pub fn container(&self) -> Bounds {
        self.container
    }

    /// Lanes available to the next tick.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items on screen, in allocation order.
    #[must_use]
    pub fn allocated(&self) -> &[AllocatedItem] {
        &self.allocated
    }

    /// Items waiting for a lane, in arrival order.
    #[must_use]
    pub fn pending(&self) -> &[Item] {
        &self.pending
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    #[must_use]
    pub fn tick_slot(&self) -> &TickSlot {
        &self.slot
    }

    /// Whether `id` is pending or on screen.
    #[must_use]
    pub fn is_live(&self, id: &ItemId) -> bool {
        self.live.contains(id)
    }

    /// Current state of each lane as the next tick would see it.
    pub fn lane_snapshot<G>(&self, renderer: &G) -> Vec<LaneState>
    where
        G: GeometryProvider + ?Sized,
    {
        LaneTable::from_allocated(&self.allocated, self.capacity).states(
            self.capacity,
            renderer,
            self.container.right(),
        )
    }

    // -- Inputs -------------------------------------------------------------

    /// Offer items for display.
    ///
    /// Ids already pending, on screen, or recently removed are ignored.
    /// Returns how many items were accepted.
    pub fn offer<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = Item>,
    {
        let mut accepted = 0;
        let mut duplicates = 0;
        for mut item in items {
            self.stats.offered += 1;
            if self.live.contains(&item.id) || self.tombstones.contains(&item.id) {
                duplicates += 1;
                continue;
            }
            if self.config.timebase == Timebase::Preset {
                item.scheduled_time = self.playback_origin.saturating_add(item.scheduled_time);
            }
            self.live.insert(item.id.clone());
            self.pending.push(item);
            accepted += 1;
        }
        self.stats.duplicates += duplicates;

        tracing::debug!(
            target: "barrage.engine",
            accepted,
            duplicates,
            pending = self.pending.len(),
            "items offered"
        );
        if accepted > 0 {
            self.slot.request();
        }
        accepted
    }

    /// Renderer callback: the item finished crossing.
    ///
    /// Unknown ids are ignored and return `false`.
    pub fn on_exit(&mut self, id: &ItemId) -> bool {
        let Some(pos) = self.allocated.iter().position(|a| &a.item.id == id) else {
            tracing::trace!(target: "barrage.engine", %id, "exit for unknown item");
            return false;
        };
        let gone = self.allocated.remove(pos);
        self.forget(gone.item.id);
        self.stats.exited += 1;
        tracing::debug!(
            target: "barrage.engine",
            %id,
            lane = gone.lane,
            on_screen = self.allocated.len(),
            "item exited"
        );
        self.slot.request();
        true
    }

    /// Transport callback: an item not yet shown was retracted upstream.
    ///
    /// Returns `false` if the id is not pending.
    pub fn withdraw(&mut self, id: &ItemId) -> bool {
        let Some(pos) = self.pending.iter().position(|item| &item.id == id) else {
            return false;
        };
        let item = self.pending.remove(pos);
        self.forget(item.id);
        self.stats.withdrawn += 1;
        true
    }

    /// Set the number of lanes directly.
    pub fn set_capacity(&mut self, lanes: usize) {
        if lanes != self.capacity {
            tracing::debug!(
                target: "barrage.engine",
                from = self.capacity,
                to = lanes,
                "lane capacity changed"
            );
            self.capacity = lanes;
            self.slot.request();
        }
    }

    /// Container resized: recompute lanes from the config.
    pub fn resize(&mut self, container: Bounds) {
        self.container = container;
        self.set_capacity(lanes_for(&self.config, container));
        self.slot.request();
    }

    /// Replace the configuration.
    ///
    /// On-screen items keep their lanes, delays and transit durations.
    pub fn set_config(&mut self, config: BarrageConfig) {
        if config.seed != self.config.seed {
            if let Some(seed) = config.seed {
                self.rng = SmallRng::seed_from_u64(seed);
            }
        }
        self.tombstones.set_capacity(config.tombstone_capacity);
        self.config = config;
        self.set_capacity(lanes_for(&self.config, self.container));
        self.slot.request();
    }

    /// Playback start for [`Timebase::Preset`] items offered from now on.
    pub fn set_playback_origin(&mut self, origin: Millis) {
        self.playback_origin = origin;
    }

    // -- Ticking ------------------------------------------------------------

    /// Ask for a tick on the next frame. Repeated requests merge.
    pub fn request_tick(&mut self) {
        self.slot.request();
    }

    /// Run a tick if one is pending.
    pub fn run_pending<C, G>(&mut self, clock: &C, renderer: &G) -> Option<TickOutcome>
    where
        C: Clock + ?Sized,
        G: GeometryProvider + ?Sized,
    {
        if self.slot.take() {
            Some(self.tick(clock.now(), renderer))
        } else {
            None
        }
    }

    /// Run one allocation pass at `now`.
    pub fn tick<G>(&mut self, now: Millis, renderer: &G) -> TickOutcome
    where
        G: GeometryProvider + ?Sized,
    {
        let _span = tracing::debug_span!(
            "barrage.tick",
            now,
            lane_count = self.capacity,
            pending = self.pending.len(),
        )
        .entered();
        self.stats.ticks += 1;

        let request = AllocationRequest {
            lane_count: self.capacity,
            now,
            container_right: self.container.right(),
            config: &self.config,
        };
        let allocation = allocate(
            &self.allocated,
            &self.pending,
            &request,
            renderer,
            &mut self.rng,
        );

        let mut outcome = TickOutcome {
            deferred: allocation.deferred,
            ..TickOutcome::default()
        };
        if allocation.placements.is_empty() && allocation.deserted.is_empty() {
            if !outcome.deferred.is_empty() {
                self.slot.request();
            }
            return outcome;
        }

        let mut resolved: AHashSet<ItemId> = AHashSet::new();
        for item in allocation.deserted {
            resolved.insert(item.id.clone());
            self.forget(item.id.clone());
            outcome.deserted.push(item);
        }

        let transit = self.config.transit();
        for placement in allocation.placements {
            resolved.insert(placement.item.id.clone());
            let predecessor = placement
                .predecessor
                .as_ref()
                .and_then(|id| self.predecessor(id, renderer));
            let input = DelayInput {
                scheduled_time: placement.item.scheduled_time,
                now,
                transit,
                width: renderer.measure(&placement.item),
                container: self.container,
                predecessor,
                min_gap: self.config.min_gap,
                late_grace: self.config.late_grace_ms,
                clamp_window: self.config.clamp_window_ms,
            };
            match compute_entry_delay(&input) {
                EntryDelay::Start(entry_delay) => {
                    let allocated = AllocatedItem {
                        item: placement.item,
                        lane: placement.lane,
                        entry_delay,
                        transit,
                    };
                    self.allocated.push(allocated.clone());
                    outcome.admitted.push(allocated);
                }
                EntryDelay::Discard => {
                    self.forget(placement.item.id.clone());
                    outcome.discarded.push(placement.item);
                }
            }
        }
        self.pending.retain(|item| !resolved.contains(&item.id));

        self.stats.admitted += outcome.admitted.len() as u64;
        self.stats.deserted += outcome.deserted.len() as u64;
        self.stats.discarded += outcome.discarded.len() as u64;

        tracing::debug!(
            target: "barrage.engine",
            admitted = outcome.admitted.len(),
            deserted = outcome.deserted.len(),
            discarded = outcome.discarded.len(),
            deferred = outcome.deferred.len(),
            "tick complete"
        );

        // Lanes free up as incumbents move, without any callback; retry.
        if !outcome.deferred.is_empty() {
            self.slot.request();
        }
        outcome
    }

    fn predecessor<G>(&self, id: &ItemId, renderer: &G) -> Option<Predecessor>
    where
        G: GeometryProvider + ?Sized,
    {
        let geometry = renderer.geometry(id)?;
        let transit = self
            .allocated
            .iter()
            .rev()
            .find(|a| &a.item.id == id)
            .map_or_else(|| self.config.transit(), |a| a.transit);
        Some(Predecessor { geometry, transit })
    }

    fn forget(&mut self, id: ItemId) {
        self.live.remove(&id);
        self.tombstones.insert(id);
    }
}

/// Lanes for `container`. An area with no width or no height has none.
fn lanes_for(config: &BarrageConfig, container: Bounds) -> usize {
    if container.is_empty() {
        0
    } else {
        config.lane_capacity(container.height)
    }
}
