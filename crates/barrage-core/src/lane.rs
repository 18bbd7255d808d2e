#![forbid(unsafe_code)]

//! Lane occupancy.
//!
//! A [`LaneTable`] maps each lane to its incumbent: the most recently
//! allocated item in that lane. It is rebuilt from the allocated list at the
//! start of every tick and never carried across ticks, so it can't drift
//! from what is actually on screen.
//!
//! # Invariants
//!
//! 1. At most one incumbent per lane.
//! 2. Later allocations replace earlier ones as incumbent.
//! 3. Lanes at or beyond the current capacity are tracked but never offered
//!    as targets.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::AllocationStrategy;
use crate::geometry::GeometryProvider;
use crate::item::{AllocatedItem, ItemId};

/// Availability of a lane at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    /// No incumbent.
    Free,
    /// Incumbent has fully entered the area; a follower may be queued.
    Idle,
    /// Incumbent is still entering.
    Busy,
}

impl LaneState {
    /// Whether a new item may be placed in this lane.
    #[inline]
    #[must_use]
    pub const fn is_eligible(self) -> bool {
        matches!(self, Self::Free | Self::Idle)
    }
}

/// Per-lane incumbent ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneTable {
    incumbents: Vec<Option<ItemId>>,
}

impl LaneTable {
    /// Create a table with `lanes` empty lanes.
    #[must_use]
    pub fn with_lanes(lanes: usize) -> Self {
        Self {
            incumbents: vec![None; lanes],
        }
    }

    /// Rebuild occupancy from items in allocation order.
    ///
    /// The table covers at least `lanes` lanes, and more if an item sits in a
    /// lane beyond that (capacity shrank after it was placed).
    #[must_use]
    pub fn from_allocated(allocated: &[AllocatedItem], lanes: usize) -> Self {
        let width = allocated
            .iter()
            .map(|a| a.lane + 1)
            .max()
            .unwrap_or(0)
            .max(lanes);
        let mut table = Self::with_lanes(width);
        for a in allocated {
            table.incumbents[a.lane] = Some(a.item.id.clone());
        }
        table
    }

    /// Number of tracked lanes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.incumbents.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incumbents.is_empty()
    }

    /// Current incumbent of `lane`.
    #[must_use]
    pub fn incumbent(&self, lane: usize) -> Option<&ItemId> {
        self.incumbents.get(lane).and_then(Option::as_ref)
    }

    /// Make `id` the incumbent of `lane`, returning the one it replaces.
    pub fn occupy(&mut self, lane: usize, id: ItemId) -> Option<ItemId> {
        if lane >= self.incumbents.len() {
            self.incumbents.resize(lane + 1, None);
        }
        self.incumbents[lane].replace(id)
    }

    /// Classify `lane` using the renderer's view of its incumbent.
    pub fn state<G>(&self, lane: usize, geometry: &G, container_right: f64) -> LaneState
    where
        G: GeometryProvider + ?Sized,
    {
        match self.incumbent(lane) {
            None => LaneState::Free,
            Some(id) if geometry.has_fully_entered(id, container_right) => LaneState::Idle,
            Some(_) => LaneState::Busy,
        }
    }

    /// States of lanes `0..lane_count`.
    pub fn states<G>(&self, lane_count: usize, geometry: &G, container_right: f64) -> Vec<LaneState>
    where
        G: GeometryProvider + ?Sized,
    {
        (0..lane_count)
            .map(|lane| self.state(lane, geometry, container_right))
            .collect()
    }
}

/// Order in which eligible lanes are handed out.
///
/// Compact: every eligible lane by index. Sparse: free lanes in shuffled
/// order, then idle lanes by index.
pub fn eligible_lanes<R>(states: &[LaneState], strategy: AllocationStrategy, rng: &mut R) -> Vec<usize>
where
    R: Rng + ?Sized,
{
    match strategy {
        AllocationStrategy::Compact => states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_eligible())
            .map(|(lane, _)| lane)
            .collect(),
        AllocationStrategy::Sparse => {
            let mut free: Vec<usize> = lanes_in(states, LaneState::Free);
            free.shuffle(rng);
            free.extend(lanes_in(states, LaneState::Idle));
            free
        }
    }
}

fn lanes_in(states: &[LaneState], wanted: LaneState) -> Vec<usize> {
    states
        .iter()
        .enumerate()
        .filter(|(_, s)| **s == wanted)
        .map(|(lane, _)| lane)
        .collect()
}
