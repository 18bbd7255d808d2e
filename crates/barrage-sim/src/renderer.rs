#![forbid(unsafe_code)]

//! Headless renderer.
//!
//! [`KinematicRenderer`] stands in for a real display surface. It places each
//! admitted item on the constant-speed [`Track`] shared with the delay
//! calculator: the item waits off-screen at the container's right edge until
//! `admitted_at + entry_delay`, then moves left until its right edge reaches
//! the container's left edge.
//!
//! Item width is `chars * char_width`; there is no font shaping.

use ahash::AHashMap;
use barrage_core::{AllocatedItem, Bounds, Geometry, GeometryProvider, Item, ItemId, Millis, Track};
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
struct Mounted {
    lane: usize,
    /// Time the item starts moving (may be in the past).
    start: Millis,
    /// Mount order, used to pair items within a lane.
    seq: u64,
    track: Track,
}

/// Two items in one lane whose extents intersect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlap {
    pub at: Millis,
    pub lane: usize,
    pub ahead: ItemId,
    pub behind: ItemId,
    /// How far the follower's leading edge is past the leader's trailing edge.
    pub depth: f64,
}

/// Position tolerance for overlap checks.
const OVERLAP_EPS: f64 = 1e-3;

#[derive(Debug)]
pub struct KinematicRenderer {
    container: Bounds,
    char_width: f64,
    now: Millis,
    next_seq: u64,
    mounted: AHashMap<ItemId, Mounted>,
}

impl KinematicRenderer {
    #[must_use]
    pub fn new(container: Bounds, char_width: f64) -> Self {
        Self {
            container,
            char_width,
            now: 0,
            next_seq: 0,
            mounted: AHashMap::new(),
        }
    }

    /// Advance the renderer's notion of time.
    pub fn set_now(&mut self, now: Millis) {
        self.now = now;
    }

    #[must_use]
    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn resize(&mut self, container: Bounds) {
        self.container = container;
    }

    /// Items currently mounted, including ones not yet moving.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    /// Start animating an item admitted at `admitted_at`.
    pub fn mount(&mut self, allocated: &AllocatedItem, admitted_at: Millis) {
        let width = self.measure(&allocated.item);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.mounted.insert(
            allocated.item.id.clone(),
            Mounted {
                lane: allocated.lane,
                start: admitted_at.saturating_add(allocated.entry_delay),
                seq,
                track: Track::new(width, allocated.transit),
            },
        );
    }

    /// Unmount every item that has finished crossing and return their ids.
    pub fn take_exited(&mut self) -> Vec<ItemId> {
        let left = self.container.left;
        let mut exited: Vec<(u64, ItemId)> = self
            .mounted
            .iter()
            .filter(|(_, m)| self.position(m).has_exited(left))
            .map(|(id, m)| (m.seq, id.clone()))
            .collect();
        exited.sort_unstable();
        exited
            .into_iter()
            .map(|(_, id)| {
                self.mounted.remove(&id);
                id
            })
            .collect()
    }

    /// Check each lane for intersecting neighbours.
    ///
    /// Only items that have started moving are compared; a waiting item sits
    /// on the entry edge and is not yet visible.
    #[must_use]
    pub fn overlaps(&self) -> Vec<Overlap> {
        let mut by_lane: AHashMap<usize, Vec<(&ItemId, &Mounted)>> = AHashMap::new();
        for (id, m) in &self.mounted {
            if m.start <= self.now {
                by_lane.entry(m.lane).or_default().push((id, m));
            }
        }

        let mut found = Vec::new();
        for (lane, mut items) in by_lane {
            items.sort_unstable_by_key(|(_, m)| m.seq);
            for pair in items.windows(2) {
                let (ahead_id, ahead) = pair[0];
                let (behind_id, behind) = pair[1];
                let trail = self.position(ahead).right();
                let lead = self.position(behind).left;
                if lead < trail - OVERLAP_EPS {
                    found.push(Overlap {
                        at: self.now,
                        lane,
                        ahead: ahead_id.clone(),
                        behind: behind_id.clone(),
                        depth: trail - lead,
                    });
                }
            }
        }
        found.sort_by_key(|o| o.lane);
        found
    }

    fn position(&self, m: &Mounted) -> Geometry {
        m.track
            .geometry_at((self.now - m.start) as f64, &self.container)
    }
}

impl GeometryProvider for KinematicRenderer {
    fn has_fully_entered(&self, id: &ItemId, container_right: f64) -> bool {
        self.mounted
            .get(id)
            .is_none_or(|m| self.position(m).has_entered(container_right))
    }

    fn geometry(&self, id: &ItemId) -> Option<Geometry> {
        self.mounted.get(id).map(|m| self.position(m))
    }

    fn measure(&self, item: &Item) -> f64 {
        item.content.chars().count() as f64 * self.char_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocated(id: &str, content: &str, lane: usize, entry_delay: Millis) -> AllocatedItem {
        AllocatedItem {
            item: Item::new(id, content, 0),
            lane,
            entry_delay,
            transit: 10_000,
        }
    }

    #[test]
    fn waits_then_moves_then_exits() {
        let mut r = KinematicRenderer::new(Bounds::from_size(900.0, 100.0), 10.0);
        // width 100, speed (100 + 900) / 10_000 = 0.1 px/ms
        r.mount(&allocated("a", "0123456789", 0, 1_000), 0);

        r.set_now(500);
        let g = r.geometry(&"a".into()).unwrap();
        assert_eq!(g.left, 900.0);
        assert!(!r.has_fully_entered(&"a".into(), 900.0));

        r.set_now(2_001);
        assert!(r.has_fully_entered(&"a".into(), 900.0));
        assert!(r.take_exited().is_empty());

        r.set_now(11_500);
        assert_eq!(r.take_exited(), vec![ItemId::from("a")]);
        assert!(r.is_empty());
    }

    #[test]
    fn unknown_items_never_block() {
        let r = KinematicRenderer::new(Bounds::from_size(900.0, 100.0), 10.0);
        assert!(r.has_fully_entered(&"ghost".into(), 900.0));
        assert!(r.geometry(&"ghost".into()).is_none());
    }

    #[test]
    fn detects_follower_running_into_leader() {
        let mut r = KinematicRenderer::new(Bounds::from_size(900.0, 100.0), 10.0);
        // Long, slow leader; short follower started right behind it.
        r.mount(
            &AllocatedItem {
                transit: 40_000,
                ..allocated("slow", &"x".repeat(60), 0, 0)
            },
            0,
        );
        r.mount(&allocated("fast", "y", 0, 8_000), 0);
        r.set_now(12_000);
        let overlaps = r.overlaps();
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].ahead.as_str(), "slow");
        assert_eq!(overlaps[0].behind.as_str(), "fast");
    }

    #[test]
    fn width_counts_chars_not_bytes() {
        let r = KinematicRenderer::new(Bounds::from_size(900.0, 100.0), 20.0);
        assert_eq!(r.measure(&Item::new("z", "弹幕", 0)), 40.0);
    }
}
