#![forbid(unsafe_code)]

//! Entry-delay calculation.
//!
//! Once an item has a lane, [`compute_entry_delay`] fixes when it starts
//! moving, relative to `now`, so that it never runs into the item ahead of
//! it in that lane. The calculation is greedy and forward-only: only the
//! immediate predecessor is considered. A fully entered predecessor only
//! pulls further ahead of the entry edge, so older occupants cannot be hit.
//!
//! # Algorithm
//!
//! 1. Start from `scheduled_time - now`.
//! 2. If that is at or beyond `-(transit - late_grace)` the item would be
//!    gone almost immediately: discard it.
//! 3. With a predecessor, treat its trailing edge extended by `min_gap` as
//!    occupied. Find when that region clears the area's far edge and when
//!    this item's leading edge would reach the far edge; delay by the
//!    shortfall.
//! 4. If still negative (the item starts partway across), check the
//!    predecessor's occupied region against this item's start position at
//!    `now` and delay by the overlap divided by this item's speed.
//! 5. Negative delays inside the clamp window become zero.
//!
//! Both corrections only ever delay further.
//!
//! The gap is a distance kept behind the predecessor's trailing edge, not
//! extra travel distance added to the follower's crossing time.
//!
//! # Failure Modes
//!
//! Degenerate geometry (a zero-width area, or a zero-width item in one)
//! gives a speed of zero and no finite start time. Such items are discarded
//! rather than parked in a lane forever.

use crate::geometry::{Bounds, Geometry, Track};
use crate::item::Millis;

/// The lane's previous incumbent, as the renderer currently sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Predecessor {
    pub geometry: Geometry,
    /// The predecessor's own transit duration.
    pub transit: Millis,
}

/// Inputs for one delay decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayInput {
    pub scheduled_time: Millis,
    pub now: Millis,
    pub transit: Millis,
    /// Measured width of the item being placed.
    pub width: f64,
    pub container: Bounds,
    pub predecessor: Option<Predecessor>,
    pub min_gap: f64,
    pub late_grace: Millis,
    pub clamp_window: Millis,
}

/// Outcome of the delay calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDelay {
    /// Start crossing after this many ms (negative: already partway).
    Start(Millis),
    /// Too late to show; remove instead of animating.
    Discard,
}

impl EntryDelay {
    /// The start offset, if the item is to be shown.
    #[inline]
    #[must_use]
    pub const fn start(self) -> Option<Millis> {
        match self {
            Self::Start(delay) => Some(delay),
            Self::Discard => None,
        }
    }
}

/// Compute the entry delay for a freshly placed item.
#[must_use]
pub fn compute_entry_delay(input: &DelayInput) -> EntryDelay {
    let base = input.scheduled_time.saturating_sub(input.now);
    if base <= input.late_grace.saturating_sub(input.transit) {
        tracing::debug!(
            target: "barrage.delay",
            base,
            transit = input.transit,
            "item too late, discarding"
        );
        return EntryDelay::Discard;
    }

    let container = &input.container;
    let own_speed = Track::new(input.width, input.transit).speed(container);
    if !is_usable_speed(own_speed) {
        return degenerate(own_speed);
    }
    let mut delay = base as f64;

    if let Some(pred) = input.predecessor {
        let pred_speed = Track::new(pred.geometry.width, pred.transit).speed(container);
        if !is_usable_speed(pred_speed) {
            return degenerate(pred_speed);
        }
        let tail = pred.geometry.right() + input.min_gap;

        let clear_at = (tail - container.left).max(0.0) / pred_speed;
        let arrive_at = delay + container.width / own_speed;
        if arrive_at < clear_at {
            tracing::debug!(
                target: "barrage.delay",
                shortfall = clear_at - arrive_at,
                "delaying to clear predecessor at far edge"
            );
            delay += clear_at - arrive_at;
        }

        if delay < 0.0 {
            let start_left = container.right() - (-delay) * own_speed;
            let overlap = tail - start_left;
            if overlap > 0.0 {
                tracing::debug!(
                    target: "barrage.delay",
                    overlap,
                    "delaying to clear predecessor at start"
                );
                delay += overlap / own_speed;
            }
        }
    }

    if delay < 0.0 && delay > -(input.clamp_window as f64) {
        delay = 0.0;
    }

    if !delay.is_finite() {
        return degenerate(own_speed);
    }
    EntryDelay::Start(delay.ceil() as Millis)
}

fn is_usable_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}

fn degenerate(speed: f64) -> EntryDelay {
    tracing::debug!(
        target: "barrage.delay",
        speed,
        "no finite start time, discarding"
    );
    EntryDelay::Discard
}
