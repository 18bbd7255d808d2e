#![forbid(unsafe_code)]

//! Single-slot tick scheduling.
//!
//! The engine runs at most one allocation pass per frame. Anything that may
//! change the outcome (new items, exits, resizes) arms the [`TickSlot`]; the
//! host drains it once per frame. Arming an already armed slot supersedes
//! the earlier request instead of queueing a second tick: only the latest
//! state matters.

/// A pending-tick flag with bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSlot {
    armed: bool,
    requests: u64,
    superseded: u64,
}

impl TickSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            armed: false,
            requests: 0,
            superseded: 0,
        }
    }

    /// Arm the slot. Returns `false` if a tick was already pending, in which
    /// case this request merges into it.
    pub fn request(&mut self) -> bool {
        self.requests += 1;
        if self.armed {
            self.superseded += 1;
            false
        } else {
            self.armed = true;
            true
        }
    }

    /// Disarm and report whether a tick should run now.
    pub fn take(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }

    #[inline]
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.armed
    }

    /// Total requests seen.
    #[must_use]
    pub const fn requests(&self) -> u64 {
        self.requests
    }

    /// Requests merged into an already pending tick.
    #[must_use]
    pub const fn superseded(&self) -> u64 {
        self.superseded
    }
}
