#![forbid(unsafe_code)]

//! Barrage items and their lane assignments.
//!
//! An [`Item`] is what the transport delivers: an id, an opaque text payload
//! and the instant it is due. Once the allocator places it in a lane and the
//! delay calculator fixes its start offset it becomes an [`AllocatedItem`],
//! which stays unchanged until the renderer reports its exit.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Signed milliseconds on the shared time base.
pub type Millis = i64;

/// Stable, unique item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create an id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single timed text unit.
///
/// `content` is carried through untouched; only the renderer looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub content: String,
    /// When the item is nominally due to appear.
    pub scheduled_time: Millis,
}

impl Item {
    /// Create an item.
    #[must_use]
    pub fn new(id: impl Into<ItemId>, content: impl Into<String>, scheduled_time: Millis) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            scheduled_time,
        }
    }

    /// Distance from `now` to the scheduled time, ignoring direction.
    ///
    /// Used to rank candidates when lanes are scarce.
    #[inline]
    #[must_use]
    pub fn recency(&self, now: Millis) -> u64 {
        self.scheduled_time.abs_diff(now)
    }

    /// How long ago the item was due (negative when it is still upcoming).
    #[inline]
    #[must_use]
    pub fn staleness(&self, now: Millis) -> Millis {
        now.saturating_sub(self.scheduled_time)
    }

    /// Whether the item is already too late to be worth showing.
    ///
    /// True when `now - scheduled_time >= transit - late_grace`.
    #[inline]
    #[must_use]
    pub fn is_stale(&self, now: Millis, transit: Millis, late_grace: Millis) -> bool {
        self.staleness(now) >= transit.saturating_sub(late_grace)
    }
}

/// An item placed in a lane with its entry delay fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedItem {
    #[serde(flatten)]
    pub item: Item,
    /// Lane index at allocation time.
    pub lane: usize,
    /// Offset from allocation time at which the crossing starts.
    /// Negative means the item starts partway across.
    pub entry_delay: Millis,
    /// Transit duration the item was allocated with.
    pub transit: Millis,
}

impl AllocatedItem {
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.item.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recency_is_symmetric() {
        let early = Item::new("a", "x", 1_000);
        let late = Item::new("b", "x", 3_000);
        assert_eq!(early.recency(2_000), 1_000);
        assert_eq!(late.recency(2_000), 1_000);
    }

    #[test]
    fn stale_threshold_is_inclusive() {
        // 12s transit, 3s grace: stale from 9s late onwards.
        let item = Item::new("a", "x", 0);
        assert!(!item.is_stale(8_999, 12_000, 3_000));
        assert!(item.is_stale(9_000, 12_000, 3_000));
        assert!(item.is_stale(10_000, 12_000, 3_000));
    }

    #[test]
    fn upcoming_item_is_never_stale() {
        let item = Item::new("a", "x", 5_000);
        assert_eq!(item.staleness(0), -5_000);
        assert!(!item.is_stale(0, 12_000, 3_000));
    }

    #[test]
    fn item_serializes_with_camel_case_fields() {
        let item = Item::new("42", "hello", 1_700_000_000_000);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "42");
        assert_eq!(json["scheduledTime"], 1_700_000_000_000_i64);
    }

    #[test]
    fn allocated_item_flattens_item_fields() {
        let allocated = AllocatedItem {
            item: Item::new("7", "hi", 10),
            lane: 2,
            entry_delay: -120,
            transit: 12_000,
        };
        let json = serde_json::to_value(&allocated).unwrap();
        assert_eq!(json["id"], "7");
        assert_eq!(json["lane"], 2);
        assert_eq!(json["entryDelay"], -120);
        let back: AllocatedItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, allocated);
    }
}
