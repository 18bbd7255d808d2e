#![forbid(unsafe_code)]

//! Geometric primitives and the renderer query seam.
//!
//! Items travel right-to-left. An item of width `w` starts with its left
//! edge on the container's right edge and finishes when its right edge
//! reaches the container's left edge, at a constant speed of
//! `(w + container.width) / transit`. [`Track`] captures that motion; the
//! delay calculator and any renderer must agree on it.

use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemId, Millis};

/// The display area.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Create new bounds.
    #[inline]
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Bounds anchored at the origin.
    #[inline]
    #[must_use]
    pub const fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Right edge. Items enter across it.
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Check if the area has no usable extent.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Horizontal extent of a rendered item.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    /// Left (leading) edge.
    pub left: f64,
    pub width: f64,
}

impl Geometry {
    #[inline]
    #[must_use]
    pub const fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// Right (trailing) edge.
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Whether the trailing edge is inside the area's entry edge.
    #[inline]
    #[must_use]
    pub fn has_entered(&self, container_right: f64) -> bool {
        self.right() < container_right
    }

    /// Whether the item has left the area on the far side.
    #[inline]
    #[must_use]
    pub fn has_exited(&self, container_left: f64) -> bool {
        self.right() <= container_left
    }
}

/// Constant-speed motion of one item across a container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub width: f64,
    pub transit: Millis,
}

impl Track {
    #[inline]
    #[must_use]
    pub const fn new(width: f64, transit: Millis) -> Self {
        Self { width, transit }
    }

    /// Distance per millisecond. Zero transit is clamped to 1ms.
    #[inline]
    #[must_use]
    pub fn speed(&self, container: &Bounds) -> f64 {
        (self.width.max(0.0) + container.width.max(0.0)) / self.transit.max(1) as f64
    }

    /// Position after `elapsed` ms of motion (negative elapsed = not started).
    #[must_use]
    pub fn geometry_at(&self, elapsed: f64, container: &Bounds) -> Geometry {
        let travelled = elapsed.max(0.0) * self.speed(container);
        Geometry::new(container.right() - travelled, self.width)
    }
}

/// What the engine may ask of the renderer.
///
/// The engine never mutates rendered state. Items the renderer does not know
/// about (never mounted, or already gone) should report `true` from
/// [`has_fully_entered`](Self::has_fully_entered) and `None` from
/// [`geometry`](Self::geometry), so that they never block a lane.
pub trait GeometryProvider {
    /// Whether the item's trailing edge is past `container_right`.
    fn has_fully_entered(&self, id: &ItemId, container_right: f64) -> bool;

    /// Current bounding extent of the item, if it is rendered.
    fn geometry(&self, id: &ItemId) -> Option<Geometry>;

    /// Width the item will occupy once rendered.
    fn measure(&self, item: &Item) -> f64;
}

impl<G: GeometryProvider + ?Sized> GeometryProvider for &G {
    fn has_fully_entered(&self, id: &ItemId, container_right: f64) -> bool {
        (**self).has_fully_entered(id, container_right)
    }

    fn geometry(&self, id: &ItemId) -> Option<Geometry> {
        (**self).geometry(id)
    }

    fn measure(&self, item: &Item) -> f64 {
        (**self).measure(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_edges() {
        let b = Bounds::new(10.0, 5.0, 100.0, 40.0);
        assert_eq!(b.right(), 110.0);
        assert_eq!(b.bottom(), 45.0);
        assert!(!b.is_empty());
        assert!(Bounds::from_size(0.0, 40.0).is_empty());
    }

    #[test]
    fn entered_is_strict() {
        let g = Geometry::new(60.0, 40.0);
        assert!(!g.has_entered(100.0));
        assert!(g.has_entered(100.5));
    }

    #[test]
    fn track_starts_at_right_edge_and_exits_on_time() {
        let container = Bounds::from_size(1000.0, 200.0);
        let track = Track::new(200.0, 12_000);
        let start = track.geometry_at(0.0, &container);
        assert_eq!(start.left, 1000.0);
        let end = track.geometry_at(12_000.0, &container);
        assert!((end.right() - container.left).abs() < 1e-9);
        assert!(end.has_exited(container.left));
    }

    #[test]
    fn track_waits_before_start() {
        let container = Bounds::from_size(500.0, 100.0);
        let track = Track::new(50.0, 10_000);
        assert_eq!(track.geometry_at(-300.0, &container).left, 500.0);
    }

    #[test]
    fn zero_transit_is_clamped() {
        let container = Bounds::from_size(100.0, 10.0);
        let track = Track::new(10.0, 0);
        assert_eq!(track.speed(&container), 110.0);
    }
}
