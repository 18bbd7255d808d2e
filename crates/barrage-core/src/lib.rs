#![forbid(unsafe_code)]

//! Core: lane allocation and collision timing for barrage text.
//!
//! # Role in the workspace
//! `barrage-core` holds the two pure pieces of the system: the lane
//! allocator and the entry-delay calculator. They take plain data plus a
//! [`GeometryProvider`] that answers questions about what is on screen, and
//! never touch rendering themselves.
//!
//! # Primary responsibilities
//! - **allocate**: place new items in free or idle lanes, rank them under
//!   contention, desert the ones that are too late.
//! - **compute_entry_delay**: pick a start offset that keeps an item behind
//!   the previous occupant of its lane.
//! - **BarrageConfig**: speed presets, lane sizing, strategy and windows.
//!
//! # How it fits in the system
//! `barrage-runtime` owns the mutable engine state and calls into this crate
//! once per tick. `barrage-sim` supplies a headless renderer.

pub mod allocate;
pub mod config;
pub mod delay;
pub mod geometry;
pub mod item;
pub mod lane;

pub use allocate::{Allocation, AllocationRequest, Placement, allocate};
pub use config::{AllocationStrategy, BarrageConfig, ConfigError, Speed, Timebase};
pub use delay::{DelayInput, EntryDelay, Predecessor, compute_entry_delay};
pub use geometry::{Bounds, Geometry, GeometryProvider, Track};
pub use item::{AllocatedItem, Item, ItemId, Millis};
pub use lane::{LaneState, LaneTable, eligible_lanes};
