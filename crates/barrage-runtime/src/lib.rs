#![forbid(unsafe_code)]

//! Runtime: the stateful barrage engine.
//!
//! # Role in the workspace
//! `barrage-runtime` wraps the pure allocator and delay calculator from
//! `barrage-core` in an [`Engine`] that owns pending and on-screen items,
//! lane capacity, duplicate suppression and tick scheduling.
//!
//! # Primary responsibilities
//! - **Engine**: accept items, run allocation ticks, react to exits and
//!   resizes.
//! - **TickSlot**: coalesce tick requests to at most one per frame.
//! - **Tombstones**: bounded memory of removed ids.
//! - **Clock**: wall-clock and manual time sources.
//!
//! # How it fits in the system
//! A host (UI layer, simulator) forwards transport items to
//! [`Engine::offer`], renderer exits to [`Engine::on_exit`], and once per
//! frame calls [`Engine::run_pending`] with something that implements
//! [`GeometryProvider`](barrage_core::GeometryProvider).

pub mod clock;
pub mod engine;
pub mod tick;
pub mod tombstone;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Engine, EngineStats, TickOutcome};
pub use tick::TickSlot;
pub use tombstone::Tombstones;
