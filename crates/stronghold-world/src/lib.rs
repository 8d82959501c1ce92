//! Users, cities, buildings and queues for the Stronghold city simulation.
//!
//! This crate is the in-memory domain model: a [`World`] root holding
//! [`User`]s keyed by username and [`City`]s keyed by id. It is pure data
//! plus invariants. Time, balance numbers and persistence live in
//! `stronghold-core` and `stronghold-store`.
//!
//! # Modules
//!
//! - [`city`] -- The city aggregate and its seven building slots.
//! - [`error`] -- Error types for creation and lookup.
//! - [`user`] -- Registered players.
//! - [`validate`] -- Structural invariant checks run after a restore.
//! - [`world`] -- The root aggregate with id counters and registries.

pub mod city;
pub mod error;
pub mod user;
pub mod validate;
pub mod world;

// Re-export primary types at crate root.
pub use city::{BuildingSlots, City};
pub use error::WorldError;
pub use user::User;
pub use validate::Violation;
pub use world::World;
