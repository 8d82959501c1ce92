//! Shared type definitions for the Stronghold city simulation.
//!
//! This crate is the single source of truth for the identifiers, closed
//! enumerations and plain records used across the Stronghold workspace.
//! Types defined here flow downstream to `TypeScript` via `ts-rs` for the
//! browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe counter wrappers for users and cities
//! - [`enums`] -- Building kinds, troop kinds and resources
//! - [`structs`] -- Buildings, troop stacks, queue entries and resource bundles

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BuildingKind, Resource, TroopKind, UnknownKind};
pub use ids::{CityId, UserId};
pub use structs::{
    Accumulators, Building, BuildingUpgrade, Position, RecruitOrder, ResourceAmounts, TroopStack,
};
