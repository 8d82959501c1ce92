//! HTTP game API for the Stronghold city simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Account endpoints** (`/api/register`, `/api/login`, `/api/logout`)
//!   with bcrypt password hashes and cookie sessions
//! - **City queries** for resources, troops, buildings and both queues
//! - **Commands** to queue building upgrades and troop recruitment
//!
//! # Architecture
//!
//! Handlers share the simulation's single world lock through
//! [`AppState`]. Queries take the read guard, commands take the write
//! guard for the whole validation and mutation. Every city endpoint
//! requires a session whose user owns the city.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
