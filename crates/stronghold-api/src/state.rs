//! Shared application state for the game API.
//!
//! [`AppState`] carries the world lock shared with the simulation
//! schedules, the read-only balance catalog, the session table and the
//! template for new players' first city.

use std::sync::Arc;
use std::time::Duration;

use stronghold_core::balance::BalanceCatalog;
use stronghold_core::commands::StartingCity;
use stronghold_core::coordinator::SharedWorld;

use crate::auth::SessionStore;

/// State shared by every request handler.
#[derive(Debug)]
pub struct AppState {
    /// The simulated world.
    pub world: SharedWorld,
    /// Game balance numbers.
    pub balance: Arc<BalanceCatalog>,
    /// Logged-in sessions.
    pub sessions: SessionStore,
    /// What a newly registered player starts with.
    pub starting_city: StartingCity,
    /// bcrypt work factor for new password hashes.
    pub password_cost: u32,
}

impl AppState {
    /// Create the state. Sessions expire `session_ttl` after login and
    /// passwords are hashed at `password_cost`.
    pub fn new(
        world: SharedWorld,
        balance: Arc<BalanceCatalog>,
        starting_city: StartingCity,
        session_ttl: Duration,
        password_cost: u32,
    ) -> Self {
        Self {
            world,
            balance,
            sessions: SessionStore::new(session_ttl),
            starting_city,
            password_cost,
        }
    }
}
