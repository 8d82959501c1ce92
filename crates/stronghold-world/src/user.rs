//! Registered players.

use serde::{Deserialize, Serialize};
use stronghold_types::{CityId, UserId};

/// A registered player.
///
/// The credential hash is opaque to the simulation. The city list is a
/// denormalized index kept in step with [`City::owner_id`] by
/// [`World::create_city`].
///
/// [`City::owner_id`]: crate::City::owner_id
/// [`World::create_city`]: crate::World::create_city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Salted credential hash produced by the API layer.
    pub password_hash: String,
    /// Cities owned by this user, in creation order.
    #[serde(default)]
    pub cities: Vec<CityId>,
}

impl User {
    /// Whether this user owns `city`.
    pub fn owns(&self, city: CityId) -> bool {
        self.cities.contains(&city)
    }
}
