//! The world root: id counters, the user registry and the city registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stronghold_types::{BuildingKind, CityId, Position, ResourceAmounts, UserId};

use crate::city::City;
use crate::error::WorldError;
use crate::user::User;

/// Root aggregate of the simulation.
///
/// Users are keyed by username and cities by id. Both counters start at 1
/// and are always strictly greater than every identifier already issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Identifier the next registered user receives.
    pub(crate) next_user_id: UserId,
    /// Identifier the next created city receives.
    pub(crate) next_city_id: CityId,
    /// Users keyed by username.
    #[serde(default)]
    pub(crate) users: BTreeMap<String, User>,
    /// Cities keyed by id.
    #[serde(default)]
    pub(crate) cities: BTreeMap<CityId, City>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// An empty world with both counters at 1.
    pub const fn new() -> Self {
        Self {
            next_user_id: UserId::new(1),
            next_city_id: CityId::new(1),
            users: BTreeMap::new(),
            cities: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::AlreadyExists`] if the username is taken, or
    /// [`WorldError::IdExhausted`] if the user counter cannot advance.
    pub fn create_user(
        &mut self,
        username: &str,
        password_hash: String,
    ) -> Result<&User, WorldError> {
        if self.users.contains_key(username) {
            return Err(WorldError::AlreadyExists(username.to_owned()));
        }
        let id = self.next_user_id;
        self.next_user_id = id.next().ok_or(WorldError::IdExhausted("user"))?;

        tracing::debug!(user_id = %id, username, "user created");
        let user = self
            .users
            .entry(username.to_owned())
            .or_insert_with(|| User {
                id,
                username: username.to_owned(),
                password_hash,
                cities: Vec::new(),
            });
        Ok(user)
    }

    /// Look up a user by username.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UserNotFound`] if no such user exists.
    pub fn user(&self, username: &str) -> Result<&User, WorldError> {
        self.users
            .get(username)
            .ok_or_else(|| WorldError::UserNotFound(username.to_owned()))
    }

    /// Look up a user by identifier. Scans every user.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UserIdNotFound`] if no such user exists.
    pub fn user_by_id(&self, id: UserId) -> Result<&User, WorldError> {
        self.users
            .values()
            .find(|user| user.id == id)
            .ok_or(WorldError::UserIdNotFound(id))
    }

    /// Number of registered users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // -------------------------------------------------------------------
    // Cities
    // -------------------------------------------------------------------

    /// Create a city for `owner_id` and register it in the owner's list.
    ///
    /// Every building slot is filled, taking levels from `building_levels`
    /// (kinds not listed start at 0).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OwnerNotFound`] if the owner does not exist.
    /// In that case nothing is created and no city id is consumed.
    pub fn create_city(
        &mut self,
        owner_id: UserId,
        name: &str,
        position: Position,
        resources: ResourceAmounts,
        building_levels: &BTreeMap<BuildingKind, u32>,
    ) -> Result<CityId, WorldError> {
        let owner = self
            .users
            .values_mut()
            .find(|user| user.id == owner_id)
            .ok_or(WorldError::OwnerNotFound(owner_id))?;

        let id = self.next_city_id;
        let next = id.next().ok_or(WorldError::IdExhausted("city"))?;

        owner.cities.push(id);
        self.next_city_id = next;
        self.cities.insert(
            id,
            City::new(
                id,
                owner_id,
                name.to_owned(),
                position,
                resources,
                building_levels,
            ),
        );

        tracing::debug!(city_id = %id, owner_id = %owner_id, name, "city created");
        Ok(id)
    }

    /// Look up a city.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CityNotFound`] if no such city exists.
    pub fn city(&self, id: CityId) -> Result<&City, WorldError> {
        self.cities.get(&id).ok_or(WorldError::CityNotFound(id))
    }

    /// Look up a city for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CityNotFound`] if no such city exists.
    pub fn city_mut(&mut self, id: CityId) -> Result<&mut City, WorldError> {
        self.cities.get_mut(&id).ok_or(WorldError::CityNotFound(id))
    }

    /// All cities owned by `owner_id`. Scans every city.
    pub fn list_cities_by_owner(&self, owner_id: UserId) -> Vec<&City> {
        self.cities
            .values()
            .filter(|city| city.owner_id == owner_id)
            .collect()
    }

    /// Iterate over all cities in id order.
    pub fn cities(&self) -> impl Iterator<Item = &City> {
        self.cities.values()
    }

    /// Iterate over all cities mutably in id order.
    pub fn cities_mut(&mut self) -> impl Iterator<Item = &mut City> {
        self.cities.values_mut()
    }

    /// Number of cities.
    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    /// Identifier the next registered user will receive.
    pub const fn next_user_id(&self) -> UserId {
        self.next_user_id
    }

    /// Identifier the next created city will receive.
    pub const fn next_city_id(&self) -> CityId {
        self.next_city_id
    }
}
