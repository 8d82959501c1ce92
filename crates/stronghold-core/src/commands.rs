//! Player commands that mutate the world.
//!
//! Every command validates fully before touching anything: on error the
//! world is exactly as it was. Callers are expected to hold the world write
//! lock for the whole call.

use std::collections::BTreeMap;

use stronghold_types::{
    BuildingKind, BuildingUpgrade, CityId, Position, RecruitOrder, Resource, ResourceAmounts,
    TroopKind, UserId,
};
use stronghold_world::{City, World, WorldError};

use crate::balance::{BalanceCatalog, BalanceLookup};
use crate::config::StartingCityConfig;

/// Errors returned by player commands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The city has no building in this slot.
    #[error("city {city} has no {building}")]
    BuildingNotFound {
        /// The city.
        city: CityId,
        /// The missing building.
        building: BuildingKind,
    },

    /// The troop kind has no balance entry and cannot be recruited.
    #[error("troop kind {0} cannot be recruited")]
    UnknownTroop(TroopKind),

    /// The acting user does not own the city.
    #[error("user {user} does not own city {city}")]
    NotOwner {
        /// The acting user.
        user: UserId,
        /// The city.
        city: CityId,
    },

    /// A recruitment quantity of zero.
    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    /// The city cannot pay the cost. Nothing was deducted.
    #[error("insufficient {resource}: need {required}, have {available}")]
    InsufficientResources {
        /// First resource found short.
        resource: Resource,
        /// Amount required.
        required: u64,
        /// Amount in stock.
        available: u64,
    },

    /// No configuration exists for the next level.
    #[error("{building} cannot be upgraded past level {level}")]
    MaxLevelReached {
        /// The building.
        building: BuildingKind,
        /// Highest level reachable, counting queued upgrades.
        level: u32,
    },

    /// The total cost of an order does not fit in a `u64`.
    #[error("order cost overflows")]
    CostOverflow,

    /// A domain-model operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}

impl CommandError {
    /// Whether this error means the addressed entity does not exist.
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::BuildingNotFound { .. } | Self::UnknownTroop(_) => true,
            Self::World { source } => source.is_not_found(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Everything a new player's first city is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartingCity {
    /// City name.
    pub name: String,
    /// Map position.
    pub position: Position,
    /// Opening stocks.
    pub resources: ResourceAmounts,
    /// Level of every building kind.
    pub building_levels: BTreeMap<BuildingKind, u32>,
}

impl StartingCity {
    /// Combine the configured starting city with the catalog's initial
    /// building levels. Per-kind overrides in the config win.
    pub fn from_config(config: &StartingCityConfig, catalog: &BalanceCatalog) -> Self {
        let mut building_levels = catalog.initial_levels();
        building_levels.extend(config.building_levels.iter().map(|(k, v)| (*k, *v)));
        Self {
            name: config.name.clone(),
            position: config.position,
            resources: config.resources,
            building_levels,
        }
    }
}

/// Identifiers created by [`register_player`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// The new user.
    pub user_id: UserId,
    /// The new user's starting city.
    pub city_id: CityId,
}

/// Create a user and their starting city.
///
/// # Errors
///
/// Returns [`CommandError::World`] wrapping [`WorldError::AlreadyExists`] if
/// the username is taken, or [`WorldError::IdExhausted`] if either counter
/// is spent. Both are checked before anything is created.
pub fn register_player(
    world: &mut World,
    username: &str,
    password_hash: String,
    start: &StartingCity,
) -> Result<Registration, CommandError> {
    if world.user(username).is_ok() {
        return Err(WorldError::AlreadyExists(username.to_owned()).into());
    }
    if world.next_city_id().next().is_none() {
        return Err(WorldError::IdExhausted("city").into());
    }

    let user_id = world.create_user(username, password_hash)?.id;
    let city_id = world.create_city(
        user_id,
        &start.name,
        start.position,
        start.resources,
        &start.building_levels,
    )?;

    tracing::info!(%user_id, %city_id, username, "player registered");
    Ok(Registration { user_id, city_id })
}

// ---------------------------------------------------------------------------
// Upgrades
// ---------------------------------------------------------------------------

fn owned_city_mut(
    world: &mut World,
    user: UserId,
    city: CityId,
) -> Result<&mut City, CommandError> {
    let found = world.city_mut(city)?;
    if found.owner_id != user {
        return Err(CommandError::NotOwner { user, city });
    }
    Ok(found)
}

fn pay(city: &mut City, cost: &ResourceAmounts) -> Result<(), CommandError> {
    if let Some((resource, required, available)) = city.resources.first_shortfall(cost) {
        return Err(CommandError::InsufficientResources {
            resource,
            required,
            available,
        });
    }
    let remaining = city
        .resources
        .checked_sub(cost)
        .ok_or(CommandError::CostOverflow)?;
    city.resources = remaining;
    Ok(())
}

/// Queue an upgrade of `building` in `city_id`, paying its cost up front.
///
/// The target level accounts for upgrades of the same building already in
/// the queue, so repeated requests target successive levels.
///
/// # Errors
///
/// Returns [`CommandError::World`] for a missing city,
/// [`CommandError::NotOwner`], [`CommandError::BuildingNotFound`],
/// [`CommandError::MaxLevelReached`] or
/// [`CommandError::InsufficientResources`]. On error nothing changes.
pub fn upgrade_building<B>(
    world: &mut World,
    user: UserId,
    city_id: CityId,
    building: BuildingKind,
    balance: &B,
) -> Result<BuildingUpgrade, CommandError>
where
    B: BalanceLookup + ?Sized,
{
    let city = owned_city_mut(world, user, city_id)?;
    let target_level = city
        .next_upgrade_level(building)
        .ok_or(CommandError::BuildingNotFound {
            city: city_id,
            building,
        })?;
    let level = balance
        .building_level(building, target_level)
        .ok_or(CommandError::MaxLevelReached {
            building,
            level: target_level.saturating_sub(1),
        })?;

    pay(city, &level.upgrade_cost)?;

    let entry = BuildingUpgrade {
        building_type: building,
        target_level,
        remaining_time: seconds(level.upgrade_time_seconds),
    };
    city.enqueue_building_upgrade(entry);

    tracing::info!(
        city_id = %city_id,
        building = %building,
        target_level,
        seconds = level.upgrade_time_seconds,
        "building upgrade queued"
    );
    Ok(entry)
}

// ---------------------------------------------------------------------------
// Recruitment
// ---------------------------------------------------------------------------

/// Queue `quantity` units of `troop` in `city_id`, paying the full cost up
/// front.
///
/// # Errors
///
/// Returns [`CommandError::InvalidQuantity`], [`CommandError::UnknownTroop`],
/// [`CommandError::World`] for a missing city, [`CommandError::NotOwner`],
/// [`CommandError::CostOverflow`] or
/// [`CommandError::InsufficientResources`]. On error nothing changes.
pub fn recruit_troops<B>(
    world: &mut World,
    user: UserId,
    city_id: CityId,
    troop: TroopKind,
    quantity: u64,
    balance: &B,
) -> Result<RecruitOrder, CommandError>
where
    B: BalanceLookup + ?Sized,
{
    if quantity == 0 {
        return Err(CommandError::InvalidQuantity);
    }
    let spec = balance
        .troop(troop)
        .ok_or(CommandError::UnknownTroop(troop))?;
    let cost = spec
        .recruit_cost
        .as_amounts()
        .checked_mul(quantity)
        .ok_or(CommandError::CostOverflow)?;

    let city = owned_city_mut(world, user, city_id)?;
    pay(city, &cost)?;

    let order = RecruitOrder::new(troop, quantity, seconds(spec.recruit_time_seconds));
    city.enqueue_recruitment(order);

    tracing::info!(
        city_id = %city_id,
        troop = %troop,
        quantity,
        seconds_per_unit = spec.recruit_time_seconds,
        "recruitment queued"
    );
    Ok(order)
}

#[allow(clippy::cast_precision_loss)]
const fn seconds(value: u64) -> f64 {
    value as f64
}
