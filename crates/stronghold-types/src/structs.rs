//! Plain data records stored inside a city.
//!
//! These carry no behaviour beyond small accessors. The city aggregate in
//! `stronghold-world` owns them and enforces the invariants.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BuildingKind, Resource, TroopKind};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Integer map position of a city.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Position {
    /// Create a position from coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// ResourceAmounts
// ---------------------------------------------------------------------------

/// A bundle of the five resources. Used for city stocks and for costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceAmounts {
    /// Wood.
    #[serde(default)]
    pub wood: u64,
    /// Stone.
    #[serde(default)]
    pub stone: u64,
    /// Iron.
    #[serde(default)]
    pub iron: u64,
    /// Food.
    #[serde(default)]
    pub food: u64,
    /// Gold.
    #[serde(default)]
    pub gold: u64,
}

impl ResourceAmounts {
    /// A bundle with every resource at zero.
    pub const ZERO: Self = Self {
        wood: 0,
        stone: 0,
        iron: 0,
        food: 0,
        gold: 0,
    };

    /// Amount of a single resource.
    pub const fn get(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Stone => self.stone,
            Resource::Iron => self.iron,
            Resource::Food => self.food,
            Resource::Gold => self.gold,
        }
    }

    /// Mutable access to a single resource.
    pub const fn get_mut(&mut self, resource: Resource) -> &mut u64 {
        match resource {
            Resource::Wood => &mut self.wood,
            Resource::Stone => &mut self.stone,
            Resource::Iron => &mut self.iron,
            Resource::Food => &mut self.food,
            Resource::Gold => &mut self.gold,
        }
    }

    /// The first resource (in [`Resource::ALL`] order) where `self` falls
    /// short of `cost`, as `(resource, required, available)`.
    pub fn first_shortfall(&self, cost: &Self) -> Option<(Resource, u64, u64)> {
        Resource::ALL
            .into_iter()
            .find(|r| self.get(*r) < cost.get(*r))
            .map(|r| (r, cost.get(r), self.get(r)))
    }

    /// Subtract `cost` from every resource. Returns `None` if any resource
    /// would go negative.
    pub fn checked_sub(&self, cost: &Self) -> Option<Self> {
        Some(Self {
            wood: self.wood.checked_sub(cost.wood)?,
            stone: self.stone.checked_sub(cost.stone)?,
            iron: self.iron.checked_sub(cost.iron)?,
            food: self.food.checked_sub(cost.food)?,
            gold: self.gold.checked_sub(cost.gold)?,
        })
    }

    /// Multiply every resource by `factor`. Returns `None` on overflow.
    pub fn checked_mul(&self, factor: u64) -> Option<Self> {
        Some(Self {
            wood: self.wood.checked_mul(factor)?,
            stone: self.stone.checked_mul(factor)?,
            iron: self.iron.checked_mul(factor)?,
            food: self.food.checked_mul(factor)?,
            gold: self.gold.checked_mul(factor)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

/// Fractional production carried between ticks, one per produced resource.
///
/// Each value stays in `[0, 1)` after a tick: whole units are moved into
/// the stock and only the remainder is kept. Serialized as `wood_acc`,
/// `stone_acc` and so on so the fields sit flat beside the stocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Accumulators {
    /// Pending fractional wood.
    #[serde(default, rename = "wood_acc")]
    pub wood: f64,
    /// Pending fractional stone.
    #[serde(default, rename = "stone_acc")]
    pub stone: f64,
    /// Pending fractional iron.
    #[serde(default, rename = "iron_acc")]
    pub iron: f64,
    /// Pending fractional food.
    #[serde(default, rename = "food_acc")]
    pub food: f64,
}

impl Accumulators {
    /// Current accumulator for `resource`. Gold has none and reads as zero.
    pub const fn get(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Stone => self.stone,
            Resource::Iron => self.iron,
            Resource::Food => self.food,
            Resource::Gold => 0.0,
        }
    }

    /// Mutable accumulator for `resource`, or `None` for gold.
    pub const fn get_mut(&mut self, resource: Resource) -> Option<&mut f64> {
        match resource {
            Resource::Wood => Some(&mut self.wood),
            Resource::Stone => Some(&mut self.stone),
            Resource::Iron => Some(&mut self.iron),
            Resource::Food => Some(&mut self.food),
            Resource::Gold => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Building / TroopStack
// ---------------------------------------------------------------------------

/// A building inside a city. Identified by its kind within the city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Building {
    /// Which slot this building occupies.
    #[serde(rename = "type")]
    pub kind: BuildingKind,
    /// Current level (0 means built but not yet upgraded).
    pub level: u32,
}

/// A merged stack of troops of one kind. Quantity is always above zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TroopStack {
    /// Troop kind.
    #[serde(rename = "type")]
    pub kind: TroopKind,
    /// Number of units.
    pub quantity: u64,
}

// ---------------------------------------------------------------------------
// Queue entries
// ---------------------------------------------------------------------------

/// A pending building upgrade. Only the head of a city's queue counts down.
///
/// Time is stored as relative seconds remaining, so time the server spends
/// stopped is never credited to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BuildingUpgrade {
    /// Building being upgraded.
    pub building_type: BuildingKind,
    /// Level the building reaches when this entry completes.
    pub target_level: u32,
    /// Seconds until completion. May go negative on the completing tick.
    pub remaining_time: f64,
}

/// A pending recruitment order. Units complete one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RecruitOrder {
    /// Troop kind being trained.
    pub troop_type: TroopKind,
    /// Units originally requested.
    pub total_quantity: u64,
    /// Units not yet trained.
    pub remaining_qty: u64,
    /// Seconds needed to train a single unit.
    pub time_per_unit: f64,
    /// Seconds left on the unit currently in training.
    pub remaining_time: f64,
}

impl RecruitOrder {
    /// A fresh order for `quantity` units at `time_per_unit` seconds each.
    pub const fn new(troop_type: TroopKind, quantity: u64, time_per_unit: f64) -> Self {
        Self {
            troop_type,
            total_quantity: quantity,
            remaining_qty: quantity,
            time_per_unit,
            remaining_time: time_per_unit,
        }
    }

    /// Units already delivered from this order.
    pub const fn completed(&self) -> u64 {
        self.total_quantity.saturating_sub(self.remaining_qty)
    }
}
