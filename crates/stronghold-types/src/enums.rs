//! Closed enumerations for buildings, troops, and resources.
//!
//! Every kind is a fixed variant with an exhaustive mapping to its wire
//! name, so adding a kind is a compile error everywhere it must be handled.
//! Wire names are `snake_case` and match the field names used in snapshots
//! and API responses.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when parsing an unknown kind name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind {
    /// What was being parsed (`"building"`, `"troop"`, `"resource"`).
    pub category: &'static str,
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} kind: {}", self.category, self.value)
    }
}

impl std::error::Error for UnknownKind {}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A stockpiled city resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Resource {
    /// Lumber, produced by the lumberyard.
    Wood,
    /// Quarried stone, produced by the quarry.
    Stone,
    /// Iron ore, produced by the iron mine.
    Iron,
    /// Food, produced by the farm.
    Food,
    /// Gold. Never produced passively.
    Gold,
}

impl Resource {
    /// All resources in display order.
    pub const ALL: [Self; 5] = [Self::Wood, Self::Stone, Self::Iron, Self::Food, Self::Gold];

    /// The four resources that buildings produce over time.
    pub const PRODUCED: [Self; 4] = [Self::Wood, Self::Stone, Self::Iron, Self::Food];

    /// Wire name of the resource.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Iron => "iron",
            Self::Food => "food",
            Self::Gold => "gold",
        }
    }

    /// The building whose level determines this resource's production
    /// rate, if any.
    pub const fn producer(self) -> Option<BuildingKind> {
        match self {
            Self::Wood => Some(BuildingKind::Lumberyard),
            Self::Stone => Some(BuildingKind::Quarry),
            Self::Iron => Some(BuildingKind::IronMine),
            Self::Food => Some(BuildingKind::Farm),
            Self::Gold => None,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

/// One of the seven building slots every city has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BuildingKind {
    /// Seat of government. Provides a build speed boost.
    Government,
    /// Produces wood.
    Lumberyard,
    /// Produces stone.
    Quarry,
    /// Produces iron.
    IronMine,
    /// Produces food.
    Farm,
    /// Caps how much of each produced resource the city can hold.
    Warehouse,
    /// Trains troops. Provides a recruit speed boost.
    Barracks,
}

impl BuildingKind {
    /// All building kinds in slot order.
    pub const ALL: [Self; 7] = [
        Self::Government,
        Self::Lumberyard,
        Self::Quarry,
        Self::IronMine,
        Self::Farm,
        Self::Warehouse,
        Self::Barracks,
    ];

    /// Wire name of the building kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Government => "government",
            Self::Lumberyard => "lumberyard",
            Self::Quarry => "quarry",
            Self::IronMine => "iron_mine",
            Self::Farm => "farm",
            Self::Warehouse => "warehouse",
            Self::Barracks => "barracks",
        }
    }

    /// Human-readable name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Government => "Government",
            Self::Lumberyard => "Lumberyard",
            Self::Quarry => "Quarry",
            Self::IronMine => "Iron Mine",
            Self::Farm => "Farm",
            Self::Warehouse => "Warehouse",
            Self::Barracks => "Barracks",
        }
    }

    /// Resource this building produces, if it is a producer.
    pub const fn produces(self) -> Option<Resource> {
        match self {
            Self::Lumberyard => Some(Resource::Wood),
            Self::Quarry => Some(Resource::Stone),
            Self::IronMine => Some(Resource::Iron),
            Self::Farm => Some(Resource::Food),
            Self::Government | Self::Warehouse | Self::Barracks => None,
        }
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildingKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind {
                category: "building",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Troops
// ---------------------------------------------------------------------------

/// A recruitable troop type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TroopKind {
    /// Logistics unit carrying supplies.
    SupplyCart,
    /// Cheap, fast-to-train infantry.
    LightInfantry,
    /// Anti-cavalry infantry.
    Spearman,
    /// Basic ranged unit.
    Archer,
    /// Veteran infantry.
    EliteInfantry,
    /// Heavy ranged unit.
    Crossbowman,
    /// Fast mounted unit.
    LightCavalry,
    /// Armoured infantry.
    HeavyInfantry,
    /// Armoured mounted unit.
    HeavyCavalry,
    /// Elite ranged unit.
    Marksman,
    /// Horse-drawn war chariot.
    Chariot,
    /// Siege engine.
    Catapult,
}

impl TroopKind {
    /// All troop kinds.
    pub const ALL: [Self; 12] = [
        Self::SupplyCart,
        Self::LightInfantry,
        Self::Spearman,
        Self::Archer,
        Self::EliteInfantry,
        Self::Crossbowman,
        Self::LightCavalry,
        Self::HeavyInfantry,
        Self::HeavyCavalry,
        Self::Marksman,
        Self::Chariot,
        Self::Catapult,
    ];

    /// Wire name of the troop kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SupplyCart => "supply_cart",
            Self::LightInfantry => "light_infantry",
            Self::Spearman => "spearman",
            Self::Archer => "archer",
            Self::EliteInfantry => "elite_infantry",
            Self::Crossbowman => "crossbowman",
            Self::LightCavalry => "light_cavalry",
            Self::HeavyInfantry => "heavy_infantry",
            Self::HeavyCavalry => "heavy_cavalry",
            Self::Marksman => "marksman",
            Self::Chariot => "chariot",
            Self::Catapult => "catapult",
        }
    }
}

impl fmt::Display for TroopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TroopKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind {
                category: "troop",
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        for kind in BuildingKind::ALL {
            let json = serde_json::to_string(&kind).ok();
            assert_eq!(json, Some(format!("\"{}\"", kind.as_str())));
        }
        for kind in TroopKind::ALL {
            let json = serde_json::to_string(&kind).ok();
            assert_eq!(json, Some(format!("\"{}\"", kind.as_str())));
        }
    }

    #[test]
    fn parse_building_kind() {
        assert_eq!("iron_mine".parse::<BuildingKind>().ok(), Some(BuildingKind::IronMine));
        assert!("castle".parse::<BuildingKind>().is_err());
    }

    #[test]
    fn parse_troop_kind() {
        assert_eq!("catapult".parse::<TroopKind>().ok(), Some(TroopKind::Catapult));
        let err = "dragon".parse::<TroopKind>().err();
        assert_eq!(err.map(|e| e.to_string()).as_deref(), Some("unknown troop kind: dragon"));
    }

    #[test]
    fn producers_are_inverse() {
        for resource in Resource::PRODUCED {
            let producer = resource.producer();
            assert_eq!(producer.and_then(BuildingKind::produces), Some(resource));
        }
        assert_eq!(Resource::Gold.producer(), None);
    }
}
