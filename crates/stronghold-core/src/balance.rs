//! Game balance: per-level building numbers and per-kind troop numbers.
//!
//! The catalog is loaded once at startup from `config/balance.yaml` and is
//! read-only afterwards. The tick engine and the command layer only see it
//! through [`BalanceLookup`], where a missing entry means "no such level"
//! or "unknown kind" rather than an error.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stronghold_types::{BuildingKind, ResourceAmounts, TroopKind};

use crate::config::ConfigError;

/// Read access to balance numbers.
pub trait BalanceLookup: Send + Sync {
    /// Parameters of `kind` at `level`, or `None` if that level is not
    /// configured (which also marks the level cap).
    fn building_level(&self, kind: BuildingKind, level: u32) -> Option<&BuildingLevel>;

    /// Parameters of a troop kind, or `None` if it cannot be recruited.
    fn troop(&self, kind: TroopKind) -> Option<&TroopSpec>;
}

/// Parameters of one building level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingLevel {
    /// The level these numbers apply to.
    pub level: u32,
    /// Resource produced per hour (producer buildings only).
    #[serde(default)]
    pub production_per_hour: u64,
    /// Storage cap per produced resource (warehouse only).
    #[serde(default)]
    pub capacity: u64,
    /// Build speed bonus in percent (government only). Informational.
    #[serde(default)]
    pub build_speed_boost: u32,
    /// Recruit speed bonus in percent (barracks only). Informational.
    #[serde(default)]
    pub recruit_speed_boost: u32,
    /// Seconds needed to reach this level from the one below.
    #[serde(default)]
    pub upgrade_time_seconds: u64,
    /// Cost to reach this level from the one below.
    #[serde(default)]
    pub upgrade_cost: ResourceAmounts,
    /// Population used by a building at this level. Informational.
    #[serde(default)]
    pub population_cost: u64,
}

/// Per-kind building configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingSpec {
    /// Level a new city starts with.
    #[serde(default = "default_initial_level")]
    pub initial_level: u32,
    /// Highest reachable level.
    #[serde(default)]
    pub max_level: u32,
    /// Per-level parameters.
    #[serde(default)]
    pub levels: Vec<BuildingLevel>,
}

/// Recruitment cost of a single unit. Troops never cost gold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopCost {
    /// Wood per unit.
    #[serde(default)]
    pub wood: u64,
    /// Stone per unit.
    #[serde(default)]
    pub stone: u64,
    /// Iron per unit.
    #[serde(default)]
    pub iron: u64,
    /// Food per unit.
    #[serde(default)]
    pub food: u64,
}

impl TroopCost {
    /// The same cost as a five-resource bundle with zero gold.
    pub const fn as_amounts(&self) -> ResourceAmounts {
        ResourceAmounts {
            wood: self.wood,
            stone: self.stone,
            iron: self.iron,
            food: self.food,
            gold: 0,
        }
    }
}

/// Per-kind troop configuration. Combat stats are stored for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopSpec {
    /// Troop kind.
    #[serde(rename = "type")]
    pub kind: TroopKind,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Melee attack.
    #[serde(default)]
    pub melee_attack: u32,
    /// Ranged attack.
    #[serde(default)]
    pub ranged_attack: u32,
    /// Melee defense.
    #[serde(default)]
    pub melee_defense: u32,
    /// Ranged defense.
    #[serde(default)]
    pub ranged_defense: u32,
    /// Movement speed.
    #[serde(default)]
    pub speed: u32,
    /// Carry capacity.
    #[serde(default)]
    pub capacity: u32,
    /// Food eaten per hour.
    #[serde(default)]
    pub food_consumption: u32,
    /// Seconds to train one unit.
    #[serde(default)]
    pub recruit_time_seconds: u64,
    /// Cost of one unit.
    #[serde(default)]
    pub recruit_cost: TroopCost,
}

/// The loaded balance file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCatalog {
    /// Building configuration keyed by kind.
    #[serde(default)]
    pub buildings: BTreeMap<BuildingKind, BuildingSpec>,
    /// Recruitable troops.
    #[serde(default)]
    pub troops: Vec<TroopSpec>,
}

impl BalanceCatalog {
    /// Load the catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if it is not a valid catalog.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::parse(&contents)?;
        tracing::info!(
            path = %path.display(),
            buildings = catalog.buildings.len(),
            troops = catalog.troops.len(),
            "balance catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse the catalog from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not a valid catalog.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// The level every building kind starts at in a new city. Kinds absent
    /// from the catalog start at level 1.
    pub fn initial_levels(&self) -> BTreeMap<BuildingKind, u32> {
        BuildingKind::ALL
            .into_iter()
            .map(|kind| {
                let level = self
                    .buildings
                    .get(&kind)
                    .map_or_else(default_initial_level, |spec| spec.initial_level);
                (kind, level)
            })
            .collect()
    }
}

impl BalanceLookup for BalanceCatalog {
    fn building_level(&self, kind: BuildingKind, level: u32) -> Option<&BuildingLevel> {
        let spec = self.buildings.get(&kind)?;
        if spec.max_level > 0 && level > spec.max_level {
            return None;
        }
        spec.levels.iter().find(|entry| entry.level == level)
    }

    fn troop(&self, kind: TroopKind) -> Option<&TroopSpec> {
        self.troops.iter().find(|spec| spec.kind == kind)
    }
}

const fn default_initial_level() -> u32 {
    1
}
