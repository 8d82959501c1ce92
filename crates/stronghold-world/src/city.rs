//! The city aggregate: stocks, buildings, troops and the two queues.
//!
//! Every kind-to-field mapping here is an exhaustive `match`, so the tick
//! engine and the command layer never dispatch on strings.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use stronghold_types::{
    Accumulators, Building, BuildingKind, BuildingUpgrade, CityId, Position, RecruitOrder,
    Resource, ResourceAmounts, TroopKind, TroopStack, UserId,
};

// ---------------------------------------------------------------------------
// Building slots
// ---------------------------------------------------------------------------

/// The seven building slots of a city, one per [`BuildingKind`].
///
/// Slots are optional so that a hand-edited or truncated snapshot still
/// deserializes. Cities created through [`World::create_city`] always have
/// every slot filled.
///
/// [`World::create_city`]: crate::World::create_city
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingSlots {
    /// Government slot.
    #[serde(default)]
    pub government: Option<Building>,
    /// Lumberyard slot.
    #[serde(default)]
    pub lumberyard: Option<Building>,
    /// Quarry slot.
    #[serde(default)]
    pub quarry: Option<Building>,
    /// Iron mine slot.
    #[serde(default)]
    pub iron_mine: Option<Building>,
    /// Farm slot.
    #[serde(default)]
    pub farm: Option<Building>,
    /// Warehouse slot.
    #[serde(default)]
    pub warehouse: Option<Building>,
    /// Barracks slot.
    #[serde(default)]
    pub barracks: Option<Building>,
}

impl BuildingSlots {
    /// Fill every slot, taking levels from `levels` and defaulting to 0.
    pub fn with_levels(levels: &BTreeMap<BuildingKind, u32>) -> Self {
        let mut slots = Self::default();
        for kind in BuildingKind::ALL {
            let level = levels.get(&kind).copied().unwrap_or(0);
            *slots.slot_mut(kind) = Some(Building { kind, level });
        }
        slots
    }

    /// The building in `kind`'s slot, if present.
    pub const fn get(&self, kind: BuildingKind) -> Option<&Building> {
        match kind {
            BuildingKind::Government => self.government.as_ref(),
            BuildingKind::Lumberyard => self.lumberyard.as_ref(),
            BuildingKind::Quarry => self.quarry.as_ref(),
            BuildingKind::IronMine => self.iron_mine.as_ref(),
            BuildingKind::Farm => self.farm.as_ref(),
            BuildingKind::Warehouse => self.warehouse.as_ref(),
            BuildingKind::Barracks => self.barracks.as_ref(),
        }
    }

    /// Mutable slot for `kind`.
    pub const fn slot_mut(&mut self, kind: BuildingKind) -> &mut Option<Building> {
        match kind {
            BuildingKind::Government => &mut self.government,
            BuildingKind::Lumberyard => &mut self.lumberyard,
            BuildingKind::Quarry => &mut self.quarry,
            BuildingKind::IronMine => &mut self.iron_mine,
            BuildingKind::Farm => &mut self.farm,
            BuildingKind::Warehouse => &mut self.warehouse,
            BuildingKind::Barracks => &mut self.barracks,
        }
    }

    /// Iterate over the filled slots in [`BuildingKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        BuildingKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind))
    }
}

// ---------------------------------------------------------------------------
// City
// ---------------------------------------------------------------------------

/// A player city.
///
/// Stocks and accumulators are flattened so snapshots carry `wood`,
/// `wood_acc` and friends directly on the city object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Unique identifier.
    pub id: CityId,
    /// Owning user.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Map position. Stored only.
    pub position: Position,
    /// Integer resource stocks.
    #[serde(flatten)]
    pub resources: ResourceAmounts,
    /// Fractional production not yet moved into the stocks.
    #[serde(flatten)]
    pub accumulators: Accumulators,
    /// Building slots.
    #[serde(default)]
    pub buildings: BuildingSlots,
    /// Troop stacks, at most one per kind, each with quantity above zero.
    #[serde(default)]
    pub troops: Vec<TroopStack>,
    /// Pending building upgrades. Only the head is active.
    #[serde(default)]
    pub building_upgrade_queue: VecDeque<BuildingUpgrade>,
    /// Pending recruitment orders. Only the head is active.
    #[serde(default)]
    pub recruit_queue: VecDeque<RecruitOrder>,
}

impl City {
    /// Build a fresh city with every building slot filled, no troops, empty
    /// queues and zeroed accumulators.
    pub fn new(
        id: CityId,
        owner_id: UserId,
        name: String,
        position: Position,
        resources: ResourceAmounts,
        building_levels: &BTreeMap<BuildingKind, u32>,
    ) -> Self {
        Self {
            id,
            owner_id,
            name,
            position,
            resources,
            accumulators: Accumulators::default(),
            buildings: BuildingSlots::with_levels(building_levels),
            troops: Vec::new(),
            building_upgrade_queue: VecDeque::new(),
            recruit_queue: VecDeque::new(),
        }
    }

    // -------------------------------------------------------------------
    // Buildings
    // -------------------------------------------------------------------

    /// The building in `kind`'s slot, if present.
    pub const fn building(&self, kind: BuildingKind) -> Option<&Building> {
        self.buildings.get(kind)
    }

    /// Mutable building in `kind`'s slot, if present.
    pub const fn building_mut(&mut self, kind: BuildingKind) -> Option<&mut Building> {
        self.buildings.slot_mut(kind).as_mut()
    }

    /// Current level of `kind`'s building, if the slot is present.
    pub fn building_level(&self, kind: BuildingKind) -> Option<u32> {
        self.building(kind).map(|b| b.level)
    }

    /// Number of queued upgrades targeting `kind`.
    pub fn queued_upgrades(&self, kind: BuildingKind) -> usize {
        self.building_upgrade_queue
            .iter()
            .filter(|entry| entry.building_type == kind)
            .count()
    }

    /// The level the next upgrade of `kind` would reach: the current level
    /// plus one for every upgrade of that building already queued, plus one.
    ///
    /// Returns `None` if the slot is missing or the level would overflow.
    pub fn next_upgrade_level(&self, kind: BuildingKind) -> Option<u32> {
        let current = self.building_level(kind)?;
        let queued = u32::try_from(self.queued_upgrades(kind)).ok()?;
        current.checked_add(queued)?.checked_add(1)
    }

    // -------------------------------------------------------------------
    // Resources
    // -------------------------------------------------------------------

    /// Current stock of `resource`.
    pub const fn stock(&self, resource: Resource) -> u64 {
        self.resources.get(resource)
    }

    /// Mutable stock of `resource`.
    pub const fn stock_mut(&mut self, resource: Resource) -> &mut u64 {
        self.resources.get_mut(resource)
    }

    // -------------------------------------------------------------------
    // Troops
    // -------------------------------------------------------------------

    /// The stack for `kind`, if the city has any of that troop.
    pub fn troop(&self, kind: TroopKind) -> Option<&TroopStack> {
        self.troops.iter().find(|stack| stack.kind == kind)
    }

    /// Add `quantity` units of `kind`, merging into an existing stack.
    ///
    /// A zero quantity is a no-op. Stack sizes saturate at `u64::MAX`.
    pub fn add_troops(&mut self, kind: TroopKind, quantity: u64) {
        if quantity == 0 {
            return;
        }
        if let Some(stack) = self.troops.iter_mut().find(|stack| stack.kind == kind) {
            stack.quantity = stack.quantity.saturating_add(quantity);
        } else {
            self.troops.push(TroopStack { kind, quantity });
        }
    }

    /// Total units across every stack.
    pub fn total_troops(&self) -> u64 {
        self.troops
            .iter()
            .fold(0_u64, |sum, stack| sum.saturating_add(stack.quantity))
    }

    // -------------------------------------------------------------------
    // Queues
    // -------------------------------------------------------------------

    /// Append an upgrade to the back of the building queue.
    pub fn enqueue_building_upgrade(&mut self, entry: BuildingUpgrade) {
        self.building_upgrade_queue.push_back(entry);
    }

    /// Append an order to the back of the recruitment queue.
    pub fn enqueue_recruitment(&mut self, entry: RecruitOrder) {
        self.recruit_queue.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_city() -> City {
        let levels: BTreeMap<BuildingKind, u32> =
            BuildingKind::ALL.into_iter().map(|k| (k, 1)).collect();
        City::new(
            CityId::new(1),
            UserId::new(1),
            "My city".to_owned(),
            Position::new(100, 100),
            ResourceAmounts {
                wood: 5000,
                stone: 5000,
                iron: 3000,
                food: 5000,
                gold: 1000,
            },
            &levels,
        )
    }

    #[test]
    fn new_city_fills_every_slot() {
        let city = sample_city();
        for kind in BuildingKind::ALL {
            assert_eq!(city.building_level(kind), Some(1));
            assert_eq!(city.building(kind).map(|b| b.kind), Some(kind));
        }
        assert!(city.troops.is_empty());
        assert!(city.building_upgrade_queue.is_empty());
        assert!(city.recruit_queue.is_empty());
        assert_eq!(city.accumulators, Accumulators::default());
    }

    #[test]
    fn missing_levels_default_to_zero() {
        let levels = BTreeMap::from([(BuildingKind::Farm, 3)]);
        let slots = BuildingSlots::with_levels(&levels);
        assert_eq!(slots.get(BuildingKind::Farm).map(|b| b.level), Some(3));
        assert_eq!(slots.get(BuildingKind::Quarry).map(|b| b.level), Some(0));
        assert_eq!(slots.iter().count(), 7);
    }

    #[test]
    fn add_troops_merges_stacks() {
        let mut city = sample_city();
        city.add_troops(TroopKind::Archer, 3);
        city.add_troops(TroopKind::Archer, 2);
        city.add_troops(TroopKind::Spearman, 1);
        assert_eq!(city.troops.len(), 2);
        assert_eq!(city.troop(TroopKind::Archer).map(|s| s.quantity), Some(5));
        assert_eq!(city.total_troops(), 6);
    }

    #[test]
    fn add_zero_troops_is_noop() {
        let mut city = sample_city();
        city.add_troops(TroopKind::Catapult, 0);
        assert!(city.troop(TroopKind::Catapult).is_none());
    }

    #[test]
    fn add_troops_saturates() {
        let mut city = sample_city();
        city.add_troops(TroopKind::Chariot, u64::MAX);
        city.add_troops(TroopKind::Chariot, 10);
        assert_eq!(city.troop(TroopKind::Chariot).map(|s| s.quantity), Some(u64::MAX));
    }

    #[test]
    fn next_upgrade_level_counts_queue() {
        let mut city = sample_city();
        assert_eq!(city.next_upgrade_level(BuildingKind::Farm), Some(2));
        city.enqueue_building_upgrade(BuildingUpgrade {
            building_type: BuildingKind::Farm,
            target_level: 2,
            remaining_time: 30.0,
        });
        city.enqueue_building_upgrade(BuildingUpgrade {
            building_type: BuildingKind::Quarry,
            target_level: 2,
            remaining_time: 30.0,
        });
        assert_eq!(city.next_upgrade_level(BuildingKind::Farm), Some(3));
        assert_eq!(city.next_upgrade_level(BuildingKind::Quarry), Some(3));
        assert_eq!(city.next_upgrade_level(BuildingKind::Barracks), Some(2));
    }

    #[test]
    fn missing_slot_has_no_next_level() {
        let mut city = sample_city();
        city.buildings.warehouse = None;
        assert!(city.building(BuildingKind::Warehouse).is_none());
        assert_eq!(city.next_upgrade_level(BuildingKind::Warehouse), None);
    }

    #[test]
    fn stock_mut_targets_matching_field() {
        let mut city = sample_city();
        *city.stock_mut(Resource::Iron) = 7;
        assert_eq!(city.resources.iron, 7);
        assert_eq!(city.stock(Resource::Wood), 5000);
    }

    #[test]
    fn serializes_flat_stock_fields() {
        let mut city = sample_city();
        city.accumulators.wood = 0.25;
        let value = serde_json::to_value(&city).ok();
        let value = value.as_ref();
        assert_eq!(value.and_then(|v| v.get("wood")).and_then(serde_json::Value::as_u64), Some(5000));
        let acc = value
            .and_then(|v| v.get("wood_acc"))
            .and_then(serde_json::Value::as_f64);
        assert!(acc.is_some_and(|acc| (acc - 0.25).abs() < 1e-9));
        assert!(value.and_then(|v| v.get("owner_id")).is_some());
        assert!(value.and_then(|v| v.get("building_upgrade_queue")).is_some());
    }
}
