//! The tick engine: advances every city by a real-time delta.
//!
//! Each call runs four phases per city, in this order:
//!
//! 1. **Accrual** -- producer buildings add `rate * delta / 3600` to the
//!    fractional accumulators, and whole units move into the stocks.
//! 2. **Clamp** -- produced stocks are capped at the warehouse capacity.
//! 3. **Building queue** -- the head upgrade counts down and completes.
//! 4. **Recruit queue** -- the head order trains one unit at a time.
//!
//! Queues advance by at most one step per call: one completed upgrade and
//! one trained unit, however large the delta. Time that a single call
//! does not consume is dropped, not carried to the next entry.
//!
//! [`advance`] never fails. Missing balance entries or building slots are
//! treated as "no effect".

use stronghold_types::{BuildingKind, Resource, ResourceAmounts};
use stronghold_world::{City, World};

use crate::balance::BalanceLookup;

/// Seconds per hour, the unit of `production_per_hour`.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Summary of one [`advance`] call, used for structured logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// The delta actually applied, after sanitizing.
    pub delta_seconds: f64,
    /// Number of cities processed.
    pub cities: usize,
    /// Whole units moved from accumulators into stocks.
    pub produced: ResourceAmounts,
    /// Units discarded by the warehouse clamp.
    pub discarded: ResourceAmounts,
    /// Building upgrades that completed.
    pub upgrades_completed: u64,
    /// Troop units that finished training.
    pub units_recruited: u64,
}

/// Advance every city in `world` by `delta_seconds` of real time.
///
/// Negative, NaN or infinite deltas are treated as zero.
pub fn advance<B>(world: &mut World, delta_seconds: f64, balance: &B) -> TickReport
where
    B: BalanceLookup + ?Sized,
{
    let delta = sanitize_delta(delta_seconds);
    let mut report = TickReport {
        delta_seconds: delta,
        ..TickReport::default()
    };

    for city in world.cities_mut() {
        advance_city(city, delta, balance, &mut report);
        report.cities = report.cities.saturating_add(1);
    }

    report
}

/// Run all four phases on a single city.
pub fn advance_city<B>(city: &mut City, delta: f64, balance: &B, report: &mut TickReport)
where
    B: BalanceLookup + ?Sized,
{
    accrue(city, delta, balance, report);
    clamp_to_capacity(city, balance, report);
    advance_building_queue(city, delta, report);
    advance_recruit_queue(city, delta, report);
}

fn sanitize_delta(delta: f64) -> f64 {
    if delta.is_finite() && delta > 0.0 {
        delta
    } else {
        0.0
    }
}

/// Level parameters for the building currently in `kind`'s slot.
fn current_level<'a, B>(
    city: &City,
    kind: BuildingKind,
    balance: &'a B,
) -> Option<&'a crate::balance::BuildingLevel>
where
    B: BalanceLookup + ?Sized,
{
    let level = city.building_level(kind)?;
    balance.building_level(kind, level)
}

// ---------------------------------------------------------------------------
// Phase 1: accrual
// ---------------------------------------------------------------------------

fn accrue<B>(city: &mut City, delta: f64, balance: &B, report: &mut TickReport)
where
    B: BalanceLookup + ?Sized,
{
    for resource in Resource::PRODUCED {
        let Some(producer) = resource.producer() else {
            continue;
        };
        let rate = current_level(city, producer, balance).map_or(0, |level| level.production_per_hour);
        let Some(acc) = city.accumulators.get_mut(resource) else {
            continue;
        };

        // Multiply before dividing so 100/h over 36 s lands on exactly 1.0.
        *acc += u64_to_f64(rate) * delta / SECONDS_PER_HOUR;
        if !acc.is_finite() || *acc < 0.0 {
            *acc = 0.0;
        }
        if *acc < 1.0 {
            continue;
        }

        let whole = acc.floor();
        *acc -= whole;
        let units = f64_to_u64(whole);
        let stock = city.resources.get_mut(resource);
        *stock = stock.saturating_add(units);
        let produced = report.produced.get_mut(resource);
        *produced = produced.saturating_add(units);
    }
}

// ---------------------------------------------------------------------------
// Phase 2: capacity clamp
// ---------------------------------------------------------------------------

fn clamp_to_capacity<B>(city: &mut City, balance: &B, report: &mut TickReport)
where
    B: BalanceLookup + ?Sized,
{
    let Some(capacity) =
        current_level(city, BuildingKind::Warehouse, balance).map(|level| level.capacity)
    else {
        return;
    };

    for resource in Resource::PRODUCED {
        let stock = city.stock_mut(resource);
        if *stock > capacity {
            let excess = stock.saturating_sub(capacity);
            *stock = capacity;
            let discarded = report.discarded.get_mut(resource);
            *discarded = discarded.saturating_add(excess);
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 3: building upgrade queue
// ---------------------------------------------------------------------------

fn advance_building_queue(city: &mut City, delta: f64, report: &mut TickReport) {
    let Some(head) = city.building_upgrade_queue.front_mut() else {
        return;
    };
    head.remaining_time -= delta;
    if head.remaining_time > 0.0 {
        return;
    }

    let Some(done) = city.building_upgrade_queue.pop_front() else {
        return;
    };
    match city.building_mut(done.building_type) {
        Some(building) => {
            building.level = done.target_level;
            report.upgrades_completed = report.upgrades_completed.saturating_add(1);
            tracing::debug!(
                city_id = %city.id,
                building = %done.building_type,
                level = done.target_level,
                "building upgrade completed"
            );
        }
        None => {
            tracing::warn!(
                city_id = %city.id,
                building = %done.building_type,
                "upgrade completed for missing building slot, dropped"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 4: recruitment queue
// ---------------------------------------------------------------------------

fn advance_recruit_queue(city: &mut City, delta: f64, report: &mut TickReport) {
    let Some(head) = city.recruit_queue.front_mut() else {
        return;
    };
    if head.remaining_qty == 0 {
        tracing::warn!(city_id = %city.id, troop = %head.troop_type, "empty recruit order dropped");
        city.recruit_queue.pop_front();
        return;
    }

    head.remaining_time -= delta;
    if head.remaining_time > 0.0 {
        return;
    }

    let kind = head.troop_type;
    head.remaining_qty = head.remaining_qty.saturating_sub(1);
    let finished = head.remaining_qty == 0;
    if !finished {
        head.remaining_time = head.time_per_unit;
    }

    if finished {
        city.recruit_queue.pop_front();
    }
    city.add_troops(kind, 1);
    report.units_recruited = report.units_recruited.saturating_add(1);
}

// ---------------------------------------------------------------------------
// Numeric conversions
// ---------------------------------------------------------------------------

#[allow(clippy::cast_precision_loss)]
const fn u64_to_f64(value: u64) -> f64 {
    value as f64
}

/// Convert a non-negative whole float to `u64`, saturating at the bounds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn f64_to_u64(value: f64) -> u64 {
    value as u64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use stronghold_types::{
        BuildingUpgrade, CityId, Position, RecruitOrder, TroopKind, UserId,
    };

    use super::*;
    use crate::balance::{BalanceCatalog, BuildingLevel, BuildingSpec};

    fn level(level: u32) -> BuildingLevel {
        BuildingLevel {
            level,
            ..BuildingLevel::default()
        }
    }

    /// Lumberyard 100/h at level 1, warehouse capacity 10 000 at level 1.
    fn catalog() -> BalanceCatalog {
        let mut buildings = BTreeMap::new();
        buildings.insert(
            BuildingKind::Lumberyard,
            BuildingSpec {
                initial_level: 1,
                max_level: 2,
                levels: vec![
                    BuildingLevel {
                        production_per_hour: 100,
                        ..level(1)
                    },
                    BuildingLevel {
                        production_per_hour: 200,
                        ..level(2)
                    },
                ],
            },
        );
        buildings.insert(
            BuildingKind::Warehouse,
            BuildingSpec {
                initial_level: 1,
                max_level: 1,
                levels: vec![BuildingLevel {
                    capacity: 10_000,
                    ..level(1)
                }],
            },
        );
        BalanceCatalog {
            buildings,
            troops: Vec::new(),
        }
    }

    fn world_with_city(wood: u64) -> (World, CityId) {
        let mut world = World::new();
        let owner = world.create_user("alice", String::new()).unwrap().id;
        let levels: BTreeMap<BuildingKind, u32> =
            BuildingKind::ALL.into_iter().map(|k| (k, 1)).collect();
        let id = world
            .create_city(
                owner,
                "My city",
                Position::default(),
                ResourceAmounts {
                    wood,
                    ..ResourceAmounts::ZERO
                },
                &levels,
            )
            .unwrap();
        (world, id)
    }

    fn city(world: &World, id: CityId) -> &City {
        world.city(id).unwrap()
    }

    #[test]
    fn hundred_per_hour_over_36_seconds_yields_one_unit() {
        let (mut world, id) = world_with_city(0);
        let report = advance(&mut world, 36.0, &catalog());
        assert_eq!(city(&world, id).resources.wood, 1);
        assert!(city(&world, id).accumulators.wood.abs() < 1e-9);
        assert_eq!(report.produced.wood, 1);
        assert_eq!(report.cities, 1);
    }

    #[test]
    fn fractions_accumulate_across_ticks() {
        let (mut world, id) = world_with_city(0);
        let balance = catalog();
        advance(&mut world, 18.0, &balance);
        assert_eq!(city(&world, id).resources.wood, 0);
        assert!((city(&world, id).accumulators.wood - 0.5).abs() < 1e-9);
        advance(&mut world, 18.0, &balance);
        assert_eq!(city(&world, id).resources.wood, 1);
    }

    #[test]
    fn unconfigured_producers_produce_nothing() {
        let (mut world, id) = world_with_city(0);
        advance(&mut world, 3600.0, &catalog());
        let c = city(&world, id);
        assert_eq!(c.resources.wood, 100);
        assert_eq!(c.resources.stone, 0);
        assert_eq!(c.resources.iron, 0);
        assert_eq!(c.resources.food, 0);
        assert!(c.accumulators.stone.abs() < 1e-9);
    }

    #[test]
    fn stocks_clamp_to_warehouse_capacity() {
        let (mut world, id) = world_with_city(9_990);
        let report = advance(&mut world, 3600.0, &catalog());
        assert_eq!(city(&world, id).resources.wood, 10_000);
        assert_eq!(report.discarded.wood, 90);
    }

    #[test]
    fn gold_is_never_clamped() {
        let (mut world, id) = world_with_city(0);
        world.city_mut(id).unwrap().resources.gold = 50_000;
        advance(&mut world, 1.0, &catalog());
        assert_eq!(city(&world, id).resources.gold, 50_000);
    }

    #[test]
    fn missing_warehouse_disables_clamp() {
        let (mut world, id) = world_with_city(20_000);
        world.city_mut(id).unwrap().buildings.warehouse = None;
        advance(&mut world, 36.0, &catalog());
        assert_eq!(city(&world, id).resources.wood, 20_001);
    }

    #[test]
    fn invalid_deltas_are_ignored() {
        let (mut world, id) = world_with_city(0);
        let balance = catalog();
        for delta in [-10.0, f64::NAN, f64::INFINITY] {
            let report = advance(&mut world, delta, &balance);
            assert!(report.delta_seconds.abs() < f64::EPSILON);
        }
        assert_eq!(city(&world, id).resources.wood, 0);
        assert!(city(&world, id).accumulators.wood.abs() < 1e-9);
    }

    #[test]
    fn upgrade_counts_down_then_completes() {
        let (mut world, id) = world_with_city(0);
        let balance = catalog();
        world.city_mut(id).unwrap().enqueue_building_upgrade(BuildingUpgrade {
            building_type: BuildingKind::Lumberyard,
            target_level: 2,
            remaining_time: 5.0,
        });

        advance(&mut world, 3.0, &balance);
        let head = city(&world, id).building_upgrade_queue.front().copied().unwrap();
        assert!((head.remaining_time - 2.0).abs() < 1e-9);
        assert_eq!(city(&world, id).building_level(BuildingKind::Lumberyard), Some(1));

        let report = advance(&mut world, 3.0, &balance);
        assert_eq!(city(&world, id).building_level(BuildingKind::Lumberyard), Some(2));
        assert!(city(&world, id).building_upgrade_queue.is_empty());
        assert_eq!(report.upgrades_completed, 1);
    }

    #[test]
    fn accrual_uses_level_before_upgrade_completes() {
        let (mut world, id) = world_with_city(0);
        world.city_mut(id).unwrap().enqueue_building_upgrade(BuildingUpgrade {
            building_type: BuildingKind::Lumberyard,
            target_level: 2,
            remaining_time: 1.0,
        });
        advance(&mut world, 36.0, &catalog());
        assert_eq!(city(&world, id).resources.wood, 1);
        assert_eq!(city(&world, id).building_level(BuildingKind::Lumberyard), Some(2));
    }

    #[test]
    fn at_most_one_upgrade_per_call() {
        let (mut world, id) = world_with_city(0);
        let balance = catalog();
        for target in 2..=4 {
            world.city_mut(id).unwrap().enqueue_building_upgrade(BuildingUpgrade {
                building_type: BuildingKind::Farm,
                target_level: target,
                remaining_time: 1.0,
            });
        }

        let report = advance(&mut world, 1_000.0, &balance);
        assert_eq!(report.upgrades_completed, 1);
        assert_eq!(city(&world, id).building_upgrade_queue.len(), 2);
        assert_eq!(city(&world, id).building_level(BuildingKind::Farm), Some(2));

        advance(&mut world, 1_000.0, &balance);
        advance(&mut world, 1_000.0, &balance);
        assert_eq!(city(&world, id).building_level(BuildingKind::Farm), Some(4));
        assert!(city(&world, id).building_upgrade_queue.is_empty());
    }

    #[test]
    fn upgrade_for_missing_slot_is_dropped() {
        let (mut world, id) = world_with_city(0);
        {
            let c = world.city_mut(id).unwrap();
            c.buildings.barracks = None;
            c.enqueue_building_upgrade(BuildingUpgrade {
                building_type: BuildingKind::Barracks,
                target_level: 2,
                remaining_time: 0.5,
            });
        }
        let report = advance(&mut world, 1.0, &catalog());
        assert_eq!(report.upgrades_completed, 0);
        assert!(city(&world, id).building_upgrade_queue.is_empty());
        assert!(city(&world, id).building(BuildingKind::Barracks).is_none());
    }

    #[test]
    fn recruitment_trains_one_unit_per_interval() {
        let (mut world, id) = world_with_city(0);
        let balance = catalog();
        world
            .city_mut(id)
            .unwrap()
            .enqueue_recruitment(RecruitOrder::new(TroopKind::Archer, 3, 10.0));

        for expected_remaining in [2, 1] {
            advance(&mut world, 10.0, &balance);
            let head = city(&world, id).recruit_queue.front().copied().unwrap();
            assert_eq!(head.remaining_qty, expected_remaining);
            assert!((head.remaining_time - 10.0).abs() < 1e-9);
            assert_eq!(head.total_quantity, head.completed() + head.remaining_qty);
        }

        let report = advance(&mut world, 10.0, &balance);
        assert!(city(&world, id).recruit_queue.is_empty());
        assert_eq!(city(&world, id).troop(TroopKind::Archer).map(|s| s.quantity), Some(3));
        assert_eq!(report.units_recruited, 1);
    }

    #[test]
    fn large_delta_trains_a_single_unit() {
        let (mut world, id) = world_with_city(0);
        world
            .city_mut(id)
            .unwrap()
            .enqueue_recruitment(RecruitOrder::new(TroopKind::Spearman, 5, 1.0));
        advance(&mut world, 1_000.0, &catalog());
        assert_eq!(city(&world, id).troop(TroopKind::Spearman).map(|s| s.quantity), Some(1));
        assert_eq!(city(&world, id).recruit_queue[0].remaining_qty, 4);
    }

    #[test]
    fn malformed_recruit_head_is_popped() {
        let (mut world, id) = world_with_city(0);
        {
            let c = world.city_mut(id).unwrap();
            let mut empty = RecruitOrder::new(TroopKind::Archer, 2, 5.0);
            empty.remaining_qty = 0;
            c.enqueue_recruitment(empty);
            c.enqueue_recruitment(RecruitOrder::new(TroopKind::Catapult, 1, 5.0));
        }
        let report = advance(&mut world, 100.0, &catalog());
        assert_eq!(report.units_recruited, 0);
        assert_eq!(city(&world, id).recruit_queue.len(), 1);
        assert_eq!(city(&world, id).recruit_queue[0].troop_type, TroopKind::Catapult);
    }

    #[test]
    fn every_city_is_processed() {
        let (mut world, _) = world_with_city(0);
        let owner = UserId::new(1);
        let second = world
            .create_city(
                owner,
                "Second",
                Position::default(),
                ResourceAmounts::ZERO,
                &BuildingKind::ALL.into_iter().map(|k| (k, 1)).collect(),
            )
            .unwrap();
        let report = advance(&mut world, 36.0, &catalog());
        assert_eq!(report.cities, 2);
        assert_eq!(report.produced.wood, 2);
        assert_eq!(city(&world, second).resources.wood, 1);
    }
}
