use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::utils::HashMap;
use serde::Deserialize;
use std::ops::Index;

use crate::plugins::pool::{ComponentPool, Poolable};

pub struct StatsPlugin;

impl Plugin for StatsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ComponentPool<StatsComponent>>()
            .register_type::<StatsType>()
            .register_type::<GearType>()
            .register_type::<StatsComponent>()
            .register_type::<GearComponent>();
    }
}

#[derive(Reflect, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsType {
    Life,
    MaxLife,
    Mana,
    MaxMana,
    Strength,
    Agility,
    Intelligence,
    PhysicalDamage,
    MagicDamage,
    PhysicalArmor,
    MagicArmor,
}

impl StatsType {
    pub const ALL: [StatsType; 11] = [
        StatsType::Life,
        StatsType::MaxLife,
        StatsType::Mana,
        StatsType::MaxMana,
        StatsType::Strength,
        StatsType::Agility,
        StatsType::Intelligence,
        StatsType::PhysicalDamage,
        StatsType::MagicDamage,
        StatsType::PhysicalArmor,
        StatsType::MagicArmor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatsType::Life => "Life",
            StatsType::MaxLife => "Max Life",
            StatsType::Mana => "Mana",
            StatsType::MaxMana => "Max Mana",
            StatsType::Strength => "Strength",
            StatsType::Agility => "Agility",
            StatsType::Intelligence => "Intelligence",
            StatsType::PhysicalDamage => "Phys. Damage",
            StatsType::MagicDamage => "Magic Damage",
            StatsType::PhysicalArmor => "Phys. Armor",
            StatsType::MagicArmor => "Magic Armor",
        }
    }
}

/// Base attribute values. Unset stats read as 0.
#[derive(Component, Reflect, Default, Debug, Clone)]
#[reflect(Component)]
pub struct StatsComponent {
    pub stats: HashMap<StatsType, f32>,
}

impl StatsComponent {
    pub fn with(mut self, stat: StatsType, value: f32) -> Self {
        self.set(stat, value);
        self
    }

    pub fn get(&self, stat: StatsType) -> f32 {
        self.stats.get(&stat).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, stat: StatsType, value: f32) {
        self.stats.insert(stat, value);
    }

    /// Base value plus the matching contribution of every equipped item.
    /// Recomputed on every call; items without stats contribute nothing.
    pub fn total_stat_value<'a>(
        &self,
        stat: StatsType,
        gear: Option<&GearComponent>,
        item_stats: impl Fn(Entity) -> Option<&'a StatsComponent>,
    ) -> f32 {
        let base = self.get(stat);
        match gear {
            Some(gear) if !gear.gear.is_empty() => {
                let gear_value: f32 = gear
                    .gear
                    .values()
                    .filter_map(|item| item_stats(*item))
                    .map(|item| item.get(stat))
                    .sum();
                base + gear_value
            }
            _ => base,
        }
    }
}

impl Index<StatsType> for StatsComponent {
    type Output = f32;

    fn index(&self, stat: StatsType) -> &f32 {
        self.stats.get(&stat).unwrap_or(&0.0)
    }
}

impl Poolable for StatsComponent {
    fn reset(&mut self) {
        self.stats.clear();
    }
}

#[derive(Reflect, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GearType {
    Helmet,
    Amulet,
    Armor,
    Weapon,
    Shield,
    Gloves,
    Boots,
}

impl GearType {
    pub const ALL: [GearType; 7] = [
        GearType::Helmet,
        GearType::Amulet,
        GearType::Armor,
        GearType::Weapon,
        GearType::Shield,
        GearType::Gloves,
        GearType::Boots,
    ];
}

/// Equipped items by slot. Each item entity carries its own [`StatsComponent`].
#[derive(Component, Reflect, Default, Debug, Clone)]
#[reflect(Component)]
pub struct GearComponent {
    pub gear: HashMap<GearType, Entity>,
}

/// Read access to stats and gear of arbitrary entities.
pub trait StatsSource {
    fn stats(&self, entity: Entity) -> Option<&StatsComponent>;

    fn gear(&self, entity: Entity) -> Option<&GearComponent>;

    /// Stats of an entity that must be a combatant. A missing component is a
    /// wiring bug, so this panics instead of guessing.
    fn stats_cmp(&self, entity: Entity) -> &StatsComponent {
        self.stats(entity)
            .unwrap_or_else(|| panic!("StatsComponent for entity '{entity:?}' is null"))
    }

    fn total_stat_value(&self, entity: Entity, stat: StatsType) -> f32 {
        self.stats_cmp(entity)
            .total_stat_value(stat, self.gear(entity), |item| self.stats(item))
    }
}

impl StatsSource for World {
    fn stats(&self, entity: Entity) -> Option<&StatsComponent> {
        self.get::<StatsComponent>(entity)
    }

    fn gear(&self, entity: Entity) -> Option<&GearComponent> {
        self.get::<GearComponent>(entity)
    }
}

#[derive(SystemParam)]
pub struct StatsLookup<'w, 's> {
    query: Query<'w, 's, (&'static StatsComponent, Option<&'static GearComponent>)>,
}

impl StatsSource for StatsLookup<'_, '_> {
    fn stats(&self, entity: Entity) -> Option<&StatsComponent> {
        self.query.get(entity).ok().map(|(stats, _)| stats)
    }

    fn gear(&self, entity: Entity) -> Option<&GearComponent> {
        self.query.get(entity).ok().and_then(|(_, gear)| gear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_item(world: &mut World, stat: StatsType, value: f32) -> Entity {
        world.spawn(StatsComponent::default().with(stat, value)).id()
    }

    #[test]
    fn test_missing_stat_defaults_to_zero() {
        let stats = StatsComponent::default().with(StatsType::Life, 10.0);
        assert_eq!(stats.get(StatsType::Mana), 0.0);
        assert_eq!(stats[StatsType::Life], 10.0);
        assert_eq!(stats[StatsType::MagicArmor], 0.0);
    }

    #[test]
    fn test_total_without_gear_is_base() {
        let mut world = World::new();
        let stats = StatsComponent::default()
            .with(StatsType::Strength, 5.0)
            .with(StatsType::Agility, 2.0);
        let entity = world.spawn(stats).id();

        for stat in StatsType::ALL {
            let base = world.stats_cmp(entity).get(stat);
            assert_eq!(world.total_stat_value(entity, stat), base);
        }
    }

    #[test]
    fn test_total_with_empty_gear_is_base() {
        let mut world = World::new();
        let entity = world
            .spawn((StatsComponent::default().with(StatsType::Strength, 5.0), GearComponent::default()))
            .id();
        assert_eq!(world.total_stat_value(entity, StatsType::Strength), 5.0);
    }

    #[test]
    fn test_gear_adds_to_base() {
        let mut world = World::new();
        let sword = spawn_item(&mut world, StatsType::Strength, 3.0);
        let mut gear = GearComponent::default();
        gear.gear.insert(GearType::Weapon, sword);
        let entity = world
            .spawn((StatsComponent::default().with(StatsType::Strength, 5.0), gear))
            .id();

        assert_eq!(world.total_stat_value(entity, StatsType::Strength), 8.0);
        assert_eq!(world.total_stat_value(entity, StatsType::Agility), 0.0);
    }

    #[test]
    fn test_gear_sums_every_slot() {
        let mut world = World::new();
        let helmet = spawn_item(&mut world, StatsType::PhysicalArmor, 2.0);
        let shield = spawn_item(&mut world, StatsType::PhysicalArmor, 4.5);
        // an item without stats contributes nothing
        let amulet = world.spawn_empty().id();
        let mut gear = GearComponent::default();
        gear.gear.insert(GearType::Helmet, helmet);
        gear.gear.insert(GearType::Shield, shield);
        gear.gear.insert(GearType::Amulet, amulet);
        let entity = world
            .spawn((StatsComponent::default().with(StatsType::PhysicalArmor, 1.0), gear))
            .id();

        assert_eq!(world.total_stat_value(entity, StatsType::PhysicalArmor), 7.5);
    }

    #[test]
    #[should_panic(expected = "StatsComponent for entity")]
    fn test_missing_stats_component_is_fatal() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        world.total_stat_value(entity, StatsType::Life);
    }
}
