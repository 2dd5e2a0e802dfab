use bevy::prelude::*;

use crate::plugins::items::ItemComponent;
use crate::plugins::pool::ComponentPool;
use crate::plugins::stats::{GearComponent, GearType, StatsComponent, StatsLookup, StatsSource, StatsType};

pub struct InventoryPlugin;

impl Plugin for InventoryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InventorySelection>()
            .init_resource::<ComponentPool<StatsComponent>>()
            .add_event::<EquipItemEvent>()
            .add_event::<UnequipItemEvent>()
            .add_event::<UseItemEvent>()
            .add_systems(Update, (equip_item_system, unequip_item_system, use_item_system).chain());
    }
}

#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Gold(pub u32);

/// Carried items that are not equipped, in pickup order.
#[derive(Component, Debug, Default, Clone)]
pub struct Bag {
    pub items: Vec<Entity>,
}

/// Cursor of the inventory screen: bag entries first, then equipped slots.
#[derive(Resource, Debug, Default)]
pub struct InventorySelection {
    pub index: usize,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct EquipItemEvent {
    pub owner: Entity,
    pub item: Entity,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct UnequipItemEvent {
    pub owner: Entity,
    pub slot: GearType,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct UseItemEvent {
    pub owner: Entity,
    pub item: Entity,
}

fn equip_item_system(
    mut events: EventReader<EquipItemEvent>,
    mut q_owner: Query<(&mut Bag, &mut GearComponent)>,
    q_items: Query<&ItemComponent>,
) {
    for event in events.read() {
        let Ok((mut bag, mut gear)) = q_owner.get_mut(event.owner) else {
            warn!("Equip requested for {:?} which carries no gear", event.owner);
            continue;
        };
        let Some(position) = bag.items.iter().position(|e| *e == event.item) else {
            warn!("Item {:?} is not in the bag of {:?}", event.item, event.owner);
            continue;
        };
        let Some(slot) = q_items.get(event.item).ok().and_then(|item| item.gear_type) else {
            info!("Item {:?} cannot be equipped", event.item);
            continue;
        };

        bag.items.remove(position);
        if let Some(previous) = gear.gear.insert(slot, event.item) {
            bag.items.push(previous);
        }
        debug!("{:?} equipped {:?} as {:?}", event.owner, event.item, slot);
    }
}

fn unequip_item_system(
    mut events: EventReader<UnequipItemEvent>,
    mut q_owner: Query<(&mut Bag, &mut GearComponent)>,
) {
    for event in events.read() {
        let Ok((mut bag, mut gear)) = q_owner.get_mut(event.owner) else {
            continue;
        };
        if let Some(item) = gear.gear.remove(&event.slot) {
            bag.items.push(item);
            debug!("{:?} unequipped {:?}", event.owner, item);
        }
    }
}

/// Consumables add their life and mana to the owner's base values, capped by
/// the owner's total maximum.
fn use_item_system(
    mut commands: Commands,
    mut events: EventReader<UseItemEvent>,
    mut pool: ResMut<ComponentPool<StatsComponent>>,
    mut q_bags: Query<&mut Bag>,
    q_items: Query<&ItemComponent>,
    mut stats: ParamSet<(StatsLookup, Query<&mut StatsComponent>)>,
) {
    for event in events.read() {
        let Ok(mut bag) = q_bags.get_mut(event.owner) else { continue };
        let Some(position) = bag.items.iter().position(|e| *e == event.item) else {
            warn!("Item {:?} is not in the bag of {:?}", event.item, event.owner);
            continue;
        };
        let Ok(item) = q_items.get(event.item) else { continue };
        if item.gear_type.is_some() {
            info!("{} is not a consumable", item.name);
            continue;
        }

        let (max_life, max_mana, life, mana) = {
            let lookup = stats.p0();
            let Some(item_stats) = lookup.stats(event.item) else { continue };
            (
                lookup.total_stat_value(event.owner, StatsType::MaxLife),
                lookup.total_stat_value(event.owner, StatsType::MaxMana),
                item_stats.get(StatsType::Life),
                item_stats.get(StatsType::Mana),
            )
        };

        let mut q_stats = stats.p1();
        let Ok(mut owner) = q_stats.get_mut(event.owner) else { continue };
        let new_life = (owner.get(StatsType::Life) + life).min(max_life);
        let new_mana = (owner.get(StatsType::Mana) + mana).min(max_mana);
        owner.set(StatsType::Life, new_life);
        owner.set(StatsType::Mana, new_mana);

        if let Ok(mut item_stats) = q_stats.get_mut(event.item) {
            pool.release(std::mem::take(&mut *item_stats));
        }
        bag.items.remove(position);
        commands.entity(event.item).despawn_recursive();
        info!("{:?} used {}", event.owner, item.name);
    }
}

/// One line per stat, formatted as `base (+gear)`.
pub fn stats_summary(stats: &dyn StatsSource, entity: Entity) -> Vec<String> {
    let base = stats.stats_cmp(entity);
    StatsType::ALL
        .iter()
        .map(|stat| {
            let base_value = base.get(*stat);
            let bonus = stats.total_stat_value(entity, *stat) - base_value;
            if bonus == 0.0 {
                format!("{}: {:.0}", stat.label(), base_value)
            } else {
                format!("{}: {:.0} ({:+.0})", stat.label(), base_value, bonus)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_summary_shows_gear_bonus() {
        let mut world = World::new();
        let sword = world
            .spawn(StatsComponent::default().with(StatsType::Strength, 3.0))
            .id();
        let mut gear = GearComponent::default();
        gear.gear.insert(GearType::Weapon, sword);
        let hero = world
            .spawn((StatsComponent::default().with(StatsType::Strength, 5.0), gear))
            .id();

        let lines = stats_summary(&world, hero);
        assert_eq!(lines.len(), StatsType::ALL.len());
        assert!(lines.contains(&"Strength: 5 (+3)".to_string()));
        assert!(lines.contains(&"Agility: 0".to_string()));
    }
}
