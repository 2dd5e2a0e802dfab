use bevy::prelude::*;

use crate::plugins::combat::{CombatEncounter, CombatLog, CombatOrderEffect, Defeated, PlayerCommandEvent};
use crate::plugins::core::{Enemy, GameState, Player};
use crate::plugins::inventory::{
    stats_summary, Bag, EquipItemEvent, Gold, InventorySelection, UnequipItemEvent, UseItemEvent,
};
use crate::plugins::items::{ItemComponent, ItemDatabase};
use crate::plugins::screen::{Interact, ScreenType, SetScreen};
use crate::plugins::shop::{BuyItemEvent, ShopComponent};
use crate::plugins::stats::{GearComponent, GearType, StatsLookup, StatsSource, StatsType};

const LOG_LINES: usize = 8;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_hud)
            .add_systems(Update, update_hud)
            .add_systems(Update, dungeon_input.run_if(in_state(GameState::Dungeon)))
            .add_systems(Update, combat_input.run_if(in_state(GameState::Combat)))
            .add_systems(Update, inventory_input.run_if(in_state(GameState::Inventory)))
            .add_systems(Update, shop_input.run_if(in_state(GameState::Shop)));
    }
}

// Marker components
#[derive(Component)] struct StateText;
#[derive(Component)] struct StatsText;
#[derive(Component)] struct DetailText;

fn spawn_hud(mut commands: Commands) {
    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                justify_content: JustifyContent::SpaceBetween,
                flex_direction: FlexDirection::Column,
                ..default()
            },
            PickingBehavior::IGNORE,
        ))
        .with_children(|parent| {
            // Top Bar
            parent
                .spawn((
                    Node {
                        width: Val::Percent(100.0),
                        height: Val::Px(40.0),
                        align_items: AlignItems::Center,
                        padding: UiRect::horizontal(Val::Px(10.0)),
                        justify_content: JustifyContent::SpaceBetween,
                        ..default()
                    },
                    BackgroundColor(Color::srgb(0.0, 0.0, 0.0).with_alpha(0.8)),
                ))
                .with_children(|top_bar| {
                    top_bar.spawn((
                        Text::new("Loading"),
                        TextFont { font_size: 20.0, ..default() },
                        TextColor(Color::WHITE),
                        StateText,
                    ));
                    top_bar.spawn((
                        Text::new(""),
                        TextFont { font_size: 20.0, ..default() },
                        TextColor(Color::srgb(1.0, 0.84, 0.0)),
                        StatsText,
                    ));
                });

            parent.spawn((
                Text::new(""),
                TextFont { font_size: 16.0, ..default() },
                TextColor(Color::srgb(0.85, 0.85, 0.85)),
                Node {
                    padding: UiRect::all(Val::Px(10.0)),
                    ..default()
                },
                DetailText,
            ));
        });
}

#[allow(clippy::too_many_arguments)]
fn update_hud(
    state: Res<State<GameState>>,
    log: Res<CombatLog>,
    encounter: Res<CombatEncounter>,
    selection: Res<InventorySelection>,
    item_db: Res<ItemDatabase>,
    stats: StatsLookup,
    q_player: Query<(Entity, &Gold, &Bag, &GearComponent), With<Player>>,
    q_shops: Query<&ShopComponent>,
    q_names: Query<&Name>,
    mut q_state: Query<&mut Text, (With<StateText>, Without<StatsText>, Without<DetailText>)>,
    mut q_stats: Query<&mut Text, (With<StatsText>, Without<StateText>, Without<DetailText>)>,
    mut q_detail: Query<&mut Text, (With<DetailText>, Without<StateText>, Without<StatsText>)>,
) {
    let Ok((player, gold, bag, gear)) = q_player.get_single() else { return };
    let name = |entity: Entity| {
        q_names
            .get(entity)
            .map(|n| n.as_str().to_string())
            .unwrap_or_else(|_| format!("{entity:?}"))
    };

    let state_line = match state.get() {
        GameState::AssetLoading => "Loading".to_string(),
        GameState::Dungeon => "Dungeon  [C] fight  [I] inventory  [S] shop".to_string(),
        GameState::Inventory => "Inventory  [Up/Down] select  [Space] use/equip  [Esc] back".to_string(),
        GameState::Combat => format!(
            "Combat round {}  [A] attack  [D] defend  [H] heal  [F] firebolt",
            encounter.round
        ),
        GameState::Shop => "Shop  [1-5] buy  [Esc] back".to_string(),
        GameState::GameOver => "Game over".to_string(),
    };
    for mut text in q_state.iter_mut() {
        *text = Text::new(state_line.clone());
    }

    if let Some(player_stats) = stats.stats(player) {
        let stats_line = format!(
            "Life {:.0}/{:.0} | Mana {:.0}/{:.0} | Gold {}",
            player_stats.get(StatsType::Life),
            stats.total_stat_value(player, StatsType::MaxLife),
            player_stats.get(StatsType::Mana),
            stats.total_stat_value(player, StatsType::MaxMana),
            gold.0
        );
        for mut text in q_stats.iter_mut() {
            *text = Text::new(stats_line.clone());
        }
    }

    let detail = match state.get() {
        GameState::Combat => {
            let mut lines: Vec<String> = encounter
                .combatants()
                .filter_map(|e| {
                    let life = stats.stats(e)?.get(StatsType::Life);
                    let marker = if encounter.is_turn_of(e) { ">" } else { " " };
                    Some(format!("{marker} {} ({:.0} life)", name(e), life))
                })
                .collect();
            lines.push(String::new());
            lines.extend(log.tail(LOG_LINES).map(str::to_string));
            lines.join("\n")
        }
        GameState::Inventory => {
            let mut lines = stats_summary(&stats, player);
            lines.push(String::new());
            let entries = inventory_entries(bag, gear);
            for (i, entry) in entries.iter().enumerate() {
                let cursor = if i == selection.index { ">" } else { " " };
                let label = match entry {
                    InventoryEntry::Bag(item) => name(*item),
                    InventoryEntry::Equipped(slot, item) => format!("[{:?}] {}", slot, name(*item)),
                };
                lines.push(format!("{cursor} {label}"));
            }
            lines.join("\n")
        }
        GameState::Shop => q_shops
            .iter()
            .next()
            .map(|shop| {
                shop.offers
                    .iter()
                    .enumerate()
                    .map(|(i, offer)| {
                        let item_name = item_db
                            .get(&offer.item_id)
                            .map_or(offer.item_id.as_str(), |def| def.name.as_str());
                        format!("{}. {} - {}g", i + 1, item_name, offer.price)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default(),
        GameState::GameOver => log.tail(LOG_LINES).collect::<Vec<_>>().join("\n"),
        _ => String::new(),
    };
    for mut text in q_detail.iter_mut() {
        *text = Text::new(detail.clone());
    }
}

fn dungeon_input(
    mut commands: Commands,
    input: Res<ButtonInput<KeyCode>>,
    mut q_player: Query<(Entity, &mut Interact), With<Player>>,
    q_enemies: Query<Entity, (With<Enemy>, Without<Defeated>)>,
    q_shops: Query<Entity, With<ShopComponent>>,
) {
    let Ok((player, mut interact)) = q_player.get_single_mut() else { return };

    if input.just_pressed(KeyCode::KeyC) {
        let Some(enemy) = q_enemies.iter().next() else {
            info!("The dungeon is quiet. No enemies left.");
            return;
        };
        interact.last_interact_entity = Some(enemy);
        commands.entity(player).insert(SetScreen::new(ScreenType::Combat));
    } else if input.just_pressed(KeyCode::KeyI) {
        commands.entity(player).insert(SetScreen::new(ScreenType::Inventory));
    } else if input.just_pressed(KeyCode::KeyS) {
        if let Some(shop) = q_shops.iter().next() {
            commands.entity(player).insert(SetScreen::with_data(ScreenType::Shop, shop));
        }
    }
}

fn combat_input(input: Res<ButtonInput<KeyCode>>, mut commands_out: EventWriter<PlayerCommandEvent>) {
    let bindings = [
        (KeyCode::KeyA, CombatOrderEffect::Attack),
        (KeyCode::KeyD, CombatOrderEffect::Defend),
        (KeyCode::KeyH, CombatOrderEffect::Heal),
        (KeyCode::KeyF, CombatOrderEffect::Firebolt),
    ];
    for (key, effect) in bindings {
        if input.just_pressed(key) {
            commands_out.send(PlayerCommandEvent { effect, target: None });
        }
    }
}

enum InventoryEntry {
    Bag(Entity),
    Equipped(GearType, Entity),
}

fn inventory_entries(bag: &Bag, gear: &GearComponent) -> Vec<InventoryEntry> {
    let mut entries: Vec<InventoryEntry> = bag.items.iter().map(|e| InventoryEntry::Bag(*e)).collect();
    entries.extend(
        GearType::ALL
            .iter()
            .filter_map(|slot| gear.gear.get(slot).map(|item| InventoryEntry::Equipped(*slot, *item))),
    );
    entries
}

fn inventory_input(
    mut commands: Commands,
    input: Res<ButtonInput<KeyCode>>,
    mut selection: ResMut<InventorySelection>,
    q_player: Query<(Entity, &Bag, &GearComponent), With<Player>>,
    q_items: Query<&ItemComponent>,
    mut equip: EventWriter<EquipItemEvent>,
    mut unequip: EventWriter<UnequipItemEvent>,
    mut use_item: EventWriter<UseItemEvent>,
) {
    let Ok((player, bag, gear)) = q_player.get_single() else { return };
    let entries = inventory_entries(bag, gear);

    if input.just_pressed(KeyCode::Escape) {
        selection.index = 0;
        commands.entity(player).insert(SetScreen::new(ScreenType::Dungeon));
        return;
    }
    if entries.is_empty() {
        return;
    }
    if input.just_pressed(KeyCode::ArrowDown) {
        selection.index = (selection.index + 1) % entries.len();
    }
    if input.just_pressed(KeyCode::ArrowUp) {
        selection.index = (selection.index + entries.len() - 1) % entries.len();
    }
    selection.index = selection.index.min(entries.len() - 1);

    if input.just_pressed(KeyCode::Space) {
        match entries[selection.index] {
            InventoryEntry::Bag(item) => {
                let is_gear = q_items.get(item).is_ok_and(|i| i.gear_type.is_some());
                if is_gear {
                    equip.send(EquipItemEvent { owner: player, item });
                } else {
                    use_item.send(UseItemEvent { owner: player, item });
                }
            }
            InventoryEntry::Equipped(slot, _) => {
                unequip.send(UnequipItemEvent { owner: player, slot });
            }
        }
    }
}

fn shop_input(
    mut commands: Commands,
    input: Res<ButtonInput<KeyCode>>,
    q_player: Query<Entity, With<Player>>,
    q_shops: Query<Entity, With<ShopComponent>>,
    mut buy: EventWriter<BuyItemEvent>,
) {
    let Ok(player) = q_player.get_single() else { return };

    if input.just_pressed(KeyCode::Escape) {
        commands.entity(player).insert(SetScreen::new(ScreenType::Dungeon));
        return;
    }
    let Some(shop) = q_shops.iter().next() else { return };

    let keys = [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3, KeyCode::Digit4, KeyCode::Digit5];
    for (slot_index, key) in keys.into_iter().enumerate() {
        if input.just_pressed(key) {
            buy.send(BuyItemEvent { buyer: player, shop, slot_index });
        }
    }
}
