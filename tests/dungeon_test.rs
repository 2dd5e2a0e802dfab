use bevy::prelude::*;
use crypt_crawler::plugins::ai::{AiPlugin, CombatAIComponent};
use crypt_crawler::plugins::combat::{CombatPlugin, EnemyGroup};
use crypt_crawler::plugins::core::{CorePlugin, Enemy, GameState, Player};
use crypt_crawler::plugins::dungeon::{DungeonPlugin, EnemyDatabase, STARTING_GOLD};
use crypt_crawler::plugins::inventory::{Gold, InventoryPlugin};
use crypt_crawler::plugins::items::ItemsPlugin;
use crypt_crawler::plugins::screen::ScreenPlugin;
use crypt_crawler::plugins::settings::CombatSettings;
use crypt_crawler::plugins::shop::{ShopComponent, ShopPlugin, SHOP_SIZE};
use crypt_crawler::plugins::stats::{StatsComponent, StatsPlugin, StatsType};

fn setup() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(bevy::state::app::StatesPlugin);
    app.insert_resource(CombatSettings {
        rng_seed: Some(5),
        ..default()
    });
    app.add_plugins((
        CorePlugin,
        StatsPlugin,
        ItemsPlugin,
        InventoryPlugin,
        ShopPlugin,
        CombatPlugin,
        AiPlugin,
        ScreenPlugin,
        DungeonPlugin,
    ));
    for _ in 0..3 {
        app.update();
    }
    app
}

fn set_state(app: &mut App, state: GameState) {
    app.world_mut().resource_mut::<NextState<GameState>>().set(state);
    app.update();
}

#[test]
fn test_dungeon_is_populated_on_startup() {
    let mut app = setup();
    let world = app.world_mut();

    let gold = *world.query_filtered::<&Gold, With<Player>>().single(world);
    assert_eq!(gold, Gold(STARTING_GOLD));

    let roster_len = world.resource::<EnemyDatabase>().roster.len();
    let leaders = world.query_filtered::<Entity, With<Enemy>>().iter(world).count();
    assert_eq!(leaders, roster_len);

    // every leader and every group member can think for itself
    let mut q_groups = world.query::<&EnemyGroup>();
    let members: Vec<Entity> = q_groups.iter(world).flat_map(|g| g.0.clone()).collect();
    assert!(!members.is_empty());
    for member in members {
        assert!(world.get::<CombatAIComponent>(member).is_some());
    }

    let shop = world.query::<&ShopComponent>().single(world);
    assert_eq!(shop.offers.len(), SHOP_SIZE);
}

#[test]
fn test_restart_revives_player() {
    let mut app = setup();
    let player = app
        .world_mut()
        .query_filtered::<Entity, With<Player>>()
        .single(app.world());

    {
        let mut stats = app.world_mut().get_mut::<StatsComponent>(player).unwrap();
        stats.set(StatsType::Life, 0.0);
        stats.set(StatsType::Mana, 1.0);
    }

    set_state(&mut app, GameState::GameOver);
    set_state(&mut app, GameState::Dungeon);

    let stats = app.world().get::<StatsComponent>(player).unwrap();
    assert_eq!(stats.get(StatsType::Life), stats.get(StatsType::MaxLife));
    assert_eq!(stats.get(StatsType::Mana), stats.get(StatsType::MaxMana));
    assert!(stats.get(StatsType::Life) > 0.0);
}
