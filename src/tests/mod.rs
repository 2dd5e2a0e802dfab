
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

use crate::plugins::ai::AiPlugin;
use crate::plugins::combat::CombatPlugin;
use crate::plugins::core::{CorePlugin, GameState};
use crate::plugins::inventory::InventoryPlugin;
use crate::plugins::items::ItemsPlugin;
use crate::plugins::screen::ScreenPlugin;
use crate::plugins::settings::CombatSettings;
use crate::plugins::shop::ShopPlugin;
use crate::plugins::stats::StatsPlugin;

/// Headless app with every gameplay plugin and a fixed 100ms tick.
pub(crate) fn test_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(bevy::state::app::StatesPlugin);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)));
    app.insert_resource(CombatSettings {
        turn_delay: 0.0,
        rng_seed: Some(42),
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
    ));

    // AssetLoading -> Dungeon
    for _ in 0..3 {
        app.update();
    }
    assert_eq!(state(&app), GameState::Dungeon);
    app
}

pub(crate) fn state(app: &App) -> GameState {
    *app.world().resource::<State<GameState>>().get()
}
