use bevy::prelude::*;

use crypt_crawler::plugins::ai::AiPlugin;
use crypt_crawler::plugins::combat::CombatPlugin;
use crypt_crawler::plugins::core::CorePlugin;
use crypt_crawler::plugins::dungeon::DungeonPlugin;
use crypt_crawler::plugins::inventory::InventoryPlugin;
use crypt_crawler::plugins::items::ItemsPlugin;
use crypt_crawler::plugins::screen::ScreenPlugin;
use crypt_crawler::plugins::settings::CombatSettings;
use crypt_crawler::plugins::shop::ShopPlugin;
use crypt_crawler::plugins::stats::StatsPlugin;
use crypt_crawler::plugins::ui::UiPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        // settings must exist before CombatPlugin seeds its rng
        .insert_resource(CombatSettings::load())
        .add_plugins(CorePlugin)
        .add_plugins(StatsPlugin)
        .add_plugins(ItemsPlugin)
        .add_plugins(InventoryPlugin)
        .add_plugins(ShopPlugin)
        .add_plugins(CombatPlugin)
        .add_plugins(AiPlugin)
        .add_plugins(ScreenPlugin)
        .add_plugins(DungeonPlugin)
        .add_plugins(UiPlugin)
        .add_systems(Startup, setup)
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d::default());
    info!("Crypt Crawler is starting...");
}
