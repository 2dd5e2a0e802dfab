use bevy::prelude::*;

use crate::plugins::core::GameState;
use crate::plugins::shop::ShopComponent;

pub struct ScreenPlugin;

impl Plugin for ScreenPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScreenContext>()
            .add_systems(Update, set_screen_system);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenType {
    Dungeon,
    Inventory,
    Combat,
    Shop,
}

impl ScreenType {
    pub fn game_state(&self) -> GameState {
        match self {
            ScreenType::Dungeon => GameState::Dungeon,
            ScreenType::Inventory => GameState::Inventory,
            ScreenType::Combat => GameState::Combat,
            ScreenType::Shop => GameState::Shop,
        }
    }
}

/// Request to switch screens, placed on the entity the screen is about.
#[derive(Component, Debug, Clone, Copy)]
pub struct SetScreen {
    pub screen_type: ScreenType,
    pub screen_data: Option<Entity>,
}

impl SetScreen {
    pub fn new(screen_type: ScreenType) -> Self {
        Self { screen_type, screen_data: None }
    }

    pub fn with_data(screen_type: ScreenType, data: Entity) -> Self {
        Self { screen_type, screen_data: Some(data) }
    }
}

/// Remembers what the player touched last, e.g. the enemy that started a fight.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Interact {
    pub last_interact_entity: Option<Entity>,
}

/// Entities the active screen works with.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct ScreenContext {
    pub player: Option<Entity>,
    pub enemy: Option<Entity>,
    pub shop: Option<Entity>,
}

fn set_screen_system(
    mut commands: Commands,
    mut context: ResMut<ScreenContext>,
    mut next_state: ResMut<NextState<GameState>>,
    q_requests: Query<(Entity, &SetScreen, Option<&Interact>)>,
    q_shops: Query<(), With<ShopComponent>>,
) {
    for (entity, request, interact) in q_requests.iter() {
        commands.entity(entity).remove::<SetScreen>();
        let next_screen = request.screen_type;

        match next_screen {
            ScreenType::Dungeon | ScreenType::Inventory => {
                context.player = Some(entity);
            }
            ScreenType::Combat => {
                let Some(enemy) = interact.and_then(|i| i.last_interact_entity) else {
                    error!("Unsupported screen request: combat for {:?} without an enemy", entity);
                    continue;
                };
                context.player = Some(entity);
                context.enemy = Some(enemy);
            }
            ScreenType::Shop => {
                let Some(shop) = request.screen_data.filter(|shop| q_shops.contains(*shop)) else {
                    error!(
                        "Unsupported screen request: shop for {:?} with data {:?}",
                        entity, request.screen_data
                    );
                    continue;
                };
                context.player = Some(entity);
                context.shop = Some(shop);
            }
        }

        debug!("Switching to screen {:?}", next_screen);
        next_state.set(next_screen.game_state());
    }
}
