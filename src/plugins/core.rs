use bevy::prelude::*;

pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
           .add_systems(OnEnter(GameState::AssetLoading), finish_loading)
           .add_systems(OnEnter(GameState::GameOver), setup_game_over_ui)
           .add_systems(OnExit(GameState::GameOver), cleanup_game_over_ui)
           .add_systems(Update, game_over_input_system.run_if(in_state(GameState::GameOver)));
    }
}

/// Marks the entity controlled by the keyboard.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Player;

/// Marks hostile dungeon dwellers that can be fought.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Enemy;

#[derive(Component)]
struct GameOverUi;

fn finish_loading(mut next_state: ResMut<NextState<GameState>>) {
    info!("Content embedded at compile time. Transitioning to Dungeon.");
    next_state.set(GameState::Dungeon);
}

fn setup_game_over_ui(mut commands: Commands) {
    commands.spawn((
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            flex_direction: FlexDirection::Column,
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.9)),
        GameOverUi,
    )).with_children(|parent| {
        parent.spawn((
            Text::new("GAME OVER"),
            TextFont { font_size: 40.0, ..default() },
            TextColor(Color::srgb(1.0, 0.0, 0.0)),
        ));
        parent.spawn((
            Text::new("Press R to Restart"),
            TextFont { font_size: 20.0, ..default() },
            TextColor(Color::WHITE),
        ));
    });
}

fn cleanup_game_over_ui(mut commands: Commands, q_ui: Query<Entity, With<GameOverUi>>) {
    for entity in q_ui.iter() {
        commands.entity(entity).despawn_recursive();
    }
}

fn game_over_input_system(
    input: Option<Res<ButtonInput<KeyCode>>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(input) = input else { return };
    if input.just_pressed(KeyCode::KeyR) {
        next_state.set(GameState::Dungeon);
    }
}

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
   #[default]
   AssetLoading,
   Dungeon,               // Exploration, tile map lives outside this crate
   Inventory,
   Combat,
   Shop,
   GameOver,
}
