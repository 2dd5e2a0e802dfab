//! The dungeon shell around combat: who lives here and what happens when the
//! player gets back up after a defeat.

use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::collections::HashMap;

use crate::plugins::ai::{BehaviorDef, CombatAIComponent, TaskLibrary};
use crate::plugins::combat::{EnemyGroup, Loot};
use crate::plugins::core::{Enemy, GameState, Player};
use crate::plugins::inventory::{Bag, Gold};
use crate::plugins::items::ItemDatabase;
use crate::plugins::pool::ComponentPool;
use crate::plugins::screen::Interact;
use crate::plugins::settings::CombatSettings;
use crate::plugins::shop::ShopComponent;
use crate::plugins::stats::{GearComponent, StatsComponent, StatsLookup, StatsSource, StatsType};

const ENEMIES_RON: &str = include_str!("../../assets/enemies.ron");

pub const STARTING_GOLD: u32 = 20;

pub struct DungeonPlugin;

impl Plugin for DungeonPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(EnemyDatabase::load())
            .init_resource::<TaskLibrary>()
            .init_resource::<ComponentPool<StatsComponent>>()
            .add_systems(Startup, spawn_dungeon)
            .add_systems(OnExit(GameState::GameOver), revive_player);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnemyTemplate {
    pub name: String,
    pub stats: HashMap<StatsType, f32>,
    pub behavior: BehaviorDef,
    #[serde(default)]
    pub gold: u32,
    /// Templates of the enemies fighting alongside this one.
    #[serde(default)]
    pub group: Vec<String>,
}

/// Enemy templates keyed by name, plus the order the dungeon is populated in.
#[derive(Resource, Debug, Default)]
pub struct EnemyDatabase {
    pub templates: HashMap<String, EnemyTemplate>,
    pub roster: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EnemyFile {
    templates: Vec<EnemyTemplate>,
    roster: Vec<String>,
}

impl EnemyDatabase {
    pub fn from_ron(contents: &str) -> Result<Self, ron::error::SpannedError> {
        let file: EnemyFile = ron::from_str(contents)?;
        let templates = file
            .templates
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        Ok(Self {
            templates,
            roster: file.roster,
        })
    }

    pub fn load() -> Self {
        match Self::from_ron(ENEMIES_RON) {
            Ok(db) => {
                info!("EnemyDatabase loaded with {} templates.", db.templates.len());
                db
            }
            Err(e) => {
                error!("Failed to parse enemy table: {}", e);
                Self::default()
            }
        }
    }
}

pub fn player_stats() -> StatsComponent {
    StatsComponent::default()
        .with(StatsType::Life, 40.0)
        .with(StatsType::MaxLife, 40.0)
        .with(StatsType::Mana, 12.0)
        .with(StatsType::MaxMana, 12.0)
        .with(StatsType::Strength, 4.0)
        .with(StatsType::Agility, 5.0)
        .with(StatsType::Intelligence, 3.0)
        .with(StatsType::PhysicalDamage, 2.0)
        .with(StatsType::MagicDamage, 2.0)
        .with(StatsType::PhysicalArmor, 2.0)
        .with(StatsType::MagicArmor, 2.0)
}

pub fn spawn_player(commands: &mut Commands) -> Entity {
    commands
        .spawn((
            Name::new("Hero"),
            Player,
            player_stats(),
            GearComponent::default(),
            Bag::default(),
            Gold(STARTING_GOLD),
            Interact::default(),
        ))
        .id()
}

/// Spawns one enemy from its template, without its group.
pub fn spawn_enemy(
    commands: &mut Commands,
    template: &EnemyTemplate,
    library: &TaskLibrary,
    pool: &mut ComponentPool<StatsComponent>,
) -> Entity {
    let mut stats = pool.acquire();
    for (stat, value) in &template.stats {
        stats.set(*stat, *value);
    }

    commands
        .spawn((
            Name::new(template.name.clone()),
            stats,
            CombatAIComponent::new(template.behavior.build(library)),
            Loot { gold: template.gold },
        ))
        .id()
}

fn spawn_dungeon(
    mut commands: Commands,
    enemy_db: Res<EnemyDatabase>,
    item_db: Res<ItemDatabase>,
    settings: Option<Res<CombatSettings>>,
    library: Res<TaskLibrary>,
    mut pool: ResMut<ComponentPool<StatsComponent>>,
) {
    spawn_player(&mut commands);

    let mut rng = match settings.and_then(|s| s.rng_seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    commands.spawn((Name::new("Merchant"), ShopComponent::stocked(&item_db, &mut rng)));

    for name in &enemy_db.roster {
        let Some(template) = enemy_db.templates.get(name) else {
            warn!("Roster names unknown enemy {}", name);
            continue;
        };
        let leader = spawn_enemy(&mut commands, template, &library, &mut pool);
        commands.entity(leader).insert(Enemy);

        let group: Vec<Entity> = template
            .group
            .iter()
            .filter_map(|member| enemy_db.templates.get(member))
            .map(|member| spawn_enemy(&mut commands, member, &library, &mut pool))
            .collect();
        if !group.is_empty() {
            commands.entity(leader).insert(EnemyGroup(group));
        }
    }

    info!("Dungeon populated with {} enemy groups", enemy_db.roster.len());
}

fn revive_player(
    stats: StatsLookup,
    q_player: Query<Entity, With<Player>>,
    mut commands: Commands,
) {
    for player in q_player.iter() {
        let mut revived = stats.stats_cmp(player).clone();
        revived.set(StatsType::Life, stats.total_stat_value(player, StatsType::MaxLife));
        revived.set(StatsType::Mana, stats.total_stat_value(player, StatsType::MaxMana));
        commands.entity(player).insert(revived);
        info!("The hero gets back up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::ai::AiTaskKind;

    #[test]
    fn test_bundled_enemy_table_parses() {
        let db = EnemyDatabase::from_ron(ENEMIES_RON).unwrap();
        assert!(!db.roster.is_empty());
        for name in &db.roster {
            let template = db.templates.get(name).unwrap();
            assert!(template.stats[&StatsType::Life] > 0.0);
            for member in &template.group {
                assert!(db.templates.contains_key(member));
            }
        }
    }

    #[test]
    fn test_template_defaults() {
        let db = EnemyDatabase::from_ron(
            r#"(
                templates: [(name: "Rat", stats: { Life: 3.0 }, behavior: Task(Attack))],
                roster: ["Rat"],
            )"#,
        )
        .unwrap();
        let rat = &db.templates["Rat"];
        assert_eq!(rat.gold, 0);
        assert!(rat.group.is_empty());
        assert_eq!(rat.behavior, BehaviorDef::Task(AiTaskKind::Attack));
    }
}
