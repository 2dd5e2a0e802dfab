use bevy::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;

use crate::plugins::pool::ComponentPool;
use crate::plugins::stats::{GearType, StatsComponent, StatsType};

const ITEMS_RON: &str = include_str!("../../assets/items.ron");

#[derive(Resource, Default)]
pub struct ItemDatabase {
    pub items: HashMap<String, ItemDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemDefinition {
    pub id: String,
    pub name: String,
    /// Slot the item equips into. Items without one are consumed on use.
    #[serde(default)]
    pub gear_type: Option<GearType>,
    #[serde(default)]
    pub stats: HashMap<StatsType, f32>,
    #[serde(default)]
    pub price: u32,
}

impl ItemDatabase {
    pub fn from_ron(contents: &str) -> Result<Self, ron::error::SpannedError> {
        let definitions: Vec<ItemDefinition> = ron::from_str(contents)?;
        let items = definitions
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect();
        Ok(Self { items })
    }

    /// The item table bundled with the binary. A broken table leaves the
    /// database empty.
    pub fn load() -> Self {
        match Self::from_ron(ITEMS_RON) {
            Ok(db) => {
                info!("ItemDatabase loaded with {} items.", db.items.len());
                db
            }
            Err(e) => {
                error!("Failed to parse item table: {}", e);
                Self::default()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&ItemDefinition> {
        self.items.get(id)
    }
}

/// Identity of an item entity. Its stat bonuses live in a sibling
/// [`StatsComponent`].
#[derive(Component, Debug, Clone)]
pub struct ItemComponent {
    pub id: String,
    pub name: String,
    pub gear_type: Option<GearType>,
}

pub struct ItemsPlugin;

impl Plugin for ItemsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ItemDatabase::load());
    }
}

/// Spawns a loose item entity. Its stats component comes from the pool.
pub fn spawn_item(
    commands: &mut Commands,
    def: &ItemDefinition,
    pool: &mut ComponentPool<StatsComponent>,
) -> Entity {
    let mut stats = pool.acquire();
    for (stat, value) in &def.stats {
        stats.set(*stat, *value);
    }

    commands
        .spawn((
            Name::new(def.name.clone()),
            ItemComponent {
                id: def.id.clone(),
                name: def.name.clone(),
                gear_type: def.gear_type,
            },
            stats,
        ))
        .id()
}
