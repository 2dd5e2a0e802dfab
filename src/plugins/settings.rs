//! Combat tuning loaded from `settings.ron`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSettings {
    /// Seconds between two turns so the player can follow the fight.
    pub turn_delay: f32,
    /// Incoming damage multiplier while an entity is defending.
    pub defend_damage_factor: f32,
    /// Fixed seed for AI and shop randomness, entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            turn_delay: 0.4,
            defend_damage_factor: 0.5,
            rng_seed: None,
        }
    }
}

impl CombatSettings {
    fn settings_path() -> PathBuf {
        PathBuf::from("settings.ron")
    }

    /// Reads `settings.ron`, falling back to defaults.
    pub fn load() -> Self {
        let path = Self::settings_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => Self::from_ron(&contents).unwrap_or_else(|e| {
                    warn!("Failed to parse settings file: {}", e);
                    Self::default()
                }),
                Err(e) => {
                    warn!("Failed to read settings file: {}", e);
                    Self::default()
                }
            }
        } else {
            info!("No settings file found, using defaults");
            Self::default()
        }
    }

    pub fn from_ron(contents: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings = CombatSettings::from_ron("(rng_seed: Some(42))").unwrap();
        assert_eq!(settings.rng_seed, Some(42));
        assert_eq!(settings.defend_damage_factor, 0.5);
        assert_eq!(settings.turn_delay, 0.4);
    }

    #[test]
    fn test_malformed_settings_are_rejected() {
        assert!(CombatSettings::from_ron("(turn_delay: \"slow\")").is_err());
    }
}
