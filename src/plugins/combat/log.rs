//! Combat logging
//!
//! Turns combat cues into readable lines for the HUD and for tests.

use bevy::prelude::*;

use super::effect::{CombatCue, CombatCueEvent};

#[derive(Debug, Clone)]
pub struct CombatLogEntry {
    pub kind: CombatLogKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatLogKind {
    OrderStarted,
    OrderEnded,
    Damage,
    Healing,
    Mana,
    Death,
    Encounter,
}

#[derive(Resource, Default)]
pub struct CombatLog {
    pub entries: Vec<CombatLogEntry>,
}

impl CombatLog {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn log(&mut self, kind: CombatLogKind, message: String) {
        self.entries.push(CombatLogEntry { kind, message });
    }

    pub fn filter_by_kind(&self, kind: CombatLogKind) -> Vec<&CombatLogEntry> {
        self.entries.iter().filter(|e| e.kind == kind).collect()
    }

    /// The last `count` messages, oldest first.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &str> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries[skip..].iter().map(|e| e.message.as_str())
    }
}

pub(super) fn record_combat_log(
    mut events: EventReader<CombatCueEvent>,
    mut log: ResMut<CombatLog>,
    names: Query<&Name>,
) {
    let name = |entity: Entity| {
        names
            .get(entity)
            .map(|n| n.as_str().to_string())
            .unwrap_or_else(|_| format!("{entity:?}"))
    };

    for CombatCueEvent(cue) in events.read() {
        match cue {
            CombatCue::OrderStarted { source, effect } => log.log(
                CombatLogKind::OrderStarted,
                format!("{} prepares {}", name(*source), effect.name()),
            ),
            CombatCue::OrderEnded { source, effect } => log.log(
                CombatLogKind::OrderEnded,
                format!("{} finishes {}", name(*source), effect.name()),
            ),
            CombatCue::Damage { source, target, amount } => log.log(
                CombatLogKind::Damage,
                format!("{} hits {} for {:.0}", name(*source), name(*target), amount),
            ),
            CombatCue::Heal { source, target, amount } => log.log(
                CombatLogKind::Healing,
                format!("{} heals {} for {:.0}", name(*source), name(*target), amount),
            ),
            CombatCue::ManaSpent { entity, amount } => log.log(
                CombatLogKind::Mana,
                format!("{} spends {:.0} mana", name(*entity), amount),
            ),
            CombatCue::Defeated { entity } => {
                log.log(CombatLogKind::Death, format!("{} is defeated", name(*entity)))
            }
            CombatCue::Animation { .. } => {}
        }
    }
}
