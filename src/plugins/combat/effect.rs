use bevy::prelude::*;

use crate::plugins::settings::CombatSettings;
use crate::plugins::stats::{StatsComponent, StatsSource, StatsType};

const ATTACK_DURATION: f32 = 0.5;
const DEFEND_DURATION: f32 = 0.25;
const HEAL_DURATION: f32 = 0.6;
const FIREBOLT_DURATION: f32 = 0.8;
const HEAL_BASE: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatAiType {
    Undefined,
    Offensive,
    Defensive,
    Supportive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Undefined,
    NoTarget,
    SingleTarget,
}

/// Incoming damage is reduced while this is present. Removed when the owner's
/// next turn begins.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Defending;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatAnimation {
    Attack,
    Defend,
    Cast,
    Hit,
    Death,
}

/// Feedback for the presentation layer and the combat log.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatCue {
    OrderStarted { source: Entity, effect: CombatOrderEffect },
    OrderEnded { source: Entity, effect: CombatOrderEffect },
    Animation { entity: Entity, animation: CombatAnimation },
    Damage { source: Entity, target: Entity, amount: f32 },
    Heal { source: Entity, target: Entity, amount: f32 },
    ManaSpent { entity: Entity, amount: f32 },
    Defeated { entity: Entity },
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct CombatCueEvent(pub CombatCue);

/// Transient data of the order an entity is currently executing.
#[derive(Debug, Clone)]
pub struct CombatOrder {
    pub source: Entity,
    pub targets: Vec<Entity>,
    pub elapsed: f32,
    pub cues: Vec<CombatCue>,
}

impl Default for CombatOrder {
    fn default() -> Self {
        Self {
            source: Entity::PLACEHOLDER,
            targets: Vec::new(),
            elapsed: 0.0,
            cues: Vec::new(),
        }
    }
}

impl CombatOrder {
    /// Prepares the order for a new command. Cues that were not flushed yet
    /// survive so a pre-empted start is still reported.
    pub(crate) fn restart(&mut self, source: Entity, targets: &[Entity]) {
        self.source = source;
        self.targets.clear();
        self.targets.extend_from_slice(targets);
        self.elapsed = 0.0;
    }

    pub fn cue(&mut self, cue: CombatCue) {
        self.cues.push(cue);
    }

    pub fn reset(&mut self) {
        self.source = Entity::PLACEHOLDER;
        self.targets.clear();
        self.elapsed = 0.0;
        self.cues.clear();
    }

    fn tick(&mut self, delta: f32, duration: f32) -> bool {
        self.elapsed += delta;
        self.elapsed >= duration
    }
}

/// Every selectable combat action. `Undefined` is the idle sentinel every
/// combatant starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombatOrderEffect {
    #[default]
    Undefined,
    Attack,
    Defend,
    Heal,
    Firebolt,
}

impl CombatOrderEffect {
    pub const ALL: [CombatOrderEffect; 5] = [
        CombatOrderEffect::Undefined,
        CombatOrderEffect::Attack,
        CombatOrderEffect::Defend,
        CombatOrderEffect::Heal,
        CombatOrderEffect::Firebolt,
    ];

    pub fn ai_type(self) -> CombatAiType {
        match self {
            CombatOrderEffect::Undefined => CombatAiType::Undefined,
            CombatOrderEffect::Attack | CombatOrderEffect::Firebolt => CombatAiType::Offensive,
            CombatOrderEffect::Defend => CombatAiType::Defensive,
            CombatOrderEffect::Heal => CombatAiType::Supportive,
        }
    }

    pub fn mana_cost(self) -> u32 {
        match self {
            CombatOrderEffect::Undefined | CombatOrderEffect::Attack | CombatOrderEffect::Defend => 0,
            CombatOrderEffect::Heal => 3,
            CombatOrderEffect::Firebolt => 5,
        }
    }

    pub fn target_type(self) -> TargetType {
        match self {
            CombatOrderEffect::Undefined => TargetType::Undefined,
            CombatOrderEffect::Defend => TargetType::NoTarget,
            CombatOrderEffect::Attack | CombatOrderEffect::Heal | CombatOrderEffect::Firebolt => {
                TargetType::SingleTarget
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CombatOrderEffect::Undefined => "nothing",
            CombatOrderEffect::Attack => "Attack",
            CombatOrderEffect::Defend => "Defend",
            CombatOrderEffect::Heal => "Heal",
            CombatOrderEffect::Firebolt => "Firebolt",
        }
    }

    /// Called once when the order is issued.
    pub fn start(self, order: &mut CombatOrder) {
        let animation = match self {
            CombatOrderEffect::Undefined => return,
            CombatOrderEffect::Attack => CombatAnimation::Attack,
            CombatOrderEffect::Defend => CombatAnimation::Defend,
            CombatOrderEffect::Heal | CombatOrderEffect::Firebolt => CombatAnimation::Cast,
        };
        let entity = order.source;
        order.cue(CombatCue::Animation { entity, animation });
    }

    /// Polled every tick while the order is active. Returns `true` once the
    /// order has finished resolving.
    pub fn update(self, order: &mut CombatOrder, delta: f32) -> bool {
        match self {
            CombatOrderEffect::Undefined => true,
            CombatOrderEffect::Attack => order.tick(delta, ATTACK_DURATION),
            CombatOrderEffect::Defend => order.tick(delta, DEFEND_DURATION),
            CombatOrderEffect::Heal => order.tick(delta, HEAL_DURATION),
            CombatOrderEffect::Firebolt => order.tick(delta, FIREBOLT_DURATION),
        }
    }

    /// Called once on completion and commits the stat mutations.
    pub fn end(self, order: &mut CombatOrder, world: &mut World) {
        match self {
            CombatOrderEffect::Undefined => return,
            CombatOrderEffect::Attack => {
                for target in live_targets(order, world) {
                    let raw = world.total_stat_value(order.source, StatsType::PhysicalDamage)
                        + world.total_stat_value(order.source, StatsType::Strength);
                    let armor = world.total_stat_value(target, StatsType::PhysicalArmor);
                    deal_damage(order, world, target, raw, armor);
                }
            }
            CombatOrderEffect::Firebolt => {
                for target in live_targets(order, world) {
                    let raw = world.total_stat_value(order.source, StatsType::MagicDamage)
                        + world.total_stat_value(order.source, StatsType::Intelligence);
                    let armor = world.total_stat_value(target, StatsType::MagicArmor);
                    deal_damage(order, world, target, raw, armor);
                }
            }
            CombatOrderEffect::Heal => {
                for target in live_targets(order, world) {
                    let amount = HEAL_BASE + world.total_stat_value(order.source, StatsType::Intelligence);
                    let max_life = world.total_stat_value(target, StatsType::MaxLife);
                    let healed = {
                        let mut stats = stats_cmp_mut(world, target);
                        let life = stats.get(StatsType::Life);
                        let new_life = (life + amount).min(max_life).max(life);
                        stats.set(StatsType::Life, new_life);
                        new_life - life
                    };
                    order.cue(CombatCue::Heal { source: order.source, target, amount: healed });
                }
            }
            CombatOrderEffect::Defend => {
                let source = order.source;
                world.entity_mut(source).insert(Defending);
            }
        }
        spend_mana(order, world, self.mana_cost());
    }

    /// Called when the order slot goes back to the pool.
    pub fn reset(self, order: &mut CombatOrder) {
        order.reset();
    }
}

/// Damage formula: `2 * raw - defense` when the hit pierces, `raw² / defense`
/// otherwise.
pub fn calculate_final_damage(raw: f32, defense: f32) -> f32 {
    if raw >= defense {
        (2.0 * raw - defense).max(0.0)
    } else if defense > 0.0 {
        (raw * raw) / defense
    } else {
        0.0
    }
}

/// Targets that still exist. Despawned handles are skipped, a living target
/// without stats is a wiring bug and panics further down.
fn live_targets(order: &CombatOrder, world: &World) -> Vec<Entity> {
    order
        .targets
        .iter()
        .copied()
        .filter(|target| {
            let alive = world.entities().contains(*target);
            if !alive {
                debug!("Skipping despawned combat target {:?}", target);
            }
            alive
        })
        .collect()
}

fn stats_cmp_mut(world: &mut World, entity: Entity) -> Mut<'_, StatsComponent> {
    world
        .get_mut::<StatsComponent>(entity)
        .unwrap_or_else(|| panic!("StatsComponent for entity '{entity:?}' is null"))
}

fn deal_damage(order: &mut CombatOrder, world: &mut World, target: Entity, raw: f32, armor: f32) {
    let mut damage = calculate_final_damage(raw, armor);
    if world.get::<Defending>(target).is_some() {
        let factor = world
            .get_resource::<CombatSettings>()
            .map_or(CombatSettings::default().defend_damage_factor, |s| s.defend_damage_factor);
        damage *= factor;
    }

    let mut stats = stats_cmp_mut(world, target);
    let life = stats.get(StatsType::Life);
    stats.set(StatsType::Life, (life - damage).max(0.0));

    order.cue(CombatCue::Animation { entity: target, animation: CombatAnimation::Hit });
    order.cue(CombatCue::Damage { source: order.source, target, amount: damage });
}

fn spend_mana(order: &mut CombatOrder, world: &mut World, cost: u32) {
    if cost == 0 {
        return;
    }
    let mut stats = stats_cmp_mut(world, order.source);
    let mana = stats.get(StatsType::Mana);
    stats.set(StatsType::Mana, (mana - cost as f32).max(0.0));
    order.cue(CombatCue::ManaSpent { entity: order.source, amount: cost as f32 });
}
