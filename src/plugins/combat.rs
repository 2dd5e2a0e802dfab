use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;

use crate::plugins::core::{GameState, Player};
use crate::plugins::inventory::Gold;
use crate::plugins::pool::{ComponentPool, Poolable};
use crate::plugins::screen::{ScreenContext, ScreenType, SetScreen};
use crate::plugins::settings::CombatSettings;
use crate::plugins::stats::{StatsComponent, StatsLookup, StatsSource, StatsType};

pub mod effect;
pub mod log;

pub use effect::{
    calculate_final_damage, CombatAiType, CombatAnimation, CombatCue, CombatCueEvent, CombatOrder,
    CombatOrderEffect, Defending, TargetType,
};
pub use log::{CombatLog, CombatLogEntry, CombatLogKind};

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CombatSettings>()
            .init_resource::<CombatRng>()
            .init_resource::<CombatEncounter>()
            .init_resource::<CombatLog>()
            .init_resource::<ComponentPool<CombatComponent>>()
            .init_resource::<ComponentPool<StatsComponent>>()
            .add_event::<CombatCueEvent>()
            .add_event::<PlayerCommandEvent>()
            .configure_sets(
                Update,
                (
                    CombatSet::Turn,
                    CombatSet::Decide,
                    CombatSet::Resolve,
                    CombatSet::Outcome,
                    CombatSet::Feedback,
                )
                    .chain()
                    .run_if(in_state(GameState::Combat)),
            )
            .add_systems(OnEnter(GameState::Combat), start_encounter)
            .add_systems(OnExit(GameState::Combat), end_encounter)
            .add_systems(Update, (
                advance_turn.in_set(CombatSet::Turn),
                apply_player_commands.in_set(CombatSet::Decide),
                resolve_combat_orders.in_set(CombatSet::Resolve),
                (apply_defeats, check_encounter_outcome).chain().in_set(CombatSet::Outcome),
                (flush_combat_cues, log::record_combat_log).chain().in_set(CombatSet::Feedback),
            ));
    }
}

/// Fixed per-tick order: turn bookkeeping, decisions, order resolution,
/// stat consequences, feedback.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CombatSet {
    Turn,
    Decide,
    Resolve,
    Outcome,
    Feedback,
}

#[derive(Resource)]
pub struct CombatRng(pub StdRng);

impl FromWorld for CombatRng {
    fn from_world(world: &mut World) -> Self {
        let seed = world.get_resource::<CombatSettings>().and_then(|s| s.rng_seed);
        match seed {
            Some(seed) => CombatRng(StdRng::seed_from_u64(seed)),
            None => CombatRng(StdRng::from_entropy()),
        }
    }
}

/// Compile-time selection of an effect for [`CombatComponent::new_command`].
pub trait CombatCommand {
    const EFFECT: CombatOrderEffect;
}

pub struct CommandAttack;
pub struct CommandDefend;
pub struct CommandHeal;
pub struct CommandFirebolt;

impl CombatCommand for CommandAttack {
    const EFFECT: CombatOrderEffect = CombatOrderEffect::Attack;
}

impl CombatCommand for CommandDefend {
    const EFFECT: CombatOrderEffect = CombatOrderEffect::Defend;
}

impl CombatCommand for CommandHeal {
    const EFFECT: CombatOrderEffect = CombatOrderEffect::Heal;
}

impl CombatCommand for CommandFirebolt {
    const EFFECT: CombatOrderEffect = CombatOrderEffect::Firebolt;
}

/// The single active order slot of a combatant.
#[derive(Component, Debug, Default)]
pub struct CombatComponent {
    pub effect: CombatOrderEffect,
    pub order: CombatOrder,
}

impl CombatComponent {
    pub fn order_targets(&self) -> &[Entity] {
        &self.order.targets
    }

    pub fn is_active(&self) -> bool {
        self.effect != CombatOrderEffect::Undefined
    }

    /// Makes `effect` the active order and runs its `start` hook.
    ///
    /// Rejected without side effects when the source lacks mana or the target
    /// list does not fit the effect. An already active order is overwritten
    /// and its `end` hook never runs.
    pub fn issue(
        &mut self,
        effect: CombatOrderEffect,
        source: Entity,
        stats: &StatsComponent,
        targets: &[Entity],
    ) -> bool {
        if stats.get(StatsType::Mana) < effect.mana_cost() as f32 {
            return false;
        }
        let targets: &[Entity] = match effect.target_type() {
            TargetType::Undefined => return false,
            TargetType::NoTarget => &[],
            TargetType::SingleTarget if targets.len() == 1 => targets,
            TargetType::SingleTarget => return false,
        };

        self.effect = effect;
        self.order.restart(source, targets);
        self.order.cue(CombatCue::OrderStarted { source, effect });
        effect.start(&mut self.order);
        true
    }

    pub fn new_command<T: CombatCommand>(
        &mut self,
        source: Entity,
        stats: &StatsComponent,
        target: Entity,
    ) -> bool {
        self.issue(T::EFFECT, source, stats, &[target])
    }

    /// For effects that need no target.
    pub fn add_command<T: CombatCommand>(&mut self, source: Entity, stats: &StatsComponent) -> bool {
        self.issue(T::EFFECT, source, stats, &[])
    }
}

impl Poolable for CombatComponent {
    fn reset(&mut self) {
        self.effect.reset(&mut self.order);
        self.effect = CombatOrderEffect::Undefined;
    }
}

/// Marks a combatant whose life dropped to zero.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Defeated;

/// Gold handed to the player for defeating this entity.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Loot {
    pub gold: u32,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct PlayerCommandEvent {
    pub effect: CombatOrderEffect,
    pub target: Option<Entity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterOutcome {
    Victory,
    Defeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub entity: Entity,
    pub decided: bool,
}

#[derive(Resource, Default, Debug)]
pub struct CombatEncounter {
    pub player_side: Vec<Entity>,
    pub enemy_side: Vec<Entity>,
    pub turn_queue: VecDeque<Entity>,
    pub turn: Option<Turn>,
    pub round: u32,
    pub cooldown: f32,
    pub outcome: Option<EncounterOutcome>,
}

impl CombatEncounter {
    pub fn combatants(&self) -> impl Iterator<Item = Entity> + '_ {
        self.player_side.iter().chain(self.enemy_side.iter()).copied()
    }

    pub fn allies_of(&self, entity: Entity) -> &[Entity] {
        if self.player_side.contains(&entity) {
            &self.player_side
        } else {
            &self.enemy_side
        }
    }

    pub fn opponents_of(&self, entity: Entity) -> &[Entity] {
        if self.player_side.contains(&entity) {
            &self.enemy_side
        } else {
            &self.player_side
        }
    }

    pub fn is_turn_of(&self, entity: Entity) -> bool {
        self.turn.is_some_and(|turn| turn.entity == entity)
    }
}

fn start_encounter(
    mut commands: Commands,
    context: Res<ScreenContext>,
    mut encounter: ResMut<CombatEncounter>,
    mut pool: ResMut<ComponentPool<CombatComponent>>,
    mut log: ResMut<CombatLog>,
    groups: Query<&EnemyGroup>,
    q_fighters: Query<(), With<StatsComponent>>,
) {
    *encounter = CombatEncounter::default();
    log.clear();

    let (Some(player), Some(enemy)) = (context.player, context.enemy) else {
        error!("Combat started without a player and an enemy");
        return;
    };
    if !q_fighters.contains(player) || !q_fighters.contains(enemy) {
        error!("Combat started against {:?} which cannot fight", enemy);
        return;
    }

    encounter.player_side.push(player);
    encounter.enemy_side.push(enemy);
    if let Ok(group) = groups.get(enemy) {
        // members slain in an earlier fight are gone
        encounter.enemy_side.extend(
            group
                .0
                .iter()
                .copied()
                .filter(|e| *e != enemy && q_fighters.contains(*e)),
        );
    }

    let combatants: Vec<Entity> = encounter.combatants().collect();
    for entity in combatants {
        commands.entity(entity).insert(pool.acquire());
    }

    info!(
        "Combat starts: {} vs {} enemies",
        encounter.player_side.len(),
        encounter.enemy_side.len()
    );
    log.log(CombatLogKind::Encounter, "Combat starts".to_string());
}

/// Additional enemies that join when the owner is engaged.
#[derive(Component, Debug, Default, Clone)]
pub struct EnemyGroup(pub Vec<Entity>);

fn end_encounter(
    mut commands: Commands,
    mut encounter: ResMut<CombatEncounter>,
    mut combat_pool: ResMut<ComponentPool<CombatComponent>>,
    mut stats_pool: ResMut<ComponentPool<StatsComponent>>,
    mut q_combat: Query<&mut CombatComponent>,
    mut q_stats: Query<&mut StatsComponent>,
    mut q_groups: Query<&mut EnemyGroup>,
    q_defeated: Query<(), With<Defeated>>,
) {
    let players = encounter.player_side.clone();
    let slain: Vec<Entity> = encounter
        .enemy_side
        .iter()
        .copied()
        .filter(|e| q_defeated.contains(*e))
        .collect();
    for mut group in q_groups.iter_mut() {
        group.0.retain(|member| !slain.contains(member));
    }

    for entity in encounter.combatants().collect::<Vec<_>>() {
        if let Ok(mut combat) = q_combat.get_mut(entity) {
            combat_pool.release(std::mem::take(&mut *combat));
        }
        let Some(mut entity_commands) = commands.get_entity(entity) else {
            continue;
        };
        entity_commands.remove::<(CombatComponent, Defending)>();

        if players.contains(&entity) {
            entity_commands.remove::<Defeated>();
        } else if q_defeated.contains(entity) {
            if let Ok(mut stats) = q_stats.get_mut(entity) {
                stats_pool.release(std::mem::take(&mut *stats));
            }
            entity_commands.despawn_recursive();
        }
    }

    debug!("Combat ended after {} rounds", encounter.round);
    *encounter = CombatEncounter::default();
}

fn advance_turn(
    mut commands: Commands,
    time: Res<Time>,
    settings: Res<CombatSettings>,
    mut encounter: ResMut<CombatEncounter>,
    stats: StatsLookup,
    q_combat: Query<&CombatComponent>,
    q_defeated: Query<(), With<Defeated>>,
) {
    if encounter.outcome.is_some() {
        return;
    }

    if let Some(turn) = encounter.turn {
        let order_running = q_combat.get(turn.entity).is_ok_and(|c| c.is_active());
        let finished = q_defeated.contains(turn.entity) || (turn.decided && !order_running);
        if !finished {
            return;
        }
        encounter.turn = None;
        encounter.cooldown = settings.turn_delay;
    }

    if encounter.cooldown > 0.0 {
        encounter.cooldown -= time.delta_secs();
        return;
    }

    let is_ready = |entity: &Entity| q_combat.contains(*entity) && !q_defeated.contains(*entity);

    let next = loop {
        match encounter.turn_queue.pop_front() {
            Some(entity) if is_ready(&entity) => break Some(entity),
            Some(_) => continue,
            None => {
                let mut order: Vec<Entity> = encounter.combatants().filter(is_ready).collect();
                if order.is_empty() {
                    break None;
                }
                // stable sort keeps player side first on equal agility
                order.sort_by(|a, b| {
                    let agility_a = stats.total_stat_value(*a, StatsType::Agility);
                    let agility_b = stats.total_stat_value(*b, StatsType::Agility);
                    agility_b.total_cmp(&agility_a)
                });
                encounter.round += 1;
                debug!("Combat round {} starts", encounter.round);
                encounter.turn_queue.extend(order);
            }
        }
    };

    if let Some(entity) = next {
        commands.entity(entity).remove::<Defending>();
        encounter.turn = Some(Turn { entity, decided: false });
        debug!("Turn of {:?}", entity);
    }
}

fn apply_player_commands(
    mut events: EventReader<PlayerCommandEvent>,
    mut encounter: ResMut<CombatEncounter>,
    stats: StatsLookup,
    q_player: Query<Entity, With<Player>>,
    q_defeated: Query<(), With<Defeated>>,
    mut q_combat: Query<&mut CombatComponent>,
) {
    for event in events.read() {
        let Some(turn) = encounter.turn else { continue };
        if !q_player.contains(turn.entity) {
            continue;
        }
        let player = turn.entity;
        let Ok(mut combat) = q_combat.get_mut(player) else { continue };

        let target = event.target.or_else(|| match event.effect.ai_type() {
            CombatAiType::Offensive => encounter
                .opponents_of(player)
                .iter()
                .copied()
                .find(|e| !q_defeated.contains(*e)),
            _ => Some(player),
        });
        let targets: Vec<Entity> = target.into_iter().collect();

        if combat.issue(event.effect, player, stats.stats_cmp(player), &targets) {
            if let Some(turn) = encounter.turn.as_mut() {
                turn.decided = true;
            }
        }
    }
}

/// Polls every active order and finishes those that are done.
pub fn resolve_combat_orders(world: &mut World) {
    let delta = world.resource::<Time>().delta_secs();

    let mut q_active = world.query::<(Entity, &CombatComponent)>();
    let active: Vec<Entity> = q_active
        .iter(world)
        .filter(|(_, combat)| combat.is_active())
        .map(|(entity, _)| entity)
        .collect();

    for entity in active {
        let Some(mut combat) = world.get_mut::<CombatComponent>(entity) else {
            continue;
        };
        let effect = combat.effect;
        if !effect.update(&mut combat.order, delta) {
            continue;
        }

        let mut order = std::mem::take(&mut combat.order);
        combat.effect = CombatOrderEffect::Undefined;

        effect.end(&mut order, world);
        order.cue(CombatCue::OrderEnded { source: entity, effect });
        world.send_event_batch(order.cues.drain(..).map(CombatCueEvent));

        effect.reset(&mut order);
        if let Some(mut combat) = world.get_mut::<CombatComponent>(entity) {
            // a command issued during `end` keeps its own order
            if !combat.is_active() {
                combat.order = order;
            }
        }
    }
}

fn apply_defeats(
    mut commands: Commands,
    encounter: Res<CombatEncounter>,
    q_stats: Query<&StatsComponent, Without<Defeated>>,
    mut cues: EventWriter<CombatCueEvent>,
) {
    for entity in encounter.combatants() {
        let Ok(stats) = q_stats.get(entity) else { continue };
        if stats.get(StatsType::Life) <= 0.0 {
            commands.entity(entity).insert(Defeated);
            cues.send(CombatCueEvent(CombatCue::Animation { entity, animation: CombatAnimation::Death }));
            cues.send(CombatCueEvent(CombatCue::Defeated { entity }));
        }
    }
}

fn check_encounter_outcome(
    mut commands: Commands,
    mut encounter: ResMut<CombatEncounter>,
    mut next_state: ResMut<NextState<GameState>>,
    mut log: ResMut<CombatLog>,
    q_alive: Query<(), (With<StatsComponent>, Without<Defeated>)>,
    q_loot: Query<&Loot>,
    mut q_gold: Query<&mut Gold>,
) {
    if encounter.outcome.is_some() || encounter.player_side.is_empty() {
        return;
    }
    let side_defeated = |side: &[Entity]| side.iter().all(|e| !q_alive.contains(*e));

    if side_defeated(&encounter.enemy_side[..]) {
        let gold: u32 = encounter
            .enemy_side
            .iter()
            .filter_map(|e| q_loot.get(*e).ok())
            .map(|loot| loot.gold)
            .sum();
        let player = encounter.player_side[0];
        if let Ok(mut wallet) = q_gold.get_mut(player) {
            wallet.0 += gold;
        }

        info!("Victory! Looted {} gold", gold);
        log.log(CombatLogKind::Encounter, format!("Victory! Looted {gold} gold"));
        encounter.outcome = Some(EncounterOutcome::Victory);
        commands.entity(player).insert(SetScreen::new(ScreenType::Dungeon));
    } else if side_defeated(&encounter.player_side[..]) {
        info!("Defeat!");
        log.log(CombatLogKind::Encounter, "Defeat!".to_string());
        encounter.outcome = Some(EncounterOutcome::Defeat);
        next_state.set(GameState::GameOver);
    }
}

/// Cues raised by `start` hooks sit on the order until this runs.
fn flush_combat_cues(mut q_combat: Query<&mut CombatComponent>, mut cues: EventWriter<CombatCueEvent>) {
    for mut combat in q_combat.iter_mut() {
        if combat.order.cues.is_empty() {
            continue;
        }
        cues.send_batch(combat.order.cues.drain(..).map(CombatCueEvent));
    }
}
