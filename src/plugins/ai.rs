//! Behavior-tree driven combat decisions for non-player combatants.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;

use crate::plugins::combat::{CombatComponent, CombatEncounter, CombatRng, CombatSet, Defeated};
use crate::plugins::stats::{StatsLookup, StatsSource, StatsType};

pub mod task;

pub use task::{life_ratio, AttackTask, DefendTask, FireboltTask, HealTask, LeafTask};

pub struct AiPlugin;

impl Plugin for AiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TaskLibrary>()
            .add_systems(Update, run_combat_ai.in_set(CombatSet::Decide));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Succeeded,
    Failed,
    Running,
}

/// Everything a task may look at or change while deciding.
pub struct AiContext<'a> {
    pub entity: Entity,
    pub combat: &'a mut CombatComponent,
    pub ai: &'a CombatAIComponent,
    pub stats: &'a dyn StatsSource,
    pub rng: &'a mut StdRng,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum AiCondition {
    /// Own life below this fraction of max life.
    LifeBelow(f32),
    ManaAtLeast(f32),
    /// Some live ally (self included) below this fraction of max life.
    AllyLifeBelow(f32),
    Chance(f64),
}

impl AiCondition {
    pub fn check(&self, ctx: &mut AiContext) -> bool {
        match *self {
            AiCondition::LifeBelow(fraction) => life_ratio(ctx.stats, ctx.entity) < fraction,
            AiCondition::ManaAtLeast(mana) => {
                ctx.stats.stats_cmp(ctx.entity).get(StatsType::Mana) >= mana
            }
            AiCondition::AllyLifeBelow(fraction) => ctx
                .ai
                .allies
                .iter()
                .any(|ally| life_ratio(ctx.stats, *ally) < fraction),
            AiCondition::Chance(probability) => ctx.rng.gen_bool(probability.clamp(0.0, 1.0)),
        }
    }
}

#[derive(Clone)]
pub enum BehaviorNode {
    /// First child that does not fail wins.
    Selector(Vec<BehaviorNode>),
    /// Runs children until one does not succeed.
    Sequence(Vec<BehaviorNode>),
    /// Selector over a shuffled child order.
    RandomSelector(Vec<BehaviorNode>),
    Condition(AiCondition),
    Leaf(Arc<dyn LeafTask>),
}

impl BehaviorNode {
    pub fn execute(&self, ctx: &mut AiContext) -> Status {
        match self {
            BehaviorNode::Selector(children) => select(children.iter(), ctx),
            BehaviorNode::RandomSelector(children) => {
                let mut shuffled: Vec<&BehaviorNode> = children.iter().collect();
                shuffled.shuffle(ctx.rng);
                select(shuffled.into_iter(), ctx)
            }
            BehaviorNode::Sequence(children) => {
                for child in children {
                    match child.execute(ctx) {
                        Status::Succeeded => continue,
                        status => return status,
                    }
                }
                Status::Succeeded
            }
            BehaviorNode::Condition(condition) => {
                if condition.check(ctx) {
                    Status::Succeeded
                } else {
                    Status::Failed
                }
            }
            BehaviorNode::Leaf(task) => task.execute(ctx),
        }
    }
}

fn select<'n>(children: impl Iterator<Item = &'n BehaviorNode>, ctx: &mut AiContext) -> Status {
    for child in children {
        match child.execute(ctx) {
            Status::Failed => continue,
            status => return status,
        }
    }
    Status::Failed
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTaskKind {
    Attack,
    Defend,
    Heal,
    Firebolt,
}

/// Serializable tree shape, as written in the enemy templates.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum BehaviorDef {
    Selector(Vec<BehaviorDef>),
    Sequence(Vec<BehaviorDef>),
    RandomSelector(Vec<BehaviorDef>),
    Condition(AiCondition),
    Task(AiTaskKind),
}

impl BehaviorDef {
    pub fn build(&self, library: &TaskLibrary) -> BehaviorNode {
        let build_all = |defs: &[BehaviorDef]| -> Vec<BehaviorNode> {
            defs.iter().map(|d| d.build(library)).collect()
        };
        match self {
            BehaviorDef::Selector(children) => BehaviorNode::Selector(build_all(&children[..])),
            BehaviorDef::Sequence(children) => BehaviorNode::Sequence(build_all(&children[..])),
            BehaviorDef::RandomSelector(children) => BehaviorNode::RandomSelector(build_all(&children[..])),
            BehaviorDef::Condition(condition) => BehaviorNode::Condition(*condition),
            BehaviorDef::Task(kind) => BehaviorNode::Leaf(library.task(*kind)),
        }
    }

    pub fn from_ron(contents: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(contents)
    }
}

/// One shared instance per leaf task kind.
#[derive(Resource, Clone)]
pub struct TaskLibrary {
    attack: Arc<dyn LeafTask>,
    defend: Arc<dyn LeafTask>,
    heal: Arc<dyn LeafTask>,
    firebolt: Arc<dyn LeafTask>,
}

impl Default for TaskLibrary {
    fn default() -> Self {
        Self {
            attack: Arc::new(AttackTask),
            defend: Arc::new(DefendTask),
            heal: Arc::new(HealTask),
            firebolt: Arc::new(FireboltTask),
        }
    }
}

impl TaskLibrary {
    pub fn task(&self, kind: AiTaskKind) -> Arc<dyn LeafTask> {
        match kind {
            AiTaskKind::Attack => self.attack.clone(),
            AiTaskKind::Defend => self.defend.clone(),
            AiTaskKind::Heal => self.heal.clone(),
            AiTaskKind::Firebolt => self.firebolt.clone(),
        }
    }
}

#[derive(Component, Clone)]
pub struct CombatAIComponent {
    pub tree: BehaviorNode,
    /// Live opponents, refreshed right before every decision.
    pub opponents: Vec<Entity>,
    /// Live allies including the owner.
    pub allies: Vec<Entity>,
}

impl CombatAIComponent {
    pub fn new(tree: BehaviorNode) -> Self {
        Self {
            tree,
            opponents: Vec::new(),
            allies: Vec::new(),
        }
    }

    pub fn random_opponent(&self, rng: &mut StdRng) -> Option<Entity> {
        self.opponents.choose(rng).copied()
    }
}

fn run_combat_ai(
    mut encounter: ResMut<CombatEncounter>,
    mut rng: ResMut<CombatRng>,
    stats: StatsLookup,
    q_defeated: Query<(), With<Defeated>>,
    mut q_ai: Query<(&mut CombatComponent, &mut CombatAIComponent)>,
) {
    let Some(turn) = encounter.turn else { return };
    if turn.decided {
        return;
    }
    let entity = turn.entity;
    let Ok((mut combat, mut ai)) = q_ai.get_mut(entity) else {
        // the player decides through input
        return;
    };

    let alive = |side: &[Entity]| -> Vec<Entity> {
        side.iter().copied().filter(|e| !q_defeated.contains(*e)).collect()
    };
    ai.opponents = alive(encounter.opponents_of(entity));
    ai.allies = alive(encounter.allies_of(entity));
    if let Some(turn) = encounter.turn.as_mut() {
        turn.decided = true;
    }
    if ai.opponents.is_empty() {
        return;
    }

    let ai = &*ai;
    let mut ctx = AiContext {
        entity,
        combat: &mut *combat,
        ai,
        stats: &stats,
        rng: &mut rng.0,
    };
    let status = ai.tree.execute(&mut ctx);
    debug!("AI {:?} decided {} ({:?})", entity, combat.effect.name(), status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::combat::CombatOrderEffect;
    use crate::plugins::stats::StatsComponent;
    use rand::SeedableRng;

    fn fighter(world: &mut World, life: f32, max_life: f32, mana: f32) -> Entity {
        world
            .spawn(
                StatsComponent::default()
                    .with(StatsType::Life, life)
                    .with(StatsType::MaxLife, max_life)
                    .with(StatsType::Mana, mana),
            )
            .id()
    }

    fn decide(
        world: &World,
        tree: BehaviorNode,
        entity: Entity,
        allies: Vec<Entity>,
        opponents: Vec<Entity>,
        seed: u64,
    ) -> (Status, CombatComponent) {
        let mut ai = CombatAIComponent::new(tree);
        ai.allies = allies;
        ai.opponents = opponents;
        let mut combat = CombatComponent::default();
        let mut rng = StdRng::seed_from_u64(seed);

        let status = {
            let mut ctx = AiContext {
                entity,
                combat: &mut combat,
                ai: &ai,
                stats: world,
                rng: &mut rng,
            };
            ai.tree.execute(&mut ctx)
        };
        (status, combat)
    }

    fn tree(ron: &str) -> BehaviorNode {
        BehaviorDef::from_ron(ron).unwrap().build(&TaskLibrary::default())
    }

    #[test]
    fn test_selector_falls_through_failed_branch() {
        let mut world = World::new();
        let me = fighter(&mut world, 10.0, 10.0, 0.0);
        let foe = fighter(&mut world, 10.0, 10.0, 0.0);
        let behavior = "Selector([Sequence([Condition(LifeBelow(0.3)), Task(Defend)]), Task(Attack)])";

        let (status, combat) = decide(&world, tree(behavior), me, vec![me], vec![foe], 1);
        assert_eq!(status, Status::Succeeded);
        assert_eq!(combat.effect, CombatOrderEffect::Attack);
        assert_eq!(combat.order_targets(), &[foe]);

        world.get_mut::<StatsComponent>(me).unwrap().set(StatsType::Life, 2.0);
        let (status, combat) = decide(&world, tree(behavior), me, vec![me], vec![foe], 1);
        assert_eq!(status, Status::Succeeded);
        assert_eq!(combat.effect, CombatOrderEffect::Defend);
    }

    #[test]
    fn test_sequence_stops_at_first_failure() {
        let mut world = World::new();
        let me = fighter(&mut world, 10.0, 10.0, 2.0);
        let foe = fighter(&mut world, 10.0, 10.0, 0.0);

        let (status, combat) = decide(
            &world,
            tree("Sequence([Condition(ManaAtLeast(5.0)), Task(Firebolt)])"),
            me,
            vec![me],
            vec![foe],
            1,
        );
        assert_eq!(status, Status::Failed);
        assert!(!combat.is_active());
    }

    #[test]
    fn test_empty_composites() {
        let mut world = World::new();
        let me = fighter(&mut world, 10.0, 10.0, 0.0);

        let (status, _) = decide(&world, BehaviorNode::Selector(Vec::new()), me, vec![me], Vec::new(), 1);
        assert_eq!(status, Status::Failed);
        let (status, _) = decide(&world, BehaviorNode::Sequence(Vec::new()), me, vec![me], Vec::new(), 1);
        assert_eq!(status, Status::Succeeded);
    }

    #[test]
    fn test_random_selector_skips_failing_children() {
        let mut world = World::new();
        let me = fighter(&mut world, 10.0, 10.0, 0.0);
        let foe = fighter(&mut world, 10.0, 10.0, 0.0);

        for seed in 0..16 {
            let (status, combat) = decide(
                &world,
                tree("RandomSelector([Condition(Chance(0.0)), Task(Defend), Condition(Chance(0.0))])"),
                me,
                vec![me],
                vec![foe],
                seed,
            );
            assert_eq!(status, Status::Succeeded);
            assert_eq!(combat.effect, CombatOrderEffect::Defend);
        }

        let (status, _) = decide(
            &world,
            tree("RandomSelector([Condition(Chance(0.0)), Condition(Chance(0.0))])"),
            me,
            vec![me],
            vec![foe],
            3,
        );
        assert_eq!(status, Status::Failed);
    }

    #[test]
    fn test_conditions() {
        let mut world = World::new();
        let me = fighter(&mut world, 9.0, 10.0, 4.0);
        let wounded = fighter(&mut world, 3.0, 10.0, 0.0);
        let no_max = fighter(&mut world, 1.0, 0.0, 0.0);

        let check = |condition: &str, allies: Vec<Entity>, entity: Entity| {
            decide(&world, tree(&format!("Condition({condition})")), entity, allies, Vec::new(), 5).0
        };

        assert_eq!(check("LifeBelow(0.95)", vec![me], me), Status::Succeeded);
        assert_eq!(check("LifeBelow(0.9)", vec![me], me), Status::Failed);
        // no max life counts as unhurt
        assert_eq!(check("LifeBelow(0.5)", vec![no_max], no_max), Status::Failed);

        assert_eq!(check("ManaAtLeast(4.0)", vec![me], me), Status::Succeeded);
        assert_eq!(check("ManaAtLeast(4.5)", vec![me], me), Status::Failed);

        assert_eq!(check("AllyLifeBelow(0.5)", vec![me], me), Status::Failed);
        assert_eq!(check("AllyLifeBelow(0.5)", vec![me, wounded], me), Status::Succeeded);

        assert_eq!(check("Chance(1.0)", vec![me], me), Status::Succeeded);
        assert_eq!(check("Chance(0.0)", vec![me], me), Status::Failed);
    }

    #[test]
    fn test_heal_task_picks_most_wounded_ally() {
        let mut world = World::new();
        let me = fighter(&mut world, 10.0, 10.0, 3.0);
        let hurt = fighter(&mut world, 5.0, 10.0, 0.0);
        let worst = fighter(&mut world, 4.0, 20.0, 0.0);
        let foe = fighter(&mut world, 10.0, 10.0, 0.0);

        let (status, combat) =
            decide(&world, tree("Task(Heal)"), me, vec![me, hurt, worst], vec![foe], 1);
        assert_eq!(status, Status::Succeeded);
        assert_eq!(combat.effect, CombatOrderEffect::Heal);
        assert_eq!(combat.order_targets(), &[worst]);
    }

    #[test]
    fn test_spell_tasks_fail_without_mana() {
        let mut world = World::new();
        let me = fighter(&mut world, 10.0, 10.0, 2.0);
        let hurt = fighter(&mut world, 1.0, 10.0, 0.0);
        let foe = fighter(&mut world, 10.0, 10.0, 0.0);

        let (status, combat) = decide(&world, tree("Task(Heal)"), me, vec![me, hurt], vec![foe], 1);
        assert_eq!(status, Status::Failed);
        assert!(!combat.is_active());

        let (status, combat) = decide(&world, tree("Task(Firebolt)"), me, vec![me], vec![foe], 1);
        assert_eq!(status, Status::Failed);
        assert!(!combat.is_active());
    }

    #[test]
    fn test_firebolt_task_targets_an_opponent() {
        let mut world = World::new();
        let me = fighter(&mut world, 10.0, 10.0, 5.0);
        let foe = fighter(&mut world, 10.0, 10.0, 0.0);

        let (status, combat) = decide(&world, tree("Task(Firebolt)"), me, vec![me], vec![foe], 1);
        assert_eq!(status, Status::Succeeded);
        assert_eq!(combat.effect, CombatOrderEffect::Firebolt);
        assert_eq!(combat.order_targets(), &[foe]);
    }

    #[test]
    fn test_priest_without_mana_falls_back_to_melee() {
        let mut world = World::new();
        let priest = fighter(&mut world, 18.0, 18.0, 2.0);
        let wounded = fighter(&mut world, 3.0, 22.0, 0.0);
        let hero = fighter(&mut world, 40.0, 40.0, 0.0);
        let behavior = "Selector([
            Sequence([Condition(AllyLifeBelow(0.5)), Task(Heal)]),
            Sequence([Condition(ManaAtLeast(5.0)), Task(Firebolt)]),
            RandomSelector([Task(Attack), Task(Defend)]),
        ])";

        for seed in 0..8 {
            let (status, combat) =
                decide(&world, tree(behavior), priest, vec![priest, wounded], vec![hero], seed);
            assert_eq!(status, Status::Succeeded);
            assert!(matches!(
                combat.effect,
                CombatOrderEffect::Attack | CombatOrderEffect::Defend
            ));
        }

        // with mana the same tree heals the wounded ally
        world.get_mut::<StatsComponent>(priest).unwrap().set(StatsType::Mana, 5.0);
        let (_, combat) = decide(&world, tree(behavior), priest, vec![priest, wounded], vec![hero], 0);
        assert_eq!(combat.effect, CombatOrderEffect::Heal);
        assert_eq!(combat.order_targets(), &[wounded]);
    }

    #[test]
    fn test_tree_definition_parses_from_ron() {
        let def = BehaviorDef::from_ron(
            "Selector([Sequence([Condition(LifeBelow(0.3)), Task(Defend)]), Task(Attack)])",
        )
        .unwrap();
        assert_eq!(
            def,
            BehaviorDef::Selector(vec![
                BehaviorDef::Sequence(vec![
                    BehaviorDef::Condition(AiCondition::LifeBelow(0.3)),
                    BehaviorDef::Task(AiTaskKind::Defend),
                ]),
                BehaviorDef::Task(AiTaskKind::Attack),
            ])
        );
    }

    #[test]
    fn test_tree_copies_share_leaf_instances() {
        let library = TaskLibrary::default();
        let tree = BehaviorDef::Selector(vec![
            BehaviorDef::Task(AiTaskKind::Attack),
            BehaviorDef::Task(AiTaskKind::Attack),
        ])
        .build(&library);
        let copy = tree.clone();

        let (BehaviorNode::Selector(a), BehaviorNode::Selector(b)) = (&tree, &copy) else {
            panic!("expected selectors");
        };
        let (BehaviorNode::Leaf(first), BehaviorNode::Leaf(copied)) = (&a[0], &b[0]) else {
            panic!("expected leaves");
        };
        assert!(Arc::ptr_eq(first, copied));
        let BehaviorNode::Leaf(second) = &a[1] else { panic!("expected leaf") };
        assert!(Arc::ptr_eq(first, second));
        assert_eq!(first.name(), "Attack");
    }
}
