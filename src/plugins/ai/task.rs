use bevy::prelude::*;

use super::{AiContext, Status};
use crate::plugins::combat::{CommandAttack, CommandDefend, CommandFirebolt, CommandHeal};
use crate::plugins::stats::{StatsSource, StatsType};

/// Atomic decision node. Implementations hold no per-copy state, so every
/// copy of a tree shares the same instance.
pub trait LeafTask: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn execute(&self, ctx: &mut AiContext) -> Status;
}

/// Attacks a uniformly random live opponent.
pub struct AttackTask;

impl LeafTask for AttackTask {
    fn name(&self) -> &'static str {
        "Attack"
    }

    fn execute(&self, ctx: &mut AiContext) -> Status {
        // the scheduler only asks entities with live opponents
        if let Some(target) = ctx.ai.random_opponent(ctx.rng) {
            let stats = ctx.stats.stats_cmp(ctx.entity);
            ctx.combat.new_command::<CommandAttack>(ctx.entity, stats, target);
        }
        Status::Succeeded
    }
}

pub struct DefendTask;

impl LeafTask for DefendTask {
    fn name(&self) -> &'static str {
        "Defend"
    }

    fn execute(&self, ctx: &mut AiContext) -> Status {
        let stats = ctx.stats.stats_cmp(ctx.entity);
        ctx.combat.add_command::<CommandDefend>(ctx.entity, stats);
        Status::Succeeded
    }
}

/// Heals the ally with the lowest life ratio.
pub struct HealTask;

impl LeafTask for HealTask {
    fn name(&self) -> &'static str {
        "Heal"
    }

    fn execute(&self, ctx: &mut AiContext) -> Status {
        let Some(target) = ctx
            .ai
            .allies
            .iter()
            .copied()
            .min_by(|a, b| life_ratio(ctx.stats, *a).total_cmp(&life_ratio(ctx.stats, *b)))
        else {
            return Status::Failed;
        };

        let stats = ctx.stats.stats_cmp(ctx.entity);
        if ctx.combat.new_command::<CommandHeal>(ctx.entity, stats, target) {
            Status::Succeeded
        } else {
            Status::Failed
        }
    }
}

pub struct FireboltTask;

impl LeafTask for FireboltTask {
    fn name(&self) -> &'static str {
        "Firebolt"
    }

    fn execute(&self, ctx: &mut AiContext) -> Status {
        let Some(target) = ctx.ai.random_opponent(ctx.rng) else {
            return Status::Failed;
        };
        let stats = ctx.stats.stats_cmp(ctx.entity);
        if ctx.combat.new_command::<CommandFirebolt>(ctx.entity, stats, target) {
            Status::Succeeded
        } else {
            Status::Failed
        }
    }
}

/// Current life over total max life, 1.0 for entities without max life.
pub fn life_ratio(stats: &dyn StatsSource, entity: Entity) -> f32 {
    let max_life = stats.total_stat_value(entity, StatsType::MaxLife);
    if max_life <= 0.0 {
        return 1.0;
    }
    stats.stats_cmp(entity).get(StatsType::Life) / max_life
}
