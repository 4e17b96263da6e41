use hecs::{Entity, World};
use tracing::trace;

use crate::config::MinionConfig;
use crate::ecs::components::{AttackStats, Body, MinionAi, MinionRole, MoveSpeed, Vitals};
use crate::ecs::entity::{entity_id, Updatable};
use crate::game::arena::ArenaLayout;
use crate::protocol::{AiStateTag, EntityKind, Team, Vec2};

use super::steering::{apply_movement, separation_force, steer_toward, PathFollower};
use super::{collect_candidates, nearest, should_evaluate, AiContext, Candidate, Strike};

impl MinionAi {
    pub fn new(role: MinionRole, path_recompute_ms: f32) -> Self {
        Self {
            role,
            target: None,
            goal: None,
            path: PathFollower::new(path_recompute_ms),
        }
    }

    pub fn state_tag(&self) -> AiStateTag {
        if self.target.is_some() {
            AiStateTag::Engaging
        } else {
            AiStateTag::Marching
        }
    }
}

/// Priority targeting: enemy minions nearby, then the enemy avatar in a
/// tighter radius, then enemy structures in reach. `None` means march.
pub fn select_minion_target(
    center: Vec2,
    team: Team,
    attack_range: f32,
    candidates: &[Candidate],
    cfg: &MinionConfig,
) -> Option<Entity> {
    let enemy = team.opponent();
    if enemy == team {
        return None;
    }

    let minion = nearest(center, candidates, |c| {
        c.team == enemy
            && c.kind == EntityKind::Minion
            && c.center.distance(center) <= cfg.minion_aggro_radius
    });
    if let Some(c) = minion {
        return Some(c.entity);
    }

    let avatar = nearest(center, candidates, |c| {
        c.team == enemy
            && c.kind == EntityKind::Avatar
            && c.center.distance(center) <= cfg.avatar_aggro_radius
    });
    if let Some(c) = avatar {
        return Some(c.entity);
    }

    nearest(center, candidates, |c| {
        c.team == enemy
            && c.kind == EntityKind::Structure
            && c.reach_from(center) <= attack_range + cfg.structure_margin
    })
    .map(|c| c.entity)
}

/// Runs every lane minion for one tick. Minions always walk grid paths.
pub fn minion_ai_system(world: &mut World, ctx: &AiContext, layout: &ArenaLayout) -> Vec<Strike> {
    let cfg = &ctx.config.minion;
    let ai_cfg = &ctx.config.ai;
    let dt_s = ctx.dt_ms / 1000.0;
    let candidates = collect_candidates(world);
    let mut strikes = Vec::new();

    for (entity, (body, ai, attack, vitals, speed, team)) in
        world.query_mut::<(
            &mut Body,
            &mut MinionAi,
            &mut AttackStats,
            &Vitals,
            &MoveSpeed,
            &Team,
        )>()
    {
        if vitals.is_dead {
            continue;
        }
        let id = entity_id(entity);
        if ctx.effects.is_stunned(id) {
            continue;
        }
        attack.update(ctx.dt_ms);
        ai.path.update(ctx.dt_ms);

        let center = body.center();

        if should_evaluate(ctx.frame, entity, ai_cfg.eval_interval_frames) {
            let picked = select_minion_target(center, *team, attack.range, &candidates, cfg);
            if picked != ai.target {
                trace!(entity = id, target = ?picked.map(entity_id), "minion retarget");
                ai.path.clear();
                ai.target = picked;
            }
            ai.goal = match ai.target {
                Some(t) => candidates.iter().find(|c| c.entity == t).map(|c| c.center),
                None => layout.objective_for(*team),
            };
            if let Some(goal) = ai.goal {
                ai.path.refresh(ctx.grid, center, goal);
            }
        }

        // Cached target, live position.
        let live_target = ai
            .target
            .and_then(|t| candidates.iter().find(|c| c.entity == t));
        let mut velocity = Vec2::ZERO;
        let mut holding = false;

        if let Some(t) = live_target {
            if t.reach_from(center) <= attack.range {
                holding = true;
                if attack.ready() {
                    attack.trigger();
                    strikes.push(Strike {
                        attacker: entity,
                        target: t.entity,
                        team: *team,
                        origin: center,
                        damage: attack.damage,
                        ranged: ai.role == MinionRole::Caster,
                    });
                }
            }
        } else if ai.target.is_some() {
            // Target vanished since the last evaluation.
            ai.target = None;
            ai.path.clear();
        }

        let multiplier = ctx.effects.speed_multiplier(id);
        if multiplier <= 0.0 {
            continue;
        }
        if !holding {
            let goal = live_target.map(|t| t.center).or(ai.goal);
            if let Some(goal) = goal {
                let dir = steer_toward(
                    &mut ai.path,
                    center,
                    goal,
                    false,
                    ai_cfg.waypoint_tolerance,
                );
                velocity = dir.scale(speed.base * multiplier);
            }
        }
        velocity += separation_force(
            entity,
            center,
            ctx.neighbors,
            ai_cfg.separation_distance,
            ai_cfg.separation_max_speed,
        );
        body.set_center(apply_movement(ctx.grid, center, velocity.scale(dt_s)));
    }

    strikes
}
