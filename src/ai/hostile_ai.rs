use hecs::{Entity, World};
use tracing::debug;

use crate::config::HostileConfig;
use crate::ecs::components::{AttackStats, Body, HostileAi, HostileState, MoveSpeed, Vitals};
use crate::ecs::entity::{entity_id, Updatable};
use crate::protocol::{AiStateTag, Team, Vec2};

use super::steering::{apply_movement, separation_force, steer_toward, PathFollower};
use super::{should_evaluate, AiContext, Strike};

impl HostileAi {
    pub fn new(home: Vec2, camp: usize, path_recompute_ms: f32) -> Self {
        Self {
            state: HostileState::Idle,
            home,
            camp,
            target: None,
            goal: None,
            direct: true,
            path: PathFollower::new(path_recompute_ms),
        }
    }
}

pub fn state_tag(state: HostileState) -> AiStateTag {
    match state {
        HostileState::Idle => AiStateTag::Idle,
        HostileState::Chase => AiStateTag::Chase,
        HostileState::Attack => AiStateTag::Attack,
        HostileState::Stunned => AiStateTag::Stunned,
        HostileState::Returning => AiStateTag::Returning,
    }
}

/// One evaluation of the hostile-unit state machine.
///
/// `distance` is the center distance to the target, `None` when there is no
/// live target. Stun handling happens outside: a unit leaving stun resumes
/// from `Chase`.
pub fn next_state(
    current: HostileState,
    distance: Option<f32>,
    at_home: bool,
    cfg: &HostileConfig,
) -> HostileState {
    use HostileState::*;

    let Some(d) = distance else {
        return match current {
            Idle => Idle,
            Returning if at_home => Idle,
            _ => Returning,
        };
    };

    match current {
        Idle => {
            if d < cfg.detection_range {
                Chase
            } else {
                Idle
            }
        }
        Chase | Stunned => {
            if d > cfg.detection_range * cfg.leash_factor {
                Returning
            } else if d < cfg.attack_range {
                Attack
            } else {
                Chase
            }
        }
        Attack => {
            if d > cfg.attack_range * cfg.attack_exit_factor {
                Chase
            } else {
                Attack
            }
        }
        Returning => {
            if d < cfg.detection_range * cfg.reacquire_factor {
                Chase
            } else if at_home {
                Idle
            } else {
                Returning
            }
        }
    }
}

/// Runs every jungle hostile for one tick. `target` is the avatar when alive.
///
/// Stun checks, cooldowns and movement run every frame; state transitions and
/// path requests only on the unit's evaluation frame.
pub fn hostile_ai_system(
    world: &mut World,
    ctx: &AiContext,
    target: Option<(Entity, Vec2)>,
) -> Vec<Strike> {
    let cfg = &ctx.config.hostile;
    let ai_cfg = &ctx.config.ai;
    let dt_s = ctx.dt_ms / 1000.0;
    let mut strikes = Vec::new();

    for (entity, (body, ai, attack, vitals, speed)) in
        world.query_mut::<(&mut Body, &mut HostileAi, &mut AttackStats, &mut Vitals, &MoveSpeed)>()
    {
        if vitals.is_dead {
            continue;
        }
        let id = entity_id(entity);
        let center = body.center();

        // ── Stun gate (every frame) ──────────────────────────────────
        if ctx.effects.is_stunned(id) {
            if ai.state != HostileState::Stunned {
                debug!(entity = id, from = ?ai.state, "hostile stunned");
                ai.state = HostileState::Stunned;
            }
            continue;
        }
        if ai.state == HostileState::Stunned {
            ai.state = HostileState::Chase;
        }

        attack.update(ctx.dt_ms);
        ai.path.update(ctx.dt_ms);

        let distance = target.map(|(_, p)| center.distance(p));

        // ── Decision (throttled) ─────────────────────────────────────
        if should_evaluate(ctx.frame, entity, ai_cfg.eval_interval_frames) {
            let at_home = center.distance(ai.home) <= cfg.home_tolerance;
            let next = next_state(ai.state, distance, at_home, cfg);
            if next != ai.state {
                debug!(entity = id, from = ?ai.state, to = ?next, "hostile state change");
                if ai.state == HostileState::Returning && next == HostileState::Idle {
                    vitals.health = vitals.max_health;
                }
                ai.path.clear();
                ai.state = next;
            }

            ai.target = match ai.state {
                HostileState::Chase | HostileState::Attack => target.map(|(e, _)| e),
                _ => None,
            };
            ai.goal = match ai.state {
                HostileState::Chase => target.map(|(_, p)| p),
                HostileState::Returning => Some(ai.home),
                _ => None,
            };
            if let Some(goal) = ai.goal {
                ai.direct = ctx.grid.has_line_of_sight(center, goal);
                if !ai.direct {
                    ai.path.refresh(ctx.grid, center, goal);
                }
            }
        }

        // ── Attack (every frame, cached decision) ────────────────────
        if ai.state == HostileState::Attack {
            if let (Some(victim), Some((target_entity, _)), Some(d)) =
                (ai.target, target, distance)
            {
                if victim == target_entity
                    && attack.ready()
                    && d <= cfg.attack_range * cfg.attack_exit_factor
                {
                    attack.trigger();
                    strikes.push(Strike {
                        attacker: entity,
                        target: victim,
                        team: Team::Neutral,
                        origin: center,
                        damage: attack.damage,
                        ranged: false,
                    });
                }
            }
        }

        // ── Movement (every frame) ───────────────────────────────────
        let multiplier = ctx.effects.speed_multiplier(id);
        if multiplier <= 0.0 {
            continue;
        }
        let goal = match ai.state {
            // Chasing a direct line follows the live position.
            HostileState::Chase if ai.direct => target.map(|(_, p)| p).or(ai.goal),
            HostileState::Chase | HostileState::Returning => ai.goal,
            _ => None,
        };
        let mut velocity = Vec2::ZERO;
        if let Some(goal) = goal {
            let remaining = center.distance(goal);
            let stop_short = if ai.state == HostileState::Chase {
                cfg.attack_range * 0.9
            } else {
                0.0
            };
            if remaining > stop_short {
                let dir = steer_toward(
                    &mut ai.path,
                    center,
                    goal,
                    ai.direct,
                    ai_cfg.waypoint_tolerance,
                );
                let step = (speed.base * multiplier).min((remaining - stop_short) / dt_s.max(1e-6));
                velocity = dir.scale(step);
            }
        }
        velocity += separation_force(
            entity,
            center,
            ctx.neighbors,
            ai_cfg.separation_distance,
            ai_cfg.separation_max_speed,
        );
        let next = apply_movement(ctx.grid, center, velocity.scale(dt_s));
        body.set_center(next);
    }

    strikes
}

#[cfg(test)]
mod tests {
    use super::*;
    use HostileState::*;

    fn cfg() -> HostileConfig {
        HostileConfig {
            detection_range: 300.0,
            attack_range: 60.0,
            leash_factor: 1.5,
            attack_exit_factor: 1.2,
            reacquire_factor: 0.8,
            ..HostileConfig::default()
        }
    }

    #[test]
    fn idle_detects_within_range() {
        let c = cfg();
        assert_eq!(next_state(Idle, Some(299.0), true, &c), Chase);
        assert_eq!(next_state(Idle, Some(301.0), true, &c), Idle);
        assert_eq!(next_state(Idle, None, true, &c), Idle);
    }

    #[test]
    fn chase_leashes_only_past_hysteresis() {
        let c = cfg();
        assert_eq!(next_state(Chase, Some(320.0), false, &c), Chase);
        assert_eq!(next_state(Chase, Some(450.0), false, &c), Chase);
        assert_eq!(next_state(Chase, Some(451.0), false, &c), Returning);
    }

    #[test]
    fn chase_to_attack_and_back_with_hysteresis() {
        let c = cfg();
        assert_eq!(next_state(Chase, Some(59.0), false, &c), Attack);
        assert_eq!(next_state(Attack, Some(70.0), false, &c), Attack);
        assert_eq!(next_state(Attack, Some(73.0), false, &c), Chase);
    }

    #[test]
    fn returning_reacquires_or_settles() {
        let c = cfg();
        assert_eq!(next_state(Returning, Some(239.0), false, &c), Chase);
        assert_eq!(next_state(Returning, Some(260.0), false, &c), Returning);
        assert_eq!(next_state(Returning, Some(260.0), true, &c), Idle);
        assert_eq!(next_state(Returning, None, true, &c), Idle);
    }

    #[test]
    fn losing_the_target_sends_units_home() {
        let c = cfg();
        assert_eq!(next_state(Chase, None, false, &c), Returning);
        assert_eq!(next_state(Attack, None, false, &c), Returning);
    }

    #[test]
    fn stun_expiry_resumes_as_chase() {
        let c = cfg();
        assert_eq!(next_state(Stunned, Some(100.0), false, &c), Chase);
    }

    #[test]
    fn tags_match_states() {
        assert_eq!(state_tag(Returning), AiStateTag::Returning);
        assert_eq!(state_tag(Stunned), AiStateTag::Stunned);
    }
}
