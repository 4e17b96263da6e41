use hecs::{Entity, World};
use tracing::info;

use crate::ai::steering::apply_movement;
use crate::config::SimConfig;
use crate::ecs::components::{AttackStats, AvatarState, Body, MoveSpeed, Vitals};
use crate::ecs::entity::{entity_id, Updatable};
use crate::game::pathfinding::NavGrid;
use crate::game::status::StatusEffects;

/// What happened to the avatar's life cycle this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerTick {
    pub died: bool,
    pub respawned: bool,
}

/// Timers, mana, death/respawn and click-to-move for the avatar.
pub fn player_system(
    world: &mut World,
    effects: &mut StatusEffects,
    grid: &NavGrid,
    config: &SimConfig,
    avatar: Entity,
    move_speed_bonus: f32,
    dt_ms: f32,
) -> PlayerTick {
    let mut tick = PlayerTick::default();
    let id = entity_id(avatar);
    let cfg = &config.avatar;

    let Ok((body, vitals, state, attack, speed)) =
        world.query_one_mut::<(
            &mut Body,
            &mut Vitals,
            &mut AvatarState,
            &mut AttackStats,
            &MoveSpeed,
        )>(avatar)
    else {
        return tick;
    };

    // ── Timers ──────────────────────────────────────────────────────
    attack.update(dt_ms);
    state.cooldowns.retain(|_, remaining| {
        *remaining -= dt_ms;
        *remaining > 0.0
    });

    // ── Death and respawn ───────────────────────────────────────────
    if vitals.is_dead {
        match state.respawn_timer_ms {
            None => {
                info!(respawn_ms = cfg.respawn_ms, "avatar died");
                state.respawn_timer_ms = Some(cfg.respawn_ms);
                state.move_target = None;
                tick.died = true;
            }
            Some(remaining) if remaining - dt_ms <= 0.0 => {
                vitals.restore();
                state.respawn_timer_ms = None;
                state.mana = state.max_mana;
                state.cooldowns.clear();
                body.set_center(state.spawn_point);
                effects.clear_entity(id);
                info!("avatar respawned");
                tick.respawned = true;
            }
            Some(remaining) => state.respawn_timer_ms = Some(remaining - dt_ms),
        }
        return tick;
    }

    state.mana = (state.mana + cfg.mana_regen_per_sec * dt_ms / 1000.0).min(state.max_mana);

    // ── Movement ────────────────────────────────────────────────────
    let Some(goal) = state.move_target else {
        return tick;
    };
    let multiplier = effects.speed_multiplier(id);
    if multiplier <= 0.0 {
        return tick;
    }
    let center = body.center();
    let remaining = center.distance(goal);
    let step = speed.base * (1.0 + move_speed_bonus) * multiplier * dt_ms / 1000.0;
    if remaining <= cfg.arrival_tolerance || step >= remaining {
        let landed = if grid.is_walkable(goal) {
            goal
        } else {
            apply_movement(grid, center, goal - center)
        };
        body.set_center(landed);
        state.move_target = None;
        return tick;
    }
    let next = apply_movement(grid, center, (goal - center).normalized().scale(step));
    if next == center {
        // Pinned against a wall.
        state.move_target = None;
    }
    body.set_center(next);
    tick
}
