use hecs::{Entity, World};
use tracing::info;

use crate::config::{SimConfig, WaveConfig};
use crate::ecs::components::MinionRole;
use crate::ecs::world::spawn_minion;
use crate::game::arena::{ArenaLayout, SideLayout};
use crate::protocol::Vec2;

/// Countdown to the next minion wave.
#[derive(Debug, Clone)]
pub struct WaveSpawner {
    timer_ms: f32,
    waves_spawned: u32,
}

impl WaveSpawner {
    pub fn new(cfg: &WaveConfig) -> Self {
        Self {
            timer_ms: cfg.first_wave_ms,
            waves_spawned: 0,
        }
    }

    /// Advance the timer. Returns `true` when a wave is due.
    pub fn update(&mut self, dt_ms: f32, cfg: &WaveConfig) -> bool {
        self.timer_ms -= dt_ms;
        if self.timer_ms > 0.0 {
            return false;
        }
        self.timer_ms += cfg.interval_ms.max(1.0);
        self.waves_spawned += 1;
        true
    }

    pub fn waves_spawned(&self) -> u32 {
        self.waves_spawned
    }

    pub fn time_to_next_ms(&self) -> f32 {
        self.timer_ms.max(0.0)
    }
}

/// Column of spawn points running from `anchor` toward the enemy, alternating
/// above and below the lane center.
pub fn formation(
    anchor: Vec2,
    facing_x: f32,
    count: usize,
    spacing: f32,
    stagger: f32,
) -> Vec<Vec2> {
    let facing = if facing_x < 0.0 { -1.0 } else { 1.0 };
    (0..count)
        .map(|i| {
            let offset = if i % 2 == 0 { -stagger } else { stagger };
            Vec2::new(anchor.x + facing * spacing * i as f32, anchor.y + offset)
        })
        .collect()
}

/// Back half casters, front half melee.
pub fn wave_roles(count: usize) -> Vec<MinionRole> {
    let casters = count / 2;
    (0..count)
        .map(|i| if i < casters { MinionRole::Caster } else { MinionRole::Melee })
        .collect()
}

fn spawn_side(
    world: &mut World,
    config: &SimConfig,
    side: &SideLayout,
    enemy_nexus: Vec2,
) -> Vec<Entity> {
    let cfg = &config.waves;
    let facing = enemy_nexus.x - side.lane_anchor.x;
    let points = formation(side.lane_anchor, facing, cfg.group_size, cfg.spacing, cfg.stagger);
    points
        .into_iter()
        .zip(wave_roles(cfg.group_size))
        .map(|(point, role)| spawn_minion(world, config, side.team, role, point))
        .collect()
}

/// Spawn one group per side.
pub fn spawn_wave(world: &mut World, config: &SimConfig, layout: &ArenaLayout) -> Vec<Entity> {
    let mut spawned = spawn_side(world, config, &layout.blue, layout.red.nexus);
    spawned.extend(spawn_side(world, config, &layout.red, layout.blue.nexus));
    spawned
}

pub fn wave_system(
    world: &mut World,
    spawner: &mut WaveSpawner,
    config: &SimConfig,
    layout: &ArenaLayout,
    dt_ms: f32,
) -> usize {
    if !spawner.update(dt_ms, &config.waves) {
        return 0;
    }
    let spawned = spawn_wave(world, config, layout);
    info!(wave = spawner.waves_spawned(), minions = spawned.len(), "minion wave spawned");
    spawned.len()
}
