use hecs::{Entity, World};
use tracing::info;

use crate::config::SimConfig;
use crate::game::arena::ArenaLayout;
use crate::game::catalog::WeaponDef;
use crate::game::status::StatusEffect;
use crate::protocol::{EntityKind, Team, Vec2};

use super::components::{
    AttackStats, AvatarState, Body, HostileAi, MinionAi, MinionRole, MoveSpeed, Projectile,
    ProjectileMotion, StructureAi, StructureKind, Vitals,
};

// ── Footprints (width, height, hit radius) ───────────────────────────

const AVATAR_SIZE: (f32, f32, f32) = (32.0, 32.0, 18.0);
const HOSTILE_SIZE: (f32, f32, f32) = (36.0, 36.0, 20.0);
const MINION_SIZE: (f32, f32, f32) = (24.0, 24.0, 12.0);
const TOWER_SIZE: (f32, f32, f32) = (64.0, 64.0, 36.0);
const NEXUS_SIZE: (f32, f32, f32) = (96.0, 96.0, 52.0);
const PROJECTILE_SIZE: (f32, f32, f32) = (8.0, 8.0, 6.0);

fn body(center: Vec2, size: (f32, f32, f32)) -> Body {
    Body::centered(center, size.0, size.1, size.2)
}

fn vitals(max_health: f32, config: &SimConfig) -> Vitals {
    Vitals::new(max_health, config.combat.hit_flash_ms, config.combat.death_decay_ms)
}

/// Auto-attack stats derived from the equipped weapon.
pub fn weapon_attack(weapon: &WeaponDef) -> AttackStats {
    AttackStats {
        damage: weapon.damage,
        range: weapon.range,
        cooldown_ms: weapon.attack_cooldown_ms(),
        cooldown_remaining_ms: 0.0,
        ranged: weapon.is_ranged(),
    }
}

/// Fallback when the equipped weapon is missing from the catalog.
pub fn unarmed_attack() -> AttackStats {
    AttackStats {
        damage: 10.0,
        range: 90.0,
        cooldown_ms: 1000.0,
        cooldown_remaining_ms: 0.0,
        ranged: false,
    }
}

pub fn spawn_avatar(
    world: &mut World,
    config: &SimConfig,
    spawn_point: Vec2,
    attack: AttackStats,
) -> Entity {
    world.spawn((
        EntityKind::Avatar,
        Team::Blue,
        body(spawn_point, AVATAR_SIZE),
        vitals(config.avatar.max_health, config),
        MoveSpeed {
            base: config.avatar.move_speed,
        },
        attack,
        AvatarState::new(spawn_point, config.avatar.max_mana),
    ))
}

pub fn spawn_hostile(world: &mut World, config: &SimConfig, home: Vec2, camp: usize) -> Entity {
    let cfg = &config.hostile;
    world.spawn((
        EntityKind::HostileUnit,
        Team::Neutral,
        body(home, HOSTILE_SIZE),
        vitals(cfg.max_health, config),
        MoveSpeed { base: cfg.move_speed },
        AttackStats {
            damage: cfg.damage,
            range: cfg.attack_range,
            cooldown_ms: cfg.attack_cooldown_ms,
            cooldown_remaining_ms: 0.0,
            ranged: false,
        },
        HostileAi::new(home, camp, cfg.path_recompute_ms),
    ))
}

pub fn spawn_minion(
    world: &mut World,
    config: &SimConfig,
    team: Team,
    role: MinionRole,
    center: Vec2,
) -> Entity {
    let cfg = &config.minion;
    let (health, damage, range) = match role {
        MinionRole::Melee => (cfg.melee_health, cfg.melee_damage, cfg.melee_range),
        MinionRole::Caster => (cfg.caster_health, cfg.caster_damage, cfg.caster_range),
    };
    world.spawn((
        EntityKind::Minion,
        team,
        body(center, MINION_SIZE),
        vitals(health, config),
        MoveSpeed { base: cfg.move_speed },
        AttackStats {
            damage,
            range,
            cooldown_ms: cfg.attack_cooldown_ms,
            cooldown_remaining_ms: 0.0,
            ranged: role == MinionRole::Caster,
        },
        MinionAi::new(role, cfg.path_recompute_ms),
    ))
}

/// Towers get attack stats; a nexus only has health.
pub fn spawn_structure(
    world: &mut World,
    config: &SimConfig,
    team: Team,
    kind: StructureKind,
    center: Vec2,
) -> Entity {
    let cfg = &config.structure;
    match kind {
        StructureKind::Tower => world.spawn((
            EntityKind::Structure,
            team,
            body(center, TOWER_SIZE),
            vitals(cfg.tower_health, config),
            StructureAi::new(kind),
            AttackStats {
                damage: cfg.tower_damage,
                range: cfg.tower_range,
                cooldown_ms: cfg.tower_cooldown_ms,
                cooldown_remaining_ms: 0.0,
                ranged: true,
            },
        )),
        StructureKind::Nexus => world.spawn((
            EntityKind::Structure,
            team,
            body(center, NEXUS_SIZE),
            vitals(cfg.nexus_health, config),
            StructureAi::new(kind),
        )),
    }
}

/// Everything needed to put a projectile in flight.
#[derive(Debug, Clone)]
pub struct ProjectileSpawn {
    pub owner: Option<Entity>,
    pub team: Team,
    pub origin: Vec2,
    pub motion: ProjectileMotion,
    pub speed: f32,
    pub damage: f32,
    pub range: f32,
    pub on_hit: Option<StatusEffect>,
    pub from_avatar: bool,
}

pub fn spawn_projectile(world: &mut World, spawn: ProjectileSpawn) -> Entity {
    world.spawn((
        EntityKind::Projectile,
        spawn.team,
        body(spawn.origin, PROJECTILE_SIZE),
        Projectile {
            owner: spawn.owner,
            team: spawn.team,
            motion: spawn.motion,
            speed: spawn.speed,
            damage: spawn.damage,
            range_remaining: spawn.range,
            on_hit: spawn.on_hit,
            from_avatar: spawn.from_avatar,
        },
    ))
}

/// Place both sides' structures. Returns how many were spawned.
pub fn populate_structures(world: &mut World, config: &SimConfig, layout: &ArenaLayout) -> usize {
    let mut count = 0;
    for side in [&layout.blue, &layout.red] {
        spawn_structure(world, config, side.team, StructureKind::Nexus, side.nexus);
        count += 1;
        for tower in &side.towers {
            spawn_structure(world, config, side.team, StructureKind::Tower, *tower);
            count += 1;
        }
    }
    info!(structures = count, "arena structures placed");
    count
}
