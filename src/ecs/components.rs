use std::collections::HashMap;

use crate::ai::steering::PathFollower;
use crate::game::status::StatusEffect;
use crate::protocol::{Team, Vec2};

// ── Spatial ──────────────────────────────────────────────────────────

/// Rectangular movement footprint plus the circular combat hit radius.
#[derive(Debug, Clone)]
pub struct Body {
    /// Top-left corner.
    pub position: Vec2,
    pub width: f32,
    pub height: f32,
    pub hit_radius: f32,
}

impl Body {
    pub fn centered(center: Vec2, width: f32, height: f32, hit_radius: f32) -> Self {
        Self {
            position: Vec2::new(center.x - width / 2.0, center.y - height / 2.0),
            width,
            height,
            hit_radius,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.position.x + self.width / 2.0, self.position.y + self.height / 2.0)
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.position = Vec2::new(center.x - self.width / 2.0, center.y - self.height / 2.0);
    }
}

#[derive(Debug, Clone)]
pub struct MoveSpeed {
    pub base: f32,
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Vitals {
    pub health: f32,
    pub max_health: f32,
    pub hit_timer_ms: f32,
    pub is_dead: bool,
    /// Counts down after death; the entity may be removed at zero.
    pub death_timer_ms: f32,
    pub hit_flash_ms: f32,
    pub death_decay_ms: f32,
}

impl Vitals {
    pub fn new(max_health: f32, hit_flash_ms: f32, death_decay_ms: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            hit_timer_ms: 0.0,
            is_dead: false,
            death_timer_ms: 0.0,
            hit_flash_ms,
            death_decay_ms,
        }
    }

    pub fn was_hit(&self) -> bool {
        self.hit_timer_ms > 0.0
    }

    pub fn is_removable(&self) -> bool {
        self.is_dead && self.death_timer_ms <= 0.0
    }

    /// Back to full health, alive.
    pub fn restore(&mut self) {
        self.health = self.max_health;
        self.is_dead = false;
        self.death_timer_ms = 0.0;
        self.hit_timer_ms = 0.0;
    }
}

// ── Combat ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AttackStats {
    pub damage: f32,
    pub range: f32,
    pub cooldown_ms: f32,
    pub cooldown_remaining_ms: f32,
    /// Ranged attackers fire homing projectiles instead of hitting instantly.
    pub ranged: bool,
}

impl AttackStats {
    pub fn ready(&self) -> bool {
        self.cooldown_remaining_ms <= 0.0
    }

    pub fn trigger(&mut self) {
        self.cooldown_remaining_ms = self.cooldown_ms;
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ProjectileMotion {
    Homing { target: hecs::Entity },
    Linear { direction: Vec2 },
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub owner: Option<hecs::Entity>,
    pub team: Team,
    pub motion: ProjectileMotion,
    pub speed: f32,
    pub damage: f32,
    pub range_remaining: f32,
    pub on_hit: Option<StatusEffect>,
    /// Hits from the avatar pick up weapon and passive modifiers.
    pub from_avatar: bool,
}

// ── Avatar ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AvatarState {
    pub move_target: Option<Vec2>,
    pub mana: f32,
    pub max_mana: f32,
    /// Remaining cooldown per ability id.
    pub cooldowns: HashMap<String, f32>,
    pub respawn_timer_ms: Option<f32>,
    pub spawn_point: Vec2,
}

impl AvatarState {
    pub fn new(spawn_point: Vec2, max_mana: f32) -> Self {
        Self {
            move_target: None,
            mana: max_mana,
            max_mana,
            cooldowns: HashMap::new(),
            respawn_timer_ms: None,
            spawn_point,
        }
    }

    pub fn cooldown_of(&self, ability_id: &str) -> f32 {
        self.cooldowns.get(ability_id).copied().unwrap_or(0.0).max(0.0)
    }
}

// ── AI brains ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostileState {
    Idle,
    Chase,
    Attack,
    Stunned,
    Returning,
}

#[derive(Debug, Clone)]
pub struct HostileAi {
    pub state: HostileState,
    pub home: Vec2,
    pub camp: usize,
    pub target: Option<hecs::Entity>,
    /// Where the last evaluation decided to go.
    pub goal: Option<Vec2>,
    /// Whether the last evaluation saw a straight line to `goal`.
    pub direct: bool,
    pub path: PathFollower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinionRole {
    Melee,
    Caster,
}

#[derive(Debug, Clone)]
pub struct MinionAi {
    pub role: MinionRole,
    pub target: Option<hecs::Entity>,
    pub goal: Option<Vec2>,
    pub path: PathFollower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    Tower,
    Nexus,
}

/// Sticky aggro plus a deferred "ally under attack" override.
#[derive(Debug, Clone)]
pub struct StructureAi {
    pub kind: StructureKind,
    pub aggro: Option<hecs::Entity>,
    pub pending_override: Option<PendingOverride>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingOverride {
    pub attacker: hecs::Entity,
    pub delay_remaining_ms: f32,
}

impl StructureAi {
    pub fn new(kind: StructureKind) -> Self {
        Self {
            kind,
            aggro: None,
            pending_override: None,
        }
    }

    /// Queue a retarget onto `attacker` after `delay_ms`. A repeated call for
    /// the same attacker does not restart the delay.
    pub fn notify_ally_attacked(&mut self, attacker: hecs::Entity, delay_ms: f32) {
        if self.aggro == Some(attacker) {
            return;
        }
        match self.pending_override {
            Some(pending) if pending.attacker == attacker => {}
            _ => {
                self.pending_override = Some(PendingOverride {
                    attacker,
                    delay_remaining_ms: delay_ms,
                });
            }
        }
    }

    /// Forget every reference to a removed entity.
    pub fn forget(&mut self, entity: hecs::Entity) {
        if self.aggro == Some(entity) {
            self.aggro = None;
        }
        if self.pending_override.map(|p| p.attacker) == Some(entity) {
            self.pending_override = None;
        }
    }
}
