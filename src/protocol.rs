use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

// ── Core type aliases ──────────────────────────────────────────────

pub type EntityId = u64;
pub type Tick = u64;

// ── Geometry ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn distance_sq(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Unit vector in the same direction, or zero for a (near) zero vector.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len < 0.0001 {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    pub fn scale(self, factor: f32) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }

    /// Clamp the magnitude to `max` while keeping the direction.
    pub fn clamp_length(self, max: f32) -> Vec2 {
        let len = self.length();
        if len > max && len > 0.0 {
            self.scale(max / len)
        } else {
            self
        }
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

// ── Entities ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Avatar,
    HostileUnit,
    Minion,
    Structure,
    Projectile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// The avatar's side.
    Blue,
    Red,
    /// Jungle hostiles, hostile to everyone.
    Neutral,
}

impl Team {
    pub fn is_hostile_to(self, other: Team) -> bool {
        self != other
    }

    pub fn opponent(self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
            Team::Neutral => Team::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Slow,
    Stun,
    Root,
    Shield,
    Burn,
    Freeze,
}

/// Coarse AI state exposed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiStateTag {
    Idle,
    Chase,
    Attack,
    Stunned,
    Returning,
    Marching,
    Engaging,
    Guarding,
    Aggro,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub team: Team,
    /// Top-left corner.
    pub position: Vec2,
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
    pub hit_radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub is_dead: bool,
    pub was_hit: bool,
    pub effects: Vec<StatusKind>,
    pub ai_state: Option<AiStateTag>,
}

// ── Loadout slots ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotId {
    Q,
    W,
    E,
    R,
    D,
    F,
}

impl SlotId {
    pub const ALL: [SlotId; 6] = [SlotId::Q, SlotId::W, SlotId::E, SlotId::R, SlotId::D, SlotId::F];

    /// The single slot reserved for ultimates.
    pub const ULTIMATE: SlotId = SlotId::R;

    pub fn is_ultimate_slot(self) -> bool {
        self == Self::ULTIMATE
    }

    pub fn is_utility(self) -> bool {
        matches!(self, SlotId::D | SlotId::F)
    }

    pub fn index(self) -> usize {
        match self {
            SlotId::Q => 0,
            SlotId::W => 1,
            SlotId::E => 2,
            SlotId::R => 3,
            SlotId::D => 4,
            SlotId::F => 5,
        }
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SlotId::Q => "Q",
            SlotId::W => "W",
            SlotId::E => "E",
            SlotId::R => "R",
            SlotId::D => "D",
            SlotId::F => "F",
        };
        f.write_str(name)
    }
}

// ── Combat events (floating text) ──────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEventKind {
    Damage,
    Heal,
    ShieldBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatEvent {
    pub kind: CombatEventKind,
    pub target: EntityId,
    pub source: Option<EntityId>,
    pub amount: f32,
    pub critical: bool,
    pub position: Vec2,
}

// ── HUD / stats ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotHud {
    pub slot: SlotId,
    pub ability_id: Option<String>,
    pub cooldown_remaining_ms: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub weapon_id: String,
    pub passive_id: Option<String>,
    pub slots: Vec<SlotHud>,
    pub mana: f32,
    pub max_mana: f32,
    pub current_target: Option<EntityId>,
    pub hovered: Option<EntityId>,
    pub respawn_in_ms: Option<f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Smoothed ticks per second.
    pub tick_rate: f32,
    pub live_entities: u32,
    pub active_effects: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Victory,
    Defeat,
}

// ── Per-tick output (core → renderer) ──────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationUpdate {
    pub tick: Tick,
    pub entities: Vec<EntitySnapshot>,
    pub stats: StatsSnapshot,
    pub events: Vec<CombatEvent>,
    pub hud: HudSnapshot,
    pub outcome: Option<MatchOutcome>,
}

/// Encode an update as named-field msgpack for the renderer.
pub fn encode_update(update: &SimulationUpdate) -> Result<Vec<u8>, EncodeError> {
    Ok(rmp_serde::to_vec_named(update)?)
}

// ── Input layer → core ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CastTarget {
    Entity(EntityId),
    Point(Vec2),
    SelfCast,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerCommand {
    MoveTo { point: Vec2 },
    AttackTarget { entity: EntityId },
    ClearTarget,
    Hover { entity: Option<EntityId> },
    CastAbility { slot: SlotId, target: CastTarget },
    Stop,
}
