pub mod hostile_ai;
pub mod minion_ai;
pub mod steering;
pub mod structure_ai;

use hecs::{Entity, World};

use crate::config::SimConfig;
use crate::ecs::components::{Body, Vitals};
use crate::game::pathfinding::NavGrid;
use crate::game::status::StatusEffects;
use crate::protocol::{EntityKind, Team, Vec2};

use steering::SpatialIndex;

/// Shared read-only inputs for one AI pass.
pub struct AiContext<'a> {
    pub config: &'a SimConfig,
    pub grid: &'a NavGrid,
    pub effects: &'a StatusEffects,
    pub neighbors: &'a SpatialIndex,
    pub frame: u64,
    pub dt_ms: f32,
}

/// An attack an AI unit decided to make this tick. Resolved by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub attacker: Entity,
    pub target: Entity,
    pub team: Team,
    pub origin: Vec2,
    pub damage: f32,
    pub ranged: bool,
}

/// A live entity another unit may pick as a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub entity: Entity,
    pub kind: EntityKind,
    pub team: Team,
    pub center: Vec2,
    pub hit_radius: f32,
}

impl Candidate {
    /// Center distance minus hit radius.
    pub fn reach_from(&self, from: Vec2) -> f32 {
        (from.distance(self.center) - self.hit_radius).max(0.0)
    }
}

/// 1-in-`interval` cadence, offset by the entity's slot so evaluations
/// spread across frames.
pub fn should_evaluate(frame: u64, entity: Entity, interval: u64) -> bool {
    interval <= 1 || (frame + u64::from(entity.id())) % interval == 0
}

/// Every live, targetable entity (projectiles excluded).
pub fn collect_candidates(world: &World) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = world
        .query::<(&EntityKind, &Team, &Body, &Vitals)>()
        .iter()
        .filter(|(_, (kind, _, _, vitals))| **kind != EntityKind::Projectile && !vitals.is_dead)
        .map(|(entity, (kind, team, body, _))| Candidate {
            entity,
            kind: *kind,
            team: *team,
            center: body.center(),
            hit_radius: body.hit_radius,
        })
        .collect();
    out.sort_by_key(|c| c.entity.id());
    out
}

/// Nearest candidate matching `filter`, ties broken by entity slot.
pub fn nearest<'c>(
    from: Vec2,
    candidates: &'c [Candidate],
    mut filter: impl FnMut(&Candidate) -> bool,
) -> Option<&'c Candidate> {
    candidates
        .iter()
        .filter(|c| filter(c))
        .min_by(|a, b| {
            a.center
                .distance_sq(from)
                .total_cmp(&b.center.distance_sq(from))
                .then(a.entity.id().cmp(&b.entity.id()))
        })
}
