use hecs::{Entity, World};
use tracing::trace;

use crate::ai::{collect_candidates, Candidate};
use crate::ecs::components::{Body, Projectile, ProjectileMotion};
use crate::ecs::entity::entity_id;
use crate::game::pathfinding::NavGrid;
use crate::game::status::StatusEffect;
use crate::protocol::Vec2;

/// A projectile that connected this tick. Damage is resolved by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileHit {
    pub projectile: Entity,
    pub owner: Option<Entity>,
    pub target: Entity,
    pub damage: f32,
    pub on_hit: Option<StatusEffect>,
    pub from_avatar: bool,
}

#[derive(Debug, Default)]
pub struct ProjectileResult {
    pub despawned: Vec<Entity>,
    pub hits: Vec<ProjectileHit>,
}

/// Move every projectile, then despawn the ones that hit, ran out of range,
/// struck a wall or lost their homing target.
pub fn projectile_system(world: &mut World, grid: &NavGrid, dt_ms: f32) -> ProjectileResult {
    let dt_s = dt_ms / 1000.0;
    let candidates = collect_candidates(world);
    let mut result = ProjectileResult::default();

    for (entity, (body, proj)) in world.query_mut::<(&mut Body, &mut Projectile)>() {
        let center = body.center();
        let step = proj.speed * dt_s;
        proj.range_remaining -= step;

        match proj.motion {
            ProjectileMotion::Homing { target } => {
                let Some(victim) = candidates.iter().find(|c| c.entity == target) else {
                    trace!(projectile = entity_id(entity), "homing target gone");
                    result.despawned.push(entity);
                    continue;
                };
                let gap = center.distance(victim.center) - victim.hit_radius - body.hit_radius;
                if gap <= step {
                    body.set_center(victim.center);
                    result.hits.push(hit(entity, proj, target));
                    result.despawned.push(entity);
                    continue;
                }
                body.set_center(center + (victim.center - center).normalized().scale(step));
            }
            ProjectileMotion::Linear { direction } => {
                let next = center + direction.scale(step);
                if !grid.is_walkable(next) {
                    result.despawned.push(entity);
                    continue;
                }
                body.set_center(next);
                if let Some(victim) = first_collision(next, body.hit_radius, proj, &candidates) {
                    result.hits.push(hit(entity, proj, victim));
                    result.despawned.push(entity);
                    continue;
                }
            }
        }

        if proj.range_remaining <= 0.0 {
            result.despawned.push(entity);
        }
    }

    for entity in &result.despawned {
        let _ = world.despawn(*entity);
    }
    result
}

fn hit(projectile: Entity, proj: &Projectile, target: Entity) -> ProjectileHit {
    ProjectileHit {
        projectile,
        owner: proj.owner,
        target,
        damage: proj.damage,
        on_hit: proj.on_hit,
        from_avatar: proj.from_avatar,
    }
}

/// Closest hostile whose hit circle overlaps the projectile's.
fn first_collision(
    at: Vec2,
    radius: f32,
    proj: &Projectile,
    candidates: &[Candidate],
) -> Option<Entity> {
    candidates
        .iter()
        .filter(|c| proj.team.is_hostile_to(c.team) && Some(c.entity) != proj.owner)
        .filter(|c| c.center.distance(at) <= c.hit_radius + radius)
        .min_by(|a, b| a.center.distance_sq(at).total_cmp(&b.center.distance_sq(at)))
        .map(|c| c.entity)
}
