//! Capability traits shared by every simulated object, and the bridge between
//! hecs handles and the `u64` ids the outside world sees.

use hecs::Entity;

use crate::ai::steering::PathFollower;
use crate::game::status::StatusEffects;
use crate::protocol::{EntityId, Vec2};

use super::components::{AttackStats, Body, PendingOverride, StructureAi, Vitals};

pub fn entity_id(entity: Entity) -> EntityId {
    entity.to_bits().get()
}

pub fn entity_from_id(id: EntityId) -> Option<Entity> {
    Entity::from_bits(id)
}

// ── Capabilities ─────────────────────────────────────────────────────

pub trait Damageable {
    /// Apply damage, returning the amount actually taken.
    fn take_damage(&mut self, amount: f32) -> f32;
    /// Restore health, returning the amount actually healed.
    fn heal(&mut self, amount: f32) -> f32;
    fn is_alive(&self) -> bool;
}

pub trait Targetable {
    fn center(&self) -> Vec2;
    fn hit_radius(&self) -> f32;

    /// Circular test on hit radii, independent of the movement footprint.
    fn collides_with(&self, other: &dyn Targetable) -> bool {
        let reach = self.hit_radius() + other.hit_radius();
        self.center().distance_sq(other.center()) <= reach * reach
    }

    fn distance_to(&self, other: &dyn Targetable) -> f32 {
        self.center().distance(other.center())
    }

    fn direction_to(&self, other: &dyn Targetable) -> Vec2 {
        (other.center() - self.center()).normalized()
    }

    /// Center distance minus the other's hit radius.
    fn reach_to(&self, other: &dyn Targetable) -> f32 {
        (self.distance_to(other) - other.hit_radius()).max(0.0)
    }
}

pub trait Updatable {
    fn update(&mut self, dt_ms: f32);
}

// ── Implementations ──────────────────────────────────────────────────

impl Damageable for Vitals {
    fn take_damage(&mut self, amount: f32) -> f32 {
        if self.is_dead || amount <= 0.0 {
            return 0.0;
        }
        let taken = amount.min(self.health);
        self.health = (self.health - amount).max(0.0);
        self.hit_timer_ms = self.hit_flash_ms;
        if self.health <= 0.0 {
            self.health = 0.0;
            self.is_dead = true;
            self.death_timer_ms = self.death_decay_ms;
        }
        taken
    }

    fn heal(&mut self, amount: f32) -> f32 {
        if self.is_dead || amount <= 0.0 {
            return 0.0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }

    fn is_alive(&self) -> bool {
        !self.is_dead
    }
}

impl Targetable for Body {
    fn center(&self) -> Vec2 {
        Body::center(self)
    }

    fn hit_radius(&self) -> f32 {
        self.hit_radius
    }
}

/// A bare point with a radius, for tests against positions that are not entities.
#[derive(Debug, Clone, Copy)]
pub struct HitCircle {
    pub center: Vec2,
    pub radius: f32,
}

impl Targetable for HitCircle {
    fn center(&self) -> Vec2 {
        self.center
    }

    fn hit_radius(&self) -> f32 {
        self.radius
    }
}

impl Updatable for Vitals {
    fn update(&mut self, dt_ms: f32) {
        if self.hit_timer_ms > 0.0 {
            self.hit_timer_ms = (self.hit_timer_ms - dt_ms).max(0.0);
        }
        if self.is_dead && self.death_timer_ms > 0.0 {
            self.death_timer_ms = (self.death_timer_ms - dt_ms).max(0.0);
        }
    }
}

impl Updatable for AttackStats {
    fn update(&mut self, dt_ms: f32) {
        if self.cooldown_remaining_ms > 0.0 {
            self.cooldown_remaining_ms = (self.cooldown_remaining_ms - dt_ms).max(0.0);
        }
    }
}

impl Updatable for StructureAi {
    fn update(&mut self, dt_ms: f32) {
        if let Some(PendingOverride {
            delay_remaining_ms, ..
        }) = self.pending_override.as_mut()
        {
            *delay_remaining_ms -= dt_ms;
        }
    }
}

impl Updatable for PathFollower {
    fn update(&mut self, dt_ms: f32) {
        self.tick(dt_ms);
    }
}

/// Outcome of routing damage through a shield into an entity's health.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShieldedHit {
    pub absorbed: f32,
    pub dealt: f32,
    pub killed: bool,
}

/// Shield first, remainder to health.
pub fn take_damage_with_shield(
    effects: &mut StatusEffects,
    id: EntityId,
    vitals: &mut Vitals,
    amount: f32,
) -> ShieldedHit {
    if vitals.is_dead {
        return ShieldedHit::default();
    }
    let remaining = effects.absorb_damage(id, amount);
    let dealt = vitals.take_damage(remaining);
    ShieldedHit {
        absorbed: amount - remaining,
        dealt,
        killed: vitals.is_dead,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::status::StatusEffect;

    fn vitals(max: f32) -> Vitals {
        Vitals::new(max, 150.0, 1200.0)
    }

    #[test]
    fn damage_clamps_and_starts_decay() {
        let mut v = vitals(50.0);
        assert_eq!(v.take_damage(20.0), 20.0);
        assert!(v.was_hit());
        assert_eq!(v.take_damage(100.0), 30.0);
        assert_eq!(v.health, 0.0);
        assert!(v.is_dead);
        assert!(!v.is_removable());

        v.update(1200.0);
        assert!(v.is_removable());
    }

    #[test]
    fn dead_entities_ignore_damage_and_heal() {
        let mut v = vitals(10.0);
        v.take_damage(10.0);
        assert_eq!(v.take_damage(5.0), 0.0);
        assert_eq!(v.heal(5.0), 0.0);
        assert_eq!(v.health, 0.0);
    }

    #[test]
    fn heal_clamps_to_max() {
        let mut v = vitals(100.0);
        v.take_damage(30.0);
        assert_eq!(v.heal(50.0), 30.0);
        assert_eq!(v.health, 100.0);
    }

    #[test]
    fn hit_flash_expires() {
        let mut v = vitals(100.0);
        v.take_damage(1.0);
        v.update(150.0);
        assert!(!v.was_hit());
    }

    #[test]
    fn collision_uses_hit_radii_not_footprint() {
        let a = Body::centered(Vec2::new(0.0, 0.0), 200.0, 200.0, 10.0);
        let b = Body::centered(Vec2::new(25.0, 0.0), 200.0, 200.0, 10.0);
        assert!(!a.collides_with(&b));
        let c = HitCircle {
            center: Vec2::new(19.0, 0.0),
            radius: 10.0,
        };
        assert!(a.collides_with(&c));
        assert_eq!(a.direction_to(&b), Vec2::new(1.0, 0.0));
        assert_eq!(a.reach_to(&b), 15.0);
    }

    #[test]
    fn shielded_damage_routes_through_absorption() {
        let mut effects = StatusEffects::new();
        let mut v = vitals(100.0);
        effects.apply(1, StatusEffect::shield(5000.0, 30.0));

        let hit = take_damage_with_shield(&mut effects, 1, &mut v, 50.0);
        assert_eq!(hit.absorbed, 30.0);
        assert_eq!(hit.dealt, 20.0);
        assert_eq!(v.health, 80.0);
        assert!(!hit.killed);
    }

    #[test]
    fn ids_round_trip_through_u64() {
        let mut world = hecs::World::new();
        let e = world.spawn((1u8,));
        assert_eq!(entity_from_id(entity_id(e)), Some(e));
    }
}
