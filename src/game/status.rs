use std::collections::HashMap;

use tracing::trace;

use crate::protocol::{EntityId, StatusKind};

/// Slows can never take more than 80% of an entity's speed.
const MIN_SLOW_MULTIPLIER: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub remaining_ms: f32,
    /// Slow fraction, shield pool or burn damage per second, depending on kind.
    pub magnitude: Option<f32>,
    pub source: Option<EntityId>,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, duration_ms: f32) -> Self {
        Self {
            kind,
            remaining_ms: duration_ms,
            magnitude: None,
            source: None,
        }
    }

    pub fn slow(duration_ms: f32, fraction: f32) -> Self {
        Self::new(StatusKind::Slow, duration_ms).with_magnitude(fraction)
    }

    pub fn stun(duration_ms: f32) -> Self {
        Self::new(StatusKind::Stun, duration_ms)
    }

    pub fn root(duration_ms: f32) -> Self {
        Self::new(StatusKind::Root, duration_ms)
    }

    pub fn freeze(duration_ms: f32) -> Self {
        Self::new(StatusKind::Freeze, duration_ms)
    }

    pub fn shield(duration_ms: f32, amount: f32) -> Self {
        Self::new(StatusKind::Shield, duration_ms).with_magnitude(amount)
    }

    pub fn burn(duration_ms: f32, damage_per_sec: f32) -> Self {
        Self::new(StatusKind::Burn, duration_ms).with_magnitude(damage_per_sec)
    }

    pub fn with_magnitude(mut self, magnitude: f32) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }
}

/// Per-entity timed modifiers. Owned by the simulation, looked up by id.
#[derive(Debug, Default)]
pub struct StatusEffects {
    by_entity: HashMap<EntityId, Vec<StatusEffect>>,
}

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply or refresh an effect. At most one instance per kind is kept;
    /// a refresh keeps the larger duration and the larger magnitude.
    pub fn apply(&mut self, entity: EntityId, effect: StatusEffect) {
        let effects = self.by_entity.entry(entity).or_default();
        match effects.iter_mut().find(|e| e.kind == effect.kind) {
            Some(existing) => {
                existing.remaining_ms = existing.remaining_ms.max(effect.remaining_ms);
                if let Some(new_mag) = effect.magnitude {
                    existing.magnitude = Some(match existing.magnitude {
                        Some(old) => old.max(new_mag),
                        None => new_mag,
                    });
                }
                if effect.source.is_some() {
                    existing.source = effect.source;
                }
                trace!(entity, kind = ?effect.kind, "status refreshed");
            }
            None => {
                trace!(entity, kind = ?effect.kind, "status applied");
                effects.push(effect);
            }
        }
    }

    /// Tick every duration down and drop what expired.
    pub fn update(&mut self, dt_ms: f32) {
        for effects in self.by_entity.values_mut() {
            for effect in effects.iter_mut() {
                effect.remaining_ms -= dt_ms;
            }
            effects.retain(|e| e.remaining_ms > 0.0);
        }
        self.by_entity.retain(|_, effects| !effects.is_empty());
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn effects_of(&self, entity: EntityId) -> &[StatusEffect] {
        self.by_entity
            .get(&entity)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, entity: EntityId, kind: StatusKind) -> Option<&StatusEffect> {
        self.effects_of(entity).iter().find(|e| e.kind == kind)
    }

    pub fn has(&self, entity: EntityId, kind: StatusKind) -> bool {
        self.get(entity, kind).is_some()
    }

    pub fn is_stunned(&self, entity: EntityId) -> bool {
        self.has(entity, StatusKind::Stun) || self.has(entity, StatusKind::Freeze)
    }

    pub fn is_rooted(&self, entity: EntityId) -> bool {
        self.has(entity, StatusKind::Root)
    }

    pub fn can_move(&self, entity: EntityId) -> bool {
        !self.is_stunned(entity) && !self.is_rooted(entity)
    }

    pub fn can_act(&self, entity: EntityId) -> bool {
        !self.is_stunned(entity)
    }

    pub fn speed_multiplier(&self, entity: EntityId) -> f32 {
        if !self.can_move(entity) {
            return 0.0;
        }
        let strongest_slow = self
            .effects_of(entity)
            .iter()
            .filter(|e| e.kind == StatusKind::Slow)
            .filter_map(|e| e.magnitude)
            .fold(0.0_f32, f32::max);
        (1.0 - strongest_slow).max(MIN_SLOW_MULTIPLIER)
    }

    /// Burn damage per second currently ticking on the entity.
    pub fn burn_dps(&self, entity: EntityId) -> f32 {
        self.get(entity, StatusKind::Burn)
            .and_then(|e| e.magnitude)
            .unwrap_or(0.0)
    }

    /// Route incoming damage through the entity's shield, returning what
    /// passes through. A shield that cannot cover the hit is removed.
    pub fn absorb_damage(&mut self, entity: EntityId, amount: f32) -> f32 {
        let Some(effects) = self.by_entity.get_mut(&entity) else {
            return amount;
        };
        let Some(index) = effects.iter().position(|e| e.kind == StatusKind::Shield) else {
            return amount;
        };
        let pool = effects[index].magnitude.unwrap_or(0.0);
        if pool >= amount {
            effects[index].magnitude = Some(pool - amount);
            0.0
        } else {
            effects.swap_remove(index);
            if effects.is_empty() {
                self.by_entity.remove(&entity);
            }
            amount - pool
        }
    }

    /// Drop every effect of a removed entity.
    pub fn clear_entity(&mut self, entity: EntityId) {
        self.by_entity.remove(&entity);
    }

    pub fn active_count(&self) -> usize {
        self.by_entity.values().map(|v| v.len()).sum()
    }

    /// Ids of every entity currently carrying a burn.
    pub fn burning_entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .by_entity
            .iter()
            .filter(|(_, effects)| effects.iter().any(|e| e.kind == StatusKind::Burn))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weaker_slow_refreshes_without_shortening() {
        let mut fx = StatusEffects::new();
        fx.apply(1, StatusEffect::slow(3000.0, 0.5));
        fx.apply(1, StatusEffect::slow(1500.0, 0.3));

        let slows: Vec<_> = fx
            .effects_of(1)
            .iter()
            .filter(|e| e.kind == StatusKind::Slow)
            .collect();
        assert_eq!(slows.len(), 1);
        assert_eq!(slows[0].remaining_ms, 3000.0);
        assert_eq!(slows[0].magnitude, Some(0.5));
    }

    #[test]
    fn stronger_reapplication_extends_and_strengthens() {
        let mut fx = StatusEffects::new();
        fx.apply(1, StatusEffect::slow(1000.0, 0.2));
        fx.apply(1, StatusEffect::slow(2500.0, 0.6));
        let slow = fx.get(1, StatusKind::Slow).unwrap();
        assert_eq!(slow.remaining_ms, 2500.0);
        assert_eq!(slow.magnitude, Some(0.6));
    }

    #[test]
    fn update_expires_effects() {
        let mut fx = StatusEffects::new();
        fx.apply(1, StatusEffect::stun(100.0));
        fx.apply(1, StatusEffect::root(500.0));
        fx.update(100.0);
        assert!(!fx.is_stunned(1));
        assert!(fx.is_rooted(1));
        fx.update(400.0);
        assert_eq!(fx.active_count(), 0);
    }

    #[test]
    fn freeze_counts_as_stun() {
        let mut fx = StatusEffects::new();
        fx.apply(7, StatusEffect::freeze(1000.0));
        assert!(fx.is_stunned(7));
        assert!(!fx.can_act(7));
        assert!(!fx.can_move(7));
        assert_eq!(fx.speed_multiplier(7), 0.0);
    }

    #[test]
    fn root_blocks_movement_but_not_actions() {
        let mut fx = StatusEffects::new();
        fx.apply(2, StatusEffect::root(1000.0));
        assert!(!fx.can_move(2));
        assert!(fx.can_act(2));
        assert_eq!(fx.speed_multiplier(2), 0.0);
    }

    #[test]
    fn slow_is_capped_at_eighty_percent() {
        let mut fx = StatusEffects::new();
        fx.apply(3, StatusEffect::slow(1000.0, 0.95));
        assert!((fx.speed_multiplier(3) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn unaffected_entity_moves_at_full_speed() {
        let fx = StatusEffects::new();
        assert_eq!(fx.speed_multiplier(99), 1.0);
        assert!(fx.can_move(99));
    }

    #[test]
    fn shield_absorbs_partially_and_survives() {
        let mut fx = StatusEffects::new();
        fx.apply(4, StatusEffect::shield(5000.0, 100.0));
        assert_eq!(fx.absorb_damage(4, 40.0), 0.0);
        assert_eq!(fx.get(4, StatusKind::Shield).unwrap().magnitude, Some(60.0));
    }

    #[test]
    fn shield_breaks_and_passes_remainder() {
        let mut fx = StatusEffects::new();
        fx.apply(4, StatusEffect::shield(5000.0, 30.0));
        assert_eq!(fx.absorb_damage(4, 50.0), 20.0);
        assert!(!fx.has(4, StatusKind::Shield));
    }

    #[test]
    fn no_shield_passes_everything() {
        let mut fx = StatusEffects::new();
        fx.apply(4, StatusEffect::slow(500.0, 0.3));
        assert_eq!(fx.absorb_damage(4, 25.0), 25.0);
        assert_eq!(fx.absorb_damage(5, 25.0), 25.0);
    }

    #[test]
    fn clear_entity_removes_all_effects() {
        let mut fx = StatusEffects::new();
        fx.apply(8, StatusEffect::burn(2000.0, 5.0));
        fx.apply(8, StatusEffect::slow(2000.0, 0.3));
        fx.apply(9, StatusEffect::stun(2000.0));
        fx.clear_entity(8);
        assert!(fx.effects_of(8).is_empty());
        assert_eq!(fx.active_count(), 1);
    }

    #[test]
    fn burning_entities_are_listed() {
        let mut fx = StatusEffects::new();
        fx.apply(3, StatusEffect::burn(1000.0, 4.0));
        fx.apply(1, StatusEffect::burn(1000.0, 6.0));
        fx.apply(2, StatusEffect::slow(1000.0, 0.1));
        assert_eq!(fx.burning_entities(), vec![1, 3]);
        assert_eq!(fx.burn_dps(1), 6.0);
    }
}
