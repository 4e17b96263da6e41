use tracing::trace;

use crate::ecs::components::Vitals;
use crate::ecs::entity::{entity_from_id, Updatable};
use crate::protocol::StatusKind;

use super::combat::{Combat, Crit};

/// Burn ticks, effect expiry and per-entity hit/decay timers.
/// Returns how many entities took burn damage.
pub fn lifecycle_system(combat: &mut Combat, dt_ms: f32) -> usize {
    let mut burned = 0;
    for id in combat.effects.burning_entities() {
        let Some(entity) = entity_from_id(id) else { continue };
        let amount = combat.effects.burn_dps(id) * dt_ms / 1000.0;
        let source = combat
            .effects
            .get(id, StatusKind::Burn)
            .and_then(|e| e.source)
            .and_then(entity_from_id);
        if combat.apply_damage(entity, source, amount, Crit::Never).is_some() {
            burned += 1;
        }
    }
    if burned > 0 {
        trace!(burned, "burn ticks applied");
    }

    combat.effects.update(dt_ms);
    for (_, vitals) in combat.world.query_mut::<&mut Vitals>() {
        vitals.update(dt_ms);
    }
    burned
}
