use hecs::{Entity, World};
use tracing::{debug, info};

use crate::ecs::components::{HostileAi, MinionAi, StructureAi, StructureKind, Vitals};
use crate::protocol::{EntityKind, MatchOutcome, Team};

/// Dead entities whose decay timer ran out. The avatar is never listed.
pub fn removable_entities(world: &World) -> Vec<Entity> {
    let mut out: Vec<Entity> = world
        .query::<(&EntityKind, &Vitals)>()
        .iter()
        .filter(|(_, (kind, vitals))| **kind != EntityKind::Avatar && vitals.is_removable())
        .map(|(e, _)| e)
        .collect();
    out.sort_by_key(|e| e.id());
    out
}

/// Drop every AI reference to `removed` so nothing chases a stale handle.
pub fn forget_entity(world: &mut World, removed: Entity) {
    for (_, ai) in world.query_mut::<&mut StructureAi>() {
        ai.forget(removed);
    }
    for (_, ai) in world.query_mut::<&mut HostileAi>() {
        if ai.target == Some(removed) {
            ai.target = None;
            ai.path.clear();
        }
    }
    for (_, ai) in world.query_mut::<&mut MinionAi>() {
        if ai.target == Some(removed) {
            ai.target = None;
            ai.path.clear();
        }
    }
    debug!(entity = ?removed, "references cleared");
}

/// A destroyed nexus decides the match from the blue side's point of view.
pub fn check_outcome(world: &World) -> Option<MatchOutcome> {
    let mut outcome = None;
    for (_, (ai, team, vitals)) in world.query::<(&StructureAi, &Team, &Vitals)>().iter() {
        if ai.kind != StructureKind::Nexus || !vitals.is_dead {
            continue;
        }
        match team {
            Team::Red => outcome = Some(MatchOutcome::Victory),
            Team::Blue => return Some(MatchOutcome::Defeat),
            Team::Neutral => {}
        }
    }
    if let Some(result) = outcome {
        info!(?result, "match decided");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::ecs::entity::{Damageable, Updatable};
    use crate::ecs::world::{spawn_hostile, spawn_structure};
    use crate::protocol::Vec2;

    #[test]
    fn only_fully_decayed_dead_are_removable() {
        let mut world = World::new();
        let config = SimConfig::default();
        let alive = spawn_hostile(&mut world, &config, Vec2::new(0.0, 0.0), 0);
        let dead = spawn_hostile(&mut world, &config, Vec2::new(50.0, 0.0), 0);
        world.get::<&mut Vitals>(dead).unwrap().take_damage(10_000.0);
        assert!(removable_entities(&world).is_empty());

        world.get::<&mut Vitals>(dead).unwrap().update(config.combat.death_decay_ms);
        assert_eq!(removable_entities(&world), vec![dead]);
        assert!(world.contains(alive));
    }

    #[test]
    fn forgetting_clears_structure_aggro() {
        let mut world = World::new();
        let config = SimConfig::default();
        let tower =
            spawn_structure(&mut world, &config, Team::Red, StructureKind::Tower, Vec2::ZERO);
        let victim = spawn_hostile(&mut world, &config, Vec2::new(50.0, 0.0), 0);
        world.get::<&mut StructureAi>(tower).unwrap().aggro = Some(victim);

        forget_entity(&mut world, victim);
        assert!(world.get::<&StructureAi>(tower).unwrap().aggro.is_none());
    }

    #[test]
    fn destroyed_red_nexus_is_a_victory() {
        let mut world = World::new();
        let config = SimConfig::default();
        let red = spawn_structure(&mut world, &config, Team::Red, StructureKind::Nexus, Vec2::ZERO);
        let blue_home = Vec2::new(500.0, 0.0);
        spawn_structure(&mut world, &config, Team::Blue, StructureKind::Nexus, blue_home);
        assert_eq!(check_outcome(&world), None);

        world.get::<&mut Vitals>(red).unwrap().take_damage(1_000_000.0);
        assert_eq!(check_outcome(&world), Some(MatchOutcome::Victory));
    }
}
