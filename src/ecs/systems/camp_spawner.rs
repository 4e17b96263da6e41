use hecs::{Entity, World};
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::ecs::components::Vitals;
use crate::ecs::world::spawn_hostile;
use crate::game::arena::ArenaLayout;
use crate::protocol::Vec2;

/// One jungle camp: a home point and the hostile currently holding it.
#[derive(Debug, Clone)]
pub struct Camp {
    pub home: Vec2,
    pub occupant: Option<Entity>,
    pub respawn_timer_ms: Option<f32>,
}

impl Camp {
    pub fn is_occupied(&self, world: &World) -> bool {
        self.occupant
            .and_then(|e| world.get::<&Vitals>(e).ok().map(|v| !v.is_dead))
            .unwrap_or(false)
    }
}

/// Populate every camp in the layout.
pub fn spawn_camps(world: &mut World, config: &SimConfig, layout: &ArenaLayout) -> Vec<Camp> {
    let camps: Vec<Camp> = layout
        .camps
        .iter()
        .enumerate()
        .map(|(index, home)| Camp {
            home: *home,
            occupant: Some(spawn_hostile(world, config, *home, index)),
            respawn_timer_ms: None,
        })
        .collect();
    info!(camps = camps.len(), "jungle camps populated");
    camps
}

/// Start a respawn countdown once a camp's occupant dies, and refill the camp
/// when it runs out. Returns how many hostiles were spawned.
pub fn camp_spawner_system(
    world: &mut World,
    camps: &mut [Camp],
    config: &SimConfig,
    dt_ms: f32,
) -> usize {
    let mut spawned = 0;
    for (index, camp) in camps.iter_mut().enumerate() {
        if camp.is_occupied(world) {
            continue;
        }
        match camp.respawn_timer_ms {
            None => {
                debug!(camp = index, "camp cleared");
                camp.respawn_timer_ms = Some(config.hostile.camp_respawn_ms);
            }
            Some(remaining) if remaining - dt_ms <= 0.0 => {
                camp.occupant = Some(spawn_hostile(world, config, camp.home, index));
                camp.respawn_timer_ms = None;
                debug!(camp = index, "camp respawned");
                spawned += 1;
            }
            Some(remaining) => camp.respawn_timer_ms = Some(remaining - dt_ms),
        }
    }
    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::Damageable;

    #[test]
    fn cleared_camp_respawns_after_delay() {
        let mut world = World::new();
        let mut config = SimConfig::default();
        config.hostile.camp_respawn_ms = 1000.0;
        let layout = ArenaLayout::standard();
        let mut camps = spawn_camps(&mut world, &config, &layout);
        assert_eq!(camps.len(), layout.camps.len());

        let first = camps[0].occupant.unwrap();
        world.get::<&mut Vitals>(first).unwrap().take_damage(10_000.0);
        world.despawn(first).unwrap();

        assert_eq!(camp_spawner_system(&mut world, &mut camps, &config, 16.0), 0);
        assert_eq!(camps[0].respawn_timer_ms, Some(1000.0));
        assert_eq!(camp_spawner_system(&mut world, &mut camps, &config, 500.0), 0);
        assert_eq!(camp_spawner_system(&mut world, &mut camps, &config, 500.0), 1);
        assert!(camps[0].is_occupied(&world));
        assert_ne!(camps[0].occupant, Some(first));
        // The untouched camp never started a timer.
        assert!(camps[1].respawn_timer_ms.is_none());
    }
}
