use hecs::{Entity, World};
use tracing::debug;

use crate::ecs::components::{AttackStats, Body, StructureAi, Vitals};
use crate::ecs::entity::{entity_id, Updatable};
use crate::protocol::{AiStateTag, EntityKind, Team, Vec2};

use super::{collect_candidates, nearest, AiContext, Candidate, Strike};

impl StructureAi {
    pub fn state_tag(&self) -> AiStateTag {
        if self.aggro.is_some() {
            AiStateTag::Aggro
        } else {
            AiStateTag::Guarding
        }
    }
}

/// Resolve the structure's target for this tick.
///
/// `candidates` are the live enemies the structure may shoot. A due override
/// wins if its attacker is in range; otherwise the sticky target is kept while
/// it stays in range. With no sticky target the nearest in-range minion is
/// taken, then the nearest in-range champion.
pub fn try_attack(
    ai: &mut StructureAi,
    center: Vec2,
    range: f32,
    candidates: &[Candidate],
) -> Option<Entity> {
    let in_range = |entity: Entity| {
        candidates
            .iter()
            .any(|c| c.entity == entity && c.reach_from(center) <= range)
    };

    if let Some(pending) = ai.pending_override {
        if pending.delay_remaining_ms <= 0.0 {
            ai.pending_override = None;
            if in_range(pending.attacker) {
                ai.aggro = Some(pending.attacker);
            }
        }
    }

    if let Some(current) = ai.aggro {
        if !in_range(current) {
            ai.aggro = None;
        }
    }

    if ai.aggro.is_none() {
        let minion = nearest(center, candidates, |c| {
            c.kind == EntityKind::Minion && c.reach_from(center) <= range
        });
        let champion = || {
            nearest(center, candidates, |c| {
                c.kind == EntityKind::Avatar && c.reach_from(center) <= range
            })
        };
        ai.aggro = minion.or_else(champion).map(|c| c.entity);
    }

    ai.aggro
}

/// Towers pick and fire at targets; a nexus has no attack and is skipped.
pub fn structure_ai_system(world: &mut World, ctx: &AiContext) -> Vec<Strike> {
    let candidates = collect_candidates(world);
    let mut strikes = Vec::new();

    for (entity, (ai, body, team, vitals, attack)) in
        world.query_mut::<(&mut StructureAi, &Body, &Team, &Vitals, &mut AttackStats)>()
    {
        if vitals.is_dead || ctx.effects.is_stunned(entity_id(entity)) {
            continue;
        }
        ai.update(ctx.dt_ms);
        attack.update(ctx.dt_ms);

        let enemies: Vec<Candidate> = candidates
            .iter()
            .filter(|c| c.team == team.opponent() && *team != Team::Neutral)
            .copied()
            .collect();
        let center = body.center();
        let before = ai.aggro;
        let target = try_attack(ai, center, attack.range, &enemies);
        if target != before {
            debug!(
                structure = entity_id(entity),
                target = ?target.map(entity_id),
                "structure aggro changed"
            );
        }

        let Some(target) = target else { continue };
        if attack.ready() {
            attack.trigger();
            strikes.push(Strike {
                attacker: entity,
                target,
                team: *team,
                origin: center,
                damage: attack.damage,
                ranged: true,
            });
        }
    }

    strikes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::StructureKind;

    struct Scene {
        world: World,
    }

    impl Scene {
        fn new() -> Self {
            Self { world: World::new() }
        }

        fn unit(&mut self, kind: EntityKind, x: f32) -> Candidate {
            Candidate {
                entity: self.world.spawn((0u8,)),
                kind,
                team: Team::Blue,
                center: Vec2::new(x, 0.0),
                hit_radius: 10.0,
            }
        }
    }

    #[test]
    fn prefers_minions_over_closer_champions() {
        let mut scene = Scene::new();
        let champ = scene.unit(EntityKind::Avatar, 100.0);
        let minion = scene.unit(EntityKind::Minion, 300.0);
        let mut ai = StructureAi::new(StructureKind::Tower);
        assert_eq!(try_attack(&mut ai, Vec2::ZERO, 400.0, &[champ, minion]), Some(minion.entity));
    }

    #[test]
    fn sticky_target_is_kept_while_in_range() {
        let mut scene = Scene::new();
        let champ = scene.unit(EntityKind::Avatar, 100.0);
        let minion = scene.unit(EntityKind::Minion, 300.0);
        let mut ai = StructureAi::new(StructureKind::Tower);
        ai.aggro = Some(champ.entity);
        assert_eq!(try_attack(&mut ai, Vec2::ZERO, 400.0, &[champ, minion]), Some(champ.entity));
    }

    #[test]
    fn dead_sticky_target_falls_back_to_priority() {
        let mut scene = Scene::new();
        let champ = scene.unit(EntityKind::Avatar, 100.0);
        let first = scene.unit(EntityKind::Minion, 200.0);
        let second = scene.unit(EntityKind::Minion, 300.0);
        let mut ai = StructureAi::new(StructureKind::Tower);
        assert_eq!(
            try_attack(&mut ai, Vec2::ZERO, 400.0, &[champ, first, second]),
            Some(first.entity)
        );
        // `first` died and is no longer a candidate.
        assert_eq!(try_attack(&mut ai, Vec2::ZERO, 400.0, &[champ, second]), Some(second.entity));
        // Only the champion is left.
        assert_eq!(try_attack(&mut ai, Vec2::ZERO, 400.0, &[champ]), Some(champ.entity));
    }

    #[test]
    fn leaving_range_drops_aggro() {
        let mut scene = Scene::new();
        let mut minion = scene.unit(EntityKind::Minion, 300.0);
        let mut ai = StructureAi::new(StructureKind::Tower);
        try_attack(&mut ai, Vec2::ZERO, 400.0, &[minion]);
        minion.center = Vec2::new(500.0, 0.0);
        assert_eq!(try_attack(&mut ai, Vec2::ZERO, 400.0, &[minion]), None);
        assert_eq!(ai.state_tag(), AiStateTag::Guarding);
    }

    #[test]
    fn override_waits_for_the_delay() {
        let mut scene = Scene::new();
        let champ = scene.unit(EntityKind::Avatar, 150.0);
        let minion = scene.unit(EntityKind::Minion, 100.0);
        let mut ai = StructureAi::new(StructureKind::Tower);
        assert_eq!(try_attack(&mut ai, Vec2::ZERO, 400.0, &[champ, minion]), Some(minion.entity));

        ai.notify_ally_attacked(champ.entity, 500.0);
        ai.update(300.0);
        assert_eq!(try_attack(&mut ai, Vec2::ZERO, 400.0, &[champ, minion]), Some(minion.entity));

        // Repeated notifications do not restart the delay.
        ai.notify_ally_attacked(champ.entity, 500.0);
        ai.update(200.0);
        assert_eq!(try_attack(&mut ai, Vec2::ZERO, 400.0, &[champ, minion]), Some(champ.entity));
        assert!(ai.pending_override.is_none());
        assert_eq!(ai.state_tag(), AiStateTag::Aggro);
    }

    #[test]
    fn override_for_out_of_range_attacker_is_dropped() {
        let mut scene = Scene::new();
        let champ = scene.unit(EntityKind::Avatar, 900.0);
        let minion = scene.unit(EntityKind::Minion, 100.0);
        let mut ai = StructureAi::new(StructureKind::Tower);
        ai.notify_ally_attacked(champ.entity, 0.0);
        assert_eq!(try_attack(&mut ai, Vec2::ZERO, 400.0, &[champ, minion]), Some(minion.entity));
        assert!(ai.pending_override.is_none());
    }
}
