use arena_core::ecs::components::MinionRole;
use arena_core::game::character::CharacterState;
use arena_core::game::status::StatusEffect;
use arena_core::protocol::{
    encode_update, AiStateTag, CastTarget, CombatEventKind, EntityId, EntityKind, EntitySnapshot,
    MatchOutcome, PlayerCommand, SimulationUpdate, SlotId, StatusKind, Team, Vec2,
};
use arena_core::{SimConfig, Simulation};

const DT: f32 = 16.0;

/// No waves, no crits: only what the test places acts.
fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.waves.first_wave_ms = 1.0e9;
    config.combat.crit_chance = 0.0;
    config
}

fn quiet_sim() -> Simulation {
    Simulation::with_seed(quiet_config(), None, 42)
}

fn find(update: &SimulationUpdate, id: EntityId) -> Option<&EntitySnapshot> {
    update.entities.iter().find(|e| e.id == id)
}

fn run(sim: &mut Simulation, ticks: usize) -> SimulationUpdate {
    let mut last = sim.tick(DT, &[]);
    for _ in 1..ticks {
        last = sim.tick(DT, &[]);
    }
    last
}

#[test]
fn stun_applied_before_the_tick_is_seen_by_ai() {
    let mut sim = quiet_sim();
    let spawn = sim.layout().avatar_spawn;
    let hostile = sim.spawn_hostile(spawn + Vec2::new(60.0, 0.0));
    assert!(sim.apply_status(hostile, StatusEffect::stun(1000.0)));

    let update = sim.tick(DT, &[]);
    let snap = find(&update, hostile).unwrap();
    assert_eq!(snap.ai_state, Some(AiStateTag::Stunned));
    assert!(snap.effects.contains(&StatusKind::Stun));

    // Stunned units never swing, even in range.
    let update = run(&mut sim, 30);
    let avatar = find(&update, sim.avatar_id()).unwrap();
    assert_eq!(avatar.health, avatar.max_health);
}

#[test]
fn hostile_chases_and_hits_the_avatar() {
    let mut sim = quiet_sim();
    let spawn = sim.layout().avatar_spawn;
    let hostile = sim.spawn_hostile(spawn + Vec2::new(150.0, 0.0));

    let mut hit = false;
    let mut chased = false;
    for _ in 0..300 {
        let update = sim.tick(DT, &[]);
        chased |= find(&update, hostile).and_then(|s| s.ai_state) == Some(AiStateTag::Chase);
        hit |= update
            .events
            .iter()
            .any(|e| e.kind == CombatEventKind::Damage && e.target == sim.avatar_id());
    }
    assert!(chased);
    assert!(hit);
}

#[test]
fn cast_through_command_damages_and_starts_cooldown() {
    let mut sim = quiet_sim();
    let spawn = sim.layout().avatar_spawn;
    let hostile = sim.spawn_hostile(spawn + Vec2::new(80.0, 0.0));
    sim.apply_status(hostile, StatusEffect::stun(10_000.0));

    let update = sim.tick(
        DT,
        &[PlayerCommand::CastAbility {
            slot: SlotId::Q,
            target: CastTarget::Entity(hostile),
        }],
    );
    let snap = find(&update, hostile).unwrap();
    assert_eq!(snap.health, snap.max_health - 45.0);
    let q = update.hud.slots.iter().find(|s| s.slot == SlotId::Q).unwrap();
    assert_eq!(q.ability_id.as_deref(), Some("cleave"));
    assert!(q.cooldown_remaining_ms > 0.0);

    // Second cast on cooldown is a silent no-op.
    assert!(!sim.cast_ability(SlotId::Q, CastTarget::Entity(hostile)));
}

#[test]
fn auto_attack_kills_then_drops_the_target() {
    let mut sim = quiet_sim();
    let spawn = sim.layout().avatar_spawn;
    let hostile = sim.spawn_hostile(spawn + Vec2::new(60.0, 0.0));
    sim.apply_status(hostile, StatusEffect::stun(60_000.0));
    assert!(sim.apply_command(PlayerCommand::AttackTarget { entity: hostile }));

    let update = run(&mut sim, 1300);
    assert!(find(&update, hostile).is_none());
    assert_eq!(sim.current_target(), None);
    assert!(sim.effects().effects_of(hostile).is_empty());
}

#[test]
fn allies_cannot_be_targeted() {
    let mut sim = quiet_sim();
    let spawn = sim.layout().avatar_spawn;
    let ally = sim.spawn_minion(Team::Blue, MinionRole::Melee, spawn + Vec2::new(40.0, 0.0));
    assert!(!sim.apply_command(PlayerCommand::AttackTarget { entity: ally }));
    assert_eq!(sim.current_target(), None);
}

#[test]
fn avatar_dies_waits_and_respawns_at_base() {
    let mut config = quiet_config();
    config.avatar.respawn_ms = 500.0;
    let mut sim = Simulation::with_seed(config, None, 5);
    let spawn = sim.layout().avatar_spawn;

    sim.apply_command(PlayerCommand::MoveTo {
        point: spawn + Vec2::new(0.0, 60.0),
    });
    run(&mut sim, 30);
    sim.apply_status(sim.avatar_id(), StatusEffect::burn(100_000.0, 1.0e6));

    let update = sim.tick(DT, &[]);
    let avatar = find(&update, sim.avatar_id()).unwrap();
    assert!(avatar.is_dead);
    assert_eq!(update.hud.respawn_in_ms, Some(500.0));
    assert!(!sim.apply_command(PlayerCommand::MoveTo { point: spawn }));

    let mut respawned = None;
    for _ in 0..40 {
        let update = sim.tick(DT, &[]);
        if update.hud.respawn_in_ms.is_none() {
            respawned = Some(update);
            break;
        }
    }
    let update = respawned.expect("avatar should respawn");
    let avatar = find(&update, sim.avatar_id()).unwrap();
    assert!(!avatar.is_dead);
    assert_eq!(avatar.health, avatar.max_health);
    assert_eq!(avatar.center, spawn);
    assert!(avatar.effects.is_empty());
    assert_eq!(update.hud.mana, update.hud.max_mana);
}

#[test]
fn waves_spawn_both_sides_on_schedule() {
    let mut config = quiet_config();
    config.waves.first_wave_ms = 100.0;
    let mut sim = Simulation::with_seed(config, None, 8);

    let before = run(&mut sim, 5);
    assert_eq!(before.entities.iter().filter(|e| e.kind == EntityKind::Minion).count(), 0);

    let after = run(&mut sim, 5);
    let minions: Vec<_> = after.entities.iter().filter(|e| e.kind == EntityKind::Minion).collect();
    assert_eq!(minions.len(), 12);
    assert_eq!(minions.iter().filter(|m| m.team == Team::Red).count(), 6);
}

#[test]
fn destroying_the_red_nexus_wins_and_freezes_the_match() {
    let mut config = quiet_config();
    config.waves.first_wave_ms = 200.0;
    let mut sim = Simulation::with_seed(config, None, 9);

    let first = sim.tick(DT, &[]);
    let nexus = first
        .entities
        .iter()
        .find(|e| e.kind == EntityKind::Structure && e.team == Team::Red && e.ai_state.is_none())
        .map(|e| e.id)
        .unwrap();
    sim.apply_status(nexus, StatusEffect::burn(10_000.0, 1.0e9));

    let update = sim.tick(DT, &[]);
    assert_eq!(update.outcome, Some(MatchOutcome::Victory));
    assert!(!sim.apply_command(PlayerCommand::Stop));

    let later = run(&mut sim, 30);
    assert_eq!(later.outcome, Some(MatchOutcome::Victory));
    assert!(later.entities.iter().all(|e| e.kind != EntityKind::Minion));
}

#[test]
fn delayed_area_cast_lands_after_its_delay() {
    let mut sim = quiet_sim();
    sim.unlock_ability("meteor").unwrap();
    sim.equip_weapon("ember_staff").unwrap();
    assert!(sim.equip_ability(SlotId::R, "meteor").valid);

    let spawn = sim.layout().avatar_spawn;
    let point = spawn + Vec2::new(200.0, 0.0);
    let hostile = sim.spawn_hostile(point);
    sim.apply_status(hostile, StatusEffect::stun(10_000.0));

    let update = sim.tick(
        DT,
        &[PlayerCommand::CastAbility {
            slot: SlotId::R,
            target: CastTarget::Point(point),
        }],
    );
    assert_eq!(sim.pending_cast_count(), 1);
    let snap = find(&update, hostile).unwrap();
    assert_eq!(snap.health, snap.max_health);
    let regen = sim.config().avatar.mana_regen_per_sec * DT / 1000.0;
    assert_eq!(update.hud.mana, update.hud.max_mana - 100.0 + regen);

    let update = run(&mut sim, 100);
    assert_eq!(sim.pending_cast_count(), 0);
    let snap = find(&update, hostile).unwrap();
    assert!(snap.health < snap.max_health);
}

#[test]
fn character_state_survives_a_session_round_trip() {
    let mut sim = quiet_sim();
    let repairs = sim.equip_weapon("hunting_bow").unwrap();
    assert!(!repairs.is_empty());
    let blob = sim.character_blob().unwrap();

    let mut restored = Simulation::with_seed(quiet_config(), Some(&blob), 2);
    assert_eq!(restored.character(), sim.character());
    assert_eq!(restored.tick(DT, &[]).hud.weapon_id, "hunting_bow");
}

#[test]
fn malformed_blob_falls_back_to_starter() {
    let sim = Simulation::with_seed(quiet_config(), Some("{not json"), 3);
    assert_eq!(sim.character(), &CharacterState::starter());
}

#[test]
fn hover_tracks_entities_and_snapshot_encodes() {
    let mut sim = quiet_sim();
    let spawn = sim.layout().avatar_spawn;
    let hostile = sim.spawn_hostile(spawn + Vec2::new(300.0, -80.0));
    let update = sim.tick(DT, &[PlayerCommand::Hover { entity: Some(hostile) }]);
    assert_eq!(update.hud.hovered, Some(hostile));

    let bytes = encode_update(&update).unwrap();
    let decoded: SimulationUpdate = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(decoded.tick, update.tick);
    assert_eq!(decoded.entities.len(), update.entities.len());
}

#[test]
fn projectiles_cannot_be_hovered() {
    let mut sim = quiet_sim();
    sim.equip_weapon("hunting_bow").unwrap();
    let spawn = sim.layout().avatar_spawn;
    let hostile = sim.spawn_hostile(spawn + Vec2::new(300.0, 0.0));
    sim.apply_status(hostile, StatusEffect::stun(60_000.0));
    assert!(sim.apply_command(PlayerCommand::AttackTarget { entity: hostile }));

    let mut arrow = None;
    for _ in 0..60 {
        let update = sim.tick(DT, &[]);
        arrow = update
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Projectile)
            .map(|e| e.id);
        if arrow.is_some() {
            break;
        }
    }
    let arrow = arrow.expect("bow should loose an arrow");

    let update = sim.tick(DT, &[PlayerCommand::Hover { entity: Some(arrow) }]);
    assert_eq!(update.hud.hovered, None);

    let update = run(&mut sim, 120);
    assert!(find(&update, arrow).is_none());
    assert_eq!(update.hud.hovered, None);
}
