//! The per-session scheduler. Owns the world, the status-effect store and
//! every session-scoped handle, and runs one fixed-order pass per frame.

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::ai::hostile_ai::{hostile_ai_system, state_tag};
use crate::ai::minion_ai::minion_ai_system;
use crate::ai::steering::SpatialIndex;
use crate::ai::structure_ai::structure_ai_system;
use crate::ai::{AiContext, Strike};
use crate::config::SimConfig;
use crate::ecs::components::{
    AttackStats, AvatarState, Body, HostileAi, MinionAi, MinionRole, StructureAi, StructureKind,
    Vitals,
};
use crate::ecs::entity::{entity_from_id, entity_id, Damageable};
use crate::ecs::systems::camp_spawner::{camp_spawner_system, spawn_camps, Camp};
use crate::ecs::systems::cleanup::{check_outcome, forget_entity, removable_entities};
use crate::ecs::systems::combat::{
    self, auto_attack_system, enemy_of, homing_shot, resolve_pending_casts, AvatarModifiers, Caster,
    Combat, Crit, PendingCast,
};
use crate::ecs::systems::lifecycle::lifecycle_system;
use crate::ecs::systems::player::player_system;
use crate::ecs::systems::projectile::projectile_system;
use crate::ecs::systems::waves::{wave_system, WaveSpawner};
use crate::ecs::world::{
    populate_structures, spawn_avatar, spawn_hostile, spawn_minion, spawn_projectile,
    unarmed_attack, weapon_attack,
};
use crate::error::{CharacterStateError, LoadoutError};
use crate::game::arena::ArenaLayout;
use crate::game::build_rules::{SlotRepair, Validation};
use crate::game::catalog::Catalog;
use crate::game::character::CharacterState;
use crate::game::pathfinding::NavGrid;
use crate::game::status::{StatusEffect, StatusEffects};
use crate::protocol::{
    CastTarget, CombatEvent, EntityId, EntityKind, EntitySnapshot, HudSnapshot, MatchOutcome,
    PlayerCommand, SimulationUpdate, SlotHud, SlotId, StatsSnapshot, Team, Tick, Vec2,
};

/// Weight of the newest sample in the smoothed tick rate.
const TICK_RATE_SMOOTHING: f32 = 0.1;

/// The fixed phases of one tick, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickPhase {
    StatusEffects,
    Player,
    AutoAttack,
    Ai,
    Projectiles,
    Cleanup,
    Waves,
    Snapshot,
}

impl TickPhase {
    pub const ORDER: [TickPhase; 8] = [
        TickPhase::StatusEffects,
        TickPhase::Player,
        TickPhase::AutoAttack,
        TickPhase::Ai,
        TickPhase::Projectiles,
        TickPhase::Cleanup,
        TickPhase::Waves,
        TickPhase::Snapshot,
    ];
}

pub struct Simulation {
    config: SimConfig,
    world: World,
    effects: StatusEffects,
    layout: ArenaLayout,
    grid: NavGrid,
    catalog: Catalog,
    character: CharacterState,
    modifiers: AvatarModifiers,
    avatar: Entity,
    current_target: Option<Entity>,
    hovered: Option<Entity>,
    pending_casts: Vec<PendingCast>,
    waves: WaveSpawner,
    camps: Vec<Camp>,
    neighbors: SpatialIndex,
    rng: StdRng,
    events: Vec<CombatEvent>,
    outcome: Option<MatchOutcome>,
    frame: Tick,
    tick_order: Vec<TickPhase>,
    tick_rate: f32,
}

impl Simulation {
    /// Start a session. A missing or unreadable character blob falls back to
    /// the starter build.
    pub fn new(config: SimConfig, character_blob: Option<&str>) -> Self {
        Self::build(config, character_blob, StdRng::from_entropy())
    }

    /// Same as [`Simulation::new`] with a fixed random stream.
    pub fn with_seed(config: SimConfig, character_blob: Option<&str>, seed: u64) -> Self {
        Self::build(config, character_blob, StdRng::seed_from_u64(seed))
    }

    fn build(config: SimConfig, character_blob: Option<&str>, rng: StdRng) -> Self {
        let layout = ArenaLayout::standard();
        let grid = layout.nav_grid();
        let catalog = Catalog::standard();
        let character = CharacterState::load_or_default(&catalog, character_blob);
        let modifiers = AvatarModifiers::resolve(&catalog, &character);

        let mut world = World::new();
        populate_structures(&mut world, &config, &layout);
        let attack = character
            .weapon(&catalog)
            .map(weapon_attack)
            .unwrap_or_else(unarmed_attack);
        let avatar = spawn_avatar(&mut world, &config, layout.avatar_spawn, attack);
        let camps = spawn_camps(&mut world, &config, &layout);

        info!(
            weapon = %character.weapon_id,
            passive = ?character.loadout.passive,
            entities = world.len(),
            "session started"
        );

        Self {
            waves: WaveSpawner::new(&config.waves),
            neighbors: SpatialIndex::new(config.ai.spatial_cell_size),
            config,
            world,
            effects: StatusEffects::new(),
            layout,
            grid,
            catalog,
            character,
            modifiers,
            avatar,
            current_target: None,
            hovered: None,
            pending_casts: Vec::new(),
            camps,
            rng,
            events: Vec::new(),
            outcome: None,
            frame: 0,
            tick_order: Vec::with_capacity(TickPhase::ORDER.len()),
            tick_rate: 0.0,
        }
    }

    // ── Tick ────────────────────────────────────────────────────────

    /// Run one full pass. Commands are applied at the start of the player
    /// phase, in order.
    pub fn tick(&mut self, dt_ms: f32, commands: &[PlayerCommand]) -> SimulationUpdate {
        let dt_ms = dt_ms.max(0.0);
        self.frame += 1;
        self.tick_order.clear();
        self.events.clear();

        let mut update = None;
        for phase in TickPhase::ORDER {
            match phase {
                TickPhase::StatusEffects => self.status_phase(dt_ms),
                TickPhase::Player => self.player_phase(dt_ms, commands),
                TickPhase::AutoAttack => self.auto_attack_phase(dt_ms),
                TickPhase::Ai => self.ai_phase(dt_ms),
                TickPhase::Projectiles => self.projectile_phase(dt_ms),
                TickPhase::Cleanup => self.cleanup_phase(),
                TickPhase::Waves => self.waves_phase(dt_ms),
                TickPhase::Snapshot => {
                    self.update_tick_rate(dt_ms);
                    update = Some(self.snapshot());
                }
            }
            self.tick_order.push(phase);
        }

        update.unwrap_or_else(|| self.snapshot())
    }

    fn status_phase(&mut self, dt_ms: f32) {
        let mut combat = Combat {
            world: &mut self.world,
            effects: &mut self.effects,
            events: &mut self.events,
            rng: &mut self.rng,
            config: &self.config,
        };
        lifecycle_system(&mut combat, dt_ms);
    }

    fn player_phase(&mut self, dt_ms: f32, commands: &[PlayerCommand]) {
        for command in commands {
            self.apply_command(*command);
        }
        player_system(
            &mut self.world,
            &mut self.effects,
            &self.grid,
            &self.config,
            self.avatar,
            self.modifiers.move_speed_bonus,
            dt_ms,
        );
        let mut combat = Combat {
            world: &mut self.world,
            effects: &mut self.effects,
            events: &mut self.events,
            rng: &mut self.rng,
            config: &self.config,
        };
        resolve_pending_casts(&mut combat, &mut self.pending_casts, &self.modifiers, dt_ms);
    }

    fn auto_attack_phase(&mut self, dt_ms: f32) {
        if self.outcome.is_some() {
            return;
        }
        let mut combat = Combat {
            world: &mut self.world,
            effects: &mut self.effects,
            events: &mut self.events,
            rng: &mut self.rng,
            config: &self.config,
        };
        auto_attack_system(
            &mut combat,
            &self.grid,
            self.avatar,
            &self.modifiers,
            &mut self.current_target,
            dt_ms,
        );
    }

    fn ai_phase(&mut self, dt_ms: f32) {
        if self.outcome.is_some() {
            return;
        }

        self.neighbors.clear();
        {
            let mut units = self.world.query::<(&EntityKind, &Body, &Vitals)>();
            for (entity, (kind, body, vitals)) in units.iter() {
                if matches!(kind, EntityKind::HostileUnit | EntityKind::Minion) && !vitals.is_dead {
                    self.neighbors.insert(entity, body.center());
                }
            }
        }

        let avatar_target = self.avatar_center().map(|center| (self.avatar, center));
        let ctx = AiContext {
            config: &self.config,
            grid: &self.grid,
            effects: &self.effects,
            neighbors: &self.neighbors,
            frame: self.frame,
            dt_ms,
        };
        let mut strikes = hostile_ai_system(&mut self.world, &ctx, avatar_target);
        strikes.extend(minion_ai_system(&mut self.world, &ctx, &self.layout));
        strikes.extend(structure_ai_system(&mut self.world, &ctx));

        self.resolve_strikes(strikes);
    }

    /// Melee strikes land now; ranged ones become homing shots.
    fn resolve_strikes(&mut self, strikes: Vec<Strike>) {
        let speed = self.config.combat.projectile_speed;
        let mut combat = Combat {
            world: &mut self.world,
            effects: &mut self.effects,
            events: &mut self.events,
            rng: &mut self.rng,
            config: &self.config,
        };
        for strike in strikes {
            if strike.ranged {
                let shot = homing_shot(
                    strike.attacker,
                    strike.team,
                    strike.origin,
                    strike.target,
                    strike.damage,
                    speed,
                );
                spawn_projectile(combat.world, shot);
            } else {
                let source = Some(strike.attacker);
                combat.apply_damage(strike.target, source, strike.damage, Crit::Roll);
            }
        }
    }

    fn projectile_phase(&mut self, dt_ms: f32) {
        let result = projectile_system(&mut self.world, &self.grid, dt_ms);
        for spent in &result.despawned {
            self.release_references(*spent);
        }
        let mut combat = Combat {
            world: &mut self.world,
            effects: &mut self.effects,
            events: &mut self.events,
            rng: &mut self.rng,
            config: &self.config,
        };
        for hit in result.hits {
            if hit.from_avatar {
                combat.avatar_hit(self.avatar, &self.modifiers, hit.target, hit.damage, hit.on_hit);
                continue;
            }
            let report = combat.apply_damage(hit.target, hit.owner, hit.damage, Crit::Roll);
            if let (Some(report), Some(effect)) = (report, hit.on_hit) {
                if !report.killed {
                    combat.effects.apply(entity_id(hit.target), effect);
                }
            }
        }
    }

    fn cleanup_phase(&mut self) {
        for entity in removable_entities(&self.world) {
            self.remove_entity(entity);
        }
        if self.outcome.is_none() {
            self.outcome = check_outcome(&self.world);
        }
    }

    fn waves_phase(&mut self, dt_ms: f32) {
        if self.outcome.is_some() {
            return;
        }
        wave_system(&mut self.world, &mut self.waves, &self.config, &self.layout, dt_ms);
        camp_spawner_system(&mut self.world, &mut self.camps, &self.config, dt_ms);
    }

    fn update_tick_rate(&mut self, dt_ms: f32) {
        let sample = if dt_ms > 0.0 { 1000.0 / dt_ms } else { 0.0 };
        self.tick_rate = if self.frame <= 1 {
            sample
        } else {
            self.tick_rate + (sample - self.tick_rate) * TICK_RATE_SMOOTHING
        };
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Apply one input command. Returns whether it had any effect. Commands
    /// other than hover are ignored while the avatar is dead or the match is
    /// over.
    pub fn apply_command(&mut self, command: PlayerCommand) -> bool {
        if let PlayerCommand::Hover { entity } = command {
            self.hovered = entity.and_then(entity_from_id).filter(|e| {
                *e != self.avatar
                    && self
                        .world
                        .get::<&EntityKind>(*e)
                        .is_ok_and(|kind| *kind != EntityKind::Projectile)
            });
            return true;
        }
        if self.outcome.is_some() || !self.avatar_alive() {
            return false;
        }

        match command {
            PlayerCommand::MoveTo { point } => {
                self.current_target = None;
                self.set_move_target(Some(point));
                true
            }
            PlayerCommand::AttackTarget { entity } => {
                let Some(target) = entity_from_id(entity) else {
                    return false;
                };
                if enemy_of(&self.world, Team::Blue, target).is_none() {
                    return false;
                }
                debug!(target = entity, "attack target set");
                self.current_target = Some(target);
                self.set_move_target(None);
                true
            }
            PlayerCommand::ClearTarget => self.current_target.take().is_some(),
            PlayerCommand::CastAbility { slot, target } => self.cast_ability(slot, target),
            PlayerCommand::Stop => {
                self.current_target = None;
                self.set_move_target(None);
                true
            }
            PlayerCommand::Hover { .. } => false,
        }
    }

    /// Cast the ability in `slot`. Every failed precondition is a silent
    /// `false`.
    pub fn cast_ability(&mut self, slot: SlotId, target: CastTarget) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        let caster = Caster {
            entity: self.avatar,
            character: &self.character,
            catalog: &self.catalog,
            modifiers: &self.modifiers,
            current_target: self.current_target,
        };
        let mut combat = Combat {
            world: &mut self.world,
            effects: &mut self.effects,
            events: &mut self.events,
            rng: &mut self.rng,
            config: &self.config,
        };
        let pending = &mut self.pending_casts;
        combat::cast_ability(&mut combat, &self.grid, &caster, slot, target, pending)
    }

    fn set_move_target(&mut self, point: Option<Vec2>) {
        if let Ok(mut state) = self.world.get::<&mut AvatarState>(self.avatar) {
            state.move_target = point;
        }
    }

    // ── Entity management ───────────────────────────────────────────

    /// Despawn an entity and every reference to it, including its status
    /// effects. The avatar is never removed.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        if entity == self.avatar || self.world.despawn(entity).is_err() {
            return false;
        }
        self.release_references(entity);
        true
    }

    /// Drop every session reference to an entity that has left the world.
    fn release_references(&mut self, entity: Entity) {
        self.effects.clear_entity(entity_id(entity));
        if self.current_target == Some(entity) {
            self.current_target = None;
        }
        if self.hovered == Some(entity) {
            self.hovered = None;
        }
        forget_entity(&mut self.world, entity);
    }

    pub fn spawn_hostile(&mut self, home: Vec2) -> EntityId {
        let camp = self.camps.len();
        entity_id(spawn_hostile(&mut self.world, &self.config, home, camp))
    }

    pub fn spawn_minion(&mut self, team: Team, role: MinionRole, center: Vec2) -> EntityId {
        entity_id(spawn_minion(&mut self.world, &self.config, team, role, center))
    }

    /// Apply a status effect to a live entity.
    pub fn apply_status(&mut self, entity: EntityId, effect: StatusEffect) -> bool {
        let alive = entity_from_id(entity)
            .and_then(|e| self.world.get::<&Vitals>(e).ok().map(|v| v.is_alive()))
            .unwrap_or(false);
        if alive {
            self.effects.apply(entity, effect);
        }
        alive
    }

    // ── Loadout ─────────────────────────────────────────────────────

    pub fn equip_ability(&mut self, slot: SlotId, ability_id: &str) -> Validation {
        let result = self.character.equip_ability(&self.catalog, slot, ability_id);
        self.refresh_modifiers();
        result
    }

    pub fn equip_passive(&mut self, passive_id: &str) -> Validation {
        let result = self.character.equip_passive(&self.catalog, passive_id);
        self.refresh_modifiers();
        result
    }

    pub fn unequip(&mut self, slot: SlotId) -> Option<String> {
        self.character.unequip(slot)
    }

    /// Swap weapons, repairing slots the new weapon cannot use.
    pub fn equip_weapon(&mut self, weapon_id: &str) -> Result<Vec<SlotRepair>, LoadoutError> {
        let previous = self.character.weapon_id.clone();
        let repairs = self.character.equip_weapon(&self.catalog, weapon_id)?;
        self.refresh_modifiers();
        if self.character.weapon_id != previous {
            self.refresh_weapon();
        }
        Ok(repairs)
    }

    pub fn unlock_ability(&mut self, id: &str) -> Result<bool, LoadoutError> {
        self.character.unlock_ability(&self.catalog, id)
    }

    pub fn unlock_weapon(&mut self, id: &str) -> Result<bool, LoadoutError> {
        self.character.unlock_weapon(&self.catalog, id)
    }

    pub fn unlock_passive(&mut self, id: &str) -> Result<bool, LoadoutError> {
        self.character.unlock_passive(&self.catalog, id)
    }

    /// Serialized character state for the persistence layer.
    pub fn character_blob(&self) -> Result<String, CharacterStateError> {
        self.character.to_blob()
    }

    fn refresh_modifiers(&mut self) {
        self.modifiers = AvatarModifiers::resolve(&self.catalog, &self.character);
    }

    /// New weapon numbers; the swing already on cooldown keeps its timer.
    fn refresh_weapon(&mut self) {
        let attack = self
            .character
            .weapon(&self.catalog)
            .map(weapon_attack)
            .unwrap_or_else(unarmed_attack);
        if let Ok(mut stats) = self.world.get::<&mut AttackStats>(self.avatar) {
            stats.damage = attack.damage;
            stats.range = attack.range;
            stats.cooldown_ms = attack.cooldown_ms;
            stats.ranged = attack.ranged;
        }
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn character(&self) -> &CharacterState {
        &self.character
    }

    pub fn modifiers(&self) -> &AvatarModifiers {
        &self.modifiers
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn effects(&self) -> &StatusEffects {
        &self.effects
    }

    pub fn avatar(&self) -> Entity {
        self.avatar
    }

    pub fn avatar_id(&self) -> EntityId {
        entity_id(self.avatar)
    }

    pub fn current_target(&self) -> Option<EntityId> {
        self.current_target.map(entity_id)
    }

    pub fn hovered(&self) -> Option<EntityId> {
        self.hovered.map(entity_id)
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn frame(&self) -> Tick {
        self.frame
    }

    pub fn pending_cast_count(&self) -> usize {
        self.pending_casts.len()
    }

    /// Phases the latest tick ran, in order.
    pub fn last_tick_order(&self) -> &[TickPhase] {
        &self.tick_order
    }

    fn avatar_alive(&self) -> bool {
        self.world
            .get::<&Vitals>(self.avatar)
            .map(|v| v.is_alive())
            .unwrap_or(false)
    }

    fn avatar_center(&self) -> Option<Vec2> {
        if !self.avatar_alive() {
            return None;
        }
        self.world.get::<&Body>(self.avatar).ok().map(|b| b.center())
    }

    // ── Snapshot ────────────────────────────────────────────────────

    fn snapshot(&mut self) -> SimulationUpdate {
        let mut entities: Vec<EntitySnapshot> = self
            .world
            .query::<(
                &EntityKind,
                &Team,
                &Body,
                Option<&Vitals>,
                Option<&HostileAi>,
                Option<&MinionAi>,
                Option<&StructureAi>,
            )>()
            .iter()
            .map(|(entity, (kind, team, body, vitals, hostile, minion, structure))| {
                let id = entity_id(entity);
                let ai_state = hostile
                    .map(|ai| state_tag(ai.state))
                    .or_else(|| minion.map(|ai| ai.state_tag()))
                    .or_else(|| {
                        structure
                            .filter(|ai| ai.kind == StructureKind::Tower)
                            .map(|ai| ai.state_tag())
                    });
                EntitySnapshot {
                    id,
                    kind: *kind,
                    team: *team,
                    position: body.position,
                    center: body.center(),
                    width: body.width,
                    height: body.height,
                    hit_radius: body.hit_radius,
                    health: vitals.map_or(0.0, |v| v.health),
                    max_health: vitals.map_or(0.0, |v| v.max_health),
                    is_dead: vitals.is_some_and(|v| v.is_dead),
                    was_hit: vitals.is_some_and(|v| v.was_hit()),
                    effects: self.effects.effects_of(id).iter().map(|e| e.kind).collect(),
                    ai_state,
                }
            })
            .collect();
        entities.sort_by_key(|e| e.id);

        SimulationUpdate {
            tick: self.frame,
            entities,
            stats: StatsSnapshot {
                tick_rate: self.tick_rate,
                live_entities: self.world.len(),
                active_effects: self.effects.active_count(),
            },
            events: std::mem::take(&mut self.events),
            hud: self.hud(),
            outcome: self.outcome,
        }
    }

    fn hud(&self) -> HudSnapshot {
        let state = self.world.get::<&AvatarState>(self.avatar).ok();
        let slots = SlotId::ALL
            .iter()
            .map(|slot| {
                let ability = self.character.loadout.get(*slot);
                SlotHud {
                    slot: *slot,
                    ability_id: ability.map(str::to_string),
                    cooldown_remaining_ms: match (ability, state.as_ref()) {
                        (Some(id), Some(state)) => state.cooldown_of(id),
                        _ => 0.0,
                    },
                }
            })
            .collect();

        HudSnapshot {
            weapon_id: self.character.weapon_id.clone(),
            passive_id: self.character.loadout.passive.clone(),
            slots,
            mana: state.as_ref().map_or(0.0, |s| s.mana),
            max_mana: state.as_ref().map_or(0.0, |s| s.max_mana),
            current_target: self.current_target.map(entity_id),
            hovered: self.hovered.map(entity_id),
            respawn_in_ms: state.as_ref().and_then(|s| s.respawn_timer_ms),
        }
    }
}
