use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, trace};

use crate::ai::steering::{apply_movement, dash_destination};
use crate::config::SimConfig;
use crate::ecs::components::{
    AttackStats, AvatarState, Body, MoveSpeed, ProjectileMotion, StructureAi, Vitals,
};
use crate::ecs::entity::{entity_from_id, entity_id, take_damage_with_shield, Damageable};
use crate::ecs::world::{spawn_projectile, ProjectileSpawn};
use crate::game::catalog::{AbilityEffect, Catalog, PassiveEffect, WeaponSpecial};
use crate::game::character::CharacterState;
use crate::game::pathfinding::NavGrid;
use crate::game::status::{StatusEffect, StatusEffects};
use crate::protocol::{CastTarget, CombatEvent, CombatEventKind, EntityKind, SlotId, Team, Vec2};

/// Homing shots give up after travelling this far.
const HOMING_MAX_TRAVEL: f32 = 2400.0;

// ── Damage math ──────────────────────────────────────────────────────

/// How a hit decides whether it is critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crit {
    Roll,
    Always,
    Never,
}

pub fn roll_critical(rng: &mut impl Rng, chance: f32) -> bool {
    chance > 0.0 && rng.gen::<f32>() < chance
}

pub fn damage_amount(base: f32, critical: bool, multiplier: f32) -> f32 {
    if critical {
        base * multiplier
    } else {
        base
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DamageReport {
    /// Damage after the critical roll, before shields.
    pub amount: f32,
    pub absorbed: f32,
    pub dealt: f32,
    pub critical: bool,
    pub killed: bool,
}

// ── Avatar modifiers ─────────────────────────────────────────────────

/// Weapon special plus passive, flattened for the hot path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvatarModifiers {
    pub damage_bonus: f32,
    pub lifesteal: f32,
    pub cooldown_reduction: f32,
    pub move_speed_bonus: f32,
    pub on_hit: Vec<StatusEffect>,
}

impl AvatarModifiers {
    pub fn resolve(catalog: &Catalog, character: &CharacterState) -> Self {
        let mut mods = Self::default();

        match character.weapon(catalog).and_then(|w| w.special) {
            Some(WeaponSpecial::Lifesteal) => mods.lifesteal += 0.10,
            Some(WeaponSpecial::BurnOnHit) => mods.on_hit.push(StatusEffect::burn(2000.0, 5.0)),
            Some(WeaponSpecial::ChillOnHit) => mods.on_hit.push(StatusEffect::slow(1500.0, 0.25)),
            None => {}
        }

        let passive = character
            .loadout
            .passive
            .as_deref()
            .and_then(|id| catalog.passive(id));
        if let Some(passive) = passive {
            match passive.effect {
                PassiveEffect::DamageBonus(x) => mods.damage_bonus += x,
                PassiveEffect::Lifesteal(x) => mods.lifesteal += x,
                PassiveEffect::CooldownReduction(x) => mods.cooldown_reduction += x,
                PassiveEffect::MoveSpeedBonus(x) => mods.move_speed_bonus += x,
                PassiveEffect::BurnOnHit {
                    damage_per_sec,
                    duration_ms,
                } => mods.on_hit.push(StatusEffect::burn(duration_ms, damage_per_sec)),
            }
        }

        mods.cooldown_reduction = mods.cooldown_reduction.clamp(0.0, 0.8);
        mods
    }
}

/// Center and hit radius of a live entity hostile to `team`.
pub fn enemy_of(world: &World, team: Team, entity: Entity) -> Option<(Vec2, f32)> {
    let mut query = world
        .query_one::<(&EntityKind, &Team, &Body, &Vitals)>(entity)
        .ok()?;
    let (kind, other, body, vitals) = query.get()?;
    if *kind == EntityKind::Projectile || vitals.is_dead || !team.is_hostile_to(*other) {
        return None;
    }
    Some((body.center(), body.hit_radius))
}

// ── Resolution context ───────────────────────────────────────────────

/// Everything a hit touches, borrowed from the scheduler for one phase.
pub struct Combat<'a> {
    pub world: &'a mut World,
    pub effects: &'a mut StatusEffects,
    pub events: &'a mut Vec<CombatEvent>,
    pub rng: &'a mut StdRng,
    pub config: &'a SimConfig,
}

impl Combat<'_> {
    /// Roll, route through shields, report. `None` when the target is gone or
    /// already dead.
    pub fn apply_damage(
        &mut self,
        target: Entity,
        source: Option<Entity>,
        base: f32,
        crit: Crit,
    ) -> Option<DamageReport> {
        let position = self.world.get::<&Body>(target).ok()?.center();
        let critical = match crit {
            Crit::Roll => roll_critical(self.rng, self.config.combat.crit_chance),
            Crit::Always => true,
            Crit::Never => false,
        };
        let amount = damage_amount(base, critical, self.config.combat.crit_multiplier);
        let id = entity_id(target);

        let hit = {
            let mut vitals = self.world.get::<&mut Vitals>(target).ok()?;
            if vitals.is_dead {
                return None;
            }
            take_damage_with_shield(self.effects, id, &mut vitals, amount)
        };

        let event_source = source.map(entity_id);
        if hit.absorbed > 0.0 {
            self.events.push(CombatEvent {
                kind: CombatEventKind::ShieldBlock,
                target: id,
                source: event_source,
                amount: hit.absorbed,
                critical,
                position,
            });
        }
        if hit.dealt > 0.0 || hit.absorbed <= 0.0 {
            self.events.push(CombatEvent {
                kind: CombatEventKind::Damage,
                target: id,
                source: event_source,
                amount: hit.dealt,
                critical,
                position,
            });
        }
        if hit.killed {
            debug!(target = id, source = ?event_source, "entity killed");
        }

        Some(DamageReport {
            amount,
            absorbed: hit.absorbed,
            dealt: hit.dealt,
            critical,
            killed: hit.killed,
        })
    }

    pub fn heal(&mut self, target: Entity, amount: f32) -> f32 {
        let Ok(position) = self.world.get::<&Body>(target).map(|b| b.center()) else {
            return 0.0;
        };
        let healed = match self.world.get::<&mut Vitals>(target) {
            Ok(mut vitals) => vitals.heal(amount),
            Err(_) => return 0.0,
        };
        if healed > 0.0 {
            self.events.push(CombatEvent {
                kind: CombatEventKind::Heal,
                target: entity_id(target),
                source: None,
                amount: healed,
                critical: false,
                position,
            });
        }
        healed
    }

    fn is_alive(&self, entity: Entity) -> bool {
        self.world
            .get::<&Vitals>(entity)
            .map(|v| v.is_alive())
            .unwrap_or(false)
    }

    pub fn enemy_of(&self, team: Team, entity: Entity) -> Option<(Vec2, f32)> {
        enemy_of(&*self.world, team, entity)
    }

    /// Live entities hostile to `team` whose hit circle touches the area.
    pub fn enemies_in_area(&self, team: Team, center: Vec2, radius: f32) -> Vec<Entity> {
        let mut hits: Vec<Entity> = self
            .world
            .query::<(&EntityKind, &Team, &Body, &Vitals)>()
            .iter()
            .filter(|(_, (kind, other, body, vitals))| {
                **kind != EntityKind::Projectile
                    && !vitals.is_dead
                    && team.is_hostile_to(**other)
                    && body.center().distance(center) <= radius + body.hit_radius
            })
            .map(|(e, _)| e)
            .collect();
        hits.sort_by_key(|e| e.id());
        hits
    }

    /// A hit dealt by the avatar: passive bonus, on-hit statuses, lifesteal,
    /// and the "ally under attack" alert to nearby enemy towers.
    pub fn avatar_hit(
        &mut self,
        avatar: Entity,
        mods: &AvatarModifiers,
        target: Entity,
        base: f32,
        status: Option<StatusEffect>,
    ) -> Option<DamageReport> {
        let amount = base * (1.0 + mods.damage_bonus);
        let report = self.apply_damage(target, Some(avatar), amount, Crit::Roll)?;
        let target_id = entity_id(target);
        let avatar_id = entity_id(avatar);

        if !report.killed {
            for effect in status.iter().chain(mods.on_hit.iter()) {
                self.effects.apply(target_id, effect.with_source(avatar_id));
            }
        }
        if mods.lifesteal > 0.0 && report.dealt > 0.0 && self.is_alive(avatar) {
            self.heal(avatar, report.dealt * mods.lifesteal);
        }
        self.alert_towers(avatar, target);
        Some(report)
    }

    /// Hit every enemy of the avatar inside the circle.
    pub fn avatar_area_hit(
        &mut self,
        avatar: Entity,
        mods: &AvatarModifiers,
        center: Vec2,
        radius: f32,
        base: f32,
        status: Option<StatusEffect>,
    ) -> usize {
        let targets = self.enemies_in_area(Team::Blue, center, radius);
        targets
            .into_iter()
            .filter(|t| self.avatar_hit(avatar, mods, *t, base, status).is_some())
            .count()
    }

    /// Towers of the victim's side that cover the victim queue a retarget
    /// onto the attacker.
    fn alert_towers(&mut self, attacker: Entity, victim: Entity) {
        let (victim_team, victim_center) = {
            let Ok(mut query) = self.world.query_one::<(&Team, &Body)>(victim) else {
                return;
            };
            let Some((team, body)) = query.get() else {
                return;
            };
            (*team, body.center())
        };
        let delay = self.config.structure.retarget_delay_ms;
        for (tower, (ai, team, body, attack)) in self
            .world
            .query_mut::<(&mut StructureAi, &Team, &Body, &AttackStats)>()
        {
            if *team != victim_team || tower == attacker {
                continue;
            }
            if body.center().distance(victim_center) <= attack.range {
                trace!(tower = entity_id(tower), "ally under attack");
                ai.notify_ally_attacked(attacker, delay);
            }
        }
    }
}

// ── Ability casts ────────────────────────────────────────────────────

/// A committed delayed area effect waiting for its timer.
#[derive(Debug, Clone)]
pub struct PendingCast {
    pub caster: Entity,
    pub ability_id: String,
    pub center: Vec2,
    pub radius: f32,
    pub damage: f32,
    pub status: Option<StatusEffect>,
    pub remaining_ms: f32,
}

/// The avatar as a caster, plus the session state a cast reads.
pub struct Caster<'a> {
    pub entity: Entity,
    pub character: &'a CharacterState,
    pub catalog: &'a Catalog,
    pub modifiers: &'a AvatarModifiers,
    pub current_target: Option<Entity>,
}

/// Cast the ability in `slot`. Any failed precondition (empty slot, cooldown,
/// stun, mana, missing or out-of-range target, nowhere to aim) is a no-op
/// returning `false`.
pub fn cast_ability(
    combat: &mut Combat,
    grid: &NavGrid,
    caster: &Caster,
    slot: SlotId,
    target: CastTarget,
    pending: &mut Vec<PendingCast>,
) -> bool {
    let Some(ability_id) = caster.character.loadout.get(slot) else {
        return false;
    };
    let Some(def) = caster.catalog.ability(ability_id) else {
        return false;
    };
    let avatar = caster.entity;
    let avatar_id = entity_id(avatar);

    let (center, cooldown, mana) = {
        let Ok(mut query) = combat.world.query_one::<(&Body, &Vitals, &AvatarState)>(avatar) else {
            return false;
        };
        let Some((body, vitals, state)) = query.get() else {
            return false;
        };
        if vitals.is_dead {
            return false;
        }
        (body.center(), state.cooldown_of(def.id), state.mana)
    };

    if cooldown > 0.0 {
        trace!(ability = def.id, cooldown, "cast on cooldown");
        return false;
    }
    if !combat.effects.can_act(avatar_id) {
        return false;
    }
    let cost = def.mana_cost.unwrap_or(0.0);
    if mana < cost {
        return false;
    }
    let range = def.range.unwrap_or(f32::INFINITY);

    // Explicit entity first, then the current target.
    let target_entity = match target {
        CastTarget::Entity(id) => entity_from_id(id),
        CastTarget::Point(_) | CastTarget::SelfCast => None,
    }
    .or(caster.current_target);
    let live_target =
        target_entity.and_then(|e| combat.enemy_of(Team::Blue, e).map(|(c, r)| (e, c, r)));
    let aim_point = match target {
        CastTarget::Point(p) => Some(p),
        _ => live_target.map(|(_, c, _)| c),
    };

    let needs_entity = def.requires_target
        || matches!(
            def.effect,
            AbilityEffect::Strike { .. } | AbilityEffect::TargetStatus { .. }
        );
    let victim = if needs_entity {
        let Some((entity, target_center, hit_radius)) = live_target else {
            return false;
        };
        if (center.distance(target_center) - hit_radius).max(0.0) > range {
            return false;
        }
        Some(entity)
    } else {
        None
    };

    let damage = def.damage.unwrap_or(0.0);
    let mods = caster.modifiers;
    let resolved = match (def.effect, victim) {
        (AbilityEffect::Strike { status }, Some(v)) => {
            let on_hit = status.map(|s| s.to_effect(Some(avatar_id)));
            combat.avatar_hit(avatar, mods, v, damage, on_hit);
            true
        }
        (AbilityEffect::TargetStatus { status }, Some(v)) => {
            if damage > 0.0 {
                combat.avatar_hit(avatar, mods, v, damage, None);
            }
            combat
                .effects
                .apply(entity_id(v), status.to_effect(Some(avatar_id)));
            true
        }
        (AbilityEffect::Strike { .. } | AbilityEffect::TargetStatus { .. }, None) => false,
        (AbilityEffect::AreaStrike { radius }, _) => {
            combat.avatar_area_hit(avatar, mods, center, radius, damage, None);
            true
        }
        (AbilityEffect::Projectile { status }, _) => {
            let Some(point) = aim_point else { return false };
            let direction = (point - center).normalized();
            if direction.is_zero() {
                return false;
            }
            spawn_projectile(
                combat.world,
                ProjectileSpawn {
                    owner: Some(avatar),
                    team: Team::Blue,
                    origin: center,
                    motion: ProjectileMotion::Linear { direction },
                    speed: combat.config.combat.projectile_speed,
                    damage,
                    range: def.range.unwrap_or(600.0),
                    on_hit: status.map(|s| s.to_effect(Some(avatar_id))),
                    from_avatar: true,
                },
            );
            true
        }
        (AbilityEffect::Dash { distance }, _) => {
            if !combat.effects.can_move(avatar_id) {
                return false;
            }
            let Some(point) = aim_point else { return false };
            let direction = (point - center).normalized();
            if direction.is_zero() {
                return false;
            }
            let destination = dash_destination(grid, center, direction, distance.min(range));
            if let Ok(mut body) = combat.world.get::<&mut Body>(avatar) {
                body.set_center(destination);
            }
            if let Ok(mut state) = combat.world.get::<&mut AvatarState>(avatar) {
                state.move_target = None;
            }
            true
        }
        (AbilityEffect::Heal { amount }, _) => {
            combat.heal(avatar, amount);
            true
        }
        (AbilityEffect::Shield { amount, duration_ms }, _) => {
            combat
                .effects
                .apply(avatar_id, StatusEffect::shield(duration_ms, amount).with_source(avatar_id));
            true
        }
        (AbilityEffect::DelayedArea {
            radius,
            delay_ms,
            status,
        }, _) => {
            let Some(point) = aim_point else { return false };
            if center.distance(point) > range {
                return false;
            }
            pending.push(PendingCast {
                caster: avatar,
                ability_id: def.id.to_string(),
                center: point,
                radius,
                damage,
                status: status.map(|s| s.to_effect(Some(avatar_id))),
                remaining_ms: delay_ms,
            });
            true
        }
        (AbilityEffect::Restore {
            heal,
            shield,
            duration_ms,
        }, _) => {
            combat.heal(avatar, heal);
            combat
                .effects
                .apply(avatar_id, StatusEffect::shield(duration_ms, shield).with_source(avatar_id));
            true
        }
    };

    if resolved {
        if let Ok(mut state) = combat.world.get::<&mut AvatarState>(avatar) {
            state.mana -= cost;
            state
                .cooldowns
                .insert(def.id.to_string(), def.cooldown_ms * (1.0 - mods.cooldown_reduction));
        }
        debug!(ability = def.id, slot = %slot, "ability cast");
    }
    resolved
}

/// Count down committed area casts and land the ones that are due.
pub fn resolve_pending_casts(
    combat: &mut Combat,
    pending: &mut Vec<PendingCast>,
    mods: &AvatarModifiers,
    dt_ms: f32,
) {
    for cast in pending.iter_mut() {
        cast.remaining_ms -= dt_ms;
    }
    let (due, waiting): (Vec<_>, Vec<_>) = pending.drain(..).partition(|c| c.remaining_ms <= 0.0);
    *pending = waiting;

    for cast in due {
        let caster_alive = combat.is_alive(cast.caster);
        if !caster_alive && combat.config.combat.cancel_pending_casts_on_caster_death {
            debug!(ability = %cast.ability_id, "pending cast dropped, caster is dead");
            continue;
        }
        let hits = combat.avatar_area_hit(
            cast.caster,
            mods,
            cast.center,
            cast.radius,
            cast.damage,
            cast.status,
        );
        debug!(ability = %cast.ability_id, hits, "pending cast landed");
    }
}

// ── Auto-attack ──────────────────────────────────────────────────────

/// Follow and attack the current target. Clears the target once it is gone.
pub fn auto_attack_system(
    combat: &mut Combat,
    grid: &NavGrid,
    avatar: Entity,
    mods: &AvatarModifiers,
    current_target: &mut Option<Entity>,
    dt_ms: f32,
) {
    let Some(target) = *current_target else { return };
    let avatar_id = entity_id(avatar);

    let Some((target_center, target_radius)) = combat.enemy_of(Team::Blue, target) else {
        trace!(target = entity_id(target), "auto-attack target lost");
        *current_target = None;
        return;
    };

    let (center, attack, speed, alive) = {
        let Ok(mut query) = combat
            .world
            .query_one::<(&Body, &AttackStats, &MoveSpeed, &Vitals)>(avatar)
        else {
            return;
        };
        let Some((body, attack, speed, vitals)) = query.get() else {
            return;
        };
        (body.center(), attack.clone(), speed.base, vitals.is_alive())
    };
    if !alive {
        return;
    }

    let reach = (center.distance(target_center) - target_radius).max(0.0);
    if reach > attack.range {
        let multiplier = combat.effects.speed_multiplier(avatar_id);
        if multiplier <= 0.0 {
            return;
        }
        let step = speed * (1.0 + mods.move_speed_bonus) * multiplier * dt_ms / 1000.0;
        let step = step.min(reach - attack.range + 1.0);
        let next = apply_movement(grid, center, (target_center - center).normalized().scale(step));
        if let Ok(mut body) = combat.world.get::<&mut Body>(avatar) {
            body.set_center(next);
        }
        return;
    }

    if let Ok(mut state) = combat.world.get::<&mut AvatarState>(avatar) {
        state.move_target = None;
    }
    if !attack.ready() || !combat.effects.can_act(avatar_id) {
        return;
    }
    if let Ok(mut stats) = combat.world.get::<&mut AttackStats>(avatar) {
        stats.trigger();
    }

    if attack.ranged {
        spawn_projectile(
            combat.world,
            ProjectileSpawn {
                owner: Some(avatar),
                team: Team::Blue,
                origin: center,
                motion: ProjectileMotion::Homing { target },
                speed: combat.config.combat.projectile_speed,
                damage: attack.damage,
                range: HOMING_MAX_TRAVEL,
                on_hit: None,
                from_avatar: true,
            },
        );
    } else {
        combat.avatar_hit(avatar, mods, target, attack.damage, None);
    }
}

/// Shot fired by an AI attacker at a fixed target.
pub fn homing_shot(
    owner: Entity,
    team: Team,
    origin: Vec2,
    target: Entity,
    damage: f32,
    speed: f32,
) -> ProjectileSpawn {
    ProjectileSpawn {
        owner: Some(owner),
        team,
        origin,
        motion: ProjectileMotion::Homing { target },
        speed,
        damage,
        range: HOMING_MAX_TRAVEL,
        on_hit: None,
        from_avatar: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::world::{spawn_avatar, spawn_hostile, spawn_structure, weapon_attack};
    use crate::ecs::components::StructureKind;
    use crate::protocol::StatusKind;
    use rand::SeedableRng;

    struct Fixture {
        world: World,
        effects: StatusEffects,
        events: Vec<CombatEvent>,
        rng: StdRng,
        config: SimConfig,
        catalog: Catalog,
        character: CharacterState,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::new(),
                effects: StatusEffects::new(),
                events: Vec::new(),
                rng: StdRng::seed_from_u64(7),
                config: SimConfig::default(),
                catalog: Catalog::standard(),
                character: CharacterState::starter(),
            }
        }

        fn combat(&mut self) -> Combat<'_> {
            Combat {
                world: &mut self.world,
                effects: &mut self.effects,
                events: &mut self.events,
                rng: &mut self.rng,
                config: &self.config,
            }
        }

        fn avatar(&mut self, at: Vec2) -> Entity {
            let weapon = self.catalog.weapon("iron_sword").unwrap();
            spawn_avatar(&mut self.world, &self.config, at, weapon_attack(weapon))
        }

        fn health(&self, e: Entity) -> f32 {
            self.world.get::<&Vitals>(e).unwrap().health
        }
    }

    #[test]
    fn forced_crit_doubles_damage() {
        let mut fx = Fixture::new();
        let a = spawn_hostile(&mut fx.world, &fx.config, Vec2::new(100.0, 100.0), 0);
        let b = spawn_hostile(&mut fx.world, &fx.config, Vec2::new(300.0, 100.0), 0);

        let normal = fx.combat().apply_damage(a, None, 40.0, Crit::Never).unwrap();
        let crit = fx.combat().apply_damage(b, None, 40.0, Crit::Always).unwrap();

        assert_eq!(crit.amount, normal.amount * 2.0);
        assert!(crit.critical);
        assert_eq!(fx.health(b), fx.config.hostile.max_health - 80.0);
    }

    #[test]
    fn damage_amount_is_pure() {
        assert_eq!(damage_amount(25.0, false, 2.0), 25.0);
        assert_eq!(damage_amount(25.0, true, 2.0), 50.0);
    }

    #[test]
    fn zero_chance_never_crits() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..100).all(|_| !roll_critical(&mut rng, 0.0)));
        assert!((0..100).all(|_| roll_critical(&mut rng, 1.0)));
    }

    #[test]
    fn shield_block_and_damage_events() {
        let mut fx = Fixture::new();
        let target = spawn_hostile(&mut fx.world, &fx.config, Vec2::new(100.0, 100.0), 0);
        fx.effects.apply(entity_id(target), StatusEffect::shield(1000.0, 15.0));

        let report = fx.combat().apply_damage(target, None, 40.0, Crit::Never).unwrap();

        assert_eq!(report.absorbed, 15.0);
        assert_eq!(report.dealt, 25.0);
        let kinds: Vec<_> = fx.events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![CombatEventKind::ShieldBlock, CombatEventKind::Damage]);
    }

    #[test]
    fn dead_targets_are_not_hit_again() {
        let mut fx = Fixture::new();
        let target = spawn_hostile(&mut fx.world, &fx.config, Vec2::new(100.0, 100.0), 0);
        let report = fx.combat().apply_damage(target, None, 10_000.0, Crit::Never).unwrap();
        assert!(report.killed);
        assert!(fx.combat().apply_damage(target, None, 10.0, Crit::Never).is_none());
    }

    #[test]
    fn cast_requires_live_target_in_range() {
        let mut fx = Fixture::new();
        let avatar = fx.avatar(Vec2::new(300.0, 600.0));
        let far = spawn_hostile(&mut fx.world, &fx.config, Vec2::new(900.0, 600.0), 0);
        let grid = NavGrid::new(60, 30, 40.0);
        let mods = AvatarModifiers::default();
        let mut pending = Vec::new();
        let character = fx.character.clone();
        let catalog = fx.catalog.clone();
        let caster = Caster {
            entity: avatar,
            character: &character,
            catalog: &catalog,
            modifiers: &mods,
            current_target: None,
        };

        let cleave = |fx: &mut Fixture, target: CastTarget, pending: &mut Vec<PendingCast>| {
            cast_ability(&mut fx.combat(), &grid, &caster, SlotId::Q, target, pending)
        };

        // Cleave with no target.
        assert!(!cleave(&mut fx, CastTarget::SelfCast, &mut pending));
        // Out of range.
        assert!(!cleave(&mut fx, CastTarget::Entity(entity_id(far)), &mut pending));
        assert_eq!(fx.health(far), fx.config.hostile.max_health);

        // In range.
        let near = spawn_hostile(&mut fx.world, &fx.config, Vec2::new(380.0, 600.0), 0);
        assert!(cleave(&mut fx, CastTarget::Entity(entity_id(near)), &mut pending));
        assert!(fx.health(near) < fx.config.hostile.max_health);

        // Now on cooldown.
        assert!(!cleave(&mut fx, CastTarget::Entity(entity_id(near)), &mut pending));
    }

    #[test]
    fn stunned_avatar_cannot_cast() {
        let mut fx = Fixture::new();
        let avatar = fx.avatar(Vec2::new(300.0, 600.0));
        fx.effects.apply(entity_id(avatar), StatusEffect::stun(500.0));
        let grid = NavGrid::new(60, 30, 40.0);
        let mods = AvatarModifiers::default();
        let character = fx.character.clone();
        let catalog = fx.catalog.clone();
        let caster = Caster {
            entity: avatar,
            character: &character,
            catalog: &catalog,
            modifiers: &mods,
            current_target: None,
        };
        let mut pending = Vec::new();
        let cast = cast_ability(
            &mut fx.combat(),
            &grid,
            &caster,
            SlotId::F,
            CastTarget::SelfCast,
            &mut pending,
        );
        assert!(!cast);
        assert!(!fx.effects.has(entity_id(avatar), StatusKind::Shield));
    }

    #[test]
    fn self_shield_applies_and_starts_cooldown() {
        let mut fx = Fixture::new();
        let avatar = fx.avatar(Vec2::new(300.0, 600.0));
        let grid = NavGrid::new(60, 30, 40.0);
        let mods = AvatarModifiers::default();
        let character = fx.character.clone();
        let catalog = fx.catalog.clone();
        let caster = Caster {
            entity: avatar,
            character: &character,
            catalog: &catalog,
            modifiers: &mods,
            current_target: None,
        };
        let mut pending = Vec::new();
        let cast = cast_ability(
            &mut fx.combat(),
            &grid,
            &caster,
            SlotId::F,
            CastTarget::SelfCast,
            &mut pending,
        );
        assert!(cast);
        assert_eq!(
            fx.effects.get(entity_id(avatar), StatusKind::Shield).unwrap().magnitude,
            Some(100.0)
        );
        let state = fx.world.get::<&AvatarState>(avatar).unwrap();
        assert_eq!(state.cooldown_of("barrier"), 14_000.0);
    }

    #[test]
    fn pending_cast_lands_after_delay() {
        let mut fx = Fixture::new();
        let avatar = fx.avatar(Vec2::new(300.0, 600.0));
        let victim = spawn_hostile(&mut fx.world, &fx.config, Vec2::new(500.0, 600.0), 0);
        let mods = AvatarModifiers::default();
        let mut pending = vec![PendingCast {
            caster: avatar,
            ability_id: "meteor".into(),
            center: Vec2::new(500.0, 600.0),
            radius: 100.0,
            damage: 50.0,
            status: None,
            remaining_ms: 100.0,
        }];

        resolve_pending_casts(&mut fx.combat(), &mut pending, &mods, 50.0);
        assert_eq!(pending.len(), 1);
        assert_eq!(fx.health(victim), fx.config.hostile.max_health);

        resolve_pending_casts(&mut fx.combat(), &mut pending, &mods, 50.0);
        assert!(pending.is_empty());
        assert!(fx.health(victim) < fx.config.hostile.max_health);
    }

    #[test]
    fn pending_cast_cancellation_follows_config() {
        let mut fx = Fixture::new();
        fx.config.combat.cancel_pending_casts_on_caster_death = true;
        let avatar = fx.avatar(Vec2::new(300.0, 600.0));
        let victim = spawn_hostile(&mut fx.world, &fx.config, Vec2::new(500.0, 600.0), 0);
        fx.world.get::<&mut Vitals>(avatar).unwrap().take_damage(100_000.0);
        let mut pending = vec![PendingCast {
            caster: avatar,
            ability_id: "meteor".into(),
            center: Vec2::new(500.0, 600.0),
            radius: 100.0,
            damage: 50.0,
            status: None,
            remaining_ms: 10.0,
        }];
        resolve_pending_casts(&mut fx.combat(), &mut pending, &AvatarModifiers::default(), 16.0);
        assert!(pending.is_empty());
        assert_eq!(fx.health(victim), fx.config.hostile.max_health);
    }

    #[test]
    fn hitting_a_red_unit_alerts_the_covering_tower() {
        let mut fx = Fixture::new();
        let avatar = fx.avatar(Vec2::new(1500.0, 600.0));
        let tower_at = Vec2::new(1840.0, 600.0);
        let tower =
            spawn_structure(&mut fx.world, &fx.config, Team::Red, StructureKind::Tower, tower_at);
        let minion = crate::ecs::world::spawn_minion(
            &mut fx.world,
            &fx.config,
            Team::Red,
            crate::ecs::components::MinionRole::Melee,
            Vec2::new(1600.0, 600.0),
        );
        let mods = AvatarModifiers::default();
        fx.combat().avatar_hit(avatar, &mods, minion, 5.0, None).unwrap();

        let ai = fx.world.get::<&StructureAi>(tower).unwrap();
        assert_eq!(ai.pending_override.map(|p| p.attacker), Some(avatar));
    }

    #[test]
    fn lifesteal_heals_the_avatar() {
        let mut fx = Fixture::new();
        let avatar = fx.avatar(Vec2::new(300.0, 600.0));
        fx.world.get::<&mut Vitals>(avatar).unwrap().take_damage(100.0);
        let target = spawn_hostile(&mut fx.world, &fx.config, Vec2::new(350.0, 600.0), 0);
        let mods = AvatarModifiers {
            lifesteal: 0.5,
            ..AvatarModifiers::default()
        };
        fx.config.combat.crit_chance = 0.0;
        let report = fx.combat().avatar_hit(avatar, &mods, target, 40.0, None).unwrap();
        assert_eq!(report.dealt, 40.0);
        assert_eq!(fx.health(avatar), fx.config.avatar.max_health - 80.0);
    }

    #[test]
    fn modifiers_follow_weapon_and_passive() {
        let catalog = Catalog::standard();
        let mut character = CharacterState::starter();
        let mods = AvatarModifiers::resolve(&catalog, &character);
        assert!((mods.move_speed_bonus - 0.10).abs() < 1e-6);
        assert!(mods.on_hit.is_empty());

        character.unlock_weapon(&catalog, "shadow_dagger").unwrap();
        character.equip_weapon(&catalog, "shadow_dagger").unwrap();
        character.equip_passive(&catalog, "bloodthirst");
        let mods = AvatarModifiers::resolve(&catalog, &character);
        assert!((mods.lifesteal - 0.22).abs() < 1e-6);
    }
}
