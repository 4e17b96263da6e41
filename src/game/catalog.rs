use serde::{Deserialize, Serialize};

use crate::protocol::{EntityId, StatusKind};

use super::status::StatusEffect;

// ── Tags ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    Sword,
    Axe,
    Dagger,
    Bow,
    Staff,
    Wand,
}

impl WeaponType {
    pub const ALL: [WeaponType; 6] = [
        WeaponType::Sword,
        WeaponType::Axe,
        WeaponType::Dagger,
        WeaponType::Bow,
        WeaponType::Staff,
        WeaponType::Wand,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WeaponType::Sword => "sword",
            WeaponType::Axe => "axe",
            WeaponType::Dagger => "dagger",
            WeaponType::Bow => "bow",
            WeaponType::Staff => "staff",
            WeaponType::Wand => "wand",
        }
    }
}

impl std::fmt::Display for WeaponType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weapon-compatibility tag of an ability or passive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityCategory {
    PhysicalMelee,
    PhysicalRanged,
    MagicFire,
    MagicFrost,
    MagicArcane,
    Holy,
    /// Wildcard: usable with every weapon.
    Universal,
}

impl AbilityCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AbilityCategory::PhysicalMelee => "physical_melee",
            AbilityCategory::PhysicalRanged => "physical_ranged",
            AbilityCategory::MagicFire => "magic_fire",
            AbilityCategory::MagicFrost => "magic_frost",
            AbilityCategory::MagicArcane => "magic_arcane",
            AbilityCategory::Holy => "holy",
            AbilityCategory::Universal => "universal",
        }
    }
}

impl std::fmt::Display for AbilityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityType {
    Damage,
    Cc,
    Mobility,
    Support,
    Defense,
    Ultimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponSpecial {
    BurnOnHit,
    ChillOnHit,
    Lifesteal,
}

/// Which ability categories each weapon type may equip.
pub fn allowed_categories(weapon: WeaponType) -> &'static [AbilityCategory] {
    use AbilityCategory::*;
    match weapon {
        WeaponType::Sword => &[PhysicalMelee, Holy],
        WeaponType::Axe => &[PhysicalMelee],
        WeaponType::Dagger => &[PhysicalMelee, PhysicalRanged],
        WeaponType::Bow => &[PhysicalRanged],
        WeaponType::Staff => &[MagicFire, MagicFrost, MagicArcane],
        WeaponType::Wand => &[MagicArcane, MagicFrost, Holy],
    }
}

// ── Definitions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSpec {
    pub kind: StatusKind,
    pub duration_ms: f32,
    pub magnitude: Option<f32>,
}

impl StatusSpec {
    pub const fn new(kind: StatusKind, duration_ms: f32, magnitude: Option<f32>) -> Self {
        Self {
            kind,
            duration_ms,
            magnitude,
        }
    }

    pub fn to_effect(self, source: Option<EntityId>) -> StatusEffect {
        StatusEffect {
            kind: self.kind,
            remaining_ms: self.duration_ms,
            magnitude: self.magnitude,
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbilityEffect {
    /// Hit the selected target for the ability's damage.
    Strike { status: Option<StatusSpec> },
    /// Hit every hostile around the caster.
    AreaStrike { radius: f32 },
    /// Fire toward a world point.
    Projectile { status: Option<StatusSpec> },
    /// Apply a status to the selected target.
    TargetStatus { status: StatusSpec },
    Dash { distance: f32 },
    Heal { amount: f32 },
    Shield { amount: f32, duration_ms: f32 },
    /// Mark a point and resolve an area hit after a delay.
    DelayedArea {
        radius: f32,
        delay_ms: f32,
        status: Option<StatusSpec>,
    },
    Restore {
        heal: f32,
        shield: f32,
        duration_ms: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityDef {
    pub id: &'static str,
    pub name: &'static str,
    pub cooldown_ms: f32,
    pub kind: AbilityType,
    pub category: AbilityCategory,
    pub range: Option<f32>,
    pub damage: Option<f32>,
    pub mana_cost: Option<f32>,
    pub requires_target: bool,
    /// Further restricts category compatibility when non-empty.
    pub required_weapons: &'static [WeaponType],
    pub effect: AbilityEffect,
}

impl AbilityDef {
    pub fn is_ultimate(&self) -> bool {
        self.kind == AbilityType::Ultimate
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponDef {
    pub id: &'static str,
    pub name: &'static str,
    pub weapon_type: WeaponType,
    pub damage: f32,
    /// Attacks per second.
    pub attack_speed: f32,
    pub range: f32,
    pub rarity: Rarity,
    pub special: Option<WeaponSpecial>,
}

impl WeaponDef {
    pub fn attack_cooldown_ms(&self) -> f32 {
        1000.0 / self.attack_speed.max(0.1)
    }

    pub fn is_ranged(&self) -> bool {
        self.range > 200.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassiveEffect {
    DamageBonus(f32),
    Lifesteal(f32),
    CooldownReduction(f32),
    MoveSpeedBonus(f32),
    BurnOnHit { damage_per_sec: f32, duration_ms: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassiveDef {
    pub id: &'static str,
    pub name: &'static str,
    pub category: AbilityCategory,
    pub effect: PassiveEffect,
    pub required_weapons: &'static [WeaponType],
}

// ── Standard tables ─────────────────────────────────────────────────

fn standard_abilities() -> &'static [AbilityDef] {
    use AbilityCategory::*;
    use AbilityType::*;

    const STUN_1S: StatusSpec = StatusSpec::new(StatusKind::Stun, 1000.0, None);

    static ABILITIES: &[AbilityDef] = &[
        // ── Physical melee ─────────────────────────────────────────
        AbilityDef {
            id: "cleave",
            name: "Cleave",
            cooldown_ms: 4000.0,
            kind: Damage,
            category: PhysicalMelee,
            range: Some(130.0),
            damage: Some(45.0),
            mana_cost: None,
            requires_target: true,
            required_weapons: &[],
            effect: AbilityEffect::Strike { status: None },
        },
        AbilityDef {
            id: "shield_bash",
            name: "Shield Bash",
            cooldown_ms: 8000.0,
            kind: Cc,
            category: PhysicalMelee,
            range: Some(110.0),
            damage: Some(20.0),
            mana_cost: None,
            requires_target: true,
            required_weapons: &[WeaponType::Sword],
            effect: AbilityEffect::Strike {
                status: Some(STUN_1S),
            },
        },
        AbilityDef {
            id: "whirlwind",
            name: "Whirlwind",
            cooldown_ms: 7000.0,
            kind: Damage,
            category: PhysicalMelee,
            range: None,
            damage: Some(35.0),
            mana_cost: None,
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::AreaStrike { radius: 160.0 },
        },
        AbilityDef {
            id: "iron_skin",
            name: "Iron Skin",
            cooldown_ms: 16000.0,
            kind: Defense,
            category: PhysicalMelee,
            range: None,
            damage: None,
            mana_cost: None,
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Shield {
                amount: 150.0,
                duration_ms: 4000.0,
            },
        },
        // ── Physical ranged ────────────────────────────────────────
        AbilityDef {
            id: "power_shot",
            name: "Power Shot",
            cooldown_ms: 5000.0,
            kind: Damage,
            category: PhysicalRanged,
            range: Some(750.0),
            damage: Some(60.0),
            mana_cost: None,
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Projectile { status: None },
        },
        AbilityDef {
            id: "crippling_arrow",
            name: "Crippling Arrow",
            cooldown_ms: 7000.0,
            kind: Cc,
            category: PhysicalRanged,
            range: Some(700.0),
            damage: Some(25.0),
            mana_cost: None,
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Projectile {
                status: Some(StatusSpec::new(StatusKind::Slow, 2000.0, Some(0.45))),
            },
        },
        // ── Fire ───────────────────────────────────────────────────
        AbilityDef {
            id: "fireball",
            name: "Fireball",
            cooldown_ms: 3000.0,
            kind: Damage,
            category: MagicFire,
            range: Some(650.0),
            damage: Some(60.0),
            mana_cost: Some(30.0),
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Projectile {
                status: Some(StatusSpec::new(StatusKind::Burn, 3000.0, Some(8.0))),
            },
        },
        AbilityDef {
            id: "flame_wave",
            name: "Flame Wave",
            cooldown_ms: 9000.0,
            kind: Damage,
            category: MagicFire,
            range: None,
            damage: Some(40.0),
            mana_cost: Some(45.0),
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::AreaStrike { radius: 200.0 },
        },
        // ── Frost ──────────────────────────────────────────────────
        AbilityDef {
            id: "frost_bolt",
            name: "Frost Bolt",
            cooldown_ms: 5000.0,
            kind: Cc,
            category: MagicFrost,
            range: Some(650.0),
            damage: Some(35.0),
            mana_cost: Some(25.0),
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Projectile {
                status: Some(StatusSpec::new(StatusKind::Slow, 2500.0, Some(0.5))),
            },
        },
        AbilityDef {
            id: "ice_prison",
            name: "Ice Prison",
            cooldown_ms: 12000.0,
            kind: Cc,
            category: MagicFrost,
            range: Some(500.0),
            damage: None,
            mana_cost: Some(60.0),
            requires_target: true,
            required_weapons: &[],
            effect: AbilityEffect::TargetStatus {
                status: StatusSpec::new(StatusKind::Freeze, 1500.0, None),
            },
        },
        // ── Arcane ─────────────────────────────────────────────────
        AbilityDef {
            id: "arcane_missile",
            name: "Arcane Missile",
            cooldown_ms: 2500.0,
            kind: Damage,
            category: MagicArcane,
            range: Some(600.0),
            damage: Some(40.0),
            mana_cost: Some(20.0),
            requires_target: true,
            required_weapons: &[],
            effect: AbilityEffect::Strike { status: None },
        },
        AbilityDef {
            id: "blink",
            name: "Blink",
            cooldown_ms: 10000.0,
            kind: Mobility,
            category: MagicArcane,
            range: Some(400.0),
            damage: None,
            mana_cost: Some(40.0),
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Dash { distance: 400.0 },
        },
        // ── Holy ───────────────────────────────────────────────────
        AbilityDef {
            id: "binding_light",
            name: "Binding Light",
            cooldown_ms: 9000.0,
            kind: Cc,
            category: Holy,
            range: Some(550.0),
            damage: Some(20.0),
            mana_cost: Some(35.0),
            requires_target: true,
            required_weapons: &[],
            effect: AbilityEffect::Strike {
                status: Some(StatusSpec::new(StatusKind::Root, 1500.0, None)),
            },
        },
        AbilityDef {
            id: "holy_light",
            name: "Holy Light",
            cooldown_ms: 12000.0,
            kind: Support,
            category: Holy,
            range: None,
            damage: None,
            mana_cost: Some(50.0),
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Heal { amount: 140.0 },
        },
        // ── Universal ──────────────────────────────────────────────
        AbilityDef {
            id: "dash",
            name: "Dash",
            cooldown_ms: 6000.0,
            kind: Mobility,
            category: Universal,
            range: Some(250.0),
            damage: None,
            mana_cost: None,
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Dash { distance: 250.0 },
        },
        AbilityDef {
            id: "mend",
            name: "Mend",
            cooldown_ms: 15000.0,
            kind: Support,
            category: Universal,
            range: None,
            damage: None,
            mana_cost: None,
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Heal { amount: 90.0 },
        },
        AbilityDef {
            id: "barrier",
            name: "Barrier",
            cooldown_ms: 14000.0,
            kind: Defense,
            category: Universal,
            range: None,
            damage: None,
            mana_cost: None,
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Shield {
                amount: 100.0,
                duration_ms: 4000.0,
            },
        },
        // ── Ultimates ──────────────────────────────────────────────
        AbilityDef {
            id: "execute",
            name: "Execute",
            cooldown_ms: 45000.0,
            kind: Ultimate,
            category: PhysicalMelee,
            range: Some(140.0),
            damage: Some(220.0),
            mana_cost: None,
            requires_target: true,
            required_weapons: &[],
            effect: AbilityEffect::Strike { status: None },
        },
        AbilityDef {
            id: "rain_of_arrows",
            name: "Rain of Arrows",
            cooldown_ms: 50000.0,
            kind: Ultimate,
            category: PhysicalRanged,
            range: Some(700.0),
            damage: Some(120.0),
            mana_cost: None,
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::DelayedArea {
                radius: 220.0,
                delay_ms: 1000.0,
                status: Some(StatusSpec::new(StatusKind::Slow, 2000.0, Some(0.4))),
            },
        },
        AbilityDef {
            id: "meteor",
            name: "Meteor",
            cooldown_ms: 60000.0,
            kind: Ultimate,
            category: MagicFire,
            range: Some(700.0),
            damage: Some(200.0),
            mana_cost: Some(100.0),
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::DelayedArea {
                radius: 200.0,
                delay_ms: 1500.0,
                status: Some(StatusSpec::new(StatusKind::Burn, 3000.0, Some(15.0))),
            },
        },
        AbilityDef {
            id: "blizzard",
            name: "Blizzard",
            cooldown_ms: 55000.0,
            kind: Ultimate,
            category: MagicFrost,
            range: Some(650.0),
            damage: Some(90.0),
            mana_cost: Some(100.0),
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::DelayedArea {
                radius: 240.0,
                delay_ms: 800.0,
                status: Some(StatusSpec::new(StatusKind::Freeze, 1200.0, None)),
            },
        },
        AbilityDef {
            id: "second_wind",
            name: "Second Wind",
            cooldown_ms: 70000.0,
            kind: Ultimate,
            category: Universal,
            range: None,
            damage: None,
            mana_cost: None,
            requires_target: false,
            required_weapons: &[],
            effect: AbilityEffect::Restore {
                heal: 200.0,
                shield: 150.0,
                duration_ms: 5000.0,
            },
        },
    ];

    ABILITIES
}

fn standard_weapons() -> &'static [WeaponDef] {
    static WEAPONS: &[WeaponDef] = &[
        WeaponDef {
            id: "iron_sword",
            name: "Iron Sword",
            weapon_type: WeaponType::Sword,
            damage: 22.0,
            attack_speed: 1.0,
            range: 100.0,
            rarity: Rarity::Common,
            special: None,
        },
        WeaponDef {
            id: "war_axe",
            name: "War Axe",
            weapon_type: WeaponType::Axe,
            damage: 30.0,
            attack_speed: 0.8,
            range: 100.0,
            rarity: Rarity::Rare,
            special: None,
        },
        WeaponDef {
            id: "shadow_dagger",
            name: "Shadow Dagger",
            weapon_type: WeaponType::Dagger,
            damage: 15.0,
            attack_speed: 1.6,
            range: 90.0,
            rarity: Rarity::Rare,
            special: Some(WeaponSpecial::Lifesteal),
        },
        WeaponDef {
            id: "hunting_bow",
            name: "Hunting Bow",
            weapon_type: WeaponType::Bow,
            damage: 20.0,
            attack_speed: 1.1,
            range: 550.0,
            rarity: Rarity::Common,
            special: None,
        },
        WeaponDef {
            id: "ember_staff",
            name: "Ember Staff",
            weapon_type: WeaponType::Staff,
            damage: 18.0,
            attack_speed: 0.9,
            range: 480.0,
            rarity: Rarity::Epic,
            special: Some(WeaponSpecial::BurnOnHit),
        },
        WeaponDef {
            id: "frost_wand",
            name: "Frost Wand",
            weapon_type: WeaponType::Wand,
            damage: 14.0,
            attack_speed: 1.3,
            range: 500.0,
            rarity: Rarity::Rare,
            special: Some(WeaponSpecial::ChillOnHit),
        },
    ];

    WEAPONS
}

fn standard_passives() -> &'static [PassiveDef] {
    static PASSIVES: &[PassiveDef] = &[
        PassiveDef {
            id: "vigor",
            name: "Vigor",
            category: AbilityCategory::Universal,
            effect: PassiveEffect::MoveSpeedBonus(0.10),
            required_weapons: &[],
        },
        PassiveDef {
            id: "focus",
            name: "Focus",
            category: AbilityCategory::Universal,
            effect: PassiveEffect::CooldownReduction(0.15),
            required_weapons: &[],
        },
        PassiveDef {
            id: "bloodthirst",
            name: "Bloodthirst",
            category: AbilityCategory::PhysicalMelee,
            effect: PassiveEffect::Lifesteal(0.12),
            required_weapons: &[WeaponType::Sword, WeaponType::Axe, WeaponType::Dagger],
        },
        PassiveDef {
            id: "sharpshooter",
            name: "Sharpshooter",
            category: AbilityCategory::PhysicalRanged,
            effect: PassiveEffect::DamageBonus(0.15),
            required_weapons: &[WeaponType::Bow],
        },
        PassiveDef {
            id: "pyromancy",
            name: "Pyromancy",
            category: AbilityCategory::MagicFire,
            effect: PassiveEffect::BurnOnHit {
                damage_per_sec: 6.0,
                duration_ms: 2500.0,
            },
            required_weapons: &[WeaponType::Staff],
        },
        PassiveDef {
            id: "arcane_attunement",
            name: "Arcane Attunement",
            category: AbilityCategory::MagicArcane,
            effect: PassiveEffect::DamageBonus(0.10),
            required_weapons: &[WeaponType::Staff, WeaponType::Wand],
        },
    ];

    PASSIVES
}

// ── Catalog ─────────────────────────────────────────────────────────

/// Every ability, weapon and passive the session knows about, in display order.
#[derive(Debug, Clone)]
pub struct Catalog {
    abilities: Vec<AbilityDef>,
    weapons: Vec<WeaponDef>,
    passives: Vec<PassiveDef>,
}

impl Catalog {
    pub fn new(
        abilities: Vec<AbilityDef>,
        weapons: Vec<WeaponDef>,
        passives: Vec<PassiveDef>,
    ) -> Self {
        Self {
            abilities,
            weapons,
            passives,
        }
    }

    pub fn standard() -> Self {
        Self::new(
            standard_abilities().to_vec(),
            standard_weapons().to_vec(),
            standard_passives().to_vec(),
        )
    }

    pub fn ability(&self, id: &str) -> Option<&AbilityDef> {
        self.abilities.iter().find(|a| a.id == id)
    }

    pub fn weapon(&self, id: &str) -> Option<&WeaponDef> {
        self.weapons.iter().find(|w| w.id == id)
    }

    pub fn passive(&self, id: &str) -> Option<&PassiveDef> {
        self.passives.iter().find(|p| p.id == id)
    }

    pub fn abilities(&self) -> &[AbilityDef] {
        &self.abilities
    }

    pub fn weapons(&self) -> &[WeaponDef] {
        &self.weapons
    }

    pub fn passives(&self) -> &[PassiveDef] {
        &self.passives
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let catalog = Catalog::standard();
        let abilities: HashSet<_> = catalog.abilities().iter().map(|a| a.id).collect();
        assert_eq!(abilities.len(), catalog.abilities().len());
        let weapons: HashSet<_> = catalog.weapons().iter().map(|w| w.id).collect();
        assert_eq!(weapons.len(), catalog.weapons().len());
        let passives: HashSet<_> = catalog.passives().iter().map(|p| p.id).collect();
        assert_eq!(passives.len(), catalog.passives().len());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let catalog = Catalog::standard();
        assert!(catalog.ability("nope").is_none());
        assert!(catalog.weapon("nope").is_none());
        assert!(catalog.passive("nope").is_none());
    }

    #[test]
    fn every_weapon_type_has_some_ultimate() {
        let catalog = Catalog::standard();
        for weapon in WeaponType::ALL {
            let allowed = allowed_categories(weapon);
            assert!(catalog.abilities().iter().any(|a| a.is_ultimate()
                && (a.category == AbilityCategory::Universal || allowed.contains(&a.category))));
        }
    }

    #[test]
    fn universal_is_never_listed_as_a_weapon_category() {
        for weapon in WeaponType::ALL {
            assert!(!allowed_categories(weapon).contains(&AbilityCategory::Universal));
        }
    }

    #[test]
    fn category_names_are_snake_case() {
        assert_eq!(AbilityCategory::MagicFire.to_string(), "magic_fire");
        assert_eq!(
            serde_json::to_string(&AbilityCategory::PhysicalMelee).unwrap(),
            "\"physical_melee\""
        );
    }

    #[test]
    fn ranged_weapons_have_long_reach() {
        let catalog = Catalog::standard();
        assert!(catalog.weapon("hunting_bow").unwrap().is_ranged());
        assert!(!catalog.weapon("iron_sword").unwrap().is_ranged());
        assert_eq!(catalog.weapon("iron_sword").unwrap().attack_cooldown_ms(), 1000.0);
    }
}
