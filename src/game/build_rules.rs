//! Loadout rules. Everything here is a pure function of the catalog and its
//! inputs; the only mutating entry point is [`clear_invalid_abilities`], which
//! repairs a loadout in place.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::SlotId;

use super::catalog::{allowed_categories, AbilityCategory, Catalog, WeaponType};
use super::character::Loadout;

/// Outcome of a rule check. Failures carry a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    pub reason: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// A loadout position: one of the six ability slots or the passive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadoutSlot {
    Ability(SlotId),
    Passive,
}

impl std::fmt::Display for LoadoutSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadoutSlot::Ability(slot) => write!(f, "{slot}"),
            LoadoutSlot::Passive => f.write_str("passive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadoutFailure {
    pub slot: LoadoutSlot,
    pub id: String,
    pub reason: String,
}

/// One change made by the repair routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRepair {
    pub slot: LoadoutSlot,
    pub removed: String,
    pub replacement: Option<String>,
}

// ── Rules ──────────────────────────────────────────────────────────

pub fn can_use_ability(catalog: &Catalog, ability_id: &str, weapon: WeaponType) -> Validation {
    let Some(ability) = catalog.ability(ability_id) else {
        return Validation::fail(format!("unknown ability '{ability_id}'"));
    };
    if ability.category == AbilityCategory::Universal {
        return Validation::ok();
    }
    if !allowed_categories(weapon).contains(&ability.category) {
        return Validation::fail(format!(
            "{} requires a weapon that allows {} abilities; {} does not",
            ability.id, ability.category, weapon
        ));
    }
    if !ability.required_weapons.is_empty() && !ability.required_weapons.contains(&weapon) {
        return Validation::fail(format!(
            "{} requires one of: {}",
            ability.id,
            join_weapons(ability.required_weapons)
        ));
    }
    Validation::ok()
}

pub fn can_use_passive(catalog: &Catalog, passive_id: &str, weapon: WeaponType) -> Validation {
    let Some(passive) = catalog.passive(passive_id) else {
        return Validation::fail(format!("unknown passive '{passive_id}'"));
    };
    if !passive.required_weapons.is_empty() && !passive.required_weapons.contains(&weapon) {
        return Validation::fail(format!(
            "{} requires one of: {}",
            passive.id,
            join_weapons(passive.required_weapons)
        ));
    }
    Validation::ok()
}

/// Ultimates go in the ultimate slot, and the ultimate slot holds only ultimates.
pub fn can_place_in_slot(catalog: &Catalog, ability_id: &str, slot: SlotId) -> Validation {
    let Some(ability) = catalog.ability(ability_id) else {
        return Validation::fail(format!("unknown ability '{ability_id}'"));
    };
    match (slot.is_ultimate_slot(), ability.is_ultimate()) {
        (true, true) | (false, false) => Validation::ok(),
        (true, false) => Validation::fail(format!(
            "slot {slot} holds only ultimates; {} is not one",
            ability.id
        )),
        (false, true) => Validation::fail(format!(
            "{} is an ultimate and belongs in slot {}",
            ability.id,
            SlotId::ULTIMATE
        )),
    }
}

fn slot_check(catalog: &Catalog, id: &str, slot: SlotId, weapon: WeaponType) -> Validation {
    let placement = can_place_in_slot(catalog, id, slot);
    if placement.valid {
        can_use_ability(catalog, id, weapon)
    } else {
        placement
    }
}

fn failure(slot: LoadoutSlot, id: &str, check: Validation) -> LoadoutFailure {
    LoadoutFailure {
        slot,
        id: id.to_string(),
        reason: check.reason.unwrap_or_default(),
    }
}

/// Every failing slot and the passive, in slot order. Empty means valid.
pub fn validate_loadout(
    catalog: &Catalog,
    loadout: &Loadout,
    weapon: WeaponType,
) -> Vec<LoadoutFailure> {
    let mut failures = Vec::new();

    for slot in SlotId::ALL {
        let Some(id) = loadout.get(slot) else { continue };
        let check = slot_check(catalog, id, slot, weapon);
        if !check.valid {
            failures.push(failure(LoadoutSlot::Ability(slot), id, check));
        }
    }

    if let Some(id) = loadout.passive.as_deref() {
        let check = can_use_passive(catalog, id, weapon);
        if !check.valid {
            failures.push(failure(LoadoutSlot::Passive, id, check));
        }
    }

    failures
}

/// [`validate_loadout`] for a loadout somebody owns: ids must also be
/// unlocked, and an ability may sit in one slot only. A duplicate fails in
/// every slot after the first valid one.
pub fn validate_owned_loadout(
    catalog: &Catalog,
    loadout: &Loadout,
    weapon: WeaponType,
    unlocked_abilities: &HashSet<String>,
    unlocked_passives: &HashSet<String>,
) -> Vec<LoadoutFailure> {
    let mut failures = Vec::new();
    let mut kept: HashSet<&str> = HashSet::new();

    for slot in SlotId::ALL {
        let Some(id) = loadout.get(slot) else { continue };
        let mut check = slot_check(catalog, id, slot, weapon);
        if check.valid && !unlocked_abilities.contains(id) {
            check = Validation::fail(format!("{id} is locked"));
        }
        if check.valid && kept.contains(id) {
            check = Validation::fail(format!("{id} is already equipped in another slot"));
        }
        if check.valid {
            kept.insert(id);
        } else {
            failures.push(failure(LoadoutSlot::Ability(slot), id, check));
        }
    }

    if let Some(id) = loadout.passive.as_deref() {
        let mut check = can_use_passive(catalog, id, weapon);
        if check.valid && !unlocked_passives.contains(id) {
            check = Validation::fail(format!("{id} is locked"));
        }
        if !check.valid {
            failures.push(failure(LoadoutSlot::Passive, id, check));
        }
    }

    failures
}

/// Replace every slot [`validate_owned_loadout`] rejects with the first valid
/// candidate in catalog order, drawing only from unlocked ids and never
/// duplicating an equipped ability.
/// A slot with no candidate is left empty. Valid slots are untouched.
pub fn clear_invalid_abilities(
    catalog: &Catalog,
    loadout: &mut Loadout,
    weapon: WeaponType,
    unlocked_abilities: &HashSet<String>,
    unlocked_passives: &HashSet<String>,
) -> Vec<SlotRepair> {
    let failures = validate_owned_loadout(
        catalog,
        loadout,
        weapon,
        unlocked_abilities,
        unlocked_passives,
    );
    let mut repairs = Vec::with_capacity(failures.len());

    for failure in failures {
        let replacement = match failure.slot {
            LoadoutSlot::Ability(slot) => {
                loadout.clear(slot);
                let candidate = catalog
                    .abilities()
                    .iter()
                    .filter(|a| unlocked_abilities.contains(a.id))
                    .filter(|a| !loadout.contains_ability(a.id))
                    .find(|a| {
                        can_place_in_slot(catalog, a.id, slot).valid
                            && can_use_ability(catalog, a.id, weapon).valid
                    })
                    .map(|a| a.id.to_string());
                if let Some(id) = &candidate {
                    loadout.set(slot, id.clone());
                }
                candidate
            }
            LoadoutSlot::Passive => {
                let candidate = catalog
                    .passives()
                    .iter()
                    .filter(|p| unlocked_passives.contains(p.id))
                    .find(|p| can_use_passive(catalog, p.id, weapon).valid)
                    .map(|p| p.id.to_string());
                loadout.passive = candidate.clone();
                candidate
            }
        };
        debug!(
            slot = %failure.slot,
            removed = %failure.id,
            replacement = ?replacement,
            reason = %failure.reason,
            "loadout slot repaired"
        );
        repairs.push(SlotRepair {
            slot: failure.slot,
            removed: failure.id,
            replacement,
        });
    }

    repairs
}

fn join_weapons(weapons: &[WeaponType]) -> String {
    weapons
        .iter()
        .map(|w| w.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
