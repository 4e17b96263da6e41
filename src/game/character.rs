use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CharacterStateError, LoadoutError};
use crate::protocol::SlotId;

use super::build_rules::{
    can_place_in_slot, can_use_ability, can_use_passive, clear_invalid_abilities, SlotRepair,
    Validation,
};
use super::catalog::{Catalog, WeaponDef, WeaponType};

pub const STARTER_WEAPON: &str = "iron_sword";

/// Six activatable slots plus the passive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Loadout {
    slots: BTreeMap<SlotId, String>,
    pub passive: Option<String>,
}

impl Loadout {
    pub fn get(&self, slot: SlotId) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    pub fn set(&mut self, slot: SlotId, ability_id: String) {
        self.slots.insert(slot, ability_id);
    }

    pub fn clear(&mut self, slot: SlotId) -> Option<String> {
        self.slots.remove(&slot)
    }

    pub fn contains_ability(&self, ability_id: &str) -> bool {
        self.slots.values().any(|id| id == ability_id)
    }

    pub fn slot_of(&self, ability_id: &str) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|(_, id)| id.as_str() == ability_id)
            .map(|(slot, _)| *slot)
    }

    /// Slots in Q..F order, empty ones included.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, Option<&str>)> + '_ {
        SlotId::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }
}

/// Everything the persistence layer stores about the player's build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterState {
    pub weapon_id: String,
    pub loadout: Loadout,
    #[serde(default)]
    pub unlocked_abilities: HashSet<String>,
    #[serde(default)]
    pub unlocked_weapons: HashSet<String>,
    #[serde(default)]
    pub unlocked_passives: HashSet<String>,
}

impl CharacterState {
    /// The build every new character starts with.
    pub fn starter() -> Self {
        let mut loadout = Loadout::default();
        for (slot, id) in [
            (SlotId::Q, "cleave"),
            (SlotId::W, "shield_bash"),
            (SlotId::E, "whirlwind"),
            (SlotId::R, "execute"),
            (SlotId::D, "dash"),
            (SlotId::F, "barrier"),
        ] {
            loadout.set(slot, id.to_string());
        }
        loadout.passive = Some("vigor".to_string());

        let owned = |ids: &[&str]| ids.iter().map(|s| s.to_string()).collect::<HashSet<_>>();

        Self {
            weapon_id: STARTER_WEAPON.to_string(),
            loadout,
            unlocked_abilities: owned(&[
                "cleave",
                "shield_bash",
                "whirlwind",
                "iron_skin",
                "power_shot",
                "fireball",
                "frost_bolt",
                "arcane_missile",
                "dash",
                "mend",
                "barrier",
                "execute",
                "second_wind",
            ]),
            unlocked_weapons: owned(&["iron_sword", "war_axe", "hunting_bow", "ember_staff"]),
            unlocked_passives: owned(&["vigor", "focus", "bloodthirst"]),
        }
    }

    pub fn weapon<'c>(&self, catalog: &'c Catalog) -> Option<&'c WeaponDef> {
        catalog.weapon(&self.weapon_id)
    }

    pub fn weapon_type(&self, catalog: &Catalog) -> Option<WeaponType> {
        self.weapon(catalog).map(|w| w.weapon_type)
    }

    // ── Loadout edits ──────────────────────────────────────────────

    /// Put an unlocked ability in a slot. If it already sits in another slot
    /// it moves. Nothing changes when the result is invalid.
    pub fn equip_ability(
        &mut self,
        catalog: &Catalog,
        slot: SlotId,
        ability_id: &str,
    ) -> Validation {
        if catalog.ability(ability_id).is_none() {
            return Validation::fail(format!("unknown ability '{ability_id}'"));
        }
        if !self.unlocked_abilities.contains(ability_id) {
            return Validation::fail(format!("{ability_id} is locked"));
        }
        let placement = can_place_in_slot(catalog, ability_id, slot);
        if !placement.valid {
            return placement;
        }
        let Some(weapon) = self.weapon_type(catalog) else {
            return Validation::fail(format!("unknown weapon '{}'", self.weapon_id));
        };
        let usable = can_use_ability(catalog, ability_id, weapon);
        if !usable.valid {
            return usable;
        }

        if let Some(previous) = self.loadout.slot_of(ability_id) {
            self.loadout.clear(previous);
        }
        self.loadout.set(slot, ability_id.to_string());
        Validation::ok()
    }

    pub fn equip_passive(&mut self, catalog: &Catalog, passive_id: &str) -> Validation {
        if catalog.passive(passive_id).is_none() {
            return Validation::fail(format!("unknown passive '{passive_id}'"));
        }
        if !self.unlocked_passives.contains(passive_id) {
            return Validation::fail(format!("{passive_id} is locked"));
        }
        let Some(weapon) = self.weapon_type(catalog) else {
            return Validation::fail(format!("unknown weapon '{}'", self.weapon_id));
        };
        let usable = can_use_passive(catalog, passive_id, weapon);
        if usable.valid {
            self.loadout.passive = Some(passive_id.to_string());
        }
        usable
    }

    pub fn unequip(&mut self, slot: SlotId) -> Option<String> {
        self.loadout.clear(slot)
    }

    /// Switch weapons and repair whatever the new weapon invalidates.
    pub fn equip_weapon(
        &mut self,
        catalog: &Catalog,
        weapon_id: &str,
    ) -> Result<Vec<SlotRepair>, LoadoutError> {
        let weapon = catalog
            .weapon(weapon_id)
            .ok_or_else(|| LoadoutError::UnknownWeapon(weapon_id.to_string()))?;
        if !self.unlocked_weapons.contains(weapon_id) {
            return Err(LoadoutError::WeaponLocked(weapon_id.to_string()));
        }

        self.weapon_id = weapon_id.to_string();
        let repairs = clear_invalid_abilities(
            catalog,
            &mut self.loadout,
            weapon.weapon_type,
            &self.unlocked_abilities,
            &self.unlocked_passives,
        );
        info!(weapon = weapon_id, repaired = repairs.len(), "weapon equipped");
        Ok(repairs)
    }

    // ── Progression hooks ──────────────────────────────────────────

    pub fn unlock_ability(&mut self, catalog: &Catalog, id: &str) -> Result<bool, LoadoutError> {
        if catalog.ability(id).is_none() {
            return Err(LoadoutError::UnknownAbility(id.to_string()));
        }
        Ok(self.unlocked_abilities.insert(id.to_string()))
    }

    pub fn unlock_weapon(&mut self, catalog: &Catalog, id: &str) -> Result<bool, LoadoutError> {
        if catalog.weapon(id).is_none() {
            return Err(LoadoutError::UnknownWeapon(id.to_string()));
        }
        Ok(self.unlocked_weapons.insert(id.to_string()))
    }

    pub fn unlock_passive(&mut self, catalog: &Catalog, id: &str) -> Result<bool, LoadoutError> {
        if catalog.passive(id).is_none() {
            return Err(LoadoutError::UnknownPassive(id.to_string()));
        }
        Ok(self.unlocked_passives.insert(id.to_string()))
    }

    // ── Persistence blob ───────────────────────────────────────────

    pub fn to_blob(&self) -> Result<String, CharacterStateError> {
        serde_json::to_string(self).map_err(|e| CharacterStateError::Encode(e.to_string()))
    }

    /// Decode a stored blob, dropping unknown unlock ids and repairing any
    /// slot the stored weapon cannot use.
    pub fn from_blob(
        catalog: &Catalog,
        blob: &str,
    ) -> Result<(Self, Vec<SlotRepair>), CharacterStateError> {
        if blob.trim().is_empty() {
            return Err(CharacterStateError::Empty);
        }
        let mut state: CharacterState = serde_json::from_str(blob)?;
        let weapon = state
            .weapon(catalog)
            .map(|w| w.weapon_type)
            .ok_or_else(|| CharacterStateError::UnknownWeapon(state.weapon_id.clone()))?;

        let before = state.unlock_count();
        state.unlocked_abilities.retain(|id| catalog.ability(id).is_some());
        state.unlocked_weapons.retain(|id| catalog.weapon(id).is_some());
        state.unlocked_passives.retain(|id| catalog.passive(id).is_some());
        let after = state.unlock_count();
        if after < before {
            warn!(dropped = before - after, "character blob listed unknown unlock ids");
        }
        state.unlocked_weapons.insert(state.weapon_id.clone());

        let repairs = clear_invalid_abilities(
            catalog,
            &mut state.loadout,
            weapon,
            &state.unlocked_abilities,
            &state.unlocked_passives,
        );
        if !repairs.is_empty() {
            warn!(repaired = repairs.len(), "character blob loadout repaired on load");
        }
        Ok((state, repairs))
    }

    fn unlock_count(&self) -> usize {
        self.unlocked_abilities.len() + self.unlocked_weapons.len() + self.unlocked_passives.len()
    }

    /// Session-start path: any failure falls back to the starter build.
    pub fn load_or_default(catalog: &Catalog, blob: Option<&str>) -> Self {
        let Some(blob) = blob else {
            info!("no character blob supplied, using starter build");
            return Self::starter();
        };
        match Self::from_blob(catalog, blob) {
            Ok((state, _)) => state,
            Err(e) => {
                warn!(error = %e, "character blob rejected, using starter build");
                Self::starter()
            }
        }
    }
}

impl Default for CharacterState {
    fn default() -> Self {
        Self::starter()
    }
}
