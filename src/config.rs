use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ── Section structs ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// AI re-evaluates on one frame out of this many.
    pub eval_interval_frames: u64,
    pub separation_distance: f32,
    /// Cap on the separation push, world units per second.
    pub separation_max_speed: f32,
    pub waypoint_tolerance: f32,
    pub spatial_cell_size: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            eval_interval_frames: 3,
            separation_distance: 36.0,
            separation_max_speed: 70.0,
            waypoint_tolerance: 12.0,
            spatial_cell_size: 128.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostileConfig {
    pub max_health: f32,
    pub detection_range: f32,
    pub attack_range: f32,
    pub damage: f32,
    pub attack_cooldown_ms: f32,
    pub move_speed: f32,
    /// Leave `chase` for `returning` beyond detection × this factor.
    pub leash_factor: f32,
    /// Leave `attack` for `chase` beyond attack range × this factor.
    pub attack_exit_factor: f32,
    /// Resume `chase` from `returning` within detection × this factor.
    pub reacquire_factor: f32,
    pub home_tolerance: f32,
    pub path_recompute_ms: f32,
    pub camp_respawn_ms: f32,
}

impl Default for HostileConfig {
    fn default() -> Self {
        Self {
            max_health: 320.0,
            detection_range: 320.0,
            attack_range: 70.0,
            damage: 14.0,
            attack_cooldown_ms: 1200.0,
            move_speed: 115.0,
            leash_factor: 1.5,
            attack_exit_factor: 1.2,
            reacquire_factor: 0.8,
            home_tolerance: 10.0,
            path_recompute_ms: 1000.0,
            camp_respawn_ms: 45_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinionConfig {
    pub melee_health: f32,
    pub caster_health: f32,
    pub melee_damage: f32,
    pub caster_damage: f32,
    pub melee_range: f32,
    pub caster_range: f32,
    pub attack_cooldown_ms: f32,
    pub move_speed: f32,
    /// Enemy minions inside this radius take priority.
    pub minion_aggro_radius: f32,
    /// Enemy avatar inside this (smaller) radius comes next.
    pub avatar_aggro_radius: f32,
    /// Slack added to attack range when looking for structures.
    pub structure_margin: f32,
    pub path_recompute_ms: f32,
}

impl Default for MinionConfig {
    fn default() -> Self {
        Self {
            melee_health: 180.0,
            caster_health: 120.0,
            melee_damage: 10.0,
            caster_damage: 14.0,
            melee_range: 60.0,
            caster_range: 260.0,
            attack_cooldown_ms: 1250.0,
            move_speed: 90.0,
            minion_aggro_radius: 280.0,
            avatar_aggro_radius: 200.0,
            structure_margin: 60.0,
            path_recompute_ms: 400.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub tower_health: f32,
    pub nexus_health: f32,
    pub tower_range: f32,
    pub tower_damage: f32,
    pub tower_cooldown_ms: f32,
    /// Delay between an "ally under attack" override and the actual retarget.
    pub retarget_delay_ms: f32,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            tower_health: 2200.0,
            nexus_health: 4000.0,
            tower_range: 420.0,
            tower_damage: 60.0,
            tower_cooldown_ms: 1500.0,
            retarget_delay_ms: 500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub death_decay_ms: f32,
    pub hit_flash_ms: f32,
    pub projectile_speed: f32,
    /// Open question: whether a committed delayed cast still lands after its caster died.
    pub cancel_pending_casts_on_caster_death: bool,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            crit_chance: 0.2,
            crit_multiplier: 2.0,
            death_decay_ms: 1200.0,
            hit_flash_ms: 150.0,
            projectile_speed: 650.0,
            cancel_pending_casts_on_caster_death: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub max_health: f32,
    pub max_mana: f32,
    pub mana_regen_per_sec: f32,
    pub move_speed: f32,
    pub respawn_ms: f32,
    pub arrival_tolerance: f32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            max_health: 650.0,
            max_mana: 300.0,
            mana_regen_per_sec: 8.0,
            move_speed: 230.0,
            respawn_ms: 6000.0,
            arrival_tolerance: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    pub interval_ms: f32,
    pub first_wave_ms: f32,
    pub group_size: usize,
    pub spacing: f32,
    /// Vertical offset alternated between consecutive minions.
    pub stagger: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000.0,
            first_wave_ms: 2_000.0,
            group_size: 6,
            spacing: 40.0,
            stagger: 18.0,
        }
    }
}

// ── Root config ────────────────────────────────────────────────────

/// Every tunable of the simulation. Partial JSON documents override only the
/// fields they name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub ai: AiConfig,
    pub hostile: HostileConfig,
    pub minion: MinionConfig,
    pub structure: StructureConfig,
    pub combat: CombatConfig,
    pub avatar: AvatarConfig,
    pub waves: WaveConfig,
}

impl SimConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.eval_interval_frames == 0 {
            return Err(invalid("ai.eval_interval_frames", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.combat.crit_chance) {
            return Err(invalid("combat.crit_chance", "must be within [0, 1]"));
        }
        if self.combat.crit_multiplier < 1.0 {
            return Err(invalid("combat.crit_multiplier", "must be at least 1"));
        }
        if self.hostile.leash_factor < 1.0 {
            return Err(invalid("hostile.leash_factor", "must be at least 1"));
        }
        if self.hostile.attack_exit_factor < 1.0 {
            return Err(invalid("hostile.attack_exit_factor", "must be at least 1"));
        }
        if self.hostile.reacquire_factor <= 0.0 || self.hostile.reacquire_factor > 1.0 {
            return Err(invalid("hostile.reacquire_factor", "must be within (0, 1]"));
        }
        if self.waves.interval_ms <= 0.0 {
            return Err(invalid("waves.interval_ms", "must be positive"));
        }
        if self.ai.separation_distance <= 0.0 {
            return Err(invalid("ai.separation_distance", "must be positive"));
        }
        if self.ai.separation_max_speed <= 0.0 {
            return Err(invalid("ai.separation_max_speed", "must be positive"));
        }
        if self.ai.spatial_cell_size <= 0.0 {
            return Err(invalid("ai.spatial_cell_size", "must be positive"));
        }
        if self.hostile.path_recompute_ms <= 0.0 || self.minion.path_recompute_ms <= 0.0 {
            return Err(invalid("path_recompute_ms", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config = SimConfig::from_json(r#"{ "waves": { "group_size": 4 } }"#).unwrap();
        assert_eq!(config.waves.group_size, 4);
        assert_eq!(config.waves.interval_ms, WaveConfig::default().interval_ms);
        assert_eq!(config.ai.eval_interval_frames, 3);
    }

    #[test]
    fn zero_ai_cadence_is_rejected() {
        let err = SimConfig::from_json(r#"{ "ai": { "eval_interval_frames": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ai.eval_interval_frames", .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = SimConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn crit_chance_out_of_range_is_rejected() {
        let err = SimConfig::from_json(r#"{ "combat": { "crit_chance": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "combat.crit_chance", .. }));
    }

    #[test]
    fn non_positive_separation_is_rejected() {
        let err = SimConfig::from_json(r#"{ "ai": { "separation_distance": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ai.separation_distance", .. }));

        let err =
            SimConfig::from_json(r#"{ "ai": { "separation_max_speed": -5.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ai.separation_max_speed", .. }));
    }
}
