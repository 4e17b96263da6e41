use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid simulation config field {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum CharacterStateError {
    #[error("malformed character blob: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("character blob is empty")]
    Empty,
    #[error("character blob names unknown weapon {0}")]
    UnknownWeapon(String),
    #[error("failed to encode character state: {0}")]
    Encode(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadoutError {
    #[error("unknown weapon id: {0}")]
    UnknownWeapon(String),
    #[error("weapon {0} is not unlocked")]
    WeaponLocked(String),
    #[error("unknown ability id: {0}")]
    UnknownAbility(String),
    #[error("unknown passive id: {0}")]
    UnknownPassive(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Msgpack(#[from] rmp_serde::encode::Error),
}
