pub mod camp_spawner;
pub mod cleanup;
pub mod combat;
pub mod lifecycle;
pub mod player;
pub mod projectile;
pub mod waves;
