pub mod components;
pub mod entity;
pub mod systems;
pub mod world;
