pub mod arena;
pub mod build_rules;
pub mod catalog;
pub mod character;
pub mod pathfinding;
pub mod status;
