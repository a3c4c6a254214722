// Simulation systems; each one mutates the room store and records what it touched.

pub mod collision;
pub mod input;
pub mod movement;
pub mod spawner;
