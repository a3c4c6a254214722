// Gameplay tuning grouped per concern; `GameTuning` bundles them for one room.

pub mod hazards;
pub mod player;
pub mod power_up;
pub mod projectile;

pub use hazards::{BeamTuning, BossTuning, EnemyTuning};
pub use player::PlayerTuning;
pub use power_up::PowerUpTuning;
pub use projectile::ProjectileTuning;

/// Arena dimensions in pixels; the origin is the top-left corner.
#[derive(Debug, Clone, Copy)]
pub struct ArenaTuning {
    pub width: f32,
    pub height: f32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GameTuning {
    pub arena: ArenaTuning,
    pub player: PlayerTuning,
    pub projectile: ProjectileTuning,
    pub enemy: EnemyTuning,
    pub beam: BeamTuning,
    pub boss: BossTuning,
    pub power_up: PowerUpTuning,
}
