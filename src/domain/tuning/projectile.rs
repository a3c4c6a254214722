/// Gameplay tuning for bullets (player shots and boss volleys).

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Edge length of the square bullet hitbox in pixels.
    pub size: f32,

    /// Bullet speed in pixels per nominal frame.
    pub speed: f32,

    /// Bullets fired at once while the radial blast buff is active.
    pub radial_blast_count: u32,

    /// Score granted to the shooter for destroying an enemy.
    pub enemy_kill_score: u64,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            size: 5.0,
            speed: 5.0,
            radial_blast_count: 16,
            enemy_kill_score: 100,
        }
    }
}
