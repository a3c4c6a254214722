/// Gameplay tuning for power-up pickups.

#[derive(Debug, Clone, Copy)]
pub struct PowerUpTuning {
    /// Edge length of the square pickup hitbox in pixels.
    pub size: f32,

    /// Minimum time between two spawns in milliseconds.
    pub spawn_interval_ms: u64,

    /// Maximum number of pickups lying in the arena at once.
    pub max_active: usize,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        Self {
            size: 20.0,
            spawn_interval_ms: 10_000,
            max_active: 3,
        }
    }
}
