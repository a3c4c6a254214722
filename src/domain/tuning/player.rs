/// Gameplay tuning for player-controlled fighters.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Edge length of the square player hitbox in pixels.
    pub size: f32,

    /// Movement speed in pixels per nominal frame.
    pub speed: f32,

    /// Shield lifetime in milliseconds after pickup.
    pub shield_duration_ms: u64,

    /// Radial blast lifetime in milliseconds after pickup.
    pub radial_blast_duration_ms: u64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            size: 20.0,
            speed: 3.0,
            shield_duration_ms: 5000,
            radial_blast_duration_ms: 5000,
        }
    }
}
