/// Gameplay tuning for everything that can kill a player: enemies, beams and the boss.

#[derive(Debug, Clone, Copy)]
pub struct EnemyTuning {
    /// Edge length of the square enemy hitbox in pixels.
    pub size: f32,

    /// Base speed in pixels per nominal frame; horizontal drift is half of it.
    pub speed: f32,

    /// Enemies spawned per wave number (wave N spawns `N * per_wave`).
    pub per_wave: u32,

    /// Every Nth wave is a boss wave instead of an enemy wave.
    pub boss_wave_every: u32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            size: 20.0,
            speed: 3.0,
            per_wave: 2,
            boss_wave_every: 3,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BeamTuning {
    /// Minimum time between two beams in milliseconds.
    pub interval_ms: u64,

    /// Beam lifetime in milliseconds.
    pub duration_ms: u64,

    /// Nominal (rendered) beam height in pixels.
    pub height: f32,

    /// Extra lethal band above and below the nominal beam.
    pub hitbox_padding: f32,
}

impl Default for BeamTuning {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            duration_ms: 1000,
            height: 20.0,
            hitbox_padding: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BossTuning {
    /// Edge length of the square boss hitbox in pixels.
    pub size: f32,

    /// Starting health pool.
    pub health: i32,

    /// Health removed per player bullet hit.
    pub damage_per_hit: i32,

    /// Score granted to every tracked player when the boss dies.
    pub kill_bonus: u64,

    /// Amplitude of the vertical oscillation in pixels per nominal frame.
    pub oscillation: f32,

    /// Bullets per volley, spread evenly along the boss height.
    pub volley_size: u32,

    /// Minimum time between volleys in milliseconds.
    pub volley_cooldown_ms: u64,

    /// Extra grace period before the first volley after the boss appears.
    pub first_volley_delay_ms: u64,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            size: 100.0,
            health: 100,
            damage_per_hit: 10,
            kill_bonus: 1000,
            oscillation: 2.0,
            volley_size: 10,
            volley_cooldown_ms: 2000,
            first_volley_delay_ms: 2000,
        }
    }
}
