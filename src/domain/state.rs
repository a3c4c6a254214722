// Domain-level simulation entities and the per-room entity store.

use super::changes::ChangeTracker;
use super::tuning::GameTuning;
use std::collections::BTreeMap;

/// Participant identity; one per connection.
pub type PlayerId = u64;
/// Identifier for every non-player entity, unique within a room.
pub type EntityId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Accepting players, simulation idle.
    Waiting,
    /// Tick loop advancing the simulation.
    Started,
    /// Every player is dead; state frozen until the host restarts.
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub direction: Direction,

    // Combat state.
    pub alive: bool,
    pub score: u64,

    // Buffs; expiry timestamps are wall-clock milliseconds.
    pub shield: bool,
    pub shield_expires_at: u64,
    pub radial_blast: bool,
    pub radial_blast_expires_at: u64,

    pub is_host: bool,
}

impl Player {
    /// Fresh player at the spawn corner: alive, no score, no buffs.
    pub fn spawn(is_host: bool) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            dx: 0.0,
            dy: 0.0,
            direction: Direction::Right,
            alive: true,
            score: 0,
            shield: false,
            shield_expires_at: 0,
            radial_blast: false,
            radial_blast_expires_at: 0,
            is_host,
        }
    }

    /// Wave respawn: position, motion, aliveness and buffs reset; score and host flag kept.
    pub fn revive(&mut self) {
        *self = Self {
            score: self.score,
            ..Self::spawn(self.is_host)
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletSource {
    Player(PlayerId),
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub source: BulletSource,
}

impl Bullet {
    pub fn is_boss_bullet(&self) -> bool {
        self.source == BulletSource::Boss
    }

    pub fn owner(&self) -> Option<PlayerId> {
        match self.source {
            BulletSource::Player(id) => Some(id),
            BulletSource::Boss => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enemy {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boss {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub last_volley_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub direction: Direction,
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpKind {
    RadialBlast,
    Shield,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerUp {
    pub x: f32,
    pub y: f32,
    pub kind: PowerUpKind,
}

/// One arena's complete simulation state. Never shared between rooms.
///
/// Maps are ordered so every pass iterates entities in a stable order.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub tuning: GameTuning,
    pub phase: RoomPhase,
    pub host: Option<PlayerId>,

    pub players: BTreeMap<PlayerId, Player>,
    pub bullets: BTreeMap<EntityId, Bullet>,
    pub enemies: BTreeMap<EntityId, Enemy>,
    pub beams: BTreeMap<EntityId, Beam>,
    pub power_ups: BTreeMap<EntityId, PowerUp>,
    pub boss: Option<Boss>,

    pub wave_number: u32,
    pub last_beam_at: u64,
    pub last_power_up_at: u64,

    pub changes: ChangeTracker,
    next_entity_id: EntityId,
}

impl RoomState {
    pub fn new(tuning: GameTuning, now: u64) -> Self {
        Self {
            tuning,
            phase: RoomPhase::Waiting,
            host: None,
            players: BTreeMap::new(),
            bullets: BTreeMap::new(),
            enemies: BTreeMap::new(),
            beams: BTreeMap::new(),
            power_ups: BTreeMap::new(),
            boss: None,
            wave_number: 0,
            last_beam_at: now,
            last_power_up_at: now,
            changes: ChangeTracker::default(),
            next_entity_id: 1,
        }
    }

    /// Allocates an id for a new bullet, enemy, beam, boss or power-up.
    ///
    /// Counter-based so same-tick batch spawns (volleys, radial blasts, waves) never collide.
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id = self.next_entity_id.wrapping_add(1);
        id
    }

    /// True when at least one player is tracked and none of them is alive.
    pub fn all_players_dead(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| !p.alive)
    }
}
