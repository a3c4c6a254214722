// Room lifecycle: Waiting -> Started -> Over -> (host restart) -> Started.

use super::changes::ChangeSet;
use super::state::{Player, PlayerId, RoomPhase, RoomState};
use super::systems::collision::{self, CollisionOutcome};
use super::systems::input::{self, PlayerCommand};
use super::systems::{movement, spawner};
use rand::Rng;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Room not running; nothing was simulated.
    Idle,
    /// Simulation advanced; the tracker holds this tick's delta.
    Advanced,
    /// The last living player died this tick.
    GameOver,
}

impl RoomState {
    pub fn add_player(&mut self, player_id: PlayerId, is_host: bool) {
        if is_host {
            self.clear_host_flag();
            self.host = Some(player_id);
        }
        let player = Player::spawn(is_host);
        self.players.insert(player_id, player);
        self.changes.player_changed(player_id, &player);
    }

    /// Seats a joiner while the room is still waiting; the first joiner of a
    /// hostless room becomes host. Returns the joiner's host flag, or `None`
    /// once the room has left `Waiting`.
    pub fn admit_player(&mut self, player_id: PlayerId) -> Option<bool> {
        if self.phase != RoomPhase::Waiting {
            return None;
        }
        let is_host = self.host.is_none() || self.host == Some(player_id);
        self.add_player(player_id, is_host);
        Some(is_host)
    }

    /// Physically removes a disconnected player.
    pub fn remove_player(&mut self, player_id: PlayerId) -> bool {
        if self.players.remove(&player_id).is_none() {
            return false;
        }
        self.changes.player_removed(player_id);
        if self.host == Some(player_id) {
            self.host = None;
        }
        true
    }

    /// Gives a hostless room to its lowest remaining player id.
    pub fn hand_over_host(&mut self) -> Option<PlayerId> {
        if self.host.is_some() {
            return None;
        }
        let next = self.players.keys().next().copied()?;
        self.promote_host(next);
        Some(next)
    }

    pub fn promote_host(&mut self, player_id: PlayerId) -> bool {
        if !self.players.contains_key(&player_id) {
            return false;
        }
        self.clear_host_flag();
        self.host = Some(player_id);
        if let Some(player) = self.players.get_mut(&player_id) {
            player.is_host = true;
            self.changes.player_changed(player_id, player);
        }
        true
    }

    fn clear_host_flag(&mut self) {
        let Some(previous) = self.host.take() else {
            return;
        };
        if let Some(player) = self.players.get_mut(&previous) {
            player.is_host = false;
            self.changes.player_changed(previous, player);
        }
    }

    pub fn apply_command(&mut self, player_id: PlayerId, command: PlayerCommand) {
        input::apply_command(self, player_id, command);
    }

    /// Host-only start. From `Over` the room is reset first; a running room ignores it.
    pub fn start_game(&mut self, requested_by: PlayerId, now: u64, rng: &mut impl Rng) -> bool {
        if self.host != Some(requested_by) {
            return false;
        }
        match self.phase {
            RoomPhase::Started => return false,
            RoomPhase::Over => self.reset(now),
            RoomPhase::Waiting => {}
        }

        self.phase = RoomPhase::Started;
        self.last_beam_at = now;
        self.last_power_up_at = now;
        spawner::advance_wave(self, now, rng);
        info!(players = self.players.len(), "game started");
        true
    }

    /// Clears entities, scores and waves, then re-admits every connected participant.
    fn reset(&mut self, now: u64) {
        for id in std::mem::take(&mut self.bullets).into_keys() {
            self.changes.bullet_removed(id);
        }
        for id in std::mem::take(&mut self.enemies).into_keys() {
            self.changes.enemy_removed(id);
        }
        for id in std::mem::take(&mut self.beams).into_keys() {
            self.changes.beam_removed(id);
        }
        for id in std::mem::take(&mut self.power_ups).into_keys() {
            self.changes.power_up_removed(id);
        }
        if self.boss.take().is_some() {
            self.changes.boss_removed();
        }

        self.wave_number = 0;
        self.last_beam_at = now;
        self.last_power_up_at = now;
        for (id, player) in self.players.iter_mut() {
            *player = Player::spawn(self.host == Some(*id));
            self.changes.player_changed(*id, player);
        }
        self.phase = RoomPhase::Waiting;
    }

    /// Advances one tick. `dt` is elapsed time in nominal frames.
    pub fn step(&mut self, now: u64, dt: f32, rng: &mut impl Rng) -> TickOutcome {
        if self.phase != RoomPhase::Started {
            return TickOutcome::Idle;
        }

        movement::move_players(self, dt);
        movement::move_bullets(self, dt);
        movement::move_enemies(self, dt);
        movement::move_boss(self, now, dt);
        movement::expire_buffs(self, now);

        spawner::advance_wave(self, now, rng);
        spawner::fire_enemy_beam(self, now, rng);
        spawner::fire_boss_volley(self, now);
        spawner::spawn_power_up(self, now, rng);

        match collision::resolve(self, now) {
            CollisionOutcome::Resolved => TickOutcome::Advanced,
            CollisionOutcome::AllPlayersDead => {
                self.phase = RoomPhase::Over;
                info!(wave = self.wave_number, "game over");
                TickOutcome::GameOver
            }
        }
    }

    pub fn take_changes(&mut self) -> ChangeSet {
        self.changes.take()
    }
}
