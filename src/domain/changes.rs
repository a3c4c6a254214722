// Per-tick record of created, mutated and removed entities.
//
// Values are copied in at record time, so mutations later in the same tick never
// leak into an entry that was already recorded; a later record simply replaces it.

use super::state::{Beam, Boss, Bullet, Enemy, EntityId, Player, PlayerId, PowerUp};
use std::collections::BTreeMap;

/// Accumulated delta for one broadcast. `None` values are removal tombstones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub players: BTreeMap<PlayerId, Option<Player>>,
    pub bullets: BTreeMap<EntityId, Option<Bullet>>,
    pub enemies: BTreeMap<EntityId, Option<Enemy>>,
    pub beams: BTreeMap<EntityId, Option<Beam>>,
    pub power_ups: BTreeMap<EntityId, Option<PowerUp>>,
    /// Outer `None`: boss untouched. `Some(None)`: boss destroyed.
    pub boss: Option<Option<Boss>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
            && self.bullets.is_empty()
            && self.enemies.is_empty()
            && self.beams.is_empty()
            && self.power_ups.is_empty()
            && self.boss.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    pending: ChangeSet,
}

impl ChangeTracker {
    pub fn player_changed(&mut self, id: PlayerId, player: &Player) {
        self.pending.players.insert(id, Some(*player));
    }

    pub fn player_removed(&mut self, id: PlayerId) {
        self.pending.players.insert(id, None);
    }

    pub fn bullet_changed(&mut self, id: EntityId, bullet: &Bullet) {
        self.pending.bullets.insert(id, Some(*bullet));
    }

    pub fn bullet_removed(&mut self, id: EntityId) {
        self.pending.bullets.insert(id, None);
    }

    pub fn enemy_changed(&mut self, id: EntityId, enemy: &Enemy) {
        self.pending.enemies.insert(id, Some(*enemy));
    }

    pub fn enemy_removed(&mut self, id: EntityId) {
        self.pending.enemies.insert(id, None);
    }

    pub fn beam_changed(&mut self, id: EntityId, beam: &Beam) {
        self.pending.beams.insert(id, Some(*beam));
    }

    pub fn beam_removed(&mut self, id: EntityId) {
        self.pending.beams.insert(id, None);
    }

    pub fn power_up_changed(&mut self, id: EntityId, power_up: &PowerUp) {
        self.pending.power_ups.insert(id, Some(*power_up));
    }

    pub fn power_up_removed(&mut self, id: EntityId) {
        self.pending.power_ups.insert(id, None);
    }

    pub fn boss_changed(&mut self, boss: &Boss) {
        self.pending.boss = Some(Some(*boss));
    }

    pub fn boss_removed(&mut self) {
        self.pending.boss = Some(None);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hands out everything recorded since the last call and starts a new delta.
    pub fn take(&mut self) -> ChangeSet {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending = ChangeSet::default();
    }
}
