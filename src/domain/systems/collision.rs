use crate::domain::state::{EntityId, PlayerId, PowerUpKind, RoomState};
use tracing::{debug, info};

/// Axis-aligned box; overlap uses open boundaries so touching edges do not collide.
#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn square(x: f32, y: f32, size: f32) -> Self {
        Self {
            x,
            y,
            w: size,
            h: size,
        }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    Resolved,
    AllPlayersDead,
}

/// Runs every collision pass in fixed order.
///
/// Each pass sees the store as left by the previous one, so an entity removed
/// early can never be hit, scored or consumed again in the same tick.
pub fn resolve(state: &mut RoomState, now: u64) -> CollisionOutcome {
    bullets_vs_enemies(state);
    bullets_vs_boss(state);
    boss_bullets_vs_players(state);
    players_vs_boss(state);
    players_vs_enemies(state);
    if state.all_players_dead() {
        return CollisionOutcome::AllPlayersDead;
    }
    beams_vs_players(state, now);
    players_vs_power_ups(state, now);
    CollisionOutcome::Resolved
}

fn kill_player(state: &mut RoomState, player_id: PlayerId, cause: &'static str) {
    if let Some(player) = state.players.get_mut(&player_id) {
        player.alive = false;
        state.changes.player_changed(player_id, player);
        info!(player_id, cause, "player died");
    }
}

fn bullets_vs_enemies(state: &mut RoomState) {
    let bullet_size = state.tuning.projectile.size;
    let enemy_size = state.tuning.enemy.size;
    let score = state.tuning.projectile.enemy_kill_score;

    let bullet_ids: Vec<EntityId> = state.bullets.keys().copied().collect();
    for bullet_id in bullet_ids {
        let Some(bullet) = state.bullets.get(&bullet_id).copied() else {
            continue;
        };
        let hitbox = Rect::square(bullet.x, bullet.y, bullet_size);
        let hit = state
            .enemies
            .iter()
            .find(|(_, e)| hitbox.overlaps(&Rect::square(e.x, e.y, enemy_size)))
            .map(|(id, _)| *id);
        let Some(enemy_id) = hit else {
            continue;
        };

        state.enemies.remove(&enemy_id);
        state.changes.enemy_removed(enemy_id);
        state.bullets.remove(&bullet_id);
        state.changes.bullet_removed(bullet_id);

        // The shooter may have disconnected while the bullet was in flight.
        let Some(owner) = bullet.owner() else {
            continue;
        };
        if let Some(player) = state.players.get_mut(&owner) {
            player.score += score;
            state.changes.player_changed(owner, player);
        }
    }
}

fn bullets_vs_boss(state: &mut RoomState) {
    let bullet_size = state.tuning.projectile.size;
    let tuning = state.tuning.boss;
    let Some(boss) = state.boss else {
        return;
    };
    let boss_box = Rect::square(boss.x, boss.y, tuning.size);

    let hits: Vec<EntityId> = state
        .bullets
        .iter()
        .filter(|(_, b)| !b.is_boss_bullet())
        .filter(|(_, b)| Rect::square(b.x, b.y, bullet_size).overlaps(&boss_box))
        .map(|(id, _)| *id)
        .collect();

    let mut health = boss.health;
    for bullet_id in hits {
        state.bullets.remove(&bullet_id);
        state.changes.bullet_removed(bullet_id);
        health -= tuning.damage_per_hit;
        if health <= 0 {
            break;
        }
    }
    if health == boss.health {
        return;
    }

    if health > 0 {
        let boss = state.boss.insert(boss);
        boss.health = health;
        state.changes.boss_changed(boss);
        return;
    }

    state.boss = None;
    state.changes.boss_removed();
    // Every tracked player gets the bonus, dead or alive.
    for (id, player) in state.players.iter_mut() {
        player.score += tuning.kill_bonus;
        state.changes.player_changed(*id, player);
    }
    info!(boss_id = boss.id, "boss destroyed");
}

fn boss_bullets_vs_players(state: &mut RoomState) {
    let bullet_size = state.tuning.projectile.size;
    let player_size = state.tuning.player.size;

    let bullet_ids: Vec<EntityId> = state
        .bullets
        .iter()
        .filter(|(_, b)| b.is_boss_bullet())
        .map(|(id, _)| *id)
        .collect();
    for bullet_id in bullet_ids {
        let Some(bullet) = state.bullets.get(&bullet_id).copied() else {
            continue;
        };
        let hitbox = Rect::square(bullet.x, bullet.y, bullet_size);
        let hit = state
            .players
            .iter()
            .filter(|(_, p)| p.alive)
            .find(|(_, p)| hitbox.overlaps(&Rect::square(p.x, p.y, player_size)))
            .map(|(id, p)| (*id, p.shield));
        let Some((player_id, shielded)) = hit else {
            continue;
        };

        // Shields absorb the bullet.
        state.bullets.remove(&bullet_id);
        state.changes.bullet_removed(bullet_id);
        if !shielded {
            kill_player(state, player_id, "boss bullet");
        }
    }
}

fn players_vs_boss(state: &mut RoomState) {
    let player_size = state.tuning.player.size;
    let Some(boss) = state.boss else {
        return;
    };
    let boss_box = Rect::square(boss.x, boss.y, state.tuning.boss.size);

    let victims: Vec<PlayerId> = state
        .players
        .iter()
        .filter(|(_, p)| p.alive && !p.shield)
        .filter(|(_, p)| Rect::square(p.x, p.y, player_size).overlaps(&boss_box))
        .map(|(id, _)| *id)
        .collect();
    for player_id in victims {
        kill_player(state, player_id, "boss contact");
    }
}

fn players_vs_enemies(state: &mut RoomState) {
    let player_size = state.tuning.player.size;
    let enemy_size = state.tuning.enemy.size;

    let player_ids: Vec<PlayerId> = state.players.keys().copied().collect();
    for player_id in player_ids {
        let Some(player) = state.players.get(&player_id).copied() else {
            continue;
        };
        if !player.alive {
            continue;
        }
        let hitbox = Rect::square(player.x, player.y, player_size);
        let hit = state
            .enemies
            .iter()
            .find(|(_, e)| hitbox.overlaps(&Rect::square(e.x, e.y, enemy_size)))
            .map(|(id, _)| *id);
        let Some(enemy_id) = hit else {
            continue;
        };

        state.enemies.remove(&enemy_id);
        state.changes.enemy_removed(enemy_id);
        if !player.shield {
            kill_player(state, player_id, "enemy contact");
        }
    }
}

fn beams_vs_players(state: &mut RoomState, now: u64) {
    let tuning = state.tuning.beam;
    let player_size = state.tuning.player.size;

    let changes = &mut state.changes;
    state.beams.retain(|id, beam| {
        let expired = now.saturating_sub(beam.created_at) > tuning.duration_ms;
        if expired {
            changes.beam_removed(*id);
        }
        !expired
    });

    let mut victims: Vec<PlayerId> = Vec::new();
    for beam in state.beams.values() {
        let band = Rect {
            x: beam.x,
            y: beam.y - tuning.hitbox_padding,
            w: beam.width,
            h: beam.height + tuning.hitbox_padding * 2.0,
        };
        victims.extend(
            state
                .players
                .iter()
                .filter(|(_, p)| p.alive && !p.shield)
                .filter(|(_, p)| Rect::square(p.x, p.y, player_size).overlaps(&band))
                .map(|(id, _)| *id),
        );
    }
    victims.sort_unstable();
    victims.dedup();
    for player_id in victims {
        kill_player(state, player_id, "beam");
    }
}

fn players_vs_power_ups(state: &mut RoomState, now: u64) {
    let player_size = state.tuning.player.size;
    let power_up_size = state.tuning.power_up.size;
    let buffs = state.tuning.player;

    let player_ids: Vec<PlayerId> = state.players.keys().copied().collect();
    for player_id in player_ids {
        let Some(player) = state.players.get(&player_id).copied() else {
            continue;
        };
        if !player.alive {
            continue;
        }
        let hitbox = Rect::square(player.x, player.y, player_size);
        let hit = state
            .power_ups
            .iter()
            .find(|(_, p)| hitbox.overlaps(&Rect::square(p.x, p.y, power_up_size)))
            .map(|(id, p)| (*id, p.kind));
        let Some((power_up_id, kind)) = hit else {
            continue;
        };

        state.power_ups.remove(&power_up_id);
        state.changes.power_up_removed(power_up_id);
        if let Some(player) = state.players.get_mut(&player_id) {
            match kind {
                PowerUpKind::Shield => {
                    player.shield = true;
                    player.shield_expires_at = now + buffs.shield_duration_ms;
                }
                PowerUpKind::RadialBlast => {
                    player.radial_blast = true;
                    player.radial_blast_expires_at = now + buffs.radial_blast_duration_ms;
                }
            }
            state.changes.player_changed(player_id, player);
            debug!(player_id, ?kind, "power-up collected");
        }
    }
}
