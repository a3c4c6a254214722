use crate::domain::state::RoomState;
use tracing::debug;

/// `max(0, min(limit, value))`.
pub fn clamp_to(value: f32, limit: f32) -> f32 {
    value.min(limit).max(0.0)
}

/// Moves live players by their velocity, clamped to the arena.
pub fn move_players(state: &mut RoomState, dt: f32) {
    let size = state.tuning.player.size;
    let max_x = state.tuning.arena.width - size;
    let max_y = state.tuning.arena.height - size;

    for (id, player) in state.players.iter_mut() {
        if !player.alive {
            continue;
        }
        let x = clamp_to(player.x + player.dx * dt, max_x);
        let y = clamp_to(player.y + player.dy * dt, max_y);
        if x != player.x || y != player.y {
            player.x = x;
            player.y = y;
            state.changes.player_changed(*id, player);
        }
    }
}

/// Integrates bullets and prunes the ones that left the arena.
pub fn move_bullets(state: &mut RoomState, dt: f32) {
    let size = state.tuning.projectile.size;
    let width = state.tuning.arena.width;
    let height = state.tuning.arena.height;
    let changes = &mut state.changes;

    state.bullets.retain(|id, bullet| {
        bullet.x += bullet.dx * dt;
        bullet.y += bullet.dy * dt;

        let outside = bullet.x + size < 0.0
            || bullet.x > width
            || bullet.y + size < 0.0
            || bullet.y > height;
        if outside {
            changes.bullet_removed(*id);
        } else {
            changes.bullet_changed(*id, bullet);
        }
        !outside
    });
}

/// Integrates enemies, bouncing off the horizontal walls and reflecting at the vertical ones.
pub fn move_enemies(state: &mut RoomState, dt: f32) {
    let size = state.tuning.enemy.size;
    let width = state.tuning.arena.width;
    let height = state.tuning.arena.height;

    for (id, enemy) in state.enemies.iter_mut() {
        enemy.x += enemy.dx * dt;
        enemy.y += enemy.dy * dt;

        if enemy.y <= 0.0 || enemy.y + size >= height {
            enemy.dy = -enemy.dy;
        }
        enemy.y = clamp_to(enemy.y, height - size);

        if enemy.x < 0.0 || enemy.x + size > width {
            enemy.dx = -enemy.dx;
        }
        enemy.x = clamp_to(enemy.x, width - size);

        state.changes.enemy_changed(*id, enemy);
    }
}

/// Sinusoidal vertical drift of the boss, clamped to the arena.
pub fn move_boss(state: &mut RoomState, now: u64, dt: f32) {
    let tuning = state.tuning.boss;
    let max_y = state.tuning.arena.height - tuning.size;
    let Some(boss) = state.boss.as_mut() else {
        return;
    };

    let phase = now as f64 / 1000.0;
    boss.y += phase.sin() as f32 * tuning.oscillation * dt;
    boss.y = clamp_to(boss.y, max_y);
    state.changes.boss_changed(boss);
}

/// Drops shield and radial blast buffs once `now` is past their expiry.
pub fn expire_buffs(state: &mut RoomState, now: u64) {
    for (id, player) in state.players.iter_mut() {
        let mut changed = false;
        if player.shield && now > player.shield_expires_at {
            player.shield = false;
            changed = true;
        }
        if player.radial_blast && now > player.radial_blast_expires_at {
            player.radial_blast = false;
            changed = true;
        }
        if changed {
            debug!(player_id = *id, "buff expired");
            state.changes.player_changed(*id, player);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Bullet, BulletSource, Enemy, Player};
    use crate::domain::tuning::GameTuning;

    fn room() -> RoomState {
        RoomState::new(GameTuning::default(), 0)
    }

    #[test]
    fn players_clamp_at_walls() {
        let mut state = room();
        let mut player = Player::spawn(false);
        player.x = 979.0;
        player.dx = 3.0;
        player.dy = -3.0;
        state.players.insert(1, player);

        move_players(&mut state, 1.0);

        let player = state.players[&1];
        assert_eq!(player.x, 980.0);
        assert_eq!(player.y, 0.0);
    }

    #[test]
    fn stationary_players_are_not_reported() {
        let mut state = room();
        state.players.insert(1, Player::spawn(false));
        move_players(&mut state, 1.0);
        assert!(state.changes.is_empty());
    }

    #[test]
    fn dead_players_do_not_move() {
        let mut state = room();
        let mut player = Player::spawn(false);
        player.dx = 3.0;
        player.alive = false;
        state.players.insert(1, player);

        move_players(&mut state, 1.0);
        assert_eq!(state.players[&1].x, 0.0);
    }

    #[test]
    fn bullets_leaving_arena_are_removed() {
        let mut state = room();
        state.bullets.insert(
            1,
            Bullet {
                x: 998.0,
                y: 100.0,
                dx: 5.0,
                dy: 0.0,
                source: BulletSource::Player(1),
            },
        );
        state.bullets.insert(
            2,
            Bullet {
                x: 500.0,
                y: 100.0,
                dx: 5.0,
                dy: 0.0,
                source: BulletSource::Boss,
            },
        );

        move_bullets(&mut state, 1.0);

        assert!(!state.bullets.contains_key(&1));
        assert_eq!(state.bullets[&2].x, 505.0);
        let changes = state.changes.take();
        assert_eq!(changes.bullets.get(&1), Some(&None));
        assert!(matches!(changes.bullets.get(&2), Some(Some(_))));
    }

    #[test]
    fn enemies_bounce_and_stay_in_bounds() {
        let mut state = room();
        state.enemies.insert(
            1,
            Enemy {
                x: 2.0,
                y: 479.0,
                dx: -4.0,
                dy: 3.0,
            },
        );

        move_enemies(&mut state, 1.0);

        let enemy = state.enemies[&1];
        assert_eq!(enemy.x, 0.0);
        assert_eq!(enemy.y, 480.0);
        assert!(enemy.dx > 0.0);
        assert!(enemy.dy < 0.0);
    }

    #[test]
    fn buffs_expire_strictly_after_deadline() {
        let mut state = room();
        let mut player = Player::spawn(false);
        player.shield = true;
        player.shield_expires_at = 1000;
        player.radial_blast = true;
        player.radial_blast_expires_at = 2000;
        state.players.insert(1, player);

        expire_buffs(&mut state, 1000);
        assert!(state.players[&1].shield);

        expire_buffs(&mut state, 1001);
        assert!(!state.players[&1].shield);
        assert!(state.players[&1].radial_blast);
    }
}
