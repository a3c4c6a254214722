use crate::domain::state::{Bullet, BulletSource, Direction, PlayerId, RoomPhase, RoomState};
use std::f32::consts::TAU;

/// Every action a client can request for its own player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Left,
    Right,
    Up,
    Down,
    StopX,
    StopY,
    Shoot,
}

/// Applies one command to a live player in a running room.
///
/// Commands for unknown or dead players, or outside of `Started`, are ignored.
pub fn apply_command(state: &mut RoomState, player_id: PlayerId, command: PlayerCommand) {
    if state.phase != RoomPhase::Started {
        return;
    }
    let speed = state.tuning.player.speed;
    let Some(player) = state.players.get_mut(&player_id) else {
        return;
    };
    if !player.alive {
        return;
    }

    let (dx, dy, direction) = match command {
        PlayerCommand::Left => (-speed, 0.0, Direction::Left),
        PlayerCommand::Right => (speed, 0.0, Direction::Right),
        PlayerCommand::Up => (0.0, -speed, Direction::Up),
        PlayerCommand::Down => (0.0, speed, Direction::Down),
        PlayerCommand::StopX => (0.0, player.dy, player.direction),
        PlayerCommand::StopY => (player.dx, 0.0, player.direction),
        PlayerCommand::Shoot => {
            if player.radial_blast {
                fire_radial_blast(state, player_id);
            } else {
                fire_bullet(state, player_id);
            }
            return;
        }
    };

    player.dx = dx;
    player.dy = dy;
    player.direction = direction;
    state.changes.player_changed(player_id, player);
}

/// Single bullet leaving the player's facing edge.
fn fire_bullet(state: &mut RoomState, player_id: PlayerId) {
    let Some(player) = state.players.get(&player_id).copied() else {
        return;
    };
    let half = state.tuning.player.size / 2.0;
    let speed = state.tuning.projectile.speed;

    let (offset_x, offset_y, dx, dy) = match player.direction {
        Direction::Left => (-half, 0.0, -speed, 0.0),
        Direction::Right => (half, 0.0, speed, 0.0),
        Direction::Up => (0.0, -half, 0.0, -speed),
        Direction::Down => (0.0, half, 0.0, speed),
    };

    let bullet = Bullet {
        x: player.x + half + offset_x,
        y: player.y + half + offset_y,
        dx,
        dy,
        source: BulletSource::Player(player_id),
    };
    let id = state.next_entity_id();
    state.bullets.insert(id, bullet);
    state.changes.bullet_changed(id, &bullet);
}

/// Ring of bullets from the player's centre.
fn fire_radial_blast(state: &mut RoomState, player_id: PlayerId) {
    let Some(player) = state.players.get(&player_id).copied() else {
        return;
    };
    let half = state.tuning.player.size / 2.0;
    let speed = state.tuning.projectile.speed;
    let count = state.tuning.projectile.radial_blast_count;

    for i in 0..count {
        let angle = (i as f32 / count as f32) * TAU;
        let bullet = Bullet {
            x: player.x + half,
            y: player.y + half,
            dx: angle.cos() * speed,
            dy: angle.sin() * speed,
            source: BulletSource::Player(player_id),
        };
        let id = state.next_entity_id();
        state.bullets.insert(id, bullet);
        state.changes.bullet_changed(id, &bullet);
    }
}
