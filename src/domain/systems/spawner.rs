use crate::domain::state::{
    Beam, Boss, Bullet, BulletSource, Direction, Enemy, PowerUp, PowerUpKind, RoomState,
};
use rand::Rng;
use tracing::{debug, info};

/// Starts the next wave once the arena is clear of enemies and boss.
///
/// Every `boss_wave_every`th wave spawns a boss; all other waves spawn
/// `wave * per_wave` enemies. Players who died during the previous wave are revived.
pub fn advance_wave(state: &mut RoomState, now: u64, rng: &mut impl Rng) -> bool {
    if !state.enemies.is_empty() || state.boss.is_some() {
        return false;
    }

    state.wave_number += 1;
    let wave = state.wave_number;
    let every = state.tuning.enemy.boss_wave_every;
    if every > 0 && wave % every == 0 {
        spawn_boss(state, now);
        info!(wave, "boss wave");
    } else {
        let count = wave * state.tuning.enemy.per_wave;
        for _ in 0..count {
            spawn_enemy(state, rng);
        }
        info!(wave, enemies = count, "enemy wave");
    }

    revive_dead_players(state);
    true
}

fn spawn_enemy(state: &mut RoomState, rng: &mut impl Rng) {
    let tuning = state.tuning.enemy;
    let arena = state.tuning.arena;
    let enemy = Enemy {
        x: arena.width - tuning.size,
        y: rng.random::<f32>() * (arena.height - tuning.size),
        dx: -tuning.speed / 2.0 + (rng.random::<f32>() - 0.5),
        dy: (rng.random::<f32>() - 0.5) * tuning.speed,
    };
    let id = state.next_entity_id();
    state.enemies.insert(id, enemy);
    state.changes.enemy_changed(id, &enemy);
}

fn spawn_boss(state: &mut RoomState, now: u64) {
    let tuning = state.tuning.boss;
    let arena = state.tuning.arena;
    let boss = Boss {
        id: state.next_entity_id(),
        x: arena.width - tuning.size,
        y: (arena.height - tuning.size) / 2.0,
        health: tuning.health,
        last_volley_at: now + tuning.first_volley_delay_ms,
    };
    state.boss = Some(boss);
    state.changes.boss_changed(&boss);
}

fn revive_dead_players(state: &mut RoomState) {
    for (id, player) in state.players.iter_mut() {
        if player.alive {
            continue;
        }
        player.revive();
        debug!(player_id = *id, "player revived");
        state.changes.player_changed(*id, player);
    }
}

/// Gate-driven beam from one random enemy, spanning toward the wall it faces.
pub fn fire_enemy_beam(state: &mut RoomState, now: u64, rng: &mut impl Rng) {
    let tuning = state.tuning.beam;
    if now.saturating_sub(state.last_beam_at) <= tuning.interval_ms {
        return;
    }
    state.last_beam_at = now;
    if state.enemies.is_empty() {
        return;
    }

    let pick = rng.random_range(0..state.enemies.len());
    let Some(enemy) = state.enemies.values().nth(pick).copied() else {
        return;
    };

    let width = state.tuning.arena.width;
    let half = state.tuning.enemy.size / 2.0;
    let left_side = enemy.x < width / 2.0;
    let beam = Beam {
        x: if left_side { enemy.x } else { 0.0 },
        y: enemy.y + half - tuning.height / 2.0,
        width: if left_side { width - enemy.x } else { enemy.x },
        height: tuning.height,
        direction: if left_side {
            Direction::Right
        } else {
            Direction::Left
        },
        created_at: now,
    };
    let id = state.next_entity_id();
    state.beams.insert(id, beam);
    state.changes.beam_changed(id, &beam);
    debug!(beam_id = id, "enemy beam fired");
}

/// Fan of boss bullets spread along the boss height, flying toward the left wall.
pub fn fire_boss_volley(state: &mut RoomState, now: u64) {
    let tuning = state.tuning.boss;
    let speed = state.tuning.projectile.speed;
    let Some(boss) = state.boss.as_mut() else {
        return;
    };
    if now < boss.last_volley_at + tuning.volley_cooldown_ms {
        return;
    }
    boss.last_volley_at = now;
    let boss = *boss;

    let spacing = tuning.size / tuning.volley_size as f32;
    for i in 0..tuning.volley_size {
        let bullet = Bullet {
            x: boss.x,
            y: boss.y + spacing * i as f32,
            dx: -speed,
            dy: 0.0,
            source: BulletSource::Boss,
        };
        let id = state.next_entity_id();
        state.bullets.insert(id, bullet);
        state.changes.bullet_changed(id, &bullet);
    }
}

/// Gate-driven pickup at a random in-bounds spot, capped at `max_active`.
pub fn spawn_power_up(state: &mut RoomState, now: u64, rng: &mut impl Rng) {
    let tuning = state.tuning.power_up;
    if now.saturating_sub(state.last_power_up_at) <= tuning.spawn_interval_ms {
        return;
    }
    state.last_power_up_at = now;
    if state.power_ups.len() >= tuning.max_active {
        return;
    }

    let arena = state.tuning.arena;
    let kind = if rng.random_bool(0.5) {
        PowerUpKind::RadialBlast
    } else {
        PowerUpKind::Shield
    };
    let power_up = PowerUp {
        x: rng.random::<f32>() * (arena.width - tuning.size),
        y: rng.random::<f32>() * (arena.height - tuning.size),
        kind,
    };
    let id = state.next_entity_id();
    state.power_ups.insert(id, power_up);
    state.changes.power_up_changed(id, &power_up);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::Player;
    use crate::domain::tuning::GameTuning;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn room() -> RoomState {
        RoomState::new(GameTuning::default(), 0)
    }

    #[test]
    fn waves_grow_and_every_third_is_a_boss() {
        let mut state = room();
        let mut rng = SmallRng::seed_from_u64(1);

        assert!(advance_wave(&mut state, 0, &mut rng));
        assert_eq!(state.enemies.len(), 2);
        assert!(!advance_wave(&mut state, 0, &mut rng));

        state.enemies.clear();
        advance_wave(&mut state, 0, &mut rng);
        assert_eq!(state.wave_number, 2);
        assert_eq!(state.enemies.len(), 4);

        state.enemies.clear();
        advance_wave(&mut state, 0, &mut rng);
        assert_eq!(state.wave_number, 3);
        assert!(state.enemies.is_empty());
        let boss = state.boss.expect("boss spawned");
        assert_eq!(boss.health, 100);
    }

    #[test]
    fn enemies_spawn_inside_the_arena() {
        let mut state = room();
        let mut rng = SmallRng::seed_from_u64(9);
        state.wave_number = 9;
        advance_wave(&mut state, 0, &mut rng);

        assert_eq!(state.enemies.len(), 20);
        for enemy in state.enemies.values() {
            assert_eq!(enemy.x, 980.0);
            assert!((0.0..=480.0).contains(&enemy.y));
            assert!(enemy.dx < 0.0);
        }
    }

    #[test]
    fn new_wave_revives_the_dead() {
        let mut state = room();
        let mut rng = SmallRng::seed_from_u64(2);
        let mut player = Player::spawn(false);
        player.alive = false;
        player.score = 300;
        player.x = 400.0;
        player.shield = true;
        state.players.insert(1, player);

        advance_wave(&mut state, 0, &mut rng);

        let player = state.players[&1];
        assert!(player.alive);
        assert_eq!(player.score, 300);
        assert_eq!(player.x, 0.0);
        assert!(!player.shield);
    }

    #[test]
    fn beam_waits_for_interval_and_faces_away_from_enemy_side() {
        let mut state = room();
        let mut rng = SmallRng::seed_from_u64(3);
        state.enemies.insert(
            1,
            Enemy {
                x: 800.0,
                y: 100.0,
                dx: 0.0,
                dy: 0.0,
            },
        );

        fire_enemy_beam(&mut state, 3000, &mut rng);
        assert!(state.beams.is_empty());

        fire_enemy_beam(&mut state, 3001, &mut rng);
        let beam = state.beams.values().next().copied().expect("beam");
        assert_eq!(beam.x, 0.0);
        assert_eq!(beam.width, 800.0);
        assert_eq!(beam.y, 100.0);
        assert_eq!(beam.direction, Direction::Left);
    }

    #[test]
    fn boss_volley_respects_cooldown() {
        let mut state = room();
        spawn_boss(&mut state, 0);

        fire_boss_volley(&mut state, 3999);
        assert!(state.bullets.is_empty());

        fire_boss_volley(&mut state, 4000);
        assert_eq!(state.bullets.len(), 10);
        assert!(state.bullets.values().all(|b| b.is_boss_bullet() && b.dx < 0.0));

        fire_boss_volley(&mut state, 5000);
        assert_eq!(state.bullets.len(), 10);
    }

    #[test]
    fn power_ups_are_capped() {
        let mut state = room();
        let mut rng = SmallRng::seed_from_u64(4);
        for round in 1..=5u64 {
            spawn_power_up(&mut state, round * 10_001, &mut rng);
        }
        assert_eq!(state.power_ups.len(), 3);
        for power_up in state.power_ups.values() {
            assert!((0.0..=980.0).contains(&power_up.x));
            assert!((0.0..=480.0).contains(&power_up.y));
        }
    }
}
