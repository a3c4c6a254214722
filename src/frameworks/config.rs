use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

pub fn http_port() -> u16 {
    env::var("ARENA_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// Rooms with no command for this long are evicted.
pub fn room_idle_timeout() -> Duration {
    Duration::from_secs(env_u64("ROOM_IDLE_TIMEOUT_SECS", 300))
}

pub fn room_sweep_interval() -> Duration {
    // Zero would make tokio's interval panic.
    Duration::from_secs(env_u64("ROOM_SWEEP_INTERVAL_SECS", 30).max(1))
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const ROOM_BROADCAST_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
// Two participants per room.
pub const ROOM_CAPACITY: usize = 2;
