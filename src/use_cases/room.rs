// Per-room actor: owns one RoomState and drives it at a fixed rate.

use super::types::{JoinError, RoomBroadcast, RoomCommand, RoomStatus, Seat, StateDelta};
use crate::domain::{GameTuning, PlayerCommand, PlayerId, RoomPhase, RoomState, TickOutcome};
use crate::utils::{now_millis, rand_id};
use axum::extract::ws::Utf8Bytes;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Movement speeds are tuned per 1/60 s frame; elapsed time is expressed in these frames.
pub const NOMINAL_FRAME: Duration = Duration::from_micros(16_667);
/// Upper bound on frames simulated by one tick after a scheduling stall.
const MAX_FRAMES_PER_TICK: f32 = 4.0;

/// Shared configuration for spawning room loops.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Capacity for inbound room commands.
    pub command_channel_capacity: usize,
    /// Capacity for broadcast room events.
    pub broadcast_capacity: usize,
    /// Fixed tick interval for the room loop.
    pub tick_interval: Duration,
    /// Participants per room.
    pub room_capacity: usize,
    /// Gameplay tuning applied to new rooms.
    pub tuning: GameTuning,
}

/// Idempotent, cooperative cancellation for a room loop.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    /// Returns true only for the call that actually stopped the loop.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        // notify_one keeps a permit if the loop is mid-tick.
        self.notify.notify_one();
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        if self.is_stopped() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Per-room channels and lifecycle controls.
#[derive(Clone)]
pub struct RoomHandle {
    /// Identifier clients use to target this room.
    pub room_id: Arc<str>,
    /// Sender for commands into the room task.
    commands_tx: mpsc::Sender<RoomCommand>,
    /// Broadcast sender for raw room events.
    events_tx: broadcast::Sender<RoomBroadcast>,
    /// Broadcast sender for serialized room events.
    pub bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender for the room lifecycle.
    status_tx: watch::Sender<RoomStatus>,
    /// Wall-clock millis of the last processed command.
    last_activity: Arc<AtomicU64>,
    stop: Arc<StopSignal>,
}

impl RoomHandle {
    /// Spawns the room task and returns its handle plus an event receiver
    /// subscribed before the task could emit anything.
    pub fn spawn(
        room_id: Arc<str>,
        settings: &RoomSettings,
    ) -> (Self, broadcast::Receiver<RoomBroadcast>) {
        let (commands_tx, commands_rx) =
            mpsc::channel::<RoomCommand>(settings.command_channel_capacity);
        let (events_tx, events_rx) =
            broadcast::channel::<RoomBroadcast>(settings.broadcast_capacity);
        let (bytes_tx, _bytes_rx) = broadcast::channel::<Utf8Bytes>(settings.broadcast_capacity);
        let (status_tx, _status_rx) =
            watch::channel::<RoomStatus>(RoomStatus::Open(RoomPhase::Waiting));
        let last_activity = Arc::new(AtomicU64::new(now_millis()));
        let stop = Arc::new(StopSignal::default());

        tokio::spawn(room_task(
            room_id.clone(),
            commands_rx,
            events_tx.clone(),
            status_tx.clone(),
            last_activity.clone(),
            stop.clone(),
            settings.clone(),
        ));

        let handle = Self {
            room_id,
            commands_tx,
            events_tx,
            bytes_tx,
            status_tx,
            last_activity,
            stop,
        };
        (handle, events_rx)
    }

    pub fn status(&self) -> RoomStatus {
        *self.status_tx.borrow()
    }

    pub fn is_waiting(&self) -> bool {
        self.status() == RoomStatus::Open(RoomPhase::Waiting)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RoomBroadcast> {
        self.events_tx.subscribe()
    }

    pub fn subscribe_bytes(&self) -> broadcast::Receiver<Utf8Bytes> {
        self.bytes_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<RoomStatus> {
        self.status_tx.subscribe()
    }

    /// Asks the room to seat a participant and waits for its answer.
    pub async fn join(&self, player_id: PlayerId) -> Result<Seat, JoinError> {
        let (reply, answer) = oneshot::channel();
        if !self.send(RoomCommand::Join { player_id, reply }).await {
            return Err(JoinError::RoomNotFound);
        }
        // A dropped reply means the loop stopped before reaching the command.
        answer.await.unwrap_or(Err(JoinError::RoomNotFound))
    }

    /// Queues a control command; false when the room loop is gone.
    pub async fn send(&self, command: RoomCommand) -> bool {
        self.commands_tx.send(command).await.is_ok()
    }

    /// Non-blocking input path for connection loops.
    pub fn try_send_input(
        &self,
        player_id: PlayerId,
        command: PlayerCommand,
    ) -> Result<(), mpsc::error::TrySendError<RoomCommand>> {
        self.commands_tx
            .try_send(RoomCommand::Input { player_id, command })
    }

    pub fn last_activity(&self) -> u64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    /// Stops the room loop; repeated calls are no-ops.
    pub fn stop(&self) -> bool {
        self.stop.stop()
    }
}

/// Elapsed wall time in nominal frames, capped after long stalls.
pub fn frame_delta(elapsed: Duration) -> f32 {
    (elapsed.as_secs_f32() / NOMINAL_FRAME.as_secs_f32()).min(MAX_FRAMES_PER_TICK)
}

async fn room_task(
    room_id: Arc<str>,
    mut commands_rx: mpsc::Receiver<RoomCommand>,
    events_tx: broadcast::Sender<RoomBroadcast>,
    status_tx: watch::Sender<RoomStatus>,
    last_activity: Arc<AtomicU64>,
    stop: Arc<StopSignal>,
    settings: RoomSettings,
) {
    let mut state = RoomState::new(settings.tuning, now_millis());
    let mut rng = SmallRng::seed_from_u64(rand_id());
    let mut tick: u64 = 0;

    // Drive the game loop at the configured tick rate.
    let mut interval = tokio::time::interval(settings.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();
    info!(room_id = %room_id, "room loop started");

    loop {
        tokio::select! {
            _ = stop.wait() => {
                // Exit cleanly when the room is torn down.
                break;
            }
            _ = interval.tick() => {}
        }

        let now = now_millis();
        while let Ok(command) = commands_rx.try_recv() {
            last_activity.store(now, Ordering::Relaxed);
            handle_command(&mut state, command, now, &mut rng, &events_tx);
        }

        let dt = frame_delta(last_tick.elapsed());
        last_tick = Instant::now();

        match state.step(now, dt, &mut rng) {
            TickOutcome::Idle => {}
            TickOutcome::GameOver => {
                // The terminal signal replaces this tick's delta.
                state.changes.clear();
                let _ = events_tx.send(RoomBroadcast::GameOver);
            }
            TickOutcome::Advanced => {
                tick += 1;
                let changes = state.take_changes();
                if !changes.is_empty() {
                    let _ = events_tx.send(RoomBroadcast::StateUpdate(Arc::new(StateDelta {
                        wave_number: state.wave_number,
                        changes,
                        players: state.players.clone(),
                    })));
                }
            }
        }

        status_tx.send_if_modified(|status| {
            let next = RoomStatus::Open(state.phase);
            let changed = *status != next;
            *status = next;
            changed
        });
    }

    status_tx.send_replace(RoomStatus::Closed);
    info!(room_id = %room_id, ticks = tick, "room loop stopped");
}

fn handle_command(
    state: &mut RoomState,
    command: RoomCommand,
    now: u64,
    rng: &mut SmallRng,
    events_tx: &broadcast::Sender<RoomBroadcast>,
) {
    match command {
        RoomCommand::Join { player_id, reply } => {
            let Some(is_host) = state.admit_player(player_id) else {
                debug!(player_id, phase = ?state.phase, "join refused");
                let _ = reply.send(Err(JoinError::GameInProgress));
                return;
            };
            let seat = Seat {
                is_host,
                host_id: state.host.unwrap_or(player_id),
                player_ids: state.players.keys().copied().collect(),
            };
            if reply.send(Ok(seat)).is_err() {
                // The joiner gave up while queued; undo the seat.
                state.remove_player(player_id);
                state.hand_over_host();
                return;
            }
            info!(player_id, is_host, "player joined");
            broadcast_roster(state, events_tx);
        }
        RoomCommand::Leave { player_id } => {
            if state.remove_player(player_id) {
                info!(player_id, "player left");
                if let Some(host_id) = state.hand_over_host() {
                    info!(host_id, "host handed over");
                    let _ = events_tx.send(RoomBroadcast::NewHost { host_id });
                }
                broadcast_roster(state, events_tx);
            }
        }
        RoomCommand::Input { player_id, command } => {
            state.apply_command(player_id, command);
        }
        RoomCommand::StartGame { player_id } => {
            if state.start_game(player_id, now, rng) {
                let _ = events_tx.send(RoomBroadcast::GameStarted);
            } else {
                debug!(player_id, phase = ?state.phase, "start request ignored");
            }
        }
    }
}

fn broadcast_roster(state: &RoomState, events_tx: &broadcast::Sender<RoomBroadcast>) {
    let _ = events_tx.send(RoomBroadcast::Roster {
        player_ids: state.players.keys().copied().collect(),
        host_id: state.host,
    });
}
