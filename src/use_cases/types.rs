// Use-case level inputs/outputs for the room loop.

use crate::domain::{ChangeSet, Player, PlayerCommand, PlayerId, RoomPhase};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Everything that can mutate a room, serialized through its command queue.
#[derive(Debug)]
pub enum RoomCommand {
    /// The room decides admission and hostship and answers on `reply`.
    Join {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<Seat, JoinError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    Input {
        player_id: PlayerId,
        command: PlayerCommand,
    },
    StartGame {
        player_id: PlayerId,
    },
}

/// Room-side view of an accepted join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub is_host: bool,
    pub host_id: PlayerId,
    /// Every player in the room including the joiner, ascending.
    pub player_ids: Vec<PlayerId>,
}

/// Reasons a connection cannot be placed into a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// The targeted room already left the waiting phase.
    GameInProgress,
    /// No room exists under the requested id.
    RoomNotFound,
    /// The targeted room has no free slot.
    RoomFull,
    /// The participant id is already seated somewhere.
    AlreadyJoined,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::GameInProgress => "game in progress",
            Self::RoomNotFound => "room not found",
            Self::RoomFull => "room full",
            Self::AlreadyJoined => "already joined",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for JoinError {}

/// Events fanned out to every connection of a room.
#[derive(Debug, Clone)]
pub enum RoomBroadcast {
    StateUpdate(Arc<StateDelta>),
    GameStarted,
    GameOver,
    NewHost {
        host_id: PlayerId,
    },
    Roster {
        player_ids: Vec<PlayerId>,
        host_id: Option<PlayerId>,
    },
}

/// One tick's worth of changes plus the full player mapping.
#[derive(Debug, Clone)]
pub struct StateDelta {
    pub wave_number: u32,
    pub changes: ChangeSet,
    pub players: BTreeMap<PlayerId, Player>,
}

/// Lifecycle visible from outside the room task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Open(RoomPhase),
    /// The room loop has exited; the room no longer accepts anything.
    Closed,
}
