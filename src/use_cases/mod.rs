pub mod directory;
pub mod room;
pub mod types;

pub use directory::{JoinTicket, LeaveOutcome, RoomSummary, SessionDirectory};
pub use room::{RoomHandle, RoomSettings};
pub use types::{JoinError, RoomBroadcast, RoomCommand, RoomStatus, Seat, StateDelta};
