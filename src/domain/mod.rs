// Domain layer: core simulation types and rules.

pub mod changes;
pub mod room;
pub mod state;
pub mod systems;
pub mod tuning;

pub use changes::{ChangeSet, ChangeTracker};
pub use room::TickOutcome;
pub use state::{
    Beam, Boss, Bullet, BulletSource, Direction, Enemy, EntityId, Player, PlayerId, PowerUp,
    PowerUpKind, RoomPhase, RoomState,
};
pub use systems::input::PlayerCommand;
pub use tuning::GameTuning;
