// Wire protocol DTOs and conversions for public arena server messages.
// Ids are rendered as decimal strings so clients never lose u64 precision.

use crate::domain::{
    Beam, Boss, Bullet, Direction, Enemy, Player, PlayerCommand, PlayerId, PowerUp, PowerUpKind,
    RoomPhase,
};
use crate::use_cases::{RoomBroadcast, RoomStatus, RoomSummary, StateDelta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    // Sent once after the connection is seated.
    Joined {
        session_id: String,
        is_host: bool,
        player_ids: Vec<String>,
        host_id: String,
    },
    GameInProgress,
    GameStarted,
    GameOver,
    NewHost {
        host_id: String,
    },
    Roster {
        player_ids: Vec<String>,
        host_id: Option<String>,
    },
    Pong,
    GameStateUpdate(GameStateUpdateDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    PlayerInput(PlayerCommandDto),
    StartGame,
    Ping,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerCommandDto {
    Left,
    Right,
    Up,
    Down,
    StopX,
    StopY,
    Shoot,
}

impl From<PlayerCommandDto> for PlayerCommand {
    fn from(command: PlayerCommandDto) -> Self {
        match command {
            PlayerCommandDto::Left => PlayerCommand::Left,
            PlayerCommandDto::Right => PlayerCommand::Right,
            PlayerCommandDto::Up => PlayerCommand::Up,
            PlayerCommandDto::Down => PlayerCommand::Down,
            PlayerCommandDto::StopX => PlayerCommand::StopX,
            PlayerCommandDto::StopY => PlayerCommand::StopY,
            PlayerCommandDto::Shoot => PlayerCommand::Shoot,
        }
    }
}

/// Per-tick delta: each map is `id -> entity | null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateUpdateDto {
    pub players: BTreeMap<String, Option<PlayerDto>>,
    pub bullets: BTreeMap<String, Option<BulletDto>>,
    pub enemies: BTreeMap<String, Option<EnemyDto>>,
    pub beams: BTreeMap<String, Option<BeamDto>>,
    pub power_ups: BTreeMap<String, Option<PowerUpDto>>,
    // Omitted when untouched, null once destroyed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boss: Option<Option<BossDto>>,
    pub wave_number: u32,
    pub all_players: BTreeMap<String, PlayerDto>,
}

fn wire_map<T: Copy, D>(
    entries: &BTreeMap<u64, Option<T>>,
    convert: impl Fn(&T) -> D,
) -> BTreeMap<String, Option<D>> {
    entries
        .iter()
        .map(|(id, value)| (id.to_string(), value.as_ref().map(&convert)))
        .collect()
}

impl From<&StateDelta> for GameStateUpdateDto {
    fn from(delta: &StateDelta) -> Self {
        let changes = &delta.changes;
        Self {
            players: wire_map(&changes.players, |v| PlayerDto::from(v)),
            bullets: wire_map(&changes.bullets, |v| BulletDto::from(v)),
            enemies: wire_map(&changes.enemies, |v| EnemyDto::from(v)),
            beams: wire_map(&changes.beams, |v| BeamDto::from(v)),
            power_ups: wire_map(&changes.power_ups, |v| PowerUpDto::from(v)),
            boss: changes.boss.map(|boss| boss.as_ref().map(BossDto::from)),
            wave_number: delta.wave_number,
            all_players: delta
                .players
                .iter()
                .map(|(id, player)| (id.to_string(), PlayerDto::from(player)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DirectionDto {
    Left,
    Right,
    Up,
    Down,
}

impl From<Direction> for DirectionDto {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => DirectionDto::Left,
            Direction::Right => DirectionDto::Right,
            Direction::Up => DirectionDto::Up,
            Direction::Down => DirectionDto::Down,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub direction: DirectionDto,
    pub alive: bool,
    pub score: u64,
    pub shield: bool,
    pub radial_blast: bool,
    pub is_host: bool,
}

impl From<&Player> for PlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            x: player.x,
            y: player.y,
            dx: player.dx,
            dy: player.dy,
            direction: player.direction.into(),
            alive: player.alive,
            score: player.score,
            shield: player.shield,
            radial_blast: player.radial_blast,
            is_host: player.is_host,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletDto {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub is_boss_bullet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl From<&Bullet> for BulletDto {
    fn from(bullet: &Bullet) -> Self {
        Self {
            x: bullet.x,
            y: bullet.y,
            dx: bullet.dx,
            dy: bullet.dy,
            is_boss_bullet: bullet.is_boss_bullet(),
            owner_id: bullet.owner().map(|id| id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyDto {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl From<&Enemy> for EnemyDto {
    fn from(enemy: &Enemy) -> Self {
        Self {
            x: enemy.x,
            y: enemy.y,
            dx: enemy.dx,
            dy: enemy.dy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BeamDto {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub direction: DirectionDto,
}

impl From<&Beam> for BeamDto {
    fn from(beam: &Beam) -> Self {
        Self {
            x: beam.x,
            y: beam.y,
            width: beam.width,
            height: beam.height,
            direction: beam.direction.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKindDto {
    RadialBlast,
    Shield,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerUpDto {
    pub x: f32,
    pub y: f32,
    pub kind: PowerUpKindDto,
}

impl From<&PowerUp> for PowerUpDto {
    fn from(power_up: &PowerUp) -> Self {
        Self {
            x: power_up.x,
            y: power_up.y,
            kind: match power_up.kind {
                PowerUpKind::RadialBlast => PowerUpKindDto::RadialBlast,
                PowerUpKind::Shield => PowerUpKindDto::Shield,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BossDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub health: i32,
}

impl From<&Boss> for BossDto {
    fn from(boss: &Boss) -> Self {
        Self {
            id: boss.id.to_string(),
            x: boss.x,
            y: boss.y,
            health: boss.health,
        }
    }
}

fn wire_ids(ids: &[PlayerId]) -> Vec<String> {
    ids.iter().map(PlayerId::to_string).collect()
}

impl ServerMessage {
    pub fn joined(
        session_id: PlayerId,
        is_host: bool,
        player_ids: &[PlayerId],
        host_id: PlayerId,
    ) -> Self {
        ServerMessage::Joined {
            session_id: session_id.to_string(),
            is_host,
            player_ids: wire_ids(player_ids),
            host_id: host_id.to_string(),
        }
    }
}

impl From<&RoomBroadcast> for ServerMessage {
    fn from(event: &RoomBroadcast) -> Self {
        match event {
            RoomBroadcast::StateUpdate(delta) => {
                ServerMessage::GameStateUpdate(GameStateUpdateDto::from(delta.as_ref()))
            }
            RoomBroadcast::GameStarted => ServerMessage::GameStarted,
            RoomBroadcast::GameOver => ServerMessage::GameOver,
            RoomBroadcast::NewHost { host_id } => ServerMessage::NewHost {
                host_id: host_id.to_string(),
            },
            RoomBroadcast::Roster {
                player_ids,
                host_id,
            } => ServerMessage::Roster {
                player_ids: wire_ids(player_ids),
                host_id: host_id.map(|id| id.to_string()),
            },
        }
    }
}

/// Room lifecycle as exposed by `GET /rooms`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomPhaseDto {
    Waiting,
    Started,
    Over,
    Closed,
}

impl From<RoomStatus> for RoomPhaseDto {
    fn from(status: RoomStatus) -> Self {
        match status {
            RoomStatus::Open(RoomPhase::Waiting) => RoomPhaseDto::Waiting,
            RoomStatus::Open(RoomPhase::Started) => RoomPhaseDto::Started,
            RoomStatus::Open(RoomPhase::Over) => RoomPhaseDto::Over,
            RoomStatus::Closed => RoomPhaseDto::Closed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub room_id: String,
    pub phase: RoomPhaseDto,
    pub participants: usize,
}

impl From<&RoomSummary> for RoomSummaryDto {
    fn from(summary: &RoomSummary) -> Self {
        Self {
            room_id: summary.room_id.to_string(),
            phase: summary.status.into(),
            participants: summary.participants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChangeSet;
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[test]
    fn parses_client_messages() {
        let input: ClientMessage =
            serde_json::from_str(r#"{"type":"playerInput","data":"stopX"}"#).expect("input");
        assert!(matches!(
            input,
            ClientMessage::PlayerInput(PlayerCommandDto::StopX)
        ));
        let start: ClientMessage =
            serde_json::from_str(r#"{"type":"startGame"}"#).expect("start");
        assert!(matches!(start, ClientMessage::StartGame));
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).expect("ping");
        assert!(matches!(ping, ClientMessage::Ping));
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"playerInput","data":"jump"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn joined_uses_camel_case_and_string_ids() {
        let msg = ServerMessage::joined(7, true, &[7, 9], 7);
        let value = serde_json::to_value(&msg).expect("json");
        assert_eq!(
            value,
            json!({
                "type": "joined",
                "data": { "sessionId": "7", "isHost": true, "playerIds": ["7", "9"], "hostId": "7" }
            })
        );
    }

    #[test]
    fn unit_messages_carry_only_a_type() {
        let value = serde_json::to_value(ServerMessage::GameStarted).expect("json");
        assert_eq!(value, json!({ "type": "gameStarted" }));
    }

    #[test]
    fn state_update_renders_tombstones_and_boss_states() {
        let mut changes = ChangeSet::default();
        changes.enemies.insert(
            3,
            Some(Enemy {
                x: 1.0,
                y: 2.0,
                dx: -1.5,
                dy: 0.0,
            }),
        );
        changes.bullets.insert(4, None);
        let mut delta = StateDelta {
            wave_number: 2,
            changes,
            players: BTreeMap::from([(1, Player::spawn(true))]),
        };

        let value = serde_json::to_value(ServerMessage::from(&RoomBroadcast::StateUpdate(
            Arc::new(delta.clone()),
        )))
        .expect("json");
        let data = &value["data"];
        assert_eq!(value["type"], "gameStateUpdate");
        assert_eq!(data["waveNumber"], 2);
        assert_eq!(data["enemies"]["3"]["dx"], -1.5);
        assert_eq!(data["bullets"]["4"], Value::Null);
        assert!(data.get("boss").is_none());
        assert_eq!(data["allPlayers"]["1"]["isHost"], true);

        delta.changes.boss = Some(None);
        let value = serde_json::to_value(GameStateUpdateDto::from(&delta)).expect("json");
        assert_eq!(value.get("boss"), Some(&Value::Null));
    }
}
