use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{
    JoinError, JoinTicket, RoomBroadcast, RoomCommand, RoomHandle, RoomStatus, SessionDirectory,
};
use crate::utils::rand_id;

use axum::{
    Error,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    RoomEventsClosed,
}

#[derive(Debug, serde::Deserialize)]
pub struct RoomQuery {
    // The room id the client wants to join; absent means auto-pair.
    #[serde(default)]
    room_id: Option<String>,
}

/// Serializes each room event once and shares the bytes with every connection.
pub async fn room_event_serializer(
    mut events_rx: broadcast::Receiver<RoomBroadcast>,
    bytes_tx: broadcast::Sender<Utf8Bytes>,
) {
    loop {
        match events_rx.recv().await {
            Ok(event) => {
                let msg = ServerMessage::from(&event);
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize room event");
                        continue;
                    }
                };
                let _ = bytes_tx.send(Utf8Bytes::from(txt));
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "room serializer lagged; skipping ahead");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("room events channel closed; serializer exiting");
                break;
            }
        }
    }
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomQuery>,
) -> impl IntoResponse {
    if let Some(room_id) = query.room_id.as_deref() {
        if !state.directory.room_exists(room_id).await {
            // Keep not-found responses consistent with the JSON error schema.
            return ErrorResponse::respond(StatusCode::NOT_FOUND, "room not found");
        }
    }

    let directory = state.directory.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, directory, query.room_id))
}

async fn handle_socket(socket: WebSocket, directory: Arc<SessionDirectory>, room_id: Option<String>) {
    // Separate connection id for correlating logs; the participant id is fresh per socket.
    let conn_id = rand_id();
    let player_id = rand_id();
    let span = info_span!(
        "conn",
        conn_id,
        player_id,
        room_id = tracing::field::Empty
    );
    serve_connection(socket, directory, player_id, room_id, span.clone())
        .instrument(span)
        .await;
}

async fn serve_connection(
    mut socket: WebSocket,
    directory: Arc<SessionDirectory>,
    player_id: u64,
    room_id: Option<String>,
    span: tracing::Span,
) {
    let ticket = match directory.join(player_id, room_id.as_deref()).await {
        Ok(ticket) => ticket,
        Err(e @ JoinError::GameInProgress) => {
            info!("join rejected; game in progress");
            let _ = send_message(&mut socket, &ServerMessage::GameInProgress).await;
            let _ = send_close_with_reason(&mut socket, close_code::NORMAL, e.to_string()).await;
            return;
        }
        Err(e) => {
            warn!(error = %e, "join rejected");
            let _ = send_close_with_reason(&mut socket, close_code::POLICY, e.to_string()).await;
            return;
        }
    };
    span.record("room_id", tracing::field::display(&ticket.room.room_id));

    let mut ctx = match bootstrap_connection(&mut socket, ticket, directory.clone()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            // Release the seat taken by the join above.
            directory.leave(player_id).await;
            let _ = socket.close().await;
            return;
        }
    };

    info!("client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    // Serialize message safely; log JSON errors instead of panicking
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: u64,
    // Room handle for inputs and start requests.
    pub room: RoomHandle,
    // Directory access for seat release on disconnect.
    pub directory: Arc<SessionDirectory>,
    pub bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub status_rx: watch::Receiver<RoomStatus>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_room_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    mut ticket: JoinTicket,
    directory: Arc<SessionDirectory>,
) -> Result<ConnCtx, NetError> {
    // A freshly created room needs its serializer before anyone reads bytes.
    if let Some(events_rx) = ticket.serializer_rx.take() {
        tokio::spawn(room_event_serializer(
            events_rx,
            ticket.room.bytes_tx.clone(),
        ));
    }

    // Tell the client "This is who you are" before any room traffic.
    let joined = ServerMessage::joined(
        ticket.player_id,
        ticket.is_host,
        &ticket.player_ids,
        ticket.host_id,
    );
    let bytes_out = send_message(socket, &joined).await?;

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id: ticket.player_id,
        room: ticket.room,
        directory,
        bytes_rx: ticket.bytes_rx,
        status_rx: ticket.status_rx,
        msgs_in: 0,
        msgs_out: 1,
        bytes_in: 0,
        bytes_out: bytes_out as u64,
        invalid_json: 0,
        last_input_full_log: now,
        last_room_lag_log: now,
        last_invalid_input_log: now,
        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: impl Into<Utf8Bytes>,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn room_closed_frame() -> CloseFrame {
    CloseFrame {
        code: close_code::AWAY,
        reason: "room closed".into(),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        room,
        directory,
        bytes_rx,
        status_rx,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_input_full_log,
        last_room_lag_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    socket,
                    incoming,
                    player_id,
                    room,
                    msgs_in,
                    bytes_in,
                    msgs_out,
                    bytes_out,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing room traffic, already serialized.
            room_msg = bytes_rx.recv() => {
                match room_msg {
                    Ok(bytes) => match forward_room_bytes(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_room_lag_log) {
                            warn!(missed = n, "room updates lagged; dropping missed deltas");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::RoomEventsClosed);
                        true
                    }
                }
            }

            // Room lifecycle; only closure matters here, phases arrive as events.
            changed = status_rx.changed() => {
                let closed = changed.is_err() || *status_rx.borrow_and_update() == RoomStatus::Closed;
                if closed {
                    info!(player_id, "room closed; disconnecting");
                    *close_frame = Some(room_closed_frame());
                }
                closed
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    disconnect_cleanup(
        player_id,
        directory,
        *msgs_in,
        *msgs_out,
        *bytes_in,
        *bytes_out,
        *invalid_json,
    )
    .await;

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    player_id: u64,
    room: &RoomHandle,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::PlayerInput(command)) => {
                        match room.try_send_input(player_id, command.into()) {
                            Ok(()) => Ok(LoopControl::Continue),
                            Err(mpsc::error::TrySendError::Full(_cmd)) => {
                                if should_log(last_input_full_log) {
                                    warn!(player_id, "input channel full; dropping input");
                                }
                                Ok(LoopControl::Continue)
                            }
                            Err(mpsc::error::TrySendError::Closed(_cmd)) => {
                                *close_frame = Some(room_closed_frame());
                                Ok(LoopControl::Disconnect)
                            }
                        }
                    }
                    Ok(ClientMessage::StartGame) => {
                        // Non-host requests are dropped by the room itself.
                        if !room.send(RoomCommand::StartGame { player_id }).await {
                            *close_frame = Some(room_closed_frame());
                            return Ok(LoopControl::Disconnect);
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Ping) => match send_message(socket, &ServerMessage::Pong).await {
                        Ok(bytes) => {
                            *msgs_out += 1;
                            *bytes_out += bytes as u64;
                            Ok(LoopControl::Continue)
                        }
                        Err(err) => {
                            warn!(error = ?err, "failed to send pong");
                            Ok(LoopControl::Disconnect)
                        }
                    },
                    Err(parse_err) => {
                        // Unknown tokens are absorbed; the session stays up.
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_room_bytes(
    room_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = room_msg.len();
    match socket
        .send(Message::Text(room_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send room update");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(
    player_id: u64,
    directory: &SessionDirectory,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
) {
    // Already gone when an idle sweep evicted this seat first.
    let outcome = directory.leave(player_id).await;
    debug!(
        player_id,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        "connection stats"
    );
    info!(player_id, outcome = ?outcome, "client disconnected");
}
