use crate::interface_adapters::protocol::RoomSummaryDto;
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use std::sync::Arc;

pub async fn list_rooms_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rooms: Vec<RoomSummaryDto> = state
        .directory
        .room_summaries()
        .await
        .iter()
        .map(RoomSummaryDto::from)
        .collect();
    Json(rooms)
}
