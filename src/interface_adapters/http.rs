// Shared HTTP response types for consistent API error payloads.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable error string, e.g. "room not found".
    pub error: String,
}

impl ErrorResponse {
    pub fn respond(status: StatusCode, error: &str) -> Response {
        (
            status,
            Json(Self {
                error: error.to_string(),
            }),
        )
            .into_response()
    }
}
