pub mod health;
pub mod probe;

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ProbeError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Probe(ProbeError),
    Timeout(Duration),
}

impl From<ProbeError> for AppError {
    fn from(err: ProbeError) -> Self {
        Self::Probe(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Probe(ProbeError::Validation { .. }) => StatusCode::BAD_REQUEST,
            Self::Probe(ProbeError::Connection { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Probe(ProbeError::Measurement { .. } | ProbeError::Cleanup { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(msg) => msg,
            Self::Probe(err) => err.to_string(),
            Self::Timeout(after) => format!("Probe did not finish within {after:?}"),
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
