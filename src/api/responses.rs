//! API response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::{
    error::{StateError, TimerError},
    services::Permission,
    state::TimerStatus,
};

/// API response structure for timer transition endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerStatus,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, timer: TimerStatus) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    /// Create a successful response
    pub fn ok(message: String, timer: TimerStatus) -> Self {
        Self::new("ok".to_string(), message, timer)
    }
}

/// Body of `POST /timer/snooze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnoozeRequest {
    pub minutes: u32,
}

/// Status response with server metadata
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub timer: TimerStatus,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Result of a notification permission request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub permission: Permission,
    /// Breaks still reach the app, only the OS alert is skipped
    pub degraded: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error body for rejected requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    /// Machine-readable error kind
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: String) -> Self {
        Self {
            status: "error".to_string(),
            error: error.to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

impl IntoResponse for StateError {
    fn into_response(self) -> Response {
        let (code, kind) = match &self {
            StateError::Timer(TimerError::QuotaDenied { .. }) => {
                (StatusCode::FORBIDDEN, "quota_denied")
            }
            StateError::Timer(TimerError::SnoozeInProgress) => {
                (StatusCode::CONFLICT, "snooze_in_progress")
            }
            StateError::Timer(TimerError::NotSnoozing) => (StatusCode::CONFLICT, "not_snoozing"),
            StateError::Timer(TimerError::InvalidSnooze { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_snooze")
            }
            StateError::Timer(TimerError::InvalidSettings(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_settings")
            }
            StateError::Lock(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if code.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        (code, Json(ErrorResponse::new(kind, self.to_string()))).into_response()
    }
}
