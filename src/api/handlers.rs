//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::responses::{
    ApiResponse, HealthResponse, PermissionResponse, SnoozeRequest, StatusResponse,
};
use crate::{
    error::StateError,
    services::Permission,
    state::{AppState, SettingsPatch, TimerSettings},
    timer::{DispatchOutcome, StartOutcome},
};

type ApiResult<T> = Result<Json<T>, StateError>;

/// Handle POST /timer/start - Start or resume the countdown
pub async fn start_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let (outcome, timer) = state.apply("start", |timer| timer.start())?;
    let message = match outcome {
        StartOutcome::Started => "Break timer started",
        StartOutcome::Resumed => "Break timer resumed",
        StartOutcome::AlreadyActive => "Break timer already running",
    };
    info!("Start endpoint called - {}", message);
    Ok(Json(ApiResponse::ok(message.to_string(), timer)))
}

/// Handle POST /timer/pause - Pause the countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let (_, timer) = state.apply("pause", |timer| timer.pause())?;
    info!("Pause endpoint called - {}s left", timer.time_remaining);
    Ok(Json(ApiResponse::ok("Break timer paused".to_string(), timer)))
}

/// Handle POST /timer/reset - Reset to a full interval
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let (_, timer) = state.apply("reset", |timer| timer.reset())?;
    info!("Reset endpoint called");
    Ok(Json(ApiResponse::ok("Break timer reset".to_string(), timer)))
}

/// Handle POST /timer/snooze - Replace the countdown with a snooze
pub async fn snooze_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SnoozeRequest>,
) -> ApiResult<ApiResponse> {
    let (_, timer) = state.apply("snooze", |timer| timer.snooze(request.minutes))?;
    info!("Snooze endpoint called - {} minutes", request.minutes);
    Ok(Json(ApiResponse::ok(
        format!("Break snoozed for {} minutes", request.minutes),
        timer,
    )))
}

/// Handle POST /timer/cancel-snooze - End the snooze, the break is due now
pub async fn cancel_snooze_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let (_, timer) = state.apply("cancel-snooze", |timer| timer.cancel_snooze())?;
    info!("Cancel-snooze endpoint called - break is due");
    Ok(Json(ApiResponse::ok(
        "Snooze cancelled, time for a break".to_string(),
        timer,
    )))
}

/// Handle POST /break - Take a break right now
pub async fn manual_break_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let (outcome, timer) = state.apply("break", |timer| timer.manual_break())?;
    let message = match outcome {
        DispatchOutcome::Delivered { .. } => "Break started",
        DispatchOutcome::Suppressed => "Break already in progress",
    };
    info!("Break endpoint called - {}", message);
    Ok(Json(ApiResponse::ok(message.to_string(), timer)))
}

/// Handle GET /settings - Return the break schedule
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerSettings> {
    let status = state.get_timer_status()?;
    Ok(Json(status.settings))
}

/// Handle PUT /settings - Update part of the break schedule
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> ApiResult<ApiResponse> {
    let (_, timer) = state.apply("settings", |timer| {
        timer.update_settings(&patch).map(|_| ())
    })?;
    info!("Settings endpoint called");
    Ok(Json(ApiResponse::ok("Settings updated".to_string(), timer)))
}

/// Handle POST /notifications/permission - Ask for notification rights
pub async fn permission_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<PermissionResponse> {
    let (permission, timer) = state.apply("notifications", |timer| {
        Ok(timer.request_notification_permission())
    })?;
    if permission == Permission::Denied {
        warn!("Notification permission denied");
    }
    Ok(Json(PermissionResponse {
        permission,
        degraded: timer.notifications_degraded,
    }))
}

/// Handle GET /status - Return timer status and server metadata
pub async fn status_handler(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    let timer = state.get_timer_status()?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /events - Stream `break` events as they happen
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.break_tx.subscribe();
    info!("Break event subscriber connected");

    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let sse = Event::default()
                        .event("break")
                        .json_data(&event)
                        .unwrap_or_else(|_| Event::default().event("break"));
                    return Some((Ok::<_, Infallible>(sse), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Break event subscriber lagged by {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Handle GET /status/events - Stream the timer status, current value first
pub async fn status_events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.status_tx.subscribe();
    info!("Status subscriber connected");

    let updates = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let status = rx.borrow_and_update().clone();
        let sse = Event::default()
            .event("status")
            .json_data(&status)
            .unwrap_or_else(|_| Event::default().event("status"));
        Some((Ok::<_, Infallible>(sse), (rx, false)))
    });

    Sse::new(updates).keep_alive(KeepAlive::default())
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
