//! Shared application state around the break timer

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::warn;

use super::TimerStatus;
use crate::{
    error::{StateError, TimerResult},
    services::BreakEvent,
    timer::BreakTimer,
    utils::format_uptime,
};

/// Capacity of the break event channel
pub const BREAK_CHANNEL_CAPACITY: usize = 16;

/// Handle shared by the HTTP handlers and the background tasks.
///
/// Every access to the timer goes through its mutex, so transitions coming
/// from requests, the tick and the wake-up resync never interleave.
pub struct AppState {
    pub timer: Arc<Mutex<BreakTimer>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Break events, fed by the timer's sink
    pub break_tx: broadcast::Sender<BreakEvent>,
    /// Latest timer status after every change
    pub status_tx: watch::Sender<TimerStatus>,
    /// Keep the receiver alive to prevent channel closure
    pub _status_rx: watch::Receiver<TimerStatus>,
}

impl AppState {
    /// Wrap a timer whose sink publishes on `break_tx`
    pub fn new(
        timer: BreakTimer,
        break_tx: broadcast::Sender<BreakEvent>,
        port: u16,
        host: String,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(timer.status());

        Self {
            timer: Arc::new(Mutex::new(timer)),
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            break_tx,
            status_tx,
            _status_rx: status_rx,
        }
    }

    /// Run a user-initiated transition and record it as the last action
    pub fn apply<T, F>(&self, action: &str, transition: F) -> Result<(T, TimerStatus), StateError>
    where
        F: FnOnce(&mut BreakTimer) -> TimerResult<T>,
    {
        let (output, status) = self.drive(transition)?;
        let output = output?;

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        Ok((output, status))
    }

    /// Run `step` against the timer and publish the resulting status
    pub fn drive<T, F>(&self, step: F) -> Result<(T, TimerStatus), StateError>
    where
        F: FnOnce(&mut BreakTimer) -> T,
    {
        let mut timer = self
            .timer
            .lock()
            .map_err(|e| StateError::Lock(e.to_string()))?;

        let output = step(&mut *timer);
        let status = timer.status();
        drop(timer); // Release the lock early

        if let Err(e) = self.status_tx.send(status.clone()) {
            warn!("Failed to publish timer status: {}", e);
        }

        Ok((output, status))
    }

    /// Current timer status
    pub fn get_timer_status(&self) -> Result<TimerStatus, StateError> {
        self.timer
            .lock()
            .map(|timer| timer.status())
            .map_err(|e| StateError::Lock(e.to_string()))
    }

    /// Server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed().as_secs())
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
