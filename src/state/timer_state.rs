//! Countdown runtime state and its read model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TimerSettings;
use crate::services::Permission;

/// Phase of the break timer, derived from the runtime fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// Not started, full interval loaded
    Idle,
    Running,
    /// Suspended with the remaining time kept for resume
    Paused,
    /// Counting down a snooze instead of the interval
    Snoozing,
    /// Only reachable by recovering a paused snooze
    SnoozePaused,
}

impl TimerPhase {
    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            TimerPhase::Idle => "Ready",
            TimerPhase::Running => "Running",
            TimerPhase::Paused => "Paused",
            TimerPhase::Snoozing => "Snoozing...",
            TimerPhase::SnoozePaused => "Snooze Paused",
        }
    }
}

/// Transient countdown state.
///
/// Every transition replaces or edits this value while holding `&mut` on the
/// owning timer, so consumers never observe a half-applied snooze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRuntimeState {
    /// Seconds left in the current countdown
    pub time_remaining: u32,
    pub is_active: bool,
    pub is_snoozing: bool,
    /// Present only while snoozing
    pub snooze_start_time: Option<DateTime<Utc>>,
    pub snooze_duration_seconds: u32,
}

impl TimerRuntimeState {
    /// Stopped countdown with `interval_seconds` loaded
    pub fn idle(interval_seconds: u32) -> Self {
        Self {
            time_remaining: interval_seconds,
            is_active: false,
            is_snoozing: false,
            snooze_start_time: None,
            snooze_duration_seconds: 0,
        }
    }

    /// Regular countdown running from `remaining` seconds
    pub fn running(remaining: u32) -> Self {
        Self {
            is_active: true,
            ..Self::idle(remaining)
        }
    }

    /// Fresh snooze countdown of `duration_seconds`
    pub fn snoozing(duration_seconds: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            time_remaining: duration_seconds,
            is_active: true,
            is_snoozing: true,
            snooze_start_time: Some(started_at),
            snooze_duration_seconds: duration_seconds,
        }
    }

    /// Length of the countdown currently loaded
    pub fn total_seconds(&self, interval_seconds: u32) -> u32 {
        if self.is_snoozing {
            self.snooze_duration_seconds
        } else {
            interval_seconds
        }
    }

    /// Percentage of the current countdown already elapsed, in `[0, 100]`
    pub fn progress(&self, interval_seconds: u32) -> f64 {
        let total = self.total_seconds(interval_seconds);
        if total == 0 {
            return 0.0;
        }
        let elapsed = f64::from(total) - f64::from(self.time_remaining);
        (elapsed / f64::from(total) * 100.0).clamp(0.0, 100.0)
    }
}

/// Read model handed to the UI layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub phase: TimerPhase,
    pub label: &'static str,
    pub time_remaining: u32,
    pub formatted_remaining: String,
    pub is_active: bool,
    pub is_snoozing: bool,
    pub snooze_start_time: Option<DateTime<Utc>>,
    pub snooze_duration_seconds: u32,
    pub progress: f64,
    pub next_break_time: Option<DateTime<Utc>>,
    pub within_schedule: bool,
    pub notification_permission: Permission,
    /// Notifications are wanted but the host refused them
    pub notifications_degraded: bool,
    pub settings: TimerSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_uses_snooze_duration_while_snoozing() {
        let mut state = TimerRuntimeState::snoozing(300, Utc::now());
        state.time_remaining = 150;
        assert_eq!(state.progress(2700), 50.0);
    }

    #[test]
    fn progress_is_clamped() {
        let mut state = TimerRuntimeState::running(2700);
        assert_eq!(state.progress(2700), 0.0);

        // Interval shrunk below what was loaded
        state.time_remaining = 5000;
        assert_eq!(state.progress(2700), 0.0);

        state.time_remaining = 0;
        assert_eq!(state.progress(2700), 100.0);

        let corrupt = TimerRuntimeState {
            is_snoozing: true,
            snooze_duration_seconds: 0,
            ..TimerRuntimeState::running(10)
        };
        assert_eq!(corrupt.progress(2700), 0.0);
    }
}
