//! Recovery snapshot written while the countdown runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TimerRuntimeState;

/// Storage key of the recovery snapshot
pub const SNAPSHOT_KEY: &str = "wellness-timer-state";

/// A countdown that expired while unobserved only raises a break if the last
/// snapshot is older than this
pub const RECOVERY_GRACE_MS: i64 = 5_000;

/// Durable copy of the countdown, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySnapshot {
    pub time_remaining: u32,
    pub is_active: bool,
    pub is_snoozing: bool,
    #[serde(rename = "snoozeDuration")]
    pub snooze_duration_seconds: u32,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub snooze_start_time: Option<DateTime<Utc>>,
    #[serde(rename = "lastUpdate", with = "chrono::serde::ts_milliseconds")]
    pub last_update: DateTime<Utc>,
    pub interval_minutes: u32,
}

/// What to do with a snapshot found at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Keep counting from the adjusted state
    Resume(TimerRuntimeState),
    /// Restore a paused countdown as it was
    RestorePaused(TimerRuntimeState),
    /// Ran out while nobody was watching; `fire` is false inside the grace window
    ExpiredWhileAway { fire: bool },
    /// Nothing worth restoring
    Discard,
}

impl RecoverySnapshot {
    pub fn capture(runtime: &TimerRuntimeState, interval_minutes: u32, now: DateTime<Utc>) -> Self {
        Self {
            time_remaining: runtime.time_remaining,
            is_active: runtime.is_active,
            is_snoozing: runtime.is_snoozing,
            snooze_duration_seconds: runtime.snooze_duration_seconds,
            snooze_start_time: runtime.snooze_start_time,
            last_update: now,
            interval_minutes,
        }
    }

    /// Decide how to resume given the time now and the configured interval.
    ///
    /// Remaining time is reduced by the wall-clock time elapsed since
    /// `last_update` (never negative) and floored to whole seconds, then capped
    /// at the length of the countdown it belongs to.
    pub fn decide(&self, now: DateTime<Utc>, interval_seconds: u32) -> RecoveryDecision {
        if self.is_snoozing && self.snooze_duration_seconds == 0 {
            return RecoveryDecision::Discard;
        }

        let cap = if self.is_snoozing {
            self.snooze_duration_seconds
        } else {
            interval_seconds
        };
        let restored = |time_remaining: u32, is_active: bool| TimerRuntimeState {
            time_remaining: time_remaining.min(cap),
            is_active,
            is_snoozing: self.is_snoozing,
            snooze_start_time: if self.is_snoozing {
                self.snooze_start_time.or(Some(self.last_update))
            } else {
                None
            },
            snooze_duration_seconds: if self.is_snoozing {
                self.snooze_duration_seconds
            } else {
                0
            },
        };

        if !self.is_active {
            return if self.time_remaining > 0 {
                RecoveryDecision::RestorePaused(restored(self.time_remaining, false))
            } else {
                RecoveryDecision::Discard
            };
        }

        let elapsed_ms = (now - self.last_update).num_milliseconds().max(0);
        let remaining_ms = i64::from(self.time_remaining) * 1000 - elapsed_ms;
        let adjusted = if remaining_ms > 0 {
            u32::try_from(remaining_ms / 1000).unwrap_or(u32::MAX)
        } else {
            0
        };

        if adjusted >= 1 {
            RecoveryDecision::Resume(restored(adjusted, true))
        } else {
            RecoveryDecision::ExpiredWhileAway {
                fire: elapsed_ms > RECOVERY_GRACE_MS,
            }
        }
    }
}
