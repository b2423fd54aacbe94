//! User-configurable break schedule

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// Storage key of the settings record
pub const SETTINGS_KEY: &str = "wellness-timer-settings";

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 120;

/// Break schedule, persisted on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    /// Minutes between breaks (1-120)
    pub interval_minutes: u32,
    /// Index 0 is Monday
    pub active_days: [bool; 7],
    pub start_hour: u32,
    pub end_hour: u32,
    pub notifications_enabled: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            interval_minutes: 45,
            active_days: [true, true, true, true, true, false, false],
            start_hour: 9,
            end_hour: 17,
            notifications_enabled: true,
        }
    }
}

/// Partial settings edit; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub interval_minutes: Option<u32>,
    pub active_days: Option<[bool; 7]>,
    pub start_hour: Option<u32>,
    pub end_hour: Option<u32>,
    pub notifications_enabled: Option<bool>,
}

impl TimerSettings {
    /// Default schedule with a different interval
    pub fn with_interval(interval_minutes: u32) -> Self {
        Self {
            interval_minutes,
            ..Self::default()
        }
    }

    pub fn interval_seconds(&self) -> u32 {
        self.interval_minutes * 60
    }

    pub fn validate(&self) -> Result<(), TimerError> {
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&self.interval_minutes) {
            return Err(TimerError::InvalidSettings(format!(
                "interval must be between {} and {} minutes, got {}",
                MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES, self.interval_minutes
            )));
        }
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(TimerError::InvalidSettings(format!(
                "hours must be between 0 and 23, got {}-{}",
                self.start_hour, self.end_hour
            )));
        }
        if self.start_hour >= self.end_hour {
            return Err(TimerError::InvalidSettings(format!(
                "start hour {} must be before end hour {}",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    /// Merge `patch` into a copy of these settings and validate the result
    pub fn apply(&self, patch: &SettingsPatch) -> Result<Self, TimerError> {
        let merged = Self {
            interval_minutes: patch.interval_minutes.unwrap_or(self.interval_minutes),
            active_days: patch.active_days.unwrap_or(self.active_days),
            start_hour: patch.start_hour.unwrap_or(self.start_hour),
            end_hour: patch.end_hour.unwrap_or(self.end_hour),
            notifications_enabled: patch
                .notifications_enabled
                .unwrap_or(self.notifications_enabled),
        };
        merged.validate()?;
        Ok(merged)
    }

    /// Whether `now` falls on an active day inside the active-hour window
    pub fn is_within_schedule<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        let day = now.weekday().num_days_from_monday() as usize;
        let hour = now.hour();
        self.active_days[day] && hour >= self.start_hour && hour < self.end_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn defaults_are_weekdays_nine_to_five() {
        let settings = TimerSettings::default();
        assert_eq!(settings.interval_seconds(), 45 * 60);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn patch_merges_and_validates() {
        let settings = TimerSettings::default();
        let patch = SettingsPatch {
            interval_minutes: Some(30),
            ..SettingsPatch::default()
        };
        let updated = settings.apply(&patch).unwrap();
        assert_eq!(updated.interval_minutes, 30);
        assert_eq!(updated.start_hour, 9);

        let bad = SettingsPatch {
            interval_minutes: Some(121),
            ..SettingsPatch::default()
        };
        assert!(matches!(
            settings.apply(&bad),
            Err(TimerError::InvalidSettings(_))
        ));
    }

    #[test]
    fn rejects_inverted_hours() {
        let patch = SettingsPatch {
            start_hour: Some(18),
            ..SettingsPatch::default()
        };
        assert!(TimerSettings::default().apply(&patch).is_err());
    }

    #[test]
    fn schedule_maps_sunday_to_last_index() {
        let settings = TimerSettings::default();
        // 2026-10-12 is a Monday, 2026-10-18 a Sunday
        let monday_morning = Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap();
        let monday_evening = Utc.with_ymd_and_hms(2026, 10, 12, 17, 0, 0).unwrap();
        let sunday_morning = Utc.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap();
        assert!(settings.is_within_schedule(&monday_morning));
        assert!(!settings.is_within_schedule(&monday_evening));
        assert!(!settings.is_within_schedule(&sunday_morning));
    }

    #[test]
    fn uses_camel_case_keys() {
        let json = serde_json::to_value(TimerSettings::default()).unwrap();
        assert_eq!(json["intervalMinutes"], 45);
        assert_eq!(json["activeDays"][5], false);
    }
}
