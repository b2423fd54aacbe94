//! Break-reminder countdown state machine
//!
//! ```text
//!            start()                 tick() reaches 0
//!   Idle ─────────────► Running ───────────────────────► Idle + break dispatch
//!    ▲  ◄── reset() ──   │  ▲
//!    │                   │  │ start()
//!    │          pause()  ▼  │
//!    │                 Paused
//!    │
//!    │   snooze(m) from any phase          tick() reaches 0
//!    │  ─────────────────────► Snoozing ───────────────────► Idle + break dispatch
//!    └──── cancel_snooze() + break sink ◄──┘
//! ```
//!
//! Pause and reset are rejected while snoozing. `SnoozePaused` only comes
//! back from a recovered snapshot of a paused snooze; `start()` resumes it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Utc};
use tracing::{debug, error, info, warn};

use super::dispatch::{BreakDispatcher, DispatchOutcome};
use crate::{
    error::{TimerError, TimerResult},
    services::{
        load_json, save_json, BreakSink, Clock, Notifier, Permission, Persistence, UsageAction,
        UsageLimiter,
    },
    state::{
        RecoveryDecision, RecoverySnapshot, SettingsPatch, TimerPhase, TimerRuntimeState,
        TimerSettings, TimerStatus, MAX_INTERVAL_MINUTES, SETTINGS_KEY, SNAPSHOT_KEY,
    },
    utils::format_time,
};

/// The snapshot is rewritten whenever the remaining time hits a multiple of this
pub const SNAPSHOT_EVERY_SECS: u32 = 10;

/// Wall-clock gap between ticks treated as the host having slept
pub const WAKE_GAP_MS: i64 = 3_000;

pub const MAX_SNOOZE_MINUTES: u32 = MAX_INTERVAL_MINUTES;

/// Everything the timer talks to
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub store: Arc<dyn Persistence>,
    pub notifier: Arc<dyn Notifier>,
    /// Absent means every action is allowed
    pub limiter: Option<Arc<dyn UsageLimiter>>,
    pub sink: Arc<dyn BreakSink>,
}

impl Collaborators {
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn Persistence>,
        notifier: Arc<dyn Notifier>,
        sink: Arc<dyn BreakSink>,
    ) -> Self {
        Self {
            clock,
            store,
            notifier,
            limiter: None,
            sink,
        }
    }

    pub fn with_limiter(mut self, limiter: Arc<dyn UsageLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Fresh countdown of the full interval
    Started,
    /// Continued from a paused remaining time
    Resumed,
    /// Was already counting; nothing changed
    AlreadyActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Inactive,
    Counting(u32),
    Expired(DispatchOutcome),
}

/// Owned break timer. One per session, shared by handle with the UI layer.
pub struct BreakTimer {
    settings: TimerSettings,
    runtime: TimerRuntimeState,
    /// Remaining time captured by pause, consumed by the next start
    paused_remaining: Option<u32>,
    /// Write a snapshot on the first tick after a start or resume
    snapshot_pending: bool,
    last_tick_at: Option<DateTime<Utc>>,
    dispatcher: BreakDispatcher,
    user_id: String,
    deps: Collaborators,
}

impl BreakTimer {
    /// Build a timer with persisted settings (or `defaults`) and an idle countdown
    pub fn new(deps: Collaborators, user_id: impl Into<String>, defaults: TimerSettings) -> Self {
        let settings = load_settings(deps.store.as_ref(), defaults);
        let runtime = TimerRuntimeState::idle(settings.interval_seconds());

        Self {
            settings,
            runtime,
            paused_remaining: None,
            snapshot_pending: false,
            last_tick_at: None,
            dispatcher: BreakDispatcher::new(),
            user_id: user_id.into(),
            deps,
        }
    }

    /// Build a timer the way a freshly started process does: load settings,
    /// consume any recovery snapshot, and ask for notification rights if wanted
    pub fn restore(deps: Collaborators, user_id: impl Into<String>, defaults: TimerSettings) -> Self {
        let mut timer = Self::new(deps, user_id, defaults);
        timer.recover();
        if timer.settings.notifications_enabled {
            timer.request_notification_permission();
        }
        timer
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn runtime(&self) -> &TimerRuntimeState {
        &self.runtime
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn phase(&self) -> TimerPhase {
        match (self.runtime.is_snoozing, self.runtime.is_active) {
            (true, true) => TimerPhase::Snoozing,
            (true, false) => TimerPhase::SnoozePaused,
            (false, true) => TimerPhase::Running,
            (false, false) if self.paused_remaining.is_some() => TimerPhase::Paused,
            (false, false) => TimerPhase::Idle,
        }
    }

    pub fn progress(&self) -> f64 {
        self.runtime.progress(self.settings.interval_seconds())
    }

    pub fn status(&self) -> TimerStatus {
        let now = self.deps.clock.now();
        let phase = self.phase();
        let permission = self.deps.notifier.permission();
        let next_break_time = if self.runtime.is_active {
            Some(now + Duration::seconds(i64::from(self.runtime.time_remaining)))
        } else {
            None
        };

        TimerStatus {
            phase,
            label: phase.label(),
            time_remaining: self.runtime.time_remaining,
            formatted_remaining: format_time(self.runtime.time_remaining),
            is_active: self.runtime.is_active,
            is_snoozing: self.runtime.is_snoozing,
            snooze_start_time: self.runtime.snooze_start_time,
            snooze_duration_seconds: self.runtime.snooze_duration_seconds,
            progress: self.progress(),
            next_break_time,
            within_schedule: self
                .settings
                .is_within_schedule(&now.with_timezone(&Local)),
            notification_permission: permission,
            notifications_degraded: self.settings.notifications_enabled
                && permission == Permission::Denied,
            settings: self.settings.clone(),
        }
    }

    /// Start a fresh countdown or resume a paused one.
    ///
    /// Gated by the usage limiter; a denial leaves the state untouched.
    pub fn start(&mut self) -> TimerResult<StartOutcome> {
        if self.runtime.is_active {
            debug!("Start requested while already counting");
            return Ok(StartOutcome::AlreadyActive);
        }
        self.check_quota()?;

        let outcome = match self.paused_remaining.take() {
            Some(remaining) => {
                self.runtime.time_remaining = remaining;
                self.runtime.is_active = true;
                info!("Resuming break timer with {}s left", remaining);
                StartOutcome::Resumed
            }
            None => {
                self.runtime = TimerRuntimeState::running(self.settings.interval_seconds());
                self.report_usage(UsageAction::TimerStart);
                info!(
                    "Starting break timer for {} minutes",
                    self.settings.interval_minutes
                );
                StartOutcome::Started
            }
        };

        self.snapshot_pending = true;
        self.last_tick_at = Some(self.deps.clock.now());
        Ok(outcome)
    }

    /// Suspend the countdown, keeping the remaining time for the next start
    pub fn pause(&mut self) -> TimerResult<()> {
        if self.runtime.is_snoozing {
            return Err(TimerError::SnoozeInProgress);
        }
        if !self.runtime.is_active {
            return Ok(());
        }

        self.paused_remaining = Some(self.runtime.time_remaining);
        self.runtime.is_active = false;
        self.snapshot_pending = false;
        self.last_tick_at = None;
        self.save_snapshot();
        info!("Paused break timer with {}s left", self.runtime.time_remaining);
        Ok(())
    }

    /// Back to a full, stopped interval
    pub fn reset(&mut self) -> TimerResult<()> {
        if self.runtime.is_snoozing {
            return Err(TimerError::SnoozeInProgress);
        }

        self.go_idle();
        self.clear_snapshot();
        info!("Reset break timer");
        Ok(())
    }

    /// Replace whatever is counting with a snooze of `minutes`
    pub fn snooze(&mut self, minutes: u32) -> TimerResult<()> {
        if !(1..=MAX_SNOOZE_MINUTES).contains(&minutes) {
            return Err(TimerError::InvalidSnooze {
                minutes,
                max: MAX_SNOOZE_MINUTES,
            });
        }

        let now = self.deps.clock.now();
        self.runtime = TimerRuntimeState::snoozing(minutes * 60, now);
        self.paused_remaining = None;
        self.snapshot_pending = false;
        self.last_tick_at = Some(now);
        self.save_snapshot();
        info!("Snoozing break for {} minutes", minutes);
        Ok(())
    }

    /// End the snooze now; the snoozed break is due immediately
    pub fn cancel_snooze(&mut self) -> TimerResult<()> {
        if !self.runtime.is_snoozing {
            return Err(TimerError::NotSnoozing);
        }

        self.go_idle();
        self.clear_snapshot();
        info!("Snooze cancelled, break is due");
        self.deps.sink.break_due();
        Ok(())
    }

    /// Advance the countdown by one second, or by the whole wall-clock gap
    /// when the previous tick is more than [`WAKE_GAP_MS`] behind
    pub fn tick(&mut self) -> TickOutcome {
        if !self.runtime.is_active {
            return TickOutcome::Inactive;
        }

        let now = self.deps.clock.now();
        let step = match self.missed_seconds(now) {
            Some(missed) => {
                info!("Detected {}s gap in countdown, catching up", missed);
                missed
            }
            None => 1,
        };
        self.advance(now, step)
    }

    /// Catch up on seconds the tick source missed while the host slept.
    ///
    /// Returns `None` when no gap was found.
    pub fn resync_after_wake(&mut self) -> Option<TickOutcome> {
        if !self.runtime.is_active {
            return None;
        }

        let now = self.deps.clock.now();
        if self.last_tick_at.is_none() {
            self.last_tick_at = Some(now);
            return None;
        }

        let missed = self.missed_seconds(now)?;
        info!("Detected {}s gap in countdown after wake-up, catching up", missed);
        Some(self.advance(now, missed))
    }

    /// Request a break right now, outside the countdown
    pub fn manual_break(&mut self) -> TimerResult<DispatchOutcome> {
        if self.runtime.is_snoozing {
            return Err(TimerError::SnoozeInProgress);
        }
        self.check_quota()?;
        self.report_usage(UsageAction::ManualBreak);

        info!("Manual break requested");
        let now = self.deps.clock.now();
        Ok(self.dispatch_break(now))
    }

    /// Consume the recovery snapshot left by a previous run.
    ///
    /// Unreadable snapshots are dropped. The snapshot is deleted whatever the
    /// decision was.
    pub fn recover(&mut self) -> Option<RecoveryDecision> {
        let snapshot = match load_json::<RecoverySnapshot>(self.deps.store.as_ref(), SNAPSHOT_KEY) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                warn!("Discarding unreadable timer snapshot: {}", e);
                self.clear_snapshot();
                return None;
            }
        };

        let now = self.deps.clock.now();
        let decision = snapshot.decide(now, self.settings.interval_seconds());
        self.clear_snapshot();

        match &decision {
            RecoveryDecision::Resume(runtime) => {
                info!(
                    "Recovered running timer with {}s left (snoozing: {})",
                    runtime.time_remaining, runtime.is_snoozing
                );
                self.runtime = runtime.clone();
                self.paused_remaining = None;
                self.snapshot_pending = true;
                self.last_tick_at = Some(now);
            }
            RecoveryDecision::RestorePaused(runtime) => {
                info!("Recovered paused timer with {}s left", runtime.time_remaining);
                self.runtime = runtime.clone();
                self.paused_remaining = Some(runtime.time_remaining);
            }
            RecoveryDecision::ExpiredWhileAway { fire: true } => {
                info!("Timer expired while away, break is due");
                self.go_idle();
                self.dispatch_break(now);
            }
            RecoveryDecision::ExpiredWhileAway { fire: false } => {
                info!("Timer expired moments ago, skipping duplicate break");
                self.go_idle();
            }
            RecoveryDecision::Discard => {
                debug!("Nothing to recover from snapshot");
            }
        }

        Some(decision)
    }

    /// Merge a settings edit, persist it, and keep the countdown consistent
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> TimerResult<&TimerSettings> {
        let next = self.settings.apply(patch)?;
        let interval_changed = next.interval_minutes != self.settings.interval_minutes;
        let notifications_turned_on =
            next.notifications_enabled && !self.settings.notifications_enabled;
        self.settings = next;

        if let Err(e) = save_json(self.deps.store.as_ref(), SETTINGS_KEY, &self.settings) {
            error!("Failed to persist timer settings: {}", e);
        }

        if interval_changed && !self.runtime.is_snoozing {
            let interval = self.settings.interval_seconds();
            if self.phase() == TimerPhase::Idle {
                self.runtime.time_remaining = interval;
            } else {
                self.runtime.time_remaining = self.runtime.time_remaining.min(interval);
                self.paused_remaining = self.paused_remaining.map(|p| p.min(interval));
            }
        }

        if notifications_turned_on {
            self.request_notification_permission();
        }

        info!("Updated timer settings: {:?}", self.settings);
        Ok(&self.settings)
    }

    pub fn request_notification_permission(&self) -> Permission {
        self.deps.notifier.request_permission()
    }

    /// Whole seconds since the last tick, when that gap is longer than [`WAKE_GAP_MS`]
    fn missed_seconds(&self, now: DateTime<Utc>) -> Option<u32> {
        let gap_ms = (now - self.last_tick_at?).num_milliseconds();
        (gap_ms > WAKE_GAP_MS).then(|| u32::try_from(gap_ms / 1000).unwrap_or(u32::MAX))
    }

    fn advance(&mut self, now: DateTime<Utc>, seconds: u32) -> TickOutcome {
        self.last_tick_at = Some(now);
        self.runtime.time_remaining = self.runtime.time_remaining.saturating_sub(seconds);
        let remaining = self.runtime.time_remaining;

        if remaining == 0 {
            return TickOutcome::Expired(self.expire(now));
        }

        if self.snapshot_pending || seconds > 1 || remaining % SNAPSHOT_EVERY_SECS == 0 {
            self.snapshot_pending = false;
            self.save_snapshot();
        }
        TickOutcome::Counting(remaining)
    }

    fn go_idle(&mut self) {
        self.runtime = TimerRuntimeState::idle(self.settings.interval_seconds());
        self.paused_remaining = None;
        self.snapshot_pending = false;
        self.last_tick_at = None;
    }

    fn expire(&mut self, now: DateTime<Utc>) -> DispatchOutcome {
        // Snapshot goes first so a restart right now cannot raise this break again.
        self.clear_snapshot();
        self.go_idle();
        info!("Break timer expired");
        self.dispatch_break(now)
    }

    fn dispatch_break(&mut self, now: DateTime<Utc>) -> DispatchOutcome {
        self.dispatcher.dispatch(
            now,
            self.settings.notifications_enabled,
            self.deps.notifier.as_ref(),
            self.deps.sink.as_ref(),
        )
    }

    fn check_quota(&self) -> TimerResult<()> {
        let Some(limiter) = &self.deps.limiter else {
            return Ok(());
        };
        let decision = limiter.check_allowed(&self.user_id);
        if decision.allowed {
            Ok(())
        } else {
            let reason = decision
                .reason
                .unwrap_or_else(|| "Usage limit reached".to_string());
            warn!("Usage denied for {}: {}", self.user_id, reason);
            Err(TimerError::QuotaDenied { reason })
        }
    }

    fn report_usage(&self, action: UsageAction) {
        if let Some(limiter) = &self.deps.limiter {
            limiter.report_usage(&self.user_id, action);
        }
    }

    fn save_snapshot(&self) {
        let snapshot = RecoverySnapshot::capture(
            &self.runtime,
            self.settings.interval_minutes,
            self.deps.clock.now(),
        );
        match save_json(self.deps.store.as_ref(), SNAPSHOT_KEY, &snapshot) {
            Ok(()) => debug!("Saved timer snapshot at {}s", snapshot.time_remaining),
            Err(e) => error!("Failed to save timer snapshot: {}", e),
        }
    }

    fn clear_snapshot(&self) {
        if let Err(e) = self.deps.store.delete(SNAPSHOT_KEY) {
            error!("Failed to delete timer snapshot: {}", e);
        }
    }
}

/// Persisted settings if valid, otherwise `defaults` (written back on first run)
fn load_settings(store: &dyn Persistence, defaults: TimerSettings) -> TimerSettings {
    match load_json::<TimerSettings>(store, SETTINGS_KEY) {
        Ok(Some(settings)) => match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                warn!("Ignoring stored settings: {}", e);
                defaults
            }
        },
        Ok(None) => {
            if let Err(e) = save_json(store, SETTINGS_KEY, &defaults) {
                error!("Failed to persist default settings: {}", e);
            }
            defaults
        }
        Err(e) => {
            warn!("Ignoring unreadable settings: {}", e);
            defaults
        }
    }
}
