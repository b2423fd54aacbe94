//! Break dispatch with duplicate suppression

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::services::{BreakSink, Notifier, Permission};

/// Dispatches closer together than this collapse into one
pub const DEDUP_WINDOW_MS: i64 = 3_000;

pub const BREAK_TITLE: &str = "Time for a Break!";
pub const BREAK_BODY: &str = "Your break reminder is ready. Choose your activity!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The sink ran; `notified` tells whether an OS alert went out too
    Delivered { notified: bool },
    /// Dropped as a duplicate of a dispatch moments earlier
    Suppressed,
}

/// Routes a due break to the sink and the notifier.
///
/// The expiry tick, the startup recovery and the wake-up resync can all
/// decide a break is due within the same moment. Only the first of those
/// inside [`DEDUP_WINDOW_MS`] gets through.
#[derive(Debug, Default)]
pub struct BreakDispatcher {
    last_fired: Option<DateTime<Utc>>,
}

impl BreakDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a dispatch at `now` would get through
    pub fn should_fire(&self, now: DateTime<Utc>) -> bool {
        match self.last_fired {
            Some(last) => {
                let since = (now - last).num_milliseconds();
                !(0..DEDUP_WINDOW_MS).contains(&since)
            }
            None => true,
        }
    }

    pub fn dispatch(
        &mut self,
        now: DateTime<Utc>,
        notifications_enabled: bool,
        notifier: &dyn Notifier,
        sink: &dyn BreakSink,
    ) -> DispatchOutcome {
        if !self.should_fire(now) {
            info!("Suppressing duplicate break dispatch");
            return DispatchOutcome::Suppressed;
        }
        self.last_fired = Some(now);
        info!("Break is due");

        // The in-app decision always comes first; the OS alert is best effort.
        sink.break_due();

        if !notifications_enabled {
            return DispatchOutcome::Delivered { notified: false };
        }

        let permission = match notifier.permission() {
            Permission::Default => notifier.request_permission(),
            decided => decided,
        };

        if permission == Permission::Granted {
            notifier.dispatch(BREAK_TITLE, BREAK_BODY);
            DispatchOutcome::Delivered { notified: true }
        } else {
            warn!("Notification permission is {:?}, break alert only shown in app", permission);
            DispatchOutcome::Delivered { notified: false }
        }
    }
}
