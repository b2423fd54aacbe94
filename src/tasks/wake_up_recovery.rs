//! Wake-up recovery background task

use std::{sync::Arc, time::Duration};
use tokio::time::interval;
use tracing::{info, warn};

use crate::{state::AppState, timer::TickOutcome};

/// How often the countdown is checked against the wall clock
pub const WAKE_CHECK_PERIOD: Duration = Duration::from_secs(5);

/// Background task that notices host sleep and catches the countdown up.
///
/// The first tick after a wake-up already applies the wall-clock gap. This
/// covers the countdown task itself being stalled for longer than that.
pub async fn wake_up_recovery_task(state: Arc<AppState>) {
    info!("Starting wake-up recovery task");

    let mut ticker = interval(WAKE_CHECK_PERIOD);

    loop {
        ticker.tick().await;

        match state.drive(|timer| timer.resync_after_wake()) {
            Ok((Some(TickOutcome::Expired(outcome)), _)) => {
                info!("Countdown ran out while asleep ({:?})", outcome);
            }
            Ok((Some(TickOutcome::Counting(remaining)), _)) => {
                info!("Countdown caught up after wake-up, {}s left", remaining);
            }
            Ok((Some(TickOutcome::Inactive), _)) | Ok((None, _)) => {}
            Err(e) => warn!("Failed to resync timer after wake-up: {}", e),
        }
    }
}
