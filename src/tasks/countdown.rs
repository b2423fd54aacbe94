//! Countdown tick background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::{state::AppState, timer::TickOutcome};

/// One tick per second of countdown
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Background task that drives the break timer once per second
pub async fn countdown_task(state: Arc<AppState>) {
    info!("Starting countdown task");

    let mut ticker = interval(TICK_PERIOD);
    // Seconds lost to a stalled runtime are reconciled by the wake-up task
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match state.drive(|timer| timer.tick()) {
            Ok((TickOutcome::Expired(outcome), _)) => {
                info!("Countdown finished ({:?})", outcome);
            }
            Ok((TickOutcome::Counting(remaining), _)) => {
                debug!("{}s until next break", remaining);
            }
            Ok((TickOutcome::Inactive, _)) => {}
            Err(e) => error!("Failed to advance break timer: {}", e),
        }
    }
}
