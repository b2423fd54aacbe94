//! Break-decision sinks

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::Clock;

/// Callback invoked whenever a break is due, whichever path decided it.
///
/// Activity selection happens entirely on the receiving side.
pub trait BreakSink: Send + Sync {
    fn break_due(&self);
}

impl<F> BreakSink for F
where
    F: Fn() + Send + Sync,
{
    fn break_due(&self) {
        self()
    }
}

/// Event published to subscribers when a break is due
#[derive(Debug, Clone, Serialize)]
pub struct BreakEvent {
    pub due_at: DateTime<Utc>,
}

/// Sink that fans break events out to every connected subscriber.
pub struct BroadcastSink {
    tx: broadcast::Sender<BreakEvent>,
    clock: Arc<dyn Clock>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<BreakEvent>, clock: Arc<dyn Clock>) -> Self {
        Self { tx, clock }
    }
}

impl BreakSink for BroadcastSink {
    fn break_due(&self) {
        let event = BreakEvent {
            due_at: self.clock.now(),
        };
        // No subscribers is normal while no client is connected.
        if let Err(e) = self.tx.send(event) {
            debug!("Break event had no subscribers: {}", e);
        }
    }
}
