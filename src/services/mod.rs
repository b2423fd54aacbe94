//! Collaborators of the break timer
//!
//! The timer only talks to the outside world through the traits in this
//! module: a clock, a durable key-value store, a notifier, an optional usage
//! limiter and the break-decision sink.

pub mod clock;
pub mod notifier;
pub mod persistence;
pub mod sink;
pub mod usage;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use notifier::{DesktopNotifier, LogNotifier, Notifier, Permission};
pub use persistence::{load_json, save_json, FileStore, MemoryStore, Persistence};
pub use sink::{BreakEvent, BreakSink, BroadcastSink};
pub use usage::{UsageAction, UsageDecision, UsageLimiter, WeeklyUsageLimiter};
