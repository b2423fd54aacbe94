//! Break timer core
//!
//! The state machine owning the countdown, together with the dispatch path
//! that turns an expired countdown into a single break notification.

pub mod break_timer;
pub mod dispatch;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use break_timer::{BreakTimer, Collaborators, StartOutcome, TickOutcome};
pub use dispatch::{BreakDispatcher, DispatchOutcome};
