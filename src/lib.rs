//! Office Stretch - A break-reminder timer service
//!
//! This library provides the break timer state machine (countdown, pause,
//! snooze, recovery after restarts, de-duplicated break notifications and
//! quota-gated starts) and a small HTTP API that lets a browser UI drive it.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{StateError, StoreError, TimerError};
pub use state::AppState;
pub use timer::{BreakTimer, Collaborators};
pub use utils::signals::shutdown_signal;
