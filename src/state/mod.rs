//! State management module
//!
//! Settings, countdown runtime state, the recovery snapshot and the shared
//! application state handed to the HTTP layer and background tasks.

pub mod app_state;
pub mod settings;
pub mod snapshot;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use settings::{
    SettingsPatch, TimerSettings, MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES, SETTINGS_KEY,
};
pub use snapshot::{RecoveryDecision, RecoverySnapshot, RECOVERY_GRACE_MS, SNAPSHOT_KEY};
pub use timer_state::{TimerPhase, TimerRuntimeState, TimerStatus};
