//! Permission-gated break notifications

use std::sync::{Arc, Mutex};

use notify_rust::{Notification, Timeout};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Notifications are dismissed by the host after this long if left alone
pub const NOTIFICATION_TIMEOUT_MS: u32 = 30_000;

/// Outcome of asking the host for notification rights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not asked yet
    Default,
    Granted,
    /// Refused or dismissed; never re-asked automatically
    Denied,
}

/// Dispatches OS-level break alerts.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// One-shot permission request. A decided permission is returned as is.
    fn request_permission(&self) -> Permission;

    /// Fire-and-forget alert; a no-op unless permission is granted
    fn dispatch(&self, title: &str, body: &str);
}

/// Settles a pending permission once and reports the stored decision after.
fn settle(slot: &Mutex<Permission>, grant: bool) -> Permission {
    let mut permission = slot.lock().unwrap_or_else(|e| e.into_inner());
    if *permission == Permission::Default {
        *permission = if grant {
            Permission::Granted
        } else {
            Permission::Denied
        };
    }
    *permission
}

/// Marks notifications as refused after the host failed to deliver one.
fn revoke(slot: &Mutex<Permission>) {
    let mut permission = slot.lock().unwrap_or_else(|e| e.into_inner());
    if *permission != Permission::Denied {
        warn!("Desktop notifications unavailable, breaks will only reach the app");
        *permission = Permission::Denied;
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn notification_server_reachable() -> bool {
    match notify_rust::get_server_information() {
        Ok(info) => {
            debug!("Notification server: {} {} ({})", info.name, info.version, info.vendor);
            true
        }
        Err(e) => {
            warn!("No notification server reachable: {}", e);
            false
        }
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn notification_server_reachable() -> bool {
    true
}

/// Desktop notifications through the platform notification service.
///
/// Permission is granted only when the host lets us and a notification
/// server answers. A failed delivery later on revokes it.
#[derive(Debug)]
pub struct DesktopNotifier {
    appname: String,
    allowed: bool,
    permission: Arc<Mutex<Permission>>,
    server_check: fn() -> bool,
}

impl DesktopNotifier {
    /// `allowed = false` makes every permission request resolve to denied
    pub fn new(appname: impl Into<String>, allowed: bool) -> Self {
        Self {
            appname: appname.into(),
            allowed,
            permission: Arc::new(Mutex::new(Permission::Default)),
            server_check: notification_server_reachable,
        }
    }

    #[cfg(test)]
    fn with_server_check(mut self, check: fn() -> bool) -> Self {
        self.server_check = check;
        self
    }
}

impl Notifier for DesktopNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn request_permission(&self) -> Permission {
        let permission = match self.permission() {
            Permission::Default => {
                settle(&self.permission, self.allowed && (self.server_check)())
            }
            decided => decided,
        };
        match permission {
            Permission::Granted => info!("Desktop notification permission granted"),
            Permission::Denied => warn!("Desktop notifications blocked, breaks will only reach the app"),
            Permission::Default => {}
        }
        permission
    }

    fn dispatch(&self, title: &str, body: &str) {
        if self.permission() != Permission::Granted {
            debug!("Skipping desktop notification, permission not granted");
            return;
        }

        let mut notification = Notification::new();
        notification
            .appname(&self.appname)
            .summary(title)
            .body(body)
            .timeout(Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS));

        let slot = Arc::clone(&self.permission);
        let show = move || match notification.show() {
            Ok(_) => info!("Desktop notification sent"),
            Err(e) => {
                warn!("Failed to show desktop notification: {}", e);
                revoke(&slot);
            }
        };

        // Showing blocks on the session bus; keep it off the timer's lock.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(show);
            }
            Err(_) => show(),
        }
    }
}

/// Notifier that only writes a log line, for headless hosts.
#[derive(Debug)]
pub struct LogNotifier {
    permission: Mutex<Permission>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self {
            permission: Mutex::new(Permission::Default),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn request_permission(&self) -> Permission {
        settle(&self.permission, true)
    }

    fn dispatch(&self, title: &str, body: &str) {
        if self.permission() == Permission::Granted {
            info!(title, body, "Break notification");
        }
    }
}
