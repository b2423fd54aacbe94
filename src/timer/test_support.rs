//! Recording fakes for timer tests

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use chrono::{TimeZone, Utc};

use super::{BreakTimer, Collaborators};
use crate::{
    services::{
        BreakSink, ManualClock, MemoryStore, Notifier, Permission, UsageAction, UsageDecision,
        UsageLimiter,
    },
    state::TimerSettings,
};

#[derive(Debug, Default)]
pub struct CountingSink {
    count: AtomicUsize,
}

impl CountingSink {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl BreakSink for CountingSink {
    fn break_due(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct RecordingNotifier {
    permission: Mutex<Permission>,
    grant: bool,
    requests: AtomicUsize,
    dispatched: AtomicUsize,
}

impl RecordingNotifier {
    pub fn granted() -> Self {
        Self {
            permission: Mutex::new(Permission::Granted),
            grant: true,
            requests: AtomicUsize::new(0),
            dispatched: AtomicUsize::new(0),
        }
    }

    pub fn pending(grant: bool) -> Self {
        Self {
            permission: Mutex::new(Permission::Default),
            ..Self::granted()
        }
        .with_grant(grant)
    }

    fn with_grant(mut self, grant: bool) -> Self {
        self.grant = grant;
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap()
    }

    fn request_permission(&self) -> Permission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut permission = self.permission.lock().unwrap();
        if *permission == Permission::Default {
            *permission = if self.grant {
                Permission::Granted
            } else {
                Permission::Denied
            };
        }
        *permission
    }

    fn dispatch(&self, _title: &str, _body: &str) {
        if self.permission() == Permission::Granted {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeLimiter {
    pub deny: Mutex<Option<String>>,
    pub reported: Mutex<Vec<UsageAction>>,
}

impl FakeLimiter {
    pub fn deny_with(&self, reason: &str) {
        *self.deny.lock().unwrap() = Some(reason.to_string());
    }

    pub fn reported(&self) -> Vec<UsageAction> {
        self.reported.lock().unwrap().clone()
    }
}

impl UsageLimiter for FakeLimiter {
    fn check_allowed(&self, _user_id: &str) -> UsageDecision {
        match self.deny.lock().unwrap().as_ref() {
            Some(reason) => UsageDecision::denied(reason.clone()),
            None => UsageDecision::allowed(),
        }
    }

    fn report_usage(&self, _user_id: &str, action: UsageAction) {
        self.reported.lock().unwrap().push(action);
    }
}

/// Timer wired to fakes that the test keeps handles to
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub sink: Arc<CountingSink>,
    pub limiter: Arc<FakeLimiter>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap(),
            )),
            store: Arc::new(MemoryStore::new()),
            notifier: Arc::new(RecordingNotifier::granted()),
            sink: Arc::new(CountingSink::default()),
            limiter: Arc::new(FakeLimiter::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.clock.clone(),
            self.store.clone(),
            self.notifier.clone(),
            self.sink.clone(),
        )
        .with_limiter(self.limiter.clone())
    }

    /// Timer with `interval_minutes` and no prior snapshot consumed
    pub fn timer(&self, interval_minutes: u32) -> BreakTimer {
        BreakTimer::new(
            self.collaborators(),
            "tester",
            TimerSettings::with_interval(interval_minutes),
        )
    }

    /// Timer built the way a restarted process builds it
    pub fn restored(&self, interval_minutes: u32) -> BreakTimer {
        BreakTimer::restore(
            self.collaborators(),
            "tester",
            TimerSettings::with_interval(interval_minutes),
        )
    }

    /// Tick `n` times, advancing the clock one second before each tick
    pub fn run(&self, timer: &mut BreakTimer, n: u32) {
        for _ in 0..n {
            self.clock.advance_secs(1);
            timer.tick();
        }
    }
}
