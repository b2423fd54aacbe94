//! Usage quota for tiered subscriptions

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{load_json, save_json, Clock, Persistence};

/// Storage key of the weekly usage ledger
pub const USAGE_KEY: &str = "wellness-usage";

/// Quota-consuming actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageAction {
    TimerStart,
    ManualBreak,
}

impl UsageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageAction::TimerStart => "timer_start",
            UsageAction::ManualBreak => "manual_break",
        }
    }
}

/// Answer to a quota check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl UsageDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// External quota collaborator. A timer without one treats every action as
/// allowed.
pub trait UsageLimiter: Send + Sync {
    fn check_allowed(&self, user_id: &str) -> UsageDecision;
    fn report_usage(&self, user_id: &str, action: UsageAction);
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsageLedger {
    week: String,
    counts: HashMap<String, u32>,
}

/// Caps quota-consuming actions per user per ISO week.
pub struct WeeklyUsageLimiter {
    limit: u32,
    store: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
}

impl WeeklyUsageLimiter {
    pub fn new(limit: u32, store: Arc<dyn Persistence>, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            store,
            clock,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Actions recorded for `user_id` in the current week
    pub fn used(&self, user_id: &str) -> u32 {
        self.ledger()
            .counts
            .get(user_id)
            .copied()
            .unwrap_or(0)
    }

    fn ledger(&self) -> UsageLedger {
        let week = week_key(self.clock.now());
        match load_json::<UsageLedger>(self.store.as_ref(), USAGE_KEY) {
            Ok(Some(ledger)) if ledger.week == week => ledger,
            Ok(_) => UsageLedger {
                week,
                counts: HashMap::new(),
            },
            Err(e) => {
                warn!("Discarding unreadable usage ledger: {}", e);
                UsageLedger {
                    week,
                    counts: HashMap::new(),
                }
            }
        }
    }
}

impl UsageLimiter for WeeklyUsageLimiter {
    fn check_allowed(&self, user_id: &str) -> UsageDecision {
        let used = self.used(user_id);
        if used < self.limit {
            UsageDecision::allowed()
        } else {
            UsageDecision::denied(format!(
                "Weekly limit of {} breaks reached. Upgrade your plan or wait until next week.",
                self.limit
            ))
        }
    }

    fn report_usage(&self, user_id: &str, action: UsageAction) {
        let mut ledger = self.ledger();
        let count = ledger.counts.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        debug!(
            "Recorded {} for {} ({}/{} in {})",
            action.as_str(),
            user_id,
            count,
            self.limit,
            ledger.week
        );
        if let Err(e) = save_json(self.store.as_ref(), USAGE_KEY, &ledger) {
            warn!("Failed to persist usage ledger: {}", e);
        }
    }
}

/// ISO week label such as `2026-W42`
fn week_key(now: DateTime<Utc>) -> String {
    let week = now.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ManualClock, MemoryStore};
    use chrono::TimeZone;

    fn limiter(limit: u32) -> (WeeklyUsageLimiter, Arc<ManualClock>, Arc<MemoryStore>) {
        // Monday
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryStore::new());
        let limiter = WeeklyUsageLimiter::new(limit, store.clone(), clock.clone());
        (limiter, clock, store)
    }

    #[test]
    fn denies_after_limit_with_reason() {
        let (limiter, _, _) = limiter(2);
        assert!(limiter.check_allowed("ana").allowed);
        limiter.report_usage("ana", UsageAction::TimerStart);
        limiter.report_usage("ana", UsageAction::ManualBreak);

        let decision = limiter.check_allowed("ana");
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("Weekly limit of 2"));
        assert!(limiter.check_allowed("sam").allowed);
    }

    #[test]
    fn counts_reset_when_the_week_rolls_over() {
        let (limiter, clock, _) = limiter(1);
        limiter.report_usage("ana", UsageAction::TimerStart);
        assert!(!limiter.check_allowed("ana").allowed);

        clock.advance_secs(7 * 24 * 3600);
        assert_eq!(limiter.used("ana"), 0);
        assert!(limiter.check_allowed("ana").allowed);
    }

    #[test]
    fn corrupt_ledger_counts_as_empty() {
        let (limiter, _, store) = limiter(1);
        store.save(USAGE_KEY, "[]").unwrap();
        assert!(limiter.check_allowed("ana").allowed);
    }

    #[test]
    fn week_key_is_iso_week() {
        let sunday = Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap();
        assert_eq!(week_key(sunday), "2026-W01");
    }
}
