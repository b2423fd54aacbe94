use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use office_stretch::{
    services::{load_json, save_json, Clock, FileStore, LogNotifier, ManualClock},
    state::{
        RecoverySnapshot, SettingsPatch, TimerPhase, TimerRuntimeState, TimerSettings,
        SNAPSHOT_KEY,
    },
    timer::{BreakTimer, Collaborators, StartOutcome},
};

/// One data directory shared by successive "process runs"
struct Machine {
    _dir: TempDir,
    store: Arc<FileStore>,
    clock: Arc<ManualClock>,
    breaks: Arc<AtomicUsize>,
}

impl Machine {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        Self {
            _dir: dir,
            store,
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2026, 10, 13, 14, 0, 0).unwrap(),
            )),
            breaks: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn boot(&self, interval_minutes: u32) -> BreakTimer {
        let breaks = Arc::clone(&self.breaks);
        let deps = Collaborators::new(
            self.clock.clone(),
            self.store.clone(),
            Arc::new(LogNotifier::new()),
            Arc::new(move || {
                breaks.fetch_add(1, Ordering::SeqCst);
            }),
        );
        BreakTimer::restore(deps, "tester", TimerSettings::with_interval(interval_minutes))
    }

    fn run(&self, timer: &mut BreakTimer, seconds: u32) {
        for _ in 0..seconds {
            self.clock.advance_secs(1);
            timer.tick();
        }
    }

    fn breaks(&self) -> usize {
        self.breaks.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Option<RecoverySnapshot> {
        load_json(&*self.store, SNAPSHOT_KEY).unwrap()
    }
}

#[test]
fn running_countdown_survives_a_restart() {
    let machine = Machine::new();
    let mut timer = machine.boot(45);
    timer.start().unwrap();
    machine.run(&mut timer, 30);
    assert_eq!(machine.snapshot().unwrap().time_remaining, 2670);
    drop(timer);

    machine.clock.advance_secs(60);
    let timer = machine.boot(45);

    assert_eq!(timer.phase(), TimerPhase::Running);
    assert_eq!(timer.runtime().time_remaining, 2610);
    assert_eq!(machine.breaks(), 0);
}

#[test]
fn countdown_that_ran_out_while_down_fires_once() {
    let machine = Machine::new();
    let mut timer = machine.boot(1);
    timer.start().unwrap();
    machine.run(&mut timer, 10);
    drop(timer);

    machine.clock.advance_secs(120);
    let timer = machine.boot(1);

    assert_eq!(machine.breaks(), 1);
    assert_eq!(timer.phase(), TimerPhase::Idle);
    assert_eq!(timer.runtime().time_remaining, 60);
    assert!(machine.snapshot().is_none());

    // The snapshot was consumed, a second restart stays quiet
    drop(timer);
    let _timer = machine.boot(1);
    assert_eq!(machine.breaks(), 1);
}

#[test]
fn paused_countdown_comes_back_paused() {
    let machine = Machine::new();
    let mut timer = machine.boot(45);
    timer.start().unwrap();
    machine.run(&mut timer, 5);
    timer.pause().unwrap();
    drop(timer);

    machine.clock.advance_secs(3600);
    let mut timer = machine.boot(45);

    assert_eq!(timer.phase(), TimerPhase::Paused);
    assert_eq!(timer.runtime().time_remaining, 2695);
    assert_eq!(timer.start().unwrap(), StartOutcome::Resumed);
    assert_eq!(timer.runtime().time_remaining, 2695);
}

#[test]
fn snooze_is_restored_with_its_own_duration() {
    let machine = Machine::new();
    let mut timer = machine.boot(45);
    timer.snooze(10).unwrap();
    machine.run(&mut timer, 20);
    drop(timer);

    machine.clock.advance_secs(100);
    let timer = machine.boot(45);

    assert_eq!(timer.phase(), TimerPhase::Snoozing);
    assert_eq!(timer.runtime().snooze_duration_seconds, 600);
    assert_eq!(timer.runtime().time_remaining, 480);
}

#[test]
fn paused_snooze_comes_back_and_resumes_as_a_snooze() {
    let machine = Machine::new();
    let snoozed_at = machine.clock.now();
    let runtime = TimerRuntimeState {
        time_remaining: 400,
        is_active: false,
        ..TimerRuntimeState::snoozing(600, snoozed_at)
    };
    let snapshot = RecoverySnapshot::capture(&runtime, 45, machine.clock.now());
    save_json(&*machine.store, SNAPSHOT_KEY, &snapshot).unwrap();

    machine.clock.advance_secs(900);
    let mut timer = machine.boot(45);

    assert_eq!(timer.phase(), TimerPhase::SnoozePaused);
    assert_eq!(timer.runtime().time_remaining, 400);
    assert_eq!(timer.runtime().snooze_start_time, Some(snoozed_at));

    assert_eq!(timer.start().unwrap(), StartOutcome::Resumed);
    assert_eq!(timer.phase(), TimerPhase::Snoozing);
    assert_eq!(timer.runtime().time_remaining, 400);
    assert_eq!(timer.runtime().snooze_duration_seconds, 600);

    machine.run(&mut timer, 400);
    assert_eq!(machine.breaks(), 1);
    assert_eq!(timer.phase(), TimerPhase::Idle);
    assert_eq!(timer.runtime().time_remaining, 45 * 60);
}

#[test]
fn settings_outlive_the_process() {
    let machine = Machine::new();
    let mut timer = machine.boot(45);
    timer
        .update_settings(&SettingsPatch {
            interval_minutes: Some(20),
            end_hour: Some(18),
            ..SettingsPatch::default()
        })
        .unwrap();
    drop(timer);

    let timer = machine.boot(45);
    assert_eq!(timer.settings().interval_minutes, 20);
    assert_eq!(timer.settings().end_hour, 18);
    assert_eq!(timer.runtime().time_remaining, 1200);
}
