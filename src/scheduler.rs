//! Time-triggered notification scheduling.
//!
//! [`NotificationScheduler`] polls wall-clock time on a fixed cadence
//! and compares it against the active day's prayer times. A slot fires
//! when the clock is at the scheduled minute or one minute past it —
//! never before — and each `(date, label)` pair fires at most once.
//! Polling is deliberately coarse: the tick cadence only has to be
//! finer than the tolerance window, not aligned to it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::dispatch::NotificationDispatcher;
use crate::types::{parse_hhmm, LocationSelection, PrayerLabel, Schedule};

/// How many minutes past the scheduled time a slot may still fire.
const TOLERANCE_MINUTES: i64 = 1;

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No schedule armed; ticks are no-ops.
    Idle,
    /// Armed with a schedule; ticks evaluate prayer times.
    Armed,
    /// Stopped for good; ticks are no-ops.
    Stopped,
}

/// Compares wall-clock time against the armed schedule and dispatches
/// alerts for matured prayer slots.
pub struct NotificationScheduler {
    state: SchedulerState,
    schedule: Schedule,
    location: LocationSelection,
    /// Slots already fired; keyed by date so stale marks cannot
    /// suppress the next day's alerts.
    notified: HashSet<(NaiveDate, PrayerLabel)>,
    current_date: Option<NaiveDate>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl NotificationScheduler {
    /// Create an idle scheduler for the given location.
    pub fn new(dispatcher: Arc<NotificationDispatcher>, location: LocationSelection) -> Self {
        Self {
            state: SchedulerState::Idle,
            schedule: Schedule::new(),
            location,
            notified: HashSet::new(),
            current_date: None,
            dispatcher,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Arm the scheduler with a freshly installed schedule.
    ///
    /// Clears all fired marks: a re-arm starts bookkeeping over, and a
    /// slot whose time already passed today simply never matures.
    pub fn arm(&mut self, schedule: Schedule) {
        tracing::debug!(days = schedule.len(), location = %self.location, "scheduler armed");
        self.schedule = schedule;
        self.notified.clear();
        self.current_date = None;
        self.state = SchedulerState::Armed;
    }

    /// Switch location: drop the now-stale schedule and all fired
    /// marks, and disarm until a schedule for the new location arrives.
    pub fn set_location(&mut self, location: LocationSelection) {
        tracing::debug!(from = %self.location, to = %location, "scheduler location changed");
        self.location = location;
        self.schedule = Schedule::new();
        self.notified.clear();
        self.current_date = None;
        self.state = SchedulerState::Idle;
    }

    /// Stop evaluating ticks permanently.
    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
    }

    /// Evaluate one tick at the given local time.
    ///
    /// No-op unless armed. A slot fires when `now` is zero or one
    /// minute past its scheduled time; empty or malformed time values
    /// are skipped without failing the tick.
    pub fn tick(&mut self, now: NaiveDateTime) {
        if self.state != SchedulerState::Armed {
            return;
        }

        let today = now.date();
        if self.current_date != Some(today) {
            // Date rollover: marks from previous days can never match
            // again, drop them.
            self.notified.retain(|(date, _)| *date == today);
            self.current_date = Some(today);
        }

        let Some(day) = self.schedule.day_for(today) else {
            tracing::trace!(date = %today, "no schedule entry for today");
            return;
        };
        let day = day.clone();

        let now_minutes = i64::from(now.hour() * 60 + now.minute());
        for &label in PrayerLabel::all() {
            let raw = day.time_for(label);
            if raw.is_empty() {
                continue;
            }
            let Some(scheduled) = parse_hhmm(raw) else {
                tracing::trace!(%label, raw, "unparseable time slot skipped");
                continue;
            };

            let diff = now_minutes - i64::from(scheduled);
            if !(0..=TOLERANCE_MINUTES).contains(&diff) {
                continue;
            }
            if self.notified.insert((today, label)) {
                tracing::debug!(%label, time = raw, diff, "prayer time reached");
                self.dispatcher.dispatch(today, label, &self.location.name);
            }
        }
    }

    /// Drive the scheduler until shutdown is signalled.
    ///
    /// Ticks on a fixed cadence against the local clock. A delayed
    /// tick that lands more than the tolerance past a slot means that
    /// alert is missed, by design of the tolerance window.
    pub async fn run(mut self, tick_interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(chrono::Local::now().naive_local());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("scheduler run loop stopped");
    }
}
