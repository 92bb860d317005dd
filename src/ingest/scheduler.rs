//! Tick gating: business hours, reentrancy lock, and error backoff.
//!
//! Pure and synchronous, testing scheduling decisions against fixed
//! `DateTime<Utc>` fixtures rather than the wall clock.

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Asia::Kolkata;

/// Lower bound (inclusive) of the business-hours window, local hour.
const BUSINESS_HOUR_START: u32 = 10;
/// Upper bound (inclusive) of the business-hours window, local hour.
const BUSINESS_HOUR_END: u32 = 17;

/// Reentrancy lock duration, set on tick entry (`MAX_EXPECTED_RUNTIME`).
pub const LOCK_DURATION: Duration = Duration::seconds(25);
/// Backoff duration applied after a tick error.
pub const BACKOFF_DURATION: Duration = Duration::seconds(120);

fn in_business_hours(now: DateTime<Utc>) -> bool {
    let local_hour = now.with_timezone(&Kolkata).hour();
    (BUSINESS_HOUR_START..=BUSINESS_HOUR_END).contains(&local_hour)
}

/// Why a tick did or didn't run this evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Run,
    OutsideBusinessHours,
    Locked,
    Backoff,
}

/// Mutable scheduling state the Scheduler owns across ticks.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    scraper_lock_until: Option<DateTime<Utc>>,
    backoff_until: Option<DateTime<Utc>>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate whether a tick should run at `now`. Does not mutate state;
    /// call `enter` once the caller has decided to run.
    pub fn evaluate(&self, now: DateTime<Utc>) -> Gate {
        if !in_business_hours(now) {
            return Gate::OutsideBusinessHours;
        }
        if let Some(until) = self.scraper_lock_until {
            if now < until {
                return Gate::Locked;
            }
        }
        if let Some(until) = self.backoff_until {
            if now < until {
                return Gate::Backoff;
            }
        }
        Gate::Run
    }

    /// Sets the reentrancy lock, called on tick entry.
    pub fn enter(&mut self, now: DateTime<Utc>) {
        self.scraper_lock_until = Some(now + LOCK_DURATION);
    }

    /// Clears the lock and, on failure, sets the backoff window. Called in
    /// the tick's `finally` phase regardless of outcome.
    pub fn finish(&mut self, now: DateTime<Utc>, failed: bool) {
        self.scraper_lock_until = None;
        if failed {
            self.backoff_until = Some(now + BACKOFF_DURATION);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_kolkata_hour(hour: u32) -> DateTime<Utc> {
        Kolkata
            .with_ymd_and_hms(2026, 7, 27, hour, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn business_hours_boundaries_are_inclusive() {
        let state = SchedulerState::new();
        assert_eq!(state.evaluate(at_kolkata_hour(10)), Gate::Run);
        assert_eq!(state.evaluate(at_kolkata_hour(17)), Gate::Run);
        assert_eq!(
            state.evaluate(at_kolkata_hour(9)),
            Gate::OutsideBusinessHours
        );
        assert_eq!(
            state.evaluate(at_kolkata_hour(18)),
            Gate::OutsideBusinessHours
        );
    }

    #[test]
    fn lock_blocks_reentry_until_it_expires() {
        let mut state = SchedulerState::new();
        let now = at_kolkata_hour(11);
        state.enter(now);
        assert_eq!(state.evaluate(now + Duration::seconds(1)), Gate::Locked);
        assert_eq!(state.evaluate(now + LOCK_DURATION), Gate::Run);
    }

    #[test]
    fn failure_sets_backoff_success_does_not() {
        let mut state = SchedulerState::new();
        let now = at_kolkata_hour(11);
        state.enter(now);
        state.finish(now, true);
        assert_eq!(state.evaluate(now + Duration::seconds(1)), Gate::Backoff);
        assert_eq!(state.evaluate(now + BACKOFF_DURATION), Gate::Run);
    }

    #[test]
    fn success_clears_lock_with_no_backoff() {
        let mut state = SchedulerState::new();
        let now = at_kolkata_hour(11);
        state.enter(now);
        state.finish(now, false);
        assert_eq!(state.evaluate(now + Duration::seconds(1)), Gate::Run);
    }
}
