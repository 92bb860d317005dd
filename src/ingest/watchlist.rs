//! The central per-case state machine.
//!
//! Pure and synchronous: given a watchlist, the tick's courts, and its
//! rebuilt queues, decide the watchlist's next state and (at most) one
//! alert to emit. Persistence and gateway dispatch, and the per-watchlist
//! failure isolation around them, live in `crate::ingest` (the tick driver).

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::ingest::model::{
    Alert, AlertDetails, AlertType, CaseStatus, Court, CourtQueue, NotificationSetting, Watchlist,
    WatchState,
};

/// Minimum time between two alerts on the same watchlist.
pub const COOLDOWN: Duration = Duration::minutes(5);

/// Consecutive misses before a watchlisted case is declared completed.
const COMPLETED_MISS_THRESHOLD: i32 = 2;

/// The outcome of processing one watchlist for one tick: the watchlist's
/// fields as they should now be persisted, and an alert to dispatch if any.
pub struct WatchlistOutcome {
    pub watchlist: Watchlist,
    pub alert: Option<Alert>,
}

/// Processes a single watchlist against this tick's full court set.
pub fn process(
    watchlist: &Watchlist,
    courts_by_case: &HashMap<String, &Court>,
    queues: &HashMap<String, CourtQueue>,
    now: DateTime<Utc>,
) -> WatchlistOutcome {
    let mut next = watchlist.clone();

    let Some(court) = courts_by_case.get(&watchlist.case_number) else {
        return case_not_found(watchlist, &mut next, now);
    };

    next.miss_count = 0;

    let position = court
        .court_number
        .as_ref()
        .and_then(|number| queues.get(number))
        .and_then(|queue| queue.position_of(&watchlist.case_number));

    let velocity = match (watchlist.last_seen_position, position) {
        (Some(last), Some(current)) => last - current,
        _ => 0,
    };

    let new_state = derive_state(court.case_status, position);

    let alert = new_state.and_then(|state| {
        if Some(state) == watchlist.last_seen_status {
            return None;
        }
        let alert_type = alert_type_for(state);
        let setting = alert_type.setting();
        if !watchlist.notification_settings.contains(&setting) {
            return None;
        }
        if !cooldown_passed(watchlist.last_notification_time, now) {
            return None;
        }

        next.last_seen_status = Some(state);
        next.last_notification_time = Some(now);

        Some(Alert {
            device_id: watchlist.device_id.clone(),
            case_number: watchlist.case_number.clone(),
            alert_type,
            details: AlertDetails {
                court_number: court.court_number.clone(),
                judge_name: court.judge_name.clone(),
                position,
                velocity,
                stream_url: court.stream_url.clone(),
            },
        })
    });

    next.last_seen_position = position;
    next.last_seen_court = court.court_number.clone();

    WatchlistOutcome {
        watchlist: next,
        alert,
    }
}

fn case_not_found(
    watchlist: &Watchlist,
    next: &mut Watchlist,
    now: DateTime<Utc>,
) -> WatchlistOutcome {
    next.miss_count = watchlist.miss_count + 1;

    let mut alert = None;
    if next.miss_count >= COMPLETED_MISS_THRESHOLD
        && watchlist.last_seen_status != Some(WatchState::Completed)
        && watchlist
            .notification_settings
            .contains(&NotificationSetting::Completed)
        && cooldown_passed(watchlist.last_notification_time, now)
    {
        next.last_seen_status = Some(WatchState::Completed);
        next.last_notification_time = Some(now);
        alert = Some(Alert {
            device_id: watchlist.device_id.clone(),
            case_number: watchlist.case_number.clone(),
            alert_type: AlertType::Completed,
            details: AlertDetails::default(),
        });
    }

    WatchlistOutcome {
        watchlist: next.clone(),
        alert,
    }
}

fn derive_state(case_status: Option<CaseStatus>, position: Option<i32>) -> Option<WatchState> {
    if case_status == Some(CaseStatus::InSession) {
        return Some(WatchState::InSession);
    }
    match position {
        Some(1) => Some(WatchState::Next),
        Some(p) if p <= 3 => Some(WatchState::VeryNear),
        Some(p) if p <= 10 => Some(WatchState::Near),
        Some(_) => Some(WatchState::Far),
        None => None,
    }
}

fn alert_type_for(state: WatchState) -> AlertType {
    match state {
        WatchState::InSession => AlertType::InSession,
        WatchState::Next | WatchState::VeryNear => AlertType::Approaching,
        WatchState::Near | WatchState::Far => AlertType::EarlyWarning,
        WatchState::Completed => AlertType::Completed,
    }
}

fn cooldown_passed(last_notification_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_notification_time {
        Some(last) => now - last >= COOLDOWN,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::model::{BenchType, NotificationSettings};
    use std::collections::BTreeSet;

    fn all_settings() -> NotificationSettings {
        BTreeSet::from([
            NotificationSetting::EarlyWarning,
            NotificationSetting::Approaching,
            NotificationSetting::InSession,
            NotificationSetting::Completed,
        ])
    }

    fn watchlist(case_number: &str) -> Watchlist {
        Watchlist {
            id: 1,
            device_id: "device-1".to_string(),
            case_number: case_number.to_string(),
            notification_settings: all_settings(),
            last_seen_status: None,
            last_seen_court: None,
            last_seen_position: None,
            miss_count: 0,
            last_notification_time: None,
            active: true,
        }
    }

    fn court(case_number: &str, status: CaseStatus) -> Court {
        Court {
            court_code: "5".to_string(),
            court_number: Some("5".to_string()),
            judge_name: Some("Judge".to_string()),
            bench_type: BenchType::SingleBench,
            judge_count: 1,
            judge_photos: vec![],
            case_number: Some(case_number.to_string()),
            case_status: Some(status),
            case_type: None,
            raw_case_info: case_number.to_string(),
            sr_no: None,
            queue_position: None,
            stream_url: Some("https://stream".to_string()),
            has_stream: true,
            is_live: status == CaseStatus::InSession,
            is_active: true,
            scraped_at: Utc::now(),
        }
    }

    fn queue_with_position(case_number: &str, court_number: &str, position: i32) -> HashMap<String, CourtQueue> {
        let mut pending_court = court(case_number, CaseStatus::InSession);
        pending_court.case_status = None;
        pending_court.queue_position = Some(position);
        let mut pending = vec![];
        for p in 1..position {
            let mut filler = court(&format!("filler-{p}"), CaseStatus::InSession);
            filler.case_status = None;
            filler.queue_position = Some(p);
            pending.push(filler);
        }
        pending.push(pending_court);
        let mut queues = HashMap::new();
        queues.insert(
            court_number.to_string(),
            CourtQueue {
                pending,
                current_case: None,
            },
        );
        queues
    }

    fn courts_by_case<'a>(court: &'a Court) -> HashMap<String, &'a Court> {
        let mut map = HashMap::new();
        map.insert(court.case_number.clone().unwrap(), court);
        map
    }

    #[test]
    fn position_1_is_next_not_very_near() {
        let wl = watchlist("SCA/1/2024");
        let queues = queue_with_position("SCA/1/2024", "5", 1);
        let court = {
            let mut c = court("SCA/1/2024", CaseStatus::Recess);
            c.queue_position = Some(1);
            c
        };
        let by_case = courts_by_case(&court);
        let outcome = process(&wl, &by_case, &queues, Utc::now());
        assert_eq!(outcome.watchlist.last_seen_status, Some(WatchState::Next));
        assert_eq!(outcome.alert.unwrap().alert_type, AlertType::Approaching);
    }

    #[test]
    fn position_3_is_very_near_position_4_is_near_position_11_is_far() {
        for (position, expected) in [(3, WatchState::VeryNear), (4, WatchState::Near), (10, WatchState::Near), (11, WatchState::Far)] {
            let wl = watchlist("SCA/1/2024");
            let queues = queue_with_position("SCA/1/2024", "5", position);
            let mut c = court("SCA/1/2024", CaseStatus::Recess);
            c.queue_position = Some(position);
            let by_case = courts_by_case(&c);
            let outcome = process(&wl, &by_case, &queues, Utc::now());
            assert_eq!(outcome.watchlist.last_seen_status, Some(expected));
        }
    }

    #[test]
    fn in_session_wins_regardless_of_position() {
        let wl = watchlist("SCA/1/2024");
        let queues = queue_with_position("SCA/1/2024", "5", 1);
        let c = court("SCA/1/2024", CaseStatus::InSession);
        let by_case = courts_by_case(&c);
        let outcome = process(&wl, &by_case, &queues, Utc::now());
        assert_eq!(
            outcome.watchlist.last_seen_status,
            Some(WatchState::InSession)
        );
        assert_eq!(outcome.alert.unwrap().alert_type, AlertType::InSession);
    }

    #[test]
    fn missing_twice_marks_completed() {
        let mut wl = watchlist("SCA/1/2024");
        wl.last_seen_status = Some(WatchState::Next);
        let by_case = HashMap::new();
        let queues = HashMap::new();

        let outcome1 = process(&wl, &by_case, &queues, Utc::now());
        assert_eq!(outcome1.watchlist.miss_count, 1);
        assert!(outcome1.alert.is_none());

        let outcome2 = process(&outcome1.watchlist, &by_case, &queues, Utc::now());
        assert_eq!(outcome2.watchlist.miss_count, 2);
        assert_eq!(
            outcome2.watchlist.last_seen_status,
            Some(WatchState::Completed)
        );
        assert!(outcome2.alert.is_some());
    }

    #[test]
    fn cooldown_suppresses_repeat_alert() {
        let mut wl = watchlist("SCA/1/2024");
        wl.last_notification_time = Some(Utc::now());
        wl.last_seen_status = Some(WatchState::Far);
        let queues = queue_with_position("SCA/1/2024", "5", 1);
        let mut c = court("SCA/1/2024", CaseStatus::Recess);
        c.queue_position = Some(1);
        let by_case = courts_by_case(&c);

        let outcome = process(&wl, &by_case, &queues, Utc::now());
        assert!(outcome.alert.is_none());
        assert_eq!(outcome.watchlist.last_seen_status, Some(WatchState::Far));
    }

    #[test]
    fn disabled_setting_suppresses_alert() {
        let mut wl = watchlist("SCA/1/2024");
        wl.notification_settings = BTreeSet::new();
        let queues = queue_with_position("SCA/1/2024", "5", 1);
        let mut c = court("SCA/1/2024", CaseStatus::Recess);
        c.queue_position = Some(1);
        let by_case = courts_by_case(&c);

        let outcome = process(&wl, &by_case, &queues, Utc::now());
        assert!(outcome.alert.is_none());
    }
}
