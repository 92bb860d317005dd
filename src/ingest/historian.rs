//! Idempotent per-court history tracking.
//!
//! The CaseStatistics upsert (concern 2) is durable-state bookkeeping and
//! lives in `crate::db::statistics`; this module only decides which courts
//! changed enough to be worth a history row.

use std::collections::HashMap;

use crate::ingest::model::{CaseHistoryEvent, CaseStatus, Court};

#[derive(Debug, Clone, PartialEq)]
struct CourtState {
    case_number: String,
    status: CaseStatus,
    queue_position: Option<i32>,
}

#[derive(Default)]
pub struct Historian {
    last_court_state: HashMap<String, CourtState>,
}

impl Historian {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans this tick's courts, returning the history events to persist.
    /// Courts without both a `courtNumber` and a `caseStatus` carry nothing
    /// worth recording and are skipped.
    pub fn process(&mut self, courts: &[Court]) -> Vec<CaseHistoryEvent> {
        let mut events = Vec::new();

        for court in courts {
            let (Some(court_number), Some(status), Some(case_number)) = (
                court.court_number.clone(),
                court.case_status,
                court.case_number.clone(),
            ) else {
                continue;
            };

            let state = CourtState {
                case_number: case_number.clone(),
                status,
                queue_position: court.queue_position,
            };

            let changed = self
                .last_court_state
                .get(&court_number)
                .is_none_or(|prev| *prev != state);

            if changed {
                events.push(CaseHistoryEvent {
                    case_number,
                    status,
                    queue_position: court.queue_position,
                    court_number: court_number.clone(),
                    scraped_at: court.scraped_at,
                });
                self.last_court_state.insert(court_number, state);
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::model::BenchType;
    use chrono::Utc;

    fn court(court_number: &str, case_number: &str, status: CaseStatus, position: Option<i32>) -> Court {
        Court {
            court_code: court_number.to_string(),
            court_number: Some(court_number.to_string()),
            judge_name: None,
            bench_type: BenchType::SingleBench,
            judge_count: 1,
            judge_photos: vec![],
            case_number: Some(case_number.to_string()),
            case_status: Some(status),
            case_type: None,
            raw_case_info: case_number.to_string(),
            sr_no: None,
            queue_position: position,
            stream_url: None,
            has_stream: false,
            is_live: false,
            is_active: true,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn first_sighting_emits_event() {
        let mut historian = Historian::new();
        let events = historian.process(&[court("5", "A", CaseStatus::InSession, Some(1))]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn unchanged_state_next_tick_emits_nothing() {
        let mut historian = Historian::new();
        historian.process(&[court("5", "A", CaseStatus::InSession, Some(1))]);
        let events = historian.process(&[court("5", "A", CaseStatus::InSession, Some(1))]);
        assert!(events.is_empty());
    }

    #[test]
    fn position_change_emits_event() {
        let mut historian = Historian::new();
        historian.process(&[court("5", "A", CaseStatus::InSession, Some(1))]);
        let events = historian.process(&[court("5", "A", CaseStatus::InSession, Some(2))]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].queue_position, Some(2));
    }

    #[test]
    fn court_without_case_status_is_skipped() {
        let mut historian = Historian::new();
        let mut court = court("5", "A", CaseStatus::InSession, Some(1));
        court.case_status = None;
        assert!(historian.process(&[court]).is_empty());
    }
}
