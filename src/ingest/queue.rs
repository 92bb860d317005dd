//! Groups a tick's courts by `courtNumber` into per-court queues.

use std::collections::HashMap;

use crate::ingest::model::{CaseStatus, Court, CourtQueue};

/// Builds one `CourtQueue` per distinct `courtNumber`, dropping courts that
/// have none.
pub fn build_queues(courts: &[Court]) -> HashMap<String, CourtQueue> {
    let mut queues: HashMap<String, CourtQueue> = HashMap::new();

    for court in courts {
        let Some(court_number) = &court.court_number else {
            continue;
        };
        let queue = queues.entry(court_number.clone()).or_default();

        if queue.current_case.is_none() && court.case_status == Some(CaseStatus::InSession) {
            queue.current_case = Some(court.clone());
        }
        if court.queue_position.is_some()
            && !matches!(
                court.case_status,
                Some(CaseStatus::InSession) | Some(CaseStatus::SittingOver)
            )
        {
            queue.pending.push(court.clone());
        }
    }

    for queue in queues.values_mut() {
        queue.pending.sort_by_key(|c| c.queue_position);
    }

    queues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::model::BenchType;
    use chrono::Utc;

    fn court(number: &str, case_number: &str, status: Option<CaseStatus>, pos: Option<i32>) -> Court {
        Court {
            court_code: format!("code-{number}-{case_number}"),
            court_number: Some(number.to_string()),
            judge_name: None,
            bench_type: BenchType::SingleBench,
            judge_count: 1,
            judge_photos: vec![],
            case_number: Some(case_number.to_string()),
            case_status: status,
            case_type: None,
            raw_case_info: case_number.to_string(),
            sr_no: pos.map(|p| p.to_string()),
            queue_position: pos,
            stream_url: None,
            has_stream: false,
            is_live: false,
            is_active: true,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn groups_by_court_number_and_sorts_pending() {
        let courts = vec![
            court("5", "A", None, Some(3)),
            court("5", "B", None, Some(1)),
            court("5", "C", Some(CaseStatus::InSession), None),
        ];
        let queues = build_queues(&courts);
        let queue = &queues["5"];
        assert_eq!(queue.pending.len(), 2);
        assert_eq!(queue.pending[0].case_number.as_deref(), Some("B"));
        assert_eq!(
            queue.current_case.as_ref().unwrap().case_number.as_deref(),
            Some("C")
        );
    }

    #[test]
    fn courts_without_court_number_are_excluded() {
        let mut court = court("5", "A", None, Some(1));
        court.court_number = None;
        let queues = build_queues(&[court]);
        assert!(queues.is_empty());
    }

    #[test]
    fn sitting_over_is_excluded_from_pending() {
        let courts = vec![court("5", "A", Some(CaseStatus::SittingOver), Some(1))];
        let queues = build_queues(&courts);
        assert!(queues["5"].pending.is_empty());
    }

    #[test]
    fn position_of_finds_rank() {
        let courts = vec![
            court("5", "A", None, Some(2)),
            court("5", "B", None, Some(1)),
        ];
        let queues = build_queues(&courts);
        assert_eq!(queues["5"].position_of("B"), Some(1));
        assert_eq!(queues["5"].position_of("A"), Some(2));
        assert_eq!(queues["5"].position_of("Z"), None);
    }
}
