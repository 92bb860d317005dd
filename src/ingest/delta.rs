//! Change detection across ticks.
//!
//! Maintains the in-memory `lastFullCourt`/`lastSignature` maps; the durable
//! `dataHash`/`missingCount`/`isVisible` view lives in `crate::db::courts`
//! and is updated by the caller from the `TickDelta` this produces.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

use crate::ingest::model::{Court, DeltaSignature};
use crate::ingest::parser;

/// Result of running one tick's courts through the `DeltaEngine`.
pub struct TickDelta {
    /// Courts whose signature changed (or that are new this tick).
    pub changed: Vec<Court>,
    /// Courts whose signature is identical to the previous tick.
    pub unchanged: Vec<Court>,
    /// `courtCode`s known from a previous tick but absent from this one.
    pub missing_court_codes: Vec<String>,
}

#[derive(Default)]
pub struct DeltaEngine {
    last_full_court: HashMap<String, Court>,
    last_signature: HashMap<String, DeltaSignature>,
}

impl DeltaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the canonical, durable change hash for a Court.
    pub fn data_hash(court: &Court) -> String {
        hash_value(&court.canonical_json())
    }

    /// Processes one tick's parsed courts against the in-memory state,
    /// updating it in place and returning the resulting delta.
    pub fn process(&mut self, courts: Vec<Court>, html: &str) -> TickDelta {
        let mut seen = HashSet::with_capacity(courts.len());
        let mut changed = Vec::new();
        let mut unchanged = Vec::new();

        for court in courts {
            seen.insert(court.court_code.clone());

            let html_hash = hash_str(
                &parser::card_inner_html(html, &court.court_code).unwrap_or_default(),
            );
            let signature = DeltaSignature {
                html_hash,
                case_number: court.raw_case_info.clone(),
                sr_no: court.sr_no.clone().unwrap_or_default(),
            };

            let is_unchanged = self
                .last_signature
                .get(&court.court_code)
                .is_some_and(|prev| *prev == signature);

            self.last_signature
                .insert(court.court_code.clone(), signature);
            self.last_full_court
                .insert(court.court_code.clone(), court.clone());

            if is_unchanged {
                unchanged.push(court);
            } else {
                changed.push(court);
            }
        }

        let missing_court_codes = self
            .last_full_court
            .keys()
            .filter(|code| !seen.contains(*code))
            .cloned()
            .collect();

        TickDelta {
            changed,
            unchanged,
            missing_court_codes,
        }
    }

    /// Last known full Court for a code, regardless of this tick's outcome.
    pub fn last_known(&self, court_code: &str) -> Option<&Court> {
        self.last_full_court.get(court_code)
    }
}

fn hash_str(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

fn hash_value(value: &serde_json::Value) -> String {
    hash_str(&value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::model::{BenchType, CaseStatus};
    use chrono::Utc;

    fn court(code: &str, case_number: &str, sr_no: &str) -> Court {
        Court {
            court_code: code.to_string(),
            court_number: Some(code.to_string()),
            judge_name: Some("Judge".to_string()),
            bench_type: BenchType::SingleBench,
            judge_count: 1,
            judge_photos: vec![],
            case_number: Some(case_number.to_string()),
            case_status: Some(CaseStatus::InSession),
            case_type: None,
            raw_case_info: case_number.to_string(),
            sr_no: Some(sr_no.to_string()),
            queue_position: sr_no.parse().ok(),
            stream_url: None,
            has_stream: false,
            is_live: false,
            is_active: true,
            scraped_at: Utc::now(),
        }
    }

    const HTML: &str = "<html></html>";

    #[test]
    fn first_tick_reports_every_court_as_changed() {
        let mut engine = DeltaEngine::new();
        let delta = engine.process(vec![court("5", "SCA/1/2024", "1")], HTML);
        assert_eq!(delta.changed.len(), 1);
        assert!(delta.unchanged.is_empty());
    }

    #[test]
    fn identical_signature_next_tick_is_unchanged() {
        let mut engine = DeltaEngine::new();
        engine.process(vec![court("5", "SCA/1/2024", "1")], HTML);
        let delta = engine.process(vec![court("5", "SCA/1/2024", "1")], HTML);
        assert!(delta.changed.is_empty());
        assert_eq!(delta.unchanged.len(), 1);
    }

    #[test]
    fn sr_no_change_marks_changed() {
        let mut engine = DeltaEngine::new();
        engine.process(vec![court("5", "SCA/1/2024", "1")], HTML);
        let delta = engine.process(vec![court("5", "SCA/1/2024", "2")], HTML);
        assert_eq!(delta.changed.len(), 1);
        assert!(delta.unchanged.is_empty());
    }

    #[test]
    fn court_missing_this_tick_is_reported() {
        let mut engine = DeltaEngine::new();
        engine.process(vec![court("5", "SCA/1/2024", "1")], HTML);
        let delta = engine.process(vec![], HTML);
        assert_eq!(delta.missing_court_codes, vec!["5".to_string()]);
    }

    #[test]
    fn data_hash_is_stable_across_scraped_at() {
        let mut a = court("5", "SCA/1/2024", "1");
        let mut b = a.clone();
        a.scraped_at = Utc::now();
        b.scraped_at = a.scraped_at + chrono::Duration::seconds(5);
        assert_eq!(DeltaEngine::data_hash(&a), DeltaEngine::data_hash(&b));
    }

    #[test]
    fn data_hash_changes_with_case_number() {
        let a = court("5", "SCA/1/2024", "1");
        let b = court("5", "SCA/2/2024", "1");
        assert_ne!(DeltaEngine::data_hash(&a), DeltaEngine::data_hash(&b));
    }
}
