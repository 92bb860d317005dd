//! Core data types for the ingest pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which bench configuration a court is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchType {
    SingleBench,
    DivisionBench,
}

/// The status of the case currently in front of a court, derived from the
/// upstream `caseinfo` footer text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    InSession,
    Recess,
    SittingOver,
}

/// The coarser-grained classification mirrored alongside `CaseStatus` for
/// downstream consumers that group by lifecycle stage rather than status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    Active,
    Recess,
    SittingOver,
}

/// The parsed shape of a `caseinfo` footer string.
///
/// Replaces the upstream's loose string matching with a tagged variant that
/// is computed once and carries the derived fields together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseFooter {
    InSession { case_number: String },
    Recess { case_number: String },
    SittingOver,
    Empty,
}

impl CaseFooter {
    /// Parse a raw `caseinfo` string (already whitespace-collapsed) into a
    /// footer variant: recess, sitting-over, empty, or a bare case number.
    pub fn parse(raw: &str) -> Self {
        let collapsed = collapse_whitespace(raw);
        let trimmed = collapsed.trim();

        if trimmed.to_uppercase().contains("COURT SITTING OVER") {
            return CaseFooter::SittingOver;
        }
        if trimmed.contains("(RECESS)") {
            let case_number = trimmed.replace("(RECESS)", "").trim().to_string();
            return CaseFooter::Recess { case_number };
        }
        if !trimmed.is_empty() && trimmed != "-" {
            return CaseFooter::InSession {
                case_number: trimmed.to_string(),
            };
        }
        CaseFooter::Empty
    }

    pub fn case_number(&self) -> Option<&str> {
        match self {
            CaseFooter::InSession { case_number } | CaseFooter::Recess { case_number } => {
                Some(case_number.as_str())
            }
            CaseFooter::SittingOver | CaseFooter::Empty => None,
        }
    }

    pub fn case_status(&self) -> Option<CaseStatus> {
        match self {
            CaseFooter::InSession { .. } => Some(CaseStatus::InSession),
            CaseFooter::Recess { .. } => Some(CaseStatus::Recess),
            CaseFooter::SittingOver => Some(CaseStatus::SittingOver),
            CaseFooter::Empty => None,
        }
    }

    pub fn case_type(&self) -> Option<CaseType> {
        match self {
            CaseFooter::InSession { .. } => Some(CaseType::Active),
            CaseFooter::Recess { .. } => Some(CaseType::Recess),
            CaseFooter::SittingOver => Some(CaseType::SittingOver),
            CaseFooter::Empty => None,
        }
    }
}

/// Collapse any run of whitespace into a single ASCII space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A single court's observed state for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Court {
    pub court_code: String,
    pub court_number: Option<String>,
    pub judge_name: Option<String>,
    pub bench_type: BenchType,
    pub judge_count: usize,
    pub judge_photos: Vec<String>,
    pub case_number: Option<String>,
    pub case_status: Option<CaseStatus>,
    pub case_type: Option<CaseType>,
    /// Raw, whitespace-collapsed `caseinfo` footer text, pre-derivation.
    /// Used by the `DeltaEngine`'s in-memory signature comparison, which
    /// predates and is cheaper than full `CaseFooter` derivation.
    pub raw_case_info: String,
    pub sr_no: Option<String>,
    pub queue_position: Option<i32>,
    pub stream_url: Option<String>,
    pub has_stream: bool,
    pub is_live: bool,
    pub is_active: bool,
    pub scraped_at: DateTime<Utc>,
}

impl Court {
    /// Canonical JSON used for the durable `dataHash`.
    ///
    /// Excludes `scraped_at`: the hash must be stable across ticks that
    /// observe the exact same semantic state at different instants.
    pub fn canonical_json(&self) -> serde_json::Value {
        serde_json::json!({
            "courtCode": self.court_code,
            "courtNumber": self.court_number,
            "judgeName": self.judge_name,
            "benchType": self.bench_type,
            "judgeCount": self.judge_count,
            "judgePhotos": self.judge_photos,
            "caseNumber": self.case_number,
            "caseStatus": self.case_status,
            "caseType": self.case_type,
            "srNo": self.sr_no,
            "queuePosition": self.queue_position,
            "streamUrl": self.stream_url,
            "hasStream": self.has_stream,
            "isLive": self.is_live,
            "isActive": self.is_active,
        })
    }
}

/// The cheap, in-memory change signal tracked per court across ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaSignature {
    pub html_hash: String,
    pub case_number: String,
    pub sr_no: String,
}

/// Notification categories a watchlist can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationSetting {
    EarlyWarning,
    Approaching,
    InSession,
    Completed,
}

pub type NotificationSettings = BTreeSet<NotificationSetting>;

/// A watched case's last-known classification, mirroring its push state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchState {
    Far,
    Near,
    VeryNear,
    Next,
    InSession,
    Completed,
}

/// The kind of push alert emitted by the `WatchlistProcessor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    EarlyWarning,
    Approaching,
    InSession,
    Completed,
}

impl AlertType {
    pub fn setting(self) -> NotificationSetting {
        match self {
            AlertType::EarlyWarning => NotificationSetting::EarlyWarning,
            AlertType::Approaching => NotificationSetting::Approaching,
            AlertType::InSession => NotificationSetting::InSession,
            AlertType::Completed => NotificationSetting::Completed,
        }
    }
}

/// Payload details accompanying an alert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertDetails {
    pub court_number: Option<String>,
    pub judge_name: Option<String>,
    pub position: Option<i32>,
    pub velocity: i32,
    pub stream_url: Option<String>,
}

/// A fully-formed alert ready for the push gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub device_id: String,
    pub case_number: String,
    pub alert_type: AlertType,
    pub details: AlertDetails,
}

/// One row of durable per-court case history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseHistoryEvent {
    pub case_number: String,
    pub status: CaseStatus,
    pub queue_position: Option<i32>,
    pub court_number: String,
    pub scraped_at: DateTime<Utc>,
}

/// A subscription to a case's position, with the state the
/// `WatchlistProcessor` mutates across ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watchlist {
    pub id: i64,
    pub device_id: String,
    pub case_number: String,
    pub notification_settings: NotificationSettings,
    pub last_seen_status: Option<WatchState>,
    pub last_seen_court: Option<String>,
    pub last_seen_position: Option<i32>,
    pub miss_count: i32,
    pub last_notification_time: Option<DateTime<Utc>>,
    pub active: bool,
}

/// A group of courts sharing a `courtNumber`, with the pending queue and
/// current case derived.
#[derive(Debug, Clone, Default)]
pub struct CourtQueue {
    pub pending: Vec<Court>,
    pub current_case: Option<Court>,
}

impl CourtQueue {
    /// 1-based rank of `case_number` in `pending`, or `None` if absent.
    pub fn position_of(&self, case_number: &str) -> Option<i32> {
        self.pending
            .iter()
            .position(|c| c.case_number.as_deref() == Some(case_number))
            .map(|idx| (idx + 1) as i32)
    }
}
