//! Domain event types.

use chrono::{DateTime, Utc};

use crate::ingest::model::{Alert, Court};

/// Unified enum for all domain events.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    Tick(TickEvent),
    CourtChanged(Court),
    CourtDelta(CourtDeltaEvent),
    AlertDispatched(Alert),
}

/// The batched `COURT_DELTA` broadcast: every court that changed this tick,
/// sent together rather than one `CourtChanged` event per court. Only
/// emitted when `courts` is non-empty.
#[derive(Debug, Clone)]
pub struct CourtDeltaEvent {
    pub courts: Vec<Court>,
    pub scraped_at: DateTime<Utc>,
}

/// One tick's lifecycle outcome, for the (external) WebSocket layer's
/// status feed.
#[derive(Debug, Clone)]
pub struct TickEvent {
    pub started_at: DateTime<Utc>,
    pub changed_courts: usize,
    pub outcome: TickOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Success,
    Failed { reason: String },
    Skipped,
}
