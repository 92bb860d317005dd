//! Database context with automatic event emission.

use sqlx::PgPool;
use std::sync::Arc;

use crate::db::courts::CourtOps;
use crate::db::devices::DeviceOps;
use crate::db::history::HistoryOps;
use crate::db::notifications::NotificationOps;
use crate::db::statistics::StatisticsOps;
use crate::db::watchlists::WatchlistOps;
use crate::events::EventBuffer;

/// Database context that wraps pool and event buffer.
///
/// All database operations that should emit events go through this context.
#[derive(Clone)]
pub struct DbContext {
    pool: PgPool,
    events: Arc<EventBuffer>,
}

impl DbContext {
    /// Create a new DbContext.
    pub fn new(pool: PgPool, events: Arc<EventBuffer>) -> Self {
        Self { pool, events }
    }

    /// Get the underlying database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the event buffer.
    pub fn events(&self) -> &EventBuffer {
        &self.events
    }

    /// Court snapshot operations.
    pub fn courts(&self) -> CourtOps<'_> {
        CourtOps::new(self)
    }

    /// Watchlist operations.
    pub fn watchlists(&self) -> WatchlistOps<'_> {
        WatchlistOps::new(self)
    }

    /// Case history operations.
    pub fn history(&self) -> HistoryOps<'_> {
        HistoryOps::new(self)
    }

    /// Case statistics operations.
    pub fn statistics(&self) -> StatisticsOps<'_> {
        StatisticsOps::new(self)
    }

    /// Notification log operations.
    pub fn notifications(&self) -> NotificationOps<'_> {
        NotificationOps::new(self)
    }

    /// Device push-token lookup.
    pub fn devices(&self) -> DeviceOps<'_> {
        DeviceOps::new(self)
    }
}
