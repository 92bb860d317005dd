//! Idempotent bulk history writes.
//!
//! Same UNNEST-based batch insert shape used elsewhere in this module, but
//! the conflict target is a pure `DO NOTHING` rather than `DO UPDATE`, since
//! a duplicate history row means the same state was already recorded.

use crate::db::{DbContext, wire_str};
use crate::error::Result;
use crate::ingest::model::CaseHistoryEvent;

pub struct HistoryOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> HistoryOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Bulk-inserts history events in one round trip. Tolerates duplicate
    /// conflicts on `(case_number, status, queue_position, court_number,
    /// scraped_at)` by discarding them; `queue_position` is coalesced so
    /// two null-position rows for the same case/status/court/time collide
    /// instead of both inserting.
    pub async fn bulk_insert(&self, events: &[CaseHistoryEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let case_numbers: Vec<&str> = events.iter().map(|e| e.case_number.as_str()).collect();
        let statuses: Vec<String> = events.iter().map(|e| wire_str(&e.status)).collect();
        let queue_positions: Vec<Option<i32>> = events.iter().map(|e| e.queue_position).collect();
        let court_numbers: Vec<&str> = events.iter().map(|e| e.court_number.as_str()).collect();
        let scraped_ats: Vec<chrono::DateTime<chrono::Utc>> =
            events.iter().map(|e| e.scraped_at).collect();

        sqlx::query(
            r#"
            INSERT INTO case_history (case_number, status, queue_position, court_number, scraped_at)
            SELECT v.case_number, v.status, v.queue_position, v.court_number, v.scraped_at
            FROM UNNEST($1::text[], $2::text[], $3::int4[], $4::text[], $5::timestamptz[])
                AS v(case_number, status, queue_position, court_number, scraped_at)
            ON CONFLICT (case_number, status, (COALESCE(queue_position, -1)), court_number, scraped_at)
            DO NOTHING
            "#,
        )
        .bind(&case_numbers)
        .bind(&statuses)
        .bind(&queue_positions)
        .bind(&court_numbers)
        .bind(&scraped_ats)
        .execute(self.ctx.pool())
        .await?;

        Ok(())
    }
}
