//! Notification log persistence.
//!
//! Postgres has no native TTL index; 30-day retention is enforced by the
//! explicit `cleanup_expired` sweep the ingest service's daily peripheral
//! task calls.

use tracing::debug;

use crate::db::{DbContext, wire_str};
use crate::error::Result;
use crate::ingest::model::Alert;

pub struct NotificationOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> NotificationOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Records a dispatched alert. Dedup-indexed on
    /// `(device_id, case_number, notification_type, court_number)`; a
    /// duplicate is dropped rather than erroring.
    pub async fn log(&self, alert: &Alert, success: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_log (device_id, case_number, notification_type, court_number, sent_at, success)
            VALUES ($1, $2, $3, $4, NOW(), $5)
            ON CONFLICT (device_id, case_number, notification_type, (COALESCE(court_number, ''))) DO NOTHING
            "#,
        )
        .bind(&alert.device_id)
        .bind(&alert.case_number)
        .bind(wire_str(&alert.alert_type))
        .bind(&alert.details.court_number)
        .bind(success)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Deletes log rows older than 30 days. Run once a day.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notification_log WHERE sent_at < NOW() - INTERVAL '30 days'")
            .execute(self.ctx.pool())
            .await?;
        let deleted = result.rows_affected();
        debug!(deleted, "swept expired notification log rows");
        Ok(deleted)
    }
}
