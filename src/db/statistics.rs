//! Per-case statistics upsert.

use crate::db::DbContext;
use crate::error::Result;
use crate::ingest::model::CaseHistoryEvent;

const STATUS_HISTORY_CAP: i64 = 100;

pub struct StatisticsOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> StatisticsOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Upserts `case_statistics` for one history event: stamps `firstSeen`
    /// on first insert (left untouched afterwards), bumps `lastSeen` and
    /// `totalAppearances`, adds `courtNumber`/`judgeName` to set-valued
    /// fields, appends to `statusHistory` capped at the last 100 entries,
    /// and recomputes `watchCount` from the currently active watchlists.
    pub async fn record(&self, event: &CaseHistoryEvent, judge_name: Option<&str>) -> Result<()> {
        let status_entry = serde_json::json!({
            "status": event.status,
            "timestamp": event.scraped_at,
            "courtNumber": event.court_number,
            "queuePosition": event.queue_position,
        });

        sqlx::query(
            r#"
            INSERT INTO case_statistics (
                case_number, first_seen, last_seen, total_appearances,
                court_numbers, judge_names, status_history, watch_count
            )
            VALUES (
                $1, NOW(), NOW(), 1, ARRAY[$2]::text[], ARRAY[$3]::text[], jsonb_build_array($4::jsonb),
                (SELECT COUNT(*) FROM watchlists WHERE case_number = $1 AND active)
            )
            ON CONFLICT (case_number) DO UPDATE SET
                last_seen = NOW(),
                total_appearances = case_statistics.total_appearances + 1,
                court_numbers = (
                    SELECT ARRAY(SELECT DISTINCT unnest(case_statistics.court_numbers || ARRAY[$2]::text[]))
                ),
                judge_names = CASE WHEN $3 IS NULL THEN case_statistics.judge_names ELSE (
                    SELECT ARRAY(SELECT DISTINCT unnest(case_statistics.judge_names || ARRAY[$3]::text[]))
                ) END,
                status_history = (
                    SELECT jsonb_agg(elem) FROM (
                        SELECT elem FROM jsonb_array_elements(case_statistics.status_history || jsonb_build_array($4::jsonb)) AS elem
                        OFFSET GREATEST(
                            jsonb_array_length(case_statistics.status_history || jsonb_build_array($4::jsonb)) - $5::bigint, 0
                        )
                    ) AS capped
                ),
                watch_count = (SELECT COUNT(*) FROM watchlists WHERE case_number = $1 AND active)
            "#,
        )
        .bind(&event.case_number)
        .bind(&event.court_number)
        .bind(judge_name)
        .bind(&status_entry)
        .bind(STATUS_HISTORY_CAP)
        .execute(self.ctx.pool())
        .await?;

        Ok(())
    }
}
