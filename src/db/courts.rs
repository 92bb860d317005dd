//! Durable per-court snapshot operations with automatic event emission.

use sqlx::FromRow;
use tracing::debug;

use crate::db::DbContext;
use crate::error::Result;
use crate::events::DomainEvent;
use crate::ingest::delta::DeltaEngine;
use crate::ingest::model::Court;

const VISIBILITY_MISS_THRESHOLD: i32 = 3;

#[derive(Debug, FromRow)]
pub struct CourtSnapshotRow {
    pub court_code: String,
    pub data: serde_json::Value,
    pub data_hash: String,
    pub checked_at: chrono::DateTime<chrono::Utc>,
    pub changed_at: chrono::DateTime<chrono::Utc>,
    pub missing_count: i32,
    pub is_visible: bool,
}

pub struct CourtOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> CourtOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Upserts this tick's courts. `changed_at` only advances when
    /// `data_hash` differs from the stored value; otherwise only
    /// `checked_at` moves. `missing_count` resets to 0 and `is_visible`
    /// becomes true for every court present this tick.
    ///
    /// Emits `DomainEvent::CourtChanged` only for courts in `changed`
    /// (the in-memory signature changed this tick), not every upsert.
    pub async fn upsert_tick(&self, all_courts: &[Court], changed: &[Court]) -> Result<()> {
        if all_courts.is_empty() {
            return Ok(());
        }

        let court_codes: Vec<&str> = all_courts.iter().map(|c| c.court_code.as_str()).collect();
        let data: Vec<serde_json::Value> = all_courts.iter().map(Court::canonical_json).collect();
        let data_hashes: Vec<String> = all_courts.iter().map(DeltaEngine::data_hash).collect();

        sqlx::query(
            r#"
            INSERT INTO court_snapshots (court_code, data, data_hash, checked_at, changed_at, missing_count, is_visible)
            SELECT v.court_code, v.data, v.data_hash, NOW(), NOW(), 0, true
            FROM UNNEST($1::text[], $2::jsonb[], $3::text[]) AS v(court_code, data, data_hash)
            ON CONFLICT (court_code) DO UPDATE SET
                data = EXCLUDED.data,
                data_hash = EXCLUDED.data_hash,
                checked_at = NOW(),
                changed_at = CASE
                    WHEN court_snapshots.data_hash IS DISTINCT FROM EXCLUDED.data_hash
                    THEN NOW() ELSE court_snapshots.changed_at
                END,
                missing_count = 0,
                is_visible = true
            "#,
        )
        .bind(&court_codes)
        .bind(&data)
        .bind(&data_hashes)
        .execute(self.ctx.pool())
        .await?;

        for court in changed {
            debug!(court_code = court.court_code, "emitting CourtChanged event");
            self.ctx
                .events()
                .publish(DomainEvent::CourtChanged(court.clone()));
        }

        Ok(())
    }

    /// Applies missing-court hysteresis: each code absent this
    /// tick gets `missing_count += 1`; `is_visible := missing_count < 3`.
    pub async fn mark_missing(&self, court_codes: &[String]) -> Result<()> {
        if court_codes.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE court_snapshots
            SET missing_count = missing_count + 1,
                is_visible = (missing_count + 1) < $2
            WHERE court_code = ANY($1)
            "#,
        )
        .bind(court_codes)
        .bind(VISIBILITY_MISS_THRESHOLD)
        .execute(self.ctx.pool())
        .await?;

        Ok(())
    }

    /// Reads the full durable court view, used by the peripheral 5-minute
    /// snapshot task.
    pub async fn snapshot_all(&self) -> Result<Vec<CourtSnapshotRow>> {
        let rows = sqlx::query_as::<_, CourtSnapshotRow>(
            "SELECT court_code, data, data_hash, checked_at, changed_at, missing_count, is_visible \
             FROM court_snapshots",
        )
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows)
    }

    /// Writes the single-row warm/stale-fallback blob the read API serves
    /// when it can't reach the live pipeline.
    pub async fn write_snapshot_cache(&self) -> Result<()> {
        let rows = self.snapshot_all().await?;
        let payload = serde_json::to_value(
            rows.into_iter()
                .map(|r| (r.court_code, r.data))
                .collect::<std::collections::HashMap<_, _>>(),
        )?;

        sqlx::query(
            r#"
            INSERT INTO court_snapshot_cache (id, payload, updated_at)
            VALUES (1, $1, NOW())
            ON CONFLICT (id) DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW()
            "#,
        )
        .bind(&payload)
        .execute(self.ctx.pool())
        .await?;

        Ok(())
    }
}
