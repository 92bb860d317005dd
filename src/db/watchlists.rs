//! Watchlist persistence.

use sqlx::FromRow;
use sqlx::types::Json;

use crate::db::DbContext;
use crate::error::Result;
use crate::ingest::model::{NotificationSettings, WatchState, Watchlist};

#[derive(FromRow)]
struct WatchlistRow {
    id: i64,
    device_id: String,
    case_number: String,
    notification_settings: Json<NotificationSettings>,
    last_seen_status: Option<String>,
    last_seen_court: Option<String>,
    last_seen_position: Option<i32>,
    miss_count: i32,
    last_notification_time: Option<chrono::DateTime<chrono::Utc>>,
    active: bool,
}

impl From<WatchlistRow> for Watchlist {
    fn from(row: WatchlistRow) -> Self {
        Watchlist {
            id: row.id,
            device_id: row.device_id,
            case_number: row.case_number,
            notification_settings: row.notification_settings.0,
            last_seen_status: row.last_seen_status.and_then(|s| parse_watch_state(&s)),
            last_seen_court: row.last_seen_court,
            last_seen_position: row.last_seen_position,
            miss_count: row.miss_count,
            last_notification_time: row.last_notification_time,
            active: row.active,
        }
    }
}

fn parse_watch_state(s: &str) -> Option<WatchState> {
    match s {
        "FAR" => Some(WatchState::Far),
        "NEAR" => Some(WatchState::Near),
        "VERY_NEAR" => Some(WatchState::VeryNear),
        "NEXT" => Some(WatchState::Next),
        "IN_SESSION" => Some(WatchState::InSession),
        "COMPLETED" => Some(WatchState::Completed),
        _ => None,
    }
}

fn watch_state_str(state: WatchState) -> &'static str {
    match state {
        WatchState::Far => "FAR",
        WatchState::Near => "NEAR",
        WatchState::VeryNear => "VERY_NEAR",
        WatchState::Next => "NEXT",
        WatchState::InSession => "IN_SESSION",
        WatchState::Completed => "COMPLETED",
    }
}

pub struct WatchlistOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> WatchlistOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// All active watchlists, processed sequentially by the WatchlistProcessor
    /// within a tick.
    pub async fn list_active(&self) -> Result<Vec<Watchlist>> {
        let rows = sqlx::query_as::<_, WatchlistRow>(
            "SELECT id, device_id, case_number, notification_settings, \
                    last_seen_status, last_seen_court, last_seen_position, \
                    miss_count, last_notification_time, active \
             FROM watchlists WHERE active = true",
        )
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows.into_iter().map(Watchlist::from).collect())
    }

    /// Persists a watchlist's mutated state after one tick's processing.
    pub async fn persist(&self, watchlist: &Watchlist) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE watchlists SET
                last_seen_status = $2,
                last_seen_court = $3,
                last_seen_position = $4,
                miss_count = $5,
                last_notification_time = $6
            WHERE id = $1
            "#,
        )
        .bind(watchlist.id)
        .bind(watchlist.last_seen_status.map(watch_state_str))
        .bind(&watchlist.last_seen_court)
        .bind(watchlist.last_seen_position)
        .bind(watchlist.miss_count)
        .bind(watchlist.last_notification_time)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Creates a new watchlist subscription (unique on `(deviceId, caseNumber)`
    /// while active).
    pub async fn create(
        &self,
        device_id: &str,
        case_number: &str,
        notification_settings: &NotificationSettings,
    ) -> Result<Watchlist> {
        let row = sqlx::query_as::<_, WatchlistRow>(
            r#"
            INSERT INTO watchlists (device_id, case_number, notification_settings, miss_count, active)
            VALUES ($1, $2, $3, 0, true)
            ON CONFLICT (device_id, case_number) WHERE active
            DO UPDATE SET notification_settings = EXCLUDED.notification_settings
            RETURNING id, device_id, case_number, notification_settings,
                      last_seen_status, last_seen_court, last_seen_position,
                      miss_count, last_notification_time, active
            "#,
        )
        .bind(device_id)
        .bind(case_number)
        .bind(Json(notification_settings))
        .fetch_one(self.ctx.pool())
        .await?;
        Ok(Watchlist::from(row))
    }

    /// Deactivates a watchlist subscription.
    pub async fn deactivate(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE watchlists SET active = false WHERE id = $1")
            .bind(id)
            .execute(self.ctx.pool())
            .await?;
        Ok(())
    }
}
