//! The ingest pipeline service: Scheduler → Fetcher → Parser → DeltaEngine
//! → (Historian ‖ QueueBuilder → WatchlistProcessor → gateway/broadcaster).

pub mod broadcast;
pub mod delta;
pub mod fetcher;
pub mod gateway;
pub mod historian;
pub mod model;
pub mod parser;
pub mod queue;
pub mod scheduler;
pub mod watchlist;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Asia::Kolkata;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration as TokioDuration, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::db::DbContext;
use crate::events::{CourtDeltaEvent, DomainEvent, TickEvent, TickOutcome};
use crate::ingest::broadcast::Broadcaster;
use crate::ingest::delta::DeltaEngine;
use crate::ingest::fetcher::{ConditionalState, FetchOutcome, Fetcher};
use crate::ingest::gateway::{PushGateway, PushNotification};
use crate::ingest::historian::Historian;
use crate::ingest::model::{Alert, AlertType, Court, CourtQueue};
use crate::ingest::scheduler::{Gate, SchedulerState};
use crate::services::Service;
use crate::status::{ServiceStatus, ServiceStatusRegistry};

const SNAPSHOT_INTERVAL: TokioDuration = TokioDuration::from_secs(5 * 60);
const CLEANUP_HOUR: u32 = 2;

pub struct IngestService {
    db: DbContext,
    fetcher: Fetcher,
    conditional_state: ConditionalState,
    delta_engine: DeltaEngine,
    historian: Historian,
    scheduler_state: SchedulerState,
    gateway: Arc<dyn PushGateway>,
    broadcaster: Arc<dyn Broadcaster>,
    statuses: ServiceStatusRegistry,
    tick_interval: TokioDuration,
    cancellation: CancellationToken,
    last_cleanup_date: Option<chrono::NaiveDate>,
}

impl IngestService {
    pub fn new(
        db: DbContext,
        court_base_url: String,
        court_xhr_url: String,
        tick_interval: TokioDuration,
        gateway: Arc<dyn PushGateway>,
        broadcaster: Arc<dyn Broadcaster>,
        statuses: ServiceStatusRegistry,
    ) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new(court_base_url, court_xhr_url)?;
        Ok(Self {
            db,
            fetcher,
            conditional_state: ConditionalState::default(),
            delta_engine: DeltaEngine::new(),
            historian: Historian::new(),
            scheduler_state: SchedulerState::new(),
            gateway,
            broadcaster,
            statuses,
            tick_interval,
            cancellation: CancellationToken::new(),
            last_cleanup_date: None,
        })
    }

    async fn maybe_tick(&mut self) -> anyhow::Result<()> {
        let now = Utc::now();
        match self.scheduler_state.evaluate(now) {
            Gate::Run => {}
            gate => {
                debug!(?gate, "tick skipped");
                return Ok(());
            }
        }

        self.scheduler_state.enter(now);
        let result = self.run_tick(now).await;
        self.scheduler_state.finish(Utc::now(), result.is_err());
        result
    }

    async fn run_tick(&mut self, started_at: DateTime<Utc>) -> anyhow::Result<()> {
        let outcome = self.fetcher.fetch(&mut self.conditional_state).await?;
        let (rows, html) = match outcome {
            // A 304 short-circuits the tick entirely: no downstream work, no broadcast.
            FetchOutcome::NotModified => return Ok(()),
            FetchOutcome::Fresh { rows, html } => (rows, html),
        };

        let base_url = self.fetcher.base_url().to_string();
        let courts = crate::ingest::parser::parse_courts(&rows, &html, &base_url);
        let delta = self.delta_engine.process(courts, &html);

        let mut all_courts = delta.changed.clone();
        all_courts.extend(delta.unchanged.iter().cloned());

        let queues = crate::ingest::queue::build_queues(&all_courts);

        let history_events = self.historian.process(&all_courts);
        if !history_events.is_empty() {
            self.db.history().bulk_insert(&history_events).await?;
            for event in &history_events {
                let judge_name = all_courts
                    .iter()
                    .find(|c| c.court_number.as_deref() == Some(event.court_number.as_str()))
                    .and_then(|c| c.judge_name.as_deref());
                self.db.statistics().record(event, judge_name).await?;
            }
        }

        self.db.courts().upsert_tick(&all_courts, &delta.changed).await?;
        if !delta.missing_court_codes.is_empty() {
            self.db.courts().mark_missing(&delta.missing_court_codes).await?;
        }

        self.process_watchlists(&all_courts, &queues).await;

        if !delta.changed.is_empty() {
            self.broadcaster.broadcast(DomainEvent::CourtDelta(CourtDeltaEvent {
                courts: delta.changed.clone(),
                scraped_at: started_at,
            }));
        }

        self.broadcaster.broadcast(DomainEvent::Tick(TickEvent {
            started_at,
            changed_courts: delta.changed.len(),
            outcome: TickOutcome::Success,
        }));

        Ok(())
    }

    /// Sequential per-watchlist processing: one watchlist's
    /// failure is logged and swallowed so the rest still run.
    async fn process_watchlists(&self, all_courts: &[Court], queues: &HashMap<String, CourtQueue>) {
        let watchlists = match self.db.watchlists().list_active().await {
            Ok(w) => w,
            Err(e) => {
                error!(error = ?e, "failed to load watchlists, skipping this tick's processing");
                return;
            }
        };

        let courts_by_case: HashMap<String, &Court> = all_courts
            .iter()
            .filter_map(|c| c.case_number.as_ref().map(|n| (n.clone(), c)))
            .collect();

        for watchlist in watchlists {
            let case_number = watchlist.case_number.clone();
            let outcome = crate::ingest::watchlist::process(&watchlist, &courts_by_case, queues, Utc::now());

            if let Err(e) = self.db.watchlists().persist(&outcome.watchlist).await {
                warn!(case_number, error = ?e, "failed to persist watchlist, continuing");
                continue;
            }

            if let Some(alert) = outcome.alert {
                if let Err(e) = self.dispatch_alert(&alert).await {
                    warn!(case_number, error = ?e, "failed to dispatch alert, continuing");
                }
            }
        }
    }

    async fn dispatch_alert(&self, alert: &Alert) -> anyhow::Result<()> {
        let token = self.db.devices().push_token(&alert.device_id).await?;
        let Some(token) = token else {
            self.db.notifications().log(alert, false).await?;
            return Ok(());
        };

        let notification = PushNotification {
            title: alert_title(alert.alert_type, &alert.case_number),
            body: alert_body(alert),
        };
        let data = serde_json::to_value(&alert.details)?;

        let send_result = self.gateway.send(&token, notification, data).await;
        self.db.notifications().log(alert, send_result.is_ok()).await?;

        if send_result.is_ok() {
            self.broadcaster
                .broadcast(DomainEvent::AlertDispatched(alert.clone()));
        }

        send_result.map_err(anyhow::Error::from)
    }

    async fn run_peripherals(&self, now: DateTime<Utc>) {
        if let Err(e) = self.db.courts().write_snapshot_cache().await {
            warn!(error = ?e, "snapshot cache write failed");
        }

        let local_date = now.with_timezone(&Kolkata).date_naive();
        if now.with_timezone(&Kolkata).hour() == CLEANUP_HOUR
            && self.last_cleanup_date != Some(local_date)
        {
            match self.db.notifications().cleanup_expired().await {
                Ok(deleted) => info!(deleted, "daily notification log cleanup ran"),
                Err(e) => warn!(error = ?e, "daily cleanup failed"),
            }
        }
    }
}

fn alert_title(alert_type: AlertType, case_number: &str) -> String {
    match alert_type {
        AlertType::EarlyWarning => format!("⚠️ Case Approaching - {case_number}"),
        AlertType::Approaching => format!("🔔 Case Next - {case_number}"),
        AlertType::InSession => format!("⚖️ Case Started - {case_number}"),
        AlertType::Completed => format!("✅ Case Completed - {case_number}"),
    }
}

fn alert_body(alert: &Alert) -> String {
    let court_number = alert.details.court_number.as_deref().unwrap_or("?");
    match alert.alert_type {
        AlertType::EarlyWarning => {
            let position = alert.details.position.map_or(String::new(), |p| p.to_string());
            format!("Your case is {position} cases away in Court {court_number}")
        }
        AlertType::Approaching => format!("Your case is next in line in Court {court_number}"),
        AlertType::InSession => match &alert.details.judge_name {
            Some(judge_name) => {
                format!("Your case is now IN SESSION in Court {court_number} - {judge_name}")
            }
            None => format!("Your case is now IN SESSION in Court {court_number}"),
        },
        AlertType::Completed => format!("Your case hearing has ended in Court {court_number}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::model::AlertDetails;

    fn alert(alert_type: AlertType, details: AlertDetails) -> Alert {
        Alert {
            device_id: "device-1".to_string(),
            case_number: "SCA/1/2024".to_string(),
            alert_type,
            details,
        }
    }

    #[test]
    fn early_warning_title_and_body_include_position() {
        let title = alert_title(AlertType::EarlyWarning, "SCA/1/2024");
        assert_eq!(title, "⚠️ Case Approaching - SCA/1/2024");

        let a = alert(
            AlertType::EarlyWarning,
            AlertDetails {
                court_number: Some("5".to_string()),
                position: Some(7),
                ..Default::default()
            },
        );
        assert_eq!(alert_body(&a), "Your case is 7 cases away in Court 5");
    }

    #[test]
    fn in_session_body_appends_judge_name_when_known() {
        let a = alert(
            AlertType::InSession,
            AlertDetails {
                court_number: Some("5".to_string()),
                judge_name: Some("J. Smith".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(alert_body(&a), "Your case is now IN SESSION in Court 5 - J. Smith");
    }

    #[test]
    fn completed_alert_with_no_court_data_falls_back() {
        let a = alert(AlertType::Completed, AlertDetails::default());
        assert_eq!(alert_title(AlertType::Completed, "SCA/1/2024"), "✅ Case Completed - SCA/1/2024");
        assert_eq!(alert_body(&a), "Your case hearing has ended in Court ?");
    }
}

#[async_trait]
impl Service for IngestService {
    fn name(&self) -> &'static str {
        "ingest"
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        self.statuses.set(self.name(), ServiceStatus::Active);
        let mut ticker = interval(self.tick_interval);
        let mut snapshot_ticker = interval(SNAPSHOT_INTERVAL);
        let cancellation = self.cancellation.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.maybe_tick().await {
                        error!(error = ?e, "tick failed");
                        self.statuses.set(self.name(), ServiceStatus::Error);
                    } else {
                        self.statuses.set(self.name(), ServiceStatus::Active);
                    }
                }
                _ = snapshot_ticker.tick() => {
                    self.run_peripherals(Utc::now()).await;
                }
                _ = cancellation.cancelled() => {
                    info!("ingest service cancelled");
                    return Ok(());
                }
            }
        }
    }

    async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.cancellation.cancel();
        self.statuses.set(self.name(), ServiceStatus::Disabled);
        Ok(())
    }
}
