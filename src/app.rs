use crate::config::Config;
use crate::db::DbContext;
use crate::events::EventBuffer;
use crate::ingest::IngestService;
use crate::ingest::broadcast::EventBufferBroadcaster;
use crate::ingest::gateway::{HttpPushGateway, NoopPushGateway, PushGateway};
use crate::services::manager::ServiceManager;
use crate::status::ServiceStatusRegistry;
use anyhow::Context;
use figment::value::UncasedStr;
use figment::{Figment, providers::Env};
use sqlx::postgres::PgPoolOptions;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    db: DbContext,
    events: Arc<EventBuffer>,
    statuses: ServiceStatusRegistry,
    service_manager: ServiceManager,
}

impl App {
    /// Create a new App instance with all necessary components initialized
    pub async fn new() -> Result<Self, anyhow::Error> {
        // Load configuration
        let config: Config = Figment::new()
            .merge(Env::raw().map(|k| {
                if k == UncasedStr::new("RAILWAY_DEPLOYMENT_DRAINING_SECONDS") {
                    "SHUTDOWN_TIMEOUT".into()
                } else {
                    k.into()
                }
            }))
            .extract()
            .context("Failed to load config")?;

        // Check if the database URL is via private networking
        let is_private = config.database_url.contains("railway.internal");
        let slow_threshold = Duration::from_millis(if is_private { 200 } else { 500 });

        // Create database connection pool
        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(4)
            .acquire_slow_threshold(slow_threshold)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect(&config.database_url)
            .await
            .context("Failed to create database pool")?;

        info!(
            is_private = is_private,
            slow_threshold = format!("{:.2?}", slow_threshold),
            "database pool established"
        );

        // Run database migrations
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed successfully");

        let events = Arc::new(EventBuffer::new(1024));
        let db = DbContext::new(db_pool, events.clone());

        Ok(App {
            config,
            db,
            events,
            statuses: ServiceStatusRegistry::new(),
            service_manager: ServiceManager::new(),
        })
    }

    /// Register the ingest service, unless disabled via configuration.
    pub fn setup_services(&mut self) -> Result<(), anyhow::Error> {
        if !self.config.enable_scraper {
            info!("ingest service disabled via configuration");
            return Ok(());
        }

        let gateway: Arc<dyn PushGateway> = if self.config.has_push_gateway() {
            Arc::new(HttpPushGateway::new(
                self.config.push_gateway_endpoint.clone().unwrap(),
                self.config.push_gateway_api_key.clone().unwrap(),
            )?)
        } else {
            Arc::new(NoopPushGateway)
        };

        let broadcaster = Arc::new(EventBufferBroadcaster::new(self.events.clone()));

        let ingest_service = Box::new(IngestService::new(
            self.db.clone(),
            self.config.court_base_url.clone(),
            self.config.court_xhr_url.clone(),
            self.config.scraper_interval,
            gateway,
            broadcaster,
            self.statuses.clone(),
        )?);

        self.service_manager.register_service("ingest", ingest_service);

        Ok(())
    }

    /// Start all registered services
    pub fn start_services(&mut self) {
        self.service_manager.spawn_all();
    }

    /// Run the application and handle shutdown signals
    pub async fn run(self) -> ExitCode {
        use crate::signals::handle_shutdown_signals;
        handle_shutdown_signals(self.service_manager, self.config.shutdown_timeout).await
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
