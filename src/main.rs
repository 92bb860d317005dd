use clap::Parser;
use std::process::ExitCode;

mod app;
mod cli;
mod config;
mod db;
mod error;
mod events;
mod ingest;
mod logging;
mod services;
mod signals;
mod status;
mod utils;

use app::App;
use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut app = match App::new().await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("failed to initialize application: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    logging::setup_logging(app.config(), args.tracing);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting docket-watch"
    );

    if let Err(e) = app.setup_services() {
        tracing::error!(error = ?e, "failed to set up services");
        return ExitCode::FAILURE;
    }

    app.start_services();
    app.run().await
}
