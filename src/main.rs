use clap::{Parser, Subcommand};
use diaflow::{
    api::{self, AppState},
    config::{self, AppConfig, database},
    core::alert,
    errors::Result,
};
use dotenvy::dotenv;
use sea_orm::DatabaseConnection;
use std::{net::SocketAddr, time::Duration};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "diaflow", version, about = "DiaFlow supply and kit service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Run one low-stock sweep over every supply item and exit
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Settings file plus environment overrides
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::init_db(&app_config.database.url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Sweep => {
            let report = alert::sweep_low_stock(&db, None).await?;
            info!(
                scanned = report.scanned,
                opened = report.opened,
                "Sweep complete"
            );
            Ok(())
        }
        Command::Serve => serve(db, app_config).await,
    }
}

fn spawn_periodic_sweep(db: DatabaseConnection, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = alert::sweep_low_stock(&db, None).await {
                error!(error = %e, "Periodic low-stock sweep failed");
            }
        }
    });
}

async fn serve(db: DatabaseConnection, app_config: AppConfig) -> Result<()> {
    if let Some(secs) = app_config.sweep.interval_secs.filter(|s| *s > 0) {
        info!(interval_secs = secs, "Periodic low-stock sweep enabled");
        spawn_periodic_sweep(db.clone(), Duration::from_secs(secs));
    }

    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    let app = api::router(AppState::new(db, app_config));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}
