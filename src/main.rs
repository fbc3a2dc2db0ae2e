//! # Salon Reminders Entry Point
//!
//! `serve` (the default) runs migrations, the HTTP API and the daily
//! scheduler; `run-once` executes a single reminder cycle and exits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use tokio_util::sync::CancellationToken;

use reminders::{
    config::{AppConfig, ConfigLoader},
    db,
    gateway::{SenderIdentities, TwilioGateway},
    reminders::{CycleSettings, ReminderService},
    scheduler::ReminderScheduler,
    server::{AppState, run_server},
    telemetry,
};

#[derive(Debug, Parser)]
#[command(name = "reminders", version, about = "Occasion reminder notifications for salons")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API and the daily reminder scheduler
    Serve,
    /// Run one reminder cycle for today and exit
    RunOnce,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;
    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let config = Arc::new(config);
    let db = Arc::new(db::init_pool(&config).await?);
    Migrator::up(db.as_ref(), None)
        .await
        .context("failed to apply database migrations")?;

    let service = Arc::new(build_reminder_service(&config, db.clone())?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::RunOnce => {
            let summary = service.run_daily_cycle().await?;
            tracing::info!(
                sent = summary.sent,
                failed = summary.failed,
                skipped = summary.skipped,
                tenants_failed = summary.tenants_failed,
                "One-off reminder cycle finished"
            );
            Ok(())
        }
        Command::Serve => serve(config, db, service).await,
    }
}

fn build_reminder_service(
    config: &AppConfig,
    db: Arc<sea_orm::DatabaseConnection>,
) -> anyhow::Result<ReminderService> {
    let settings = CycleSettings::from(&config.reminders);
    let gateway = TwilioGateway::from_config(
        &config.gateway,
        Duration::from_secs(config.reminders.send_timeout_seconds),
    )?;

    Ok(ReminderService::new(
        db,
        Arc::new(gateway),
        SenderIdentities::from_config(&config.gateway),
        settings,
    ))
}

async fn serve(
    config: Arc<AppConfig>,
    db: Arc<sea_orm::DatabaseConnection>,
    service: Arc<ReminderService>,
) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let scheduler = ReminderScheduler::new(service.clone(), &config.reminders);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        signal_token.cancel();
    });

    let state = AppState {
        config,
        db,
        reminder_service: service,
    };
    let result = run_server(state, shutdown.clone()).await;

    shutdown.cancel();
    if let Err(err) = scheduler_handle.await {
        tracing::error!(error = ?err, "Reminder scheduler task ended abnormally");
    }

    result
}
