use std::process::ExitCode;
use std::sync::Arc;
use anyhow::{Result, Context};
use crate::config::AppSettings;
use clap::Parser;
use crate::monitor::{MonitorService, RunOutcome};
use crate::telegram::TelegramClient;
use crate::x_api::XApiClient;
use tracing_subscriber::EnvFilter;
use tracing::{info, error};

mod config;
mod dedup;
mod formatter;
mod models;
mod monitor;
mod state;
mod telegram;
mod trends;
mod x_api;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();
}

async fn run() -> Result<()> {
    // Parse command line arguments and environment variables
    let app_settings = AppSettings::parse();
    init_logging(&app_settings.log_level);

    let app_settings = config::validate(app_settings)
        .with_context(|| "Failed to load configuration")?;

    info!("Starting xmonitor...");

    // Fail before any network call if a credential is missing
    let credentials = app_settings.require_credentials()?;

    let x_client = XApiClient::new(&app_settings.x_api_url, &credentials)
        .with_context(|| "Failed to create X API client")?;
    let telegram_client = TelegramClient::new(&app_settings.telegram_api_url, &credentials)
        .with_context(|| "Failed to create Telegram client")?;

    let monitor = MonitorService::new(
        Arc::new(x_client),
        Arc::new(telegram_client),
        Arc::new(app_settings),
    );

    match monitor.run_once().await? {
        RunOutcome::Quiet => info!("Run finished without news."),
        RunOutcome::DryRun(digest) => println!("{}", digest.text),
        RunOutcome::Delivered(digest) => info!(
            "Run finished: delivered {} of {} new items.",
            digest.rendered_items,
            digest.rendered_items + digest.omitted_items
        ),
    }

    Ok(())
}
