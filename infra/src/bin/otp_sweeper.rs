//! Expired OTP record sweeper
//!
//! Periodically deletes `otp_codes` rows that expired longer ago than the
//! configured retention. Runs until interrupted.

use anyhow::Context;
use std::sync::Arc;

use otp_infra::OtpInfrastructure;
use otp_shared::{logging::init_tracing, AppConfig, Environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::from_filename(Environment::from_env().env_file()).ok();
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialize logging")?;

    tracing::info!(
        interval_seconds = config.otp.sweep_interval_seconds,
        retention_seconds = config.otp.sweep_retention_seconds,
        "Starting OTP sweeper"
    );

    let infrastructure = OtpInfrastructure::connect(&config)
        .await
        .context("failed to connect OTP infrastructure")?;

    infrastructure
        .health_check()
        .await
        .context("database health check failed")?;

    let cleanup = Arc::new(infrastructure.cleanup_service());

    let handle = match cleanup.start_background_task() {
        Some(handle) => handle,
        None => {
            tracing::warn!("OTP sweep disabled (OTP_SWEEP_INTERVAL_SECONDS=0), exiting");
            infrastructure.shutdown().await;
            return Ok(());
        }
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("Shutdown signal received, stopping OTP sweeper");
    handle.abort();
    infrastructure.shutdown().await;

    Ok(())
}
