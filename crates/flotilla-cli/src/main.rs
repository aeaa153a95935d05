//! Example framework scheduler built on the flotilla driver.
//!
//! Registers a framework with a master, logs every event the master
//! pushes, and runs until the master disconnects us or Ctrl-C is
//! pressed.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flotilla_driver::{DriverConfig, DriverState, SchedulerCallbacks, SchedulerDriver};
use flotilla_proto::{FrameworkId, FrameworkInfo};

/// Example framework scheduler for a flotilla master.
#[derive(Parser, Debug)]
#[command(name = "flotilla")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Master address as host:port.
    #[arg(long, env = "FLOTILLA_MASTER", default_value = "127.0.0.1:5050")]
    master: String,

    /// Framework name to register under.
    #[arg(long, default_value = "flotilla-framework")]
    name: String,

    /// User to run the framework as; defaults to the current user.
    #[arg(long, default_value = "")]
    user: String,

    /// Framework id to re-register with, if any.
    #[arg(long)]
    framework_id: Option<String>,

    /// Driver tuning options as a JSON file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Leave the framework registered on shutdown so a successor can
    /// take over.
    #[arg(long, default_value = "false")]
    failover: bool,
}

/// Callback table that logs every event it sees.
fn logging_callbacks() -> SchedulerCallbacks {
    SchedulerCallbacks {
        registered: Some(Box::new(|_, framework_id, master_info| {
            tracing::info!(
                framework_id = %framework_id.value,
                master = %master_info.id,
                "framework registered"
            );
        })),
        reregistered: Some(Box::new(|_, master_info| {
            tracing::info!(master = %master_info.id, "framework re-registered");
        })),
        resource_offers: Some(Box::new(|_, offers| {
            tracing::info!(count = offers.len(), "resource offers received");
            for offer in offers {
                tracing::info!(
                    offer_id = %offer.id.value,
                    hostname = %offer.hostname,
                    resources = offer.resources.len(),
                    "offer"
                );
            }
        })),
        offer_rescinded: Some(Box::new(|_, offer_id| {
            tracing::info!(offer_id = %offer_id.value, "offer rescinded");
        })),
        status_update: Some(Box::new(|_, status| {
            tracing::info!(
                task_id = %status.task_id.value,
                state = ?status.state(),
                "task status update"
            );
        })),
        slave_lost: Some(Box::new(|_, slave_id| {
            tracing::warn!(slave_id = %slave_id.value, "slave lost");
        })),
        error: Some(Box::new(|_, error| {
            tracing::error!(%error, "scheduler error");
        })),
        ..SchedulerCallbacks::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,flotilla_driver=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => DriverConfig::default(),
    };

    let framework = FrameworkInfo::new(
        args.user,
        args.name,
        args.framework_id.map(FrameworkId::new),
    );
    tracing::info!(
        master = %args.master,
        framework = %framework.name,
        "starting framework scheduler"
    );

    let driver = SchedulerDriver::with_config(logging_callbacks(), framework, args.master, config)?;

    let final_state = tokio::select! {
        state = driver.run() => state,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            driver.stop(args.failover).await
        }
    };

    if final_state != DriverState::Stopped {
        anyhow::bail!("driver finished as {final_state}");
    }
    tracing::info!("driver stopped cleanly");
    Ok(())
}
