//! curfewd - daily screen-time enforcement for a networked TV
//!
//! This is the main entry point for the curfewd service.
//! It wires together all the components:
//! - Configuration loading
//! - Usage store
//! - Device client (TCP)
//! - Enforcement cycle on a fixed tick
//! - Status page

use anyhow::{Context, Result};
use clap::Parser;
use curfew_config::{Policy, load_config};
use curfew_core::{EnforcementCycle, LiveStatus, TickOutcome, status_channel};
use curfew_device::{DeviceClient, TcpDeviceClient};
use curfew_http::HttpState;
use curfew_store::{JsonFileStore, UsageStore};
use curfew_util::{default_config_path, format_datetime_full, is_mock_time_active};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// curfewd - Daily screen-time enforcement for a networked TV
#[derive(Parser, Debug)]
#[command(name = "curfewd")]
#[command(about = "Daily screen-time enforcement for a networked TV", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/curfew/config.toml)
    #[arg(short, long, env = "CURFEW_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Usage state file override (or set CURFEW_STATE_FILE env var)
    #[arg(short, long, env = "CURFEW_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Status page bind address override (or set CURFEW_BIND env var)
    #[arg(short, long, env = "CURFEW_BIND")]
    bind: Option<SocketAddr>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    cycle: EnforcementCycle,
    listener: TcpListener,
    http_state: HttpState,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let mut policy = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        if let Some(state_file) = &args.state_file {
            policy.service.state_file = state_file.clone();
        }
        if let Some(bind) = args.bind {
            policy.service.http_bind = bind;
        }

        info!(
            config_path = %args.config.display(),
            device = %policy.device.address,
            tick_seconds = policy.schedule.tick_seconds(),
            daily_budget_seconds = policy.schedule.daily_budget_seconds(),
            "Configuration loaded"
        );

        let store: Arc<dyn UsageStore> = Arc::new(JsonFileStore::new(&policy.service.state_file));
        let record = store.load(curfew_util::now());
        info!(
            state_file = %policy.service.state_file.display(),
            day = %record.day(),
            seconds_on = record.seconds_on,
            enabled = record.enabled,
            "Usage store initialized"
        );

        let device: Arc<dyn DeviceClient> = Arc::new(TcpDeviceClient::new(
            policy.device.address.clone(),
            policy.device.command_timeout,
        ));

        let (publisher, status) = status_channel(LiveStatus::from_record(
            &record,
            policy.schedule.daily_budget_seconds(),
        ));

        let http_state = HttpState::new(
            Arc::new(policy.clone()),
            store.clone(),
            device.clone(),
            status,
        );

        let listener = TcpListener::bind(policy.service.http_bind)
            .await
            .with_context(|| format!("Failed to bind status page to {}", policy.service.http_bind))?;

        let cycle = EnforcementCycle::new(policy, store, device, publisher);

        Ok(Self {
            cycle,
            listener,
            http_state,
        })
    }

    async fn run(self) -> Result<()> {
        let policy: &Policy = self.cycle.policy();

        // Spawn status page
        let addr = self.listener.local_addr()?;
        let router = curfew_http::router(self.http_state);
        let listener = self.listener;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "Status page server error");
            }
        });
        info!(addr = %addr, "Status page listening");

        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        // Main loop: one enforcement pass per tick, late ticks are dropped
        let mut tick_timer = tokio::time::interval(policy.schedule.tick);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                _ = tick_timer.tick() => {
                    let now = curfew_util::now();
                    match self.cycle.tick(now).await {
                        TickOutcome::DeviceOff => {
                            debug!(at = %format_datetime_full(&now), "Tick: device off");
                        }
                        TickOutcome::Enforced(decision) => {
                            debug!(
                                at = %format_datetime_full(&now),
                                power = ?decision.power,
                                remaining_seconds = decision.remaining_seconds,
                                "Tick: enforced"
                            );
                        }
                        TickOutcome::PersistFailed(e) => {
                            warn!(error = %e, "Tick: usage not persisted");
                        }
                    }
                }
            }
        }

        info!("Shutting down curfewd");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "curfewd starting"
    );

    if is_mock_time_active() {
        warn!(
            now = %format_datetime_full(&curfew_util::now()),
            "Mock time is active"
        );
    }

    // Create and run the service
    let service = Service::new(&args).await?;
    service.run().await
}
