//! Process entry point: loads configuration, wires every subsystem onto
//! the shared message fabric, and runs until a shutdown signal arrives.
//! Grounded in `uwb-simulator/src/main.rs`'s `#[tokio::main]` + clap +
//! tracing-subscriber startup sequence.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use lawnberry_safety_core::boundary::BoundaryMonitor;
use lawnberry_safety_core::clock::Clock;
use lawnberry_safety_core::config::{AppConfig, EnvConfig};
use lawnberry_safety_core::emergency::EmergencyController;
use lawnberry_safety_core::error::exit_code;
use lawnberry_safety_core::fabric::MessageFabric;
use lawnberry_safety_core::heartbeat;
use lawnberry_safety_core::localization::LocalizationEngine;
use lawnberry_safety_core::maintenance::MaintenanceSupervisor;
use lawnberry_safety_core::obstacles::ObstacleEngine;
use lawnberry_safety_core::safety::SafetySupervisor;
use lawnberry_safety_core::telemetry::{health, TelemetryAggregator};

#[derive(Parser, Debug)]
#[command(name = "lawnberry-safety-core", about = "Lawnberry autonomous mower safety core")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
    /// Force simulation mode regardless of SIM_MODE
    #[arg(long)]
    sim: bool,
    /// Health endpoint port
    #[arg(long, default_value = "8080")]
    health_port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lawnberry_safety_core=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load configuration");
            std::process::exit(exit_code::CONFIG_ERROR);
        }
    };

    let env = EnvConfig::from_env();
    let sim_mode = args.sim || env.sim_mode;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        device_model = ?env.device_model,
        sim_mode,
        "lawnberry-safety-core starting"
    );

    let clock = Clock::start();
    let started_at = clock.now();
    let fabric = MessageFabric::new(clock.clone(), &config.fabric);

    let safety = Arc::new(SafetySupervisor::new(config.safety.clone(), started_at));
    let emergency = Arc::new(EmergencyController::new(config.emergency.clone(), started_at));
    let boundary = Arc::new(BoundaryMonitor::new(config.safety.boundary.clone()));
    let maintenance = Arc::new(MaintenanceSupervisor::new(config.safety.clone()));
    let obstacles = Arc::new(ObstacleEngine::new(config.safety.obstacle.clone()));
    let localization = Arc::new(LocalizationEngine::new());
    let telemetry = Arc::new(TelemetryAggregator::new(started_at, env.device_model.telemetry_publish_hz()));

    tokio::spawn(safety.clone().run(fabric.clone(), clock.clone()));
    tokio::spawn(emergency.clone().run(fabric.clone(), clock.clone()));
    tokio::spawn(boundary.clone().run(fabric.clone(), clock.clone(), Some(safety.clone())));
    tokio::spawn(maintenance.clone().run(fabric.clone(), clock.clone()));
    tokio::spawn(obstacles.clone().run(fabric.clone(), clock.clone()));
    tokio::spawn(localization.clone().run(fabric.clone(), clock.clone()));
    tokio::spawn(telemetry.clone().run(fabric.clone(), clock.clone()));
    tokio::spawn(heartbeat::run(fabric.clone(), clock.clone()));

    let health_telemetry = telemetry.clone();
    let health_clock = clock.clone();
    let health_port = args.health_port;
    tokio::spawn(async move {
        if let Err(err) = health::serve(health_telemetry, health_clock, health_port).await {
            error!(%err, "health endpoint exited");
        }
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("shutdown signal received, exiting");
            std::process::exit(exit_code::SIGINT);
        }
        Err(err) => {
            error!(%err, "failed to install signal handler");
            std::process::exit(exit_code::FATAL_INIT);
        }
    }
}
