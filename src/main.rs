//! # Vessel Helm
//!
//! Command arbitration and E-stop interlock for an autonomous / RC surface
//! vessel.
//!
//! Sits between the RC receiver, the E-stop button, the autonomy computer's
//! serial link, the four propulsion actuators and the indicator tower, and
//! decides every cycle who is in control.

use anyhow::{Context, Result};
use rppal::gpio::Gpio;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use vessel_helm::actuator::{CalibrationSequence, Uncalibrated};
use vessel_helm::config::{Config, LoggingConfig};
use vessel_helm::control::{ControlInputs, ControlLoop};
use vessel_helm::hardware::{RpiActuators, RpiEstopButton, RpiPulseInput};
use vessel_helm::link::command_channel;
use vessel_helm::serial::{serve_autonomy_link, IndicatorLink};
use vessel_helm::telemetry::{spawn_writer, TelemetryLogger};

/// Used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside `[logging].file_dir`
const LOG_FILE_PREFIX: &str = "vessel-helm.log";

/// Installs stdout logging and, if configured, a daily rolling log file.
///
/// The returned guard must live until exit so buffered file output is
/// flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Resolves when Ctrl+C is received. If the signal handler cannot be
/// installed the loop keeps running.
async fn wait_for_shutdown() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Main entry point
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging
///    - Calibrate the servos and ESCs; nothing is read before this completes
///    - Open the E-stop pin, receiver inputs and indicator tower
///    - Start the autonomy link receiver task
///
/// 2. **Main Loop**
///    - Arbitrate and drive the actuators at `[control].loop_rate_hz`
///
/// 3. **Graceful Shutdown**
///    - Thrusters to still, red indicator if the rate limit allows
///
/// # Errors
///
/// Returns error if configuration, GPIO or the indicator port cannot be set
/// up, if calibration fails, or if the final stop write fails.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("Vessel Helm v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let gpio = Gpio::new().context("Failed to open GPIO")?;

    let actuators = RpiActuators::new(&gpio, &config.actuators)?;
    let output = Uncalibrated::new(actuators)
        .calibrate(&CalibrationSequence::from_config(&config))
        .await
        .context("Actuator calibration failed")?;

    let button = RpiEstopButton::new(&gpio, &config.safety)?;
    let receiver = RpiPulseInput::new(&gpio, &config.receiver)?;
    let indicator = IndicatorLink::open(&config.indicator)?;

    let (publisher, commands) = command_channel();
    let link_task = tokio::spawn(serve_autonomy_link(
        config.autonomy_link.clone(),
        publisher,
    ));

    let mut control = ControlLoop::new(
        &config,
        ControlInputs {
            button: Box::new(button),
            receiver: Box::new(receiver),
            commands,
        },
        output,
        indicator,
    );

    let mut telemetry_task = None;
    if config.telemetry.enabled {
        match TelemetryLogger::new(&config.telemetry) {
            Ok(logger) => {
                let (sender, handle) = spawn_writer(logger);
                control = control.with_telemetry(sender);
                telemetry_task = Some(handle);
            }
            Err(e) => warn!("Telemetry disabled: {}", e),
        }
    }

    info!("Press Ctrl+C to exit");
    let result = control.run(wait_for_shutdown()).await;
    link_task.abort();
    if let Some(handle) = telemetry_task {
        if let Err(e) = handle.await {
            warn!("Telemetry writer failed: {}", e);
        }
    }
    result?;

    info!("Vessel Helm stopped");
    Ok(())
}
