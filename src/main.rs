//! # VE.Direct Bridge
//!
//! Decode Victron VE.Direct text telemetry into SI-unit measurements.
//!
//! This application reads a battery monitor or solar charge controller over
//! its VE.Direct serial port, validates every block and logs the committed
//! values.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use vedirect_bridge::config::{Config, LoggingConfig};
use vedirect_bridge::error::VeDirectBridgeError;
use vedirect_bridge::serial::{run_reader, VeDirectSerial, DEFAULT_DEVICE_PATHS};
use vedirect_bridge::telemetry::logger::TelemetryLogger;
use vedirect_bridge::telemetry::run_telemetry;
use vedirect_bridge::vedirect::decoder::VeDirectDecoder;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log filter used when `RUST_LOG` is unset or invalid
const DEFAULT_LOG_FILTER: &str = "info";

/// Main entry point for VE.Direct Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging with tracing subscriber
///    - Create the decoder and, if enabled, the telemetry logger task
///
/// 2. **Main Loop**
///    - Open the serial port (auto-detect if no port is configured)
///    - Feed received bytes to the decoder, dump status periodically
///    - Reconnect after `reconnect_interval_ms` when the device goes away
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C stops the reader
///    - Log decoder statistics
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or the telemetry
/// directory cannot be created.
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config_exists = Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path))?
    } else {
        Config::default()
    };

    let _log_guard = init_logging(&config.logging);

    info!("VE.Direct Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    if !config_exists {
        warn!("Configuration {} not found, using defaults", config_path);
    }

    let mut decoder = VeDirectDecoder::with_mode(config.decoder.mode);
    info!("Decoder mode: {:?}", decoder.value_mode());

    if config.telemetry.enabled {
        let logger = TelemetryLogger::from_config(&config.telemetry)
            .context("Failed to initialize telemetry logger")?;
        tokio::spawn(run_telemetry(decoder.subscribe_commits(), logger));
        info!("Telemetry logging enabled in {}", config.telemetry.log_dir);
    }

    let status_interval = Duration::from_millis(config.decoder.status_interval_ms);
    let reconnect_interval = Duration::from_millis(config.serial.reconnect_interval_ms);

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            result = run_session(&config, &mut decoder, status_interval) => {
                match result {
                    Err(VeDirectBridgeError::SerialDisconnected) => warn!("VE.Direct device disconnected"),
                    Err(e) => warn!("Serial session ended: {}", e),
                    Ok(()) => {}
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }

        tokio::select! {
            _ = sleep(reconnect_interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let stats = decoder.stats();
    info!(
        "Blocks committed: {}, rejected: {}, sync losses: {}",
        stats.blocks_committed, stats.blocks_rejected, stats.sync_losses
    );

    Ok(())
}

/// One serial connection: open the port and decode until it goes away
async fn run_session(
    config: &Config,
    decoder: &mut VeDirectDecoder,
    status_interval: Duration,
) -> vedirect_bridge::error::Result<()> {
    let mut serial = open_serial(config)?;
    info!("VE.Direct serial port opened at: {}", serial.device_path());

    run_reader(serial.stream(), decoder, status_interval, std::future::pending()).await
}

/// Open the configured port, or auto-detect when none is configured
fn open_serial(config: &Config) -> vedirect_bridge::error::Result<VeDirectSerial> {
    if config.serial.port.is_empty() {
        VeDirectSerial::open_with_paths(DEFAULT_DEVICE_PATHS, config.serial.baud_rate)
    } else {
        VeDirectSerial::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)
    }
}

/// `RUST_LOG` directives, or `info` when they are missing or invalid
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Initialize logging: stdout always, plus a daily rolling file if configured
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref());
    let stdout = tracing_subscriber::fmt::layer();

    if logging.file.is_empty() {
        tracing_subscriber::registry().with(filter).with(stdout).init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&logging.file, "vedirect-bridge.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .init();

    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_log_filter_honors_global_level() {
        // A global debug level must reach the periodic status dump
        assert_eq!(log_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            log_filter(Some("warn,vedirect_bridge=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn test_open_serial_with_missing_port() {
        let mut config = Config::default();
        config.serial.port = "/dev/nonexistent_vedirect".to_string();

        match open_serial(&config) {
            Err(VeDirectBridgeError::SerialPortNotFound(paths)) => {
                assert_eq!(paths, "/dev/nonexistent_vedirect");
            }
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }
}
