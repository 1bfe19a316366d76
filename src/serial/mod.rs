//! # Serial Communication Module
//!
//! Handles serial communication with the VE.Direct device.
//!
//! This module handles:
//! - Opening the serial port at 19,200 baud (8N1, no flow control)
//! - Async reads into a byte buffer
//! - Invoking the decoder whenever bytes are available
//! - Periodic status logging
//! - Detecting disconnects so the caller can reconnect

pub mod port_trait;

use std::future::Future;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, VeDirectBridgeError};
use crate::vedirect::decoder::VeDirectDecoder;

pub use crate::vedirect::protocol::VEDIRECT_BAUD_RATE;

/// Default VE.Direct device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // VE.Direct to USB cable
    "/dev/ttyACM0", // USB CDC adapters
    "/dev/serial0", // Raspberry Pi UART
];

/// Initial capacity of the receive buffer
const READ_BUFFER_SIZE: usize = 256;

/// VE.Direct serial port handle
pub struct VeDirectSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for VeDirectSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VeDirectSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl VeDirectSerial {
    /// Open the first VE.Direct device found at a default path
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if none of the default paths can be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vedirect_bridge::serial::VeDirectSerial;
    ///
    /// let serial = VeDirectSerial::open()?;
    /// println!("Connected to: {}", serial.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, VEDIRECT_BAUD_RATE)
    }

    /// Open a VE.Direct device, trying each path in order
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed; VE.Direct text mode uses 19200
    ///
    /// # Returns
    ///
    /// * `Result<VeDirectSerial>` - Connected serial port or error
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened VE.Direct device at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(VeDirectBridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with VE.Direct settings (8N1)
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| VeDirectBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Mutable access to the underlying async stream
    pub fn stream(&mut self) -> &mut tokio_serial::SerialStream {
        &mut self.port
    }
}

/// Drive a decoder from an async byte stream until shutdown or disconnect
///
/// Every successful read is handed to the decoder's readiness callback until
/// the buffer is empty. Between reads the decoder's status is logged every
/// `status_interval`.
///
/// # Arguments
///
/// * `reader` - Serial stream (or any other async byte stream)
/// * `decoder` - Decoder owned by the caller; keeps its state across reconnects
/// * `status_interval` - Period of the status dump
/// * `shutdown` - Completes when the reader should stop
///
/// # Returns
///
/// * `Ok(())` - Shutdown requested
///
/// # Errors
///
/// - `SerialDisconnected`: the stream reached end-of-file
/// - `Io`: a read failed
pub async fn run_reader<R, F>(
    reader: &mut R,
    decoder: &mut VeDirectDecoder,
    status_interval: Duration,
    shutdown: F,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    F: Future<Output = ()>,
{
    let mut buffer = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let mut status = interval(status_interval);
    status.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            read = reader.read_buf(&mut buffer) => {
                let count = read?;
                if count == 0 {
                    return Err(VeDirectBridgeError::SerialDisconnected);
                }

                let records = decoder.drain(&mut buffer);
                trace!(bytes = count, records, "Processed serial input");
            }

            _ = status.tick() => {
                decoder.log_status();
            }

            _ = &mut shutdown => {
                debug!("Serial reader shutting down");
                return Ok(());
            }
        }
    }
}
