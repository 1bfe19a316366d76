//! # Error Types
//!
//! Custom error types for VE.Direct Bridge using `thiserror`.
//!
//! Protocol-level conditions (lost synchronization, checksum mismatches,
//! unknown labels) never surface here: the decoder recovers from them on its
//! own and only reports them through tracing and [`DecoderStats`].
//!
//! [`DecoderStats`]: crate::vedirect::decoder::DecoderStats

use thiserror::Error;

/// Main error type for VE.Direct Bridge
#[derive(Debug, Error)]
pub enum VeDirectBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// None of the candidate device paths could be opened
    #[error("No VE.Direct device found (tried: {0})")]
    SerialPortNotFound(String),

    /// The serial stream reached end-of-file
    #[error("Serial device disconnected")]
    SerialDisconnected,

    /// Telemetry log errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),
}

/// Per-field failure while applying a unit transform during commit.
///
/// Never fatal: the field is marked invalid and sibling fields still commit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Raw value is not a number under a numeric policy
    #[error("not a number: {0:?}")]
    NotANumber(String),

    /// Raw value is neither `ON` nor `OFF` under the binary state policy
    #[error("not a binary state: {0:?}")]
    NotABinaryState(String),
}

/// Result type alias for VE.Direct Bridge
pub type Result<T> = std::result::Result<T, VeDirectBridgeError>;
