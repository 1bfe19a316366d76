//! # VE.Direct Protocol Constants and Types
//!
//! Core protocol definitions for the VE.Direct text mode.
//!
//! A block is a sequence of `label \t value \n` records terminated by a
//! `Checksum \t <byte> \n` record. The wrapping byte sum of the whole block,
//! checksum byte and terminators included, must be zero.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separates a label from its value
pub const LABEL_TERMINATOR: u8 = b'\t';

/// Ends a value (and with it a record)
pub const VALUE_TERMINATOR: u8 = b'\n';

/// Dropped when it occurs inside a value (devices emit `\r\n`)
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Label of the record that closes a block
pub const CHECKSUM_LABEL: &str = "Checksum";

/// Raw value meaning "no data available"
pub const NO_DATA_SENTINEL: &str = "---";

/// Label buffer size, terminator included
pub const LABEL_BUFFER_SIZE: usize = 9;

/// Value buffer size, terminator included
pub const VALUE_BUFFER_SIZE: usize = 33;

/// Maximum label length in characters
pub const MAX_LABEL_LEN: usize = LABEL_BUFFER_SIZE - 1;

/// Maximum value length in characters
pub const MAX_VALUE_LEN: usize = VALUE_BUFFER_SIZE - 1;

/// VE.Direct text mode baud rate
pub const VEDIRECT_BAUD_RATE: u32 = 19_200;

/// Receive state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveState {
    /// Waiting for a line boundary to resynchronize
    #[default]
    Unsynchronized,
    /// Accumulating label bytes
    ReadingLabel,
    /// Accumulating value bytes
    ReadingValue,
    /// A complete record is waiting to be processed
    BlockComplete,
}

/// Lifecycle of a single field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    /// Never seen on the wire
    #[default]
    Undefined,
    /// Decoded, waiting for a valid checksum
    Dirty,
    /// Committed by at least one valid block
    Valid,
}

/// Whether the commit pipeline converts values to SI units
///
/// Mirrors the device-side mode flag: `0` is literal passthrough, `1` (the
/// default) is unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    /// Commit raw text for every field, update string sinks only
    Literal,
    /// Apply each field's unit transform
    #[default]
    Normalized,
}

impl TryFrom<u8> for ValueMode {
    type Error = u8;

    fn try_from(flag: u8) -> std::result::Result<Self, Self::Error> {
        match flag {
            0 => Ok(ValueMode::Literal),
            1 => Ok(ValueMode::Normalized),
            other => Err(other),
        }
    }
}

impl From<ValueMode> for u8 {
    fn from(mode: ValueMode) -> Self {
        match mode {
            ValueMode::Literal => 0,
            ValueMode::Normalized => 1,
        }
    }
}

/// A normalized value produced by the commit pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measurement {
    /// Scaled or offset physical quantity
    Float(f64),
    /// Binary state or integer code
    Integer(i64),
    /// Literal text (identity strings, literal mode)
    Text(String),
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Float(value) => write!(f, "{:.3}", value),
            Measurement::Integer(value) => write!(f, "{}", value),
            Measurement::Text(value) => f.write_str(value),
        }
    }
}

/// Last committed value of a field
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmedValue {
    /// Conversion succeeded
    Value(Measurement),
    /// Conversion failed; carries a diagnostic string
    Invalid(String),
}

impl ConfirmedValue {
    /// Whether the last commit failed to convert
    pub fn is_invalid(&self) -> bool {
        matches!(self, ConfirmedValue::Invalid(_))
    }
}

impl fmt::Display for ConfirmedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmedValue::Value(measurement) => measurement.fmt(f),
            ConfirmedValue::Invalid(diagnostic) => f.write_str(diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_limits() {
        assert_eq!(MAX_LABEL_LEN, 8);
        assert_eq!(MAX_VALUE_LEN, 32);
        // "Checksum" must fit the label buffer
        assert!(CHECKSUM_LABEL.len() <= MAX_LABEL_LEN);
    }

    #[test]
    fn test_value_mode_flag() {
        assert_eq!(ValueMode::default(), ValueMode::Normalized);
        assert_eq!(ValueMode::try_from(0), Ok(ValueMode::Literal));
        assert_eq!(ValueMode::try_from(1), Ok(ValueMode::Normalized));
        assert_eq!(ValueMode::try_from(2), Err(2));
        assert_eq!(u8::from(ValueMode::Literal), 0);
    }

    #[test]
    fn test_initial_states() {
        assert_eq!(ReceiveState::default(), ReceiveState::Unsynchronized);
        assert_eq!(FieldStatus::default(), FieldStatus::Undefined);
    }

    #[test]
    fn test_measurement_display() {
        assert_eq!(Measurement::Float(12.8).to_string(), "12.800");
        assert_eq!(Measurement::Integer(-3).to_string(), "-3");
        assert_eq!(Measurement::Text("0xA053".into()).to_string(), "0xA053");
        assert_eq!(
            ConfirmedValue::Invalid("invalid: -FOO-".into()).to_string(),
            "invalid: -FOO-"
        );
    }

    #[test]
    fn test_measurement_serializes_untagged() {
        let json = serde_json::to_string(&Measurement::Integer(1)).unwrap();
        assert_eq!(json, "1");
        let json = serde_json::to_string(&Measurement::Text("ON".into())).unwrap();
        assert_eq!(json, "\"ON\"");
    }
}
