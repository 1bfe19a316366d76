//! # Unit Transform Policies
//!
//! Converts raw VE.Direct text values into SI-unit measurements.
//!
//! Each field carries a signed selector:
//!
//! | Selector | Policy | Result |
//! |----------|--------|--------|
//! | `f > 0` | Linear scale | `raw * f / 1000` (float) |
//! | `0` | Literal | raw text |
//! | `-1` | Binary state | `ON` → 1, `OFF` → 0 (integer) |
//! | `-2` | Integer passthrough | raw as integer |
//! | `-273` | Celsius to Kelvin | `raw + 273.15` (float) |
//!
//! Any other negative selector falls back to literal passthrough.
//!
//! ## Usage
//!
//! ```
//! use vedirect_bridge::vedirect::protocol::Measurement;
//! use vedirect_bridge::vedirect::transform::UnitTransform;
//!
//! // mV to V
//! let transform = UnitTransform::from_selector(1);
//! assert_eq!(transform.apply("12340"), Ok(Measurement::Float(12.34)));
//! ```

use super::protocol::Measurement;
use super::sink::SinkKind;
use crate::error::ConversionError;

/// Selector for ON/OFF states
pub const SELECTOR_BINARY_STATE: i32 = -1;

/// Selector for integer passthrough
pub const SELECTOR_INTEGER: i32 = -2;

/// Selector for °C to K
pub const SELECTOR_CELSIUS_TO_KELVIN: i32 = -273;

/// Offset between °C and K
pub const KELVIN_OFFSET: f64 = 273.15;

/// Unit transform policy of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitTransform {
    /// Multiply by `factor / 1000`
    Scale(u32),
    /// Keep the raw text
    Literal,
    /// `ON`/`OFF` to 1/0
    BinaryState,
    /// Parse as a signed integer
    Integer,
    /// Add 273.15
    CelsiusToKelvin,
}

impl UnitTransform {
    /// Decode a signed policy selector
    pub const fn from_selector(selector: i32) -> Self {
        match selector {
            f if f > 0 => UnitTransform::Scale(f as u32),
            SELECTOR_BINARY_STATE => UnitTransform::BinaryState,
            SELECTOR_INTEGER => UnitTransform::Integer,
            SELECTOR_CELSIUS_TO_KELVIN => UnitTransform::CelsiusToKelvin,
            _ => UnitTransform::Literal,
        }
    }

    /// Which sink a field with this policy publishes to
    pub const fn sink_kind(&self) -> SinkKind {
        match self {
            UnitTransform::Scale(_) | UnitTransform::CelsiusToKelvin => SinkKind::Float,
            UnitTransform::BinaryState | UnitTransform::Integer => SinkKind::Integer,
            UnitTransform::Literal => SinkKind::Text,
        }
    }

    /// Convert a raw value
    ///
    /// # Arguments
    ///
    /// * `raw` - Text as received on the wire
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] if the text is not valid for the policy.
    /// The caller decides what to publish; nothing here is fatal.
    pub fn apply(&self, raw: &str) -> Result<Measurement, ConversionError> {
        match *self {
            UnitTransform::Scale(factor) => {
                let value = parse_float(raw)?;
                Ok(Measurement::Float(value * f64::from(factor) / 1000.0))
            }
            UnitTransform::Literal => Ok(Measurement::Text(raw.to_string())),
            UnitTransform::BinaryState => match raw.trim() {
                "ON" => Ok(Measurement::Integer(1)),
                "OFF" => Ok(Measurement::Integer(0)),
                _ => Err(ConversionError::NotABinaryState(raw.to_string())),
            },
            UnitTransform::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Measurement::Integer)
                .map_err(|_| ConversionError::NotANumber(raw.to_string())),
            UnitTransform::CelsiusToKelvin => {
                let value = parse_float(raw)?;
                Ok(Measurement::Float(value + KELVIN_OFFSET))
            }
        }
    }
}

impl From<i32> for UnitTransform {
    fn from(selector: i32) -> Self {
        Self::from_selector(selector)
    }
}

/// Strict float parse; rejects empty text, trailing garbage, NaN and infinities
fn parse_float(raw: &str) -> Result<f64, ConversionError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ConversionError::NotANumber(raw.to_string()))
}

/// Diagnostic recorded as the confirmed value when conversion fails
pub fn invalid_marker(raw: &str) -> String {
    format!("invalid: -{}-", raw)
}
