//! # VE.Direct Bridge Library
//!
//! Decode Victron VE.Direct text telemetry into SI-unit measurements.
//!
//! This library provides the core functionality for reading battery monitors
//! and solar charge controllers over a serial link, validating every block
//! with its checksum and publishing normalized values to observers.

pub mod config;
pub mod error;
pub mod vedirect;
pub mod serial;
pub mod telemetry;
