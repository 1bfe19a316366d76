//! # VE.Direct Protocol Module
//!
//! Implementation of the Victron VE.Direct text protocol.
//!
//! This module handles:
//! - Byte-at-a-time block decoding with resynchronization
//! - 8-bit block checksum validation
//! - Field registry with per-field unit transforms
//! - Publishing committed values to typed sinks
//! - Encoding checksum-valid blocks

pub mod protocol;
pub mod checksum;
pub mod transform;
pub mod sink;
pub mod registry;
pub mod decoder;
pub mod encoder;
