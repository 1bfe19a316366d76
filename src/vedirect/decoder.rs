//! # VE.Direct Stream Decoder
//!
//! Byte-at-a-time receive state machine, field processor and commit pipeline.
//!
//! ```text
//! bytes ─▶ state machine ─▶ (label, value) ─▶ registry (pending)
//!                                               │
//!                         "Checksum" + sum == 0 ▼
//!                                          commit ─▶ sinks + CommitRecord
//! ```
//!
//! The decoder never fails. Noise, truncated records and overlong tokens drop
//! it into [`ReceiveState::Unsynchronized`] until the next line boundary, and
//! a block that does not sum to zero is discarded as a whole.
//!
//! ## Usage
//!
//! ```
//! use vedirect_bridge::vedirect::decoder::VeDirectDecoder;
//! use vedirect_bridge::vedirect::encoder::encode_block;
//!
//! let mut decoder = VeDirectDecoder::new();
//! let mut stream = b"\n".to_vec(); // line boundary to synchronize on
//! stream.extend(encode_block(&[("V", "12800")]));
//!
//! decoder.drain(&mut stream.as_slice());
//!
//! let volts = decoder.field("V").unwrap().sink().as_float().unwrap().get();
//! assert_eq!(volts, Some(12.8));
//! ```

use std::borrow::Cow;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::checksum::Checksum;
use super::protocol::*;
use super::registry::{FieldRegistry, FieldState};
use super::sink::Observable;
use super::transform::invalid_marker;
use crate::serial::port_trait::ByteSource;

/// What happened to a completed record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Known label, value stored as pending
    Stored,
    /// Unknown label, dropped
    Unknown,
    /// Valid block boundary; `values` fields converted successfully
    Committed { values: usize },
    /// Block boundary with a bad checksum or lost synchronization
    Rejected,
}

/// One value of a commit cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedValue {
    pub label: &'static str,
    pub unit: &'static str,
    pub value: Measurement,
}

/// Aggregate "new data committed" notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRecord {
    /// Increments by one per committed block
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub values: Vec<CommittedValue>,
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    pub bytes_received: u64,
    pub blocks_committed: u64,
    pub blocks_rejected: u64,
    pub sync_losses: u64,
    pub unknown_labels: u64,
    pub conversion_errors: u64,
}

/// VE.Direct text protocol decoder
///
/// Owns its own field registry. Must not be driven concurrently; the host
/// serializes calls.
#[derive(Debug)]
pub struct VeDirectDecoder {
    registry: FieldRegistry,
    state: ReceiveState,
    label: heapless::Vec<u8, MAX_LABEL_LEN>,
    value: heapless::Vec<u8, MAX_VALUE_LEN>,
    checksum: Checksum,
    /// Set on synchronization loss; forces rejection at the next boundary
    block_corrupted: bool,
    mode: ValueMode,
    commits: Observable<CommitRecord>,
    sequence: u64,
    stats: DecoderStats,
}

impl VeDirectDecoder {
    /// Create a decoder in normalized (SI unit) mode
    pub fn new() -> Self {
        Self::with_mode(ValueMode::default())
    }

    /// Create a decoder with an explicit value mode
    pub fn with_mode(mode: ValueMode) -> Self {
        Self {
            registry: FieldRegistry::new(),
            state: ReceiveState::Unsynchronized,
            label: heapless::Vec::new(),
            value: heapless::Vec::new(),
            checksum: Checksum::new(),
            block_corrupted: false,
            mode,
            commits: Observable::new(),
            sequence: 0,
            stats: DecoderStats::default(),
        }
    }

    pub fn value_mode(&self) -> ValueMode {
        self.mode
    }

    /// Switch between literal and normalized commits; takes effect at the
    /// next valid block
    pub fn set_value_mode(&mut self, mode: ValueMode) {
        self.mode = mode;
    }

    pub fn state(&self) -> ReceiveState {
        self.state
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn field(&self, label: &str) -> Option<&FieldState> {
        self.registry.get(label)
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Running checksum of the current block
    pub fn checksum(&self) -> u8 {
        self.checksum.value()
    }

    /// Observe commit notifications
    pub fn subscribe_commits(&self) -> watch::Receiver<Option<CommitRecord>> {
        self.commits.subscribe()
    }

    /// Most recent commit notification
    pub fn last_commit(&self) -> Option<CommitRecord> {
        self.commits.get()
    }

    /// Readiness callback: consume available bytes up to one complete record
    ///
    /// Reads while the source has bytes and no record is complete, then
    /// processes the record if one was completed. Returns immediately when
    /// nothing is available.
    ///
    /// # Returns
    ///
    /// * `Option<FieldOutcome>` - Outcome of the completed record, if any
    pub fn on_bytes_available<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Option<FieldOutcome> {
        while self.state != ReceiveState::BlockComplete && source.available() > 0 {
            match source.read_byte() {
                Some(byte) => self.receive(byte),
                None => break,
            }
        }

        if self.state == ReceiveState::BlockComplete {
            Some(self.complete_record())
        } else {
            None
        }
    }

    /// Invoke the readiness callback until the source is empty
    ///
    /// # Returns
    ///
    /// * `usize` - Number of records completed
    pub fn drain<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> usize {
        let mut records = 0;
        while source.available() > 0 {
            match self.on_bytes_available(source) {
                Some(_) => records += 1,
                None => break,
            }
        }
        records
    }

    /// Feed a single byte
    pub fn feed(&mut self, byte: u8) -> Option<FieldOutcome> {
        self.receive(byte);
        if self.state == ReceiveState::BlockComplete {
            Some(self.complete_record())
        } else {
            None
        }
    }

    fn receive(&mut self, byte: u8) {
        self.stats.bytes_received += 1;
        self.checksum.update(byte);

        match self.state {
            ReceiveState::Unsynchronized => {
                if byte == VALUE_TERMINATOR {
                    // Bytes before the sync point belong to no block
                    self.checksum.reset();
                    self.start_label();
                }
            }
            ReceiveState::ReadingLabel => match byte {
                LABEL_TERMINATOR => {
                    self.value.clear();
                    self.state = ReceiveState::ReadingValue;
                }
                VALUE_TERMINATOR => {
                    if !self.label.is_empty() {
                        self.lose_sync("line without label terminator");
                        self.state = ReceiveState::ReadingLabel;
                    }
                    self.label.clear();
                }
                _ => {
                    if self.label.push(byte).is_err() {
                        self.lose_sync("label too long");
                    }
                }
            },
            // The checksum byte may take any value, terminators included
            ReceiveState::ReadingValue => match byte {
                VALUE_TERMINATOR if !self.awaiting_checksum_byte() => {
                    self.state = ReceiveState::BlockComplete
                }
                CARRIAGE_RETURN if !self.awaiting_checksum_byte() => {}
                _ => {
                    if self.value.push(byte).is_err() {
                        self.lose_sync("value too long");
                    }
                }
            },
            // Completed records are processed before the next byte is read
            ReceiveState::BlockComplete => {}
        }
    }

    fn awaiting_checksum_byte(&self) -> bool {
        self.value.is_empty() && self.label.as_slice() == CHECKSUM_LABEL.as_bytes()
    }

    fn start_label(&mut self) {
        self.label.clear();
        self.state = ReceiveState::ReadingLabel;
    }

    fn lose_sync(&mut self, reason: &'static str) {
        warn!(reason, "VE.Direct synchronization lost");
        self.stats.sync_losses += 1;
        self.block_corrupted = true;
        self.state = ReceiveState::Unsynchronized;
    }

    fn complete_record(&mut self) -> FieldOutcome {
        let label = std::mem::take(&mut self.label);
        let value = std::mem::take(&mut self.value);
        self.start_label();

        let label: Cow<'_, str> = String::from_utf8_lossy(&label);
        let value: Cow<'_, str> = String::from_utf8_lossy(&value);
        self.process_field(&label, &value)
    }

    /// Handle one decoded `(label, value)` record
    ///
    /// A `Checksum` label closes the block: the dirty fields are committed if
    /// the running sum is zero and synchronization held, and discarded
    /// otherwise. Any other label is stored as pending if known.
    pub fn process_field(&mut self, label: &str, value: &str) -> FieldOutcome {
        if label == CHECKSUM_LABEL {
            let outcome = if self.checksum.is_valid() && !self.block_corrupted {
                FieldOutcome::Committed {
                    values: self.commit(),
                }
            } else {
                self.reject_block();
                FieldOutcome::Rejected
            };
            self.checksum.reset();
            self.block_corrupted = false;
            return outcome;
        }

        match self.registry.get_mut(label) {
            Some(field) => {
                field.mark_dirty(value, Instant::now());
                FieldOutcome::Stored
            }
            None => {
                trace!(label, value, "Ignoring unknown VE.Direct label");
                self.stats.unknown_labels += 1;
                FieldOutcome::Unknown
            }
        }
    }

    fn reject_block(&mut self) {
        warn!(
            checksum = self.checksum.value(),
            corrupted = self.block_corrupted,
            discarded = self.registry.dirty_count(),
            "VE.Direct block rejected"
        );
        self.stats.blocks_rejected += 1;
        for field in self.registry.iter_mut() {
            field.discard_pending();
        }
    }

    /// Convert and publish every dirty field, then notify commit observers
    fn commit(&mut self) -> usize {
        let mode = self.mode;
        let mut values = Vec::new();

        for field in self.registry.iter_mut() {
            if field.status() != FieldStatus::Dirty {
                continue;
            }
            field.mark_valid();

            let result = match mode {
                ValueMode::Literal => Ok(Measurement::Text(field.pending_value().to_string())),
                ValueMode::Normalized => {
                    if field.pending_value() == NO_DATA_SENTINEL {
                        continue;
                    }
                    field.transform().apply(field.pending_value())
                }
            };

            match result {
                Ok(measurement) => {
                    // Numeric sinks refuse literal text
                    field.sink().publish(&measurement);
                    values.push(CommittedValue {
                        label: field.label(),
                        unit: field.unit(),
                        value: measurement.clone(),
                    });
                    field.confirm(ConfirmedValue::Value(measurement));
                }
                Err(error) => {
                    warn!(label = field.label(), %error, "VE.Direct value conversion failed");
                    self.stats.conversion_errors += 1;
                    let marker = invalid_marker(field.pending_value());
                    field.confirm(ConfirmedValue::Invalid(marker));
                }
            }
        }

        self.stats.blocks_committed += 1;
        self.sequence += 1;

        let committed = values.len();
        debug!(sequence = self.sequence, committed, "VE.Direct block committed");

        self.commits.set(CommitRecord {
            sequence: self.sequence,
            timestamp: Utc::now(),
            values,
        });

        committed
    }

    /// Log every field seen so far, with the age of its last update
    pub fn log_status(&self) {
        debug!(
            bytes = self.stats.bytes_received,
            committed = self.stats.blocks_committed,
            rejected = self.stats.blocks_rejected,
            sync_losses = self.stats.sync_losses,
            unknown = self.stats.unknown_labels,
            conversion_errors = self.stats.conversion_errors,
            "VE.Direct decoder status"
        );

        for field in self.registry.iter() {
            if field.status() == FieldStatus::Undefined {
                continue;
            }
            debug!("{}", status_line(field));
        }
    }
}

/// Label, description, confirmed value, unit and age of the last update
fn status_line(field: &FieldState) -> String {
    let value = field
        .confirmed_value()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    let age_ms = field
        .last_update()
        .map(|at| at.elapsed().as_millis())
        .unwrap_or_default();

    format!(
        "{} ({}): {} {} ({} ms)",
        field.label(),
        field.descriptor().description,
        value,
        field.unit(),
        age_ms
    )
}

impl Default for VeDirectDecoder {
    fn default() -> Self {
        Self::new()
    }
}
