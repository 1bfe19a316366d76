//! # VE.Direct Field Registry
//!
//! Catalog of the labels a BMV, MPPT or Phoenix device may transmit, together
//! with the runtime state of each field.
//!
//! ## Unit Transforms
//!
//! | Raw unit | Selector | SI unit |
//! |----------|----------|---------|
//! | mV, mA | 1 | V, A |
//! | 1/10 % | 1 | ratio |
//! | W | 1000 | W |
//! | 0.01 V | 10 | V |
//! | 0.1 A | 100 | A |
//! | mAh | 3600 | C |
//! | 10 Wh | 36 000 000 | J |
//! | min | 60 000 | s |
//! | °C | -273 | K |
//!
//! Lookup is an exact, linear match on the label; the table is small.

use std::time::Instant;

use super::protocol::{ConfirmedValue, FieldStatus};
use super::sink::FieldSink;
use super::transform::UnitTransform;

/// Static description of a protocol field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Label as sent on the wire
    pub label: &'static str,
    /// Signed unit transform selector (see [`UnitTransform`])
    pub unit_transform: i32,
    /// Destination unit
    pub unit: &'static str,
    /// What the field measures
    pub description: &'static str,
}

impl FieldDescriptor {
    const fn new(
        label: &'static str,
        unit_transform: i32,
        unit: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            label,
            unit_transform,
            unit,
            description,
        }
    }

    /// Decoded transform policy
    pub const fn transform(&self) -> UnitTransform {
        UnitTransform::from_selector(self.unit_transform)
    }
}

/// Every label known to the decoder
pub const FIELD_DESCRIPTORS: &[FieldDescriptor] = &[
    FieldDescriptor::new("V", 1, "V", "Main (battery) voltage"),
    FieldDescriptor::new("VS", 1, "V", "Auxiliary (starter) voltage"),
    FieldDescriptor::new("VM", 1, "V", "Mid-point voltage of the battery bank"),
    FieldDescriptor::new("DM", 1, "ratio", "Mid-point deviation of the battery bank"),
    FieldDescriptor::new("VPV", 1, "V", "Panel voltage"),
    FieldDescriptor::new("PPV", 1000, "W", "Panel power"),
    FieldDescriptor::new("I", 1, "A", "Battery current"),
    FieldDescriptor::new("IL", 1, "A", "Load current"),
    FieldDescriptor::new("LOAD", -1, "state", "Load output state"),
    FieldDescriptor::new("T", -273, "K", "Battery temperature"),
    FieldDescriptor::new("P", 1000, "W", "Instantaneous power"),
    FieldDescriptor::new("CE", 3600, "C", "Consumed amp hours"),
    FieldDescriptor::new("SOC", 1, "ratio", "State of charge"),
    FieldDescriptor::new("TTG", 60_000, "s", "Time to go"),
    FieldDescriptor::new("Alarm", -1, "state", "Alarm condition active"),
    FieldDescriptor::new("Relay", -1, "state", "Relay state"),
    FieldDescriptor::new("AR", -2, "", "Alarm reason"),
    FieldDescriptor::new("H1", 3600, "C", "Depth of the deepest discharge"),
    FieldDescriptor::new("H2", 3600, "C", "Depth of the last discharge"),
    FieldDescriptor::new("H3", 3600, "C", "Depth of the average discharge"),
    FieldDescriptor::new("H4", 1000, "count", "Number of charge cycles"),
    FieldDescriptor::new("H5", 1000, "count", "Number of full discharges"),
    FieldDescriptor::new("H6", 3600, "C", "Cumulative amp hours drawn"),
    FieldDescriptor::new("H7", 1, "V", "Minimum main (battery) voltage"),
    FieldDescriptor::new("H8", 1, "V", "Maximum main (battery) voltage"),
    FieldDescriptor::new("H9", 1000, "s", "Seconds since last full charge"),
    FieldDescriptor::new("H10", 1000, "count", "Number of automatic synchronizations"),
    FieldDescriptor::new("H11", 1000, "count", "Number of low main voltage alarms"),
    FieldDescriptor::new("H12", 1000, "count", "Number of high main voltage alarms"),
    FieldDescriptor::new("H13", 1000, "count", "Number of low auxiliary voltage alarms"),
    FieldDescriptor::new("H14", 1000, "count", "Number of high auxiliary voltage alarms"),
    FieldDescriptor::new("H15", 1, "V", "Minimum auxiliary (battery) voltage"),
    FieldDescriptor::new("H16", 1, "V", "Maximum auxiliary (battery) voltage"),
    FieldDescriptor::new("H17", 36_000_000, "J", "Amount of discharged energy"),
    FieldDescriptor::new("H18", 36_000_000, "J", "Amount of charged energy"),
    FieldDescriptor::new("H19", 36_000_000, "J", "Yield total"),
    FieldDescriptor::new("H20", 36_000_000, "J", "Yield today"),
    FieldDescriptor::new("H21", 1000, "W", "Maximum power today"),
    FieldDescriptor::new("H22", 36_000_000, "J", "Yield yesterday"),
    FieldDescriptor::new("H23", 1000, "W", "Maximum power yesterday"),
    FieldDescriptor::new("ERR", -2, "", "Error code"),
    FieldDescriptor::new("CS", -2, "", "State of operation"),
    FieldDescriptor::new("BMV", 0, "", "Model description"),
    FieldDescriptor::new("FW", 0, "", "Firmware version"),
    FieldDescriptor::new("PID", 0, "", "Product ID"),
    FieldDescriptor::new("SER#", 0, "", "Serial number"),
    FieldDescriptor::new("HSDS", -2, "", "Day sequence number"),
    FieldDescriptor::new("MODE", -2, "", "Device mode"),
    FieldDescriptor::new("AC_OUT_V", 10, "V", "AC output voltage"),
    FieldDescriptor::new("AC_OUT_I", 100, "A", "AC output current"),
    FieldDescriptor::new("WARN", -2, "", "Warning reason"),
];

/// Runtime state of one field
#[derive(Debug)]
pub struct FieldState {
    descriptor: &'static FieldDescriptor,
    transform: UnitTransform,
    pending_value: String,
    confirmed_value: Option<ConfirmedValue>,
    last_update: Option<Instant>,
    status: FieldStatus,
    /// Status to fall back to if the pending value is discarded
    settled_status: FieldStatus,
    sink: FieldSink,
}

impl FieldState {
    fn new(descriptor: &'static FieldDescriptor) -> Self {
        let transform = descriptor.transform();
        Self {
            descriptor,
            transform,
            pending_value: String::new(),
            confirmed_value: None,
            last_update: None,
            status: FieldStatus::Undefined,
            settled_status: FieldStatus::Undefined,
            sink: FieldSink::new(transform.sink_kind()),
        }
    }

    pub fn descriptor(&self) -> &'static FieldDescriptor {
        self.descriptor
    }

    pub fn label(&self) -> &'static str {
        self.descriptor.label
    }

    pub fn unit(&self) -> &'static str {
        self.descriptor.unit
    }

    pub fn transform(&self) -> UnitTransform {
        self.transform
    }

    /// Raw text most recently decoded, committed or not
    pub fn pending_value(&self) -> &str {
        &self.pending_value
    }

    /// Value of the last commit, `None` before the first one
    pub fn confirmed_value(&self) -> Option<&ConfirmedValue> {
        self.confirmed_value.as_ref()
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn status(&self) -> FieldStatus {
        self.status
    }

    pub fn sink(&self) -> &FieldSink {
        &self.sink
    }

    /// Record a freshly decoded raw value
    pub(crate) fn mark_dirty(&mut self, value: &str, now: Instant) {
        if self.status != FieldStatus::Dirty {
            self.settled_status = self.status;
            self.status = FieldStatus::Dirty;
        }
        self.pending_value.clear();
        self.pending_value.push_str(value);
        self.last_update = Some(now);
    }

    /// Drop the pending value of a rejected block
    pub(crate) fn discard_pending(&mut self) {
        if self.status == FieldStatus::Dirty {
            self.status = self.settled_status;
        }
    }

    /// Mark committed; the confirmed value is left to the caller
    pub(crate) fn mark_valid(&mut self) {
        self.status = FieldStatus::Valid;
        self.settled_status = FieldStatus::Valid;
    }

    pub(crate) fn confirm(&mut self, value: ConfirmedValue) {
        self.confirmed_value = Some(value);
    }
}

/// All fields of one decoder instance
#[derive(Debug)]
pub struct FieldRegistry {
    fields: Vec<FieldState>,
}

impl FieldRegistry {
    /// Build the registry from [`FIELD_DESCRIPTORS`]
    pub fn new() -> Self {
        Self {
            fields: FIELD_DESCRIPTORS.iter().map(FieldState::new).collect(),
        }
    }

    /// Index of the field with this label
    pub fn lookup(&self, label: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.label() == label)
    }

    pub fn get(&self, label: &str) -> Option<&FieldState> {
        self.fields.iter().find(|field| field.label() == label)
    }

    pub(crate) fn get_mut(&mut self, label: &str) -> Option<&mut FieldState> {
        self.fields.iter_mut().find(|field| field.label() == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldState> {
        self.fields.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut FieldState> {
        self.fields.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields awaiting a checksum
    pub fn dirty_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|field| field.status == FieldStatus::Dirty)
            .count()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vedirect::protocol::{CHECKSUM_LABEL, MAX_LABEL_LEN};
    use crate::vedirect::sink::SinkKind;
    use std::collections::HashSet;

    #[test]
    fn test_table_size() {
        assert_eq!(FIELD_DESCRIPTORS.len(), 51);
    }

    #[test]
    fn test_labels_unique_and_fit_buffer() {
        let mut seen = HashSet::new();
        for descriptor in FIELD_DESCRIPTORS {
            assert!(seen.insert(descriptor.label), "Duplicate label {}", descriptor.label);
            assert!(
                descriptor.label.len() <= MAX_LABEL_LEN,
                "Label {} exceeds {} characters",
                descriptor.label,
                MAX_LABEL_LEN
            );
            assert_ne!(descriptor.label, CHECKSUM_LABEL);
        }
    }

    #[test]
    fn test_lookup() {
        let registry = FieldRegistry::new();
        assert_eq!(registry.lookup("V"), Some(0));
        assert!(registry.get("SER#").is_some());
        assert!(registry.get("v").is_none(), "Lookup is case sensitive");
        assert!(registry.get("OR").is_none());
    }

    #[test]
    fn test_sinks_follow_policy() {
        let registry = FieldRegistry::new();
        let kind = |label| registry.get(label).unwrap().sink().kind();
        assert_eq!(kind("V"), SinkKind::Float);
        assert_eq!(kind("T"), SinkKind::Float);
        assert_eq!(kind("LOAD"), SinkKind::Integer);
        assert_eq!(kind("CS"), SinkKind::Integer);
        assert_eq!(kind("PID"), SinkKind::Text);
    }

    #[test]
    fn test_initial_state() {
        let registry = FieldRegistry::new();
        assert_eq!(registry.len(), FIELD_DESCRIPTORS.len());
        assert_eq!(registry.dirty_count(), 0);
        for field in registry.iter() {
            assert_eq!(field.status(), FieldStatus::Undefined);
            assert!(field.confirmed_value().is_none());
            assert!(field.last_update().is_none());
        }
    }

    #[test]
    fn test_dirty_then_discard_restores_status() {
        let mut registry = FieldRegistry::new();
        let now = Instant::now();

        let field = registry.get_mut("V").unwrap();
        field.mark_dirty("12800", now);
        assert_eq!(field.status(), FieldStatus::Dirty);
        assert_eq!(field.pending_value(), "12800");

        field.discard_pending();
        assert_eq!(field.status(), FieldStatus::Undefined);
        // Pending text survives the discard
        assert_eq!(field.pending_value(), "12800");
    }

    #[test]
    fn test_discard_after_commit_keeps_valid() {
        let mut registry = FieldRegistry::new();
        let now = Instant::now();
        let field = registry.get_mut("V").unwrap();

        field.mark_dirty("12800", now);
        field.mark_valid();
        field.mark_dirty("12900", now);
        field.mark_dirty("13000", now);
        assert_eq!(field.pending_value(), "13000", "Last write wins");

        field.discard_pending();
        assert_eq!(field.status(), FieldStatus::Valid);
    }

    #[test]
    fn test_registries_are_independent() {
        let mut a = FieldRegistry::new();
        let b = FieldRegistry::new();
        a.get_mut("V").unwrap().mark_dirty("1", Instant::now());
        assert_eq!(a.dirty_count(), 1);
        assert_eq!(b.dirty_count(), 0);
    }
}
