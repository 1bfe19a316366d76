//! # Value Sinks
//!
//! Typed observables that receive committed values.
//!
//! Each field publishes to exactly one [`FieldSink`], chosen from its unit
//! transform policy when the registry is built. Sinks are backed by
//! `tokio::sync::watch`, so downstream tasks can observe the latest value
//! without touching the decoder.

use tokio::sync::watch;

use super::protocol::Measurement;

/// A write-only-from-the-decoder, observe-from-anywhere value slot
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> Observable<T> {
    /// Create an empty observable (no value published yet)
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish a value. Never blocks, never fails, even without observers.
    pub fn set(&self, value: T) {
        self.tx.send_replace(Some(value));
    }

    /// Subscribe to future updates
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }

    /// Number of live subscribers
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone> Observable<T> {
    /// Latest published value
    pub fn get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which kind of sink a field publishes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Float,
    Integer,
    Text,
}

/// Per-field typed sink
#[derive(Debug)]
pub enum FieldSink {
    Float(Observable<f64>),
    Integer(Observable<i64>),
    Text(Observable<String>),
}

impl FieldSink {
    /// Create an empty sink of the given kind
    pub fn new(kind: SinkKind) -> Self {
        match kind {
            SinkKind::Float => FieldSink::Float(Observable::new()),
            SinkKind::Integer => FieldSink::Integer(Observable::new()),
            SinkKind::Text => FieldSink::Text(Observable::new()),
        }
    }

    pub fn kind(&self) -> SinkKind {
        match self {
            FieldSink::Float(_) => SinkKind::Float,
            FieldSink::Integer(_) => SinkKind::Integer,
            FieldSink::Text(_) => SinkKind::Text,
        }
    }

    /// Push a measurement into the sink
    ///
    /// Returns `false` (and publishes nothing) when the measurement type does
    /// not match the sink type.
    pub fn publish(&self, measurement: &Measurement) -> bool {
        match (self, measurement) {
            (FieldSink::Float(sink), Measurement::Float(value)) => sink.set(*value),
            (FieldSink::Integer(sink), Measurement::Integer(value)) => sink.set(*value),
            (FieldSink::Text(sink), Measurement::Text(value)) => sink.set(value.clone()),
            _ => return false,
        }
        true
    }

    /// Latest published value as a measurement
    pub fn latest(&self) -> Option<Measurement> {
        match self {
            FieldSink::Float(sink) => sink.get().map(Measurement::Float),
            FieldSink::Integer(sink) => sink.get().map(Measurement::Integer),
            FieldSink::Text(sink) => sink.get().map(Measurement::Text),
        }
    }

    /// Float observable, if this is a float sink
    pub fn as_float(&self) -> Option<&Observable<f64>> {
        match self {
            FieldSink::Float(sink) => Some(sink),
            _ => None,
        }
    }

    /// Integer observable, if this is an integer sink
    pub fn as_integer(&self) -> Option<&Observable<i64>> {
        match self {
            FieldSink::Integer(sink) => Some(sink),
            _ => None,
        }
    }

    /// Text observable, if this is a string sink
    pub fn as_text(&self) -> Option<&Observable<String>> {
        match self {
            FieldSink::Text(sink) => Some(sink),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observable_starts_empty() {
        let sink: Observable<f64> = Observable::new();
        assert_eq!(sink.get(), None);
    }

    #[test]
    fn test_set_without_observers() {
        let sink = Observable::new();
        sink.set(1.5);
        assert_eq!(sink.get(), Some(1.5));
        assert_eq!(sink.observer_count(), 0);
    }

    #[test]
    fn test_subscriber_sees_update() {
        let sink = Observable::new();
        let mut rx = sink.subscribe();
        assert!(!rx.has_changed().unwrap());

        sink.set(42i64);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(42));
    }

    #[test]
    fn test_publish_matches_kind() {
        let sink = FieldSink::new(SinkKind::Float);
        assert!(sink.publish(&Measurement::Float(12.8)));
        assert_eq!(sink.latest(), Some(Measurement::Float(12.8)));

        // Wrong type is refused, previous value kept
        assert!(!sink.publish(&Measurement::Text("12.8".into())));
        assert_eq!(sink.latest(), Some(Measurement::Float(12.8)));
    }

    #[test]
    fn test_accessors() {
        let sink = FieldSink::new(SinkKind::Integer);
        assert_eq!(sink.kind(), SinkKind::Integer);
        assert!(sink.as_integer().is_some());
        assert!(sink.as_float().is_none());
        assert!(sink.as_text().is_none());
    }
}
