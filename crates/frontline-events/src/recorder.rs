//! A listener that keeps every envelope it sees.
//!
//! Handy for telemetry taps and for asserting on event streams in tests.

use std::sync::Mutex;

use frontline_types::sync::lock;
use frontline_types::{EventEnvelope, FrontlineEvent};

use crate::bus::EventListener;

/// Records envelopes in arrival order.
#[derive(Debug, Default)]
pub struct EventRecorder {
    envelopes: Mutex<Vec<EventEnvelope>>,
}

impl EventRecorder {
    /// Create an empty recorder.
    pub const fn new() -> Self {
        Self {
            envelopes: Mutex::new(Vec::new()),
        }
    }

    /// Copy of everything recorded so far.
    pub fn envelopes(&self) -> Vec<EventEnvelope> {
        lock(&self.envelopes).clone()
    }

    /// Recorded events without their envelopes.
    pub fn events(&self) -> Vec<FrontlineEvent> {
        lock(&self.envelopes)
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }

    /// Events whose serialized tag equals `name`.
    pub fn events_named(&self, name: &str) -> Vec<FrontlineEvent> {
        lock(&self.envelopes)
            .iter()
            .filter(|e| e.event.name() == name)
            .map(|e| e.event.clone())
            .collect()
    }

    /// Number of recorded envelopes.
    pub fn len(&self) -> usize {
        lock(&self.envelopes).len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        lock(&self.envelopes).is_empty()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        lock(&self.envelopes).clear();
    }
}

impl EventListener for EventRecorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn on_event(&self, envelope: &EventEnvelope) {
        lock(&self.envelopes).push(envelope.clone());
    }
}
