//! The synchronous listener list and broadcast mirror.

use std::sync::{Arc, Mutex, RwLock};

use frontline_types::sync::{lock, read, write};
use frontline_types::{Clock, EventEnvelope, FrontlineEvent};
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the broadcast channel feeding remote observers.
///
/// A subscriber that falls behind by more than this many envelopes receives
/// [`broadcast::error::RecvError::Lagged`] and skips ahead.
pub const REMOTE_CHANNEL_CAPACITY: usize = 1024;

/// An in-process consumer of core events.
///
/// Listeners run on the publishing thread while the publisher still holds
/// the per-territory ordering guard, so they must not write back into the
/// territory that produced the event. They may publish follow-up events.
pub trait EventListener: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Handle one event.
    fn on_event(&self, envelope: &EventEnvelope);
}

/// Ordered fan-out of core events to listeners and remote observers.
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    remote: broadcast::Sender<EventEnvelope>,
    /// Held while stamping and mirroring so wire order equals sequence order.
    sequence: Mutex<u64>,
    clock: Arc<dyn Clock>,
}

impl EventBus {
    /// Create a bus that timestamps envelopes with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (remote, _) = broadcast::channel(REMOTE_CHANNEL_CAPACITY);
        Self {
            listeners: RwLock::new(Vec::new()),
            remote,
            sequence: Mutex::new(0),
            clock,
        }
    }

    /// Register an in-process listener. Listeners are called in the order
    /// they were registered.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        write(&self.listeners).push(listener);
    }

    /// Subscribe to the remote mirror.
    pub fn subscribe_remote(&self) -> broadcast::Receiver<EventEnvelope> {
        self.remote.subscribe()
    }

    /// Number of in-process listeners.
    pub fn listener_count(&self) -> usize {
        read(&self.listeners).len()
    }

    /// Sequence number of the most recently published envelope, `0` before
    /// the first publish.
    pub fn last_sequence(&self) -> u64 {
        *lock(&self.sequence)
    }

    /// Publish an event: stamp it, mirror it to remote observers, then run
    /// every listener. Returns the envelope.
    ///
    /// Follow-up events published by a listener are stamped and mirrored
    /// after the envelope that caused them.
    pub fn publish(&self, event: FrontlineEvent) -> EventEnvelope {
        let envelope = {
            let mut sequence = lock(&self.sequence);
            *sequence = sequence.saturating_add(1);
            let envelope = EventEnvelope {
                sequence: *sequence,
                emitted_at: self.clock.now(),
                event,
            };
            // send fails only when nobody is subscribed, which is normal.
            let _ = self.remote.send(envelope.clone());
            envelope
        };

        // Snapshot the list so listeners can publish follow-up events
        // without re-entering the lock.
        let listeners: Vec<Arc<dyn EventListener>> = read(&self.listeners).clone();
        for listener in &listeners {
            trace!(
                listener = listener.name(),
                sequence = envelope.sequence,
                event = envelope.event.name(),
                "dispatching event"
            );
            listener.on_event(&envelope);
        }
        envelope
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("sequence", &self.last_sequence())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use frontline_types::{FactionId, ManualClock, RouteId, TerritoryId};

    use super::*;
    use crate::recorder::EventRecorder;

    fn bus() -> EventBus {
        EventBus::new(Arc::new(ManualClock::at_epoch()))
    }

    fn uncontested(id: u32) -> FrontlineEvent {
        FrontlineEvent::TerritoryUncontested {
            territory_id: TerritoryId(id),
        }
    }

    /// Re-publishes a route event whenever it sees a control signal.
    struct Echo {
        bus: Arc<EventBus>,
        seen: Mutex<Vec<u64>>,
    }

    impl EventListener for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn on_event(&self, envelope: &EventEnvelope) {
            self.seen.lock().unwrap().push(envelope.sequence);
            if envelope.event.is_control_signal() {
                self.bus.publish(FrontlineEvent::RouteInvalidated {
                    route_id: RouteId::new(),
                    faction: FactionId(1),
                    cause: String::from("echo"),
                });
            }
        }
    }

    #[test]
    fn sequences_start_at_one_and_increase() {
        let bus = bus();
        let first = bus.publish(uncontested(1));
        let second = bus.publish(uncontested(2));
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(bus.last_sequence(), 2);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = bus();
        let first = Arc::new(EventRecorder::new());
        let second = Arc::new(EventRecorder::new());
        bus.subscribe(first.clone());
        bus.subscribe(second.clone());
        bus.publish(uncontested(7));
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn listeners_may_publish_follow_up_events() {
        let bus = Arc::new(bus());
        let echo = Arc::new(Echo {
            bus: Arc::clone(&bus),
            seen: Mutex::new(Vec::new()),
        });
        bus.subscribe(echo.clone());
        bus.publish(uncontested(3));
        // The original plus the echoed route event.
        assert_eq!(*echo.seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn remote_subscribers_receive_envelopes() {
        let bus = bus();
        let mut rx = bus.subscribe_remote();
        bus.publish(uncontested(9));
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.sequence, 1);
        assert_eq!(envelope.event.territory_id(), Some(TerritoryId(9)));
    }

    #[test]
    fn remote_order_matches_sequence_order_for_follow_up_events() {
        let bus = Arc::new(bus());
        let mut rx = bus.subscribe_remote();
        bus.subscribe(Arc::new(Echo {
            bus: Arc::clone(&bus),
            seen: Mutex::new(Vec::new()),
        }));

        bus.publish(uncontested(4));
        bus.publish(uncontested(5));

        let mut received = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            received.push((envelope.sequence, envelope.event.name()));
        }
        assert_eq!(
            received,
            vec![
                (1, "territory_uncontested"),
                (2, "route_invalidated"),
                (3, "territory_uncontested"),
                (4, "route_invalidated"),
            ]
        );
    }
}
