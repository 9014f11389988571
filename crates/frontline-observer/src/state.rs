//! Shared application state for the Observer API server.
//!
//! Unlike a snapshot cache, [`AppState`] reads straight from the live
//! core: every component guards its own state, so REST reads only hold a
//! component lock for the length of a copy.

use std::sync::Arc;

use frontline_core::Frontline;
use frontline_types::EventEnvelope;
use tokio::sync::broadcast;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The wired territorial control core.
    pub frontline: Arc<Frontline>,
}

impl AppState {
    /// Serve the given core.
    pub const fn new(frontline: Arc<Frontline>) -> Self {
        Self { frontline }
    }

    /// Subscribe to the remote event mirror.
    ///
    /// Returns a receiver that yields every [`EventEnvelope`] published
    /// after this call, in sequence order.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.frontline.bus().subscribe_remote()
    }
}
