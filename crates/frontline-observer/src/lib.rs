//! Observer API server for the Frontline territorial control core.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/events`) mirroring every event the
//!   core publishes, in sequence order
//! - **REST endpoints** for querying territories, control status,
//!   influence, convoy routes, recent updates, sieges, and queued AI
//!   decisions
//! - **Minimal HTML status page** (`GET /`)
//!
//! Handlers read directly from the live components; core failures map to
//! HTTP statuses through [`ErrorKind`](frontline_types::ErrorKind).

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
