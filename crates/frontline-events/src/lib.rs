//! Event bus for the Frontline territorial control core.
//!
//! Every state change in the core produces a [`FrontlineEvent`]. The
//! [`EventBus`] stamps it with a global sequence number and delivers it in
//! two ways:
//!
//! - **In-process listeners** ([`EventListener`]) are called synchronously,
//!   in registration order, before `publish` returns. Route invalidation and
//!   siege termination rely on this: their effects are visible to any caller
//!   that observes the triggering update.
//! - **Remote observers** receive the same envelopes through a
//!   [`tokio::sync::broadcast`] channel (the `WebSocket` mirror subscribes
//!   here).
//!
//! [`FrontlineEvent`]: frontline_types::FrontlineEvent

pub mod bus;
pub mod recorder;

pub use bus::{EventBus, EventListener, REMOTE_CHANNEL_CAPACITY};
pub use recorder::EventRecorder;
