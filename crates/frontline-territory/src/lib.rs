//! Territorial State Manager for the Frontline territorial control core.
//!
//! The manager is the only writer of per-territory influence. Every accepted
//! change produces a [`TerritorialUpdate`](frontline_types::TerritorialUpdate)
//! and, when dominance or contested status flips, distinct control events on
//! the shared [`EventBus`](frontline_events::EventBus).
//!
//! # Modules
//!
//! - [`config`] -- Influence thresholds, decay half-life, history size.
//! - [`control`] -- Dominance and contested-status derivation.
//! - [`decay`] -- Exponential relaxation toward equilibrium.
//! - [`error`] -- Error types for state operations.
//! - [`manager`] -- [`TerritorialStateManager`]: writes, decay, queries.
//! - [`snapshot`] -- Lock-free copies for readers.
//! - [`traits`] -- Narrow service interfaces used by downstream components.

pub mod config;
pub mod control;
pub mod decay;
pub mod error;
pub mod manager;
pub mod snapshot;
pub mod traits;

pub use config::InfluenceConfig;
pub use control::{ControlRules, INFLUENCE_MAX, INFLUENCE_MIN, derive_control};
pub use error::TerritoryError;
pub use manager::{DecayReport, TerritorialStateManager};
pub use snapshot::{TerritorySnapshot, WorldSnapshot};
pub use traits::{ControlView, InfluenceSink, StampedControl, WorldView};
