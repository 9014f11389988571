//! Siege Encounter State Machine for the Frontline territorial control core.
//!
//! A siege runs on one contested territory and moves one way through
//! Probe, Interdict, Dominate and Locked. A dominance meter tracks which
//! side is winning and two ticket pools track reinforcements. When a siege
//! ends its result is fed back into territorial influence.
//!
//! # Modules
//!
//! - [`config`] -- Phase thresholds, meter tuning, ticket pools, lock time.
//! - [`error`] -- Error types for siege operations.
//! - [`instance`] -- One encounter and its transition rules.
//! - [`manager`] -- [`SiegeManager`]: registry, events, replication.
//! - [`meter`] -- Dominance meter with once-per-direction notifications.
//! - [`tickets`] -- Attacker and defender ticket pools.

pub mod config;
pub mod error;
pub mod instance;
pub mod manager;
pub mod meter;
pub mod tickets;

pub use config::{PhaseThresholds, SiegeConfig};
pub use error::SiegeError;
pub use instance::{Ending, SiegeInstance};
pub use manager::{Role, SiegeManager, SiegeOutcome, SiegeSnapshot, SiegeTickReport, SiegeUpdate};
pub use meter::{Crossing, DominanceMeter};
pub use tickets::TicketPools;
