//! Error classification shared by every component crate.
//!
//! Each crate owns its own `thiserror` enum; all of them map onto an
//! [`ErrorKind`] so callers and the observer API can treat failures
//! uniformly.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Broad category of a failure returned by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown territory, route, faction, or siege.
    NotFound,
    /// Parameter rejected before any work started.
    InvalidArgument,
    /// A per-faction limit was reached.
    CapacityExceeded,
    /// Pathfinding found no acceptable route.
    NoViablePath,
    /// The operation is not allowed in the current state.
    Conflict,
}

/// Implemented by every domain error so it can be classified.
pub trait Classify {
    /// The broad category of this error.
    fn kind(&self) -> ErrorKind;
}
