//! Dynamic Route Planner for the Frontline territorial control core.
//!
//! Factions request convoy routes between territories. Routes are found with
//! a hop-limited A* search over the connection graph, weighted by edge
//! security and by who holds each territory, then cached by their
//! generation parameters until a control change along the path invalidates
//! them.
//!
//! # Modules
//!
//! - [`config`] -- Planner tuning and the edge security model.
//! - [`connection`] -- Connection graph derived from territory geometry.
//! - [`error`] -- Error types for route operations.
//! - [`hashing`] -- Stable FNV-1a hash of generation parameters.
//! - [`pathfinding`] -- Hop-limited, security-constrained A* search.
//! - [`planner`] -- [`RoutePlanner`]: generation, invalidation, maintenance.
//! - [`registry`] -- Route storage with cache and territory indexes.

pub mod config;
pub mod connection;
pub mod error;
pub mod hashing;
pub mod pathfinding;
pub mod planner;
pub mod registry;

pub use config::{RouteConfig, SecurityModel};
pub use connection::ConnectionGraph;
pub use error::RouteError;
pub use hashing::{FnvHasher, route_params_hash};
pub use pathfinding::{FoundPath, SearchParams, find_path};
pub use planner::{MaintenanceReport, RegenerationReport, RoutePlanner};
pub use registry::RouteRegistry;
