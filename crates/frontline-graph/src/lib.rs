//! Territory Graph Store for the Frontline territorial control core.
//!
//! This crate models the static side of the world: territories arranged in a
//! region/district/control-point hierarchy, designer-authored links, and
//! spatial lookups ("which territory is this player standing in").
//!
//! # Modules
//!
//! - [`error`] -- Error types for graph operations and catalog loading.
//! - [`territory_graph`] -- The graph itself: hierarchy, links, spatial
//!   queries, topology versioning.
//! - [`store`] -- [`GraphStore`], the lock-protected shared owner, and the
//!   [`TerritoryDirectory`] trait other components depend on.
//! - [`catalog`] -- YAML catalog loading and validation.
//! - [`starting_map`] -- Default two-region frontier map.

pub mod catalog;
pub mod error;
pub mod starting_map;
pub mod store;
pub mod territory_graph;

// Re-export primary types at crate root.
pub use catalog::{TerritoryCatalog, load_catalog};
pub use error::GraphError;
pub use starting_map::create_frontier_map;
pub use store::{GraphStore, TerritoryDirectory};
pub use territory_graph::{TerritoryGraph, ordered_pair};
