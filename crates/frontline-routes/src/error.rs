//! Error types for the `frontline-routes` crate.

use frontline_types::{Classify, ErrorKind, FactionId, RouteId, TerritoryId};

/// Errors returned by the route planner.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// A territory in the request is not in the graph store.
    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// No route with this id is registered.
    #[error("route not found: {0}")]
    RouteNotFound(RouteId),

    /// A request parameter was rejected before any work began.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The faction already holds its maximum number of active routes.
    #[error("faction {faction} already holds {limit} active routes")]
    CapacityExceeded {
        /// The requesting faction.
        faction: FactionId,
        /// The configured limit.
        limit: usize,
    },

    /// The search found no path meeting the security and hop constraints.
    #[error("no viable path from {origin} to {destination} for faction {faction} (min security {min_security})")]
    NoViablePath {
        /// The requesting faction.
        faction: FactionId,
        /// Requested source territory.
        origin: TerritoryId,
        /// Requested destination.
        destination: TerritoryId,
        /// Requested minimum security.
        min_security: f64,
    },
}

impl Classify for RouteError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::TerritoryNotFound(_) | Self::RouteNotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::NoViablePath { .. } => ErrorKind::NoViablePath,
        }
    }
}
