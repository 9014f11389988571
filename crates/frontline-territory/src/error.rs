//! Error types for the `frontline-territory` crate.

use frontline_graph::GraphError;
use frontline_types::{Classify, ErrorKind, TerritoryId};

/// Errors returned by the territorial state manager.
#[derive(Debug, thiserror::Error)]
pub enum TerritoryError {
    /// The territory is not in the graph store.
    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// A parameter was rejected before any work began.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A graph query failed.
    #[error("graph query failed: {source}")]
    Graph {
        /// The underlying graph error.
        #[from]
        source: GraphError,
    },
}

impl Classify for TerritoryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::TerritoryNotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Graph { source } => source.kind(),
        }
    }
}
