//! Error types for the `frontline-ai` crate.

use frontline_territory::TerritoryError;
use frontline_types::{Classify, ErrorKind, FactionId, TerritoryId};

/// Errors returned by the faction AI manager.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// The faction has no profile or strategy.
    #[error("unknown faction: {0}")]
    UnknownFaction(FactionId),

    /// The territory is not in the world snapshot.
    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// A decision or parameter was out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The state manager rejected a write.
    #[error("territorial write failed: {source}")]
    Territory {
        /// The underlying territory error.
        #[from]
        source: TerritoryError,
    },
}

impl Classify for AiError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownFaction(_) | Self::TerritoryNotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Territory { source } => source.kind(),
        }
    }
}
