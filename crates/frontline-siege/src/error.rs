//! Error types for the `frontline-siege` crate.

use frontline_types::{Classify, ErrorKind, SiegeId, SiegePhase, TerritoryId};

/// Errors returned by the siege manager.
#[derive(Debug, thiserror::Error)]
pub enum SiegeError {
    /// The territory has no control status.
    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// No siege is running on the territory.
    #[error("no active siege on territory {0}")]
    NoActiveSiege(TerritoryId),

    /// A siege is already running on the territory.
    #[error("territory {territory} already has siege {siege}")]
    AlreadyActive {
        /// Besieged territory.
        territory: TerritoryId,
        /// The running siege.
        siege: SiegeId,
    },

    /// Sieges only run on contested territories.
    #[error("territory {0} is not contested")]
    NotContested(TerritoryId),

    /// Mutations are only accepted by the authority.
    #[error("siege state is replicated here; only the authority may change it")]
    NotAuthoritative,

    /// Replicated snapshots are only accepted by replicas.
    #[error("the authority does not accept replicated siege state")]
    NotReplica,

    /// The current phase has not made enough progress to advance.
    #[error("phase {phase:?} on territory {territory} has progress {progress:.2}, needs {required:.2}")]
    PhaseNotReady {
        /// Besieged territory.
        territory: TerritoryId,
        /// Current phase.
        phase: SiegePhase,
        /// Progress so far.
        progress: f64,
        /// Progress needed.
        required: f64,
    },

    /// The siege is Locked and waits only for the lock to expire.
    #[error("siege on territory {0} is locked")]
    PhaseLocked(TerritoryId),

    /// A parameter was rejected before any work began.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Classify for SiegeError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::TerritoryNotFound(_) | Self::NoActiveSiege(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AlreadyActive { .. }
            | Self::NotContested(_)
            | Self::NotAuthoritative
            | Self::NotReplica
            | Self::PhaseNotReady { .. }
            | Self::PhaseLocked(_) => ErrorKind::Conflict,
        }
    }
}
