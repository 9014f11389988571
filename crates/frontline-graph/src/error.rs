//! Error types for the `frontline-graph` crate.

use frontline_types::{Classify, ErrorKind, HierarchyLevel, TerritoryId};

/// Errors that can occur during territory graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A territory was not found in the graph.
    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// A territory with the same id already exists.
    #[error("duplicate territory id: {0}")]
    DuplicateTerritory(TerritoryId),

    /// A radius was negative, zero where a size is required, or not finite.
    #[error("invalid radius {radius} ({context})")]
    InvalidRadius {
        /// The rejected radius.
        radius: f64,
        /// What the radius was for.
        context: &'static str,
    },

    /// A value score fell outside `[0, 100]`.
    #[error("territory {territory}: {field} {value} is outside [0, 100]")]
    InvalidValue {
        /// The offending territory.
        territory: TerritoryId,
        /// Which score.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A parent/child pair skipped or inverted a hierarchy level.
    #[error("territory {child} ({child_level:?}) cannot sit under {parent} ({parent_level:?})")]
    HierarchyMismatch {
        /// The child territory.
        child: TerritoryId,
        /// The child's level.
        child_level: HierarchyLevel,
        /// The proposed parent.
        parent: TerritoryId,
        /// The parent's level.
        parent_level: HierarchyLevel,
    },

    /// A territory was linked to itself.
    #[error("territory {0} cannot link to itself")]
    SelfLink(TerritoryId),

    /// Reading a catalog file failed.
    #[error("failed to read territory catalog: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A catalog file was not valid YAML for the catalog schema.
    #[error("failed to parse territory catalog: {source}")]
    Yaml {
        /// The underlying YAML error.
        #[from]
        source: serde_yml::Error,
    },
}

impl Classify for GraphError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::TerritoryNotFound(_) => ErrorKind::NotFound,
            Self::DuplicateTerritory(_) => ErrorKind::Conflict,
            Self::InvalidRadius { .. }
            | Self::InvalidValue { .. }
            | Self::HierarchyMismatch { .. }
            | Self::SelfLink(_)
            | Self::Io { .. }
            | Self::Yaml { .. } => ErrorKind::InvalidArgument,
        }
    }
}
