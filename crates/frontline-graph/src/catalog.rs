//! Territory catalog loading.
//!
//! Territory definitions and hierarchy are loaded once at startup from a
//! YAML file:
//!
//! ```yaml
//! territories:
//!   - id: 1
//!     name: Northreach
//!     level: region
//!     bounds: { center: { x: 0.0, y: 3000.0 }, radius: 3000.0 }
//!     strategic_value: 70.0
//!     resource: agriculture
//!   - id: 10
//!     name: Ashford
//!     level: district
//!     parent: 1
//!     bounds: { center: { x: -1800.0, y: 1800.0 }, radius: 800.0 }
//! links:
//!   - [10, 20]
//! ```
//!
//! Entries may appear in any order; parents are inserted before children.

use std::path::Path;

use frontline_types::{Territory, TerritoryId};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::territory_graph::TerritoryGraph;

/// On-disk catalog layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerritoryCatalog {
    /// Territory definitions.
    #[serde(default)]
    pub territories: Vec<Territory>,
    /// Explicit links between territories.
    #[serde(default)]
    pub links: Vec<(TerritoryId, TerritoryId)>,
}

impl TerritoryCatalog {
    /// Parse a catalog from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Yaml`] when the document does not match the
    /// catalog schema.
    pub fn parse(yaml: &str) -> Result<Self, GraphError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Read and parse a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] or [`GraphError::Yaml`].
    pub fn from_file(path: &Path) -> Result<Self, GraphError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Validate the catalog and build a graph from it.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure reported by
    /// [`TerritoryGraph::add_territory`] or [`TerritoryGraph::add_link`].
    pub fn into_graph(self) -> Result<TerritoryGraph, GraphError> {
        let mut territories = self.territories;
        // Level depth order guarantees every parent is inserted first.
        territories.sort_by_key(|t| (t.level.depth(), t.id));

        let mut graph = TerritoryGraph::new();
        for territory in territories {
            graph.add_territory(territory)?;
        }
        for (a, b) in self.links {
            graph.add_link(a, b)?;
        }
        tracing::info!(
            territories = graph.len(),
            links = graph.links().len(),
            "territory catalog loaded"
        );
        Ok(graph)
    }
}

/// Load a catalog file straight into a graph.
///
/// # Errors
///
/// Returns any read, parse, or validation error.
pub fn load_catalog(path: &Path) -> Result<TerritoryGraph, GraphError> {
    TerritoryCatalog::from_file(path)?.into_graph()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use frontline_types::{HierarchyLevel, ResourceType};

    use super::*;

    const SAMPLE: &str = r"
territories:
  - id: 10
    name: Ashford
    level: district
    parent: 1
    bounds: { center: { x: -10.0, y: 0.0 }, radius: 5.0 }
  - id: 1
    name: Northreach
    level: region
    bounds: { center: { x: 0.0, y: 0.0 }, radius: 50.0 }
    strategic_value: 70.0
    resource: agriculture
  - id: 11
    name: Coldwater
    level: district
    parent: 1
    bounds: { center: { x: 10.0, y: 0.0 }, radius: 5.0 }
links:
  - [10, 11]
";

    #[test]
    fn parses_out_of_order_catalog() {
        let graph = TerritoryCatalog::parse(SAMPLE).unwrap().into_graph().unwrap();
        assert_eq!(graph.len(), 3);
        let region = graph.get(TerritoryId(1)).unwrap();
        assert_eq!(region.level, HierarchyLevel::Region);
        assert_eq!(region.resource, ResourceType::Agriculture);
        assert_eq!(graph.children_of(TerritoryId(1)).len(), 2);
        assert!(graph.is_linked(TerritoryId(11), TerritoryId(10)));
    }

    #[test]
    fn empty_document_is_an_empty_catalog() {
        let catalog = TerritoryCatalog::parse("{}").unwrap();
        assert!(catalog.territories.is_empty());
        assert!(catalog.into_graph().unwrap().is_empty());
    }

    #[test]
    fn unknown_parent_fails_validation() {
        let yaml = r"
territories:
  - id: 10
    name: Orphan
    level: district
    parent: 99
    bounds: { center: { x: 0.0, y: 0.0 }, radius: 5.0 }
";
        let result = TerritoryCatalog::parse(yaml).unwrap().into_graph();
        assert!(matches!(result, Err(GraphError::TerritoryNotFound(TerritoryId(99)))));
    }

    #[test]
    fn duplicate_ids_fail_validation() {
        let yaml = r"
territories:
  - { id: 1, name: A, level: region, bounds: { center: { x: 0.0, y: 0.0 }, radius: 5.0 } }
  - { id: 1, name: B, level: region, bounds: { center: { x: 9.0, y: 0.0 }, radius: 5.0 } }
";
        let result = TerritoryCatalog::parse(yaml).unwrap().into_graph();
        assert!(matches!(result, Err(GraphError::DuplicateTerritory(_))));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        assert!(matches!(
            TerritoryCatalog::parse("territories: [ { id: nope } ]"),
            Err(GraphError::Yaml { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_catalog(Path::new("/nonexistent/frontline/catalog.yaml"));
        assert!(matches!(result, Err(GraphError::Io { .. })));
    }
}
