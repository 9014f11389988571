//! Shared, lock-protected access to the territory graph.
//!
//! [`GraphStore`] wraps a [`TerritoryGraph`] in a single `RwLock` (the graph
//! is read constantly and edited rarely). Components that only need to look
//! territories up depend on the [`TerritoryDirectory`] trait instead of the
//! concrete store, so tests can hand them a fixed fake.

use std::sync::RwLock;

use frontline_types::sync::{read, write};
use frontline_types::{Point, Territory, TerritoryId};

use crate::error::GraphError;
use crate::territory_graph::TerritoryGraph;

/// Read access to territory definitions.
pub trait TerritoryDirectory: Send + Sync {
    /// Definition of one territory.
    fn territory(&self, id: TerritoryId) -> Option<Territory>;

    /// Whether the territory exists.
    fn contains(&self, id: TerritoryId) -> bool {
        self.territory(id).is_some()
    }

    /// Every territory in id order.
    fn all_territories(&self) -> Vec<Territory>;

    /// Designer-authored links, smaller id first.
    fn explicit_links(&self) -> Vec<(TerritoryId, TerritoryId)>;

    /// Version counter bumped on every structural edit.
    fn topology_version(&self) -> u64;

    /// Territories intersecting a circle, nearest first.
    fn territories_in_radius(
        &self,
        center: Point,
        radius: f64,
    ) -> Result<Vec<Territory>, GraphError>;

    /// Deepest territory containing a point.
    fn territory_at(&self, point: Point) -> Option<Territory>;
}

/// Thread-safe owner of the territory graph.
#[derive(Debug, Default)]
pub struct GraphStore {
    graph: RwLock<TerritoryGraph>,
}

impl GraphStore {
    /// Wrap a loaded graph.
    pub const fn new(graph: TerritoryGraph) -> Self {
        Self {
            graph: RwLock::new(graph),
        }
    }

    /// Run a closure against the graph under the read lock.
    pub fn with_graph<R>(&self, f: impl FnOnce(&TerritoryGraph) -> R) -> R {
        f(&read(&self.graph))
    }

    /// Clone the whole graph for serialization without holding the lock.
    pub fn snapshot(&self) -> TerritoryGraph {
        read(&self.graph).clone()
    }

    /// Number of territories.
    pub fn len(&self) -> usize {
        read(&self.graph).len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        read(&self.graph).is_empty()
    }

    /// Add a territory. See [`TerritoryGraph::add_territory`].
    pub fn add_territory(&self, territory: Territory) -> Result<(), GraphError> {
        let id = territory.id;
        write(&self.graph).add_territory(territory)?;
        tracing::info!(territory = %id, "territory added");
        Ok(())
    }

    /// Add an explicit link. See [`TerritoryGraph::add_link`].
    pub fn add_link(&self, a: TerritoryId, b: TerritoryId) -> Result<(), GraphError> {
        write(&self.graph).add_link(a, b)
    }

    /// Reparent a territory. See [`TerritoryGraph::reparent`].
    pub fn reparent(
        &self,
        id: TerritoryId,
        new_parent: Option<TerritoryId>,
    ) -> Result<(), GraphError> {
        write(&self.graph).reparent(id, new_parent)
    }

    /// Parent of a territory.
    pub fn parent_of(&self, id: TerritoryId) -> Option<TerritoryId> {
        read(&self.graph).parent_of(id)
    }

    /// Direct children of a territory.
    pub fn children_of(&self, id: TerritoryId) -> Vec<TerritoryId> {
        read(&self.graph).children_of(id)
    }

    /// Ancestors of a territory, nearest first.
    pub fn ancestors(&self, id: TerritoryId) -> Vec<TerritoryId> {
        read(&self.graph).ancestors(id)
    }
}

impl TerritoryDirectory for GraphStore {
    fn territory(&self, id: TerritoryId) -> Option<Territory> {
        read(&self.graph).get(id).cloned()
    }

    fn contains(&self, id: TerritoryId) -> bool {
        read(&self.graph).contains(id)
    }

    fn all_territories(&self) -> Vec<Territory> {
        read(&self.graph).territories().cloned().collect()
    }

    fn explicit_links(&self) -> Vec<(TerritoryId, TerritoryId)> {
        read(&self.graph).links()
    }

    fn topology_version(&self) -> u64 {
        read(&self.graph).version()
    }

    fn territories_in_radius(
        &self,
        center: Point,
        radius: f64,
    ) -> Result<Vec<Territory>, GraphError> {
        let graph = read(&self.graph);
        let hits = graph.territories_in_radius(center, radius)?;
        Ok(hits.into_iter().cloned().collect())
    }

    fn territory_at(&self, point: Point) -> Option<Territory> {
        read(&self.graph).territory_at(point).cloned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use frontline_types::{HierarchyLevel, ResourceType, TerritoryBounds};

    use super::*;

    fn region(id: u32, x: f64) -> Territory {
        Territory {
            id: TerritoryId(id),
            name: format!("R{id}"),
            level: HierarchyLevel::Region,
            parent: None,
            bounds: TerritoryBounds::circle(Point::new(x, 0.0), 100.0),
            strategic_value: 10.0,
            tactical_value: 10.0,
            resource: ResourceType::Trade,
            decay_half_life_secs: None,
        }
    }

    #[test]
    fn edits_are_visible_through_directory() {
        let store = GraphStore::default();
        let version = store.topology_version();
        store.add_territory(region(1, 0.0)).unwrap();
        store.add_territory(region(2, 500.0)).unwrap();
        store.add_link(TerritoryId(1), TerritoryId(2)).unwrap();

        let directory: &dyn TerritoryDirectory = &store;
        assert!(directory.contains(TerritoryId(2)));
        assert_eq!(directory.all_territories().len(), 2);
        assert_eq!(directory.explicit_links(), vec![(TerritoryId(1), TerritoryId(2))]);
        assert!(directory.topology_version() > version);
    }

    #[test]
    fn spatial_queries_return_owned_copies() {
        let store = GraphStore::default();
        store.add_territory(region(1, 0.0)).unwrap();
        store.add_territory(region(2, 500.0)).unwrap();
        let hits = store.territories_in_radius(Point::new(450.0, 0.0), 0.0).unwrap();
        assert_eq!(hits.first().map(|t| t.id), Some(TerritoryId(2)));
        assert_eq!(hits.len(), 1);
        assert_eq!(
            store.territory_at(Point::new(10.0, 10.0)).map(|t| t.id),
            Some(TerritoryId(1))
        );
    }
}
