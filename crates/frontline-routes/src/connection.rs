//! The derived connection graph the planner searches over.
//!
//! Connections are symmetric and exist between territories of the same
//! hierarchy level whose centers lie within `connection_factor` times their
//! summed radii, plus every designer-authored link. A connection is
//! `direct` when the pair is within `adjacency_factor` of their summed radii
//! or explicitly linked.
//!
//! The graph is rebuilt in bulk when the territory topology changes and its
//! edge security is patched per territory when control changes.

use std::collections::{BTreeMap, BTreeSet};

use frontline_graph::ordered_pair;
use frontline_types::{Point, TerritorialConnection, Territory, TerritoryControl, TerritoryId};

use crate::config::{RouteConfig, SecurityModel};

/// Symmetric connection graph with per-edge security.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    /// Edges keyed by `(smaller id, larger id)`.
    edges: BTreeMap<(TerritoryId, TerritoryId), TerritorialConnection>,
    /// Neighbor index.
    adjacency: BTreeMap<TerritoryId, BTreeSet<TerritoryId>>,
    /// Territory centers for waypoints and the search heuristic.
    centers: BTreeMap<TerritoryId, Point>,
    /// Topology version of the directory the graph was built from.
    topology_version: u64,
}

impl ConnectionGraph {
    /// Build the graph from territory definitions and explicit links. Edge
    /// security starts at the model's neutral value.
    pub fn build(
        territories: &[Territory],
        links: &[(TerritoryId, TerritoryId)],
        config: &RouteConfig,
        topology_version: u64,
    ) -> Self {
        let neutral = config
            .security
            .edge_security(TerritoryControl::default(), TerritoryControl::default());
        let linked: BTreeSet<(TerritoryId, TerritoryId)> =
            links.iter().map(|(a, b)| ordered_pair(*a, *b)).collect();

        let mut graph = Self {
            centers: territories.iter().map(|t| (t.id, t.center())).collect(),
            topology_version,
            ..Self::default()
        };

        for (index, a) in territories.iter().enumerate() {
            for b in territories.iter().skip(index.saturating_add(1)) {
                let key = ordered_pair(a.id, b.id);
                let explicit = linked.contains(&key);
                let distance = a.center().distance_to(b.center());
                let reach = a.bounds.radius + b.bounds.radius;
                let same_level = a.level == b.level;
                let direct = explicit || (same_level && distance <= config.adjacency_factor * reach);
                let connected = direct || (same_level && distance <= config.connection_factor * reach);
                if connected {
                    graph.insert(TerritorialConnection {
                        a: key.0,
                        b: key.1,
                        distance,
                        direct,
                        security: neutral,
                    });
                }
            }
        }
        graph
    }

    fn insert(&mut self, connection: TerritorialConnection) {
        self.adjacency.entry(connection.a).or_default().insert(connection.b);
        self.adjacency.entry(connection.b).or_default().insert(connection.a);
        self.edges.insert((connection.a, connection.b), connection);
    }

    /// The connection between two territories, if any.
    pub fn edge(&self, a: TerritoryId, b: TerritoryId) -> Option<&TerritorialConnection> {
        self.edges.get(&ordered_pair(a, b))
    }

    /// Connections touching a territory, in neighbor id order.
    pub fn neighbors(&self, id: TerritoryId) -> Vec<&TerritorialConnection> {
        self.adjacency
            .get(&id)
            .map(|set| {
                set.iter()
                    .filter_map(|other| self.edges.get(&ordered_pair(id, *other)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Center of a territory in the graph.
    pub fn center(&self, id: TerritoryId) -> Option<Point> {
        self.centers.get(&id).copied()
    }

    /// Whether the graph knows this territory.
    pub fn contains(&self, id: TerritoryId) -> bool {
        self.centers.contains_key(&id)
    }

    /// Every connection in key order.
    pub fn edges(&self) -> impl Iterator<Item = &TerritorialConnection> {
        self.edges.values()
    }

    /// Number of connections.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Topology version the graph was built from.
    pub const fn topology_version(&self) -> u64 {
        self.topology_version
    }

    /// Recompute every edge's security. Returns how many edges changed.
    pub fn refresh_all(
        &mut self,
        controls: &BTreeMap<TerritoryId, TerritoryControl>,
        model: &SecurityModel,
    ) -> usize {
        let mut changed = 0_usize;
        for edge in self.edges.values_mut() {
            if rescore(edge, controls, model) {
                changed = changed.saturating_add(1);
            }
        }
        changed
    }

    /// Recompute security on edges touching one territory. Returns how many
    /// edges changed.
    pub fn refresh_territory(
        &mut self,
        territory: TerritoryId,
        controls: &BTreeMap<TerritoryId, TerritoryControl>,
        model: &SecurityModel,
    ) -> usize {
        let Some(neighbors) = self.adjacency.get(&territory) else {
            return 0;
        };
        let mut changed = 0_usize;
        for other in neighbors {
            if let Some(edge) = self.edges.get_mut(&ordered_pair(territory, *other))
                && rescore(edge, controls, model)
            {
                changed = changed.saturating_add(1);
            }
        }
        changed
    }
}

fn rescore(
    edge: &mut TerritorialConnection,
    controls: &BTreeMap<TerritoryId, TerritoryControl>,
    model: &SecurityModel,
) -> bool {
    let a = controls.get(&edge.a).copied().unwrap_or_default();
    let b = controls.get(&edge.b).copied().unwrap_or_default();
    let security = model.edge_security(a, b);
    let changed = (security - edge.security).abs() > f64::EPSILON;
    edge.security = security;
    changed
}

#[cfg(test)]
mod tests {
    use frontline_types::{FactionId, HierarchyLevel, ResourceType, TerritoryBounds};

    use super::*;

    fn at(id: u32, level: HierarchyLevel, x: f64, y: f64, radius: f64) -> Territory {
        Territory {
            id: TerritoryId(id),
            name: format!("T{id}"),
            level,
            parent: None,
            bounds: TerritoryBounds::circle(Point::new(x, y), radius),
            strategic_value: 10.0,
            tactical_value: 10.0,
            resource: ResourceType::None,
            decay_half_life_secs: None,
        }
    }

    fn line() -> Vec<Territory> {
        vec![
            at(1, HierarchyLevel::Region, 0.0, 0.0, 450.0),
            at(2, HierarchyLevel::Region, 1000.0, 0.0, 450.0),
            at(3, HierarchyLevel::Region, 2000.0, 0.0, 450.0),
            at(4, HierarchyLevel::Region, 5000.0, 0.0, 450.0),
            at(9, HierarchyLevel::District, 1000.0, 0.0, 450.0),
        ]
    }

    #[test]
    fn proximity_builds_direct_and_indirect_edges() {
        let graph = ConnectionGraph::build(&line(), &[], &RouteConfig::default(), 1);
        let one_two = graph.edge(TerritoryId(2), TerritoryId(1)).map(|e| e.direct);
        assert_eq!(one_two, Some(true));
        // 2000 apart: beyond 1.25 * 900, within 2.5 * 900.
        let one_three = graph.edge(TerritoryId(1), TerritoryId(3)).map(|e| e.direct);
        assert_eq!(one_three, Some(false));
        assert!(graph.edge(TerritoryId(3), TerritoryId(4)).is_none());
        // Different hierarchy levels never connect by proximity.
        assert!(graph.edge(TerritoryId(2), TerritoryId(9)).is_none());
        assert_eq!(graph.topology_version(), 1);
    }

    #[test]
    fn explicit_links_are_direct() {
        let links = [(TerritoryId(4), TerritoryId(3))];
        let graph = ConnectionGraph::build(&line(), &links, &RouteConfig::default(), 0);
        let edge = graph.edge(TerritoryId(3), TerritoryId(4));
        assert_eq!(edge.map(|e| e.direct), Some(true));
        assert_eq!(edge.map(|e| e.a), Some(TerritoryId(3)));
    }

    #[test]
    fn refresh_rescores_touching_edges_only() {
        let config = RouteConfig::default();
        let mut graph = ConnectionGraph::build(&line(), &[], &config, 0);
        let mut controls = BTreeMap::new();
        controls.insert(
            TerritoryId(3),
            TerritoryControl {
                dominant: None,
                contested: true,
            },
        );
        let changed = graph.refresh_territory(TerritoryId(3), &controls, &config.security);
        assert_eq!(changed, 2);
        let two_three = graph.edge(TerritoryId(2), TerritoryId(3)).map(|e| e.security);
        assert!(two_three.is_some_and(|s| (s - 0.3).abs() < 1e-12));
        let one_two = graph.edge(TerritoryId(1), TerritoryId(2)).map(|e| e.security);
        assert!(one_two.is_some_and(|s| (s - 0.5).abs() < 1e-12));

        controls.insert(
            TerritoryId(1),
            TerritoryControl {
                dominant: Some(FactionId(1)),
                contested: false,
            },
        );
        assert_eq!(graph.refresh_all(&controls, &config.security), 2);
        assert_eq!(graph.refresh_all(&controls, &config.security), 0);
    }
}
