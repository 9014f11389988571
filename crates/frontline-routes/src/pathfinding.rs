//! Hop-limited A* over the connection graph.
//!
//! Edge cost is `distance * (2 - security) * faction_penalty`, where the
//! faction penalty is the hostile multiplier when the edge enters territory
//! held by another faction and the friendly multiplier when both endpoints
//! are held by the requester. Edges below the requested minimum security are
//! never traversed, so every path found has a weakest-link security at or
//! above that minimum.
//!
//! Search states are `(territory, hops used)` so the hop limit is exact. A
//! state is pruned when the same territory was already settled with no more
//! hops and no more cost.
//!
//! The straight-line heuristic is scaled by the smallest possible cost
//! factor, which keeps it admissible (and consistent) even when the
//! friendly multiplier discounts edges below their geometric length.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use frontline_types::{FactionId, TerritoryControl, TerritoryId};
use ordered_float::OrderedFloat;

use crate::connection::ConnectionGraph;

/// Tolerance when discarding stale heap entries.
const STALE_EPSILON: f64 = 1e-9;

/// A single search request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Requesting faction.
    pub faction: FactionId,
    /// Start territory.
    pub source: TerritoryId,
    /// Goal territory.
    pub destination: TerritoryId,
    /// Edges below this security are not traversed.
    pub min_security: f64,
    /// Maximum number of edges on the path.
    pub max_hops: u32,
    /// Multiplier for entering another faction's territory.
    pub hostile_penalty: f64,
    /// Multiplier for legs inside the requester's territory.
    pub friendly_bonus: f64,
}

/// A path found by [`find_path`].
#[derive(Debug, Clone, PartialEq)]
pub struct FoundPath {
    /// Territories from source to destination inclusive.
    pub path: Vec<TerritoryId>,
    /// Total weighted cost.
    pub cost: f64,
    /// Sum of segment lengths.
    pub distance: f64,
    /// Weakest edge security along the path.
    pub security: f64,
    /// Search states expanded.
    pub expanded: usize,
}

/// Multiplier applied to an edge for the requesting faction.
pub fn faction_penalty(
    from: TerritoryControl,
    to: TerritoryControl,
    faction: FactionId,
    hostile_penalty: f64,
    friendly_bonus: f64,
) -> f64 {
    match to.dominant {
        Some(owner) if owner != faction => hostile_penalty,
        Some(_) if from.dominant == Some(faction) => friendly_bonus,
        _ => 1.0,
    }
}

/// Weighted cost of traversing one edge.
pub fn edge_cost(distance: f64, security: f64, penalty: f64) -> f64 {
    distance * (2.0 - security) * penalty
}

type Label = (TerritoryId, u32);

/// Find the cheapest hop-limited path, or `None` when none qualifies.
pub fn find_path(
    graph: &ConnectionGraph,
    controls: &BTreeMap<TerritoryId, TerritoryControl>,
    params: &SearchParams,
) -> Option<FoundPath> {
    if params.source == params.destination
        || !graph.contains(params.source)
        || !graph.contains(params.destination)
    {
        return None;
    }

    let goal_center = graph.center(params.destination)?;
    let min_factor = params.friendly_bonus.min(params.hostile_penalty).clamp(0.0, 1.0);
    let heuristic = |id: TerritoryId| {
        graph
            .center(id)
            .map_or(0.0, |c| c.distance_to(goal_center) * min_factor)
    };
    let control = |id: TerritoryId| controls.get(&id).copied().unwrap_or_default();

    let start: Label = (params.source, 0);
    let mut open = BinaryHeap::new();
    let mut g_scores: BTreeMap<Label, f64> = BTreeMap::new();
    let mut came_from: BTreeMap<Label, Label> = BTreeMap::new();
    let mut settled: BTreeMap<TerritoryId, Vec<(u32, f64)>> = BTreeMap::new();
    let mut expanded = 0_usize;

    g_scores.insert(start, 0.0);
    open.push(Reverse((OrderedFloat(heuristic(params.source)), 0_u32, params.source)));

    while let Some(Reverse((OrderedFloat(f_cost), hops, node))) = open.pop() {
        let Some(&g_cost) = g_scores.get(&(node, hops)) else {
            continue;
        };
        if f_cost > g_cost + heuristic(node) + STALE_EPSILON {
            continue;
        }
        if node == params.destination {
            let path = reconstruct_path(&came_from, (node, hops));
            return summarize(graph, path, g_cost, expanded);
        }

        let labels = settled.entry(node).or_default();
        if labels.iter().any(|&(h, g)| h <= hops && g <= g_cost) {
            continue;
        }
        labels.push((hops, g_cost));
        expanded = expanded.saturating_add(1);

        if hops >= params.max_hops {
            continue;
        }
        let next_hops = hops.saturating_add(1);
        let from_control = control(node);

        for edge in graph.neighbors(node) {
            if edge.security < params.min_security {
                continue;
            }
            let Some(next) = edge.other(node) else {
                continue;
            };
            let penalty = faction_penalty(
                from_control,
                control(next),
                params.faction,
                params.hostile_penalty,
                params.friendly_bonus,
            );
            let tentative = g_cost + edge_cost(edge.distance, edge.security, penalty);
            if !tentative.is_finite() {
                continue;
            }
            let label = (next, next_hops);
            let improves = g_scores.get(&label).is_none_or(|&existing| tentative < existing);
            if improves {
                g_scores.insert(label, tentative);
                came_from.insert(label, (node, hops));
                open.push(Reverse((OrderedFloat(tentative + heuristic(next)), next_hops, next)));
            }
        }
    }

    None
}

fn reconstruct_path(came_from: &BTreeMap<Label, Label>, goal: Label) -> Vec<TerritoryId> {
    let mut path = vec![goal.0];
    let mut current = goal;
    while let Some(&previous) = came_from.get(&current) {
        path.push(previous.0);
        current = previous;
    }
    path.reverse();
    path
}

fn summarize(
    graph: &ConnectionGraph,
    path: Vec<TerritoryId>,
    cost: f64,
    expanded: usize,
) -> Option<FoundPath> {
    let mut distance = 0.0;
    let mut security = f64::INFINITY;
    for pair in path.windows(2) {
        let (Some(a), Some(b)) = (pair.first(), pair.get(1)) else {
            continue;
        };
        let edge = graph.edge(*a, *b)?;
        distance += edge.distance;
        security = security.min(edge.security);
    }
    if path.len() < 2 || !security.is_finite() {
        return None;
    }
    Some(FoundPath {
        path,
        cost,
        distance,
        security,
        expanded,
    })
}

#[cfg(test)]
mod tests {
    use frontline_types::{HierarchyLevel, Point, ResourceType, Territory, TerritoryBounds};

    use super::*;
    use crate::config::RouteConfig;

    const S: TerritoryId = TerritoryId(1);
    const H: TerritoryId = TerritoryId(2);
    const D: TerritoryId = TerritoryId(3);
    const N1: TerritoryId = TerritoryId(4);
    const N2: TerritoryId = TerritoryId(5);
    const US: FactionId = FactionId(1);
    const THEM: FactionId = FactionId(2);

    fn at(id: TerritoryId, x: f64, y: f64) -> Territory {
        Territory {
            id,
            name: format!("T{id}"),
            level: HierarchyLevel::District,
            parent: None,
            bounds: TerritoryBounds::circle(Point::new(x, y), 450.0),
            strategic_value: 10.0,
            tactical_value: 10.0,
            resource: ResourceType::None,
            decay_half_life_secs: None,
        }
    }

    /// S and D with a short road through H and a longer northern detour.
    fn diamond() -> ConnectionGraph {
        let config = RouteConfig {
            connection_factor: 1.5,
            ..RouteConfig::default()
        };
        let territories = [
            at(S, 0.0, 0.0),
            at(H, 1000.0, 0.0),
            at(D, 2000.0, 0.0),
            at(N1, 500.0, 900.0),
            at(N2, 1500.0, 900.0),
        ];
        ConnectionGraph::build(&territories, &[], &config, 0)
    }

    fn params(max_hops: u32) -> SearchParams {
        SearchParams {
            faction: US,
            source: S,
            destination: D,
            min_security: 0.0,
            max_hops,
            hostile_penalty: 3.0,
            friendly_bonus: 0.1,
        }
    }

    fn held_by(faction: FactionId) -> TerritoryControl {
        TerritoryControl {
            dominant: Some(faction),
            contested: false,
        }
    }

    #[test]
    fn shortest_path_through_neutral_ground() {
        let found = find_path(&diamond(), &BTreeMap::new(), &params(12));
        assert_eq!(found.map(|f| f.path), Some(vec![S, H, D]));
    }

    #[test]
    fn hostile_territory_is_avoided_when_a_detour_exists() {
        let mut graph = diamond();
        let mut controls = BTreeMap::new();
        controls.insert(H, held_by(THEM));
        graph.refresh_all(&controls, &RouteConfig::default().security);

        let found = find_path(&graph, &controls, &params(12));
        assert_eq!(found.map(|f| f.path), Some(vec![S, N1, N2, D]));
    }

    #[test]
    fn hop_limit_forces_the_short_hostile_road() {
        let mut graph = diamond();
        let mut controls = BTreeMap::new();
        controls.insert(H, held_by(THEM));
        graph.refresh_all(&controls, &RouteConfig::default().security);

        let found = find_path(&graph, &controls, &params(2));
        assert_eq!(found.as_ref().map(|f| f.path.clone()), Some(vec![S, H, D]));
        assert!(find_path(&graph, &controls, &params(1)).is_none());
    }

    #[test]
    fn friendly_legs_are_discounted() {
        let mut graph = diamond();
        let mut controls = BTreeMap::new();
        for id in [S, N1, N2, D] {
            controls.insert(id, held_by(US));
        }
        graph.refresh_all(&controls, &RouteConfig::default().security);
        let found = find_path(&graph, &controls, &params(12)).map(|f| (f.path, f.security));
        let (path, security) = found.unwrap_or_default();
        assert_eq!(path, vec![S, N1, N2, D]);
        assert!((security - 0.9).abs() < 1e-12);
    }

    #[test]
    fn minimum_security_prunes_edges() {
        let mut graph = diamond();
        let mut controls = BTreeMap::new();
        controls.insert(
            H,
            TerritoryControl {
                dominant: None,
                contested: true,
            },
        );
        graph.refresh_all(&controls, &RouteConfig::default().security);
        let strict = SearchParams {
            min_security: 0.45,
            ..params(2)
        };
        assert!(find_path(&graph, &controls, &strict).is_none());
        let relaxed = SearchParams {
            min_security: 0.45,
            ..params(3)
        };
        let found = find_path(&graph, &controls, &relaxed).map(|f| f.path);
        assert_eq!(found, Some(vec![S, N1, N2, D]));
    }

    #[test]
    fn distance_is_sum_of_segments() {
        let found = find_path(&diamond(), &BTreeMap::new(), &params(12));
        let distance = found.map_or(0.0, |f| f.distance);
        assert!((distance - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn same_source_and_destination_has_no_path() {
        let same = SearchParams {
            destination: S,
            ..params(3)
        };
        assert!(find_path(&diamond(), &BTreeMap::new(), &same).is_none());
    }
}
