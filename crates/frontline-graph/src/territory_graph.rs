//! Territory graph: territories as nodes, hierarchy and explicit links as edges.
//!
//! The [`TerritoryGraph`] is the static backbone of the core. It stores every
//! [`Territory`] definition, indexes children per parent, keeps the set of
//! designer-authored links (bridges, tunnels, river crossings that proximity
//! alone would not produce), and answers spatial queries.
//!
//! Every structural edit bumps a topology version so derived structures (the
//! route planner's connection graph) can tell when they are stale.

use std::collections::{BTreeMap, BTreeSet};

use frontline_types::{Point, Territory, TerritoryId};

use crate::error::GraphError;

/// The territory graph holding all territory definitions.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TerritoryGraph {
    /// All territories indexed by their identifier.
    territories: BTreeMap<TerritoryId, Territory>,
    /// Hierarchy index: parent -> direct children.
    children: BTreeMap<TerritoryId, BTreeSet<TerritoryId>>,
    /// Explicit links, stored once with the smaller id first.
    links: BTreeSet<(TerritoryId, TerritoryId)>,
    /// Incremented on every structural edit.
    version: u64,
}

impl TerritoryGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            territories: BTreeMap::new(),
            children: BTreeMap::new(),
            links: BTreeSet::new(),
            version: 0,
        }
    }

    // -------------------------------------------------------------------
    // Territory operations
    // -------------------------------------------------------------------

    /// Add a territory to the graph.
    ///
    /// A territory with a parent must sit exactly one hierarchy level below
    /// it, and the parent must already be present.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateTerritory`], [`GraphError::InvalidRadius`],
    /// [`GraphError::InvalidValue`], [`GraphError::TerritoryNotFound`] for a
    /// missing parent, or [`GraphError::HierarchyMismatch`].
    pub fn add_territory(&mut self, territory: Territory) -> Result<(), GraphError> {
        let id = territory.id;
        if self.territories.contains_key(&id) {
            return Err(GraphError::DuplicateTerritory(id));
        }
        validate_definition(&territory)?;
        if let Some(parent) = territory.parent {
            self.check_parent(&territory, parent)?;
            self.children.entry(parent).or_default().insert(id);
        }
        self.territories.insert(id, territory);
        self.bump();
        Ok(())
    }

    /// Get a territory by id.
    pub fn get(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(&id)
    }

    /// Whether the graph holds this territory.
    pub fn contains(&self, id: TerritoryId) -> bool {
        self.territories.contains_key(&id)
    }

    /// Number of territories.
    pub fn len(&self) -> usize {
        self.territories.len()
    }

    /// Whether the graph holds no territories.
    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    /// All territory ids in ascending order.
    pub fn ids(&self) -> Vec<TerritoryId> {
        self.territories.keys().copied().collect()
    }

    /// Iterate over all territories in id order.
    pub fn territories(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    /// Topology version, incremented on every structural edit.
    pub const fn version(&self) -> u64 {
        self.version
    }

    // -------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------

    /// Parent of a territory, `None` for regions and unknown ids.
    pub fn parent_of(&self, id: TerritoryId) -> Option<TerritoryId> {
        self.territories.get(&id).and_then(|t| t.parent)
    }

    /// Direct children of a territory in id order.
    pub fn children_of(&self, id: TerritoryId) -> Vec<TerritoryId> {
        self.children
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ancestors of a territory, nearest first.
    pub fn ancestors(&self, id: TerritoryId) -> Vec<TerritoryId> {
        let mut out = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if out.contains(&parent) || out.len() >= self.territories.len() {
                break;
            }
            out.push(parent);
            current = self.parent_of(parent);
        }
        out
    }

    /// Move a territory under a new parent, or detach it with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::TerritoryNotFound`] when either id is unknown
    /// or [`GraphError::HierarchyMismatch`] when the levels do not fit.
    pub fn reparent(
        &mut self,
        id: TerritoryId,
        new_parent: Option<TerritoryId>,
    ) -> Result<(), GraphError> {
        let territory = self
            .territories
            .get(&id)
            .ok_or(GraphError::TerritoryNotFound(id))?;
        if let Some(parent) = new_parent {
            self.check_parent(territory, parent)?;
        }
        let old_parent = territory.parent;

        if let Some(old) = old_parent
            && let Some(siblings) = self.children.get_mut(&old)
        {
            siblings.remove(&id);
        }
        if let Some(parent) = new_parent {
            self.children.entry(parent).or_default().insert(id);
        }
        if let Some(t) = self.territories.get_mut(&id) {
            t.parent = new_parent;
        }
        self.bump();
        tracing::debug!(territory = %id, ?old_parent, ?new_parent, "territory reparented");
        Ok(())
    }

    fn check_parent(&self, child: &Territory, parent: TerritoryId) -> Result<(), GraphError> {
        let parent_def = self
            .territories
            .get(&parent)
            .ok_or(GraphError::TerritoryNotFound(parent))?;
        // Levels strictly deepen along parent edges, which also rules out cycles.
        if parent == child.id || parent_def.level.child_level() != Some(child.level) {
            return Err(GraphError::HierarchyMismatch {
                child: child.id,
                child_level: child.level,
                parent,
                parent_level: parent_def.level,
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Explicit links
    // -------------------------------------------------------------------

    /// Add a designer-authored link between two territories.
    ///
    /// Linking an already-linked pair is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::TerritoryNotFound`] or [`GraphError::SelfLink`].
    pub fn add_link(&mut self, a: TerritoryId, b: TerritoryId) -> Result<(), GraphError> {
        if !self.territories.contains_key(&a) {
            return Err(GraphError::TerritoryNotFound(a));
        }
        if !self.territories.contains_key(&b) {
            return Err(GraphError::TerritoryNotFound(b));
        }
        if a == b {
            return Err(GraphError::SelfLink(a));
        }
        if self.links.insert(ordered_pair(a, b)) {
            self.bump();
        }
        Ok(())
    }

    /// Whether an explicit link joins the two territories.
    pub fn is_linked(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.links.contains(&ordered_pair(a, b))
    }

    /// All explicit links, smaller id first.
    pub fn links(&self) -> Vec<(TerritoryId, TerritoryId)> {
        self.links.iter().copied().collect()
    }

    // -------------------------------------------------------------------
    // Spatial queries
    // -------------------------------------------------------------------

    /// Territories whose bounds intersect the circle at `center`, nearest
    /// first (ties by id).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidRadius`] for a negative or non-finite
    /// radius.
    pub fn territories_in_radius(
        &self,
        center: Point,
        radius: f64,
    ) -> Result<Vec<&Territory>, GraphError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(GraphError::InvalidRadius {
                radius,
                context: "spatial query",
            });
        }
        let mut hits: Vec<(f64, &Territory)> = self
            .territories
            .values()
            .filter_map(|t| {
                let distance = t.center().distance_to(center);
                (distance <= radius + t.bounds.radius).then_some((distance, t))
            })
            .collect();
        hits.sort_by(|(da, ta), (db, tb)| da.total_cmp(db).then(ta.id.cmp(&tb.id)));
        Ok(hits.into_iter().map(|(_, t)| t).collect())
    }

    /// The deepest territory containing `point`, e.g. the control point a
    /// player is standing on. Falls back to shallower levels when no deeper
    /// territory covers the point.
    pub fn territory_at(&self, point: Point) -> Option<&Territory> {
        self.territories
            .values()
            .filter(|t| t.bounds.contains(point))
            .max_by(|a, b| {
                a.level
                    .depth()
                    .cmp(&b.level.depth())
                    .then_with(|| {
                        // Prefer the closer center among same-depth overlaps.
                        b.center()
                            .distance_to(point)
                            .total_cmp(&a.center().distance_to(point))
                    })
                    .then_with(|| b.id.cmp(&a.id))
            })
    }

    fn bump(&mut self) {
        self.version = self.version.saturating_add(1);
    }
}

/// Canonical (min, max) order for an undirected pair.
pub fn ordered_pair(a: TerritoryId, b: TerritoryId) -> (TerritoryId, TerritoryId) {
    if a <= b { (a, b) } else { (b, a) }
}

fn validate_definition(territory: &Territory) -> Result<(), GraphError> {
    let radius = territory.bounds.radius;
    if !radius.is_finite() || radius <= 0.0 {
        return Err(GraphError::InvalidRadius {
            radius,
            context: "territory bounds",
        });
    }
    for (field, value) in [
        ("strategic_value", territory.strategic_value),
        ("tactical_value", territory.tactical_value),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(GraphError::InvalidValue {
                territory: territory.id,
                field,
                value,
            });
        }
    }
    if let Some(half_life) = territory.decay_half_life_secs
        && (!half_life.is_finite() || half_life <= 0.0)
    {
        return Err(GraphError::InvalidValue {
            territory: territory.id,
            field: "decay_half_life_secs",
            value: half_life,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use frontline_types::{HierarchyLevel, ResourceType, TerritoryBounds};

    use super::*;

    fn make(id: u32, level: HierarchyLevel, parent: Option<u32>, x: f64, r: f64) -> Territory {
        Territory {
            id: TerritoryId(id),
            name: format!("T{id}"),
            level,
            parent: parent.map(TerritoryId),
            bounds: TerritoryBounds::circle(Point::new(x, 0.0), r),
            strategic_value: 50.0,
            tactical_value: 25.0,
            resource: ResourceType::None,
            decay_half_life_secs: None,
        }
    }

    fn make_hierarchy() -> TerritoryGraph {
        let mut graph = TerritoryGraph::new();
        graph.add_territory(make(1, HierarchyLevel::Region, None, 0.0, 1000.0)).unwrap();
        graph.add_territory(make(10, HierarchyLevel::District, Some(1), -300.0, 300.0)).unwrap();
        graph.add_territory(make(11, HierarchyLevel::District, Some(1), 300.0, 300.0)).unwrap();
        graph
            .add_territory(make(100, HierarchyLevel::ControlPoint, Some(10), -300.0, 50.0))
            .unwrap();
        graph
    }

    #[test]
    fn add_and_get_territory() {
        let graph = make_hierarchy();
        assert_eq!(graph.len(), 4);
        assert!(graph.contains(TerritoryId(10)));
        assert_eq!(graph.get(TerritoryId(11)).map(|t| t.name.as_str()), Some("T11"));
        assert!(graph.get(TerritoryId(99)).is_none());
    }

    #[test]
    fn duplicate_territory_rejected() {
        let mut graph = make_hierarchy();
        let result = graph.add_territory(make(1, HierarchyLevel::Region, None, 0.0, 10.0));
        assert!(matches!(result, Err(GraphError::DuplicateTerritory(_))));
    }

    #[test]
    fn non_positive_radius_rejected() {
        let mut graph = TerritoryGraph::new();
        let result = graph.add_territory(make(1, HierarchyLevel::Region, None, 0.0, 0.0));
        assert!(matches!(result, Err(GraphError::InvalidRadius { .. })));
    }

    #[test]
    fn unknown_parent_rejected() {
        let mut graph = TerritoryGraph::new();
        let result = graph.add_territory(make(2, HierarchyLevel::District, Some(1), 0.0, 5.0));
        assert!(matches!(result, Err(GraphError::TerritoryNotFound(TerritoryId(1)))));
    }

    #[test]
    fn skipped_level_rejected() {
        let mut graph = make_hierarchy();
        let result =
            graph.add_territory(make(200, HierarchyLevel::ControlPoint, Some(1), 0.0, 5.0));
        assert!(matches!(result, Err(GraphError::HierarchyMismatch { .. })));
    }

    #[test]
    fn hierarchy_queries() {
        let graph = make_hierarchy();
        assert_eq!(graph.children_of(TerritoryId(1)), vec![TerritoryId(10), TerritoryId(11)]);
        assert_eq!(graph.parent_of(TerritoryId(100)), Some(TerritoryId(10)));
        assert_eq!(
            graph.ancestors(TerritoryId(100)),
            vec![TerritoryId(10), TerritoryId(1)]
        );
        assert!(graph.ancestors(TerritoryId(1)).is_empty());
    }

    #[test]
    fn reparent_moves_child_between_districts() {
        let mut graph = make_hierarchy();
        let before = graph.version();
        graph.reparent(TerritoryId(100), Some(TerritoryId(11))).unwrap();
        assert!(graph.children_of(TerritoryId(10)).is_empty());
        assert_eq!(graph.children_of(TerritoryId(11)), vec![TerritoryId(100)]);
        assert!(graph.version() > before);
    }

    #[test]
    fn reparent_onto_wrong_level_rejected() {
        let mut graph = make_hierarchy();
        let result = graph.reparent(TerritoryId(10), Some(TerritoryId(11)));
        assert!(matches!(result, Err(GraphError::HierarchyMismatch { .. })));
        assert_eq!(graph.parent_of(TerritoryId(10)), Some(TerritoryId(1)));
    }

    #[test]
    fn links_are_symmetric_and_deduplicated() {
        let mut graph = make_hierarchy();
        graph.add_link(TerritoryId(11), TerritoryId(10)).unwrap();
        let version = graph.version();
        graph.add_link(TerritoryId(10), TerritoryId(11)).unwrap();
        assert_eq!(graph.version(), version);
        assert!(graph.is_linked(TerritoryId(10), TerritoryId(11)));
        assert_eq!(graph.links(), vec![(TerritoryId(10), TerritoryId(11))]);
        assert!(matches!(
            graph.add_link(TerritoryId(10), TerritoryId(10)),
            Err(GraphError::SelfLink(_))
        ));
    }

    #[test]
    fn radius_query_sorted_by_distance() {
        let graph = make_hierarchy();
        let hits = graph.territories_in_radius(Point::new(250.0, 0.0), 10.0).unwrap();
        let ids: Vec<TerritoryId> = hits.iter().map(|t| t.id).collect();
        // 11 is closest, region 1 next, district 10 reaches x=0 so misses.
        assert_eq!(ids, vec![TerritoryId(11), TerritoryId(1)]);
    }

    #[test]
    fn negative_radius_rejected() {
        let graph = make_hierarchy();
        assert!(matches!(
            graph.territories_in_radius(Point::new(0.0, 0.0), -1.0),
            Err(GraphError::InvalidRadius { .. })
        ));
    }

    #[test]
    fn territory_at_prefers_deepest() {
        let graph = make_hierarchy();
        let at = graph.territory_at(Point::new(-290.0, 10.0)).map(|t| t.id);
        assert_eq!(at, Some(TerritoryId(100)));
        let at = graph.territory_at(Point::new(350.0, 0.0)).map(|t| t.id);
        assert_eq!(at, Some(TerritoryId(11)));
        assert!(graph.territory_at(Point::new(5000.0, 0.0)).is_none());
    }
}
