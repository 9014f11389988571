//! In-memory route registry with the indexes the planner needs.
//!
//! Besides the routes themselves the registry keeps two indexes over
//! *active* routes only: parameter hash per faction (cache lookups) and
//! territory to routes (invalidation scans).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use frontline_types::{ConvoyRoute, FactionId, RouteId, TerritoryId};

/// Route storage and indexes.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: BTreeMap<RouteId, ConvoyRoute>,
    by_params: BTreeMap<(FactionId, u64), RouteId>,
    by_territory: BTreeMap<TerritoryId, BTreeSet<RouteId>>,
}

impl RouteRegistry {
    /// Empty registry.
    pub const fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
            by_params: BTreeMap::new(),
            by_territory: BTreeMap::new(),
        }
    }

    /// Register a route, indexing it when active.
    pub fn insert(&mut self, route: ConvoyRoute) {
        if route.active {
            self.index(&route);
        }
        self.routes.insert(route.id, route);
    }

    fn index(&mut self, route: &ConvoyRoute) {
        self.by_params.insert((route.faction, route.params_hash), route.id);
        for territory in &route.path {
            self.by_territory.entry(*territory).or_default().insert(route.id);
        }
    }

    fn unindex(&mut self, route: &ConvoyRoute) {
        if self.by_params.get(&(route.faction, route.params_hash)) == Some(&route.id) {
            self.by_params.remove(&(route.faction, route.params_hash));
        }
        for territory in &route.path {
            if let Some(ids) = self.by_territory.get_mut(territory) {
                ids.remove(&route.id);
                if ids.is_empty() {
                    self.by_territory.remove(territory);
                }
            }
        }
    }

    /// A route by id.
    pub fn get(&self, id: RouteId) -> Option<&ConvoyRoute> {
        self.routes.get(&id)
    }

    /// Mutable access for re-scoring. Callers must not change the path,
    /// faction, hash, or active flag through this handle.
    pub fn get_mut(&mut self, id: RouteId) -> Option<&mut ConvoyRoute> {
        self.routes.get_mut(&id)
    }

    /// Active route with matching generation parameters.
    pub fn find_active(&self, faction: FactionId, params_hash: u64) -> Option<RouteId> {
        self.by_params.get(&(faction, params_hash)).copied()
    }

    /// Active routes whose path contains the territory.
    pub fn active_through(&self, territory: TerritoryId) -> Vec<RouteId> {
        self.by_territory
            .get(&territory)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Active routes held by a faction.
    pub fn active_count(&self, faction: FactionId) -> usize {
        self.routes
            .values()
            .filter(|r| r.active && r.faction == faction)
            .count()
    }

    /// Mark a route inactive. Returns the route when it was active.
    pub fn deactivate(
        &mut self,
        id: RouteId,
        cause: &str,
        now: DateTime<Utc>,
    ) -> Option<ConvoyRoute> {
        let route = self.routes.get(&id)?;
        if !route.active {
            return None;
        }
        let snapshot = route.clone();
        self.unindex(&snapshot);
        let route = self.routes.get_mut(&id)?;
        route.active = false;
        route.invalidated_at = Some(now);
        route.invalidation_cause = Some(cause.to_string());
        Some(route.clone())
    }

    /// Remove a route entirely.
    pub fn remove(&mut self, id: RouteId) -> Option<ConvoyRoute> {
        let route = self.routes.remove(&id)?;
        if route.active {
            self.unindex(&route);
        }
        Some(route)
    }

    /// Remove every route of a faction, returning them.
    pub fn remove_faction(&mut self, faction: FactionId) -> Vec<ConvoyRoute> {
        let ids: Vec<RouteId> = self
            .routes
            .values()
            .filter(|r| r.faction == faction)
            .map(|r| r.id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Purge inactive routes invalidated at or before `cutoff`.
    pub fn purge_inactive(&mut self, cutoff: DateTime<Utc>) -> usize {
        let expired: Vec<RouteId> = self
            .routes
            .values()
            .filter(|r| !r.active && r.invalidated_at.is_some_and(|at| at <= cutoff))
            .map(|r| r.id)
            .collect();
        for id in &expired {
            self.routes.remove(id);
        }
        expired.len()
    }

    /// Active routes last validated at or before `cutoff`, oldest first.
    pub fn stale_active(&self, cutoff: DateTime<Utc>, limit: usize) -> Vec<RouteId> {
        let mut stale: Vec<(DateTime<Utc>, RouteId)> = self
            .routes
            .values()
            .filter(|r| r.active && r.last_validated <= cutoff)
            .map(|r| (r.last_validated, r.id))
            .collect();
        stale.sort_unstable();
        stale.into_iter().take(limit).map(|(_, id)| id).collect()
    }

    /// All routes, optionally filtered by faction and activity.
    pub fn list(&self, faction: Option<FactionId>, active_only: bool) -> Vec<ConvoyRoute> {
        self.routes
            .values()
            .filter(|r| faction.is_none_or(|f| r.faction == f))
            .filter(|r| !active_only || r.active)
            .cloned()
            .collect()
    }

    /// Total routes held, active or not.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
