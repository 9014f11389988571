//! The dynamic route planner service.
//!
//! Holds two independently locked resources: the connection graph (with its
//! cached view of territorial control) and the route registry. When both are
//! needed the connection lock is taken first; the registry lock is never held
//! while acquiring the connection lock.
//!
//! The planner subscribes to the event bus. `InfluenceChanged` events carry
//! the resulting control status, which the planner compares with its cache;
//! any change patches edge security around that territory and deactivates
//! every route through it before the publishing call returns. The listener
//! path never calls back into the state manager.
//!
//! Each cached control is stamped with the update sequence that produced it.
//! Maintenance resyncs from a snapshot taken outside the connection lock, so
//! snapshot entries older than the cache are ignored.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use frontline_events::{EventBus, EventListener};
use frontline_graph::TerritoryDirectory;
use frontline_territory::ControlView;
use frontline_types::sync::{lock, read, write};
use frontline_types::{
    Clock, ConvoyRoute, EventEnvelope, FactionId, FrontlineEvent, ResourceType,
    TerritorialConnection, TerritoryControl, TerritoryId, RouteId, secs_delta,
};
use serde::Serialize;

use crate::config::RouteConfig;
use crate::connection::ConnectionGraph;
use crate::error::RouteError;
use crate::hashing::route_params_hash;
use crate::pathfinding::{SearchParams, find_path};
use crate::registry::RouteRegistry;

/// Distance over which a route's profitability halves.
const PROFIT_DISTANCE_SCALE: f64 = 1000.0;

/// Outcome of [`RoutePlanner::regenerate_all_faction_routes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegenerationReport {
    /// Routes cleared before regenerating.
    pub removed: usize,
    /// New routes registered.
    pub generated: usize,
    /// Requests answered from the cache.
    pub reused: usize,
    /// Pairs with no viable route (or over capacity).
    pub failed: usize,
    /// Pairs left for later maintenance passes.
    pub deferred: usize,
}

/// Outcome of one [`RoutePlanner::run_maintenance`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    /// Edges whose security changed.
    pub refreshed_edges: usize,
    /// Territories whose control drifted from the cache without an event.
    pub control_resyncs: usize,
    /// Stale routes re-scored.
    pub revalidated: usize,
    /// Routes deactivated by re-scoring.
    pub deactivated: usize,
    /// Inactive routes purged after their TTL.
    pub purged: usize,
    /// Corrupt entries logged and skipped.
    pub skipped: usize,
    /// Deferred regeneration pairs processed.
    pub regenerated: usize,
}

/// Connection graph plus the control view it was scored from.
#[derive(Debug)]
struct ConnectionState {
    graph: ConnectionGraph,
    controls: BTreeMap<TerritoryId, TerritoryControl>,
    /// Update sequence behind each cached control.
    stamps: BTreeMap<TerritoryId, u64>,
}

impl ConnectionState {
    fn stamp_of(&self, territory: TerritoryId) -> u64 {
        self.stamps.get(&territory).copied().unwrap_or(0)
    }
}

enum Registration {
    Existing(RouteId),
    Full,
    Inserted,
}

enum Revalidation {
    Kept,
    Deactivated,
    Skipped,
}

/// Computes, caches, and invalidates faction convoy routes.
pub struct RoutePlanner {
    config: RouteConfig,
    directory: Arc<dyn TerritoryDirectory>,
    control: Arc<dyn ControlView>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    connections: RwLock<ConnectionState>,
    routes: RwLock<RouteRegistry>,
    pending: Mutex<BTreeMap<FactionId, VecDeque<(TerritoryId, TerritoryId)>>>,
}

impl RoutePlanner {
    /// Create a planner and build the connection graph from the current
    /// topology and control status.
    pub fn new(
        config: RouteConfig,
        directory: Arc<dyn TerritoryDirectory>,
        control: Arc<dyn ControlView>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = build_state(&config, directory.as_ref(), control.as_ref());
        tracing::info!(edges = state.graph.edge_count(), "connection graph built");
        Self {
            config,
            directory,
            control,
            bus,
            clock,
            connections: RwLock::new(state),
            routes: RwLock::new(RouteRegistry::new()),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// The active route configuration.
    pub const fn config(&self) -> &RouteConfig {
        &self.config
    }

    // -------------------------------------------------------------------
    // Generation
    // -------------------------------------------------------------------

    /// Find or compute a route for a faction.
    ///
    /// Identical parameters while the earlier route is still active return
    /// the same id without searching again. A new route must reach the
    /// destination within `max_hops` edges using only edges with security at
    /// or above `min_security`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidArgument`] and [`RouteError::TerritoryNotFound`]
    /// are reported before any work; [`RouteError::CapacityExceeded`] and
    /// [`RouteError::NoViablePath`] also publish a failed `RouteGenerated`.
    #[allow(clippy::too_many_lines)]
    pub fn generate_route(
        &self,
        faction: FactionId,
        source: TerritoryId,
        destination: TerritoryId,
        min_security: f64,
        max_hops: u32,
    ) -> Result<RouteId, RouteError> {
        self.validate_request(source, destination, min_security, max_hops)?;
        let params_hash = route_params_hash(faction, source, destination, min_security, max_hops);
        if let Some(existing) = read(&self.routes).find_active(faction, params_hash) {
            tracing::debug!(route = %existing, faction = %faction, "route cache hit");
            return Ok(existing);
        }
        if read(&self.routes).active_count(faction) >= self.config.max_routes_per_faction {
            return Err(self.reject_capacity(faction, source, destination));
        }

        self.ensure_topology();
        let params = SearchParams {
            faction,
            source,
            destination,
            min_security,
            max_hops,
            hostile_penalty: self.config.hostile_penalty,
            friendly_bonus: self.config.friendly_bonus,
        };
        // The connection view stays read-locked until the route is registered,
        // so a control change cannot land between the search and the insert
        // without invalidating the new route.
        let connections = read(&self.connections);
        let search = find_path(&connections.graph, &connections.controls, &params).map(|found| {
            let waypoints = found
                .path
                .iter()
                .filter_map(|id| connections.graph.center(*id))
                .collect::<Vec<_>>();
            (found, waypoints)
        });
        let Some((found, waypoints)) = search else {
            drop(connections);
            tracing::info!(
                faction = %faction,
                source = %source,
                destination = %destination,
                min_security,
                max_hops,
                "no viable route"
            );
            self.publish_generated(None, faction, source, destination);
            return Err(RouteError::NoViablePath {
                faction,
                origin: source,
                destination,
                min_security,
            });
        };

        let now = self.clock.now();
        let hops = found.path.len().saturating_sub(1);
        let route = ConvoyRoute {
            id: RouteId::new(),
            faction,
            name: self.route_name(source, destination),
            profitability: self.profitability(source, destination, found.security, found.distance),
            path: found.path,
            waypoints,
            total_distance: found.distance,
            security_rating: found.security,
            active: true,
            params_hash,
            min_security,
            max_hops,
            created_at: now,
            last_validated: now,
            invalidated_at: None,
            invalidation_cause: None,
        };
        let id = route.id;
        let security = route.security_rating;

        // Another caller may have registered the same route while we searched.
        let registration = {
            let mut routes = write(&self.routes);
            if let Some(existing) = routes.find_active(faction, params_hash) {
                Registration::Existing(existing)
            } else if routes.active_count(faction) >= self.config.max_routes_per_faction {
                Registration::Full
            } else {
                routes.insert(route);
                Registration::Inserted
            }
        };
        drop(connections);
        match registration {
            Registration::Existing(existing) => return Ok(existing),
            Registration::Full => return Err(self.reject_capacity(faction, source, destination)),
            Registration::Inserted => {}
        }

        tracing::info!(
            route = %id,
            faction = %faction,
            source = %source,
            destination = %destination,
            hops,
            security,
            expanded = found.expanded,
            "route generated"
        );
        self.publish_generated(Some(id), faction, source, destination);
        Ok(id)
    }

    fn validate_request(
        &self,
        source: TerritoryId,
        destination: TerritoryId,
        min_security: f64,
        max_hops: u32,
    ) -> Result<(), RouteError> {
        if max_hops == 0 {
            return Err(RouteError::InvalidArgument(String::from("max_hops must be at least 1")));
        }
        if !(0.0..=1.0).contains(&min_security) {
            return Err(RouteError::InvalidArgument(format!(
                "min_security must be within [0, 1], got {min_security}"
            )));
        }
        if source == destination {
            return Err(RouteError::InvalidArgument(format!(
                "source and destination are both territory {source}"
            )));
        }
        for territory in [source, destination] {
            if !self.directory.contains(territory) {
                return Err(RouteError::TerritoryNotFound(territory));
            }
        }
        Ok(())
    }

    fn reject_capacity(
        &self,
        faction: FactionId,
        source: TerritoryId,
        destination: TerritoryId,
    ) -> RouteError {
        let limit = self.config.max_routes_per_faction;
        tracing::info!(faction = %faction, limit, "route capacity reached");
        self.publish_generated(None, faction, source, destination);
        RouteError::CapacityExceeded { faction, limit }
    }

    // -------------------------------------------------------------------
    // Invalidation
    // -------------------------------------------------------------------

    /// Deactivate every active route through a territory.
    pub fn invalidate_territory(&self, territory: TerritoryId, cause: &str) -> Vec<RouteId> {
        let now = self.clock.now();
        let invalidated: Vec<ConvoyRoute> = {
            let mut routes = write(&self.routes);
            routes
                .active_through(territory)
                .into_iter()
                .filter_map(|id| routes.deactivate(id, cause, now))
                .collect()
        };
        for route in &invalidated {
            tracing::info!(route = %route.id, faction = %route.faction, cause, "route invalidated");
            self.bus.publish(FrontlineEvent::RouteInvalidated {
                route_id: route.id,
                faction: route.faction,
                cause: cause.to_string(),
            });
        }
        invalidated.iter().map(|r| r.id).collect()
    }

    /// Record a territory's control status produced by update `sequence`.
    /// A change patches the surrounding edges and invalidates routes through
    /// the territory. Statuses older than the cached one are ignored.
    pub fn observe_control(&self, territory: TerritoryId, control: TerritoryControl, sequence: u64) {
        let previous = {
            let mut state = write(&self.connections);
            if sequence < state.stamp_of(territory) {
                tracing::debug!(territory = %territory, sequence, "stale control status ignored");
                return;
            }
            state.stamps.insert(territory, sequence);
            let previous = state.controls.get(&territory).copied().unwrap_or_default();
            if previous == control {
                return;
            }
            state.controls.insert(territory, control);
            let ConnectionState { graph, controls, .. } = &mut *state;
            graph.refresh_territory(territory, controls, &self.config.security);
            previous
        };
        let cause = describe_change(territory, previous, control);
        self.invalidate_territory(territory, &cause);
    }

    // -------------------------------------------------------------------
    // Bulk regeneration
    // -------------------------------------------------------------------

    /// Clear a faction's routes and rebuild routes between every pair of
    /// territories it controls. At most `regeneration_batch_size` pairs are
    /// generated now; the rest are queued for maintenance passes.
    pub fn regenerate_all_faction_routes(&self, faction: FactionId) -> RegenerationReport {
        let removed = write(&self.routes).remove_faction(faction);
        for route in removed.iter().filter(|r| r.active) {
            self.bus.publish(FrontlineEvent::RouteInvalidated {
                route_id: route.id,
                faction,
                cause: String::from("faction routes regenerated"),
            });
        }

        let controlled: Vec<TerritoryId> = read(&self.connections)
            .controls
            .iter()
            .filter(|(_, control)| control.dominant == Some(faction))
            .map(|(id, _)| *id)
            .collect();
        let mut pairs: Vec<(TerritoryId, TerritoryId)> = controlled
            .iter()
            .enumerate()
            .flat_map(|(index, a)| {
                controlled
                    .iter()
                    .skip(index.saturating_add(1))
                    .map(move |b| (*a, *b))
            })
            .collect();
        let batch = self.config.regeneration_batch_size.min(pairs.len());
        let deferred: VecDeque<_> = pairs.split_off(batch).into();

        let mut report = RegenerationReport {
            removed: removed.len(),
            deferred: deferred.len(),
            ..RegenerationReport::default()
        };
        {
            let mut pending = lock(&self.pending);
            if deferred.is_empty() {
                pending.remove(&faction);
            } else {
                pending.insert(faction, deferred);
            }
        }
        for (a, b) in pairs {
            self.generate_pair(faction, a, b, &mut report);
        }
        tracing::info!(
            faction = %faction,
            removed = report.removed,
            generated = report.generated,
            failed = report.failed,
            deferred = report.deferred,
            "faction routes regenerated"
        );
        report
    }

    fn generate_pair(
        &self,
        faction: FactionId,
        a: TerritoryId,
        b: TerritoryId,
        report: &mut RegenerationReport,
    ) {
        let min_security = self.config.default_min_security;
        let max_hops = self.config.default_max_hops;
        let hash = route_params_hash(faction, a, b, min_security, max_hops);
        let cached = read(&self.routes).find_active(faction, hash).is_some();
        match self.generate_route(faction, a, b, min_security, max_hops) {
            Ok(_) if cached => report.reused = report.reused.saturating_add(1),
            Ok(_) => report.generated = report.generated.saturating_add(1),
            Err(err) => {
                tracing::debug!(faction = %faction, source = %a, destination = %b, error = %err, "pair not regenerated");
                report.failed = report.failed.saturating_add(1);
            }
        }
    }

    fn drain_pending(&self) -> usize {
        let work: Vec<(FactionId, TerritoryId, TerritoryId)> = {
            let mut pending = lock(&self.pending);
            let mut budget = self.config.regeneration_batch_size;
            let mut work = Vec::new();
            for (faction, queue) in pending.iter_mut() {
                while budget > 0 {
                    let Some((a, b)) = queue.pop_front() else {
                        break;
                    };
                    work.push((*faction, a, b));
                    budget = budget.saturating_sub(1);
                }
            }
            pending.retain(|_, queue| !queue.is_empty());
            work
        };
        let mut report = RegenerationReport::default();
        for (faction, a, b) in &work {
            self.generate_pair(*faction, *a, *b, &mut report);
        }
        work.len()
    }

    /// Pairs waiting for a later regeneration batch.
    pub fn pending_regenerations(&self) -> usize {
        lock(&self.pending).values().map(VecDeque::len).sum()
    }

    // -------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------

    /// Rebuild the connection graph from the directory's current topology.
    /// Returns the number of connections.
    pub fn rebuild_connections(&self) -> usize {
        let mut fresh = build_state(&self.config, self.directory.as_ref(), self.control.as_ref());
        let edges = {
            let mut state = write(&self.connections);
            let newer: Vec<(TerritoryId, TerritoryControl, u64)> = state
                .stamps
                .iter()
                .filter(|(id, stamp)| **stamp > fresh.stamp_of(**id))
                .filter_map(|(id, stamp)| state.controls.get(id).map(|c| (*id, *c, *stamp)))
                .collect();
            if !newer.is_empty() {
                for (id, control, stamp) in newer {
                    fresh.controls.insert(id, control);
                    fresh.stamps.insert(id, stamp);
                }
                fresh.graph.refresh_all(&fresh.controls, &self.config.security);
            }
            let edges = fresh.graph.edge_count();
            *state = fresh;
            edges
        };
        tracing::info!(edges, "connection graph rebuilt");
        edges
    }

    fn ensure_topology(&self) {
        let current = self.directory.topology_version();
        if read(&self.connections).graph.topology_version() != current {
            self.rebuild_connections();
        }
    }

    /// Re-read control status for every territory and recompute all edge
    /// security. Territories whose control drifted from the cache have
    /// their routes invalidated. Returns the number of edges that changed.
    pub fn refresh_connection_security(&self) -> usize {
        self.resync_controls().0
    }

    fn resync_controls(&self) -> (usize, usize) {
        self.ensure_topology();
        // Snapshot before locking: the state manager publishes to this
        // planner while holding territory locks.
        let snapshot = self.control.stamped_control_snapshot();
        let (changed_edges, drifted) = {
            let mut state = write(&self.connections);
            let known: BTreeSet<TerritoryId> =
                snapshot.keys().chain(state.controls.keys()).copied().collect();
            let mut drifted = Vec::new();
            for id in known {
                let current = snapshot.get(&id).copied().unwrap_or_default();
                if current.sequence < state.stamp_of(id) {
                    continue;
                }
                state.stamps.insert(id, current.sequence);
                let previous = state.controls.get(&id).copied().unwrap_or_default();
                if previous != current.control {
                    state.controls.insert(id, current.control);
                    drifted.push((id, previous, current.control));
                }
            }
            let ConnectionState { graph, controls, .. } = &mut *state;
            (graph.refresh_all(controls, &self.config.security), drifted)
        };
        for (territory, previous, control) in &drifted {
            let cause = describe_change(*territory, *previous, *control);
            self.invalidate_territory(*territory, &cause);
        }
        if changed_edges > 0 {
            tracing::debug!(changed_edges, drifted = drifted.len(), "connection security refreshed");
        }
        (changed_edges, drifted.len())
    }

    /// One maintenance pass: refresh security, re-score stale routes, purge
    /// expired inactive routes, and work through deferred regenerations.
    /// Safe to run with nothing to do.
    pub fn run_maintenance(&self) -> MaintenanceReport {
        let (refreshed_edges, control_resyncs) = self.resync_controls();
        let mut report = MaintenanceReport {
            refreshed_edges,
            control_resyncs,
            ..MaintenanceReport::default()
        };

        let now = self.clock.now();
        let stale_cutoff = before(now, self.config.revalidation_window_secs);
        let stale = read(&self.routes).stale_active(stale_cutoff, self.config.maintenance_batch_size);
        for id in stale {
            match self.revalidate(id, now) {
                Revalidation::Kept => report.revalidated = report.revalidated.saturating_add(1),
                Revalidation::Deactivated => {
                    report.revalidated = report.revalidated.saturating_add(1);
                    report.deactivated = report.deactivated.saturating_add(1);
                }
                Revalidation::Skipped => report.skipped = report.skipped.saturating_add(1),
            }
        }

        report.purged = write(&self.routes).purge_inactive(before(now, self.config.inactive_ttl_secs));
        report.regenerated = self.drain_pending();

        if report != MaintenanceReport::default() {
            tracing::debug!(?report, "route maintenance pass");
        }
        report
    }

    fn revalidate(&self, id: RouteId, now: DateTime<Utc>) -> Revalidation {
        let Some(route) = read(&self.routes).get(id).cloned() else {
            return Revalidation::Skipped;
        };
        let scored = {
            let state = read(&self.connections);
            score_path(&state.graph, &route.path)
        };
        let (security, distance) = match scored {
            Ok(scored) => scored,
            Err(PathDefect::Corrupt(reason)) => {
                tracing::warn!(route = %id, reason, "skipping corrupt route entry");
                return Revalidation::Skipped;
            }
            Err(PathDefect::MissingConnection(a, b)) => {
                let cause = format!("connection between territories {a} and {b} no longer exists");
                self.deactivate(id, &cause, now);
                return Revalidation::Deactivated;
            }
        };

        let threshold = self.config.min_security_threshold;
        if security < threshold {
            let cause = format!("security {security:.2} fell below threshold {threshold:.2}");
            self.deactivate(id, &cause, now);
            return Revalidation::Deactivated;
        }

        let source = route.source();
        let destination = route.destination();
        let profitability = match (source, destination) {
            (Some(s), Some(d)) => self.profitability(s, d, security, distance),
            _ => route.profitability,
        };
        if let Some(entry) = write(&self.routes).get_mut(id) {
            entry.security_rating = security;
            entry.total_distance = distance;
            entry.profitability = profitability;
            entry.last_validated = now;
        }
        Revalidation::Kept
    }

    fn deactivate(&self, id: RouteId, cause: &str, now: DateTime<Utc>) {
        let deactivated = write(&self.routes).deactivate(id, cause, now);
        if let Some(route) = deactivated {
            tracing::info!(route = %id, faction = %route.faction, cause, "route deactivated by maintenance");
            self.bus.publish(FrontlineEvent::RouteInvalidated {
                route_id: id,
                faction: route.faction,
                cause: cause.to_string(),
            });
        }
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// A route by id, active or not.
    pub fn get_route(&self, id: RouteId) -> Result<ConvoyRoute, RouteError> {
        read(&self.routes)
            .get(id)
            .cloned()
            .ok_or(RouteError::RouteNotFound(id))
    }

    /// Active routes, optionally for one faction.
    pub fn get_active_routes(&self, faction: Option<FactionId>) -> Vec<ConvoyRoute> {
        read(&self.routes).list(faction, true)
    }

    /// Every retained route, including inactive ones awaiting purge.
    pub fn all_routes(&self, faction: Option<FactionId>) -> Vec<ConvoyRoute> {
        read(&self.routes).list(faction, false)
    }

    /// The connection between two territories.
    pub fn connection(&self, a: TerritoryId, b: TerritoryId) -> Option<TerritorialConnection> {
        read(&self.connections).graph.edge(a, b).cloned()
    }

    /// Every connection.
    pub fn connections(&self) -> Vec<TerritorialConnection> {
        read(&self.connections).graph.edges().cloned().collect()
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn publish_generated(
        &self,
        route_id: Option<RouteId>,
        faction: FactionId,
        source: TerritoryId,
        destination: TerritoryId,
    ) {
        self.bus.publish(FrontlineEvent::RouteGenerated {
            route_id,
            faction,
            source,
            destination,
            success: route_id.is_some(),
        });
    }

    fn route_name(&self, source: TerritoryId, destination: TerritoryId) -> String {
        let name = |id: TerritoryId| {
            self.directory
                .territory(id)
                .map_or_else(|| id.to_string(), |t| t.name)
        };
        format!("{} to {}", name(source), name(destination))
    }

    fn profitability(
        &self,
        source: TerritoryId,
        destination: TerritoryId,
        security: f64,
        distance: f64,
    ) -> f64 {
        let value = |id: TerritoryId| self.directory.territory(id).map_or(0.0, |t| t.strategic_value);
        let bonus = self
            .directory
            .territory(destination)
            .map_or(0.0, |t| resource_bonus(t.resource));
        let worth = (value(source) + value(destination)) / 2.0 + bonus;
        worth * security / (1.0 + distance / PROFIT_DISTANCE_SCALE)
    }
}

impl EventListener for RoutePlanner {
    fn name(&self) -> &'static str {
        "route_planner"
    }

    fn on_event(&self, envelope: &EventEnvelope) {
        if let FrontlineEvent::InfluenceChanged { update } = &envelope.event {
            self.observe_control(
                update.territory_id,
                TerritoryControl {
                    dominant: update.dominant,
                    contested: update.contested,
                },
                update.sequence,
            );
        }
    }
}

impl core::fmt::Debug for RoutePlanner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoutePlanner")
            .field("routes", &read(&self.routes).len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_state(
    config: &RouteConfig,
    directory: &dyn TerritoryDirectory,
    control: &dyn ControlView,
) -> ConnectionState {
    let version = directory.topology_version();
    let territories = directory.all_territories();
    let links = directory.explicit_links();
    let snapshot = control.stamped_control_snapshot();
    let controls = snapshot.iter().map(|(id, stamped)| (*id, stamped.control)).collect();
    let stamps = snapshot.iter().map(|(id, stamped)| (*id, stamped.sequence)).collect();
    let mut graph = ConnectionGraph::build(&territories, &links, config, version);
    graph.refresh_all(&controls, &config.security);
    ConnectionState {
        graph,
        controls,
        stamps,
    }
}

enum PathDefect {
    Corrupt(&'static str),
    MissingConnection(TerritoryId, TerritoryId),
}

/// Weakest-link security and total distance of a stored path.
fn score_path(graph: &ConnectionGraph, path: &[TerritoryId]) -> Result<(f64, f64), PathDefect> {
    if path.len() < 2 {
        return Err(PathDefect::Corrupt("path has fewer than two territories"));
    }
    if let Some(unknown) = path.iter().find(|id| !graph.contains(**id)) {
        tracing::debug!(territory = %unknown, "route references a territory missing from the graph");
        return Err(PathDefect::Corrupt("path references an unknown territory"));
    }
    let mut security = f64::INFINITY;
    let mut distance = 0.0;
    for pair in path.windows(2) {
        let (Some(a), Some(b)) = (pair.first().copied(), pair.get(1).copied()) else {
            return Err(PathDefect::Corrupt("malformed path segment"));
        };
        let edge = graph.edge(a, b).ok_or(PathDefect::MissingConnection(a, b))?;
        security = security.min(edge.security);
        distance += edge.distance;
    }
    if !security.is_finite() || !distance.is_finite() {
        return Err(PathDefect::Corrupt("non-finite route score"));
    }
    Ok((security, distance))
}

fn describe_change(
    territory: TerritoryId,
    previous: TerritoryControl,
    current: TerritoryControl,
) -> String {
    let owner = |dominant: Option<FactionId>| {
        dominant.map_or_else(|| String::from("none"), |f| format!("faction {f}"))
    };
    if previous.dominant != current.dominant {
        format!(
            "control of territory {territory} changed from {} to {}",
            owner(previous.dominant),
            owner(current.dominant)
        )
    } else if current.contested {
        format!("territory {territory} became contested")
    } else {
        format!("territory {territory} is no longer contested")
    }
}

const fn resource_bonus(resource: ResourceType) -> f64 {
    match resource {
        ResourceType::Trade => 20.0,
        ResourceType::Industry | ResourceType::Agriculture | ResourceType::Energy => 10.0,
        ResourceType::Technology => 5.0,
        ResourceType::Military | ResourceType::None => 0.0,
    }
}

fn before(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    now.checked_sub_signed(secs_delta(secs))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use frontline_events::EventRecorder;
    use frontline_graph::GraphStore;
    use frontline_territory::StampedControl;
    use frontline_types::{
        HierarchyLevel, InfluenceCause, ManualClock, Point, Territory, TerritoryBounds,
        TerritorialUpdate,
    };

    use super::*;

    const A: FactionId = FactionId(1);
    const B: FactionId = FactionId(2);

    /// Control view that stamps every status it records, like the state
    /// manager does.
    #[derive(Debug, Default)]
    struct FakeControls {
        controls: Mutex<BTreeMap<TerritoryId, StampedControl>>,
        sequence: AtomicU64,
    }

    impl FakeControls {
        fn set(&self, id: u32, control: TerritoryControl) -> u64 {
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst).saturating_add(1);
            lock(&self.controls).insert(TerritoryId(id), StampedControl { control, sequence });
            sequence
        }
    }

    impl ControlView for FakeControls {
        fn control_of(&self, id: TerritoryId) -> Option<TerritoryControl> {
            lock(&self.controls).get(&id).map(|stamped| stamped.control)
        }

        fn control_snapshot(&self) -> BTreeMap<TerritoryId, TerritoryControl> {
            lock(&self.controls)
                .iter()
                .map(|(id, stamped)| (*id, stamped.control))
                .collect()
        }

        fn stamped_control_snapshot(&self) -> BTreeMap<TerritoryId, StampedControl> {
            lock(&self.controls).clone()
        }
    }

    struct Harness {
        store: Arc<GraphStore>,
        controls: Arc<FakeControls>,
        clock: Arc<ManualClock>,
        bus: Arc<EventBus>,
        recorder: Arc<EventRecorder>,
    }

    impl Harness {
        /// Five regions in a line, 1000 apart, each touching its neighbours.
        fn line() -> Self {
            let store = Arc::new(GraphStore::default());
            for id in 1..=5_u32 {
                store.add_territory(region(id, f64::from(id.saturating_sub(1)) * 1000.0)).unwrap();
            }
            let clock = Arc::new(ManualClock::at_epoch());
            let bus = Arc::new(EventBus::new(clock.clone()));
            let recorder = Arc::new(EventRecorder::new());
            bus.subscribe(recorder.clone());
            Self {
                store,
                controls: Arc::new(FakeControls::default()),
                clock,
                bus,
                recorder,
            }
        }

        fn planner(&self, config: RouteConfig) -> Arc<RoutePlanner> {
            let planner = Arc::new(RoutePlanner::new(
                config,
                self.store.clone(),
                self.controls.clone(),
                self.bus.clone(),
                self.clock.clone(),
            ));
            self.bus.subscribe(planner.clone());
            planner
        }

        /// Mirror what the state manager does: update the queryable view, then
        /// publish the update.
        fn publish_control(&self, territory: u32, dominant: Option<FactionId>, contested: bool) {
            let sequence = self.controls.set(territory, TerritoryControl { dominant, contested });
            self.bus.publish(FrontlineEvent::InfluenceChanged {
                update: TerritorialUpdate {
                    sequence,
                    territory_id: TerritoryId(territory),
                    faction_id: B,
                    delta: 10.0,
                    cause: InfluenceCause::Combat,
                    resulting_influence: 60.0,
                    control_changed: true,
                    dominant,
                    contested,
                    timestamp: self.clock.now(),
                },
            });
        }
    }

    fn region(id: u32, x: f64) -> Territory {
        Territory {
            id: TerritoryId(id),
            name: format!("Sector {id}"),
            level: HierarchyLevel::Region,
            parent: None,
            bounds: TerritoryBounds::circle(Point::new(x, 0.0), 450.0),
            strategic_value: 50.0,
            tactical_value: 50.0,
            resource: ResourceType::Trade,
            decay_half_life_secs: None,
        }
    }

    fn config() -> RouteConfig {
        RouteConfig {
            connection_factor: 1.5,
            revalidation_window_secs: 600,
            inactive_ttl_secs: 3600,
            ..RouteConfig::default()
        }
    }

    fn held(faction: FactionId) -> TerritoryControl {
        TerritoryControl {
            dominant: Some(faction),
            contested: false,
        }
    }

    fn contested() -> TerritoryControl {
        TerritoryControl {
            dominant: None,
            contested: true,
        }
    }

    fn t(id: u32) -> TerritoryId {
        TerritoryId(id)
    }

    #[test]
    fn generates_route_across_neutral_line() {
        let h = Harness::line();
        let planner = h.planner(config());

        let id = planner.generate_route(A, t(1), t(5), 0.3, 10).unwrap();
        let route = planner.get_route(id).unwrap();

        assert!(route.active);
        assert_eq!(route.path, vec![t(1), t(2), t(3), t(4), t(5)]);
        assert_eq!(route.waypoints.len(), 5);
        assert!((route.total_distance - 4000.0).abs() < 1e-6);
        assert!((route.security_rating - 0.5).abs() < 1e-9);
        assert!(route.profitability > 0.0);
        assert_eq!(route.name, "Sector 1 to Sector 5");

        let generated = h.recorder.events_named("route_generated");
        assert_eq!(generated.len(), 1);
        assert!(matches!(
            generated.first(),
            Some(FrontlineEvent::RouteGenerated { route_id: Some(r), success: true, .. }) if *r == id
        ));
    }

    #[test]
    fn identical_requests_reuse_the_active_route() {
        let h = Harness::line();
        let planner = h.planner(config());

        let first = planner.generate_route(A, t(1), t(4), 0.3, 10).unwrap();
        let second = planner.generate_route(A, t(1), t(4), 0.3, 10).unwrap();

        assert_eq!(first, second);
        assert_eq!(planner.get_active_routes(Some(A)).len(), 1);
        assert_eq!(h.recorder.events_named("route_generated").len(), 1);

        let other_params = planner.generate_route(A, t(1), t(4), 0.3, 9).unwrap();
        assert_ne!(first, other_params);
    }

    #[test]
    fn minimum_security_rejects_a_contested_corridor() {
        let h = Harness::line();
        h.controls.set(3, contested());
        let mut cfg = config();
        cfg.security.contested_penalty = 0.1;
        let planner = h.planner(cfg);

        let err = planner.generate_route(A, t(1), t(5), 0.6, 12).unwrap_err();
        assert!(matches!(err, RouteError::NoViablePath { .. }));
        assert!(planner.get_active_routes(None).is_empty());
        assert!(matches!(
            h.recorder.events_named("route_generated").first(),
            Some(FrontlineEvent::RouteGenerated { route_id: None, success: false, .. })
        ));

        let id = planner.generate_route(A, t(1), t(5), 0.35, 12).unwrap();
        let route = planner.get_route(id).unwrap();
        assert!((route.security_rating - 0.4).abs() < 1e-9);
    }

    #[test]
    fn control_change_invalidates_routes_through_the_territory() {
        let h = Harness::line();
        let planner = h.planner(config());
        let through = planner.generate_route(A, t(1), t(5), 0.3, 10).unwrap();
        let beside = planner.generate_route(A, t(1), t(2), 0.3, 10).unwrap();

        h.publish_control(3, Some(B), false);

        assert!(!planner.get_route(through).unwrap().active);
        assert!(planner.get_route(beside).unwrap().active);
        let invalidated = h.recorder.events_named("route_invalidated");
        assert_eq!(invalidated.len(), 1);
        assert!(matches!(
            invalidated.first(),
            Some(FrontlineEvent::RouteInvalidated { route_id, cause, .. })
                if *route_id == through && cause.contains("territory 3")
        ));

        let edge = planner.connection(t(2), t(3)).unwrap();
        assert!((edge.security - 0.6).abs() < 1e-9);

        let replacement = planner.generate_route(A, t(1), t(5), 0.3, 10).unwrap();
        assert_ne!(replacement, through);
    }

    #[test]
    fn becoming_contested_alone_invalidates() {
        let h = Harness::line();
        let planner = h.planner(config());
        let id = planner.generate_route(A, t(1), t(2), 0.3, 10).unwrap();

        h.publish_control(2, None, true);
        assert!(!planner.get_route(id).unwrap().active);
    }

    #[test]
    fn unchanged_control_is_ignored() {
        let h = Harness::line();
        let planner = h.planner(config());
        planner.generate_route(A, t(1), t(5), 0.3, 10).unwrap();

        h.publish_control(3, Some(B), false);
        planner.generate_route(A, t(1), t(5), 0.3, 10).unwrap();
        h.publish_control(3, Some(B), false);

        assert_eq!(h.recorder.events_named("route_invalidated").len(), 1);
        assert_eq!(planner.get_active_routes(Some(A)).len(), 1);
    }

    #[test]
    fn capacity_counts_active_routes_per_faction() {
        let h = Harness::line();
        let planner = h.planner(RouteConfig {
            max_routes_per_faction: 1,
            ..config()
        });

        planner.generate_route(A, t(1), t(2), 0.3, 10).unwrap();
        let err = planner.generate_route(A, t(1), t(3), 0.3, 10).unwrap_err();
        assert!(matches!(err, RouteError::CapacityExceeded { limit: 1, .. }));
        assert!(planner.generate_route(B, t(1), t(3), 0.3, 10).is_ok());

        let failures = h
            .recorder
            .events_named("route_generated")
            .into_iter()
            .filter(|e| matches!(e, FrontlineEvent::RouteGenerated { success: false, .. }))
            .count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn invalid_requests_are_rejected_without_events() {
        let h = Harness::line();
        let planner = h.planner(config());

        assert!(matches!(
            planner.generate_route(A, t(1), t(3), 0.3, 0),
            Err(RouteError::InvalidArgument(_))
        ));
        assert!(matches!(
            planner.generate_route(A, t(2), t(2), 0.3, 5),
            Err(RouteError::InvalidArgument(_))
        ));
        assert!(matches!(
            planner.generate_route(A, t(1), t(3), 1.5, 5),
            Err(RouteError::InvalidArgument(_))
        ));
        assert!(matches!(
            planner.generate_route(A, t(1), t(99), 0.3, 5),
            Err(RouteError::TerritoryNotFound(id)) if id == t(99)
        ));
        assert!(h.recorder.events_named("route_generated").is_empty());
    }

    #[test]
    fn inactive_routes_are_purged_after_their_ttl() {
        let h = Harness::line();
        let planner = h.planner(config());
        let id = planner.generate_route(A, t(1), t(3), 0.3, 10).unwrap();
        h.publish_control(2, Some(B), false);

        h.clock.advance_secs(3599);
        assert_eq!(planner.run_maintenance().purged, 0);
        assert!(planner.get_route(id).is_ok());

        h.clock.advance_secs(1);
        assert_eq!(planner.run_maintenance().purged, 1);
        assert!(matches!(planner.get_route(id), Err(RouteError::RouteNotFound(_))));
    }

    #[test]
    fn maintenance_deactivates_routes_below_threshold() {
        let h = Harness::line();
        let planner = h.planner(RouteConfig {
            min_security_threshold: 0.55,
            ..config()
        });
        let id = planner.generate_route(A, t(1), t(3), 0.3, 10).unwrap();

        h.clock.advance_secs(601);
        let report = planner.run_maintenance();

        assert_eq!(report.revalidated, 1);
        assert_eq!(report.deactivated, 1);
        assert!(!planner.get_route(id).unwrap().active);
        assert!(matches!(
            h.recorder.events_named("route_invalidated").first(),
            Some(FrontlineEvent::RouteInvalidated { cause, .. }) if cause.contains("below threshold")
        ));
    }

    #[test]
    fn revalidation_refreshes_healthy_routes() {
        let h = Harness::line();
        let planner = h.planner(config());
        let id = planner.generate_route(A, t(1), t(3), 0.3, 10).unwrap();

        h.clock.advance_secs(601);
        let report = planner.run_maintenance();

        assert_eq!(report.revalidated, 1);
        assert_eq!(report.deactivated, 0);
        let route = planner.get_route(id).unwrap();
        assert!(route.active);
        assert_eq!(route.last_validated, h.clock.now());
    }

    #[test]
    fn security_refresh_catches_missed_control_changes() {
        let h = Harness::line();
        let planner = h.planner(config());
        let id = planner.generate_route(A, t(1), t(5), 0.3, 10).unwrap();

        h.controls.set(3, contested());
        let changed = planner.refresh_connection_security();

        assert_eq!(changed, 2);
        assert!(!planner.get_route(id).unwrap().active);
        assert_eq!(planner.refresh_connection_security(), 0);
    }

    #[test]
    fn maintenance_keeps_control_newer_than_its_snapshot() {
        let h = Harness::line();
        let planner = h.planner(config());
        h.publish_control(3, Some(B), false);
        // Observed from an update the view's snapshot does not reflect yet.
        planner.observe_control(t(3), held(A), 2);
        let id = planner.generate_route(A, t(1), t(5), 0.3, 10).unwrap();

        let report = planner.run_maintenance();

        assert_eq!(report.control_resyncs, 0);
        assert!(planner.get_route(id).unwrap().active);
        assert!(h.recorder.events_named("route_invalidated").is_empty());
        let edge = planner.connection(t(2), t(3)).unwrap();
        assert!((edge.security - 0.6).abs() < 1e-9);

        planner.observe_control(t(3), held(B), 1);
        assert!(planner.get_route(id).unwrap().active);
    }

    #[test]
    fn regeneration_connects_every_held_pair() {
        let h = Harness::line();
        for id in 1..=3 {
            h.controls.set(id, held(A));
        }
        let planner = h.planner(config());
        let stale = planner.generate_route(A, t(4), t(5), 0.3, 10).unwrap();

        let report = planner.regenerate_all_faction_routes(A);

        assert_eq!(report.removed, 1);
        assert_eq!(report.generated, 3);
        assert_eq!(report.deferred, 0);
        assert!(matches!(planner.get_route(stale), Err(RouteError::RouteNotFound(_))));
        let routes = planner.get_active_routes(Some(A));
        assert_eq!(routes.len(), 3);
        assert!(routes.iter().all(|r| (r.security_rating - 0.9).abs() < 1e-9));
    }

    #[test]
    fn regeneration_defers_pairs_beyond_the_batch() {
        let h = Harness::line();
        for id in 1..=3 {
            h.controls.set(id, held(A));
        }
        let planner = h.planner(RouteConfig {
            regeneration_batch_size: 2,
            ..config()
        });

        let report = planner.regenerate_all_faction_routes(A);
        assert_eq!(report.generated, 2);
        assert_eq!(report.deferred, 1);
        assert_eq!(planner.pending_regenerations(), 1);

        let maintenance = planner.run_maintenance();
        assert_eq!(maintenance.regenerated, 1);
        assert_eq!(planner.pending_regenerations(), 0);
        assert_eq!(planner.get_active_routes(Some(A)).len(), 3);
    }

    #[test]
    fn new_territories_are_picked_up_before_searching() {
        let h = Harness::line();
        let planner = h.planner(config());
        h.store.add_territory(region(6, 5000.0)).unwrap();

        let id = planner.generate_route(A, t(5), t(6), 0.3, 10).unwrap();
        assert_eq!(planner.get_route(id).unwrap().path, vec![t(5), t(6)]);
    }

    #[test]
    fn maintenance_with_nothing_to_do_is_quiet() {
        let h = Harness::line();
        let planner = h.planner(config());
        assert_eq!(planner.run_maintenance(), MaintenanceReport::default());
        assert!(h.recorder.is_empty());
    }
}
