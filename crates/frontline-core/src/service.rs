//! Component wiring.
//!
//! [`Frontline`] owns one instance of every component, each built with
//! explicit references to the components it depends on. Listener
//! subscription order is fixed: the route planner first, so route
//! invalidation for a control change finishes before the siege manager
//! and remote observers see the same event.

use std::sync::Arc;

use frontline_ai::FactionAiManager;
use frontline_events::EventBus;
use frontline_graph::{GraphStore, TerritoryGraph, create_frontier_map, load_catalog};
use frontline_routes::RoutePlanner;
use frontline_siege::{Role, SiegeManager};
use frontline_territory::TerritorialStateManager;
use frontline_types::{Clock, SystemClock};

use crate::config::{ConfigError, FrontlineConfig};

/// Every component of the territorial control core, wired together.
pub struct Frontline {
    config: FrontlineConfig,
    clock: Arc<dyn Clock>,
    bus: Arc<EventBus>,
    graph: Arc<GraphStore>,
    state: Arc<TerritorialStateManager>,
    routes: Arc<RoutePlanner>,
    sieges: Arc<SiegeManager>,
    ai: Arc<FactionAiManager>,
}

impl Frontline {
    /// Wire every component over an already loaded territory graph.
    pub fn new(config: FrontlineConfig, graph: TerritoryGraph, clock: Arc<dyn Clock>) -> Self {
        let graph = Arc::new(GraphStore::new(graph));
        let bus = Arc::new(EventBus::new(clock.clone()));
        let state = Arc::new(TerritorialStateManager::new(
            config.influence.clone(),
            graph.clone(),
            bus.clone(),
            clock.clone(),
        ));
        let routes = Arc::new(RoutePlanner::new(
            config.routes.clone(),
            graph.clone(),
            state.clone(),
            bus.clone(),
            clock.clone(),
        ));
        bus.subscribe(routes.clone());
        let sieges = Arc::new(SiegeManager::new(
            config.siege.clone(),
            Role::Authority,
            state.clone(),
            state.clone(),
            bus.clone(),
            clock.clone(),
        ));
        bus.subscribe(sieges.clone());
        let ai = Arc::new(FactionAiManager::new(
            config.ai.clone(),
            state.clone(),
            state.clone(),
            bus.clone(),
            clock.clone(),
        ));
        tracing::info!(
            world = %config.world.name,
            territories = graph.len(),
            factions = config.ai.factions.len(),
            "frontline core wired"
        );
        Self {
            config,
            clock,
            bus,
            graph,
            state,
            routes,
            sieges,
            ai,
        }
    }

    /// Load the territory catalog named in the config (or the built-in
    /// frontier map) and wire every component on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Catalog`] if the catalog cannot be loaded.
    pub fn from_config(config: FrontlineConfig) -> Result<Self, ConfigError> {
        let graph = match &config.world.territories_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading territory catalog");
                load_catalog(path)?
            }
            None => create_frontier_map()?,
        };
        Ok(Self::new(config, graph, Arc::new(SystemClock)))
    }

    /// The configuration the core was built from.
    pub const fn config(&self) -> &FrontlineConfig {
        &self.config
    }

    /// Shared time source.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Event bus every component publishes to.
    pub const fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Territory graph store.
    pub const fn graph(&self) -> &Arc<GraphStore> {
        &self.graph
    }

    /// Territorial state manager.
    pub const fn state(&self) -> &Arc<TerritorialStateManager> {
        &self.state
    }

    /// Route planner.
    pub const fn routes(&self) -> &Arc<RoutePlanner> {
        &self.routes
    }

    /// Siege manager.
    pub const fn sieges(&self) -> &Arc<SiegeManager> {
        &self.sieges
    }

    /// Faction AI manager.
    pub const fn ai(&self) -> &Arc<FactionAiManager> {
        &self.ai
    }
}

impl core::fmt::Debug for Frontline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frontline")
            .field("world", &self.config.world.name)
            .field("territories", &self.graph.len())
            .field("listeners", &self.bus.listener_count())
            .finish_non_exhaustive()
    }
}
