//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read from the live core through the shared [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/status` | Core summary |
//! | `GET` | `/api/territories` | Every territory with its state |
//! | `GET` | `/api/territories/spatial` | Territories within a radius, nearest first |
//! | `GET` | `/api/territories/:id` | One territory with its state |
//! | `GET` | `/api/territories/:id/dominant` | Control status of a territory |
//! | `GET` | `/api/territories/:id/influence/:faction` | One faction's influence |
//! | `GET` | `/api/routes` | Convoy routes (by faction, active only by default) |
//! | `GET` | `/api/routes/:id` | One convoy route |
//! | `GET` | `/api/updates` | Recent influence updates, most recent first |
//! | `GET` | `/api/sieges` | Active sieges |
//! | `GET` | `/api/decisions` | Queued AI decisions |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use chrono::{DateTime, Utc};
use frontline_territory::TerritorySnapshot;
use frontline_types::{
    ConvoyRoute, FactionId, Point, RouteId, StrategicDecision, TerritorialUpdate, TerritoryId,
};
use serde::{Deserialize, Serialize};

use crate::error::ObserverError;
use crate::state::AppState;

/// Updates returned by `GET /api/updates` when no limit is given.
const DEFAULT_UPDATE_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/territories/spatial`.
#[derive(Debug, Deserialize)]
pub struct SpatialQuery {
    /// Circle centre, x coordinate.
    pub x: f64,
    /// Circle centre, y coordinate.
    pub y: f64,
    /// Circle radius.
    pub radius: f64,
}

/// Query parameters for `GET /api/routes`.
#[derive(Debug, Deserialize)]
pub struct RoutesQuery {
    /// Only routes owned by this faction.
    pub faction: Option<u32>,
    /// Include deactivated routes still awaiting purge.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Query parameters for `GET /api/updates`.
#[derive(Debug, Deserialize)]
pub struct UpdatesQuery {
    /// Maximum number of updates to return (default 50).
    pub limit: Option<usize>,
}

/// Query parameters for `GET /api/decisions`.
#[derive(Debug, Deserialize)]
pub struct DecisionsQuery {
    /// Only decisions of this faction.
    pub faction: Option<u32>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Body of `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// World name from the configuration.
    pub world: String,
    /// Current time on the core clock.
    pub now: DateTime<Utc>,
    /// Number of territories.
    pub territories: usize,
    /// Number of active convoy routes.
    pub active_routes: usize,
    /// Number of running sieges.
    pub active_sieges: usize,
    /// Number of queued AI decisions.
    pub pending_decisions: usize,
    /// Sequence number of the last published event.
    pub last_sequence: u64,
}

/// Body of `GET /api/territories/:id/dominant`.
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    /// The territory.
    pub territory_id: TerritoryId,
    /// Faction in control, if any.
    pub dominant: Option<FactionId>,
    /// Whether the territory is contested.
    pub contested: bool,
    /// Factions with influence there, strongest first.
    pub contesting_factions: Vec<FactionId>,
}

/// Body of `GET /api/territories/:id/influence/:faction`.
#[derive(Debug, Serialize)]
pub struct InfluenceResponse {
    /// The territory.
    pub territory_id: TerritoryId,
    /// The faction.
    pub faction: FactionId,
    /// Its influence, zero when it has none.
    pub influence: f64,
}

// ---------------------------------------------------------------------------
// GET / and GET /api/status
// ---------------------------------------------------------------------------

fn status_of(state: &AppState) -> StatusResponse {
    let core = &state.frontline;
    StatusResponse {
        world: core.config().world.name.clone(),
        now: core.clock().now(),
        territories: core.state().territory_count(),
        active_routes: core.routes().get_active_routes(None).len(),
        active_sieges: core.sieges().siege_count(),
        pending_decisions: core.ai().pending_decisions().len(),
        last_sequence: core.bus().last_sequence(),
    }
}

/// Serve a minimal HTML page showing core status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = status_of(&state);
    let metric = |label: &str, value: &dyn core::fmt::Display| {
        format!(
            r#"<div class="metric"><div class="label">{label}</div><div class="value">{value}</div></div>"#
        )
    };
    let metrics = [
        metric("Territories", &status.territories),
        metric("Routes", &status.active_routes),
        metric("Sieges", &status.active_sieges),
        metric("Decisions", &status.pending_decisions),
        metric("Events", &status.last_sequence),
    ]
    .concat();
    let world = &status.world;
    let now = status.now.format("%Y-%m-%d %H:%M:%S UTC");

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Frontline Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        li::before {{ content: "GET "; color: #7ee787; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>Frontline Observer</h1>
    <p class="subtitle">{world} &middot; {now}</p>
    <div>{metrics}</div>
    <h2>API</h2>
    <ul>
        <li><a href="/api/status">/api/status</a></li>
        <li><a href="/api/territories">/api/territories</a></li>
        <li><a href="/api/routes">/api/routes</a></li>
        <li><a href="/api/updates">/api/updates</a></li>
        <li><a href="/api/sieges">/api/sieges</a></li>
        <li><a href="/api/decisions">/api/decisions</a></li>
        <li>/ws/events (WebSocket)</li>
    </ul>
</body>
</html>"#
    ))
}

/// `GET /api/status`
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(status_of(&state))
}

// ---------------------------------------------------------------------------
// Territories
// ---------------------------------------------------------------------------

/// `GET /api/territories`
pub async fn list_territories(State(state): State<Arc<AppState>>) -> Json<Vec<TerritorySnapshot>> {
    let snapshot = state.frontline.state().snapshot();
    Json(snapshot.iter().cloned().collect())
}

/// `GET /api/territories/:id`
pub async fn get_territory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<TerritorySnapshot>, ObserverError> {
    let info = state.frontline.state().get_territory_info(TerritoryId(id))?;
    Ok(Json(info))
}

/// `GET /api/territories/:id/dominant`
pub async fn get_control(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<ControlResponse>, ObserverError> {
    let territory_id = TerritoryId(id);
    let manager = state.frontline.state();
    let current = manager.get_state(territory_id)?;
    let contesting_factions = manager.contesting_factions(territory_id)?;
    Ok(Json(ControlResponse {
        territory_id,
        dominant: current.dominant,
        contested: current.contested,
        contesting_factions,
    }))
}

/// `GET /api/territories/:id/influence/:faction`
pub async fn get_influence(
    State(state): State<Arc<AppState>>,
    Path((id, faction)): Path<(u32, u32)>,
) -> Result<Json<InfluenceResponse>, ObserverError> {
    let territory_id = TerritoryId(id);
    let faction = FactionId(faction);
    let influence = state
        .frontline
        .state()
        .get_faction_influence(territory_id, faction)?;
    Ok(Json(InfluenceResponse {
        territory_id,
        faction,
        influence,
    }))
}

/// `GET /api/territories/spatial?x=&y=&radius=`
pub async fn territories_in_radius(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SpatialQuery>,
) -> Result<Json<Vec<TerritorySnapshot>>, ObserverError> {
    let found = state
        .frontline
        .state()
        .get_territories_in_radius(Point::new(query.x, query.y), query.radius)?;
    Ok(Json(found))
}

// ---------------------------------------------------------------------------
// Routes, updates, sieges, decisions
// ---------------------------------------------------------------------------

/// `GET /api/routes?faction=&include_inactive=`
pub async fn list_routes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoutesQuery>,
) -> Json<Vec<ConvoyRoute>> {
    let faction = query.faction.map(FactionId);
    let planner = state.frontline.routes();
    let routes = if query.include_inactive {
        planner.all_routes(faction)
    } else {
        planner.get_active_routes(faction)
    };
    Json(routes)
}

/// `GET /api/routes/:id`
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConvoyRoute>, ObserverError> {
    let route_id: RouteId = id
        .parse()
        .map_err(|e| ObserverError::InvalidQuery(format!("invalid route id '{id}': {e}")))?;
    let route = state
        .frontline
        .routes()
        .get_route(route_id)?;
    Ok(Json(route))
}

/// `GET /api/updates?limit=`
pub async fn list_updates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpdatesQuery>,
) -> Json<Vec<TerritorialUpdate>> {
    let limit = query.limit.unwrap_or(DEFAULT_UPDATE_LIMIT);
    let mut updates = state.frontline.state().get_recent_updates();
    updates.truncate(limit);
    Json(updates)
}

/// `GET /api/sieges`
pub async fn list_sieges(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.frontline.sieges().active_sieges())
}

/// `GET /api/decisions?faction=`
pub async fn list_decisions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DecisionsQuery>,
) -> Json<Vec<StrategicDecision>> {
    let ai = state.frontline.ai();
    let decisions = match query.faction {
        Some(faction) => ai.pending_for(FactionId(faction)),
        None => ai.pending_decisions(),
    };
    Json(decisions)
}
