//! Default frontier map used when no territory catalog is configured.
//!
//! Two regions split by a river: Northreach and Southmarch. Each region
//! holds four districts on a grid close enough for proximity adjacency, and
//! each district holds two control points. The river is crossed at two
//! places, the Ashford bridge (explicit link) and the Kestrel ford
//! (proximity only, long and indirect).

use frontline_types::{
    HierarchyLevel, Point, ResourceType, Territory, TerritoryBounds, TerritoryId,
};

use crate::error::GraphError;
use crate::territory_graph::TerritoryGraph;

// --- Regions ---
/// Northern region.
pub const NORTHREACH: TerritoryId = TerritoryId(1);
/// Southern region.
pub const SOUTHMARCH: TerritoryId = TerritoryId(2);

// --- Northreach districts ---
/// Farmland on the north bank, western bridgehead.
pub const ASHFORD: TerritoryId = TerritoryId(10);
/// Market town on the north bank.
pub const COLDWATER: TerritoryId = TerritoryId(11);
/// Garrison district on the north bank.
pub const IRONHILL: TerritoryId = TerritoryId(12);
/// Northern research plateau.
pub const HIGHMOOR: TerritoryId = TerritoryId(13);

// --- Southmarch districts ---
/// Power plants on the south bank, western bridgehead.
pub const REDMERE: TerritoryId = TerritoryId(20);
/// Trading post at the ford.
pub const KESTREL_FORD: TerritoryId = TerritoryId(21);
/// Southern research labs.
pub const VANTAGE: TerritoryId = TerritoryId(22);
/// Southern salt flats and refineries.
pub const SALTMARSH: TerritoryId = TerritoryId(23);

const REGION_RADIUS: f64 = 3000.0;
const DISTRICT_RADIUS: f64 = 800.0;
const CONTROL_POINT_RADIUS: f64 = 200.0;
const CONTROL_POINT_OFFSET: f64 = 300.0;

/// Helper to build a [`Territory`].
#[allow(clippy::too_many_arguments)]
fn territory(
    id: TerritoryId,
    name: &str,
    level: HierarchyLevel,
    parent: Option<TerritoryId>,
    center: (f64, f64),
    radius: f64,
    values: (f64, f64),
    resource: ResourceType,
) -> Territory {
    Territory {
        id,
        name: name.to_string(),
        level,
        parent,
        bounds: TerritoryBounds::circle(Point::new(center.0, center.1), radius),
        strategic_value: values.0,
        tactical_value: values.1,
        resource,
        decay_half_life_secs: None,
    }
}

/// District table: id, name, parent region, center, (strategic, tactical), resource.
const DISTRICTS: [(TerritoryId, &str, TerritoryId, (f64, f64), (f64, f64), ResourceType); 8] = [
    (ASHFORD, "Ashford", NORTHREACH, (-1800.0, 1800.0), (55.0, 40.0), ResourceType::Agriculture),
    (COLDWATER, "Coldwater", NORTHREACH, (0.0, 1800.0), (60.0, 50.0), ResourceType::Trade),
    (IRONHILL, "Ironhill", NORTHREACH, (1800.0, 1800.0), (70.0, 75.0), ResourceType::Military),
    (HIGHMOOR, "Highmoor", NORTHREACH, (0.0, 3600.0), (65.0, 30.0), ResourceType::Technology),
    (REDMERE, "Redmere", SOUTHMARCH, (-1800.0, -1800.0), (60.0, 45.0), ResourceType::Energy),
    (KESTREL_FORD, "Kestrel Ford", SOUTHMARCH, (0.0, -1800.0), (50.0, 55.0), ResourceType::Trade),
    (VANTAGE, "Vantage", SOUTHMARCH, (1800.0, -1800.0), (75.0, 35.0), ResourceType::Technology),
    (SALTMARSH, "Saltmarsh", SOUTHMARCH, (0.0, -3600.0), (40.0, 25.0), ResourceType::Industry),
];

/// Create the default frontier map: 2 regions, 8 districts, 16 control points.
///
/// # Errors
///
/// Returns [`GraphError`] if the map construction fails (should not happen
/// with valid hard-coded data).
pub fn create_frontier_map() -> Result<TerritoryGraph, GraphError> {
    let mut graph = TerritoryGraph::new();

    // ---------------------------------------------------------------
    // Regions
    // ---------------------------------------------------------------

    graph.add_territory(territory(
        NORTHREACH,
        "Northreach",
        HierarchyLevel::Region,
        None,
        (0.0, REGION_RADIUS),
        REGION_RADIUS,
        (60.0, 20.0),
        ResourceType::Agriculture,
    ))?;
    graph.add_territory(territory(
        SOUTHMARCH,
        "Southmarch",
        HierarchyLevel::Region,
        None,
        (0.0, -REGION_RADIUS),
        REGION_RADIUS,
        (65.0, 20.0),
        ResourceType::Industry,
    ))?;

    // ---------------------------------------------------------------
    // Districts and their control points
    // ---------------------------------------------------------------

    for (id, name, region, center, values, resource) in DISTRICTS {
        graph.add_territory(territory(
            id,
            name,
            HierarchyLevel::District,
            Some(region),
            center,
            DISTRICT_RADIUS,
            values,
            resource,
        ))?;

        let posts = [(1, "West", -CONTROL_POINT_OFFSET), (2, "East", CONTROL_POINT_OFFSET)];
        for (suffix, side, offset) in posts {
            let cp_id = TerritoryId(id.get().saturating_mul(10).saturating_add(suffix));
            graph.add_territory(territory(
                cp_id,
                &format!("{name} {side} Post"),
                HierarchyLevel::ControlPoint,
                Some(id),
                (center.0 + offset, center.1),
                CONTROL_POINT_RADIUS,
                (values.0 * 0.5, values.1),
                resource,
            ))?;
        }
    }

    // ---------------------------------------------------------------
    // River crossings
    // ---------------------------------------------------------------

    graph.add_link(ASHFORD, REDMERE)?;
    graph.add_link(NORTHREACH, SOUTHMARCH)?;

    Ok(graph)
}
