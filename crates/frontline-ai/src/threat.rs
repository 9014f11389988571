//! Threat analysis over recent territorial updates.
//!
//! Three signals are recognised against a faction:
//!
//! - **Influence decline**: the faction's own influence dropping in a
//!   territory it holds or contests.
//! - **Hostile expansion**: a rival gaining influence where the faction is
//!   present, weighted up the closer the rival gets.
//! - **Territory lost**: a territory held at the previous analysis is no
//!   longer held.
//!
//! Severities are summed per `(territory, kind, rival)` and clamped to
//! `[0, 1]`, then ranked most severe first.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use frontline_territory::WorldSnapshot;
use frontline_types::{FactionId, TerritorialUpdate, TerritoryId, ThreatAssessment, ThreatKind};

/// Inputs to one threat analysis.
#[derive(Debug, Clone, Copy)]
pub struct ThreatScan<'a> {
    /// Faction being analysed.
    pub faction: FactionId,
    /// Current world state.
    pub world: &'a WorldSnapshot,
    /// Recent updates, most recent first.
    pub updates: &'a [TerritorialUpdate],
    /// Territories the faction held at the previous analysis.
    pub previously_held: &'a BTreeSet<TerritoryId>,
    /// Threats below this severity are dropped.
    pub severity_floor: f64,
    /// Detection timestamp.
    pub now: DateTime<Utc>,
}

type ThreatKey = (TerritoryId, ThreatKind, Option<FactionId>);

/// Detect and rank threats against a faction.
pub fn analyze_threats(scan: &ThreatScan<'_>) -> Vec<ThreatAssessment> {
    let mut severities: BTreeMap<ThreatKey, f64> = BTreeMap::new();
    let faction = scan.faction;

    for update in scan.updates {
        let territory = update.territory_id;
        let Some(entry) = scan.world.get(territory) else {
            continue;
        };
        let own = entry.state.influence_of(faction);
        let held = entry.state.dominant == Some(faction);
        let present = held || own > 0.0;
        if !present {
            continue;
        }
        let value_weight = 1.0 + entry.territory.strategic_value / 100.0;

        if update.faction_id == faction && update.delta < 0.0 {
            let weight = if held { value_weight } else { value_weight / 2.0 };
            add(&mut severities, (territory, ThreatKind::InfluenceDecline, None), -update.delta / 100.0 * weight);
        } else if update.faction_id != faction && update.delta > 0.0 {
            let rival = entry.state.influence_of(update.faction_id);
            let closeness = 1.0 - ((own - rival) / 100.0).clamp(0.0, 1.0);
            add(
                &mut severities,
                (territory, ThreatKind::HostileExpansion, Some(update.faction_id)),
                update.delta / 100.0 * value_weight * (1.0 + closeness),
            );
        }
    }

    for territory in scan.previously_held {
        let Some(entry) = scan.world.get(*territory) else {
            continue;
        };
        if entry.state.dominant != Some(faction) {
            add(
                &mut severities,
                (*territory, ThreatKind::TerritoryLost, entry.state.dominant),
                1.0,
            );
        }
    }

    let mut threats: Vec<ThreatAssessment> = severities
        .into_iter()
        .map(|((territory_id, kind, hostile_faction), severity)| ThreatAssessment {
            faction,
            territory_id,
            kind,
            hostile_faction,
            severity: severity.clamp(0.0, 1.0),
            detected_at: scan.now,
        })
        .filter(|threat| threat.severity >= scan.severity_floor)
        .collect();
    threats.sort_by(|a, b| {
        b.severity
            .total_cmp(&a.severity)
            .then_with(|| b.kind.cmp(&a.kind))
            .then_with(|| a.territory_id.cmp(&b.territory_id))
    });
    threats
}

fn add(severities: &mut BTreeMap<ThreatKey, f64>, key: ThreatKey, amount: f64) {
    if amount.is_finite() && amount > 0.0 {
        *severities.entry(key).or_insert(0.0) += amount;
    }
}
