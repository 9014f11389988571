//! Shared type definitions for the Frontline territorial control core.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. Types that cross the real-time sync boundary are exported
//! to `TypeScript` via `ts-rs` for dashboard consumers.
//!
//! # Modules
//!
//! - [`ids`] -- Integer catalog IDs and UUID-backed runtime IDs
//! - [`enums`] -- Hierarchy levels, resource tags, siege phases, AI enums
//! - [`structs`] -- Territories, territorial state, updates, routes, decisions
//! - [`events`] -- Outbound event enum and sequencing envelope
//! - [`clock`] -- Injectable time source
//! - [`error`] -- Error classification shared by all component errors
//! - [`sync`] -- Poison-recovering lock helpers

pub mod clock;
pub mod enums;
pub mod error;
pub mod events;
pub mod ids;
pub mod structs;
pub mod sync;

// Re-export all public types at crate root for convenience.
pub use clock::{Clock, ManualClock, SystemClock, elapsed_secs, secs_delta};
pub use enums::{
    CrossingDirection, DecisionKind, HierarchyLevel, InfluenceCause, ResourceType, SiegePhase,
    SiegeResolution, SiegeSide, StrategyKind, ThreatKind,
};
pub use error::{Classify, ErrorKind};
pub use events::{EventEnvelope, FrontlineEvent};
pub use ids::{DecisionId, FactionId, RouteId, SiegeId, TerritoryId};
pub use structs::{
    ConvoyRoute, Point, StrategicDecision, TerritorialConnection, TerritorialState,
    TerritorialUpdate, Territory, TerritoryBounds, TerritoryControl, ThreatAssessment,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for dashboard consumers.

    #[test]
    fn export_bindings() {
        // The files are written to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::TerritoryId::export_all();
        let _ = crate::ids::FactionId::export_all();
        let _ = crate::ids::RouteId::export_all();
        let _ = crate::ids::SiegeId::export_all();
        let _ = crate::ids::DecisionId::export_all();

        // Enums
        let _ = crate::enums::HierarchyLevel::export_all();
        let _ = crate::enums::ResourceType::export_all();
        let _ = crate::enums::InfluenceCause::export_all();
        let _ = crate::enums::SiegePhase::export_all();
        let _ = crate::enums::SiegeSide::export_all();
        let _ = crate::enums::SiegeResolution::export_all();
        let _ = crate::enums::CrossingDirection::export_all();
        let _ = crate::enums::DecisionKind::export_all();
        let _ = crate::enums::ThreatKind::export_all();
        let _ = crate::enums::StrategyKind::export_all();
        let _ = crate::error::ErrorKind::export_all();

        // Structs
        let _ = crate::structs::Point::export_all();
        let _ = crate::structs::TerritoryBounds::export_all();
        let _ = crate::structs::Territory::export_all();
        let _ = crate::structs::TerritorialState::export_all();
        let _ = crate::structs::TerritoryControl::export_all();
        let _ = crate::structs::TerritorialUpdate::export_all();
        let _ = crate::structs::TerritorialConnection::export_all();
        let _ = crate::structs::ConvoyRoute::export_all();
        let _ = crate::structs::ThreatAssessment::export_all();
        let _ = crate::structs::StrategicDecision::export_all();

        // Events
        let _ = crate::events::FrontlineEvent::export_all();
        let _ = crate::events::EventEnvelope::export_all();
    }
}
