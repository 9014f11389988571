//! Property tests for influence bounds, dominance exclusivity, and decay.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use frontline_events::EventBus;
use frontline_graph::GraphStore;
use frontline_territory::{InfluenceConfig, TerritorialStateManager};
use frontline_types::{
    FactionId, HierarchyLevel, InfluenceCause, ManualClock, Point, ResourceType, Territory,
    TerritoryBounds, TerritoryId,
};
use proptest::prelude::*;

fn manager(territories: u32) -> TerritorialStateManager {
    let store = GraphStore::default();
    for id in 0..territories {
        store
            .add_territory(Territory {
                id: TerritoryId(id),
                name: format!("P{id}"),
                level: HierarchyLevel::Region,
                parent: None,
                bounds: TerritoryBounds::circle(Point::new(f64::from(id) * 10.0, 0.0), 1.0),
                strategic_value: 10.0,
                tactical_value: 10.0,
                resource: ResourceType::None,
                decay_half_life_secs: None,
            })
            .unwrap();
    }
    let clock = Arc::new(ManualClock::at_epoch());
    let bus = Arc::new(EventBus::new(clock.clone()));
    TerritorialStateManager::new(InfluenceConfig::default(), Arc::new(store), bus, clock)
}

proptest! {
    #[test]
    fn influence_stays_in_bounds_and_dominance_is_exclusive(
        ops in prop::collection::vec((0_u32..3, 1_u32..5, -250.0_f64..250.0), 1..80)
    ) {
        let manager = manager(3);
        for (territory, faction, delta) in ops {
            let update = manager
                .apply_influence_change(TerritoryId(territory), FactionId(faction), delta, InfluenceCause::Combat)
                .unwrap();
            prop_assert!((0.0..=100.0).contains(&update.resulting_influence));
            if update.contested {
                prop_assert_eq!(update.dominant, None);
            }
        }
        for territory in 0..3 {
            let state = manager.get_state(TerritoryId(territory)).unwrap();
            for value in state.influence.values() {
                prop_assert!((0.0..=100.0).contains(value));
            }
            if state.contested {
                prop_assert_eq!(state.dominant, None);
            }
        }
    }

    #[test]
    fn decay_is_tick_size_invariant(
        initial in 1.0_f64..100.0,
        steps in 1_u32..50,
        total in 1.0_f64..20_000.0,
    ) {
        let stepped = manager(1);
        let single = manager(1);
        for m in [&stepped, &single] {
            m.apply_influence_change(TerritoryId(0), FactionId(1), initial, InfluenceCause::Objective)
                .unwrap();
        }
        let step = total / f64::from(steps);
        for _ in 0..steps {
            stepped.apply_decay(step).unwrap();
        }
        single.apply_decay(total).unwrap();

        let a = stepped.get_faction_influence(TerritoryId(0), FactionId(1)).unwrap();
        let b = single.get_faction_influence(TerritoryId(0), FactionId(1)).unwrap();
        prop_assert!((a - b).abs() < 1e-6, "stepped {} vs single {}", a, b);
    }
}
