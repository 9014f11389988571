//! Bounded queue of pending decisions.
//!
//! Decisions are keyed by `(faction, kind, target)`: a faction never has two
//! pending decisions asking for the same thing. When the queue is full the
//! lowest-priority decision is evicted, or the incoming one is rejected if it
//! ranks no higher.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use frontline_types::{DecisionKind, FactionId, StrategicDecision, TerritoryId};

type DecisionKey = (FactionId, DecisionKind, TerritoryId);

/// What happened to a pushed decision.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// Added to the queue.
    Queued,
    /// Replaced a pending decision with the same key and lower priority.
    Replaced(StrategicDecision),
    /// A pending decision with the same key ranks at least as high.
    Duplicate,
    /// Added after evicting the lowest-priority decision.
    Evicted(StrategicDecision),
    /// The queue is full and the decision ranks lowest.
    Rejected,
}

impl PushOutcome {
    /// Whether the pushed decision is now pending.
    pub const fn accepted(&self) -> bool {
        matches!(self, Self::Queued | Self::Replaced(_) | Self::Evicted(_))
    }
}

/// Pending decisions, bounded by capacity.
#[derive(Debug, Clone)]
pub struct DecisionQueue {
    capacity: usize,
    pending: BTreeMap<DecisionKey, StrategicDecision>,
}

fn key_of(decision: &StrategicDecision) -> DecisionKey {
    (decision.faction, decision.kind, decision.target)
}

/// Higher priority first, then older first.
fn ranks_before(a: &StrategicDecision, b: &StrategicDecision) -> core::cmp::Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then(a.created_at.cmp(&b.created_at))
}

impl DecisionQueue {
    /// An empty queue. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            pending: BTreeMap::new(),
        }
    }

    /// Maximum number of pending decisions.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pending decisions.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Add a decision.
    pub fn push(&mut self, decision: StrategicDecision) -> PushOutcome {
        let key = key_of(&decision);
        if let Some(existing) = self.pending.get(&key) {
            if existing.priority >= decision.priority {
                return PushOutcome::Duplicate;
            }
            return match self.pending.insert(key, decision) {
                Some(previous) => PushOutcome::Replaced(previous),
                None => PushOutcome::Queued,
            };
        }

        if self.pending.len() < self.capacity {
            self.pending.insert(key, decision);
            return PushOutcome::Queued;
        }

        let Some(lowest) = self
            .pending
            .iter()
            .max_by(|a, b| ranks_before(a.1, b.1))
            .map(|(k, d)| (*k, d.priority))
        else {
            return PushOutcome::Rejected;
        };
        if decision.priority <= lowest.1 {
            return PushOutcome::Rejected;
        }
        let evicted = self.pending.remove(&lowest.0);
        self.pending.insert(key, decision);
        evicted.map_or(PushOutcome::Queued, PushOutcome::Evicted)
    }

    /// Remove and return up to `limit` decisions whose delay has elapsed,
    /// highest priority first.
    pub fn pop_due(&mut self, now: DateTime<Utc>, limit: usize) -> Vec<StrategicDecision> {
        let mut due: Vec<&StrategicDecision> = self
            .pending
            .values()
            .filter(|d| d.execute_after() <= now)
            .collect();
        due.sort_by(|a, b| ranks_before(a, b));
        let keys: Vec<DecisionKey> = due.into_iter().take(limit).map(key_of).collect();
        keys.iter()
            .filter_map(|key| self.pending.remove(key))
            .collect()
    }

    /// Pending decisions, highest priority first.
    pub fn pending(&self) -> Vec<StrategicDecision> {
        let mut all: Vec<StrategicDecision> = self.pending.values().cloned().collect();
        all.sort_by(ranks_before);
        all
    }

    /// Pending decisions of one faction, highest priority first.
    pub fn pending_for(&self, faction: FactionId) -> Vec<StrategicDecision> {
        let mut mine: Vec<StrategicDecision> = self
            .pending
            .range((faction, DecisionKind::Expand, TerritoryId(0))..)
            .take_while(|(key, _)| key.0 == faction)
            .map(|(_, d)| d.clone())
            .collect();
        mine.sort_by(ranks_before);
        mine
    }

    /// Drop every pending decision.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::DateTime;
    use frontline_types::DecisionId;

    use super::*;

    fn decision(faction: u32, kind: DecisionKind, target: u32, priority: f64, delay: u64) -> StrategicDecision {
        StrategicDecision {
            id: DecisionId::new(),
            faction: FactionId(faction),
            kind,
            target: TerritoryId(target),
            priority,
            resource_commitment: 50.0,
            execution_delay_secs: delay,
            reasoning: String::from("test"),
            created_at: DateTime::default(),
        }
    }

    #[test]
    fn same_request_is_deduplicated() {
        let mut queue = DecisionQueue::new(8);
        assert_eq!(queue.push(decision(1, DecisionKind::Expand, 3, 0.5, 0)), PushOutcome::Queued);
        assert_eq!(queue.push(decision(1, DecisionKind::Expand, 3, 0.4, 0)), PushOutcome::Duplicate);
        assert!(matches!(
            queue.push(decision(1, DecisionKind::Expand, 3, 0.9, 0)),
            PushOutcome::Replaced(_)
        ));
        assert_eq!(queue.len(), 1);
        assert!((queue.pending().first().unwrap().priority - 0.9).abs() < 1e-9);

        // Another faction asking for the same target is a separate request.
        assert_eq!(queue.push(decision(2, DecisionKind::Expand, 3, 0.1, 0)), PushOutcome::Queued);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn full_queue_evicts_the_lowest_priority() {
        let mut queue = DecisionQueue::new(2);
        queue.push(decision(1, DecisionKind::Expand, 1, 0.3, 0));
        queue.push(decision(1, DecisionKind::Expand, 2, 0.6, 0));

        assert_eq!(queue.push(decision(1, DecisionKind::Expand, 3, 0.2, 0)), PushOutcome::Rejected);
        let outcome = queue.push(decision(1, DecisionKind::Defend, 4, 0.8, 0));
        let evicted = match outcome {
            PushOutcome::Evicted(evicted) => Some(evicted.target),
            _ => None,
        };
        assert_eq!(evicted, Some(TerritoryId(1)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn pop_due_respects_delay_priority_and_limit() {
        let mut queue = DecisionQueue::new(8);
        queue.push(decision(1, DecisionKind::Expand, 1, 0.2, 0));
        queue.push(decision(1, DecisionKind::Expand, 2, 0.9, 0));
        queue.push(decision(1, DecisionKind::Expand, 3, 0.5, 0));
        queue.push(decision(1, DecisionKind::Expand, 4, 1.0, 60));

        let now = DateTime::<Utc>::default()
            .checked_add_signed(chrono::TimeDelta::seconds(10))
            .unwrap();
        let popped = queue.pop_due(now, 2);
        let targets: Vec<u32> = popped.iter().map(|d| d.target.get()).collect();
        assert_eq!(targets, vec![2, 3]);
        assert_eq!(queue.len(), 2);

        let rest = queue.pop_due(now, 10);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest.first().unwrap().target, TerritoryId(1));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn pending_for_filters_by_faction() {
        let mut queue = DecisionQueue::new(8);
        queue.push(decision(1, DecisionKind::Consolidate, 1, 0.2, 0));
        queue.push(decision(2, DecisionKind::Expand, 2, 0.9, 0));
        queue.push(decision(1, DecisionKind::Defend, 3, 0.7, 0));
        let mine = queue.pending_for(FactionId(1));
        assert_eq!(mine.len(), 2);
        assert_eq!(mine.first().unwrap().kind, DecisionKind::Defend);
    }
}
