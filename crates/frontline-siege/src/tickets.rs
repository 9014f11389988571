//! Attacker and defender reinforcement pools.

use frontline_types::SiegeSide;
use serde::{Deserialize, Serialize};

/// The two ticket pools of a siege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPools {
    attacker: i64,
    defender: i64,
    allow_negative: bool,
}

impl TicketPools {
    /// Pools with the given starting counts.
    pub const fn new(attacker: i64, defender: i64, allow_negative: bool) -> Self {
        Self {
            attacker,
            defender,
            allow_negative,
        }
    }

    /// Tickets left for a side.
    pub const fn remaining(&self, side: SiegeSide) -> i64 {
        match side {
            SiegeSide::Attacker => self.attacker,
            SiegeSide::Defender => self.defender,
        }
    }

    /// Spend tickets. Pools stop at zero unless negatives are allowed.
    /// Returns what is left.
    pub fn consume(&mut self, side: SiegeSide, amount: u32) -> i64 {
        let pool = match side {
            SiegeSide::Attacker => &mut self.attacker,
            SiegeSide::Defender => &mut self.defender,
        };
        let next = pool.saturating_sub(i64::from(amount));
        *pool = if self.allow_negative { next } else { next.max(0) };
        *pool
    }

    /// The side whose pool is exhausted, attacker first.
    pub const fn exhausted(&self) -> Option<SiegeSide> {
        if self.attacker <= 0 {
            Some(SiegeSide::Attacker)
        } else if self.defender <= 0 {
            Some(SiegeSide::Defender)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pools_stop_at_zero_by_default() {
        let mut pools = TicketPools::new(5, 5, false);
        assert_eq!(pools.consume(SiegeSide::Attacker, 3), 2);
        assert_eq!(pools.consume(SiegeSide::Attacker, 3), 0);
        assert_eq!(pools.exhausted(), Some(SiegeSide::Attacker));
        assert_eq!(pools.remaining(SiegeSide::Defender), 5);
    }

    #[test]
    fn negative_pools_when_allowed() {
        let mut pools = TicketPools::new(5, 1, true);
        assert_eq!(pools.consume(SiegeSide::Defender, 4), -3);
        assert_eq!(pools.exhausted(), Some(SiegeSide::Defender));
    }

    #[test]
    fn nothing_is_exhausted_while_both_pools_hold() {
        let pools = TicketPools::new(1, 1, false);
        assert_eq!(pools.exhausted(), None);
    }
}
