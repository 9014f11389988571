//! Deterministic hashing of route generation parameters.

use std::hash::Hasher;

use frontline_types::{FactionId, TerritoryId};

/// A deterministic FNV-1a 64-bit hasher.
///
/// `DefaultHasher` is randomly seeded per process, which would make the
/// parameter hash differ between servers and restarts.
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    /// Hasher at the FNV offset basis.
    pub const fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Hash of everything that determines a generated route.
pub fn route_params_hash(
    faction: FactionId,
    source: TerritoryId,
    destination: TerritoryId,
    min_security: f64,
    max_hops: u32,
) -> u64 {
    let mut hasher = FnvHasher::new();
    hasher.write(&faction.get().to_le_bytes());
    hasher.write(&source.get().to_le_bytes());
    hasher.write(&destination.get().to_le_bytes());
    hasher.write(&min_security.to_bits().to_le_bytes());
    hasher.write(&max_hops.to_le_bytes());
    hasher.finish()
}
