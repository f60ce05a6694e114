use std::collections::BTreeMap;

use solana_program::pubkey::Pubkey;

use super::Position;

/// Positions keyed by owner. Every owner implicitly has a zero position;
/// an entry is materialized the first time a position is committed.
#[derive(Debug, Default, Clone)]
pub struct PositionStore {
    positions: BTreeMap<Pubkey, Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the owner's position (zero-valued if never committed)
    pub fn get(&self, owner: &Pubkey) -> Position {
        self.positions.get(owner).copied().unwrap_or_default()
    }

    pub fn commit(&mut self, owner: Pubkey, position: Position) {
        self.positions.insert(owner, position);
    }

    pub fn contains(&self, owner: &Pubkey) -> bool {
        self.positions.contains_key(owner)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pubkey, &Position)> {
        self.positions.iter()
    }
}
