//! Two-thirds voting power quorum.

/// Quorum rule over a fixed total voting power.
///
/// A tally reaches majority when it is strictly more than two thirds of
/// the total, i.e. at least `total * 2 / 3 + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingPowerMajority {
    total: u64,
}

impl VotingPowerMajority {
    /// Quorum over `total` voting power.
    pub fn new(total: u64) -> Self {
        Self { total }
    }

    /// Total voting power.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Smallest tally that reaches majority.
    pub fn needed(&self) -> u64 {
        // total * 2 / 3 + 1 <= u64::MAX for every u64 total
        (u128::from(self.total) * 2 / 3 + 1) as u64
    }

    /// Whether `tally` reaches majority.
    pub fn is_reached(&self, tally: u64) -> bool {
        tally >= self.needed()
    }
}
