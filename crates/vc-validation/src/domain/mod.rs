//! Domain layer: quorum arithmetic, verdicts and error types.

mod error;
mod majority;
mod verdict;

pub use error::*;
pub use majority::VotingPowerMajority;
pub use verdict::EvidenceVerdict;
