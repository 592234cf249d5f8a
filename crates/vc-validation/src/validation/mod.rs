//! Block acceptance rules.
//!
//! Each validator is a unit struct of associated functions over the chain
//! state; the service runs them in order header, commit, evidence.

mod commit;
mod evidence;
mod header;

pub use commit::CommitValidator;
pub use evidence::EvidenceVerifier;
pub use header::HeaderValidator;
