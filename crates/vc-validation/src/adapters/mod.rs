//! Adapters layer (Hexagonal Architecture)

mod evidence_pool;
mod validator_history;

pub use evidence_pool::*;
pub use validator_history::*;
