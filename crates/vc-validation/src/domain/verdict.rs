//! Outcomes of evidence verification.

use std::fmt;

/// How an evidence item that stands was handled.
///
/// Every variant counts as accepted; they stay apart for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvidenceVerdict {
    /// The pool already holds the item; nothing was re-checked.
    AlreadyPending,
    /// Fully verified against chain state.
    Verified,
    /// Amnesia accusation without a defense, handed to the pool.
    UndecidedForwarded,
    /// Amnesia accusation answered by a sufficient proof of lock change.
    LockChangeJustified,
}

impl EvidenceVerdict {
    /// Short stable label for metrics and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::AlreadyPending => "already_pending",
            Self::Verified => "verified",
            Self::UndecidedForwarded => "undecided_forwarded",
            Self::LockChangeJustified => "lock_change_justified",
        }
    }
}

impl fmt::Display for EvidenceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
