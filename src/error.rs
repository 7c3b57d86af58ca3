use std::path::PathBuf;

use thiserror::Error;

use crate::blockchain::IntegrityViolation;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A value that has no canonical JSON form (NaN, infinities).
    #[error("Cannot canonically encode {0}")]
    NonCanonical(String),

    #[error("Ledger file not found: {}", .0.display())]
    LedgerMissing(PathBuf),

    #[error("Malformed ledger file {}: {reason}", .path.display())]
    LedgerMalformed { path: PathBuf, reason: String },

    #[error("Failed to write ledger {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chain is empty, no tail block to link to")]
    EmptyChain,

    #[error("Block index {0} has no successor")]
    IndexOverflow(u64),

    #[error("Proof-of-work aborted after {attempts} attempts ({reason})")]
    SealAborted { attempts: u64, reason: AbortReason },

    #[error("Chain integrity violation: {0}")]
    Integrity(IntegrityViolation),

    #[error("Invalid reading: {0}")]
    InvalidReading(String),
}

impl LedgerError {
    /// True for the load failures that mean "start a fresh chain".
    pub fn is_no_prior_chain(&self) -> bool {
        matches!(
            self,
            LedgerError::LedgerMissing(_) | LedgerError::LedgerMalformed { .. }
        )
    }

    /// True when the payload or a block field could not be encoded for hashing.
    pub fn is_serialization(&self) -> bool {
        matches!(self, LedgerError::Serde(_) | LedgerError::NonCanonical(_))
    }
}

/// Why a bounded proof-of-work search stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
    DeadlineExceeded,
    AttemptLimit,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AbortReason::Cancelled => "cancelled",
            AbortReason::DeadlineExceeded => "deadline exceeded",
            AbortReason::AttemptLimit => "attempt limit reached",
        };
        f.write_str(s)
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
