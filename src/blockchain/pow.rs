use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::debug;

use super::Block;
use crate::error::{AbortReason, LedgerError, Result};

/// Cancellation and deadline are polled once every this many attempts.
pub const CHECK_INTERVAL: u64 = 1024;

/// Shared flag used to stop a running proof-of-work search from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Once triggered the token stays cancelled.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounds for a proof-of-work search. The default is unbounded.
#[derive(Debug, Clone, Default)]
pub struct SealLimits {
    pub cancel: Option<CancelToken>,
    pub timeout: Option<Duration>,
    pub max_attempts: Option<u64>,
}

impl SealLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    fn check(&self, attempts: u64, started: Instant) -> Option<AbortReason> {
        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return Some(AbortReason::AttemptLimit);
        }
        if attempts % CHECK_INTERVAL != 0 {
            return None;
        }
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Some(AbortReason::Cancelled);
        }
        if self.timeout.is_some_and(|t| started.elapsed() >= t) {
            return Some(AbortReason::DeadlineExceeded);
        }
        None
    }
}

/// Leading-zero proof-of-work over a block's hex digest.
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    difficulty: u32,
    target_prefix: String,
}

impl ProofOfWork {
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty,
            target_prefix: "0".repeat(difficulty as usize),
        }
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn meets_difficulty(&self, digest: &str) -> bool {
        digest.starts_with(&self.target_prefix)
    }

    /// Search nonces until the block's digest starts with `difficulty` zeros.
    /// Blocks the caller for as long as that takes.
    pub fn seal(&self, block: &mut Block) -> Result<u64> {
        self.seal_with(block, &SealLimits::unbounded())
    }

    /// Bounded search. Returns the number of digests computed.
    ///
    /// The digest is recomputed before the first check, so a digest cached
    /// before `prev_digest` was assigned is never accepted. On abort the
    /// block holds whatever nonce the search reached and must be discarded.
    pub fn seal_with(&self, block: &mut Block, limits: &SealLimits) -> Result<u64> {
        let started = Instant::now();
        let mut attempts: u64 = 0;
        loop {
            block.digest = block.recompute_digest()?;
            attempts += 1;
            if self.meets_difficulty(&block.digest) {
                debug!(
                    "POW - block #{} sealed at nonce={} after {} attempts ({} ms)",
                    block.index,
                    block.nonce,
                    attempts,
                    started.elapsed().as_millis()
                );
                return Ok(attempts);
            }
            if let Some(reason) = limits.check(attempts, started) {
                debug!(
                    "POW - block #{} search stopped: {} after {} attempts",
                    block.index, reason, attempts
                );
                return Err(LedgerError::SealAborted { attempts, reason });
            }
            block.nonce = block.nonce.wrapping_add(1);
        }
    }
}
