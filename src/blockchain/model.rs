use log::{debug, info, warn};
use thiserror::Error;

use super::pow::{ProofOfWork, SealLimits};
use super::{Block, GENESIS_PREV_DIGEST, Payload};
use crate::error::{LedgerError, Result};
use crate::storage::LedgerStore;

/// The first broken invariant found while checking a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    #[error("chain has no blocks")]
    EmptyChain,

    #[error("genesis block is malformed (index={index}, previous hash={prev_digest:?})")]
    GenesisMismatch { index: u64, prev_digest: String },

    #[error("block at position {position} carries index {found}")]
    IndexMismatch { position: usize, found: u64 },

    #[error("block at position {position}: stored hash does not match its content")]
    DigestMismatch { position: usize },

    #[error("block at position {position}: previous hash does not match the block before it")]
    LinkageMismatch { position: usize },

    #[error("block at position {position}: hash {digest} does not meet difficulty {difficulty}")]
    InsufficientWork {
        position: usize,
        difficulty: u32,
        digest: String,
    },
}

/// Append-only chain of sealed blocks.
#[derive(Debug)]
pub struct Blockchain {
    chain: Vec<Block>,
    difficulty: u32,
}

impl Blockchain {
    /// Initialize a new blockchain with a genesis block.
    pub fn new(difficulty: u32) -> Result<Self> {
        Ok(Self {
            chain: vec![Block::genesis()?],
            difficulty,
        })
    }

    /// Wrap blocks restored from storage. Nothing is recomputed.
    pub fn from_blocks(blocks: Vec<Block>, difficulty: u32) -> Self {
        Self {
            chain: blocks,
            difficulty,
        }
    }

    /// Restore the chain from `store`, or start fresh when there is no usable
    /// prior chain (missing file, malformed JSON, empty array). Difficulty
    /// always comes from the caller, never from the file.
    pub fn open(store: &LedgerStore, difficulty: u32) -> Result<Self> {
        match store.load() {
            Ok(blocks) if blocks.is_empty() => {
                info!(
                    "STORE - {} holds no blocks, creating a new blockchain",
                    store.path().display()
                );
                Self::new(difficulty)
            }
            Ok(blocks) => {
                info!(
                    "STORE - restored {} blocks from {}",
                    blocks.len(),
                    store.path().display()
                );
                Ok(Self::from_blocks(blocks, difficulty))
            }
            Err(e) if e.is_no_prior_chain() => {
                if matches!(e, LedgerError::LedgerMissing(_)) {
                    info!("{e}. Creating a new blockchain...");
                } else {
                    warn!("{e}. Creating a new blockchain...");
                }
                Self::new(difficulty)
            }
            Err(e) => Err(e),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    /// The tail block, or `None` for an empty chain.
    pub fn latest(&self) -> Option<&Block> {
        self.chain.last()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Unsealed block following the current tail. Its previous hash is
    /// assigned by [`Blockchain::append`].
    pub fn candidate(&self, payload: Payload) -> Result<Block> {
        let tail = self.latest().ok_or(LedgerError::EmptyChain)?;
        let index = tail
            .index
            .checked_add(1)
            .ok_or(LedgerError::IndexOverflow(tail.index))?;
        Block::new(index, payload, "")
    }

    /// Link `candidate` to the tail, seal it and push it.
    pub fn append(&mut self, candidate: Block) -> Result<&Block> {
        self.append_with(candidate, &SealLimits::unbounded())
    }

    /// Like [`Blockchain::append`] with a bounded proof-of-work search. The
    /// chain is untouched unless the block is fully sealed.
    pub fn append_with(&mut self, mut candidate: Block, limits: &SealLimits) -> Result<&Block> {
        let tail = self.latest().ok_or(LedgerError::EmptyChain)?;
        candidate.prev_digest = tail.digest.clone();

        let attempts = ProofOfWork::new(self.difficulty).seal_with(&mut candidate, limits)?;
        info!(
            "MINER - sealed block #{} (hash={}, nonce={}, attempts={})",
            candidate.index, candidate.digest, candidate.nonce, attempts
        );

        let position = self.chain.len();
        self.chain.push(candidate);
        Ok(&self.chain[position])
    }

    /// Check stored hashes and linkage for every block after genesis, in
    /// order, stopping at the first failure.
    pub fn check_links(&self) -> std::result::Result<(), IntegrityViolation> {
        for (i, pair) in self.chain.windows(2).enumerate() {
            let (prev, current) = (&pair[0], &pair[1]);
            let position = i + 1;

            if !current.is_self_consistent() {
                return Err(IntegrityViolation::DigestMismatch { position });
            }
            if current.prev_digest != prev.digest {
                return Err(IntegrityViolation::LinkageMismatch { position });
            }
        }
        Ok(())
    }

    /// Whether every block after genesis has a valid hash and links to its
    /// predecessor. The genesis block itself is not checked here; see
    /// [`Blockchain::audit`].
    pub fn validate(&self) -> bool {
        match self.check_links() {
            Ok(()) => true,
            Err(violation) => {
                debug!("VALIDATE - {violation}");
                false
            }
        }
    }

    /// Strict check: genesis shape and hash, index continuity, hashes,
    /// linkage and proof-of-work against the current difficulty.
    pub fn audit(&self) -> std::result::Result<(), IntegrityViolation> {
        let genesis = self.chain.first().ok_or(IntegrityViolation::EmptyChain)?;
        if genesis.index != 0 || genesis.prev_digest != GENESIS_PREV_DIGEST {
            return Err(IntegrityViolation::GenesisMismatch {
                index: genesis.index,
                prev_digest: genesis.prev_digest.clone(),
            });
        }
        if !genesis.is_self_consistent() {
            return Err(IntegrityViolation::DigestMismatch { position: 0 });
        }

        let pow = ProofOfWork::new(self.difficulty);
        for (position, block) in self.chain.iter().enumerate().skip(1) {
            if block.index != position as u64 {
                return Err(IntegrityViolation::IndexMismatch {
                    position,
                    found: block.index,
                });
            }
            if !block.is_self_consistent() {
                return Err(IntegrityViolation::DigestMismatch { position });
            }
            if block.prev_digest != self.chain[position - 1].digest {
                return Err(IntegrityViolation::LinkageMismatch { position });
            }
            if !pow.meets_difficulty(&block.digest) {
                return Err(IntegrityViolation::InsufficientWork {
                    position,
                    difficulty: self.difficulty,
                    digest: block.digest.clone(),
                });
            }
        }
        Ok(())
    }
}
