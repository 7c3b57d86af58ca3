pub mod block;
pub mod digest;
pub mod model;
pub mod pow;

pub use block::{Block, Payload};
pub use model::{Blockchain, IntegrityViolation};
pub use pow::{CancelToken, ProofOfWork, SealLimits};

/// Default Proof-of-Work difficulty (number of leading zeros).
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// A SHA-256 hex digest has 64 characters; anything above can never be met.
pub const MAX_DIFFICULTY: u32 = 64;

/// Fixed payload of block 0.
pub const GENESIS_PAYLOAD: &str = "Bloco Gênesis";

/// Previous-hash sentinel of block 0.
pub const GENESIS_PREV_DIGEST: &str = "0";
