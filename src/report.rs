use std::io::Write;

use crate::blockchain::Block;
use crate::error::{LedgerError, Result};
use crate::storage::LedgerStore;

const SEPARATOR_WIDTH: usize = 100;

/// Print every block stored in `store`.
///
/// A missing, malformed or empty ledger produces a one-line diagnostic
/// instead of an error.
pub fn render<W: Write>(store: &LedgerStore, out: &mut W) -> Result<()> {
    let blocks = match store.load() {
        Ok(blocks) => blocks,
        Err(LedgerError::LedgerMissing(path)) => {
            writeln!(out, "Error: file {} not found", path.display())?;
            return Ok(());
        }
        Err(LedgerError::LedgerMalformed { path, .. }) => {
            writeln!(out, "Error: file {} is not a valid ledger", path.display())?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if blocks.is_empty() {
        writeln!(out, "Ledger {} has no blocks", store.path().display())?;
        return Ok(());
    }

    let separator = "=".repeat(SEPARATOR_WIDTH);
    for block in &blocks {
        writeln!(out, "{separator}")?;
        write_block(block, out)?;
    }
    writeln!(out, "{separator}")?;
    Ok(())
}

fn write_block<W: Write>(block: &Block, out: &mut W) -> Result<()> {
    let created = block
        .created_at()
        .map(|at| at.format(" (%Y-%m-%d %H:%M:%S UTC)").to_string())
        .unwrap_or_default();
    let payload = serde_json::to_string(&block.payload)?;

    writeln!(out, "        Index: {}", block.index)?;
    writeln!(out, "    Timestamp: {}{}", block.timestamp, created)?;
    writeln!(out, "      Payload: {}", payload)?;
    writeln!(out, "Previous hash: {}", block.prev_digest)?;
    writeln!(out, " Current hash: {}", block.digest)?;
    writeln!(out, "        Nonce: {}", block.nonce)?;
    Ok(())
}
