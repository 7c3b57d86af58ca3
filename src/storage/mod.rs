use std::fs;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;

use crate::blockchain::Block;
use crate::error::{LedgerError, Result};

/// Single-file JSON store for the whole chain.
///
/// The file is a JSON array of blocks in chain order. Writes go to a
/// temporary file next to the target and are renamed over it, so a crash
/// mid-write leaves the previous ledger intact.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored block verbatim.
    ///
    /// A missing file yields [`LedgerError::LedgerMissing`] and unparsable
    /// content [`LedgerError::LedgerMalformed`]; callers treat both as "no
    /// prior chain". Other I/O failures are returned as is.
    pub fn load(&self) -> Result<Vec<Block>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LedgerError::LedgerMissing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let blocks: Vec<Block> =
            serde_json::from_slice(&data).map_err(|e| LedgerError::LedgerMalformed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        debug!(
            "STORE - read {} blocks ({} bytes) from {}",
            blocks.len(),
            data.len(),
            self.path.display()
        );
        Ok(blocks)
    }

    /// Replace the ledger file with `blocks`.
    pub fn save(&self, blocks: &[Block]) -> Result<()> {
        self.write_atomically(blocks)
            .map_err(|source| LedgerError::Persist {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            "STORE - wrote {} blocks to {}",
            blocks.len(),
            self.path.display()
        );
        Ok(())
    }

    fn write_atomically(&self, blocks: &[Block]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            let mut ser =
                serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
            blocks.serialize(&mut ser)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
