//! Key/value tables: plaintext ingestion, encryption and persistence
//!
//! # Source format
//!
//! One row per line, `key,value`. The first comma separates the fields and
//! everything after it belongs to the value, commas included. Blank lines and
//! lines starting with `#` are skipped. Rows are validated against the slot
//! codec at ingestion, so overlong or unrepresentable text is reported
//! instead of silently truncated.

mod persist;

pub use persist::{load_table_file, save_table_file};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use fhe::bfv::Ciphertext;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algebra::{BfvContext, SlotAlgebra};
use crate::error::{LookupError, Result};
use crate::lookup::SlotCodec;
use crate::serialize::{ciphertext_from_bytes, ciphertext_to_bytes};

/// One plaintext table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub key: String,
    pub value: String,
}

impl TableRow {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One encrypted row
#[derive(Debug, Clone)]
pub struct EncryptedEntry<C = Ciphertext> {
    pub key: C,
    pub value: C,
}

/// Encrypted row in transport form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl EncryptedEntry<Ciphertext> {
    pub fn to_serialized(&self) -> SerializedEntry {
        SerializedEntry {
            key: ciphertext_to_bytes(&self.key),
            value: ciphertext_to_bytes(&self.value),
        }
    }
}

impl SerializedEntry {
    pub fn to_encrypted(&self, context: &BfvContext) -> Result<EncryptedEntry> {
        Ok(EncryptedEntry {
            key: ciphertext_from_bytes(&self.key, context)?,
            value: ciphertext_from_bytes(&self.value, context)?,
        })
    }
}

/// Encrypted table held by the computing party
#[derive(Debug, Clone, Default)]
pub struct EncryptedTable {
    pub entries: Vec<EncryptedEntry>,
}

impl EncryptedTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_serialized(&self) -> Vec<SerializedEntry> {
        self.entries.iter().map(EncryptedEntry::to_serialized).collect()
    }

    pub fn from_serialized(entries: &[SerializedEntry], context: &BfvContext) -> Result<Self> {
        let entries = entries
            .par_iter()
            .map(|e| e.to_encrypted(context))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Write the table to an encrypted-table file
    pub fn save(&self, path: &Path) -> Result<()> {
        save_table_file(path, &self.to_serialized())
    }

    /// Read an encrypted-table file written by [`EncryptedTable::save`]
    pub fn load(path: &Path, context: &BfvContext) -> Result<Self> {
        Self::from_serialized(&load_table_file(path)?, context)
    }
}

/// Read and validate a source table file
pub fn read_table(path: &Path, codec: &SlotCodec) -> Result<Vec<TableRow>> {
    let text = fs::read_to_string(path).map_err(|e| {
        LookupError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open table {}: {}", path.display(), e),
        ))
    })?;
    parse_table(&text, codec)
}

/// Parse and validate table text
pub fn parse_table(text: &str, codec: &SlotCodec) -> Result<Vec<TableRow>> {
    let mut rows = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let row = raw.strip_suffix('\r').unwrap_or(raw);
        if row.trim().is_empty() || row.starts_with('#') {
            continue;
        }

        let (key, value) = row.split_once(',').ok_or_else(|| LookupError::Table {
            line,
            reason: "missing value column".to_string(),
        })?;

        for (field, text) in [("key", key), ("value", value)] {
            codec.encode(text).map_err(|e| LookupError::Table {
                line,
                reason: format!("{}: {}", field, e),
            })?;
        }

        rows.push(TableRow::new(key, value));
    }
    Ok(rows)
}

/// Reject tables where two rows share a key
///
/// Lookups over duplicate keys return the sum of the matching values; owners
/// that need a single answer per key can enforce uniqueness here.
pub fn check_unique_keys(rows: &[TableRow]) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        if let Some(first) = seen.insert(row.key.as_str(), i) {
            return Err(LookupError::Table {
                line: i + 1,
                reason: format!("duplicate key {:?} (first at row {})", row.key, first + 1),
            });
        }
    }
    Ok(())
}

/// Encrypt one row
pub fn encrypt_entry<A: SlotAlgebra>(
    algebra: &A,
    codec: &SlotCodec,
    row: &TableRow,
) -> Result<EncryptedEntry<A::Ciphertext>> {
    Ok(EncryptedEntry {
        key: algebra.encrypt(&codec.encode(&row.key)?)?,
        value: algebra.encrypt(&codec.encode(&row.value)?)?,
    })
}

/// Encrypt a whole table, rows in parallel, order preserved
pub fn encrypt_table<A: SlotAlgebra>(
    algebra: &A,
    codec: &SlotCodec,
    rows: &[TableRow],
) -> Result<Vec<EncryptedEntry<A::Ciphertext>>> {
    rows.par_iter()
        .map(|row| encrypt_entry(algebra, codec, row))
        .collect()
}
