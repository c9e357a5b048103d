//! Binary encrypted-table files
//!
//! Layout (little endian):
//!
//! ```text
//! magic "FHET" | version u32 | entry count u32
//! repeated: key length u32 | key bytes | value length u32 | value bytes
//! ```

use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;

use crate::error::{LookupError, Result};

use super::SerializedEntry;

const MAGIC: &[u8; 4] = b"FHET";
const VERSION: u32 = 1;

/// Save serialized entries to a table file
pub fn save_table_file(path: &Path, entries: &[SerializedEntry]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(MAGIC)?;
    writer.write_u32::<LittleEndian>(VERSION)?;
    writer.write_u32::<LittleEndian>(entries.len() as u32)?;

    for entry in entries {
        for blob in [&entry.key, &entry.value] {
            writer.write_u32::<LittleEndian>(blob.len() as u32)?;
            writer.write_all(blob)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Load serialized entries from a table file
pub fn load_table_file(path: &Path) -> Result<Vec<SerializedEntry>> {
    let file = File::open(path)?;
    // SAFETY: File is opened read-only and not modified during the mmap lifetime.
    // The mmap is used only within this function scope for reading.
    let mmap = unsafe { Mmap::map(&file)? };
    let mut cursor = Cursor::new(&mmap[..]);

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(LookupError::Serialization(format!(
            "{} is not an encrypted table file",
            path.display()
        )));
    }
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != VERSION {
        return Err(LookupError::Serialization(format!(
            "unsupported table file version {}",
            version
        )));
    }

    let count = cursor.read_u32::<LittleEndian>()? as usize;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let key = read_blob(&mut cursor)?;
        let value = read_blob(&mut cursor)?;
        entries.push(SerializedEntry { key, value });
    }

    Ok(entries)
}

fn read_blob(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let len = cursor.read_u32::<LittleEndian>()? as usize;
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len > remaining {
        return Err(LookupError::Serialization(format!(
            "truncated table file: blob of {} bytes, {} left",
            len, remaining
        )));
    }
    let mut blob = vec![0u8; len];
    cursor.read_exact(&mut blob)?;
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_table_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.bin");

        let entries = vec![
            SerializedEntry {
                key: vec![1, 2, 3],
                value: vec![4, 5],
            },
            SerializedEntry {
                key: vec![],
                value: vec![9; 300],
            },
        ];
        save_table_file(&path, &entries).unwrap();

        let loaded = load_table_file(&path).unwrap();
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.bin");
        std::fs::write(&path, b"NOPE\x01\x00\x00\x00\x00\x00\x00\x00").unwrap();
        assert!(load_table_file(&path).is_err());
    }

    #[test]
    fn test_rejects_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.bin");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 10]);
        std::fs::write(&path, bytes).unwrap();
        assert!(load_table_file(&path).is_err());
    }
}
