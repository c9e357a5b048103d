//! In-memory store with bincode snapshots

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::RwLock;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{store_err, LookupError, Result};

use super::KvStore;

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// Thread-safe ordered map
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<Map>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Write every key/value pair to `path`
    ///
    /// The snapshot is written to a temporary file in the same directory and
    /// renamed over `path`, so readers see either the old or the new snapshot.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let map = self.read()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            bincode::serialize_into(&mut writer, &*map)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LookupError::Io(e.error))?;
        info!("Snapshot saved: {} keys to {}", map.len(), path.display());
        Ok(())
    }

    /// Load a store from a snapshot written by [`MemoryStore::save_snapshot`]
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let map: Map = bincode::deserialize_from(BufReader::new(file))?;
        info!("Snapshot loaded: {} keys from {}", map.len(), path.display());
        Ok(Self {
            map: RwLock::new(map),
        })
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Map>> {
        self.map.read().map_err(|_| store_err!("store lock poisoned"))
    }
}

impl KvStore for MemoryStore {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut map = self.map.write().map_err(|_| store_err!("store lock poisoned"))?;
        map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.read()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_overwrite() {
        let store = MemoryStore::new();
        assert!(store.is_empty().unwrap());

        store.set(b"a", b"1").unwrap();
        store.set(b"b", b"2").unwrap();
        store.set(b"a", b"3").unwrap();

        assert_eq!(store.get(b"a").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.get(b"missing").unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");

        let store = MemoryStore::new();
        store.set(b".fhe_context", &[1, 2, 3]).unwrap();
        store.set(&[0xff, 0x00], &[9; 64]).unwrap();
        store.save_snapshot(&path).unwrap();

        let loaded = MemoryStore::load_snapshot(&path).unwrap();
        assert_eq!(loaded.keys().unwrap(), store.keys().unwrap());
        assert_eq!(loaded.get(&[0xff, 0x00]).unwrap(), Some(vec![9; 64]));
    }

    #[test]
    fn test_snapshot_replaced_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");

        let store = MemoryStore::new();
        store.set(b"a", &[1; 1024]).unwrap();
        store.save_snapshot(&path).unwrap();
        store.set(b"b", b"2").unwrap();
        store.save_snapshot(&path).unwrap();

        let loaded = MemoryStore::load_snapshot(&path).unwrap();
        assert_eq!(loaded.len().unwrap(), 2);

        // no temporary files left next to the snapshot
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_snapshot_into_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("store.bin");
        let store = MemoryStore::new();
        assert!(matches!(store.save_snapshot(&path), Err(LookupError::Io(_))));
    }
}
