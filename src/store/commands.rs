//! Store commands: public context upload, row upload, encrypted lookup

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::algebra::BfvEvaluator;
use crate::error::{store_err, LookupError, Result};
use crate::lookup::respond;
use crate::metrics::Timings;
use crate::serialize::{
    ciphertext_from_bytes, ciphertext_to_bytes, context_from_bytes, public_keys_from_bytes,
};
use crate::table::{EncryptedTable, SerializedEntry};

use super::{is_reserved, KvStore, CONTEXT_KEY, PUBLIC_KEY_KEY};

/// Store occupancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Table rows (non-reserved keys)
    pub entries: usize,
    pub has_context: bool,
    pub has_public_keys: bool,
}

/// Encrypted lookup commands over a [`KvStore`]
#[derive(Debug)]
pub struct FheCommands<S> {
    store: S,
}

impl<S: KvStore> FheCommands<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store the algebra context and public key bundle
    ///
    /// Both are parsed before anything is written, so a malformed upload
    /// leaves the previous context in place.
    pub fn set_public_context(&self, context_bytes: &[u8], public_key_bytes: &[u8]) -> Result<()> {
        let context = context_from_bytes(context_bytes)?;
        public_keys_from_bytes(public_key_bytes, &context)?;

        self.store.set(CONTEXT_KEY.as_bytes(), context_bytes)?;
        self.store.set(PUBLIC_KEY_KEY.as_bytes(), public_key_bytes)?;
        info!("Public context stored: {} slots", context.params().slot_count());
        Ok(())
    }

    /// Store one row: serialized key ciphertext → serialized value ciphertext
    ///
    /// Requires a stored context. Both blobs must parse as ciphertexts under
    /// it, so one bad row cannot poison later lookups.
    pub fn set_entry(&self, key_bytes: &[u8], value_bytes: &[u8]) -> Result<()> {
        if is_reserved(key_bytes) {
            return Err(LookupError::ReservedKey(
                String::from_utf8_lossy(key_bytes).into_owned(),
            ));
        }
        let context_bytes = self
            .store
            .get(CONTEXT_KEY.as_bytes())?
            .ok_or(LookupError::MissingReservedKey(CONTEXT_KEY))?;
        let context = context_from_bytes(&context_bytes)?;
        ciphertext_from_bytes(key_bytes, &context)?;
        ciphertext_from_bytes(value_bytes, &context)?;

        self.store.set(key_bytes, value_bytes)
    }

    /// Encrypted lookup over every stored row
    pub fn lookup(&self, query_bytes: &[u8]) -> Result<Vec<u8>> {
        self.lookup_timed(query_bytes, &mut Timings::new())
    }

    /// [`FheCommands::lookup`] recording the `load` and `respond` phases
    pub fn lookup_timed(&self, query_bytes: &[u8], timings: &mut Timings) -> Result<Vec<u8>> {
        let (evaluator, table, query) = timings.time("load", || {
            let evaluator = self.evaluator()?;
            let table = EncryptedTable::from_serialized(&self.entries()?, evaluator.context())?;
            let query = ciphertext_from_bytes(query_bytes, evaluator.context())?;
            Ok::<_, LookupError>((evaluator, table, query))
        })?;
        debug!("Lookup over {} stored rows", table.len());

        let response = timings.time("respond", || respond(&evaluator, &table.entries, &query))?;
        Ok(ciphertext_to_bytes(&response))
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let keys = self.store.keys()?;
        Ok(StoreStats {
            entries: keys.iter().filter(|k| !is_reserved(k)).count(),
            has_context: keys.iter().any(|k| k.as_slice() == CONTEXT_KEY.as_bytes()),
            has_public_keys: keys.iter().any(|k| k.as_slice() == PUBLIC_KEY_KEY.as_bytes()),
        })
    }

    fn evaluator(&self) -> Result<BfvEvaluator> {
        let context_bytes = self
            .store
            .get(CONTEXT_KEY.as_bytes())?
            .ok_or(LookupError::MissingReservedKey(CONTEXT_KEY))?;
        let key_bytes = self
            .store
            .get(PUBLIC_KEY_KEY.as_bytes())?
            .ok_or(LookupError::MissingReservedKey(PUBLIC_KEY_KEY))?;

        let context = context_from_bytes(&context_bytes)?;
        let keys = public_keys_from_bytes(&key_bytes, &context)?;
        Ok(context.evaluator(keys))
    }

    fn entries(&self) -> Result<Vec<SerializedEntry>> {
        let mut entries = Vec::new();
        for key in self.store.keys()? {
            if is_reserved(&key) {
                continue;
            }
            let value = self
                .store
                .get(&key)?
                .ok_or_else(|| store_err!("key disappeared during lookup"))?;
            entries.push(SerializedEntry { key, value });
        }
        Ok(entries)
    }
}
