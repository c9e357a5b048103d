//! Key/value store commands for encrypted lookup
//!
//! A store holds serialized ciphertexts: each table row lives under its
//! serialized key ciphertext, with the serialized value ciphertext as the
//! stored value. Two reserved keys hold the algebra context and the public
//! key bundle. A lookup enumerates every non-reserved key, runs the
//! equality-mask aggregation and returns one serialized ciphertext.
//!
//! Store and protocol errors are handed back to the caller unchanged.

mod commands;
mod memory;

pub use commands::{FheCommands, StoreStats};
pub use memory::MemoryStore;

use crate::error::Result;

/// Reserved key holding the serialized algebra context
pub const CONTEXT_KEY: &str = ".fhe_context";

/// Reserved key holding the serialized public key bundle
pub const PUBLIC_KEY_KEY: &str = ".fhe_public_key";

/// Returns true for keys that never hold table rows
pub fn is_reserved(key: &[u8]) -> bool {
    key == CONTEXT_KEY.as_bytes() || key == PUBLIC_KEY_KEY.as_bytes()
}

/// Minimal byte-oriented key/value store
pub trait KvStore: Send + Sync {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All keys, in a stable order
    fn keys(&self) -> Result<Vec<Vec<u8>>>;
}
