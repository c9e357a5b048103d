//! fhe-lookup: privacy-preserving exact-match key/value lookup
//!
//! A client encrypts a two-column table and a query key under BFV. A
//! computing party that holds only public keys returns the value whose key
//! equals the query, without learning the query, the keys or the result.
//!
//! Key components:
//! - Slot codec: text packed one byte per plaintext slot
//! - Equality mask: Fermat's little theorem per slot, then an AND across slots
//! - Lookup aggregator: masked values summed over the table
//! - Bit-serial comparator: ripple-carry subtraction over encrypted bits
//! - Store commands: context upload, row upload and lookup over a key/value store

pub mod algebra;
pub mod comparator;
pub mod error;
#[cfg(feature = "server")]
pub mod http;
pub mod lookup;
pub mod metrics;
pub mod params;
pub mod serialize;
pub mod store;
pub mod table;

pub use algebra::{BfvContext, BfvEvaluator, KeyPair, PublicKeys, SlotAlgebra, SlotDecryptor};
pub use comparator::{Comparator, Selector};
pub use error::{LookupError, Result};
pub use lookup::{equality_mask, respond, respond_sequential, setup, LookupClient, SlotCodec};
pub use metrics::Timings;
pub use params::LookupParams;
pub use store::{FheCommands, KvStore, MemoryStore};
pub use table::{EncryptedEntry, EncryptedTable, TableRow};
