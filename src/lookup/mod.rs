//! Encrypted exact-match lookup
//!
//! # Protocol Overview
//!
//! 1. **Setup**: the client builds the BFV context, generates its key pair
//!    and encrypts the table slot-wise (one key and one value ciphertext per
//!    row)
//! 2. **Query**: the client encrypts the query key with the same codec
//! 3. **Respond**: the computing party multiplies every value by its
//!    equality mask and sums the results, using public keys only
//! 4. **Extract**: the client decrypts and decodes; all zeros means no match
//!
//! # Example
//!
//! ```ignore
//! use fhe_lookup::lookup::{respond, setup};
//! use fhe_lookup::metrics::Timings;
//! use fhe_lookup::params::LookupParams;
//! use fhe_lookup::table::TableRow;
//!
//! let rows = vec![TableRow::new("France", "Paris"), TableRow::new("Spain", "Madrid")];
//! let mut timings = Timings::new();
//! let (client, table) = setup(&LookupParams::demo(), &rows, &mut rand::thread_rng(), &mut timings)?;
//!
//! let query = client.query("Spain")?;
//! let response = respond(&client.evaluator(), &table.entries, &query)?;
//! assert_eq!(client.extract(&response)?.as_deref(), Some("Madrid"));
//! ```

mod client;
mod encode;
mod mask;
mod respond;

pub use client::{setup, LookupClient};
pub use encode::SlotCodec;
pub use mask::{equality_mask, slot_indicator};
pub use respond::{masked_value, respond, respond_sequential};
