//! Lookup setup and the querying client
//!
//! The client owns the secret key. Everything it hands out (context bytes,
//! public keys, encrypted table, encrypted queries) is safe to give to the
//! computing party.

use fhe::bfv::Ciphertext;
use rand::{CryptoRng, RngCore};
use tracing::info;

use crate::algebra::{BfvContext, BfvEvaluator, KeyPair, SlotAlgebra, SlotDecryptor};
use crate::error::Result;
use crate::metrics::Timings;
use crate::params::LookupParams;
use crate::serialize::{context_to_bytes, public_keys_to_bytes};
use crate::table::{encrypt_table, EncryptedTable, TableRow};

use super::SlotCodec;

/// Querying party: context, key pair and codec
#[derive(Debug)]
pub struct LookupClient {
    context: BfvContext,
    keys: KeyPair,
    codec: SlotCodec,
}

impl LookupClient {
    pub fn new(context: BfvContext, keys: KeyPair) -> Self {
        let codec = SlotCodec::for_params(context.params());
        Self {
            context,
            keys,
            codec,
        }
    }

    pub fn params(&self) -> &LookupParams {
        self.context.params()
    }

    pub fn context(&self) -> &BfvContext {
        &self.context
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn codec(&self) -> &SlotCodec {
        &self.codec
    }

    /// Public-key evaluator for the computing party
    pub fn evaluator(&self) -> BfvEvaluator {
        self.context.evaluator(self.keys.public().clone())
    }

    /// Encode and encrypt a query key
    ///
    /// Rejects text the codec cannot represent exactly, since a truncated
    /// query could match a different key.
    pub fn query(&self, text: &str) -> Result<Ciphertext> {
        let slots = self.codec.encode(text)?;
        self.evaluator().encrypt(&slots)
    }

    /// Decrypt and decode a lookup response; `None` when nothing matched
    pub fn extract(&self, response: &Ciphertext) -> Result<Option<String>> {
        let slots = self.keys.decrypt(response)?;
        Ok(self.codec.decode(&slots))
    }

    /// Serialized algebra context for the computing party
    pub fn public_context_bytes(&self) -> Result<Vec<u8>> {
        context_to_bytes(self.context.params())
    }

    /// Serialized public key bundle for the computing party
    pub fn public_keys_bytes(&self) -> Result<Vec<u8>> {
        public_keys_to_bytes(self.keys.public())
    }
}

/// Build the context, generate keys and encrypt `rows`
///
/// # Arguments
/// * `params` - Algebra parameters (validated here)
/// * `rows` - Plaintext table, already validated against the codec
/// * `rng` - Randomness for key generation
/// * `timings` - Receives the `context`, `keygen` and `encrypt table` phases
///
/// # Returns
/// * `LookupClient` - Secret-key holder used for queries and extraction
/// * `EncryptedTable` - Encrypted rows, in input order
pub fn setup<R: RngCore + CryptoRng>(
    params: &LookupParams,
    rows: &[TableRow],
    rng: &mut R,
    timings: &mut Timings,
) -> Result<(LookupClient, EncryptedTable)> {
    let context = timings.time("context", || BfvContext::new(params))?;
    info!(
        "Context ready: {} slots, p={}, chain {} bits (needs ~{})",
        params.slot_count(),
        params.plaintext_modulus,
        params.modulus_bits,
        params.required_modulus_bits()
    );

    let keys = timings.time("keygen", || context.generate_keys(rng))?;
    let client = LookupClient::new(context, keys);

    let evaluator = client.evaluator();
    let entries = timings.time("encrypt table", || {
        encrypt_table(&evaluator, client.codec(), rows)
    })?;
    info!("Encrypted {} table rows", entries.len());

    Ok((client, EncryptedTable { entries }))
}
