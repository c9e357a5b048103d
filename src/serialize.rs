//! Byte encodings crossing the store and network boundary
//!
//! - context: `bincode(LookupParams)`; the BFV parameters are rebuilt from it
//! - public keys: `bincode` envelope of the three `fhe` key encodings
//! - ciphertexts: the `fhe` protobuf encoding, unchanged

use fhe::bfv::{Ciphertext, EvaluationKey, PublicKey, RelinearizationKey};
use fhe_traits::{DeserializeParametrized, Serialize as FheSerialize};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::algebra::{BfvContext, PublicKeys};
use crate::error::{LookupError, Result};
use crate::params::LookupParams;

#[derive(Serialize, Deserialize)]
struct PublicKeyEnvelope {
    public_key: Vec<u8>,
    relin_key: Vec<u8>,
    eval_key: Vec<u8>,
}

/// Serialize the algebra context
pub fn context_to_bytes(params: &LookupParams) -> Result<Vec<u8>> {
    Ok(bincode::serialize(params)?)
}

/// Rebuild the algebra context from its serialized parameters
pub fn context_from_bytes(bytes: &[u8]) -> Result<BfvContext> {
    let params: LookupParams = bincode::deserialize(bytes)?;
    BfvContext::new(&params)
}

/// Serialize the public key bundle
pub fn public_keys_to_bytes(keys: &PublicKeys) -> Result<Vec<u8>> {
    let envelope = PublicKeyEnvelope {
        public_key: keys.public_key.to_bytes(),
        relin_key: keys.relin_key.to_bytes(),
        eval_key: keys.eval_key.to_bytes(),
    };
    Ok(bincode::serialize(&envelope)?)
}

/// Deserialize a public key bundle against `context`
pub fn public_keys_from_bytes(bytes: &[u8], context: &BfvContext) -> Result<Arc<PublicKeys>> {
    let envelope: PublicKeyEnvelope = bincode::deserialize(bytes)?;
    let par = context.bfv();
    Ok(Arc::new(PublicKeys {
        public_key: PublicKey::from_bytes(&envelope.public_key, par)
            .map_err(|e| LookupError::Serialization(format!("public key: {}", e)))?,
        relin_key: RelinearizationKey::from_bytes(&envelope.relin_key, par)
            .map_err(|e| LookupError::Serialization(format!("relinearization key: {}", e)))?,
        eval_key: EvaluationKey::from_bytes(&envelope.eval_key, par)
            .map_err(|e| LookupError::Serialization(format!("evaluation key: {}", e)))?,
    }))
}

/// Serialize one ciphertext
pub fn ciphertext_to_bytes(ct: &Ciphertext) -> Vec<u8> {
    ct.to_bytes()
}

/// Deserialize one ciphertext against `context`
pub fn ciphertext_from_bytes(bytes: &[u8], context: &BfvContext) -> Result<Ciphertext> {
    Ciphertext::from_bytes(bytes, context.bfv())
        .map_err(|e| LookupError::Serialization(format!("ciphertext: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{SlotAlgebra, SlotDecryptor};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_context_and_keys_survive_transport() {
        let params = LookupParams::test_small();
        let context = BfvContext::new(&params).unwrap();
        let keys = context
            .generate_keys(&mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();

        let context_bytes = context_to_bytes(&params).unwrap();
        let key_bytes = public_keys_to_bytes(keys.public()).unwrap();

        // Holder side: everything rebuilt from bytes
        let remote_context = context_from_bytes(&context_bytes).unwrap();
        assert_eq!(remote_context.params(), &params);
        let remote_keys = public_keys_from_bytes(&key_bytes, &remote_context).unwrap();
        let remote = remote_context.evaluator(remote_keys);

        let ct = remote.encrypt(&[9, 8, 7]).unwrap();
        let doubled = remote.add(&ct, &ct).unwrap();
        let shipped = ciphertext_to_bytes(&doubled);

        let back = ciphertext_from_bytes(&shipped, &context).unwrap();
        let slots = keys.decrypt(&back).unwrap();
        assert_eq!(&slots[..3], &[18, 16, 14]);
    }

    #[test]
    fn test_rejects_garbage() {
        let context = BfvContext::new(&LookupParams::test_small()).unwrap();
        assert!(ciphertext_from_bytes(b"not a ciphertext", &context).is_err());
        assert!(context_from_bytes(b"\x01").is_err());
    }
}
