//! BFV slot algebra backed by the `fhe` crate
//!
//! The plaintext modulus p splits completely modulo the cyclotomic index, so
//! a plaintext packs `degree` slots arranged as 2 rows × `degree/2` columns.
//! Column rotations and the row swap are Galois automorphisms followed by a
//! key switch; products are relinearized immediately so every ciphertext
//! handed out has two components.

use std::fmt;
use std::sync::Arc;

use fhe::bfv::{
    BfvParameters, BfvParametersBuilder, Ciphertext, Encoding, EvaluationKey,
    EvaluationKeyBuilder, Plaintext, PublicKey, RelinearizationKey, SecretKey,
};
use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};
use rand::{thread_rng, CryptoRng, RngCore};
use tracing::debug;

use crate::error::{LookupError, Result};
use crate::params::LookupParams;

use super::{SlotAlgebra, SlotDecryptor};

/// Algebra context: lookup parameters plus the derived BFV parameters
#[derive(Clone)]
pub struct BfvContext {
    params: LookupParams,
    bfv: Arc<BfvParameters>,
}

impl BfvContext {
    /// Validate `params` and build the BFV parameter set
    pub fn new(params: &LookupParams) -> Result<Self> {
        params.validate()?;

        let bfv = BfvParametersBuilder::new()
            .set_degree(params.degree())
            .set_plaintext_modulus(params.plaintext_modulus)
            .set_moduli_sizes(&params.moduli_sizes())
            .build_arc()?;

        debug!(
            "BFV context: degree={}, p={}, moduli={:?}",
            params.degree(),
            params.plaintext_modulus,
            params.moduli_sizes()
        );

        Ok(Self {
            params: params.clone(),
            bfv,
        })
    }

    pub fn params(&self) -> &LookupParams {
        &self.params
    }

    /// Underlying `fhe` parameters
    pub fn bfv(&self) -> &Arc<BfvParameters> {
        &self.bfv
    }

    /// Generate a secret key and the public material needed by the evaluator
    ///
    /// Galois keys cover column rotations by every power of two below the
    /// row size, the row swap, and the inner sum.
    pub fn generate_keys<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<KeyPair> {
        let secret = SecretKey::random(&self.bfv, rng);
        let public_key = PublicKey::new(&secret, rng);
        let relin_key = RelinearizationKey::new(&secret, rng)?;

        let mut builder = EvaluationKeyBuilder::new(&secret)?;
        builder.enable_inner_sum()?;
        builder.enable_row_rotation()?;
        let mut step = 1;
        while step < self.params.row_size() {
            builder.enable_column_rotation(step)?;
            step <<= 1;
        }
        let eval_key = builder.build(rng)?;

        Ok(KeyPair {
            secret,
            public: Arc::new(PublicKeys {
                public_key,
                relin_key,
                eval_key,
            }),
        })
    }

    /// Evaluator bound to a set of public keys
    pub fn evaluator(&self, keys: Arc<PublicKeys>) -> BfvEvaluator {
        BfvEvaluator {
            context: self.clone(),
            keys,
        }
    }

    fn encode(&self, slots: &[u64]) -> Result<Plaintext> {
        let n = self.params.slot_count();
        if slots.len() > n {
            return Err(LookupError::Backend(format!(
                "{} values do not fit in {} slots",
                slots.len(),
                n
            )));
        }
        let p = self.params.plaintext_modulus;
        let mut padded: Vec<u64> = slots.iter().map(|&v| v % p).collect();
        padded.resize(n, 0);
        Ok(Plaintext::try_encode(padded.as_slice(), Encoding::simd(), &self.bfv)?)
    }
}

impl fmt::Debug for BfvContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BfvContext")
            .field("params", &self.params)
            .finish()
    }
}

/// Public key material shared with computing parties
pub struct PublicKeys {
    /// Encryption key
    pub public_key: PublicKey,
    /// Relinearization key for ciphertext products
    pub relin_key: RelinearizationKey,
    /// Galois keys for rotations and inner sums
    pub eval_key: EvaluationKey,
}

impl fmt::Debug for PublicKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeys").finish_non_exhaustive()
    }
}

/// Secret key plus its public bundle; owned by the querying party only
pub struct KeyPair {
    secret: SecretKey,
    public: Arc<PublicKeys>,
}

impl KeyPair {
    /// Public bundle, safe to hand to the table holder
    pub fn public(&self) -> &Arc<PublicKeys> {
        &self.public
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").finish_non_exhaustive()
    }
}

impl SlotDecryptor<Ciphertext> for KeyPair {
    fn decrypt(&self, ct: &Ciphertext) -> Result<Vec<u64>> {
        let pt = self.secret.try_decrypt(ct)?;
        Ok(Vec::<u64>::try_decode(&pt, Encoding::simd())?)
    }
}

/// Public-key evaluator implementing [`SlotAlgebra`] over BFV ciphertexts
#[derive(Clone)]
pub struct BfvEvaluator {
    context: BfvContext,
    keys: Arc<PublicKeys>,
}

impl BfvEvaluator {
    pub fn context(&self) -> &BfvContext {
        &self.context
    }

    pub fn keys(&self) -> &Arc<PublicKeys> {
        &self.keys
    }
}

impl fmt::Debug for BfvEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BfvEvaluator")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl SlotAlgebra for BfvEvaluator {
    type Ciphertext = Ciphertext;

    fn slot_count(&self) -> usize {
        self.context.params.slot_count()
    }

    fn plaintext_modulus(&self) -> u64 {
        self.context.params.plaintext_modulus
    }

    fn encrypt(&self, slots: &[u64]) -> Result<Ciphertext> {
        let pt = self.context.encode(slots)?;
        let ct: Ciphertext = self.keys.public_key.try_encrypt(&pt, &mut thread_rng())?;
        Ok(ct)
    }

    fn add(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        Ok(lhs + rhs)
    }

    fn sub(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        Ok(lhs - rhs)
    }

    fn mul(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        let mut product = lhs * rhs;
        self.keys.relin_key.relinearizes(&mut product)?;
        Ok(product)
    }

    fn negate(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        Ok(-ct)
    }

    fn add_constant(&self, ct: &Ciphertext, constant: u64) -> Result<Ciphertext> {
        let constants = vec![constant; self.slot_count()];
        let pt = self.context.encode(&constants)?;
        Ok(ct + &pt)
    }

    fn rotate_columns(&self, ct: &Ciphertext, steps: usize) -> Result<Ciphertext> {
        let steps = steps % self.row_size();
        if steps == 0 {
            return Ok(ct.clone());
        }
        if !self.keys.eval_key.supports_column_rotation_by(steps) {
            return Err(LookupError::Backend(format!(
                "no Galois key for column rotation by {}",
                steps
            )));
        }
        Ok(self.keys.eval_key.rotates_columns_by(ct, steps)?)
    }

    fn rotate_rows(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        Ok(self.keys.eval_key.rotates_rows(ct)?)
    }

    fn sum_all_slots(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        Ok(self.keys.eval_key.computes_inner_sum(ct)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (BfvEvaluator, KeyPair) {
        let context = BfvContext::new(&LookupParams::test_small()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let keys = context.generate_keys(&mut rng).unwrap();
        (context.evaluator(keys.public().clone()), keys)
    }

    #[test]
    fn test_encrypt_decrypt_slots() {
        let (eval, keys) = setup();
        let ct = eval.encrypt(&[72, 105, 0, 256]).unwrap();
        let slots = keys.decrypt(&ct).unwrap();
        assert_eq!(slots.len(), 64);
        assert_eq!(&slots[..4], &[72, 105, 0, 256]);
        assert!(slots[4..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_homomorphic_ops() {
        let (eval, keys) = setup();
        let a = eval.encrypt(&[3, 10, 256]).unwrap();
        let b = eval.encrypt(&[4, 20, 2]).unwrap();

        let sum = keys.decrypt(&eval.add(&a, &b).unwrap()).unwrap();
        assert_eq!(&sum[..3], &[7, 30, 1]);

        let diff = keys.decrypt(&eval.sub(&a, &b).unwrap()).unwrap();
        assert_eq!(&diff[..3], &[256, 247, 254]);

        let prod = keys.decrypt(&eval.mul(&a, &b).unwrap()).unwrap();
        assert_eq!(&prod[..3], &[12, 200, 255]);

        let neg = keys.decrypt(&eval.negate(&a).unwrap()).unwrap();
        assert_eq!(&neg[..3], &[254, 247, 1]);

        let plus_one = keys.decrypt(&eval.add_constant(&a, 1).unwrap()).unwrap();
        assert_eq!(&plus_one[..4], &[4, 11, 0, 1]);
    }

    #[test]
    fn test_rotations_and_inner_sum() {
        let (eval, keys) = setup();
        let row = eval.row_size();
        let values: Vec<u64> = (1..=eval.slot_count() as u64).collect();
        let ct = eval.encrypt(&values).unwrap();

        let rotated = keys.decrypt(&eval.rotate_columns(&ct, 1).unwrap()).unwrap();
        assert_eq!(rotated[0], values[1]);
        assert_eq!(rotated[row - 1], values[0]);
        assert_eq!(rotated[row], values[row + 1]);

        let swapped = keys.decrypt(&eval.rotate_rows(&ct).unwrap()).unwrap();
        assert_eq!(swapped[0], values[row]);
        assert_eq!(swapped[row], values[0]);

        let total = (1..=64u64).sum::<u64>() % 257;
        let summed = keys.decrypt(&eval.sum_all_slots(&ct).unwrap()).unwrap();
        assert!(summed.iter().all(|&v| v == total));
    }

    #[test]
    fn test_missing_rotation_key() {
        let (eval, _keys) = setup();
        let ct = eval.encrypt(&[1]).unwrap();
        assert!(eval.rotate_columns(&ct, 3).is_err());
    }
}
