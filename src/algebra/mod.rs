//! Slot algebra: the homomorphic capability surface consumed by the circuits
//!
//! Plaintexts are vectors of `slot_count` integers modulo a prime `p`, laid
//! out as a 2 × `row_size` hypercube:
//!
//! - `rotate_columns(ct, k)` rotates each row left by `k` (slot `i` receives
//!   slot `i + k` of the same row)
//! - `rotate_rows(ct)` swaps the two rows
//! - `sum_all_slots(ct)` replicates the total of every slot into every slot
//!
//! Backends:
//! - [`bfv`]: real encryption via the `fhe` crate (SIMD BFV)
//! - [`clear`]: unencrypted slot vectors with multiplicative-depth tracking

pub mod bfv;
pub mod clear;

pub use bfv::{BfvContext, BfvEvaluator, KeyPair, PublicKeys};
pub use clear::{ClearAlgebra, ClearCiphertext};

use crate::error::Result;

/// Homomorphic operations over packed plaintext slots
///
/// Every method is public-key only: implementations never need the secret key.
pub trait SlotAlgebra: Sync {
    type Ciphertext: Clone + Send + Sync;

    /// Number of slots per plaintext
    fn slot_count(&self) -> usize;

    /// Plaintext prime p
    fn plaintext_modulus(&self) -> u64;

    /// Encrypt a slot vector (shorter inputs are zero-padded)
    fn encrypt(&self, slots: &[u64]) -> Result<Self::Ciphertext>;

    fn add(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    fn sub(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Slot-wise product, relinearized
    fn mul(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    fn negate(&self, ct: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Add `constant` to every slot
    fn add_constant(&self, ct: &Self::Ciphertext, constant: u64) -> Result<Self::Ciphertext>;

    /// Rotate each row left by `steps`
    fn rotate_columns(&self, ct: &Self::Ciphertext, steps: usize) -> Result<Self::Ciphertext>;

    /// Swap the two hypercube rows
    fn rotate_rows(&self, ct: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Replace every slot with the sum of all slots
    fn sum_all_slots(&self, ct: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Slots per hypercube row
    fn row_size(&self) -> usize {
        self.slot_count() / 2
    }

    /// `ct^exponent` by square-and-multiply
    ///
    /// Depth is `ceil(log2(exponent))`: the squarings form the critical path
    /// and each set bit is folded in as soon as its square exists.
    fn power(&self, ct: &Self::Ciphertext, exponent: u64) -> Result<Self::Ciphertext> {
        if exponent == 0 {
            let zero = self.sub(ct, ct)?;
            return self.add_constant(&zero, 1);
        }

        let mut result: Option<Self::Ciphertext> = None;
        let mut square = ct.clone();
        let mut e = exponent;
        loop {
            if e & 1 == 1 {
                result = Some(match result {
                    Some(acc) => self.mul(&acc, &square)?,
                    None => square.clone(),
                });
            }
            e >>= 1;
            if e == 0 {
                break;
            }
            square = self.mul(&square, &square)?;
        }

        // exponent > 0 guarantees at least one set bit
        Ok(result.unwrap_or(square))
    }

    /// Product of all slots, replicated into every slot
    ///
    /// Equivalent to multiplying together all `slot_count` rotated copies of
    /// `ct`. Rotate-and-multiply by 1, 2, 4, ... within each row gives the
    /// row product in `log2(row_size)` levels; one more product with the
    /// row-swapped copy folds in the other row.
    fn product_all_slots(&self, ct: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        let mut acc = ct.clone();
        let mut step = 1;
        while step < self.row_size() {
            let rotated = self.rotate_columns(&acc, step)?;
            acc = self.mul(&acc, &rotated)?;
            step <<= 1;
        }
        let swapped = self.rotate_rows(&acc)?;
        self.mul(&acc, &swapped)
    }
}

/// Secret-key side of a slot algebra
pub trait SlotDecryptor<C> {
    /// Decrypt a ciphertext into its `slot_count` slot values
    fn decrypt(&self, ct: &C) -> Result<Vec<u64>>;
}
