//! Clear-text slot algebra with depth tracking
//!
//! Performs exactly the slot arithmetic the encrypted backend would, without
//! encryption, and records the multiplicative depth of every value. Circuits
//! can be checked for correctness and depth in microseconds.

use crate::error::{LookupError, Result};

use super::{SlotAlgebra, SlotDecryptor};

/// Unencrypted slot vector plus its multiplicative depth
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearCiphertext {
    slots: Vec<u64>,
    depth: usize,
}

impl ClearCiphertext {
    /// Slot values modulo p
    pub fn slots(&self) -> &[u64] {
        &self.slots
    }

    /// Number of sequential multiplications behind this value
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Slot algebra over `Z_p` without encryption
#[derive(Clone, Debug)]
pub struct ClearAlgebra {
    slot_count: usize,
    p: u64,
}

impl ClearAlgebra {
    /// `slot_count` must be an even power of two layout (two rows)
    pub fn new(slot_count: usize, p: u64) -> Self {
        debug_assert!(slot_count >= 2 && slot_count % 2 == 0);
        Self { slot_count, p }
    }

    /// Same slot layout as a parameter set
    pub fn for_params(params: &crate::params::LookupParams) -> Self {
        Self::new(params.slot_count(), params.plaintext_modulus)
    }

    fn zip_with(
        &self,
        lhs: &ClearCiphertext,
        rhs: &ClearCiphertext,
        depth: usize,
        f: impl Fn(u64, u64) -> u64,
    ) -> ClearCiphertext {
        let slots = lhs
            .slots
            .iter()
            .zip(&rhs.slots)
            .map(|(&a, &b)| f(a, b))
            .collect();
        ClearCiphertext { slots, depth }
    }
}

impl SlotAlgebra for ClearAlgebra {
    type Ciphertext = ClearCiphertext;

    fn slot_count(&self) -> usize {
        self.slot_count
    }

    fn plaintext_modulus(&self) -> u64 {
        self.p
    }

    fn encrypt(&self, slots: &[u64]) -> Result<ClearCiphertext> {
        if slots.len() > self.slot_count {
            return Err(LookupError::Backend(format!(
                "{} values do not fit in {} slots",
                slots.len(),
                self.slot_count
            )));
        }
        let mut padded: Vec<u64> = slots.iter().map(|&v| v % self.p).collect();
        padded.resize(self.slot_count, 0);
        Ok(ClearCiphertext {
            slots: padded,
            depth: 0,
        })
    }

    fn add(&self, lhs: &ClearCiphertext, rhs: &ClearCiphertext) -> Result<ClearCiphertext> {
        let p = self.p;
        Ok(self.zip_with(lhs, rhs, lhs.depth.max(rhs.depth), |a, b| (a + b) % p))
    }

    fn sub(&self, lhs: &ClearCiphertext, rhs: &ClearCiphertext) -> Result<ClearCiphertext> {
        let p = self.p;
        Ok(self.zip_with(lhs, rhs, lhs.depth.max(rhs.depth), |a, b| (a + p - b) % p))
    }

    fn mul(&self, lhs: &ClearCiphertext, rhs: &ClearCiphertext) -> Result<ClearCiphertext> {
        let p = self.p as u128;
        let depth = lhs.depth.max(rhs.depth) + 1;
        Ok(self.zip_with(lhs, rhs, depth, |a, b| ((a as u128 * b as u128) % p) as u64))
    }

    fn negate(&self, ct: &ClearCiphertext) -> Result<ClearCiphertext> {
        let p = self.p;
        Ok(ClearCiphertext {
            slots: ct.slots.iter().map(|&a| (p - a) % p).collect(),
            depth: ct.depth,
        })
    }

    fn add_constant(&self, ct: &ClearCiphertext, constant: u64) -> Result<ClearCiphertext> {
        let p = self.p;
        let c = constant % p;
        Ok(ClearCiphertext {
            slots: ct.slots.iter().map(|&a| (a + c) % p).collect(),
            depth: ct.depth,
        })
    }

    fn rotate_columns(&self, ct: &ClearCiphertext, steps: usize) -> Result<ClearCiphertext> {
        let row = self.row_size();
        let k = steps % row;
        let mut slots = Vec::with_capacity(self.slot_count);
        for r in 0..2 {
            let row_slots = &ct.slots[r * row..(r + 1) * row];
            slots.extend_from_slice(&row_slots[k..]);
            slots.extend_from_slice(&row_slots[..k]);
        }
        Ok(ClearCiphertext {
            slots,
            depth: ct.depth,
        })
    }

    fn rotate_rows(&self, ct: &ClearCiphertext) -> Result<ClearCiphertext> {
        let row = self.row_size();
        let mut slots = Vec::with_capacity(self.slot_count);
        slots.extend_from_slice(&ct.slots[row..]);
        slots.extend_from_slice(&ct.slots[..row]);
        Ok(ClearCiphertext {
            slots,
            depth: ct.depth,
        })
    }

    fn sum_all_slots(&self, ct: &ClearCiphertext) -> Result<ClearCiphertext> {
        let total = ct.slots.iter().fold(0u64, |acc, &v| (acc + v) % self.p);
        Ok(ClearCiphertext {
            slots: vec![total; self.slot_count],
            depth: ct.depth,
        })
    }
}

impl SlotDecryptor<ClearCiphertext> for ClearAlgebra {
    fn decrypt(&self, ct: &ClearCiphertext) -> Result<Vec<u64>> {
        Ok(ct.slots.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotations_follow_row_layout() {
        let alg = ClearAlgebra::new(8, 17);
        let ct = alg.encrypt(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        let left = alg.rotate_columns(&ct, 1).unwrap();
        assert_eq!(left.slots(), &[2, 3, 4, 1, 6, 7, 8, 5]);

        let swapped = alg.rotate_rows(&ct).unwrap();
        assert_eq!(swapped.slots(), &[5, 6, 7, 8, 1, 2, 3, 4]);
    }

    #[test]
    fn test_arithmetic_mod_p() {
        let alg = ClearAlgebra::new(4, 17);
        let a = alg.encrypt(&[16, 3]).unwrap();
        let b = alg.encrypt(&[2, 5]).unwrap();

        assert_eq!(alg.add(&a, &b).unwrap().slots(), &[1, 8, 0, 0]);
        assert_eq!(alg.sub(&a, &b).unwrap().slots(), &[14, 15, 0, 0]);
        assert_eq!(alg.negate(&b).unwrap().slots(), &[15, 12, 0, 0]);
        assert_eq!(alg.add_constant(&a, 1).unwrap().slots(), &[0, 4, 1, 1]);

        let prod = alg.mul(&a, &b).unwrap();
        assert_eq!(prod.slots(), &[15, 15, 0, 0]);
        assert_eq!(prod.depth(), 1);
    }

    #[test]
    fn test_sum_all_slots_replicates() {
        let alg = ClearAlgebra::new(4, 17);
        let ct = alg.encrypt(&[1, 2, 3, 4]).unwrap();
        let sum = alg.sum_all_slots(&ct).unwrap();
        assert_eq!(sum.slots(), &[10, 10, 10, 10]);
    }

    #[test]
    fn test_encrypt_rejects_overflow() {
        let alg = ClearAlgebra::new(4, 17);
        assert!(alg.encrypt(&[1, 2, 3, 4, 5]).is_err());
    }
}
