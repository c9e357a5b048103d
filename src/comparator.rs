//! Bit-serial integer comparator
//!
//! Two 16-bit integers are encrypted one bit per slot, most significant bit
//! in slot 0. The subtrahend is supplied negated in two's complement, so a
//! ripple-carry adder over the slots computes `x - y`:
//!
//! ```text
//! repeat 16 times:
//!     carry = x * y
//!     sum   = x + y - 2 * carry      (XOR on 0/1 slots)
//!     x, y  = sum, carry rotated one slot towards the MSB
//! ```
//!
//! The result is multiplied by an encrypted selector and summed over all
//! slots. Carries leaving slot 0 wrap to the far end of the row and must not
//! reach the bit slots again, so a row needs at least `2 * 16` slots.

use tracing::debug;

use crate::algebra::SlotAlgebra;
use crate::error::{LookupError, Result};
use crate::params::COMPARATOR_BITS;

/// Two's complement bits of `x`, MSB first
pub fn to_bits(x: i16) -> [u64; COMPARATOR_BITS] {
    let raw = x as u16;
    let mut bits = [0u64; COMPARATOR_BITS];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = ((raw >> (COMPARATOR_BITS - 1 - i)) & 1) as u64;
    }
    bits
}

/// Which bits of `x - y` the comparator reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Number of set bits: zero iff `x == y`
    AllBits,
    /// Sign bit: 1 iff `x < y`, as long as `x - y` fits in 16 bits
    SignBit,
}

impl Selector {
    fn mask(self) -> Vec<u64> {
        match self {
            Selector::AllBits => vec![1; COMPARATOR_BITS],
            Selector::SignBit => vec![1],
        }
    }
}

/// Comparator circuit over any slot algebra
pub struct Comparator<'a, A: SlotAlgebra> {
    algebra: &'a A,
}

impl<'a, A: SlotAlgebra> Comparator<'a, A> {
    pub fn new(algebra: &'a A) -> Result<Self> {
        let needed = 2 * COMPARATOR_BITS;
        if algebra.row_size() < needed {
            return Err(LookupError::Params(format!(
                "comparator needs rows of at least {} slots, have {}",
                needed,
                algebra.row_size()
            )));
        }
        Ok(Self { algebra })
    }

    /// Encrypt `x` as the first operand
    pub fn encrypt_operand(&self, x: i16) -> Result<A::Ciphertext> {
        self.algebra.encrypt(&to_bits(x))
    }

    /// Encrypt `-y` (wrapping) as the second operand
    pub fn encrypt_negated_operand(&self, y: i16) -> Result<A::Ciphertext> {
        self.algebra.encrypt(&to_bits(y.wrapping_neg()))
    }

    pub fn encrypt_selector(&self, selector: Selector) -> Result<A::Ciphertext> {
        self.algebra.encrypt(&selector.mask())
    }

    /// Run the adder and reduce the selected bits
    ///
    /// # Arguments
    /// * `x` - Output of [`Comparator::encrypt_operand`]
    /// * `neg_y` - Output of [`Comparator::encrypt_negated_operand`]
    /// * `mask` - Output of [`Comparator::encrypt_selector`]
    ///
    /// # Returns
    /// Ciphertext with the selected bit count replicated in every slot.
    /// Depth is 17.
    pub fn compare(
        &self,
        x: &A::Ciphertext,
        neg_y: &A::Ciphertext,
        mask: &A::Ciphertext,
    ) -> Result<A::Ciphertext> {
        let alg = self.algebra;
        let mut x = x.clone();
        let mut y = neg_y.clone();

        for round in 0..COMPARATOR_BITS {
            let carry = alg.mul(&x, &y)?;
            let double_carry = alg.add(&carry, &carry)?;
            let sum = alg.sub(&alg.add(&x, &y)?, &double_carry)?;
            y = alg.rotate_columns(&carry, 1)?;
            x = sum;
            debug!("Comparator round {} done", round);
        }

        let selected = alg.mul(&x, mask)?;
        alg.sum_all_slots(&selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{ClearAlgebra, ClearCiphertext};
    use crate::params::LookupParams;

    fn run(x: i16, y: i16, selector: Selector) -> ClearCiphertext {
        let alg = ClearAlgebra::for_params(&LookupParams::test_small());
        let cmp = Comparator::new(&alg).unwrap();
        let a = cmp.encrypt_operand(x).unwrap();
        let b = cmp.encrypt_negated_operand(y).unwrap();
        let mask = cmp.encrypt_selector(selector).unwrap();
        cmp.compare(&a, &b, &mask).unwrap()
    }

    #[test]
    fn test_to_bits() {
        let three = to_bits(3);
        assert_eq!(&three[14..], &[1, 1]);
        assert!(three[..14].iter().all(|&b| b == 0));
        assert!(to_bits(-1).iter().all(|&b| b == 1));
        assert_eq!(to_bits(i16::MIN)[0], 1);
    }

    #[test]
    fn test_equal_is_zero() {
        for (x, y) in [(3, 3), (0, 0), (-7, -7), (i16::MAX, i16::MAX)] {
            let out = run(x, y, Selector::AllBits);
            assert!(out.slots().iter().all(|&v| v == 0), "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_different_is_nonzero() {
        // 3 - 1 = 0b10
        assert_eq!(run(3, 1, Selector::AllBits).slots()[0], 1);
        // 1 - 3 = 0xFFFE
        assert_eq!(run(1, 3, Selector::AllBits).slots()[0], 15);
        for (x, y) in [(100, -100), (-5, 4), (0, i16::MIN)] {
            assert_ne!(run(x, y, Selector::AllBits).slots()[0], 0, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_sign_bit_orders() {
        assert_eq!(run(1, 3, Selector::SignBit).slots()[0], 1);
        assert_eq!(run(3, 1, Selector::SignBit).slots()[0], 0);
        assert_eq!(run(-20, -10, Selector::SignBit).slots()[0], 1);
        assert_eq!(run(5, 5, Selector::SignBit).slots()[0], 0);
    }

    #[test]
    fn test_depth() {
        let out = run(12, 5, Selector::AllBits);
        assert_eq!(out.depth(), LookupParams::test_small().comparator_depth());
    }

    #[test]
    fn test_rejects_narrow_rows() {
        let alg = ClearAlgebra::new(32, 257);
        assert!(Comparator::new(&alg).is_err());
    }
}
