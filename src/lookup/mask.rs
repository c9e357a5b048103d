//! Equality mask: encrypted "is this key equal to the query"
//!
//! For a prime p, Fermat's little theorem gives x^(p-1) = 1 for x ≠ 0 and
//! 0 for x = 0. Applied slot-wise to `key - query` and subtracted from 1,
//! this yields 1 exactly where the characters match. The product over every
//! slot then collapses the per-character indicators into a single AND,
//! replicated across all slots.

use crate::algebra::SlotAlgebra;
use crate::error::Result;

/// Per-slot equality indicator: 1 where `key` and `query` agree, 0 elsewhere
///
/// Depth: `ceil(log2(p-1))`.
pub fn slot_indicator<A: SlotAlgebra>(
    algebra: &A,
    key: &A::Ciphertext,
    query: &A::Ciphertext,
) -> Result<A::Ciphertext> {
    let diff = algebra.sub(key, query)?;
    let powered = algebra.power(&diff, algebra.plaintext_modulus() - 1)?;
    let negated = algebra.negate(&powered)?;
    algebra.add_constant(&negated, 1)
}

/// Whole-string equality mask: every slot 1 iff all slots match, else all 0
///
/// Zero padding beyond the text compares equal on both sides, so it never
/// turns a mismatch into a match. Depth: `ceil(log2(p-1)) + log2(slot_count)`.
pub fn equality_mask<A: SlotAlgebra>(
    algebra: &A,
    key: &A::Ciphertext,
    query: &A::Ciphertext,
) -> Result<A::Ciphertext> {
    let indicator = slot_indicator(algebra, key, query)?;
    algebra.product_all_slots(&indicator)
}
