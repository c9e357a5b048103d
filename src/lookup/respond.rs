//! Lookup aggregation: server-side response computation
//!
//! Every entry's value is multiplied by its equality mask, which zeroes all
//! non-matching values, and the masked values are summed. With unique keys
//! the sum is the matching value, or all zeros when nothing matches.
//!
//! Masks are independent per entry, so they are computed in parallel; the
//! final sum always runs in entry order.

use rayon::prelude::*;
use tracing::debug;

use crate::algebra::SlotAlgebra;
use crate::error::Result;
use crate::table::EncryptedEntry;

use super::mask::equality_mask;

/// Entry value if its key equals `query`, otherwise an encryption of zeros
pub fn masked_value<A: SlotAlgebra>(
    algebra: &A,
    entry: &EncryptedEntry<A::Ciphertext>,
    query: &A::Ciphertext,
) -> Result<A::Ciphertext> {
    let mask = equality_mask(algebra, &entry.key, query)?;
    algebra.mul(&mask, &entry.value)
}

/// Compute the encrypted lookup result (parallel over entries)
///
/// # Arguments
/// * `algebra` - Public-key evaluator
/// * `entries` - Encrypted table
/// * `query` - Encrypted query key
///
/// # Returns
/// One ciphertext holding the matching value. Duplicate keys yield the
/// slot-wise sum of their values; an empty table yields a fresh encryption
/// of zeros.
pub fn respond<A: SlotAlgebra>(
    algebra: &A,
    entries: &[EncryptedEntry<A::Ciphertext>],
    query: &A::Ciphertext,
) -> Result<A::Ciphertext> {
    let masked = entries
        .par_iter()
        .enumerate()
        .map(|(i, entry)| {
            let value = masked_value(algebra, entry, query);
            debug!("Entry {} masked", i);
            value
        })
        .collect::<Result<Vec<_>>>()?;

    accumulate(algebra, &masked)
}

/// Sequential respond
///
/// Same as `respond` but processes entries one at a time.
pub fn respond_sequential<A: SlotAlgebra>(
    algebra: &A,
    entries: &[EncryptedEntry<A::Ciphertext>],
    query: &A::Ciphertext,
) -> Result<A::Ciphertext> {
    let mut masked = Vec::with_capacity(entries.len());
    for entry in entries {
        masked.push(masked_value(algebra, entry, query)?);
    }
    accumulate(algebra, &masked)
}

fn accumulate<A: SlotAlgebra>(algebra: &A, masked: &[A::Ciphertext]) -> Result<A::Ciphertext> {
    match masked.split_first() {
        None => algebra.encrypt(&[]),
        Some((first, rest)) => rest
            .iter()
            .try_fold(first.clone(), |acc, ct| algebra.add(&acc, ct)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{ClearAlgebra, ClearCiphertext};
    use crate::lookup::SlotCodec;
    use crate::params::LookupParams;

    fn encrypt_table(
        alg: &ClearAlgebra,
        codec: &SlotCodec,
        rows: &[(&str, &str)],
    ) -> Vec<EncryptedEntry<ClearCiphertext>> {
        rows.iter()
            .map(|(k, v)| EncryptedEntry {
                key: alg.encrypt(&codec.encode(k).unwrap()).unwrap(),
                value: alg.encrypt(&codec.encode(v).unwrap()).unwrap(),
            })
            .collect()
    }

    fn setup() -> (ClearAlgebra, SlotCodec) {
        let params = LookupParams::test_small();
        (ClearAlgebra::for_params(&params), SlotCodec::for_params(&params))
    }

    const COUNTRIES: &[(&str, &str)] = &[
        ("France", "Paris"),
        ("Spain", "Madrid"),
        ("Portugal", "Lisbon"),
        ("Malta", "Valletta"),
    ];

    #[test]
    fn test_respond_finds_matching_value() {
        let (alg, codec) = setup();
        let table = encrypt_table(&alg, &codec, COUNTRIES);

        for (key, value) in COUNTRIES {
            let query = alg.encrypt(&codec.encode(key).unwrap()).unwrap();
            let result = respond(&alg, &table, &query).unwrap();
            assert_eq!(codec.decode(result.slots()).as_deref(), Some(*value));
        }
    }

    #[test]
    fn test_respond_not_found_is_all_zero() {
        let (alg, codec) = setup();
        let table = encrypt_table(&alg, &codec, COUNTRIES);
        let query = alg.encrypt(&codec.encode("Italy").unwrap()).unwrap();

        let result = respond(&alg, &table, &query).unwrap();
        assert!(result.slots().iter().all(|&v| v == 0));
        assert_eq!(codec.decode(result.slots()), None);
    }

    #[test]
    fn test_order_independent() {
        let (alg, codec) = setup();
        let table = encrypt_table(&alg, &codec, COUNTRIES);
        let mut reversed = table.clone();
        reversed.reverse();

        let query = alg.encrypt(&codec.encode("Malta").unwrap()).unwrap();
        let a = respond(&alg, &table, &query).unwrap();
        let b = respond(&alg, &reversed, &query).unwrap();
        let c = respond_sequential(&alg, &table, &query).unwrap();
        assert_eq!(a.slots(), b.slots());
        assert_eq!(a.slots(), c.slots());
    }

    #[test]
    fn test_duplicate_keys_sum_values() {
        let (alg, codec) = setup();
        let table = encrypt_table(&alg, &codec, &[("K", "\u{1}"), ("K", "\u{2}")]);
        let query = alg.encrypt(&codec.encode("K").unwrap()).unwrap();

        let result = respond(&alg, &table, &query).unwrap();
        assert_eq!(result.slots()[0], 3);
    }

    #[test]
    fn test_empty_table() {
        let (alg, codec) = setup();
        let query = alg.encrypt(&codec.encode("Spain").unwrap()).unwrap();
        let result = respond(&alg, &[], &query).unwrap();
        assert_eq!(codec.decode(result.slots()), None);
    }

    #[test]
    fn test_response_depth() {
        let params = LookupParams::test_small();
        let (alg, codec) = setup();
        let table = encrypt_table(&alg, &codec, COUNTRIES);
        let query = alg.encrypt(&codec.encode("Spain").unwrap()).unwrap();
        let result = respond(&alg, &table, &query).unwrap();
        assert_eq!(result.depth(), params.lookup_depth());
    }
}
