//! Parameter sets for encrypted lookup
//!
//! The parameters mirror the classic BGV/BFV demonstration knobs: plaintext
//! prime `p`, cyclotomic index `m`, Hensel lifting `r`, modulus chain bits and
//! key-switching columns. They are deliberately NOT chosen for real-world
//! security; they keep the circuits fast enough for interactive demos.

use serde::{Deserialize, Serialize};

use crate::error::{LookupError, Result};

/// Width of the integers handled by the bit-serial comparator.
pub const COMPARATOR_BITS: usize = 16;

/// Smallest and largest RNS modulus size accepted by the BFV backend.
pub const MIN_MODULUS_BITS: usize = 20;
pub const MAX_MODULUS_BITS: usize = 62;

/// Rough upper bound, in bits, of the noise of a fresh ciphertext plus one
/// key switch with per-modulus decomposition.
const BASE_NOISE_BITS: usize = 72;

/// Extra bits consumed per multiplicative level on top of `log2(p) + log2(n)`.
const LEVEL_SLACK_BITS: usize = 6;

/// Algebra parameters shared by every party of a lookup deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupParams {
    /// Plaintext prime modulus p
    /// Must satisfy p ≡ 1 (mod m) so the plaintext space splits into slots
    pub plaintext_modulus: u64,

    /// Cyclotomic index m (power of two); ring degree is m/2
    pub cyclotomic_index: usize,

    /// Hensel lifting exponent r (plaintext space is p^r)
    /// Only r = 1 is supported by the BFV slot backend
    pub hensel_lift: u32,

    /// Total number of bits in the ciphertext modulus chain
    pub modulus_bits: usize,

    /// Number of key-switching columns
    ///
    /// The chain is split into this many RNS moduli; the backend decomposes
    /// key-switching per modulus, so this is also the number of digits.
    pub ks_columns: usize,
}

impl LookupParams {
    /// Demonstration parameters: 128 slots, 720-bit chain in 12 moduli
    pub fn demo() -> Self {
        Self {
            plaintext_modulus: 257,
            cyclotomic_index: 256,
            hensel_lift: 1,
            modulus_bits: 720,
            ks_columns: 12,
        }
    }

    /// Smaller ring (64 slots) for tests and benchmarks
    pub fn test_small() -> Self {
        Self {
            plaintext_modulus: 257,
            cyclotomic_index: 128,
            hensel_lift: 1,
            modulus_bits: 720,
            ks_columns: 12,
        }
    }

    /// Ring degree n = m/2
    pub fn degree(&self) -> usize {
        self.cyclotomic_index / 2
    }

    /// Number of plaintext slots (equal to the degree for a fully split p)
    pub fn slot_count(&self) -> usize {
        self.degree()
    }

    /// Slots per hypercube row; rotations act cyclically within a row
    pub fn row_size(&self) -> usize {
        self.slot_count() / 2
    }

    /// Sizes of the RNS moduli making up the chain
    pub fn moduli_sizes(&self) -> Vec<usize> {
        let columns = self.ks_columns.max(1);
        let base = self.modulus_bits / columns;
        let extra = self.modulus_bits % columns;
        (0..columns)
            .map(|i| if i < extra { base + 1 } else { base })
            .collect()
    }

    /// Depth of `x^(p-1)` computed by square-and-multiply
    pub fn fermat_depth(&self) -> usize {
        power_depth(self.plaintext_modulus - 1)
    }

    /// Multiplicative depth of one lookup: Fermat power, slot AND, value product
    ///
    /// Equals `ceil(log2(p-1)) + log2(slot_count) + 1`.
    pub fn lookup_depth(&self) -> usize {
        self.fermat_depth() + log2_exact(self.slot_count()) + 1
    }

    /// Multiplicative depth of the comparator: one AND per round, then the mask
    pub fn comparator_depth(&self) -> usize {
        COMPARATOR_BITS + 1
    }

    /// Chain depth a deployment must support
    pub fn required_depth(&self) -> usize {
        self.lookup_depth().max(self.comparator_depth())
    }

    /// Conservative estimate of the chain size needed for `required_depth`
    pub fn required_modulus_bits(&self) -> usize {
        let log_p = bit_length(self.plaintext_modulus);
        let log_n = log2_exact(self.degree());
        log_p + BASE_NOISE_BITS + self.required_depth() * (log_p + log_n + LEVEL_SLACK_BITS)
    }

    /// Check if parameters are valid
    pub fn validate(&self) -> Result<()> {
        let m = self.cyclotomic_index;
        if !m.is_power_of_two() || m < 16 {
            return Err(LookupError::Params(format!(
                "cyclotomic index m={} must be a power of two >= 16",
                m
            )));
        }

        let p = self.plaintext_modulus;
        if !is_prime(p) {
            return Err(LookupError::Params(format!("plaintext modulus p={} is not prime", p)));
        }
        if p % m as u64 != 1 {
            return Err(LookupError::Params(format!(
                "p={} must be ≡ 1 (mod m={}) for full slot packing",
                p, m
            )));
        }

        if self.hensel_lift != 1 {
            return Err(LookupError::Params(format!(
                "Hensel lifting r={} is not supported (only r=1)",
                self.hensel_lift
            )));
        }

        if self.ks_columns == 0 {
            return Err(LookupError::Params("ks_columns must be at least 1".to_string()));
        }
        for size in self.moduli_sizes() {
            if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&size) {
                return Err(LookupError::Params(format!(
                    "{} bits split into {} columns gives {}-bit moduli (allowed {}..={})",
                    self.modulus_bits, self.ks_columns, size, MIN_MODULUS_BITS, MAX_MODULUS_BITS
                )));
            }
        }

        let needed = self.required_modulus_bits();
        if self.modulus_bits < needed {
            return Err(LookupError::Params(format!(
                "modulus chain of {} bits is too small for depth {} (needs about {} bits)",
                self.modulus_bits,
                self.required_depth(),
                needed
            )));
        }

        Ok(())
    }
}

impl Default for LookupParams {
    fn default() -> Self {
        Self::demo()
    }
}

/// Depth of `x^e` with square-and-multiply
pub fn power_depth(e: u64) -> usize {
    if e <= 1 {
        return 0;
    }
    let floor_log = (63 - e.leading_zeros()) as usize;
    if e.is_power_of_two() {
        floor_log
    } else {
        floor_log + 1
    }
}

fn log2_exact(n: usize) -> usize {
    debug_assert!(n.is_power_of_two());
    n.trailing_zeros() as usize
}

fn bit_length(x: u64) -> usize {
    (64 - x.leading_zeros()) as usize
}

/// Deterministic Miller-Rabin; these bases cover every `u64`
fn is_prime(n: u64) -> bool {
    const BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    if n < 2 {
        return false;
    }
    for &b in &BASES {
        if n % b == 0 {
            return n == b;
        }
    }

    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    'witness: for &a in &BASES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn mul_mod(a: u64, b: u64, n: u64) -> u64 {
    ((a as u128 * b as u128) % n as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, n: u64) -> u64 {
    let mut acc = 1u64;
    base %= n;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, n);
        }
        base = mul_mod(base, base, n);
        exp >>= 1;
    }
    acc
}

/// Command-line form of [`LookupParams`], defaults matching [`LookupParams::demo`]
///
/// Shared by every binary that generates keys, so locally and remotely
/// evaluated tables can use the same parameter set.
#[derive(Debug, Clone, clap::Args)]
pub struct ParamArgs {
    /// Plaintext prime modulus
    #[arg(long, default_value = "257")]
    pub p: u64,

    /// Cyclotomic index (power of two, ring degree is m/2)
    #[arg(long, default_value = "256")]
    pub m: usize,

    /// Hensel lifting (only 1 is supported)
    #[arg(long, default_value = "1")]
    pub r: u32,

    /// Number of bits in the modulus chain
    #[arg(long, default_value = "720")]
    pub bits: usize,

    /// Number of key-switching columns (RNS moduli in the chain)
    #[arg(long, default_value = "12")]
    pub c: usize,
}

impl ParamArgs {
    pub fn to_params(&self) -> LookupParams {
        LookupParams {
            plaintext_modulus: self.p,
            cyclotomic_index: self.m,
            hensel_lift: self.r,
            modulus_bits: self.bits,
            ks_columns: self.c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = LookupParams::default();
        assert!(params.validate().is_ok());
        assert!(LookupParams::test_small().validate().is_ok());
    }

    #[test]
    fn test_slot_layout() {
        let params = LookupParams::demo();
        assert_eq!(params.degree(), 128);
        assert_eq!(params.slot_count(), 128);
        assert_eq!(params.row_size(), 64);
    }

    #[test]
    fn test_moduli_split() {
        let mut params = LookupParams::demo();
        assert_eq!(params.moduli_sizes(), vec![60; 12]);

        params.modulus_bits = 722;
        let sizes = params.moduli_sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 722);
        assert_eq!(&sizes[..3], &[61, 61, 60]);
    }

    #[test]
    fn test_depths() {
        let params = LookupParams::demo();
        // 256 = 2^8: pure squaring
        assert_eq!(params.fermat_depth(), 8);
        assert_eq!(params.lookup_depth(), 8 + 7 + 1);
        assert_eq!(params.comparator_depth(), 17);
        assert_eq!(params.required_depth(), 17);

        assert_eq!(power_depth(130), 8);
        assert_eq!(power_depth(7), 3);
        assert_eq!(power_depth(1), 0);
    }

    #[test]
    fn test_rejects_bad_params() {
        let mut params = LookupParams::demo();
        params.plaintext_modulus = 131;
        assert!(params.validate().is_err(), "131 does not split mod 256");

        let mut params = LookupParams::demo();
        params.hensel_lift = 2;
        assert!(params.validate().is_err());

        let mut params = LookupParams::demo();
        params.cyclotomic_index = 130;
        assert!(params.validate().is_err());

        let mut params = LookupParams::demo();
        params.modulus_bits = 240;
        params.ks_columns = 4;
        assert!(params.validate().is_err(), "chain too short");

        let mut params = LookupParams::demo();
        params.ks_columns = 6;
        assert!(params.validate().is_err(), "120-bit moduli");
    }

    #[test]
    fn test_primality() {
        assert!(is_prime(257));
        assert!(is_prime(65537));
        assert!(!is_prime(256));
        assert!(!is_prime(1));
        assert!(!is_prime(561), "Carmichael number");
        assert!(is_prime(18446744073709551557), "largest 64-bit prime");
        assert!(!is_prime(u64::MAX));
    }

    #[test]
    fn test_huge_modulus_rejected_quickly() {
        let mut params = LookupParams::demo();
        params.plaintext_modulus = 18446744073709551557;
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("mod m=256"), "{}", err);
    }

    #[derive(clap::Parser)]
    struct Cli {
        #[command(flatten)]
        params: ParamArgs,
    }

    #[test]
    fn test_param_args() {
        use clap::Parser;

        let defaults = Cli::parse_from(["bin"]).params.to_params();
        assert_eq!(defaults, LookupParams::demo());

        let small = Cli::parse_from(["bin", "--m", "128", "--bits", "360", "--c", "6"]);
        let params = small.params.to_params();
        assert_eq!(params.slot_count(), 64);
        assert_eq!(params.modulus_bits, 360);
        assert_eq!(params.ks_columns, 6);
    }
}
