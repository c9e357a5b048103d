//! Plaintext slot codec
//!
//! Text is packed one UTF-8 byte per slot starting at slot 0; the remaining
//! slots stay zero. Zero acts as the terminator on decode, and a zero in
//! slot 0 means "no match".

use serde::{Deserialize, Serialize};

use crate::error::{LookupError, Result};
use crate::params::LookupParams;

/// Maps text to slot vectors and back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCodec {
    slot_count: usize,
    plaintext_modulus: u64,
}

impl SlotCodec {
    pub fn new(slot_count: usize, plaintext_modulus: u64) -> Self {
        Self {
            slot_count,
            plaintext_modulus,
        }
    }

    pub fn for_params(params: &LookupParams) -> Self {
        Self::new(params.slot_count(), params.plaintext_modulus)
    }

    /// Longest text, in bytes, that fits without truncation
    pub fn capacity(&self) -> usize {
        self.slot_count
    }

    /// Encode `text`, rejecting anything that would not decode back to it
    pub fn encode(&self, text: &str) -> Result<Vec<u64>> {
        let bytes = text.as_bytes();
        if bytes.is_empty() {
            return Err(LookupError::Codec("empty text cannot be matched".to_string()));
        }
        if bytes.len() > self.slot_count {
            return Err(LookupError::Codec(format!(
                "{:?} is {} bytes, slot capacity is {}",
                text,
                bytes.len(),
                self.slot_count
            )));
        }
        if let Some(pos) = bytes.iter().position(|&b| b == 0) {
            return Err(LookupError::Codec(format!(
                "NUL byte at offset {} would terminate the text",
                pos
            )));
        }
        if let Some(&b) = bytes.iter().find(|&&b| b as u64 >= self.plaintext_modulus) {
            return Err(LookupError::Codec(format!(
                "byte {:#04x} does not fit modulo p={}",
                b, self.plaintext_modulus
            )));
        }
        Ok(self.pack(bytes))
    }

    /// Encode `text`, silently keeping only the first `slot_count` bytes
    pub fn encode_truncating(&self, text: &str) -> Vec<u64> {
        let bytes = text.as_bytes();
        let kept = &bytes[..bytes.len().min(self.slot_count)];
        self.pack(kept)
    }

    /// Decode slots up to the first zero; `None` when slot 0 is zero
    pub fn decode(&self, slots: &[u64]) -> Option<String> {
        match slots.first() {
            None | Some(0) => return None,
            Some(_) => {}
        }
        let bytes: Vec<u8> = slots
            .iter()
            .take_while(|&&v| v != 0)
            .map(|&v| u8::try_from(v).unwrap_or(b'?'))
            .collect();
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn pack(&self, bytes: &[u8]) -> Vec<u64> {
        let p = self.plaintext_modulus;
        let mut slots = vec![0u64; self.slot_count];
        for (slot, &b) in slots.iter_mut().zip(bytes) {
            *slot = b as u64 % p;
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SlotCodec {
        SlotCodec::new(8, 257)
    }

    #[test]
    fn test_roundtrip() {
        let c = codec();
        for text in ["Spain", "Paris", "Zürich", "abcdefgh"] {
            let slots = c.encode(text).unwrap();
            assert_eq!(slots.len(), 8);
            assert_eq!(c.decode(&slots).as_deref(), Some(text));
        }
    }

    #[test]
    fn test_zero_fill() {
        let slots = codec().encode("ab").unwrap();
        assert_eq!(slots, vec![97, 98, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_truncation_is_deterministic() {
        let c = codec();
        assert!(c.encode("Liechtenstein").is_err());
        let slots = c.encode_truncating("Liechtenstein");
        assert_eq!(c.decode(&slots).as_deref(), Some("Liechten"));
        assert_eq!(slots, c.encode_truncating("Liechtenstein"));
    }

    #[test]
    fn test_not_found_sentinel() {
        assert_eq!(codec().decode(&[0; 8]), None);
        assert_eq!(codec().decode(&[]), None);
    }

    #[test]
    fn test_rejects_unrepresentable() {
        assert!(codec().encode("").is_err());
        assert!(codec().encode("a\0b").is_err());
        let small = SlotCodec::new(8, 97);
        assert!(small.encode("z").is_err(), "'z' = 122 >= 97");
        assert!(small.encode("AB").is_ok());
    }

    #[test]
    fn test_decode_stops_at_terminator() {
        let c = codec();
        assert_eq!(c.decode(&[72, 105, 0, 65]).as_deref(), Some("Hi"));
    }
}
