//! Key holder with PBKDF2-based sub-key derivation.
//!
//! The integer ciphers consume keys of different lengths (16 bytes for
//! FFX and the Knuth shuffle, 48 or 64 bytes for EME2). A [`Key`] wraps a
//! base key of arbitrary length and derives keys of the required length
//! with PBKDF2-HMAC-SHA1 under a fixed salt, so that one user-provided
//! secret drives every cipher deterministically.
//!
//! The raw base-key bytes are fed to PBKDF2 as the password unchanged
//! (no charset decoding round-trip); derivation is therefore
//! byte-transparent and reproducible across processes.

use std::collections::HashMap;
use std::sync::Mutex;

use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use zeroize::Zeroize;

/// PBKDF2 iteration count for sub-key derivation.
const PBKDF_ITERATION_COUNT: u32 = 10_000;

/// Fixed PBKDF2 salt for sub-key derivation.
const PBKDF_SALT: [u8; 16] = [
    0x27, 0x03, 0xA2, 0x80, 0x00, 0x7F, 0x0D, 0x2B, 0xED, 0x78, 0x14, 0x5E, 0xC2, 0x65, 0x0E, 0x5B,
];

/// Encryption key of arbitrary length with memoized sub-key derivation.
///
/// A `Key` is immutable after construction. Derivations are cached per
/// requested length behind a mutex, so a `Key` may be shared across
/// threads. All key material, original and derived, is wiped on drop.
pub struct Key {
    original: Vec<u8>,
    derived: Mutex<HashMap<usize, Vec<u8>>>,
}

impl Key {
    /// Wrap a base key. The empty key is permitted.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Key {
            original: key.into(),
            derived: Mutex::new(HashMap::new()),
        }
    }

    /// Return key material of exactly `length` bytes.
    ///
    /// If `length` equals the base key's length the base key is returned
    /// unchanged; otherwise a key is derived with PBKDF2-HMAC-SHA1
    /// (10 000 iterations, fixed salt) and memoized. For a given base key
    /// the result is deterministic across calls and processes.
    pub fn derive(&self, length: usize) -> Vec<u8> {
        if length == self.original.len() {
            return self.original.clone();
        }
        let mut cache = self
            .derived
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache
            .entry(length)
            .or_insert_with(|| {
                let mut output = vec![0u8; length];
                pbkdf2_hmac::<Sha1>(
                    &self.original,
                    &PBKDF_SALT,
                    PBKDF_ITERATION_COUNT,
                    &mut output,
                );
                output
            })
            .clone()
    }

    /// Whether an AES key of `key_length_bits` is usable.
    ///
    /// The AES implementation supports keys up to 256 bits and imposes no
    /// runtime policy restriction.
    pub fn is_key_length_allowed(key_length_bits: usize) -> bool {
        key_length_bits <= 256
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.original.zeroize();
        if let Ok(cache) = self.derived.get_mut() {
            for key in cache.values_mut() {
                key.zeroize();
            }
        }
    }
}
