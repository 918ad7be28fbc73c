//! Tiny-space FPE cipher based on the Knuth (Fisher-Yates) shuffle.
//!
//! FFX carries no security argument for message spaces below 8 bits, so
//! the smallest spaces are enciphered with a keyed permutation table
//! instead: a Fisher-Yates shuffle of `[0, order)` driven by a
//! deterministic AES-derived value, so the same key and tweak always
//! reproduce the same permutation.
//!
//! The shuffle value is produced by AES-CBC-encrypting one fixed block
//! under the derived key with the tweak as IV, and that single value is
//! reused at every shuffle step. This is the documented tiny-space scheme
//! of the construction and is preserved exactly for interoperability,
//! weak as it is; spaces this small cannot carry much security in any
//! case.
//!
//! Permutation tables are cached per `(derived key, derived tweak)` byte
//! contents. [`drop_permutation_tables`](KnuthShuffleCipher::drop_permutation_tables)
//! evicts them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use zeroize::Zeroize;

use crate::cipher::IntegerCipher;
use crate::common::{xor_blocks, Direction, Error, BLOCK_LENGTH};
use crate::key::Key;
use crate::message_space::{IntegerMessageSpace, MessageSpace};

/// PBKDF2 parameters used to stretch a tweak to 16 bytes.
const PBKDF_ITERATION_COUNT: u32 = 10_000;
const PBKDF_SALT: [u8; 16] = [
    0x15, 0x03, 0xA2, 0x80, 0x00, 0x7F, 0x0D, 0x2B, 0xED, 0x78, 0x14, 0x5E, 0xC2, 0x65, 0x0E, 0x5B,
];

/// Fixed block whose encryption seeds the shuffle.
const SHUFFLE_SEED_BLOCK: [u8; BLOCK_LENGTH] = *b"Hello World!! :D";

struct PermutationTable {
    forward: Vec<usize>,
    inverse: Vec<usize>,
}

/// Tiny-space integer cipher: keyed permutation tables from a
/// deterministic Knuth shuffle.
pub struct KnuthShuffleCipher {
    message_space: IntegerMessageSpace,
    tables: Mutex<HashMap<(Vec<u8>, Vec<u8>), Arc<PermutationTable>>>,
}

impl KnuthShuffleCipher {
    /// Construct over `[0, order)` of the given message space.
    ///
    /// Usable for any space small enough to tabulate, though the
    /// rank-then-encipher chooser only selects it below 8 bits.
    pub fn new(message_space: IntegerMessageSpace) -> Self {
        KnuthShuffleCipher {
            message_space,
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every cached permutation table. Tables are rebuilt on the
    /// next encryption or decryption with the respective key and tweak.
    pub fn drop_permutation_tables(&self) {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn permute(
        &self,
        value: &BigInt,
        key: &Key,
        tweak: &[u8],
        direction: Direction,
    ) -> Result<BigInt, Error> {
        if value.is_negative() || *value >= self.message_space.order() {
            return Err(Error::OutsideMessageSpace(format!("value {value}")));
        }
        let mut aes_key = key.derive(16);
        let tweak = if tweak.len() == 16 {
            tweak.to_vec()
        } else {
            derive_tweak(tweak)
        };

        let table = self.table_for(&aes_key, &tweak)?;
        aes_key.zeroize();

        // value < order, which fits usize whenever the table was built
        let index = value.to_usize().unwrap_or(usize::MAX);
        let permuted = match direction {
            Direction::Encrypt => table.forward[index],
            Direction::Decrypt => table.inverse[index],
        };
        Ok(BigInt::from(permuted))
    }

    fn table_for(&self, aes_key: &[u8], tweak: &[u8]) -> Result<Arc<PermutationTable>, Error> {
        let mut tables = self
            .tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(table) = tables.get(&(aes_key.to_vec(), tweak.to_vec())) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(self.knuth_shuffle(aes_key, tweak)?);
        tables.insert((aes_key.to_vec(), tweak.to_vec()), Arc::clone(&table));
        Ok(table)
    }

    /// Build both lookup directions of the permutation for a key/tweak
    /// pair.
    ///
    /// The shuffle random is AES-CBC(key, iv = tweak) over the fixed seed
    /// block, read as a signed big-endian integer and reused for every
    /// step: `a[i] <-> a[R mod (i+1)]` for `i = order-1 .. 1`.
    fn knuth_shuffle(&self, aes_key: &[u8], tweak: &[u8]) -> Result<PermutationTable, Error> {
        let aes = Aes128::new_from_slice(aes_key)
            .map_err(|e| Error::SecurityProvider(e.to_string()))?;
        let iv: [u8; BLOCK_LENGTH] = tweak
            .try_into()
            .map_err(|_| Error::SecurityProvider("derived tweak is not one block".to_string()))?;
        let mut block = aes::Block::from(xor_blocks(&SHUFFLE_SEED_BLOCK, &iv));
        aes.encrypt_block(&mut block);
        let random = BigInt::from_signed_bytes_be(&block);

        let size = self.message_space.order().to_usize().ok_or(Error::InvalidArgument(
            "message space too large for a permutation table",
        ))?;
        let mut forward: Vec<usize> = (0..size).collect();
        for i in (1..size).rev() {
            let j = random
                .mod_floor(&BigInt::from(i as u64 + 1))
                .to_usize()
                .unwrap_or(0);
            forward.swap(i, j);
        }
        let mut inverse = vec![0usize; size];
        for (plain, &cipher) in forward.iter().enumerate() {
            inverse[cipher] = plain;
        }
        Ok(PermutationTable { forward, inverse })
    }
}

/// Stretch an off-size tweak to 16 bytes with PBKDF2-HMAC-SHA1 under the
/// shuffle-specific salt. The raw tweak bytes are the password.
fn derive_tweak(tweak: &[u8]) -> Vec<u8> {
    let mut output = vec![0u8; 16];
    pbkdf2_hmac::<Sha1>(tweak, &PBKDF_SALT, PBKDF_ITERATION_COUNT, &mut output);
    output
}

impl IntegerCipher for KnuthShuffleCipher {
    fn message_space(&self) -> &IntegerMessageSpace {
        &self.message_space
    }

    fn encrypt(&self, plaintext: &BigInt, key: &Key, tweak: &[u8]) -> Result<BigInt, Error> {
        self.permute(plaintext, key, tweak, Direction::Encrypt)
    }

    fn decrypt(&self, ciphertext: &BigInt, key: &Key, tweak: &[u8]) -> Result<BigInt, Error> {
        self.permute(ciphertext, key, tweak, Direction::Decrypt)
    }
}
