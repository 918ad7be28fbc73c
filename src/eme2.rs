//! EME2 (formerly EME*) wide-block cipher for arbitrarily large message
//! spaces.
//!
//! EME2 is an encrypt-mix-encrypt construction: the message is encrypted
//! blockwise under an alpha-multiplied mask chain, the encrypted blocks
//! are mixed through masks derived from their XOR sum and the tweak
//! digest, and a second masked blockwise pass produces the output. The
//! tweak (associated data) may have any length, including zero.
//!
//! The integer-cipher lifting encodes the input on the byte length of the
//! message-space order (at least 17 bytes; spaces below 128 bits are
//! rejected) and cycle-walks outputs that overshoot the maximum value.
//!
//! Security properties:
//! - Wide-block: every output bit depends on every input bit
//! - Deterministic for identical (plaintext, key, tweak)
//! - No authentication; pair with a MAC when integrity is needed
//!
//! The AES strength is a type parameter; [`Eme2_128`] derives a 48-byte
//! key bundle from the user key and [`Eme2_256`] a 64-byte bundle, split
//! into the plaintext-mask seed, the tweak-mask seed and the AES key.

use std::marker::PhantomData;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes128Dec, Aes256, Aes256Dec};
use num_bigint::{BigInt, Sign};
use num_traits::Signed;
use zeroize::Zeroize;

use crate::cipher::{IntegerCipher, CYCLE_WALK_LIMIT};
use crate::common::{mult_alpha, xor_block, xor_blocks, Direction, Error, BLOCK_LENGTH};
use crate::key::Key;
use crate::message_space::{IntegerMessageSpace, MessageSpace};

const MIN_BIT_LENGTH: u64 = 128;

/// AES strength used by an [`Eme2IntegerCipher`], binding the encrypting
/// and decrypting key schedules of one key size.
pub trait AesCipher: BlockEncrypt + KeyInit + Send + Sync {
    /// The matching decrypting key schedule.
    type Dec: BlockDecrypt + KeyInit + Send + Sync;

    /// AES key length in bytes.
    const KEY_LEN: usize;

    /// Build the decrypting schedule for `key`.
    fn new_dec(key: &[u8]) -> Result<Self::Dec, Error>;
}

impl AesCipher for Aes128 {
    type Dec = Aes128Dec;
    const KEY_LEN: usize = 16;

    fn new_dec(key: &[u8]) -> Result<Self::Dec, Error> {
        Aes128Dec::new_from_slice(key).map_err(|e| Error::SecurityProvider(e.to_string()))
    }
}

impl AesCipher for Aes256 {
    type Dec = Aes256Dec;
    const KEY_LEN: usize = 32;

    fn new_dec(key: &[u8]) -> Result<Self::Dec, Error> {
        Aes256Dec::new_from_slice(key).map_err(|e| Error::SecurityProvider(e.to_string()))
    }
}

/// EME2 integer cipher for message spaces of 128 bits and more.
pub struct Eme2IntegerCipher<Aes: AesCipher = Aes128> {
    message_space: IntegerMessageSpace,
    /// Byte length of the order's two's-complement encoding; all inputs
    /// are padded to this length so the block layout is stable across the
    /// whole space.
    buffer_len: usize,
    _aes: PhantomData<Aes>,
}

/// EME2 with AES-128 (48-byte derived key bundle).
#[allow(non_camel_case_types)]
pub type Eme2_128 = Eme2IntegerCipher<Aes128>;

/// EME2 with AES-256 (64-byte derived key bundle).
#[allow(non_camel_case_types)]
pub type Eme2_256 = Eme2IntegerCipher<Aes256>;

/// The two passes run AES forward on encryption and inverse on
/// decryption; the tweak digest always runs forward.
enum Engine<'a, Aes: AesCipher> {
    Enc(&'a Aes),
    Dec(&'a Aes::Dec),
}

impl<Aes: AesCipher> Engine<'_, Aes> {
    fn apply(&self, block: [u8; BLOCK_LENGTH]) -> [u8; BLOCK_LENGTH] {
        let mut buffer = [0u8; BLOCK_LENGTH];
        match self {
            Engine::Enc(aes) => {
                let mut block = GenericArray::clone_from_slice(&block);
                aes.encrypt_block(&mut block);
                buffer.copy_from_slice(&block);
            }
            Engine::Dec(aes) => {
                let mut block = GenericArray::clone_from_slice(&block);
                aes.decrypt_block(&mut block);
                buffer.copy_from_slice(&block);
            }
        }
        buffer
    }
}

impl<Aes: AesCipher> Eme2IntegerCipher<Aes> {
    /// Construct over `[0, order)` of the given message space.
    ///
    /// Fails when the order is smaller than 128 bits; FFX covers that
    /// range.
    pub fn new(message_space: IntegerMessageSpace) -> Result<Self, Error> {
        if message_space.bit_length() < MIN_BIT_LENGTH {
            return Err(Error::InvalidArgument(
                "message space must be bigger than 128 bits",
            ));
        }
        let buffer_len = message_space.order().to_signed_bytes_be().len();
        Ok(Eme2IntegerCipher {
            message_space,
            buffer_len,
            _aes: PhantomData,
        })
    }

    fn cipher(
        &self,
        input: &BigInt,
        key: &Key,
        tweak: &[u8],
        direction: Direction,
    ) -> Result<BigInt, Error> {
        if input.is_negative() {
            return Err(Error::InvalidArgument("input value must not be negative"));
        }
        let max_value = self.message_space.max_value();
        if *input > max_value {
            return Err(Error::OutsideMessageSpace(format!("value {input}")));
        }

        let mut material = key.derive(32 + Aes::KEY_LEN);
        let key2: [u8; BLOCK_LENGTH] = material[0..16]
            .try_into()
            .map_err(|_| Error::SecurityProvider("derived key bundle too short".to_string()))?;
        let key3: [u8; BLOCK_LENGTH] = material[16..32]
            .try_into()
            .map_err(|_| Error::SecurityProvider("derived key bundle too short".to_string()))?;
        let enc = Aes::new_from_slice(&material[32..])
            .map_err(|e| Error::SecurityProvider(e.to_string()))?;
        let dec = Aes::new_dec(&material[32..])?;
        material.zeroize();

        let engine = match direction {
            Direction::Encrypt => Engine::Enc(&enc),
            Direction::Decrypt => Engine::Dec(&dec),
        };
        let tweak_digest = tweak_digest(&enc, &key3, tweak);

        let mut value = input.clone();
        let mut walked = 0u32;
        loop {
            value = self.cipher_function(&value, &engine, &key2, &tweak_digest);
            if value <= max_value {
                return Ok(value);
            }
            walked += 1;
            if walked > CYCLE_WALK_LIMIT {
                return Err(Error::SecurityProvider(
                    "cycle walking failed to terminate".to_string(),
                ));
            }
        }
    }

    /// One encrypt-mix-encrypt pass over the padded input.
    fn cipher_function(
        &self,
        input: &BigInt,
        engine: &Engine<'_, Aes>,
        key2: &[u8; BLOCK_LENGTH],
        tweak_digest: &[u8; BLOCK_LENGTH],
    ) -> BigInt {
        // Right-align the magnitude in the fixed-size buffer.
        let mut buffer = vec![0u8; self.buffer_len];
        let magnitude = input.magnitude().to_bytes_be();
        buffer[self.buffer_len - magnitude.len()..].copy_from_slice(&magnitude);

        let last = (self.buffer_len - 1) / BLOCK_LENGTH;
        let tail = &buffer[last * BLOCK_LENGTH..];
        let tail_len = tail.len();
        let incomplete = tail_len < BLOCK_LENGTH;

        // First pass: mask, then encrypt. A short last block is only
        // padded; it is never put through AES.
        let mut mask = *key2;
        let mut encrypted: Vec<[u8; BLOCK_LENGTH]> = Vec::with_capacity(last + 1);
        for chunk in buffer.chunks_exact(BLOCK_LENGTH).take(last) {
            let block: [u8; BLOCK_LENGTH] = chunk.try_into().unwrap();
            encrypted.push(engine.apply(xor_blocks(&block, &mask)));
            mask = mult_alpha(&mask);
        }
        if incomplete {
            encrypted.push(pad_block(tail));
        } else {
            let block: [u8; BLOCK_LENGTH] = tail.try_into().unwrap();
            encrypted.push(engine.apply(xor_blocks(&block, &mask)));
        }

        // Mixing: masks derived from the XOR of all first-pass blocks and
        // the tweak digest.
        let mut mix_plain = *tweak_digest;
        for block in &encrypted {
            xor_block(&mut mix_plain, block);
        }
        let (mix_middle, mix_cipher) = if incomplete {
            let middle = engine.apply(mix_plain);
            (Some(middle), engine.apply(middle))
        } else {
            (None, engine.apply(mix_plain))
        };
        let first_mix_cipher = mix_cipher;
        let mut mask = xor_blocks(&mix_plain, &mix_cipher);
        let initial_mask = mask;

        let mut mixed: Vec<[u8; BLOCK_LENGTH]> = Vec::with_capacity(last + 1);
        mixed.push([0u8; BLOCK_LENGTH]); // placeholder, filled below
        for i in 1..last {
            if (i - 1) % 128 != 0 {
                mask = mult_alpha(&mask);
                mixed.push(xor_blocks(&encrypted[i], &mask));
            } else {
                // Refresh the mask chain after every 2048 bytes.
                let mix_plain = xor_blocks(&encrypted[i], &initial_mask);
                let mix_cipher = engine.apply(mix_plain);
                mask = xor_blocks(&mix_plain, &mix_cipher);
                mixed.push(xor_blocks(&mix_cipher, &initial_mask));
            }
        }

        let mut short_tail: Option<Vec<u8>> = None;
        match mix_middle {
            Some(middle) => {
                let mut tail_cipher = tail.to_vec();
                for (byte, mask_byte) in tail_cipher.iter_mut().zip(middle.iter()) {
                    *byte ^= mask_byte;
                }
                mixed.push(pad_block(&tail_cipher));
                short_tail = Some(tail_cipher);
            }
            None if (last - 1) % 128 != 0 => {
                mask = mult_alpha(&mask);
                mixed.push(xor_blocks(&encrypted[last], &mask));
            }
            None => {
                let refreshed = engine.apply(xor_blocks(&initial_mask, &encrypted[last]));
                mixed.push(xor_blocks(&refreshed, &initial_mask));
            }
        }

        let mut first = xor_blocks(&first_mix_cipher, tweak_digest);
        for block in &mixed {
            xor_block(&mut first, block);
        }
        mixed[0] = first;

        // Second pass: encrypt, then mask, under the original mask chain.
        let mut output = vec![0u8; self.buffer_len];
        let mut mask = *key2;
        for (i, chunk) in output.chunks_exact_mut(BLOCK_LENGTH).enumerate().take(last) {
            chunk.copy_from_slice(&xor_blocks(&engine.apply(mixed[i]), &mask));
            mask = mult_alpha(&mask);
        }
        match short_tail {
            Some(tail_cipher) => {
                output[last * BLOCK_LENGTH..].copy_from_slice(&tail_cipher);
            }
            None => {
                output[last * BLOCK_LENGTH..]
                    .copy_from_slice(&xor_blocks(&engine.apply(mixed[last]), &mask));
            }
        }

        BigInt::from_bytes_be(Sign::Plus, &output)
    }
}

/// Digest an arbitrary-length tweak into one block.
///
/// The empty tweak digests to the encryption of the tweak-mask seed;
/// otherwise the tweak is split into blocks (the final one padded), each
/// block is whitened with the alpha-multiplied seed on both sides of one
/// AES call, and the results are XORed together. Always uses the forward
/// AES direction.
fn tweak_digest<Aes: AesCipher>(
    enc: &Aes,
    key3: &[u8; BLOCK_LENGTH],
    tweak: &[u8],
) -> [u8; BLOCK_LENGTH] {
    let forward = |block: [u8; BLOCK_LENGTH]| -> [u8; BLOCK_LENGTH] {
        let mut buffer = [0u8; BLOCK_LENGTH];
        let mut block = GenericArray::clone_from_slice(&block);
        enc.encrypt_block(&mut block);
        buffer.copy_from_slice(&block);
        buffer
    };

    if tweak.is_empty() {
        return forward(*key3);
    }
    let mut seed = mult_alpha(key3);
    let mut digest = [0u8; BLOCK_LENGTH];
    for chunk in tweak.chunks(BLOCK_LENGTH) {
        let block: [u8; BLOCK_LENGTH] = if chunk.len() == BLOCK_LENGTH {
            chunk.try_into().unwrap()
        } else {
            pad_block(chunk)
        };
        let whitened = xor_blocks(&forward(xor_blocks(&block, &seed)), &seed);
        xor_block(&mut digest, &whitened);
        seed = mult_alpha(&seed);
    }
    digest
}

/// Pad a short block to 16 bytes with a single set bit after the data.
fn pad_block(input: &[u8]) -> [u8; BLOCK_LENGTH] {
    let mut output = [0u8; BLOCK_LENGTH];
    output[..input.len()].copy_from_slice(input);
    output[input.len()] = 0x80;
    output
}

impl<Aes: AesCipher> IntegerCipher for Eme2IntegerCipher<Aes> {
    fn message_space(&self) -> &IntegerMessageSpace {
        &self.message_space
    }

    fn encrypt(&self, plaintext: &BigInt, key: &Key, tweak: &[u8]) -> Result<BigInt, Error> {
        self.cipher(plaintext, key, tweak, Direction::Encrypt)
    }

    fn decrypt(&self, ciphertext: &BigInt, key: &Key, tweak: &[u8]) -> Result<BigInt, Error> {
        self.cipher(ciphertext, key, tweak, Direction::Decrypt)
    }
}
