//! FFX mode of operation for format-preserving encryption, in its A2
//! parameterization: radix 2, alternating Feistel, characterwise XOR.
//!
//! The cipher permutes `[0, order)` for message spaces of up to 128 bits.
//! The input is split into two bit halves that are alternately XORed with
//! an AES-CBC-MAC-based round function; fewer message bits buy more
//! Feistel rounds. Outputs that overshoot the message space are walked
//! back in by re-encryption (cycle walking), which keeps the mapping a
//! bijection of the space.
//!
//! Security properties:
//! - Standard FFX security bounds for spaces of 8 bits and more
//! - No security argument below 8 bits; the rank-then-encipher chooser
//!   uses the Knuth shuffle tier in that regime
//! - Deterministic: identical (plaintext, key, tweak) gives identical
//!   ciphertext; vary the tweak to break determinism across contexts
//!
//! The bit-level conventions (little-endian half encoding, the 16/32-byte
//! round-input asymmetry at tweak length 8) follow the reference
//! implementation exactly and are required for interoperability.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Signed};
use zeroize::Zeroize;

use crate::cipher::{IntegerCipher, CYCLE_WALK_LIMIT};
use crate::common::{Direction, Error, BLOCK_LENGTH};
use crate::key::Key;
use crate::message_space::{IntegerMessageSpace, MessageSpace};

const MAX_BIT_LENGTH: u64 = 128;
const VERS: u8 = 1;
const METHOD: u8 = 2; // alternating Feistel
const ADDITION: u8 = 0; // characterwise addition (XOR)
const RADIX: u8 = 2;

/// FFX-A2 integer cipher for message spaces of at most 128 bits.
pub struct FfxIntegerCipher {
    message_space: IntegerMessageSpace,
}

impl FfxIntegerCipher {
    /// Construct over `[0, order)` of the given message space.
    ///
    /// Fails when the order needs more than 128 bits.
    pub fn new(message_space: IntegerMessageSpace) -> Result<Self, Error> {
        if message_space.bit_length() > MAX_BIT_LENGTH {
            return Err(Error::InvalidArgument(
                "message space must not be bigger than 128 bits",
            ));
        }
        Ok(FfxIntegerCipher { message_space })
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
        if *input > self.message_space.max_value() {
            return Err(Error::OutsideMessageSpace(format!("value {input}")));
        }
        if tweak.len() > 8 {
            return Err(Error::InvalidArgument(
                "tweak must not be longer than 64 bits",
            ));
        }
        let mut aes_key = key.derive(16);
        let aes =
            Aes128::new_from_slice(&aes_key).map_err(|e| Error::SecurityProvider(e.to_string()))?;
        aes_key.zeroize();

        let max_value = self.message_space.max_value().magnitude().clone();
        let mut value = input.magnitude().clone();
        let mut walked = 0u32;
        loop {
            value = self.feistel(value, &aes, tweak, direction);
            // Cycle walking: re-encipher until the value falls back into
            // the message space.
            if value <= max_value {
                return Ok(BigInt::from(value));
            }
            walked += 1;
            if walked > CYCLE_WALK_LIMIT {
                return Err(Error::SecurityProvider(
                    "cycle walking failed to terminate".to_string(),
                ));
            }
        }
    }

    /// One full pass of the alternating Feistel network over the bits of
    /// `input`.
    fn feistel(&self, input: BigUint, aes: &Aes128, tweak: &[u8], direction: Direction) -> BigUint {
        let bits = self.message_space.bit_length() as usize;
        let split = (bits + 1) / 2;
        let rounds = round_count(bits);

        let half_mask = (BigUint::one() << split) - 1u32;
        let mut b = &input & &half_mask;
        let mut a = input >> split;

        // Precomputable header block; constant across rounds.
        let mut header = [0u8; BLOCK_LENGTH];
        header[1] = VERS;
        header[2] = METHOD;
        header[3] = ADDITION;
        header[4] = RADIX;
        header[5] = bits as u8;
        header[6] = split as u8;
        header[7] = rounds;
        header[15] = tweak.len() as u8;
        let header = encrypt_block(aes, header);

        match direction {
            Direction::Encrypt => {
                for round in 0..rounds {
                    a ^= round_function(aes, &header, bits, split, tweak, round, &b);
                    std::mem::swap(&mut a, &mut b);
                }
            }
            Direction::Decrypt => {
                for round in (0..rounds).rev() {
                    std::mem::swap(&mut a, &mut b);
                    a ^= round_function(aes, &header, bits, split, tweak, round, &b);
                }
            }
        }

        let upper_mask = (BigUint::one() << (bits - split + 1)) - 1u32;
        (b & half_mask) | ((a & upper_mask) << split)
    }
}

/// Feistel round count by message space bit length; smaller spaces get
/// more rounds.
fn round_count(bits: usize) -> u8 {
    if bits >= 32 {
        12
    } else if bits >= 20 {
        18
    } else if bits >= 14 {
        24
    } else if bits >= 10 {
        30
    } else {
        36
    }
}

/// AES-CBC-MAC-based round function.
///
/// The round input is `B` as 8 little-endian bytes followed by the tweak,
/// zero padding and the round number: 16 bytes in total for tweaks up to
/// 7 bytes, 32 bytes for the full 8-byte tweak. The MAC chains the
/// pre-encrypted header through the input blocks; the result contributes
/// its top bit positions, one fewer on even rounds of odd-width spaces
/// where the larger half sits in the XOR.
fn round_function(
    aes: &Aes128,
    header: &[u8; BLOCK_LENGTH],
    bits: usize,
    split: usize,
    tweak: &[u8],
    round: u8,
    b: &BigUint,
) -> BigUint {
    let tweak_area = if tweak.len() == 8 { 24 } else { 8 };
    let mut q = [0u8; 32];
    let b_bytes = b.to_bytes_le();
    q[..b_bytes.len()].copy_from_slice(&b_bytes);
    q[8..8 + tweak.len()].copy_from_slice(tweak);
    q[8 + tweak_area - 1] = round;
    let q_len = 8 + tweak_area;

    let mut mac = encrypt_block(aes, xor_into_block(header, &q[..16]));
    if q_len == 32 {
        mac = encrypt_block(aes, xor_into_block(&mac, &q[16..32]));
    }

    let keep = if bits % 2 == 0 || round % 2 == 1 {
        split
    } else {
        split - 1
    };
    BigUint::from_bytes_le(&mac) >> (128 - keep)
}

fn xor_into_block(block: &[u8; BLOCK_LENGTH], other: &[u8]) -> [u8; BLOCK_LENGTH] {
    let mut output = *block;
    for (byte, &mask) in output.iter_mut().zip(other) {
        *byte ^= mask;
    }
    output
}

fn encrypt_block(aes: &Aes128, block: [u8; BLOCK_LENGTH]) -> [u8; BLOCK_LENGTH] {
    let mut block = aes::Block::from(block);
    aes.encrypt_block(&mut block);
    block.into()
}

impl IntegerCipher for FfxIntegerCipher {
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
