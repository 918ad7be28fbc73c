//! Format-preserving encryption library built on the rank-then-encipher
//! approach.
//!
//! A format-preserving cipher guarantees that ciphertext lies in the same
//! structured domain as the plaintext: a decimal credit-card number maps
//! to another valid decimal number of the same length, an enumeration
//! element maps to another element of the enumeration. Downstream format
//! validators keep working on encrypted data.
//!
//! # Overview
//!
//! The crate combines two building blocks:
//!
//! - **Integer ciphers** permuting `[0, N)` for arbitrary `N`:
//!   [`KnuthShuffleCipher`] for tiny spaces (below 8 bits, where FFX has
//!   no security argument), [`FfxIntegerCipher`] for spaces up to
//!   128 bits, and [`Eme2IntegerCipher`] for arbitrarily large spaces.
//!   Each keeps its output in range by cycle walking.
//! - **Message spaces** bijecting structured domains onto `[0, N)`:
//!   integer ranges, enumerations, and [`StringMessageSpace`], which
//!   ranks the words of a regular language given as a deterministic
//!   finite automaton.
//!
//! [`RankThenEncipher`] composes the two: `encrypt = unrank ∘ encipher ∘
//! rank`.
//!
//! Keys of any length are accepted through [`Key`], which derives
//! fixed-length sub-keys with PBKDF2. The tweak plays the role of an IV:
//! it is public, may be any length the cipher permits, and must match
//! between encryption and decryption.
//!
//! # Quick start
//!
//! Encrypting a number within `0..=120000`:
//!
//! ```rust
//! use num_bigint::BigInt;
//! use rankfpe::{FfxIntegerCipher, IntegerCipher, IntegerMessageSpace, Key};
//!
//! let space = IntegerMessageSpace::new(BigInt::from(120000)).unwrap();
//! let ffx = FfxIntegerCipher::new(space).unwrap();
//! let key = Key::new([0x2Bu8; 16]);
//!
//! let plaintext = BigInt::from(15320);
//! let ciphertext = ffx.encrypt(&plaintext, &key, b"tweak-7").unwrap();
//! assert!(ciphertext >= BigInt::from(0) && ciphertext <= BigInt::from(120000));
//! assert_eq!(ffx.decrypt(&ciphertext, &key, b"tweak-7").unwrap(), plaintext);
//! ```
//!
//! Encrypting within an enumeration:
//!
//! ```rust
//! use rankfpe::{EnumerationMessageSpace, Key, RankThenEncipher};
//!
//! let countries = ["Austria", "France", "Mexico", "Poland", "Switzerland"];
//! let space = EnumerationMessageSpace::new(countries.map(String::from)).unwrap();
//! let fpe = RankThenEncipher::new(space).unwrap();
//! let key = Key::new(b"correct horse battery staple".as_slice());
//!
//! let ciphertext = fpe.encrypt(&"Switzerland".to_string(), &key, b"t").unwrap();
//! assert!(countries.contains(&ciphertext.as_str()));
//! let decrypted = fpe.decrypt(&ciphertext, &key, b"t").unwrap();
//! assert_eq!(decrypted, "Switzerland");
//! ```
//!
//! # Security considerations
//!
//! - Encryption is deterministic per `(key, tweak)`; vary the tweak
//!   across contexts to avoid equality leakage
//! - No authentication: format preservation rules out expansion, so pair
//!   with a MAC when integrity matters
//! - Tiny message spaces cannot carry meaningful security regardless of
//!   the cipher used on them

pub mod cipher;
pub mod common;
pub mod dfa;
pub mod eme2;
pub mod ffx;
pub mod key;
pub mod knuth;
pub mod message_space;
pub mod rank_then_encipher;
pub mod string_space;

#[cfg(test)]
mod cross_check;

pub use cipher::IntegerCipher;
pub use common::Error;
pub use dfa::{Dfa, DfaBuilder, Transition};
pub use eme2::{AesCipher, Eme2IntegerCipher, Eme2_128, Eme2_256};
pub use ffx::FfxIntegerCipher;
pub use key::Key;
pub use knuth::KnuthShuffleCipher;
pub use message_space::{
    EnumerationMessageSpace, IntegerMessageSpace, IntegerRangeMessageSpace, MessageSpace,
};
pub use rank_then_encipher::RankThenEncipher;
pub use string_space::StringMessageSpace;
