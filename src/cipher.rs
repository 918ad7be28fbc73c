//! The integer cipher interface shared by the three FPE tiers.

use num_bigint::BigInt;

use crate::common::Error;
use crate::key::Key;
use crate::message_space::IntegerMessageSpace;

/// Upper bound on cycle-walking iterations. The walked permutation acts
/// on a superset of the message space, so the walk terminates long before
/// this; hitting the cap means the cipher core is broken.
pub(crate) const CYCLE_WALK_LIMIT: u32 = 1_000_000;

/// A keyed permutation of the integers `[0, order)` of an
/// [`IntegerMessageSpace`].
///
/// `encrypt` and `decrypt` are inverse bijections of the message space
/// for every `(key, tweak)` pair. Implementations are stateless between
/// calls apart from caches and may be invoked concurrently.
pub trait IntegerCipher: Send + Sync {
    /// The message space this cipher permutes.
    fn message_space(&self) -> &IntegerMessageSpace;

    /// Encrypt `plaintext` from `[0, order)` into the same range.
    fn encrypt(&self, plaintext: &BigInt, key: &Key, tweak: &[u8]) -> Result<BigInt, Error>;

    /// Invert [`encrypt`](IntegerCipher::encrypt) for the same key and
    /// tweak.
    fn decrypt(&self, ciphertext: &BigInt, key: &Key, tweak: &[u8]) -> Result<BigInt, Error>;
}
