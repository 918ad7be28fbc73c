//! End-to-end scenarios across the cipher tiers and structured domains.
//!
//! These tests drive the library the way an application would: fixed
//! keys, fixed tweaks, realistic message spaces, and assertions on the
//! format of what comes out.

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use num_traits::{One, Zero};

    use crate::cipher::IntegerCipher;
    use crate::dfa::Dfa;
    use crate::key::Key;
    use crate::message_space::{EnumerationMessageSpace, IntegerMessageSpace, MessageSpace};
    use crate::rank_then_encipher::RankThenEncipher;
    use crate::string_space::StringMessageSpace;

    fn hex(data: &[u8]) -> String {
        data.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn test_key() -> Key {
        Key::new([0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15])
    }

    #[test]
    fn cross_check_credit_card_numbers() {
        // 16-digit card numbers as a fixed-width decimal space.
        let space =
            StringMessageSpace::new(Dfa::interval(0, 9_999_999_999_999_999, 16).unwrap()).unwrap();
        assert_eq!(space.order(), BigInt::from(10_000_000_000_000_000u64));
        let fpe = RankThenEncipher::new(space).unwrap();
        let key = test_key();
        let tweak = b"m-4711";

        let card = "5500187004490131".to_string();
        let encrypted = fpe.encrypt(&card, &key, tweak).unwrap();
        println!("card {card} -> {encrypted} (tweak {})", hex(tweak));

        assert_eq!(encrypted.len(), 16);
        assert!(encrypted.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(encrypted, card);
        assert_eq!(fpe.decrypt(&encrypted, &key, tweak).unwrap(), card);
    }

    #[test]
    fn cross_check_swiss_zip_codes() {
        // Four-digit codes from 1000 to 9699, free width (no leading
        // zeros in this range anyway).
        let space = StringMessageSpace::new(Dfa::interval(1000, 9699, 0).unwrap()).unwrap();
        assert_eq!(space.order(), BigInt::from(8700));
        let fpe = RankThenEncipher::new(space).unwrap();
        let key = test_key();

        let zip = "3063".to_string();
        let encrypted = fpe.encrypt(&zip, &key, b"addr").unwrap();
        assert_eq!(encrypted.len(), 4);
        assert!(encrypted.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(fpe.decrypt(&encrypted, &key, b"addr").unwrap(), zip);
    }

    #[test]
    fn cross_check_tiny_space_tier() {
        // Order 9: below 8 bits, served by the Knuth shuffle tier.
        let weekdays = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
        let space = EnumerationMessageSpace::new(weekdays.map(String::from)).unwrap();
        let fpe = RankThenEncipher::new(space).unwrap();
        let key = test_key();

        let mut seen = std::collections::HashSet::new();
        for day in weekdays {
            let encrypted = fpe.encrypt(&day.to_string(), &key, b"roster").unwrap();
            assert!(weekdays.contains(&encrypted.as_str()));
            assert!(seen.insert(encrypted.clone()), "{day} collides");
            assert_eq!(fpe.decrypt(&encrypted, &key, b"roster").unwrap(), day);
        }
    }

    #[test]
    fn cross_check_wide_space_tier() {
        // 160 decimal digits: far beyond 128 bits, served by EME2.
        let max = BigInt::from(10u32).pow(160) - BigInt::one();
        let fpe = RankThenEncipher::for_max_value(max.clone()).unwrap();
        let key = test_key();

        for plaintext in [BigInt::zero(), BigInt::from(42), max.clone()] {
            let ciphertext = fpe.encrypt(&plaintext, &key, b"ledger").unwrap();
            assert!(ciphertext >= BigInt::zero() && ciphertext <= max);
            assert_eq!(fpe.decrypt(&ciphertext, &key, b"ledger").unwrap(), plaintext);
        }
    }

    #[test]
    fn cross_check_tweak_separates_contexts() {
        let fpe = RankThenEncipher::for_max_value(BigInt::from(999_999)).unwrap();
        let key = test_key();
        let plaintext = BigInt::from(271_828);

        let in_context_a = fpe.encrypt(&plaintext, &key, b"ctx-a").unwrap();
        let in_context_b = fpe.encrypt(&plaintext, &key, b"ctx-b").unwrap();
        assert_ne!(in_context_a, in_context_b);

        // Decrypting under the wrong tweak still lands in the space.
        let crossed = fpe.decrypt(&in_context_a, &key, b"ctx-b").unwrap();
        assert!(crossed >= BigInt::zero() && crossed <= BigInt::from(999_999));
    }

    #[test]
    fn cross_check_explicit_cipher_over_string_space() {
        let space = StringMessageSpace::new(Dfa::interval(20, 80, 2).unwrap()).unwrap();
        let inner = IntegerMessageSpace::new(space.max_value()).unwrap();
        let ffx = crate::ffx::FfxIntegerCipher::new(inner).unwrap();
        let key = test_key();

        // Drive the integer cipher directly and through the generic
        // composition; both must agree.
        let rank = space.rank(&"42".to_string()).unwrap();
        let expected = space
            .unrank(&ffx.encrypt(&rank, &key, b"direct").unwrap())
            .unwrap();

        let fpe = RankThenEncipher::with_cipher(space, Box::new(ffx)).unwrap();
        let encrypted = fpe.encrypt(&"42".to_string(), &key, b"direct").unwrap();
        assert_eq!(encrypted, expected);
        assert_eq!(fpe.decrypt(&encrypted, &key, b"direct").unwrap(), "42");
    }
}
