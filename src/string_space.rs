//! String message space backed by a deterministic finite automaton.
//!
//! Words accepted by the automaton are ordered first by length and then
//! lexicographically by the automaton's alphabet, and ranked through a
//! precomputed counting table: `table[len][state]` holds the number of
//! words of exactly `len` characters accepted when starting from `state`.
//! Ranking sums the preceding length slices and, per position, the sizes
//! of the branches under every smaller symbol; unranking runs the same
//! walk greedily in reverse.
//!
//! The table is cut off at a maximum word length (128 by default), which
//! also makes infinite languages usable: words longer than the cutoff are
//! simply outside the message space. The empty word is never part of the
//! space, even when the automaton accepts it.

use std::collections::BTreeSet;

use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, Zero};

use crate::common::Error;
use crate::dfa::Dfa;
use crate::message_space::MessageSpace;

/// Message space over the words of a regular language.
pub struct StringMessageSpace {
    dfa: Dfa,
    /// Every character appearing on a transition, sorted; ranking is
    /// lexicographic with respect to this order.
    alphabet: Vec<char>,
    /// `table[len][state]`: accepted words of exactly `len` characters
    /// starting from `state`. Row 0 marks the accepting states.
    table: Vec<Vec<BigUint>>,
    order: BigInt,
}

impl StringMessageSpace {
    /// Maximum word length used by [`new`](StringMessageSpace::new).
    pub const DEFAULT_MAX_WORD_LENGTH: usize = 128;

    /// Construct with the default maximum word length of 128.
    pub fn new(dfa: Dfa) -> Result<Self, Error> {
        Self::with_max_word_length(dfa, Self::DEFAULT_MAX_WORD_LENGTH)
    }

    /// Construct with an explicit maximum word length.
    ///
    /// Fails with [`Error::InvalidArgument`] when no word of length 1 to
    /// `max_word_length` is accepted; that covers the empty language and
    /// the language containing only the empty word.
    pub fn with_max_word_length(dfa: Dfa, max_word_length: usize) -> Result<Self, Error> {
        let alphabet = collect_alphabet(&dfa);
        let table = build_table(&dfa, &alphabet, max_word_length);
        let initial = dfa.initial();
        let mut order = BigUint::zero();
        for row in table.iter().skip(1) {
            order += &row[initial];
        }
        if order.is_zero() {
            return Err(Error::InvalidArgument("message space must not be empty"));
        }
        Ok(StringMessageSpace {
            dfa,
            alphabet,
            table,
            order: BigInt::from(order),
        })
    }

    /// Whether the automaton's language is finite. When it is not, the
    /// message space still is: it holds the accepted words up to the
    /// maximum word length.
    pub fn is_finite(&self) -> bool {
        self.dfa.is_finite()
    }

    /// The automaton defining this space.
    pub fn dfa(&self) -> &Dfa {
        &self.dfa
    }
}

fn collect_alphabet(dfa: &Dfa) -> Vec<char> {
    let mut alphabet = BTreeSet::new();
    for state in 0..dfa.state_count() {
        for t in dfa.transitions(state) {
            for symbol in t.min..=t.max {
                alphabet.insert(symbol);
            }
        }
    }
    alphabet.into_iter().collect()
}

fn build_table(dfa: &Dfa, alphabet: &[char], max_word_length: usize) -> Vec<Vec<BigUint>> {
    let n = dfa.state_count();
    let mut table = Vec::with_capacity(max_word_length + 1);
    table.push(
        (0..n)
            .map(|s| BigUint::from(u8::from(dfa.is_accepting(s))))
            .collect::<Vec<_>>(),
    );

    for len in 1..=max_word_length {
        let mut row = vec![BigUint::zero(); n];
        let mut all_zero = true;
        for state in 0..n {
            for &symbol in alphabet {
                if let Some(target) = dfa.step(state, symbol) {
                    row[state] += &table[len - 1][target];
                }
            }
            if !row[state].is_zero() {
                all_zero = false;
            }
        }
        // No accepted word of this length from anywhere; longer rows
        // would stay zero as well.
        if all_zero {
            break;
        }
        table.push(row);
    }
    table
}

impl MessageSpace for StringMessageSpace {
    type Element = String;

    fn order(&self) -> BigInt {
        self.order.clone()
    }

    fn rank(&self, value: &String) -> Result<BigInt, Error> {
        let symbols: Vec<char> = value.chars().collect();
        let n = symbols.len();
        if n == 0 || n >= self.table.len() || !self.dfa.accepts(value) {
            return Err(Error::OutsideMessageSpace(format!("value {value:?}")));
        }

        let initial = self.dfa.initial();
        let mut rank = BigUint::zero();
        for len in 1..n {
            rank += &self.table[len][initial];
        }

        let mut state = initial;
        for (i, &symbol) in symbols.iter().enumerate() {
            for &smaller in self.alphabet.iter().take_while(|&&a| a < symbol) {
                if let Some(target) = self.dfa.step(state, smaller) {
                    rank += &self.table[n - (i + 1)][target];
                }
            }
            state = self
                .dfa
                .step(state, symbol)
                .ok_or_else(|| Error::OutsideMessageSpace(format!("value {value:?}")))?;
        }
        Ok(BigInt::from(rank))
    }

    fn unrank(&self, rank: &BigInt) -> Result<String, Error> {
        if rank.is_negative() || *rank >= self.order {
            return Err(Error::OutsideMessageSpace(format!("rank {rank}")));
        }
        let mut remaining = rank.magnitude().clone();
        let initial = self.dfa.initial();

        // Peel preceding length slices; rank < order keeps n in range.
        let mut n = 1;
        while remaining >= self.table[n][initial] {
            remaining -= &self.table[n][initial];
            n += 1;
        }

        let mut word = String::with_capacity(n);
        let mut state = initial;
        for i in 1..=n {
            let mut chosen = None;
            for &symbol in &self.alphabet {
                if let Some(target) = self.dfa.step(state, symbol) {
                    let branch = &self.table[n - i][target];
                    if remaining >= *branch {
                        remaining -= branch;
                    } else {
                        chosen = Some((symbol, target));
                        break;
                    }
                }
            }
            // The slice walk above guarantees some branch holds the rank.
            let Some((symbol, target)) = chosen else {
                unreachable!("rank table inconsistent with automaton")
            };
            word.push(symbol);
            state = target;
        }
        Ok(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    /// Automaton for the language a*[b-d]?e.
    fn letters_dfa() -> Dfa {
        let mut builder = Dfa::builder();
        let s0 = builder.add_state(false);
        let s1 = builder.add_state(false);
        let s2 = builder.add_state(true);
        builder.add_transition(s0, 'a', s0);
        builder.add_range(s0, 'b', 'd', s1);
        builder.add_transition(s0, 'e', s2);
        builder.add_transition(s1, 'e', s2);
        builder.build(s0).unwrap()
    }

    #[test]
    fn test_order_finite_interval() {
        let ms = StringMessageSpace::new(Dfa::interval(20, 80, 2).unwrap()).unwrap();
        assert!(ms.is_finite());
        assert_eq!(ms.order(), BigInt::from(61));
    }

    #[test]
    fn test_order_infinite_language_cut_off() {
        // x* truncated at 15 characters; the empty word does not count.
        let mut builder = Dfa::builder();
        let s0 = builder.add_state(true);
        builder.add_transition(s0, 'x', s0);
        let dfa = builder.build(s0).unwrap();
        let ms = StringMessageSpace::with_max_word_length(dfa, 15).unwrap();
        assert!(!ms.is_finite());
        assert_eq!(ms.order(), BigInt::from(15));
        assert_eq!(ms.rank(&"x".to_string()).unwrap(), BigInt::zero());
        assert_eq!(ms.unrank(&BigInt::from(14)).unwrap(), "x".repeat(15));
        assert!(ms.rank(&"x".repeat(16)).is_err());
    }

    #[test]
    fn test_empty_language_rejected() {
        let mut builder = Dfa::builder();
        let s0 = builder.add_state(false);
        builder.add_transition(s0, 'a', s0);
        let dfa = builder.build(s0).unwrap();
        assert!(matches!(
            StringMessageSpace::new(dfa),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_word_only_language_rejected() {
        let mut builder = Dfa::builder();
        let s0 = builder.add_state(true);
        let dfa = builder.build(s0).unwrap();
        assert!(matches!(
            StringMessageSpace::new(dfa),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rank_interval_bounds() {
        let ms = StringMessageSpace::new(Dfa::interval(20, 80, 2).unwrap()).unwrap();
        assert_eq!(ms.rank(&"20".to_string()).unwrap(), BigInt::zero());
        assert_eq!(ms.rank(&"80".to_string()).unwrap(), BigInt::from(60));
        assert!(matches!(
            ms.rank(&"2".to_string()),
            Err(Error::OutsideMessageSpace(_))
        ));
    }

    #[test]
    fn test_rank_all_first_elements() {
        let expected = [
            "e", "ae", "be", "ce", "de", "aae", "abe", "ace", "ade", "aaae", "aabe", "aace", "aade",
        ];
        let ms = StringMessageSpace::new(letters_dfa()).unwrap();
        for (i, word) in expected.iter().enumerate() {
            assert_eq!(ms.rank(&word.to_string()).unwrap(), BigInt::from(i));
        }
    }

    #[test]
    fn test_unrank_all_first_elements() {
        let expected = [
            "e", "ae", "be", "ce", "de", "aae", "abe", "ace", "ade", "aaae", "aabe", "aace", "aade",
        ];
        let ms = StringMessageSpace::new(letters_dfa()).unwrap();
        for (i, word) in expected.iter().enumerate() {
            assert_eq!(ms.unrank(&BigInt::from(i)).unwrap(), *word);
        }
    }

    #[test]
    fn test_rank_unrank_roundtrip_whole_space() {
        let ms = StringMessageSpace::new(Dfa::interval(0, 255, 0).unwrap()).unwrap();
        assert_eq!(ms.order(), BigInt::from(256));
        let mut rank = BigInt::zero();
        while rank < ms.order() {
            let word = ms.unrank(&rank).unwrap();
            assert_eq!(ms.rank(&word).unwrap(), rank);
            rank += BigInt::one();
        }
    }

    #[test]
    fn test_unrank_outside_bounds() {
        let ms = StringMessageSpace::new(letters_dfa()).unwrap();
        assert!(matches!(
            ms.unrank(&BigInt::from(-1)),
            Err(Error::OutsideMessageSpace(_))
        ));
        assert!(matches!(
            ms.unrank(&ms.order()),
            Err(Error::OutsideMessageSpace(_))
        ));
    }

    #[test]
    fn test_rank_rejects_words_not_in_language() {
        let ms = StringMessageSpace::new(letters_dfa()).unwrap();
        for word in ["", "a", "ab", "ea", "f", "bee"] {
            assert!(
                matches!(
                    ms.rank(&word.to_string()),
                    Err(Error::OutsideMessageSpace(_))
                ),
                "{word:?} should be outside the message space"
            );
        }
    }

    #[test]
    fn test_structured_word_roundtrip() {
        // Minimal URL-shaped grammar: "http://" then 1..=20 of [a-z0-9.-]
        // then "/".
        let mut builder = Dfa::builder();
        let prefix = "http://";
        let mut states: Vec<usize> = (0..prefix.len()).map(|_| builder.add_state(false)).collect();
        let host = builder.add_state(false);
        let done = builder.add_state(true);
        states.push(host);
        for (i, symbol) in prefix.chars().enumerate() {
            builder.add_transition(states[i], symbol, states[i + 1]);
        }
        let mut previous = host;
        for _ in 0..20 {
            let next = builder.add_state(false);
            builder.add_range(previous, 'a', 'z', next);
            builder.add_range(previous, '0', '9', next);
            builder.add_transition(previous, '.', next);
            builder.add_transition(previous, '-', next);
            builder.add_transition(next, '/', done);
            previous = next;
        }
        let dfa = builder.build(states[0]).unwrap();

        let ms = StringMessageSpace::new(dfa).unwrap();
        let url = "http://ti.example.ch/".to_string();
        let rank = ms.rank(&url).unwrap();
        assert_eq!(ms.unrank(&rank).unwrap(), url);
    }
}
