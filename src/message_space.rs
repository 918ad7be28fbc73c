//! Message spaces: finite, totally ordered domains with rank/unrank.
//!
//! A message space assigns every element of a domain a unique rank in
//! `[0, order)`. The integer ciphers encipher on `[0, order)` directly;
//! [`RankThenEncipher`](crate::RankThenEncipher) lifts them to arbitrary
//! domains through the rank/unrank bijection.

use std::collections::HashMap;
use std::hash::Hash;

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::common::Error;

/// A finite domain with a canonical total ordering.
///
/// Invariants: `order() >= 1`; `rank` is a bijection onto `[0, order)`;
/// `unrank(rank(x)) == x` and `rank(unrank(i)) == i`. Both operations
/// fail with [`Error::OutsideMessageSpace`] exactly when the argument is
/// not in their domain. Implementations are immutable after construction
/// and safe to share across threads.
pub trait MessageSpace {
    /// Element type of the domain.
    type Element;

    /// Number of elements in the domain.
    fn order(&self) -> BigInt;

    /// Largest rank, `order() - 1`.
    fn max_value(&self) -> BigInt {
        self.order() - BigInt::one()
    }

    /// Position of `value` inside the domain, counting from 0.
    fn rank(&self, value: &Self::Element) -> Result<BigInt, Error>;

    /// Inverse of [`rank`](MessageSpace::rank).
    fn unrank(&self, rank: &BigInt) -> Result<Self::Element, Error>;
}

/// Message space over the integer range `[min, max]`. Negative bounds are
/// allowed.
pub struct IntegerRangeMessageSpace {
    min: BigInt,
    max: BigInt,
}

impl IntegerRangeMessageSpace {
    /// Construct the range `[min, max]`. Fails if `min > max`.
    pub fn new(min: BigInt, max: BigInt) -> Result<Self, Error> {
        if min > max {
            return Err(Error::InvalidArgument("min must not be greater than max"));
        }
        Ok(IntegerRangeMessageSpace { min, max })
    }

    /// Lower bound of the range.
    pub fn min(&self) -> &BigInt {
        &self.min
    }

    /// Upper bound of the range.
    pub fn max(&self) -> &BigInt {
        &self.max
    }
}

impl MessageSpace for IntegerRangeMessageSpace {
    type Element = BigInt;

    fn order(&self) -> BigInt {
        &self.max - &self.min + BigInt::one()
    }

    fn rank(&self, value: &BigInt) -> Result<BigInt, Error> {
        if value < &self.min || value > &self.max {
            return Err(Error::OutsideMessageSpace(format!("value {value}")));
        }
        Ok(value - &self.min)
    }

    fn unrank(&self, rank: &BigInt) -> Result<BigInt, Error> {
        if rank.is_negative() || *rank >= self.order() {
            return Err(Error::OutsideMessageSpace(format!("rank {rank}")));
        }
        Ok(rank + &self.min)
    }
}

/// Message space over `[0, max]`, the domain the integer ciphers
/// encipher on directly.
pub struct IntegerMessageSpace {
    range: IntegerRangeMessageSpace,
}

impl IntegerMessageSpace {
    /// Construct the range `[0, max]`. Fails if `max` is negative.
    pub fn new(max: BigInt) -> Result<Self, Error> {
        Ok(IntegerMessageSpace {
            range: IntegerRangeMessageSpace::new(BigInt::zero(), max)?,
        })
    }

    /// Number of bits needed to represent the order.
    pub fn bit_length(&self) -> u64 {
        self.order().bits()
    }
}

impl MessageSpace for IntegerMessageSpace {
    type Element = BigInt;

    fn order(&self) -> BigInt {
        self.range.order()
    }

    fn rank(&self, value: &BigInt) -> Result<BigInt, Error> {
        self.range.rank(value)
    }

    fn unrank(&self, rank: &BigInt) -> Result<BigInt, Error> {
        self.range.unrank(rank)
    }
}

/// Message space over an explicit list of elements.
///
/// The caller controls the position of each element; ranks follow the
/// list order. Duplicates in the input are dropped, keeping the first
/// occurrence.
pub struct EnumerationMessageSpace<M> {
    elements: Vec<M>,
    index: HashMap<M, usize>,
}

impl<M: Eq + Hash + Clone> EnumerationMessageSpace<M> {
    /// Construct from a list of elements. Fails on an empty list.
    pub fn new(enumeration: impl IntoIterator<Item = M>) -> Result<Self, Error> {
        let mut elements = Vec::new();
        let mut index = HashMap::new();
        for element in enumeration {
            if !index.contains_key(&element) {
                index.insert(element.clone(), elements.len());
                elements.push(element);
            }
        }
        if elements.is_empty() {
            return Err(Error::InvalidArgument("message space must not be empty"));
        }
        Ok(EnumerationMessageSpace { elements, index })
    }
}

impl<M: Eq + Hash + Clone> MessageSpace for EnumerationMessageSpace<M> {
    type Element = M;

    fn order(&self) -> BigInt {
        BigInt::from(self.elements.len())
    }

    fn rank(&self, value: &M) -> Result<BigInt, Error> {
        match self.index.get(value) {
            Some(&position) => Ok(BigInt::from(position)),
            None => Err(Error::OutsideMessageSpace(
                "value not in enumeration".to_string(),
            )),
        }
    }

    fn unrank(&self, rank: &BigInt) -> Result<M, Error> {
        rank.to_usize()
            .and_then(|position| self.elements.get(position))
            .cloned()
            .ok_or_else(|| Error::OutsideMessageSpace(format!("rank {rank}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_order_and_bounds() {
        let ms = IntegerRangeMessageSpace::new(BigInt::from(5), BigInt::from(10)).unwrap();
        assert_eq!(ms.order(), BigInt::from(6));
        assert_eq!(ms.max_value(), BigInt::from(5));
        assert_eq!(ms.rank(&BigInt::from(5)).unwrap(), BigInt::zero());
        assert_eq!(ms.rank(&BigInt::from(10)).unwrap(), BigInt::from(5));
        assert_eq!(ms.unrank(&BigInt::zero()).unwrap(), BigInt::from(5));
    }

    #[test]
    fn test_range_negative_bounds() {
        let ms = IntegerRangeMessageSpace::new(BigInt::from(-10), BigInt::from(-5)).unwrap();
        assert_eq!(ms.order(), BigInt::from(6));
        assert_eq!(ms.rank(&BigInt::from(-10)).unwrap(), BigInt::zero());
        assert_eq!(ms.rank(&BigInt::from(-5)).unwrap(), BigInt::from(5));
        assert_eq!(ms.unrank(&BigInt::from(3)).unwrap(), BigInt::from(-7));
    }

    #[test]
    fn test_range_min_greater_than_max_rejected() {
        assert!(matches!(
            IntegerRangeMessageSpace::new(BigInt::from(11), BigInt::from(10)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_range_outside_values_rejected() {
        let ms = IntegerRangeMessageSpace::new(BigInt::from(5), BigInt::from(10)).unwrap();
        assert!(matches!(
            ms.rank(&BigInt::from(4)),
            Err(Error::OutsideMessageSpace(_))
        ));
        assert!(matches!(
            ms.rank(&BigInt::from(11)),
            Err(Error::OutsideMessageSpace(_))
        ));
        assert!(matches!(
            ms.unrank(&BigInt::from(-1)),
            Err(Error::OutsideMessageSpace(_))
        ));
        assert!(matches!(
            ms.unrank(&BigInt::from(6)),
            Err(Error::OutsideMessageSpace(_))
        ));
    }

    #[test]
    fn test_range_rank_unrank_roundtrip() {
        let ms = IntegerRangeMessageSpace::new(BigInt::from(-3), BigInt::from(3)).unwrap();
        for i in 0..7 {
            let rank = BigInt::from(i);
            assert_eq!(ms.rank(&ms.unrank(&rank).unwrap()).unwrap(), rank);
        }
    }

    #[test]
    fn test_integer_space_starts_at_zero() {
        let ms = IntegerMessageSpace::new(BigInt::from(10)).unwrap();
        assert_eq!(ms.order(), BigInt::from(11));
        assert_eq!(ms.rank(&BigInt::zero()).unwrap(), BigInt::zero());
        assert_eq!(ms.bit_length(), 4);
    }

    #[test]
    fn test_integer_space_negative_max_rejected() {
        assert!(IntegerMessageSpace::new(BigInt::from(-1)).is_err());
    }

    #[test]
    fn test_enumeration_rank_unrank() {
        let elements = ["Element1", "Element2", "Element3"];
        let ms = EnumerationMessageSpace::new(elements.iter().map(|s| s.to_string())).unwrap();
        assert_eq!(ms.order(), BigInt::from(3));
        for (i, element) in elements.iter().enumerate() {
            assert_eq!(ms.rank(&element.to_string()).unwrap(), BigInt::from(i));
            assert_eq!(ms.unrank(&BigInt::from(i)).unwrap(), *element);
        }
    }

    #[test]
    fn test_enumeration_duplicates_dropped() {
        let elements = ["Element1", "Element3", "Element2", "Element1", "Element3"];
        let ms = EnumerationMessageSpace::new(elements.iter().map(|s| s.to_string())).unwrap();
        assert_eq!(ms.order(), BigInt::from(3));
        assert_eq!(ms.unrank(&BigInt::from(1)).unwrap(), "Element3");
    }

    #[test]
    fn test_enumeration_integers() {
        let primes = [2u32, 3, 5, 7, 11, 13, 17, 19, 23, 29];
        let ms = EnumerationMessageSpace::new(primes).unwrap();
        for (i, prime) in primes.iter().enumerate() {
            assert_eq!(ms.rank(prime).unwrap(), BigInt::from(i));
        }
    }

    #[test]
    fn test_enumeration_empty_rejected() {
        assert!(matches!(
            EnumerationMessageSpace::<String>::new(Vec::new()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_enumeration_outside_values_rejected() {
        let ms = EnumerationMessageSpace::new(["a", "b", "c"]).unwrap();
        assert!(matches!(
            ms.rank(&"d"),
            Err(Error::OutsideMessageSpace(_))
        ));
        assert!(matches!(
            ms.unrank(&BigInt::from(3)),
            Err(Error::OutsideMessageSpace(_))
        ));
        assert!(matches!(
            ms.unrank(&BigInt::from(-1)),
            Err(Error::OutsideMessageSpace(_))
        ));
    }
}
