//! Local rejection of candidates that do not need the oracle.
//!
//! The benchmark should only time the oracle on inputs it has to work for.
//! A candidate is skipped when any of these hold:
//! - it is a perfect square (exact integer square root, no floats)
//! - it has a factor below [`SMALL_FACTOR_BOUND`] (2, then odd divisors)
//! - it is prime according to the configured [`PrimalityTest`]
//!
//! The checks run cheapest first. Their disjunction does not depend on the
//! order, so the order only affects which [`SkipReason`] gets reported.
//!
//! # Primality
//!
//! [`Bpsw`] delegates to `num-prime`, whose default configuration is a
//! Baillie-PSW test: a base-2 strong probable-prime round plus a strong
//! Lucas round. It has no known counterexample and is exact below 2^64.
//! Any other sound test can be plugged in through the trait; closures
//! `FnMut(&BigUint) -> bool` implement it.

use num_bigint::BigUint;
use num_integer::{Integer, Roots};
use num_prime::nt_funcs;
use num_traits::Zero;

/// Exclusive upper bound for trial division.
pub const SMALL_FACTOR_BOUND: u32 = 1000;

/// Capability to decide whether an integer is (probably) prime.
pub trait PrimalityTest {
    /// True if `n` is prime, up to the test's error bound.
    fn is_probable_prime(&mut self, n: &BigUint) -> bool;
}

impl<F> PrimalityTest for F
where
    F: FnMut(&BigUint) -> bool,
{
    fn is_probable_prime(&mut self, n: &BigUint) -> bool {
        self(n)
    }
}

/// Baillie-PSW probable-prime test backed by `num-prime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bpsw;

impl PrimalityTest for Bpsw {
    fn is_probable_prime(&mut self, n: &BigUint) -> bool {
        if n < &BigUint::from(2u32) {
            return false;
        }
        nt_funcs::is_prime(n, None).probably()
    }
}

/// Why a candidate was rejected locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// `floor(sqrt(n))^2 == n`
    PerfectSquare,
    /// Divisible by 2 or by an odd integer below the bound
    SmallFactor,
    /// Prime, so the only factors are trivial
    Prime,
}

/// True if `n` is a perfect square, using an exact integer square root.
pub fn is_perfect_square(n: &BigUint) -> bool {
    let root = Roots::sqrt(n);
    &root * &root == *n
}

/// True if `n` is even or divisible by an odd integer in `3..bound`.
pub fn has_small_factor(n: &BigUint, bound: u32) -> bool {
    n.is_even() || (3..bound).step_by(2).any(|d| (n % d).is_zero())
}

/// Decides which candidates are worth sending to the oracle.
#[derive(Debug, Clone)]
pub struct CandidateFilter<P = Bpsw> {
    primality: P,
    bound: u32,
}

impl<P: PrimalityTest> CandidateFilter<P> {
    /// Create a filter with the standard trial-division bound.
    pub fn new(primality: P) -> Self {
        Self::with_bound(primality, SMALL_FACTOR_BOUND)
    }

    /// Create a filter with a custom exclusive trial-division bound.
    pub fn with_bound(primality: P, bound: u32) -> Self {
        Self { primality, bound }
    }

    /// Trial-division bound in use.
    pub fn bound(&self) -> u32 {
        self.bound
    }

    /// Return the reason `n` should be skipped, or `None` if it needs the oracle.
    pub fn classify(&mut self, n: &BigUint) -> Option<SkipReason> {
        if is_perfect_square(n) {
            Some(SkipReason::PerfectSquare)
        } else if has_small_factor(n, self.bound) {
            Some(SkipReason::SmallFactor)
        } else if self.primality.is_probable_prime(n) {
            Some(SkipReason::Prime)
        } else {
            None
        }
    }

    /// True if `n` is trivially classifiable without the oracle.
    pub fn should_skip(&mut self, n: &BigUint) -> bool {
        self.classify(n).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn is_prime_naive(n: u64) -> bool {
        n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
    }

    #[test]
    fn test_perfect_squares() {
        for k in 0u64..200 {
            assert!(is_perfect_square(&big(k * k)), "{} is a square", k * k);
        }
        assert!(!is_perfect_square(&big(2)));
        assert!(!is_perfect_square(&big(99)));

        // (2^64 + 1)^2 needs exact arithmetic
        let root = (BigUint::one() << 64u32) + 1u32;
        let square = &root * &root;
        assert!(is_perfect_square(&square));
        assert!(!is_perfect_square(&(&square - 1u32)));
        assert!(!is_perfect_square(&(&square + 1u32)));
    }

    #[test]
    fn test_small_factor() {
        assert!(has_small_factor(&big(2), SMALL_FACTOR_BOUND));
        assert!(has_small_factor(&big(997 * 1009), SMALL_FACTOR_BOUND));
        assert!(has_small_factor(&big(999), SMALL_FACTOR_BOUND));
        assert!(!has_small_factor(&big(1009 * 1013), SMALL_FACTOR_BOUND));
        assert!(!has_small_factor(&big(1), SMALL_FACTOR_BOUND));
    }

    #[test]
    fn test_bpsw_matches_naive() {
        let mut mr = Bpsw;
        for n in 0u64..5000 {
            assert_eq!(mr.is_probable_prime(&big(n)), is_prime_naive(n), "n = {}", n);
        }
    }

    #[test]
    fn test_bpsw_large() {
        let mut mr = Bpsw;

        // 2^89 - 1 and 2^107 - 1 are Mersenne primes
        let m89 = (BigUint::one() << 89u32) - 1u32;
        let m107 = (BigUint::one() << 107u32) - 1u32;
        assert!(mr.is_probable_prime(&m89));
        assert!(mr.is_probable_prime(&m107));

        // 2^101 - 1 is composite, and so is the product of two Mersenne primes
        let m101 = (BigUint::one() << 101u32) - 1u32;
        let m61 = (BigUint::one() << 61u32) - 1u32;
        assert!(!mr.is_probable_prime(&m101));
        assert!(!mr.is_probable_prime(&(&m61 * &m89)));

        // Carmichael number
        assert!(!mr.is_probable_prime(&big(561)));
    }

    #[test]
    fn test_even_numbers_skipped() {
        let mut filter = CandidateFilter::new(Bpsw);
        for n in (0u64..2000).step_by(2) {
            assert!(filter.should_skip(&big(n)), "{} should be skipped", n);
        }
    }

    #[test]
    fn test_odd_small_factor_skipped() {
        let mut filter = CandidateFilter::new(Bpsw);
        for p in [3u64, 5, 7, 101, 997] {
            let n = p * 1_000_003;
            assert_eq!(filter.classify(&big(n)), Some(SkipReason::SmallFactor));
        }
    }

    #[test]
    fn test_classify_reasons() {
        let mut filter = CandidateFilter::new(Bpsw);

        assert_eq!(filter.classify(&big(0)), Some(SkipReason::PerfectSquare));
        assert_eq!(filter.classify(&big(1)), Some(SkipReason::PerfectSquare));
        assert_eq!(filter.classify(&big(1009 * 1009)), Some(SkipReason::PerfectSquare));
        assert_eq!(filter.classify(&big(1_000_003)), Some(SkipReason::Prime));
        assert_eq!(filter.classify(&big(1009 * 1013)), None);
    }

    #[test]
    fn test_custom_primality_and_bound() {
        let mut calls = 0;
        let mut filter = CandidateFilter::with_bound(
            |_: &BigUint| {
                calls += 1;
                false
            },
            11,
        );

        assert_eq!(filter.bound(), 11);
        assert!(!filter.should_skip(&big(143)));
        assert!(filter.should_skip(&big(121)));
        assert!(filter.should_skip(&big(63)));
        drop(filter);

        // Only the candidate that passed the cheap checks reached the test
        assert_eq!(calls, 1);
    }
}
