//! Decomposition of `4x + 1` into a sum of three squares.
//!
//! By Legendre's three-square theorem, an integer is a sum of three squares iff it is not of the
//! form `4^a (8b + 7)`. Since `4x + 1` is `1 mod 4`, it always has such a representation; the
//! non-negativity argument in [`crate::proofs::nonneg`] relies on this to show `x >= 0`.
//!
//! Small inputs are handled by direct search. For larger inputs we pick `d` so that
//! `4x + 1 - d^2` is a prime `p = 1 mod 4` and split `p` into two squares with the
//! Hermite-Serret descent, which needs a square root of `-1` modulo `p`.

use crate::primes::{exact_sqrt, is_probable_prime};
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// Inputs `4x + 1` below this bound are decomposed by exhaustive search over machine integers.
const SEARCH_LIMIT: u64 = 1 << 32;

/// Number of candidates for `d` to try before falling back to exhaustive search.
const PRIME_SCAN_BUDGET: u64 = 1 << 16;

/// Find `(a, b, d)` with `a^2 + b^2 + d^2 = 4x + 1`.
///
/// The result is checked before it is returned, so any caller may rely on the identity.
pub fn decompose(x: &BigUint) -> (BigUint, BigUint, BigUint) {
    let goal: BigUint = (x << 2u32) + 1u32;

    let found = match goal.to_u64() {
        Some(small) if small < SEARCH_LIMIT => search_small(small)
            .map(|(a, b, d)| (BigUint::from(a), BigUint::from(b), BigUint::from(d))),
        _ => scan_for_prime_remainder(&goal),
    };
    let (a, b, d) = found.unwrap_or_else(|| search_exhaustive(&goal));

    assert_eq!(
        &a * &a + &b * &b + &d * &d,
        goal,
        "three-square decomposition produced a wrong sum"
    );
    (a, b, d)
}

/// Exhaustive search with machine integers.
fn search_small(goal: u64) -> Option<(u64, u64, u64)> {
    let mut d = integer_sqrt(goal);
    loop {
        let remainder = goal - d * d;
        if let Some((a, b)) = two_squares_small(remainder) {
            return Some((a, b, d));
        }
        if d == 0 {
            return None;
        }
        d -= 1;
    }
}

fn two_squares_small(m: u64) -> Option<(u64, u64)> {
    let mut a = 0u64;
    while 2 * a * a <= m {
        let rest = m - a * a;
        let b = integer_sqrt(rest);
        if b * b == rest {
            return Some((a, b));
        }
        a += 1;
    }
    None
}

fn integer_sqrt(n: u64) -> u64 {
    let mut root = (n as f64).sqrt() as u64;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}

/// Scan `d` downward from `sqrt(goal)` looking for a remainder that is trivially a sum of two
/// squares or a prime congruent to 1 mod 4.
fn scan_for_prime_remainder(goal: &BigUint) -> Option<(BigUint, BigUint, BigUint)> {
    let four = BigUint::from(4u32);
    let mut d = goal.sqrt();
    for _ in 0..PRIME_SCAN_BUDGET {
        let remainder = goal - &d * &d;
        if let Some(b) = exact_sqrt(&remainder) {
            return Some((BigUint::zero(), b, d));
        }
        if (&remainder % &four).is_one() && is_probable_prime(&remainder) {
            if let Some((a, b)) = split_prime(&remainder) {
                return Some((a, b, d));
            }
        }
        if d.is_zero() {
            break;
        }
        d -= 1u32;
    }
    None
}

/// Write a prime `p = 1 mod 4` as `a^2 + b^2`.
fn split_prime(p: &BigUint) -> Option<(BigUint, BigUint)> {
    let root = sqrt_of_minus_one(p)?;
    let limit = p.sqrt();
    let (mut r0, mut r1) = (p.clone(), root);
    while r1 > limit {
        let next = &r0 % &r1;
        r0 = r1;
        r1 = next;
    }
    let rest = p - &r1 * &r1;
    let b = exact_sqrt(&rest)?;
    Some((r1, b))
}

/// Find `t` with `t^2 = -1 mod p` for a prime `p = 1 mod 4`.
fn sqrt_of_minus_one(p: &BigUint) -> Option<BigUint> {
    let one = BigUint::one();
    let p_minus_one = p - &one;
    let half = &p_minus_one >> 1u32;
    let quarter = &p_minus_one >> 2u32;
    let mut c = BigUint::from(2u32);
    while &c < p {
        // A quadratic non-residue c gives c^((p-1)/4) as a square root of -1.
        if c.modpow(&half, p) == p_minus_one {
            return Some(c.modpow(&quarter, p));
        }
        c += 1u32;
    }
    None
}

/// Exhaustive search with big integers; always terminates by the three-square theorem.
fn search_exhaustive(goal: &BigUint) -> (BigUint, BigUint, BigUint) {
    let mut d = goal.sqrt();
    loop {
        let remainder = goal - &d * &d;
        let mut a = BigUint::zero();
        while (&a * &a) << 1u32 <= remainder {
            if let Some(b) = exact_sqrt(&(&remainder - &a * &a)) {
                return (a, b, d);
            }
            a += 1u32;
        }
        // `4x + 1` is never of the form 4^a (8b + 7), so some d succeeds before d underflows.
        d -= 1u32;
    }
}
