//! Primality testing and safe-prime search.

use crate::common::Rng;
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

const SMALL_PRIMES: [u32; 20] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71,
];

/// Miller-Rabin with the first twenty primes as witnesses.
///
/// This is deterministic below 3.3 * 10^24 and has error probability below 4^-20 otherwise.
pub(crate) fn is_probable_prime(n: &BigUint) -> bool {
    if n < &BigUint::from(2u32) {
        return false;
    }
    for p in SMALL_PRIMES.iter() {
        let p = BigUint::from(*p);
        if n == &p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    let one = BigUint::one();
    let n_minus_one = n - &one;
    let mut d = n_minus_one.clone();
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1u32;
        s += 1;
    }

    'witness: for a in SMALL_PRIMES.iter() {
        let mut x = BigUint::from(*a).modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = (&x * &x) % n;
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Sample a prime `p` of exactly `bits` bits such that `2p + 1` is also prime.
pub(crate) fn random_sophie_germain_prime(rng: &mut impl Rng, bits: u64) -> BigUint {
    assert!(bits >= 3, "Sophie Germain search needs at least 3 bits");
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        // A Sophie Germain prime above 3 is 2 mod 3, else 2p + 1 is divisible by 3.
        if candidate.to_u64().map_or(true, |small| small > 3)
            && (&candidate % 3u32) != BigUint::from(2u32)
        {
            continue;
        }
        if is_probable_prime(&candidate) && is_probable_prime(&((&candidate << 1u32) + 1u32)) {
            return candidate;
        }
    }
}

/// Integer square root when `n` is a perfect square.
pub(crate) fn exact_sqrt(n: &BigUint) -> Option<BigUint> {
    let root = n.sqrt();
    if &root * &root == *n {
        Some(root)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classifies_small_numbers() {
        let primes: Vec<u32> = (0..100u32)
            .filter(|n| is_probable_prime(&BigUint::from(*n)))
            .collect();
        assert_eq!(
            primes,
            vec![
                2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73,
                79, 83, 89, 97
            ]
        );
    }

    #[test]
    fn rejects_carmichael_numbers() {
        for n in [561u32, 1105, 1729, 2465, 2821, 6601] {
            assert!(!is_probable_prime(&BigUint::from(n)), "{} is composite", n);
        }
    }

    #[test]
    fn sophie_germain_primes_are_safe() {
        let mut rng = crate::test::rng();
        let p = random_sophie_germain_prime(&mut rng, 32);
        assert_eq!(p.bits(), 32);
        assert!(is_probable_prime(&p));
        assert!(is_probable_prime(&((&p << 1u32) + 1u32)));
    }
}
