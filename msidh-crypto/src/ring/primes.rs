//! Small primes (via `primal`), Miller–Rabin and integer factorization over `BigUint`.

use crate::errors::MsidhError;
use crate::ring::{PrimePower, gcd};

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

/// Trial division bound used before switching to Pollard's rho.
const TRIAL_DIVISION_BOUND: u64 = 1 << 16;

/// Witnesses used by Miller–Rabin; the first 12 make the test deterministic below 3.3·10^24.
const WITNESSES: [u64; 24] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
];

/// The `count` smallest primes, in increasing order.
///
/// # Example
///
/// ```
/// # use msidh_crypto::ring::primes::first_primes;
/// assert_eq!(first_primes(6), vec![2, 3, 5, 7, 11, 13]);
/// ```
pub fn first_primes(count: usize) -> Vec<u64> {
    primal::Primes::all().take(count).map(|p| p as u64).collect()
}

/// Miller–Rabin with the first `rounds` fixed witnesses (at most 24).
///
/// Values that fit in a `u64` are decided exactly by `primal`.
pub fn is_probable_prime(n: &BigUint, rounds: usize) -> bool {
    if let Some(small) = n.to_u64() {
        return primal::is_prime(small);
    }
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }
    for &p in WITNESSES.iter() {
        let p = BigUint::from(p);
        if n == &p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    let n_minus_one = n - 1u32;
    let shift = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> shift;

    'witness: for &a in WITNESSES.iter().take(rounds.clamp(1, WITNESSES.len())) {
        let mut x = BigUint::from(a).modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..shift {
            x = (&x * &x) % n;
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }

    true
}

/// Splits a composite `n` with Brent's variant of Pollard's rho.
fn pollard_brent(n: &BigUint) -> Option<BigUint> {
    if n.is_even() {
        return Some(BigUint::from(2u32));
    }
    let batch = 64u64;

    for c in 1u32..64 {
        let c = BigUint::from(c);
        let step = |v: &BigUint| (v * v + &c) % n;

        let mut y = BigUint::from(2u32);
        let mut x = y.clone();
        let mut ys = y.clone();
        let mut q = BigUint::one();
        let mut g = BigUint::one();
        let mut r = 1u64;

        while g.is_one() {
            x = y.clone();
            for _ in 0..r {
                y = step(&y);
            }
            let mut k = 0u64;
            while k < r && g.is_one() {
                ys = y.clone();
                for _ in 0..batch.min(r - k) {
                    y = step(&y);
                    let diff = if x > y { &x - &y } else { &y - &x };
                    q = (q * diff) % n;
                }
                g = gcd(&q, n);
                k += batch;
            }
            r *= 2;
            if r > 1 << 24 {
                break;
            }
        }

        if &g == n || g.is_zero() {
            // the batch overshot, walk it again one step at a time
            loop {
                ys = step(&ys);
                let diff = if x > ys { &x - &ys } else { &ys - &x };
                g = gcd(&diff, n);
                if !g.is_one() {
                    break;
                }
            }
        }

        if !g.is_one() && &g != n {
            return Some(g);
        }
    }

    None
}

fn split_into(
    n: BigUint,
    rounds: usize,
    found: &mut BTreeMap<BigUint, u32>,
) -> Result<(), MsidhError> {
    if n.is_one() {
        return Ok(());
    }
    if is_probable_prime(&n, rounds) {
        *found.entry(n).or_insert(0) += 1;
        return Ok(());
    }

    let divisor = pollard_brent(&n).ok_or_else(|| {
        MsidhError::Provider(format!("Pollard rho failed to split {}", n))
    })?;
    let cofactor = &n / &divisor;
    split_into(divisor, rounds, found)?;
    split_into(cofactor, rounds, found)
}

/// Factors `n` into prime powers ordered by increasing prime.
///
/// # Errors
///
/// Returns `MsidhError::InvalidArgument` for zero and `MsidhError::Provider` if a
/// composite cofactor cannot be split.
pub fn factorize(n: &BigUint, rounds: usize) -> Result<Vec<PrimePower>, MsidhError> {
    if n.is_zero() {
        return Err(MsidhError::InvalidArgument("Cannot factor 0".into()));
    }

    let mut remaining = n.clone();
    let mut found: BTreeMap<BigUint, u32> = BTreeMap::new();

    let sieve = primal::Sieve::new(TRIAL_DIVISION_BOUND as usize);
    for p in sieve.primes_from(0) {
        if remaining.is_one() {
            break;
        }
        let prime = BigUint::from(p);
        if &prime * &prime > remaining {
            break;
        }
        let mut exponent = 0u32;
        while (&remaining % &prime).is_zero() {
            remaining /= &prime;
            exponent += 1;
        }
        if exponent > 0 {
            found.insert(prime, exponent);
        }
    }

    if !remaining.is_one() {
        if remaining.to_u64().is_some_and(|v| v < TRIAL_DIVISION_BOUND * TRIAL_DIVISION_BOUND) {
            // survived trial division up to its square root
            *found.entry(remaining).or_insert(0) += 1;
        } else {
            split_into(remaining, rounds, &mut found)?;
        }
    }

    Ok(found
        .into_iter()
        .map(|(prime, exponent)| PrimePower { prime, exponent })
        .collect())
}
