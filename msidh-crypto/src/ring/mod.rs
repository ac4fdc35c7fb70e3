//! # Ring Crypto Module
//!
//! Integer and finite field arithmetic shared by the parameter search, the mask
//! sampler and the reference algebra provider.
//!
//! Provides the [`Fp2Field`] struct for arithmetic in `F_{p^2} = F_p[i]/(i^2 + 1)`,
//! big integer helpers (gcd, modular inverse, CRT) and prime utilities.

pub mod helper;
pub mod math;
pub mod primes;

use num_bigint::BigUint;
use num_traits::Pow;

use serde::{Deserialize, Serialize};

pub use helper::{crt, extended_gcd, gcd, mod_inverse, random_below};
pub use math::{Fp2, Fp2Field};

/// A prime power `prime^exponent` appearing in a factorization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrimePower {
    pub prime: BigUint,
    pub exponent: u32,
}

/// Ordered sequence of pairwise coprime prime powers.
pub type Factorization = Vec<PrimePower>;

impl PrimePower {
    pub fn new(prime: impl Into<BigUint>, exponent: u32) -> Self {
        Self {
            prime: prime.into(),
            exponent,
        }
    }

    /// Returns `prime^exponent`.
    pub fn value(&self) -> BigUint {
        Pow::pow(&self.prime, self.exponent)
    }
}

/// Multiplies out a factorization.
pub fn product(factors: &[PrimePower]) -> BigUint {
    factors
        .iter()
        .fold(BigUint::from(1u32), |acc, factor| acc * factor.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prime_power_value() {
        assert_eq!(PrimePower::new(2u32, 5).value(), BigUint::from(32u32));
        assert_eq!(PrimePower::new(13u32, 1).value(), BigUint::from(13u32));
    }

    #[test]
    fn test_product() {
        let factors = vec![
            PrimePower::new(2u32, 2),
            PrimePower::new(5u32, 1),
            PrimePower::new(11u32, 1),
        ];
        assert_eq!(product(&factors), BigUint::from(220u32));
        assert_eq!(product(&[]), BigUint::from(1u32));
    }
}
