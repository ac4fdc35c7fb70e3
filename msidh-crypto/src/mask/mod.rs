//! # Mask Sampler
//!
//! Samples the masking units of M-SIDH: uniform square roots of unity modulo a
//! smooth integer, assembled prime power by prime power through the CRT.

use crate::errors::MsidhError;
use crate::params::validator::ValidationCheck;
use crate::provider::AlgebraProvider;
use crate::ring::{PrimePower, crt, gcd, product};

use num_bigint::BigUint;
use num_traits::One;

use itertools::Itertools;
use log::trace;
use rand::Rng;

pub struct MaskSampler<'a, P: AlgebraProvider> {
    provider: &'a P,
}

impl<'a, P: AlgebraProvider> MaskSampler<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Draws `m` uniformly among the square roots of 1 modulo `modulus`.
    ///
    /// `factorization` must multiply out to `modulus` with pairwise coprime factors.
    /// A prime factor contributes a coin flip between `1` and `l - 1`; a prime power
    /// contributes a uniform choice among the roots the provider lists.
    ///
    /// # Example
    ///
    /// ```
    /// # use msidh_crypto::mask::MaskSampler;
    /// # use msidh_crypto::provider::ReferenceProvider;
    /// # use msidh_crypto::ring::PrimePower;
    /// # use num_bigint::BigUint;
    /// let provider = ReferenceProvider::new();
    /// let factors = vec![
    ///     PrimePower::new(3u32, 1),
    ///     PrimePower::new(5u32, 1),
    ///     PrimePower::new(7u32, 1),
    /// ];
    /// let modulus = BigUint::from(105u32);
    ///
    /// let mask = MaskSampler::new(&provider)
    ///     .sample_mask(&modulus, &factors, &mut rand::rng())
    ///     .unwrap();
    /// assert_eq!((&mask * &mask) % &modulus, BigUint::from(1u32));
    /// ```
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a factorization that does not describe `modulus`, and
    /// `InvariantViolation` if the combined value is not a root of unity.
    pub fn sample_mask<R: Rng + ?Sized>(
        &self,
        modulus: &BigUint,
        factorization: &[PrimePower],
        rng: &mut R,
    ) -> Result<BigUint, MsidhError> {
        Self::check_factorization(modulus, factorization)?;

        let mut residues = Vec::with_capacity(factorization.len());
        for factor in factorization {
            let local = factor.value();
            let residue = if factor.exponent == 1 {
                if rng.random_bool(0.5) {
                    BigUint::one()
                } else {
                    &local - 1u32
                }
            } else {
                let roots = self.provider.square_roots_of_unity(&local)?;
                if roots.is_empty() {
                    return Err(MsidhError::InvariantViolation(format!(
                        "Provider returned no square roots of unity modulo {}",
                        local
                    )));
                }
                roots[rng.random_range(0..roots.len())].clone()
            };
            trace!("mask residue {} mod {}", residue, local);
            residues.push(residue);
        }

        let moduli = factorization.iter().map(PrimePower::value).collect_vec();
        let mask = crt(&residues, &moduli)?;

        if (&mask * &mask) % modulus != BigUint::one() % modulus {
            return Err(MsidhError::InvariantViolation(format!(
                "Mask {} is not a square root of unity modulo {}",
                mask, modulus
            )));
        }

        Ok(mask)
    }

    fn check_factorization(
        modulus: &BigUint,
        factorization: &[PrimePower],
    ) -> Result<(), MsidhError> {
        let invalid = |detail: String| MsidhError::InvalidParameter {
            check: ValidationCheck::Coprime,
            detail,
        };

        if product(factorization) != *modulus {
            return Err(MsidhError::InvalidArgument(format!(
                "Factorization [{}] does not multiply to {}",
                factorization.iter().map(|f| format!("{}^{}", f.prime, f.exponent)).join(", "),
                modulus
            )));
        }
        for (left, right) in factorization.iter().tuple_combinations() {
            if !gcd(&left.prime, &right.prime).is_one() {
                return Err(invalid(format!(
                    "Factors {} and {} are not coprime",
                    left.prime, right.prime
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ReferenceProvider;

    use quickcheck_macros::quickcheck;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn factors(list: &[(u32, u32)]) -> Vec<PrimePower> {
        list.iter().map(|&(p, e)| PrimePower::new(p, e)).collect()
    }

    #[test]
    fn test_mask_is_root_of_unity() -> Result<(), MsidhError> {
        let provider = ReferenceProvider::new();
        let sampler = MaskSampler::new(&provider);
        let mut rng = StdRng::seed_from_u64(42);

        // B for lambda = 2: 3 * 7
        let modulus = BigUint::from(21u32);
        let factorization = factors(&[(3, 1), (7, 1)]);
        for _ in 0..50 {
            let mask = sampler.sample_mask(&modulus, &factorization, &mut rng)?;
            assert_eq!((&mask * &mask) % &modulus, BigUint::one());
        }
        Ok(())
    }

    #[test]
    fn test_mask_covers_all_roots() -> Result<(), MsidhError> {
        let provider = ReferenceProvider::new();
        let sampler = MaskSampler::new(&provider);
        let mut rng = StdRng::seed_from_u64(9);

        // 4 * 5 * 9 has 2 * 2 * 2 roots of unity
        let modulus = BigUint::from(180u32);
        let factorization = factors(&[(2, 2), (5, 1), (3, 2)]);
        let seen: HashSet<BigUint> = (0..400)
            .map(|_| sampler.sample_mask(&modulus, &factorization, &mut rng))
            .collect::<Result<_, _>>()?;
        assert_eq!(seen.len(), 8);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_factorization() {
        let provider = ReferenceProvider::new();
        let sampler = MaskSampler::new(&provider);
        let mut rng = StdRng::seed_from_u64(1);

        let modulus = BigUint::from(22u32);
        let wrong_product = sampler.sample_mask(&modulus, &factors(&[(3, 1), (7, 1)]), &mut rng);
        assert!(matches!(wrong_product, Err(MsidhError::InvalidArgument(_))));

        let modulus = BigUint::from(9u32);
        let shared = sampler.sample_mask(&modulus, &factors(&[(3, 1), (3, 1)]), &mut rng);
        assert!(matches!(
            shared,
            Err(MsidhError::InvalidParameter { check: ValidationCheck::Coprime, .. })
        ));
    }

    #[quickcheck]
    fn mask_squares_to_one(seed: u64, pick: u8) -> bool {
        let provider = ReferenceProvider::new();
        let schedules: [&[(u32, u32)]; 4] = [
            &[(2, 5), (3, 3)],
            &[(2, 2), (5, 1), (11, 1)],
            &[(2, 2), (3, 1), (13, 3)],
            &[(7, 1)],
        ];
        let factorization = factors(schedules[pick as usize % schedules.len()]);
        let modulus = product(&factorization);

        let mut rng = StdRng::seed_from_u64(seed);
        MaskSampler::new(&provider)
            .sample_mask(&modulus, &factorization, &mut rng)
            .is_ok_and(|m| (&m * &m) % &modulus == BigUint::one())
    }
}
