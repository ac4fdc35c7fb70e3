use crate::errors::MsidhError;
use crate::provider::AlgebraProvider;
use crate::provider::curve::{CurvePoint, WeierstrassCurve};
use crate::provider::isogeny::IsogenyChain;
use crate::provider::pairing;
use crate::ring::{Factorization, Fp2, Fp2Field, PrimePower, crt, primes};

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

use itertools::Itertools;
use log::debug;
use rand::Rng;

/// Portable provider over `F_{p^2} = F_p[i]/(i^2 + 1)` with short Weierstrass curves.
#[derive(Debug, Clone)]
pub struct ReferenceProvider {
    primality_rounds: usize,
    supersingularity_samples: usize,
}

impl Default for ReferenceProvider {
    fn default() -> Self {
        Self {
            primality_rounds: 24,
            supersingularity_samples: 10,
        }
    }
}

impl ReferenceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Miller–Rabin rounds used by [`AlgebraProvider::is_prime`] and factorization.
    pub fn with_primality_rounds(mut self, rounds: usize) -> Self {
        self.primality_rounds = rounds;
        self
    }

    /// Number of random points the probabilistic supersingularity test checks.
    pub fn with_supersingularity_samples(mut self, samples: usize) -> Self {
        self.supersingularity_samples = samples.max(1);
        self
    }
}

/// Square roots of 1 modulo a single prime power.
fn roots_mod_prime_power(factor: &PrimePower) -> Vec<BigUint> {
    let q = factor.value();
    let one = BigUint::one();
    if factor.prime != BigUint::from(2u32) {
        return vec![one, q - 1u32];
    }

    match factor.exponent {
        0 | 1 => vec![one],
        2 => vec![one, BigUint::from(3u32)],
        _ => {
            let half = &q >> 1u32;
            vec![one, &half - 1u32, &half + 1u32, q - 1u32]
        }
    }
}

impl AlgebraProvider for ReferenceProvider {
    type Field = Fp2Field;
    type Curve = WeierstrassCurve;
    type Point = CurvePoint;
    type Element = Fp2;
    type Isogeny = IsogenyChain;

    fn is_prime(&self, n: &BigUint) -> bool {
        primes::is_probable_prime(n, self.primality_rounds)
    }

    fn factor(&self, n: &BigUint) -> Result<Factorization, MsidhError> {
        primes::factorize(n, self.primality_rounds)
    }

    fn build_finite_field(&self, p: &BigUint, degree: u32) -> Result<Fp2Field, MsidhError> {
        if degree != 2 {
            return Err(MsidhError::InvalidArgument(format!(
                "Only quadratic extensions are supported, got degree {}",
                degree
            )));
        }
        Fp2Field::try_with(p.clone())
    }

    fn build_curve(
        &self,
        field: &Fp2Field,
        coefficients: &[BigInt],
    ) -> Result<WeierstrassCurve, MsidhError> {
        let [a, b] = coefficients else {
            return Err(MsidhError::InvalidArgument(format!(
                "Expected coefficients [a, b], got {} values",
                coefficients.len()
            )));
        };
        let zero = BigInt::zero();
        WeierstrassCurve::try_with(field.clone(), field.element(a, &zero), field.element(b, &zero))
    }

    fn is_supersingular(&self, curve: &WeierstrassCurve, proof: bool) -> Result<bool, MsidhError> {
        let field = curve.field();
        let p = field.modulus();
        let j = curve.j_invariant()?;

        if proof {
            // j = 1728 is supersingular for p = 3 mod 4, j = 0 for p = 2 mod 3
            let proven = (j == field.from_u64(1728) && p % 4u32 == BigUint::from(3u32))
                || (j.is_zero() && p % 3u32 == BigUint::from(2u32));
            debug!("Supersingularity proof for j = {}: {}", j, proven);
            return Ok(proven);
        }

        // E(F_{p^2}) = (Z/(p+1))^2 for the supersingular curves reachable from E0
        let exponent = p + 1u32;
        let mut rng = rand::rng();
        for _ in 0..self.supersingularity_samples {
            let point = curve.random_point(&mut rng);
            if !curve.mul(&exponent, &point)?.is_infinity() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn random_point<R: Rng + ?Sized>(&self, curve: &WeierstrassCurve, rng: &mut R) -> CurvePoint {
        curve.random_point(rng)
    }

    fn identity(&self, _curve: &WeierstrassCurve) -> CurvePoint {
        CurvePoint::Infinity
    }

    fn is_identity(&self, point: &CurvePoint) -> bool {
        point.is_infinity()
    }

    fn point_add(
        &self,
        curve: &WeierstrassCurve,
        p: &CurvePoint,
        q: &CurvePoint,
    ) -> Result<CurvePoint, MsidhError> {
        curve.add(p, q)
    }

    fn point_neg(&self, curve: &WeierstrassCurve, p: &CurvePoint) -> CurvePoint {
        curve.neg(p)
    }

    fn point_sub(
        &self,
        curve: &WeierstrassCurve,
        p: &CurvePoint,
        q: &CurvePoint,
    ) -> Result<CurvePoint, MsidhError> {
        curve.sub(p, q)
    }

    fn scalar_mul(
        &self,
        curve: &WeierstrassCurve,
        k: &BigUint,
        p: &CurvePoint,
    ) -> Result<CurvePoint, MsidhError> {
        curve.mul(k, p)
    }

    fn is_on_curve(&self, curve: &WeierstrassCurve, p: &CurvePoint) -> bool {
        curve.contains(p)
    }

    fn order(&self, curve: &WeierstrassCurve, p: &CurvePoint) -> Result<BigUint, MsidhError> {
        if !curve.contains(p) {
            return Err(MsidhError::InvalidArgument(format!("{} is not on the curve", p)));
        }
        let exponent = curve.field().modulus() + 1u32;
        if !curve.mul(&exponent, p)?.is_infinity() {
            return Err(MsidhError::Provider(format!(
                "Order of {} does not divide p + 1 = {}",
                p, exponent
            )));
        }

        let mut order = exponent.clone();
        for factor in self.factor(&exponent)? {
            for _ in 0..factor.exponent {
                let candidate = &order / &factor.prime;
                if !curve.mul(&candidate, p)?.is_infinity() {
                    break;
                }
                order = candidate;
            }
        }
        Ok(order)
    }

    fn weil_pairing(
        &self,
        curve: &WeierstrassCurve,
        p: &CurvePoint,
        q: &CurvePoint,
        n: &BigUint,
    ) -> Result<Fp2, MsidhError> {
        pairing::weil_pairing(curve, p, q, n, &mut rand::rng())
    }

    fn element_pow(&self, curve: &WeierstrassCurve, element: &Fp2, exponent: &BigUint) -> Fp2 {
        curve.field().pow(element, exponent)
    }

    fn element_is_one(&self, element: &Fp2) -> bool {
        element.is_one()
    }

    fn isogeny_from_kernel(
        &self,
        curve: &WeierstrassCurve,
        kernel: &CurvePoint,
        degree: &Factorization,
    ) -> Result<IsogenyChain, MsidhError> {
        IsogenyChain::from_kernel(curve, kernel, degree)
    }

    fn invariant(&self, curve: &WeierstrassCurve) -> Result<Fp2, MsidhError> {
        curve.j_invariant()
    }

    fn square_roots_of_unity(&self, modulus: &BigUint) -> Result<Vec<BigUint>, MsidhError> {
        if modulus.is_zero() {
            return Err(MsidhError::InvalidArgument("Modulus must be positive".into()));
        }
        if modulus.is_one() {
            return Ok(vec![BigUint::zero()]);
        }

        let factors = self.factor(modulus)?;
        let moduli = factors.iter().map(PrimePower::value).collect_vec();
        let mut roots = factors
            .iter()
            .map(roots_mod_prime_power)
            .multi_cartesian_product()
            .map(|residues| crt(&residues, &moduli))
            .collect::<Result<Vec<_>, _>>()?;
        roots.sort();
        Ok(roots)
    }
}
