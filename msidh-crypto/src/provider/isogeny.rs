//! Separable isogenies from a kernel point: Vélu's formulas for prime degree,
//! composed into chains for smooth composite degree.

use crate::errors::MsidhError;
use crate::provider::curve::{CurvePoint, WeierstrassCurve};
use crate::ring::{Fp2, PrimePower};

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};

use log::trace;

/// Isogeny surface consumed by the key-exchange engine.
pub trait IsogenyMap<C, P> {
    fn codomain(&self) -> &C;
    fn evaluate(&self, point: &P) -> Result<P, MsidhError>;
}

/// One kernel point's contribution to Vélu's sums.
#[derive(Debug, Clone)]
struct VeluTerm {
    x: Fp2,
    u: Fp2,
    v: Fp2,
}

/// Isogeny of prime degree `l` with kernel `<G>`.
#[derive(Debug, Clone)]
pub struct VeluIsogeny {
    domain: WeierstrassCurve,
    codomain: WeierstrassCurve,
    degree: u64,
    terms: Vec<VeluTerm>,
}

impl VeluIsogeny {
    /// Builds the isogeny with kernel generated by `generator`, a point of prime order `degree`.
    pub fn try_with(
        domain: &WeierstrassCurve,
        generator: &CurvePoint,
        degree: u64,
    ) -> Result<Self, MsidhError> {
        if generator.is_infinity() {
            return Err(MsidhError::InvalidArgument("Kernel generator is the identity".into()));
        }
        let order_check = domain.mul(&BigUint::from(degree), generator)?;
        if !order_check.is_infinity() {
            return Err(MsidhError::InvalidArgument(format!(
                "Kernel generator {} does not have order {}",
                generator, degree
            )));
        }

        let f = domain.field();
        // 2-torsion contributes once, otherwise one representative of each ±Q pair
        let count = if degree == 2 { 1 } else { (degree - 1) / 2 };
        let mut terms = Vec::with_capacity(count as usize);
        let mut current = generator.clone();
        for _ in 0..count {
            let Some((xq, yq)) = current.coordinates() else {
                return Err(MsidhError::InvariantViolation(format!(
                    "Kernel of degree {} hit the identity early",
                    degree
                )));
            };
            let gx = f.add(&f.mul_u64(&f.square(xq), 3), domain.a());
            let gy = f.neg(&f.mul_u64(yq, 2));
            let v = if degree == 2 { gx } else { f.mul_u64(&gx, 2) };
            let u = f.square(&gy);
            terms.push(VeluTerm {
                x: xq.clone(),
                u,
                v,
            });
            current = domain.add(&current, generator)?;
        }

        let (v_sum, w_sum) = terms.iter().fold((Fp2::zero(), Fp2::zero()), |(v, w), term| {
            let w_term = f.add(&term.u, &f.mul(&term.x, &term.v));
            (f.add(&v, &term.v), f.add(&w, &w_term))
        });
        let a = f.sub(domain.a(), &f.mul_u64(&v_sum, 5));
        let b = f.sub(domain.b(), &f.mul_u64(&w_sum, 7));
        let codomain = WeierstrassCurve::try_with(f.clone(), a, b)?;

        Ok(Self {
            domain: domain.clone(),
            codomain,
            degree,
            terms,
        })
    }

    pub fn degree(&self) -> u64 {
        self.degree
    }

    pub fn domain(&self) -> &WeierstrassCurve {
        &self.domain
    }
}

impl IsogenyMap<WeierstrassCurve, CurvePoint> for VeluIsogeny {
    fn codomain(&self) -> &WeierstrassCurve {
        &self.codomain
    }

    fn evaluate(&self, point: &CurvePoint) -> Result<CurvePoint, MsidhError> {
        let Some((x, y)) = point.coordinates() else {
            return Ok(CurvePoint::Infinity);
        };
        let f = self.domain.field();

        let mut x_image = x.clone();
        let mut y_image = y.clone();
        for term in &self.terms {
            let diff = f.sub(x, &term.x);
            if diff.is_zero() {
                // points of the kernel map to the identity
                return Ok(CurvePoint::Infinity);
            }
            let inv = f.inv(&diff)?;
            let inv2 = f.square(&inv);
            let inv3 = f.mul(&inv2, &inv);

            x_image = f.add(&x_image, &f.add(&f.mul(&term.v, &inv), &f.mul(&term.u, &inv2)));
            let y_term = f.add(
                &f.mul(&f.mul_u64(&term.u, 2), &f.mul(y, &inv3)),
                &f.mul(&term.v, &f.mul(y, &inv2)),
            );
            y_image = f.sub(&y_image, &y_term);
        }

        Ok(CurvePoint::Affine {
            x: x_image,
            y: y_image,
        })
    }
}

/// Composition of prime-degree steps; degree is the product of the steps.
#[derive(Debug, Clone)]
pub struct IsogenyChain {
    steps: Vec<VeluIsogeny>,
    codomain: WeierstrassCurve,
}

impl IsogenyChain {
    /// Walks the kernel `<kernel>` of order `∏ l^e` one prime at a time.
    ///
    /// At each step the point `(remaining / l)·K` has order `l`; its isogeny is applied to
    /// the curve and to `K`, and `remaining` shrinks by `l`.
    pub fn from_kernel(
        domain: &WeierstrassCurve,
        kernel: &CurvePoint,
        degree: &[PrimePower],
    ) -> Result<Self, MsidhError> {
        let mut remaining: BigUint = degree.iter().map(PrimePower::value).product();
        let mut curve = domain.clone();
        let mut kernel = kernel.clone();
        let mut steps = Vec::new();

        for factor in degree {
            let l = factor.prime.to_u64().ok_or_else(|| {
                MsidhError::Provider(format!(
                    "Isogeny step of degree {} is too large",
                    factor.prime
                ))
            })?;
            for _ in 0..factor.exponent {
                let cofactor = &remaining / &factor.prime;
                let generator = curve.mul(&cofactor, &kernel)?;
                if generator.is_infinity() {
                    return Err(MsidhError::InvariantViolation(format!(
                        "Kernel point has order smaller than {}",
                        remaining
                    )));
                }
                trace!("Velu step of degree {} ({} left)", l, cofactor);

                let step = VeluIsogeny::try_with(&curve, &generator, l)?;
                kernel = step.evaluate(&kernel)?;
                curve = step.codomain().clone();
                remaining = cofactor;
                steps.push(step);
            }
        }

        if !remaining.is_one() || !kernel.is_infinity() {
            return Err(MsidhError::InvariantViolation(
                "Kernel was not exhausted by the isogeny chain".into(),
            ));
        }

        Ok(Self {
            steps,
            codomain: curve,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl IsogenyMap<WeierstrassCurve, CurvePoint> for IsogenyChain {
    fn codomain(&self) -> &WeierstrassCurve {
        &self.codomain
    }

    fn evaluate(&self, point: &CurvePoint) -> Result<CurvePoint, MsidhError> {
        self.steps
            .iter()
            .try_fold(point.clone(), |image, step| step.evaluate(&image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::Fp2Field;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn e0() -> WeierstrassCurve {
        let field = Fp2Field::try_with(BigUint::from(863u32)).unwrap();
        let (a, b) = (field.from_u64(1), field.from_u64(0));
        WeierstrassCurve::try_with(field, a, b).unwrap()
    }

    fn point_of_order(curve: &WeierstrassCurve, rng: &mut StdRng, order: u32) -> CurvePoint {
        let cofactor = BigUint::from(864 / order);
        loop {
            let point = curve.mul(&cofactor, &curve.random_point(rng)).unwrap();
            let smaller = (2..order).filter(|d| order % d == 0).all(|d| {
                !curve.mul(&BigUint::from(d), &point).unwrap().is_infinity()
            });
            if !point.is_infinity() && smaller {
                return point;
            }
        }
    }

    #[test]
    fn test_velu_is_a_homomorphism() -> Result<(), MsidhError> {
        let curve = e0();
        let mut rng = StdRng::seed_from_u64(21);
        let kernel = point_of_order(&curve, &mut rng, 3);
        let phi = VeluIsogeny::try_with(&curve, &kernel, 3)?;

        assert_eq!(phi.evaluate(&kernel)?, CurvePoint::Infinity);

        let p = curve.random_point(&mut rng);
        let q = curve.random_point(&mut rng);
        let image_sum = phi.evaluate(&curve.add(&p, &q)?)?;
        let sum_image = phi.codomain().add(&phi.evaluate(&p)?, &phi.evaluate(&q)?)?;
        assert!(phi.codomain().contains(&image_sum));
        assert_eq!(image_sum, sum_image);
        Ok(())
    }

    #[test]
    fn test_two_isogeny_maps_onto_codomain() -> Result<(), MsidhError> {
        let curve = e0();
        let mut rng = StdRng::seed_from_u64(2);
        let kernel = point_of_order(&curve, &mut rng, 2);
        let phi = VeluIsogeny::try_with(&curve, &kernel, 2)?;
        let p = curve.random_point(&mut rng);
        assert!(phi.codomain().contains(&phi.evaluate(&p)?));
        Ok(())
    }

    #[test]
    fn test_chain_of_composite_degree() -> Result<(), MsidhError> {
        let curve = e0();
        let mut rng = StdRng::seed_from_u64(17);
        let kernel = point_of_order(&curve, &mut rng, 32);
        let chain = IsogenyChain::from_kernel(&curve, &kernel, &[PrimePower::new(2u32, 5)])?;
        assert_eq!(chain.len(), 5);
        assert_eq!(chain.evaluate(&kernel)?, CurvePoint::Infinity);

        let p = curve.random_point(&mut rng);
        assert!(chain.codomain().contains(&chain.evaluate(&p)?));
        Ok(())
    }

    #[test]
    fn test_chain_rejects_short_kernel() {
        let curve = e0();
        let mut rng = StdRng::seed_from_u64(4);
        let kernel = point_of_order(&curve, &mut rng, 8);
        let chain = IsogenyChain::from_kernel(&curve, &kernel, &[PrimePower::new(2u32, 5)]);
        assert!(matches!(chain, Err(MsidhError::InvariantViolation(_))));
    }
}
