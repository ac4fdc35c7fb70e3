//! # Basis Generator
//!
//! Finds two points `P, Q` generating `E0[p + 1]` on a supersingular curve over
//! `F_{p^2}`, then splits them into the order-`A` and order-`B` torsion bases used
//! by the two roles.
//!
//! Each prime power `l^e` of `p + 1` is handled on its own: the witness
//! `W(P) = ((p + 1) / l^e)·P` isolates the `l^e` component of `P`. A component of `Q`
//! that is dependent on `P` is repaired in place instead of restarting the search.

use crate::config::{CancellationToken, GenerationConfig};
use crate::errors::MsidhError;
use crate::provider::AlgebraProvider;
use crate::ring::{PrimePower, mod_inverse};

use num_bigint::BigUint;
use num_traits::Pow;

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Two points generating a torsion subgroup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorsionBasis<Pt> {
    pub p: Pt,
    pub q: Pt,
}

/// Per prime power data for `l^e || p + 1`.
#[derive(Debug, Clone)]
struct Component {
    factor: PrimePower,
    /// `l^e`
    order: BigUint,
    /// `l^(e-1)`
    sub_order: BigUint,
    /// `m = (p + 1) / l^e`
    cofactor: BigUint,
    /// `m^-1 mod l^e`
    cofactor_inverse: BigUint,
}

impl Component {
    fn try_with(group_exponent: &BigUint, factor: &PrimePower) -> Result<Self, MsidhError> {
        let order = factor.value();
        let sub_order = Pow::pow(&factor.prime, factor.exponent.saturating_sub(1));
        let cofactor = group_exponent / &order;
        let cofactor_inverse = mod_inverse(&cofactor, &order).ok_or_else(|| {
            MsidhError::InvariantViolation(format!(
                "Factorization of {} repeats the prime {}",
                group_exponent, factor.prime
            ))
        })?;

        Ok(Self {
            factor: factor.clone(),
            order,
            sub_order,
            cofactor,
            cofactor_inverse,
        })
    }
}

pub struct BasisGenerator<'a, P: AlgebraProvider> {
    provider: &'a P,
    config: &'a GenerationConfig,
    cancel: &'a CancellationToken,
}

impl<'a, P: AlgebraProvider> BasisGenerator<'a, P> {
    pub fn new(
        provider: &'a P,
        config: &'a GenerationConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            provider,
            config,
            cancel,
        }
    }

    /// Finds a basis of `E[p + 1]` on `curve` defined over `F_{p^2}`.
    ///
    /// # Errors
    ///
    /// `GenerationTimeout` once `max_basis_attempts` random points have been drawn,
    /// `Cancelled` when the token is cancelled, and `InvariantViolation` if the provider
    /// contradicts itself during a repair.
    pub fn find_basis<R: Rng + ?Sized>(
        &self,
        curve: &P::Curve,
        characteristic: &BigUint,
        rng: &mut R,
    ) -> Result<TorsionBasis<P::Point>, MsidhError> {
        let group_exponent = characteristic + 1u32;
        let components = self
            .provider
            .factor(&group_exponent)?
            .iter()
            .map(|factor| Component::try_with(&group_exponent, factor))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Searching a basis of E[{}] over {} prime powers",
            group_exponent,
            components.len()
        );

        let mut attempts = 0usize;
        let p = self.sample_full_order(curve, &components, &mut attempts, rng)?;
        let p_witnesses = self.witnesses(curve, &p, &components)?;

        'resample: loop {
            let mut q = self.sample_full_order(curve, &components, &mut attempts, rng)?;
            if q == p {
                continue;
            }
            let mut q_witnesses = self.witnesses(curve, &q, &components)?;

            for (index, component) in components.iter().enumerate() {
                let (p_witness, q_witness) = (&p_witnesses[index], &q_witnesses[index]);
                if self.is_independent(curve, p_witness, q_witness, component)? {
                    continue;
                }
                debug!(
                    "Basis dependent at {}^{}, repairing",
                    component.factor.prime, component.factor.exponent
                );
                match self.repair(curve, &q, &p_witnesses[index], component, &mut attempts, rng)? {
                    Some((repaired, witness)) => {
                        q = repaired;
                        q_witnesses[index] = witness;
                    }
                    None => {
                        warn!(
                            "Repair at {}^{} did not converge, resampling Q",
                            component.factor.prime, component.factor.exponent
                        );
                        continue 'resample;
                    }
                }
            }

            info!("Found a basis of E[{}] after {} sampled points", group_exponent, attempts);
            return Ok(TorsionBasis { p, q });
        }
    }

    /// Splits a basis of `E[A·B·f]` into the order-`A` and order-`B` bases.
    ///
    /// Returns `(PA, QA)` scaled by `B·f` and `(PB, QB)` scaled by `A·f`.
    pub fn split(
        &self,
        curve: &P::Curve,
        basis: &TorsionBasis<P::Point>,
        a: &BigUint,
        b: &BigUint,
        cofactor: &BigUint,
    ) -> Result<(TorsionBasis<P::Point>, TorsionBasis<P::Point>), MsidhError> {
        let scale = |k: &BigUint| -> Result<TorsionBasis<P::Point>, MsidhError> {
            Ok(TorsionBasis {
                p: self.provider.scalar_mul(curve, k, &basis.p)?,
                q: self.provider.scalar_mul(curve, k, &basis.q)?,
            })
        };
        Ok((scale(&(b * cofactor))?, scale(&(a * cofactor))?))
    }

    fn sample_full_order<R: Rng + ?Sized>(
        &self,
        curve: &P::Curve,
        components: &[Component],
        attempts: &mut usize,
        rng: &mut R,
    ) -> Result<P::Point, MsidhError> {
        loop {
            let point = self.draw(curve, attempts, rng)?;
            let witnesses = self.witnesses(curve, &point, components)?;
            let mut full_order = true;
            for (witness, component) in witnesses.iter().zip(components) {
                if !self.has_full_component(curve, witness, component)? {
                    full_order = false;
                    break;
                }
            }
            if full_order {
                return Ok(point);
            }
        }
    }

    /// One random point, counted against the attempt ceiling.
    fn draw<R: Rng + ?Sized>(
        &self,
        curve: &P::Curve,
        attempts: &mut usize,
        rng: &mut R,
    ) -> Result<P::Point, MsidhError> {
        self.cancel.checkpoint(*attempts, "sampling basis points")?;
        if *attempts >= self.config.max_basis_attempts {
            return Err(MsidhError::GenerationTimeout {
                attempts: *attempts,
                context: "sampling basis points".into(),
            });
        }
        *attempts += 1;
        Ok(self.provider.random_point(curve, rng))
    }

    fn witnesses(
        &self,
        curve: &P::Curve,
        point: &P::Point,
        components: &[Component],
    ) -> Result<Vec<P::Point>, MsidhError> {
        components
            .iter()
            .map(|component| self.provider.scalar_mul(curve, &component.cofactor, point))
            .collect()
    }

    /// `l^(e-1)·W != O`, i.e. the witness has exact order `l^e`.
    fn has_full_component(
        &self,
        curve: &P::Curve,
        witness: &P::Point,
        component: &Component,
    ) -> Result<bool, MsidhError> {
        let reduced = self.provider.scalar_mul(curve, &component.sub_order, witness)?;
        Ok(!self.provider.is_identity(&reduced))
    }

    /// The pairing of the two witnesses must have exact order `l^e`.
    fn is_independent(
        &self,
        curve: &P::Curve,
        p_witness: &P::Point,
        q_witness: &P::Point,
        component: &Component,
    ) -> Result<bool, MsidhError> {
        let pairing = self
            .provider
            .weil_pairing(curve, p_witness, q_witness, &component.order)?;
        let reduced = self.provider.element_pow(curve, &pairing, &component.sub_order);
        Ok(!self.provider.element_is_one(&reduced))
    }

    /// Swaps the `l^e` component of `q` for that of a fresh point independent of `P`.
    ///
    /// `Q' = Q + c·(W(R) - W(Q))` with `c = m^-1 mod l^e` leaves every other component
    /// of `Q` untouched and makes `W(Q') = W(R)`.
    fn repair<R: Rng + ?Sized>(
        &self,
        curve: &P::Curve,
        q: &P::Point,
        p_witness: &P::Point,
        component: &Component,
        attempts: &mut usize,
        rng: &mut R,
    ) -> Result<Option<(P::Point, P::Point)>, MsidhError> {
        let q_witness = self.provider.scalar_mul(curve, &component.cofactor, q)?;

        for _ in 0..self.config.basis_repair_attempts {
            let candidate = self.draw(curve, attempts, rng)?;
            let r_witness = self.provider.scalar_mul(curve, &component.cofactor, &candidate)?;
            if !self.is_independent(curve, p_witness, &r_witness, component)? {
                continue;
            }

            let delta = self.provider.point_sub(curve, &r_witness, &q_witness)?;
            let correction = self
                .provider
                .scalar_mul(curve, &component.cofactor_inverse, &delta)?;
            let repaired = self.provider.point_add(curve, q, &correction)?;

            let check = self.provider.scalar_mul(curve, &component.cofactor, &repaired)?;
            if check != r_witness {
                return Err(MsidhError::InvariantViolation(format!(
                    "Repaired point does not carry the new {}^{} component",
                    component.factor.prime, component.factor.exponent
                )));
            }
            return Ok(Some((repaired, r_witness)));
        }

        Ok(None)
    }
}
