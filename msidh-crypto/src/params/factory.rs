//! Construction of [`SchemeParameters`]: adaptive from a security parameter, or
//! fixed-size from a preset or an explicit torsion structure.

use crate::basis::BasisGenerator;
use crate::config::{CancellationToken, GenerationConfig};
use crate::errors::MsidhError;
use crate::params::validator::{ParameterValidator, ValidationCheck};
use crate::params::{ParameterData, SchemeParameters};
use crate::preset::{self, CofactorPolicy, interleaved_torsion};
use crate::provider::AlgebraProvider;
use crate::ring::{Factorization, gcd, product};

use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

use log::{debug, info, warn};
use rand::Rng;

/// Torsion structure accepted by the security margin search.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeSelection {
    /// Number of primes used.
    pub t: usize,
    /// Index of the first `A_l` suffix whose square no longer covers `B`.
    pub n: usize,
    pub a_factors: Factorization,
    pub b_factors: Factorization,
}

impl DegreeSelection {
    /// Deals the `t` smallest primes (the first one squared) to `A` and `B` and
    /// computes `n`, the first index with `B > (∏ A_l[n..])^2`.
    ///
    /// # Example
    ///
    /// ```
    /// # use msidh_crypto::params::factory::DegreeSelection;
    /// # use num_bigint::BigUint;
    /// let selection = DegreeSelection::with_t(4);
    /// assert_eq!(selection.a(), BigUint::from(20u32));
    /// assert_eq!(selection.b(), BigUint::from(21u32));
    /// assert_eq!(selection.margin(), 2);
    /// ```
    pub fn with_t(t: usize) -> Self {
        let (a_factors, b_factors) = interleaved_torsion(t, 1, 2);
        let b = product(&b_factors);

        let mut n = 0;
        while n <= a_factors.len() {
            let suffix = product(&a_factors[n..]);
            if b > &suffix * &suffix {
                break;
            }
            n += 1;
        }

        Self {
            t,
            n,
            a_factors,
            b_factors,
        }
    }

    pub fn a(&self) -> BigUint {
        product(&self.a_factors)
    }

    pub fn b(&self) -> BigUint {
        product(&self.b_factors)
    }

    /// The security margin `t - n`.
    pub fn margin(&self) -> usize {
        self.t.saturating_sub(self.n)
    }
}

pub struct ParameterFactory<P: AlgebraProvider> {
    provider: Arc<P>,
    config: GenerationConfig,
    cancel: CancellationToken,
}

impl<P: AlgebraProvider> ParameterFactory<P> {
    pub fn new(provider: Arc<P>, config: GenerationConfig) -> Self {
        Self {
            provider,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Checks `token` on every search iteration.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generates M-SIDH parameters for `security_parameter` bits, starting at `t = 2λ`.
    ///
    /// # Errors
    ///
    /// `InsufficientSecurityMargin` when no `t` within `max_margin_retries` is accepted,
    /// `NoPrimeFound` when no cofactor up to `max_cofactor` gives a prime, plus the basis
    /// search and validation errors.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        security_parameter: u32,
        rng: &mut R,
    ) -> Result<SchemeParameters<P>, MsidhError> {
        self.generate_with_t(security_parameter, 2 * security_parameter as usize, rng)
    }

    /// Like [`generate`](Self::generate) but starting the margin search at `t`.
    pub fn generate_with_t<R: Rng + ?Sized>(
        &self,
        security_parameter: u32,
        t: usize,
        rng: &mut R,
    ) -> Result<SchemeParameters<P>, MsidhError> {
        if security_parameter == 0 || t == 0 {
            return Err(MsidhError::InvalidArgument(
                "Security parameter and t must be positive".into(),
            ));
        }

        let selection = self.select_degrees(security_parameter, t)?;
        let name = format!("MSIDH-{}", security_parameter);
        self.from_torsion(
            &name,
            selection.a_factors,
            selection.b_factors,
            CofactorPolicy::SearchFrom(1),
            rng,
        )
    }

    /// Increases `t` until the margin `t - n` reaches `security_parameter`.
    pub fn select_degrees(
        &self,
        security_parameter: u32,
        t: usize,
    ) -> Result<DegreeSelection, MsidhError> {
        let required = security_parameter as usize;
        let mut selection = DegreeSelection::with_t(t);

        for retry in 0..=self.config.max_margin_retries {
            self.cancel.checkpoint(retry, "searching the security margin")?;
            if selection.margin() >= required {
                debug!(
                    "Accepted t = {} with n = {} (margin {} >= {})",
                    selection.t,
                    selection.n,
                    selection.margin(),
                    required
                );
                return Ok(selection);
            }
            if retry == self.config.max_margin_retries {
                break;
            }
            warn!(
                "Margin t - n = {} below {} for t = {}, retrying with t = {}",
                selection.margin(),
                required,
                selection.t,
                selection.t + 1
            );
            selection = DegreeSelection::with_t(selection.t + 1);
        }

        Err(MsidhError::InsufficientSecurityMargin {
            t: selection.t,
            margin: selection.margin(),
            security_parameter,
        })
    }

    /// Smallest `f >= start` such that `p = A·B·f - 1` is an admissible prime.
    pub fn find_cofactor(
        &self,
        a: &BigUint,
        b: &BigUint,
        start: u64,
    ) -> Result<(BigUint, BigUint), MsidhError> {
        let ab = a * b;
        let three = BigUint::from(3u32);

        for (attempt, f) in (start.max(1)..=self.config.max_cofactor).enumerate() {
            self.cancel.checkpoint(attempt, "searching the cofactor")?;
            let p = &ab * f - 1u32;
            if self.config.require_p_3_mod_4 && &p % 4u32 != three {
                continue;
            }
            if self.provider.is_prime(&p) {
                debug!("Cofactor f = {} gives a {}-bit prime", f, p.bits());
                return Ok((BigUint::from(f), p));
            }
        }

        Err(MsidhError::NoPrimeFound {
            max_cofactor: self.config.max_cofactor,
        })
    }

    /// Builds the named preset.
    pub fn from_preset<R: Rng + ?Sized>(
        &self,
        name: &str,
        rng: &mut R,
    ) -> Result<SchemeParameters<P>, MsidhError> {
        let preset = preset::preset(name)?;
        let (a_factors, b_factors) = preset.torsion();
        self.from_torsion(name, a_factors, b_factors, preset.cofactor(), rng)
    }

    /// Builds parameters for a given torsion structure; shared by every entry point.
    pub fn from_torsion<R: Rng + ?Sized>(
        &self,
        name: &str,
        a_factors: Factorization,
        b_factors: Factorization,
        cofactor: CofactorPolicy,
        rng: &mut R,
    ) -> Result<SchemeParameters<P>, MsidhError> {
        let a = product(&a_factors);
        let b = product(&b_factors);
        if !gcd(&a, &b).is_one() {
            return Err(MsidhError::InvalidParameter {
                check: ValidationCheck::Coprime,
                detail: format!("A = {} and B = {} share a factor", a, b),
            });
        }

        let (f, p) = match cofactor {
            CofactorPolicy::Fixed(f) => {
                if f == 0 {
                    return Err(MsidhError::InvalidArgument("Cofactor must be positive".into()));
                }
                let p = &a * &b * f - 1u32;
                if !self.provider.is_prime(&p) {
                    return Err(MsidhError::InvalidParameter {
                        check: ValidationCheck::PrimeCharacteristic,
                        detail: format!("A*B*{} - 1 = {} is not prime", f, p),
                    });
                }
                (BigUint::from(f), p)
            }
            CofactorPolicy::SearchFrom(start) => self.find_cofactor(&a, &b, start)?,
        };

        self.assemble(name, a, b, a_factors, b_factors, f, p, rng)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble<R: Rng + ?Sized>(
        &self,
        name: &str,
        a: BigUint,
        b: BigUint,
        a_factors: Factorization,
        b_factors: Factorization,
        cofactor: BigUint,
        p: BigUint,
        rng: &mut R,
    ) -> Result<SchemeParameters<P>, MsidhError> {
        info!("Building {} over a {}-bit prime", name, p.bits());
        let provider = self.provider.as_ref();

        let field = provider.build_finite_field(&p, 2)?;
        // E0 : y^2 = x^3 + x, j = 1728
        let e0 = provider.build_curve(&field, &[BigInt::one(), BigInt::zero()])?;

        let generator = BasisGenerator::new(provider, &self.config, &self.cancel);
        let basis = generator.find_basis(&e0, &p, rng)?;
        let (basis_a, basis_b) = generator.split(&e0, &basis, &a, &b, &cofactor)?;

        let params = SchemeParameters::from_data(ParameterData {
            name: name.to_string(),
            cofactor,
            p,
            a,
            b,
            a_factors,
            b_factors,
            field,
            e0,
            basis_a,
            basis_b,
        });

        ParameterValidator::new(provider, &self.config).check(&params)?;
        info!("{}", params);
        Ok(params)
    }
}
