//! Ordered structural checks every [`SchemeParameters`] must pass before use.

use crate::config::GenerationConfig;
use crate::errors::MsidhError;
use crate::params::SchemeParameters;
use crate::provider::AlgebraProvider;
use crate::ring::{gcd, product};

use num_bigint::BigUint;
use num_traits::One;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

/// The checks in the order they run; the first failure stops validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationCheck {
    Supersingular,
    PrimeCharacteristic,
    ModulusIdentity,
    PrimeFactorization,
    MagnitudeBand,
    Coprime,
    PointsOnCurve,
    PointOrders,
    DistinctBasis,
    NonTrivialBasis,
}

impl ValidationCheck {
    pub const ORDER: [ValidationCheck; 10] = [
        ValidationCheck::Supersingular,
        ValidationCheck::PrimeCharacteristic,
        ValidationCheck::ModulusIdentity,
        ValidationCheck::PrimeFactorization,
        ValidationCheck::MagnitudeBand,
        ValidationCheck::Coprime,
        ValidationCheck::PointsOnCurve,
        ValidationCheck::PointOrders,
        ValidationCheck::DistinctBasis,
        ValidationCheck::NonTrivialBasis,
    ];
}

impl std::fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValidationCheck::Supersingular => "supersingularity",
            ValidationCheck::PrimeCharacteristic => "prime characteristic",
            ValidationCheck::ModulusIdentity => "p = A*B*f - 1",
            ValidationCheck::PrimeFactorization => "prime power factorizations",
            ValidationCheck::MagnitudeBand => "magnitude band",
            ValidationCheck::Coprime => "coprimality",
            ValidationCheck::PointsOnCurve => "points on curve",
            ValidationCheck::PointOrders => "point orders",
            ValidationCheck::DistinctBasis => "distinct basis points",
            ValidationCheck::NonTrivialBasis => "non-trivial basis points",
        };
        write!(f, "{}", name)
    }
}

pub struct ParameterValidator<'a, P: AlgebraProvider> {
    provider: &'a P,
    config: &'a GenerationConfig,
}

impl<'a, P: AlgebraProvider> ParameterValidator<'a, P> {
    pub fn new(provider: &'a P, config: &'a GenerationConfig) -> Self {
        Self { provider, config }
    }

    /// Runs every check in [`ValidationCheck::ORDER`].
    ///
    /// # Errors
    ///
    /// `MsidhError::InvalidParameter` naming the first failing check. Provider errors
    /// raised while checking are passed through.
    pub fn check(&self, params: &SchemeParameters<P>) -> Result<(), MsidhError> {
        for check in ValidationCheck::ORDER {
            debug!("Validating {}: {}", params.name(), check);
            if let Some(detail) = self.run(check, params)? {
                debug!("{} failed: {}", check, detail);
                return Err(MsidhError::InvalidParameter { check, detail });
            }
        }
        debug!("{} passed all checks", params.name());
        Ok(())
    }

    /// `true` iff [`check`](Self::check) succeeds.
    pub fn verify(&self, params: &SchemeParameters<P>) -> bool {
        self.check(params).is_ok()
    }

    /// Returns a failure description, or `None` when the check passes.
    fn run(
        &self,
        check: ValidationCheck,
        params: &SchemeParameters<P>,
    ) -> Result<Option<String>, MsidhError> {
        let provider = self.provider;
        let curve = params.e0();
        let points = [
            ("PA", params.basis_a().p.clone()),
            ("QA", params.basis_a().q.clone()),
            ("PB", params.basis_b().p.clone()),
            ("QB", params.basis_b().q.clone()),
        ];

        let failure = match check {
            ValidationCheck::Supersingular => {
                let rigor = if self.config.proof { "proven" } else { "probable" };
                (!provider.is_supersingular(curve, self.config.proof)?)
                    .then(|| format!("E0 is not {} supersingular", rigor))
            }
            ValidationCheck::PrimeCharacteristic => {
                (!provider.is_prime(params.p())).then(|| format!("p = {} is not prime", params.p()))
            }
            ValidationCheck::ModulusIdentity => self.modulus_identity(params)?,
            ValidationCheck::PrimeFactorization => self.prime_factorization(params),
            ValidationCheck::MagnitudeBand => self.magnitude_band(params),
            ValidationCheck::Coprime => {
                let common = gcd(params.a(), params.b());
                (!common.is_one()).then(|| format!("gcd(A, B) = {}", common))
            }
            ValidationCheck::PointsOnCurve => points
                .iter()
                .find(|(_, point)| !provider.is_on_curve(curve, point))
                .map(|(label, _)| format!("{} is not on E0", label)),
            ValidationCheck::PointOrders => {
                let mut failure = None;
                for (index, (label, point)) in points.iter().enumerate() {
                    let expected = if index < 2 { params.a() } else { params.b() };
                    let order = match provider.order(curve, point) {
                        Ok(order) => order,
                        Err(error) => {
                            failure = Some(format!("{}: {}", label, error));
                            break;
                        }
                    };
                    if &order != expected {
                        failure = Some(format!(
                            "{} has order {}, expected {}",
                            label, order, expected
                        ));
                        break;
                    }
                }
                failure
            }
            ValidationCheck::DistinctBasis => {
                if params.basis_a().p == params.basis_a().q {
                    Some("PA == QA".to_string())
                } else if params.basis_b().p == params.basis_b().q {
                    Some("PB == QB".to_string())
                } else {
                    None
                }
            }
            ValidationCheck::NonTrivialBasis => points
                .iter()
                .find(|(_, point)| provider.is_identity(point))
                .map(|(label, _)| format!("{} is the identity", label)),
        };

        Ok(failure)
    }

    fn modulus_identity(&self, params: &SchemeParameters<P>) -> Result<Option<String>, MsidhError> {
        if product(params.a_factors()) != *params.a() {
            return Ok(Some(format!("A = {} does not match its factorization", params.a())));
        }
        if product(params.b_factors()) != *params.b() {
            return Ok(Some(format!("B = {} does not match its factorization", params.b())));
        }
        let expected = params.a() * params.b() * params.cofactor();
        if expected != params.p() + 1u32 {
            return Ok(Some(format!(
                "A*B*f - 1 = {} - 1 differs from p = {}",
                expected,
                params.p()
            )));
        }
        if self.provider.build_finite_field(params.p(), 2)? != *params.field() {
            return Ok(Some("base field does not have characteristic p".to_string()));
        }
        Ok(None)
    }

    /// Every listed prime is prime, appears once and has a positive exponent.
    fn prime_factorization(&self, params: &SchemeParameters<P>) -> Option<String> {
        for (label, factors) in [("A", params.a_factors()), ("B", params.b_factors())] {
            for factor in factors {
                if factor.exponent == 0 {
                    return Some(format!("{} lists {} with exponent 0", label, factor.prime));
                }
                if !self.provider.is_prime(&factor.prime) {
                    return Some(format!("{} lists {}, which is not prime", label, factor.prime));
                }
            }
            if let Some(prime) = factors.iter().map(|factor| &factor.prime).duplicates().next() {
                return Some(format!("{} lists the prime {} more than once", label, prime));
            }
        }
        None
    }

    /// `√p / c <= X <= c·√p`, compared on squares to stay in integers.
    fn magnitude_band(&self, params: &SchemeParameters<P>) -> Option<String> {
        let c = BigUint::from(self.config.magnitude_tolerance);
        let c2 = &c * &c;
        let p = params.p();

        [("A", params.a()), ("B", params.b())]
            .into_iter()
            .find(|(_, x)| {
                let x2 = *x * *x;
                &x2 * &c2 < *p || x2 > &c2 * p
            })
            .map(|(label, x)| {
                format!(
                    "{} = {} lies outside [sqrt(p)/{}, {}*sqrt(p)]",
                    label, x, self.config.magnitude_tolerance, self.config.magnitude_tolerance
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterFactory;
    use crate::provider::ReferenceProvider;

    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::{Value, json};

    fn toy_json() -> Value {
        let provider = Arc::new(ReferenceProvider::new());
        let factory = ParameterFactory::new(provider, GenerationConfig::default());
        let params = factory.from_preset("toy", &mut StdRng::seed_from_u64(77)).unwrap();
        serde_json::to_value(&params).unwrap()
    }

    fn toy_params() -> Result<SchemeParameters<ReferenceProvider>, MsidhError> {
        SchemeParameters::from_json_unchecked(&toy_json().to_string())
    }

    fn failing_check(value: Value, config: &GenerationConfig) -> Option<ValidationCheck> {
        let provider = ReferenceProvider::new();
        let params =
            SchemeParameters::<ReferenceProvider>::from_json_unchecked(&value.to_string()).unwrap();
        match ParameterValidator::new(&provider, config).check(&params) {
            Ok(()) => None,
            Err(MsidhError::InvalidParameter { check, .. }) => Some(check),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_accepts_generated_parameters() {
        assert_eq!(failing_check(toy_json(), &GenerationConfig::default()), None);
    }

    #[test]
    fn test_rejects_ordinary_curve() {
        let mut value = toy_json();
        value["e0"]["b"] = json!({ "re": [1], "im": [] });
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::Supersingular)
        );
    }

    #[test]
    fn test_rejects_composite_characteristic() {
        let mut value = toy_json();
        value["p"] = json!([865]);
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::PrimeCharacteristic)
        );
    }

    #[test]
    fn test_rejects_wrong_cofactor() {
        let mut value = toy_json();
        value["cofactor"] = json!([2]);
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::ModulusIdentity)
        );
    }

    #[test]
    fn test_rejects_composite_factor() {
        let mut value = toy_json();
        value["a_factors"] = json!([{ "prime": [32], "exponent": 1 }]);
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::PrimeFactorization)
        );

        let mut value = toy_json();
        value["b_factors"] = json!([
            { "prime": [3], "exponent": 1 },
            { "prime": [3], "exponent": 2 },
        ]);
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::PrimeFactorization)
        );
    }

    #[test]
    fn test_rejects_shared_primes() {
        // 864 = 48 * 18, both even
        let mut value = toy_json();
        value["a"] = json!([48]);
        value["a_factors"] = json!([
            { "prime": [2], "exponent": 4 },
            { "prime": [3], "exponent": 1 },
        ]);
        value["b"] = json!([18]);
        value["b_factors"] = json!([
            { "prime": [2], "exponent": 1 },
            { "prime": [3], "exponent": 2 },
        ]);
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::Coprime)
        );
    }

    #[test]
    fn test_tight_magnitude_band() {
        // A^2 = 1024 > 863, so A leaves the band once c = 1
        let config = GenerationConfig {
            magnitude_tolerance: 1,
            ..GenerationConfig::default()
        };
        assert_eq!(failing_check(toy_json(), &config), Some(ValidationCheck::MagnitudeBand));
    }

    #[test]
    fn test_rejects_point_off_curve() {
        let mut value = toy_json();
        let x = value["basis_a"]["p"]["Affine"]["x"].clone();
        value["basis_a"]["p"]["Affine"]["y"] = x;
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::PointsOnCurve)
        );
    }

    #[test]
    fn test_rejects_wrong_orders() {
        let mut value = toy_json();
        // PB has order 27, not 32
        value["basis_a"]["p"] = value["basis_b"]["p"].clone();
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::PointOrders)
        );

        let mut value = toy_json();
        value["basis_b"]["q"] = json!("Infinity");
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::PointOrders)
        );
    }

    #[test]
    fn test_rejects_repeated_basis_point() {
        let mut value = toy_json();
        value["basis_b"]["q"] = value["basis_b"]["p"].clone();
        assert_eq!(
            failing_check(value, &GenerationConfig::default()),
            Some(ValidationCheck::DistinctBasis)
        );
    }

    #[test]
    fn test_flags_identity_in_basis() -> Result<(), MsidhError> {
        // PointOrders already rejects the identity, so run the last check on its own
        let mut value = toy_json();
        value["basis_b"]["q"] = json!("Infinity");
        let params: SchemeParameters<ReferenceProvider> =
            SchemeParameters::from_json_unchecked(&value.to_string())?;
        let provider = ReferenceProvider::new();
        let config = GenerationConfig::default();
        let validator = ParameterValidator::new(&provider, &config);

        let failure = validator.run(ValidationCheck::NonTrivialBasis, &params)?;
        assert_eq!(failure.as_deref(), Some("QB is the identity"));
        assert_eq!(validator.run(ValidationCheck::NonTrivialBasis, &toy_params()?)?, None);
        Ok(())
    }
}
