//! # Scheme Parameters
//!
//! Public domain parameters shared by both parties: `p = A·B·f - 1`, the base curve
//! `E0 : y^2 = x^3 + x` over `F_{p^2}` and the torsion bases of both roles.
//!
//! [`SchemeParameters`] can only be obtained from the [`factory::ParameterFactory`] or by
//! loading a snapshot, and both paths run the [`validator::ParameterValidator`].

pub mod factory;
pub mod validator;

use crate::basis::TorsionBasis;
use crate::config::GenerationConfig;
use crate::errors::MsidhError;
use crate::keypair::Role;
use crate::provider::AlgebraProvider;
use crate::ring::Factorization;

use std::fs;
use std::path::Path;

use num_bigint::BigUint;

use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};

pub use factory::ParameterFactory;
pub use validator::{ParameterValidator, ValidationCheck};

/// Serialized form of the parameters; also the unvalidated builder used by the factory.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub(crate) struct ParameterData<P: AlgebraProvider> {
    pub(crate) name: String,
    pub(crate) cofactor: BigUint,
    pub(crate) p: BigUint,
    pub(crate) a: BigUint,
    pub(crate) b: BigUint,
    pub(crate) a_factors: Factorization,
    pub(crate) b_factors: Factorization,
    pub(crate) field: P::Field,
    pub(crate) e0: P::Curve,
    pub(crate) basis_a: TorsionBasis<P::Point>,
    pub(crate) basis_b: TorsionBasis<P::Point>,
}

/// Validated, immutable domain parameters.
#[derive(Serialize)]
#[serde(bound = "", transparent)]
pub struct SchemeParameters<P: AlgebraProvider> {
    data: ParameterData<P>,
}

impl<P: AlgebraProvider> SchemeParameters<P> {
    /// Wraps raw data. Callers must validate before handing the result out.
    pub(crate) fn from_data(data: ParameterData<P>) -> Self {
        Self { data }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// The cofactor `f`.
    pub fn cofactor(&self) -> &BigUint {
        &self.data.cofactor
    }

    pub fn p(&self) -> &BigUint {
        &self.data.p
    }

    pub fn a(&self) -> &BigUint {
        &self.data.a
    }

    pub fn b(&self) -> &BigUint {
        &self.data.b
    }

    pub fn a_factors(&self) -> &Factorization {
        &self.data.a_factors
    }

    pub fn b_factors(&self) -> &Factorization {
        &self.data.b_factors
    }

    pub fn field(&self) -> &P::Field {
        &self.data.field
    }

    pub fn e0(&self) -> &P::Curve {
        &self.data.e0
    }

    /// `(PA, QA)`, generating the order-`A` torsion.
    pub fn basis_a(&self) -> &TorsionBasis<P::Point> {
        &self.data.basis_a
    }

    /// `(PB, QB)`, generating the order-`B` torsion.
    pub fn basis_b(&self) -> &TorsionBasis<P::Point> {
        &self.data.basis_b
    }

    /// Degree of the secret isogeny of `role`: `A` for role A, `B` for role B.
    pub fn degree(&self, role: Role) -> &BigUint {
        match role {
            Role::A => self.a(),
            Role::B => self.b(),
        }
    }

    pub fn factors(&self, role: Role) -> &Factorization {
        match role {
            Role::A => self.a_factors(),
            Role::B => self.b_factors(),
        }
    }

    pub fn basis(&self, role: Role) -> &TorsionBasis<P::Point> {
        match role {
            Role::A => self.basis_a(),
            Role::B => self.basis_b(),
        }
    }

    pub fn to_json(&self) -> Result<String, MsidhError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a snapshot and re-validates it.
    pub fn from_json(
        provider: &P,
        config: &GenerationConfig,
        json: &str,
    ) -> Result<Self, MsidhError> {
        let params = Self::from_data(serde_json::from_str(json)?);
        ParameterValidator::new(provider, config).check(&params)?;
        Ok(params)
    }

    /// Writes the JSON snapshot to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MsidhError> {
        fs::write(path.as_ref(), self.to_json()?)?;
        info!("Saved {} to {}", self.name(), path.as_ref().display());
        Ok(())
    }

    /// Reads a snapshot written by [`save`](Self::save) and re-validates it.
    pub fn load(
        provider: &P,
        config: &GenerationConfig,
        path: impl AsRef<Path>,
    ) -> Result<Self, MsidhError> {
        let json = fs::read_to_string(path.as_ref())?;
        let params = Self::from_json(provider, config, &json)?;
        info!("Loaded {} from {}", params.name(), path.as_ref().display());
        Ok(params)
    }

    #[cfg(test)]
    pub(crate) fn from_json_unchecked(json: &str) -> Result<Self, MsidhError> {
        Ok(Self::from_data(serde_json::from_str(json)?))
    }
}

impl<P: AlgebraProvider> Clone for ParameterData<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            cofactor: self.cofactor.clone(),
            p: self.p.clone(),
            a: self.a.clone(),
            b: self.b.clone(),
            a_factors: self.a_factors.clone(),
            b_factors: self.b_factors.clone(),
            field: self.field.clone(),
            e0: self.e0.clone(),
            basis_a: self.basis_a.clone(),
            basis_b: self.basis_b.clone(),
        }
    }
}

impl<P: AlgebraProvider> Clone for SchemeParameters<P> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

impl<P: AlgebraProvider> PartialEq for SchemeParameters<P> {
    fn eq(&self, other: &Self) -> bool {
        let (lhs, rhs) = (&self.data, &other.data);
        lhs.cofactor == rhs.cofactor
            && lhs.p == rhs.p
            && lhs.a == rhs.a
            && lhs.b == rhs.b
            && lhs.a_factors == rhs.a_factors
            && lhs.b_factors == rhs.b_factors
            && lhs.field == rhs.field
            && lhs.e0 == rhs.e0
            && lhs.basis_a == rhs.basis_a
            && lhs.basis_b == rhs.basis_b
    }
}

impl<P: AlgebraProvider> std::fmt::Debug for SchemeParameters<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemeParameters")
            .field("name", &self.data.name)
            .field("f", &self.data.cofactor)
            .field("p", &self.data.p)
            .field("A", &self.data.a)
            .field("B", &self.data.b)
            .field("e0", &self.data.e0)
            .field("basis_a", &self.data.basis_a)
            .field("basis_b", &self.data.basis_b)
            .finish()
    }
}

impl<P: AlgebraProvider> std::fmt::Display for SchemeParameters<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let render = |factors: &Factorization| {
            factors
                .iter()
                .map(|factor| match factor.exponent {
                    1 => factor.prime.to_string(),
                    e => format!("{}^{}", factor.prime, e),
                })
                .join("*")
        };
        write!(
            f,
            "{}: p = {} ({} bits), A = {}, B = {}, f = {}",
            self.data.name,
            self.data.p,
            self.data.p.bits(),
            render(&self.data.a_factors),
            render(&self.data.b_factors),
            self.data.cofactor
        )
    }
}
