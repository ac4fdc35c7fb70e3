//! # Algebra Provider
//!
//! The narrow interface through which parameter generation and the key-exchange
//! engine consume field, curve, pairing and isogeny arithmetic. Nothing outside this
//! module depends on a concrete provider.
//!
//! [`ReferenceProvider`] is a portable implementation over `F_{p^2} = F_p[i]/(i^2+1)`.
//! It is slow and not constant time; it exists so the protocol can be run end to end on
//! small parameters.

pub mod curve;
pub mod isogeny;
pub mod pairing;
pub mod reference;

use crate::errors::MsidhError;
use crate::ring::Factorization;

use std::fmt::Debug;

use num_bigint::{BigInt, BigUint};
use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use isogeny::IsogenyMap;
pub use reference::ReferenceProvider;

/// Bounds shared by every value a provider hands out.
///
/// Values are cloned into snapshots and public keys and cross thread boundaries
/// between the two parties of a round.
pub trait ProviderValue:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> ProviderValue for T where
    T: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

pub trait AlgebraProvider: Send + Sync {
    type Field: ProviderValue;
    type Curve: ProviderValue;
    type Point: ProviderValue;
    /// Field element returned by pairings and invariants.
    type Element: ProviderValue;
    type Isogeny: IsogenyMap<Self::Curve, Self::Point>;

    fn is_prime(&self, n: &BigUint) -> bool;

    /// Prime-power factorization ordered by increasing prime.
    fn factor(&self, n: &BigUint) -> Result<Factorization, MsidhError>;

    fn build_finite_field(&self, p: &BigUint, degree: u32) -> Result<Self::Field, MsidhError>;

    /// Curve from its coefficients, `[a, b]` for `y^2 = x^3 + a·x + b`.
    fn build_curve(
        &self,
        field: &Self::Field,
        coefficients: &[BigInt],
    ) -> Result<Self::Curve, MsidhError>;

    /// With `proof` set, only answers `true` when supersingularity is proven.
    fn is_supersingular(&self, curve: &Self::Curve, proof: bool) -> Result<bool, MsidhError>;

    fn random_point<R: Rng + ?Sized>(&self, curve: &Self::Curve, rng: &mut R) -> Self::Point;

    fn identity(&self, curve: &Self::Curve) -> Self::Point;

    fn is_identity(&self, point: &Self::Point) -> bool;

    fn point_add(
        &self,
        curve: &Self::Curve,
        p: &Self::Point,
        q: &Self::Point,
    ) -> Result<Self::Point, MsidhError>;

    fn point_neg(&self, curve: &Self::Curve, p: &Self::Point) -> Self::Point;

    fn point_sub(
        &self,
        curve: &Self::Curve,
        p: &Self::Point,
        q: &Self::Point,
    ) -> Result<Self::Point, MsidhError> {
        self.point_add(curve, p, &self.point_neg(curve, q))
    }

    fn scalar_mul(
        &self,
        curve: &Self::Curve,
        k: &BigUint,
        p: &Self::Point,
    ) -> Result<Self::Point, MsidhError>;

    fn is_on_curve(&self, curve: &Self::Curve, p: &Self::Point) -> bool;

    /// Exact order of `p`.
    fn order(&self, curve: &Self::Curve, p: &Self::Point) -> Result<BigUint, MsidhError>;

    fn weil_pairing(
        &self,
        curve: &Self::Curve,
        p: &Self::Point,
        q: &Self::Point,
        n: &BigUint,
    ) -> Result<Self::Element, MsidhError>;

    fn element_pow(
        &self,
        curve: &Self::Curve,
        element: &Self::Element,
        exponent: &BigUint,
    ) -> Self::Element;

    fn element_is_one(&self, element: &Self::Element) -> bool;

    /// Isogeny with kernel `<kernel>`, whose order is the product of `degree`.
    fn isogeny_from_kernel(
        &self,
        curve: &Self::Curve,
        kernel: &Self::Point,
        degree: &Factorization,
    ) -> Result<Self::Isogeny, MsidhError>;

    /// Canonical isomorphism invariant (j-invariant).
    fn invariant(&self, curve: &Self::Curve) -> Result<Self::Element, MsidhError>;

    /// Every `x mod modulus` with `x^2 ≡ 1`.
    fn square_roots_of_unity(&self, modulus: &BigUint) -> Result<Vec<BigUint>, MsidhError>;
}
