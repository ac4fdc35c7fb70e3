//! Implementation of `F_{p^2}` ops using modular arithmetic.

use crate::errors::MsidhError;

use super::random_below;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An element `re + im·i` of `F_{p^2}` with `i^2 = -1`.
///
/// Elements do not carry their modulus; all arithmetic goes through an [`Fp2Field`].
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fp2 {
    pub re: BigUint,
    pub im: BigUint,
}

impl Fp2 {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self {
            re: BigUint::one(),
            im: BigUint::zero(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.re.is_zero() && self.im.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.re.is_one() && self.im.is_zero()
    }
}

impl std::fmt::Display for Fp2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.im.is_zero() {
            return write!(f, "{}", self.re);
        }
        write!(f, "{} + {}*i", self.re, self.im)
    }
}

/// Represents the quadratic extension `F_p[i]/(i^2 + 1)` for a prime `p ≡ 3 (mod 4)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fp2Field {
    modulus: BigUint,
}

impl Fp2Field {
    /// Create a new field with the given characteristic.
    ///
    /// `i^2 = -1` only defines a field when `-1` is a non-residue, so the modulus must be
    /// congruent to 3 mod 4. Primality is the caller's responsibility.
    ///
    /// # Example
    ///
    /// ```
    /// # use msidh_crypto::ring::Fp2Field;
    /// # use num_bigint::BigUint;
    /// assert!(Fp2Field::try_with(BigUint::from(863u32)).is_ok());
    /// assert!(Fp2Field::try_with(BigUint::from(13u32)).is_err());
    /// ```
    pub fn try_with(modulus: BigUint) -> Result<Self, MsidhError> {
        if modulus <= BigUint::from(2u32) {
            return Err(MsidhError::InvalidArgument(format!(
                "Field characteristic must be an odd prime, got {}",
                modulus
            )));
        }
        if &modulus % 4u32 != BigUint::from(3u32) {
            return Err(MsidhError::InvalidArgument(format!(
                "F_p[i]/(i^2+1) needs p = 3 mod 4, got p = {}",
                modulus
            )));
        }

        Ok(Self { modulus })
    }

    /// Returns the characteristic `p`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Reduces a signed integer into `[0, p)`.
    ///
    /// # Example
    ///
    /// ```
    /// # use msidh_crypto::ring::Fp2Field;
    /// # use num_bigint::{BigInt, BigUint};
    /// let field = Fp2Field::try_with(BigUint::from(11u32)).unwrap();
    /// assert_eq!(field.normalize(&BigInt::from(15)), BigUint::from(4u32));
    /// assert_eq!(field.normalize(&BigInt::from(-3)), BigUint::from(8u32));
    /// ```
    pub fn normalize(&self, value: &BigInt) -> BigUint {
        let m = BigInt::from(self.modulus.clone());
        // mod_floor of a positive modulus is never negative
        value
            .mod_floor(&m)
            .to_biguint()
            .unwrap_or_default()
    }

    /// Builds `re + im·i` from signed coordinates.
    pub fn element(&self, re: &BigInt, im: &BigInt) -> Fp2 {
        Fp2 {
            re: self.normalize(re),
            im: self.normalize(im),
        }
    }

    /// Embeds a base field integer.
    pub fn from_u64(&self, value: u64) -> Fp2 {
        Fp2 {
            re: BigUint::from(value) % &self.modulus,
            im: BigUint::zero(),
        }
    }

    /// Both coordinates are canonical residues in `[0, p)`.
    pub fn is_reduced(&self, element: &Fp2) -> bool {
        element.re < self.modulus && element.im < self.modulus
    }

    /// Returns the element `i`.
    pub fn i(&self) -> Fp2 {
        Fp2 {
            re: BigUint::zero(),
            im: BigUint::one(),
        }
    }

    fn add_base(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.modulus
    }

    fn sub_base(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + &self.modulus - (b % &self.modulus)) % &self.modulus
    }

    /// Computes `a + b`.
    pub fn add(&self, a: &Fp2, b: &Fp2) -> Fp2 {
        Fp2 {
            re: self.add_base(&a.re, &b.re),
            im: self.add_base(&a.im, &b.im),
        }
    }

    /// Computes `a - b`.
    pub fn sub(&self, a: &Fp2, b: &Fp2) -> Fp2 {
        Fp2 {
            re: self.sub_base(&a.re, &b.re),
            im: self.sub_base(&a.im, &b.im),
        }
    }

    /// Computes the additive inverse `-a`.
    pub fn neg(&self, a: &Fp2) -> Fp2 {
        self.sub(&Fp2::zero(), a)
    }

    /// Computes `a * b` using `i^2 = -1`.
    ///
    /// # Example
    ///
    /// ```
    /// # use msidh_crypto::ring::Fp2Field;
    /// # use num_bigint::BigUint;
    /// let field = Fp2Field::try_with(BigUint::from(11u32)).unwrap();
    /// let i = field.i();
    /// assert_eq!(field.mul(&i, &i), field.neg(&field.from_u64(1)));
    /// ```
    pub fn mul(&self, a: &Fp2, b: &Fp2) -> Fp2 {
        let m = &self.modulus;
        let re = self.sub_base(&((&a.re * &b.re) % m), &((&a.im * &b.im) % m));
        let im = (&a.re * &b.im + &a.im * &b.re) % m;
        Fp2 { re, im }
    }

    pub fn square(&self, a: &Fp2) -> Fp2 {
        self.mul(a, a)
    }

    /// Multiplies by a small integer.
    pub fn mul_u64(&self, a: &Fp2, k: u64) -> Fp2 {
        self.mul(a, &self.from_u64(k))
    }

    /// Returns `re - im·i`, the image of `a` under Frobenius.
    pub fn conjugate(&self, a: &Fp2) -> Fp2 {
        Fp2 {
            re: a.re.clone(),
            im: self.sub_base(&BigUint::zero(), &a.im),
        }
    }

    /// Computes the multiplicative inverse `a^-1`.
    ///
    /// # Errors
    ///
    /// Returns `MsidhError::InvalidArgument` when `a` is zero.
    pub fn inv(&self, a: &Fp2) -> Result<Fp2, MsidhError> {
        if a.is_zero() {
            return Err(MsidhError::InvalidArgument(format!(
                "Cannot invert 0 in F_{}^2",
                self.modulus
            )));
        }
        let m = &self.modulus;
        // (re + im·i)^-1 = (re - im·i) / (re^2 + im^2)
        let norm = (&a.re * &a.re + &a.im * &a.im) % m;
        let norm_inv = norm.modpow(&(m - 2u32), m);
        let conj = self.conjugate(a);

        Ok(Fp2 {
            re: (&conj.re * &norm_inv) % m,
            im: (&conj.im * &norm_inv) % m,
        })
    }

    /// Computes `a / b`.
    pub fn div(&self, a: &Fp2, b: &Fp2) -> Result<Fp2, MsidhError> {
        Ok(self.mul(a, &self.inv(b)?))
    }

    /// Computes `a^exponent` by square-and-multiply.
    pub fn pow(&self, a: &Fp2, exponent: &BigUint) -> Fp2 {
        let mut result = Fp2::one();
        for bit in (0..exponent.bits()).rev() {
            result = self.square(&result);
            if exponent.bit(bit) {
                result = self.mul(&result, a);
            }
        }
        result
    }

    /// Square root in `F_{p^2}` for `p ≡ 3 (mod 4)`, `None` for non-squares.
    ///
    /// Complex method of Adj and Rodríguez-Henríquez: with `a1 = a^((p-3)/4)` and
    /// `alpha = a1^2·a`, a root is `i·a1·a` when `alpha = -1`, otherwise
    /// `(1 + alpha)^((p-1)/2)·a1·a`.
    pub fn sqrt(&self, a: &Fp2) -> Option<Fp2> {
        if a.is_zero() {
            return Some(Fp2::zero());
        }
        let p = &self.modulus;
        let minus_one = self.neg(&Fp2::one());

        let a1 = self.pow(a, &((p - 3u32) >> 2));
        let alpha = self.mul(&a1, &self.mul(&a1, a));
        let norm = self.mul(&self.conjugate(&alpha), &alpha);
        if norm == minus_one {
            return None;
        }

        let x0 = self.mul(&a1, a);
        let root = if alpha == minus_one {
            self.mul(&self.i(), &x0)
        } else {
            let b = self.pow(&self.add(&Fp2::one(), &alpha), &((p - 1u32) >> 1));
            self.mul(&b, &x0)
        };

        (self.square(&root) == *a).then_some(root)
    }

    /// Draws a uniform element.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Fp2 {
        Fp2 {
            re: random_below(rng, &self.modulus),
            im: random_below(rng, &self.modulus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn field() -> Fp2Field {
        Fp2Field::try_with(BigUint::from(863u32)).unwrap()
    }

    #[test]
    fn test_field_creation() {
        assert!(Fp2Field::try_with(BigUint::from(863u32)).is_ok());
        assert!(Fp2Field::try_with(BigUint::from(419u32)).is_ok());
        assert!(Fp2Field::try_with(BigUint::from(2u32)).is_err());
        assert!(Fp2Field::try_with(BigUint::from(17u32)).is_err());
    }

    #[test]
    fn test_reduced_elements() {
        let field = field();
        assert!(field.is_reduced(&field.element(&BigInt::from(-1), &BigInt::from(900))));
        let unreduced = Fp2 {
            re: BigUint::from(870u32),
            im: BigUint::from(1u32),
        };
        assert!(!field.is_reduced(&unreduced));
    }

    #[test]
    fn test_addition_and_subtraction() {
        let field = field();
        let a = field.element(&BigInt::from(860), &BigInt::from(5));
        let b = field.element(&BigInt::from(10), &BigInt::from(-7));
        assert_eq!(field.add(&a, &b), field.element(&BigInt::from(7), &BigInt::from(861)));
        assert_eq!(field.sub(&field.add(&a, &b), &b), a);
        assert_eq!(field.add(&a, &field.neg(&a)), Fp2::zero());
    }

    #[test]
    fn test_multiplication() {
        let field = field();
        // (2 + 3i)(4 + 5i) = 8 - 15 + (10 + 12)i = -7 + 22i
        let a = field.element(&BigInt::from(2), &BigInt::from(3));
        let b = field.element(&BigInt::from(4), &BigInt::from(5));
        assert_eq!(field.mul(&a, &b), field.element(&BigInt::from(-7), &BigInt::from(22)));
    }

    #[test]
    fn test_inversion() -> Result<(), MsidhError> {
        let field = field();
        let a = field.element(&BigInt::from(17), &BigInt::from(400));
        let inv = field.inv(&a)?;
        assert!(field.mul(&a, &inv).is_one());
        assert!(field.inv(&Fp2::zero()).is_err());
        Ok(())
    }

    #[test]
    fn test_pow_matches_repeated_multiplication() {
        let field = field();
        let a = field.element(&BigInt::from(5), &BigInt::from(9));
        let mut expected = Fp2::one();
        for _ in 0..13 {
            expected = field.mul(&expected, &a);
        }
        assert_eq!(field.pow(&a, &BigUint::from(13u32)), expected);
        assert!(field.pow(&a, &BigUint::zero()).is_one());
    }

    #[test]
    fn test_multiplicative_group_order() {
        // every non-zero element satisfies a^(p^2 - 1) = 1
        let field = field();
        let mut rng = StdRng::seed_from_u64(3);
        let order = BigUint::from(863u32 * 863 - 1);
        for _ in 0..10 {
            let a = field.random(&mut rng);
            if a.is_zero() {
                continue;
            }
            assert!(field.pow(&a, &order).is_one());
        }
    }

    #[test]
    fn test_sqrt_of_squares() {
        let field = field();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..25 {
            let a = field.random(&mut rng);
            let sq = field.square(&a);
            let root = field.sqrt(&sq).expect("square must have a root");
            assert_eq!(field.square(&root), sq);
        }
    }

    #[test]
    fn test_every_base_field_element_is_a_square() {
        // F_p is contained in the squares of F_{p^2}
        let field = field();
        for v in [2u64, 3, 5, 862] {
            let a = field.from_u64(v);
            let root = field.sqrt(&a).expect("base field elements are squares in F_p2");
            assert_eq!(field.square(&root), a);
        }
    }
}
