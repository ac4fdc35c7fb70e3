//! Short Weierstrass curves `y^2 = x^3 + a·x + b` over `F_{p^2}` in affine coordinates.

use crate::errors::MsidhError;
use crate::ring::{Fp2, Fp2Field};

use num_bigint::BigUint;
use num_traits::Zero;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A point in affine coordinates, or the point at infinity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurvePoint {
    Infinity,
    Affine { x: Fp2, y: Fp2 },
}

impl CurvePoint {
    pub fn is_infinity(&self) -> bool {
        matches!(self, CurvePoint::Infinity)
    }

    /// The affine coordinates, `None` at infinity.
    pub fn coordinates(&self) -> Option<(&Fp2, &Fp2)> {
        match self {
            CurvePoint::Infinity => None,
            CurvePoint::Affine { x, y } => Some((x, y)),
        }
    }
}

impl std::fmt::Display for CurvePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurvePoint::Infinity => write!(f, "O"),
            CurvePoint::Affine { x, y } => write!(f, "({}, {})", x, y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeierstrassCurve {
    field: Fp2Field,
    a: Fp2,
    b: Fp2,
}

impl WeierstrassCurve {
    /// Creates the curve `y^2 = x^3 + a·x + b`, rejecting singular ones.
    ///
    /// # Example
    ///
    /// ```
    /// # use msidh_crypto::provider::curve::WeierstrassCurve;
    /// # use msidh_crypto::ring::Fp2Field;
    /// # use num_bigint::BigUint;
    /// let field = Fp2Field::try_with(BigUint::from(863u32)).unwrap();
    /// let e0 = WeierstrassCurve::try_with(field.clone(), field.from_u64(1), field.from_u64(0));
    /// assert!(e0.is_ok());
    /// let zero = field.from_u64(0);
    /// assert!(WeierstrassCurve::try_with(field, zero.clone(), zero).is_err());
    /// ```
    pub fn try_with(field: Fp2Field, a: Fp2, b: Fp2) -> Result<Self, MsidhError> {
        let curve = Self { field, a, b };
        if curve.discriminant_part().is_zero() {
            return Err(MsidhError::InvalidArgument(format!(
                "Singular curve y^2 = x^3 + ({})x + ({})",
                curve.a, curve.b
            )));
        }
        Ok(curve)
    }

    pub fn field(&self) -> &Fp2Field {
        &self.field
    }

    pub fn a(&self) -> &Fp2 {
        &self.a
    }

    pub fn b(&self) -> &Fp2 {
        &self.b
    }

    /// `4a^3 + 27b^2`
    fn discriminant_part(&self) -> Fp2 {
        let f = &self.field;
        let a3 = f.mul(&f.square(&self.a), &self.a);
        f.add(&f.mul_u64(&a3, 4), &f.mul_u64(&f.square(&self.b), 27))
    }

    /// Evaluates `x^3 + a·x + b`.
    pub fn rhs(&self, x: &Fp2) -> Fp2 {
        let f = &self.field;
        let x3 = f.mul(&f.square(x), x);
        f.add(&f.add(&x3, &f.mul(&self.a, x)), &self.b)
    }

    /// Affine coordinates must also be reduced, so equal points compare equal.
    pub fn contains(&self, point: &CurvePoint) -> bool {
        match point {
            CurvePoint::Infinity => true,
            CurvePoint::Affine { x, y } => {
                let f = &self.field;
                f.is_reduced(x) && f.is_reduced(y) && f.square(y) == self.rhs(x)
            }
        }
    }

    /// `1728 · 4a^3 / (4a^3 + 27b^2)`
    pub fn j_invariant(&self) -> Result<Fp2, MsidhError> {
        let f = &self.field;
        let a3 = f.mul(&f.square(&self.a), &self.a);
        let numerator = f.mul_u64(&f.mul_u64(&a3, 4), 1728);
        f.div(&numerator, &self.discriminant_part())
    }

    /// A point with the given abscissa, if `rhs(x)` is a square.
    pub fn lift_x(&self, x: &Fp2) -> Option<CurvePoint> {
        self.field.sqrt(&self.rhs(x)).map(|y| CurvePoint::Affine { x: x.clone(), y })
    }

    /// Samples abscissas until one lifts; about half of them do.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> CurvePoint {
        loop {
            let x = self.field.random(rng);
            if let Some(CurvePoint::Affine { x, y }) = self.lift_x(&x) {
                let y = if rng.random_bool(0.5) { self.field.neg(&y) } else { y };
                return CurvePoint::Affine { x, y };
            }
        }
    }

    pub fn neg(&self, point: &CurvePoint) -> CurvePoint {
        match point {
            CurvePoint::Infinity => CurvePoint::Infinity,
            CurvePoint::Affine { x, y } => CurvePoint::Affine {
                x: x.clone(),
                y: self.field.neg(y),
            },
        }
    }

    pub fn double(&self, point: &CurvePoint) -> Result<CurvePoint, MsidhError> {
        let (x, y) = match point {
            CurvePoint::Infinity => return Ok(CurvePoint::Infinity),
            CurvePoint::Affine { x, y } => (x, y),
        };
        if y.is_zero() {
            return Ok(CurvePoint::Infinity);
        }

        let f = &self.field;
        let slope = f.div(&f.add(&f.mul_u64(&f.square(x), 3), &self.a), &f.mul_u64(y, 2))?;
        Ok(self.chord(&slope, x, y, x))
    }

    pub fn add(&self, p: &CurvePoint, q: &CurvePoint) -> Result<CurvePoint, MsidhError> {
        let ((x1, y1), (x2, y2)) = match (p, q) {
            (CurvePoint::Infinity, _) => return Ok(q.clone()),
            (_, CurvePoint::Infinity) => return Ok(p.clone()),
            (CurvePoint::Affine { x: x1, y: y1 }, CurvePoint::Affine { x: x2, y: y2 }) => {
                ((x1, y1), (x2, y2))
            }
        };

        let f = &self.field;
        if x1 == x2 {
            if *y1 == f.neg(y2) {
                return Ok(CurvePoint::Infinity);
            }
            return self.double(p);
        }

        let slope = f.div(&f.sub(y2, y1), &f.sub(x2, x1))?;
        Ok(self.chord(&slope, x1, y1, x2))
    }

    pub fn sub(&self, p: &CurvePoint, q: &CurvePoint) -> Result<CurvePoint, MsidhError> {
        self.add(p, &self.neg(q))
    }

    /// Third intersection of the line with slope `slope` through `(x1, y1)`, reflected.
    fn chord(&self, slope: &Fp2, x1: &Fp2, y1: &Fp2, x2: &Fp2) -> CurvePoint {
        let f = &self.field;
        let x3 = f.sub(&f.sub(&f.square(slope), x1), x2);
        let y3 = f.sub(&f.mul(slope, &f.sub(x1, &x3)), y1);
        CurvePoint::Affine { x: x3, y: y3 }
    }

    /// Double-and-add scalar multiplication.
    pub fn mul(&self, k: &BigUint, point: &CurvePoint) -> Result<CurvePoint, MsidhError> {
        let mut result = CurvePoint::Infinity;
        if k.is_zero() || point.is_infinity() {
            return Ok(result);
        }
        for bit in (0..k.bits()).rev() {
            result = self.double(&result)?;
            if k.bit(bit) {
                result = self.add(&result, point)?;
            }
        }
        Ok(result)
    }
}

impl std::fmt::Display for WeierstrassCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "y^2 = x^3 + ({})x + ({}) over F_{}^2",
            self.a,
            self.b,
            self.field.modulus()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn e0() -> WeierstrassCurve {
        let field = Fp2Field::try_with(BigUint::from(863u32)).unwrap();
        let (a, b) = (field.from_u64(1), field.from_u64(0));
        WeierstrassCurve::try_with(field, a, b).unwrap()
    }

    #[test]
    fn test_j_invariant_of_e0() -> Result<(), MsidhError> {
        let curve = e0();
        assert_eq!(curve.j_invariant()?, curve.field().from_u64(1728 % 863));
        Ok(())
    }

    #[test]
    fn test_unreduced_coordinates_are_rejected() {
        let curve = e0();
        let point = curve.random_point(&mut StdRng::seed_from_u64(3));
        let Some((x, y)) = point.coordinates() else {
            panic!("random point is affine");
        };
        let shifted = CurvePoint::Affine {
            x: Fp2 {
                re: &x.re + 863u32,
                im: x.im.clone(),
            },
            y: y.clone(),
        };
        assert!(curve.contains(&point));
        assert!(!curve.contains(&shifted));
    }

    #[test]
    fn test_group_law() -> Result<(), MsidhError> {
        let curve = e0();
        let mut rng = StdRng::seed_from_u64(11);
        let p = curve.random_point(&mut rng);
        let q = curve.random_point(&mut rng);
        assert!(curve.contains(&p));

        let sum = curve.add(&p, &q)?;
        assert!(curve.contains(&sum));
        assert_eq!(sum, curve.add(&q, &p)?);
        assert_eq!(curve.sub(&sum, &q)?, p);
        assert_eq!(curve.add(&p, &curve.neg(&p))?, CurvePoint::Infinity);
        assert_eq!(curve.double(&p)?, curve.add(&p, &p)?);
        Ok(())
    }

    #[test]
    fn test_scalar_mul() -> Result<(), MsidhError> {
        let curve = e0();
        let mut rng = StdRng::seed_from_u64(5);
        let p = curve.random_point(&mut rng);

        let three_p = curve.add(&curve.double(&p)?, &p)?;
        assert_eq!(curve.mul(&BigUint::from(3u32), &p)?, three_p);
        assert_eq!(curve.mul(&BigUint::zero(), &p)?, CurvePoint::Infinity);
        // E0(F_{p^2}) is (Z/864)^2 for p = 863
        assert_eq!(curve.mul(&BigUint::from(864u32), &p)?, CurvePoint::Infinity);
        Ok(())
    }
}
