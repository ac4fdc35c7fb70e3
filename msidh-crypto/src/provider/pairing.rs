//! Weil pairing through Miller's algorithm with a random divisor shift.

use crate::errors::MsidhError;
use crate::provider::curve::{CurvePoint, WeierstrassCurve};
use crate::ring::Fp2;

use num_bigint::BigUint;
use num_traits::Zero;

use rand::Rng;

/// Attempts at finding a shift point that keeps every Miller evaluation finite.
const MAX_SHIFT_ATTEMPTS: usize = 64;

/// Line through `t` and `u` over the vertical at `t + u`, evaluated at `at`.
///
/// Returns `None` when the evaluation hits a zero or a pole.
fn line(
    curve: &WeierstrassCurve,
    t: &CurvePoint,
    u: &CurvePoint,
    at: (&Fp2, &Fp2),
) -> Result<Option<Fp2>, MsidhError> {
    let f = curve.field();
    let ((xt, yt), (xu, yu)) = match (t.coordinates(), u.coordinates()) {
        (Some(t), Some(u)) => (t, u),
        _ => return Ok(Some(Fp2::one())),
    };
    let (x, y) = at;

    if xt == xu && *yt == f.neg(yu) {
        // vertical line, t + u = O
        let value = f.sub(x, xt);
        return Ok((!value.is_zero()).then_some(value));
    }

    let slope = if xt == xu {
        f.div(&f.add(&f.mul_u64(&f.square(xt), 3), curve.a()), &f.mul_u64(yt, 2))?
    } else {
        f.div(&f.sub(yu, yt), &f.sub(xu, xt))?
    };
    let numerator = f.sub(&f.sub(y, yt), &f.mul(&slope, &f.sub(x, xt)));

    let sum = curve.add(t, u)?;
    let Some((x_sum, _)) = sum.coordinates() else {
        return Ok(None);
    };
    let denominator = f.sub(x, x_sum);
    if numerator.is_zero() || denominator.is_zero() {
        return Ok(None);
    }

    f.div(&numerator, &denominator).map(Some)
}

/// Evaluates the Miller function `f_{n,P}` at `at`.
fn miller(
    curve: &WeierstrassCurve,
    p: &CurvePoint,
    n: &BigUint,
    at: &CurvePoint,
) -> Result<Option<Fp2>, MsidhError> {
    let f = curve.field();
    let Some(at) = at.coordinates() else {
        return Ok(None);
    };

    let mut t = p.clone();
    let mut value = Fp2::one();
    for bit in (0..n.bits().saturating_sub(1)).rev() {
        let Some(step) = line(curve, &t, &t, at)? else {
            return Ok(None);
        };
        value = f.mul(&f.square(&value), &step);
        t = curve.double(&t)?;

        if n.bit(bit) {
            let Some(step) = line(curve, &t, p, at)? else {
                return Ok(None);
            };
            value = f.mul(&value, &step);
            t = curve.add(&t, p)?;
        }
    }

    Ok(Some(value))
}

/// Computes `e_n(p, q)` for two points of order dividing `n`.
///
/// `e_n(P, Q) = f_P(Q + S)·f_Q(-S) / (f_P(S)·f_Q(P - S))` for a random `S`.
pub fn weil_pairing<R: Rng + ?Sized>(
    curve: &WeierstrassCurve,
    p: &CurvePoint,
    q: &CurvePoint,
    n: &BigUint,
    rng: &mut R,
) -> Result<Fp2, MsidhError> {
    if n.is_zero() {
        return Err(MsidhError::InvalidArgument("Pairing order must be positive".into()));
    }
    for point in [p, q] {
        if !curve.contains(point) {
            return Err(MsidhError::InvalidArgument(format!("{} is not on the curve", point)));
        }
        if !curve.mul(n, point)?.is_infinity() {
            return Err(MsidhError::InvalidArgument(format!("{} is not {}-torsion", point, n)));
        }
    }
    if p.is_infinity() || q.is_infinity() || p == q {
        return Ok(Fp2::one());
    }

    let f = curve.field();
    for _ in 0..MAX_SHIFT_ATTEMPTS {
        let s = curve.random_point(rng);
        let neg_s = curve.neg(&s);
        let q_plus_s = curve.add(q, &s)?;
        let p_minus_s = curve.sub(p, &s)?;

        let evaluations = (
            miller(curve, p, n, &q_plus_s)?,
            miller(curve, p, n, &s)?,
            miller(curve, q, n, &p_minus_s)?,
            miller(curve, q, n, &neg_s)?,
        );
        let (Some(p_at_qs), Some(p_at_s), Some(q_at_ps), Some(q_at_neg_s)) = evaluations else {
            continue;
        };

        let numerator = f.mul(&p_at_qs, &q_at_neg_s);
        let denominator = f.mul(&p_at_s, &q_at_ps);
        if denominator.is_zero() || numerator.is_zero() {
            continue;
        }
        return f.div(&numerator, &denominator);
    }

    Err(MsidhError::Provider(format!(
        "No usable shift point for the Weil pairing after {} attempts",
        MAX_SHIFT_ATTEMPTS
    )))
}
