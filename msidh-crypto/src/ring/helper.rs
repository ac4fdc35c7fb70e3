use crate::errors::MsidhError;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

use rand::Rng;

/// Computes the greatest common divisor of two numbers.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    a.gcd(b)
}

/// Finds (g, x, y) such that ax + by = g = gcd(a, b).
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = old_r.div_floor(&r);
        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);
        let next_t = &old_t - &q * &t;
        old_t = std::mem::replace(&mut t, next_t);
    }

    if old_r.sign() == Sign::Minus {
        return (-old_r, -old_s, -old_t);
    }

    (old_r, old_s, old_t)
}

/// Computes the modular inverse `a^-1 mod m`, if it exists.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }
    let modulus = BigInt::from(m.clone());
    let (g, x, _) = extended_gcd(&BigInt::from(a.clone()), &modulus);
    if !g.is_one() {
        return None;
    }

    x.mod_floor(&modulus).to_biguint()
}

/// Chinese Remainder Theorem: the unique `x mod ∏ moduli` with `x ≡ residues[i] (mod moduli[i])`.
///
/// # Errors
///
/// Returns `MsidhError::InvalidArgument` if the slices differ in length, a modulus is zero,
/// or two moduli are not coprime.
pub fn crt(residues: &[BigUint], moduli: &[BigUint]) -> Result<BigUint, MsidhError> {
    if residues.len() != moduli.len() {
        return Err(MsidhError::InvalidArgument(format!(
            "CRT needs one modulus per residue, got {} residues and {} moduli",
            residues.len(),
            moduli.len()
        )));
    }

    let mut result = BigUint::zero();
    let mut combined = BigUint::one();
    for (residue, modulus) in residues.iter().zip(moduli) {
        if modulus.is_zero() {
            return Err(MsidhError::InvalidArgument("CRT modulus must be positive".into()));
        }
        let inverse = mod_inverse(&(&combined % modulus), modulus).ok_or_else(|| {
            MsidhError::InvalidArgument(format!(
                "CRT moduli are not coprime: {} shares a factor with {}",
                modulus, combined
            ))
        })?;

        // result + combined * k ≡ residue (mod modulus)
        let current = &result % modulus;
        let target = residue % modulus;
        let diff = (target + modulus - current) % modulus;
        let k = (diff * inverse) % modulus;

        result += &combined * k;
        combined *= modulus;
        result %= &combined;
    }

    Ok(result)
}

/// Draws a uniform integer from `[0, bound)` by rejection sampling.
///
/// Returns zero for a zero bound.
pub fn random_below<R: Rng + ?Sized>(rng: &mut R, bound: &BigUint) -> BigUint {
    if bound.is_zero() {
        return BigUint::zero();
    }

    let bits = bound.bits();
    let byte_len = bits.div_ceil(8) as usize;
    let excess_bits = (byte_len as u64 * 8 - bits) as u32;
    let mut buffer = vec![0u8; byte_len];

    loop {
        rng.fill_bytes(&mut buffer);
        if let Some(top) = buffer.last_mut() {
            *top &= 0xffu8 >> excess_bits;
        }
        let candidate = BigUint::from_bytes_le(&buffer);
        if &candidate < bound {
            return candidate;
        }
    }
}
