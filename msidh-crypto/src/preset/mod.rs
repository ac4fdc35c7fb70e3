//! # Presets
//!
//! Named fixed-size parameter recipes. Only the torsion structure and the cofactor
//! rule are stored; the curve and the bases are generated on demand by
//! [`ParameterFactory::from_preset`](crate::params::ParameterFactory::from_preset).

use crate::errors::MsidhError;
use crate::ring::primes::first_primes;
use crate::ring::{Factorization, PrimePower};

use std::collections::HashMap;

use itertools::{Either, Itertools};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// How the cofactor `f` of `p = A·B·f - 1` is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CofactorPolicy {
    /// Use `f` as is; `p` must already be prime.
    Fixed(u64),
    /// Smallest `f >= start` giving an admissible prime.
    SearchFrom(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// The `t` smallest primes, the first `powered_primes` raised to `power`,
    /// dealt alternately to `A` and `B`.
    Msidh {
        t: usize,
        powered_primes: usize,
        power: u32,
        cofactor: CofactorPolicy,
    },
    /// `A = la^ea`, `B = lb^eb`.
    Sidh {
        la: u32,
        ea: u32,
        lb: u32,
        eb: u32,
        cofactor: u64,
    },
}

impl Preset {
    /// Returns the factorizations of `A` and `B`.
    pub fn torsion(&self) -> (Factorization, Factorization) {
        match *self {
            Preset::Msidh {
                t,
                powered_primes,
                power,
                ..
            } => interleaved_torsion(t, powered_primes, power),
            Preset::Sidh { la, ea, lb, eb, .. } => {
                (vec![PrimePower::new(la, ea)], vec![PrimePower::new(lb, eb)])
            }
        }
    }

    pub fn cofactor(&self) -> CofactorPolicy {
        match *self {
            Preset::Msidh { cofactor, .. } => cofactor,
            Preset::Sidh { cofactor, .. } => CofactorPolicy::Fixed(cofactor),
        }
    }

    pub fn is_masked(&self) -> bool {
        matches!(self, Preset::Msidh { .. })
    }
}

/// Deals the `t` smallest primes alternately to `A` (even indices) and `B` (odd
/// indices), raising the first `powered_primes` of them to `power`.
///
/// # Example
///
/// ```
/// # use msidh_crypto::preset::interleaved_torsion;
/// # use msidh_crypto::ring::{product, PrimePower};
/// # use num_bigint::BigUint;
/// let (a, b) = interleaved_torsion(4, 1, 2);
/// assert_eq!(a, vec![PrimePower::new(2u32, 2), PrimePower::new(5u32, 1)]);
/// assert_eq!(product(&b), BigUint::from(21u32));
/// ```
pub fn interleaved_torsion(
    t: usize,
    powered_primes: usize,
    power: u32,
) -> (Factorization, Factorization) {
    first_primes(t)
        .into_iter()
        .enumerate()
        .partition_map(|(index, prime)| {
            let exponent = if index < powered_primes { power } else { 1 };
            let factor = PrimePower::new(prime, exponent);
            if index % 2 == 0 {
                Either::Left(factor)
            } else {
                Either::Right(factor)
            }
        })
}

lazy_static! {
    /// Registry of the named parameter sets.
    static ref PRESETS: HashMap<&'static str, Preset> = {
        let mut map = HashMap::new();

        // M-SIDH at 128-bit security
        map.insert(
            "p128",
            Preset::Msidh {
                t: 572,
                powered_primes: 1,
                power: 2,
                cofactor: CofactorPolicy::Fixed(10),
            },
        );
        // small M-SIDH instance, p around 2^157
        map.insert(
            "baby",
            Preset::Msidh {
                t: 20,
                powered_primes: 10,
                power: 3,
                cofactor: CofactorPolicy::SearchFrom(6),
            },
        );

        map.insert("p182", Preset::Sidh { la: 2, ea: 91, lb: 3, eb: 57, cofactor: 1 });
        map.insert("defeo", Preset::Sidh { la: 2, ea: 63, lb: 3, eb: 41, cofactor: 11 });
        map.insert("bsike", Preset::Sidh { la: 2, ea: 33, lb: 3, eb: 19, cofactor: 1 });
        map.insert("p434", Preset::Sidh { la: 2, ea: 216, lb: 3, eb: 137, cofactor: 1 });
        map.insert("p751", Preset::Sidh { la: 2, ea: 372, lb: 3, eb: 239, cofactor: 1 });
        // p = 2^5 * 3^3 - 1 = 863
        map.insert("toy", Preset::Sidh { la: 2, ea: 5, lb: 3, eb: 3, cofactor: 1 });

        map
    };
}

/// Looks up a preset by name.
pub fn preset(name: &str) -> Result<&'static Preset, MsidhError> {
    PRESETS.get(name).ok_or_else(|| {
        MsidhError::InvalidArgument(format!(
            "Unknown preset '{}', available: {}",
            name,
            available_presets().join(", ")
        ))
    })
}

/// Sorted names of every registered preset.
pub fn available_presets() -> Vec<&'static str> {
    PRESETS.keys().copied().sorted().collect()
}
