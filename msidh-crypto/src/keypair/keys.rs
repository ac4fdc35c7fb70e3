use crate::provider::AlgebraProvider;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Secret of one isogeny party. Never leaves its owner, so it is not serializable.
#[derive(Debug, Clone, PartialEq)]
pub enum PrivateKey {
    /// SIDH: kernel `P + scalar·Q` with `scalar` below the party's torsion degree.
    Plain { scalar: BigUint },
    /// M-SIDH: additionally a square root of unity modulo the peer's degree that
    /// scales the transmitted images.
    Masked { mask: BigUint, scalar: BigUint },
}

impl PrivateKey {
    pub fn scalar(&self) -> &BigUint {
        match self {
            PrivateKey::Plain { scalar } | PrivateKey::Masked { scalar, .. } => scalar,
        }
    }

    pub fn mask(&self) -> Option<&BigUint> {
        match self {
            PrivateKey::Plain { .. } => None,
            PrivateKey::Masked { mask, .. } => Some(mask),
        }
    }
}

/// `(E', R, S)`: the codomain of the secret isogeny and the (masked) images of the
/// peer's basis.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PublicKey<P: AlgebraProvider> {
    pub codomain: P::Curve,
    pub image_p: P::Point,
    pub image_q: P::Point,
}

impl<P: AlgebraProvider> PublicKey<P> {
    /// The key with its two image points exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            codomain: self.codomain.clone(),
            image_p: self.image_q.clone(),
            image_q: self.image_p.clone(),
        }
    }
}

impl<P: AlgebraProvider> Clone for PublicKey<P> {
    fn clone(&self) -> Self {
        Self {
            codomain: self.codomain.clone(),
            image_p: self.image_p.clone(),
            image_q: self.image_q.clone(),
        }
    }
}

impl<P: AlgebraProvider> PartialEq for PublicKey<P> {
    fn eq(&self, other: &Self) -> bool {
        self.codomain == other.codomain
            && self.image_p == other.image_p
            && self.image_q == other.image_q
    }
}

impl<P: AlgebraProvider> std::fmt::Debug for PublicKey<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey")
            .field("codomain", &self.codomain)
            .field("image_p", &self.image_p)
            .field("image_q", &self.image_q)
            .finish()
    }
}
