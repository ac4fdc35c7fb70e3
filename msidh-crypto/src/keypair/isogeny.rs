//! SIDH and M-SIDH over validated [`SchemeParameters`].
//!
//! Role A walks the isogeny with kernel `<PA + a·QA>` and publishes the images of
//! `PB, QB`; role B does the mirror image. M-SIDH additionally scales the published
//! images by a secret square root of unity modulo the peer's degree.

use crate::errors::MsidhError;
use crate::keypair::keys::{PrivateKey, PublicKey};
use crate::keypair::{KeyExchange, Role};
use crate::mask::MaskSampler;
use crate::params::SchemeParameters;
use crate::provider::{AlgebraProvider, IsogenyMap};
use crate::ring::random_below;

use std::sync::Arc;

use num_bigint::BigUint;

use log::debug;
use rand::Rng;

/// Key derivation shared by both isogeny schemes.
struct IsogenyEngine<P: AlgebraProvider> {
    provider: Arc<P>,
    params: Arc<SchemeParameters<P>>,
}

impl<P: AlgebraProvider> IsogenyEngine<P> {
    fn random_scalar<R: Rng + ?Sized>(&self, role: Role, rng: &mut R) -> BigUint {
        random_below(rng, self.params.degree(role))
    }

    fn public_key(&self, role: Role, private_key: &PrivateKey) -> Result<PublicKey<P>, MsidhError> {
        let provider = self.provider.as_ref();
        let params = self.params.as_ref();
        let e0 = params.e0();
        let own = params.basis(role);
        let peer = params.basis(role.peer());

        let kernel = provider.point_add(
            e0,
            &own.p,
            &provider.scalar_mul(e0, private_key.scalar(), &own.q)?,
        )?;
        let phi = provider.isogeny_from_kernel(e0, &kernel, params.factors(role))?;
        let codomain = phi.codomain().clone();
        debug!("Party {} walked an isogeny of degree {}", role, params.degree(role));

        let mut image_p = phi.evaluate(&peer.p)?;
        let mut image_q = phi.evaluate(&peer.q)?;
        if let Some(mask) = private_key.mask() {
            image_p = provider.scalar_mul(&codomain, mask, &image_p)?;
            image_q = provider.scalar_mul(&codomain, mask, &image_q)?;
        }

        Ok(PublicKey {
            codomain,
            image_p,
            image_q,
        })
    }

    /// `e_own(R, S)` must equal `e_own(P_own, Q_own)^(peer degree)`.
    fn check_pairing(&self, role: Role, peer_public_key: &PublicKey<P>) -> Result<(), MsidhError> {
        let provider = self.provider.as_ref();
        let params = self.params.as_ref();
        let degree = params.degree(role);
        let PublicKey {
            codomain,
            image_p,
            image_q,
        } = peer_public_key;

        if !provider.is_on_curve(codomain, image_p) || !provider.is_on_curve(codomain, image_q) {
            return Err(MsidhError::PairingMismatch(format!(
                "Party {} received image points that are not on the peer codomain",
                role
            )));
        }
        let received = provider
            .weil_pairing(codomain, image_p, image_q, degree)
            .map_err(|e| {
                MsidhError::PairingMismatch(format!(
                    "Party {} cannot pair the received points: {}",
                    role, e
                ))
            })?;

        let own = params.basis(role);
        let base = provider.weil_pairing(params.e0(), &own.p, &own.q, degree)?;
        let expected = provider.element_pow(params.e0(), &base, params.degree(role.peer()));

        if received != expected {
            return Err(MsidhError::PairingMismatch(format!(
                "Party {}: e(R, S) differs from e(P, Q)^{}",
                role,
                params.degree(role.peer())
            )));
        }
        Ok(())
    }

    fn shared_secret(
        &self,
        role: Role,
        private_key: &PrivateKey,
        peer_public_key: &PublicKey<P>,
    ) -> Result<P::Element, MsidhError> {
        self.check_pairing(role, peer_public_key)?;

        let provider = self.provider.as_ref();
        let codomain = &peer_public_key.codomain;
        let kernel = provider.point_add(
            codomain,
            &peer_public_key.image_p,
            &provider.scalar_mul(codomain, private_key.scalar(), &peer_public_key.image_q)?,
        )?;
        let psi = provider.isogeny_from_kernel(codomain, &kernel, self.params.factors(role))?;
        provider.invariant(psi.codomain())
    }
}

/// Plain SIDH.
pub struct Sidh<P: AlgebraProvider> {
    engine: IsogenyEngine<P>,
}

impl<P: AlgebraProvider> Sidh<P> {
    pub fn new(provider: Arc<P>, params: Arc<SchemeParameters<P>>) -> Self {
        Self {
            engine: IsogenyEngine { provider, params },
        }
    }

    pub fn params(&self) -> &Arc<SchemeParameters<P>> {
        &self.engine.params
    }
}

impl<P: AlgebraProvider> KeyExchange for Sidh<P> {
    type PrivateKey = PrivateKey;
    type PublicKey = PublicKey<P>;
    type SharedSecret = P::Element;

    fn generate_private_key<R: Rng + ?Sized>(
        &self,
        role: Role,
        rng: &mut R,
    ) -> Result<PrivateKey, MsidhError> {
        Ok(PrivateKey::Plain {
            scalar: self.engine.random_scalar(role, rng),
        })
    }

    fn compute_public_key(
        &self,
        role: Role,
        private_key: &PrivateKey,
    ) -> Result<PublicKey<P>, MsidhError> {
        self.engine.public_key(role, private_key)
    }

    fn compute_shared_secret(
        &self,
        role: Role,
        private_key: &PrivateKey,
        peer_public_key: &PublicKey<P>,
    ) -> Result<P::Element, MsidhError> {
        self.engine.shared_secret(role, private_key, peer_public_key)
    }

    fn describe_public_parameters(&self) -> String {
        format!("SIDH over {}", self.engine.params)
    }
}

/// Masked SIDH.
pub struct MSidh<P: AlgebraProvider> {
    engine: IsogenyEngine<P>,
}

impl<P: AlgebraProvider> MSidh<P> {
    pub fn new(provider: Arc<P>, params: Arc<SchemeParameters<P>>) -> Self {
        Self {
            engine: IsogenyEngine { provider, params },
        }
    }

    pub fn params(&self) -> &Arc<SchemeParameters<P>> {
        &self.engine.params
    }
}

impl<P: AlgebraProvider> KeyExchange for MSidh<P> {
    type PrivateKey = PrivateKey;
    type PublicKey = PublicKey<P>;
    type SharedSecret = P::Element;

    /// The mask lives modulo the peer's degree, since it scales points of that order.
    fn generate_private_key<R: Rng + ?Sized>(
        &self,
        role: Role,
        rng: &mut R,
    ) -> Result<PrivateKey, MsidhError> {
        let params = self.engine.params.as_ref();
        let peer = role.peer();
        let mask = MaskSampler::new(self.engine.provider.as_ref()).sample_mask(
            params.degree(peer),
            params.factors(peer),
            rng,
        )?;

        Ok(PrivateKey::Masked {
            mask,
            scalar: self.engine.random_scalar(role, rng),
        })
    }

    fn compute_public_key(
        &self,
        role: Role,
        private_key: &PrivateKey,
    ) -> Result<PublicKey<P>, MsidhError> {
        self.engine.public_key(role, private_key)
    }

    fn compute_shared_secret(
        &self,
        role: Role,
        private_key: &PrivateKey,
        peer_public_key: &PublicKey<P>,
    ) -> Result<P::Element, MsidhError> {
        self.engine.shared_secret(role, private_key, peer_public_key)
    }

    fn describe_public_parameters(&self) -> String {
        format!("M-SIDH over {}", self.engine.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::params::ParameterFactory;
    use crate::provider::ReferenceProvider;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn toy() -> (Arc<ReferenceProvider>, Arc<SchemeParameters<ReferenceProvider>>) {
        let provider = Arc::new(ReferenceProvider::new());
        let factory = ParameterFactory::new(provider.clone(), GenerationConfig::default());
        let params = factory.from_preset("toy", &mut StdRng::seed_from_u64(31)).unwrap();
        (provider, Arc::new(params))
    }

    fn exchange<S: KeyExchange>(
        scheme: &S,
        rng: &mut StdRng,
    ) -> Result<(S::SharedSecret, S::SharedSecret), MsidhError> {
        let sk_a = scheme.generate_private_key(Role::A, rng)?;
        let sk_b = scheme.generate_private_key(Role::B, rng)?;
        let pk_a = scheme.compute_public_key(Role::A, &sk_a)?;
        let pk_b = scheme.compute_public_key(Role::B, &sk_b)?;
        Ok((
            scheme.compute_shared_secret(Role::A, &sk_a, &pk_b)?,
            scheme.compute_shared_secret(Role::B, &sk_b, &pk_a)?,
        ))
    }

    #[test]
    fn test_sidh_agrees() -> Result<(), MsidhError> {
        let (provider, params) = toy();
        let scheme = Sidh::new(provider, params);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..3 {
            let (secret_a, secret_b) = exchange(&scheme, &mut rng)?;
            assert_eq!(secret_a, secret_b);
        }
        Ok(())
    }

    #[test]
    fn test_msidh_agrees() -> Result<(), MsidhError> {
        let (provider, params) = toy();
        let scheme = MSidh::new(provider, params);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..3 {
            let (secret_a, secret_b) = exchange(&scheme, &mut rng)?;
            assert_eq!(secret_a, secret_b);
        }
        Ok(())
    }

    #[test]
    fn test_mask_is_modulo_peer_degree() -> Result<(), MsidhError> {
        let (provider, params) = toy();
        let scheme = MSidh::new(provider, params.clone());
        let mut rng = StdRng::seed_from_u64(3);

        let key = scheme.generate_private_key(Role::A, &mut rng)?;
        let mask = key.mask().cloned().unwrap_or_default();
        assert_eq!((&mask * &mask) % params.b(), BigUint::from(1u32));
        assert!(key.scalar() < params.a());
        Ok(())
    }

    #[test]
    fn test_swapped_images_are_rejected() -> Result<(), MsidhError> {
        let (provider, params) = toy();
        let scheme = MSidh::new(provider, params);
        let mut rng = StdRng::seed_from_u64(4);

        let sk_a = scheme.generate_private_key(Role::A, &mut rng)?;
        let sk_b = scheme.generate_private_key(Role::B, &mut rng)?;
        let pk_b = scheme.compute_public_key(Role::B, &sk_b)?;

        let result = scheme.compute_shared_secret(Role::A, &sk_a, &pk_b.swapped());
        assert!(matches!(result, Err(MsidhError::PairingMismatch(_))));
        Ok(())
    }
}
