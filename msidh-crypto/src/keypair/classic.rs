use crate::errors::MsidhError;
use crate::keypair::{KeyExchange, Role};
use crate::ring::random_below;

use num_bigint::BigUint;
use num_traits::One;

use rand::Rng;

/// Modulus of the group `Z/nZ` used when none is given.
pub const DEFAULT_MODULUS: u32 = 7919;

/// Textbook Diffie-Hellman in the multiplicative group modulo `n`.
///
/// # Example
///
/// ```
/// # use msidh_crypto::keypair::{ClassicDh, KeyExchange, Role};
/// let dh = ClassicDh::try_with_modulus(7919u32.into(), &mut rand::rng()).unwrap();
/// let mut rng = rand::rng();
/// let a = dh.generate_private_key(Role::A, &mut rng).unwrap();
/// let b = dh.generate_private_key(Role::B, &mut rng).unwrap();
/// let ga = dh.compute_public_key(Role::A, &a).unwrap();
/// let gb = dh.compute_public_key(Role::B, &b).unwrap();
/// assert_eq!(
///     dh.compute_shared_secret(Role::A, &a, &gb).unwrap(),
///     dh.compute_shared_secret(Role::B, &b, &ga).unwrap()
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicDh {
    modulus: BigUint,
    generator: BigUint,
}

impl ClassicDh {
    /// Uses `modulus` with a random generator in `[2, n)`.
    pub fn try_with_modulus<R: Rng + ?Sized>(
        modulus: BigUint,
        rng: &mut R,
    ) -> Result<Self, MsidhError> {
        if modulus <= BigUint::from(3u32) {
            return Err(MsidhError::InvalidArgument(format!(
                "Modulus must be greater than 3, got {}",
                modulus
            )));
        }
        let generator = random_below(rng, &(&modulus - 2u32)) + 2u32;
        Self::try_with(modulus, generator)
    }

    pub fn try_with(modulus: BigUint, generator: BigUint) -> Result<Self, MsidhError> {
        if generator <= BigUint::one() || generator >= modulus {
            return Err(MsidhError::InvalidArgument(format!(
                "Generator {} must lie in [2, {})",
                generator, modulus
            )));
        }
        Ok(Self { modulus, generator })
    }

    pub fn with_default_modulus<R: Rng + ?Sized>(rng: &mut R) -> Result<Self, MsidhError> {
        Self::try_with_modulus(BigUint::from(DEFAULT_MODULUS), rng)
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn generator(&self) -> &BigUint {
        &self.generator
    }
}

impl KeyExchange for ClassicDh {
    type PrivateKey = BigUint;
    type PublicKey = BigUint;
    type SharedSecret = BigUint;

    fn generate_private_key<R: Rng + ?Sized>(
        &self,
        _role: Role,
        rng: &mut R,
    ) -> Result<BigUint, MsidhError> {
        Ok(random_below(rng, &self.modulus))
    }

    fn compute_public_key(
        &self,
        _role: Role,
        private_key: &BigUint,
    ) -> Result<BigUint, MsidhError> {
        Ok(self.generator.modpow(private_key, &self.modulus))
    }

    fn compute_shared_secret(
        &self,
        _role: Role,
        private_key: &BigUint,
        peer_public_key: &BigUint,
    ) -> Result<BigUint, MsidhError> {
        if peer_public_key >= &self.modulus {
            return Err(MsidhError::InvalidArgument(format!(
                "Public key {} is not reduced modulo {}",
                peer_public_key, self.modulus
            )));
        }
        Ok(peer_public_key.modpow(private_key, &self.modulus))
    }

    fn describe_public_parameters(&self) -> String {
        format!("Diffie-Hellman in Z/{}Z with generator {}", self.modulus, self.generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_shared_secret_agrees() -> Result<(), MsidhError> {
        let mut rng = StdRng::seed_from_u64(7);
        let dh = ClassicDh::with_default_modulus(&mut rng)?;
        assert!(dh.generator() >= &BigUint::from(2u32) && dh.generator() < dh.modulus());

        let a = dh.generate_private_key(Role::A, &mut rng)?;
        let b = dh.generate_private_key(Role::B, &mut rng)?;
        let ga = dh.compute_public_key(Role::A, &a)?;
        let gb = dh.compute_public_key(Role::B, &b)?;
        assert_eq!(
            dh.compute_shared_secret(Role::A, &a, &gb)?,
            dh.compute_shared_secret(Role::B, &b, &ga)?
        );
        Ok(())
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(ClassicDh::try_with(BigUint::from(7919u32), BigUint::from(1u32)).is_err());
        assert!(ClassicDh::try_with(BigUint::from(7919u32), BigUint::from(7919u32)).is_err());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(ClassicDh::try_with_modulus(BigUint::from(3u32), &mut rng).is_err());

        let dh = ClassicDh::try_with(BigUint::from(7919u32), BigUint::from(7u32)).unwrap();
        let (private_key, peer) = (BigUint::from(5u32), BigUint::from(8000u32));
        let result = dh.compute_shared_secret(Role::A, &private_key, &peer);
        assert!(matches!(result, Err(MsidhError::InvalidArgument(_))));
    }
}
