//! # Party
//!
//! One participant of a key exchange. Every operation is only valid in a single
//! state; calls out of order fail with `MsidhError::OrderingViolation` and leave the
//! party untouched.

use crate::errors::MsidhError;
use crate::keypair::{KeyExchange, Role};

use std::sync::Arc;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyState {
    Created,
    PrivateKeyGenerated,
    PublicKeyComputed,
    PeerKeyRegistered,
    SharedSecretComputed,
}

impl std::fmt::Display for PartyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PartyState::Created => "created",
            PartyState::PrivateKeyGenerated => "private key generated",
            PartyState::PublicKeyComputed => "public key computed",
            PartyState::PeerKeyRegistered => "peer key registered",
            PartyState::SharedSecretComputed => "shared secret computed",
        };
        write!(f, "{}", name)
    }
}

pub struct Party<S: KeyExchange> {
    role: Role,
    scheme: Arc<S>,
    state: PartyState,
    private_key: Option<S::PrivateKey>,
    public_key: Option<S::PublicKey>,
    peer_public_key: Option<S::PublicKey>,
    shared_secret: Option<S::SharedSecret>,
}

impl<S: KeyExchange> Party<S> {
    pub fn new(role: Role, scheme: Arc<S>) -> Self {
        Self {
            role,
            scheme,
            state: PartyState::Created,
            private_key: None,
            public_key: None,
            peer_public_key: None,
            shared_secret: None,
        }
    }

    fn expect_state(
        &self,
        operation: &'static str,
        required: PartyState,
    ) -> Result<(), MsidhError> {
        if self.state != required {
            return Err(MsidhError::OrderingViolation {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    pub fn generate_private_key<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), MsidhError> {
        self.expect_state("generate_private_key", PartyState::Created)?;
        let private_key = self.scheme.generate_private_key(self.role, rng)?;

        self.private_key = Some(private_key);
        self.state = PartyState::PrivateKeyGenerated;
        debug!("Party {}: private key generated", self.role);
        Ok(())
    }

    pub fn compute_public_key(&mut self) -> Result<&S::PublicKey, MsidhError> {
        self.expect_state("compute_public_key", PartyState::PrivateKeyGenerated)?;
        let private_key = self
            .private_key
            .as_ref()
            .ok_or_else(|| MsidhError::InvariantViolation("private key missing".to_string()))?;
        let public_key = self.scheme.compute_public_key(self.role, private_key)?;

        self.state = PartyState::PublicKeyComputed;
        debug!("Party {}: public key computed", self.role);
        Ok(self.public_key.insert(public_key))
    }

    /// Stores the peer's public key. Only accepted once the own public key exists.
    pub fn register_public_key(&mut self, peer_public_key: S::PublicKey) -> Result<(), MsidhError> {
        self.expect_state("register_public_key", PartyState::PublicKeyComputed)?;

        self.peer_public_key = Some(peer_public_key);
        self.state = PartyState::PeerKeyRegistered;
        debug!("Party {}: peer public key registered", self.role);
        Ok(())
    }

    /// On failure, including `PairingMismatch`, the party stays in
    /// `PeerKeyRegistered` without a secret.
    pub fn compute_shared_secret(&mut self) -> Result<&S::SharedSecret, MsidhError> {
        self.expect_state("compute_shared_secret", PartyState::PeerKeyRegistered)?;
        let (Some(private_key), Some(peer_public_key)) = (&self.private_key, &self.peer_public_key)
        else {
            return Err(MsidhError::InvariantViolation("key material missing".to_string()));
        };
        let secret = self
            .scheme
            .compute_shared_secret(self.role, private_key, peer_public_key)?;

        self.state = PartyState::SharedSecretComputed;
        debug!("Party {}: shared secret computed", self.role);
        Ok(self.shared_secret.insert(secret))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> PartyState {
        self.state
    }

    pub fn scheme(&self) -> &Arc<S> {
        &self.scheme
    }

    pub fn public_key(&self) -> Option<&S::PublicKey> {
        self.public_key.as_ref()
    }

    pub fn peer_public_key(&self) -> Option<&S::PublicKey> {
        self.peer_public_key.as_ref()
    }

    pub fn shared_secret(&self) -> Option<&S::SharedSecret> {
        self.shared_secret.as_ref()
    }

    pub fn describe(&self) -> String {
        format!(
            "Party {} ({}) using {}",
            self.role,
            self.state,
            self.scheme.describe_public_parameters()
        )
    }
}

impl<S: KeyExchange> std::fmt::Debug for Party<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Party")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("public_key", &self.public_key)
            .field("shared_secret", &self.shared_secret)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::ClassicDh;

    use num_bigint::BigUint;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pair() -> (Party<ClassicDh>, Party<ClassicDh>, StdRng) {
        let mut rng = StdRng::seed_from_u64(5);
        let scheme = Arc::new(ClassicDh::with_default_modulus(&mut rng).unwrap());
        (Party::new(Role::A, scheme.clone()), Party::new(Role::B, scheme), rng)
    }

    #[test]
    fn test_full_lifecycle() -> Result<(), MsidhError> {
        let (mut alice, mut bob, mut rng) = pair();
        alice.generate_private_key(&mut rng)?;
        bob.generate_private_key(&mut rng)?;
        let pk_a = alice.compute_public_key()?.clone();
        let pk_b = bob.compute_public_key()?.clone();
        alice.register_public_key(pk_b)?;
        bob.register_public_key(pk_a)?;

        let secret_a = alice.compute_shared_secret()?.clone();
        let secret_b = bob.compute_shared_secret()?.clone();
        assert_eq!(secret_a, secret_b);
        assert_eq!(alice.state(), PartyState::SharedSecretComputed);
        assert!(alice.describe().contains("7919"));
        Ok(())
    }

    #[test]
    fn test_out_of_order_calls_change_nothing() -> Result<(), MsidhError> {
        let (mut alice, _, mut rng) = pair();

        let result = alice.compute_public_key();
        assert!(matches!(
            result,
            Err(MsidhError::OrderingViolation {
                operation: "compute_public_key",
                state: PartyState::Created
            })
        ));
        assert_eq!(alice.state(), PartyState::Created);

        alice.generate_private_key(&mut rng)?;
        let result = alice.register_public_key(BigUint::from(3u32));
        assert!(matches!(result, Err(MsidhError::OrderingViolation { .. })));
        assert_eq!(alice.peer_public_key(), None);
        assert_eq!(alice.state(), PartyState::PrivateKeyGenerated);

        let result = alice.generate_private_key(&mut rng);
        assert!(matches!(result, Err(MsidhError::OrderingViolation { .. })));
        assert!(alice.compute_shared_secret().is_err());
        assert_eq!(alice.shared_secret(), None);
        Ok(())
    }

    #[test]
    fn test_failed_secret_keeps_state() -> Result<(), MsidhError> {
        let (mut alice, _, mut rng) = pair();
        alice.generate_private_key(&mut rng)?;
        alice.compute_public_key()?;
        // not reduced modulo 7919
        alice.register_public_key(BigUint::from(10_000u32))?;

        assert!(alice.compute_shared_secret().is_err());
        assert_eq!(alice.state(), PartyState::PeerKeyRegistered);
        assert_eq!(alice.shared_secret(), None);
        Ok(())
    }
}
