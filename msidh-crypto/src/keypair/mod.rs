//! # Key Exchange
//!
//! The [`KeyExchange`] contract and its three implementations: plain modular
//! Diffie-Hellman ([`classic::ClassicDh`]), SIDH ([`isogeny::Sidh`]) and masked
//! SIDH ([`isogeny::MSidh`]).

pub mod classic;
pub mod isogeny;
pub mod keys;

use crate::errors::MsidhError;

use std::fmt::Debug;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use classic::ClassicDh;
pub use isogeny::{MSidh, Sidh};
pub use keys::{PrivateKey, PublicKey};

/// Which side of the exchange a party plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    A,
    B,
}

impl Role {
    pub fn peer(self) -> Role {
        match self {
            Role::A => Role::B,
            Role::B => Role::A,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::A => write!(f, "A"),
            Role::B => write!(f, "B"),
        }
    }
}

/// A two-party Diffie-Hellman style scheme.
///
/// Implementations are shared between the two parties of a round, so every method
/// takes the caller's [`Role`].
pub trait KeyExchange: Send + Sync {
    type PrivateKey: Send + Sync;
    type PublicKey: Clone + Debug + Serialize + Send + Sync;
    type SharedSecret: Clone + Debug + PartialEq + Send + Sync;

    fn generate_private_key<R: Rng + ?Sized>(
        &self,
        role: Role,
        rng: &mut R,
    ) -> Result<Self::PrivateKey, MsidhError>;

    fn compute_public_key(
        &self,
        role: Role,
        private_key: &Self::PrivateKey,
    ) -> Result<Self::PublicKey, MsidhError>;

    fn compute_shared_secret(
        &self,
        role: Role,
        private_key: &Self::PrivateKey,
        peer_public_key: &Self::PublicKey,
    ) -> Result<Self::SharedSecret, MsidhError>;

    /// Human readable summary of the public parameters.
    fn describe_public_parameters(&self) -> String;
}
