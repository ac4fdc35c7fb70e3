//! Isogeny based key exchange: SIDH and its masked variant M-SIDH.
//!
//! Curve and field arithmetic are reached through [`provider::AlgebraProvider`];
//! [`provider::ReferenceProvider`] is a portable implementation for small parameters.

pub mod basis;
pub mod config;
pub mod errors;
pub mod exchange;
pub mod keypair;
pub mod mask;
pub mod params;
pub mod party;
pub mod preset;
pub mod provider;
pub mod ring;
