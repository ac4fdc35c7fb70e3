//! # Exchange
//!
//! Drives two [`Party`] instances through a full round. Key generation and secret
//! derivation run on one scoped thread per party; the public-key swap through the
//! [`Channel`] is the only synchronisation point.

use crate::errors::MsidhError;
use crate::keypair::{KeyExchange, Role};
use crate::party::Party;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;

/// Records what the parties sent to each other.
#[derive(Debug, Clone)]
pub struct Channel<M> {
    to_a: Vec<M>,
    to_b: Vec<M>,
    bytes: usize,
}

impl<M: Clone + Serialize> Channel<M> {
    pub fn new() -> Self {
        Self {
            to_a: Vec::new(),
            to_b: Vec::new(),
            bytes: 0,
        }
    }

    /// Delivers `message` to `to` and accounts its JSON encoding.
    pub fn transmit<S>(&mut self, to: &mut Party<S>, message: M) -> Result<(), MsidhError>
    where
        S: KeyExchange<PublicKey = M>,
    {
        let size = serde_json::to_vec(&message)?.len();
        to.register_public_key(message.clone())?;

        self.bytes += size;
        match to.role() {
            Role::A => self.to_a.push(message),
            Role::B => self.to_b.push(message),
        }
        debug!("Transmitted {} bytes to party {}", size, to.role());
        Ok(())
    }

    pub fn messages_to(&self, role: Role) -> &[M] {
        match role {
            Role::A => &self.to_a,
            Role::B => &self.to_b,
        }
    }

    pub fn message_count(&self) -> usize {
        self.to_a.len() + self.to_b.len()
    }

    pub fn byte_count(&self) -> usize {
        self.bytes
    }
}

impl<M: Clone + Serialize> Default for Channel<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock time of each phase, measured on the slower party.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseTimings {
    pub key_generation: Duration,
    pub exchange: Duration,
    pub shared_secret: Duration,
    pub total: Duration,
}

pub struct RoundReport<S: KeyExchange> {
    pub success: bool,
    pub secrets: (S::SharedSecret, S::SharedSecret),
    pub timings: PhaseTimings,
    pub messages: usize,
    pub bytes: usize,
}

impl<S: KeyExchange> std::fmt::Debug for RoundReport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundReport")
            .field("success", &self.success)
            .field("secrets", &self.secrets)
            .field("timings", &self.timings)
            .field("messages", &self.messages)
            .field("bytes", &self.bytes)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundStatistics {
    pub rounds: usize,
    pub failures: usize,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    pub bytes_per_round: usize,
}

impl std::fmt::Display for RoundStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rounds, {} failures, mean {:?}, min {:?}, max {:?}, {} bytes per round",
            self.rounds, self.failures, self.mean, self.min, self.max, self.bytes_per_round
        )
    }
}

pub struct ExchangeOrchestrator<S: KeyExchange> {
    scheme: Arc<S>,
}

impl<S: KeyExchange> ExchangeOrchestrator<S> {
    pub fn new(scheme: Arc<S>) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &Arc<S> {
        &self.scheme
    }

    /// Runs one complete exchange between fresh parties.
    ///
    /// # Errors
    ///
    /// Any error raised by either party, `PairingMismatch` included, aborts the round.
    pub fn run_round(&self) -> Result<RoundReport<S>, MsidhError> {
        let started = Instant::now();
        let mut alice = Party::new(Role::A, self.scheme.clone());
        let mut bob = Party::new(Role::B, self.scheme.clone());

        let (pk_a, pk_b, key_generation) = thread::scope(|scope| {
            let a = scope.spawn(|| key_pair(&mut alice));
            let b = scope.spawn(|| key_pair(&mut bob));
            let (pk_a, time_a) = join(a)??;
            let (pk_b, time_b) = join(b)??;
            Ok::<_, MsidhError>((pk_a, pk_b, time_a.max(time_b)))
        })?;

        let exchange_started = Instant::now();
        let mut channel = Channel::new();
        channel.transmit(&mut bob, pk_a)?;
        channel.transmit(&mut alice, pk_b)?;
        let exchange = exchange_started.elapsed();

        let (secret_a, secret_b, shared_secret) = thread::scope(|scope| {
            let a = scope.spawn(|| shared_secret(&mut alice));
            let b = scope.spawn(|| shared_secret(&mut bob));
            let (secret_a, time_a) = join(a)??;
            let (secret_b, time_b) = join(b)??;
            Ok::<_, MsidhError>((secret_a, secret_b, time_a.max(time_b)))
        })?;

        let success = secret_a == secret_b;
        if !success {
            warn!("Shared secrets differ: {:?} vs {:?}", secret_a, secret_b);
        }

        Ok(RoundReport {
            success,
            secrets: (secret_a, secret_b),
            timings: PhaseTimings {
                key_generation,
                exchange,
                shared_secret,
                total: started.elapsed(),
            },
            messages: channel.message_count(),
            bytes: channel.byte_count(),
        })
    }

    /// Runs `rounds` rounds and aggregates their timings.
    pub fn run_rounds(&self, rounds: usize) -> Result<RoundStatistics, MsidhError> {
        if rounds == 0 {
            return Err(MsidhError::InvalidArgument("At least one round is required".to_string()));
        }

        let reports = (1..=rounds)
            .map(|round| {
                let report = self.run_round()?;
                info!(
                    "Round {}/{}: {} in {:?}",
                    round,
                    rounds,
                    if report.success { "agreed" } else { "disagreed" },
                    report.timings.total
                );
                Ok(report)
            })
            .collect::<Result<Vec<_>, MsidhError>>()?;

        let totals = reports.iter().map(|r| r.timings.total).collect_vec();
        let (min, max) = totals
            .iter()
            .copied()
            .minmax()
            .into_option()
            .unwrap_or_default();
        let sum: Duration = totals.iter().sum();

        Ok(RoundStatistics {
            rounds,
            failures: reports.iter().filter(|r| !r.success).count(),
            mean: mean_duration(sum, rounds),
            min,
            max,
            bytes_per_round: reports[0].bytes,
        })
    }
}

/// `sum / rounds` without narrowing `rounds` to `u32`.
fn mean_duration(sum: Duration, rounds: usize) -> Duration {
    sum.div_f64(rounds as f64)
}

fn key_pair<S: KeyExchange>(party: &mut Party<S>) -> Result<(S::PublicKey, Duration), MsidhError> {
    let started = Instant::now();
    let mut rng = rand::rng();
    party.generate_private_key(&mut rng)?;
    let public_key = party.compute_public_key()?.clone();
    Ok((public_key, started.elapsed()))
}

fn shared_secret<S: KeyExchange>(
    party: &mut Party<S>,
) -> Result<(S::SharedSecret, Duration), MsidhError> {
    let started = Instant::now();
    let secret = party.compute_shared_secret()?.clone();
    Ok((secret, started.elapsed()))
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> Result<T, MsidhError> {
    handle
        .join()
        .map_err(|_| MsidhError::InvariantViolation("party worker panicked".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::ClassicDh;

    use num_bigint::BigUint;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn classic() -> Arc<ClassicDh> {
        Arc::new(ClassicDh::with_default_modulus(&mut StdRng::seed_from_u64(9)).unwrap())
    }

    #[test]
    fn test_classic_round() -> Result<(), MsidhError> {
        let orchestrator = ExchangeOrchestrator::new(classic());
        let report = orchestrator.run_round()?;

        assert!(report.success);
        assert_eq!(report.secrets.0, report.secrets.1);
        assert_eq!(report.messages, 2);
        assert!(report.bytes > 0);
        assert!(report.timings.total >= report.timings.key_generation);
        Ok(())
    }

    #[test]
    fn test_statistics() -> Result<(), MsidhError> {
        let orchestrator = ExchangeOrchestrator::new(classic());
        let stats = orchestrator.run_rounds(4)?;

        assert_eq!(stats.rounds, 4);
        assert_eq!(stats.failures, 0);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
        assert!(matches!(orchestrator.run_rounds(0), Err(MsidhError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn test_mean_past_u32_rounds() {
        let rounds = 1usize << 33;
        assert_eq!(mean_duration(Duration::from_secs(1 << 33), rounds), Duration::from_secs(1));
        assert_eq!(mean_duration(Duration::from_secs(10), 4), Duration::from_millis(2500));
    }

    #[test]
    fn test_channel_accounting() -> Result<(), MsidhError> {
        let scheme = classic();
        let mut rng = StdRng::seed_from_u64(10);
        let mut bob = Party::new(Role::B, scheme);
        bob.generate_private_key(&mut rng)?;
        bob.compute_public_key()?;

        let mut channel = Channel::new();
        channel.transmit(&mut bob, BigUint::from(1234u32))?;

        assert_eq!(channel.message_count(), 1);
        assert_eq!(channel.messages_to(Role::B), &[BigUint::from(1234u32)]);
        assert!(channel.messages_to(Role::A).is_empty());
        assert_eq!(channel.byte_count(), serde_json::to_vec(&BigUint::from(1234u32))?.len());

        // a second delivery is out of order
        assert!(channel.transmit(&mut bob, BigUint::from(1u32)).is_err());
        assert_eq!(channel.message_count(), 1);
        Ok(())
    }
}
