//! Search bounds and switches threaded through parameter generation.

use crate::errors::MsidhError;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Tunables for the factory, basis generator and validator.
///
/// Every field has a default, so a partial JSON document deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Prove supersingularity instead of the probabilistic test.
    pub proof: bool,
    /// Tolerance `c` of the magnitude band `[√p / c, c·√p]`.
    pub magnitude_tolerance: u64,
    /// Only accept primes with `p ≡ 3 mod 4`.
    pub require_p_3_mod_4: bool,
    pub max_margin_retries: usize,
    pub max_cofactor: u64,
    pub max_basis_attempts: usize,
    /// Repair attempts per prime power before `Q` is resampled.
    pub basis_repair_attempts: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            proof: false,
            magnitude_tolerance: 1000,
            require_p_3_mod_4: true,
            max_margin_retries: 64,
            max_cofactor: 100_000,
            max_basis_attempts: 10_000,
            basis_repair_attempts: 8,
        }
    }
}

/// Shared cancellation flag with an optional deadline.
///
/// Clones observe the same flag, so one handle can stop a search running on
/// another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Called once per search iteration.
    ///
    /// # Errors
    ///
    /// `MsidhError::Cancelled` after [`cancel`](Self::cancel) and
    /// `MsidhError::GenerationTimeout` once the deadline has passed.
    pub fn checkpoint(&self, attempts: usize, context: &str) -> Result<(), MsidhError> {
        if self.is_cancelled() {
            return Err(MsidhError::Cancelled);
        }
        if self.is_expired() {
            return Err(MsidhError::GenerationTimeout {
                attempts,
                context: format!("{} (deadline reached)", context),
            });
        }
        Ok(())
    }
}
