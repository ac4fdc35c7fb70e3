use crate::params::validator::ValidationCheck;
use crate::party::PartyState;

#[derive(thiserror::Error, Debug)]
pub enum MsidhError {
    /// Parameters failed one of the ordered validation checks.
    #[error("InvalidParameter: {check} check failed: {detail}")]
    InvalidParameter {
        check: ValidationCheck,
        detail: String,
    },
    /// Caller supplied an input outside of the operation's domain.
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    #[error("GenerationTimeout: gave up after {attempts} attempts while {context}")]
    GenerationTimeout { attempts: usize, context: String },
    #[error(
        "Security margin t - n = {margin} is below the security parameter {security_parameter} (last t = {t})"
    )]
    InsufficientSecurityMargin {
        t: usize,
        margin: usize,
        security_parameter: u32,
    },
    #[error("No prime p = A*B*f - 1 found for any cofactor f <= {max_cofactor}")]
    NoPrimeFound { max_cofactor: u64 },
    #[error("Parameter search was cancelled")]
    Cancelled,

    /// A party operation was invoked out of the required order.
    #[error("OrderingViolation: cannot {operation} while the party is in state {state}")]
    OrderingViolation {
        operation: &'static str,
        state: PartyState,
    },
    /// The peer's public key failed the Weil pairing consistency check.
    #[error("PairingMismatch: {0}")]
    PairingMismatch(String),
    /// An internal postcondition failed; points at a provider contract violation.
    #[error("InvariantViolation: {0}")]
    InvariantViolation(String),

    #[error("Provider: {0}")]
    Provider(String),

    #[error("Data serialization: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Io: {0}")]
    Io(#[from] std::io::Error),
}
