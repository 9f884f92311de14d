//! Error type shared by the commitment layers and the protocol.
//!
//! Only precondition violations are errors: malformed parameters, inputs of
//! the wrong shape, an unsatisfied witness handed to the prover, or an
//! exhausted randomness search.  A proof that fails to verify is not an
//! error; verification entry points return `bool` (or `None` from the
//! recomputation helpers) and log the reason at `debug` level.

use thiserror::Error;

/// Errors raised while configuring a scheme or producing a proof.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    /// Parameters violate a structural constraint (capacity, degree bounds, field size).
    Config(String),
    #[error("shape mismatch: {0}")]
    /// An input vector or matrix does not have the size the scheme was built for.
    Shape(String),
    #[error("witness does not satisfy the constraint system: {0}")]
    /// The prover was handed a witness that violates a constraint.
    UnsatisfiedWitness(String),
    #[error("no admissible opening challenge after {attempts} attempts")]
    /// The grinding search for a valid opening challenge hit its attempt cap.
    OpeningSearchExhausted {
        /// Number of nonces tried.
        attempts: u32,
    },
    #[error("evaluation queries stayed degenerate after {attempts} attempts")]
    /// Every sampled query set made the verifier's recovery system singular.
    DegenerateQueries {
        /// Number of proving attempts made.
        attempts: usize,
    },
    #[error("encoding error: {0}")]
    /// Hex or JSON decoding failure.
    Encoding(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
