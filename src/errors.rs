use crate::types::QubitId;
use thiserror::Error;

/// An error raised by the simulator. Every variant is a precondition failure detected before the
/// amplitudes are touched, so the state is unchanged when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulatorError {
    /// Allocating an id which is already live.
    #[error("qubit id {0} already exists, qubit ids should be unique")]
    DuplicateId(QubitId),

    /// Operating on an id which is not currently allocated.
    #[error("unknown qubit id {0}")]
    UnknownId(QubitId),

    /// Deallocating a qubit which is not in a computational basis state.
    #[error("qubit {0} has not been measured or uncomputed")]
    NotClassical(QubitId),

    /// An id list which must be a permutation of all allocated qubits is not.
    #[error("qubit ids must be a permutation of all allocated qubits")]
    InvalidPermutation,

    /// Collapsing onto an outcome with vanishing probability.
    #[error("invalid collapse, probability of the requested outcome is ~0")]
    ZeroProbability,

    /// Amplitude count does not match the number of qubits.
    #[error("expected {expected} amplitudes, found {found}")]
    DimensionMismatch {
        /// Required number of amplitudes.
        expected: usize,
        /// Number supplied.
        found: usize,
    },

    /// A list of values does not line up with its list of qubit ids.
    #[error("expected {expected} values to match the qubit ids, found {found}")]
    LengthMismatch {
        /// Number of qubit ids.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },

    /// A gate matrix or its target/control lists are malformed.
    #[error("invalid gate: {0}")]
    InvalidGate(String),

    /// A Pauli term refers to a position outside the supplied qubit ids.
    #[error("operator acts on position {index} but only {available} qubits were supplied")]
    InvalidTerm {
        /// Position referenced by the term.
        index: usize,
        /// Number of qubit ids supplied.
        available: usize,
    },

    /// A Pauli term could not be parsed.
    #[error("could not parse Pauli term: {0}")]
    InvalidTermString(String),

    /// The simulator configuration is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A result which may contain a simulator error.
pub type SimulatorResult<T> = Result<T, SimulatorError>;
