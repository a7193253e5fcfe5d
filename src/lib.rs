#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    missing_docs
)]

//! A state-vector engine for streaming quantum circuit simulation.
//!
//! Gates arrive one at a time through [`Simulator::apply_controlled_gate`] and are buffered,
//! fused into a single matrix over at most five qubits, and dispatched to a dense kernel in one
//! pass over the amplitudes. Anything that needs concrete amplitudes (measurement, probability
//! queries, operator algebra) flushes the buffer first.
//!
//! # Example (Bell pair)
//! ```
//! use qip_sim::prelude::*;
//!
//! # fn main() -> SimulatorResult<()> {
//! let config = SimulatorConfig::default().with_seed(7);
//! let mut sim = Simulator::<f64>::with_config(config)?;
//! sim.allocate_qubit(0)?;
//! sim.allocate_qubit(1)?;
//!
//! sim.apply_controlled_gate(&GateMatrix::hadamard(), &[0], &[])?;
//! sim.apply_controlled_gate(&GateMatrix::x(), &[1], &[0])?;
//!
//! // Both qubits always agree.
//! let measured = sim.measure_qubits(&[0, 1])?;
//! assert_eq!(measured[0], measured[1]);
//! # Ok(())
//! # }
//! ```
//!
//! # Operators
//! Pauli strings are written against positions in the id list handed to each call.
//! ```
//! use qip_sim::prelude::*;
//!
//! # fn main() -> SimulatorResult<()> {
//! let mut sim = Simulator::<f64>::new();
//! sim.allocate_qubit(10)?;
//! sim.allocate_qubit(20)?;
//! sim.apply_controlled_gate(&GateMatrix::x(), &[20], &[])?;
//!
//! // <Z_10> + 0.5 <Z_20> on |0>|1>
//! let terms = vec![("Z0".parse::<PauliTerm>()?, 1.0), ("Z1".parse()?, 0.5)];
//! let e = sim.get_expectation_value(&terms, &[10, 20])?;
//! assert!((e - 0.5).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```

/// The dense amplitude vector.
pub mod amplitudes;
/// Simulator configuration.
pub mod config;
/// Simulator error types.
pub mod errors;
/// Buffering and fusion of controlled gates.
pub mod fusion;
/// Mapping between qubit ids and bit positions.
pub mod index_map;
/// Dense gate matrices.
pub mod matrix;
/// The simulator engine.
pub mod simulator;
/// Reusable types.
pub mod types;

pub use config::SimulatorConfig;
pub use errors::{SimulatorError, SimulatorResult};
pub use matrix::GateMatrix;
pub use num_complex::Complex;
pub use simulator::Simulator;
pub use types::*;

/// Commonly used types and traits.
/// ```
/// use qip_sim::prelude::*;
/// ```
pub mod prelude {
    pub use super::*;
    pub use crate::fusion::{FusedGate, FusionBuffer};
    pub use crate::index_map::QubitIndexMap;
    pub use crate::matrix::from_reals;
    pub use crate::simulator::DEFAULT_TOLERANCE;
}
