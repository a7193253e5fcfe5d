use crate::errors::{SimulatorError, SimulatorResult};
use crate::Complex;
use num_traits::{Float, NumAssign};
use std::fmt::{Debug, Display};
use std::iter::{Product, Sum};
use std::str::FromStr;

/// The float precision of the simulation.
pub trait Precision:
    Default + NumAssign + Float + Sum + Send + Sync + Display + Product + Debug
{
}

impl Precision for f64 {}

impl Precision for f32 {}

/// Convert an `f64` constant into the working precision.
#[inline]
pub(crate) fn cast<P: Precision>(x: f64) -> P {
    P::from(x).unwrap_or_else(P::zero)
}

/// A stable, client assigned qubit identifier.
pub type QubitId = usize;

/// The bit position of a qubit within the amplitude index.
pub type Slot = usize;

/// A single qubit Pauli operator.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pauli {
    /// Pauli X.
    X,
    /// Pauli Y.
    Y,
    /// Pauli Z.
    Z,
}

impl TryFrom<char> for Pauli {
    type Error = SimulatorError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c.to_ascii_uppercase() {
            'X' => Ok(Pauli::X),
            'Y' => Ok(Pauli::Y),
            'Z' => Ok(Pauli::Z),
            other => Err(SimulatorError::InvalidTermString(format!(
                "unknown Pauli operator {:?}",
                other
            ))),
        }
    }
}

/// A product of Pauli operators. Each entry is `(position, operator)`, where `position` indexes
/// the list of qubit ids the term is applied against. The empty term is the identity.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct PauliTerm(pub Vec<(usize, Pauli)>);

impl PauliTerm {
    /// The identity term.
    pub fn identity() -> Self {
        Self::default()
    }

    /// True if the term has no Pauli factors.
    pub fn is_identity(&self) -> bool {
        self.0.is_empty()
    }

    /// The factors of this term.
    pub fn factors(&self) -> &[(usize, Pauli)] {
        &self.0
    }

    /// Largest position referenced by the term, if any.
    pub fn max_position(&self) -> Option<usize> {
        self.0.iter().map(|(p, _)| *p).max()
    }
}

impl From<Vec<(usize, Pauli)>> for PauliTerm {
    fn from(factors: Vec<(usize, Pauli)>) -> Self {
        Self(factors)
    }
}

impl FromIterator<(usize, Pauli)> for PauliTerm {
    fn from_iter<It: IntoIterator<Item = (usize, Pauli)>>(it: It) -> Self {
        Self(it.into_iter().collect())
    }
}

/// Parse terms written as whitespace separated factors such as `"X0 Y1 Z3"`.
/// An empty string parses to the identity.
///
/// # Example
/// ```
/// use qip_sim::{Pauli, PauliTerm};
///
/// let term: PauliTerm = "X0 Z2".parse().unwrap();
/// assert_eq!(term.factors(), &[(0, Pauli::X), (2, Pauli::Z)]);
/// ```
impl FromStr for PauliTerm {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace()
            .map(|factor| -> SimulatorResult<(usize, Pauli)> {
                let mut chars = factor.chars();
                let op = chars
                    .next()
                    .ok_or_else(|| SimulatorError::InvalidTermString(factor.to_string()))
                    .and_then(Pauli::try_from)?;
                let position = chars
                    .as_str()
                    .parse::<usize>()
                    .map_err(|_| SimulatorError::InvalidTermString(factor.to_string()))?;
                Ok((position, op))
            })
            .collect::<SimulatorResult<Vec<_>>>()
            .map(PauliTerm)
    }
}

/// Weighted sum of Pauli terms with real coefficients.
pub type TermsDict<P> = Vec<(PauliTerm, P)>;

/// Weighted sum of Pauli terms with complex coefficients.
pub type ComplexTermsDict<P> = Vec<(PauliTerm, Complex<P>)>;
