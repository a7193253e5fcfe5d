use crate::errors::{SimulatorError, SimulatorResult};
use crate::types::{Pauli, Precision};
use crate::Complex;
use num_traits::{One, Zero};
use qip_kernels::utils::{deposit_bits, extract_bits, get_flat_index, make_mask};

/// A dense `2^n x 2^n` unitary stored row-major. Bit `l` of a row or column index is the value of
/// the `l`th qubit the matrix is applied to.
#[derive(Clone, Debug, PartialEq)]
pub struct GateMatrix<P: Precision> {
    n: usize,
    data: Vec<Complex<P>>,
}

/// Make a vector of complex numbers whose reals are given by `data`
pub fn from_reals<P: Precision>(data: &[P]) -> Vec<Complex<P>> {
    data.iter().map(|x| Complex::new(*x, P::zero())).collect()
}

impl<P: Precision> GateMatrix<P> {
    /// Make a matrix over `n` qubits from `4^n` row-major entries.
    pub fn new(n: usize, data: Vec<Complex<P>>) -> SimulatorResult<Self> {
        let expected = 1 << (2 * n);
        if data.len() != expected {
            Err(SimulatorError::InvalidGate(format!(
                "matrix data has {} entries versus expected 2^(2*{})",
                data.len(),
                n
            )))
        } else {
            Ok(Self { n, data })
        }
    }

    /// Make a matrix from its rows.
    pub fn from_rows(rows: Vec<Vec<Complex<P>>>) -> SimulatorResult<Self> {
        let dim = rows.len();
        if !dim.is_power_of_two() || rows.iter().any(|row| row.len() != dim) {
            return Err(SimulatorError::InvalidGate(format!(
                "matrix must be square with a power of two side, found {} rows",
                dim
            )));
        }
        Self::new(
            dim.trailing_zeros() as usize,
            rows.into_iter().flatten().collect(),
        )
    }

    /// The identity over `n` qubits.
    pub fn identity(n: usize) -> Self {
        let dim = 1 << n;
        let data = (0..dim * dim)
            .map(|i| {
                if i / dim == i % dim {
                    Complex::one()
                } else {
                    Complex::zero()
                }
            })
            .collect();
        Self { n, data }
    }

    /// Pauli X.
    pub fn x() -> Self {
        Self {
            n: 1,
            data: from_reals(&[P::zero(), P::one(), P::one(), P::zero()]),
        }
    }

    /// Pauli Y.
    pub fn y() -> Self {
        let i = Complex::i();
        Self {
            n: 1,
            data: vec![Complex::zero(), -i, i, Complex::zero()],
        }
    }

    /// Pauli Z.
    pub fn z() -> Self {
        Self {
            n: 1,
            data: from_reals(&[P::one(), P::zero(), P::zero(), -P::one()]),
        }
    }

    /// The matrix for a Pauli operator.
    pub fn pauli(p: Pauli) -> Self {
        match p {
            Pauli::X => Self::x(),
            Pauli::Y => Self::y(),
            Pauli::Z => Self::z(),
        }
    }

    /// Hadamard.
    pub fn hadamard() -> Self {
        let h = P::one() / (P::one() + P::one()).sqrt();
        Self {
            n: 1,
            data: from_reals(&[h, h, h, -h]),
        }
    }

    /// Two qubit swap.
    pub fn swap() -> Self {
        let (o, l) = (P::zero(), P::one());
        Self {
            n: 2,
            data: from_reals(&[l, o, o, o, o, o, l, o, o, l, o, o, o, o, o, l]),
        }
    }

    /// Number of qubits the matrix acts on.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Side length, `2^n`.
    pub fn dim(&self) -> usize {
        1 << self.n
    }

    /// Row-major entries.
    pub fn data(&self) -> &[Complex<P>] {
        &self.data
    }

    /// Entry at `row`, `col`.
    pub fn get(&self, row: usize, col: usize) -> Complex<P> {
        self.data[get_flat_index(self.n, row, col)]
    }

    /// Extend the matrix with `num_controls` more significant qubits which must all be `|1>` for
    /// the original matrix to act. Every other control pattern sees the identity.
    pub fn with_controls(&self, num_controls: usize) -> Self {
        let n = self.n + num_controls;
        let dim = 1 << n;
        let offset = dim - self.dim();
        let mut controlled = Self::identity(n);
        (0..self.dim()).for_each(|row| {
            (0..self.dim()).for_each(|col| {
                controlled.data[get_flat_index(n, offset + row, offset + col)] = self.get(row, col);
            })
        });
        controlled
    }

    /// Replace `self` by `op * self`, where `op` acts on the local qubits at `positions`.
    pub(crate) fn left_multiply(&mut self, op: &GateMatrix<P>, positions: &[usize]) {
        debug_assert_eq!(op.n, positions.len());
        let dim = self.dim();
        let mask = make_mask(positions);
        let mut column = vec![Complex::zero(); dim];
        (0..dim).for_each(|col| {
            column
                .iter_mut()
                .enumerate()
                .for_each(|(row, c)| *c = self.data[get_flat_index(self.n, row, col)]);
            (0..dim).for_each(|row| {
                let op_row = extract_bits(row, positions);
                let base = row & !mask;
                self.data[get_flat_index(self.n, row, col)] = (0..op.dim())
                    .map(|j| column[base | deposit_bits(j, positions)] * op.get(op_row, j))
                    .sum();
            })
        });
    }

    /// Matrix product `self * other`.
    pub fn matmul(&self, other: &GateMatrix<P>) -> SimulatorResult<Self> {
        if self.n != other.n {
            return Err(SimulatorError::InvalidGate(format!(
                "cannot multiply a {}-qubit matrix with a {}-qubit matrix",
                self.n, other.n
            )));
        }
        let dim = self.dim();
        let data = (0..dim * dim)
            .map(|i| {
                let (row, col) = (i / dim, i % dim);
                (0..dim).map(|k| self.get(row, k) * other.get(k, col)).sum()
            })
            .collect();
        Ok(Self { n: self.n, data })
    }
}

#[cfg(test)]
mod matrix_tests {
    use super::*;

    #[test]
    fn test_with_controls_is_cnot() {
        let cx = GateMatrix::<f64>::x().with_controls(1);
        // Target is bit 0, control is bit 1.
        let expected = from_reals(&[
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, 0.0,
        ]);
        assert_eq!(cx.data(), expected.as_slice());
    }

    #[test]
    fn test_left_multiply_embeds() -> SimulatorResult<()> {
        // X on local qubit 1 of a two qubit identity is X (x) I in little endian order.
        let mut m = GateMatrix::<f64>::identity(2);
        m.left_multiply(&GateMatrix::x(), &[1]);
        assert_eq!(m.get(0, 2), Complex::one());
        assert_eq!(m.get(1, 3), Complex::one());
        assert_eq!(m.get(0, 0), Complex::zero());

        // Applying twice is the identity.
        m.left_multiply(&GateMatrix::x(), &[1]);
        assert_eq!(m, GateMatrix::identity(2));
        Ok(())
    }

    #[test]
    fn test_left_multiply_is_product() -> SimulatorResult<()> {
        let mut m = GateMatrix::<f64>::hadamard();
        m.left_multiply(&GateMatrix::z(), &[0]);
        assert_eq!(m, GateMatrix::z().matmul(&GateMatrix::hadamard())?);
        Ok(())
    }

    #[test]
    fn test_bad_shapes() {
        assert!(GateMatrix::<f64>::new(1, from_reals(&[1.0, 0.0, 0.0])).is_err());
        assert!(GateMatrix::<f64>::from_rows(vec![from_reals(&[1.0, 0.0])]).is_err());
        assert!(GateMatrix::<f64>::from_rows(vec![
            from_reals(&[1.0, 0.0]),
            from_reals(&[0.0, 1.0])
        ])
        .is_ok());
    }
}
