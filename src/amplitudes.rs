#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::matrix::GateMatrix;
use crate::types::{Precision, Slot};
use crate::Complex;
use num_traits::{One, Zero};
use qip_kernels::utils::get_bit;
use qip_kernels::{apply_kernel, chunks, chunks_mut, into_iter, iter, iter_mut};

/// The dense amplitude vector over all allocated qubits. Bit `s` of an index is the value of the
/// qubit at slot `s`.
#[derive(Clone, Debug, PartialEq)]
pub struct AmplitudeStore<P: Precision> {
    state: Vec<Complex<P>>,
}

impl<P: Precision> Default for AmplitudeStore<P> {
    fn default() -> Self {
        Self {
            state: vec![Complex::one()],
        }
    }
}

impl<P: Precision> AmplitudeStore<P> {
    /// The zero qubit state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of amplitudes, `2^n`.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// The store always holds at least one amplitude.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of qubits represented.
    pub fn num_qubits(&self) -> usize {
        self.state.len().trailing_zeros() as usize
    }

    /// The raw amplitudes.
    pub fn amplitudes(&self) -> &[Complex<P>] {
        &self.state
    }

    /// Replace all amplitudes, `state` must be the same length.
    pub fn load(&mut self, state: &[Complex<P>]) {
        debug_assert_eq!(state.len(), self.state.len());
        iter_mut!(self.state)
            .zip(iter!(state))
            .for_each(|(dst, src)| *dst = *src);
    }

    /// Swap in a whole new vector of the same length, returning the old one.
    pub(crate) fn replace(&mut self, state: Vec<Complex<P>>) -> Vec<Complex<P>> {
        debug_assert_eq!(state.len(), self.state.len());
        std::mem::replace(&mut self.state, state)
    }

    /// Add a qubit at the next slot in `|0>`.
    pub fn grow(&mut self) {
        let len = self.state.len();
        self.state.resize(2 * len, Complex::zero());
    }

    /// Remove the qubit at `slot`, keeping the half of the state where it reads `value`.
    pub fn shrink_keep(&mut self, value: bool, slot: Slot) {
        let delta = 1 << slot;
        let offset = if value { delta } else { 0 };
        let mut shrunk = vec![Complex::zero(); self.state.len() / 2];
        chunks_mut!(shrunk, delta)
            .zip(chunks!(self.state, 2 * delta))
            .for_each(|(dst, src)| dst.copy_from_slice(&src[offset..offset + delta]));
        self.state = shrunk;
    }

    /// Total probability mass, 1 for a normalized state.
    pub fn norm_sqr(&self) -> P {
        iter!(self.state).map(|c| c.norm_sqr()).sum()
    }

    /// True if any amplitude where `slot` reads `value` has squared magnitude above `tol`.
    fn half_has_mass(&self, slot: Slot, value: bool, tol: P) -> bool {
        iter!(self.state)
            .enumerate()
            .any(|(i, c)| get_bit(i, slot) == value && c.norm_sqr() > tol)
    }

    /// True if the mass is concentrated in exactly one half for the qubit at `slot`.
    pub fn is_classical(&self, slot: Slot, tol: P) -> bool {
        self.half_has_mass(slot, false, tol) ^ self.half_has_mass(slot, true, tol)
    }

    /// The value of the qubit at `slot` for the first index (in pair order) carrying mass. Only
    /// meaningful if `is_classical` holds.
    pub fn classical_value(&self, slot: Slot, tol: P) -> bool {
        let delta = 1 << slot;
        self.state
            .chunks(2 * delta)
            .flat_map(|pair| {
                let (zero, one) = pair.split_at(delta);
                zero.iter().zip(one.iter())
            })
            .find_map(|(zero, one)| {
                if zero.norm_sqr() > tol {
                    Some(false)
                } else if one.norm_sqr() > tol {
                    Some(true)
                } else {
                    None
                }
            })
            .unwrap_or(false)
    }

    /// Probability mass on indices with `(i & mask) == value`.
    pub fn probability(&self, mask: usize, value: usize) -> P {
        iter!(self.state)
            .enumerate()
            .filter(|(i, _)| (i & mask) == value)
            .map(|(_, c)| c.norm_sqr())
            .sum()
    }

    /// Zero every amplitude inconsistent with `(i & mask) == value` and rescale the rest by
    /// `1/sqrt(mass)`.
    pub fn project(&mut self, mask: usize, value: usize, mass: P) {
        let scale = P::one() / mass.sqrt();
        iter_mut!(self.state).enumerate().for_each(|(i, c)| {
            if (i & mask) == value {
                *c = *c * scale;
            } else {
                *c = Complex::zero();
            }
        });
    }

    /// Index selected by walking the cumulative distribution until it exceeds `r`.
    pub fn sample_index(&self, r: P) -> usize {
        let mut cumulative = P::zero();
        let mut last_nonzero = 0;
        for (i, c) in self.state.iter().enumerate() {
            let p = c.norm_sqr();
            if p > P::zero() {
                last_nonzero = i;
            }
            cumulative += p;
            if cumulative > r {
                return i;
            }
        }
        // Rounding left the total just short of r.
        last_nonzero
    }

    /// Apply `matrix` to the qubits at `slots` wherever every bit of `ctrlmask` is set.
    pub fn apply(&mut self, matrix: &GateMatrix<P>, slots: &[Slot], ctrlmask: usize) {
        apply_kernel(&mut self.state, slots, matrix.data(), ctrlmask);
    }

    /// Move each amplitude at `i` to `f(i)`, summing collisions. Indices are computed in
    /// parallel, the scatter is serial.
    pub fn remap<F>(&mut self, f: F)
    where
        F: Fn(usize) -> usize + Send + Sync,
    {
        let destinations: Vec<usize> = into_iter!(0..self.state.len()).map(&f).collect();
        let mut remapped = vec![Complex::zero(); self.state.len()];
        destinations
            .into_iter()
            .zip(self.state.iter())
            .for_each(|(dst, c)| remapped[dst] += *c);
        self.state = remapped;
    }

    /// Real part of `<other|self>`.
    pub fn real_overlap(&self, other: &[Complex<P>]) -> P {
        iter!(self.state)
            .zip(iter!(other))
            .map(|(a, b)| (b.conj() * a).re)
            .sum()
    }
}
