#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::amplitudes::AmplitudeStore;
use crate::config::SimulatorConfig;
use crate::errors::{SimulatorError, SimulatorResult};
use crate::fusion::FusionBuffer;
use crate::index_map::QubitIndexMap;
use crate::matrix::GateMatrix;
use crate::types::{cast, ComplexTermsDict, PauliTerm, Precision, QubitId, Slot, TermsDict};
use crate::Complex;
use log::{debug, trace};
use num_traits::{ToPrimitive, Zero};
use qip_kernels::utils::{deposit_bits, extract_bits, get_bit, make_mask};
use qip_kernels::{iter, iter_mut, MAX_KERNEL_WIDTH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Squared magnitude below which an amplitude counts as empty.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Power series terms are added until their norm falls to this.
const SERIES_TOLERANCE: f64 = 1e-12;

/// A state-vector simulator which buffers gates and fuses them into wider dispatches.
///
/// ```
/// use qip_sim::{GateMatrix, Simulator};
///
/// let mut sim = Simulator::<f64>::new();
/// sim.allocate_qubit(0)?;
/// sim.allocate_qubit(1)?;
/// sim.apply_controlled_gate(&GateMatrix::hadamard(), &[0], &[])?;
/// sim.apply_controlled_gate(&GateMatrix::x(), &[1], &[0])?;
/// let p = sim.get_probability(&[true], &[1])?;
/// assert!((p - 0.5).abs() < 1e-12);
/// # Ok::<(), qip_sim::SimulatorError>(())
/// ```
#[derive(Debug)]
pub struct Simulator<P: Precision = f64> {
    map: QubitIndexMap,
    store: AmplitudeStore<P>,
    fused: FusionBuffer<P>,
    config: SimulatorConfig,
    rng: StdRng,
}

impl<P: Precision> Default for Simulator<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Precision> Simulator<P> {
    /// A simulator with no qubits, the default configuration and an entropy seeded rng.
    pub fn new() -> Self {
        Self::build(SimulatorConfig::default())
    }

    /// A simulator with no qubits using `config`.
    pub fn with_config(config: SimulatorConfig) -> SimulatorResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            map: QubitIndexMap::new(),
            store: AmplitudeStore::new(),
            fused: FusionBuffer::new(),
            config,
            rng,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Number of allocated qubits.
    pub fn num_qubits(&self) -> usize {
        self.map.len()
    }

    /// True if `id` is currently allocated.
    pub fn is_allocated(&self, id: QubitId) -> bool {
        self.map.contains(id)
    }

    /// Number of gates waiting in the fusion buffer.
    pub fn pending_gates(&self) -> usize {
        self.fused.len()
    }

    /// Sum of squared magnitudes of the stored amplitudes. Pending gates are unitary and would not
    /// change it.
    pub fn state_norm(&self) -> P {
        self.store.norm_sqr()
    }

    /// Add qubit `id` in `|0>`.
    pub fn allocate_qubit(&mut self, id: QubitId) -> SimulatorResult<()> {
        let slot = self.map.allocate(id)?;
        self.store.grow();
        debug!("allocated qubit {} at slot {}", id, slot);
        Ok(())
    }

    /// Remove qubit `id`, which must be in a computational basis state.
    pub fn deallocate_qubit(&mut self, id: QubitId) -> SimulatorResult<()> {
        self.run()?;
        let slot = self.map.slot(id)?;
        let tol = cast(DEFAULT_TOLERANCE);
        if !self.store.is_classical(slot, tol) {
            return Err(SimulatorError::NotClassical(id));
        }
        let value = self.store.classical_value(slot, tol);
        self.store.shrink_keep(value, slot);
        self.map.deallocate(id)?;
        debug!("deallocated qubit {} from slot {} reading {}", id, slot, value);
        Ok(())
    }

    /// The value of a qubit in a computational basis state.
    pub fn get_classical_value(&mut self, id: QubitId) -> SimulatorResult<bool> {
        self.get_classical_value_within(id, cast(DEFAULT_TOLERANCE))
    }

    /// As `get_classical_value` with an explicit tolerance on squared magnitudes.
    pub fn get_classical_value_within(&mut self, id: QubitId, tol: P) -> SimulatorResult<bool> {
        self.run()?;
        let slot = self.map.slot(id)?;
        Ok(self.store.classical_value(slot, tol))
    }

    /// True if the qubit's probability mass sits entirely in one basis state.
    pub fn is_classical(&mut self, id: QubitId) -> SimulatorResult<bool> {
        self.is_classical_within(id, cast(DEFAULT_TOLERANCE))
    }

    /// As `is_classical` with an explicit tolerance on squared magnitudes.
    pub fn is_classical_within(&mut self, id: QubitId, tol: P) -> SimulatorResult<bool> {
        self.run()?;
        let slot = self.map.slot(id)?;
        Ok(self.store.is_classical(slot, tol))
    }

    /// Measure each of `ids` in the computational basis, collapsing the state onto the outcome.
    pub fn measure_qubits(&mut self, ids: &[QubitId]) -> SimulatorResult<Vec<bool>> {
        self.run()?;
        let slots = self.map.slots_of(ids)?;
        let r = cast(self.rng.gen::<f64>());
        let pick = self.store.sample_index(r);

        let results: Vec<bool> = slots.iter().map(|slot| get_bit(pick, *slot)).collect();
        let mask = make_mask(&slots);
        let value = pick & mask;
        let mass = self.store.probability(mask, value);
        if mass <= P::zero() {
            return Err(SimulatorError::ZeroProbability);
        }
        self.store.project(mask, value, mass);
        Ok(results)
    }

    /// Queue `matrix` on `targets`, applied where every qubit in `controls` is `|1>`.
    ///
    /// Bit `l` of the matrix row/column index is the value of `targets[l]`.
    pub fn apply_controlled_gate(
        &mut self,
        matrix: &GateMatrix<P>,
        targets: &[QubitId],
        controls: &[QubitId],
    ) -> SimulatorResult<()> {
        self.check_gate(matrix, targets, controls)?;
        if !self.config.gate_fusion {
            self.fused.insert(matrix.clone(), targets, controls);
            return self.run();
        }

        let mut candidate = self.fused.clone();
        candidate.insert(matrix.clone(), targets, controls);
        let width = candidate.num_qubits();
        let min = self.config.fusion_qubits_min;
        let max = self.config.fusion_qubits_max;
        if width >= min && width <= max {
            self.fused = candidate;
            self.run()
        } else if width > max || width.saturating_sub(targets.len()) > self.fused.num_qubits() {
            self.run()?;
            self.fused.insert(matrix.clone(), targets, controls);
            Ok(())
        } else {
            self.fused = candidate;
            Ok(())
        }
    }

    fn check_gate(
        &self,
        matrix: &GateMatrix<P>,
        targets: &[QubitId],
        controls: &[QubitId],
    ) -> SimulatorResult<()> {
        if targets.is_empty() || targets.len() > MAX_KERNEL_WIDTH {
            return Err(SimulatorError::InvalidGate(format!(
                "gates must act on 1 to {} qubits, found {}",
                MAX_KERNEL_WIDTH,
                targets.len()
            )));
        }
        if matrix.n() != targets.len() {
            return Err(SimulatorError::InvalidGate(format!(
                "matrix acts on {} qubits but {} targets were given",
                matrix.n(),
                targets.len()
            )));
        }
        self.map.mask_of(targets)?;
        self.map.mask_of(controls)?;
        let mut seen = BTreeSet::new();
        match targets.iter().chain(controls).find(|id| !seen.insert(**id)) {
            Some(id) => Err(SimulatorError::InvalidGate(format!(
                "qubit {} appears more than once in the targets and controls",
                id
            ))),
            None => Ok(()),
        }
    }

    /// Dispatch everything in the fusion buffer.
    pub fn run(&mut self) -> SimulatorResult<()> {
        if let Some(fused) = self.fused.perform_fusion() {
            let slots = self.map.slots_of(&fused.targets)?;
            let ctrlmask = self.map.mask_of(&fused.controls)?;
            trace!(
                "dispatching {} fused gates over {} qubits with {} controls",
                self.fused.len(),
                slots.len(),
                fused.controls.len()
            );
            self.store.apply(&fused.matrix, &slots, ctrlmask);
        }
        self.fused.clear();
        Ok(())
    }

    /// Apply a classical function to the integers held in `quregs`. Each register is read little
    /// endian (its first id is the least significant bit), `f` receives one value per register and
    /// overwrites them in place. Only basis states where every qubit in `controls` is `|1>` are
    /// transformed. `f` should be a bijection on the values it sees.
    ///
    /// With the `parallel` feature, `parallelism_hint` runs the remap on a pool of that many
    /// threads.
    pub fn emulate_math<F>(
        &mut self,
        f: F,
        quregs: &[Vec<QubitId>],
        controls: &[QubitId],
        parallelism_hint: Option<usize>,
    ) -> SimulatorResult<()>
    where
        F: Fn(&mut [usize]) + Send + Sync,
    {
        self.run()?;
        let ctrlmask = self.map.mask_of(controls)?;
        let registers = quregs
            .iter()
            .map(|reg| self.map.slots_of(reg))
            .collect::<SimulatorResult<Vec<_>>>()?;

        let remap = |i: usize| -> usize {
            if i & ctrlmask != ctrlmask {
                return i;
            }
            let mut values: SmallVec<[usize; 4]> = registers
                .iter()
                .map(|slots| extract_bits(i, slots))
                .collect();
            f(values.as_mut_slice());
            registers
                .iter()
                .zip(values.iter())
                .fold(i, |acc, (slots, value)| {
                    let width_mask = (1usize << slots.len()) - 1;
                    (acc & !make_mask(slots)) | deposit_bits(value & width_mask, slots)
                })
        };

        match parallelism_hint {
            #[cfg(feature = "parallel")]
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => {
                    let store = &mut self.store;
                    pool.install(|| store.remap(remap))
                }
                Err(err) => {
                    log::warn!(
                        "could not build a pool of {} threads, using the global pool: {}",
                        threads, err
                    );
                    self.store.remap(remap)
                }
            },
            _ => self.store.remap(remap),
        }
        Ok(())
    }

    fn check_terms<'a, It>(terms: It, available: usize) -> SimulatorResult<()>
    where
        It: IntoIterator<Item = &'a PauliTerm>,
    {
        match terms
            .into_iter()
            .filter_map(PauliTerm::max_position)
            .find(|index| *index >= available)
        {
            Some(index) => Err(SimulatorError::InvalidTerm { index, available }),
            None => Ok(()),
        }
    }

    /// Apply each Pauli factor of `term` directly to the store. Positions must already be checked
    /// against `slots`.
    fn apply_term(&mut self, term: &PauliTerm, slots: &[Slot]) {
        term.factors().iter().for_each(|(position, pauli)| {
            self.store
                .apply(&GateMatrix::pauli(*pauli), &[slots[*position]], 0)
        });
    }

    /// `<psi| H |psi>` for `H` the weighted sum of Pauli terms over `ids`.
    pub fn get_expectation_value(
        &mut self,
        terms: &TermsDict<P>,
        ids: &[QubitId],
    ) -> SimulatorResult<P> {
        self.run()?;
        let slots = self.map.slots_of(ids)?;
        Self::check_terms(terms.iter().map(|(term, _)| term), ids.len())?;

        let original = self.store.amplitudes().to_vec();
        let mut expectation = P::zero();
        for (term, coeff) in terms {
            self.apply_term(term, &slots);
            expectation += *coeff * self.store.real_overlap(&original);
            self.store.load(&original);
        }
        Ok(expectation)
    }

    /// Replace the state by `sum_j c_j P_j |psi>`. The result is not renormalized.
    pub fn apply_qubit_operator(
        &mut self,
        terms: &ComplexTermsDict<P>,
        ids: &[QubitId],
    ) -> SimulatorResult<()> {
        self.run()?;
        let slots = self.map.slots_of(ids)?;
        Self::check_terms(terms.iter().map(|(term, _)| term), ids.len())?;

        let original = self.store.amplitudes().to_vec();
        let mut output = vec![Complex::zero(); original.len()];
        for (term, coeff) in terms {
            self.apply_term(term, &slots);
            iter_mut!(output)
                .zip(iter!(self.store.amplitudes()))
                .for_each(|(out, amp)| *out += *coeff * amp);
            self.store.load(&original);
        }
        self.store.replace(output);
        Ok(())
    }

    /// Approximate `exp(-i time H)` for `H` the weighted sum of Pauli terms over `ids`, applied
    /// where every qubit in `controls` is `|1>`.
    ///
    /// The evolution is split into `floor(|time| * sum|c_j| + 1)` steps, each expanded as a power
    /// series until the added term is negligible. Identity terms only contribute a phase.
    pub fn emulate_time_evolution(
        &mut self,
        terms: &TermsDict<P>,
        time: P,
        ids: &[QubitId],
        controls: &[QubitId],
    ) -> SimulatorResult<()> {
        self.run()?;
        let slots = self.map.slots_of(ids)?;
        let ctrlmask = self.map.mask_of(controls)?;
        Self::check_terms(terms.iter().map(|(term, _)| term), ids.len())?;

        let (identity, hamiltonian): (Vec<_>, Vec<_>) =
            terms.iter().partition(|(term, _)| term.is_identity());
        let trace = identity
            .iter()
            .fold(P::zero(), |acc, (_, coeff)| acc + *coeff);
        let op_norm = hamiltonian
            .iter()
            .fold(P::zero(), |acc, (_, coeff)| acc + coeff.abs());
        let steps = (time.abs() * op_norm + P::one()).to_usize().unwrap_or(1);
        let s: P = cast(steps as f64);
        let minus_i_t = Complex::new(P::zero(), -time);
        let correction = (minus_i_t * trace / s).exp();
        let tol: P = cast(SERIES_TOLERANCE);
        debug!(
            "time evolution over {} terms in {} steps",
            hamiltonian.len(),
            steps
        );

        let satisfied = |i: usize| i & ctrlmask == ctrlmask;
        let mut output = self.store.amplitudes().to_vec();
        for _ in 0..steps {
            let mut k = 0usize;
            let mut norm_change = P::one();
            while norm_change > tol {
                let coeff = minus_i_t / (s * cast((k + 1) as f64));
                let current = self.store.amplitudes().to_vec();
                let mut update = vec![Complex::zero(); current.len()];
                for (term, weight) in &hamiltonian {
                    self.apply_term(term, &slots);
                    iter_mut!(update)
                        .zip(iter!(self.store.amplitudes()))
                        .for_each(|(u, amp)| *u += *amp * *weight);
                    self.store.load(&current);
                }
                iter_mut!(update).for_each(|u| *u = *u * coeff);
                iter_mut!(output)
                    .zip(iter!(update))
                    .enumerate()
                    .filter(|(i, _)| satisfied(*i))
                    .for_each(|(_, (out, u))| *out += *u);
                norm_change = iter!(update)
                    .enumerate()
                    .filter(|(i, _)| satisfied(*i))
                    .map(|(_, u)| u.norm_sqr())
                    .sum::<P>()
                    .sqrt();
                self.store.load(&update);
                k += 1;
            }
            iter_mut!(output)
                .enumerate()
                .filter(|(i, _)| satisfied(*i))
                .for_each(|(_, out)| *out = *out * correction);
            self.store.load(&output);
        }
        Ok(())
    }

    /// Probability that each of `ids` reads the matching entry of `bits`.
    pub fn get_probability(&mut self, bits: &[bool], ids: &[QubitId]) -> SimulatorResult<P> {
        self.run()?;
        let (mask, value) = self.mask_and_value(bits, ids)?;
        Ok(self.store.probability(mask, value))
    }

    /// The amplitude of the basis state where each of `ids` reads the matching entry of `bits`.
    /// `ids` must name every allocated qubit exactly once.
    pub fn get_amplitude(&mut self, bits: &[bool], ids: &[QubitId]) -> SimulatorResult<Complex<P>> {
        self.run()?;
        if bits.len() != ids.len() {
            return Err(SimulatorError::LengthMismatch {
                expected: ids.len(),
                found: bits.len(),
            });
        }
        if !self.map.is_permutation(ids) {
            return Err(SimulatorError::InvalidPermutation);
        }
        let (_, index) = self.mask_and_value(bits, ids)?;
        self.store
            .amplitudes()
            .get(index)
            .copied()
            .ok_or(SimulatorError::InvalidPermutation)
    }

    /// Overwrite the state. `ordering[i]` is placed at slot `i`, so bit `i` of an index into
    /// `amplitudes` is the value of qubit `ordering[i]`.
    pub fn set_wavefunction(
        &mut self,
        amplitudes: &[Complex<P>],
        ordering: &[QubitId],
    ) -> SimulatorResult<()> {
        self.run()?;
        let expected = u32::try_from(ordering.len())
            .ok()
            .and_then(|n| 1usize.checked_shl(n));
        if expected != Some(amplitudes.len()) {
            return Err(SimulatorError::DimensionMismatch {
                expected: expected.unwrap_or(usize::MAX),
                found: amplitudes.len(),
            });
        }
        self.map.reorder(ordering)?;
        self.store.load(amplitudes);
        debug!("loaded {} amplitudes", amplitudes.len());
        Ok(())
    }

    /// Project onto the outcome where each of `ids` reads the matching entry of `values`, then
    /// renormalize.
    pub fn collapse_wavefunction(&mut self, ids: &[QubitId], values: &[bool]) -> SimulatorResult<()> {
        self.run()?;
        let (mask, value) = self.mask_and_value(values, ids)?;
        let mass = self.store.probability(mask, value);
        if mass < cast(DEFAULT_TOLERANCE) {
            return Err(SimulatorError::ZeroProbability);
        }
        self.store.project(mask, value, mass);
        Ok(())
    }

    /// Flush and expose the id to slot map alongside the raw amplitudes.
    pub fn cheat(&mut self) -> SimulatorResult<(BTreeMap<QubitId, Slot>, &[Complex<P>])> {
        self.run()?;
        Ok((self.map.to_map(), self.store.amplitudes()))
    }

    /// Exchange the slots of two qubits, permuting the amplitudes to match. The logical state is
    /// unchanged.
    pub fn swap_qubit_slots(&mut self, a: QubitId, b: QubitId) -> SimulatorResult<()> {
        self.run()?;
        let slot_a = self.map.slot(a)?;
        let slot_b = self.map.slot(b)?;
        if slot_a != slot_b {
            self.store.apply(&GateMatrix::swap(), &[slot_a, slot_b], 0);
            self.map.swap(a, b)?;
        }
        Ok(())
    }

    fn mask_and_value(&self, bits: &[bool], ids: &[QubitId]) -> SimulatorResult<(usize, usize)> {
        if bits.len() != ids.len() {
            return Err(SimulatorError::LengthMismatch {
                expected: ids.len(),
                found: bits.len(),
            });
        }
        ids.iter()
            .zip(bits)
            .try_fold((0, 0), |(mask, value), (id, bit)| {
                let slot = self.map.slot(*id)?;
                Ok((mask | (1 << slot), value | (usize::from(*bit) << slot)))
            })
    }
}

#[cfg(test)]
mod simulator_tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn seeded() -> Simulator<f64> {
        Simulator::with_config(SimulatorConfig::default().with_seed(1234)).unwrap()
    }

    #[test]
    fn test_allocate_duplicate() -> SimulatorResult<()> {
        let mut sim = seeded();
        sim.allocate_qubit(3)?;
        assert_eq!(sim.allocate_qubit(3), Err(SimulatorError::DuplicateId(3)));
        assert_eq!(sim.num_qubits(), 1);
        Ok(())
    }

    #[test]
    fn test_gates_are_buffered() -> SimulatorResult<()> {
        let mut sim = seeded();
        (0..3).try_for_each(|id| sim.allocate_qubit(id))?;
        sim.apply_controlled_gate(&GateMatrix::hadamard(), &[0], &[])?;
        sim.apply_controlled_gate(&GateMatrix::x(), &[1], &[0])?;
        assert_eq!(sim.pending_gates(), 2);
        sim.run()?;
        assert_eq!(sim.pending_gates(), 0);
        Ok(())
    }

    #[test]
    fn test_fusion_window_dispatches() -> SimulatorResult<()> {
        let config = SimulatorConfig::default()
            .with_seed(1)
            .with_fusion_qubits(3, 3);
        let mut sim = Simulator::<f64>::with_config(config)?;
        (0..4).try_for_each(|id| sim.allocate_qubit(id))?;
        sim.apply_controlled_gate(&GateMatrix::hadamard(), &[0], &[])?;
        sim.apply_controlled_gate(&GateMatrix::hadamard(), &[1], &[])?;
        assert_eq!(sim.pending_gates(), 2);
        // Touching a third qubit hits the window and dispatches everything.
        sim.apply_controlled_gate(&GateMatrix::hadamard(), &[2], &[])?;
        assert_eq!(sim.pending_gates(), 0);
        Ok(())
    }

    #[test]
    fn test_without_fusion_gates_apply_immediately() -> SimulatorResult<()> {
        let config = SimulatorConfig::default().with_gate_fusion(false);
        let mut sim = Simulator::<f64>::with_config(config)?;
        sim.allocate_qubit(0)?;
        sim.apply_controlled_gate(&GateMatrix::x(), &[0], &[])?;
        assert_eq!(sim.pending_gates(), 0);
        assert!(sim.get_classical_value(0)?);
        Ok(())
    }

    #[test]
    fn test_bad_gates() -> SimulatorResult<()> {
        let mut sim = seeded();
        (0..2).try_for_each(|id| sim.allocate_qubit(id))?;
        assert!(matches!(
            sim.apply_controlled_gate(&GateMatrix::x(), &[0, 1], &[]),
            Err(SimulatorError::InvalidGate(_))
        ));
        assert!(matches!(
            sim.apply_controlled_gate(&GateMatrix::x(), &[0], &[0]),
            Err(SimulatorError::InvalidGate(_))
        ));
        assert_eq!(
            sim.apply_controlled_gate(&GateMatrix::x(), &[5], &[]),
            Err(SimulatorError::UnknownId(5))
        );
        assert_eq!(sim.pending_gates(), 0);
        Ok(())
    }

    #[test]
    fn test_deallocate_requires_classical() -> SimulatorResult<()> {
        let mut sim = seeded();
        (0..2).try_for_each(|id| sim.allocate_qubit(id))?;
        sim.apply_controlled_gate(&GateMatrix::hadamard(), &[0], &[])?;
        assert_eq!(sim.deallocate_qubit(0), Err(SimulatorError::NotClassical(0)));
        sim.measure_qubits(&[0])?;
        sim.deallocate_qubit(0)?;
        assert!(!sim.is_allocated(0));
        assert_eq!(sim.deallocate_qubit(0), Err(SimulatorError::UnknownId(0)));
        assert_abs_diff_eq!(sim.state_norm(), 1.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_swap_slots_keeps_state() -> SimulatorResult<()> {
        let mut sim = seeded();
        (0..2).try_for_each(|id| sim.allocate_qubit(id))?;
        sim.apply_controlled_gate(&GateMatrix::x(), &[0], &[])?;
        sim.swap_qubit_slots(0, 1)?;
        let (map, amps) = sim.cheat()?;
        assert_eq!(map.get(&0), Some(&1));
        assert_abs_diff_eq!(amps[0b10].re, 1.0, epsilon = 1e-12);
        assert!(sim.get_classical_value(0)?);
        assert!(!sim.get_classical_value(1)?);
        Ok(())
    }

    #[test]
    fn test_term_positions_checked() -> SimulatorResult<()> {
        let mut sim = seeded();
        sim.allocate_qubit(0)?;
        let terms = vec![("Z1".parse::<PauliTerm>()?, 1.0)];
        assert_eq!(
            sim.get_expectation_value(&terms, &[0]),
            Err(SimulatorError::InvalidTerm {
                index: 1,
                available: 1
            })
        );
        Ok(())
    }
}
