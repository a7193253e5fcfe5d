use crate::errors::{SimulatorError, SimulatorResult};
use qip_kernels::MAX_KERNEL_WIDTH;

/// Tunables for the simulator.
///
/// ```
/// use qip_sim::SimulatorConfig;
///
/// let config = SimulatorConfig::default().with_seed(42).with_fusion_qubits(2, 3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Fused gates are dispatched as soon as they touch at least this many qubits.
    pub fusion_qubits_min: usize,
    /// Fused gates never touch more than this many qubits.
    pub fusion_qubits_max: usize,
    /// When false every gate is dispatched as soon as it is applied.
    pub gate_fusion: bool,
    /// Seed for the measurement rng, `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            fusion_qubits_min: 4,
            fusion_qubits_max: 5,
            gate_fusion: true,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Set the window of touched-qubit counts at which fused gates are dispatched.
    pub fn with_fusion_qubits(mut self, min: usize, max: usize) -> Self {
        self.fusion_qubits_min = min;
        self.fusion_qubits_max = max;
        self
    }

    /// Turn gate fusion on or off.
    pub fn with_gate_fusion(mut self, gate_fusion: bool) -> Self {
        self.gate_fusion = gate_fusion;
        self
    }

    /// Seed the measurement rng.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the fusion window fits the kernels.
    pub fn validate(&self) -> SimulatorResult<()> {
        if self.fusion_qubits_max == 0 || self.fusion_qubits_max > MAX_KERNEL_WIDTH {
            Err(SimulatorError::InvalidConfig(format!(
                "fusion_qubits_max must be in 1..={}, found {}",
                MAX_KERNEL_WIDTH, self.fusion_qubits_max
            )))
        } else if self.fusion_qubits_min > self.fusion_qubits_max {
            Err(SimulatorError::InvalidConfig(format!(
                "fusion_qubits_min ({}) exceeds fusion_qubits_max ({})",
                self.fusion_qubits_min, self.fusion_qubits_max
            )))
        } else {
            Ok(())
        }
    }
}
