use crate::matrix::GateMatrix;
use crate::types::{Precision, QubitId};
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// A queued gate whose matrix has already absorbed any controls that could not stay global.
#[derive(Clone, Debug)]
struct FusionItem<P: Precision> {
    matrix: GateMatrix<P>,
    ids: SmallVec<[QubitId; 8]>,
}

/// The single gate produced by fusing everything in a `FusionBuffer`.
#[derive(Clone, Debug, PartialEq)]
pub struct FusedGate<P: Precision> {
    /// Combined matrix, bit `l` of its index is the value of `targets[l]`.
    pub matrix: GateMatrix<P>,
    /// Every qubit the matrix acts on, ascending.
    pub targets: Vec<QubitId>,
    /// Controls shared by every queued gate, ascending.
    pub controls: Vec<QubitId>,
}

/// Accumulates controlled gates and composes them into one matrix on demand.
///
/// Controls shared by every queued gate stay global and are applied as a mask by the kernel.
/// A control which only some gates carry is absorbed into those gates' matrices instead.
#[derive(Clone, Debug)]
pub struct FusionBuffer<P: Precision> {
    touched: BTreeSet<QubitId>,
    items: Vec<FusionItem<P>>,
    global_controls: BTreeSet<QubitId>,
}

impl<P: Precision> Default for FusionBuffer<P> {
    fn default() -> Self {
        Self {
            touched: BTreeSet::new(),
            items: Vec::new(),
            global_controls: BTreeSet::new(),
        }
    }
}

impl<P: Precision> FusionBuffer<P> {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of qubits the fused matrix would act on.
    pub fn num_qubits(&self) -> usize {
        self.touched.len()
    }

    /// Number of queued gates.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if no gates are queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Controls currently applied to the fused gate as a whole.
    pub fn global_controls(&self) -> impl Iterator<Item = &QubitId> {
        self.global_controls.iter()
    }

    /// Queue `matrix` acting on `targets`, applied only where every qubit in `controls` is `|1>`.
    pub fn insert(&mut self, matrix: GateMatrix<P>, targets: &[QubitId], controls: &[QubitId]) {
        self.touched.extend(targets.iter().cloned());
        let mut item = FusionItem {
            matrix,
            ids: targets.iter().cloned().collect(),
        };
        self.handle_controls(&mut item, controls);
        self.items.push(item);
    }

    fn handle_controls(&mut self, item: &mut FusionItem<P>, controls: &[QubitId]) {
        // Globals the new gate does not share, these get pushed into the queued gates.
        let mut unshared = self.global_controls.clone();
        for c in controls {
            if self.global_controls.contains(c) {
                unshared.remove(c);
            } else if self.items.is_empty() {
                self.global_controls.insert(*c);
            } else {
                item.matrix = item.matrix.with_controls(1);
                item.ids.push(*c);
                self.touched.insert(*c);
            }
        }

        if !unshared.is_empty() {
            unshared.iter().for_each(|c| {
                self.global_controls.remove(c);
                self.touched.insert(*c);
            });
            self.items.iter_mut().for_each(|queued| {
                queued.matrix = queued.matrix.with_controls(unshared.len());
                queued.ids.extend(unshared.iter().cloned());
            });
        }
    }

    /// Compose every queued gate into a single matrix over the touched qubits. Returns `None` if
    /// nothing is queued.
    pub fn perform_fusion(&self) -> Option<FusedGate<P>> {
        if self.items.is_empty() {
            return None;
        }
        let targets: Vec<QubitId> = self.touched.iter().cloned().collect();
        let mut matrix = GateMatrix::identity(targets.len());
        self.items.iter().for_each(|item| {
            let positions: SmallVec<[usize; 8]> = item
                .ids
                .iter()
                .filter_map(|id| targets.binary_search(id).ok())
                .collect();
            debug_assert_eq!(positions.len(), item.ids.len());
            matrix.left_multiply(&item.matrix, &positions);
        });
        Some(FusedGate {
            matrix,
            targets,
            controls: self.global_controls.iter().cloned().collect(),
        })
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.touched.clear();
        self.items.clear();
        self.global_controls.clear();
    }
}
