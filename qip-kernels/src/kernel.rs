#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::into_iter;
use crate::rayon_helper::num_workers;
use crate::utils::{get_flat_index, insert_zero_bit};
use num_traits::Zero;
use smallvec::SmallVec;
use std::ops::{Add, Mul};

/// Widest matrix (in qubits) the kernel will apply in a single pass.
pub const MAX_KERNEL_WIDTH: usize = 5;
const MAX_BLOCK: usize = 1 << MAX_KERNEL_WIDTH;

/// States smaller than this are always processed on the calling thread.
const PARALLEL_THRESHOLD: usize = 1 << 12;
/// How many independent groups of blocks to aim for per worker.
const GROUPS_PER_WORKER: usize = 4;

/// How the state is carved up before blocks are visited.
#[derive(Clone, Copy, Debug)]
enum Split {
    /// Separate each slice into its lo/hi halves along a target stride.
    Target(usize),
    /// Cut each slice into contiguous chunks of the given length.
    Free(usize),
}

/// Location of one block element relative to the group it lives in.
#[derive(Clone, Copy, Debug, Default)]
struct BlockEntry {
    slice: usize,
    offset: usize,
}

#[derive(Debug)]
struct KernelPlan {
    splits: SmallVec<[Split; MAX_KERNEL_WIDTH + 1]>,
    /// Slots of the targets visited inside a group, ascending.
    inner_slots: SmallVec<[usize; MAX_KERNEL_WIDTH]>,
    entries: SmallVec<[BlockEntry; MAX_BLOCK]>,
}

impl KernelPlan {
    fn new(n_entries: usize, targets: &[usize], min_groups: usize) -> Self {
        let mut sorted: SmallVec<[(usize, usize); MAX_KERNEL_WIDTH]> = targets
            .iter()
            .cloned()
            .enumerate()
            .map(|(local_bit, slot)| (slot, local_bit))
            .collect();
        // Largest stride first.
        sorted.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut splits = SmallVec::new();
        let mut groups = 1usize;
        let mut len = n_entries;
        let mut target_splits = 0;
        while groups < min_groups {
            let factor = ((min_groups + groups - 1) / groups).next_power_of_two();
            match sorted.get(target_splits) {
                Some(&(slot, _)) => {
                    let d = 1 << slot;
                    let pieces = len / (2 * d);
                    if groups * pieces >= min_groups {
                        let c = (len / factor).max(2 * d);
                        if c < len {
                            splits.push(Split::Free(c));
                            groups *= len / c;
                            len = c;
                        }
                        break;
                    }
                    splits.push(Split::Target(d));
                    groups *= pieces;
                    len = d;
                    target_splits += 1;
                }
                None => {
                    let c = (len / factor).max(1);
                    if c < len {
                        splits.push(Split::Free(c));
                    }
                    break;
                }
            }
        }

        let mut inner_slots: SmallVec<[usize; MAX_KERNEL_WIDTH]> = sorted[target_splits..]
            .iter()
            .map(|(slot, _)| *slot)
            .collect();
        inner_slots.sort_unstable();

        let entries = (0..1usize << targets.len())
            .map(|j| {
                sorted
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, local_bit))| (j >> local_bit) & 1 == 1)
                    .fold(BlockEntry::default(), |mut entry, (level, (slot, _))| {
                        if level < target_splits {
                            entry.slice |= 1 << (target_splits - 1 - level);
                        } else {
                            entry.offset |= 1 << slot;
                        }
                        entry
                    })
            })
            .collect();

        Self {
            splits,
            inner_slots,
            entries,
        }
    }
}

/// A set of equally sized disjoint slices of the state. Entry `o` of every slice belongs to the
/// same family of blocks; `base` is the global index of the first entry of slice 0.
struct Group<'a, T> {
    base: usize,
    slices: SmallVec<[&'a mut [T]; MAX_BLOCK]>,
}

fn split_groups<T>(groups: Vec<Group<'_, T>>, split: Split) -> Vec<Group<'_, T>> {
    let mut out = Vec::new();
    for group in groups {
        let len = group.slices[0].len();
        let step = match split {
            Split::Target(d) => 2 * d,
            Split::Free(c) => c,
        };
        let start = out.len();
        out.extend((0..len / step).map(|p| Group {
            base: group.base + p * step,
            slices: SmallVec::new(),
        }));
        for slice in group.slices {
            for (p, piece) in slice.chunks_mut(step).enumerate() {
                match split {
                    Split::Target(d) => {
                        let (lo, hi) = piece.split_at_mut(d);
                        out[start + p].slices.push(lo);
                        out[start + p].slices.push(hi);
                    }
                    Split::Free(_) => out[start + p].slices.push(piece),
                }
            }
        }
    }
    out
}

fn apply_to_group<T>(mut group: Group<'_, T>, plan: &KernelPlan, mat: &[T], ctrlmask: usize)
where
    T: Copy + Zero + Add<Output = T> + Mul<Output = T>,
{
    let dim = plan.entries.len();
    let nindices = plan.entries.len().trailing_zeros() as usize;
    let len = group.slices[0].len();
    let base = group.base;
    let slices = &mut group.slices;

    let mut apply_block = |o: usize| {
        let mut v = [T::zero(); MAX_BLOCK];
        plan.entries
            .iter()
            .zip(v.iter_mut())
            .for_each(|(e, x)| *x = slices[e.slice][o + e.offset]);
        plan.entries.iter().enumerate().for_each(|(i, e)| {
            let row = &mat[get_flat_index(nindices, i, 0)..get_flat_index(nindices, i, dim)];
            slices[e.slice][o + e.offset] = row
                .iter()
                .zip(v[..dim].iter())
                .fold(T::zero(), |acc, (m, x)| acc + *m * *x);
        });
    };

    let offsets = (0..len >> plan.inner_slots.len()).map(|r| {
        plan.inner_slots
            .iter()
            .fold(r, |acc, slot| insert_zero_bit(acc, *slot))
    });
    if ctrlmask == 0 {
        offsets.for_each(|o| apply_block(o));
    } else {
        offsets
            .filter(|o| ((base + o) & ctrlmask) == ctrlmask)
            .for_each(|o| apply_block(o));
    }
}

/// Apply the row-major `2^k x 2^k` matrix `mat` to `psi`, where `targets` holds the `k` bit
/// positions the matrix acts on: bit `l` of a matrix row or column index is the value of bit
/// `targets[l]` of the state index. Only blocks whose index satisfies `(i & ctrlmask) == ctrlmask`
/// are touched. `targets` must be distinct, disjoint from `ctrlmask`, and hold at most
/// `MAX_KERNEL_WIDTH` entries.
///
/// # Example
/// ```
/// use qip_kernels::apply_kernel;
///
/// // X on bit 1, controlled on bit 0.
/// let mut psi = vec![0.0, 1.0, 0.0, 0.0];
/// apply_kernel(&mut psi, &[1], &[0.0, 1.0, 1.0, 0.0], 0b01);
/// assert_eq!(psi, vec![0.0, 0.0, 0.0, 1.0]);
/// ```
pub fn apply_kernel<T>(psi: &mut [T], targets: &[usize], mat: &[T], ctrlmask: usize)
where
    T: Copy + Zero + Add<Output = T> + Mul<Output = T> + Send + Sync,
{
    let min_groups = if psi.len() >= PARALLEL_THRESHOLD {
        num_workers() * GROUPS_PER_WORKER
    } else {
        1
    };
    apply_kernel_with_groups(psi, targets, mat, ctrlmask, min_groups)
}

fn apply_kernel_with_groups<T>(
    psi: &mut [T],
    targets: &[usize],
    mat: &[T],
    ctrlmask: usize,
    min_groups: usize,
) where
    T: Copy + Zero + Add<Output = T> + Mul<Output = T> + Send + Sync,
{
    let k = targets.len();
    debug_assert!(k >= 1 && k <= MAX_KERNEL_WIDTH);
    debug_assert_eq!(mat.len(), 1 << (2 * k));
    debug_assert!(targets.iter().all(|t| (1 << t) < psi.len()));
    debug_assert!(targets.iter().all(|t| (ctrlmask >> t) & 1 == 0));
    if k == 0 || psi.is_empty() {
        return;
    }

    let plan = KernelPlan::new(psi.len(), targets, min_groups);
    let mut slices = SmallVec::new();
    slices.push(psi);
    let groups = plan
        .splits
        .iter()
        .fold(vec![Group { base: 0, slices }], |groups, split| {
            split_groups(groups, *split)
        });

    into_iter!(groups).for_each(|group| apply_to_group(group, &plan, mat, ctrlmask));
}
