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

//! Dense kernels which apply a small `2^k x 2^k` matrix to every eligible block of a
//! `2^n` entry state vector, optionally restricted by a control mask.

/// The width-generic dense kernel.
pub mod kernel;
/// Helpers for converting from synchronous to parallel iterators.
pub mod rayon_helper;
/// Utilities related to bit manipulation of state indices.
pub mod utils;

pub use kernel::{apply_kernel, MAX_KERNEL_WIDTH};
