//! Merging per-worker accumulators and the execution-strategy seam.
//!
//! Because accumulator merging is exactly associative and commutative, the
//! shape of the merge tree is irrelevant to the result; [`merge_accumulators`]
//! uses a pairwise halving scheme anyway, since an execution backend that
//! merges across workers can run the same rounds with each round's merges
//! going in parallel.

use crate::accum::BinnedAccumulator;
use crate::float::ReproFloat;
use core::num::NonZeroUsize;
use ndarray::ArrayView1;

/// Fold every accumulator in the slice into `accs[0]`.
///
/// Runs `ceil(log2(n))` rounds; in each round the upper half is folded into
/// the lower half. The entries above index 0 are left in an unspecified
/// state. An empty slice is a no-op.
pub fn merge_accumulators<F: ReproFloat>(accs: &mut [BinnedAccumulator<F>]) {
    let mut n = accs.len();
    while n > 1 {
        let half = n / 2;
        let stride = n - half;
        for i in 0..half {
            // i and i + stride are distinct since stride >= 1
            let [dst, src] = accs.get_disjoint_mut([i, i + stride]).unwrap();
            *dst += &*src;
        }
        n = stride;
    }
}

/// The strategy used to carry out a full reduction.
///
/// An implementation decides how `values` is split into `n_partitions`
/// contiguous pieces, where each piece's accumulator runs, and how the
/// accumulators are brought back together. The binned format guarantees that
/// every implementation produces bitwise-identical results for the same
/// `(values, init, n_partitions)` triple, so backends only differ in
/// performance.
pub trait Executor {
    /// Reduce `values` (seeded with `init`) across `n_partitions` workers.
    ///
    /// Errors are backend-specific launch or teardown failures; the
    /// reduction itself cannot fail.
    fn drive_reduce<F: ReproFloat>(
        &mut self,
        values: ArrayView1<'_, F>,
        init: F,
        n_partitions: NonZeroUsize,
    ) -> Result<F, &'static str>;
}
