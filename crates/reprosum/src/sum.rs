//! The argument-checked entry points for reproducible summation.

use crate::error::Error;
use crate::parallel_serial::SerialExecutor;
use ndarray::ArrayView1;
use reprosum_nostd_internal::{Executor, ReproFloat, reduce_partitioned};
use std::num::NonZeroUsize;

/// Sum `values` (seeded with `init`) as if split across `n_partitions`
/// workers.
///
/// The result is bitwise identical for every choice of `n_partitions` and
/// for every execution backend; varying the partition count is the standard
/// way to check that property. `n_partitions` must be positive (it may
/// exceed `values.len()`; the surplus partitions are just empty).
///
/// ```
/// use ndarray::aview1;
/// use reprosum::reproducible_sum;
///
/// let vals: [f64; 3] = [1.0, 1.0e16, -1.0e16];
/// let a = reproducible_sum(aview1(&vals), 0.0, 1).unwrap();
/// let b = reproducible_sum(aview1(&vals), 0.0, 3).unwrap();
/// assert_eq!(a.to_bits(), b.to_bits());
/// assert_eq!(a, 1.0);
/// ```
pub fn reproducible_sum<F: ReproFloat>(
    values: ArrayView1<'_, F>,
    init: F,
    n_partitions: usize,
) -> Result<F, Error> {
    let n_partitions = NonZeroUsize::new(n_partitions)
        .ok_or_else(|| Error::integer_range("n_partitions", 0, 1, i64::MAX))?;
    SerialExecutor
        .drive_reduce(values, init, n_partitions)
        .map_err(Error::internal)
}

/// Sum `values` decomposed into the given contiguous chunk lengths, which
/// must cover the input exactly.
///
/// Produces the same bits as [`reproducible_sum`] over the same data, for
/// any chunk decomposition. This exists for callers whose decomposition is
/// imposed from outside (e.g. by how the data is already distributed).
pub fn reproducible_sum_partitioned<F: ReproFloat>(
    values: ArrayView1<'_, F>,
    chunk_lens: &[usize],
    init: F,
) -> Result<F, Error> {
    let covered: usize = chunk_lens.iter().sum();
    if covered != values.len() {
        return Err(Error::partition_layout(values.len(), covered));
    }
    reduce_partitioned(values, chunk_lens, init)
        .map(|acc| acc.conv())
        .map_err(Error::internal)
}
