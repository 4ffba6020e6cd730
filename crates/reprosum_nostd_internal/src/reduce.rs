//! Sequential reduction drivers built on [`BinnedAccumulator`].
//!
//! These are the loops a worker runs over its slice of the input. They own
//! the two caller obligations the accumulator itself does not check: keeping
//! the bin alignment ahead of the running maximum magnitude, and
//! renormalizing before the endurance budget runs out. Every accumulator
//! returned from this module is in renormalized form, which is what the
//! merge in [`crate::parallel`] relies on.

use crate::accum::BinnedAccumulator;
use crate::float::ReproFloat;
use ndarray::{ArrayView1, s};

/// Absorb `values` into a fresh accumulator seeded with `init`.
///
/// The result is independent of how callers later split and merge work: for
/// any partitioning of `values` into contiguous chunks, reducing the chunks
/// separately (seeding exactly one of them with `init`) and merging the
/// accumulators in any order and association yields the same bin sums.
pub fn reduce_to_accumulator<F: ReproFloat>(
    values: ArrayView1<'_, F>,
    init: F,
) -> BinnedAccumulator<F> {
    let mut acc = BinnedAccumulator::new();
    acc += init;
    let mut max_abs_val = init.abs();
    for &v in values.iter() {
        let abs = v.abs();
        if !(abs <= max_abs_val) {
            // covers both a new maximum and non-finite values
            max_abs_val = abs;
            acc.set_max_abs_val(abs);
        }
        acc.unsafe_add(v);
        if acc.needs_renorm() {
            acc.renorm();
        }
    }
    acc.renorm();
    acc
}

/// [`reduce_to_accumulator`] collapsed to a scalar.
pub fn reduce_to_scalar<F: ReproFloat>(values: ArrayView1<'_, F>, init: F) -> F {
    reduce_to_accumulator(values, init).conv()
}

/// Reduce `values` as the given sequence of contiguous chunks, merging the
/// per-chunk accumulators left to right.
///
/// This exists for callers that already have a chunk decomposition in hand
/// (and for tests that pin down partition-independence); the chunk lengths
/// must cover `values` exactly.
pub fn reduce_partitioned<F: ReproFloat>(
    values: ArrayView1<'_, F>,
    chunk_lens: &[usize],
    init: F,
) -> Result<BinnedAccumulator<F>, &'static str> {
    let covered: usize = chunk_lens.iter().sum();
    if covered != values.len() {
        return Err("chunk lengths must exactly cover the input");
    }
    let mut acc = BinnedAccumulator::new();
    acc += init;
    let mut offset = 0;
    for &len in chunk_lens {
        let chunk = values.slice(s![offset..offset + len]);
        acc += &reduce_to_accumulator(chunk, F::ZERO);
        offset += len;
    }
    Ok(acc)
}
