//! Implements the "serial" backend for driving reductions

use ndarray::ArrayView1;
use reprosum_nostd_internal::{
    BinnedAccumulator, Executor, ReproFloat, merge_accumulators, reduce_to_accumulator,
};
use std::num::NonZeroUsize;

/// split `len` into `n` contiguous partition lengths, front-loading the
/// remainder so every backend agrees on the decomposition
fn partition_lens(len: usize, n: usize) -> impl Iterator<Item = usize> {
    let base = len / n;
    let remainder = len % n;
    (0..n).map(move |i| base + usize::from(i < remainder))
}

pub struct SerialExecutor;

impl Executor for SerialExecutor {
    fn drive_reduce<F: ReproFloat>(
        &mut self,
        values: ArrayView1<'_, F>,
        init: F,
        n_partitions: NonZeroUsize,
    ) -> Result<F, &'static str> {
        let n_partitions = n_partitions.get();

        // the loop is written this way (rather than just summing serially) so
        // that it is bitwise reproducible with a multi-threaded backend: each
        // partition gets its own accumulator, exactly as if it ran on its own
        // worker, and the accumulators are merged afterwards
        let mut accs: Vec<BinnedAccumulator<F>> = Vec::with_capacity(n_partitions);
        let mut offset = 0;
        for (i, len) in partition_lens(values.len(), n_partitions).enumerate() {
            let seed = if i == 0 { init } else { F::ZERO };
            let chunk = values.slice(ndarray::s![offset..offset + len]);
            accs.push(reduce_to_accumulator(chunk, seed));
            offset += len;
        }

        // a multi-threaded backend must use the same merge-tree helper
        merge_accumulators(&mut accs);
        Ok(accs[0].conv())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_lens_cover_and_front_load() {
        let lens: Vec<usize> = partition_lens(10, 3).collect();
        assert_eq!(lens, [4, 3, 3]);
        let lens: Vec<usize> = partition_lens(2, 5).collect();
        assert_eq!(lens, [1, 1, 0, 0, 0]);
        let lens: Vec<usize> = partition_lens(0, 4).collect();
        assert_eq!(lens, [0, 0, 0, 0]);
    }
}
