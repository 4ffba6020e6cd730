/*!
Provides bitwise-reproducible parallel summation of floating-point data.

Ordinary floating-point sums depend on evaluation order: splitting an array
across a different number of threads (or merging partial sums in a different
tree) generally changes the rounding and therefore the result. The routines
in this crate produce the *same bits* for a given input regardless of how the
work is partitioned, at the cost of a constant-factor slowdown over a plain
sum.

The technique is binned summation: each worker absorbs its values into a
small set of fixed magnitude bins whose sums stay pinned inside a single
binade, making every bin update exact. Exact updates are associative, so
per-worker accumulators can be merged in any order without changing the
outcome. See [`BinnedAccumulator`] for the details.

# Quick start

```
use ndarray::aview1;
use reprosum::reproducible_sum;

let vals: Vec<f64> = (0..1000).map(|i| (i as f64) * 1.0e-3).collect();
let one_worker = reproducible_sum(aview1(&vals), 0.0, 1).unwrap();
let eight_workers = reproducible_sum(aview1(&vals), 0.0, 8).unwrap();
assert_eq!(one_worker.to_bits(), eight_workers.to_bits());
```

# Developer Guide

See the crate-level documentation for [`reprosum_nostd_internal`].

*/

#![deny(rustdoc::broken_intra_doc_links)]

// inform build-system of the crates in this package
mod error;
mod parallel_serial;
mod sum;

// pull in symbols that are visible outside of the package
pub use error::Error;
pub use parallel_serial::SerialExecutor;
pub use reprosum_nostd_internal::{
    BinnedAccumulator, Executor, FOLD, ReproFloat, merge_accumulators, reduce_partitioned,
    reduce_to_accumulator, reduce_to_scalar,
};
pub use sum::{reproducible_sum, reproducible_sum_partitioned};
