#![no_std]
mod accum;
mod float;
mod parallel;
mod reduce;
mod table;

pub use accum::{BinnedAccumulator, FOLD};
pub use float::ReproFloat;
pub use parallel::{Executor, merge_accumulators};
pub use reduce::{reduce_partitioned, reduce_to_accumulator, reduce_to_scalar};
