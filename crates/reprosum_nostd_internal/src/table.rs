//! The per-type tables of reference bin magnitudes.
//!
//! Every accumulator of a given float type shares one immutable table that
//! partitions the representable exponent range into fixed-width bins. Entry
//! `k` is the reference magnitude that a bin sum aligned at index `k` is
//! anchored to: `0.75 * 2^MAX_EXP` for the leading bin, then
//! `0.75 * 2^(MAX_EXP + MANT_DIG - BIN_WIDTH + 1 - k*BIN_WIDTH)` down to
//! `MAX_INDEX`, with the trailing fold slots repeating the last bin.
//!
//! The tables are assembled bit-by-bit in `const fn`s and stored in
//! `static`s, so they exist (fully constructed) before any accumulator can
//! touch them and the steady-state read path involves no synchronization at
//! all. This replaces the lazily-initialized global buffer the scheme is
//! usually implemented with; "built at most once, before first absorption"
//! holds by construction here.

use crate::accum::FOLD;
use crate::float::ReproFloat;

/// 2^e as f64, for exponents of normal values (`-1022..=1023`)
pub(crate) const fn exp2i_f64(e: i32) -> f64 {
    f64::from_bits(((e + 1023) as u64) << 52)
}

/// 2^e as f32, for exponents of normal values (`-126..=127`)
pub(crate) const fn exp2i_f32(e: i32) -> f32 {
    f32::from_bits(((e + 127) as u32) << 23)
}

/// 0.75 * 2^e as f64, assembled directly from bits
///
/// `e` may be as large as `MAX_EXP`, where multiplying `exp2i_f64` out would
/// overflow, so the significand pattern 1.1b is paired with exponent `e - 1`.
const fn three_quarters_f64(e: i32) -> f64 {
    let biased = (e - 1 + 1023) as u64;
    f64::from_bits((biased << 52) | (1_u64 << 51))
}

/// 0.75 * 2^e as f32
const fn three_quarters_f32(e: i32) -> f32 {
    let biased = (e - 1 + 127) as u32;
    f32::from_bits((biased << 23) | (1_u32 << 22))
}

pub(crate) const F64_BIN_LEN: usize = <f64 as ReproFloat>::MAX_INDEX + FOLD;
pub(crate) const F32_BIN_LEN: usize = <f32 as ReproFloat>::MAX_INDEX + FOLD;

const fn build_f64_bins() -> [f64; F64_BIN_LEN] {
    const MAX_EXP: i32 = <f64 as ReproFloat>::MAX_EXP;
    const OFFSET: i32 =
        <f64 as ReproFloat>::MANT_DIG as i32 - <f64 as ReproFloat>::BIN_WIDTH as i32 + 1;
    const WIDTH: i32 = <f64 as ReproFloat>::BIN_WIDTH as i32;

    let mut bins = [0.0_f64; F64_BIN_LEN];
    bins[0] = three_quarters_f64(MAX_EXP);
    let mut k = 1;
    while k <= <f64 as ReproFloat>::MAX_INDEX {
        bins[k] = three_quarters_f64(MAX_EXP + OFFSET - WIDTH * k as i32);
        k += 1;
    }
    while k < F64_BIN_LEN {
        bins[k] = bins[k - 1];
        k += 1;
    }
    bins
}

const fn build_f32_bins() -> [f32; F32_BIN_LEN] {
    const MAX_EXP: i32 = <f32 as ReproFloat>::MAX_EXP;
    const OFFSET: i32 =
        <f32 as ReproFloat>::MANT_DIG as i32 - <f32 as ReproFloat>::BIN_WIDTH as i32 + 1;
    const WIDTH: i32 = <f32 as ReproFloat>::BIN_WIDTH as i32;

    let mut bins = [0.0_f32; F32_BIN_LEN];
    bins[0] = three_quarters_f32(MAX_EXP);
    let mut k = 1;
    while k <= <f32 as ReproFloat>::MAX_INDEX {
        bins[k] = three_quarters_f32(MAX_EXP + OFFSET - WIDTH * k as i32);
        k += 1;
    }
    while k < F32_BIN_LEN {
        bins[k] = bins[k - 1];
        k += 1;
    }
    bins
}

pub(crate) static F64_BINS: [f64; F64_BIN_LEN] = build_f64_bins();
pub(crate) static F32_BINS: [f32; F32_BIN_LEN] = build_f32_bins();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_table_shape() {
        assert_eq!(F64_BINS.len(), 51 + FOLD);
        // 0.75 * 2^1024 == 1.5 * 2^1023
        assert_eq!(F64_BINS[0], 1.5 * exp2i_f64(1023));
        // 0.75 * 2^(1024 + 14 - 40)
        assert_eq!(F64_BINS[1], 0.75 * exp2i_f64(998));
        // trailing fold slots repeat the final bin
        assert_eq!(F64_BINS[52], F64_BINS[51]);
        assert_eq!(F64_BINS[53], F64_BINS[51]);
    }

    #[test]
    fn f32_table_shape() {
        assert_eq!(F32_BINS.len(), 20 + FOLD);
        assert_eq!(F32_BINS[0], 1.5 * exp2i_f32(127));
        // 0.75 * 2^(128 + 12 - 13)
        assert_eq!(F32_BINS[1], 0.75 * exp2i_f32(127));
        assert_eq!(F32_BINS[21], F32_BINS[20]);
    }

    #[test]
    fn bins_strictly_decrease_up_to_max_index() {
        for k in 1..=<f64 as ReproFloat>::MAX_INDEX {
            assert!(F64_BINS[k] < F64_BINS[k - 1], "f64 bin {k}");
            assert!(F64_BINS[k] > 0.0);
        }
        for k in 1..=<f32 as ReproFloat>::MAX_INDEX {
            assert!(F32_BINS[k] < F32_BINS[k - 1], "f32 bin {k}");
            assert!(F32_BINS[k] > 0.0);
        }
    }

    #[test]
    fn every_bin_is_finite_and_normal() {
        for &b in F64_BINS.iter() {
            assert!(b.is_finite());
            assert!(b >= f64::MIN_POSITIVE);
        }
        for &b in F32_BINS.iter() {
            assert!(b.is_finite());
            assert!(b >= f32::MIN_POSITIVE);
        }
    }
}
