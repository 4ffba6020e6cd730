//! The floating-point trait that the binned accumulator is generic over.
//!
//! Bit-reproducible binned summation leans on a handful of properties of the
//! IEEE-754 binary formats (exponent fields, precise placement of the
//! significand bits, and the fact that adding two same-binade multiples of a
//! common ulp is exact). [`ReproFloat`] packages exactly those properties so
//! the accumulator and drivers can be written once for `f32` and `f64`.
//!
//! A note on the "sticky bit": every quantity deposited into a bin sum first
//! has its lowest significand bit forced to 1. This guarantees that the
//! subsequent addition never lands exactly halfway between two representable
//! results, so round-to-nearest never consults the tie-breaking rule. That is
//! the property that makes the amount captured by a bin depend only on the
//! incoming value and the bin's granularity, not on whatever low-order bits
//! the bin sum happens to hold. Without it, reproducibility would quietly
//! depend on deposit order.

use crate::accum::{FOLD, accum_index};
use crate::table::{F32_BINS, F64_BINS, exp2i_f32, exp2i_f64};
use core::fmt::Debug;
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// An IEEE-754 binary floating-point type usable for reproducible summation.
///
/// Implemented for `f32` and `f64`. The reproducibility guarantees are
/// specific to one concrete choice of this type and must not be compared
/// across types.
pub trait ReproFloat:
    'static
    + Copy
    + Debug
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// significand width in bits, counting the implicit leading bit
    const MANT_DIG: u32;
    /// maximum exponent, in the frexp convention (values lie in
    /// `[2^(e-1), 2^e)`)
    const MAX_EXP: i32;
    /// minimum normalized exponent, frexp convention
    const MIN_EXP: i32;
    /// number of consecutive exponents grouped into one bin
    const BIN_WIDTH: u32;

    /// offset between the frexp exponent and the raw exponent field
    const EXP_BIAS: i32 = Self::MAX_EXP - 2;
    /// largest bin index (the bin holding the smallest magnitudes)
    const MAX_INDEX: usize = ((Self::MAX_EXP - Self::MIN_EXP + Self::MANT_DIG as i32 - 1)
        / Self::BIN_WIDTH as i32) as usize
        - 1;
    /// the number of deposits that can be performed before a renorm is
    /// required
    const ENDURANCE: usize = 1 << (Self::MANT_DIG - Self::BIN_WIDTH - 2);

    /// scale factor applied to deposits into the bin of index 0, so that
    /// magnitudes near `MAX` cannot overflow the leading bin sum
    const COMPRESSION: Self;
    /// inverse of [`Self::COMPRESSION`]
    const EXPANSION: Self;
    /// half of [`Self::EXPANSION`] (the re-expansion of a deposit remainder
    /// is applied in two halves to dodge intermediate overflow)
    const EXPANSION_HALF: Self;

    const ZERO: Self;

    fn abs(self) -> Self;

    /// true for NaN and for the infinities
    fn is_nonfinite(self) -> bool;

    /// the raw (biased) exponent field
    fn exp_field(self) -> i32;

    /// frexp-style exponent of a nonzero finite value, including subnormals
    fn sig_exponent(self) -> i32;

    /// force the lowest significand bit to 1 (see the module docs)
    fn with_sticky_bit(self) -> Self;

    /// Pin the value to the `[1.5, 1.75) * 2^e` quarter of its binade and
    /// report how many quarter-binades were removed (in `-2..=1`). The
    /// removed quarters move into a carry sum.
    fn strip_quarters(self) -> (Self, i32);

    fn from_i32(v: i32) -> Self;

    /// The shared table of reference bin magnitudes for this type. Built at
    /// compile time; read-only for the life of the process.
    fn bin_table() -> &'static [Self];

    /// Collapse a (primary, carry) bin representation into one scalar.
    fn collapse(primary: &[Self], carry: &[Self]) -> Self;
}

impl ReproFloat for f64 {
    const MANT_DIG: u32 = 53;
    const MAX_EXP: i32 = 1024;
    const MIN_EXP: i32 = -1021;
    const BIN_WIDTH: u32 = 40;

    const COMPRESSION: f64 = exp2i_f64(-14);
    const EXPANSION: f64 = exp2i_f64(14);
    const EXPANSION_HALF: f64 = exp2i_f64(13);

    const ZERO: f64 = 0.0;

    #[inline]
    fn abs(self) -> f64 {
        f64::from_bits(self.to_bits() & !(1_u64 << 63))
    }

    #[inline]
    fn is_nonfinite(self) -> bool {
        self.to_bits() & (0x7ff_u64 << 52) == 0x7ff_u64 << 52
    }

    #[inline]
    fn exp_field(self) -> i32 {
        ((self.to_bits() >> 52) & 0x7ff) as i32
    }

    #[inline]
    fn sig_exponent(self) -> i32 {
        let e = self.exp_field();
        if e != 0 {
            e - Self::EXP_BIAS
        } else {
            // subnormal: locate the top set bit of the significand field
            let mantissa = self.to_bits() & ((1_u64 << 52) - 1);
            let top_bit = 63 - mantissa.leading_zeros() as i32;
            top_bit - 1073
        }
    }

    #[inline]
    fn with_sticky_bit(self) -> f64 {
        f64::from_bits(self.to_bits() | 1)
    }

    #[inline]
    fn strip_quarters(self) -> (f64, i32) {
        let bits = self.to_bits();
        let quarters = ((bits >> 50) & 3) as i32 - 2;
        let pinned = f64::from_bits((bits & !(1_u64 << 50)) | (1_u64 << 51));
        (pinned, quarters)
    }

    #[inline]
    fn from_i32(v: i32) -> f64 {
        v as f64
    }

    fn bin_table() -> &'static [f64] {
        &F64_BINS
    }

    fn collapse(primary: &[f64], carry: &[f64]) -> f64 {
        let p0 = primary[0];
        if p0.is_nan() || p0.is_infinite() {
            return p0;
        }
        if p0 == 0.0 {
            return 0.0;
        }

        let index = accum_index::<f64>(p0);
        let bins = &Self::bin_table()[index..];

        let mut y = 0.0_f64;
        // For the leading few bin indices, a carry sum multiplied out
        // against its reference magnitude can overflow, so those folds are
        // accumulated in a scaled-down frame and the frame is undone at the
        // end.
        let scale_threshold = (3 * Self::MANT_DIG as usize) / Self::BIN_WIDTH as usize;
        if index <= scale_threshold {
            let scale_exp = 2 * Self::MANT_DIG as i32 - Self::BIN_WIDTH as i32;
            let scale_down = exp2i_f64(-scale_exp);
            let scale_up = exp2i_f64(scale_exp);
            let scaled = FOLD.min(scale_threshold - index);
            let mut i;
            if index == 0 {
                // fold 0 of the leading bin holds compressed deposits
                y += carry[0] * ((bins[0] / 6.0) * scale_down * Self::EXPANSION);
                y += carry[1] * ((bins[1] / 6.0) * scale_down);
                y += (primary[0] - bins[0]) * scale_down * Self::EXPANSION;
                i = 2;
            } else {
                y += carry[0] * ((bins[0] / 6.0) * scale_down);
                i = 1;
            }
            while i < scaled {
                y += carry[i] * ((bins[i] / 6.0) * scale_down);
                y += (primary[i - 1] - bins[i - 1]) * scale_down;
                i += 1;
            }
            if i == FOLD {
                y += (primary[FOLD - 1] - bins[FOLD - 1]) * scale_down;
                return y * scale_up;
            }
            if (y * scale_up).is_infinite() {
                return y * scale_up;
            }
            y *= scale_up;
            while i < FOLD {
                y += carry[i] * (bins[i] / 6.0);
                y += primary[i - 1] - bins[i - 1];
                i += 1;
            }
            y += primary[FOLD - 1] - bins[FOLD - 1];
        } else {
            y += carry[0] * (bins[0] / 6.0);
            for i in 1..FOLD {
                y += carry[i] * (bins[i] / 6.0);
                y += primary[i - 1] - bins[i - 1];
            }
            y += primary[FOLD - 1] - bins[FOLD - 1];
        }
        y
    }
}

impl ReproFloat for f32 {
    const MANT_DIG: u32 = 24;
    const MAX_EXP: i32 = 128;
    const MIN_EXP: i32 = -125;
    const BIN_WIDTH: u32 = 13;

    const COMPRESSION: f32 = exp2i_f32(-12);
    const EXPANSION: f32 = exp2i_f32(12);
    const EXPANSION_HALF: f32 = exp2i_f32(11);

    const ZERO: f32 = 0.0;

    #[inline]
    fn abs(self) -> f32 {
        f32::from_bits(self.to_bits() & !(1_u32 << 31))
    }

    #[inline]
    fn is_nonfinite(self) -> bool {
        self.to_bits() & (0xff_u32 << 23) == 0xff_u32 << 23
    }

    #[inline]
    fn exp_field(self) -> i32 {
        ((self.to_bits() >> 23) & 0xff) as i32
    }

    #[inline]
    fn sig_exponent(self) -> i32 {
        let e = self.exp_field();
        if e != 0 {
            e - Self::EXP_BIAS
        } else {
            let mantissa = self.to_bits() & ((1_u32 << 23) - 1);
            let top_bit = 31 - mantissa.leading_zeros() as i32;
            top_bit - 148
        }
    }

    #[inline]
    fn with_sticky_bit(self) -> f32 {
        f32::from_bits(self.to_bits() | 1)
    }

    #[inline]
    fn strip_quarters(self) -> (f32, i32) {
        let bits = self.to_bits();
        let quarters = ((bits >> 21) & 3) as i32 - 2;
        let pinned = f32::from_bits((bits & !(1_u32 << 21)) | (1_u32 << 22));
        (pinned, quarters)
    }

    #[inline]
    fn from_i32(v: i32) -> f32 {
        v as f32
    }

    fn bin_table() -> &'static [f32] {
        &F32_BINS
    }

    fn collapse(primary: &[f32], carry: &[f32]) -> f32 {
        let p0 = primary[0];
        if p0.is_nan() || p0.is_infinite() {
            return p0;
        }
        if p0 == 0.0 {
            return 0.0;
        }

        let index = accum_index::<f32>(p0);
        let bins = &Self::bin_table()[index..];

        // every f32 carry/reference product fits comfortably in f64, so no
        // scaled frame is needed here
        let mut y = 0.0_f64;
        let mut i;
        if index == 0 {
            y += carry[0] as f64 * ((bins[0] / 6.0) as f64 * Self::EXPANSION as f64);
            y += carry[1] as f64 * (bins[1] / 6.0) as f64;
            y += (primary[0] - bins[0]) as f64 * Self::EXPANSION as f64;
            i = 2;
        } else {
            y += carry[0] as f64 * (bins[0] / 6.0) as f64;
            i = 1;
        }
        while i < FOLD {
            y += carry[i] as f64 * (bins[i] / 6.0) as f64;
            y += (primary[i - 1] - bins[i - 1]) as f64;
            i += 1;
        }
        y += (primary[FOLD - 1] - bins[FOLD - 1]) as f64;
        y as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_constants() {
        assert_eq!(<f64 as ReproFloat>::MAX_INDEX, 51);
        assert_eq!(<f64 as ReproFloat>::ENDURANCE, 2048);
        assert_eq!(<f64 as ReproFloat>::EXP_BIAS, 1022);
        assert_eq!(<f32 as ReproFloat>::MAX_INDEX, 20);
        assert_eq!(<f32 as ReproFloat>::ENDURANCE, 512);
        assert_eq!(<f32 as ReproFloat>::EXP_BIAS, 126);
    }

    #[test]
    fn compression_factors() {
        assert_eq!(<f64 as ReproFloat>::COMPRESSION, 1.0 / 16384.0);
        assert_eq!(<f64 as ReproFloat>::EXPANSION, 16384.0);
        assert_eq!(<f64 as ReproFloat>::EXPANSION_HALF, 8192.0);
        assert_eq!(<f32 as ReproFloat>::COMPRESSION, 1.0 / 4096.0);
        assert_eq!(<f32 as ReproFloat>::EXPANSION, 4096.0);
    }

    #[test]
    fn sig_exponent_matches_frexp_convention() {
        // |v| lies in [2^(e-1), 2^e)
        assert_eq!(1.0_f64.sig_exponent(), 1);
        assert_eq!(0.75_f64.sig_exponent(), 0);
        assert_eq!(1.5_f64.sig_exponent(), 1);
        assert_eq!((-8.0_f64).sig_exponent(), 4);
        // smallest subnormal is 2^-1074
        assert_eq!(f64::from_bits(1).sig_exponent(), -1073);
        // largest subnormal sits just under 2^-1022
        assert_eq!(f64::from_bits((1_u64 << 52) - 1).sig_exponent(), -1022);

        assert_eq!(1.0_f32.sig_exponent(), 1);
        assert_eq!(f32::from_bits(1).sig_exponent(), -148);
        // largest f32 subnormal sits just under 2^-126
        assert_eq!(f32::from_bits((1_u32 << 23) - 1).sig_exponent(), -126);
    }

    #[test]
    fn strip_quarters_pins_the_binade() {
        // 1.0 sits in the [1.0, 1.25) quarter: two quarters below reference
        let (pinned, q) = 1.0_f64.strip_quarters();
        assert_eq!(q, -2);
        assert_eq!(pinned, 1.5);

        let (pinned, q) = 1.5_f64.strip_quarters();
        assert_eq!(q, 0);
        assert_eq!(pinned, 1.5);

        let (pinned, q) = 1.75_f64.strip_quarters();
        assert_eq!(q, 1);
        assert_eq!(pinned, 1.5);

        let (pinned, q) = 1.5_f32.strip_quarters();
        assert_eq!(q, 0);
        assert_eq!(pinned, 1.5);
    }

    #[test]
    fn nonfinite_classification() {
        assert!(f64::NAN.is_nonfinite());
        assert!(f64::INFINITY.is_nonfinite());
        assert!(f64::NEG_INFINITY.is_nonfinite());
        assert!(!f64::MAX.is_nonfinite());
        assert!(!0.0_f64.is_nonfinite());
        assert!(f32::NAN.is_nonfinite());
        assert!(!f32::MAX.is_nonfinite());
    }
}
