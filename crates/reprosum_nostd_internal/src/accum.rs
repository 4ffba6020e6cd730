//! The binned accumulator at the heart of reproducible summation.
//!
//! # Why bins?
//!
//! Ordinary floating-point addition is not associative, so a parallel sum's
//! rounding error depends on how the input was partitioned and on the shape
//! of the merge tree. The fix used here is to never let a rounding decision
//! depend on accumulated state: each absorbed value is decomposed into
//! contributions at a small number of fixed magnitude levels ("bins"), and a
//! contribution at a level is a function of the value and the level's
//! granularity alone. Bin sums are kept pinned inside a single binade, so
//! adding a contribution to a bin sum is *exact* -- and exact additions are
//! associative and commutative. That is the entire trick: all rounding is
//! confined to the per-value decomposition (deterministic) and to the final
//! [`BinnedAccumulator::conv`] collapse (performed exactly once).
//!
//! # Working set
//!
//! An accumulator does not track the whole bin table. It keeps a working set
//! of [`FOLD`] consecutive bins aligned against the largest magnitude it has
//! been told about ([`BinnedAccumulator::set_max_abs_val`]), which is enough
//! to recover a sum that is as accurate as an ordinary sequential sum (and
//! usually quite a bit more accurate). Each bin has a primary sum plus a
//! carry sum; renormalization moves whole quarter-binades out of a primary
//! sum into its carry so the primary's binade never changes.
//!
//! # Contract
//!
//! [`BinnedAccumulator::unsafe_add`] is "unsafe" in the numerical (not the
//! Rust) sense: the caller must have established the bin alignment via
//! `set_max_abs_val` with an upper bound on the magnitudes being absorbed,
//! and must call [`BinnedAccumulator::renorm`] at least every
//! [`BinnedAccumulator::endurance`] deposits. Violating either contract
//! silently degrades accuracy and reproducibility; it is never checked on
//! the hot path and it never panics.

use crate::float::ReproFloat;
use core::ops::AddAssign;

/// the number of consecutive bins in an accumulator's working set
pub const FOLD: usize = 3;

/// bin index that magnitudes like `v` belong to (higher index, smaller bins)
pub(crate) fn value_index<F: ReproFloat>(v: F) -> usize {
    let e = v.exp_field();
    if e == 0 {
        if v == F::ZERO {
            F::MAX_INDEX
        } else {
            let from_exp = ((F::MAX_EXP - v.sig_exponent()) / F::BIN_WIDTH as i32) as usize;
            from_exp.min(F::MAX_INDEX)
        }
    } else {
        ((F::MAX_EXP + F::EXP_BIAS - e) / F::BIN_WIDTH as i32) as usize
    }
}

/// bin index a non-empty accumulator is aligned at, recovered from the
/// exponent of its leading primary sum
pub(crate) fn accum_index<F: ReproFloat>(p0: F) -> usize {
    let anchor = F::MAX_EXP + (F::MANT_DIG - F::BIN_WIDTH + 1) as i32 + F::EXP_BIAS;
    ((anchor - p0.exp_field()) / F::BIN_WIDTH as i32) as usize
}

/// A per-worker accumulator that absorbs floating-point values into a fixed
/// number of bin sums, such that merging two accumulators with `+=` is
/// exactly associative and commutative at the representation level.
///
/// Freshly-created accumulators are empty (all sums zero). See the module
/// docs for the usage contract.
#[derive(Clone, Debug)]
pub struct BinnedAccumulator<F: ReproFloat> {
    primary: [F; FOLD],
    carry: [F; FOLD],
    n_unsafe_adds: usize,
}

impl<F: ReproFloat> Default for BinnedAccumulator<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ReproFloat> BinnedAccumulator<F> {
    pub fn new() -> Self {
        BinnedAccumulator {
            primary: [F::ZERO; FOLD],
            carry: [F::ZERO; FOLD],
            n_unsafe_adds: 0,
        }
    }

    /// reset to the empty state (additive identity)
    pub fn zero(&mut self) {
        *self = Self::new();
    }

    /// the maximum number of [`Self::unsafe_add`] calls that may occur
    /// between renormalizations; constant per float type
    pub const fn endurance() -> usize {
        F::ENDURANCE
    }

    /// number of deposits since the last renormalization
    pub fn unsafe_adds_since_renorm(&self) -> usize {
        self.n_unsafe_adds
    }

    /// true once the endurance budget is spent and `renorm` is due
    pub fn needs_renorm(&self) -> bool {
        self.n_unsafe_adds >= F::ENDURANCE
    }

    /// true for the leading bin, whose fold-0 sum holds compressed deposits
    fn index0(&self) -> bool {
        self.primary[0].exp_field() == F::MAX_EXP + F::EXP_BIAS
    }

    /// Establish the bin alignment for upcoming deposits.
    ///
    /// `max_abs_val` must be the true maximum (or an upper bound) of the
    /// magnitudes about to be absorbed; otherwise deposits land in bins that
    /// are too small and the high-order part of a value is silently lost.
    /// This is a caller obligation, not internally checked. Realigning only
    /// ever coarsens the working set (shifts it toward larger bins); the
    /// folds that fall off the small end are dropped, which is exactly the
    /// truncation the format defines.
    pub fn set_max_abs_val(&mut self, max_abs_val: F) {
        self.realign(value_index::<F>(max_abs_val.abs()));
    }

    fn realign(&mut self, new_index: usize) {
        if self.primary[0].is_nonfinite() {
            return;
        }
        let bins = F::bin_table();
        if self.primary[0] == F::ZERO {
            for i in 0..FOLD {
                self.primary[i] = bins[new_index + i];
                self.carry[i] = F::ZERO;
            }
            return;
        }
        let old_index = accum_index::<F>(self.primary[0]);
        if old_index <= new_index {
            return;
        }
        let shift = (old_index - new_index).min(FOLD);
        // folds keep their absolute bin: entry i moves down to entry i+shift
        for i in (shift..FOLD).rev() {
            self.primary[i] = self.primary[i - shift];
            self.carry[i] = self.carry[i - shift];
        }
        for i in 0..shift {
            self.primary[i] = bins[new_index + i];
            self.carry[i] = F::ZERO;
        }
    }

    /// Fold one value into the working set.
    ///
    /// Requires that the alignment established by [`Self::set_max_abs_val`]
    /// covers `|x|`, and counts against the [`Self::endurance`] budget.
    pub fn unsafe_add(&mut self, x: F) {
        self.deposit(x);
        self.n_unsafe_adds += 1;
    }

    fn deposit(&mut self, x: F) {
        if x.is_nonfinite() || self.primary[0].is_nonfinite() {
            // non-finite inputs propagate through the leading sum
            self.primary[0] += x;
            return;
        }
        let mut x = x;
        if self.index0() {
            // The leading bin accumulates in a compressed frame so that
            // magnitudes near F::MAX cannot push the primary sum over the
            // top of its binade. The captured part is re-expanded (in two
            // halves) before cascading to the next fold.
            let m = self.primary[0];
            let q = (x * F::COMPRESSION).with_sticky_bit() + m;
            self.primary[0] = q;
            let mut r = m - q;
            r *= F::EXPANSION_HALF;
            x += r;
            x += r;
            for i in 1..FOLD - 1 {
                let m = self.primary[i];
                let q = x.with_sticky_bit() + m;
                self.primary[i] = q;
                x += m - q;
            }
            self.primary[FOLD - 1] += x.with_sticky_bit();
        } else {
            for i in 0..FOLD - 1 {
                let m = self.primary[i];
                let q = x.with_sticky_bit() + m;
                self.primary[i] = q;
                x += m - q;
            }
            self.primary[FOLD - 1] += x.with_sticky_bit();
        }
    }

    /// Redistribute the bin sums so absorption can safely continue.
    ///
    /// Pins every primary sum back to the reference quarter of its binade,
    /// moving the removed quarter-binades into the carries, and resets the
    /// deposit counter. Mathematically exact, so renormalizing more often
    /// than required never changes the result.
    pub fn renorm(&mut self) {
        self.n_unsafe_adds = 0;
        if self.primary[0] == F::ZERO || self.primary[0].is_nonfinite() {
            return;
        }
        for i in 0..FOLD {
            let (pinned, quarters) = self.primary[i].strip_quarters();
            self.primary[i] = pinned;
            self.carry[i] += F::from_i32(quarters);
        }
    }

    /// Collapse the bin sums into one scalar.
    ///
    /// Does not mutate the accumulator; calling it repeatedly without
    /// intervening mutation returns the same bit pattern every time.
    pub fn conv(&self) -> F {
        F::collapse(&self.primary, &self.carry)
    }
}

/// scalar add: realign, deposit, renorm (used for seeding)
impl<F: ReproFloat> AddAssign<F> for BinnedAccumulator<F> {
    fn add_assign(&mut self, x: F) {
        self.set_max_abs_val(x);
        self.deposit(x);
        self.renorm();
    }
}

/// Merge: exactly associative and commutative at the representation level.
///
/// Both operands are expected to be in renormalized form (every accumulator
/// handed across a merge boundary by this crate is); that is what keeps each
/// bin-sum addition below the top of its binade and therefore exact. The
/// result is renormalized again on the way out.
impl<F: ReproFloat> AddAssign<&BinnedAccumulator<F>> for BinnedAccumulator<F> {
    fn add_assign(&mut self, other: &BinnedAccumulator<F>) {
        let x0 = other.primary[0];
        if x0 == F::ZERO {
            return;
        }
        if self.primary[0] == F::ZERO {
            self.primary = other.primary;
            self.carry = other.carry;
            self.n_unsafe_adds = other.n_unsafe_adds;
            return;
        }
        if self.primary[0].is_nonfinite() || x0.is_nonfinite() {
            self.primary[0] += x0;
            return;
        }

        let bins = F::bin_table();
        let y_index = accum_index::<F>(self.primary[0]);
        let x_index = accum_index::<F>(x0);
        if y_index > x_index {
            // other is aligned to larger bins; realign self to match while
            // folding self's deltas into other's sums
            let shift = (y_index - x_index).min(FOLD);
            for i in (shift..FOLD).rev() {
                let delta = self.primary[i - shift] - bins[y_index + i - shift];
                self.primary[i] = other.primary[i] + delta;
                self.carry[i] = other.carry[i] + self.carry[i - shift];
            }
            for i in 0..shift {
                self.primary[i] = other.primary[i];
                self.carry[i] = other.carry[i];
            }
        } else if y_index < x_index {
            let shift = (x_index - y_index).min(FOLD);
            for i in shift..FOLD {
                self.primary[i] += other.primary[i - shift] - bins[x_index + i - shift];
                self.carry[i] += other.carry[i - shift];
            }
        } else {
            for i in 0..FOLD {
                self.primary[i] += other.primary[i] - bins[x_index + i];
                self.carry[i] += other.carry[i];
            }
        }
        self.renorm();
    }
}
