use ndarray::aview1;
use reprosum::{
    BinnedAccumulator, merge_accumulators, reduce_to_accumulator, reduce_to_scalar,
};

use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

fn random_doubles(seed: u64, n: usize) -> Vec<f64> {
    let mut my_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mantissa_dist = Uniform::new(-1.0_f64, 1.0).unwrap();
    let exponent_dist = Uniform::try_from(-9..=9).unwrap();
    (0..n)
        .map(|_| {
            let m: f64 = mantissa_dist.sample(&mut my_rng);
            m * 10.0_f64.powi(exponent_dist.sample(&mut my_rng))
        })
        .collect()
}

/// build one accumulator per contiguous chunk of `vals`
fn chunk_accumulators(vals: &[f64], n_chunks: usize) -> Vec<BinnedAccumulator<f64>> {
    let base = vals.len() / n_chunks;
    let remainder = vals.len() % n_chunks;
    let mut accs = Vec::with_capacity(n_chunks);
    let mut offset = 0;
    for i in 0..n_chunks {
        let len = base + usize::from(i < remainder);
        accs.push(reduce_to_accumulator(aview1(&vals[offset..offset + len]), 0.0));
        offset += len;
    }
    accs
}

#[test]
fn scalar_add_roundtrips_single_values() {
    for v in [
        0.0,
        1.0,
        -1.0,
        0.1,
        core::f64::consts::PI,
        -6.02214076e23,
        9.1e-31,
        1.7e308,
        3.3e-300,
    ] {
        let mut acc = BinnedAccumulator::new();
        acc += v;
        assert_eq!(acc.conv().to_bits(), v.to_bits(), "{v}");
    }
}

#[test]
fn merge_order_does_not_matter() {
    let vals = random_doubles(1234, 6_000);
    let reference = {
        let mut accs = chunk_accumulators(&vals, 8);
        merge_accumulators(&mut accs);
        accs[0].conv()
    };

    // left-to-right chain
    let mut accs = chunk_accumulators(&vals, 8);
    let (head, rest) = accs.split_first_mut().unwrap();
    for acc in rest.iter() {
        *head += acc;
    }
    assert_eq!(head.conv().to_bits(), reference.to_bits());

    // right-to-left chain
    let mut accs = chunk_accumulators(&vals, 8);
    while accs.len() > 1 {
        let tail = accs.pop().unwrap();
        let n = accs.len();
        accs[n - 1] += &tail;
    }
    assert_eq!(accs[0].conv().to_bits(), reference.to_bits());
}

#[test]
fn chunk_count_does_not_matter() {
    let vals = random_doubles(55, 4_999);
    let reference = reduce_to_scalar(aview1(&vals), 0.0);
    for n_chunks in [1, 2, 3, 9, 100, 4_999] {
        let mut accs = chunk_accumulators(&vals, n_chunks);
        merge_accumulators(&mut accs);
        assert_eq!(
            accs[0].conv().to_bits(),
            reference.to_bits(),
            "n_chunks = {n_chunks}"
        );
    }
}

#[test]
fn merging_widely_different_magnitudes() {
    // each accumulator is aligned to a very different bin index
    let tiny = reduce_to_accumulator(aview1(&[3.0e-290_f64, -1.0e-291]), 0.0);
    let middle = reduce_to_accumulator(aview1(&[2.25_f64]), 0.0);
    let huge = reduce_to_accumulator(aview1(&[1.0e290_f64, -1.0e290]), 0.0);

    let mut a = tiny.clone();
    a += &middle;
    a += &huge;

    let mut b = huge.clone();
    b += &middle;
    b += &tiny;

    assert_eq!(a.conv().to_bits(), b.conv().to_bits());
    // accuracy is relative to the largest magnitude seen: once the 1e290
    // pair sets the alignment, everything below its working set is dropped,
    // exactly as a sequential pass over the concatenated values would do
    assert_eq!(a.conv(), 0.0);

    let mut c = tiny;
    c += &middle;
    assert_eq!(c.conv(), 2.25);
}

#[test]
fn renorm_schedule_does_not_change_the_result() {
    let vals = random_doubles(9, 500);

    let lazy = reduce_to_accumulator(aview1(&vals), 0.0);

    // renormalize after every single deposit
    let mut eager = BinnedAccumulator::new();
    eager += 0.0;
    let mut max_abs_val = 0.0_f64;
    for &v in &vals {
        if v.abs() > max_abs_val {
            max_abs_val = v.abs();
            eager.set_max_abs_val(v.abs());
        }
        eager.unsafe_add(v);
        eager.renorm();
    }

    assert_eq!(eager.conv().to_bits(), lazy.conv().to_bits());
}

#[test]
fn zeroed_accumulator_is_the_additive_identity() {
    let vals = random_doubles(77, 100);
    let a = reduce_to_accumulator(aview1(&vals), 0.0);

    let mut reused = a.clone();
    reused.zero();
    reused += &a;
    assert_eq!(reused.conv().to_bits(), a.conv().to_bits());
}

#[test]
fn three_workers_any_merge_order() {
    // one value per worker, merged in each of the possible pairwise orders;
    // all of them must agree with a single sequential pass, even though the
    // naive sums of these orderings disagree
    let full = [1.0_f64, 1.0e16, -1.0];
    let sequential = reduce_to_scalar(aview1(&full), 0.0);

    let a = reduce_to_accumulator(aview1(&full[0..1]), 0.0);
    let b = reduce_to_accumulator(aview1(&full[1..2]), 0.0);
    let c = reduce_to_accumulator(aview1(&full[2..3]), 0.0);

    for [first, second, third] in [[&a, &b, &c], [&b, &c, &a], [&a, &c, &b]] {
        let mut merged = first.clone();
        merged += second;
        merged += third;
        assert_eq!(merged.conv().to_bits(), sequential.to_bits());
    }
}

#[test]
fn accumulation_beats_naive_summation() {
    // alternating large/small values: the naive sum drops every small term
    let mut vals = Vec::new();
    for _ in 0..1_000 {
        vals.push(1.0e16);
        vals.push(1.0);
        vals.push(-1.0e16);
    }
    let naive: f64 = vals.iter().sum();
    assert_eq!(naive, 0.0);
    assert_eq!(reduce_to_scalar(aview1(&vals), 0.0), 1_000.0);
}
