//! Kani proof harnesses. These only compile under `cargo kani`; a
//! normal `cargo test` build never sees the `#[kani::proof]` items
//! below because `cfg(kani)` is false outside that tool.

#![cfg(kani)]

use kcore::bigint::{self, BigInt};

/// `BigInt::add` of two arbitrary `i64`s always leaves the result in
/// canonical form: zero has `exponent == 0`, and a nonzero result has
/// no leading zero digit.
#[kani::proof]
fn add_preserves_canonical_form() {
    let a: i64 = kani::any();
    let b: i64 = kani::any();

    let mut x = BigInt::new(4).unwrap();
    x.set_i64(a).unwrap();
    let mut y = BigInt::new(4).unwrap();
    y.set_i64(b).unwrap();

    let mut sum = BigInt::new(4).unwrap();
    if bigint::add(&mut sum, &x, &y).is_ok() {
        if sum.is_zero() {
            assert_eq!(sum.exponent(), 0);
        } else {
            assert_ne!(*sum.digits().last().unwrap(), 0);
        }
    }
}

/// `Decimal::from_f64` never produces a value with more than
/// `MAX_CAPACITY` digit words or a digit outside `[0, BASE)`.
#[kani::proof]
fn decimal_from_f64_respects_digit_bounds() {
    use kcore::decimal::{self, MAX_CAPACITY};

    let bits: u64 = kani::any();
    let value = f64::from_bits(bits);
    kani::assume(value.is_finite());

    if let Ok(d) = decimal::from_f64(value) {
        assert!(d.used() <= MAX_CAPACITY as usize);
        for &digit in d.digits() {
            assert!((digit as u64) < decimal::BASE);
        }
    }
}
