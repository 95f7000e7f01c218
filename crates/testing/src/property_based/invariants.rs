//! Checks the quantified invariants and round-trip laws from the
//! numeric kernels' design: canonical form, the `from_f64` floor
//! bracket, multiplication commutativity, the division identity, and
//! the shift/unshift round-trip for `BigInt`; digit range and used/
//! exponent bounds for `Decimal`.

use kcore::bigint::{self, BigInt};
use kcore::decimal::{self, Decimal};
use proptest::prelude::*;

fn bigint_from_i64(value: i64) -> BigInt {
    let mut b = BigInt::new(4).unwrap();
    b.set_i64(value).unwrap();
    b
}

fn assert_canonical(b: &BigInt) {
    if b.is_zero() {
        assert_eq!(b.exponent(), 0);
    } else {
        assert_ne!(*b.digits().last().unwrap(), 0);
    }
}

proptest! {
    #[test]
    fn bigint_stays_canonical_after_add(a in any::<i64>(), b in any::<i64>()) {
        let x = bigint_from_i64(a);
        let y = bigint_from_i64(b);
        let mut sum = BigInt::new(4).unwrap();
        if bigint::add(&mut sum, &x, &y).is_ok() {
            assert_canonical(&sum);
        }
    }

    #[test]
    fn bigint_mul_is_commutative(a in any::<i32>(), b in any::<i32>()) {
        let x = bigint_from_i64(a as i64);
        let y = bigint_from_i64(b as i64);
        let mut xy = BigInt::new(4).unwrap();
        let mut yx = BigInt::new(4).unwrap();
        bigint::mul(&mut xy, &x, &y).unwrap();
        bigint::mul(&mut yx, &y, &x).unwrap();
        prop_assert_eq!(xy.cmp_value(&yx), std::cmp::Ordering::Equal);
    }

    #[test]
    fn bigint_divmod_identity_holds(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(b != 0);
        let x = bigint_from_i64(a);
        let y = bigint_from_i64(b);
        let mut q = BigInt::new(4).unwrap();
        let mut r = BigInt::new(4).unwrap();
        bigint::divmod(&mut q, &mut r, &x, &y).unwrap();

        let mut qb = BigInt::new(8).unwrap();
        bigint::mul(&mut qb, &q, &y).unwrap();
        let mut reconstructed = BigInt::new(8).unwrap();
        bigint::add(&mut reconstructed, &qb, &r).unwrap();

        prop_assert_eq!(reconstructed.cmp_value(&x), std::cmp::Ordering::Equal);
        prop_assert!(r.cmp_magnitude(&y) == std::cmp::Ordering::Less);
    }

    #[test]
    fn bigint_shift_left_then_right_restores_value(value in any::<i64>(), n in 0u32..64) {
        // shift_left zeroes the low `n` bits by construction, so
        // shifting right by the same amount must exactly undo it.
        let original = bigint_from_i64(value);
        let mut x = original.clone();
        x.shift_left(n).unwrap();
        x.shift_right(n).unwrap();
        prop_assert_eq!(x.cmp_value(&original), std::cmp::Ordering::Equal);
    }

    #[test]
    fn bigint_from_f64_satisfies_floor_bracket(value in 0.0f64..1.0e15) {
        let mut big = BigInt::new(8).unwrap();
        bigint::set_from_f64(&mut big, value).unwrap();
        let floor = bigint::to_f64(&big);
        prop_assert!(floor <= value);
        prop_assert!(value < floor + 1.0);
    }

    #[test]
    fn decimal_digits_stay_in_range(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        if let Ok(d) = decimal::from_f64(value) {
            prop_assert!(d.used() <= 127);
            for &digit in d.digits() {
                prop_assert!((digit as u64) < decimal::BASE);
            }
            prop_assert!(d.exponent_word() as i32 * 9 <= 9 * 32767);
        }
    }

    #[test]
    fn decimal_from_str_round_trips_through_f64(int_part in 0i64..1_000_000_000i64) {
        let s = int_part.to_string();
        let d = decimal::from_str(&s).unwrap();
        prop_assert_eq!(decimal::to_f64(&d), int_part as f64);
    }

    #[test]
    fn decimal_add_then_sub_restores_value(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let da = decimal::from_str(&a.to_string()).unwrap();
        let db = decimal::from_str(&b.to_string()).unwrap();
        let mut sum = Decimal::zero();
        decimal::add(&mut sum, &da, &db).unwrap();
        let mut back = Decimal::zero();
        decimal::sub(&mut back, &sum, &db).unwrap();
        prop_assert_eq!(decimal::to_f64(&back), a as f64);
    }
}
