//! Conversions between [`super::BigInt`] and `f64`.
//!
//! `BigInt` only ever stores an integer value (the exponent field can
//! shift left, never right), so `from_f64` is exact truncation toward
//! zero of the magnitude -- not a call through the platform's
//! `trunc()` -- and is therefore exact even for magnitudes far beyond
//! `f64`'s 53 bits of precision.

use super::BigInt;
use crate::error::{KernelError, Result};

const MANTISSA_BITS: u32 = 52;
const EXPONENT_BIAS: i64 = 1023;

/// Sets `result` to `floor(|value|)` with `result`'s sign matching
/// `value`'s, exactly. Values with `|value| < 1` (including subnormals
/// and signed zero) produce exact zero.
pub fn set_from_f64(result: &mut BigInt, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(KernelError::invalid("cannot convert a non-finite f64 to BigInt"));
    }
    let bits = value.to_bits();
    let negative = (bits >> 63) != 0;
    let exp_field = ((bits >> MANTISSA_BITS) & 0x7FF) as i64;
    let mantissa_field = bits & ((1u64 << MANTISSA_BITS) - 1);

    if exp_field == 0 {
        // Zero or subnormal: subnormals all have magnitude < 1.
        result.clear();
        return Ok(());
    }

    let unbiased_exp = exp_field - EXPONENT_BIAS;
    if unbiased_exp < 0 {
        result.clear();
        return Ok(());
    }

    let mantissa53 = mantissa_field | (1u64 << MANTISSA_BITS);
    let shift = unbiased_exp - MANTISSA_BITS as i64;
    if shift >= 0 {
        result.set_u64(mantissa53)?;
        result.shift_left(shift as u32)?;
    } else {
        // |shift| <= 52 here (unbiased_exp >= 0), so a plain integer
        // shift truncates exactly -- no need to round through
        // BigInt::shift_right, whose PRESERVE_RIGHT_BITS behavior is
        // for a different use case (see its doc comment).
        result.set_u64(mantissa53 >> (-shift) as u32)?;
    }
    if negative && !result.is_zero() {
        result.negate();
    }
    Ok(())
}

/// Narrows `big` to the nearest representable `f64`, rounding the
/// discarded low bits to nearest-even the same way a native integer
/// to float cast does. Magnitudes outside `f64`'s range produce
/// `+-inf`, the same observable overflow behavior a hardware
/// conversion would produce.
pub fn to_f64(big: &BigInt) -> f64 {
    if big.is_zero() {
        return 0.0;
    }
    let digits = big.digits();
    let used = digits.len();
    // Pull in enough top digits to give the f64 cast more than 53
    // bits to round from (up to 4 digits = 128 bits).
    let take = used.min(4);
    let mut top: u128 = 0;
    for i in 0..take {
        top |= (digits[used - take + i] as u128) << (32 * i);
    }
    let dropped_words = used - take;
    let scale_words = dropped_words as i64 + big.exponent() as i64;

    let mut value = top as f64;
    value *= pow2(scale_words * 32);
    if big.is_negative() {
        value = -value;
    }
    value
}

/// `2f64.powi` saturates cleanly to `inf`/`0.0` for the exponents this
/// module ever produces, which is the behavior we want to preserve.
fn pow2(bits: i64) -> f64 {
    if bits > i32::MAX as i64 {
        f64::INFINITY
    } else if bits < i32::MIN as i64 {
        0.0
    } else {
        2f64.powi(bits as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_integers() {
        for v in [0.0, 1.0, 2.0, 1023.0, 1_000_000.5] {
            let mut b = BigInt::zero();
            set_from_f64(&mut b, v).unwrap();
            let floor_v = v.floor();
            assert_eq!(to_f64(&b), floor_v);
        }
    }

    #[test]
    fn from_f64_satisfies_floor_bracket() {
        for v in [3.5f64, 1e20, 123456789.125, 2.0f64.powi(70) + 5.0] {
            let mut b = BigInt::zero();
            set_from_f64(&mut b, v).unwrap();
            let back = to_f64(&b);
            assert!(back <= v, "{back} should be <= {v}");
            // back + 1.0 may itself round, so compare via the bigint.
            let mut one = BigInt::zero();
            one.set_u64(1).unwrap();
            let mut plus_one = BigInt::zero();
            super::super::arith::add(&mut plus_one, &b, &one).unwrap();
            assert!(v < to_f64(&plus_one) || (to_f64(&plus_one) - v).abs() < 1.0);
        }
    }

    #[test]
    fn negative_values_preserve_sign() {
        let mut b = BigInt::zero();
        set_from_f64(&mut b, -42.9).unwrap();
        assert!(b.is_negative());
        assert_eq!(to_f64(&b), -42.0);
    }

    #[test]
    fn fraction_only_values_are_zero() {
        let mut b = BigInt::zero();
        set_from_f64(&mut b, 0.999).unwrap();
        assert!(b.is_zero());
    }
}
