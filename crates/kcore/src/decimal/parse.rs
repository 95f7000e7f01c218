//! Textual parsing for [`super::Decimal`] (`setfromchar`).
//!
//! Grammar (no locale, ASCII digits only):
//! `[-] {0..9}* [ . {0..9}* ] [ e [+|-] {0..9}+ ]`

use super::{Decimal, BASE, EXP_GRANULARITY};
use crate::error::{KernelError, Result};

/// Parses a decimal string. Syntax errors return `InvalidInput`;
/// a mantissa or exponent outside the representable range returns
/// `Overflow`.
pub fn from_str(s: &str) -> Result<Decimal> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = &bytes[int_start..i];

    let mut frac_digits: &[u8] = &[];
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = &bytes[frac_start..i];
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return Err(KernelError::invalid("decimal string has no digits"));
    }

    let mut exp_value: i64 = 0;
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        let exp_negative = match bytes.get(i) {
            Some(b'-') => {
                i += 1;
                true
            }
            Some(b'+') => {
                i += 1;
                false
            }
            _ => false,
        };
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return Err(KernelError::invalid("decimal exponent has no digits"));
        }
        for &b in &bytes[digits_start..i] {
            exp_value = exp_value
                .checked_mul(10)
                .and_then(|v| v.checked_add((b - b'0') as i64))
                .ok_or_else(|| KernelError::overflow("decimal exponent literal too large"))?;
        }
        if exp_negative {
            exp_value = -exp_value;
        }
    }

    if i != bytes.len() {
        return Err(KernelError::invalid("trailing characters after decimal literal"));
    }

    // Combined mantissa is `int_digits ++ frac_digits` read as one
    // big base-10 integer; the decimal point's position folds into
    // the exponent as `exp_value - frac_digits.len()`.
    let exponent = exp_value
        .checked_sub(frac_digits.len() as i64)
        .ok_or_else(|| KernelError::overflow("decimal exponent underflowed"))?;

    let mut mantissa_words: Vec<u32> = Vec::new();
    let mut any_nonzero = false;
    for &b in int_digits.iter().chain(frac_digits.iter()) {
        let digit = (b - b'0') as u64;
        any_nonzero |= digit != 0;
        mul_add_small(&mut mantissa_words, 10, digit);
    }

    if !any_nonzero {
        return Ok(Decimal::zero());
    }

    let rem = exponent.rem_euclid(EXP_GRANULARITY as i64) as u32;
    let word_exp = (exponent - rem as i64) / EXP_GRANULARITY as i64;
    if rem > 0 {
        mul_add_small(&mut mantissa_words, 10u64.pow(rem), 0);
    }
    if !(i16::MIN as i64..=i16::MAX as i64).contains(&word_exp) {
        return Err(KernelError::overflow("decimal exponent exceeds 16-bit range"));
    }

    let mut result = Decimal::zero();
    result.set_raw(mantissa_words, negative, word_exp as i32)?;
    Ok(result)
}

/// `words = words * factor + addend`, little-endian base-`10^9`,
/// growing `words` as needed. `factor` must be `< BASE`.
fn mul_add_small(words: &mut Vec<u32>, factor: u64, addend: u64) {
    let mut carry = addend;
    for w in words.iter_mut() {
        let v = *w as u64 * factor + carry;
        *w = (v % BASE) as u32;
        carry = v / BASE;
    }
    while carry != 0 {
        words.push((carry % BASE) as u32);
        carry /= BASE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integer() {
        let d = from_str("12345").unwrap();
        assert!(!d.is_negative());
        assert_eq!(d.exponent(), 0);
    }

    #[test]
    fn parses_negative_fraction() {
        let d = from_str("-3.25").unwrap();
        assert!(d.is_negative());
    }

    #[test]
    fn parses_exponent_form() {
        let d = from_str("6.022e23").unwrap();
        assert!(!d.is_zero());
    }

    #[test]
    fn zero_string_variants_are_exact_zero() {
        for text in ["0", "-0", "0.000", "0e50", "-0.0e-3"] {
            let d = from_str(text).unwrap();
            assert!(d.is_zero(), "{text} should parse to zero");
            assert_eq!(d.exponent_word(), 0);
        }
    }

    #[test]
    fn rejects_empty_and_malformed_input() {
        assert!(from_str("").is_err());
        assert!(from_str("-").is_err());
        assert!(from_str("1.2.3").is_err());
        assert!(from_str("1e").is_err());
        assert!(from_str("abc").is_err());
    }
}
