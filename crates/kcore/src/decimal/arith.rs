//! Addition, subtraction and multiplication for [`super::Decimal`].
//!
//! Structurally identical to [`crate::bigint::arith`] but base 10^9, so
//! a carry is detected by `sum >= BASE` rather than by 32-bit
//! wraparound.

use super::{Decimal, BASE};
use crate::error::{KernelError, Result};
use std::cmp::Ordering;

const MAX_ORDER: i64 = 0x7FFF;

fn check_order(d: &Decimal) -> Result<()> {
    if !d.is_zero() && d.order() as i64 > MAX_ORDER {
        return Err(KernelError::overflow("decimal operand order exceeds 16-bit range"));
    }
    Ok(())
}

fn add_or_sub(result: &mut Decimal, a: &Decimal, b: &Decimal, add_b: bool) -> Result<()> {
    check_order(a)?;
    check_order(b)?;

    if a.is_zero() {
        return assign_signed(result, b, if add_b { 1 } else { -1 });
    }
    if b.is_zero() {
        return assign_signed(result, a, 1);
    }

    let b_sign = if add_b { b.sign() } else { -b.sign() };
    if a.sign() == b_sign {
        magnitude_add(result, a, b, a.sign() < 0)
    } else {
        magnitude_sub(result, a, b, b_sign)
    }
}

fn assign_signed(result: &mut Decimal, src: &Decimal, sign_mul: i32) -> Result<()> {
    if src.is_zero() {
        result.clear();
        return Ok(());
    }
    let negative = (src.sign() * sign_mul) < 0;
    result.set_raw(src.digits().to_vec(), negative, src.exponent_word() as i32)
}

/// Adds two magnitudes sharing sign `negative`. The bigger operand (by
/// `order = exponent_word + used`) supplies the trailing gap for the
/// smaller one, zero-extended down to the common exponent.
fn magnitude_add(result: &mut Decimal, a: &Decimal, b: &Decimal, negative: bool) -> Result<()> {
    let min_exp = a.exponent_word().min(b.exponent_word()) as i32;
    let off_a = (a.exponent_word() as i32 - min_exp) as usize;
    let off_b = (b.exponent_word() as i32 - min_exp) as usize;
    let len = (a.used() + off_a).max(b.used() + off_b);

    let mut out = vec![0u64; len + 1];
    for (i, &d) in a.digits().iter().enumerate() {
        out[i + off_a] += d as u64;
    }
    for (i, &d) in b.digits().iter().enumerate() {
        out[i + off_b] += d as u64;
    }
    let mut carry = 0u64;
    let mut final_digits = vec![0u32; len + 1];
    for i in 0..=len {
        let v = out.get(i).copied().unwrap_or(0) + carry;
        final_digits[i] = (v % BASE) as u32;
        carry = v / BASE;
    }
    debug_assert_eq!(carry, 0);

    result.set_raw(final_digits, negative, min_exp)
}

fn magnitude_sub(result: &mut Decimal, a: &Decimal, b: &Decimal, b_sign: i32) -> Result<()> {
    let (big, small, negative) = match a.cmp_magnitude(b) {
        Ordering::Less => (b, a, b_sign < 0),
        _ => (a, b, a.sign() < 0),
    };

    let min_exp = big.exponent_word().min(small.exponent_word()) as i32;
    let off_big = (big.exponent_word() as i32 - min_exp) as usize;
    let off_small = (small.exponent_word() as i32 - min_exp) as usize;
    let len = big.used() + off_big;

    let mut wide_big = vec![0i64; len];
    for (i, &d) in big.digits().iter().enumerate() {
        wide_big[i + off_big] = d as i64;
    }
    let mut wide_small = vec![0i64; len];
    for (i, &d) in small.digits().iter().enumerate() {
        wide_small[i + off_small] = d as i64;
    }

    let mut borrow = 0i64;
    let mut out = vec![0u32; len];
    for i in 0..len {
        let mut v = wide_big[i] - wide_small[i] - borrow;
        if v < 0 {
            v += BASE as i64;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = v as u32;
    }
    debug_assert_eq!(borrow, 0);

    result.set_raw(out, negative, min_exp)
}

pub fn add(result: &mut Decimal, a: &Decimal, b: &Decimal) -> Result<()> {
    add_or_sub(result, a, b, true)
}

pub fn sub(result: &mut Decimal, a: &Decimal, b: &Decimal) -> Result<()> {
    add_or_sub(result, a, b, false)
}

/// Digits below this size fall back to schoolbook multiplication,
/// mirroring [`crate::bigint::arith`]'s Karatsuba threshold.
const KARATSUBA_THRESHOLD: usize = 48;

/// `result = a * b`. The product's exponent is the sum of the operand
/// exponents; fails `Overflow` if that sum leaves 16-bit range.
pub fn mul(result: &mut Decimal, a: &Decimal, b: &Decimal) -> Result<()> {
    if a.is_zero() || b.is_zero() {
        result.clear();
        return Ok(());
    }
    let exponent_word = a.exponent_word() as i64 + b.exponent_word() as i64;
    if exponent_word < i16::MIN as i64 || exponent_word > i16::MAX as i64 {
        return Err(KernelError::overflow("decimal product exponent exceeds 16-bit range"));
    }
    let negative = a.is_negative() != b.is_negative();
    let product = mul_magnitude(a.digits(), b.digits());
    result.set_raw(product, negative, exponent_word as i32)
}

fn mul_magnitude(a: &[u32], b: &[u32]) -> Vec<u32> {
    let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if smaller.len() <= KARATSUBA_THRESHOLD {
        return schoolbook(smaller, larger);
    }
    karatsuba(smaller, larger)
}

fn schoolbook(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = vec![0u64; a.len() + b.len()];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0 {
            continue;
        }
        let mut carry = 0u64;
        for (j, &bj) in b.iter().enumerate() {
            let v = ai as u64 * bj as u64 + out[i + j] + carry;
            out[i + j] = v % BASE;
            carry = v / BASE;
        }
        let mut k = i + b.len();
        while carry != 0 {
            let v = out[k] + carry;
            out[k] = v % BASE;
            carry = v / BASE;
            k += 1;
        }
    }
    out.into_iter().map(|d| d as u32).collect()
}

fn trim(s: &[u32]) -> &[u32] {
    let mut n = s.len();
    while n > 0 && s[n - 1] == 0 {
        n -= 1;
    }
    &s[..n]
}

fn karatsuba(a: &[u32], b: &[u32]) -> Vec<u32> {
    let split = a.len() / 2;
    let (a_lo, a_hi) = (trim(&a[..split]), trim(&a[split..]));
    let (b_lo, b_hi) = (trim(&b[..split]), trim(&b[split..]));

    let t0 = mul_magnitude(a_hi, b_hi);
    let t1 = mul_magnitude(a_lo, b_lo);
    let sum_a = add_plain(a_hi, a_lo);
    let sum_b = add_plain(b_hi, b_lo);
    let t4 = mul_magnitude(&sum_a, &sum_b);
    let middle = sub_plain(&sub_plain(&t4, &t0), &t1);

    let mut out = vec![0u32; a.len() + b.len()];
    add_shifted(&mut out, &t1, 0);
    add_shifted(&mut out, &middle, split);
    add_shifted(&mut out, &t0, 2 * split);
    out
}

fn add_plain(a: &[u32], b: &[u32]) -> Vec<u32> {
    let len = a.len().max(b.len());
    let mut out = vec![0u32; len + 1];
    let mut carry = 0u64;
    for i in 0..len {
        let v = *a.get(i).unwrap_or(&0) as u64 + *b.get(i).unwrap_or(&0) as u64 + carry;
        out[i] = (v % BASE) as u32;
        carry = v / BASE;
    }
    out[len] = carry as u32;
    out
}

fn sub_plain(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = vec![0u32; a.len()];
    let mut borrow = 0i64;
    for i in 0..a.len() {
        let mut v = a[i] as i64 - *b.get(i).unwrap_or(&0) as i64 - borrow;
        if v < 0 {
            v += BASE as i64;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = v as u32;
    }
    debug_assert_eq!(borrow, 0, "decimal karatsuba subtraction underflowed");
    out
}

fn add_shifted(out: &mut [u32], part: &[u32], word_shift: usize) {
    let mut carry = 0u64;
    let mut i = 0;
    while i < part.len() || carry != 0 {
        let idx = word_shift + i;
        let v = out[idx] as u64 + *part.get(i).unwrap_or(&0) as u64 + carry;
        out[idx] = (v % BASE) as u32;
        carry = v / BASE;
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::parse::from_str;
    use crate::decimal::format::to_string;

    #[test]
    fn add_matches_decimal_strings() {
        let a = from_str("123.45").unwrap();
        let b = from_str("0.55").unwrap();
        let mut r = Decimal::zero();
        add(&mut r, &a, &b).unwrap();
        assert_eq!(to_string(&r), "124");
    }

    #[test]
    fn sub_with_swap_flips_sign() {
        let a = from_str("5").unwrap();
        let b = from_str("9").unwrap();
        let mut r = Decimal::zero();
        sub(&mut r, &a, &b).unwrap();
        assert_eq!(to_string(&r), "-4");
    }

    #[test]
    fn mul_is_commutative() {
        let a = from_str("123.456").unwrap();
        let b = from_str("-98.7").unwrap();
        let mut ab = Decimal::zero();
        let mut ba = Decimal::zero();
        mul(&mut ab, &a, &b).unwrap();
        mul(&mut ba, &b, &a).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn karatsuba_matches_schoolbook_on_large_operands() {
        let a_digits: Vec<u32> = (0..200u32).map(|i| (i.wrapping_mul(2654435761) % 1_000_000_000) | 1).collect();
        let b_digits: Vec<u32> = (0..150u32).map(|i| (i.wrapping_mul(40503) % 1_000_000_000) | 1).collect();
        let schoolbook_result = schoolbook(&a_digits, &b_digits);
        let karatsuba_result = mul_magnitude(&a_digits, &b_digits);
        assert_eq!(trim(&schoolbook_result), trim(&karatsuba_result));
    }
}
