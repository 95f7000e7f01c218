//! Addition, subtraction and multiplication for [`super::BigInt`].

use super::BigInt;
use crate::error::{KernelError, Result};

/// Order (exponent + used digits) beyond which add/sub refuses to
/// proceed: the alignment step below needs `order` to fit in 16 bits,
/// same as the field it ultimately gets stored into.
const MAX_ORDER: u64 = 0xFFFF;

fn check_order(big: &BigInt) -> Result<()> {
    if !big.is_zero() && big.order() > MAX_ORDER {
        return Err(KernelError::overflow("operand order exceeds 16-bit range"));
    }
    Ok(())
}

/// `a + b` if `add_b` else `a - b`, written into `result`.
fn add_or_sub(result: &mut BigInt, a: &BigInt, b: &BigInt, add_b: bool) -> Result<()> {
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

fn assign_signed(result: &mut BigInt, src: &BigInt, sign_mul: i32) -> Result<()> {
    if src.is_zero() {
        result.clear();
        return Ok(());
    }
    let used = src.used();
    result.ensure_capacity(used)?;
    result.digits[..used].copy_from_slice(src.digits());
    let negative = (src.sign() * sign_mul) < 0;
    result.set_raw(used, negative, src.exponent())
}

/// Adds two magnitudes that share the same sign; `negative` is that
/// shared sign.
fn magnitude_add(result: &mut BigInt, a: &BigInt, b: &BigInt, negative: bool) -> Result<()> {
    let min_exp = a.exponent().min(b.exponent());
    let off_a = (a.exponent() - min_exp) as usize;
    let off_b = (b.exponent() - min_exp) as usize;
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
        final_digits[i] = (v & 0xFFFF_FFFF) as u32;
        carry = v >> 32;
    }
    debug_assert_eq!(carry, 0);

    result.ensure_capacity(final_digits.len())?;
    result.digits[..final_digits.len()].copy_from_slice(&final_digits);
    result.set_raw(final_digits.len(), negative, min_exp)
}

/// Subtracts magnitudes of opposite-signed operands: computes `a - b`
/// where `b`'s effective sign (after any add/sub flip) is `b_sign`.
/// If `|b| > |a|` the operands are swapped and the result sign flips.
fn magnitude_sub(result: &mut BigInt, a: &BigInt, b: &BigInt, b_sign: i32) -> Result<()> {
    let (big, small, negative) = match a.cmp_magnitude(b) {
        std::cmp::Ordering::Less => (b, a, b_sign < 0),
        _ => (a, b, a.sign() < 0),
    };

    let min_exp = big.exponent().min(small.exponent());
    let off_big = (big.exponent() - min_exp) as usize;
    let off_small = (small.exponent() - min_exp) as usize;
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
            v += 1 << 32;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = v as u32;
    }
    debug_assert_eq!(borrow, 0);

    result.ensure_capacity(out.len())?;
    result.digits[..out.len()].copy_from_slice(&out);
    result.set_raw(out.len(), negative, min_exp)
}

/// `result = a + b`.
pub fn add(result: &mut BigInt, a: &BigInt, b: &BigInt) -> Result<()> {
    add_or_sub(result, a, b, true)
}

/// `result = a - b`.
pub fn sub(result: &mut BigInt, a: &BigInt, b: &BigInt) -> Result<()> {
    add_or_sub(result, a, b, false)
}

/// `result = a * factor` for a plain `u32` scalar.
pub fn mul_u32(result: &mut BigInt, a: &BigInt, factor: u32) -> Result<()> {
    if a.is_zero() || factor == 0 {
        result.clear();
        return Ok(());
    }
    let used = a.used();
    let mut out = vec![0u32; used + 1];
    let mut carry = 0u64;
    for i in 0..used {
        let v = a.digits()[i] as u64 * factor as u64 + carry;
        out[i] = (v & 0xFFFF_FFFF) as u32;
        carry = v >> 32;
    }
    out[used] = carry as u32;

    result.ensure_capacity(out.len())?;
    result.digits[..out.len()].copy_from_slice(&out);
    result.set_raw(out.len(), a.is_negative(), a.exponent())
}

/// Digits below this size fall back to schoolbook multiplication
/// instead of splitting for Karatsuba.
const KARATSUBA_THRESHOLD: usize = 48;

/// `result = a * b`. Dispatches to schoolbook multiplication for small
/// operands and a Karatsuba-style split otherwise.
pub fn mul(result: &mut BigInt, a: &BigInt, b: &BigInt) -> Result<()> {
    if a.is_zero() || b.is_zero() {
        result.clear();
        return Ok(());
    }
    let exponent = a.exponent() as u64 + b.exponent() as u64;
    if exponent > 0xFFFF {
        return Err(KernelError::overflow("product exponent exceeds 16-bit range"));
    }
    let negative = a.is_negative() != b.is_negative();

    let product = mul_magnitude(a.digits(), b.digits());

    result.ensure_capacity(product.len())?;
    result.digits[..product.len()].copy_from_slice(&product);
    result.set_raw(product.len(), negative, exponent as u32)
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
            out[i + j] = v & 0xFFFF_FFFF;
            carry = v >> 32;
        }
        let mut k = i + b.len();
        while carry != 0 {
            let v = out[k] + carry;
            out[k] = v & 0xFFFF_FFFF;
            carry = v >> 32;
            k += 1;
        }
    }
    out.into_iter().map(|d| d as u32).collect()
}

/// Drops trailing (high) zero digits so the caller sees the true
/// significant width of a split half.
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
    // `b` (the larger operand) is split at the same boundary, leaving
    // its high half wider whenever `b.len() > a.len()`.
    let (b_lo, b_hi) = (trim(&b[..split]), trim(&b[split..]));

    let t0 = mul_magnitude(a_hi, b_hi); // high * high
    let t1 = mul_magnitude(a_lo, b_lo); // low * low

    let sum_a = add_plain(a_hi, a_lo);
    let sum_b = add_plain(b_hi, b_lo);
    let t4 = mul_magnitude(&sum_a, &sum_b);
    // middle = t4 - t0 - t1
    let middle = sub_plain(&sub_plain(&t4, &t0), &t1);

    // result = t0 << (2*split*32) + middle << (split*32) + t1
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
        out[i] = (v & 0xFFFF_FFFF) as u32;
        carry = v >> 32;
    }
    out[len] = carry as u32;
    out
}

/// `a - b` assuming `a >= b`, both treated as unsigned little-endian
/// magnitudes of arbitrary (possibly mismatched) length.
fn sub_plain(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = vec![0u32; a.len()];
    let mut borrow = 0i64;
    for i in 0..a.len() {
        let mut v = a[i] as i64 - *b.get(i).unwrap_or(&0) as i64 - borrow;
        if v < 0 {
            v += 1 << 32;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = v as u32;
    }
    debug_assert_eq!(borrow, 0, "karatsuba subtraction underflowed");
    out
}

fn add_shifted(out: &mut [u32], part: &[u32], word_shift: usize) {
    let mut carry = 0u64;
    let mut i = 0;
    while i < part.len() || carry != 0 {
        let idx = word_shift + i;
        let v = out[idx] as u64 + *part.get(i).unwrap_or(&0) as u64 + carry;
        out[idx] = (v & 0xFFFF_FFFF) as u32;
        carry = v >> 32;
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigint::BigInt;

    fn big(v: u64) -> BigInt {
        let mut b = BigInt::zero();
        b.set_u64(v).unwrap();
        b
    }

    #[test]
    fn add_matches_u64() {
        let mut r = BigInt::zero();
        add(&mut r, &big(123_456_789), &big(987_654_321)).unwrap();
        assert_eq!(r, big(123_456_789 + 987_654_321));
    }

    #[test]
    fn sub_with_swap_flips_sign() {
        let mut r = BigInt::zero();
        sub(&mut r, &big(5), &big(9)).unwrap();
        let mut expect = big(4);
        expect.negate();
        assert_eq!(r, expect);
    }

    #[test]
    fn mult_is_commutative() {
        let a = big(98_765_432_123);
        let b = big(12_345);
        let mut ab = BigInt::zero();
        let mut ba = BigInt::zero();
        mul(&mut ab, &a, &b).unwrap();
        mul(&mut ba, &b, &a).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn karatsuba_matches_schoolbook_on_large_operands() {
        let a_digits: Vec<u32> = (0..200u32).map(|i| i.wrapping_mul(2654435761) | 1).collect();
        let b_digits: Vec<u32> = (0..150u32).map(|i| i.wrapping_mul(40503) | 1).collect();
        let schoolbook_result = schoolbook(&a_digits, &b_digits);
        let karatsuba_result = mul_magnitude(&a_digits, &b_digits);
        assert_eq!(trim(&schoolbook_result), trim(&karatsuba_result));
    }
}
