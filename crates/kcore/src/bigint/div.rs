//! Long division for [`super::BigInt`]: `divmod`, the single-digit
//! fast path `divmod_u32`, and the schoolbook digit-estimation helpers
//! they share.

use super::BigInt;
use crate::error::{KernelError, Result};
use std::cmp::Ordering;

/// Owned quotient/remainder pair returned by [`divmod`].
pub struct DivMod {
    pub quotient: BigInt,
    pub remainder: BigInt,
}

/// `a / b`, `a % b`. The quotient's sign is the XOR of the operand
/// signs; the remainder takes the dividend's sign. `|remainder| < |b|`
/// always holds, and `a == quotient*b + remainder`.
pub fn divmod(quotient: &mut BigInt, remainder: &mut BigInt, a: &BigInt, b: &BigInt) -> Result<()> {
    if b.is_zero() {
        return Err(KernelError::invalid("division by zero"));
    }
    if a.is_zero() {
        quotient.clear();
        remainder.clear();
        return Ok(());
    }

    // Align both operands to a common (minimum) exponent by
    // materializing the implicit low zero digits of whichever operand
    // has the larger exponent; this reduces to a plain, exponent-free
    // long division whose remainder is reported at the common exponent.
    let common_exp = a.exponent().min(b.exponent());
    let l_full = widen(a.digits(), a.exponent() - common_exp);
    let r_full = widen(b.digits(), b.exponent() - common_exp);

    let (q_digits, r_digits) = divide_magnitude(&l_full, &r_full);

    let q_negative = a.is_negative() != b.is_negative();
    let r_negative = a.is_negative();

    quotient.ensure_capacity(q_digits.len().max(1))?;
    if !q_digits.is_empty() {
        quotient.digits[..q_digits.len()].copy_from_slice(&q_digits);
    }
    quotient.set_raw(q_digits.len(), q_negative, 0)?;

    remainder.ensure_capacity(r_digits.len().max(1))?;
    if !r_digits.is_empty() {
        remainder.digits[..r_digits.len()].copy_from_slice(&r_digits);
    }
    remainder.set_raw(r_digits.len(), r_negative, common_exp)
}

/// Convenience wrapper returning an owned [`DivMod`].
pub fn divmod_owned(a: &BigInt, b: &BigInt) -> Result<DivMod> {
    let mut q = BigInt::zero();
    let mut r = BigInt::zero();
    divmod(&mut q, &mut r, a, b)?;
    Ok(DivMod { quotient: q, remainder: r })
}

/// Divides by a plain `u32`; returns the (always non-negative,
/// single-word) remainder and writes the quotient into `quotient`.
pub fn divmod_u32(quotient: &mut BigInt, a: &BigInt, divisor: u32) -> Result<u32> {
    if divisor == 0 {
        return Err(KernelError::invalid("division by zero"));
    }
    if a.is_zero() {
        quotient.clear();
        return Ok(0);
    }
    let used = a.used();
    let mut out = vec![0u32; used];
    let mut rem = 0u64;
    for i in (0..used).rev() {
        let cur = (rem << 32) | a.digits()[i] as u64;
        out[i] = (cur / divisor as u64) as u32;
        rem = cur % divisor as u64;
    }
    quotient.ensure_capacity(out.len().max(1))?;
    quotient.digits[..out.len()].copy_from_slice(&out);
    quotient.set_raw(out.len(), a.is_negative(), a.exponent())?;
    Ok(rem as u32)
}

/// Prepends `extra` zero low-order digits to `digits` (little-endian),
/// i.e. multiplies the represented magnitude by `base^extra`.
fn widen(digits: &[u32], extra: u32) -> Vec<u32> {
    let extra = extra as usize;
    if extra == 0 {
        return digits.to_vec();
    }
    let mut out = vec![0u32; extra + digits.len()];
    out[extra..].copy_from_slice(digits);
    out
}

fn trim(v: Vec<u32>) -> Vec<u32> {
    let mut v = v;
    while v.last() == Some(&0) {
        v.pop();
    }
    v
}

fn cmp_mag(a: &[u32], b: &[u32]) -> Ordering {
    let a = {
        let mut n = a.len();
        while n > 0 && a[n - 1] == 0 {
            n -= 1;
        }
        &a[..n]
    };
    let b = {
        let mut n = b.len();
        while n > 0 && b[n - 1] == 0 {
            n -= 1;
        }
        &b[..n]
    };
    match a.len().cmp(&b.len()) {
        Ordering::Equal => {
            for i in (0..a.len()).rev() {
                match a[i].cmp(&b[i]) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            Ordering::Equal
        }
        ord => ord,
    }
}

fn mul_small(r: &[u32], q: u32) -> Vec<u32> {
    if q == 0 {
        return vec![0; r.len() + 1];
    }
    let mut out = vec![0u32; r.len() + 1];
    let mut carry = 0u64;
    for (i, &d) in r.iter().enumerate() {
        let v = d as u64 * q as u64 + carry;
        out[i] = (v & 0xFFFF_FFFF) as u32;
        carry = v >> 32;
    }
    out[r.len()] = carry as u32;
    out
}

fn sub_assign(a: &mut Vec<u32>, b: &[u32]) {
    let mut borrow = 0i64;
    for i in 0..a.len() {
        let mut v = a[i] as i64 - *b.get(i).unwrap_or(&0) as i64 - borrow;
        if v < 0 {
            v += 1 << 32;
            borrow = 1;
        } else {
            borrow = 0;
        }
        a[i] = v as u32;
    }
    debug_assert_eq!(borrow, 0, "long division subtraction underflowed");
}

/// Estimates the next quotient digit from the two most significant
/// digits of the running remainder `rem` (padded with a leading zero)
/// against the single most significant digit of the divisor `r` --
/// the same scale the decimal sibling of this routine uses, so the
/// ratio being estimated is an actual `u64`-sized quantity over a
/// `u32`-sized one rather than two differently-truncated two-digit
/// windows. The estimate can land one digit high or low, so the
/// correction loop walks in either direction until `q*r <= rem <
/// (q+1)*r`.
fn estimate_and_correct(rem: &[u32], r: &[u32]) -> u32 {
    let n = r.len();
    let top_rem = ((*rem.get(n).unwrap_or(&0) as u64) << 32) | *rem.get(n - 1).unwrap_or(&0) as u64;
    let divisor_top = r[n - 1] as u64;
    let mut q = (top_rem / divisor_top.max(1)).min(u32::MAX as u64) as u32;

    loop {
        let trial = mul_small(r, q);
        if cmp_mag(&trial, rem) == Ordering::Greater {
            q -= 1;
            continue;
        }
        if q == u32::MAX {
            return q;
        }
        let next_trial = mul_small(r, q + 1);
        if cmp_mag(&next_trial, rem) != Ordering::Greater {
            q += 1;
            continue;
        }
        return q;
    }
}

/// Plain (exponent-free) long division of little-endian magnitudes.
/// Returns `(quotient, remainder)`, both trimmed to canonical form
/// (possibly empty, meaning zero).
fn divide_magnitude(l: &[u32], r: &[u32]) -> (Vec<u32>, Vec<u32>) {
    let r = trim(r.to_vec());
    assert!(!r.is_empty(), "division by zero magnitude");

    if r.len() == 1 {
        let divisor = r[0] as u64;
        let mut out = vec![0u32; l.len()];
        let mut rem = 0u64;
        for i in (0..l.len()).rev() {
            let cur = (rem << 32) | l[i] as u64;
            out[i] = (cur / divisor) as u32;
            rem = cur % divisor;
        }
        return (trim(out), if rem == 0 { vec![] } else { vec![rem as u32] });
    }

    if cmp_mag(l, &r) == Ordering::Less {
        return (vec![], trim(l.to_vec()));
    }

    let n = r.len();
    let mut quotient = vec![0u32; l.len()];
    // `window` holds the digits "brought down" so far, most
    // significant digit last processed at position 0.
    let mut window: Vec<u32> = vec![];

    for i in (0..l.len()).rev() {
        window.insert(0, l[i]);
        while window.last() == Some(&0) && window.len() > n {
            window.pop();
        }
        if cmp_mag(&window, &r) == Ordering::Less {
            quotient[i] = 0;
            continue;
        }
        let q = estimate_and_correct(&window, &r);
        let trial = mul_small(&r, q);
        sub_assign(&mut window, &trial);
        while window.last() == Some(&0) {
            window.pop();
        }
        quotient[i] = q;
    }

    (trim(quotient), window)
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
    fn divmod_matches_u64_semantics() {
        let mut q = BigInt::zero();
        let mut r = BigInt::zero();
        divmod(&mut q, &mut r, &big(1_000_000_007), &big(97)).unwrap();
        assert_eq!(q, big(1_000_000_007 / 97));
        assert_eq!(r, big(1_000_000_007 % 97));
    }

    #[test]
    fn divmod_reconstructs_dividend() {
        let a_digits: Vec<u32> = (1..=80u32).map(|i| i.wrapping_mul(2654435761) | 1).collect();
        let b_digits: Vec<u32> = (1..=5u32).map(|i| i.wrapping_mul(40503) | 1).collect();
        let mut a = BigInt::new(a_digits.len() as u32).unwrap();
        a.digits[..a_digits.len()].copy_from_slice(&a_digits);
        a.set_raw(a_digits.len(), false, 0).unwrap();
        let mut b = BigInt::new(b_digits.len() as u32).unwrap();
        b.digits[..b_digits.len()].copy_from_slice(&b_digits);
        b.set_raw(b_digits.len(), false, 0).unwrap();

        let DivMod { quotient, remainder } = divmod_owned(&a, &b).unwrap();
        let mut reconstructed = BigInt::zero();
        let mut qb = BigInt::zero();
        super::super::arith::mul(&mut qb, &quotient, &b).unwrap();
        super::super::arith::add(&mut reconstructed, &qb, &remainder).unwrap();
        assert_eq!(reconstructed, a);
        assert_eq!(remainder.cmp_magnitude(&b), Ordering::Less);
    }

    #[test]
    fn divmod_handles_multi_digit_divisor_top_digit_underestimate() {
        // divisor = 5 * 2^32, dividend = 5 * 2^64 - 1: the top-digit
        // estimate for this pair used to come out as 0 instead of
        // 0xFFFFFFFF when the divisor estimate was scaled wrong.
        let mut divisor = BigInt::new(2).unwrap();
        divisor.digits[0] = 0;
        divisor.digits[1] = 5;
        divisor.set_raw(2, false, 0).unwrap();

        let mut dividend = BigInt::new(3).unwrap();
        dividend.digits[0] = 0xFFFF_FFFF;
        dividend.digits[1] = 0xFFFF_FFFF;
        dividend.digits[2] = 4;
        dividend.set_raw(3, false, 0).unwrap();

        let DivMod { quotient, remainder } = divmod_owned(&dividend, &divisor).unwrap();
        assert_eq!(quotient, big(0xFFFF_FFFF));
        let mut qb = BigInt::zero();
        let mut reconstructed = BigInt::zero();
        super::super::arith::mul(&mut qb, &quotient, &divisor).unwrap();
        super::super::arith::add(&mut reconstructed, &qb, &remainder).unwrap();
        assert_eq!(reconstructed, dividend);
        assert_eq!(remainder.cmp_magnitude(&divisor), Ordering::Less);
    }

    #[test]
    fn divmod_u32_matches_u64_semantics() {
        let mut q = BigInt::zero();
        let rem = divmod_u32(&mut q, &big(9_999_999), 13).unwrap();
        assert_eq!(q, big(9_999_999 / 13));
        assert_eq!(rem, (9_999_999u64 % 13) as u32);
    }
}
