//! Division for [`super::Decimal`].
//!
//! `result_size` sets the number of extra base-`10^9` digits of
//! precision the quotient carries beyond the natural integer division
//! of the two mantissas: the dividend is scaled up by `result_size`
//! digits before a schoolbook long division, and the discarded
//! remainder decides a final round-half-to-even correction.

use super::{Decimal, BASE};
use crate::error::{KernelError, Result};
use std::cmp::Ordering;

/// `result_size` is clamped into this range; `0` is treated as `1`.
const MAX_RESULT_SIZE: u8 = super::MAX_CAPACITY;

/// `a / b` rounded half-to-even to `result_size` base-`10^9` digits of
/// precision (clamped to `1..=127`, with `0` meaning `1`).
pub fn divide(result: &mut Decimal, a: &Decimal, b: &Decimal, result_size: u8) -> Result<()> {
    if b.is_zero() {
        return Err(KernelError::invalid("division by zero"));
    }
    if a.is_zero() {
        result.clear();
        return Ok(());
    }
    let result_size = if result_size == 0 { 1 } else { result_size.min(MAX_RESULT_SIZE) };

    let widened = widen(a.digits(), result_size as usize);
    let (q, r) = divide_magnitude(&widened, b.digits());
    let mut q = q;

    match cmp_double(&r, b.digits()) {
        Ordering::Greater => increment(&mut q),
        Ordering::Equal if is_odd(&q) => increment(&mut q),
        _ => {}
    }

    let negative = a.is_negative() != b.is_negative();
    let exponent_word = a.exponent_word() as i32 - b.exponent_word() as i32 - result_size as i32;
    result.set_raw(q, negative, exponent_word)
}

/// Single-digit-divisor fast path: one pass over the dividend's
/// base-`10^9` digits, `(carry*BASE + d) / divisor`.
pub fn divide_u32(result: &mut Decimal, a: &Decimal, divisor: u32) -> Result<u32> {
    if divisor == 0 {
        return Err(KernelError::invalid("division by zero"));
    }
    if a.is_zero() {
        result.clear();
        return Ok(0);
    }
    let mut out = vec![0u32; a.used()];
    let mut rem = 0u64;
    for i in (0..a.used()).rev() {
        let cur = rem * BASE + a.digits()[i] as u64;
        out[i] = (cur / divisor as u64) as u32;
        rem = cur % divisor as u64;
    }
    result.set_raw(out, a.is_negative(), a.exponent_word() as i32)?;
    Ok(rem as u32)
}

fn widen(digits: &[u32], extra: usize) -> Vec<u32> {
    if extra == 0 {
        return digits.to_vec();
    }
    let mut out = vec![0u32; extra + digits.len()];
    out[extra..].copy_from_slice(digits);
    out
}

fn trim(mut v: Vec<u32>) -> Vec<u32> {
    while v.last() == Some(&0) {
        v.pop();
    }
    v
}

fn cmp_mag(a: &[u32], b: &[u32]) -> Ordering {
    let a = trim_view(a);
    let b = trim_view(b);
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

fn trim_view(a: &[u32]) -> &[u32] {
    let mut n = a.len();
    while n > 0 && a[n - 1] == 0 {
        n -= 1;
    }
    &a[..n]
}

/// Compares `2*r` against `b` without allocating a doubled buffer.
fn cmp_double(r: &[u32], b: &[u32]) -> Ordering {
    let mut doubled = vec![0u32; r.len() + 1];
    let mut carry = 0u64;
    for (i, &d) in r.iter().enumerate() {
        let v = d as u64 * 2 + carry;
        doubled[i] = (v % BASE) as u32;
        carry = v / BASE;
    }
    doubled[r.len()] = carry as u32;
    cmp_mag(&doubled, b)
}

fn is_odd(q: &[u32]) -> bool {
    q.first().map(|d| d % 2 == 1).unwrap_or(false)
}

fn increment(q: &mut Vec<u32>) {
    let mut carry = 1u64;
    for d in q.iter_mut() {
        if carry == 0 {
            break;
        }
        let v = *d as u64 + carry;
        *d = (v % BASE) as u32;
        carry = v / BASE;
    }
    if carry != 0 {
        q.push(carry as u32);
    }
}

fn mul_small(r: &[u32], q: u32) -> Vec<u32> {
    let mut out = vec![0u32; r.len() + 1];
    if q == 0 {
        return out;
    }
    let mut carry = 0u64;
    for (i, &d) in r.iter().enumerate() {
        let v = d as u64 * q as u64 + carry;
        out[i] = (v % BASE) as u32;
        carry = v / BASE;
    }
    out[r.len()] = carry as u32;
    out
}

fn sub_assign(a: &mut Vec<u32>, b: &[u32]) {
    let mut borrow = 0i64;
    for i in 0..a.len() {
        let mut v = a[i] as i64 - *b.get(i).unwrap_or(&0) as i64 - borrow;
        if v < 0 {
            v += BASE as i64;
            borrow = 1;
        } else {
            borrow = 0;
        }
        a[i] = v as u32;
    }
    debug_assert_eq!(borrow, 0, "decimal long division subtraction underflowed");
}

/// Estimates the next base-`10^9` quotient digit from the top two
/// digits of the running remainder against the divisor's top digit,
/// then corrects by repeated compare/subtract. The guard
/// `2*(BASE-1) + 1 < 2^63` keeps every intermediate value within `u64`.
fn estimate_and_correct(rem: &[u32], r: &[u32]) -> u32 {
    let n = r.len();
    let top_rem = (*rem.get(n).unwrap_or(&0) as u64) * BASE + *rem.get(n - 1).unwrap_or(&0) as u64;
    let divisor_top = r[n - 1] as u64;
    let mut q = (top_rem / divisor_top.max(1)).min(BASE - 1) as u32;

    loop {
        let trial = mul_small(r, q);
        if cmp_mag(&trial, rem) != Ordering::Greater {
            return q;
        }
        q -= 1;
    }
}

/// Plain (exponent-free) long division of little-endian base-`10^9`
/// magnitudes. Returns `(quotient, remainder)`.
fn divide_magnitude(l: &[u32], r: &[u32]) -> (Vec<u32>, Vec<u32>) {
    let r = trim(r.to_vec());
    assert!(!r.is_empty(), "division by zero magnitude");

    if r.len() == 1 {
        let divisor = r[0] as u64;
        let mut out = vec![0u32; l.len()];
        let mut rem = 0u64;
        for i in (0..l.len()).rev() {
            let cur = rem * BASE + l[i] as u64;
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
    let mut window: Vec<u32> = vec![];

    for i in (0..l.len()).rev() {
        window.insert(0, l[i]);
        while window.last() == Some(&0) && window.len() > n {
            window.pop();
        }
        if cmp_mag(&window, &r) == Ordering::Less {
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
    use crate::decimal::format::to_string;
    use crate::decimal::parse::from_str;

    #[test]
    fn divide_exact_integers() {
        let a = from_str("100").unwrap();
        let b = from_str("4").unwrap();
        let mut q = Decimal::zero();
        divide(&mut q, &a, &b, 4).unwrap();
        assert_eq!(to_string(&q), "25");
    }

    #[test]
    fn divide_u32_matches_exact() {
        let a = from_str("99").unwrap();
        let mut q = Decimal::zero();
        let rem = divide_u32(&mut q, &a, 13).unwrap();
        assert_eq!(rem, 99 % 13);
    }

    #[test]
    fn divide_by_zero_is_invalid_input() {
        let a = from_str("1").unwrap();
        let b = Decimal::zero();
        let mut q = Decimal::zero();
        assert!(divide(&mut q, &a, &b, 4).is_err());
    }
}
