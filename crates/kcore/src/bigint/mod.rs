//! Arbitrary-precision signed integer, base 2^32 digits.
//!
//! Mirrors the shape of the C `bigint_t`: a little-endian digit array,
//! a signed length that carries the sign of the whole number, and an
//! implicit trailing-zero exponent so that numbers with many trailing
//! zero digits (typical after a `from_f64` conversion) don't need to
//! store them.

mod arith;
mod convert;
mod div;

pub use arith::{add, mul, mul_u32, sub};
pub use convert::{set_from_f64, to_f64};
pub use div::{divmod, divmod_owned, divmod_u32, DivMod};

use crate::error::{KernelError, Result};

/// Largest magnitude of `signed_len`; keeps the field representable in
/// a 16-bit signed integer on the wire-compatible layout this type is
/// modeled after.
const MAX_LEN: usize = 0x7FFF;
/// Largest representable exponent (implicit trailing zero digit count).
const MAX_EXPONENT: u32 = 0xFFFF;

/// Arbitrary-precision signed integer.
///
/// `digits[i]` is the `i`-th least-significant base-2^32 word. Only the
/// first `used()` words are significant; everything above that up to
/// `capacity()` is unspecified scratch space left over from a previous,
/// larger value.
#[derive(Clone)]
pub struct BigInt {
    digits: Vec<u32>,
    signed_len: i32,
    exponent: u32,
    /// A "fixed" instance refuses to grow; operations that would need
    /// more digits than `digits.len()` fail with `InvalidInput` instead
    /// of reallocating. Models the C API's `capacity == 0` sentinel for
    /// stack-allocated, non-owning big integers.
    fixed: bool,
}

impl BigInt {
    /// Allocates a new zero-valued big integer with room for at least
    /// `nrdigits` digits (never fewer than 4).
    pub fn new(nrdigits: u32) -> Result<Self> {
        let cap = nrdigits.max(4) as usize;
        if cap > MAX_LEN {
            return Err(KernelError::overflow("requested digit count exceeds bigint size limit"));
        }
        Ok(BigInt { digits: vec![0; cap], signed_len: 0, exponent: 0, fixed: false })
    }

    /// Wraps caller-owned storage as a big integer that can never be
    /// reallocated; any operation that would need to grow it returns
    /// `InvalidInput` rather than silently falling back to a fresh
    /// allocation.
    pub fn from_fixed_storage(storage: Vec<u32>) -> Self {
        BigInt { digits: storage, signed_len: 0, exponent: 0, fixed: true }
    }

    /// A canonical zero.
    pub fn zero() -> Self {
        BigInt { digits: vec![0; 4], signed_len: 0, exponent: 0, fixed: false }
    }

    pub fn capacity(&self) -> usize {
        self.digits.len()
    }

    /// Number of significant digits (always non-negative).
    pub fn used(&self) -> usize {
        self.signed_len.unsigned_abs() as usize
    }

    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.signed_len == 0
    }

    pub fn is_negative(&self) -> bool {
        self.signed_len < 0
    }

    pub fn sign(&self) -> i32 {
        crate::signum::signum(self.signed_len as i64)
    }

    /// "Order" of a nonzero magnitude: `exponent + used`. Used to
    /// compare magnitudes without looking at every digit.
    fn order(&self) -> u64 {
        self.exponent as u64 + self.used() as u64
    }

    /// Significant digits, little-endian, excluding the implicit
    /// trailing-zero run covered by `exponent`.
    pub fn digits(&self) -> &[u32] {
        &self.digits[..self.used()]
    }

    fn digits_mut(&mut self) -> &mut [u32] {
        let used = self.used();
        &mut self.digits[..used]
    }

    /// Ensures `self` has room for at least `need` digits, growing the
    /// backing storage (preserving existing digit contents) unless this
    /// is a fixed-capacity instance, in which case it fails instead.
    fn ensure_capacity(&mut self, need: usize) -> Result<()> {
        if need <= self.digits.len() {
            return Ok(());
        }
        if self.fixed {
            return Err(KernelError::invalid("fixed-capacity bigint cannot be reallocated"));
        }
        if need > MAX_LEN {
            return Err(KernelError::overflow("bigint would exceed maximum digit count"));
        }
        self.digits.resize(need, 0);
        Ok(())
    }

    /// Sets the raw representation and restores canonical form:
    /// strips leading (high) zero digits and, if the magnitude is
    /// zero, resets the exponent to zero as well.
    fn set_raw(&mut self, mut len: usize, negative: bool, exponent: u32) -> Result<()> {
        while len > 0 && self.digits[len - 1] == 0 {
            len -= 1;
        }
        if len == 0 {
            self.signed_len = 0;
            self.exponent = 0;
            return Ok(());
        }
        if len > MAX_LEN {
            return Err(KernelError::overflow("bigint magnitude exceeds maximum length"));
        }
        if exponent > MAX_EXPONENT {
            return Err(KernelError::overflow("bigint exponent exceeds 16-bit range"));
        }
        self.signed_len = if negative { -(len as i32) } else { len as i32 };
        self.exponent = exponent;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.signed_len = 0;
        self.exponent = 0;
    }

    pub fn set_u64(&mut self, value: u64) -> Result<()> {
        self.ensure_capacity(2)?;
        self.digits[0] = (value & 0xFFFF_FFFF) as u32;
        self.digits[1] = (value >> 32) as u32;
        self.set_raw(2, false, 0)
    }

    pub fn set_i64(&mut self, value: i64) -> Result<()> {
        self.set_u64(value.unsigned_abs())?;
        if value < 0 {
            self.negate();
        }
        Ok(())
    }

    pub fn negate(&mut self) {
        self.signed_len = -self.signed_len;
    }

    /// Compares two big integers: `-1`, `0`, or `1`.
    pub fn cmp_value(&self, other: &BigInt) -> std::cmp::Ordering {
        use std::cmp::Ordering::*;
        match (self.sign(), other.sign()) {
            (a, b) if a != b => a.cmp(&b),
            (0, 0) => Equal,
            (s, _) => {
                let m = self.cmp_magnitude(other);
                if s < 0 {
                    m.reverse()
                } else {
                    m
                }
            }
        }
    }

    /// Compares `|self|` to `|other|`, ignoring sign.
    pub fn cmp_magnitude(&self, other: &BigInt) -> std::cmp::Ordering {
        use std::cmp::Ordering::*;
        if self.is_zero() || other.is_zero() {
            return self.used().cmp(&other.used());
        }
        match self.order().cmp(&other.order()) {
            Equal => {}
            ord => return ord,
        }
        // Same order: walk from the most significant digit down,
        // accounting for the possibly-different exponents.
        let a = self.digits();
        let b = other.digits();
        let top = self.used().max(other.used());
        for i in (0..top).rev() {
            let ai = self.digit_at_order_index(a, i);
            let bi = other.digit_at_order_index(b, i);
            match ai.cmp(&bi) {
                Equal => continue,
                ord => return ord,
            }
        }
        Equal
    }

    /// `digits[i]` as if the number were laid out in a flat array
    /// `[0..order)` with the trailing-exponent zeros materialized.
    fn digit_at_order_index(&self, digits: &[u32], i: usize) -> u32 {
        let exp = self.exponent as usize;
        if i < exp {
            0
        } else {
            digits.get(i - exp).copied().unwrap_or(0)
        }
    }

    /// Multiplies in place by 2^(32*words), i.e. increments the
    /// exponent. Exact, cannot lose precision.
    fn shift_words_left(&mut self, words: u32) -> Result<()> {
        if self.is_zero() {
            return Ok(());
        }
        let new_exp = self.exponent as u64 + words as u64;
        if new_exp > MAX_EXPONENT as u64 {
            return Err(KernelError::overflow("shift left overflows exponent"));
        }
        self.exponent = new_exp as u32;
        Ok(())
    }

    /// Logical left shift by `n` bits (`n >= 0`).
    pub fn shift_left(&mut self, n: u32) -> Result<()> {
        if self.is_zero() || n == 0 {
            return Ok(());
        }
        self.shift_words_left(n / 32)?;
        let bits = n % 32;
        if bits == 0 {
            return Ok(());
        }
        let used = self.used();
        self.ensure_capacity(used + 1)?;
        let mut carry = 0u32;
        for d in self.digits.iter_mut().take(used) {
            let v = ((*d as u64) << bits) | carry as u64;
            *d = v as u32;
            carry = (v >> 32) as u32;
        }
        if carry != 0 {
            self.digits[used] = carry;
        }
        let negative = self.is_negative();
        let exponent = self.exponent;
        self.set_raw(used + 1, negative, exponent)
    }

    /// Logical right shift by `n` bits. PRESERVE_RIGHT_BITS: if the
    /// exponent alone cannot absorb the shift and nonzero low bits
    /// would otherwise be lost, one synthetic digit carrying those
    /// bits is kept so precision below digit zero is not silently
    /// dropped by the exponent-only fast path.
    pub fn shift_right(&mut self, n: u32) -> Result<()> {
        if self.is_zero() || n == 0 {
            return Ok(());
        }
        let word_shift = (n / 32).min(self.exponent);
        self.exponent -= word_shift;
        let remaining_words = n / 32 - word_shift;
        let bits = n % 32;

        if remaining_words > 0 {
            // Shifting past the stored digits entirely: whatever
            // would remain is below digit zero. Nothing is stored
            // (exponent already at its floor of zero), so the value
            // rounds toward zero.
            if self.exponent == 0 {
                self.signed_len = 0;
                return Ok(());
            }
        }

        if bits == 0 {
            return self.canonicalize();
        }

        let used = self.used();
        let mut out = vec![0u32; used];
        let mut carry_in = 0u32;
        for i in (0..used).rev() {
            let d = self.digits[i];
            out[i] = (d >> bits) | (carry_in << (32 - bits));
            carry_in = d & ((1u32 << bits) - 1);
        }
        // carry_in now holds the low `bits` bits that fell off digit 0.
        let negative = self.is_negative();
        if carry_in != 0 && self.exponent == 0 {
            // PRESERVE_RIGHT_BITS: keep a synthetic low digit so the
            // fractional bits aren't silently truncated away.
            self.ensure_capacity(used + 1)?;
            for i in (0..used).rev() {
                self.digits[i + 1] = out[i];
            }
            self.digits[0] = carry_in << (32 - bits);
            self.set_raw(used + 1, negative, 0)
        } else {
            self.digits[..used].copy_from_slice(&out);
            let exponent = self.exponent;
            self.set_raw(used, negative, exponent)
        }
    }

    fn canonicalize(&mut self) -> Result<()> {
        let used = self.used();
        let negative = self.is_negative();
        let exponent = self.exponent;
        self.set_raw(used, negative, exponent)
    }
}

impl std::fmt::Debug for BigInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigInt")
            .field("sign", &self.sign())
            .field("digits", &self.digits())
            .field("exponent", &self.exponent)
            .finish()
    }
}

impl PartialEq for BigInt {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_value(other) == std::cmp::Ordering::Equal
    }
}
impl Eq for BigInt {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_canonical() {
        let z = BigInt::zero();
        assert!(z.is_zero());
        assert_eq!(z.exponent(), 0);
        assert_eq!(z.used(), 0);
    }

    #[test]
    fn set_and_compare() {
        let mut a = BigInt::zero();
        let mut b = BigInt::zero();
        a.set_u64(100).unwrap();
        b.set_u64(200).unwrap();
        assert_eq!(a.cmp_value(&b), std::cmp::Ordering::Less);
        a.negate();
        assert_eq!(a.cmp_value(&b), std::cmp::Ordering::Less);
        b.negate();
        assert_eq!(a.cmp_value(&b), std::cmp::Ordering::Greater);
    }

    #[test]
    fn fixed_storage_rejects_growth() {
        let mut fixed = BigInt::from_fixed_storage(vec![0; 2]);
        fixed.set_u64(1).unwrap();
        let err = fixed.shift_left(100).unwrap_err();
        assert!(matches!(err, KernelError::InvalidInput(_)));
    }

    #[test]
    fn shift_left_then_right_restores_value_when_low_bits_zero() {
        let mut a = BigInt::zero();
        a.set_u64(0xABCD_0000).unwrap();
        let orig = a.clone();
        a.shift_left(5).unwrap();
        a.shift_right(5).unwrap();
        assert_eq!(a.cmp_value(&orig), std::cmp::Ordering::Equal);
    }
}
