//! Textual formatting for [`super::Decimal`] (`tocstring`).

use super::Decimal;

/// Formats `d` as `[-]digits[eNN]`. Leading zeros are dropped from the
/// most significant digit only; every other base-`10^9` word is
/// zero-padded to 9 characters. Trailing decimal zeros within the
/// lowest word are stripped and folded back into the exponent suffix.
pub fn to_string(d: &Decimal) -> String {
    if d.is_zero() {
        return "0".to_string();
    }
    let digits = d.digits();
    let n = digits.len();
    let mut raw = digits[n - 1].to_string();
    for i in (0..n - 1).rev() {
        raw.push_str(&format!("{:09}", digits[i]));
    }

    let mut exponent = d.exponent_word() as i64 * 9;
    let strip_limit = if n == 1 { raw.len() } else { 9 };
    let mut stripped = 0;
    while stripped < strip_limit && raw.len() > 1 && raw.ends_with('0') {
        raw.pop();
        exponent += 1;
        stripped += 1;
    }

    let mut s = String::new();
    if d.is_negative() {
        s.push('-');
    }
    s.push_str(&raw);
    if exponent != 0 {
        s.push('e');
        if exponent > 0 {
            s.push('+');
        }
        s.push_str(&exponent.to_string());
    }
    s
}
