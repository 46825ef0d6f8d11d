//! Conversion of YAML scalar text into Rust primitives.
//!
//! Integers accept YAML 1.2 forms (`0x`, `0o`, `0b` prefixes, `_` separators, optional sign).
//! Floats accept YAML 1.2 `.nan` / `.inf` spellings. Booleans accept YAML 1.1 forms unless
//! strict booleans are requested.

use std::str::FromStr;

use num_traits::float::FloatCore;

use crate::Error;

/// Parse a YAML 1.1 boolean (handles the "Norway problem" by accepting `y`/`n` too).
pub(crate) fn parse_yaml11_bool(s: &str) -> Result<bool, Error> {
    let t = s.trim();
    if ["true", "yes", "y", "on"].iter().any(|lit| t.eq_ignore_ascii_case(lit)) {
        Ok(true)
    } else if ["false", "no", "n", "off"].iter().any(|lit| t.eq_ignore_ascii_case(lit)) {
        Ok(false)
    } else {
        Err(Error::malformed_scalar(format!("invalid bool: `{s}`")))
    }
}

/// Only the exact literals `true` and `false` (any case).
pub(crate) fn parse_strict_bool(s: &str) -> Result<bool, Error> {
    let t = s.trim();
    if t.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if t.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::malformed_scalar(
            "invalid boolean (strict mode expects true/false)",
        ))
    }
}

fn parse_digits_u128(digits: &str, radix: u32) -> Option<u128> {
    let mut val: u128 = 0;
    let mut saw = false;
    for ch in digits.chars() {
        if ch == '_' {
            continue;
        }
        let d = ch.to_digit(radix)?;
        val = val.checked_mul(radix as u128)?.checked_add(d as u128)?;
        saw = true;
    }
    saw.then_some(val)
}

/// Split off the radix prefix. `legacy_octal` treats a `00` prefix as base 8.
fn split_radix(rest: &str, legacy_octal: bool) -> (u32, &str) {
    if let Some(r) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16, r)
    } else if let Some(r) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        (8, r)
    } else if let Some(r) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        (2, r)
    } else if legacy_octal && rest.starts_with("00") {
        (8, &rest[2..])
    } else {
        (10, rest)
    }
}

pub(crate) fn parse_int_signed<T>(s: &str, ty: &'static str, legacy_octal: bool) -> Result<T, Error>
where
    T: TryFrom<i128>,
{
    let invalid = || Error::malformed_scalar(format!("invalid {ty}: `{s}`"));
    let t = s.trim();
    let (neg, rest) = match t.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let (radix, digits) = split_radix(rest, legacy_octal);
    let mag = parse_digits_u128(digits, radix).ok_or_else(invalid)?;
    let val: i128 = if neg {
        // i128::MIN has no positive counterpart
        if mag == i128::MIN.unsigned_abs() {
            i128::MIN
        } else {
            let m: i128 = mag.try_into().map_err(|_| invalid())?;
            -m
        }
    } else {
        mag.try_into().map_err(|_| invalid())?
    };
    T::try_from(val).map_err(|_| invalid())
}

pub(crate) fn parse_int_unsigned<T>(
    s: &str,
    ty: &'static str,
    legacy_octal: bool,
) -> Result<T, Error>
where
    T: TryFrom<u128>,
{
    let invalid = || Error::malformed_scalar(format!("invalid {ty}: `{s}`"));
    let t = s.trim();
    if t.starts_with('-') {
        return Err(invalid());
    }
    let rest = t.strip_prefix('+').unwrap_or(t);
    let (radix, digits) = split_radix(rest, legacy_octal);
    let mag = parse_digits_u128(digits, radix).ok_or_else(invalid)?;
    T::try_from(mag).map_err(|_| invalid())
}

pub(crate) fn parse_yaml12_float<T>(s: &str, ty: &'static str) -> Result<T, Error>
where
    T: FloatCore + FromStr,
{
    let t = s.trim();
    match t.to_ascii_lowercase().as_str() {
        ".nan" | "+.nan" | "-.nan" => Ok(T::nan()),
        ".inf" | "+.inf" => Ok(T::infinity()),
        "-.inf" => Ok(T::neg_infinity()),
        _ => t
            .replace('_', "")
            .parse::<T>()
            .map_err(|_| Error::malformed_scalar(format!("invalid {ty}: `{s}`"))),
    }
}

pub(crate) fn parse_char(s: &str) -> Result<char, Error> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::malformed_scalar(format!(
            "expected a single character, found `{s}`"
        ))),
    }
}
