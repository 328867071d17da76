use std::{fmt, str::FromStr};

use num_bigint::{BigInt, BigUint, Sign};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::Error;

/// Fractional digits kept when a rate has no terminating decimal expansion.
///
/// `10^78 > 2^256`, so this is at least as precise as a 256-bit mantissa.
pub const MAX_FRACTION_DIGITS: usize = 78;

/// Fractional digits of rendered grant amounts.
pub const AMOUNT_FRACTION_DIGITS: usize = 20;

/// Largest decimal exponent accepted by the parser.
pub const MAX_EXPONENT: u32 = 1024;

/// A parsed decimal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decimal {
    /// A finite value, held exactly.
    Finite(BigRational),
    /// An infinite value.
    Infinite {
        /// Whether this is negative infinity.
        negative: bool,
    },
}

impl Decimal {
    /// Returns whether the value is below zero.
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Finite(value) => value.is_negative(),
            Self::Infinite { negative } => *negative,
        }
    }

    /// Returns whether the value is infinite.
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite { .. })
    }

    /// Returns whether the value is finite and not negative.
    pub fn is_non_negative_finite(&self) -> bool {
        matches!(self, Self::Finite(value) if !value.is_negative())
    }

    /// Get the finite value.
    pub fn as_finite(&self) -> Option<&BigRational> {
        match self {
            Self::Finite(value) => Some(value),
            Self::Infinite { .. } => None,
        }
    }

    /// Convert into the finite value.
    pub fn into_finite(self) -> Option<BigRational> {
        match self {
            Self::Finite(value) => Some(value),
            Self::Infinite { .. } => None,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(value) => f.write_str(&format_exact(value)),
            Self::Infinite { negative: true } => f.write_str("-Inf"),
            Self::Infinite { negative: false } => f.write_str("+Inf"),
        }
    }
}

/// Error returned when a decimal string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed decimal: {0}")]
pub struct ParseDecimalError(String);

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_rate(s).ok_or_else(|| ParseDecimalError(s.to_string()))
    }
}

/// Parse a decimal string such as `"0.45"`, `"-12"`, `"1.5e-3"` or `"+Inf"`.
///
/// Returns `None` on any malformed input; there is no partial parse.
pub fn parse_rate(s: &str) -> Option<Decimal> {
    let (negative, body) = split_sign(s);
    if body.eq_ignore_ascii_case("inf") {
        return Some(Decimal::Infinite { negative });
    }
    let value = parse_unsigned_decimal(body)?;
    Some(Decimal::Finite(if negative { -value } else { value }))
}

/// Parse either a decimal string or an `n/d` fraction into an exact ratio.
///
/// Infinities are rejected.
pub fn parse_ratio(s: &str) -> Option<BigRational> {
    match s.split_once('/') {
        Some((numer, denom)) => {
            let numer = parse_integer(numer)?;
            let denom = parse_integer(denom)?;
            if denom.is_zero() {
                return None;
            }
            Some(BigRational::new(numer, denom))
        }
        None => parse_rate(s)?.into_finite(),
    }
}

/// Parse an earn rate, checking in order that it parses, is not negative
/// and is not infinite.
pub fn checked_earn_rate(s: &str) -> crate::Result<BigRational> {
    let value = parse_rate(s).ok_or(Error::InvalidEarnRate)?;
    if value.is_negative() {
        return Err(Error::NegativeRate);
    }
    value.into_finite().ok_or(Error::EarnRateInfinite)
}

/// Multiply a rate by a tier multiplier and render the exact product.
pub fn multiply_by_tier(rate: &BigRational, multiplier: &BigRational) -> String {
    format_exact(&(rate * multiplier))
}

/// Render `value` as a decimal string without losing precision.
///
/// Terminating expansions are rendered exactly. Other values are rounded
/// to [`MAX_FRACTION_DIGITS`] places. Trailing zeros are trimmed.
pub fn format_exact(value: &BigRational) -> String {
    let digits = terminating_digits(value.denom()).unwrap_or(MAX_FRACTION_DIGITS);
    let mut out = format_fixed(value, digits);
    if out.contains('.') {
        let trimmed = out.trim_end_matches('0').trim_end_matches('.').len();
        out.truncate(trimmed);
    }
    out
}

/// Render `value` with exactly `digits` fractional digits, rounding the
/// last digit to nearest with halves away from zero.
pub fn format_fixed(value: &BigRational, digits: usize) -> String {
    let numer = value.numer().magnitude();
    let denom = value.denom().magnitude();

    let mut quotient = numer / denom;
    let remainder = numer % denom;

    let scale = num_traits::pow(BigUint::from(10u32), digits);
    let scaled = remainder * &scale;
    let mut fraction = &scaled / denom;
    let rest = (&scaled % denom) << 1u32;
    if &rest >= denom {
        fraction += 1u32;
        if fraction >= scale {
            quotient += 1u32;
            fraction -= &scale;
        }
    }

    let sign = if value.numer().sign() == Sign::Minus {
        "-"
    } else {
        ""
    };
    if digits == 0 {
        format!("{sign}{quotient}")
    } else {
        let fraction = fraction.to_string();
        format!("{sign}{quotient}.{fraction:0>digits$}")
    }
}

/// Returns the number of fractional digits needed to write `1/denom`
/// exactly, or `None` if the expansion does not terminate.
fn terminating_digits(denom: &BigInt) -> Option<usize> {
    let two = BigInt::from(2u32);
    let five = BigInt::from(5u32);
    let mut rest = denom.clone();
    let mut twos = 0usize;
    let mut fives = 0usize;
    while (&rest % &two).is_zero() {
        rest /= &two;
        twos += 1;
    }
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }
    rest.is_one().then_some(twos.max(fives))
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    }
}

fn parse_integer(s: &str) -> Option<BigInt> {
    let (negative, body) = split_sign(s);
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = BigInt::parse_bytes(body.as_bytes(), 10)?;
    Some(if negative { -value } else { value })
}

fn parse_unsigned_decimal(body: &str) -> Option<BigRational> {
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], parse_exponent(&body[idx + 1..])?),
        None => (body, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(int_part) || !is_digits(frac_part) {
        return None;
    }

    let digits = format!("{int_part}{frac_part}");
    let numer = BigInt::parse_bytes(digits.as_bytes(), 10)?;
    let scale = exponent.checked_sub(i64::try_from(frac_part.len()).ok()?)?;
    let pow = num_traits::pow(BigInt::from(10u32), usize::try_from(scale.unsigned_abs()).ok()?);
    if scale >= 0 {
        Some(BigRational::from_integer(numer * pow))
    } else {
        Some(BigRational::new(numer, pow))
    }
}

fn parse_exponent(s: &str) -> Option<i64> {
    let (negative, body) = split_sign(s);
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = body.parse().ok()?;
    if value > MAX_EXPONENT {
        return None;
    }
    let value = i64::from(value);
    Some(if negative { -value } else { value })
}
