//! Monetary helpers.
//!
//! Amounts are [`Decimal`] values in major units (`12.50` is twelve and a
//! half). Balancing uses a fixed absolute tolerance of one hundredth of a
//! unit, regardless of the currency.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::EngineError;

/// Two amounts closer than this are considered equal when balancing.
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Message carried by [`EngineError::InvalidAmount`] when a total no longer
/// fits in a [`Decimal`].
pub const OUT_OF_RANGE: &str = "amount is out of range";

/// Returns `true` if `a` and `b` differ by strictly less than
/// [`BALANCE_TOLERANCE`]. Amounts too far apart to subtract are never
/// balanced.
///
/// ```rust
/// use engine::money::is_balanced;
/// use rust_decimal::Decimal;
///
/// let total: Decimal = "100.00".parse().unwrap();
/// assert!(is_balanced(total, "99.991".parse().unwrap()));
/// assert!(!is_balanced(total, "99.99".parse().unwrap()));
/// ```
#[must_use]
pub fn is_balanced(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b)
        .is_some_and(|diff| diff.abs() < BALANCE_TOLERANCE)
}

/// Sums optional amounts, counting missing ones as zero.
pub fn sum<I>(amounts: I) -> Result<Decimal, EngineError>
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    amounts
        .into_iter()
        .flatten()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| EngineError::InvalidAmount(OUT_OF_RANGE.to_string()))
}

/// `a - b`, or an out-of-range error.
pub fn difference(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_sub(b)
        .ok_or_else(|| EngineError::InvalidAmount(OUT_OF_RANGE.to_string()))
}

/// Parses a user-typed amount.
///
/// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
///
/// Validation rules:
/// - max 2 fractional digits (rejects `12.345`)
/// - rejects empty/invalid strings
pub fn parse_amount(input: &str) -> Result<Decimal, EngineError> {
    let invalid = || EngineError::InvalidAmount(format!("invalid amount: {input}"));

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount("empty amount".to_string()));
    }

    let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (true, stripped.trim_start())
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (false, stripped.trim_start())
    } else {
        (false, trimmed)
    };

    let rest = rest.replace(',', ".");
    let mut parts = rest.split('.');
    let units = parts.next().ok_or_else(invalid)?;
    let fraction = parts.next().unwrap_or("");
    if parts.next().is_some() {
        return Err(invalid());
    }
    if units.is_empty() || !units.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > 2 {
        return Err(EngineError::InvalidAmount("too many decimals".to_string()));
    }

    let normalized = if fraction.is_empty() {
        units.to_string()
    } else {
        format!("{units}.{fraction}")
    };
    let value = Decimal::from_str(&normalized).map_err(|_| invalid())?;
    Ok(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn balanced_boundary_is_exclusive() {
        assert!(is_balanced(dec!(100.00), dec!(100.00)));
        assert!(is_balanced(dec!(100.009), dec!(100.00)));
        assert!(is_balanced(dec!(0.009), dec!(0)));
        assert!(!is_balanced(dec!(0.01), dec!(0)));
        assert!(!is_balanced(dec!(100.00), dec!(99.99)));
        assert!(!is_balanced(dec!(99.99), dec!(100.00)));
    }

    #[test]
    fn sum_treats_missing_as_zero() {
        assert_eq!(sum([Some(dec!(12.50)), None, Some(dec!(7.50))]), Ok(dec!(20.00)));
        assert_eq!(sum(std::iter::empty()), Ok(Decimal::ZERO));
    }

    #[test]
    fn overflowing_sum_is_an_error() {
        assert_eq!(
            sum([Some(Decimal::MAX), Some(Decimal::MAX)]),
            Err(EngineError::InvalidAmount(OUT_OF_RANGE.to_string()))
        );
        assert!(difference(Decimal::MIN, Decimal::MAX).is_err());
        assert_eq!(difference(dec!(10), dec!(2.5)), Ok(dec!(7.5)));
    }

    #[test]
    fn amounts_too_far_apart_are_not_balanced() {
        assert!(!is_balanced(Decimal::MAX, Decimal::MIN));
        assert!(is_balanced(Decimal::MAX, Decimal::MAX));
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!(parse_amount("10").unwrap(), dec!(10));
        assert_eq!(parse_amount("10.5").unwrap(), dec!(10.5));
        assert_eq!(parse_amount("10,50").unwrap(), dec!(10.50));
        assert_eq!(parse_amount("-0.01").unwrap(), dec!(-0.01));
        assert_eq!(parse_amount("+1.00").unwrap(), dec!(1.00));
        assert_eq!(parse_amount("  2.30 ").unwrap(), dec!(2.30));
        assert_eq!(parse_amount("3.").unwrap(), dec!(3));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("1.2.3").is_err());
        assert!(parse_amount(".5").is_err());
        assert!(parse_amount("12.345").is_err());
    }
}
