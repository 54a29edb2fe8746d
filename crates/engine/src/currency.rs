use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Currencies a wallet can hold.
///
/// ## Minor units
///
/// `minor_units()` is the number of decimal digits used when displaying an
/// amount. Every supported currency uses 2; balancing still applies the same
/// absolute tolerance to all of them (see [`crate::money::BALANCE_TOLERANCE`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    #[default]
    Eur,
    Pln,
    Gbp,
}

impl Currency {
    /// Canonical ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Pln => "PLN",
            Currency::Gbp => "GBP",
        }
    }

    /// Number of fraction digits used when formatting amounts.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Currency::Usd | Currency::Eur | Currency::Pln | Currency::Gbp => 2,
        }
    }

    /// Formats `amount` as `12.50 EUR`.
    #[must_use]
    pub fn format(self, amount: Decimal) -> String {
        let precision = self.minor_units() as usize;
        format!("{:.precision$} {}", amount, self.code())
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "PLN" => Ok(Currency::Pln),
            "GBP" => Ok(Currency::Gbp),
            other => Err(EngineError::UnsupportedCurrency(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!(Currency::try_from(" pln ").unwrap(), Currency::Pln);
        assert_eq!(Currency::try_from("GBP").unwrap(), Currency::Gbp);
        assert!(Currency::try_from("JPY").is_err());
    }

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(Currency::Eur.format(dec!(12.5)), "12.50 EUR");
        assert_eq!(Currency::Usd.format(dec!(-3)), "-3.00 USD");
    }
}
