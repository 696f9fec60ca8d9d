//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

use derive_more::{Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Non-negative amount of money with at most two decimal places.
///
/// Currency is implied by the marketplace the amount belongs to. Fits into
/// Postgres `NUMERIC(15, 2)`, so never exceeds [`Money::MAX`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero amount of [`Money`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Maximum amount of [`Money`]: `9999999999999.99`.
    pub const MAX: Self =
        Self(Decimal::from_parts(0xA4C6_7FFF, 0x3_8D7E, 0, false, 2));

    /// Maximum price of a single unit of measure: `99999999.99`.
    ///
    /// Unit prices are stored as `NUMERIC(10, 2)`.
    pub const MAX_UNIT_PRICE: Self =
        Self(Decimal::from_parts(0x540B_E3FF, 0x2, 0, false, 2));

    /// Creates a new [`Money`] if the provided `amount` is not negative, has
    /// at most two decimal places and doesn't exceed [`Money::MAX`].
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        Self::try_from(amount).ok()
    }

    /// Returns the amount of this [`Money`].
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Indicates whether this [`Money`] is strictly greater than zero.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Money {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .map_err(|_| ParseError::Format)?
            .try_into()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = ParseError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        bounded(amount, Self::MAX.0).map(Self)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

/// Normalizes the provided `value`, checking it to be a non-negative number
/// of cents not exceeding the `max`imum.
pub(crate) fn bounded(
    value: Decimal,
    max: Decimal,
) -> Result<Decimal, ParseError> {
    let value = value.normalize();
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ParseError::Negative);
    }
    if value.scale() > 2 {
        return Err(ParseError::Precision);
    }
    if value > max {
        return Err(ParseError::OutOfRange);
    }
    Ok(value)
}

/// Error of parsing [`Money`] or [`Area`].
///
/// [`Area`]: crate::Area
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum ParseError {
    /// Not a decimal number.
    #[display("not a decimal number")]
    Format,

    /// Negative amount.
    #[display("amount must not be negative")]
    Negative,

    /// More than two decimal places.
    #[display("amount must have at most 2 decimal places")]
    Precision,

    /// Amount is too large to be stored.
    #[display("amount is too large")]
    OutOfRange,
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Money, ParseError};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Money::from_str("123.45").unwrap().amount(),
            decimal("123.45"),
        );
        assert_eq!(Money::from_str("0").unwrap(), Money::ZERO);
        assert_eq!(Money::from_str("-0").unwrap(), Money::ZERO);

        assert_eq!(Money::from_str("-1.5"), Err(ParseError::Negative));
        assert_eq!(Money::from_str("12USD"), Err(ParseError::Format));
        assert_eq!(Money::from_str(""), Err(ParseError::Format));
    }

    #[test]
    fn bounds_precision_and_magnitude() {
        assert_eq!(Money::MAX.to_string(), "9999999999999.99");
        assert_eq!(Money::MAX_UNIT_PRICE.to_string(), "99999999.99");
        assert_eq!(
            Money::from_str("9999999999999.99").unwrap(),
            Money::MAX,
        );
        assert_eq!(Money::from_str("12.340").unwrap().to_string(), "12.34");

        assert_eq!(
            Money::from_str("10000000000000"),
            Err(ParseError::OutOfRange),
        );
        assert_eq!(
            Money::from_str("79228162514264337593543950335"),
            Err(ParseError::OutOfRange),
        );
        assert_eq!(Money::from_str("0.001"), Err(ParseError::Precision));
        assert_eq!(Money::new(Decimal::MAX), None);
        assert!(serde_json::from_str::<Money>("1e20").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(Money::from_str("123.45").unwrap().to_string(), "123.45");
        assert_eq!(Money::from_str("123.00").unwrap().to_string(), "123");
        assert_eq!(Money::from_str("50000.0000").unwrap().to_string(), "50000");
    }

    #[test]
    fn deserializes_from_numbers_and_strings() {
        let from_num: Money = serde_json::from_str("10000").unwrap();
        let from_str: Money = serde_json::from_str("\"10000.00\"").unwrap();
        assert_eq!(from_num, from_str);

        assert!(serde_json::from_str::<Money>("-3").is_err());
    }
}
