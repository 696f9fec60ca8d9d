//! [`Area`]-related definitions.

use std::{fmt, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{
    money::{self, ParseError},
    Money,
};

/// Non-negative land area measured in square feet.
///
/// Has at most two decimal places and fits into Postgres `NUMERIC(10, 2)`.
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
pub struct Area(Decimal);

impl Area {
    /// Zero [`Area`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Maximum [`Area`]: `99999999.99` square feet.
    pub const MAX: Self =
        Self(Decimal::from_parts(0x540B_E3FF, 0x2, 0, false, 2));

    /// Creates a new [`Area`] if the provided `sqft` is not negative, has at
    /// most two decimal places and doesn't exceed [`Area::MAX`].
    #[must_use]
    pub fn new(sqft: Decimal) -> Option<Self> {
        Self::try_from(sqft).ok()
    }

    /// Returns the number of square feet in this [`Area`].
    #[must_use]
    pub const fn sqft(self) -> Decimal {
        self.0
    }

    /// Indicates whether this [`Area`] is strictly greater than zero.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Subtracts the `other` [`Area`] from this one.
    ///
    /// [`None`] is returned if the result would be negative.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        Self::new(self.0.checked_sub(other.0)?)
    }

    /// Calculates the price of this [`Area`] at the provided
    /// `price_per_sqft`, rounded half away from zero to whole cents.
    ///
    /// [`None`] is returned if the price exceeds [`Money::MAX`].
    #[must_use]
    pub fn checked_mul(self, price_per_sqft: Money) -> Option<Money> {
        let price = self
            .0
            .checked_mul(price_per_sqft.amount())?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Money::new(price)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Area {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .map_err(|_| ParseError::Format)?
            .try_into()
    }
}

impl TryFrom<Decimal> for Area {
    type Error = ParseError;

    fn try_from(sqft: Decimal) -> Result<Self, Self::Error> {
        money::bounded(sqft, Self::MAX.0).map(Self)
    }
}

impl From<Area> for Decimal {
    fn from(area: Area) -> Self {
        area.0
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use crate::{money::ParseError, Money};

    use super::Area;

    fn area(s: &str) -> Area {
        Area::from_str(s).unwrap()
    }

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn rejects_negative() {
        assert!(Area::from_str("-0.01").is_err());
        assert!(Area::from_str("0").is_ok());
        assert!(!area("0").is_positive());
        assert!(area("0.01").is_positive());
    }

    #[test]
    fn bounds_precision_and_magnitude() {
        assert_eq!(Area::MAX.to_string(), "99999999.99");
        assert_eq!(area("99999999.99"), Area::MAX);
        assert_eq!(Area::from_str("100000000"), Err(ParseError::OutOfRange));
        assert_eq!(Area::from_str("0.125"), Err(ParseError::Precision));
        assert_eq!(area("0.50").to_string(), "0.5");
        assert!(serde_json::from_str::<Area>("1e12").is_err());
    }

    #[test]
    fn multiplies_by_price() {
        let price = |a, m| area(a).checked_mul(money(m)).unwrap();

        assert_eq!(price("1000", "50"), money("50000"));
        assert_eq!(price("200", "50"), money("10000"));
        assert_eq!(price("1000.00", "50.00").to_string(), "50000");
        assert_eq!(price("0.5", "12.34"), money("6.17"));
        assert_eq!(price("0.5", "0.05"), money("0.03"));
        assert_eq!(price("0.01", "0.01"), Money::ZERO);
    }

    #[test]
    fn refuses_price_beyond_maximum() {
        assert_eq!(Area::MAX.checked_mul(Money::MAX), None);
        assert_eq!(Area::MAX.checked_mul(money("100001")), None);
        assert_eq!(
            Area::MAX.checked_mul(money("99999")).unwrap().to_string(),
            "9999899999000.01",
        );
        assert_eq!(Area::ZERO.checked_mul(Money::MAX), Some(Money::ZERO));
    }

    #[test]
    fn subtracts_without_going_negative() {
        assert_eq!(area("600").checked_sub(area("200")), Some(area("400")));
        assert_eq!(area("600").checked_sub(area("600")), Some(Area::ZERO));
        assert_eq!(area("600").checked_sub(area("600.01")), None);
    }
}
