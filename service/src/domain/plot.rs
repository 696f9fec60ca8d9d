//! [`Plot`] definitions.

use std::str;

use common::{unit, Area, DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{booking, user};

/// Parcel of land listed for sale either as a whole or by area.
#[derive(Clone, Debug)]
pub struct Plot {
    /// ID of this [`Plot`].
    pub id: Id,

    /// ID of the user who listed this [`Plot`].
    pub owner_id: user::Id,

    /// [`Title`] of this [`Plot`].
    pub title: Title,

    /// [`Location`] of this [`Plot`].
    pub location: Location,

    /// Total [`Area`] of this [`Plot`].
    pub total_area: Area,

    /// Price of a single square foot of this [`Plot`].
    pub price_per_sqft: Money,

    /// Indicator whether this [`Plot`] can still be sold as a whole.
    pub is_available_full: bool,

    /// [`Area`] of this [`Plot`] still available for fractional sale.
    pub available_for_investment: Area,

    /// Indicator whether this [`Plot`] was verified by an administrator.
    pub is_verified: bool,

    /// [`Version`] of this [`Plot`].
    pub version: Version,

    /// [`DateTime`] when this [`Plot`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Plot`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Plot {
    /// Creates a new unverified [`Plot`] with its whole [`Area`] available.
    #[must_use]
    pub fn new(
        owner_id: user::Id,
        title: Title,
        location: Location,
        total_area: Area,
        price_per_sqft: Money,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: Id::new(),
            owner_id,
            title,
            location,
            total_area,
            price_per_sqft,
            is_available_full: true,
            available_for_investment: total_area,
            is_verified: false,
            version: Version::INITIAL,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    /// Allocates a part of this [`Plot`] for the provided booking [`Kind`].
    ///
    /// Returns the resulting [`booking::Allocation`] along with its total
    /// price. This [`Plot`] is left untouched if an [`AllocationError`] is
    /// returned.
    ///
    /// Any fractional allocation permanently withdraws this [`Plot`] from the
    /// whole-plot sale, even when it leaves no [`Area`] available.
    ///
    /// # Errors
    ///
    /// See [`AllocationError`] for details.
    ///
    /// [`Kind`]: booking::Kind
    pub fn allocate(
        &mut self,
        kind: booking::Kind,
        requested_area: Option<Area>,
    ) -> Result<(booking::Allocation, Money), AllocationError> {
        use AllocationError as E;

        match (kind, requested_area) {
            (booking::Kind::FullPlot, Some(_)) => Err(E::AreaNotAllowed),
            (booking::Kind::FullPlot, None) => {
                if !self.is_available_full {
                    return Err(E::NotAvailableForFull);
                }
                let price = self
                    .total_area
                    .checked_mul(self.price_per_sqft)
                    .ok_or(E::PriceOverflow)?;

                self.is_available_full = false;
                self.available_for_investment = Area::ZERO;

                Ok((booking::Allocation::FullPlot, price))
            }
            (booking::Kind::SquareFeet, None) => Err(E::AreaRequired),
            (booking::Kind::SquareFeet, Some(area)) => {
                if !area.is_positive() {
                    return Err(E::AreaNotPositive);
                }
                let remaining = self
                    .available_for_investment
                    .checked_sub(area)
                    .ok_or(E::InsufficientArea {
                        requested: area,
                        available: self.available_for_investment,
                    })?;
                let price = area
                    .checked_mul(self.price_per_sqft)
                    .ok_or(E::PriceOverflow)?;

                self.is_available_full = false;
                self.available_for_investment = remaining;

                Ok((booking::Allocation::SquareFeet(area), price))
            }
        }
    }
}

/// Error of allocating a part of a [`Plot`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum AllocationError {
    /// Whole-plot booking cannot request a specific [`Area`].
    #[display("Whole-plot booking must not specify `requested_area`")]
    AreaNotAllowed,

    /// Fractional booking must request an [`Area`].
    #[display("Fractional booking requires `requested_area`")]
    AreaRequired,

    /// Requested [`Area`] is zero.
    #[display("`requested_area` must be positive")]
    AreaNotPositive,

    /// [`Plot`] cannot be sold as a whole anymore.
    #[display("Plot is not available for full booking")]
    NotAvailableForFull,

    /// [`Plot`] has less [`Area`] available than requested.
    #[display(
        "Requested area {requested} exceeds available area {available}"
    )]
    InsufficientArea {
        /// Requested [`Area`].
        requested: Area,

        /// [`Area`] available at the moment of the request.
        available: Area,
    },

    /// Total price doesn't fit into [`Money`].
    #[display("Total price exceeds {}", Money::MAX)]
    PriceOverflow,
}

impl AllocationError {
    /// Indicates whether this [`AllocationError`] is caused by the lack of
    /// capacity, rather than by a malformed request.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(self, Self::NotAvailableForFull | Self::InsufficientArea { .. })
    }
}

/// ID of a [`Plot`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Title of a [`Plot`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        is_valid_text(&title).then_some(Self(title))
    }
}

impl str::FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Human-readable location of a [`Plot`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Location(String);

impl Location {
    /// Creates a new [`Location`] if the given `location` is valid.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Option<Self> {
        let location = location.into();
        is_valid_text(&location).then_some(Self(location))
    }
}

impl str::FromStr for Location {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Location`")
    }
}

/// Checks whether the given `text` is trimmed, non-empty and fits into 255
/// characters.
fn is_valid_text(text: &str) -> bool {
    text.trim() == text && !text.is_empty() && text.chars().count() <= 255
}

/// Version of a [`Plot`] used for optimistic concurrency control.
///
/// Incremented by each persisted mutation of a [`Plot`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Version(i64);

impl Version {
    /// [`Version`] of a freshly created [`Plot`].
    pub const INITIAL: Self = Self(1);

    /// Returns the [`Version`] following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// [`DateTime`] when a [`Plot`] was created.
pub type CreationDateTime = DateTimeOf<(Plot, unit::Creation)>;

/// [`DateTime`] when a [`Plot`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Plot, unit::Modification)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{Area, Money};

    use crate::domain::{booking, user};

    use super::{AllocationError, Location, Plot, Title, Version};

    fn area(s: &str) -> Area {
        Area::from_str(s).unwrap()
    }

    fn plot(total: &str, price: &str) -> Plot {
        Plot::new(
            user::Id::new(),
            Title::new("Green Acres").unwrap(),
            Location::new("Pune, MH").unwrap(),
            area(total),
            Money::from_str(price).unwrap(),
        )
    }

    #[test]
    fn starts_fully_available() {
        let p = plot("1000", "50");

        assert!(p.is_available_full);
        assert_eq!(p.available_for_investment, p.total_area);
        assert_eq!(p.version, Version::INITIAL);
        assert!(!p.is_verified);
    }

    #[test]
    fn full_plot_takes_everything() {
        let mut p = plot("1000", "50");

        let (allocation, price) =
            p.allocate(booking::Kind::FullPlot, None).unwrap();

        assert_eq!(allocation, booking::Allocation::FullPlot);
        assert_eq!(price.to_string(), "50000");
        assert!(!p.is_available_full);
        assert_eq!(p.available_for_investment, Area::ZERO);

        assert_eq!(
            p.allocate(booking::Kind::FullPlot, None),
            Err(AllocationError::NotAvailableForFull),
        );
        assert!(matches!(
            p.allocate(booking::Kind::SquareFeet, Some(area("1"))),
            Err(AllocationError::InsufficientArea { .. }),
        ));
    }

    #[test]
    fn square_feet_subtracts_area() {
        let mut p = plot("1000", "50");
        p.available_for_investment = area("600");
        p.is_available_full = false;

        let (allocation, price) = p
            .allocate(booking::Kind::SquareFeet, Some(area("200")))
            .unwrap();

        assert_eq!(allocation, booking::Allocation::SquareFeet(area("200")));
        assert_eq!(price.to_string(), "10000");
        assert_eq!(p.available_for_investment, area("400"));
    }

    #[test]
    fn square_feet_disables_full_sale() {
        let mut p = plot("1000", "50");

        _ = p
            .allocate(booking::Kind::SquareFeet, Some(area("1")))
            .unwrap();

        assert!(!p.is_available_full);
        assert_eq!(
            p.allocate(booking::Kind::FullPlot, None),
            Err(AllocationError::NotAvailableForFull),
        );
    }

    #[test]
    fn zero_crossing_disables_full_sale() {
        let mut p = plot("10", "5");

        _ = p
            .allocate(booking::Kind::SquareFeet, Some(area("10")))
            .unwrap();

        assert!(!p.is_available_full);
        assert_eq!(p.available_for_investment, Area::ZERO);
    }

    #[test]
    fn rejects_excessive_area_without_changes() {
        let mut p = plot("1000", "50");
        let before = p.clone();

        let err = p
            .allocate(booking::Kind::SquareFeet, Some(area("1000.5")))
            .unwrap_err();

        assert!(err.is_capacity());
        assert_eq!(
            err,
            AllocationError::InsufficientArea {
                requested: area("1000.5"),
                available: area("1000"),
            },
        );
        assert_eq!(p.available_for_investment, before.available_for_investment);
        assert_eq!(p.is_available_full, before.is_available_full);
    }

    #[test]
    fn rejects_malformed_requests() {
        let mut p = plot("1000", "50");

        for (kind, requested, expected) in [
            (
                booking::Kind::FullPlot,
                Some(area("10")),
                AllocationError::AreaNotAllowed,
            ),
            (booking::Kind::SquareFeet, None, AllocationError::AreaRequired),
            (
                booking::Kind::SquareFeet,
                Some(Area::ZERO),
                AllocationError::AreaNotPositive,
            ),
        ] {
            let err = p.allocate(kind, requested).unwrap_err();

            assert_eq!(err, expected);
            assert!(!err.is_capacity());
        }
        assert!(p.is_available_full);
        assert_eq!(p.available_for_investment, p.total_area);
    }

    #[test]
    fn refuses_unrepresentable_price_without_changes() {
        let mut p = plot("99999999.99", "99999999.99");
        let before = p.clone();

        assert_eq!(
            p.allocate(booking::Kind::FullPlot, None),
            Err(AllocationError::PriceOverflow),
        );
        let err = p
            .allocate(booking::Kind::SquareFeet, Some(area("99999999")))
            .unwrap_err();
        assert_eq!(err, AllocationError::PriceOverflow);
        assert!(!err.is_capacity());

        assert!(p.is_available_full);
        assert_eq!(p.available_for_investment, before.available_for_investment);

        let (_, price) = p
            .allocate(booking::Kind::SquareFeet, Some(area("10000")))
            .unwrap();
        assert_eq!(price.to_string(), "999999999900");
    }

    #[test]
    fn validates_text() {
        assert!(Title::new("Plot 7").is_some());
        assert!(Title::new("").is_none());
        assert!(Title::new(" padded ").is_none());
        assert!(Location::new("x".repeat(255)).is_some());
        assert!(Location::new("x".repeat(256)).is_none());
    }
}
