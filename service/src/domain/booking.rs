//! [`Booking`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Area, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{plot, user};

/// Reservation of a [`Plot`] or its part by a client.
///
/// [`Plot`]: plot::Plot
#[derive(Clone, Debug)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: Id,

    /// ID of the reserved [`Plot`].
    ///
    /// [`Plot`]: plot::Plot
    pub plot_id: plot::Id,

    /// ID of the client who made this [`Booking`].
    pub client_id: user::Id,

    /// What was reserved by this [`Booking`].
    pub allocation: Allocation,

    /// Total price of this [`Booking`].
    pub total_price: Money,

    /// Current [`Status`] of this [`Booking`].
    pub status: Status,

    /// [`DateTime`] when this [`Booking`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Booking`].
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

/// Part of a [`Plot`] reserved by a [`Booking`].
///
/// [`Plot`]: plot::Plot
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Allocation {
    /// The whole [`Plot`].
    ///
    /// [`Plot`]: plot::Plot
    FullPlot,

    /// The provided positive [`Area`] of a [`Plot`].
    ///
    /// [`Plot`]: plot::Plot
    SquareFeet(Area),
}

impl Allocation {
    /// Restores an [`Allocation`] from its stored parts.
    ///
    /// [`None`] is returned if the parts are inconsistent.
    #[must_use]
    pub fn from_parts(kind: Kind, area: Option<Area>) -> Option<Self> {
        match (kind, area) {
            (Kind::FullPlot, None) => Some(Self::FullPlot),
            (Kind::SquareFeet, Some(area)) if area.is_positive() => {
                Some(Self::SquareFeet(area))
            }
            _ => None,
        }
    }

    /// Returns [`Kind`] of this [`Allocation`].
    #[must_use]
    pub const fn kind(self) -> Kind {
        match self {
            Self::FullPlot => Kind::FullPlot,
            Self::SquareFeet(_) => Kind::SquareFeet,
        }
    }

    /// Returns the reserved [`Area`], if it was reserved by area.
    #[must_use]
    pub const fn area(self) -> Option<Area> {
        match self {
            Self::FullPlot => None,
            Self::SquareFeet(area) => Some(area),
        }
    }
}

define_kind! {
    #[doc = "Kind of a [`Booking`]."]
    #[case = "snake_case"]
    enum Kind {
        #[doc = "Reservation of a whole plot."]
        FullPlot = 1,

        #[doc = "Reservation of a plot area in square feet."]
        SquareFeet = 2,
    }
}

define_kind! {
    #[doc = "Status of a [`Booking`]."]
    enum Status {
        #[doc = "Awaiting payment."]
        Pending = 1,

        #[doc = "Paid and confirmed."]
        Confirmed = 2,

        #[doc = "Cancelled before completion."]
        Cancelled = 3,

        #[doc = "Completed deal."]
        Completed = 4,
    }
}

impl Status {
    /// Indicates whether no further transitions are possible from this
    /// [`Status`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Indicates whether a [`Booking`] may move from this [`Status`] to the
    /// `next` one.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Completed | Self::Cancelled)
        )
    }
}

/// [`DateTime`] when a [`Booking`] was created.
pub type CreationDateTime = DateTimeOf<(Booking, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Area;

    use super::{Allocation, Kind, Status};

    #[test]
    fn kind_wire_names() {
        assert_eq!(Kind::FullPlot.to_string(), "full_plot");
        assert_eq!(Kind::from_str("square_feet").unwrap(), Kind::SquareFeet);
        assert!(Kind::from_str("FULL_PLOT").is_err());
        assert!(Kind::from_str("acre").is_err());
    }

    #[test]
    fn allocation_from_parts() {
        let area = Area::from_str("12.5").unwrap();

        assert_eq!(
            Allocation::from_parts(Kind::FullPlot, None),
            Some(Allocation::FullPlot),
        );
        assert_eq!(
            Allocation::from_parts(Kind::SquareFeet, Some(area)),
            Some(Allocation::SquareFeet(area)),
        );
        assert_eq!(Allocation::from_parts(Kind::FullPlot, Some(area)), None);
        assert_eq!(Allocation::from_parts(Kind::SquareFeet, None), None);
        assert_eq!(
            Allocation::from_parts(Kind::SquareFeet, Some(Area::ZERO)),
            None,
        );
    }

    #[test]
    fn status_transitions() {
        use Status as S;

        assert!(S::Pending.can_become(S::Confirmed));
        assert!(S::Pending.can_become(S::Cancelled));
        assert!(S::Confirmed.can_become(S::Completed));
        assert!(S::Confirmed.can_become(S::Cancelled));

        assert!(!S::Pending.can_become(S::Completed));
        assert!(!S::Confirmed.can_become(S::Pending));
        for terminal in [S::Cancelled, S::Completed] {
            assert!(terminal.is_terminal());
            for next in [S::Pending, S::Confirmed, S::Cancelled, S::Completed] {
                assert!(!terminal.can_become(next));
            }
        }
    }
}
