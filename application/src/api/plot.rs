//! [`Plot`]-related definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Extension, Json,
};
use common::{Area, DateTime, Handler as _, Money};
use serde::{Deserialize, Serialize};
use service::{
    command::{self, create_plot, reserve_plot},
    domain::{self, booking, plot, user},
    query, read,
};

use crate::{api, define_error, AsError, Error, Service, Session};

/// A plot listed for sale either as a whole or by area.
#[derive(Clone, Debug, Serialize)]
pub struct Plot {
    /// Unique identifier of this [`Plot`].
    pub id: plot::Id,

    /// ID of the user who listed this [`Plot`].
    pub owner_id: user::Id,

    /// Title of this [`Plot`].
    pub title: String,

    /// Human-readable location of this [`Plot`].
    pub location: String,

    /// Total area of this [`Plot`] in square feet.
    pub total_area: Area,

    /// Price of a single square foot of this [`Plot`].
    pub price_per_sqft: Money,

    /// Indicator whether this [`Plot`] can still be booked as a whole.
    pub is_available_full: bool,

    /// Area of this [`Plot`] still available for booking by square feet.
    pub available_for_investment: Area,

    /// Indicator whether this [`Plot`] was verified by an administrator.
    pub is_verified: bool,

    /// Version of this [`Plot`], incremented on each its modification.
    pub version: i64,

    /// [`DateTime`] when this [`Plot`] was created.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: DateTime,

    /// [`DateTime`] when this [`Plot`] was last modified.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub updated_at: DateTime,
}

impl From<domain::Plot> for Plot {
    fn from(plot: domain::Plot) -> Self {
        Self {
            id: plot.id,
            owner_id: plot.owner_id,
            title: plot.title.to_string(),
            location: plot.location.to_string(),
            total_area: plot.total_area,
            price_per_sqft: plot.price_per_sqft,
            is_available_full: plot.is_available_full,
            available_for_investment: plot.available_for_investment,
            is_verified: plot.is_verified,
            version: plot.version.into(),
            created_at: plot.created_at.coerce(),
            updated_at: plot.updated_at.coerce(),
        }
    }
}

/// Body of a [`Plot`] creation request.
#[derive(Clone, Debug, Deserialize)]
pub struct NewPlot {
    /// Title of a new [`Plot`].
    pub title: String,

    /// Human-readable location of a new [`Plot`].
    pub location: String,

    /// Total area of a new [`Plot`] in square feet.
    pub total_area: Area,

    /// Price of a single square foot of a new [`Plot`].
    pub price_per_sqft: Money,
}

/// Body of a [`Plot`] reservation request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Reservation {
    /// Kind of the reservation.
    pub booking_type: booking::Kind,

    /// Area to reserve, for [`booking::Kind::SquareFeet`] only.
    #[serde(default)]
    pub requested_area: Option<Area>,
}

/// Parameters of a [`Plot`]s list request.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// Number of [`Plot`]s to return.
    pub first: Option<usize>,

    /// ID of the [`Plot`] after which to return [`Plot`]s.
    pub after: Option<plot::Id>,

    /// Indicator whether to list only [`Plot`]s having any area left.
    pub available_only: bool,

    /// ID of the user whose [`Plot`]s should be listed.
    pub owner_id: Option<user::Id>,
}

/// Lists a new [`Plot`] on behalf of the authenticated user.
///
/// # Errors
///
/// Errors if the request is malformed or the [`Plot`] cannot be created.
#[tracing::instrument(skip_all, fields(user.id = %session.user_id))]
pub async fn create(
    Extension(service): Extension<Service>,
    session: Session,
    body: Result<Json<NewPlot>, JsonRejection>,
) -> Result<(http::StatusCode, Json<Plot>), Error> {
    let Json(NewPlot {
        title,
        location,
        total_area,
        price_per_sqft,
    }) = body.map_err(AsError::into_error)?;

    let plot = service
        .execute(command::CreatePlot {
            owner_id: session.user_id,
            title: plot::Title::new(title).ok_or(PlotError::InvalidTitle)?,
            location: plot::Location::new(location)
                .ok_or(PlotError::InvalidLocation)?,
            total_area,
            price_per_sqft,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::CREATED, Json(plot.into())))
}

/// Lists [`Plot`]s page by page.
///
/// # Errors
///
/// Errors if the pagination parameters are invalid.
#[tracing::instrument(skip_all, fields(user.id = %session.user_id))]
pub async fn list(
    Extension(service): Extension<Service>,
    session: Session,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<api::Page<plot::Id, Plot>>, Error> {
    let Query(ListParams {
        first,
        after,
        available_only,
        owner_id,
    }) = params.map_err(AsError::into_error)?;

    let page = service
        .execute(query::plots::List::by(read::plot::list::Selector {
            arguments: api::arguments(first, after)?,
            filter: read::plot::list::Filter {
                available_only,
                owner_id,
            },
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(page.into()))
}

/// Returns a single [`Plot`].
///
/// # Errors
///
/// Errors if the [`Plot`] doesn't exist.
#[tracing::instrument(skip_all, fields(user.id = %session.user_id))]
pub async fn get(
    Extension(service): Extension<Service>,
    session: Session,
    id: Result<Path<plot::Id>, PathRejection>,
) -> Result<Json<Plot>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;

    service
        .execute(query::plot::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|p| Json(p.into()))
        .ok_or_else(|| PlotError::NotExists.into())
}

/// Reserves a [`Plot`] or its area on behalf of the authenticated user.
///
/// # Errors
///
/// Errors if the request is malformed, the [`Plot`] doesn't exist or has
/// not enough capacity left, or is busy with concurrent reservations.
#[tracing::instrument(skip_all, fields(user.id = %session.user_id))]
pub async fn reserve(
    Extension(service): Extension<Service>,
    session: Session,
    id: Result<Path<plot::Id>, PathRejection>,
    body: Result<Json<Reservation>, JsonRejection>,
) -> Result<(http::StatusCode, Json<api::Booking>), Error> {
    let Path(plot_id) = id.map_err(AsError::into_error)?;
    let Json(Reservation {
        booking_type,
        requested_area,
    }) = body.map_err(AsError::into_error)?;

    let booking = service
        .execute(command::ReservePlot {
            plot_id,
            client_id: session.user_id,
            kind: booking_type,
            requested_area,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::CREATED, Json(booking.into())))
}

impl AsError for create_plot::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::AreaNotPositive => Some(PlotError::AreaNotPositive.into()),
            Self::Db(e) => e.try_as_error(),
            Self::PriceNotPositive => Some(PlotError::PriceNotPositive.into()),
            Self::PriceTooHigh => Some(PlotError::PriceTooHigh.into()),
        }
    }
}

impl AsError for reserve_plot::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use reserve_plot::ErrorKind as K;

        let (code, status_code) = match self.kind() {
            K::NotFound => return Some(PlotError::NotExists.into()),
            K::InvalidRequest => {
                ("INVALID_RESERVATION", http::StatusCode::BAD_REQUEST)
            }
            K::CapacityExceeded => {
                ("CAPACITY_EXCEEDED", http::StatusCode::CONFLICT)
            }
            K::Contention => return Some(PlotError::Busy.into()),
            K::PersistenceFailure => return None,
        };
        Some(Error {
            code,
            status_code,
            message: self.to_string(),
            backtrace: None,
        })
    }
}

define_error! {
    enum PlotError {
        #[code = "AREA_NOT_POSITIVE"]
        #[status = BAD_REQUEST]
        #[message = "Total area must be positive"]
        AreaNotPositive,

        #[code = "PLOT_BUSY"]
        #[status = CONFLICT]
        #[message = "`Plot` is busy with concurrent reservations, retry later"]
        Busy,

        #[code = "INVALID_LOCATION"]
        #[status = BAD_REQUEST]
        #[message = "Location must be trimmed, non-empty and at most 255 \
                     characters long"]
        InvalidLocation,

        #[code = "INVALID_TITLE"]
        #[status = BAD_REQUEST]
        #[message = "Title must be trimmed, non-empty and at most 255 \
                     characters long"]
        InvalidTitle,

        #[code = "PLOT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Plot` does not exist"]
        NotExists,

        #[code = "PRICE_NOT_POSITIVE"]
        #[status = BAD_REQUEST]
        #[message = "Price per square foot must be positive"]
        PriceNotPositive,

        #[code = "PRICE_TOO_HIGH"]
        #[status = BAD_REQUEST]
        #[message = "Price per square foot must not exceed 99999999.99"]
        PriceTooHigh,
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{Area, Money};
    use service::{
        command::{create_plot, reserve_plot::ExecutionError},
        domain::{self, booking, plot, user},
    };

    use crate::AsError as _;

    use super::{ListParams, Plot, Reservation};

    #[test]
    fn decodes_reservation() {
        let r: Reservation = serde_json::from_str(
            r#"{"booking_type": "square_feet", "requested_area": 200}"#,
        )
        .unwrap();
        assert_eq!(r.booking_type, booking::Kind::SquareFeet);
        assert_eq!(r.requested_area, Some(Area::from_str("200").unwrap()));

        let r: Reservation =
            serde_json::from_str(r#"{"booking_type": "full_plot"}"#).unwrap();
        assert_eq!(r.booking_type, booking::Kind::FullPlot);
        assert_eq!(r.requested_area, None);
    }

    #[test]
    fn rejects_unknown_booking_type() {
        assert!(serde_json::from_str::<Reservation>(
            r#"{"booking_type": "half_plot"}"#,
        )
        .is_err());
        assert!(serde_json::from_str::<Reservation>(
            r#"{"booking_type": "square_feet", "requested_area": -5}"#,
        )
        .is_err());
    }

    #[test]
    fn list_params_default() {
        let p = ListParams::default();

        assert!(!p.available_only);
        assert!(p.first.is_none());
        assert!(p.owner_id.is_none());
    }

    #[test]
    fn maps_reservation_errors() {
        let id = plot::Id::new();

        let err = ExecutionError::PlotNotExists(id).as_error();
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);

        let err = ExecutionError::Contention(id).as_error();
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert_eq!(err.code, "PLOT_BUSY");

        let err = ExecutionError::Allocation(
            plot::AllocationError::NotAvailableForFull,
        )
        .as_error();
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert_eq!(err.code, "CAPACITY_EXCEEDED");

        let err =
            ExecutionError::Allocation(plot::AllocationError::AreaRequired)
                .as_error();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);

        let err =
            ExecutionError::Allocation(plot::AllocationError::PriceOverflow)
                .as_error();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_RESERVATION");
    }

    #[test]
    fn maps_plot_creation_errors() {
        let err = create_plot::ExecutionError::PriceTooHigh.as_error();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "PRICE_TOO_HIGH");
    }

    #[test]
    fn rejects_unrepresentable_area() {
        assert!(serde_json::from_str::<Reservation>(
            r#"{"booking_type": "square_feet", "requested_area": "0.001"}"#,
        )
        .is_err());
        assert!(serde_json::from_str::<Reservation>(
            r#"{"booking_type": "square_feet", "requested_area": 1e30}"#,
        )
        .is_err());
    }

    #[test]
    fn renders_plot() {
        let plot = domain::Plot::new(
            user::Id::new(),
            plot::Title::new("Green Acres").unwrap(),
            plot::Location::new("Pune").unwrap(),
            Area::from_str("1000").unwrap(),
            Money::from_str("50").unwrap(),
        );

        let json = serde_json::to_value(Plot::from(plot)).unwrap();

        assert_eq!(json["is_available_full"], true);
        assert_eq!(json["total_area"], "1000");
        assert_eq!(json["available_for_investment"], "1000");
        assert_eq!(json["version"], 1);
        assert!(json["created_at"].is_string());
    }
}
