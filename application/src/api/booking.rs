//! [`Booking`]-related definitions.

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
    command::{self, update_booking_status},
    domain::{self, booking, plot, user},
    query, read,
};

use crate::{api, define_error, AsError, Error, Service, Session};

/// A reservation of a [`Plot`] or its area.
///
/// [`Plot`]: api::Plot
#[derive(Clone, Debug, Serialize)]
pub struct Booking {
    /// Unique identifier of this [`Booking`].
    pub id: booking::Id,

    /// ID of the reserved [`Plot`].
    ///
    /// [`Plot`]: api::Plot
    pub plot_id: plot::Id,

    /// ID of the client who made this [`Booking`].
    pub client_id: user::Id,

    /// Kind of this [`Booking`].
    pub booking_type: booking::Kind,

    /// Reserved area, for [`booking::Kind::SquareFeet`] only.
    pub booked_area: Option<Area>,

    /// Total price of this [`Booking`].
    pub total_price: Money,

    /// Current status of this [`Booking`].
    pub status: booking::Status,

    /// [`DateTime`] when this [`Booking`] was created.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: DateTime,
}

impl From<domain::Booking> for Booking {
    fn from(booking: domain::Booking) -> Self {
        Self {
            id: booking.id,
            plot_id: booking.plot_id,
            client_id: booking.client_id,
            booking_type: booking.allocation.kind(),
            booked_area: booking.allocation.area(),
            total_price: booking.total_price,
            status: booking.status,
            created_at: booking.created_at.coerce(),
        }
    }
}

/// Body of a [`Booking`] status update request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct StatusChange {
    /// New status of the [`Booking`].
    pub status: booking::Status,
}

/// Parameters of a [`Booking`]s list request.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// Number of [`Booking`]s to return.
    pub first: Option<usize>,

    /// ID of the [`Booking`] after which to return [`Booking`]s.
    pub after: Option<booking::Id>,

    /// ID of the [`Plot`] whose [`Booking`]s should be listed.
    ///
    /// [`Plot`]: api::Plot
    pub plot_id: Option<plot::Id>,

    /// ID of the client whose [`Booking`]s should be listed.
    ///
    /// Considered for administrators only, the others always see their own
    /// [`Booking`]s.
    pub client_id: Option<user::Id>,
}

/// Lists [`Booking`]s visible to the authenticated user page by page.
///
/// # Errors
///
/// Errors if the pagination parameters are invalid.
#[tracing::instrument(skip_all, fields(user.id = %session.user_id))]
pub async fn list(
    Extension(service): Extension<Service>,
    session: Session,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<api::Page<booking::Id, Booking>>, Error> {
    let Query(ListParams {
        first,
        after,
        plot_id,
        client_id,
    }) = params.map_err(AsError::into_error)?;

    let client_id = if session.role.is_admin() {
        client_id
    } else {
        Some(session.user_id)
    };

    let page = service
        .execute(query::bookings::List::by(read::booking::list::Selector {
            arguments: api::arguments(first, after)?,
            filter: read::booking::list::Filter { client_id, plot_id },
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(page.into()))
}

/// Returns a single [`Booking`] visible to the authenticated user.
///
/// # Errors
///
/// Errors if the [`Booking`] doesn't exist or is not visible.
#[tracing::instrument(skip_all, fields(user.id = %session.user_id))]
pub async fn get(
    Extension(service): Extension<Service>,
    session: Session,
    id: Result<Path<booking::Id>, PathRejection>,
) -> Result<Json<Booking>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;

    service
        .execute(query::booking::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .filter(|b| session.can_access(b.client_id))
        .map(|b| Json(b.into()))
        .ok_or_else(|| BookingError::NotExists.into())
}

/// Moves a [`Booking`] to another status on behalf of an administrator.
///
/// # Errors
///
/// Errors if the request is malformed, the authenticated user is not an
/// administrator, the [`Booking`] doesn't exist or cannot move to the
/// requested status.
#[tracing::instrument(skip_all, fields(user.id = %session.user_id))]
pub async fn update_status(
    Extension(service): Extension<Service>,
    session: Session,
    id: Result<Path<booking::Id>, PathRejection>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<Booking>, Error> {
    let Path(booking_id) = id.map_err(AsError::into_error)?;
    let Json(StatusChange { status }) = body.map_err(AsError::into_error)?;

    service
        .execute(command::UpdateBookingStatus {
            booking_id,
            initiator: session.into_inner(),
            status,
        })
        .await
        .map(|b| Json(b.into()))
        .map_err(AsError::into_error)
}

impl AsError for update_booking_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::InvalidTransition { .. } => Some(Error {
                code: "INVALID_STATUS_TRANSITION",
                status_code: http::StatusCode::CONFLICT,
                message: self.to_string(),
                backtrace: None,
            }),
            Self::NotAdmin(_) => Some(api::PrivilegeError::Admin.into()),
        }
    }
}

define_error! {
    enum BookingError {
        #[code = "BOOKING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Booking` does not exist"]
        NotExists,
    }
}
