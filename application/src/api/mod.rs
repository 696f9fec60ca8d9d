//! REST API definitions.

pub mod booking;
pub mod plot;

use axum::{
    routing::{get, post, put},
    Router,
};
use common::pagination;
use serde::Serialize;

use crate::define_error;

pub use self::{booking::Booking, plot::Plot};

/// Creates a [`Router`] serving the REST API.
///
/// [`Service`] is expected to be provided as an [`axum::Extension`].
///
/// [`Service`]: crate::Service
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/plots", post(plot::create).get(plot::list))
        .route("/plots/:id", get(plot::get))
        .route("/plots/:id/reservations", post(plot::reserve))
        .route("/bookings", get(booking::list))
        .route("/bookings/:id", get(booking::get))
        .route("/bookings/:id/status", put(booking::update_status))
}

/// A page of `T`s.
#[derive(Clone, Debug, Serialize)]
pub struct Page<C, T> {
    /// Items on this [`Page`].
    pub items: Vec<T>,

    /// Cursor of the last item on this [`Page`], to request the next one
    /// after.
    pub end_cursor: Option<C>,

    /// Indicator whether there are more items after this [`Page`].
    pub has_next_page: bool,
}

impl<C, N, T> From<pagination::Page<C, N>> for Page<C, T>
where
    C: Clone,
    N: Into<T>,
{
    fn from(page: pagination::Page<C, N>) -> Self {
        let end_cursor = page.end_cursor().cloned();
        Self {
            has_next_page: page.has_next_page,
            items: page.edges.into_iter().map(|e| e.node.into()).collect(),
            end_cursor,
        }
    }
}

/// Parses pagination [`pagination::Arguments`] out of the request
/// parameters.
///
/// # Errors
///
/// Errors if `first` is zero or exceeds
/// [`pagination::Arguments::MAX_FIRST`].
pub fn arguments<C>(
    first: Option<usize>,
    after: Option<C>,
) -> Result<pagination::Arguments<C>, PaginationError> {
    pagination::Arguments::new(first, after).ok_or(PaginationError::First)
}

define_error! {
    enum PrivilegeError {
        #[code = "NOT_ADMIN"]
        #[status = FORBIDDEN]
        #[message = "Authenticated user must be an administrator"]
        Admin,
    }
}

define_error! {
    enum PaginationError {
        #[code = "INVALID_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "`first` must be between 1 and 100"]
        First,
    }
}

#[cfg(test)]
mod spec {
    use common::pagination;

    use crate::Error;

    use super::{arguments, Page};

    #[test]
    fn converts_page() {
        let args = pagination::Arguments::new(Some(2), None::<u8>).unwrap();
        let page = pagination::Page::<u8, u8>::new(
            &args,
            [(1, 10), (2, 20), (3, 30)],
        );

        let page = Page::<u8, u16>::from(page);

        assert_eq!(page.items, [10, 20]);
        assert_eq!(page.end_cursor, Some(2));
        assert!(page.has_next_page);
    }

    #[test]
    fn rejects_oversized_page() {
        let err = Error::from(arguments::<u8>(Some(500), None).unwrap_err());

        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert!(arguments::<u8>(None, None).is_ok());
    }
}
