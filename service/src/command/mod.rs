//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_plot;
pub mod reserve_plot;
pub mod update_booking_status;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession, create_plot::CreatePlot,
    reserve_plot::ReservePlot, update_booking_status::UpdateBookingStatus,
};
