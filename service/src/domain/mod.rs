//! Domain definitions.

pub mod booking;
pub mod plot;
pub mod user;

pub use self::{booking::Booking, plot::Plot};
