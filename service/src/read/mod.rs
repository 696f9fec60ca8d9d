//! Read entities definitions.

pub mod booking;
pub mod plot;
