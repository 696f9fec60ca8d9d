//! [`Booking`]-related read definitions.

#[cfg(doc)]
use crate::domain::Booking;

pub mod list {
    //! [`Booking`] list definitions.

    use common::define_pagination;

    #[cfg(doc)]
    use crate::domain::Booking;
    use crate::domain::{self, booking, plot, user};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Page`].
    pub type Node = domain::Booking;

    /// Cursor pointing to a specific [`Booking`] in a list.
    pub type Cursor = booking::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the client whose [`Booking`]s should be listed.
        pub client_id: Option<user::Id>,

        /// ID of the [`Plot`] whose [`Booking`]s should be listed.
        ///
        /// [`Plot`]: domain::Plot
        pub plot_id: Option<plot::Id>,
    }
}
