//! [`Plot`]-related read definitions.

#[cfg(doc)]
use crate::domain::Plot;

pub mod list {
    //! [`Plot`] list definitions.

    use common::define_pagination;

    #[cfg(doc)]
    use crate::domain::Plot;
    use crate::domain::{self, plot, user};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Page`].
    pub type Node = domain::Plot;

    /// Cursor pointing to a specific [`Plot`] in a list.
    pub type Cursor = plot::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// Indicator whether to list only [`Plot`]s having any area left.
        pub available_only: bool,

        /// ID of the user whose [`Plot`]s should be listed.
        pub owner_id: Option<user::Id>,
    }
}
