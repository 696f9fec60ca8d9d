//! Abstractions for forward cursor pagination.

/// A page of nodes.
#[derive(Clone, Debug)]
pub struct Page<C, I> {
    /// [`Edge`]s in this [`Page`].
    pub edges: Vec<Edge<C, I>>,

    /// Indicator whether there are more nodes after this [`Page`].
    pub has_next_page: bool,
}

impl<C, I> Page<C, I> {
    /// Creates a new [`Page`] out of the selected rows.
    ///
    /// `rows` are expected to be selected with `limit + 1` to detect whether
    /// a next page exists.
    #[must_use]
    pub fn new(
        args: &Arguments<C>,
        rows: impl IntoIterator<Item = impl Into<Edge<C, I>>>,
    ) -> Self {
        let mut edges = rows.into_iter().map(Into::into).collect::<Vec<_>>();
        let has_next_page = edges.len() > args.first;
        edges.truncate(args.first);
        Self {
            edges,
            has_next_page,
        }
    }

    /// Returns the cursor of the last [`Edge`] on this [`Page`], if any.
    #[must_use]
    pub fn end_cursor(&self) -> Option<&C> {
        self.edges.last().map(|e| &e.cursor)
    }

    /// Maps nodes of this [`Page`] with the provided function.
    #[must_use]
    pub fn map<T>(self, mut f: impl FnMut(I) -> T) -> Page<C, T> {
        Page {
            edges: self
                .edges
                .into_iter()
                .map(|Edge { cursor, node }| Edge {
                    cursor,
                    node: f(node),
                })
                .collect(),
            has_next_page: self.has_next_page,
        }
    }
}

/// An edge of a [`Page`].
#[derive(Clone, Copy, Debug)]
pub struct Edge<C, I> {
    /// Cursor of this [`Edge`].
    pub cursor: C,

    /// Node of this [`Edge`].
    pub node: I,
}

impl<C, I> From<(C, I)> for Edge<C, I> {
    fn from((cursor, node): (C, I)) -> Self {
        Self { cursor, node }
    }
}

/// Pagination arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Arguments<C> {
    /// Number of items to return.
    pub first: usize,

    /// Cursor after which to return items.
    pub after: Option<C>,
}

impl<C> Arguments<C> {
    /// Maximum number of items a single page may contain.
    pub const MAX_FIRST: usize = 100;

    /// Default number of items on a page.
    pub const DEFAULT_FIRST: usize = 20;

    /// Creates new [`Arguments`].
    ///
    /// [`None`] is returned if `first` is zero or exceeds [`MAX_FIRST`].
    ///
    /// [`MAX_FIRST`]: Self::MAX_FIRST
    #[must_use]
    pub fn new(first: Option<usize>, after: Option<C>) -> Option<Self> {
        let first = first.unwrap_or(Self::DEFAULT_FIRST);
        (1..=Self::MAX_FIRST)
            .contains(&first)
            .then_some(Self { first, after })
    }

    /// Returns the number of rows to select to fill a page and detect
    /// whether a next one exists.
    #[must_use]
    pub fn fetch_limit(&self) -> usize {
        self.first + 1
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
pub struct Selector<C, F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments<C>,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($cursor:ty, $node:ty, $filter:ty) => {
        #[doc = "Edge of a [`Page`]."]
        pub type Edge = $crate::pagination::Edge<$cursor, $node>;

        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$cursor, $node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments<$cursor>;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$cursor, $filter>;
    };
}
