//! [`Connection`] definitions.

use std::{fmt, future::Future};

use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{self, postgres};

pub use deadpool_postgres::{
    Client as Pooled, CreatePoolError as PoolCreationError, Pool, PoolError,
};
pub use tokio_postgres::Error;

/// Parameters bound to a statement.
pub type Params<'p> = &'p [&'p (dyn ToSql + Sync)];

/// Generic database connection.
pub trait Connection {
    /// Runs the provided statement and returns all the rows it produced.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    fn query<T>(
        &self,
        stmt: &T,
        params: Params<'_>,
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the provided statement and returns the number of rows it
    /// affected.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    fn exec<T>(
        &self,
        stmt: &T,
        params: Params<'_>,
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the provided statement and returns the first row it produced, if
    /// any.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    fn query_opt<T>(
        &self,
        stmt: &T,
        params: Params<'_>,
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized,
    {
        self.query(stmt, params)
            .map_ok(|rows| rows.into_iter().next())
    }
}

/// Implements [`Connection`] for a type able to provide a raw
/// [`tokio_postgres`] client.
macro_rules! raw_connection {
    ($ty:ty => |$this:ident| $raw:expr) => {
        impl Connection for $ty {
            async fn query<T>(
                &self,
                stmt: &T,
                params: Params<'_>,
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $this = self;
                $raw.query(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: Params<'_>,
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $this = self;
                $raw.execute(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }
        }
    };
}

raw_connection!(Pooled => |c| &**c);
raw_connection!(Tx => |c| c.transaction());

/// [`Pooled`] connection holding an open transaction.
///
/// The transaction is rolled back if this [`Tx`] is dropped before
/// [`Tx::commit()`].
#[self_referencing]
pub struct Tx {
    /// [`Pooled`] connection owning the transaction.
    pooled: Pooled,

    /// Open transaction, taken out on commit.
    #[borrows(mut pooled)]
    #[not_covariant]
    open: Option<deadpool_postgres::Transaction<'this>>,
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx").finish_non_exhaustive()
    }
}

impl Tx {
    /// Issues `BEGIN` on the provided [`Pooled`] connection.
    ///
    /// # Errors
    ///
    /// If `BEGIN` fails.
    pub async fn begin(pooled: Pooled) -> Result<Self, Traced<database::Error>> {
        Self::try_new_async_send(pooled, |c| {
            c.transaction().map_ok(Some).boxed()
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
    }

    /// Issues `COMMIT` for this [`Tx`].
    ///
    /// # Errors
    ///
    /// If `COMMIT` fails.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    pub async fn commit(mut self) -> Result<(), Traced<database::Error>> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "`Option::take` doesn't fit the invariant lifetime"
        )]
        let open = self.with_open_mut(|tx| tx.take());
        open.expect("`Tx` is committed only once")
            .commit()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    /// Returns the open transaction of this [`Tx`].
    fn transaction(&self) -> &deadpool_postgres::Transaction<'_> {
        self.with_open(|tx| tx.as_ref().expect("`Tx` is used until committed"))
    }
}
