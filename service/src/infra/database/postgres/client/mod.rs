//! Postgres database client definitions.

/// Implements [`Connection`] for a client by running every statement on the
/// [`Connection`] its `connection()` method resolves to.
///
/// [`Connection`]: crate::infra::database::postgres::Connection
macro_rules! delegate_connection {
    ($ty:ty) => {
        impl $crate::infra::database::postgres::Connection for $ty {
            async fn query<T>(
                &self,
                stmt: &T,
                params: $crate::infra::database::postgres::connection::Params<
                    '_,
                >,
            ) -> Result<
                Vec<tokio_postgres::Row>,
                tracerr::Traced<$crate::infra::database::Error>,
            >
            where
                T: tokio_postgres::ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: $crate::infra::database::postgres::connection::Params<
                    '_,
                >,
            ) -> Result<u64, tracerr::Traced<$crate::infra::database::Error>>
            where
                T: tokio_postgres::ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    };
}

pub mod non_tx;
pub mod tx;

pub use self::{non_tx::NonTx, tx::Tx};
