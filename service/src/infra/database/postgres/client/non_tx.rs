//! [`NonTx`] client definitions.

use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection as _},
};

/// Postgres database client running statements outside of transactions.
///
/// Each statement takes its own [`connection::Pooled`] connection, so
/// concurrent statements don't queue behind each other.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] the connections are taken from.
    pub(crate) pool: connection::Pool,
}

impl NonTx {
    /// Wraps the provided [`connection::Pool`] into a [`NonTx`] client.
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self { pool }
    }

    /// Takes a [`connection::Pooled`] connection out of the pool.
    ///
    /// # Errors
    ///
    /// If the [`connection::Pool`] is exhausted or cannot connect.
    pub(crate) async fn connection(
        &self,
    ) -> Result<connection::Pooled, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

delegate_connection!(NonTx);
