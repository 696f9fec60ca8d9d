//! [`Database`] operations of [`Postgres`].

#![expect(
    clippy::items_after_statements,
    reason = "SQL is declared next to the statement running it"
)]

mod booking;
mod migration;
mod plot;

use std::time::Duration;

use common::operations::{Commit, Transact};
use tracerr::Traced;

use crate::infra::{database, Database};

use super::{Connection, NonTx, Postgres, Tx};

/// Limits waiting for any row lock to the provided `timeout` until the end
/// of the current transaction.
async fn set_lock_timeout<C: Connection>(
    db: &Postgres<C>,
    timeout: Duration,
) -> Result<(), Traced<database::Error>> {
    // Zero disables `lock_timeout` in Postgres.
    let lock_timeout = format!("{}ms", timeout.as_millis().max(1));

    const SQL: &str = "\
        SELECT set_config('lock_timeout', $1::TEXT, TRUE)";
    db.query_opt(SQL, &[&lock_timeout])
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
}

/// `BEGIN` is deferred until the first statement of the returned client.
impl Database<Transact> for Postgres<NonTx> {
    type Ok = Postgres<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let Self(non_tx) = self;
        Ok(Postgres(Tx::from_non_tx(non_tx.clone())))
    }
}

/// Nested transactions are flattened into the outer one.
impl Database<Transact> for Postgres<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Postgres<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}
