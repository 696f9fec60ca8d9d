//! [`Tx`] client definitions.

use std::{mem, sync::Arc};

use tokio::sync::{RwLock, RwLockReadGuard};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection as _},
};

use super::NonTx;

/// Postgres database client running statements inside a single transaction.
///
/// `BEGIN` is issued only before the first statement. The transaction is
/// rolled back when the last clone of this [`Tx`] is dropped unless
/// [`Tx::commit()`] succeeded before.
///
/// Once committed, the client refuses to run any further statement.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client the transaction takes its connection from.
    non_tx: NonTx,

    /// Stage of the transaction.
    state: Arc<RwLock<State>>,
}

/// Stage of a [`Tx`] transaction.
#[derive(Debug, Default)]
enum State {
    /// No statement was run yet.
    #[default]
    Pending,

    /// `BEGIN` was issued.
    Begun(connection::Tx),

    /// Transaction was committed or failed to.
    Finished,
}

impl Tx {
    /// Prepares a new [`Tx`] client on top of the provided [`NonTx`] one.
    #[must_use]
    pub fn from_non_tx(non_tx: NonTx) -> Self {
        Self {
            non_tx,
            state: Arc::default(),
        }
    }

    /// Returns the [`connection::Tx`] of this client, beginning it first if
    /// needed.
    ///
    /// # Errors
    ///
    /// If `BEGIN` fails or the transaction is finished already.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        let mut state = self.state.write().await;
        if matches!(*state, State::Finished) {
            return Err(tracerr::new!(database::Error::from(
                postgres::Error::Finished
            )));
        }
        if matches!(*state, State::Pending) {
            let pooled =
                self.non_tx.connection().await.map_err(tracerr::wrap!())?;
            let tx = connection::Tx::begin(pooled)
                .await
                .map_err(tracerr::wrap!())?;
            *state = State::Begun(tx);
        }

        Ok(RwLockReadGuard::map(state.downgrade(), |s| match s {
            State::Begun(tx) => tx,
            State::Pending | State::Finished => unreachable!("just begun"),
        }))
    }

    /// Commits the transaction of this [`Tx`] client, if it was begun.
    ///
    /// # Errors
    ///
    /// If `COMMIT` fails or the transaction is finished already.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let mut state = self.state.write().await;
        match mem::replace(&mut *state, State::Finished) {
            State::Pending => Ok(()),
            State::Begun(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            State::Finished => Err(tracerr::new!(database::Error::from(
                postgres::Error::Finished
            ))),
        }
    }
}

delegate_connection!(Tx);
