//! Postgres [`Database`] implementation.

pub mod client;
pub mod connection;
mod impls;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::{error::SqlState, NoTls};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use deadpool_postgres::Config;
pub use refinery::embed_migrations;

pub use self::{
    client::{NonTx, Tx},
    connection::Connection,
};

/// [`SqlState`]s of failures caused by concurrent access to the same rows.
const CONTENTION_STATES: [SqlState; 3] = [
    SqlState::LOCK_NOT_AVAILABLE,
    SqlState::T_R_DEADLOCK_DETECTED,
    SqlState::T_R_SERIALIZATION_FAILURE,
];

/// Postgres [`Database`] client, either [`NonTx`] or [`Tx`].
#[derive(Clone, Debug, Deref)]
pub struct Postgres<C = NonTx>(C);

impl Postgres {
    /// Builds a [`NonTx`] [`Postgres`] client over a connection pool
    /// described by the provided [`Config`].
    ///
    /// No connection is established until the first statement.
    ///
    /// # Errors
    ///
    /// If the [`Config`] doesn't describe a valid pool.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        conf.create_pool(Some(Runtime::Tokio1), NoTls)
            .map(|pool| Self(NonTx::from_pool(pool)))
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Statement failed.
    #[display("Statement failed: {_0}")]
    Statement(connection::Error),

    /// [`Config`] doesn't describe a valid [`connection::Pool`].
    #[display("Invalid `connection::Pool` config: {_0}")]
    PoolConfig(connection::PoolCreationError),

    /// [`connection::Pool`] couldn't provide a connection.
    #[display("No pooled connection: {_0}")]
    Pool(connection::PoolError),

    /// Row was modified by someone else since it had been read.
    #[display("`{_0}` row was modified concurrently")]
    #[from(ignore)]
    StaleVersion(#[error(not(source))] &'static str),

    /// Transaction was committed already.
    #[display("Transaction is finished already")]
    #[from(ignore)]
    Finished,
}

impl Error {
    /// Indicates whether this [`Error`] is caused by concurrent access to the
    /// same rows, so retrying may succeed.
    #[must_use]
    pub fn is_contention(&self) -> bool {
        match self {
            Self::Statement(e) => {
                e.code().is_some_and(|c| CONTENTION_STATES.contains(c))
            }
            Self::StaleVersion(_) => true,
            Self::Finished | Self::Pool(_) | Self::PoolConfig(_) => false,
        }
    }
}
