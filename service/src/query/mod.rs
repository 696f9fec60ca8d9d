//! [`Query`] definitions.

pub mod booking;
pub mod bookings;
pub mod plot;
pub mod plots;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    infra::{database, Database},
    Service,
};

/// [`Query`] of the [`Service`].
pub use common::Handler as Query;

/// [`Query`] reading a `W` addressed by a `B` key straight from the
/// [`Database`], without any transaction.
#[derive(Clone, Copy, Debug)]
pub struct Read<T>(T);

impl<W, B> Read<By<W, B>> {
    /// Reads a `W` addressed by the provided key.
    #[must_use]
    pub fn by(key: B) -> Self {
        Self(By::new(key))
    }
}

impl<Db, W, B> Query<Read<By<W, B>>> for Service<Db>
where
    Db: Database<Select<By<W, B>>, Ok = W, Err = Traced<database::Error>>,
{
    type Ok = W;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Read(key): Read<By<W, B>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(key))
            .await
            .map_err(tracerr::wrap!())
    }
}
