//! In-memory [`Database`] implementation.
//!
//! Mirrors the transactional semantics of the [`Postgres`] one closely
//! enough to exercise the business logic without a running database:
//! - row locks are per-key [`tokio::sync::Mutex`]es held until the end of a
//!   transaction;
//! - writes of a transaction are staged and applied atomically on commit,
//!   checking versions of the updated rows;
//! - an uncommitted transaction is rolled back once dropped.
//!
//! [`Postgres`]: crate::infra::Postgres

mod client;
mod impls;

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

use derive_more::{Deref, Display, Error as StdError};

use crate::domain::{booking, plot, Booking, Plot};
#[cfg(doc)]
use crate::infra::Database;

pub use self::client::{NonTx, Tx};

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Deref)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self(NonTx::new(Arc::default()))
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, StdError)]
pub enum Error {
    /// Row lock wasn't acquired in time.
    #[display("`{_0}` row lock wasn't acquired in time")]
    LockTimeout(#[error(not(source))] &'static str),

    /// Row was modified concurrently since it has been read.
    #[display("`{_0}` row was modified concurrently")]
    StaleVersion(#[error(not(source))] &'static str),

    /// Row with the same primary key exists already.
    #[display("`{_0}` row exists already")]
    Duplicate(#[error(not(source))] &'static str),

    /// Row references a non-existent one.
    #[display("`{_0}` row references a non-existent one")]
    MissingReference(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is caused by a concurrent access to the same rows,
    /// so the failed operation may succeed being retried.
    #[must_use]
    pub const fn is_contention(&self) -> bool {
        matches!(self, Self::LockTimeout(..) | Self::StaleVersion(..))
    }
}

/// Key of a lockable row.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum RowKey {
    /// Row of a [`Plot`].
    Plot(plot::Id),

    /// Row of a [`Booking`].
    Booking(booking::Id),
}

/// Write of a row into a [`Memory`] database.
///
/// Applied immediately by a [`NonTx`] client, while a [`Tx`] one stages it
/// until committed.
#[derive(Clone, Debug)]
pub enum Write {
    /// Insertion of a new [`Plot`].
    InsertPlot(Plot),

    /// Version-checked update of an existing [`Plot`].
    UpdatePlot(Plot),

    /// Insertion of a new [`Booking`].
    InsertBooking(Booking),

    /// Update of an existing [`Booking`].
    UpdateBooking(Booking),
}

/// Committed state of a [`Memory`] database.
#[derive(Debug, Default)]
struct Tables {
    /// Committed [`Plot`]s.
    plots: Mutex<BTreeMap<plot::Id, Plot>>,

    /// Committed [`Booking`]s.
    bookings: Mutex<BTreeMap<booking::Id, Booking>>,

    /// Row locks, created on demand and dropped once nobody uses them.
    locks: Mutex<HashMap<RowKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl RowKey {
    /// Returns name of the table the row belongs to.
    const fn table(self) -> &'static str {
        match self {
            Self::Plot(_) => "plots",
            Self::Booking(_) => "bookings",
        }
    }
}

/// Access to rows of a [`Memory`] database.
pub trait Storage {
    /// Returns the [`Plot`] with the provided [`plot::Id`], if any.
    fn plot(&self, id: plot::Id) -> Option<Plot>;

    /// Returns the [`Booking`] with the provided [`booking::Id`], if any.
    fn booking(&self, id: booking::Id) -> Option<Booking>;

    /// Performs the provided [`Write`].
    ///
    /// # Errors
    ///
    /// If the [`Write`] conflicts with the committed state.
    fn write(&self, write: Write) -> Result<(), Error>;
}

impl Tables {
    /// Returns the lock of the row identified by the provided [`RowKey`].
    fn lock_of(&self, key: RowKey) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_default(),
        )
    }

    /// Forgets the lock of the row identified by the provided [`RowKey`] if
    /// nobody holds or awaits it.
    fn release(&self, key: RowKey) {
        let mut locks =
            self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(&key).is_some_and(|l| Arc::strong_count(l) == 1) {
            _ = locks.remove(&key);
        }
    }

    /// Returns the committed [`Plot`] with the provided [`plot::Id`].
    fn plot(&self, id: plot::Id) -> Option<Plot> {
        self.plots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Returns the committed [`Booking`] with the provided [`booking::Id`].
    fn booking(&self, id: booking::Id) -> Option<Booking> {
        self.bookings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Applies all the provided [`Write`]s atomically.
    ///
    /// Nothing is applied if any of them conflicts with the committed state.
    fn apply(&self, writes: Vec<Write>) -> Result<(), Error> {
        let mut plots =
            self.plots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut bookings =
            self.bookings.lock().unwrap_or_else(PoisonError::into_inner);

        for w in &writes {
            match w {
                Write::InsertPlot(p) => {
                    if plots.contains_key(&p.id) {
                        return Err(Error::Duplicate("plots"));
                    }
                }
                Write::UpdatePlot(p) => {
                    if plots.get(&p.id).map(|c| c.version) != Some(p.version) {
                        return Err(Error::StaleVersion("plots"));
                    }
                }
                Write::InsertBooking(b) => {
                    if bookings.contains_key(&b.id) {
                        return Err(Error::Duplicate("bookings"));
                    }
                    let staged_plot = writes.iter().any(|w| {
                        matches!(w, Write::InsertPlot(p) if p.id == b.plot_id)
                    });
                    if !plots.contains_key(&b.plot_id) && !staged_plot {
                        return Err(Error::MissingReference("bookings"));
                    }
                }
                Write::UpdateBooking(b) => {
                    if !bookings.contains_key(&b.id) {
                        return Err(Error::MissingReference("bookings"));
                    }
                }
            }
        }

        for w in writes {
            match w {
                Write::InsertPlot(p) => {
                    _ = plots.insert(p.id, p);
                }
                Write::UpdatePlot(mut p) => {
                    p.version = p.version.next();
                    _ = plots.insert(p.id, p);
                }
                Write::InsertBooking(b) | Write::UpdateBooking(b) => {
                    _ = bookings.insert(b.id, b);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use std::{sync::PoisonError, time::Duration};

    use crate::domain::{booking, plot};

    use super::{Error, Memory, RowKey, Tx};

    fn locks(db: &Memory) -> usize {
        db.tables()
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[tokio::test]
    async fn forgets_released_row_locks() {
        let db = Memory::new();
        let key = RowKey::Plot(plot::Id::new());

        let holder = Tx::from_non_tx(db.0.clone());
        holder.lock(key, None).await.unwrap();
        assert_eq!(locks(&db), 1);

        let waiter = Tx::from_non_tx(db.0.clone());
        assert_eq!(
            waiter.lock(key, Some(Duration::from_millis(10))).await,
            Err(Error::LockTimeout("plots")),
        );
        assert_eq!(locks(&db), 1);

        holder.commit().unwrap();
        assert_eq!(locks(&db), 0);

        let rolled_back = Tx::from_non_tx(db.0.clone());
        rolled_back
            .lock(RowKey::Booking(booking::Id::new()), None)
            .await
            .unwrap();
        assert_eq!(locks(&db), 1);
        drop(rolled_back);
        assert_eq!(locks(&db), 0);
    }

    #[tokio::test]
    async fn keeps_row_lock_while_awaited() {
        let db = Memory::new();
        let key = RowKey::Plot(plot::Id::new());

        let holder = Tx::from_non_tx(db.0.clone());
        holder.lock(key, None).await.unwrap();

        let waiter = Tx::from_non_tx(db.0.clone());
        let waiting = tokio::spawn({
            let waiter = waiter.clone();
            async move {
                waiter.lock(key, Some(Duration::from_secs(5))).await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        holder.commit().unwrap();
        waiting.await.unwrap().unwrap();
        assert_eq!(locks(&db), 1);

        let third = Tx::from_non_tx(db.0.clone());
        assert!(third
            .lock(key, Some(Duration::from_millis(10)))
            .await
            .is_err());

        drop(waiter);
        assert_eq!(locks(&db), 0);
    }
}
